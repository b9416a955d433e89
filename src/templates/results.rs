//! Response, run progress and listing pages.
//!
//! Everything here renders an already built view model; no decisions about
//! the data are made in this module.

use serde_json::{Map, Value};

use crate::render::histogram::Histogram;
use crate::render::logs::LogView;
use crate::render::results::{ResponseView, ResultCard};
use crate::render::validation::{CountRow, ValidationView};
use crate::session::RunSnapshot;

use super::components::{base_html, error_block, html_escape, script_json};
use super::graph_js::{
    d3_script_tag, graph_css, graph_engine_js, render_graph_js, ClickAction, GraphDataSource, GraphWidgetConfig,
};

// ============================================================================
// Response Sections
// ============================================================================

fn count_table(title: &str, headers: &[&str], rows: &[CountRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let head: String = headers.iter().map(|h| format!("<th>{}</th>", h)).collect();
    let body: String = rows
        .iter()
        .map(|r| {
            let cells: String = r.cells.iter().map(|c| format!("<td>{}</td>", html_escape(c))).collect();
            format!(
                r#"<tr>{cells}<td>{count}</td><td class="bar-cell"><div class="bar" style="width: {width:.1}%"></div></td></tr>"#,
                count = r.count,
                width = r.width,
            )
        })
        .collect();
    format!(
        r#"<details><summary>{title}</summary>
        <table class="data"><tr>{head}<th>Count</th><th></th></tr>{body}</table>
        </details>"#
    )
}

fn validation_section(v: &ValidationView) -> String {
    let mut meta = Vec::new();
    if let Some(version) = &v.version {
        meta.push(format!("validator {}", html_escape(version)));
    }
    if let Some(n) = v.n_sources {
        meta.push(format!("{} sources", n));
    }
    format!(
        r#"<h3>Validation <span class="badge {class}">{label}</span></h3>
        <p class="muted">{message} {meta}</p>
        {provenance}
        {predicates}"#,
        class = v.badge.css_class(),
        label = v.badge.label(),
        message = html_escape(v.message.as_deref().unwrap_or("")),
        meta = meta.join(", "),
        provenance = count_table("Provenance", &["Source", "Role", "Upstream"], &v.provenance),
        predicates = count_table("Predicates", &["Predicate"], &v.predicates),
    )
}

fn histogram_section(h: &Histogram) -> String {
    let bars: String = h
        .heights()
        .iter()
        .zip(&h.bins)
        .map(|(height, count)| format!(r#"<div class="bin" style="height: {:.1}%" title="{}"></div>"#, height, count))
        .collect();
    format!(
        r#"<h3>Confidence distribution <span class="muted">({source}, {total} results)</span></h3>
        <div class="histogram">{bars}</div>
        <div class="histogram-axis"><span>0</span><span>{max}</span></div>"#,
        source = html_escape(&h.source),
        total = h.total(),
        max = h.maxcnf,
    )
}

fn summary_section(view: &ResponseView, id: &str) -> String {
    if view.summary.rows.is_empty() {
        return String::new();
    }
    let head: String = view
        .summary
        .columns
        .iter()
        .map(|c| format!("<th>{}</th>", html_escape(c)))
        .collect();
    let rows: String = view
        .summary
        .rows
        .iter()
        .map(|row| {
            let cells: String = row
                .cells
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    let is_confidence = view.summary.columns.get(i).map(String::as_str) == Some("confidence");
                    match row.bucket.filter(|_| is_confidence) {
                        Some(b) => format!(r#"<td><span class="cnf {}">{}</span></td>"#, b.css_class(), html_escape(cell)),
                        None => format!("<td>{}</td>", html_escape(cell)),
                    }
                })
                .collect();
            format!(r##"<tr><td><a href="#result-{0}">{0}</a></td>{1}</tr>"##, row.rank, cells)
        })
        .collect();
    format!(
        r#"<h3>Summary
            <button onclick="copyText('summary-tsv')">Copy as TSV</button>
            <a class="share-link" href="/response/{id}/tsv">download</a>
        </h3>
        <table class="data"><tr><th>#</th>{head}</tr>{rows}</table>
        <pre id="summary-tsv" style="display: none">{tsv}</pre>"#,
        id = urlencoding::encode(id),
        tsv = html_escape(&view.summary.tsv),
    )
}

fn card_html(card: &ResultCard, response_id: &str) -> String {
    let confidence = match &card.confidence {
        Some(c) => format!(r#"<span class="cnf {}">{}</span>"#, card.bucket.css_class(), c.display()),
        None => r#"<span class="cnf p0">n/a</span>"#.to_string(),
    };
    let bindings: String = card
        .node_bindings
        .iter()
        .map(|(qnode, bound)| {
            let nodes: Vec<String> = bound
                .iter()
                .map(|b| match &b.name {
                    Some(name) => format!("{} <span class=\"muted\">{}</span>", html_escape(name), html_escape(&b.id)),
                    None => html_escape(&b.id),
                })
                .collect();
            format!("<tr><td>{}</td><td>{}</td></tr>", html_escape(qnode), nodes.join("<br>"))
        })
        .collect();
    let analyses: String = card
        .analyses
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let support: String = a
                .support_graphs
                .iter()
                .enumerate()
                .map(|(j, aux)| {
                    format!(
                        r#"<button data-url="/api/response/{rid}/aux/{aux_enc}?panel={panel}" data-target="aux-{rank}-{i}-{j}" onclick="showAux(this)">{aux}</button><div class="graph-box small" id="aux-{rank}-{i}-{j}" style="display: none"></div>"#,
                        rid = urlencoding::encode(response_id),
                        aux_enc = urlencoding::encode(aux),
                        panel = card.widget.panel,
                        rank = card.rank,
                        aux = html_escape(aux),
                    )
                })
                .collect();
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                html_escape(&a.resource_id),
                a.score.map(|s| format!("{:.3}", s)).unwrap_or_default(),
                a.edge_count,
                support
            )
        })
        .collect();
    format!(
        r#"<details class="result-card" id="result-{rank}" data-rank="{rank}" ontoggle="openCard(this)">
            <summary>{confidence}<span class="essence">{essence}</span><span class="muted">#{rank}</span></summary>
            <div class="graph-box small"></div>
            <table class="data"><tr><th>Query node</th><th>Bound to</th></tr>{bindings}</table>
            <table class="data"><tr><th>Analysis by</th><th>Score</th><th>Edges</th><th>Support graphs</th></tr>{analyses}</table>
        </details>"#,
        rank = card.rank,
        essence = html_escape(&card.essence),
    )
}

fn logs_section(logs: &LogView, id: &str, level: Option<&str>) -> String {
    if logs.entries.is_empty() {
        return String::new();
    }
    let filters: String = logs
        .counts
        .iter()
        .map(|(lvl, n)| {
            format!(
                r#"<a class="chip" href="/response/{}?level={}">{} {}</a>"#,
                urlencoding::encode(id),
                urlencoding::encode(lvl),
                html_escape(lvl),
                n
            )
        })
        .collect();
    let entries: String = logs
        .filtered(level)
        .iter()
        .map(|e| {
            let lvl = e.level.as_deref().unwrap_or("INFO").to_ascii_lowercase();
            format!(
                r#"<div class="log level-{lvl}">{ts} <strong>{level}</strong> {msg}</div>"#,
                lvl = html_escape(&lvl),
                ts = html_escape(e.timestamp.as_deref().unwrap_or("")),
                level = html_escape(&lvl.to_ascii_uppercase()),
                msg = html_escape(&e.message),
            )
        })
        .collect();
    format!(
        r#"<h3>Logs</h3>
        <div><a class="chip" href="/response/{id}">all {total}</a>{filters}</div>
        <div class="log-list">{entries}</div>"#,
        id = urlencoding::encode(id),
        total = logs.entries.len(),
    )
}

const RESPONSE_JS: &str = r#"
function openCard(el) {
    if (!el.open || el.dataset.drawn) return;
    el.dataset.drawn = '1';
    drawWidget(el.querySelector('.graph-box'), RESULT_WIDGETS[el.dataset.rank], { clickable: false, showArrows: true });
}

function showAux(button) {
    const target = document.getElementById(button.dataset.target);
    if (!target) return;
    target.style.display = 'block';
    if (target.dataset.drawn) return;
    target.dataset.drawn = '1';
    loadWidget('#' + button.dataset.target, button.dataset.url, { clickable: false, showArrows: true });
}
"#;

/// Full page for one cached response.
pub fn render_response(view: &ResponseView, id: &str, level: Option<&str>) -> String {
    let mut html = format!(
        r#"{d3}{css}{engine}
        <h1>Response {id_text}</h1>
        <p>Status <strong>{status}</strong> {description}
            <a class="share-link" href="/?r={id_enc}">share link</a></p>
        <p class="muted">{versions}</p>"#,
        d3 = d3_script_tag(),
        css = graph_css(),
        engine = graph_engine_js(),
        id_text = html_escape(id),
        status = html_escape(&view.status),
        description = html_escape(view.description.as_deref().unwrap_or("")),
        id_enc = urlencoding::encode(id),
        versions = [
            view.schema_version.as_deref().map(|v| format!("TRAPI {}", html_escape(v))),
            view.biolink_version.as_deref().map(|v| format!("Biolink {}", html_escape(v))),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" · "),
    );

    if let Some(err) = &view.error {
        html.push_str(&error_block("response", err));
    }
    if view.cards.is_empty() {
        html.push_str(r#"<p class="no-results">No results.</p>"#);
    }

    html.push_str(&validation_section(&view.validation));
    if let Some(h) = &view.histogram {
        html.push_str(&histogram_section(h));
    }
    html.push_str(&summary_section(view, id));

    let mut widgets = String::new();
    if let Some(qg) = &view.query_graph {
        html.push_str(r#"<h3>Query graph</h3><div class="graph-box small" id="resp-qg"></div>"#);
        widgets.push_str(&render_graph_js(&GraphWidgetConfig {
            container_selector: "#resp-qg".to_string(),
            click: ClickAction::None,
            show_arrows: true,
            data_source: GraphDataSource::Inline { widget_json: qg.to_json() },
        }));
    }
    if let Some(kg) = &view.knowledge_graph {
        html.push_str(&format!(
            r#"<h3>Knowledge graph <span class="muted">({} nodes, {} edges)</span></h3><div class="graph-box" id="resp-kg"></div>"#,
            kg.nodes.len(),
            kg.edges.len()
        ));
        widgets.push_str(&render_graph_js(&GraphWidgetConfig {
            container_selector: "#resp-kg".to_string(),
            click: ClickAction::None,
            show_arrows: true,
            data_source: GraphDataSource::Inline { widget_json: kg.to_json() },
        }));
    }

    if !view.cards.is_empty() {
        html.push_str(&format!("<h3>Results ({})</h3>", view.cards.len()));
        for card in &view.cards {
            html.push_str(&card_html(card, id));
        }
    }
    html.push_str(&logs_section(&view.logs, id, level));

    let card_widgets: Map<String, Value> = view
        .cards
        .iter()
        .map(|c| (c.rank.to_string(), serde_json::to_value(&c.widget).unwrap_or(Value::Null)))
        .collect();
    let card_widgets = serde_json::to_string(&card_widgets).unwrap_or_else(|_| "{}".to_string());
    html.push_str(&widgets);
    html.push_str(&format!(
        "<script>const RESULT_WIDGETS = {};{}</script>",
        script_json(&card_widgets),
        RESPONSE_JS
    ));

    base_html(&format!("Response {}", id), "", &html)
}

// ============================================================================
// Run Progress
// ============================================================================

const RUN_JS: &str = r#"
function esc(s) {
    const d = document.createElement('div');
    d.textContent = s === undefined || s === null ? '' : String(s);
    return d.innerHTML;
}

function renderOutcome() {
    const o = state.outcome;
    const el = document.getElementById('outcome');
    if (!o) { el.innerHTML = ''; return; }
    if (o.outcome === 'response') {
        el.innerHTML = '<p>Finished with status <strong>' + esc(o.status) + '</strong>, ' + o.results +
            ' results. <a href="/response/' + encodeURIComponent(o.response_id) + '">Open response</a></p>';
    } else if (o.outcome === 'submitted') {
        el.innerHTML = '<p>Submitted to the aggregator as <code>' + esc(o.tracking_id) + '</code>.</p>';
    } else {
        el.innerHTML = '<div class="error-block"><div class="kind">' + esc(o.kind) + '</div><div>' + esc(o.message) + '</div></div>';
    }
}

function renderAggregator() {
    const tree = state.aggregator;
    const el = document.getElementById('aggregator');
    if (!tree) return;
    const done = tree.children.filter(c => c.status === 'Done' || c.status === 'Error').length;
    let html = '<p>' + esc(tree.status) + ': ' + done + ' of ' + tree.children.length + ' agents finished</p>' +
        '<table class="data"><tr><th>Agent</th><th>Status</th><th>Code</th><th>Results</th><th>Nodes</th><th>Edges</th></tr>';
    tree.children.forEach(c => {
        const s = state.agent_stats[c.message] || {};
        const agent = (c.actor && c.actor.agent) || 'unknown';
        html += '<tr><td><a href="/?r=' + encodeURIComponent(c.message) + '&from=ars">' + esc(agent) + '</a></td>' +
            '<td>' + esc(c.status) + '</td><td>' + esc(c.code) + '</td>' +
            '<td>' + esc(s.results) + '</td><td>' + esc(s.nodes) + '</td><td>' + esc(s.edges) + '</td></tr>';
    });
    el.innerHTML = html + '</table>';
}

function render() {
    const p = state.progress;
    document.getElementById('parsing').textContent = p.parsing_steps;
    document.getElementById('processing').textContent = p.processing_steps;
    const status = document.getElementById('run-status');
    status.textContent = p.status;
    status.className = 'run-status ' + p.status;
    document.getElementById('terminate-box').style.display = state.can_terminate ? 'block' : 'none';
    const t = state.termination;
    document.getElementById('terminate-msg').textContent = t ? t.message : '';
    document.getElementById('plan').textContent = p.query_plan ? JSON.stringify(p.query_plan, null, 2) : '';
    document.getElementById('errors').innerHTML = p.errors
        .map(e => '<div class="error-block"><div class="kind">stream</div><div>' + esc(e) + '</div></div>').join('');
    document.getElementById('log').innerHTML = p.logs
        .map(l => '<div class="log level-' + esc((l.level || 'info').toLowerCase()) + '">' + esc(l.timestamp) + ' ' + esc(l.message) + '</div>').join('');
    renderOutcome();
    renderAggregator();
}

function onUpdate(m) {
    const p = state.progress;
    switch (m.type) {
        case 'init': state = m.snapshot; break;
        case 'log': p.logs.push(m.entry); break;
        case 'progress':
            p.parsing_steps = m.parsing_steps;
            p.processing_steps = m.processing_steps;
            p.pid = m.pid;
            state.can_terminate = m.can_terminate;
            break;
        case 'query_plan': p.query_plan = m.plan; break;
        case 'error': p.errors.push(m.message); break;
        case 'aggregator': state.aggregator = m.tree; break;
        case 'agent_stats': state.agent_stats[m.child] = m.stats; break;
        case 'terminated':
            state.termination = m.report;
            if (m.report.terminated) { p.status = 'terminated'; state.can_terminate = false; }
            break;
        case 'finished':
            p.status = m.status;
            state.outcome = m.outcome;
            state.can_terminate = false;
            break;
    }
    render();
}

async function terminateRun() {
    const token = document.getElementById('terminate-token').value;
    const report = await api('POST', '/api/run/' + state.id + '/terminate', { token: token }, false);
    if (report) { state.termination = report; render(); }
}

async function refreshRun() {
    await api('POST', '/api/run/' + state.id + '/refresh', undefined, false);
}

function connect() {
    const proto = location.protocol === 'https:' ? 'wss://' : 'ws://';
    const ws = new WebSocket(proto + location.host + '/ws/run/' + state.id);
    ws.onmessage = e => onUpdate(JSON.parse(e.data));
}

render();
connect();
"#;

pub fn render_run_page(snapshot: &RunSnapshot) -> String {
    let snapshot_json = serde_json::to_string(snapshot).unwrap_or_else(|_| "null".to_string());
    let refresh = if snapshot.target.label() == "aggregator" {
        r#"<button onclick="refreshRun()">Refresh now</button>"#
    } else {
        ""
    };
    let content = format!(
        r#"<h1>Run {id}</h1>
        <p class="muted">{kind} query to {target}, started {started}</p>
        <div class="progress-counters">
            <div class="counter">Parsing steps <strong id="parsing">{parsing}</strong></div>
            <div class="counter">Processing steps <strong id="processing">{processing}</strong></div>
            <div class="counter">Status <span id="run-status" class="run-status">{status}</span></div>
        </div>
        <div id="terminate-box" class="toolbar" style="display: none">
            <input type="text" id="terminate-token" placeholder="authorization token" size="20">
            <button class="danger" onclick="terminateRun()">Terminate</button>
        </div>
        <p id="terminate-msg" class="muted"></p>
        <div id="outcome"></div>
        <div id="errors"></div>
        <div id="aggregator"></div>
        {refresh}
        <details><summary>Query plan</summary><pre id="plan"></pre></details>
        <h3>Log</h3>
        <div class="log-list" id="log"></div>
        <script>
        let state = {snapshot};
        {js}
        </script>"#,
        id = html_escape(&snapshot.id),
        kind = html_escape(&snapshot.kind),
        target = html_escape(snapshot.target.label()),
        started = snapshot.started.format("%Y-%m-%d %H:%M:%S UTC"),
        parsing = snapshot.progress.parsing_steps,
        processing = snapshot.progress.processing_steps,
        status = serde_json::to_value(snapshot.progress.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default(),
        snapshot = script_json(&snapshot_json),
        js = RUN_JS,
    );
    base_html(&format!("Run {}", snapshot.id), "history", &content)
}

// ============================================================================
// Listings
// ============================================================================

fn cell_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// The rows of a listing: a bare array, or the first array inside an object.
fn listing_rows(value: &Value) -> &[Value] {
    match value {
        Value::Array(a) => a.as_slice(),
        Value::Object(o) => o.values().find_map(Value::as_array).map(Vec::as_slice).unwrap_or(&[]),
        _ => &[],
    }
}

/// Recent or latest queries of the internal service as a table.
pub fn render_listing(title: &str, value: &Value) -> String {
    let rows = listing_rows(value);
    if rows.is_empty() {
        return format!(r#"<h2>{}</h2><p class="no-results">Nothing to show.</p>"#, html_escape(title));
    }
    let columns: Vec<String> = rows
        .iter()
        .find_map(Value::as_object)
        .map(|o| o.keys().take(8).cloned().collect())
        .unwrap_or_default();
    let head: String = columns.iter().map(|c| format!("<th>{}</th>", html_escape(c))).collect();
    let body: String = rows
        .iter()
        .map(|row| {
            let cells: String = columns
                .iter()
                .map(|c| {
                    let text = row.get(c).map(cell_text).unwrap_or_default();
                    if (c == "response_id" || c == "id") && !text.is_empty() {
                        format!(r#"<td><a href="/?r={}">{}</a></td>"#, urlencoding::encode(&text), html_escape(&text))
                    } else {
                        format!("<td>{}</td>", html_escape(&text))
                    }
                })
                .collect();
            format!("<tr>{}</tr>", cells)
        })
        .collect();
    format!(
        r#"<h2>{title}</h2><table class="data"><tr>{head}</tr>{body}</table>"#,
        title = html_escape(title),
    )
}

/// TRAPI services registered in SmartAPI.
pub fn render_smartapi(value: &Value) -> String {
    let hits = value.get("hits").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
    if hits.is_empty() {
        return r#"<h2>SmartAPI registry</h2><p class="no-results">No registered services.</p>"#.to_string();
    }
    let rows: String = hits
        .iter()
        .map(|hit| {
            let title = hit.pointer("/info/title").map(cell_text).unwrap_or_default();
            let component = hit.pointer("/info/x-translator/component").map(cell_text).unwrap_or_default();
            let infores = hit.pointer("/info/x-translator/infores").map(cell_text).unwrap_or_default();
            let servers: Vec<String> = hit
                .get("servers")
                .and_then(Value::as_array)
                .map(|servers| {
                    servers
                        .iter()
                        .filter_map(|s| {
                            let url = s.get("url").and_then(Value::as_str)?;
                            let maturity = s.get("x-maturity").and_then(Value::as_str).unwrap_or("");
                            Some(format!(
                                "{} <span class=\"muted\">{}</span>",
                                html_escape(url),
                                html_escape(maturity)
                            ))
                        })
                        .collect()
                })
                .unwrap_or_default();
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                html_escape(&title),
                html_escape(&component),
                html_escape(&infores),
                servers.join("<br>")
            )
        })
        .collect();
    format!(
        r#"<h2>SmartAPI registry <span class="muted">({n} services)</span></h2>
        <table class="data"><tr><th>Title</th><th>Component</th><th>Infores</th><th>Servers</th></tr>{rows}</table>"#,
        n = hits.len(),
    )
}

pub fn render_suggestions(term: &str, terms: &[String]) -> String {
    if terms.is_empty() {
        return format!(r#"<p class="no-results">No suggestions for “{}”.</p>"#, html_escape(term));
    }
    let items: String = terms
        .iter()
        .map(|t| format!(r#"<li><a href="/?term={}">{}</a></li>"#, urlencoding::encode(t), html_escape(t)))
        .collect();
    format!(
        r#"<div class="popup"><h3>Suggestions for “{}”</h3><ul>{}</ul></div>"#,
        html_escape(term),
        items
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dispatch::Target;
    use crate::render::build_response_view;
    use crate::response::classify_response;
    use crate::session::RunHandle;
    use serde_json::json;

    #[test]
    fn test_response_page() {
        let outcome = classify_response(json!({
            "status": "OK",
            "logs": [{"level": "ERROR", "message": "<boom>"}, {"level": "INFO", "message": "fine"}],
            "message": {
                "knowledge_graph": {"nodes": {"X:1": {"name": "x one"}}, "edges": {}},
                "results": [{"node_bindings": {"n0": [{"id": "X:1"}]}, "analyses": [
                    {"resource_id": "infores:arax", "score": 0.95, "support_graphs": ["ag-1"]}
                ]}]
            }
        }))
        .unwrap();
        let view = build_response_view(&outcome, &Config::for_base("http://localhost"));
        let html = render_response(&view, "r1", Some("error"));
        assert!(html.contains(r#"href="/?r=r1""#));
        assert!(html.contains(r#"class="cnf p9""#));
        assert!(html.contains("x one"));
        assert!(html.contains("/api/response/r1/aux/ag-1?panel=2"));
        assert!(html.contains("&lt;boom&gt;"));
        assert!(!html.contains("fine</div>"));
        assert!(!html.contains("No results."));
    }

    #[test]
    fn test_rejected_response_shows_error_and_no_results() {
        let outcome = classify_response(json!({"status": "QueryGraphError", "description": "bad"})).unwrap();
        let view = build_response_view(&outcome, &Config::for_base("http://localhost"));
        let html = render_response(&view, "r2", None);
        assert!(html.contains("error-block"));
        assert!(html.contains("Provider returned status QueryGraphError: bad"));
        assert!(html.contains("No results."));
    }

    #[test]
    fn test_run_page_embeds_snapshot() {
        let run = RunHandle::new("dsl", Target::Internal);
        let html = render_run_page(&run.snapshot());
        assert!(html.contains("/ws/run/' + state.id"));
        assert!(html.contains(&format!(r#""id":"{}""#, run.id)));
        assert!(html.contains(r#"<strong id="parsing">0</strong>"#));
        assert!(html.contains(">running<"));
    }

    #[test]
    fn test_listing_accepts_both_shapes() {
        let html = render_listing("Recent", &json!([{"id": 5, "status": "OK"}]));
        assert!(html.contains(r#"<a href="/?r=5">5</a>"#));
        let html = render_listing("Latest", &json!({"queries": [{"response_id": "9"}]}));
        assert!(html.contains(r#"<a href="/?r=9">9</a>"#));
        assert!(render_listing("Recent", &json!({})).contains("Nothing to show."));
    }

    #[test]
    fn test_smartapi_rows() {
        let html = render_smartapi(&json!({"hits": [{
            "info": {"title": "ARAX", "x-translator": {"component": "ARA", "infores": "infores:arax"}},
            "servers": [{"url": "https://arax.example.org/api", "x-maturity": "production"}]
        }]}));
        assert!(html.contains("(1 services)"));
        assert!(html.contains("https://arax.example.org/api"));
        assert!(html.contains("infores:arax"));
    }

    #[test]
    fn test_suggestions() {
        assert!(render_suggestions("asp", &[]).contains("No suggestions"));
        let html = render_suggestions("asp", &["aspirin".to_string()]);
        assert!(html.contains(r#"<a href="/?term=aspirin">aspirin</a>"#));
    }
}
