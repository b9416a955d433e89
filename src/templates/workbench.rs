//! The main workbench page: query graph editor, text query tabs, entity
//! lists, history and synonym lookup.

use crate::editor::Visibility;
use crate::graph_view;
use crate::lists::DEFAULT_LISTS;
use crate::models::{AttributeConstraint, QEdge, QNode, QualifierConstraint};
use crate::render::results::QUERY_GRAPH_PANEL;
use crate::session::Session;

use super::components::{base_html, html_escape, script_json};
use super::graph_js::{
    d3_script_tag, graph_css, graph_engine_js, render_graph_js, ClickAction, GraphDataSource, GraphWidgetConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Query,
    Dsl,
    Json,
    Workflow,
    Lists,
    History,
    Synonyms,
}

impl Tab {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "query" | "graph" => Some(Tab::Query),
            "dsl" => Some(Tab::Dsl),
            "json" => Some(Tab::Json),
            "workflow" => Some(Tab::Workflow),
            "lists" => Some(Tab::Lists),
            "history" => Some(Tab::History),
            "synonyms" | "synonym" => Some(Tab::Synonyms),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tab::Query => "query",
            Tab::Dsl => "dsl",
            Tab::Json => "json",
            Tab::Workflow => "workflow",
            Tab::Lists => "lists",
            Tab::History => "history",
            Tab::Synonyms => "synonyms",
        }
    }
}

pub struct WorkbenchPage<'a> {
    pub tab: Tab,
    pub session: &'a Session,
    /// Pre-rendered output of a bootstrap action (listing, suggestions, error block).
    pub bootstrap: &'a str,
    pub term: Option<&'a str>,
    pub aggregator_enabled: bool,
}

// ============================================================================
// Shared Pieces
// ============================================================================

fn target_controls(prefix: &str, aggregator_enabled: bool) -> String {
    let aggregator = if aggregator_enabled {
        r#"<option value="aggregator">Aggregator</option>"#
    } else {
        ""
    };
    format!(
        r#"<div class="toolbar">
            <select id="{prefix}-target">
                <option value="internal">Internal service</option>
                {aggregator}
                <option value="third-party">Third-party API</option>
            </select>
            <input type="text" id="{prefix}-url" placeholder="Third-party TRAPI URL" size="40">
            <button class="primary" onclick="submitQuery('{prefix}')">Submit</button>
        </div>"#
    )
}

/// Removable chip. The button carries everything the edit needs in data attributes.
fn chip(scope: &str, id: &str, op: &str, field: &str, value: &str, label: &str) -> String {
    format!(
        r#"<span class="chip">{label}<button title="Remove" data-scope="{scope}" data-id="{id}" data-op="{op}" data-field="{field}" data-value="{value}" onclick="chipEdit(this)">×</button></span>"#,
        label = html_escape(label),
        scope = scope,
        id = html_escape(id),
        op = op,
        field = field,
        value = html_escape(value),
    )
}

fn constraint_label(c: &AttributeConstraint) -> String {
    let value = match &c.value {
        serde_json::Value::String(s) => s.clone(),
        v => v.to_string(),
    };
    format!(
        "{}{} {} {}",
        if c.not { "NOT " } else { "" },
        c.name,
        c.operator.as_str(),
        value
    )
}

fn qualifier_label(q: &QualifierConstraint) -> String {
    q.qualifier_set
        .iter()
        .map(|q| format!("{}={}", q.qualifier_type_id.trim_start_matches("biolink:"), q.qualifier_value))
        .collect::<Vec<_>>()
        .join(", ")
}

fn constraint_form(scope: &str) -> String {
    format!(
        r#"<div class="toolbar">
            <input type="text" id="{scope}-c-id" placeholder="attribute id" size="14">
            <select id="{scope}-c-op">
                <option>==</option><option>&gt;</option><option>&lt;</option><option>matches</option><option>===</option>
            </select>
            <input type="text" id="{scope}-c-value" placeholder="value" size="8">
            <label><input type="checkbox" id="{scope}-c-not"> not</label>
            <button onclick="addConstraint('{scope}')">Add</button>
        </div>"#
    )
}

// ============================================================================
// Editor Popups
// ============================================================================

fn node_popup(id: &str, node: &QNode) -> String {
    let ids: String = node
        .ids
        .iter()
        .enumerate()
        .map(|(i, curie)| {
            let label = match node.names.get(i).filter(|n| !n.is_empty() && *n != curie) {
                Some(name) => format!("{} ({})", name, curie),
                None => curie.clone(),
            };
            chip("node", id, "remove_id", "curie", curie, &label)
        })
        .collect();
    let categories: String = node
        .categories
        .iter()
        .map(|c| chip("node", id, "remove_category", "category", c, c.trim_start_matches("biolink:")))
        .collect();
    let constraints: String = node
        .constraints
        .iter()
        .enumerate()
        .map(|(i, c)| chip("node", id, "remove_constraint", "index", &i.to_string(), &constraint_label(c)))
        .collect();

    format!(
        r#"<div class="popup" id="node-popup">
            <h3>Node {id} <button onclick="hideEditor('node')">Close</button></h3>
            <div class="field"><label>Identifiers (empty = any)</label>{ids}
                <div class="toolbar">
                    <input type="text" id="node-curie" placeholder="CURIE, e.g. CHEBI:15365" size="18">
                    <input type="text" id="node-curie-name" placeholder="name (optional)" size="12">
                    <button onclick="nodeAddId()">Add</button>
                </div>
            </div>
            <div class="field"><label>Categories</label>{categories}
                <div class="toolbar">
                    <input type="text" id="node-category" list="category-options" placeholder="biolink:Gene" size="18">
                    <button onclick="nodeAddCategory()">Add</button>
                </div>
            </div>
            <div class="field"><label><input type="checkbox" {is_set} onchange="editCurrent('node', {{op: 'set_is_set', value: this.checked}})"> is a set</label></div>
            <div class="field"><label>Description</label>
                <input type="text" value="{description}" onchange="editCurrent('node', {{op: 'set_description', text: this.value || null}})">
            </div>
            <div class="field"><label>Option group</label>
                <input type="text" value="{group}" size="10" onchange="editCurrent('node', {{op: 'set_option_group', group: this.value || null}})">
            </div>
            <div class="field"><label>Constraints</label>{constraints}{constraint_form}</div>
            <button class="danger" onclick="deleteElement('node', EDIT_NODE)">Delete node</button>
        </div>"#,
        id = html_escape(id),
        ids = ids,
        categories = categories,
        is_set = if node.is_set { "checked" } else { "" },
        description = html_escape(node.description.as_deref().unwrap_or("")),
        group = html_escape(node.option_group_id.as_deref().unwrap_or("")),
        constraints = constraints,
        constraint_form = constraint_form("node"),
    )
}

fn node_options(session: &Session, selected: &str) -> String {
    session
        .graph
        .graph()
        .nodes
        .keys()
        .map(|n| {
            let sel = if n == selected { " selected" } else { "" };
            format!(r#"<option value="{0}"{1}>{0}</option>"#, html_escape(n), sel)
        })
        .collect()
}

fn edge_popup(session: &Session, id: &str, edge: &QEdge) -> String {
    let predicates: String = edge
        .predicates
        .iter()
        .map(|p| chip("edge", id, "remove_predicate", "predicate", p, p.trim_start_matches("biolink:")))
        .collect();
    let constraints: String = edge
        .constraints
        .iter()
        .enumerate()
        .map(|(i, c)| chip("edge", id, "remove_constraint", "index", &i.to_string(), &constraint_label(c)))
        .collect();
    let qualifiers: String = edge
        .qualifier_constraints
        .iter()
        .enumerate()
        .map(|(i, q)| chip("edge", id, "remove_qualifier", "index", &i.to_string(), &qualifier_label(q)))
        .collect();

    format!(
        r#"<div class="popup" id="edge-popup">
            <h3>Edge {id} <button onclick="hideEditor('edge')">Close</button></h3>
            <div class="field"><label>Endpoints</label>
                <div class="toolbar">
                    <select id="edge-subject">{subjects}</select> →
                    <select id="edge-object">{objects}</select>
                    <button onclick="edgeSetEndpoints()">Apply</button>
                </div>
            </div>
            <div class="field"><label>Predicates (empty = any)</label>{predicates}
                <div class="toolbar">
                    <input type="text" id="edge-predicate" list="predicate-options" placeholder="biolink:treats" size="18">
                    <button onclick="edgeAddPredicate()">Add</button>
                </div>
            </div>
            <div class="field"><label><input type="checkbox" {exclude} onchange="editCurrent('edge', {{op: 'set_exclude', value: this.checked}})"> exclude (NOT)</label></div>
            <div class="field"><label>Option group</label>
                <input type="text" value="{group}" size="10" onchange="editCurrent('edge', {{op: 'set_option_group', group: this.value || null}})">
            </div>
            <div class="field"><label>Attribute constraints</label>{constraints}{constraint_form}</div>
            <div class="field"><label>Qualifier constraints</label>{qualifiers}
                <div class="toolbar">
                    <input type="text" id="edge-q-type" placeholder="qualifier type" size="16">
                    <input type="text" id="edge-q-value" placeholder="value" size="10">
                    <button onclick="edgeAddQualifier()">Add</button>
                </div>
            </div>
            <button class="danger" onclick="deleteElement('edge', EDIT_EDGE)">Delete edge</button>
        </div>"#,
        id = html_escape(id),
        subjects = node_options(session, &edge.subject),
        objects = node_options(session, &edge.object),
        predicates = predicates,
        exclude = if edge.exclude { "checked" } else { "" },
        group = html_escape(edge.option_group_id.as_deref().unwrap_or("")),
        constraints = constraints,
        constraint_form = constraint_form("edge"),
        qualifiers = qualifiers,
    )
}

// ============================================================================
// Tabs
// ============================================================================

fn query_tab(page: &WorkbenchPage) -> String {
    let session = page.session;
    let widget = graph_view::from_query_graph(session.graph.graph(), QUERY_GRAPH_PANEL);
    let widget_js = render_graph_js(&GraphWidgetConfig {
        container_selector: "#qg-widget".to_string(),
        click: ClickAction::SelectForEditing,
        show_arrows: true,
        data_source: GraphDataSource::Inline { widget_json: widget.to_json() },
    });

    let node_popup_html = match &session.editors.node {
        Visibility::Shown(id) => session.graph.node(id).map(|n| node_popup(id, n)).unwrap_or_default(),
        Visibility::Hidden => String::new(),
    };
    let edge_popup_html = match &session.editors.edge {
        Visibility::Shown(id) => session.graph.edge(id).map(|e| edge_popup(session, id, e)).unwrap_or_default(),
        Visibility::Hidden => String::new(),
    };
    let hint = if node_popup_html.is_empty() && edge_popup_html.is_empty() {
        r#"<p class="muted">Click a node or an edge to edit it.</p>"#
    } else {
        ""
    };
    let export = serde_json::to_string_pretty(&session.graph.to_trapi_json()).unwrap_or_default();

    format!(
        r#"<div class="workspace">
            <div class="graph-panel">
                <div class="toolbar">
                    <button onclick="api('POST', '/api/graph/node', {{}})">Add node</button>
                    <button onclick="api('POST', '/api/graph/edge', {{}})">Add edge</button>
                    <button class="danger" onclick="if (confirm('Start a new query?')) api('POST', '/api/graph/reset')">New query</button>
                </div>
                <div class="graph-box" id="qg-widget"></div>
                {targets}
                <details>
                    <summary>Query graph JSON</summary>
                    <pre id="qg-export">{export}</pre>
                    <button onclick="copyText('qg-export')">Copy</button>
                    <textarea class="code" id="qg-import" placeholder="Paste a query graph or a whole TRAPI message"></textarea>
                    <button onclick="api('POST', '/api/graph/import', {{text: document.getElementById('qg-import').value}})">Import</button>
                </details>
            </div>
            <div class="editor-panel">
                {hint}
                {node_popup_html}
                {edge_popup_html}
            </div>
        </div>
        <datalist id="category-options"></datalist>
        <datalist id="predicate-options"></datalist>
        {widget_js}"#,
        targets = target_controls("graph", page.aggregator_enabled),
        export = html_escape(&export),
    )
}

fn text_tab(kind: &str, title: &str, placeholder: &str, aggregator_enabled: bool) -> String {
    format!(
        r#"<h2>{title}</h2>
        <textarea class="code" id="{kind}-text" placeholder="{placeholder}"></textarea>
        {targets}"#,
        targets = target_controls(kind, aggregator_enabled),
        placeholder = html_escape(placeholder),
    )
}

fn lists_tab(session: &Session) -> String {
    let mut html = String::from("<h2>Entity lists</h2>");
    for name in session.lists.names() {
        let items = session.lists.items(name).unwrap_or(&[]);
        let chips: String = items
            .iter()
            .map(|item| {
                let label = match &item.name {
                    Some(n) => format!("{} ({})", n, item.curie),
                    None => item.curie.clone(),
                };
                format!(
                    r#"<span class="chip">{label}<button title="Remove" data-list="{list}" data-curie="{curie}" onclick="listRemove(this)">×</button></span>"#,
                    label = html_escape(&label),
                    list = html_escape(name),
                    curie = html_escape(&item.curie),
                )
            })
            .collect();
        let delete = if DEFAULT_LISTS.contains(&name) {
            String::new()
        } else {
            format!(
                r#"<button class="danger" data-list="{0}" onclick="listAction(this, 'DELETE', '')">Delete list</button>"#,
                html_escape(name)
            )
        };
        let key = html_escape(name);
        html.push_str(&format!(
            r#"<div class="popup">
                <h3>List {key} <span class="muted">{count} items</span></h3>
                <div>{chips}</div>
                <div class="toolbar">
                    <input type="text" id="list-{key}-curie" placeholder="CURIE" size="18">
                    <input type="text" id="list-{key}-name" placeholder="name (optional)" size="12">
                    <button data-list="{key}" onclick="listAdd(this)">Add</button>
                    <button data-list="{key}" onclick="listAction(this, 'POST', '/use')">Use as node</button>
                    <button data-list="{key}" onclick="listAction(this, 'POST', '/clear')">Clear</button>
                    {delete}
                </div>
            </div>"#,
            count = items.len(),
        ));
    }
    html.push_str(
        r#"<div class="toolbar">
            <input type="text" id="new-list" placeholder="new list name" size="14">
            <button onclick="api('POST', '/api/lists', {name: document.getElementById('new-list').value})">Create list</button>
        </div>"#,
    );
    html
}

fn history_tab(session: &Session) -> String {
    if session.history.is_empty() {
        return r#"<h2>History</h2><p class="no-results">No queries yet.</p>"#.to_string();
    }
    let rows: String = session
        .history
        .iter()
        .map(|h| {
            let status = h.status.as_deref().unwrap_or("running");
            let response = match h.response_id.as_deref() {
                Some(id) if status == "Submitted" => format!(
                    r#"<a href="/?r={0}&from=ars">{1}</a>"#,
                    urlencoding::encode(id),
                    html_escape(id)
                ),
                Some(id) => format!(
                    r#"<a href="/response/{0}">{1}</a> <a class="share-link" href="/?r={0}">share</a>"#,
                    urlencoding::encode(id),
                    html_escape(id)
                ),
                None => String::new(),
            };
            format!(
                r#"<tr><td>{at}</td><td>{kind}</td><td>{target}</td><td><a href="/run/{run}">{status}</a></td><td>{response}</td></tr>"#,
                at = h.at.format("%Y-%m-%d %H:%M:%S"),
                kind = html_escape(&h.kind),
                target = html_escape(&h.target),
                run = html_escape(&h.run_id),
                status = html_escape(status),
            )
        })
        .collect();
    format!(
        r#"<h2>History</h2>
        <table class="data">
            <tr><th>When</th><th>Kind</th><th>Target</th><th>Status</th><th>Response</th></tr>
            {rows}
        </table>"#
    )
}

fn synonyms_tab(term: Option<&str>) -> String {
    format!(
        r#"<h2>Synonyms</h2>
        <div class="toolbar">
            <input type="text" id="term" value="{term}" placeholder="term, e.g. acetaminophen" size="30" oninput="suggestTerms(this.value)">
            <button class="primary" onclick="window.location = '/?term=' + encodeURIComponent(document.getElementById('term').value)">Look up</button>
        </div>
        <ul id="term-suggestions" class="muted"></ul>"#,
        term = html_escape(term.unwrap_or("")),
    )
}

// ============================================================================
// Page Script
// ============================================================================

const WORKBENCH_JS: &str = r#"
function editPath(scope, id) {
    return '/api/graph/' + scope + '/' + encodeURIComponent(id) + '/edit';
}

function editCurrent(scope, edit) {
    const id = scope === 'node' ? EDIT_NODE : EDIT_EDGE;
    if (id === null) return;
    return api('POST', editPath(scope, id), edit);
}

function chipEdit(button) {
    const d = button.dataset;
    const edit = { op: d.op };
    edit[d.field] = d.field === 'index' ? parseInt(d.value, 10) : d.value;
    return api('POST', editPath(d.scope, d.id), edit);
}

function value(id) {
    const el = document.getElementById(id);
    return el ? el.value.trim() : '';
}

function nodeAddId() {
    const curie = value('node-curie');
    if (!curie) return;
    editCurrent('node', { op: 'add_id', curie: curie, name: value('node-curie-name') || null });
}

function nodeAddCategory() {
    const category = value('node-category');
    if (category) editCurrent('node', { op: 'add_category', category: category });
}

function edgeAddPredicate() {
    const predicate = value('edge-predicate');
    if (predicate) editCurrent('edge', { op: 'add_predicate', predicate: predicate });
}

function edgeSetEndpoints() {
    editCurrent('edge', { op: 'set_endpoints', subject: value('edge-subject'), object: value('edge-object') });
}

function edgeAddQualifier() {
    const type = value('edge-q-type');
    if (!type) return;
    editCurrent('edge', { op: 'add_qualifier', constraint: {
        qualifier_set: [{ qualifier_type_id: type, qualifier_value: value('edge-q-value') }]
    }});
}

function addConstraint(scope) {
    const id = value(scope + '-c-id');
    if (!id) return;
    const raw = value(scope + '-c-value');
    const num = Number(raw);
    editCurrent(scope, { op: 'add_constraint', constraint: {
        id: id,
        name: id,
        operator: value(scope + '-c-op'),
        value: raw !== '' && !isNaN(num) ? num : raw,
        not: document.getElementById(scope + '-c-not').checked,
    }});
}

function hideEditor(scope) {
    return api('POST', '/api/graph/hide', { editor: scope });
}

function deleteElement(scope, id) {
    if (id === null) return;
    return api('DELETE', '/api/graph/' + scope + '/' + encodeURIComponent(id));
}

async function submitQuery(prefix) {
    const body = {
        kind: prefix,
        text: value(prefix + '-text'),
        target: value(prefix + '-target'),
        url: value(prefix + '-url') || null,
    };
    const data = await api('POST', '/api/query', body, false);
    if (data && data.run_id) window.location = '/run/' + data.run_id;
}

function listPath(button) {
    return '/api/lists/' + encodeURIComponent(button.dataset.list);
}

function listAdd(button) {
    const list = button.dataset.list;
    api('POST', listPath(button) + '/items', {
        curie: value('list-' + list + '-curie'),
        name: value('list-' + list + '-name') || null,
    });
}

function listRemove(button) {
    api('DELETE', listPath(button) + '/items/' + encodeURIComponent(button.dataset.curie));
}

function listAction(button, method, suffix) {
    api(method, listPath(button) + suffix);
}

let suggestTimer = null;
function suggestTerms(term) {
    clearTimeout(suggestTimer);
    suggestTimer = setTimeout(async () => {
        const ul = document.getElementById('term-suggestions');
        if (!ul) return;
        const resp = await fetch('/api/autocomplete?term=' + encodeURIComponent(term));
        const terms = resp.ok ? await resp.json() : [];
        ul.innerHTML = '';
        terms.forEach(t => {
            const li = document.createElement('li');
            const a = document.createElement('a');
            a.href = '/?term=' + encodeURIComponent(t);
            a.textContent = t;
            li.appendChild(a);
            ul.appendChild(li);
        });
    }, 250);
}

async function fillDatalist(id, url) {
    const list = document.getElementById(id);
    if (!list) return;
    const resp = await fetch(url);
    if (!resp.ok) return;
    (await resp.json()).forEach(v => {
        const opt = document.createElement('option');
        opt.value = v;
        list.appendChild(opt);
    });
}

if (EDIT_NODE !== null) fillDatalist('category-options', '/api/categories');
if (EDIT_EDGE !== null) fillDatalist('predicate-options', '/api/graph/edge/' + encodeURIComponent(EDIT_EDGE) + '/predicates');
"#;

// ============================================================================
// Page
// ============================================================================

pub fn render_workbench(page: &WorkbenchPage) -> String {
    let session = page.session;
    let body = match page.tab {
        Tab::Query => query_tab(page),
        Tab::Dsl => text_tab(
            "dsl",
            "DSL query",
            "add_qnode(ids=CHEBI:15365, key=n0)\nadd_qnode(categories=biolink:Disease, key=n1)\nadd_qedge(subject=n0, object=n1, key=e0)\nexpand()\noverlay(action=compute_ngd)\nfilter_results(action=limit_number_of_results, max_results=20)",
            page.aggregator_enabled,
        ),
        Tab::Json => text_tab("json", "JSON query", "{\"message\": {\"query_graph\": {...}}}", page.aggregator_enabled),
        Tab::Workflow => text_tab(
            "workflow",
            "Workflow",
            "[{\"id\": \"lookup\"}, {\"id\": \"overlay_compute_ngd\"}]",
            page.aggregator_enabled,
        ),
        Tab::Lists => lists_tab(session),
        Tab::History => history_tab(session),
        Tab::Synonyms => synonyms_tab(page.term),
    };

    let current = session
        .current_response
        .as_deref()
        .map(|id| {
            format!(
                r#"<p class="muted">Last response: <a href="/response/{0}">{1}</a></p>"#,
                urlencoding::encode(id),
                html_escape(id)
            )
        })
        .unwrap_or_default();

    let edit_node = serde_json::to_string(&session.editors.node.shown_id()).unwrap_or_else(|_| "null".to_string());
    let edit_edge = serde_json::to_string(&session.editors.edge.shown_id()).unwrap_or_else(|_| "null".to_string());

    let content = format!(
        r#"{d3}{css}{engine}
        {bootstrap}
        {current}
        {body}
        <script>
        const EDIT_NODE = {edit_node};
        const EDIT_EDGE = {edit_edge};
        {js}
        </script>"#,
        d3 = d3_script_tag(),
        css = graph_css(),
        engine = graph_engine_js(),
        bootstrap = page.bootstrap,
        edit_node = script_json(&edit_node),
        edit_edge = script_json(&edit_edge),
        js = WORKBENCH_JS,
    );
    base_html("TRAPI Workbench", page.tab.as_str(), &content)
}
