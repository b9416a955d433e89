//! D3.js graph widget.
//!
//! [`graph_engine_js`] defines `drawWidget` / `loadWidget` once per page.
//! Each widget instance is then a one-line call generated by
//! [`render_graph_js`]. The data is a serialized
//! [`WidgetGraph`](crate::graph_view::WidgetGraph).

/// What a click on a graph element does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    /// Highlight only.
    None,
    /// Open the node or edge editor for the clicked element.
    SelectForEditing,
}

/// How graph data is provided to the JS engine.
pub enum GraphDataSource {
    /// Data embedded directly in the page as a JS literal.
    Inline { widget_json: String },
    /// Data fetched from a URL when the widget is first drawn.
    FetchUrl { url: String },
}

/// Configuration for one widget instance.
pub struct GraphWidgetConfig {
    /// CSS selector for the container element (e.g. "#qg-widget").
    pub container_selector: String,
    pub click: ClickAction,
    /// Show arrowhead markers on directed edges.
    pub show_arrows: bool,
    pub data_source: GraphDataSource,
}

pub fn d3_script_tag() -> &'static str {
    r#"<script src="https://d3js.org/d3.v7.min.js"></script>"#
}

/// Returns the `<style>` block with `.gw-` prefixed classes.
pub fn graph_css() -> String {
    r#"<style>
        .gw-link { stroke: var(--base01); stroke-opacity: 0.55; stroke-width: 2px; fill: none; }
        .gw-link.dashed { stroke-dasharray: 6,4; }
        .gw-link.selected { stroke: var(--blue); stroke-opacity: 1; stroke-width: 3.5px; }
        .gw-link-hit { stroke: transparent; stroke-width: 12px; cursor: pointer; fill: none; }
        .gw-node path { stroke: var(--bg); stroke-width: 1.5px; cursor: pointer; }
        .gw-node.set path { stroke: var(--base02); stroke-width: 2.5px; stroke-dasharray: 3,2; }
        .gw-node.selected path { stroke: var(--base02); stroke-width: 3px; }
        .gw-node text, .gw-edge-label {
            font-size: 10px;
            fill: var(--base01);
            pointer-events: none;
            text-anchor: middle;
        }
        .gw-tooltip {
            position: absolute;
            background: var(--base02);
            color: var(--base2);
            padding: 0.3rem 0.5rem;
            border-radius: 4px;
            font-size: 0.75rem;
            pointer-events: none;
            max-width: 280px;
        }
        .gw-empty { padding: 1rem; color: var(--muted); font-style: italic; }
    </style>"#
        .to_string()
}

/// The drawing engine. Include it once per page, after [`d3_script_tag`].
pub fn graph_engine_js() -> &'static str {
    r#"<script>
    const GW_SYMBOLS = {
        circle: d3.symbolCircle, square: d3.symbolSquare, diamond: d3.symbolDiamond,
        triangle: d3.symbolTriangle, star: d3.symbolStar, cross: d3.symbolCross, wye: d3.symbolWye,
    };

    function gwTrim(s, n) {
        return s.length > n ? s.substring(0, n) + '…' : s;
    }

    // Parallel edges between the same pair get spread out.
    function gwRankEdges(edges) {
        const pairCount = {};
        edges.forEach(e => {
            const key = [e.source, e.target].sort().join('|');
            pairCount[key] = (pairCount[key] || 0) + 1;
            e._rank = pairCount[key] - 1;
        });
    }

    function gwLinkPath(d) {
        const sx = d.source.x, sy = d.source.y, tx = d.target.x, ty = d.target.y;
        if (d.source === d.target) {
            return `M${sx},${sy} C${sx - 40},${sy - 60} ${sx + 40},${sy - 60} ${sx},${sy}`;
        }
        if (!d._rank) return `M${sx},${sy} L${tx},${ty}`;
        const bend = 30 * Math.ceil(d._rank / 2) * (d._rank % 2 ? 1 : -1);
        const mx = (sx + tx) / 2, my = (sy + ty) / 2;
        const dx = tx - sx, dy = ty - sy, len = Math.sqrt(dx * dx + dy * dy) || 1;
        return `M${sx},${sy} Q${mx - dy / len * bend},${my + dx / len * bend} ${tx},${ty}`;
    }

    function drawWidget(container, data, opts) {
        if (!container) return;
        const nodes = data.nodes.map(n => Object.assign({}, n));
        const edges = data.edges.map(e => Object.assign({}, e));

        container.innerHTML = '';
        if (nodes.length === 0) {
            container.innerHTML = '<div class="gw-empty">Empty graph</div>';
            return;
        }

        const rect = container.getBoundingClientRect();
        const width = rect.width || 600;
        const height = rect.height || 360;
        const svg = d3.select(container).append('svg')
            .attr('width', '100%').attr('height', '100%')
            .attr('viewBox', [0, 0, width, height]);
        const g = svg.append('g');
        svg.call(d3.zoom().scaleExtent([0.2, 4]).on('zoom', e => g.attr('transform', e.transform)));

        const markerId = 'gw-arrow-' + (container.id || data.panel);
        if (opts.showArrows) {
            svg.append('defs').append('marker')
                .attr('id', markerId)
                .attr('viewBox', '0 -5 10 10')
                .attr('refX', 22).attr('refY', 0)
                .attr('markerWidth', 8).attr('markerHeight', 8)
                .attr('orient', 'auto')
                .append('path')
                .attr('d', 'M0,-5L10,0L0,5')
                .attr('fill', '#586e75');
        }

        const tooltip = d3.select(container).append('div')
            .attr('class', 'gw-tooltip')
            .style('display', 'none');

        gwRankEdges(edges);

        const linkSel = g.append('g').selectAll('path.gw-link')
            .data(edges, d => d.id).join('path')
            .attr('class', d => 'gw-link' + (d.dashed ? ' dashed' : ''))
            .attr('marker-end', opts.showArrows ? 'url(#' + markerId + ')' : null);

        const hitSel = g.append('g').selectAll('path.gw-link-hit')
            .data(edges, d => d.id).join('path')
            .attr('class', 'gw-link-hit')
            .on('click', (event, d) => select(d.id));

        const labelSel = g.append('g').selectAll('text')
            .data(edges, d => d.id).join('text')
            .attr('class', 'gw-edge-label')
            .text(d => gwTrim(d.label, 28));

        const sim = d3.forceSimulation(nodes)
            .force('link', d3.forceLink(edges).id(d => d.id).distance(140))
            .force('charge', d3.forceManyBody().strength(-420))
            .force('center', d3.forceCenter(width / 2, height / 2))
            .force('collide', d3.forceCollide(30));

        const nodeSel = g.append('g').selectAll('g.gw-node')
            .data(nodes, d => d.id).join('g')
            .attr('class', d => 'gw-node' + (d.is_set ? ' set' : ''))
            .on('click', (event, d) => select(d.id))
            .on('mouseover', (event, d) => {
                if (!d.tooltip) return;
                tooltip.style('display', 'block').text(d.tooltip);
            })
            .on('mousemove', event => {
                const [x, y] = d3.pointer(event, container);
                tooltip.style('left', (x + 12) + 'px').style('top', (y + 12) + 'px');
            })
            .on('mouseout', () => tooltip.style('display', 'none'))
            .call(d3.drag()
                .on('start', (e, d) => { if (!e.active) sim.alphaTarget(0.3).restart(); d.fx = d.x; d.fy = d.y; })
                .on('drag', (e, d) => { d.fx = e.x; d.fy = e.y; })
                .on('end', (e, d) => { if (!e.active) sim.alphaTarget(0); d.fx = null; d.fy = null; }));

        nodeSel.append('path')
            .attr('d', d => d3.symbol().type(GW_SYMBOLS[d.shape] || d3.symbolCircle).size(d.is_set ? 520 : 380)())
            .attr('fill', d => d.color);

        nodeSel.append('text')
            .attr('dy', -16)
            .text(d => gwTrim(d.label, 30));

        sim.on('tick', () => {
            linkSel.attr('d', gwLinkPath);
            hitSel.attr('d', gwLinkPath);
            labelSel
                .attr('x', d => (d.source.x + d.target.x) / 2)
                .attr('y', d => (d.source.y + d.target.y) / 2 - 4);
            nodeSel.attr('transform', d => `translate(${d.x},${d.y})`);
        });

        async function select(elementId) {
            nodeSel.classed('selected', d => d.id === elementId);
            linkSel.classed('selected', d => d.id === elementId);
            if (opts.clickable) {
                await api('POST', '/api/graph/select', { element: elementId });
            }
        }
    }

    async function loadWidget(selector, url, opts) {
        const container = document.querySelector(selector);
        if (!container) return;
        const resp = await fetch(url);
        if (!resp.ok) {
            container.innerHTML = '<div class="gw-empty">Failed to load graph</div>';
            return;
        }
        drawWidget(container, await resp.json(), opts);
    }
    </script>"#
}

/// Returns a `<script>` drawing one widget through the engine.
pub fn render_graph_js(config: &GraphWidgetConfig) -> String {
    let opts = format!(
        "{{ clickable: {}, showArrows: {} }}",
        config.click == ClickAction::SelectForEditing,
        config.show_arrows
    );
    let call = match &config.data_source {
        GraphDataSource::Inline { widget_json } => format!(
            "drawWidget(document.querySelector('{}'), {}, {});",
            config.container_selector,
            super::components::script_json(widget_json),
            opts
        ),
        GraphDataSource::FetchUrl { url } => {
            format!("loadWidget('{}', '{}', {});", config.container_selector, url, opts)
        }
    };
    format!("<script>{}</script>", call)
}
