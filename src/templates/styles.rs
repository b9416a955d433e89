//! CSS styles for the workbench.
//!
//! Contains the main STYLE constant with all CSS for the web interface.

// ============================================================================
// CSS Styles
// ============================================================================

pub const STYLE: &str = r#"
/* Solarized Light Theme */
:root {
    --base03: #002b36;
    --base02: #073642;
    --base01: #586e75;
    --base00: #657b83;
    --base0: #839496;
    --base1: #93a1a1;
    --base2: #eee8d5;
    --base3: #fdf6e3;

    --yellow: #b58900;
    --orange: #cb4b16;
    --red: #dc322f;
    --magenta: #d33682;
    --violet: #6c71c4;
    --blue: #268bd2;
    --cyan: #2aa198;
    --green: #859900;

    --bg: var(--base3);
    --fg: var(--base00);
    --muted: var(--base1);
    --border: var(--base2);
    --link: var(--blue);
    --link-hover: var(--cyan);
    --accent: var(--base2);
    --code-bg: var(--base2);
}

* { box-sizing: border-box; margin: 0; padding: 0; }

body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
    line-height: 1.5;
    color: var(--fg);
    background: var(--bg);
}

.container {
    max-width: 1200px;
    margin: 0 auto;
    padding: 1rem;
}

a { color: var(--link); text-decoration: none; }
a:hover { color: var(--link-hover); text-decoration: underline; }

h1, h2, h3 { font-weight: 600; margin-top: 1.2em; margin-bottom: 0.5em; }
h1 { font-size: 1.5rem; }
h2 { font-size: 1.2rem; }
h3 { font-size: 1rem; }

pre, code, textarea.code {
    font-family: "SF Mono", Menlo, Consolas, monospace;
    font-size: 0.85rem;
}

pre {
    background: var(--code-bg);
    padding: 0.75rem;
    border-radius: 4px;
    overflow-x: auto;
}

.nav-bar {
    position: sticky;
    top: 0;
    background: var(--bg);
    border-bottom: 1px solid var(--border);
    padding: 0.5rem 1rem;
    display: flex;
    gap: 1rem;
    align-items: center;
    flex-wrap: wrap;
    z-index: 100;
}

.nav-bar a { font-size: 0.9rem; }
.nav-bar a.active { color: var(--base02); font-weight: 600; }
.nav-bar .spacer { flex: 1; }

button, .btn {
    padding: 0.35rem 0.75rem;
    border: 1px solid var(--border);
    border-radius: 4px;
    background: var(--accent);
    color: var(--fg);
    cursor: pointer;
    font-size: 0.85rem;
    font-family: inherit;
}
button:hover, .btn:hover { border-color: var(--base1); }
button.primary { background: var(--blue); color: var(--base3); border-color: var(--blue); }
button.danger { color: var(--red); }

input[type=text], select, textarea {
    padding: 0.35rem 0.6rem;
    border: 1px solid var(--border);
    border-radius: 4px;
    background: var(--bg);
    color: var(--fg);
    font-size: 0.85rem;
}
textarea { width: 100%; min-height: 12rem; }

/* Query graph workspace */
.workspace { display: flex; gap: 1rem; align-items: flex-start; }
.workspace .graph-panel { flex: 2; min-width: 0; }
.workspace .editor-panel { flex: 1; min-width: 280px; }

.graph-box {
    width: 100%;
    height: 380px;
    border: 1px solid var(--border);
    border-radius: 6px;
    background: #fffdf5;
}
.graph-box.small { height: 260px; }

.toolbar { display: flex; gap: 0.5rem; flex-wrap: wrap; margin: 0.5rem 0; }

.popup {
    border: 1px solid var(--border);
    border-radius: 6px;
    padding: 0.75rem;
    margin-bottom: 1rem;
    background: var(--bg);
    box-shadow: 0 2px 6px rgba(0,0,0,0.06);
}
.popup h3 { margin-top: 0; display: flex; justify-content: space-between; }
.popup .field { margin: 0.5rem 0; }
.popup .field label { display: block; font-size: 0.8rem; color: var(--base01); }

.chip {
    display: inline-block;
    padding: 0.05rem 0.5rem;
    margin: 0.1rem;
    border-radius: 10px;
    background: var(--base2);
    font-size: 0.8rem;
}
.chip button { border: none; background: none; padding: 0 0.2rem; color: var(--red); }

/* Progress */
.progress-counters { display: flex; gap: 1.5rem; margin: 0.5rem 0; }
.progress-counters .counter strong { font-size: 1.3rem; color: var(--base02); }
.run-status { font-weight: 600; }
.run-status.running { color: var(--blue); }
.run-status.completed { color: var(--green); }
.run-status.failed { color: var(--red); }
.run-status.terminated { color: var(--orange); }

.log-list { max-height: 320px; overflow-y: auto; font-size: 0.8rem; }
.log-list .log { padding: 0.1rem 0; border-bottom: 1px dotted var(--border); }
.log.level-error { color: var(--red); }
.log.level-warning, .log.level-warn { color: var(--orange); }
.log.level-debug { color: var(--muted); }

/* Results */
.error-block {
    border-left: 4px solid var(--red);
    background: #fbeeea;
    padding: 0.6rem 0.9rem;
    margin: 0.75rem 0;
    border-radius: 4px;
}
.error-block .kind { font-weight: 600; color: var(--red); text-transform: uppercase; font-size: 0.75rem; }

.no-results { color: var(--muted); font-style: italic; margin: 1rem 0; }

table.data { border-collapse: collapse; width: 100%; font-size: 0.85rem; margin: 0.5rem 0; }
table.data th, table.data td { padding: 0.3rem 0.5rem; border-bottom: 1px solid var(--border); text-align: left; }
table.data th { color: var(--base01); font-weight: 600; }

.cnf { display: inline-block; min-width: 3.5rem; padding: 0.05rem 0.4rem; border-radius: 3px; color: #fff; text-align: right; }
.cnf.p9 { background: #2e7d32; }
.cnf.p7 { background: #689f38; }
.cnf.p5 { background: #b58900; }
.cnf.p3 { background: #cb4b16; }
.cnf.p1 { background: #dc322f; }
.cnf.p0 { background: var(--base1); }

.bar { height: 0.7rem; background: var(--blue); border-radius: 2px; }
.bar-cell { width: 40%; }

.histogram { display: flex; align-items: flex-end; gap: 2px; height: 120px; border-bottom: 1px solid var(--base1); margin: 0.5rem 0; }
.histogram .bin { flex: 1; background: var(--cyan); min-height: 1px; }
.histogram-axis { display: flex; justify-content: space-between; font-size: 0.75rem; color: var(--muted); }

.badge { display: inline-block; padding: 0.1rem 0.6rem; border-radius: 3px; font-weight: 600; font-size: 0.8rem; }
.badge-pass { background: var(--green); color: #fff; }
.badge-fail { background: var(--red); color: #fff; }
.badge-na { background: var(--base1); color: #fff; }

.result-card {
    border: 1px solid var(--border);
    border-radius: 6px;
    padding: 0.75rem;
    margin: 0.75rem 0;
}
.result-card summary { cursor: pointer; display: flex; gap: 0.75rem; align-items: center; }
.result-card .essence { font-weight: 600; color: var(--base02); }

.tabs { display: flex; gap: 0.25rem; border-bottom: 1px solid var(--border); margin-bottom: 1rem; }
.tabs a { padding: 0.4rem 0.8rem; border: 1px solid transparent; border-bottom: none; border-radius: 4px 4px 0 0; }
.tabs a.active { border-color: var(--border); background: var(--bg); color: var(--base02); font-weight: 600; }

.muted { color: var(--muted); font-size: 0.85rem; }
.share-link { font-size: 0.85rem; }
"#;
