//! Shared HTML components for the workbench.
//!
//! Contains the navigation bar, error blocks and the base HTML template.

use crate::error::ClientError;

use super::styles::STYLE;

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// JSON text safe to embed inside a `<script>` element.
pub fn script_json(json: &str) -> String {
    json.replace("</", "<\\/")
}

// ============================================================================
// Navigation Bar
// ============================================================================

const NAV_LINKS: &[(&str, &str, &str)] = &[
    ("query", "/?tab=query", "Query graph"),
    ("dsl", "/?tab=dsl", "DSL"),
    ("json", "/?tab=json", "JSON"),
    ("workflow", "/?tab=workflow", "Workflow"),
    ("lists", "/?tab=lists", "Lists"),
    ("history", "/?tab=history", "History"),
    ("synonyms", "/?tab=synonyms", "Synonyms"),
];

pub fn nav_bar(active: &str) -> String {
    let links: String = NAV_LINKS
        .iter()
        .map(|(key, href, label)| {
            let class = if *key == active { " class=\"active\"" } else { "" };
            format!(r#"<a href="{}"{}>{}</a>"#, href, class, label)
        })
        .collect();

    format!(
        r#"<nav class="nav-bar">
            <strong>TRAPI Workbench</strong>
            {links}
            <span class="spacer"></span>
            <a href="/?recent=20">Recent</a>
            <a href="/?latest=20">Latest</a>
            <a href="/?smartapi=1">SmartAPI</a>
        </nav>"#
    )
}

// ============================================================================
// Error Blocks
// ============================================================================

pub fn error_block(kind: &str, message: &str) -> String {
    format!(
        r#"<div class="error-block"><div class="kind">{}</div><div>{}</div></div>"#,
        html_escape(kind),
        html_escape(message)
    )
}

pub fn client_error_block(err: &ClientError) -> String {
    error_block(err.kind(), &err.to_string())
}

// ============================================================================
// Base HTML Template
// ============================================================================

pub fn base_html(title: &str, active: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{STYLE}</style>
</head>
<body>
    {nav}
    <div class="container">
        {content}
    </div>
    <script>
    // JSON POST helper shared by every page; reloads unless told otherwise.
    async function api(method, url, body, reload = true) {{
        const opts = {{ method, headers: {{ 'Content-Type': 'application/json' }} }};
        if (body !== undefined) opts.body = JSON.stringify(body);
        const resp = await fetch(url, opts);
        let data = null;
        try {{ data = await resp.json(); }} catch (e) {{}}
        if (!resp.ok) {{
            alert((data && data.error) || ('Request failed: ' + resp.status));
            return null;
        }}
        if (reload) window.location.reload();
        return data;
    }}

    function copyText(elementId) {{
        const el = document.getElementById(elementId);
        if (!el) return;
        navigator.clipboard.writeText(el.textContent).catch(err => console.error('Failed to copy:', err));
    }}
    </script>
</body>
</html>"#,
        title = html_escape(title),
        nav = nav_bar(active),
    )
}
