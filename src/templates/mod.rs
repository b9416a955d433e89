//! HTML templates and styling for the workbench.
//!
//! Pure string rendering of the view models built in `render` and of the
//! session state. Swapping the front end means replacing this module only.
//!
//! ## Module Structure
//!
//! - `styles` - CSS constants and theme definitions
//! - `components` - Shared HTML components (nav bar, error blocks, base template)
//! - `graph_js` - D3 graph widget engine
//! - `workbench` - Query graph editor and the other tabs
//! - `results` - Response, run progress and listing pages

mod components;
mod graph_js;
mod results;
mod styles;
mod workbench;

pub use components::{base_html, client_error_block, error_block, html_escape, nav_bar};
pub use graph_js::{graph_css, render_graph_js, ClickAction, GraphDataSource, GraphWidgetConfig};
pub use results::{render_listing, render_response, render_run_page, render_smartapi, render_suggestions};
pub use styles::STYLE;
pub use workbench::{render_workbench, Tab, WorkbenchPage};
