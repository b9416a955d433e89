//! View models for responses.
//!
//! Nothing here touches HTML. `templates` turns these structures into
//! markup, so a different front end only needs a new adapter.

pub mod confidence;
pub mod histogram;
pub mod logs;
pub mod results;
pub mod summary;
pub mod validation;

pub use confidence::{bucket, confidence_of, Bucket, Confidence};
pub use results::{build_response_view, ResponseView};
