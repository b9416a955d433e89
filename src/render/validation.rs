//! Validation badge and provenance drill-down.

use serde::Serialize;
use serde_json::Value;

use crate::models::ValidationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Badge {
    Pass,
    Fail,
    NotApplicable,
}

impl Badge {
    pub fn label(self) -> &'static str {
        match self {
            Badge::Pass => "PASS",
            Badge::Fail => "FAIL",
            Badge::NotApplicable => "N/A",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Badge::Pass => "badge-pass",
            Badge::Fail => "badge-fail",
            Badge::NotApplicable => "badge-na",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CountRow {
    pub cells: Vec<String>,
    pub count: u64,
    /// Bar width, percent of the largest count in the table.
    pub width: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationView {
    pub badge: Badge,
    pub message: Option<String>,
    pub version: Option<String>,
    pub n_sources: Option<u64>,
    pub provenance: Vec<CountRow>,
    pub predicates: Vec<CountRow>,
}

pub fn badge_for(status: Option<&str>) -> Badge {
    match status.map(|s| s.trim().to_ascii_uppercase()).as_deref() {
        Some("PASS") | Some("PASSED") => Badge::Pass,
        Some("FAIL") | Some("FAILED") | Some("ERROR") => Badge::Fail,
        _ => Badge::NotApplicable,
    }
}

fn with_widths(mut rows: Vec<(Vec<String>, u64)>) -> Vec<CountRow> {
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let max = rows.iter().map(|r| r.1).max().unwrap_or(0);
    rows.into_iter()
        .map(|(cells, count)| CountRow {
            cells,
            count,
            width: if max == 0 { 0.0 } else { count as f64 * 100.0 / max as f64 },
        })
        .collect()
}

fn cell_text(v: &Value) -> String {
    v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())
}

pub fn build_validation(result: Option<&ValidationResult>) -> ValidationView {
    let Some(result) = result else {
        return ValidationView {
            badge: Badge::NotApplicable,
            message: None,
            version: None,
            n_sources: None,
            provenance: Vec::new(),
            predicates: Vec::new(),
        };
    };

    let summary = result.provenance_summary.as_ref();
    let provenance = summary
        .map(|s| {
            s.provenance_counts
                .iter()
                .filter_map(|row| {
                    let (count, cells) = row.split_last()?;
                    Some((cells.iter().map(cell_text).collect(), count.as_u64().unwrap_or(0)))
                })
                .collect()
        })
        .unwrap_or_default();
    let predicates = summary
        .map(|s| s.predicate_counts.iter().map(|(p, c)| (vec![p.clone()], *c)).collect())
        .unwrap_or_default();

    ValidationView {
        badge: badge_for(result.status.as_deref()),
        message: result.message.clone(),
        version: result.version.clone(),
        n_sources: summary.and_then(|s| s.n_sources),
        provenance: with_widths(provenance),
        predicates: with_widths(predicates),
    }
}
