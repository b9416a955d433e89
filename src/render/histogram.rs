//! Confidence histogram over fixed-width bins.

use serde::Serialize;

use crate::models::TrapiResult;
use crate::render::confidence::confidence_of;

pub const BIN_COUNT: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct Histogram {
    pub source: String,
    pub maxcnf: f64,
    pub bins: Vec<u32>,
}

impl Histogram {
    pub fn new(source: &str, maxcnf: f64) -> Self {
        Self {
            source: source.to_string(),
            maxcnf,
            bins: vec![0; BIN_COUNT],
        }
    }

    pub fn bin_index(&self, value: f64) -> usize {
        if self.maxcnf <= 0.0 || value <= 0.0 {
            return 0;
        }
        let i = (value / self.maxcnf * BIN_COUNT as f64).floor() as usize;
        i.min(BIN_COUNT - 1)
    }

    pub fn add(&mut self, value: f64) {
        let i = self.bin_index(value);
        self.bins[i] += 1;
    }

    pub fn total(&self) -> u32 {
        self.bins.iter().sum()
    }

    /// Bar heights as a percentage of the fullest bin.
    pub fn heights(&self) -> Vec<f64> {
        let max = self.bins.iter().copied().max().unwrap_or(0);
        self.bins
            .iter()
            .map(|&b| if max == 0 { 0.0 } else { b as f64 * 100.0 / max as f64 })
            .collect()
    }
}

fn from_source(resource_id: &str, source: &str) -> bool {
    let id = resource_id.strip_prefix("infores:").unwrap_or(resource_id);
    id.eq_ignore_ascii_case(source)
}

/// Histogram of the results that have an analysis by `source`.
/// `None` when no result qualifies.
pub fn build_histogram(results: &[TrapiResult], source: &str) -> Option<Histogram> {
    let mut hist: Option<Histogram> = None;
    for result in results {
        let by_source = result
            .analyses
            .iter()
            .filter_map(|a| a.resource_id.as_deref())
            .any(|r| from_source(r, source));
        if !by_source {
            continue;
        }
        let Some(c) = confidence_of(result) else { continue };
        hist.get_or_insert_with(|| Histogram::new(source, c.maxcnf)).add(c.value);
    }
    hist
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bins() {
        let mut h = Histogram::new("ARAX", 1.0);
        assert_eq!(h.bin_index(0.0), 0);
        assert_eq!(h.bin_index(0.049), 0);
        assert_eq!(h.bin_index(0.05), 1);
        assert_eq!(h.bin_index(1.0), 19);
        assert_eq!(h.bin_index(7.0), 19);
        h.add(0.96);
        h.add(0.97);
        h.add(0.1);
        assert_eq!(h.bins[19], 2);
        assert_eq!(h.heights()[2], 50.0);
        assert_eq!(h.total(), 3);
    }

    #[test]
    fn test_only_designated_source_counts() {
        let results: Vec<TrapiResult> = serde_json::from_value(json!([
            {"normalized_score": 80, "analyses": [{"resource_id": "infores:arax"}]},
            {"normalized_score": 10, "analyses": [{"resource_id": "infores:aragorn"}]},
            {"normalized_score": 99, "analyses": [{"resource_id": "ARAX"}]}
        ]))
        .unwrap();
        let h = build_histogram(&results, "ARAX").unwrap();
        assert_eq!(h.maxcnf, 100.0);
        assert_eq!(h.total(), 2);
        assert_eq!(h.bins[16], 1);
        assert_eq!(h.bins[19], 1);
        assert!(build_histogram(&results, "BTE").is_none());
    }
}
