//! Per-result confidence: which score to show, and which color bucket it gets.

use serde::Serialize;

use crate::models::TrapiResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    NormalizedScore,
    Score,
    Confidence,
    AnalysisScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    P9,
    P7,
    P5,
    P3,
    P1,
    P0,
}

impl Bucket {
    pub fn css_class(self) -> &'static str {
        match self {
            Bucket::P9 => "p9",
            Bucket::P7 => "p7",
            Bucket::P5 => "p5",
            Bucket::P3 => "p3",
            Bucket::P1 => "p1",
            Bucket::P0 => "p0",
        }
    }
}

/// Bucket of a raw confidence value.
///
/// Thresholds apply to the value as reported, whatever its scale; `maxcnf`
/// only changes how the value is displayed and binned.
pub fn bucket(value: f64) -> Bucket {
    if value >= 0.9 {
        Bucket::P9
    } else if value >= 0.7 {
        Bucket::P7
    } else if value >= 0.5 {
        Bucket::P5
    } else if value >= 0.3 {
        Bucket::P3
    } else if value > 0.0 {
        Bucket::P1
    } else {
        Bucket::P0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Confidence {
    pub value: f64,
    /// 100 for normalized scores, 1 otherwise.
    pub maxcnf: f64,
    pub source: ScoreSource,
}

impl Confidence {
    pub fn bucket(&self) -> Bucket {
        bucket(self.value)
    }

    /// Share of the scale, clamped to `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.maxcnf <= 0.0 {
            return 0.0;
        }
        (self.value / self.maxcnf).clamp(0.0, 1.0)
    }

    pub fn display(&self) -> String {
        if self.maxcnf >= 100.0 {
            format!("{:.1}", self.value)
        } else {
            format!("{:.3}", self.value)
        }
    }
}

/// First score present in the chain `normalized_score → score → confidence →
/// max(analyses[].score)`.
pub fn confidence_of(result: &TrapiResult) -> Option<Confidence> {
    if let Some(v) = result.normalized_score {
        return Some(Confidence { value: v, maxcnf: 100.0, source: ScoreSource::NormalizedScore });
    }
    if let Some(v) = result.score {
        return Some(Confidence { value: v, maxcnf: 1.0, source: ScoreSource::Score });
    }
    if let Some(v) = result.confidence {
        return Some(Confidence { value: v, maxcnf: 1.0, source: ScoreSource::Confidence });
    }
    result
        .analyses
        .iter()
        .filter_map(|a| a.score)
        .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))))
        .map(|v| Confidence { value: v, maxcnf: 1.0, source: ScoreSource::AnalysisScore })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Analysis;

    #[test]
    fn test_bucket_examples() {
        assert_eq!(bucket(0.95), Bucket::P9);
        assert_eq!(bucket(75.0), Bucket::P9);
        assert_eq!(bucket(0.4), Bucket::P3);
        assert_eq!(bucket(0.0), Bucket::P0);
        assert_eq!(bucket(0.01), Bucket::P1);
        assert_eq!(bucket(0.7).css_class(), "p7");
    }

    #[test]
    fn test_fallback_chain() {
        let mut r = TrapiResult {
            analyses: vec![
                Analysis { score: Some(0.2), ..Default::default() },
                Analysis { score: Some(0.6), ..Default::default() },
                Analysis::default(),
            ],
            ..Default::default()
        };
        let c = confidence_of(&r).unwrap();
        assert_eq!((c.value, c.maxcnf, c.source), (0.6, 1.0, ScoreSource::AnalysisScore));

        r.confidence = Some(0.3);
        assert_eq!(confidence_of(&r).unwrap().source, ScoreSource::Confidence);
        r.score = Some(0.5);
        assert_eq!(confidence_of(&r).unwrap().source, ScoreSource::Score);
        r.normalized_score = Some(75.0);
        let c = confidence_of(&r).unwrap();
        assert_eq!(c.maxcnf, 100.0);
        assert_eq!(c.bucket(), Bucket::P9);
        assert_eq!(c.fraction(), 0.75);
        assert_eq!(c.display(), "75.0");
    }

    #[test]
    fn test_no_score_at_all() {
        assert!(confidence_of(&TrapiResult::default()).is_none());
    }
}
