use crate::grading::{grade_for, GradeBand};
use crate::models::ScoreRecord;
use serde::Serialize;

/// Half-up 1-decimal rounding used for printed averages:
/// `floor(10*x + 0.5) / 10`
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermAggregate {
    pub term: String,
    pub filtered: Vec<ScoreRecord>,
    pub total: f64,
    pub average: f64,
}

impl TermAggregate {
    /// "0" when the term has no marks, otherwise one decimal ("50.0").
    pub fn average_label(&self) -> String {
        if self.filtered.is_empty() {
            "0".to_string()
        } else {
            format!("{:.1}", self.average)
        }
    }

    /// Sum rounded to one decimal; whole sums print without a fraction ("100", "137.7").
    pub fn total_label(&self) -> String {
        let total = round_off_1_decimal(self.total);
        if total.fract() == 0.0 {
            format!("{:.0}", total)
        } else {
            format!("{:.1}", total)
        }
    }

    pub fn count(&self) -> usize {
        self.filtered.len()
    }
}

/// Filters a student's marks to one term (exact match) and sums them.
pub fn aggregate(scores: &[ScoreRecord], term: &str) -> TermAggregate {
    let filtered: Vec<ScoreRecord> = scores.iter().filter(|s| s.term == term).cloned().collect();
    let total: f64 = filtered.iter().map(|s| s.score).sum();
    let average = if filtered.is_empty() {
        0.0
    } else {
        round_off_1_decimal(total / (filtered.len() as f64))
    };

    TermAggregate {
        term: term.to_string(),
        filtered,
        total,
        average,
    }
}

/// Distinct terms in first-seen order.
pub fn terms_present(scores: &[ScoreRecord]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for s in scores {
        if !out.iter().any(|t| t == &s.term) {
            out.push(s.term.clone());
        }
    }
    out
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedRow {
    pub subject: String,
    pub score: f64,
    pub grade: GradeBand,
}

pub fn graded_rows(agg: &TermAggregate) -> Vec<GradedRow> {
    agg.filtered
        .iter()
        .map(|s| GradedRow {
            subject: s.subject.clone(),
            score: s.score,
            grade: grade_for(s.score),
        })
        .collect()
}
