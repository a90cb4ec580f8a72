use serde::{Serialize, Serializer};

/// Letter grade bands, ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GradeBand {
    F,
    D,
    C,
    B,
    A,
    APlus,
}

impl GradeBand {
    pub fn label(self) -> &'static str {
        match self {
            GradeBand::APlus => "A+",
            GradeBand::A => "A",
            GradeBand::B => "B",
            GradeBand::C => "C",
            GradeBand::D => "D",
            GradeBand::F => "F",
        }
    }
}

impl Serialize for GradeBand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Thresholds are checked highest first. Out-of-range scores are not rejected;
/// NaN falls through to `F`.
pub fn grade_for(score: f64) -> GradeBand {
    if score >= 90.0 {
        GradeBand::APlus
    } else if score >= 80.0 {
        GradeBand::A
    } else if score >= 70.0 {
        GradeBand::B
    } else if score >= 60.0 {
        GradeBand::C
    } else if score >= 50.0 {
        GradeBand::D
    } else {
        GradeBand::F
    }
}

pub fn remark_for(grade: GradeBand) -> &'static str {
    match grade {
        GradeBand::APlus | GradeBand::A => "Excellent",
        GradeBand::B => "Good",
        GradeBand::C => "Average",
        GradeBand::D | GradeBand::F => "Needs Improvement",
    }
}

pub const PASS_MARK: f64 = 50.0;

/// Which remark column a report card prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemarkPolicy {
    /// Excellent / Good / Average / Needs Improvement, keyed off the grade.
    #[default]
    Tiered,
    /// Pass / Fail at the pass mark.
    PassFail,
}

impl RemarkPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tiered" => Some(RemarkPolicy::Tiered),
            "passFail" => Some(RemarkPolicy::PassFail),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RemarkPolicy::Tiered => "tiered",
            RemarkPolicy::PassFail => "passFail",
        }
    }

    pub fn remark(self, score: f64) -> &'static str {
        match self {
            RemarkPolicy::Tiered => remark_for(grade_for(score)),
            RemarkPolicy::PassFail => {
                if score >= PASS_MARK {
                    "Pass"
                } else {
                    "Fail"
                }
            }
        }
    }
}
