use std::{collections::BTreeMap, ops::AddAssign};

use serde::{Deserialize, Serialize};

/// One routing step recorded during a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Step {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }

    pub fn agent(name: impl Into<String>) -> Self {
        Self::new(name, "agent")
    }

    pub fn topic(name: impl Into<String>) -> Self {
        Self::new(name, "topic")
    }
}

/// True positive / false positive / false negative counts for one step identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub tp: u64,
    pub fp: u64,
    #[serde(rename = "fn")]
    pub fn_: u64,
}

impl ConfusionCounts {
    pub const TRUE_POSITIVE: Self = Self { tp: 1, fp: 0, fn_: 0 };
    pub const FALSE_POSITIVE: Self = Self { tp: 0, fp: 1, fn_: 0 };
    pub const FALSE_NEGATIVE: Self = Self { tp: 0, fp: 0, fn_: 1 };

    pub fn total(&self) -> u64 {
        self.tp + self.fp + self.fn_
    }

    pub fn support(&self) -> u64 {
        self.tp + self.fn_
    }
}

impl AddAssign for ConfusionCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.tp += rhs.tp;
        self.fp += rhs.fp;
        self.fn_ += rhs.fn_;
    }
}

/// Per-identifier confusion breakdown. Ordered so serialized output is stable.
pub type StepStats = BTreeMap<String, ConfusionCounts>;
