//! Decision record.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::fields::*;
use crate::meeting::MeetingId;

pub type DecisionId = u64;

/// A recorded decision. Effectiveness and reflection are filled in later by a
/// review and stay `Pending` / `None` until then.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: DecisionId,
    pub title: String,
    pub detail: Option<String>,
    pub date_made: NaiveDateTime,
    pub next_steps: Option<String>,
    pub impact: ImpactLevel,
    pub rationale: String,
    #[serde(default)]
    pub effectiveness: Effectiveness,
    pub reflection: Option<String>,
    pub meeting: Option<MeetingId>,
}

impl Decision {
    pub fn new(title: impl Into<String>, rationale: impl Into<String>, date_made: NaiveDateTime) -> Self {
        Decision {
            id: 0,
            title: title.into(),
            detail: None,
            date_made,
            next_steps: None,
            impact: ImpactLevel::Medium,
            rationale: rationale.into(),
            effectiveness: Effectiveness::Pending,
            reflection: None,
            meeting: None,
        }
    }

    pub fn is_reviewed(&self) -> bool {
        self.effectiveness != Effectiveness::Pending
    }
}
