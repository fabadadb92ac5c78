//! Classroom observation and rubric component records.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::fields::*;
use crate::meeting::MeetingId;

pub type ObservationId = u64;
pub type ComponentId = u64;

/// A classroom walkthrough. Components are owned and listed in scoring order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub id: ObservationId,
    pub teacher_name: String,
    pub date: NaiveDateTime,
    pub subject: String,
    pub grade_level: GradeLevel,
    pub observation_type: ObservationType,
    pub duration_minutes: u32,
    pub overall_rating: DanielsonScore,
    pub follow_up_required: bool,
    pub follow_up_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub components: Vec<ComponentId>,
    pub meeting: Option<MeetingId>,
}

impl Observation {
    pub fn new(teacher_name: impl Into<String>, subject: impl Into<String>, date: NaiveDateTime) -> Self {
        Observation {
            id: 0,
            teacher_name: teacher_name.into(),
            date,
            subject: subject.into(),
            grade_level: GradeLevel::Ninth,
            observation_type: ObservationType::FollowUp,
            duration_minutes: 0,
            overall_rating: DanielsonScore::Developing,
            follow_up_required: false,
            follow_up_date: None,
            components: Vec::new(),
            meeting: None,
        }
    }
}

/// One scored criterion of an observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricComponent {
    pub id: ComponentId,
    pub domain: DanielsonDomain,
    /// Free-text code such as "3c".
    pub number: String,
    pub detail: String,
    pub score: DanielsonScore,
    pub comments: Option<String>,
    pub observation: Option<ObservationId>,
}

impl RubricComponent {
    pub fn new(domain: DanielsonDomain, number: impl Into<String>, detail: impl Into<String>, score: DanielsonScore) -> Self {
        RubricComponent {
            id: 0,
            domain,
            number: number.into(),
            detail: detail.into(),
            score,
            comments: None,
            observation: None,
        }
    }
}
