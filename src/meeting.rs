//! Meeting record.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::fields::*;

pub type MeetingId = u64;

/// A scheduled meeting. Decisions, tasks and observations point at a meeting
/// through their own `meeting` field; the meeting does not list them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub title: String,
    pub date: NaiveDateTime,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(default)]
    pub attendees: Vec<String>,
    pub status: MeetingStatus,
    pub meeting_type: MeetingType,
    pub notes: Option<String>,
}

impl Meeting {
    /// Build an unsaved meeting starting at `date` with zero length.
    pub fn new(title: impl Into<String>, date: NaiveDateTime, meeting_type: MeetingType) -> Self {
        Meeting {
            id: 0,
            title: title.into(),
            date,
            start: date,
            end: date,
            attendees: Vec::new(),
            status: MeetingStatus::Scheduled,
            meeting_type,
            notes: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Hours and minutes with zero units dropped: "1h 30m", "45m", "2h", "0m".
    pub fn formatted_duration(&self) -> String {
        let minutes = self.duration().num_minutes().max(0);
        let (h, m) = (minutes / 60, minutes % 60);
        match (h, m) {
            (0, m) => format!("{m}m"),
            (h, 0) => format!("{h}h"),
            (h, m) => format!("{h}h {m}m"),
        }
    }
}
