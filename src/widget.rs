//! Read-only snapshots for home-screen style summaries.
//!
//! These never fail: callers build them from `Database::load_or_default`, so a
//! missing or corrupt store shows up as empty data instead of an error.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::db::Database;
use crate::decision::Decision;
use crate::meeting::Meeting;
use crate::samples;
use crate::stats::{effectiveness_stats, EffectivenessStats};
use crate::task::Task;

/// Meetings shown by the schedule snapshot.
pub const MEETING_LIMIT: usize = 5;
/// Pending decisions shown by the decision snapshot.
pub const RECENT_DECISION_LIMIT: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct ComplianceSnapshot {
    pub date: NaiveDateTime,
    pub items: Vec<Task>,
    pub overdue_count: usize,
    pub today_count: usize,
}

impl ComplianceSnapshot {
    pub fn build(db: &Database, now: NaiveDateTime) -> Self {
        let mut items = db.tasks.clone();
        items.sort_by_key(|t| t.due);
        let overdue_count = items.iter().filter(|t| t.is_overdue(now)).count();
        let today_count = items.iter().filter(|t| t.due.date() == now.date()).count();
        ComplianceSnapshot { date: now, items, overdue_count, today_count }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MeetingSnapshot {
    pub date: NaiveDateTime,
    pub meetings: Vec<Meeting>,
    pub show_count: bool,
    /// Set when the store had no upcoming meetings and sample data is shown.
    pub is_sample: bool,
}

impl MeetingSnapshot {
    pub fn build(db: &Database, now: NaiveDateTime, show_count: bool) -> Self {
        let mut meetings: Vec<Meeting> = db.meetings.iter().filter(|m| m.date > now).cloned().collect();
        meetings.sort_by_key(|m| m.date);
        meetings.truncate(MEETING_LIMIT);
        let is_sample = meetings.is_empty();
        if is_sample {
            meetings = samples::sample_meetings(now);
        }
        MeetingSnapshot { date: now, meetings, show_count, is_sample }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionSnapshot {
    pub date: NaiveDateTime,
    pub stats: EffectivenessStats,
    pub effectiveness_rate: f64,
    pub recent_pending: Vec<Decision>,
}

impl DecisionSnapshot {
    pub fn build(db: &Database, now: NaiveDateTime) -> Self {
        let all: Vec<&Decision> = db.decisions.iter().collect();
        let stats = effectiveness_stats(&all);
        let mut pending: Vec<&Decision> = all.into_iter().filter(|d| !d.is_reviewed()).collect();
        pending.sort_by(|a, b| b.date_made.cmp(&a.date_made));
        let recent_pending = pending.into_iter().take(RECENT_DECISION_LIMIT).cloned().collect();
        DecisionSnapshot { date: now, stats, effectiveness_rate: stats.rate(), recent_pending }
    }
}
