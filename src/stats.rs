//! Counts, rates and period-over-period trends for the dashboard.
//!
//! All functions are pure scans over records already loaded from the store.
//! Period membership uses calendar boundaries: the same date, the same
//! Monday-start week, the same month or the same year as the reference time.

use std::fmt;

use chrono::{Datelike, Duration, Months, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::db::{start_end_of_week, Database};
use crate::decision::Decision;
use crate::fields::*;
use crate::meeting::Meeting;
use crate::observation::Observation;
use crate::task::Task;

/// Number of tasks `upcoming_tasks` returns at most.
pub const UPCOMING_LIMIT: usize = 5;

/// Direction and size of a change between two periods. `Up`/`Down` always
/// carry a non-zero magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up(usize),
    Down(usize),
    Neutral,
}

impl Trend {
    pub fn from_difference(diff: i64) -> Self {
        match diff {
            d if d > 0 => Trend::Up(d.unsigned_abs() as usize),
            d if d < 0 => Trend::Down(d.unsigned_abs() as usize),
            _ => Trend::Neutral,
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Up(n) => write!(f, "+{n}"),
            Trend::Down(n) => write!(f, "-{n}"),
            Trend::Neutral => write!(f, "±0"),
        }
    }
}

/// True when `date` falls in the same period as `reference`.
pub fn in_period(date: NaiveDateTime, reference: NaiveDateTime, range: TimeRange) -> bool {
    let (d, r) = (date.date(), reference.date());
    match range {
        TimeRange::Day => d == r,
        TimeRange::Week => start_end_of_week(d).0 == start_end_of_week(r).0,
        TimeRange::Month => d.year() == r.year() && d.month() == r.month(),
        TimeRange::Year => d.year() == r.year(),
    }
}

/// Reference time one unit before `now`.
pub fn previous_reference(now: NaiveDateTime, range: TimeRange) -> NaiveDateTime {
    match range {
        TimeRange::Day => now - Duration::days(1),
        TimeRange::Week => now - Duration::days(7),
        TimeRange::Month => now.checked_sub_months(Months::new(1)).unwrap_or(now - Duration::days(30)),
        TimeRange::Year => now.checked_sub_months(Months::new(12)).unwrap_or(now - Duration::days(365)),
    }
}

fn period_trend<T>(items: &[&T], range: TimeRange, now: NaiveDateTime, date_of: impl Fn(&T) -> NaiveDateTime) -> Trend {
    let prev = previous_reference(now, range);
    let current = items.iter().filter(|i| in_period(date_of(**i), now, range)).count() as i64;
    let previous = items.iter().filter(|i| in_period(date_of(**i), prev, range)).count() as i64;
    Trend::from_difference(current - previous)
}

pub fn meetings_trend(meetings: &[&Meeting], range: TimeRange, now: NaiveDateTime) -> Trend {
    period_trend(meetings, range, now, |m| m.date)
}

pub fn decisions_trend(decisions: &[&Decision], range: TimeRange, now: NaiveDateTime) -> Trend {
    period_trend(decisions, range, now, |d| d.date_made)
}

/// Net compliance load added this period: tasks created minus tasks completed.
pub fn compliance_trend(tasks: &[&Task], range: TimeRange, now: NaiveDateTime) -> Trend {
    let created = tasks.iter().filter(|t| in_period(t.created, now, range)).count() as i64;
    let completed = tasks
        .iter()
        .filter(|t| t.completed.is_some_and(|c| in_period(c, now, range)))
        .count() as i64;
    Trend::from_difference(created - completed)
}

/// Today's overdue count against the unresolved tasks that were already past
/// due a day ago. A zero difference with outstanding overdue tasks still
/// reports `Up(current)`.
pub fn overdue_trend(db: &Database, tasks: &[&Task], now: NaiveDateTime) -> Trend {
    let yesterday = now - Duration::hours(24);
    let current = overdue_count(tasks, now);
    let previous = tasks.iter().filter(|t| t.due < yesterday && !db.is_task_completed(t)).count();
    let diff = current as i64 - previous as i64;
    if diff == 0 && current > 0 {
        Trend::Up(current)
    } else {
        Trend::from_difference(diff)
    }
}

/// Share of tasks whose status is `Completed`, in `[0, 1]`.
pub fn completion_rate(tasks: &[&Task]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let done = tasks.iter().filter(|t| t.status == Status::Completed).count();
    done as f64 / tasks.len() as f64
}

pub fn overdue_count(tasks: &[&Task], now: NaiveDateTime) -> usize {
    tasks.iter().filter(|t| t.is_overdue(now)).count()
}

/// First few open tasks that are not yet past due, in input order.
pub fn upcoming_tasks<'a>(db: &Database, tasks: &[&'a Task], now: NaiveDateTime) -> Vec<&'a Task> {
    tasks
        .iter()
        .copied()
        .filter(|t| !db.is_task_completed(t) && t.days_to_due(now) >= 0)
        .take(UPCOMING_LIMIT)
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub overdue: usize,
}

pub fn status_counts(tasks: &[&Task], now: NaiveDateTime) -> StatusCounts {
    let by = |s: Status| tasks.iter().filter(|t| t.status == s).count();
    StatusCounts {
        pending: by(Status::Pending),
        in_progress: by(Status::InProgress),
        completed: by(Status::Completed),
        overdue: overdue_count(tasks, now),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EffectivenessStats {
    pub effective: usize,
    pub ineffective: usize,
    pub pending: usize,
}

impl EffectivenessStats {
    /// Effective share of reviewed decisions; 0 when nothing is reviewed.
    pub fn rate(&self) -> f64 {
        let reviewed = self.effective + self.ineffective;
        if reviewed == 0 {
            0.0
        } else {
            self.effective as f64 / reviewed as f64
        }
    }
}

pub fn effectiveness_stats(decisions: &[&Decision]) -> EffectivenessStats {
    let by = |e: Effectiveness| decisions.iter().filter(|d| d.effectiveness == e).count();
    EffectivenessStats {
        effective: by(Effectiveness::Effective),
        ineffective: by(Effectiveness::Ineffective),
        pending: by(Effectiveness::Pending),
    }
}

/// Count per impact level; every level is present, in declaration order.
pub fn impact_breakdown(decisions: &[&Decision]) -> Vec<(ImpactLevel, usize)> {
    ImpactLevel::ALL
        .iter()
        .map(|&level| (level, decisions.iter().filter(|d| d.impact == level).count()))
        .collect()
}

pub fn rating_breakdown(observations: &[&Observation]) -> Vec<(DanielsonScore, usize)> {
    DanielsonScore::ALL
        .iter()
        .map(|&score| (score, observations.iter().filter(|o| o.overall_rating == score).count()))
        .collect()
}

pub fn today_meetings_count(meetings: &[&Meeting], now: NaiveDateTime) -> usize {
    meetings.iter().filter(|m| m.date.date() == now.date()).count()
}

pub fn greeting(now: NaiveDateTime) -> &'static str {
    match now.hour() {
        0..=11 => "Good Morning",
        12..=16 => "Good Afternoon",
        _ => "Good Evening",
    }
}

/// Everything the `dashboard` command prints.
#[derive(Debug)]
pub struct Dashboard<'a> {
    pub greeting: &'static str,
    pub range: TimeRange,
    pub meetings_today: usize,
    pub meetings_trend: Trend,
    pub decisions_trend: Trend,
    pub compliance_trend: Trend,
    pub overdue_trend: Trend,
    pub status: StatusCounts,
    pub completion_rate: f64,
    pub upcoming: Vec<&'a Task>,
    pub effectiveness: EffectivenessStats,
    pub impact: Vec<(ImpactLevel, usize)>,
    pub ratings: Vec<(DanielsonScore, usize)>,
}

impl<'a> Dashboard<'a> {
    pub fn build(db: &'a Database, range: TimeRange, now: NaiveDateTime) -> Self {
        let tasks: Vec<&Task> = db.tasks.iter().collect();
        let meetings: Vec<&Meeting> = db.meetings.iter().collect();
        let decisions: Vec<&Decision> = db.decisions.iter().collect();
        let observations: Vec<&Observation> = db.observations.iter().collect();

        let mut by_due = tasks.clone();
        by_due.sort_by_key(|t| t.due);

        Dashboard {
            greeting: greeting(now),
            range,
            meetings_today: today_meetings_count(&meetings, now),
            meetings_trend: meetings_trend(&meetings, range, now),
            decisions_trend: decisions_trend(&decisions, range, now),
            compliance_trend: compliance_trend(&tasks, range, now),
            overdue_trend: overdue_trend(db, &tasks, now),
            status: status_counts(&tasks, now),
            completion_rate: completion_rate(&tasks),
            upcoming: upcoming_tasks(db, &by_due, now),
            effectiveness: effectiveness_stats(&decisions),
            impact: impact_breakdown(&decisions),
            ratings: rating_breakdown(&observations),
        }
    }
}
