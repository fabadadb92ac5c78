//! Task and category records.
//!
//! A `Task` is a compliance, general or meeting follow-up item with a due date,
//! optional parent and an ordered list of subtasks. A `Category` owns the tasks
//! filed under it. Relationships are plain id fields; the store in `db.rs`
//! keeps both sides of each link consistent.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::fields::*;
use crate::meeting::MeetingId;

pub type TaskId = u64;
pub type CategoryId = u64;

/// A dated work item with hierarchy and an optional meeting link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub detail: Option<String>,
    pub created: NaiveDateTime,
    pub due: NaiveDateTime,
    pub completed: Option<NaiveDateTime>,
    pub status: Status,
    pub priority: Priority,
    pub task_type: TaskType,
    pub parent: Option<TaskId>,
    #[serde(default)]
    pub subtasks: Vec<TaskId>,
    pub meeting: Option<MeetingId>,
    pub category: Option<CategoryId>,
}

impl Task {
    /// Build an unsaved task. The store assigns the id on insert.
    pub fn new(title: impl Into<String>, due: NaiveDateTime, now: NaiveDateTime) -> Self {
        Task {
            id: 0,
            title: title.into(),
            detail: None,
            created: now,
            due,
            completed: None,
            status: Status::Pending,
            priority: Priority::Medium,
            task_type: TaskType::General,
            parent: None,
            subtasks: Vec::new(),
            meeting: None,
            category: None,
        }
    }

    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        self.status != Status::Completed && self.due < now
    }

    /// Whole calendar days from `now` to the due date; negative once past.
    pub fn days_to_due(&self, now: NaiveDateTime) -> i64 {
        (self.due.date() - now.date()).num_days()
    }

    pub fn due_text(&self, now: NaiveDateTime) -> String {
        let days = self.days_to_due(now);
        if self.is_overdue(now) {
            format!("Overdue by {}", plural_days(days.abs()))
        } else if days == 0 {
            "Due today".to_string()
        } else {
            format!("Due in {}", plural_days(days))
        }
    }
}

fn plural_days(n: i64) -> String {
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{n} days")
    }
}

/// Named group of tasks. Deleting a category deletes its tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    #[serde(default)]
    pub tasks: Vec<TaskId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn due_today_is_zero_days_and_not_overdue_until_the_hour_passes() {
        let now = at(2025, 3, 12, 9);
        let task = Task::new("Fire drill log", at(2025, 3, 12, 17), now);
        assert_eq!(task.days_to_due(now), 0);
        assert!(!task.is_overdue(now));
        assert_eq!(task.due_text(now), "Due today");
    }

    #[test]
    fn days_to_due_counts_calendar_days_not_hours() {
        let now = at(2025, 3, 12, 23);
        let task = Task::new("Badge audit", at(2025, 3, 13, 1), now);
        assert_eq!(task.days_to_due(now), 1);
        assert_eq!(task.due_text(now), "Due in 1 day");
    }

    #[test]
    fn overdue_by_three_days() {
        let now = at(2025, 3, 12, 9);
        let task = Task::new("Title IX training", now - Duration::days(3), now);
        assert!(task.is_overdue(now));
        assert_eq!(task.days_to_due(now), -3);
        assert_eq!(task.due_text(now), "Overdue by 3 days");
    }

    #[test]
    fn completed_tasks_are_never_overdue() {
        let now = at(2025, 3, 12, 9);
        let mut task = Task::new("Inventory", now - Duration::days(10), now);
        task.status = Status::Completed;
        assert!(!task.is_overdue(now));
    }
}
