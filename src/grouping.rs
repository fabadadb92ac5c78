//! Date buckets for task and meeting lists.

use chrono::{Duration, NaiveDateTime};

use crate::db::start_end_of_week;
use crate::meeting::Meeting;
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskBucket {
    Overdue,
    ThisWeek,
    ThisMonth,
    Later,
}

impl TaskBucket {
    pub const ALL: [TaskBucket; 4] = [
        TaskBucket::Overdue,
        TaskBucket::ThisWeek,
        TaskBucket::ThisMonth,
        TaskBucket::Later,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TaskBucket::Overdue => "Overdue",
            TaskBucket::ThisWeek => "This Week",
            TaskBucket::ThisMonth => "This Month",
            TaskBucket::Later => "Later",
        }
    }

    /// First matching rule wins.
    pub fn of(task: &Task, now: NaiveDateTime) -> Self {
        let days = task.days_to_due(now);
        if task.is_overdue(now) {
            TaskBucket::Overdue
        } else if days <= 7 {
            TaskBucket::ThisWeek
        } else if days <= 30 {
            TaskBucket::ThisMonth
        } else {
            TaskBucket::Later
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingBucket {
    Today,
    Tomorrow,
    ThisWeek,
    Upcoming,
    Past,
}

impl MeetingBucket {
    pub const ALL: [MeetingBucket; 5] = [
        MeetingBucket::Today,
        MeetingBucket::Tomorrow,
        MeetingBucket::ThisWeek,
        MeetingBucket::Upcoming,
        MeetingBucket::Past,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MeetingBucket::Today => "Today",
            MeetingBucket::Tomorrow => "Tomorrow",
            MeetingBucket::ThisWeek => "This Week",
            MeetingBucket::Upcoming => "Upcoming",
            MeetingBucket::Past => "Past",
        }
    }

    /// Calendar-day rules come first, so a meeting earlier today is still
    /// `Today` and one earlier this week is `ThisWeek`.
    pub fn of(meeting: &Meeting, now: NaiveDateTime) -> Self {
        let day = meeting.date.date();
        let today = now.date();
        let (week_start, week_end) = start_end_of_week(today);
        if day == today {
            MeetingBucket::Today
        } else if day == today + Duration::days(1) {
            MeetingBucket::Tomorrow
        } else if day >= week_start && day <= week_end {
            MeetingBucket::ThisWeek
        } else if meeting.date > now {
            MeetingBucket::Upcoming
        } else {
            MeetingBucket::Past
        }
    }
}

/// Partition tasks into buckets. Only non-empty buckets are returned, in
/// fixed order, each sorted by due date (ties keep input order).
pub fn group_tasks<'a>(tasks: &[&'a Task], now: NaiveDateTime) -> Vec<(TaskBucket, Vec<&'a Task>)> {
    TaskBucket::ALL
        .iter()
        .filter_map(|&bucket| {
            let mut items: Vec<&Task> = tasks.iter().copied().filter(|t| TaskBucket::of(t, now) == bucket).collect();
            items.sort_by_key(|t| t.due);
            (!items.is_empty()).then_some((bucket, items))
        })
        .collect()
}

/// Partition meetings into buckets, same shape as `group_tasks`.
pub fn group_meetings<'a>(meetings: &[&'a Meeting], now: NaiveDateTime) -> Vec<(MeetingBucket, Vec<&'a Meeting>)> {
    MeetingBucket::ALL
        .iter()
        .filter_map(|&bucket| {
            let mut items: Vec<&Meeting> = meetings.iter().copied().filter(|m| MeetingBucket::of(m, now) == bucket).collect();
            items.sort_by_key(|m| m.date);
            (!items.is_empty()).then_some((bucket, items))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{MeetingType, Status};
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    // Wednesday
    fn now() -> NaiveDateTime {
        at(2025, 3, 12, 9)
    }

    #[test]
    fn tasks_fall_into_fixed_buckets() {
        let overdue = Task::new("Overdue", now() - Duration::days(2), now());
        let week = Task::new("Week", now() + Duration::days(7), now());
        let month = Task::new("Month", now() + Duration::days(20), now());
        let later = Task::new("Later", now() + Duration::days(45), now());
        let all = vec![&later, &month, &week, &overdue];

        let groups = group_tasks(&all, now());
        let labels: Vec<&str> = groups.iter().map(|(b, _)| b.label()).collect();
        assert_eq!(labels, vec!["Overdue", "This Week", "This Month", "Later"]);
        let total: usize = groups.iter().map(|(_, items)| items.len()).sum();
        assert_eq!(total, all.len());
    }

    #[test]
    fn completed_past_due_task_is_not_overdue_bucket() {
        let mut done = Task::new("Done", now() - Duration::days(3), now());
        done.status = Status::Completed;
        assert_eq!(TaskBucket::of(&done, now()), TaskBucket::ThisWeek);
    }

    #[test]
    fn buckets_are_sorted_and_empty_ones_omitted() {
        let b = Task::new("B", now() + Duration::days(5), now());
        let a = Task::new("A", now() + Duration::days(1), now());
        let groups = group_tasks(&[&b, &a], now());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, TaskBucket::ThisWeek);
        assert_eq!(groups[0].1.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn meetings_use_calendar_rules() {
        let m = |title: &str, date| Meeting::new(title, date, MeetingType::Staff);
        let earlier_today = m("Earlier today", at(2025, 3, 12, 7));
        let tomorrow = m("Tomorrow", at(2025, 3, 13, 10));
        let monday = m("Monday", at(2025, 3, 10, 10));
        let sunday = m("Sunday", at(2025, 3, 16, 10));
        let next_week = m("Next week", at(2025, 3, 18, 10));
        let last_month = m("Last month", at(2025, 2, 3, 10));

        assert_eq!(MeetingBucket::of(&earlier_today, now()), MeetingBucket::Today);
        assert_eq!(MeetingBucket::of(&tomorrow, now()), MeetingBucket::Tomorrow);
        assert_eq!(MeetingBucket::of(&monday, now()), MeetingBucket::ThisWeek);
        assert_eq!(MeetingBucket::of(&sunday, now()), MeetingBucket::ThisWeek);
        assert_eq!(MeetingBucket::of(&next_week, now()), MeetingBucket::Upcoming);
        assert_eq!(MeetingBucket::of(&last_month, now()), MeetingBucket::Past);

        let all = vec![&last_month, &next_week, &sunday, &monday, &tomorrow, &earlier_today];
        let groups = group_meetings(&all, now());
        let labels: Vec<&str> = groups.iter().map(|(b, _)| b.label()).collect();
        assert_eq!(labels, vec!["Today", "Tomorrow", "This Week", "Upcoming", "Past"]);
        assert_eq!(groups[2].1[0].title, "Monday");
    }

    #[test]
    fn tomorrow_wins_across_the_week_boundary() {
        // Sunday evening; Monday starts a new week.
        let sunday = at(2025, 3, 16, 20);
        let monday = Meeting::new("Monday briefing", at(2025, 3, 17, 8), MeetingType::Staff);
        let tuesday = Meeting::new("Tuesday", at(2025, 3, 18, 8), MeetingType::Staff);
        assert_eq!(MeetingBucket::of(&monday, sunday), MeetingBucket::Tomorrow);
        assert_eq!(MeetingBucket::of(&tuesday, sunday), MeetingBucket::Upcoming);

        // Same across a month and year end.
        let new_year = Meeting::new("Kickoff", at(2026, 1, 1, 9), MeetingType::Staff);
        assert_eq!(MeetingBucket::of(&new_year, at(2025, 12, 31, 18)), MeetingBucket::Tomorrow);
    }
}
