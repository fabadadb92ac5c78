//! Filtering and search over stored records.
//!
//! Each record kind has its own filter value. A filter with every field unset
//! is the identity; text search is a case-insensitive substring match and an
//! empty search string is treated as no filter.

use chrono::{Duration, NaiveDateTime};

use crate::db::Database;
use crate::decision::Decision;
use crate::fields::*;
use crate::meeting::Meeting;
use crate::observation::Observation;
use crate::task::{CategoryId, Task};

/// Quiet period before a search-as-you-type query is run.
pub const DEBOUNCE_MILLIS: i64 = 500;

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Lowercased search needle with surrounding whitespace dropped, or `None`
/// when nothing is left. All-space text therefore filters nothing out.
fn needle(search: &Option<String>) -> Option<String> {
    search.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase)
}

fn apply_with<'a, T>(items: &[&'a T], pred: impl Fn(&T) -> bool) -> Vec<&'a T> {
    items.iter().copied().filter(|r| pred(*r)).collect()
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub search: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub category: Option<CategoryId>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(n) = needle(&self.search) {
            let in_detail = task.detail.as_deref().is_some_and(|d| contains_ci(d, &n));
            if !contains_ci(&task.title, &n) && !in_detail {
                return false;
            }
        }
        self.status.map_or(true, |s| task.status == s)
            && self.priority.map_or(true, |p| task.priority == p)
            && self.category.map_or(true, |c| task.category == Some(c))
    }

    pub fn apply<'a>(&self, tasks: &[&'a Task]) -> Vec<&'a Task> {
        apply_with(tasks, |t| self.matches(t))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeetingFilter {
    pub search: Option<String>,
    pub status: Option<MeetingStatus>,
    pub meeting_type: Option<MeetingType>,
}

impl MeetingFilter {
    pub fn matches(&self, meeting: &Meeting) -> bool {
        if let Some(n) = needle(&self.search) {
            let hit = contains_ci(&meeting.title, &n) || meeting.attendees.iter().any(|a| contains_ci(a, &n));
            if !hit {
                return false;
            }
        }
        self.status.map_or(true, |s| meeting.status == s)
            && self.meeting_type.map_or(true, |t| meeting.meeting_type == t)
    }

    pub fn apply<'a>(&self, meetings: &[&'a Meeting]) -> Vec<&'a Meeting> {
        apply_with(meetings, |m| self.matches(m))
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecisionFilter {
    pub search: Option<String>,
    pub effectiveness: Option<Effectiveness>,
    pub impact: Option<ImpactLevel>,
}

impl DecisionFilter {
    pub fn matches(&self, decision: &Decision) -> bool {
        if let Some(n) = needle(&self.search) {
            let hit = contains_ci(&decision.title, &n)
                || decision.detail.as_deref().is_some_and(|d| contains_ci(d, &n))
                || contains_ci(&decision.rationale, &n);
            if !hit {
                return false;
            }
        }
        self.effectiveness.map_or(true, |e| decision.effectiveness == e)
            && self.impact.map_or(true, |i| decision.impact == i)
    }

    pub fn apply<'a>(&self, decisions: &[&'a Decision]) -> Vec<&'a Decision> {
        apply_with(decisions, |d| self.matches(d))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObservationFilter {
    pub search: Option<String>,
    pub rating: Option<DanielsonScore>,
    pub follow_up_only: bool,
}

impl ObservationFilter {
    pub fn matches(&self, obs: &Observation) -> bool {
        if let Some(n) = needle(&self.search) {
            if !contains_ci(&obs.teacher_name, &n) && !contains_ci(&obs.subject, &n) {
                return false;
            }
        }
        self.rating.map_or(true, |r| obs.overall_rating == r) && (!self.follow_up_only || obs.follow_up_required)
    }

    pub fn apply<'a>(&self, observations: &[&'a Observation]) -> Vec<&'a Observation> {
        apply_with(observations, |o| self.matches(o))
    }
}

/// Matches from a cross-record search, one list per record kind.
#[derive(Debug, Default)]
pub struct SearchResults<'a> {
    pub tasks: Vec<&'a Task>,
    pub meetings: Vec<&'a Meeting>,
    pub decisions: Vec<&'a Decision>,
    pub observations: Vec<&'a Observation>,
}

impl SearchResults<'_> {
    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }

    pub fn total_count(&self) -> usize {
        self.tasks.len() + self.meetings.len() + self.decisions.len() + self.observations.len()
    }
}

/// Search every record kind for `query`. A blank query returns nothing.
pub fn search_all<'a>(db: &'a Database, query: &str, category: SearchCategory, sort: SortOrder) -> SearchResults<'a> {
    let query = query.trim();
    let mut results = SearchResults::default();
    if query.is_empty() {
        return results;
    }
    let wanted = |c: SearchCategory| category == SearchCategory::All || category == c;
    let search = Some(query.to_string());

    if wanted(SearchCategory::Tasks) {
        let filter = TaskFilter { search: search.clone(), ..TaskFilter::default() };
        results.tasks = db.tasks.iter().filter(|t| filter.matches(t)).collect();
        sort_records(&mut results.tasks, sort, |t| t.due, |t| t.title.as_str());
    }
    if wanted(SearchCategory::Meetings) {
        let filter = MeetingFilter { search: search.clone(), ..MeetingFilter::default() };
        results.meetings = db.meetings.iter().filter(|m| filter.matches(m)).collect();
        sort_records(&mut results.meetings, sort, |m| m.date, |m| m.title.as_str());
    }
    if wanted(SearchCategory::Decisions) {
        let filter = DecisionFilter { search: search.clone(), ..DecisionFilter::default() };
        results.decisions = db.decisions.iter().filter(|d| filter.matches(d)).collect();
        sort_records(&mut results.decisions, sort, |d| d.date_made, |d| d.title.as_str());
    }
    if wanted(SearchCategory::Observations) {
        let filter = ObservationFilter { search, ..ObservationFilter::default() };
        results.observations = db.observations.iter().filter(|o| filter.matches(o)).collect();
        sort_records(&mut results.observations, sort, |o| o.date, |o| o.teacher_name.as_str());
    }
    results
}

/// Relevance keeps store order; the other orders are stable sorts.
fn sort_records<T>(items: &mut [&T], sort: SortOrder, date: fn(&T) -> NaiveDateTime, name: fn(&T) -> &str) {
    match sort {
        SortOrder::Relevance => {}
        SortOrder::DateAscending => items.sort_by_key(|r| date(*r)),
        SortOrder::DateDescending => items.sort_by(|a, b| date(*b).cmp(&date(*a))),
        SortOrder::Name => items.sort_by_key(|r| name(*r).to_lowercase()),
    }
}

/// Last-input-wins debounce for search-as-you-type.
///
/// Holds no timer; callers feed inputs with their timestamps and poll with the
/// current time.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    pending: Option<(String, NaiveDateTime)>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Debouncer::new(Duration::milliseconds(DEBOUNCE_MILLIS))
    }
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Debouncer { quiet, pending: None }
    }

    /// Record new input, superseding anything still pending.
    pub fn input(&mut self, text: impl Into<String>, at: NaiveDateTime) {
        self.pending = Some((text.into(), at));
    }

    /// Take the pending text once the quiet period has passed since the
    /// latest input. Each input is released at most once.
    pub fn poll(&mut self, now: NaiveDateTime) -> Option<String> {
        match &self.pending {
            Some((_, at)) if now - *at >= self.quiet => self.pending.take().map(|(text, _)| text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap().and_hms_opt(9, 0, 0).unwrap()
    }

    fn task(title: &str, status: Status, priority: Priority) -> Task {
        let mut t = Task::new(title, now(), now());
        t.status = status;
        t.priority = priority;
        t
    }

    #[test]
    fn task_filter_combines_text_status_and_priority() {
        let a = task("Fire Safety inspection", Status::Pending, Priority::High);
        let b = task("Budget review", Status::Pending, Priority::High);
        let c = task("Safety plan", Status::Completed, Priority::High);
        let d = task("safety drills", Status::Pending, Priority::Low);
        let all = vec![&a, &b, &c, &d];

        let filter = TaskFilter {
            search: Some("safety".into()),
            status: Some(Status::Pending),
            priority: Some(Priority::High),
            category: None,
        };
        let out = filter.apply(&all);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Fire Safety inspection");
    }

    #[test]
    fn search_text_ignores_surrounding_whitespace() {
        let a = task("Fire Safety inspection", Status::Pending, Priority::High);
        let b = task("Budget review", Status::Pending, Priority::High);
        let all = vec![&a, &b];
        let out = TaskFilter { search: Some("  SAFETY \t".into()), ..TaskFilter::default() }.apply(&all);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Fire Safety inspection");
    }

    #[test]
    fn empty_filter_is_identity_and_preserves_order() {
        let a = task("One", Status::Pending, Priority::Low);
        let b = task("Two", Status::Completed, Priority::High);
        let all = vec![&b, &a];
        let out = TaskFilter { search: Some("   ".into()), ..TaskFilter::default() }.apply(&all);
        assert_eq!(out.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(), vec!["Two", "One"]);
    }

    #[test]
    fn meeting_search_matches_attendees() {
        let mut m = Meeting::new("Weekly sync", now(), MeetingType::Staff);
        m.attendees = vec!["Dr. Rivera".into(), "Ms. Chen".into()];
        let other = Meeting::new("Board", now(), MeetingType::Admin);
        let all = vec![&m, &other];
        let filter = MeetingFilter { search: Some("chen".into()), ..MeetingFilter::default() };
        assert_eq!(filter.apply(&all).len(), 1);
    }

    #[test]
    fn decision_search_covers_rationale() {
        let d = Decision::new("New bell schedule", "Reduce hallway congestion", now());
        let filter = DecisionFilter { search: Some("HALLWAY".into()), ..DecisionFilter::default() };
        assert!(filter.matches(&d));
        let filter = DecisionFilter { effectiveness: Some(Effectiveness::Effective), ..DecisionFilter::default() };
        assert!(!filter.matches(&d));
    }

    #[test]
    fn observation_filter_follow_up_only() {
        let mut a = Observation::new("Ms. Park", "Algebra", now());
        a.follow_up_required = true;
        let b = Observation::new("Mr. Stone", "Algebra", now());
        let all = vec![&a, &b];
        let filter = ObservationFilter { search: Some("algebra".into()), follow_up_only: true, ..ObservationFilter::default() };
        assert_eq!(filter.apply(&all).len(), 1);
    }

    #[test]
    fn search_all_restricts_and_sorts() {
        let mut db = Database::default();
        db.insert_task(Task::new("Zeta safety", now() + Duration::days(1), now())).unwrap();
        db.insert_task(Task::new("Alpha safety", now() + Duration::days(5), now())).unwrap();
        db.insert_meeting(Meeting::new("Safety committee", now(), MeetingType::Staff)).unwrap();

        let all = search_all(&db, " safety ", SearchCategory::All, SortOrder::Name);
        assert_eq!(all.total_count(), 3);
        assert_eq!(all.tasks[0].title, "Alpha safety");

        let only_meetings = search_all(&db, "safety", SearchCategory::Meetings, SortOrder::Relevance);
        assert!(only_meetings.tasks.is_empty());
        assert_eq!(only_meetings.meetings.len(), 1);

        let newest = search_all(&db, "safety", SearchCategory::Tasks, SortOrder::DateDescending);
        assert_eq!(newest.tasks[0].title, "Alpha safety");

        assert!(search_all(&db, "  ", SearchCategory::All, SortOrder::Relevance).is_empty());
    }

    #[test]
    fn debouncer_releases_latest_input_once() {
        let mut d = Debouncer::default();
        d.input("sa", now());
        d.input("safety", now() + Duration::milliseconds(200));
        assert_eq!(d.poll(now() + Duration::milliseconds(600)), None);
        assert_eq!(d.poll(now() + Duration::milliseconds(700)), Some("safety".to_string()));
        assert_eq!(d.poll(now() + Duration::seconds(5)), None);
    }
}
