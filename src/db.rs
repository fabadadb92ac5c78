//! Entity store and utility functions.
//!
//! This module provides the `Database` struct holding every record collection,
//! the insert/update/delete entry points that keep id references consistent
//! (including cascade and orphan rules), a small predicate + sort + limit query
//! API, and helpers for date parsing and text formatting used by the commands.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::decision::{Decision, DecisionId};
use crate::error::{StoreError, StoreResult};
use crate::fields::*;
use crate::meeting::{Meeting, MeetingId};
use crate::observation::{ComponentId, Observation, ObservationId, RubricComponent};
use crate::task::{Category, CategoryId, Task, TaskId};

/// Subtask chains deeper than this are treated as corrupt and cut off.
const MAX_DEPTH: usize = 64;

/// Largest count accepted by "in N<unit>" date input.
const MAX_OFFSET_DAYS: i64 = 10_000;

/// In-memory store for all records, persisted as a single JSON document.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
    #[serde(default)]
    pub decisions: Vec<Decision>,
    #[serde(default)]
    pub observations: Vec<Observation>,
    #[serde(default)]
    pub components: Vec<RubricComponent>,
}

/// A record type with its own collection in the store.
pub trait Record: Sized {
    const KIND: &'static str;
    fn id(&self) -> u64;
    /// Human name used for lookups by title.
    fn name(&self) -> &str;
    fn collection(db: &Database) -> &[Self];
}

impl Record for Task {
    const KIND: &'static str = "task";
    fn id(&self) -> u64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.title
    }
    fn collection(db: &Database) -> &[Self] {
        &db.tasks
    }
}

impl Record for Category {
    const KIND: &'static str = "category";
    fn id(&self) -> u64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.title
    }
    fn collection(db: &Database) -> &[Self] {
        &db.categories
    }
}

impl Record for Meeting {
    const KIND: &'static str = "meeting";
    fn id(&self) -> u64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.title
    }
    fn collection(db: &Database) -> &[Self] {
        &db.meetings
    }
}

impl Record for Decision {
    const KIND: &'static str = "decision";
    fn id(&self) -> u64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.title
    }
    fn collection(db: &Database) -> &[Self] {
        &db.decisions
    }
}

impl Record for Observation {
    const KIND: &'static str = "observation";
    fn id(&self) -> u64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.teacher_name
    }
    fn collection(db: &Database) -> &[Self] {
        &db.observations
    }
}

impl Record for RubricComponent {
    const KIND: &'static str = "component";
    fn id(&self) -> u64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.number
    }
    fn collection(db: &Database) -> &[Self] {
        &db.components
    }
}

type Predicate<'a, T> = Box<dyn Fn(&T) -> bool + 'a>;
type Comparator<'a, T> = Box<dyn Fn(&T, &T) -> Ordering + 'a>;

/// Query description: optional predicate, sort order and result limit.
/// The limit is applied after sorting.
pub struct Fetch<'a, T> {
    predicate: Option<Predicate<'a, T>>,
    sort: Option<Comparator<'a, T>>,
    limit: Option<usize>,
}

impl<'a, T> Fetch<'a, T> {
    pub fn all() -> Self {
        Fetch { predicate: None, sort: None, limit: None }
    }

    pub fn filter(mut self, predicate: impl Fn(&T) -> bool + 'a) -> Self {
        self.predicate = Some(Box::new(predicate));
        self
    }

    pub fn sort_by(mut self, cmp: impl Fn(&T, &T) -> Ordering + 'a) -> Self {
        self.sort = Some(Box::new(cmp));
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    fn matches(&self, record: &T) -> bool {
        self.predicate.as_ref().map_or(true, |p| p(record))
    }
}

impl Database {
    /// Load the store from a JSON file. A missing or blank file is an empty store;
    /// a file that cannot be read or parsed is an error.
    pub fn load(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            debug!("event=store_load status=missing path={}", path.display());
            return Ok(Database::default());
        }
        let buf = fs::read_to_string(path)?;
        if buf.trim().is_empty() {
            return Ok(Database::default());
        }
        let db: Database = serde_json::from_str(&buf)?;
        debug!(
            "event=store_load status=ok tasks={} meetings={} decisions={} observations={}",
            db.tasks.len(),
            db.meetings.len(),
            db.decisions.len(),
            db.observations.len()
        );
        Ok(db)
    }

    /// Load for read-only summaries: any failure degrades to an empty store.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(db) => db,
            Err(err) => {
                warn!("event=store_load status=degraded path={} error={err}", path.display());
                Database::default()
            }
        }
    }

    /// Save the store to a JSON file using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(self)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        debug!("event=store_save status=ok path={}", path.display());
        Ok(())
    }

    /// Next free id in the collection of `T`.
    pub fn next_id<T: Record>(&self) -> u64 {
        T::collection(self).iter().map(Record::id).max().unwrap_or(0) + 1
    }

    pub fn fetch<T: Record>(&self, fetch: &Fetch<'_, T>) -> Vec<&T> {
        let mut out: Vec<&T> = T::collection(self).iter().filter(|r| fetch.matches(r)).collect();
        if let Some(cmp) = &fetch.sort {
            out.sort_by(|a, b| cmp(*a, *b));
        }
        if let Some(n) = fetch.limit {
            out.truncate(n);
        }
        out
    }

    pub fn count<T: Record>(&self, predicate: impl Fn(&T) -> bool) -> usize {
        T::collection(self).iter().filter(|r| predicate(*r)).count()
    }

    pub fn get<T: Record>(&self, id: u64) -> Option<&T> {
        T::collection(self).iter().find(|r| r.id() == id)
    }

    fn require<T: Record>(&self, id: u64) -> StoreResult<&T> {
        self.get::<T>(id).ok_or_else(|| StoreError::not_found(T::KIND, id))
    }

    fn require_meeting(&self, meeting: Option<MeetingId>) -> StoreResult<()> {
        if let Some(id) = meeting {
            self.require::<Meeting>(id)?;
        }
        Ok(())
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.get(id)
    }

    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.get(id)
    }

    pub fn meeting(&self, id: MeetingId) -> Option<&Meeting> {
        self.get(id)
    }

    pub fn decision(&self, id: DecisionId) -> Option<&Decision> {
        self.get(id)
    }

    pub fn decision_mut(&mut self, id: DecisionId) -> Option<&mut Decision> {
        self.decisions.iter_mut().find(|d| d.id == id)
    }

    pub fn observation(&self, id: ObservationId) -> Option<&Observation> {
        self.get(id)
    }

    pub fn component(&self, id: ComponentId) -> Option<&RubricComponent> {
        self.get(id)
    }

    // ----- inserts -----

    /// Insert a task, linking it into its parent's subtask list and its
    /// category. Any subtasks listed on the incoming value are ignored.
    pub fn insert_task(&mut self, mut task: Task) -> StoreResult<TaskId> {
        if !is_valid_text(&task.title) {
            return Err(StoreError::invalid("task title cannot be empty"));
        }
        if let Some(p) = task.parent {
            self.require::<Task>(p)?;
        }
        if let Some(c) = task.category {
            self.require::<Category>(c)?;
        }
        self.require_meeting(task.meeting)?;

        let id = self.next_id::<Task>();
        task.id = id;
        task.title = task.title.trim().to_string();
        task.subtasks.clear();
        if task.status == Status::Completed && task.completed.is_none() {
            task.completed = Some(task.created);
        }
        let (parent, category) = (task.parent, task.category);
        self.tasks.push(task);

        if let Some(p) = parent.and_then(|p| self.task_mut(p)) {
            p.subtasks.push(id);
        }
        if let Some(c) = category.and_then(|c| self.categories.iter_mut().find(|x| x.id == c)) {
            c.tasks.push(id);
        }
        info!("event=task_insert id={id}");
        Ok(id)
    }

    /// Insert a category, or return the existing one with the same title
    /// (compared trimmed and case-insensitively).
    pub fn insert_category(&mut self, title: &str) -> StoreResult<CategoryId> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StoreError::invalid("category title cannot be empty"));
        }
        let lowered = title.to_lowercase();
        if let Some(existing) = self.categories.iter().find(|c| c.title.to_lowercase() == lowered) {
            return Ok(existing.id);
        }
        let id = self.next_id::<Category>();
        self.categories.push(Category { id, title: title.to_string(), tasks: Vec::new() });
        info!("event=category_insert id={id}");
        Ok(id)
    }

    pub fn insert_meeting(&mut self, mut meeting: Meeting) -> StoreResult<MeetingId> {
        validate_meeting(&meeting)?;
        let id = self.next_id::<Meeting>();
        meeting.id = id;
        meeting.title = meeting.title.trim().to_string();
        meeting.attendees = normalise_attendees(&meeting.attendees);
        self.meetings.push(meeting);
        info!("event=meeting_insert id={id}");
        Ok(id)
    }

    pub fn insert_decision(&mut self, mut decision: Decision) -> StoreResult<DecisionId> {
        if !is_valid_text(&decision.title) || !is_valid_text(&decision.rationale) {
            return Err(StoreError::invalid("decision needs a title and a rationale"));
        }
        self.require_meeting(decision.meeting)?;
        let id = self.next_id::<Decision>();
        decision.id = id;
        decision.title = decision.title.trim().to_string();
        self.decisions.push(decision);
        info!("event=decision_insert id={id}");
        Ok(id)
    }

    /// Insert an observation. Components are attached afterwards with
    /// `insert_component`.
    pub fn insert_observation(&mut self, mut obs: Observation) -> StoreResult<ObservationId> {
        if !is_valid_text(&obs.teacher_name) || !is_valid_text(&obs.subject) {
            return Err(StoreError::invalid("observation needs a teacher name and a subject"));
        }
        self.require_meeting(obs.meeting)?;
        let id = self.next_id::<Observation>();
        obs.id = id;
        obs.teacher_name = obs.teacher_name.trim().to_string();
        obs.subject = obs.subject.trim().to_string();
        if !obs.follow_up_required {
            obs.follow_up_date = None;
        }
        obs.components.clear();
        self.observations.push(obs);
        info!("event=observation_insert id={id}");
        Ok(id)
    }

    pub fn insert_component(&mut self, observation: ObservationId, mut component: RubricComponent) -> StoreResult<ComponentId> {
        self.require::<Observation>(observation)?;
        let id = self.next_id::<RubricComponent>();
        component.id = id;
        component.observation = Some(observation);
        self.components.push(component);
        if let Some(obs) = self.observations.iter_mut().find(|o| o.id == observation) {
            obs.components.push(id);
        }
        debug!("event=component_insert id={id} observation={observation}");
        Ok(id)
    }

    // ----- updates -----

    /// Change a task's status. Entering `Completed` stamps the completion time;
    /// any other status clears it.
    pub fn set_task_status(&mut self, id: TaskId, status: Status, now: NaiveDateTime) -> StoreResult<()> {
        let task = self.task_mut(id).ok_or_else(|| StoreError::not_found("task", id))?;
        if status == Status::Completed {
            if task.status != Status::Completed || task.completed.is_none() {
                task.completed = Some(now);
            }
        } else {
            task.completed = None;
        }
        task.status = status;
        info!("event=task_status id={id} status={status:?}");
        Ok(())
    }

    /// Attach `child` under `parent`, detaching it from any previous parent.
    pub fn add_subtask(&mut self, parent: TaskId, child: TaskId) -> StoreResult<()> {
        self.require::<Task>(parent)?;
        self.require::<Task>(child)?;
        if parent == child || collect_ancestors(parent, self).contains(&child) {
            return Err(StoreError::invalid(format!("task {child} cannot become a subtask of {parent}: cycle")));
        }
        if let Some(old) = self.task(child).and_then(|t| t.parent) {
            if let Some(p) = self.task_mut(old) {
                p.subtasks.retain(|&s| s != child);
            }
        }
        if let Some(p) = self.task_mut(parent) {
            if !p.subtasks.contains(&child) {
                p.subtasks.push(child);
            }
        }
        if let Some(c) = self.task_mut(child) {
            c.parent = Some(parent);
        }
        Ok(())
    }

    /// Detach `child` from `parent`. The child survives as a top-level task.
    pub fn remove_subtask(&mut self, parent: TaskId, child: TaskId) -> StoreResult<()> {
        let p = self.task_mut(parent).ok_or_else(|| StoreError::not_found("task", parent))?;
        if !p.subtasks.contains(&child) {
            return Err(StoreError::invalid(format!("task {child} is not a subtask of {parent}")));
        }
        p.subtasks.retain(|&s| s != child);
        if let Some(c) = self.task_mut(child) {
            c.parent = None;
        }
        Ok(())
    }

    pub fn link_task_meeting(&mut self, id: TaskId, meeting: Option<MeetingId>) -> StoreResult<()> {
        self.require_meeting(meeting)?;
        let task = self.task_mut(id).ok_or_else(|| StoreError::not_found("task", id))?;
        task.meeting = meeting;
        Ok(())
    }

    /// Move a task to another category (or none), updating both categories.
    pub fn set_task_category(&mut self, id: TaskId, category: Option<CategoryId>) -> StoreResult<()> {
        if let Some(c) = category {
            self.require::<Category>(c)?;
        }
        let task = self.task_mut(id).ok_or_else(|| StoreError::not_found("task", id))?;
        let old = std::mem::replace(&mut task.category, category);
        if let Some(c) = old.and_then(|o| self.categories.iter_mut().find(|x| x.id == o)) {
            c.tasks.retain(|&t| t != id);
        }
        if let Some(c) = category.and_then(|n| self.categories.iter_mut().find(|x| x.id == n)) {
            if !c.tasks.contains(&id) {
                c.tasks.push(id);
            }
        }
        Ok(())
    }

    /// Replace a stored meeting, keeping its id.
    pub fn update_meeting(&mut self, meeting: Meeting) -> StoreResult<()> {
        validate_meeting(&meeting)?;
        let id = meeting.id;
        let slot = self
            .meetings
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| StoreError::not_found("meeting", id))?;
        *slot = Meeting {
            attendees: normalise_attendees(&meeting.attendees),
            title: meeting.title.trim().to_string(),
            ..meeting
        };
        info!("event=meeting_update id={id}");
        Ok(())
    }

    /// Change a meeting's status. Linked follow-up tasks keep their own status.
    pub fn set_meeting_status(&mut self, id: MeetingId, status: MeetingStatus) -> StoreResult<()> {
        let meeting = self
            .meetings
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| StoreError::not_found("meeting", id))?;
        meeting.status = status;
        info!("event=meeting_status id={id} status={status:?}");
        Ok(())
    }

    pub fn review_decision(&mut self, id: DecisionId, effectiveness: Effectiveness, reflection: Option<String>) -> StoreResult<()> {
        let decision = self.decision_mut(id).ok_or_else(|| StoreError::not_found("decision", id))?;
        decision.effectiveness = effectiveness;
        if let Some(text) = reflection.filter(|r| is_valid_text(r)) {
            decision.reflection = Some(text.trim().to_string());
        }
        info!("event=decision_review id={id} effectiveness={effectiveness:?}");
        Ok(())
    }

    // ----- deletes -----

    /// Delete a task and all its descendants. Returns the number removed.
    pub fn delete_task(&mut self, id: TaskId) -> StoreResult<usize> {
        self.require::<Task>(id)?;
        let child_map = build_children_map(&self.tasks);
        let mut ids = HashSet::from([id]);
        collect_descendants(id, &child_map, &mut ids);
        let removed = self.remove_tasks(&ids);
        info!("event=task_delete id={id} removed={removed}");
        Ok(removed)
    }

    /// Delete a category together with its tasks (and their subtasks).
    pub fn delete_category(&mut self, id: CategoryId) -> StoreResult<usize> {
        let category = self.require::<Category>(id)?;
        let child_map = build_children_map(&self.tasks);
        let mut ids: HashSet<TaskId> = category.tasks.iter().copied().collect();
        ids.extend(self.tasks.iter().filter(|t| t.category == Some(id)).map(|t| t.id));
        for root in ids.clone() {
            collect_descendants(root, &child_map, &mut ids);
        }
        let removed = self.remove_tasks(&ids);
        self.categories.retain(|c| c.id != id);
        info!("event=category_delete id={id} tasks_removed={removed}");
        Ok(removed + 1)
    }

    /// Delete a meeting. Records that referenced it keep existing with their
    /// `meeting` field cleared.
    pub fn delete_meeting(&mut self, id: MeetingId) -> StoreResult<usize> {
        self.require::<Meeting>(id)?;
        self.meetings.retain(|m| m.id != id);
        let mut orphaned = 0usize;
        for t in self.tasks.iter_mut().filter(|t| t.meeting == Some(id)) {
            t.meeting = None;
            orphaned += 1;
        }
        for d in self.decisions.iter_mut().filter(|d| d.meeting == Some(id)) {
            d.meeting = None;
            orphaned += 1;
        }
        for o in self.observations.iter_mut().filter(|o| o.meeting == Some(id)) {
            o.meeting = None;
            orphaned += 1;
        }
        info!("event=meeting_delete id={id} orphaned={orphaned}");
        Ok(1)
    }

    pub fn delete_decision(&mut self, id: DecisionId) -> StoreResult<usize> {
        self.require::<Decision>(id)?;
        self.decisions.retain(|d| d.id != id);
        info!("event=decision_delete id={id}");
        Ok(1)
    }

    /// Delete an observation and its rubric components.
    pub fn delete_observation(&mut self, id: ObservationId) -> StoreResult<usize> {
        let owned: HashSet<ComponentId> = self.require::<Observation>(id)?.components.iter().copied().collect();
        let before = self.components.len();
        self.components.retain(|c| c.observation != Some(id) && !owned.contains(&c.id));
        let removed = before - self.components.len();
        self.observations.retain(|o| o.id != id);
        info!("event=observation_delete id={id} components_removed={removed}");
        Ok(removed + 1)
    }

    pub fn delete_component(&mut self, id: ComponentId) -> StoreResult<usize> {
        self.require::<RubricComponent>(id)?;
        self.components.retain(|c| c.id != id);
        for o in self.observations.iter_mut() {
            o.components.retain(|&c| c != id);
        }
        Ok(1)
    }

    /// Remove tasks by id and clear every reference that pointed at them.
    fn remove_tasks(&mut self, ids: &HashSet<TaskId>) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !ids.contains(&t.id));
        for t in self.tasks.iter_mut() {
            if t.parent.is_some_and(|p| ids.contains(&p)) {
                t.parent = None;
            }
            t.subtasks.retain(|s| !ids.contains(s));
        }
        for c in self.categories.iter_mut() {
            c.tasks.retain(|t| !ids.contains(t));
        }
        before - self.tasks.len()
    }

    // ----- derived -----

    /// Resolved subtasks in their stored order; dangling ids are skipped.
    pub fn subtasks_of(&self, task: &Task) -> Vec<&Task> {
        task.subtasks.iter().filter_map(|&id| self.task(id)).collect()
    }

    /// A task with subtasks is complete when every subtask is; otherwise its
    /// status decides.
    pub fn is_task_completed(&self, task: &Task) -> bool {
        self.completed_at_depth(task, 0)
    }

    fn completed_at_depth(&self, task: &Task, depth: usize) -> bool {
        let children = self.subtasks_of(task);
        if children.is_empty() || depth >= MAX_DEPTH {
            return task.status == Status::Completed;
        }
        children.iter().all(|c| self.completed_at_depth(c, depth + 1))
    }

    pub fn remaining_subtask_count(&self, task: &Task) -> usize {
        self.subtasks_of(task).iter().filter(|s| !self.is_task_completed(s)).count()
    }

    pub fn components_of(&self, obs: &Observation) -> Vec<&RubricComponent> {
        obs.components.iter().filter_map(|&id| self.component(id)).collect()
    }

    /// Mean numeric component score, or 0.0 for an unscored observation.
    pub fn observation_average(&self, obs: &Observation) -> f64 {
        let components = self.components_of(obs);
        if components.is_empty() {
            return 0.0;
        }
        let total: u32 = components.iter().map(|c| u32::from(c.score.numeric())).sum();
        f64::from(total) / components.len() as f64
    }

    pub fn observation_band(&self, obs: &Observation) -> DanielsonScore {
        DanielsonScore::from_average(self.observation_average(obs))
    }

    pub fn meeting_tasks(&self, id: MeetingId) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.meeting == Some(id)).collect()
    }

    pub fn meeting_decisions(&self, id: MeetingId) -> Vec<&Decision> {
        self.decisions.iter().filter(|d| d.meeting == Some(id)).collect()
    }

    pub fn meeting_observations(&self, id: MeetingId) -> Vec<&Observation> {
        self.observations.iter().filter(|o| o.meeting == Some(id)).collect()
    }
}

fn validate_meeting(meeting: &Meeting) -> StoreResult<()> {
    if !is_valid_text(&meeting.title) {
        return Err(StoreError::invalid("meeting title cannot be empty"));
    }
    if meeting.end < meeting.start {
        return Err(StoreError::invalid("meeting cannot end before it starts"));
    }
    Ok(())
}

/// True when the text has something other than whitespace.
pub fn is_valid_text(s: &str) -> bool {
    !s.trim().is_empty()
}

/// Split comma-separated attendee inputs, trim, and drop blanks. Order is kept.
pub fn normalise_attendees(inputs: &[String]) -> Vec<String> {
    inputs
        .iter()
        .flat_map(|raw| raw.split(','))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse human-readable date input relative to `today`.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "monday".."sunday", "next friday", "this friday"
/// - "end of week", "end of month"
/// - "in 3d", "in 2w", "in 1m"
/// - "YYYY-MM-DD" and "YYYY-MM-DD HH:MM"
///
/// Date-only forms are placed at `default_time`.
pub fn parse_when_input(s: &str, today: NaiveDate, default_time: NaiveTime) -> Option<NaiveDateTime> {
    let s = s.trim().to_lowercase();
    if let Ok(dt) = NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M") {
        return Some(dt);
    }
    parse_date_input(&s, today).map(|d| d.and_time(default_time))
}

fn parse_date_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    match s {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        "end of week" | "eow" => {
            let (_, end) = start_end_of_week(today);
            return Some(end);
        }
        "end of month" | "eom" => {
            let (year, month) = (today.year(), today.month());
            let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
            let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
            return Some(first_of_next - Duration::days(1));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let rest = rest.trim();
        let unit = rest.chars().last()?;
        let n: i64 = rest[..rest.len() - unit.len_utf8()].trim().parse().ok()?;
        if n.abs() > MAX_OFFSET_DAYS {
            return None;
        }
        let days = match unit {
            'd' => n,
            'w' => n * 7,
            // Approximate: 30 days per month
            'm' => n * 30,
            _ => return None,
        };
        return today.checked_add_signed(Duration::days(days));
    }

    let weekdays = [
        ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
        ("friday", 4), ("saturday", 5), ("sunday", 6),
        ("mon", 0), ("tue", 1), ("wed", 2), ("thu", 3),
        ("fri", 4), ("sat", 5), ("sun", 6),
    ];
    let current = today.weekday().num_days_from_monday() as i64;
    for (name, target) in weekdays {
        let ahead = (target + 7 - current) % 7;
        if s == name || s == format!("this {name}") {
            return Some(today + Duration::days(ahead));
        }
        if s == format!("next {name}") {
            let add = if ahead == 0 { 7 } else { ahead + 7 };
            return Some(today + Duration::days(add));
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Start and end dates of the Monday-to-Sunday week containing `day`.
pub fn start_end_of_week(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = day.weekday().num_days_from_monday() as i64;
    let start = day - Duration::days(weekday);
    (start, start + Duration::days(6))
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// Build a map of parent task ids to their children's ids.
pub fn build_children_map(tasks: &[Task]) -> BTreeMap<TaskId, Vec<TaskId>> {
    let mut map: BTreeMap<TaskId, Vec<TaskId>> = BTreeMap::new();
    for t in tasks {
        if let Some(p) = t.parent {
            map.entry(p).or_default().push(t.id);
        }
    }
    map
}

/// Recursively collect all descendant task ids from a root task.
pub fn collect_descendants(root: TaskId, child_map: &BTreeMap<TaskId, Vec<TaskId>>, out: &mut HashSet<TaskId>) {
    if let Some(children) = child_map.get(&root) {
        for &c in children {
            if out.insert(c) {
                collect_descendants(c, child_map, out);
            }
        }
    }
}

/// Ancestor ids of a task, closest first.
pub fn collect_ancestors(mut id: TaskId, db: &Database) -> Vec<TaskId> {
    let mut chain = Vec::new();
    while let Some(p) = db.task(id).and_then(|t| t.parent) {
        if chain.contains(&p) || chain.len() > MAX_DEPTH {
            break;
        }
        chain.push(p);
        id = p;
    }
    chain
}

/// Resolve an identifier (numeric id or exact, case-insensitive name) to an id.
/// Ambiguous names are rejected with the candidate ids listed.
pub fn resolve_identifier<T: Record>(identifier: &str, db: &Database) -> StoreResult<u64> {
    if let Ok(id) = identifier.trim().parse::<u64>() {
        return db.get::<T>(id).map(Record::id).ok_or_else(|| StoreError::not_found(T::KIND, id));
    }
    let wanted = identifier.trim().to_lowercase();
    let matches: Vec<&T> = T::collection(db).iter().filter(|r| r.name().to_lowercase() == wanted).collect();
    match matches.as_slice() {
        [] => Err(StoreError::invalid(format!("no {} named '{}'", T::KIND, identifier))),
        [only] => Ok(only.id()),
        many => {
            let ids: Vec<String> = many.iter().map(|r| r.id().to_string()).collect();
            Err(StoreError::invalid(format!(
                "multiple {}s named '{}' (ids {}); use the id instead",
                T::KIND,
                identifier,
                ids.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{DanielsonDomain, MeetingType};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap().and_hms_opt(9, 0, 0).unwrap()
    }

    fn add_task(db: &mut Database, title: &str, parent: Option<TaskId>) -> TaskId {
        let mut t = Task::new(title, now() + Duration::days(3), now());
        t.parent = parent;
        db.insert_task(t).unwrap()
    }

    #[test]
    fn insert_links_parent_and_category() {
        let mut db = Database::default();
        let cat = db.insert_category("Safety").unwrap();
        let mut root = Task::new("Fire drills", now(), now());
        root.category = Some(cat);
        let root = db.insert_task(root).unwrap();
        let child = add_task(&mut db, "Log drill 1", Some(root));

        assert_eq!(db.task(root).unwrap().subtasks, vec![child]);
        assert_eq!(db.category(cat).unwrap().tasks, vec![root]);
        assert_eq!(db.insert_category("  safety ").unwrap(), cat);
        assert_eq!(db.categories.len(), 1);
    }

    #[test]
    fn insert_rejects_blank_titles_and_unknown_references() {
        let mut db = Database::default();
        assert!(matches!(db.insert_task(Task::new("   ", now(), now())), Err(StoreError::Validation(_))));
        let mut t = Task::new("Audit", now(), now());
        t.meeting = Some(42);
        assert!(matches!(db.insert_task(t), Err(StoreError::NotFound { kind: "meeting", id: 42 })));
    }

    #[test]
    fn meeting_cannot_end_before_start() {
        let mut db = Database::default();
        let mut m = Meeting::new("Staff", now(), MeetingType::Staff);
        m.end = now() - Duration::minutes(5);
        assert!(db.insert_meeting(m).is_err());
    }

    #[test]
    fn completion_follows_subtasks_recursively() {
        let mut db = Database::default();
        let root = add_task(&mut db, "Root", None);
        let a = add_task(&mut db, "A", Some(root));
        let b = add_task(&mut db, "B", Some(root));
        let b1 = add_task(&mut db, "B1", Some(b));

        // The parent's own status does not matter once it has subtasks.
        db.set_task_status(root, Status::Completed, now()).unwrap();
        assert!(!db.is_task_completed(db.task(root).unwrap()));

        db.set_task_status(a, Status::Completed, now()).unwrap();
        db.set_task_status(b1, Status::Completed, now()).unwrap();
        assert!(db.is_task_completed(db.task(b).unwrap()));
        assert!(db.is_task_completed(db.task(root).unwrap()));
        assert_eq!(db.remaining_subtask_count(db.task(root).unwrap()), 0);

        db.set_task_status(root, Status::Pending, now()).unwrap();
        assert!(db.is_task_completed(db.task(root).unwrap()));
        assert!(db.task(root).unwrap().completed.is_none());
    }

    #[test]
    fn completing_stamps_completion_time() {
        let mut db = Database::default();
        let id = add_task(&mut db, "Sign off", None);
        db.set_task_status(id, Status::Completed, now()).unwrap();
        assert_eq!(db.task(id).unwrap().completed, Some(now()));
    }

    #[test]
    fn delete_task_cascades_to_subtasks_and_unlinks_parent() {
        let mut db = Database::default();
        let root = add_task(&mut db, "Root", None);
        let mid = add_task(&mut db, "Mid", Some(root));
        let _leaf = add_task(&mut db, "Leaf", Some(mid));
        let other = add_task(&mut db, "Other", Some(root));

        assert_eq!(db.delete_task(mid).unwrap(), 2);
        assert_eq!(db.tasks.len(), 2);
        assert_eq!(db.task(root).unwrap().subtasks, vec![other]);
        assert!(db.delete_task(mid).is_err());
    }

    #[test]
    fn delete_category_cascades_to_its_tasks() {
        let mut db = Database::default();
        let cat = db.insert_category("HR").unwrap();
        let mut t = Task::new("Handbook", now(), now());
        t.category = Some(cat);
        let t = db.insert_task(t).unwrap();
        add_task(&mut db, "Handbook appendix", Some(t));
        add_task(&mut db, "Unfiled", None);

        assert_eq!(db.delete_category(cat).unwrap(), 3);
        assert_eq!(db.tasks.len(), 1);
        assert!(db.categories.is_empty());
    }

    #[test]
    fn moving_a_task_between_categories_updates_both() {
        let mut db = Database::default();
        let a = db.insert_category("A").unwrap();
        let b = db.insert_category("B").unwrap();
        let mut t = Task::new("Roster", now(), now());
        t.category = Some(a);
        let t = db.insert_task(t).unwrap();
        db.set_task_category(t, Some(b)).unwrap();
        assert!(db.category(a).unwrap().tasks.is_empty());
        assert_eq!(db.category(b).unwrap().tasks, vec![t]);
        assert!(db.set_task_category(t, Some(99)).is_err());
    }

    #[test]
    fn meeting_status_leaves_follow_up_tasks_alone() {
        let mut db = Database::default();
        let m = db.insert_meeting(Meeting::new("IEP", now(), MeetingType::Parent)).unwrap();
        let mut follow = Task::new("Send notes", now(), now());
        follow.meeting = Some(m);
        follow.task_type = TaskType::MeetingFollowUp;
        let follow = db.insert_task(follow).unwrap();
        db.set_task_status(follow, Status::Completed, now()).unwrap();

        db.set_meeting_status(m, MeetingStatus::Completed).unwrap();
        db.set_meeting_status(m, MeetingStatus::Scheduled).unwrap();
        assert_eq!(db.meeting(m).unwrap().status, MeetingStatus::Scheduled);
        assert_eq!(db.task(follow).unwrap().status, Status::Completed);
        assert_eq!(db.task(follow).unwrap().completed, Some(now()));
        assert!(db.set_meeting_status(99, MeetingStatus::Cancelled).is_err());
    }

    #[test]
    fn delete_meeting_orphans_references() {
        let mut db = Database::default();
        let m = db.insert_meeting(Meeting::new("Board", now(), MeetingType::Admin)).unwrap();
        let mut t = Task::new("Follow up", now(), now());
        t.meeting = Some(m);
        let t = db.insert_task(t).unwrap();
        let mut d = Decision::new("Adopt rubric", "Consistency", now());
        d.meeting = Some(m);
        let d = db.insert_decision(d).unwrap();
        let mut o = Observation::new("Mr. Lee", "History", now());
        o.meeting = Some(m);
        let o = db.insert_observation(o).unwrap();
        assert_eq!(db.meeting_tasks(m).len(), 1);
        assert_eq!(db.meeting_observations(m).len(), 1);

        assert_eq!(db.delete_meeting(m).unwrap(), 1);
        assert!(db.meetings.is_empty());
        assert_eq!(db.task(t).unwrap().meeting, None);
        assert_eq!(db.decision(d).unwrap().meeting, None);
        assert_eq!(db.observation(o).unwrap().meeting, None);
        assert_eq!(db.observations.len(), 1);
    }

    #[test]
    fn observation_components_are_owned_and_averaged() {
        let mut db = Database::default();
        let mut obs = Observation::new(" Ms. Anderson ", "Biology", now());
        obs.follow_up_date = Some(now());
        let id = db.insert_observation(obs).unwrap();
        assert_eq!(db.observation(id).unwrap().teacher_name, "Ms. Anderson");
        assert_eq!(db.observation(id).unwrap().follow_up_date, None);
        assert_eq!(db.observation_average(db.observation(id).unwrap()), 0.0);

        db.insert_component(id, RubricComponent::new(DanielsonDomain::Instruction, "3c", "Engagement", DanielsonScore::Effective)).unwrap();
        db.insert_component(id, RubricComponent::new(DanielsonDomain::ClassroomEnvironment, "2a", "Rapport", DanielsonScore::HighlyEffective)).unwrap();
        let obs = db.observation(id).unwrap();
        assert_eq!(db.observation_average(obs), 3.5);
        assert_eq!(db.observation_band(obs), DanielsonScore::Effective);

        assert_eq!(db.delete_observation(id).unwrap(), 3);
        assert!(db.components.is_empty());
    }

    #[test]
    fn add_subtask_refuses_cycles() {
        let mut db = Database::default();
        let a = add_task(&mut db, "A", None);
        let b = add_task(&mut db, "B", Some(a));
        assert!(db.add_subtask(b, a).is_err());
        let c = add_task(&mut db, "C", None);
        db.add_subtask(b, c).unwrap();
        db.add_subtask(a, c).unwrap();
        assert!(db.task(b).unwrap().subtasks.is_empty());
        assert_eq!(db.task(a).unwrap().subtasks, vec![b, c]);
        db.remove_subtask(a, c).unwrap();
        assert_eq!(db.task(c).unwrap().parent, None);
    }

    #[test]
    fn fetch_sorts_then_limits() {
        let mut db = Database::default();
        for (title, days) in [("c", 5), ("a", 1), ("b", 3), ("d", 9)] {
            db.insert_task(Task::new(title, now() + Duration::days(days), now())).unwrap();
        }
        let fetch = Fetch::all()
            .filter(|t: &Task| t.title != "d")
            .sort_by(|a: &Task, b: &Task| a.due.cmp(&b.due))
            .limit(Some(2));
        let titles: Vec<&str> = db.fetch(&fetch).iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);
        assert_eq!(db.count::<Task>(|t| t.due > now() + Duration::days(2)), 3);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut db = Database::default();
        add_task(&mut db, "Persist me", None);
        db.save(&path).unwrap();

        let loaded = Database::load(&path).unwrap();
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.tasks[0].title, "Persist me");
        assert!(Database::load(&dir.path().join("missing.json")).unwrap().tasks.is_empty());
    }

    #[test]
    fn corrupt_store_errors_but_degrades_for_read_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Database::load(&path), Err(StoreError::Json(_))));
        assert!(Database::load_or_default(&path).tasks.is_empty());
    }

    #[test]
    fn resolve_by_id_or_name() {
        let mut db = Database::default();
        let a = add_task(&mut db, "Budget", None);
        add_task(&mut db, "Dup", None);
        add_task(&mut db, "dup", None);
        assert_eq!(resolve_identifier::<Task>("budget", &db).unwrap(), a);
        assert_eq!(resolve_identifier::<Task>(&a.to_string(), &db).unwrap(), a);
        assert!(resolve_identifier::<Task>("Dup", &db).is_err());
        assert!(resolve_identifier::<Task>("99", &db).is_err());
    }

    #[test]
    fn parse_when_input_handles_relative_and_iso_forms() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap(); // Wednesday
        let five = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
        assert_eq!(parse_when_input("tomorrow", today, five), Some(today.succ_opt().unwrap().and_time(five)));
        assert_eq!(parse_when_input("friday", today, five).unwrap().date(), NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
        assert_eq!(parse_when_input("next wed", today, five).unwrap().date(), NaiveDate::from_ymd_opt(2025, 3, 19).unwrap());
        assert_eq!(parse_when_input("in 2w", today, five).unwrap().date(), NaiveDate::from_ymd_opt(2025, 3, 26).unwrap());
        assert_eq!(parse_when_input("eom", today, five).unwrap().date(), NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
        assert_eq!(
            parse_when_input("2025-04-01 08:30", today, five),
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap().and_hms_opt(8, 30, 0)
        );
        assert_eq!(parse_when_input("someday", today, five), None);
    }

    #[test]
    fn week_bounds_are_monday_to_sunday() {
        let (start, end) = start_end_of_week(NaiveDate::from_ymd_opt(2025, 3, 16).unwrap());
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 3, 16).unwrap());
    }
}
