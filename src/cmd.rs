//! Command implementations for the CLI interface.
//!
//! Each handler loads what it needs from the store, performs one operation and
//! prints the result. Interactive commands report store errors on stderr and
//! exit with status 1; `widget` commands always print something.

use std::fmt::Display;
use std::fs;
use std::path::Path;

use chrono::{Duration, Local, NaiveDateTime, NaiveTime};
use clap::{Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::warn;

use crate::db::*;
use crate::decision::Decision;
use crate::error::StoreResult;
use crate::fields::*;
use crate::grouping::{group_meetings, group_tasks};
use crate::meeting::Meeting;
use crate::observation::{Observation, RubricComponent};
use crate::query::*;
use crate::samples;
use crate::stats::*;
use crate::task::{Category, Task};
use crate::widget::{ComplianceSnapshot, DecisionSnapshot, MeetingSnapshot};

#[derive(Subcommand)]
pub enum Commands {
    /// Manage compliance and follow-up tasks.
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Manage task categories.
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },

    /// Manage meetings.
    Meeting {
        #[command(subcommand)]
        action: MeetingAction,
    },

    /// Record and review decisions.
    Decision {
        #[command(subcommand)]
        action: DecisionAction,
    },

    /// Record classroom observations and rubric scores.
    Observation {
        #[command(subcommand)]
        action: ObservationAction,
    },

    /// Show counts, period-over-period trends and upcoming work.
    Dashboard {
        /// Comparison period: day | week | month | year.
        #[arg(long, value_enum, default_value_t = TimeRange::Week)]
        range: TimeRange,
    },

    /// Search tasks, meetings, decisions and observations.
    Search {
        /// Text to look for (case-insensitive).
        query: String,
        /// Restrict results to one record kind.
        #[arg(long, value_enum, default_value_t = SearchCategory::All)]
        category: SearchCategory,
        /// Result ordering.
        #[arg(long, value_enum, default_value_t = SortOrder::Relevance)]
        sort: SortOrder,
    },

    /// Print a JSON summary snapshot. Never fails on a missing or bad store.
    Widget {
        #[arg(value_enum)]
        kind: WidgetKind,
        /// Hide the meeting count in the meetings snapshot.
        #[arg(long)]
        hide_count: bool,
    },

    /// Insert sample records.
    Seed,

    /// Export tasks to CSV.
    Export {
        /// Output file path (defaults to tasks.csv).
        #[arg(long)]
        output: Option<String>,
        /// Include completed tasks.
        #[arg(long)]
        all: bool,
    },

    /// Create a timestamped backup of the database file.
    Backup,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum WidgetKind {
    Compliance,
    Meetings,
    Decisions,
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Due date: YYYY-MM-DD, "YYYY-MM-DD HH:MM", "today", "friday", "in 3d".
        #[arg(long)]
        due: String,
        /// Optional longer description.
        #[arg(long)]
        detail: Option<String>,
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        #[arg(long = "type", value_enum, default_value_t = TaskType::General)]
        task_type: TaskType,
        #[arg(long, value_enum, default_value_t = Status::Pending)]
        status: Status,
        /// Parent task ID or title.
        #[arg(long)]
        parent: Option<String>,
        /// Category title; created if it does not exist.
        #[arg(long)]
        category: Option<String>,
        /// Meeting ID or title this task follows up on.
        #[arg(long)]
        meeting: Option<String>,
    },
    /// List tasks.
    List {
        /// Text to match in title or detail.
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum)]
        status: Option<Status>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Category ID or title.
        #[arg(long)]
        category: Option<String>,
        /// Include completed tasks.
        #[arg(long)]
        all: bool,
        /// Group by Overdue / This Week / This Month / Later.
        #[arg(long)]
        grouped: bool,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one task with its subtasks.
    View { id: String },
    /// Update task fields.
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        detail: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long = "type", value_enum)]
        task_type: Option<TaskType>,
        /// New parent task ID or title.
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        clear_parent: bool,
        /// Category title; created if it does not exist.
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        clear_category: bool,
    },
    /// Set a task's status.
    Status {
        id: String,
        #[arg(value_enum)]
        status: Status,
    },
    /// Mark a task completed.
    Complete {
        id: String,
        /// Also complete every subtask below it.
        #[arg(long)]
        recurse: bool,
    },
    /// Set a task back to pending.
    Reopen { id: String },
    /// Delete a task and all of its subtasks.
    Delete { id: String },
    /// Link a task to a meeting, or clear the link.
    Link {
        id: String,
        /// Meeting ID or title.
        meeting: Option<String>,
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Subcommand)]
pub enum CategoryAction {
    /// Add a category (returns the existing one if the title matches).
    Add { title: String },
    /// List categories with task counts.
    List,
    /// Delete a category and every task filed under it.
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum MeetingAction {
    /// Schedule a meeting.
    Add {
        title: String,
        /// Start: "YYYY-MM-DD HH:MM", YYYY-MM-DD, "tomorrow", "monday".
        #[arg(long)]
        date: String,
        /// Length in minutes.
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(i64).range(1..))]
        duration: i64,
        /// Attendee names, comma-separated. May be repeated.
        #[arg(long = "attendee")]
        attendees: Vec<String>,
        #[arg(long = "type", value_enum, default_value_t = MeetingType::Staff)]
        meeting_type: MeetingType,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List meetings.
    List {
        /// Text to match in title or attendee names.
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum)]
        status: Option<MeetingStatus>,
        #[arg(long = "type", value_enum)]
        meeting_type: Option<MeetingType>,
        /// Group by Today / Tomorrow / This Week / Upcoming / Past.
        #[arg(long)]
        grouped: bool,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show a meeting with its linked records.
    View { id: String },
    /// Update meeting fields.
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        date: Option<String>,
        /// Length in minutes.
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..))]
        duration: Option<i64>,
        #[arg(long, value_enum)]
        status: Option<MeetingStatus>,
        #[arg(long = "attendee")]
        attendees: Vec<String>,
        /// Drop existing attendees before adding new ones.
        #[arg(long)]
        clear_attendees: bool,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a meeting. Linked records are kept and unlinked.
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum DecisionAction {
    /// Record a decision.
    Add {
        title: String,
        #[arg(long)]
        rationale: String,
        #[arg(long)]
        detail: Option<String>,
        #[arg(long, value_enum, default_value_t = ImpactLevel::Medium)]
        impact: ImpactLevel,
        #[arg(long)]
        next_steps: Option<String>,
        /// Meeting ID or title where the decision was made.
        #[arg(long)]
        meeting: Option<String>,
        /// When it was made (defaults to now).
        #[arg(long)]
        date: Option<String>,
    },
    /// List decisions.
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum)]
        effectiveness: Option<Effectiveness>,
        #[arg(long, value_enum)]
        impact: Option<ImpactLevel>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Record how a decision worked out.
    Review {
        id: String,
        #[arg(value_enum)]
        effectiveness: Effectiveness,
        #[arg(long)]
        reflection: Option<String>,
    },
    /// Delete a decision.
    Delete { id: String },
    /// Effectiveness and impact summary.
    Stats,
}

#[derive(Subcommand)]
pub enum ObservationAction {
    /// Record a classroom observation.
    Add {
        /// Teacher observed.
        teacher: String,
        #[arg(long)]
        subject: String,
        /// When it took place (defaults to now).
        #[arg(long)]
        date: Option<String>,
        #[arg(long, value_enum, default_value_t = GradeLevel::Ninth)]
        grade: GradeLevel,
        #[arg(long = "type", value_enum, default_value_t = ObservationType::Walkthrough)]
        observation_type: ObservationType,
        /// Length in minutes.
        #[arg(long, default_value_t = 0)]
        duration: u32,
        #[arg(long, value_enum, default_value_t = DanielsonScore::Developing)]
        rating: DanielsonScore,
        /// Follow-up date; marks the observation as needing follow-up.
        #[arg(long)]
        follow_up: Option<String>,
        /// Meeting ID or title.
        #[arg(long)]
        meeting: Option<String>,
    },
    /// List observations.
    List {
        /// Text to match in teacher name or subject.
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum)]
        rating: Option<DanielsonScore>,
        #[arg(long)]
        follow_up_only: bool,
    },
    /// Show an observation with its rubric scores.
    View { id: String },
    /// Add a rubric component score to an observation.
    Score {
        id: String,
        #[arg(value_enum)]
        domain: DanielsonDomain,
        /// Component code such as 3c.
        code: String,
        #[arg(value_enum)]
        score: DanielsonScore,
        /// Component title, required for codes outside the built-in rubric.
        #[arg(long)]
        detail: Option<String>,
        #[arg(long)]
        comments: Option<String>,
    },
    /// Delete an observation and its scores.
    Delete { id: String },
}

fn fail(msg: impl Display) -> ! {
    eprintln!("{msg}");
    std::process::exit(1);
}

fn or_exit<T>(result: StoreResult<T>) -> T {
    result.unwrap_or_else(|e| fail(format!("Error: {e}")))
}

/// Load the store for an interactive command; a bad file is fatal.
pub fn load_or_exit(db_path: &Path) -> Database {
    Database::load(db_path).unwrap_or_else(|e| fail(format!("Failed to load {}: {e}", db_path.display())))
}

fn save_or_exit(db: &Database, db_path: &Path) {
    if let Err(e) = db.save(db_path) {
        fail(format!("Failed to save DB: {e}"));
    }
}

fn resolve_or_exit<T: Record>(identifier: &str, db: &Database) -> u64 {
    resolve_identifier::<T>(identifier, db).unwrap_or_else(|e| fail(format!("Error resolving {}: {e}", T::KIND)))
}

fn due_time() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN)
}

fn meeting_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn when_or_exit(input: &str, now: NaiveDateTime, default_time: NaiveTime) -> NaiveDateTime {
    parse_when_input(input, now.date(), default_time).unwrap_or_else(|| {
        fail(format!(
            "Unrecognised date '{input}'. Try YYYY-MM-DD, \"YYYY-MM-DD HH:MM\", \"tomorrow\", \"friday\" or \"in 3d\"."
        ))
    })
}

/// End of a meeting that starts at `start` and runs `minutes`.
fn meeting_end(start: NaiveDateTime, minutes: i64) -> Option<NaiveDateTime> {
    Duration::try_minutes(minutes).and_then(|length| start.checked_add_signed(length))
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn percent(rate: f64) -> String {
    format!("{:.0}%", rate * 100.0)
}

fn print_task_table(db: &Database, tasks: &[&Task], now: NaiveDateTime) {
    println!("{:<5} {:<12} {:<9} {:<20} {:<14} {}", "ID", "Status", "Priority", "Due", "Category", "Title");
    for t in tasks {
        let category = t.category.and_then(|c| db.category(c)).map(|c| c.title.as_str()).unwrap_or("-");
        let progress = if t.subtasks.is_empty() {
            String::new()
        } else {
            let total = db.subtasks_of(t).len();
            format!(" ({}/{total})", total - db.remaining_subtask_count(t))
        };
        println!(
            "{:<5} {:<12} {:<9} {:<20} {:<14} {}{}",
            t.id,
            t.status.label(),
            t.priority.label(),
            truncate(&t.due_text(now), 20),
            truncate(category, 14),
            t.title,
            progress
        );
    }
}

fn print_meeting_table(meetings: &[&Meeting]) {
    println!("{:<5} {:<17} {:<8} {:<12} {:<24} {}", "ID", "Date", "Length", "Status", "Type", "Title");
    for m in meetings {
        println!(
            "{:<5} {:<17} {:<8} {:<12} {:<24} {}",
            m.id,
            m.date.format("%Y-%m-%d %H:%M"),
            m.formatted_duration(),
            m.status.label(),
            m.meeting_type.label(),
            m.title
        );
    }
}

fn print_decision_table(decisions: &[&Decision]) {
    println!("{:<5} {:<11} {:<9} {:<12} {}", "ID", "Date", "Impact", "Outcome", "Title");
    for d in decisions {
        println!(
            "{:<5} {:<11} {:<9} {:<12} {}",
            d.id,
            d.date_made.format("%Y-%m-%d"),
            d.impact.label(),
            d.effectiveness.label(),
            d.title
        );
    }
}

fn print_observation_table(db: &Database, observations: &[&Observation]) {
    println!("{:<5} {:<11} {:<18} {:<14} {:<17} {}", "ID", "Date", "Teacher", "Subject", "Rating", "Avg");
    for o in observations {
        let flag = if o.follow_up_required { " *" } else { "" };
        println!(
            "{:<5} {:<11} {:<18} {:<14} {:<17} {:.2}{}",
            o.id,
            o.date.format("%Y-%m-%d"),
            truncate(&o.teacher_name, 18),
            truncate(&o.subject, 14),
            o.overall_rating.label(),
            db.observation_average(o),
            flag
        );
    }
}

// ----- tasks -----

pub fn cmd_task(db: &mut Database, db_path: &Path, now: NaiveDateTime, action: TaskAction) {
    match action {
        TaskAction::Add { title, due, detail, priority, task_type, status, parent, category, meeting } => {
            let parent = parent.map(|p| resolve_or_exit::<Task>(&p, db));
            let meeting = meeting.map(|m| resolve_or_exit::<Meeting>(&m, db));
            let category = category.map(|c| or_exit(db.insert_category(&c)));

            let mut task = Task::new(title, when_or_exit(&due, now, due_time()), now);
            task.detail = non_blank(detail);
            task.priority = priority;
            task.task_type = task_type;
            task.status = status;
            if status == Status::Completed {
                task.completed = Some(now);
            }
            task.parent = parent;
            task.category = category;
            task.meeting = meeting;
            let id = or_exit(db.insert_task(task));
            save_or_exit(db, db_path);
            println!("Added task {id}");
        }

        TaskAction::List { search, status, priority, category, all, grouped, limit } => {
            let filter = TaskFilter {
                search,
                status,
                priority,
                category: category.map(|c| resolve_or_exit::<Category>(&c, db)),
            };
            let fetch = Fetch::all()
                .filter(|t: &Task| filter.matches(t) && (all || status.is_some() || !db.is_task_completed(t)))
                .sort_by(|a: &Task, b: &Task| a.due.cmp(&b.due).then(a.id.cmp(&b.id)))
                .limit(limit);
            let tasks = db.fetch(&fetch);
            if tasks.is_empty() {
                println!("No tasks found.");
            } else if grouped {
                for (bucket, items) in group_tasks(&tasks, now) {
                    println!("\n{} ({})", bucket.label(), items.len());
                    print_task_table(db, &items, now);
                }
            } else {
                print_task_table(db, &tasks, now);
            }
        }

        TaskAction::View { id } => {
            let task_id = resolve_or_exit::<Task>(&id, db);
            let Some(task) = db.task(task_id) else {
                fail(format!("Task {task_id} not found."));
            };
            let category = task.category.and_then(|c| db.category(c)).map(|c| c.title.clone());
            let meeting = task.meeting.and_then(|m| db.meeting(m)).map(|m| m.title.clone());
            println!("ID:         {}", task.id);
            println!("Title:      {}", task.title);
            println!("Type:       {}", task.task_type.label());
            println!("Status:     {}", task.status.label());
            println!("Priority:   {}", task.priority.label());
            println!("Due:        {} ({})", task.due.format("%Y-%m-%d %H:%M"), task.due_text(now));
            println!("Created:    {}", task.created.format("%Y-%m-%d %H:%M"));
            println!("Completed:  {}", task.completed.map(|c| c.format("%Y-%m-%d %H:%M").to_string()).unwrap_or_else(|| "-".into()));
            println!("Category:   {}", category.unwrap_or_else(|| "-".into()));
            println!("Meeting:    {}", meeting.unwrap_or_else(|| "-".into()));
            println!("Parent:     {}", task.parent.map(|p| p.to_string()).unwrap_or_else(|| "-".into()));
            let chain = collect_ancestors(task_id, db);
            if !chain.is_empty() {
                let path: Vec<String> = chain.iter().map(|i| i.to_string()).collect();
                println!("Ancestors:  {}", path.join(" -> "));
            }
            println!("Detail:\n{}\n", task.detail.as_deref().unwrap_or("-"));

            let subtasks = db.subtasks_of(task);
            if subtasks.is_empty() {
                println!("Subtasks: -");
            } else {
                println!("Subtasks ({} remaining):", db.remaining_subtask_count(task));
                for s in subtasks {
                    let mark = if db.is_task_completed(s) { "x" } else { " " };
                    println!("  [{mark}] {} (#{}) {}", s.title, s.id, s.due_text(now));
                }
            }
        }

        TaskAction::Update { id, title, detail, due, priority, task_type, parent, clear_parent, category, clear_category } => {
            let task_id = resolve_or_exit::<Task>(&id, db);
            let parent = parent.map(|p| resolve_or_exit::<Task>(&p, db));
            let due = due.map(|d| when_or_exit(&d, now, due_time()));
            if title.as_deref().is_some_and(|t| !is_valid_text(t)) {
                fail("Title cannot be empty.");
            }
            let category = if clear_category { None } else { category.map(|c| or_exit(db.insert_category(&c))) };

            let Some(task) = db.task_mut(task_id) else {
                fail(format!("Task {task_id} not found."));
            };
            if let Some(t) = title {
                task.title = t.trim().to_string();
            }
            if detail.is_some() {
                task.detail = non_blank(detail);
            }
            if let Some(d) = due {
                task.due = d;
            }
            if let Some(p) = priority {
                task.priority = p;
            }
            if let Some(k) = task_type {
                task.task_type = k;
            }
            let old_parent = task.parent;

            if clear_parent {
                if let Some(old) = old_parent {
                    or_exit(db.remove_subtask(old, task_id));
                }
            }
            if let Some(p) = parent {
                or_exit(db.add_subtask(p, task_id));
            }
            if clear_category || category.is_some() {
                or_exit(db.set_task_category(task_id, category));
            }
            save_or_exit(db, db_path);
            println!("Updated task {task_id}");
        }

        TaskAction::Status { id, status } => {
            let task_id = resolve_or_exit::<Task>(&id, db);
            or_exit(db.set_task_status(task_id, status, now));
            save_or_exit(db, db_path);
            println!("Task {task_id} is now {}", status.label());
        }

        TaskAction::Complete { id, recurse } => {
            let task_id = resolve_or_exit::<Task>(&id, db);
            let mut ids = vec![task_id];
            if recurse {
                let child_map = build_children_map(&db.tasks);
                let mut descendants = std::collections::HashSet::new();
                collect_descendants(task_id, &child_map, &mut descendants);
                let mut rest: Vec<u64> = descendants.into_iter().collect();
                rest.sort_unstable();
                ids.extend(rest);
            }
            for &t in &ids {
                or_exit(db.set_task_status(t, Status::Completed, now));
            }
            save_or_exit(db, db_path);
            println!("Completed {} task(s)", ids.len());
            if let Some(task) = db.task(task_id) {
                let remaining = db.remaining_subtask_count(task);
                if remaining > 0 {
                    println!("Note: {remaining} subtask(s) still open; use --recurse to close them.");
                }
            }
        }

        TaskAction::Reopen { id } => {
            let task_id = resolve_or_exit::<Task>(&id, db);
            or_exit(db.set_task_status(task_id, Status::Pending, now));
            save_or_exit(db, db_path);
            println!("Reopened task {task_id}");
        }

        TaskAction::Delete { id } => {
            let task_id = resolve_or_exit::<Task>(&id, db);
            let removed = or_exit(db.delete_task(task_id));
            save_or_exit(db, db_path);
            println!("Deleted {removed} task(s)");
        }

        TaskAction::Link { id, meeting, clear } => {
            let task_id = resolve_or_exit::<Task>(&id, db);
            let meeting = match (meeting, clear) {
                (_, true) => None,
                (Some(m), false) => Some(resolve_or_exit::<Meeting>(&m, db)),
                (None, false) => fail("Give a meeting to link, or --clear."),
            };
            or_exit(db.link_task_meeting(task_id, meeting));
            save_or_exit(db, db_path);
            match meeting {
                Some(m) => println!("Linked task {task_id} to meeting {m}"),
                None => println!("Unlinked task {task_id}"),
            }
        }
    }
}

// ----- categories -----

pub fn cmd_category(db: &mut Database, db_path: &Path, action: CategoryAction) {
    match action {
        CategoryAction::Add { title } => {
            let before = db.categories.len();
            let id = or_exit(db.insert_category(&title));
            if db.categories.len() == before {
                println!("Category {id} already exists");
                return;
            }
            save_or_exit(db, db_path);
            println!("Added category {id}");
        }
        CategoryAction::List => {
            if db.categories.is_empty() {
                println!("No categories found.");
                return;
            }
            println!("{:<5} {:<7} {:<6} {}", "ID", "Tasks", "Done", "Title");
            for c in &db.categories {
                let tasks: Vec<&Task> = c.tasks.iter().filter_map(|&t| db.task(t)).collect();
                println!(
                    "{:<5} {:<7} {:<6} {}",
                    c.id,
                    tasks.len(),
                    percent(completion_rate(&tasks)),
                    c.title
                );
            }
        }
        CategoryAction::Delete { id } => {
            let category_id = resolve_or_exit::<Category>(&id, db);
            let removed = or_exit(db.delete_category(category_id));
            save_or_exit(db, db_path);
            println!("Deleted category {category_id} ({} task(s) removed)", removed - 1);
        }
    }
}

// ----- meetings -----

pub fn cmd_meeting(db: &mut Database, db_path: &Path, now: NaiveDateTime, action: MeetingAction) {
    match action {
        MeetingAction::Add { title, date, duration, attendees, meeting_type, notes } => {
            let date = when_or_exit(&date, now, meeting_time());
            let mut meeting = Meeting::new(title, date, meeting_type);
            meeting.end = meeting_end(date, duration).unwrap_or_else(|| fail("Duration out of range."));
            meeting.attendees = attendees;
            meeting.notes = non_blank(notes);
            let id = or_exit(db.insert_meeting(meeting));
            save_or_exit(db, db_path);
            println!("Added meeting {id}");
        }

        MeetingAction::List { search, status, meeting_type, grouped, limit } => {
            let filter = MeetingFilter { search, status, meeting_type };
            let fetch = Fetch::all()
                .filter(|m: &Meeting| filter.matches(m))
                .sort_by(|a: &Meeting, b: &Meeting| a.date.cmp(&b.date))
                .limit(limit);
            let meetings = db.fetch(&fetch);
            if meetings.is_empty() {
                println!("No meetings found.");
            } else if grouped {
                for (bucket, items) in group_meetings(&meetings, now) {
                    println!("\n{} ({})", bucket.label(), items.len());
                    print_meeting_table(&items);
                }
            } else {
                print_meeting_table(&meetings);
            }
        }

        MeetingAction::View { id } => {
            let meeting_id = resolve_or_exit::<Meeting>(&id, db);
            let Some(m) = db.meeting(meeting_id) else {
                fail(format!("Meeting {meeting_id} not found."));
            };
            println!("ID:         {}", m.id);
            println!("Title:      {}", m.title);
            println!("Type:       {}", m.meeting_type.label());
            println!("Status:     {} ({})", m.status.label(), m.status.as_task_status().label());
            println!("When:       {} to {} ({})", m.start.format("%Y-%m-%d %H:%M"), m.end.format("%H:%M"), m.formatted_duration());
            println!("Attendees:  {}", if m.attendees.is_empty() { "-".into() } else { m.attendees.join(", ") });
            println!("Notes:\n{}\n", m.notes.as_deref().unwrap_or("-"));

            let tasks = db.meeting_tasks(meeting_id);
            println!("Tasks ({}):", tasks.len());
            for t in tasks {
                println!("  #{} {} [{}] {}", t.id, t.title, t.status.label(), t.due_text(now));
            }
            let decisions = db.meeting_decisions(meeting_id);
            println!("Decisions ({}):", decisions.len());
            for d in decisions {
                println!("  #{} {} [{}]", d.id, d.title, d.effectiveness.label());
            }
            let observations = db.meeting_observations(meeting_id);
            println!("Observations ({}):", observations.len());
            for o in observations {
                println!("  #{} {} {} [{}]", o.id, o.teacher_name, o.subject, o.overall_rating.label());
            }
        }

        MeetingAction::Update { id, title, date, duration, status, attendees, clear_attendees, notes } => {
            let meeting_id = resolve_or_exit::<Meeting>(&id, db);
            let Some(mut meeting) = db.meeting(meeting_id).cloned() else {
                fail(format!("Meeting {meeting_id} not found."));
            };
            if let Some(t) = title {
                meeting.title = t;
            }
            let length = match duration {
                Some(minutes) => Duration::try_minutes(minutes).unwrap_or_else(|| fail("Duration out of range.")),
                None => meeting.duration(),
            };
            if let Some(d) = date {
                let start = when_or_exit(&d, now, meeting_time());
                meeting.date = start;
                meeting.start = start;
            }
            meeting.end = meeting.start.checked_add_signed(length).unwrap_or_else(|| fail("Duration out of range."));
            if clear_attendees {
                meeting.attendees.clear();
            }
            meeting.attendees.extend(attendees);
            if notes.is_some() {
                meeting.notes = non_blank(notes);
            }
            or_exit(db.update_meeting(meeting));
            if let Some(s) = status {
                or_exit(db.set_meeting_status(meeting_id, s));
            }
            save_or_exit(db, db_path);
            println!("Updated meeting {meeting_id}");
        }

        MeetingAction::Delete { id } => {
            let meeting_id = resolve_or_exit::<Meeting>(&id, db);
            let linked = db.meeting_tasks(meeting_id).len()
                + db.meeting_decisions(meeting_id).len()
                + db.meeting_observations(meeting_id).len();
            or_exit(db.delete_meeting(meeting_id));
            save_or_exit(db, db_path);
            println!("Deleted meeting {meeting_id} ({linked} linked record(s) unlinked)");
        }
    }
}

// ----- decisions -----

pub fn cmd_decision(db: &mut Database, db_path: &Path, now: NaiveDateTime, action: DecisionAction) {
    match action {
        DecisionAction::Add { title, rationale, detail, impact, next_steps, meeting, date } => {
            let meeting = meeting.map(|m| resolve_or_exit::<Meeting>(&m, db));
            let date = date.map(|d| when_or_exit(&d, now, now.time())).unwrap_or(now);
            let mut decision = Decision::new(title, rationale.trim(), date);
            decision.detail = non_blank(detail);
            decision.next_steps = non_blank(next_steps);
            decision.impact = impact;
            decision.meeting = meeting;
            let id = or_exit(db.insert_decision(decision));
            save_or_exit(db, db_path);
            println!("Recorded decision {id} ({})", impact.description());
        }

        DecisionAction::List { search, effectiveness, impact, limit } => {
            let filter = DecisionFilter { search, effectiveness, impact };
            let fetch = Fetch::all()
                .filter(|d: &Decision| filter.matches(d))
                .sort_by(|a: &Decision, b: &Decision| b.date_made.cmp(&a.date_made))
                .limit(limit);
            let decisions = db.fetch(&fetch);
            if decisions.is_empty() {
                println!("No decisions found.");
            } else {
                print_decision_table(&decisions);
            }
        }

        DecisionAction::Review { id, effectiveness, reflection } => {
            let decision_id = resolve_or_exit::<Decision>(&id, db);
            or_exit(db.review_decision(decision_id, effectiveness, reflection));
            save_or_exit(db, db_path);
            println!("Decision {decision_id} marked {}", effectiveness.label());
        }

        DecisionAction::Delete { id } => {
            let decision_id = resolve_or_exit::<Decision>(&id, db);
            or_exit(db.delete_decision(decision_id));
            save_or_exit(db, db_path);
            println!("Deleted decision {decision_id}");
        }

        DecisionAction::Stats => {
            let all: Vec<&Decision> = db.decisions.iter().collect();
            let stats = effectiveness_stats(&all);
            println!("Effective:    {}", stats.effective);
            println!("Ineffective:  {}", stats.ineffective);
            println!("Pending:      {}", stats.pending);
            println!("Rate:         {}", percent(stats.rate()));
            println!("Impact:");
            for (level, count) in impact_breakdown(&all) {
                println!("  {:<9} {count}", level.label());
            }
        }
    }
}

// ----- observations -----

pub fn cmd_observation(db: &mut Database, db_path: &Path, now: NaiveDateTime, action: ObservationAction) {
    match action {
        ObservationAction::Add { teacher, subject, date, grade, observation_type, duration, rating, follow_up, meeting } => {
            let meeting = meeting.map(|m| resolve_or_exit::<Meeting>(&m, db));
            let date = date.map(|d| when_or_exit(&d, now, now.time())).unwrap_or(now);
            let follow_up = follow_up.map(|d| when_or_exit(&d, now, meeting_time()));

            let mut obs = Observation::new(teacher, subject, date);
            obs.grade_level = grade;
            obs.observation_type = observation_type;
            obs.duration_minutes = duration;
            obs.overall_rating = rating;
            obs.follow_up_required = follow_up.is_some();
            obs.follow_up_date = follow_up;
            obs.meeting = meeting;
            let id = or_exit(db.insert_observation(obs));
            save_or_exit(db, db_path);
            println!("Added observation {id}");
        }

        ObservationAction::List { search, rating, follow_up_only } => {
            let filter = ObservationFilter { search, rating, follow_up_only };
            let fetch = Fetch::all()
                .filter(|o: &Observation| filter.matches(o))
                .sort_by(|a: &Observation, b: &Observation| b.date.cmp(&a.date));
            let observations = db.fetch(&fetch);
            if observations.is_empty() {
                println!("No observations found.");
            } else {
                print_observation_table(db, &observations);
                let pending = db.count::<Observation>(|o| o.follow_up_required);
                if pending > 0 {
                    println!("\n{pending} observation(s) flagged for follow-up");
                }
            }
        }

        ObservationAction::View { id } => {
            let obs_id = resolve_or_exit::<Observation>(&id, db);
            let Some(o) = db.observation(obs_id) else {
                fail(format!("Observation {obs_id} not found."));
            };
            println!("ID:         {}", o.id);
            println!("Teacher:    {}", o.teacher_name);
            println!("Subject:    {} ({} grade)", o.subject, o.grade_level.label());
            println!("Type:       {}", o.observation_type.label());
            println!("Date:       {} ({} min)", o.date.format("%Y-%m-%d %H:%M"), o.duration_minutes);
            println!("Rating:     {}", o.overall_rating.label());
            let follow_up = match (o.follow_up_required, o.follow_up_date) {
                (false, _) => "-".to_string(),
                (true, Some(d)) => d.format("%Y-%m-%d").to_string(),
                (true, None) => "required".to_string(),
            };
            println!("Follow-up:  {follow_up}");

            let components = db.components_of(o);
            if components.is_empty() {
                println!("Scores: -");
            } else {
                println!("Scores (average {:.2}, {}):", db.observation_average(o), db.observation_band(o).label());
                for c in components {
                    println!("  {:<4} {:<30} {:<17} {}", c.number, truncate(&c.detail, 30), c.score.label(), c.domain.label());
                    if let Some(comments) = &c.comments {
                        println!("       {comments}");
                    }
                }
            }
        }

        ObservationAction::Score { id, domain, code, score, detail, comments } => {
            let obs_id = resolve_or_exit::<Observation>(&id, db);
            let code = code.trim().to_lowercase();
            let known = domain.components().iter().find(|(c, _)| *c == code).map(|(_, title)| title.to_string());
            let Some(detail) = non_blank(detail).or(known) else {
                let codes: Vec<&str> = domain.components().iter().map(|(c, _)| *c).collect();
                fail(format!(
                    "Unknown component '{code}' for {}; known codes are {}. Pass --detail to score a custom one.",
                    domain.label(),
                    codes.join(", ")
                ));
            };
            let mut component = RubricComponent::new(domain, code, detail, score);
            component.comments = non_blank(comments);
            let component_id = or_exit(db.insert_component(obs_id, component));
            save_or_exit(db, db_path);
            if let Some(o) = db.observation(obs_id) {
                println!(
                    "Scored component {component_id}; observation {obs_id} now averages {:.2} ({})",
                    db.observation_average(o),
                    db.observation_band(o).label()
                );
            }
        }

        ObservationAction::Delete { id } => {
            let obs_id = resolve_or_exit::<Observation>(&id, db);
            let removed = or_exit(db.delete_observation(obs_id));
            save_or_exit(db, db_path);
            println!("Deleted observation {obs_id} and {} score(s)", removed - 1);
        }
    }
}

// ----- summaries -----

pub fn cmd_dashboard(db: &Database, range: TimeRange, now: NaiveDateTime) {
    let dash = Dashboard::build(db, range, now);
    println!("{}. {} overview for {}", dash.greeting, range.label(), now.format("%A %Y-%m-%d"));
    println!("Meetings today: {}\n", dash.meetings_today);

    println!("Change vs previous {}:", range.label().to_lowercase());
    println!("  Meetings     {}", dash.meetings_trend);
    println!("  Decisions    {}", dash.decisions_trend);
    println!("  Compliance   {}", dash.compliance_trend);
    println!("  Overdue      {}\n", dash.overdue_trend);

    let s = dash.status;
    println!(
        "Tasks: {} pending, {} in progress, {} completed, {} overdue ({} complete)",
        s.pending,
        s.in_progress,
        s.completed,
        s.overdue,
        percent(dash.completion_rate)
    );
    if dash.upcoming.is_empty() {
        println!("Upcoming: -");
    } else {
        println!("Upcoming:");
        for t in &dash.upcoming {
            println!("  #{:<4} {:<16} {}", t.id, t.due_text(now), t.title);
        }
    }

    let e = dash.effectiveness;
    println!(
        "\nDecisions: {} effective, {} ineffective, {} pending ({} effective)",
        e.effective,
        e.ineffective,
        e.pending,
        percent(e.rate())
    );
    let impact: Vec<String> = dash.impact.iter().map(|(l, n)| format!("{} {n}", l.label())).collect();
    println!("Impact: {}", impact.join(", "));
    let ratings: Vec<String> = dash.ratings.iter().map(|(r, n)| format!("{} {n}", r.label())).collect();
    println!("Observation ratings: {}", ratings.join(", "));
}

pub fn cmd_search(db: &Database, query: String, category: SearchCategory, sort: SortOrder, now: NaiveDateTime) {
    let results = search_all(db, &query, category, sort);
    if results.is_empty() {
        println!("No results for '{}'.", query.trim());
        return;
    }
    println!("{} result(s) for '{}'", results.total_count(), query.trim());
    if !results.tasks.is_empty() {
        println!("\nTasks");
        print_task_table(db, &results.tasks, now);
    }
    if !results.meetings.is_empty() {
        println!("\nMeetings");
        print_meeting_table(&results.meetings);
    }
    if !results.decisions.is_empty() {
        println!("\nDecisions");
        print_decision_table(&results.decisions);
    }
    if !results.observations.is_empty() {
        println!("\nObservations");
        print_observation_table(db, &results.observations);
    }
}

/// Print a snapshot as JSON. The store is loaded permissively by the caller.
pub fn cmd_widget(db: &Database, kind: WidgetKind, hide_count: bool, now: NaiveDateTime) {
    let json = match kind {
        WidgetKind::Compliance => serde_json::to_string_pretty(&ComplianceSnapshot::build(db, now)),
        WidgetKind::Meetings => serde_json::to_string_pretty(&MeetingSnapshot::build(db, now, !hide_count)),
        WidgetKind::Decisions => serde_json::to_string_pretty(&DecisionSnapshot::build(db, now)),
    };
    match json {
        Ok(s) => println!("{s}"),
        Err(e) => {
            warn!("event=widget_render status=degraded kind={kind:?} error={e}");
            println!("{{}}");
        }
    }
}

pub fn cmd_seed(db: &mut Database, db_path: &Path, now: NaiveDateTime) {
    or_exit(samples::seed(db, now));
    save_or_exit(db, db_path);
    println!(
        "Seeded sample data: {} task(s), {} meeting(s), {} decision(s), {} observation(s)",
        db.tasks.len(),
        db.meetings.len(),
        db.decisions.len(),
        db.observations.len()
    );
}

pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Render tasks as CSV, one row per task.
pub fn tasks_to_csv(db: &Database, tasks: &[&Task]) -> String {
    let mut csv = String::from("ID,Title,Type,Status,Priority,Due,Completed,Parent,Category,Meeting,Created,Detail\n");
    let fmt = |d: NaiveDateTime| d.format("%Y-%m-%d %H:%M").to_string();
    for t in tasks {
        let category = t.category.and_then(|c| db.category(c)).map(|c| c.title.clone()).unwrap_or_else(|| "-".into());
        let meeting = t.meeting.and_then(|m| db.meeting(m)).map(|m| m.title.clone()).unwrap_or_else(|| "-".into());
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{},{}\n",
            t.id,
            escape_csv(&t.title),
            t.task_type.label(),
            t.status.label(),
            t.priority.label(),
            fmt(t.due),
            t.completed.map(fmt).unwrap_or_else(|| "-".into()),
            t.parent.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
            escape_csv(&category),
            escape_csv(&meeting),
            fmt(t.created),
            escape_csv(t.detail.as_deref().unwrap_or("-"))
        ));
    }
    csv
}

pub fn cmd_export(db: &Database, output: Option<String>, all: bool) {
    let output_path = output.unwrap_or_else(|| "tasks.csv".to_string());
    let tasks: Vec<&Task> = db.tasks.iter().filter(|t| all || !db.is_task_completed(t)).collect();
    match fs::write(&output_path, tasks_to_csv(db, &tasks)) {
        Ok(_) => println!("Exported {} task(s) to {}", tasks.len(), output_path),
        Err(e) => fail(format!("Failed to write CSV file: {e}")),
    }
}

/// Create a timestamped backup of the database file.
pub fn create_backup(db_path: &Path) -> Result<String, std::io::Error> {
    if !db_path.exists() {
        return Err(std::io::Error::new(std::io::ErrorKind::NotFound, "Database file does not exist"));
    }
    let parent_dir = db_path.parent().unwrap_or_else(|| Path::new("."));
    let backup_dir = parent_dir.join("backup");
    fs::create_dir_all(&backup_dir)?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let db_filename = db_path.file_name().and_then(|name| name.to_str()).unwrap_or("pulsehub.json");
    let backup_path = backup_dir.join(format!("{timestamp}_{db_filename}"));
    fs::copy(db_path, &backup_path)?;
    Ok(backup_path.to_string_lossy().to_string())
}

pub fn cmd_backup(db_path: &Path) {
    match create_backup(db_path) {
        Ok(backup_path) => println!("Backup created: {backup_path}"),
        Err(e) => fail(format!("Failed to create backup: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap().and_hms_opt(9, 0, 0).unwrap()
    }

    #[test]
    fn csv_escapes_commas_and_quotes() {
        let mut db = Database::default();
        let mut t = Task::new("Review \"policy\", part 1", now(), now());
        t.detail = Some("line".into());
        db.insert_task(t).unwrap();
        let refs: Vec<&Task> = db.tasks.iter().collect();
        let csv = tasks_to_csv(&db, &refs);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with("1,\"Review \"\"policy\"\", part 1\",General,Pending,Medium,2025-03-12 09:00,-,-,-,-,"));
        assert!(row.ends_with(",line"));
    }

    #[test]
    fn backup_copies_into_backup_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulsehub.json");
        Database::default().save(&path).unwrap();
        let backup = create_backup(&path).unwrap();
        assert!(backup.ends_with("_pulsehub.json"));
        assert!(Path::new(&backup).exists());
        assert!(create_backup(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn cli_parses_nested_actions() {
        use crate::cli::Cli;
        use clap::Parser;

        let cli = Cli::try_parse_from(["ph", "task", "add", "Fire drill", "--due", "tomorrow", "--priority", "high"]).unwrap();
        match cli.command {
            Commands::Task { action: TaskAction::Add { title, priority, .. } } => {
                assert_eq!(title, "Fire drill");
                assert_eq!(priority, Priority::High);
            }
            _ => panic!("expected task add"),
        }
        let cli = Cli::try_parse_from(["ph", "dashboard", "--range", "month"]).unwrap();
        assert!(matches!(cli.command, Commands::Dashboard { range: TimeRange::Month }));
        let cli = Cli::try_parse_from(["ph", "observation", "add", "Ms. Park", "--subject", "Algebra", "--grade", "10th"]).unwrap();
        assert!(matches!(cli.command, Commands::Observation { action: ObservationAction::Add { grade: GradeLevel::Tenth, .. } }));
    }

    #[test]
    fn meeting_end_rejects_out_of_range_lengths() {
        assert_eq!(meeting_end(now(), 45), Some(now() + Duration::minutes(45)));
        assert_eq!(meeting_end(now(), 999_999_999_999_999), None);
        assert_eq!(meeting_end(now(), 140_000_000_000_000), None);
    }

    #[test]
    fn cli_rejects_non_positive_meeting_duration() {
        use crate::cli::Cli;
        use clap::Parser;

        let args = ["ph", "meeting", "add", "Staff", "--date", "tomorrow", "--duration"];
        assert!(Cli::try_parse_from(args.iter().copied().chain(["0"])).is_err());
        assert!(Cli::try_parse_from(args.iter().copied().chain(["-15"])).is_err());
        assert!(Cli::try_parse_from(["ph", "meeting", "update", "1", "--duration", "0"]).is_err());
        let cli = Cli::try_parse_from(args.iter().copied().chain(["90"])).unwrap();
        assert!(matches!(cli.command, Commands::Meeting { action: MeetingAction::Add { duration: 90, .. } }));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use crate::cli::Cli;
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
