//! Sample records for demos and empty-state previews.
//!
//! Dates are relative to the `now` passed in so the data always looks current.

use chrono::{Duration, Months, NaiveDateTime};
use log::info;

use crate::db::Database;
use crate::decision::Decision;
use crate::error::StoreResult;
use crate::fields::*;
use crate::meeting::Meeting;
use crate::observation::{Observation, RubricComponent};
use crate::task::Task;

/// One meeting a week ago and one three days out. Ids are placeholders; the
/// store assigns real ones when `seed` inserts them.
pub fn sample_meetings(now: NaiveDateTime) -> Vec<Meeting> {
    let mut admin = Meeting::new("Admin Team Meeting", now - Duration::days(7), MeetingType::Admin);
    admin.id = 1;
    admin.end = admin.start + Duration::minutes(60);
    admin.attendees = vec!["Alice Johnson".into(), "Bob Smith".into()];
    admin.status = MeetingStatus::Completed;
    admin.notes = Some("Discuss upcoming school year goals.".into());

    let mut staff = Meeting::new("Staff Meeting", now + Duration::days(3), MeetingType::Staff);
    staff.id = 2;
    staff.end = staff.start + Duration::minutes(45);
    staff.attendees = vec!["Carol Lee".into(), "David Brown".into(), "Eva Green".into()];

    vec![admin, staff]
}

/// Insert the full sample set through the normal store API.
pub fn seed(db: &mut Database, now: NaiveDateTime) -> StoreResult<()> {
    let safety = db.insert_category("Safety")?;
    let hr = db.insert_category("HR Policies")?;

    let compliance = [
        ("Fire Drill Documentation", "Ensure all fire drill logs are up to date.", safety, now + Duration::days(7)),
        ("Regents testing Proctor", "Revise the handbook to include new regents.", hr, now + Duration::days(14)),
        (
            "Annual Safety Training",
            "All staff must complete annual safety training.",
            safety,
            now.checked_add_months(Months::new(1)).unwrap_or(now + Duration::days(30)),
        ),
    ];
    for (title, detail, category, due) in compliance {
        let mut task = Task::new(title, due, now);
        task.detail = Some(detail.to_string());
        task.category = Some(category);
        task.task_type = TaskType::Compliance;
        db.insert_task(task)?;
    }

    let mut meeting_ids = Vec::new();
    for mut meeting in sample_meetings(now) {
        meeting.id = 0;
        meeting_ids.push(db.insert_meeting(meeting)?);
    }
    let admin_meeting = meeting_ids.first().copied();

    let mut onboarding = Decision::new("Implement New Onboarding Process", "Shorten time to productivity for new hires.", now - Duration::days(10));
    onboarding.detail = Some("Adopt the revised onboarding checklist for all new hires.".into());
    onboarding.next_steps = Some("Schedule training for managers.".into());
    onboarding.impact = ImpactLevel::High;
    onboarding.effectiveness = Effectiveness::Effective;
    onboarding.reflection = Some("The process improved efficiency.".into());
    onboarding.meeting = admin_meeting;
    db.insert_decision(onboarding)?;

    let mut attendance = Decision::new("Switch to Digital Attendance", "Reduce paper handling in the front office.", now - Duration::days(20));
    attendance.detail = Some("Move all staff attendance to the digital system.".into());
    attendance.next_steps = Some("Notify staff and provide login details.".into());
    attendance.effectiveness = Effectiveness::Ineffective;
    attendance.reflection = Some("Need more training for some staff.".into());
    attendance.meeting = admin_meeting;
    db.insert_decision(attendance)?;

    let mut follow_up = Task::new("Share onboarding checklist", now + Duration::days(2), now);
    follow_up.task_type = TaskType::MeetingFollowUp;
    follow_up.meeting = admin_meeting;
    db.insert_task(follow_up)?;

    let walkthroughs = [
        ("Ms. Anderson", "Biology", now - Duration::days(6), true),
        ("Mr. Lee", "Algebra", now - Duration::days(2), false),
    ];
    for (i, (teacher, subject, date, full)) in walkthroughs.into_iter().enumerate() {
        let mut obs = Observation::new(teacher, subject, date);
        obs.observation_type = ObservationType::Walkthrough;
        obs.duration_minutes = 20;
        obs.overall_rating = if full { DanielsonScore::Effective } else { DanielsonScore::Developing };
        obs.follow_up_required = !full;
        obs.follow_up_date = (!full).then(|| now + Duration::days(7));
        let id = db.insert_observation(obs)?;

        let mut scores = vec![RubricComponent::new(DanielsonDomain::Instruction, "3c", "Engaging Students in Learning", DanielsonScore::Developing)];
        if full {
            scores.insert(
                0,
                RubricComponent::new(
                    DanielsonDomain::ClassroomEnvironment,
                    "2a",
                    "Creating an Environment of Respect and Rapport",
                    DanielsonScore::HighlyEffective,
                ),
            );
        }
        for component in scores {
            db.insert_component(id, component)?;
        }
        info!("event=seed_observation index={i} id={id}");
    }

    info!(
        "event=seed status=ok tasks={} meetings={} decisions={} observations={}",
        db.tasks.len(),
        db.meetings.len(),
        db.decisions.len(),
        db.observations.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap().and_hms_opt(9, 0, 0).unwrap()
    }

    #[test]
    fn seed_populates_every_collection_with_consistent_links() {
        let mut db = Database::default();
        seed(&mut db, now()).unwrap();

        assert_eq!(db.categories.len(), 2);
        assert_eq!(db.tasks.len(), 4);
        assert_eq!(db.meetings.len(), 2);
        assert_eq!(db.decisions.len(), 2);
        assert_eq!(db.observations.len(), 2);
        assert_eq!(db.components.len(), 3);

        let safety = &db.categories[0];
        assert_eq!(safety.tasks.len(), 2);
        assert_eq!(db.meeting_decisions(db.meetings[0].id).len(), 2);
        let anderson = &db.observations[0];
        assert_eq!(db.observation_average(anderson), 3.0);
    }

    #[test]
    fn seeding_twice_reuses_categories() {
        let mut db = Database::default();
        seed(&mut db, now()).unwrap();
        seed(&mut db, now()).unwrap();
        assert_eq!(db.categories.len(), 2);
        assert_eq!(db.tasks.len(), 8);
    }
}
