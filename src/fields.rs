//! Enumerations and field types shared across records.
//!
//! This module defines the structured values used to classify tasks, meetings,
//! decisions and classroom observations, plus the option types used by the
//! dashboard and search commands.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Pending,
    InProgress,
    Completed,
    Overdue,
    Cancelled,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::InProgress => "In Progress",
            Status::Completed => "Completed",
            Status::Overdue => "Overdue",
            Status::Cancelled => "Cancelled",
        }
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    General,
    Compliance,
    MeetingFollowUp,
}

impl TaskType {
    pub fn label(self) -> &'static str {
        match self {
            TaskType::General => "General",
            TaskType::Compliance => "Compliance",
            TaskType::MeetingFollowUp => "Meeting Follow-up",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum MeetingStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Rescheduled,
}

impl MeetingStatus {
    pub fn label(self) -> &'static str {
        match self {
            MeetingStatus::Scheduled => "Scheduled",
            MeetingStatus::InProgress => "In Progress",
            MeetingStatus::Completed => "Completed",
            MeetingStatus::Cancelled => "Cancelled",
            MeetingStatus::Rescheduled => "Rescheduled",
        }
    }

    /// Task status a follow-up item inherits from its meeting.
    pub fn as_task_status(self) -> Status {
        match self {
            MeetingStatus::Scheduled | MeetingStatus::Rescheduled => Status::Pending,
            MeetingStatus::InProgress => Status::InProgress,
            MeetingStatus::Completed => Status::Completed,
            MeetingStatus::Cancelled => Status::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum MeetingType {
    Parent,
    Student,
    Staff,
    Admin,
    PreObservation,
    PostObservation,
}

impl MeetingType {
    pub fn label(self) -> &'static str {
        match self {
            MeetingType::Parent => "Parent Meeting",
            MeetingType::Student => "Student Meeting",
            MeetingType::Staff => "Staff Meeting",
            MeetingType::Admin => "Admin Meeting",
            MeetingType::PreObservation => "Pre-Observation Meeting",
            MeetingType::PostObservation => "Post-Observation Meeting",
        }
    }
}

/// Reach of a decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ImpactLevel {
    pub const ALL: [ImpactLevel; 4] = [
        ImpactLevel::Low,
        ImpactLevel::Medium,
        ImpactLevel::High,
        ImpactLevel::Critical,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ImpactLevel::Low => "Low",
            ImpactLevel::Medium => "Medium",
            ImpactLevel::High => "High",
            ImpactLevel::Critical => "Critical",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ImpactLevel::Low => "Minor operational changes with limited scope",
            ImpactLevel::Medium => "Moderate changes affecting multiple areas",
            ImpactLevel::High => "Significant changes with broad implications",
            ImpactLevel::Critical => "Major strategic decisions with organization-wide impact",
        }
    }
}

/// Outcome of a decision review. `Pending` until someone reviews it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Effectiveness {
    Effective,
    Ineffective,
    #[default]
    Pending,
}

impl Effectiveness {
    pub fn label(self) -> &'static str {
        match self {
            Effectiveness::Effective => "Effective",
            Effectiveness::Ineffective => "Ineffective",
            Effectiveness::Pending => "Pending",
        }
    }
}

/// Four-level rating used for whole observations and single rubric components.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum DanielsonScore {
    Ineffective,
    Developing,
    Effective,
    HighlyEffective,
}

impl DanielsonScore {
    pub const ALL: [DanielsonScore; 4] = [
        DanielsonScore::Ineffective,
        DanielsonScore::Developing,
        DanielsonScore::Effective,
        DanielsonScore::HighlyEffective,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DanielsonScore::Ineffective => "Ineffective",
            DanielsonScore::Developing => "Developing",
            DanielsonScore::Effective => "Effective",
            DanielsonScore::HighlyEffective => "Highly Effective",
        }
    }

    pub fn numeric(self) -> u8 {
        match self {
            DanielsonScore::Ineffective => 1,
            DanielsonScore::Developing => 2,
            DanielsonScore::Effective => 3,
            DanielsonScore::HighlyEffective => 4,
        }
    }

    /// Map a mean component score back onto a band. Values outside `[1, 5)`
    /// (including the 0.0 of an unscored observation) land on `Ineffective`.
    pub fn from_average(avg: f64) -> Self {
        if (2.0..3.0).contains(&avg) {
            DanielsonScore::Developing
        } else if (3.0..4.0).contains(&avg) {
            DanielsonScore::Effective
        } else if (4.0..5.0).contains(&avg) {
            DanielsonScore::HighlyEffective
        } else {
            DanielsonScore::Ineffective
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DanielsonDomain {
    PlanningPreparation,
    ClassroomEnvironment,
    Instruction,
    ProfessionalResponsibilities,
}

impl DanielsonDomain {
    pub fn label(self) -> &'static str {
        match self {
            DanielsonDomain::PlanningPreparation => "Planning & Preparation",
            DanielsonDomain::ClassroomEnvironment => "Classroom Environment",
            DanielsonDomain::Instruction => "Instruction",
            DanielsonDomain::ProfessionalResponsibilities => "Professional Responsibilities",
        }
    }

    /// Rubric components offered for this domain, as `(code, title)`.
    pub fn components(self) -> &'static [(&'static str, &'static str)] {
        match self {
            DanielsonDomain::PlanningPreparation => &[
                ("1a", "Demonstrating Knowledge of Content and Pedagogy"),
                ("1e", "Designing Coherent Instruction"),
            ],
            DanielsonDomain::ClassroomEnvironment => &[
                ("2a", "Creating an Environment of Respect and Rapport"),
                ("2d", "Managing Student Behavior"),
            ],
            DanielsonDomain::Instruction => &[
                ("3b", "Using Questioning and Discussion Techniques"),
                ("3c", "Engaging Students in Learning"),
                ("3d", "Using Assessment in Instruction"),
            ],
            DanielsonDomain::ProfessionalResponsibilities => {
                &[("4e", "Growing and Developing Professionally")]
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
pub enum GradeLevel {
    #[serde(rename = "9th")]
    #[value(name = "9th")]
    Ninth,
    #[serde(rename = "10th")]
    #[value(name = "10th")]
    Tenth,
    #[serde(rename = "11th")]
    #[value(name = "11th")]
    Eleventh,
    #[serde(rename = "12th")]
    #[value(name = "12th")]
    Twelfth,
}

impl GradeLevel {
    pub fn label(self) -> &'static str {
        match self {
            GradeLevel::Ninth => "9th",
            GradeLevel::Tenth => "10th",
            GradeLevel::Eleventh => "11th",
            GradeLevel::Twelfth => "12th",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ObservationType {
    Formal,
    Informal,
    Walkthrough,
    FollowUp,
}

impl ObservationType {
    pub fn label(self) -> &'static str {
        match self {
            ObservationType::Formal => "Formal",
            ObservationType::Informal => "Informal",
            ObservationType::Walkthrough => "Walkthrough",
            ObservationType::FollowUp => "Follow-up",
        }
    }
}

/// Granularity of dashboard period-over-period comparisons.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TimeRange {
    Day,
    #[default]
    Week,
    Month,
    Year,
}

impl TimeRange {
    pub fn label(self) -> &'static str {
        match self {
            TimeRange::Day => "Day",
            TimeRange::Week => "Week",
            TimeRange::Month => "Month",
            TimeRange::Year => "Year",
        }
    }
}

/// Ordering applied to search results.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Relevance,
    DateAscending,
    DateDescending,
    Name,
}

/// Record kinds a search can be restricted to.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum SearchCategory {
    #[default]
    All,
    Tasks,
    Meetings,
    Decisions,
    Observations,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_bands_follow_average() {
        assert_eq!(DanielsonScore::from_average(0.0), DanielsonScore::Ineffective);
        assert_eq!(DanielsonScore::from_average(1.5), DanielsonScore::Ineffective);
        assert_eq!(DanielsonScore::from_average(2.0), DanielsonScore::Developing);
        assert_eq!(DanielsonScore::from_average(2.5), DanielsonScore::Developing);
        assert_eq!(DanielsonScore::from_average(3.99), DanielsonScore::Effective);
        assert_eq!(DanielsonScore::from_average(4.0), DanielsonScore::HighlyEffective);
    }

    #[test]
    fn meeting_status_maps_onto_task_status() {
        assert_eq!(MeetingStatus::Rescheduled.as_task_status(), Status::Pending);
        assert_eq!(MeetingStatus::Completed.as_task_status(), Status::Completed);
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&TaskType::MeetingFollowUp).unwrap();
        assert_eq!(json, "\"meeting-follow-up\"");
        let grade: GradeLevel = serde_json::from_str("\"10th\"").unwrap();
        assert_eq!(grade, GradeLevel::Tenth);
        assert_eq!(Effectiveness::default(), Effectiveness::Pending);
    }
}
