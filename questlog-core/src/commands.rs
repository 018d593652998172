//! Inbound completion facts from the CRUD layer.
//!
//! These are processed by [`Gamification`](crate::Gamification), which
//! awards XP, updates the streak and appends to the activity log.

use serde::{Deserialize, Serialize};

use crate::types::{Priority, ProjectFacts, ProjectStatus};

/// A task was toggled to completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCompletion {
    /// ID of the task in the CRUD layer.
    pub task_id: String,

    /// Task title, kept in the log for display.
    pub title: String,

    /// Priority of the task, which decides the XP.
    pub priority: Priority,
}

/// A project's status was updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectTransition {
    /// ID of the project in the CRUD layer.
    pub project_id: String,

    /// Project title, kept in the log for display.
    pub title: String,

    /// Status before the update.
    pub previous_status: ProjectStatus,

    /// Project facts after the update.
    pub project: ProjectFacts,
}

impl ProjectTransition {
    /// Whether this update moves the project into `completed`.
    #[must_use]
    pub fn completes_project(&self) -> bool {
        self.previous_status != ProjectStatus::Completed
            && self.project.status == ProjectStatus::Completed
    }
}

/// A research idea was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchCreated {
    /// ID of the idea in the CRUD layer.
    pub research_id: String,

    /// Idea title, kept in the log for display.
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(previous: ProjectStatus, next: ProjectStatus) -> ProjectTransition {
        ProjectTransition {
            project_id: "proj-1".to_string(),
            title: "Ship it".to_string(),
            previous_status: previous,
            project: ProjectFacts {
                status: next,
                xp_reward: None,
            },
        }
    }

    #[test]
    fn only_transition_into_completed_completes() {
        assert!(transition(ProjectStatus::Ongoing, ProjectStatus::Completed).completes_project());
        assert!(transition(ProjectStatus::Planned, ProjectStatus::Completed).completes_project());
    }

    #[test]
    fn already_completed_or_reopened_does_not_complete() {
        assert!(!transition(ProjectStatus::Completed, ProjectStatus::Completed).completes_project());
        assert!(!transition(ProjectStatus::Completed, ProjectStatus::Ongoing).completes_project());
        assert!(!transition(ProjectStatus::Planned, ProjectStatus::Ongoing).completes_project());
    }

    #[test]
    fn task_completion_deserializes_priority() {
        let json = r#"{"task_id":"t1","title":"Write tests","priority":"high"}"#;
        let completion: TaskCompletion = serde_json::from_str(json).unwrap();
        assert_eq!(completion.priority, Priority::High);
    }

    #[test]
    fn task_completion_rejects_unknown_priority() {
        let json = r#"{"task_id":"t1","title":"Write tests","priority":"urgent"}"#;
        assert!(serde_json::from_str::<TaskCompletion>(json).is_err());
    }
}
