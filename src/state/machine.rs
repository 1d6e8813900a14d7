use std::fmt;

use crate::error::{QueueError, Result};
use crate::model::WorkerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Queued,
    /// Claimed by a worker and held in its claim area.
    Working(WorkerId),
    Completed,
    Failed,
}

impl TaskState {
    /// Status label shown to collaborators.
    pub fn label(&self) -> &'static str {
        match self {
            TaskState::Queued => "Queued",
            TaskState::Working(_) => "Working",
            TaskState::Completed => "Done",
            TaskState::Failed => "Failed",
        }
    }

    pub fn worker(&self) -> Option<&WorkerId> {
        match self {
            TaskState::Working(worker) => Some(worker),
            _ => None,
        }
    }

    /// Resolve `transition` from this state.
    ///
    /// Returns `Ok(None)` when the task already sits in the target state, so
    /// the caller must not move anything.
    pub fn apply(&self, transition: &Transition) -> Result<Option<TaskState>> {
        let target = transition.target();
        match (self, transition) {
            (TaskState::Queued, Transition::Claim(_)) => Ok(Some(target)),
            (_, Transition::Claim(_)) => Err(QueueError::InvalidTransition {
                from: self.to_string(),
                transition: transition.to_string(),
            }),
            _ if *self == target => Ok(None),
            _ => Ok(Some(target)),
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Queued => write!(f, "queued"),
            TaskState::Working(worker) => write!(f, "working on {}", worker),
            TaskState::Completed => write!(f, "completed"),
            TaskState::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Claim(WorkerId),
    Complete,
    Fail,
    Requeue,
}

impl Transition {
    pub fn target(&self) -> TaskState {
        match self {
            Transition::Claim(worker) => TaskState::Working(*worker),
            Transition::Complete => TaskState::Completed,
            Transition::Fail => TaskState::Failed,
            Transition::Requeue => TaskState::Queued,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Claim(_) => write!(f, "claim"),
            Transition::Complete => write!(f, "complete"),
            Transition::Fail => write!(f, "fail"),
            Transition::Requeue => write!(f, "requeue"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_states(worker: WorkerId) -> [TaskState; 4] {
        [
            TaskState::Queued,
            TaskState::Working(worker),
            TaskState::Completed,
            TaskState::Failed,
        ]
    }

    #[test]
    fn claim_only_from_queued() {
        let worker = WorkerId::new();
        let claim = Transition::Claim(worker);

        assert_eq!(
            TaskState::Queued.apply(&claim).unwrap(),
            Some(TaskState::Working(worker))
        );
        for state in &all_states(worker)[1..] {
            let err = state.apply(&claim).unwrap_err();
            assert!(matches!(err, QueueError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn claim_by_another_worker_is_rejected() {
        let holder = WorkerId::new();
        let other = WorkerId::new();
        assert!(TaskState::Working(holder)
            .apply(&Transition::Claim(other))
            .is_err());
    }

    #[test]
    fn complete_fail_requeue_reach_target_from_everywhere() {
        let worker = WorkerId::new();
        for transition in [Transition::Complete, Transition::Fail, Transition::Requeue] {
            let target = transition.target();
            for state in all_states(worker) {
                let next = state.apply(&transition).unwrap();
                if state == target {
                    assert_eq!(next, None, "{} from {} should be a no-op", transition, state);
                } else {
                    assert_eq!(next, Some(target));
                }
            }
        }
    }

    #[test]
    fn labels_match_collaborator_vocabulary() {
        let worker = WorkerId::new();
        let labels: Vec<_> = all_states(worker).iter().map(TaskState::label).collect();
        assert_eq!(labels, vec!["Queued", "Working", "Done", "Failed"]);
        assert_eq!(TaskState::Working(worker).worker(), Some(&worker));
        assert_eq!(TaskState::Queued.worker(), None);
    }
}
