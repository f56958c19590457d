//! Production job state machine.
//!
//! Transitions are looked up in a single `(status, event)` table; anything
//! not listed is rejected. Requests that name a target status are mapped to
//! the event that reaches it from the current status.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::production_job::JobStatus;
use crate::errors::ServiceError;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobEvent {
    Reserve,
    StartPrinting,
    StartCuring,
    StartPacking,
    Complete,
    PassQc,
    FailQc,
    Cancel,
}

/// The transition table. `None` means the event is not allowed.
pub fn next_status(from: JobStatus, event: JobEvent) -> Option<JobStatus> {
    use JobEvent::*;
    use JobStatus::*;

    match (from, event) {
        (Pending, Reserve) => Some(Reserved),
        (Pending | Reserved | QcFailed, StartPrinting) => Some(Printing),
        (Printing, StartCuring) => Some(Curing),
        (Printing | Curing, StartPacking) => Some(Packing),
        (Packing | QcPassed, Complete) => Some(Completed),
        (Packing | Completed, PassQc) => Some(QcPassed),
        (Packing | Completed, FailQc) => Some(QcFailed),
        (Pending | Reserved | Printing | Curing | Packing | QcFailed, Cancel) => Some(Cancelled),
        _ => None,
    }
}

/// Applies `event`, rejecting transitions missing from the table.
pub fn apply(from: JobStatus, event: JobEvent) -> Result<JobStatus, ServiceError> {
    next_status(from, event).ok_or_else(|| {
        ServiceError::InvalidStatus(format!("cannot {} a job that is {}", event, from))
    })
}

/// Event that moves a job to `to`; each target status has exactly one.
pub fn event_for_target(to: JobStatus) -> Option<JobEvent> {
    match to {
        JobStatus::Reserved => Some(JobEvent::Reserve),
        JobStatus::Printing => Some(JobEvent::StartPrinting),
        JobStatus::Curing => Some(JobEvent::StartCuring),
        JobStatus::Packing => Some(JobEvent::StartPacking),
        JobStatus::Completed => Some(JobEvent::Complete),
        JobStatus::QcPassed => Some(JobEvent::PassQc),
        JobStatus::QcFailed => Some(JobEvent::FailQc),
        JobStatus::Cancelled => Some(JobEvent::Cancel),
        JobStatus::Pending => None,
    }
}

/// Outcome of asking for a target status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Already in the requested status; nothing to write.
    Unchanged,
    To(JobStatus),
}

/// Validates a move from `from` to `to` against the table.
pub fn transition_to(from: JobStatus, to: JobStatus) -> Result<Transition, ServiceError> {
    if from == to {
        return Ok(Transition::Unchanged);
    }
    let event = event_for_target(to).ok_or_else(|| {
        ServiceError::InvalidStatus(format!("cannot move a job from {} to {}", from, to))
    })?;
    next_status(from, event).map(Transition::To).ok_or_else(|| {
        ServiceError::InvalidStatus(format!("cannot move a job from {} to {}", from, to))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn happy_path_through_the_floor() {
        let mut status = JobStatus::Pending;
        for event in [
            JobEvent::Reserve,
            JobEvent::StartPrinting,
            JobEvent::StartCuring,
            JobEvent::StartPacking,
            JobEvent::Complete,
            JobEvent::PassQc,
        ] {
            status = apply(status, event).unwrap();
        }
        assert_eq!(status, JobStatus::QcPassed);
    }

    #[test]
    fn printing_can_skip_curing() {
        assert_eq!(
            apply(JobStatus::Printing, JobEvent::StartPacking).unwrap(),
            JobStatus::Packing
        );
    }

    #[test]
    fn failed_qc_goes_back_to_printing() {
        assert_eq!(
            apply(JobStatus::QcFailed, JobEvent::StartPrinting).unwrap(),
            JobStatus::Printing
        );
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        assert!(matches!(
            transition_to(JobStatus::Completed, JobStatus::Pending),
            Err(ServiceError::InvalidStatus(_))
        ));
        assert!(apply(JobStatus::Pending, JobEvent::Complete).is_err());
        assert!(apply(JobStatus::Completed, JobEvent::Cancel).is_err());
        assert!(apply(JobStatus::Curing, JobEvent::StartCuring).is_err());
    }

    #[test]
    fn cancelled_is_terminal() {
        for event in JobEvent::iter() {
            assert_eq!(next_status(JobStatus::Cancelled, event), None);
        }
    }

    #[test]
    fn same_status_is_unchanged() {
        for status in JobStatus::iter() {
            assert_eq!(transition_to(status, status).unwrap(), Transition::Unchanged);
        }
    }

    #[test]
    fn target_lookup_agrees_with_event_table() {
        for from in JobStatus::iter() {
            for event in JobEvent::iter() {
                if let Some(to) = next_status(from, event) {
                    assert_eq!(transition_to(from, to).unwrap(), Transition::To(to));
                }
            }
        }
    }
}
