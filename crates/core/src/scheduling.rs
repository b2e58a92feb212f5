//! Job scheduling constants and status state machine.
//!
//! This module lives in `core` (zero internal deps) so it can be used by
//! both the persistence layer and the worker without pulling in sqlx.

// ---------------------------------------------------------------------------
// Priority constants
// ---------------------------------------------------------------------------

/// Priority sentinel for urgent jobs. Claimed before all others; retry
/// escalation forces a failing job to this value so it runs next.
pub const PRIORITY_URGENT: i32 = -1;

/// Priority value for normal jobs. Default.
pub const PRIORITY_NORMAL: i32 = 0;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Job status IDs matching the `job_statuses` seed data (1-based SMALLINT).
///
/// The numeric values are intentionally duplicated from the `db` crate's
/// `JobStatus` enum because `core` must have zero internal deps.
pub mod state_machine {
    /// Pending=1, Processing=2, Paused=3, WaitingInput=4, Resuming=5,
    /// Completed=6, Failed=7, Dead=8, Cancelled=9, Cancelling=10.
    pub const PENDING: i16 = 1;
    pub const PROCESSING: i16 = 2;
    pub const PAUSED: i16 = 3;
    pub const WAITING_INPUT: i16 = 4;
    pub const RESUMING: i16 = 5;
    pub const COMPLETED: i16 = 6;
    pub const FAILED: i16 = 7;
    pub const DEAD: i16 = 8;
    pub const CANCELLED: i16 = 9;
    pub const CANCELLING: i16 = 10;

    /// Statuses a job never leaves.
    pub const TERMINAL: [i16; 4] = [COMPLETED, FAILED, DEAD, CANCELLED];

    /// True for statuses that end the job's lifecycle.
    pub fn is_terminal(status: i16) -> bool {
        TERMINAL.contains(&status)
    }

    /// Returns the set of valid target statuses reachable from `from`.
    ///
    /// Terminal states return an empty slice because no further
    /// transitions are allowed. Every non-terminal state can reach
    /// Cancelled (directly or via Cancelling).
    pub fn valid_transitions(from: i16) -> &'static [i16] {
        match from {
            // Pending -> claimed, paused before start, or cancelled
            PENDING => &[PROCESSING, PAUSED, CANCELLING, CANCELLED],
            // Processing -> done, failed, retried, paused, waiting on a
            // human, or cancelled
            PROCESSING => &[
                COMPLETED,
                FAILED,
                DEAD,
                PENDING,
                PAUSED,
                WAITING_INPUT,
                CANCELLING,
                CANCELLED,
            ],
            // Paused -> back to work or cancelled
            PAUSED => &[PROCESSING, CANCELLING, CANCELLED],
            // WaitingInput -> answered, timed out, or cancelled
            WAITING_INPUT => &[RESUMING, FAILED, DEAD, CANCELLING, CANCELLED],
            // Resuming -> back to processing or cancelled
            RESUMING => &[PROCESSING, CANCELLING, CANCELLED],
            // Cancelling -> observed at a checkpoint and finalized
            CANCELLING => &[CANCELLED],
            // Terminal states: Completed, Failed, Dead, Cancelled
            COMPLETED | FAILED | DEAD | CANCELLED => &[],
            // Unknown status: no transitions allowed
            _ => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: i16, to: i16) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Validate a state transition, returning an error message for
    /// invalid ones.
    pub fn validate_transition(from: i16, to: i16) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(format!("Invalid job status transition: {from} -> {to}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::state_machine::*;

    // -----------------------------------------------------------------------
    // Valid transitions
    // -----------------------------------------------------------------------

    #[test]
    fn pending_to_processing() {
        assert!(can_transition(PENDING, PROCESSING));
    }

    #[test]
    fn processing_to_completed() {
        assert!(can_transition(PROCESSING, COMPLETED));
    }

    #[test]
    fn processing_to_pending_for_retry() {
        assert!(can_transition(PROCESSING, PENDING));
    }

    #[test]
    fn processing_to_waiting_input() {
        assert!(can_transition(PROCESSING, WAITING_INPUT));
    }

    #[test]
    fn waiting_input_to_resuming() {
        assert!(can_transition(WAITING_INPUT, RESUMING));
    }

    #[test]
    fn resuming_to_processing() {
        assert!(can_transition(RESUMING, PROCESSING));
    }

    #[test]
    fn paused_to_processing() {
        assert!(can_transition(PAUSED, PROCESSING));
    }

    #[test]
    fn cancelling_to_cancelled() {
        assert!(can_transition(CANCELLING, CANCELLED));
    }

    #[test]
    fn every_non_terminal_state_can_reach_cancelled() {
        for from in [PENDING, PROCESSING, PAUSED, WAITING_INPUT, RESUMING, CANCELLING] {
            assert!(
                can_transition(from, CANCELLED) || can_transition(from, CANCELLING),
                "status {from} cannot be cancelled"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Terminal protection
    // -----------------------------------------------------------------------

    #[test]
    fn terminal_states_have_no_exits() {
        for from in TERMINAL {
            assert!(valid_transitions(from).is_empty(), "status {from} has exits");
        }
    }

    #[test]
    fn completed_cannot_be_cancelled() {
        assert!(!can_transition(COMPLETED, CANCELLED));
    }

    #[test]
    fn unknown_status_has_no_exits() {
        assert!(valid_transitions(42).is_empty());
    }

    #[test]
    fn validate_transition_reports_the_pair() {
        let err = validate_transition(COMPLETED, PENDING).unwrap_err();
        assert!(err.contains("6 -> 1"));
    }
}
