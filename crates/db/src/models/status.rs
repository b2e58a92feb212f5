//! Status helper enum mapping to the SMALLINT `job_statuses` lookup table.
//!
//! Variant discriminants match the seed data order (1-based) and the
//! constants in `formflow_core::scheduling::state_machine`.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Map a raw status ID back to the enum, if known.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Automation job lifecycle status.
    JobStatus {
        /// Created, waiting to be claimed.
        Pending = 1,
        /// Claimed by a worker slot and executing.
        Processing = 2,
        /// Manually paused; the executor blocks at the next checkpoint.
        Paused = 3,
        /// Blocked on a human answer (human-in-the-loop mailbox armed).
        WaitingInput = 4,
        /// Answer supplied; the executor picks it up and flips back to Processing.
        Resuming = 5,
        Completed = 6,
        Failed = 7,
        /// Retry budget exhausted.
        Dead = 8,
        Cancelled = 9,
        /// Cancel requested; finalized at the next checkpoint.
        Cancelling = 10,
    }
}

/// Terminal statuses: completed, failed, dead, cancelled.
pub const TERMINAL_STATUSES: [StatusId; 4] = [
    JobStatus::Completed as StatusId,
    JobStatus::Failed as StatusId,
    JobStatus::Dead as StatusId,
    JobStatus::Cancelled as StatusId,
];

/// Statuses that must abort an executing job at its next checkpoint.
pub const STOP_STATUSES: [StatusId; 3] = [
    JobStatus::Cancelled as StatusId,
    JobStatus::Cancelling as StatusId,
    JobStatus::Dead as StatusId,
];
