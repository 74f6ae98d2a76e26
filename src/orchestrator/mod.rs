//! Application-level orchestration.
//!
//! This module owns the launch path (validation, spawn, hand-off to a tracker) and the
//! post-session path (ledger update and event publication). CLI code calls into it and
//! only ever sees [`SessionEvent`](crate::model::SessionEvent)s.

mod completion;
mod coordinator;

pub(crate) use coordinator::LaunchCoordinator;
