//! Session lifecycle transitions.
//!
//! Every status change, explicit or implicit, goes through [`transition`].
//! A `None` result means the event does not apply in the current status and
//! the caller must leave everything untouched.
//!
//! ```text
//!  idle ──start──► acquiring ──fix──► ready
//!                      │                │
//!                      └─begin_recording┴──► recording ◄──resume── paused
//!                                                 └──────pause───────►┘
//!  any non-terminal ──finish──► finished     any active ──source error──► error
//!  any ──reset──► idle                       finished / error ──start──► acquiring
//! ```

use crate::RunStatus;

/// Everything that can move a session between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    Start,
    FixAccepted,
    BeginRecording,
    Pause,
    Resume,
    Finish,
    Reset,
    SourceError,
}

/// Next status for `event` in `status`, or `None` if the event is a no-op.
pub fn transition(status: RunStatus, event: SessionEvent) -> Option<RunStatus> {
    use crate::RunStatus::*;

    match (status, event) {
        // A live session is never restarted by a stray start
        (Idle | Finished | Error, SessionEvent::Start) => Some(Acquiring),
        (Acquiring, SessionEvent::FixAccepted) => Some(Ready),
        (Acquiring | Ready, SessionEvent::BeginRecording) => Some(Recording),
        (Recording, SessionEvent::Pause) => Some(Paused),
        (Paused, SessionEvent::Resume) => Some(Recording),
        (Idle | Acquiring | Ready | Recording | Paused, SessionEvent::Finish) => Some(Finished),
        (_, SessionEvent::Reset) => Some(Idle),
        (Acquiring | Ready | Recording | Paused, SessionEvent::SourceError) => Some(Error),
        _ => None,
    }
}
