//! Argument validation errors.
//!
//! Every operation that can fail, fails synchronously and before any state
//! change — no partial mutation is ever observable. Cycles in phase
//! ordering are *not* represented here; they degrade to SCC grouping with a
//! warning (see [`crate::sort`]).

use std::fmt;

/// Validation errors raised by this crate's public API.
///
/// Follows the hand-rolled `enum` + manual `Display` + `std::error::Error`
/// pattern used throughout this crate's sibling utility crates rather than a
/// derive-macro error crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventError<I: fmt::Debug> {
    /// `add_phase_ordering(a, a)` was called with the same phase twice.
    SelfLink(I),
    /// `listen_all` was called with zero target events.
    EmptyListenAll,
    /// `create_with_phases`/`create_filtered_with_phases` was given a
    /// default-phases list containing the same phase identifier twice.
    DuplicateDefaultPhase(I),
    /// `create_with_phases`/`create_filtered_with_phases` was given a
    /// default-phases list that does not contain the manager's default
    /// phase identifier.
    DefaultPhaseMissing,
    /// `listen_all` was asked to register an object against an event whose
    /// handler interface the object cannot be shown to implement at the call
    /// site (a bound mismatch caught before any event is touched).
    MismatchedHandlerInterface {
        /// Index, within the `listen_all` call, of the offending event.
        event_index: usize,
    },
}

impl<I: fmt::Debug> fmt::Display for EventError<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventError::SelfLink(id) => {
                write!(f, "cannot add a phase ordering from phase {id:?} to itself")
            }
            EventError::EmptyListenAll => {
                write!(f, "listen_all requires at least one target event")
            }
            EventError::DuplicateDefaultPhase(id) => {
                write!(f, "default phase list contains {id:?} more than once")
            }
            EventError::DefaultPhaseMissing => {
                write!(f, "default phase list does not contain the manager's default phase")
            }
            EventError::MismatchedHandlerInterface { event_index } => {
                write!(
                    f,
                    "handler object is not assignable to the handler interface of event #{event_index}"
                )
            }
        }
    }
}

impl<I: fmt::Debug> std::error::Error for EventError<I> {}
