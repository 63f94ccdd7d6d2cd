//! A typed, phased, filterable event dispatch framework.
//!
//! Producers declare an [`Event`] (or a context-aware [`FilteredEvent`]) by
//! supplying an [`InvokerFactory`] that turns the current handler array into
//! a single dispatchable value. Subscribers register handlers into named
//! phases, optionally constraining their execution order relative to other
//! phases via [`Event::add_phase_ordering`]. Dispatch itself is just calling
//! the value returned by [`Event::invoker`] — there is no separate dispatch
//! method on the event.
//!
//! An [`EventManager`] ties a family of events to a shared default phase and
//! fires a creation meta-event after each one is built; [`factories`] ships
//! ready-made invoker factories for the three short-circuit shapes that come
//! up most often (sequence, filter, tri-state).

#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod factories;
pub mod factory;
pub mod filtered;
pub mod manager;
pub mod sort;

pub use error::EventError;
pub use event::Event;
pub use factory::InvokerFactory;
pub use filtered::{ContextualisedEvent, FilteredEvent, Selector};
pub use manager::{Creation, EventManager, ListenAllTarget, PhaseDeclaration};
pub use sort::{sort_nodes, SortableNode};
