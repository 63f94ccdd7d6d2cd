//! The base event: phases, handlers, phase-ordering edges, and the atomic
//! invoker rebuild (component C).

use std::cell::Cell;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use crate::error::EventError;
use crate::factory::InvokerFactory;
use crate::sort::{sort_nodes, SortableNode};

pub(crate) struct PhaseNode<I, T> {
    pub(crate) id: I,
    pub(crate) handlers: Vec<T>,
    pub(crate) preceding: BTreeSet<I>,
    pub(crate) following: BTreeSet<I>,
    visited: Cell<bool>,
}

impl<I, T> PhaseNode<I, T> {
    pub(crate) fn new(id: I) -> Self {
        Self {
            id,
            handlers: Vec::new(),
            preceding: BTreeSet::new(),
            following: BTreeSet::new(),
            visited: Cell::new(false),
        }
    }
}

impl<'a, I, T> SortableNode for &'a PhaseNode<I, T>
where
    I: Clone + Ord + Hash + fmt::Debug,
{
    type Id = I;

    fn id(&self) -> &I {
        &self.id
    }

    fn preceding(&self) -> &BTreeSet<I> {
        &self.preceding
    }

    fn following(&self) -> &BTreeSet<I> {
        &self.following
    }

    fn visited(&self) -> &Cell<bool> {
        &self.visited
    }
}

pub(crate) struct EventInner<I, T> {
    pub(crate) phases: IndexMap<I, PhaseNode<I, T>>,
}

/// A dispatch point: a set of phases, each holding an ordered sequence of
/// handlers, exposing a single invoker built by a factory.
///
/// `I` is the phase identifier type (usually `String` or `&'static str`);
/// `T` is the handler type, typically a cheaply-`Clone`able handle such as
/// `Arc<dyn Fn(..) + Send + Sync>`.
pub struct Event<I, T> {
    default_phase: I,
    factory: Arc<dyn InvokerFactory<T> + Send + Sync>,
    inner: Mutex<EventInner<I, T>>,
    invoker: RwLock<Arc<T>>,
}

impl<I: fmt::Debug, T> fmt::Debug for Event<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event").field("default_phase", &self.default_phase).finish_non_exhaustive()
    }
}

impl<I, T> Event<I, T>
where
    I: Clone + Eq + Hash,
{
    /// Creates a new event with the given default phase and invoker
    /// factory. The initial invoker is obtained by calling the factory with
    /// an empty handler array, matching the no-registrations baseline.
    pub fn new(default_phase: I, factory: impl InvokerFactory<T> + Send + Sync + 'static) -> Self {
        Self::from_factory_arc(default_phase, Arc::new(factory))
    }

    pub(crate) fn from_factory_arc(default_phase: I, factory: Arc<dyn InvokerFactory<T> + Send + Sync>) -> Self {
        let initial = factory.apply(&[]);
        Self {
            default_phase,
            factory,
            inner: Mutex::new(EventInner { phases: IndexMap::new() }),
            invoker: RwLock::new(Arc::new(initial)),
        }
    }

    /// Registers `handler` into the default phase.
    pub fn register(&self, handler: T)
    where
        T: Clone,
        I: Ord + fmt::Debug,
    {
        let phase = self.default_phase.clone();
        self.register_phase(phase, handler);
    }

    /// Registers `handler` into the given phase, creating the phase if it
    /// doesn't already exist.
    pub fn register_phase(&self, phase: I, handler: T)
    where
        T: Clone,
        I: Ord + fmt::Debug,
    {
        let mut inner = self.inner.lock();
        get_or_create(&mut inner.phases, &phase).handlers.push(handler);
        self.rebuild_and_publish(&mut inner);
    }

    /// The phase identifier used when a registration omits one.
    pub fn default_phase(&self) -> &I {
        &self.default_phase
    }
}

/// Constructs a fresh phase node for `id` if one is not already present,
/// and returns a mutable reference to it either way.
pub(crate) fn get_or_create<'a, I, T>(phases: &'a mut IndexMap<I, PhaseNode<I, T>>, id: &I) -> &'a mut PhaseNode<I, T>
where
    I: Clone + Eq + Hash,
{
    phases.entry(id.clone()).or_insert_with(|| PhaseNode::new(id.clone()))
}

impl<I, T> Event<I, T>
where
    I: Clone + Eq + Hash + Ord + fmt::Debug,
    T: Clone,
{
    /// Declares that phase `first` must run before phase `second`, creating
    /// both phases if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SelfLink`] if `first == second`, leaving the
    /// event unchanged.
    pub fn add_phase_ordering(&self, first: I, second: I) -> Result<(), EventError<I>> {
        if first == second {
            return Err(EventError::SelfLink(first));
        }
        let mut inner = self.inner.lock();
        get_or_create(&mut inner.phases, &first);
        get_or_create(&mut inner.phases, &second);
        if let Some(node) = inner.phases.get_mut(&first) {
            node.following.insert(second.clone());
        }
        if let Some(node) = inner.phases.get_mut(&second) {
            node.preceding.insert(first.clone());
        }
        self.rebuild_and_publish(&mut inner);
        Ok(())
    }

    /// Returns the current invoker. Callers must not cache the result
    /// across registrations — object identity of the invoker is deliberately
    /// unstable.
    pub fn invoker(&self) -> Arc<T> {
        self.invoker.read().clone()
    }

    /// Builds an [`Event`] whose phase graph is an exact copy of a snapshot
    /// (used by [`crate::filtered::FilteredEvent::for_context`] to seed a
    /// derived event without replaying one registration at a time).
    pub(crate) fn from_snapshot(
        default_phase: I,
        factory: Arc<dyn InvokerFactory<T> + Send + Sync>,
        phases: impl IntoIterator<Item = (I, Vec<T>)>,
        edges: impl IntoIterator<Item = (I, I)>,
    ) -> Self {
        let event = Self::from_factory_arc(default_phase, factory);
        {
            let mut inner = event.inner.lock();
            for (id, handlers) in phases {
                let node = get_or_create(&mut inner.phases, &id);
                node.handlers = handlers;
            }
            for (first, second) in edges {
                get_or_create(&mut inner.phases, &first);
                get_or_create(&mut inner.phases, &second);
                if let Some(node) = inner.phases.get_mut(&first) {
                    node.following.insert(second.clone());
                }
                if let Some(node) = inner.phases.get_mut(&second) {
                    node.preceding.insert(first);
                }
            }
            event.rebuild_and_publish(&mut inner);
        }
        event
    }

    fn rebuild_and_publish(&self, inner: &mut EventInner<I, T>) {
        let mut ordered: Vec<&PhaseNode<I, T>> = inner.phases.values().collect();
        sort_nodes(&mut ordered, "event phases", |a, b| a.id.cmp(&b.id));
        let consolidated: Vec<T> = ordered.iter().flat_map(|node| node.handlers.iter().cloned()).collect();
        let built = self.factory.apply(&consolidated);
        *self.invoker.write() = Arc::new(built);
    }
}
