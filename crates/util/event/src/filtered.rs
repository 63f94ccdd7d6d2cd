//! Context-filtered events and their derived contextualised views
//! (component D).
//!
//! A [`FilteredEvent`] adds a predicate ("selector") to each registered
//! handler. Its own invoker only ever consolidates the *global* handlers
//! (those registered without a selector); guarded handlers only become live
//! once the filtered event is asked to derive a view for a concrete context
//! via [`FilteredEvent::for_context`]. A derived view is a plain
//! [`ContextualisedEvent`] — literally an [`Event`] — so dispatch, direct
//! registration, and phase ordering on it are the exact same code path as
//! any other event; [`FilteredEvent`] never reimplements dispatch, it only
//! drives a derived event's own public API.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use crate::error::EventError;
use crate::event::Event;
use crate::factory::InvokerFactory;
use crate::sort::{sort_nodes, SortableNode};

/// A context predicate deciding whether a guarded handler applies.
pub type Selector<C> = Arc<dyn Fn(&C) -> bool + Send + Sync>;

/// A derived, context-bound view of a [`FilteredEvent`].
///
/// Contextualised events are not a distinct type: they are plain [`Event`]
/// instances, seeded from the parent's state at derivation time and driven
/// afterwards through their own public API. Registering directly on one is
/// permitted and behaves exactly like registering on any other [`Event`];
/// such registrations do not propagate back to the parent.
pub type ContextualisedEvent<I, T> = Event<I, T>;

struct GuardedPhaseNode<I, C, T> {
    id: I,
    guarded: Vec<(T, Option<Selector<C>>)>,
    preceding: BTreeSet<I>,
    following: BTreeSet<I>,
    visited: std::cell::Cell<bool>,
}

impl<I, C, T> GuardedPhaseNode<I, C, T> {
    fn new(id: I) -> Self {
        Self {
            id,
            guarded: Vec::new(),
            preceding: BTreeSet::new(),
            following: BTreeSet::new(),
            visited: std::cell::Cell::new(false),
        }
    }

    fn global_handlers(&self) -> impl Iterator<Item = &T> {
        self.guarded.iter().filter(|(_, sel)| sel.is_none()).map(|(h, _)| h)
    }
}

impl<'a, I, C, T> SortableNode for &'a GuardedPhaseNode<I, C, T>
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

    fn visited(&self) -> &std::cell::Cell<bool> {
        &self.visited
    }
}

struct FilteredInner<I, C, T> {
    phases: IndexMap<I, GuardedPhaseNode<I, C, T>>,
    derived: HashMap<C, Weak<ContextualisedEvent<I, T>>>,
}

/// An [`Event`] whose handlers may each carry a context predicate, plus a
/// cache of derived [`ContextualisedEvent`]s keyed by context equality.
pub struct FilteredEvent<I, C, T> {
    default_phase: I,
    factory: Arc<dyn InvokerFactory<T> + Send + Sync>,
    inner: Mutex<FilteredInner<I, C, T>>,
    invoker: RwLock<Arc<T>>,
}

impl<I, C, T> FilteredEvent<I, C, T>
where
    I: Clone + Eq + Hash + Ord + fmt::Debug,
    C: Clone + Eq + Hash,
    T: Clone,
{
    /// Creates a new filtered event with the given default phase and
    /// invoker factory.
    pub fn new(default_phase: I, factory: impl InvokerFactory<T> + Send + Sync + 'static) -> Self {
        let factory: Arc<dyn InvokerFactory<T> + Send + Sync> = Arc::new(factory);
        let initial = factory.apply(&[]);
        Self {
            default_phase,
            factory,
            inner: Mutex::new(FilteredInner {
                phases: IndexMap::new(),
                derived: HashMap::new(),
            }),
            invoker: RwLock::new(Arc::new(initial)),
        }
    }

    /// The phase identifier used when a registration omits one.
    pub fn default_phase(&self) -> &I {
        &self.default_phase
    }

    /// Registers an unconditional (global) handler into the default phase.
    pub fn register(&self, handler: T) {
        let phase = self.default_phase.clone();
        self.register_phase_filtered(phase, handler, None);
    }

    /// Registers a guarded handler into the default phase.
    pub fn register_filtered(&self, handler: T, selector: Selector<C>) {
        let phase = self.default_phase.clone();
        self.register_phase_filtered(phase, handler, Some(selector));
    }

    /// Registers an unconditional (global) handler into `phase`, creating it
    /// if necessary.
    pub fn register_phase(&self, phase: I, handler: T) {
        self.register_phase_filtered(phase, handler, None);
    }

    /// Registers a guarded handler into `phase`, creating it if necessary.
    pub fn register_phase_filtered(&self, phase: I, handler: T, selector: Option<Selector<C>>) {
        let mut inner = self.inner.lock();
        get_or_create_guarded(&mut inner.phases, &phase).guarded.push((handler.clone(), selector.clone()));
        purge_and_propagate_register(&mut inner.derived, &phase, &handler, &selector);
        self.rebuild_and_publish(&mut inner);
    }

    /// Declares that phase `first` must run before phase `second`, mirroring
    /// the edge onto every live derived event.
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
        get_or_create_guarded(&mut inner.phases, &first);
        get_or_create_guarded(&mut inner.phases, &second);
        if let Some(node) = inner.phases.get_mut(&first) {
            node.following.insert(second.clone());
        }
        if let Some(node) = inner.phases.get_mut(&second) {
            node.preceding.insert(first.clone());
        }
        inner.derived.retain(|_, weak| weak.strong_count() > 0);
        let live: Vec<_> = inner.derived.values().filter_map(Weak::upgrade).collect();
        for derived in live {
            let _ = derived.add_phase_ordering(first.clone(), second.clone());
        }
        self.rebuild_and_publish(&mut inner);
        Ok(())
    }

    /// The current invoker, consolidating only unconditional handlers in
    /// canonical phase order. Guarded handlers only take effect through a
    /// [`Self::for_context`] derivation.
    pub fn invoker(&self) -> Arc<T> {
        self.invoker.read().clone()
    }

    /// Returns the live derived event for context `c`, creating one if none
    /// exists yet (or if `replace` is `true`, unconditionally creating a
    /// fresh one that supersedes any previous entry for an equal context).
    pub fn for_context(&self, c: C, replace: bool) -> Arc<ContextualisedEvent<I, T>> {
        let mut inner = self.inner.lock();
        inner.derived.retain(|_, weak| weak.strong_count() > 0);

        if !replace {
            if let Some(existing) = inner.derived.get(&c).and_then(Weak::upgrade) {
                return existing;
            }
        }

        let phases: Vec<(I, Vec<T>)> = inner
            .phases
            .values()
            .map(|node| {
                let handlers: Vec<T> = node
                    .guarded
                    .iter()
                    .filter(|(_, sel)| sel.as_ref().map_or(true, |s| s(&c)))
                    .map(|(h, _)| h.clone())
                    .collect();
                (node.id.clone(), handlers)
            })
            .collect();
        let edges: Vec<(I, I)> = inner
            .phases
            .values()
            .flat_map(|node| node.following.iter().map(move |next| (node.id.clone(), next.clone())))
            .collect();

        let derived = Arc::new(ContextualisedEvent::from_snapshot(
            self.default_phase.clone(),
            self.factory.clone(),
            phases,
            edges,
        ));
        inner.derived.insert(c, Arc::downgrade(&derived));
        derived
    }

    fn rebuild_and_publish(&self, inner: &mut FilteredInner<I, C, T>) {
        let mut ordered: Vec<&GuardedPhaseNode<I, C, T>> = inner.phases.values().collect();
        sort_nodes(&mut ordered, "filtered event phases", |a, b| a.id.cmp(&b.id));
        let consolidated: Vec<T> = ordered.iter().flat_map(|node| node.global_handlers().cloned()).collect();
        let built = self.factory.apply(&consolidated);
        *self.invoker.write() = Arc::new(built);
    }
}

fn get_or_create_guarded<'a, I, C, T>(
    phases: &'a mut IndexMap<I, GuardedPhaseNode<I, C, T>>,
    id: &I,
) -> &'a mut GuardedPhaseNode<I, C, T>
where
    I: Clone + Eq + Hash,
{
    phases.entry(id.clone()).or_insert_with(|| GuardedPhaseNode::new(id.clone()))
}

fn purge_and_propagate_register<I, C, T>(
    derived: &mut HashMap<C, Weak<ContextualisedEvent<I, T>>>,
    phase: &I,
    handler: &T,
    selector: &Option<Selector<C>>,
) where
    I: Clone + Eq + Hash + Ord + fmt::Debug,
    C: Clone + Eq + Hash,
    T: Clone,
{
    derived.retain(|_, weak| weak.strong_count() > 0);
    for (ctx, weak) in derived.iter() {
        let Some(event) = weak.upgrade() else { continue };
        let applies = selector.as_ref().map_or(true, |s| s(ctx));
        if applies {
            event.register_phase(phase.clone(), handler.clone());
        }
    }
}
