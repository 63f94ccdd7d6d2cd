//! Central registry tying phase identifiers to freshly constructed events,
//! plus the annotation-style multi-event registration helper (components E
//! and F).

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::error::EventError;
use crate::event::Event;
use crate::factory::InvokerFactory;
use crate::filtered::FilteredEvent;

/// Payload delivered to [`EventManager::creation_event`] subscribers: which
/// event was just created and under what default phase.
///
/// Rust's static typing erases the creation event's own handler type at the
/// call site, so subscribers receive the new event's debug name rather than
/// the event value itself; callers who need the value keep the `Event`/
/// `FilteredEvent` returned from the `create*` call that produced it.
#[derive(Debug, Clone)]
pub struct Creation<I> {
    /// Name under which the event was created.
    pub event_name: &'static str,
    /// The manager's default phase identifier at creation time.
    pub default_phase: I,
}

/// A handler invoked once per successful `create*` call.
pub type CreationHandler<I> = Arc<dyn Fn(&Creation<I>) + Send + Sync>;

fn creation_sequence_factory<I: 'static>() -> impl InvokerFactory<CreationHandler<I>> {
    |handlers: &[CreationHandler<I>]| -> CreationHandler<I> {
        let handlers = handlers.to_vec();
        Arc::new(move |creation: &Creation<I>| {
            for handler in &handlers {
                handler(creation);
            }
        })
    }
}

/// Maps a target event's name to a declared phase name, consumed only by
/// [`EventManager::listen_all`].
///
/// Implementors typically back a handler object that listens to several
/// events at once and wants each one registered into a different phase
/// without one call per event.
pub trait PhaseDeclaration {
    /// The declared phase name for `event_name`, or `None` to fall back to
    /// the manager's default phase.
    fn phase_for(&self, event_name: &str) -> Option<&str>;
}

/// A single event binding prepared for [`EventManager::listen_all`].
///
/// Built against a concrete event and handler value, so the "is this object
/// assignable to the handler interface" check from the source is enforced
/// by the Rust type checker at the call that constructs this binding, not
/// at `listen_all` time.
pub struct ListenAllTarget<'e, I> {
    event_name: &'static str,
    commit: Box<dyn FnOnce(I) + 'e>,
}

impl<'e, I> ListenAllTarget<'e, I> {
    /// Prepares a binding that, once committed, registers `handler` into
    /// `event` under whatever phase [`EventManager::listen_all`] resolves
    /// for `event_name`.
    pub fn new<T>(event: &'e Event<I, T>, event_name: &'static str, handler: T) -> Self
    where
        I: Clone + Eq + Hash + Ord + fmt::Debug + 'e,
        T: Clone + 'e,
    {
        Self {
            event_name,
            commit: Box::new(move |phase: I| event.register_phase(phase, handler)),
        }
    }
}

/// Wraps `factory` so that zero handlers short-circuits to `empty_impl` and
/// exactly one handler short-circuits to that handler, without consulting
/// `factory` at all — the optimization `EventManager::create_hot` exists
/// for.
fn hot_path_factory<T: Clone + Send + Sync + 'static>(
    empty_impl: T,
    factory: impl InvokerFactory<T> + Send + Sync + 'static,
) -> impl InvokerFactory<T> + Send + Sync + 'static {
    move |handlers: &[T]| -> T {
        match handlers {
            [] => empty_impl.clone(),
            [only] => only.clone(),
            many => factory.apply(many),
        }
    }
}

fn validate_default_phases<I: Clone + Eq + Hash + fmt::Debug>(default_phase: &I, phases: &[I]) -> Result<(), EventError<I>> {
    let mut seen = HashSet::with_capacity(phases.len());
    for phase in phases {
        if !seen.insert(phase.clone()) {
            return Err(EventError::DuplicateDefaultPhase(phase.clone()));
        }
    }
    if !phases.iter().any(|p| p == default_phase) {
        return Err(EventError::DefaultPhaseMissing);
    }
    Ok(())
}

/// Constructs events sharing a common default phase and identifier parser,
/// and fires a creation meta-event after each successful construction.
pub struct EventManager<I> {
    default_phase: I,
    id_parser: Arc<dyn Fn(&str) -> I + Send + Sync>,
    creation_event: Event<I, CreationHandler<I>>,
}

impl<I> EventManager<I>
where
    I: Clone + Eq + Hash + Ord + fmt::Debug + Send + Sync + 'static,
{
    /// Creates a new manager with the given default phase and string→`I`
    /// parser (used by [`Self::listen_all`] to resolve declared phase
    /// names).
    pub fn new(default_phase: I, id_parser: impl Fn(&str) -> I + Send + Sync + 'static) -> Self {
        Self {
            default_phase: default_phase.clone(),
            id_parser: Arc::new(id_parser),
            creation_event: Event::new(default_phase, creation_sequence_factory::<I>()),
        }
    }

    /// The manager's default phase identifier.
    pub fn default_phase(&self) -> &I {
        &self.default_phase
    }

    /// Parses a declared phase name into `I` using the manager's id parser.
    pub fn parse_id(&self, name: &str) -> I {
        (self.id_parser)(name)
    }

    /// The meta-event fired once per successful `create*` call, with the
    /// new event's name, before any caller registers a handler on it.
    pub fn creation_event(&self) -> &Event<I, CreationHandler<I>> {
        &self.creation_event
    }

    fn announce(&self, event_name: &'static str) {
        let creation = Creation {
            event_name,
            default_phase: self.default_phase.clone(),
        };
        (self.creation_event.invoker())(&creation);
    }

    /// Creates a new event under `event_name`, firing the creation event
    /// before returning it.
    pub fn create<T: Clone>(&self, event_name: &'static str, factory: impl InvokerFactory<T> + Send + Sync + 'static) -> Event<I, T> {
        let event = Event::new(self.default_phase.clone(), factory);
        self.announce(event_name);
        event
    }

    /// Creates a new event under `event_name` whose invoker short-circuits
    /// the common hot-path handler counts: zero handlers returns
    /// `empty_impl` unchanged, exactly one handler returns that handler
    /// unchanged, and `factory` is only consulted once two or more handlers
    /// are registered.
    pub fn create_hot<T: Clone + Send + Sync + 'static>(
        &self,
        event_name: &'static str,
        empty_impl: T,
        factory: impl InvokerFactory<T> + Send + Sync + 'static,
    ) -> Event<I, T> {
        self.create(event_name, hot_path_factory(empty_impl, factory))
    }

    /// Creates a new event under `event_name`, then links `phases`
    /// consecutively to install a default canonical order.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DuplicateDefaultPhase`] if `phases` repeats an
    /// identifier, or [`EventError::DefaultPhaseMissing`] if it omits the
    /// manager's default phase. No event is constructed on error.
    ///
    /// # Panics
    ///
    /// Never, in practice: the phase-distinctness check above rules out the
    /// only condition under which linking consecutive phases could fail.
    pub fn create_with_phases<T: Clone>(
        &self,
        event_name: &'static str,
        factory: impl InvokerFactory<T> + Send + Sync + 'static,
        phases: impl IntoIterator<Item = I>,
    ) -> Result<Event<I, T>, EventError<I>> {
        let phases: Vec<I> = phases.into_iter().collect();
        validate_default_phases(&self.default_phase, &phases)?;
        let event = Event::new(self.default_phase.clone(), factory);
        for pair in phases.windows(2) {
            event
                .add_phase_ordering(pair[0].clone(), pair[1].clone())
                .expect("validated phases are pairwise distinct");
        }
        self.announce(event_name);
        Ok(event)
    }

    /// Creates a new filtered event under `event_name`, firing the creation
    /// event before returning it.
    pub fn create_filtered<C, T: Clone>(
        &self,
        event_name: &'static str,
        factory: impl InvokerFactory<T> + Send + Sync + 'static,
    ) -> FilteredEvent<I, C, T>
    where
        C: Clone + Eq + Hash,
    {
        let event = FilteredEvent::new(self.default_phase.clone(), factory);
        self.announce(event_name);
        event
    }

    /// Creates a new filtered event under `event_name`, then links `phases`
    /// consecutively to install a default canonical order.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::create_with_phases`].
    ///
    /// # Panics
    ///
    /// Same as [`Self::create_with_phases`]: not reachable in practice.
    pub fn create_filtered_with_phases<C, T: Clone>(
        &self,
        event_name: &'static str,
        factory: impl InvokerFactory<T> + Send + Sync + 'static,
        phases: impl IntoIterator<Item = I>,
    ) -> Result<FilteredEvent<I, C, T>, EventError<I>>
    where
        C: Clone + Eq + Hash,
    {
        let phases: Vec<I> = phases.into_iter().collect();
        validate_default_phases(&self.default_phase, &phases)?;
        let event = FilteredEvent::new(self.default_phase.clone(), factory);
        for pair in phases.windows(2) {
            event
                .add_phase_ordering(pair[0].clone(), pair[1].clone())
                .expect("validated phases are pairwise distinct");
        }
        self.announce(event_name);
        Ok(event)
    }

    /// Resolves a phase for each target via `obj`'s [`PhaseDeclaration`]
    /// (falling back to the manager's default phase), then commits every
    /// binding.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::EmptyListenAll`] if `targets` is empty, before
    /// committing any binding.
    pub fn listen_all(&self, obj: &impl PhaseDeclaration, targets: Vec<ListenAllTarget<'_, I>>) -> Result<(), EventError<I>> {
        if targets.is_empty() {
            return Err(EventError::EmptyListenAll);
        }
        let resolved: Vec<I> = targets
            .iter()
            .map(|target| match obj.phase_for(target.event_name) {
                Some(name) => self.parse_id(name),
                None => self.default_phase.clone(),
            })
            .collect();
        for (target, phase) in targets.into_iter().zip(resolved) {
            (target.commit)(phase);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
