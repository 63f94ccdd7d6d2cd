//! Ready-made [`InvokerFactory`] implementations for the three return
//! shapes named in the source (sequence/void, boolean filter, tri-state),
//! per Design Notes §9: "the convenience of infer-from-return-type becomes
//! a collection of ready-made generic factories."
//!
//! Handlers here are modelled as single-argument closures,
//! `Arc<dyn Fn(A) -> R + Send + Sync>`, which covers every scenario named in
//! the source (`call(&str)`, `filter(&str) -> bool`, a tri-state probe over
//! `&str`). Multi-argument handlers are outside what these convenience
//! factories cover; callers with richer signatures write their own factory
//! against the [`InvokerFactory`] contract directly.

use std::sync::Arc;

use crate::factory::InvokerFactory;

/// A handler invoked for its side effects, discarding any return value.
pub type SequenceHandler<A> = Arc<dyn Fn(A) + Send + Sync>;
/// A handler returning a boolean filter decision.
pub type FilterHandler<A> = Arc<dyn Fn(A) -> bool + Send + Sync>;
/// A handler returning a tri-state decision.
pub type TriStateHandler<A, R> = Arc<dyn Fn(A) -> R + Send + Sync>;

/// A three-valued result type usable with [`tri_state`].
///
/// This crate does not define the canonical tri-state type itself (it is an
/// external collaborator per the source's scope); any type implementing
/// this trait — typically a small local `enum { True, False, Default }` —
/// can be used as the return type of a tri-state event.
pub trait TriState: Copy {
    /// Whether this value is the "no decision" sentinel.
    fn is_default(&self) -> bool;
    /// The "no decision" sentinel value.
    fn default_value() -> Self;
}

/// A sequence factory: visits every handler, discards return values, never
/// short-circuits.
pub fn sequence<A: Copy + 'static>() -> impl InvokerFactory<SequenceHandler<A>> {
    |handlers: &[SequenceHandler<A>]| -> SequenceHandler<A> {
        let handlers = handlers.to_vec();
        Arc::new(move |arg: A| {
            for handler in &handlers {
                handler(arg);
            }
        })
    }
}

/// A filter factory: returns `true` as soon as a handler returns `true`,
/// otherwise `false` once every handler has been visited.
pub fn filter<A: Copy + 'static>() -> impl InvokerFactory<FilterHandler<A>> {
    |handlers: &[FilterHandler<A>]| -> FilterHandler<A> {
        let handlers = handlers.to_vec();
        Arc::new(move |arg: A| handlers.iter().any(|handler| handler(arg)))
    }
}

/// The inverted filter factory: returns `false` as soon as a handler
/// returns `false`, otherwise `true` once every handler has been visited.
pub fn filter_inverted<A: Copy + 'static>() -> impl InvokerFactory<FilterHandler<A>> {
    |handlers: &[FilterHandler<A>]| -> FilterHandler<A> {
        let handlers = handlers.to_vec();
        Arc::new(move |arg: A| handlers.iter().all(|handler| handler(arg)))
    }
}

/// A tri-state factory: returns the first handler result that is not the
/// `default` sentinel, otherwise `default_value()`.
pub fn tri_state<A: Copy + 'static, R: TriState + 'static>() -> impl InvokerFactory<TriStateHandler<A, R>> {
    |handlers: &[TriStateHandler<A, R>]| -> TriStateHandler<A, R> {
        let handlers = handlers.to_vec();
        Arc::new(move |arg: A| {
            for handler in &handlers {
                let result = handler(arg);
                if !result.is_default() {
                    return result;
                }
            }
            R::default_value()
        })
    }
}

#[cfg(test)]
mod tests;
