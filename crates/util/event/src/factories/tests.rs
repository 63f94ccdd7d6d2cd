use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;

#[test]
fn sequence_visits_every_handler_in_order() {
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let h1: SequenceHandler<&str> = {
        let order = order.clone();
        Arc::new(move |tag| order.lock().unwrap().push(format!("H1:{tag}")))
    };
    let h2: SequenceHandler<&str> = {
        let order = order.clone();
        Arc::new(move |tag| order.lock().unwrap().push(format!("H2:{tag}")))
    };
    let invoker = sequence::<&str>().apply(&[h1, h2]);
    invoker("x");
    assert_eq!(*order.lock().unwrap(), vec!["H1:x", "H2:x"]);
}

#[test]
fn filter_short_circuits_on_first_true() {
    let p3_calls = Arc::new(AtomicUsize::new(0));
    let p1: FilterHandler<&str> = Arc::new(|_s| false);
    let p2: FilterHandler<&str> = Arc::new(|s: &str| s.is_empty());
    let p3: FilterHandler<&str> = {
        let calls = p3_calls.clone();
        Arc::new(move |s: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            s.contains('e')
        })
    };

    let invoker = filter::<&str>().apply(&[p1, p2, p3]);

    assert!(invoker(""));
    assert_eq!(p3_calls.load(Ordering::SeqCst), 0, "p3 must not run once p2 matched");

    assert!(!invoker("abc"));

    assert!(invoker("Hello"));
}

#[test]
fn filter_inverted_short_circuits_on_first_false() {
    let called = Arc::new(AtomicBool::new(false));
    let a: FilterHandler<i32> = Arc::new(|n| n > 0);
    let b: FilterHandler<i32> = Arc::new(|n| n < 0);
    let c: FilterHandler<i32> = {
        let called = called.clone();
        Arc::new(move |_n| {
            called.store(true, Ordering::SeqCst);
            true
        })
    };
    let invoker = filter_inverted::<i32>().apply(&[a, b, c]);
    assert!(!invoker(5));
    assert!(!called.load(Ordering::SeqCst), "c must not run once b short-circuited with false");
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tri {
    True,
    False,
    Default,
}

impl TriState for Tri {
    fn is_default(&self) -> bool {
        matches!(self, Tri::Default)
    }

    fn default_value() -> Self {
        Tri::Default
    }
}

#[test]
fn tri_state_short_circuits_on_first_non_default() {
    let h1: TriStateHandler<&str, Tri> = Arc::new(|_s| Tri::Default);
    let h2: TriStateHandler<&str, Tri> = Arc::new(|s: &str| if s.is_empty() { Tri::False } else { Tri::Default });
    let h3: TriStateHandler<&str, Tri> = Arc::new(|s: &str| {
        if s.ends_with('!') || s.trim().is_empty() {
            Tri::True
        } else {
            Tri::Default
        }
    });

    let invoker = tri_state::<&str, Tri>().apply(&[h1.clone(), h2.clone(), h3.clone()]);
    assert_eq!(invoker(""), Tri::False);
    assert_eq!(invoker("abc!"), Tri::True);
    assert_eq!(invoker("abc"), Tri::Default);

    let h4: TriStateHandler<&str, Tri> = Arc::new(|s: &str| {
        if s.trim().is_empty() {
            Tri::True
        } else {
            Tri::Default
        }
    });
    let invoker_with_h4 = tri_state::<&str, Tri>().apply(&[h1, h2, h3, h4]);
    assert_eq!(invoker_with_h4("\t"), Tri::True);
}
