use std::sync::{Arc, Mutex};

use super::*;
use crate::factories::sequence;

fn new_manager() -> EventManager<String> {
    EventManager::new("default".to_string(), |s: &str| s.to_string())
}

#[test]
fn creation_event_fires_once_per_create_with_the_event_name() {
    let manager = new_manager();
    let log = Arc::new(Mutex::new(Vec::new()));
    {
        let log = log.clone();
        manager
            .creation_event()
            .register(Arc::new(move |creation: &Creation<String>| log.lock().unwrap().push(creation.event_name)));
    }

    let _event: Event<String, SequenceHandler> = manager.create("tick", sequence::<&'static str>());
    assert_eq!(*log.lock().unwrap(), vec!["tick"]);

    let _filtered: FilteredEvent<String, &str, SequenceHandler> = manager.create_filtered("render", sequence::<&'static str>());
    assert_eq!(*log.lock().unwrap(), vec!["tick", "render"]);
}

type SequenceHandler = crate::factories::SequenceHandler<&'static str>;

#[test]
fn create_with_phases_links_the_default_order() {
    let manager = new_manager();
    let event: Event<String, SequenceHandler> = manager
        .create_with_phases(
            "phased",
            sequence::<&'static str>(),
            ["early", "default", "late"].map(str::to_string),
        )
        .unwrap();

    let log = Arc::new(Mutex::new(Vec::new()));
    let tag = |name: &'static str| {
        let log = log.clone();
        Arc::new(move |_: &'static str| log.lock().unwrap().push(name)) as SequenceHandler
    };
    event.register_phase("late".to_string(), tag("L"));
    event.register_phase("early".to_string(), tag("E"));
    event.register(tag("D"));

    (event.invoker())("x");
    assert_eq!(*log.lock().unwrap(), vec!["E", "D", "L"]);
}

#[test]
fn create_with_phases_rejects_duplicate_phase() {
    let manager = new_manager();
    let err = manager
        .create_with_phases::<SequenceHandler>(
            "bad",
            sequence::<&'static str>(),
            ["default", "late", "late"].map(str::to_string),
        )
        .unwrap_err();
    assert_eq!(err, EventError::DuplicateDefaultPhase("late".to_string()));
}

#[test]
fn create_with_phases_rejects_missing_default() {
    let manager = new_manager();
    let err = manager
        .create_with_phases::<SequenceHandler>("bad", sequence::<&'static str>(), ["early", "late"].map(str::to_string))
        .unwrap_err();
    assert_eq!(err, EventError::DefaultPhaseMissing);
}

#[test]
fn create_hot_returns_empty_impl_unchanged_with_no_handlers() {
    let manager = new_manager();
    let factory_calls = Arc::new(Mutex::new(0));
    let factory = {
        let factory_calls = factory_calls.clone();
        move |handlers: &[SequenceHandler]| -> SequenceHandler {
            *factory_calls.lock().unwrap() += 1;
            sequence::<&'static str>().apply(handlers)
        }
    };
    let empty_impl: SequenceHandler = Arc::new(|_: &'static str| {});
    let event: Event<String, SequenceHandler> = manager.create_hot("idle", empty_impl.clone(), factory);

    assert!(Arc::ptr_eq(&*event.invoker(), &empty_impl));
    assert_eq!(*factory_calls.lock().unwrap(), 0);
}

#[test]
fn create_hot_returns_the_sole_handler_unchanged() {
    let manager = new_manager();
    let factory_calls = Arc::new(Mutex::new(0));
    let factory = {
        let factory_calls = factory_calls.clone();
        move |handlers: &[SequenceHandler]| -> SequenceHandler {
            *factory_calls.lock().unwrap() += 1;
            sequence::<&'static str>().apply(handlers)
        }
    };
    let empty_impl: SequenceHandler = Arc::new(|_: &'static str| {});
    let event: Event<String, SequenceHandler> = manager.create_hot("single", empty_impl, factory);

    let log = Arc::new(Mutex::new(Vec::new()));
    let only: SequenceHandler = {
        let log = log.clone();
        Arc::new(move |_: &'static str| log.lock().unwrap().push("ONLY"))
    };
    event.register(only.clone());

    assert!(Arc::ptr_eq(&*event.invoker(), &only));
    assert_eq!(*factory_calls.lock().unwrap(), 0);
}

#[test]
fn create_hot_delegates_to_factory_once_two_or_more_handlers_are_registered() {
    let manager = new_manager();
    let factory_calls = Arc::new(Mutex::new(0));
    let factory = {
        let factory_calls = factory_calls.clone();
        move |handlers: &[SequenceHandler]| -> SequenceHandler {
            *factory_calls.lock().unwrap() += 1;
            sequence::<&'static str>().apply(handlers)
        }
    };
    let empty_impl: SequenceHandler = Arc::new(|_: &'static str| {});
    let event: Event<String, SequenceHandler> = manager.create_hot("many", empty_impl, factory);

    let log = Arc::new(Mutex::new(Vec::new()));
    let tag = |name: &'static str| {
        let log = log.clone();
        Arc::new(move |_: &'static str| log.lock().unwrap().push(name)) as SequenceHandler
    };
    event.register(tag("A"));
    assert_eq!(*factory_calls.lock().unwrap(), 0);

    event.register(tag("B"));
    assert_eq!(*factory_calls.lock().unwrap(), 1);

    (event.invoker())("x");
    assert_eq!(*log.lock().unwrap(), vec!["A", "B"]);
}

struct DeclaresLatePhaseForAlerts;

impl PhaseDeclaration for DeclaresLatePhaseForAlerts {
    fn phase_for(&self, event_name: &str) -> Option<&str> {
        match event_name {
            "alerts" => Some("late"),
            _ => None,
        }
    }
}

#[test]
fn listen_all_registers_every_target_under_its_resolved_phase() {
    let manager = new_manager();
    let alerts: Event<String, SequenceHandler> = manager
        .create_with_phases("alerts", sequence::<&'static str>(), ["early", "default", "late"].map(str::to_string))
        .unwrap();
    let ticks: Event<String, SequenceHandler> = manager.create("ticks", sequence::<&'static str>());

    let log = Arc::new(Mutex::new(Vec::new()));
    let tag = |name: &'static str| {
        let log = log.clone();
        Arc::new(move |_: &'static str| log.lock().unwrap().push(name)) as SequenceHandler
    };

    let obj = DeclaresLatePhaseForAlerts;
    let targets = vec![
        ListenAllTarget::new(&alerts, "alerts", tag("ALERT")),
        ListenAllTarget::new(&ticks, "ticks", tag("TICK")),
    ];
    manager.listen_all(&obj, targets).unwrap();

    alerts.register_phase("early".to_string(), tag("EARLY"));
    (alerts.invoker())("x");
    assert_eq!(*log.lock().unwrap(), vec!["EARLY", "ALERT"]);

    log.lock().unwrap().clear();
    (ticks.invoker())("x");
    assert_eq!(*log.lock().unwrap(), vec!["TICK"]);
}

#[test]
fn listen_all_rejects_an_empty_target_list() {
    let manager = new_manager();
    let obj = DeclaresLatePhaseForAlerts;
    let err = manager.listen_all(&obj, Vec::new()).unwrap_err();
    assert_eq!(err, EventError::EmptyListenAll);
}
