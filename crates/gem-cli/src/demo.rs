//! Demonstration components exercised by `gem selfcheck`.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use gem_core::{
    Aggregated, Component, GemResult, Interface, InterfaceId, InterfaceInfo, MapBuilder, Object,
    OuterRef, ResultCode,
};

/// Hands out increasing sequence numbers.
pub trait Sequencer: Send + Sync {
    fn next(&self) -> u64;
    fn current(&self) -> u64;
}

impl Interface for dyn Sequencer {
    const IID: InterfaceId = InterfaceId::new(0x9c3e_51a0_7d42_0001);
    const NAME: &'static str = "Sequencer";
}

/// Append-only list of events.
pub trait EventLog: Send + Sync {
    fn append(&self, event: &str);
    fn events(&self) -> Vec<String>;
}

impl Interface for dyn EventLog {
    const IID: InterfaceId = InterfaceId::new(0x9c3e_51a0_7d42_0002);
    const NAME: &'static str = "EventLog";
}

/// Counts lifecycle hook invocations across every component sharing it.
#[derive(Clone, Debug, Default)]
pub struct Hooks {
    initialized: Arc<AtomicUsize>,
    torn_down: Arc<AtomicUsize>,
}

impl Hooks {
    pub fn initialized(&self) -> usize {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn torn_down(&self) -> usize {
        self.torn_down.load(Ordering::SeqCst)
    }

    fn on_initialize(&self) {
        self.initialized.fetch_add(1, Ordering::SeqCst);
    }

    fn on_teardown(&self) {
        self.torn_down.fetch_add(1, Ordering::SeqCst);
    }
}

/// A bare sequencer.
#[derive(Debug)]
pub struct Ticker {
    value: AtomicU64,
    hooks: Hooks,
}

impl Ticker {
    pub fn new(hooks: &Hooks) -> Self {
        Self {
            value: AtomicU64::new(0),
            hooks: hooks.clone(),
        }
    }
}

impl Sequencer for Ticker {
    fn next(&self) -> u64 {
        self.value.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn current(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Component for Ticker {
    fn interfaces(map: &mut MapBuilder<Self>) {
        map.implement::<dyn Sequencer>(|t| t);
    }

    fn initialize(&self, _outer: &OuterRef) -> GemResult<()> {
        self.hooks.on_initialize();
        Ok(())
    }

    fn teardown(&self) {
        self.hooks.on_teardown();
    }
}

/// In-memory event log, used as an inner object.
#[derive(Debug)]
pub struct MemoryLog {
    events: Mutex<Vec<String>>,
    hooks: Hooks,
}

impl MemoryLog {
    pub fn new(hooks: &Hooks) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            hooks: hooks.clone(),
        }
    }
}

impl EventLog for MemoryLog {
    fn append(&self, event: &str) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.to_string()),
            Err(_) => tracing::warn!(event, "event log poisoned; dropping event"),
        }
    }

    fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl Component for MemoryLog {
    fn interfaces(map: &mut MapBuilder<Self>) {
        map.implement::<dyn EventLog>(|l| l);
    }

    fn initialize(&self, _outer: &OuterRef) -> GemResult<()> {
        self.hooks.on_initialize();
        Ok(())
    }

    fn teardown(&self) {
        self.hooks.on_teardown();
    }
}

/// Sequencer that records every number it hands out in an aggregated
/// `MemoryLog`, and exposes that log as its own `EventLog`.
#[derive(Debug)]
pub struct Recorder {
    value: AtomicU64,
    log: OnceLock<Aggregated<MemoryLog>>,
    hooks: Hooks,
}

impl Recorder {
    pub fn new(hooks: &Hooks) -> Self {
        Self {
            value: AtomicU64::new(0),
            log: OnceLock::new(),
            hooks: hooks.clone(),
        }
    }
}

impl Sequencer for Recorder {
    fn next(&self) -> u64 {
        let n = self.value.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(log) = self.log.get() {
            log.append(&format!("tick {n}"));
        }
        n
    }

    fn current(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Component for Recorder {
    fn interfaces(map: &mut MapBuilder<Self>) {
        map.implement::<dyn Sequencer>(|r| r)
            .delegate::<dyn EventLog, MemoryLog>(|r| r.log.get());
    }

    fn initialize(&self, outer: &OuterRef) -> GemResult<()> {
        // SAFETY: stored in this component, inside the object `outer` names.
        let log = unsafe { Aggregated::new(outer, MemoryLog::new(&self.hooks)) }?;
        self.log
            .set(log)
            .map_err(|_| ResultCode::UNINITIALIZED)?;
        self.hooks.on_initialize();
        Ok(())
    }

    fn teardown(&self) {
        self.hooks.on_teardown();
    }
}

/// Exposes everything a nested `Recorder` exposes, adding nothing itself.
#[derive(Debug)]
pub struct Gateway {
    recorder: OnceLock<Aggregated<Recorder>>,
    hooks: Hooks,
}

impl Gateway {
    pub fn new(hooks: &Hooks) -> Self {
        Self {
            recorder: OnceLock::new(),
            hooks: hooks.clone(),
        }
    }
}

impl Component for Gateway {
    fn interfaces(map: &mut MapBuilder<Self>) {
        map.aggregate(|g| g.recorder.get());
    }

    fn initialize(&self, outer: &OuterRef) -> GemResult<()> {
        // SAFETY: stored in this component, inside the object `outer` names.
        let recorder = unsafe { Aggregated::new(outer, Recorder::new(&self.hooks)) }?;
        self.recorder
            .set(recorder)
            .map_err(|_| ResultCode::UNINITIALIZED)?;
        self.hooks.on_initialize();
        Ok(())
    }

    fn teardown(&self) {
        self.hooks.on_teardown();
    }
}

/// Builds an inner log, then refuses to initialize.
#[derive(Debug)]
pub struct Flaky {
    log: OnceLock<Aggregated<MemoryLog>>,
    hooks: Hooks,
}

impl Flaky {
    pub fn new(hooks: &Hooks) -> Self {
        Self {
            log: OnceLock::new(),
            hooks: hooks.clone(),
        }
    }
}

impl Component for Flaky {
    fn interfaces(map: &mut MapBuilder<Self>) {
        map.delegate::<dyn EventLog, MemoryLog>(|f| f.log.get());
    }

    fn initialize(&self, outer: &OuterRef) -> GemResult<()> {
        // SAFETY: stored in this component, inside the object `outer` names.
        let log = unsafe { Aggregated::new(outer, MemoryLog::new(&self.hooks)) }?;
        self.log
            .set(log)
            .map_err(|_| ResultCode::UNINITIALIZED)?;
        Err(ResultCode::UNAVAILABLE.into())
    }

    fn teardown(&self) {
        self.hooks.on_teardown();
    }
}

/// Declared interfaces of every demo component, by component name.
pub fn catalog() -> GemResult<Vec<(&'static str, Vec<InterfaceInfo>)>> {
    Ok(vec![
        ("Ticker", Object::<Ticker>::interfaces()?),
        ("MemoryLog", Object::<MemoryLog>::interfaces()?),
        ("Recorder", Object::<Recorder>::interfaces()?),
        ("Gateway", Object::<Gateway>::interfaces()?),
        ("Flaky", Object::<Flaky>::interfaces()?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_identities_are_distinct() {
        assert_ne!(<dyn Sequencer>::IID, <dyn EventLog>::IID);
        assert!(!<dyn Sequencer>::IID.is_generic());
        assert!(!<dyn EventLog>::IID.is_generic());
    }

    #[test]
    fn recorder_logs_through_its_inner() {
        let hooks = Hooks::default();
        let object = Object::create(Recorder::new(&hooks)).unwrap();
        let seq = object.query::<dyn Sequencer>().unwrap();
        seq.next();
        seq.next();
        let log = seq.query::<dyn EventLog>().unwrap();
        assert_eq!(log.events(), vec!["tick 1".to_string(), "tick 2".to_string()]);
        assert_eq!(hooks.initialized(), 2);
    }

    #[test]
    fn flaky_reports_unavailable_and_tears_down_its_log() {
        let hooks = Hooks::default();
        let err = Object::create(Flaky::new(&hooks)).unwrap_err();
        assert_eq!(err.code(), ResultCode::UNAVAILABLE);
        assert_eq!(hooks.initialized(), 1);
        assert_eq!(hooks.torn_down(), 2);
    }

    #[test]
    fn gateway_exposes_nested_interfaces() {
        let infos = Object::<Gateway>::interfaces().unwrap();
        let names: Vec<&str> = infos.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Sequencer", "EventLog"]);
        assert!(infos.iter().all(|i| i.delegated));
    }

    #[test]
    fn catalog_lists_every_component() {
        let catalog = catalog().unwrap();
        assert_eq!(catalog.len(), 5);
        let (name, infos) = &catalog[0];
        assert_eq!(*name, "Ticker");
        assert_eq!(infos.len(), 1);
    }
}
