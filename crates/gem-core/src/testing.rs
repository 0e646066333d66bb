//! Components shared by the unit tests.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use gem_types::{GemResult, InterfaceId, ResultCode};

use crate::aggregate::{Aggregated, OuterRef};
use crate::interface::Interface;
use crate::map::MapBuilder;
use crate::object::Component;

pub trait Counter: Send + Sync {
    /// Add one and return the new value.
    fn increment(&self) -> u64;
    fn value(&self) -> u64;
}

impl Interface for dyn Counter {
    const IID: InterfaceId = InterfaceId::new(0x6765_6d00_0000_0c01);
    const NAME: &'static str = "Counter";
}

pub trait Journal: Send + Sync {
    fn record(&self, entry: &str);
    fn entries(&self) -> Vec<String>;
}

impl Interface for dyn Journal {
    const IID: InterfaceId = InterfaceId::new(0x6765_6d00_0000_0a02);
    const NAME: &'static str = "Journal";
}

/// Observes lifecycle hooks across components that share it.
#[derive(Clone, Debug, Default)]
pub struct Tracker {
    initialized: Arc<AtomicUsize>,
    torn_down: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialized(&self) -> usize {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn torn_down(&self) -> usize {
        self.torn_down.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    fn on_initialize(&self) {
        self.initialized.fetch_add(1, Ordering::SeqCst);
    }

    fn on_teardown(&self) {
        self.torn_down.fetch_add(1, Ordering::SeqCst);
    }

    fn on_drop(&self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

macro_rules! tracked {
    ($ty:ident) => {
        impl $ty {
            pub fn with_tracker(tracker: &Tracker) -> Self {
                let mut this = Self::default();
                this.tracker = tracker.clone();
                this
            }
        }

        impl Drop for $ty {
            fn drop(&mut self) {
                self.tracker.on_drop();
            }
        }
    };
}

#[derive(Debug, Default)]
pub struct Tally {
    value: AtomicU64,
    tracker: Tracker,
}

tracked!(Tally);

impl Counter for Tally {
    fn increment(&self) -> u64 {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn value(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}

impl Component for Tally {
    fn interfaces(map: &mut MapBuilder<Self>) {
        map.implement::<dyn Counter>(|t| t);
    }

    fn initialize(&self, _outer: &OuterRef) -> GemResult<()> {
        self.tracker.on_initialize();
        Ok(())
    }

    fn teardown(&self) {
        self.tracker.on_teardown();
    }
}

#[derive(Debug, Default)]
pub struct Notebook {
    entries: Mutex<Vec<String>>,
    tracker: Tracker,
}

tracked!(Notebook);

impl Journal for Notebook {
    fn record(&self, entry: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.to_string());
        }
    }

    fn entries(&self) -> Vec<String> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl Component for Notebook {
    fn interfaces(map: &mut MapBuilder<Self>) {
        map.implement::<dyn Journal>(|n| n);
    }

    fn initialize(&self, _outer: &OuterRef) -> GemResult<()> {
        self.tracker.on_initialize();
        Ok(())
    }

    fn teardown(&self) {
        self.tracker.on_teardown();
    }
}

/// Counts itself and delegates `Journal` to an inner `Notebook`.
#[derive(Debug, Default)]
pub struct Composite {
    value: AtomicU64,
    notebook: OnceLock<Aggregated<Notebook>>,
    tracker: Tracker,
}

tracked!(Composite);

impl Counter for Composite {
    fn increment(&self) -> u64 {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn value(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}

impl Component for Composite {
    fn interfaces(map: &mut MapBuilder<Self>) {
        map.implement::<dyn Counter>(|c| c)
            .delegate::<dyn Journal, Notebook>(|c| c.notebook.get());
    }

    fn initialize(&self, outer: &OuterRef) -> GemResult<()> {
        // SAFETY: stored in this component, inside the object `outer` names.
        let notebook = unsafe { Aggregated::new(outer, Notebook::with_tracker(&self.tracker)) }?;
        self.notebook
            .set(notebook)
            .map_err(|_| ResultCode::UNINITIALIZED)?;
        self.tracker.on_initialize();
        Ok(())
    }

    fn teardown(&self) {
        self.tracker.on_teardown();
    }
}

/// Exposes whatever its inner `Notebook` exposes and nothing else.
#[derive(Debug, Default)]
pub struct Blind {
    notebook: OnceLock<Aggregated<Notebook>>,
}

impl Component for Blind {
    fn interfaces(map: &mut MapBuilder<Self>) {
        map.aggregate(|b| b.notebook.get());
    }

    fn initialize(&self, outer: &OuterRef) -> GemResult<()> {
        // SAFETY: stored in this component, inside the object `outer` names.
        let notebook = unsafe { Aggregated::new(outer, Notebook::default()) }?;
        self.notebook
            .set(notebook)
            .map_err(|_| ResultCode::UNINITIALIZED)?;
        Ok(())
    }
}

/// Aggregates a `Composite`, which aggregates a `Notebook` in turn.
#[derive(Debug, Default)]
pub struct Nested {
    composite: OnceLock<Aggregated<Composite>>,
    tracker: Tracker,
}

tracked!(Nested);

impl Component for Nested {
    fn interfaces(map: &mut MapBuilder<Self>) {
        map.aggregate(|n| n.composite.get());
    }

    fn initialize(&self, outer: &OuterRef) -> GemResult<()> {
        // SAFETY: stored in this component, inside the object `outer` names.
        let composite = unsafe { Aggregated::new(outer, Composite::with_tracker(&self.tracker)) }?;
        self.composite
            .set(composite)
            .map_err(|_| ResultCode::UNINITIALIZED)?;
        Ok(())
    }

    fn teardown(&self) {
        self.tracker.on_teardown();
    }
}

#[derive(Debug, Default)]
pub struct FailingInner {
    tracker: Tracker,
}

tracked!(FailingInner);

impl Component for FailingInner {
    fn interfaces(_map: &mut MapBuilder<Self>) {}

    fn initialize(&self, _outer: &OuterRef) -> GemResult<()> {
        Err(ResultCode::NOT_IMPLEMENTED.into())
    }

    fn teardown(&self) {
        self.tracker.on_teardown();
    }
}

#[derive(Debug, Default)]
pub struct FailsToInitialize {
    tracker: Tracker,
}

tracked!(FailsToInitialize);

impl Component for FailsToInitialize {
    fn interfaces(_map: &mut MapBuilder<Self>) {}

    fn initialize(&self, _outer: &OuterRef) -> GemResult<()> {
        Err(ResultCode::UNAVAILABLE.into())
    }

    fn teardown(&self) {
        self.tracker.on_teardown();
    }
}

/// Builds an inner object, then fails.
#[derive(Debug, Default)]
pub struct FailsAfterAggregating {
    notebook: OnceLock<Aggregated<Notebook>>,
    tracker: Tracker,
}

tracked!(FailsAfterAggregating);

impl Component for FailsAfterAggregating {
    fn interfaces(map: &mut MapBuilder<Self>) {
        map.aggregate(|f| f.notebook.get());
    }

    fn initialize(&self, outer: &OuterRef) -> GemResult<()> {
        // SAFETY: stored in this component, inside the object `outer` names.
        let notebook = unsafe { Aggregated::new(outer, Notebook::with_tracker(&self.tracker)) }?;
        self.notebook
            .set(notebook)
            .map_err(|_| ResultCode::UNINITIALIZED)?;
        Err(ResultCode::UNINITIALIZED.into())
    }

    fn teardown(&self) {
        self.tracker.on_teardown();
    }
}

/// Queries its own outer object from inside initialize.
#[derive(Debug, Default)]
pub struct SelfQuerying {
    value: AtomicU64,
    tracker: Tracker,
}

tracked!(SelfQuerying);

impl Counter for SelfQuerying {
    fn increment(&self) -> u64 {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn value(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}

impl Component for SelfQuerying {
    fn interfaces(map: &mut MapBuilder<Self>) {
        map.implement::<dyn Counter>(|s| s);
    }

    fn initialize(&self, outer: &OuterRef) -> GemResult<()> {
        // SAFETY: initialize runs inside the outer object's storage.
        let counter = unsafe { outer.get() }.query::<dyn Counter>()?;
        counter.increment();
        drop(counter);
        self.tracker.on_initialize();
        Ok(())
    }
}

/// Holds an inner `Notebook` for its own use and exposes nothing.
#[derive(Debug, Default)]
pub struct Keeper {
    notebook: OnceLock<Aggregated<Notebook>>,
    tracker: Tracker,
}

tracked!(Keeper);

impl Component for Keeper {
    fn interfaces(_map: &mut MapBuilder<Self>) {}

    fn initialize(&self, outer: &OuterRef) -> GemResult<()> {
        // SAFETY: stored in this component, inside the object `outer` names.
        let notebook = unsafe { Aggregated::new(outer, Notebook::with_tracker(&self.tracker)) }?;
        notebook.record("private");
        self.notebook
            .set(notebook)
            .map_err(|_| ResultCode::UNINITIALIZED)?;
        self.tracker.on_initialize();
        Ok(())
    }

    fn teardown(&self) {
        self.tracker.on_teardown();
    }
}

/// A counter with no state, shared by every `Stateless` object.
#[derive(Debug)]
pub struct Frozen;

impl Counter for Frozen {
    fn increment(&self) -> u64 {
        0
    }

    fn value(&self) -> u64 {
        0
    }
}

pub static FROZEN: Frozen = Frozen;

/// Implements `Counter` through a view that is not part of the object.
#[derive(Debug, Default)]
pub struct Stateless {
    tracker: Tracker,
}

tracked!(Stateless);

impl Component for Stateless {
    fn interfaces(map: &mut MapBuilder<Self>) {
        map.implement::<dyn Counter>(|_| &FROZEN);
    }

    fn teardown(&self) {
        self.tracker.on_teardown();
    }
}
