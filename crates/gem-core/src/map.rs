use std::collections::HashSet;
use std::fmt;

use gem_types::{GemError, GemResult, InterfaceId, ResultCode};
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregated, InnerObject};
use crate::interface::{Interface, InterfaceSlot};
use crate::object::Component;

type Resolve<T> = Box<dyn Fn(&T, &mut InterfaceSlot<'_>) -> bool + Send + Sync>;
type Locate<T> = Box<dyn for<'a> Fn(&'a T) -> Option<&'a dyn InnerObject> + Send + Sync>;

/// One declared interface, for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceInfo {
    pub iid: InterfaceId,
    pub name: String,
    /// `true` when the interface is implemented by an aggregated inner object.
    pub delegated: bool,
}

enum Entry<T> {
    /// Implemented by the component itself.
    Direct {
        iid: InterfaceId,
        name: &'static str,
        resolve: Resolve<T>,
    },
    /// One interface implemented by a specific inner object.
    Delegate {
        iid: InterfaceId,
        name: &'static str,
        inner: Locate<T>,
    },
    /// Every interface of an inner object, consulted after all exact entries.
    Aggregate {
        inner: Locate<T>,
        describe: fn() -> GemResult<Vec<InterfaceInfo>>,
    },
}

/// Declares the capability map of a [`Component`].
///
/// Passed to [`Component::interfaces`]. Entries are consulted in declared
/// order; exact entries (`implement`, `delegate`) always before blind
/// `aggregate` entries.
pub struct MapBuilder<T> {
    entries: Vec<Entry<T>>,
}

impl<T: Component> MapBuilder<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The component implements `I` itself.
    pub fn implement<I: ?Sized + Interface>(&mut self, cast: fn(&T) -> &I) -> &mut Self {
        self.entries.push(Entry::Direct {
            iid: I::IID,
            name: I::NAME,
            resolve: resolver(move |component, slot| slot.fill::<I>(cast(component))),
        });
        self
    }

    /// The inner object returned by `inner` implements `I` on the
    /// component's behalf.
    pub fn delegate<I: ?Sized + Interface, C: Component>(
        &mut self,
        inner: fn(&T) -> Option<&Aggregated<C>>,
    ) -> &mut Self {
        self.entries.push(Entry::Delegate {
            iid: I::IID,
            name: I::NAME,
            inner: locator(move |component| inner(component).map(|a| a as &dyn InnerObject)),
        });
        self
    }

    /// Every interface of the inner object returned by `inner` is exposed.
    pub fn aggregate<C: Component>(&mut self, inner: fn(&T) -> Option<&Aggregated<C>>) -> &mut Self {
        self.entries.push(Entry::Aggregate {
            inner: locator(move |component| inner(component).map(|a| a as &dyn InnerObject)),
            describe: InterfaceMap::<C>::describe,
        });
        self
    }

    fn build(self) -> GemResult<InterfaceMap<T>> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            let (iid, name) = match entry {
                Entry::Direct { iid, name, .. } | Entry::Delegate { iid, name, .. } => (*iid, *name),
                Entry::Aggregate { .. } => continue,
            };
            if iid.is_generic() {
                return Err(GemError::context(
                    ResultCode::INVALID_ARG,
                    format!("{name} claims the reserved base identity"),
                ));
            }
            if !seen.insert(iid) {
                return Err(GemError::context(
                    ResultCode::INVALID_ARG,
                    format!("{name} ({iid}) is declared twice"),
                ));
            }
        }
        Ok(InterfaceMap {
            entries: self.entries,
        })
    }
}

// Pin closure signatures so their higher-ranked lifetimes are inferred.
fn resolver<T, F>(f: F) -> Resolve<T>
where
    F: Fn(&T, &mut InterfaceSlot<'_>) -> bool + Send + Sync + 'static,
{
    Box::new(f)
}

fn locator<T, F>(f: F) -> Locate<T>
where
    F: for<'a> Fn(&'a T) -> Option<&'a dyn InnerObject> + Send + Sync + 'static,
{
    Box::new(f)
}

/// Read-only capability map of one object.
pub struct InterfaceMap<T> {
    entries: Vec<Entry<T>>,
}

impl<T: Component> InterfaceMap<T> {
    /// Build and validate the map declared by `T`.
    ///
    /// Fails with [`ResultCode::INVALID_ARG`] if two entries claim the same
    /// identity or an entry claims [`InterfaceId::GENERIC`].
    pub fn declare() -> GemResult<Self> {
        let mut builder = MapBuilder::new();
        T::interfaces(&mut builder);
        builder.build()
    }

    /// Every interface `T` exposes, including those of blind aggregates.
    pub fn describe() -> GemResult<Vec<InterfaceInfo>> {
        Self::declare()?.interfaces()
    }

    fn interfaces(&self) -> GemResult<Vec<InterfaceInfo>> {
        let mut out = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            match entry {
                Entry::Direct { iid, name, .. } => out.push(InterfaceInfo {
                    iid: *iid,
                    name: (*name).to_string(),
                    delegated: false,
                }),
                Entry::Delegate { iid, name, .. } => out.push(InterfaceInfo {
                    iid: *iid,
                    name: (*name).to_string(),
                    delegated: true,
                }),
                Entry::Aggregate { describe, .. } => {
                    out.extend(describe()?.into_iter().map(|info| InterfaceInfo {
                        delegated: true,
                        ..info
                    }));
                }
            }
        }
        Ok(out)
    }

    /// Resolve `iid` against `component` without touching any count.
    ///
    /// Exact entries first, in declared order; then blind aggregates in
    /// declared order. An absent inner object is a construction defect and
    /// yields [`ResultCode::BAD_POINTER`].
    pub(crate) fn resolve(
        &self,
        component: &T,
        iid: InterfaceId,
        slot: &mut InterfaceSlot<'_>,
    ) -> ResultCode {
        for entry in &self.entries {
            match entry {
                Entry::Direct {
                    iid: declared,
                    resolve,
                    ..
                } if *declared == iid => {
                    return if resolve(component, slot) {
                        ResultCode::SUCCESS
                    } else {
                        ResultCode::NO_INTERFACE
                    };
                }
                Entry::Delegate {
                    iid: declared,
                    name,
                    inner,
                } if *declared == iid => {
                    return match inner(component) {
                        Some(inner) => inner.resolve(iid, slot),
                        None => {
                            tracing::warn!(%iid, name, "delegate entry has no inner object");
                            ResultCode::BAD_POINTER
                        }
                    };
                }
                _ => {}
            }
        }

        for entry in &self.entries {
            if let Entry::Aggregate { inner, .. } = entry {
                let Some(inner) = inner(component) else {
                    tracing::warn!(%iid, "aggregate entry has no inner object");
                    return ResultCode::BAD_POINTER;
                };
                let code = inner.resolve(iid, slot);
                if code != ResultCode::NO_INTERFACE {
                    return code;
                }
            }
        }

        ResultCode::NO_INTERFACE
    }

    /// Tear down every inner object, in reverse declared order.
    pub(crate) fn teardown_inners(&self, component: &T) {
        for entry in self.entries.iter().rev() {
            let inner = match entry {
                Entry::Direct { .. } => continue,
                Entry::Delegate { inner, .. } | Entry::Aggregate { inner, .. } => inner,
            };
            if let Some(inner) = inner(component) {
                inner.teardown();
            }
        }
    }
}

impl<T> fmt::Debug for InterfaceMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for entry in &self.entries {
            match entry {
                Entry::Direct { name, .. } => list.entry(&format_args!("{name}")),
                Entry::Delegate { name, .. } => list.entry(&format_args!("{name} (delegated)")),
                Entry::Aggregate { .. } => list.entry(&format_args!("(aggregate)")),
            };
        }
        list.finish()
    }
}
