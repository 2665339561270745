//! Generational handles for dialog-layer objects
//!
//! Dialogs and other long-lived objects are owned by a [`HandleRegistry`] and
//! referred to by copyable [`Handle`]s. A handle carries the generation of the
//! slot it was issued for, so a handle kept past `remove` (or past reuse of the
//! slot by a new object) fails validation with
//! [`DialogError::StaleHandle`] instead of reaching the wrong object.
//!
//! ## Example
//!
//! ```rust
//! use sipflow_dialog_core::handle::{HandleRegistry, ShutdownPolicy};
//!
//! let mut registry: HandleRegistry<String> = HandleRegistry::new(ShutdownPolicy::ForceClear);
//! let h = registry.create("dialog".to_string()).unwrap();
//! assert!(registry.is_valid(h));
//! registry.remove(h).unwrap();
//! assert!(!registry.is_valid(h));
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{DialogError, DialogResult};

/// A validated reference to an object in a [`HandleRegistry`]
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    fn stale(&self) -> DialogError {
        DialogError::StaleHandle {
            index: self.index,
            generation: self.generation,
        }
    }
}

// Manual impls so that `T` needs none of these traits.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

impl<T> fmt::Display for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// What [`HandleRegistry::shutdown`] does with objects that are still live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShutdownPolicy {
    /// Refuse to shut down while any handle is live
    #[default]
    FaultOnLiveHandles,
    /// Drop every live object and log how many there were
    ForceClear,
}

enum Slot<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32 },
    /// Generation space exhausted; never reused
    Retired,
}

/// Arena of objects addressed by generational [`Handle`]s
pub struct HandleRegistry<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
    policy: ShutdownPolicy,
    shut_down: bool,
}

impl<T> HandleRegistry<T> {
    pub fn new(policy: ShutdownPolicy) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            policy,
            shut_down: false,
        }
    }

    pub fn policy(&self) -> ShutdownPolicy {
        self.policy
    }

    /// Stores `value` and returns a fresh handle to it
    pub fn create(&mut self, value: T) -> DialogResult<Handle<T>> {
        if self.shut_down {
            return Err(DialogError::RegistryShutdown);
        }

        let reusable = self
            .free
            .pop()
            .and_then(|index| match self.slots.get(index as usize) {
                Some(Slot::Vacant { generation }) => Some((index, *generation)),
                _ => None,
            });

        let handle = match reusable {
            Some((index, generation)) => {
                self.slots[index as usize] = Slot::Occupied { generation, value };
                Handle::new(index, generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot::Occupied {
                    generation: 0,
                    value,
                });
                Handle::new(index, 0)
            }
        };

        self.live += 1;
        Ok(handle)
    }

    pub fn is_valid(&self, handle: Handle<T>) -> bool {
        matches!(
            self.slots.get(handle.index as usize),
            Some(Slot::Occupied { generation, .. }) if *generation == handle.generation
        )
    }

    pub fn resolve(&self, handle: Handle<T>) -> DialogResult<&T> {
        match self.slots.get(handle.index as usize) {
            Some(Slot::Occupied { generation, value }) if *generation == handle.generation => {
                Ok(value)
            }
            _ => Err(handle.stale()),
        }
    }

    pub fn resolve_mut(&mut self, handle: Handle<T>) -> DialogResult<&mut T> {
        match self.slots.get_mut(handle.index as usize) {
            Some(Slot::Occupied { generation, value }) if *generation == handle.generation => {
                Ok(value)
            }
            _ => Err(handle.stale()),
        }
    }

    /// Removes the object; every copy of `handle` becomes stale
    pub fn remove(&mut self, handle: Handle<T>) -> DialogResult<T> {
        if !self.is_valid(handle) {
            return Err(handle.stale());
        }

        let index = handle.index as usize;
        let next = match handle.generation.checked_add(1) {
            Some(generation) if generation < u32::MAX => Slot::Vacant { generation },
            _ => Slot::Retired,
        };
        let reusable = matches!(next, Slot::Vacant { .. });
        let old = std::mem::replace(&mut self.slots[index], next);

        if reusable {
            self.free.push(handle.index);
        } else {
            debug!(index = handle.index, "retiring handle slot after generation wrap");
        }
        self.live -= 1;

        match old {
            Slot::Occupied { value, .. } => Ok(value),
            _ => Err(handle.stale()),
        }
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Live objects with their handles
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
            Slot::Occupied { generation, value } => Some((Handle::new(i as u32, *generation), value)),
            _ => None,
        })
    }

    /// Stops issuing handles, applying the shutdown policy to live objects
    ///
    /// Under [`ShutdownPolicy::FaultOnLiveHandles`] a registry with live
    /// objects is left untouched and still accepts new objects.
    pub fn shutdown(&mut self) -> DialogResult<()> {
        if self.live > 0 {
            match self.policy {
                ShutdownPolicy::FaultOnLiveHandles => {
                    return Err(DialogError::LiveHandlesAtShutdown { count: self.live });
                }
                ShutdownPolicy::ForceClear => {
                    warn!(count = self.live, "clearing live handles at registry shutdown");
                }
            }
        }

        self.slots.clear();
        self.free.clear();
        self.live = 0;
        self.shut_down = true;
        Ok(())
    }
}

impl<T> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self::new(ShutdownPolicy::default())
    }
}

impl<T> fmt::Debug for HandleRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("slots", &self.slots.len())
            .field("live", &self.live)
            .field("policy", &self.policy)
            .field("shut_down", &self.shut_down)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_resolve_remove() {
        let mut registry = HandleRegistry::new(ShutdownPolicy::ForceClear);
        let h = registry.create(42u32).unwrap();
        assert_eq!(*registry.resolve(h).unwrap(), 42);

        *registry.resolve_mut(h).unwrap() = 43;
        assert_eq!(registry.remove(h).unwrap(), 43);
        assert_eq!(
            registry.resolve(h),
            Err(DialogError::StaleHandle {
                index: h.index(),
                generation: h.generation()
            })
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reused_slot_rejects_old_handle() {
        let mut registry = HandleRegistry::new(ShutdownPolicy::ForceClear);
        let old = registry.create("a").unwrap();
        registry.remove(old).unwrap();

        let new = registry.create("b").unwrap();
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());
        assert!(!registry.is_valid(old));
        assert_eq!(*registry.resolve(new).unwrap(), "b");
        assert!(registry.remove(old).is_err());
    }

    #[test]
    fn test_retired_slot_is_not_reused() {
        let mut registry = HandleRegistry::new(ShutdownPolicy::ForceClear);
        let h = registry.create(1).unwrap();
        registry.slots[0] = Slot::Occupied {
            generation: u32::MAX - 1,
            value: 1,
        };
        let last = Handle::new(0, u32::MAX - 1);
        registry.remove(last).unwrap();
        assert!(!registry.is_valid(h));

        let next = registry.create(2).unwrap();
        assert_eq!(next.index(), 1);
    }

    #[test]
    fn test_shutdown_fault_policy() {
        let mut registry = HandleRegistry::new(ShutdownPolicy::FaultOnLiveHandles);
        let h = registry.create(()).unwrap();
        assert_eq!(
            registry.shutdown(),
            Err(DialogError::LiveHandlesAtShutdown { count: 1 })
        );
        assert!(registry.is_valid(h));

        registry.remove(h).unwrap();
        registry.shutdown().unwrap();
        assert_eq!(registry.create(()), Err(DialogError::RegistryShutdown));
    }

    #[test]
    fn test_shutdown_force_clear() {
        let mut registry = HandleRegistry::new(ShutdownPolicy::ForceClear);
        let h = registry.create(()).unwrap();
        registry.shutdown().unwrap();
        assert!(!registry.is_valid(h));
        assert!(registry.is_shut_down());
    }

    #[test]
    fn test_iter_yields_live_objects() {
        let mut registry = HandleRegistry::new(ShutdownPolicy::ForceClear);
        let a = registry.create("a").unwrap();
        let b = registry.create("b").unwrap();
        registry.remove(a).unwrap();
        let live: Vec<_> = registry.iter().collect();
        assert_eq!(live, vec![(b, &"b")]);
    }
}
