//! # Forward References
//!
//! A [`Placeholder`] stands in for a descriptor that cannot be built yet,
//! typically a record that contains itself. Every use of the placeholder
//! goes through a shared one-shot cell, so all copies observe the same
//! binding once [`Placeholder::resolve`] runs.
//!
//! ## Invariants
//!
//! - Resolution happens exactly once. Resolving a bound placeholder is a
//!   programming error and panics.
//! - Before resolution, every delegated operation fails with
//!   `UnresolvedReference`; only the display name is available.
//! - A resolved placeholder behaves exactly like its target, except that
//!   the default policy attached to the reference itself is kept.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::types::{Descriptor, Kind};

/// A named, initially unbound indirection cell for recursive schemas.
#[derive(Clone)]
pub struct Placeholder {
    name: Arc<str>,
    slot: Arc<OnceLock<Descriptor>>,
}

impl Placeholder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            slot: Arc::new(OnceLock::new()),
        }
    }

    /// Debug name shown until (and after) resolution.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A descriptor that forwards to this placeholder.
    pub fn descriptor(&self) -> Descriptor {
        Descriptor::from_kind(Kind::Placeholder(self.clone()))
    }

    /// Bind the placeholder to its target.
    ///
    /// # Panics
    ///
    /// Panics if the placeholder was already resolved.
    pub fn resolve(&self, target: Descriptor) {
        tracing::debug!(placeholder = %self.name, bound = %target.name(), "resolving forward reference");
        let bound = self.slot.set(target);
        assert!(bound.is_ok(), "forward reference '{}' resolved twice", self.name);
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.get().is_some()
    }

    pub(crate) fn target(&self) -> Option<&Descriptor> {
        self.slot.get()
    }
}

impl PartialEq for Placeholder {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl fmt::Debug for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The target may contain this placeholder; never recurse into it.
        f.debug_struct("Placeholder")
            .field("name", &self.name)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
