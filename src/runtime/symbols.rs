//! Symbol tables
//!
//! A [`SymbolTable`] is an ordered list of `(name, slot)` bindings. The VM
//! owns one global table; a host or builtin may pass a second table as the
//! local context of an evaluation. Name resolution checks the context first
//! and the global table second, so local bindings shadow global ones.
//!
//! Removing a binding never touches the slot it pointed to. Pairing
//! `unuse_var` with `hash_unset` is the host's job.

use indexmap::IndexMap;

use crate::runtime::memory::Slot;

/// Insertion-ordered name → slot bindings
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    bindings: IndexMap<String, Slot>,
}

impl SymbolTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the slot bound to `key`
    pub fn find(
        &self,
        key: &str,
    ) -> Option<Slot> {
        self.bindings.get(key).copied()
    }

    /// Bind `key` to `slot`, returning the slot it was previously bound to.
    /// Rebinding keeps the binding's original position.
    pub fn set(
        &mut self,
        key: &str,
        slot: Slot,
    ) -> Option<Slot> {
        match self.bindings.get_mut(key) {
            Some(bound) => Some(std::mem::replace(bound, slot)),
            None => {
                self.bindings.insert(key.to_string(), slot);
                None
            }
        }
    }

    /// Remove the binding for `key`
    pub fn unset(
        &mut self,
        key: &str,
    ) -> Option<Slot> {
        self.bindings.shift_remove(key)
    }

    pub fn contains(
        &self,
        key: &str,
    ) -> bool {
        self.bindings.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterate over bindings in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Slot)> + '_ {
        self.bindings.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Iterate over bound slots
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.bindings.values().copied()
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}

/// Resolve `name` through the local context first, then the global table
pub fn resolve(
    name: &str,
    context: Option<&SymbolTable>,
    globals: &SymbolTable,
) -> Option<Slot> {
    context
        .and_then(|ctx| ctx.find(name))
        .or_else(|| globals.find(name))
}
