//! # Set-Once Bindings
//!
//! A context binds its acting participant and its transaction exactly once.
//! `Binding<T>` makes that transition explicit: empty, then bound, never
//! rebound.

use once_cell::sync::OnceCell;
use thiserror::Error;

/// Rejected attempt to bind an already bound slot.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("a current {0} has already been specified")]
pub struct AlreadyBound(pub &'static str);

/// A slot that transitions once from empty to bound.
#[derive(Debug)]
pub struct Binding<T> {
    label: &'static str,
    slot: OnceCell<T>,
}

impl<T> Binding<T> {
    /// Creates an empty slot. `label` names the slot in errors.
    #[must_use]
    pub const fn new(label: &'static str) -> Self {
        Self {
            label,
            slot: OnceCell::new(),
        }
    }

    /// Binds `value`. Fails if the slot is already bound; the stored value is
    /// left untouched.
    pub fn bind(&self, value: T) -> Result<&T, AlreadyBound> {
        self.slot.set(value).map_err(|_| AlreadyBound(self.label))?;
        self.slot.get().ok_or(AlreadyBound(self.label))
    }

    /// The bound value, if any.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.slot.get()
    }

    /// Whether the slot has been bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.slot.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binds_once() {
        let slot = Binding::new("participant");
        assert!(!slot.is_bound());
        assert_eq!(slot.bind(1).copied(), Ok(1));
        assert_eq!(slot.bind(2), Err(AlreadyBound("participant")));
        assert_eq!(slot.get(), Some(&1));
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            AlreadyBound("transaction").to_string(),
            "a current transaction has already been specified"
        );
    }
}
