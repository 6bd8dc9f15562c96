//! Flat named parameter slots with freeze/thaw.
//!
//! Every fittable object lays its parameters out as an ordered list of named
//! scalar slots (`pos.x`, `brightness`, `shape.e1`, ...). Optimization only
//! sees the thawed ones. Groups are addressed by name prefix: freezing
//! `"shape"` freezes every `shape.*` slot.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSlots {
    names: Vec<String>,
    frozen: Vec<bool>,
}

impl ParamSlots {
    /// All slots start thawed.
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let frozen = vec![false; names.len()];
        Self { names, frozen }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    #[inline]
    pub fn is_slot_frozen(&self, slot: usize) -> bool {
        self.frozen[slot]
    }

    /// Freeze every slot in `group`; returns how many slots matched.
    pub fn freeze(&mut self, group: &str) -> usize {
        self.set_frozen(group, true)
    }

    /// Thaw every slot in `group`; returns how many slots matched.
    pub fn thaw(&mut self, group: &str) -> usize {
        self.set_frozen(group, false)
    }

    pub fn freeze_all(&mut self) {
        self.frozen.fill(true);
    }

    pub fn thaw_all(&mut self) {
        self.frozen.fill(false);
    }

    /// True when the group has slots and all of them are frozen.
    pub fn is_frozen(&self, group: &str) -> bool {
        let mut any = false;
        for (name, &frozen) in self.names.iter().zip(&self.frozen) {
            if in_group(name, group) {
                if !frozen {
                    return false;
                }
                any = true;
            }
        }
        any
    }

    pub fn thawed(&self) -> impl Iterator<Item = usize> + '_ {
        self.frozen
            .iter()
            .enumerate()
            .filter(|(_, frozen)| !**frozen)
            .map(|(i, _)| i)
    }

    pub fn num_thawed(&self) -> usize {
        self.frozen.iter().filter(|f| !**f).count()
    }

    fn set_frozen(&mut self, group: &str, frozen: bool) -> usize {
        let mut count = 0;
        for (name, flag) in self.names.iter().zip(self.frozen.iter_mut()) {
            if in_group(name, group) {
                *flag = frozen;
                count += 1;
            }
        }
        count
    }
}

/// `name` is `group` itself or lives under `group.`.
fn in_group(name: &str, group: &str) -> bool {
    match name.strip_prefix(group) {
        Some("") => true,
        Some(rest) => rest.starts_with('.'),
        None => false,
    }
}

/// An object whose scalar parameters can be read, written and selectively
/// frozen.
///
/// Implementors provide slot storage and raw slot access; the thawed-vector
/// view used by the optimizer comes for free.
pub trait Params {
    fn slots(&self) -> &ParamSlots;
    fn slots_mut(&mut self) -> &mut ParamSlots;

    /// Current value of a slot, frozen or not.
    fn value(&self, slot: usize) -> f64;
    fn set_value(&mut self, slot: usize, value: f64);

    /// Pull values back into their valid domain after an optimizer update.
    fn constrain(&mut self) {}

    /// Names of the thawed slots.
    fn param_names(&self) -> Vec<String> {
        let slots = self.slots();
        slots.thawed().map(|i| slots.names()[i].clone()).collect()
    }

    fn num_params(&self) -> usize {
        self.slots().num_thawed()
    }

    /// Values of the thawed slots, in slot order.
    fn get_params(&self) -> Vec<f64> {
        self.slots().thawed().map(|i| self.value(i)).collect()
    }

    /// Set the thawed slots from `values`.
    ///
    /// # Panics
    /// If `values` does not have one entry per thawed slot.
    fn set_params(&mut self, values: &[f64]) {
        let thawed: Vec<usize> = self.slots().thawed().collect();
        assert_eq!(
            thawed.len(),
            values.len(),
            "expected {} parameter values, got {}",
            thawed.len(),
            values.len()
        );
        for (slot, &v) in thawed.into_iter().zip(values) {
            self.set_value(slot, v);
        }
    }

    fn freeze(&mut self, group: &str) -> usize {
        self.slots_mut().freeze(group)
    }

    fn thaw(&mut self, group: &str) -> usize {
        self.slots_mut().thaw(group)
    }

    fn freeze_all(&mut self) {
        self.slots_mut().freeze_all();
    }

    fn thaw_all(&mut self) {
        self.slots_mut().thaw_all();
    }

    fn is_frozen(&self, group: &str) -> bool {
        self.slots().is_frozen(group)
    }
}
