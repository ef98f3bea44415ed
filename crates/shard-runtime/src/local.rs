//! # Shard-Local Storage
//!
//! Per-shard slots for state that must never leave its shard. Values are
//! `Rc`, not `Arc`: they are neither shared with nor visible to other
//! threads, so no locking is involved.
//!
//! Slots are keyed by `(type, u64)`; callers allocate their own ids.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

type SlotKey = (TypeId, u64);

thread_local! {
    static SLOTS: RefCell<HashMap<SlotKey, Rc<dyn Any>>> = RefCell::new(HashMap::new());
}

/// Store `value` under `key`, returning what was there before.
pub fn insert<T: 'static>(key: u64, value: Rc<T>) -> Option<Rc<T>> {
    let previous = SLOTS.with(|slots| {
        slots
            .borrow_mut()
            .insert((TypeId::of::<T>(), key), value as Rc<dyn Any>)
    });
    previous.and_then(|p| p.downcast::<T>().ok())
}

/// Shared reference to the value under `key`.
pub fn get<T: 'static>(key: u64) -> Option<Rc<T>> {
    SLOTS.with(|slots| {
        slots
            .borrow()
            .get(&(TypeId::of::<T>(), key))
            .cloned()
            .and_then(|v| v.downcast::<T>().ok())
    })
}

/// Remove and return the value under `key`.
pub fn remove<T: 'static>(key: u64) -> Option<Rc<T>> {
    let removed = SLOTS.with(|slots| slots.borrow_mut().remove(&(TypeId::of::<T>(), key)));
    removed.and_then(|v| v.downcast::<T>().ok())
}

/// Number of occupied slots on this shard.
pub fn len() -> usize {
    SLOTS.with(|slots| slots.borrow().len())
}

/// Drop every slot on this shard.
pub(crate) fn clear() {
    // Drop values outside the borrow; a destructor may touch the slots.
    let drained = SLOTS.with(|slots| std::mem::take(&mut *slots.borrow_mut()));
    drop(drained);
}
