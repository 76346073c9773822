//! Named mutex registry serializing writers on the same destination path.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex};

/// Process-local registry of held names. [`Locker::lock`] blocks until the
/// name is free and returns a guard that releases it on drop. Not
/// reentrant: a thread must not re-lock a name it holds. The registry
/// contains only currently-held names.
#[derive(Debug, Default)]
pub struct Locker {
    held: Mutex<HashSet<String>>,
    freed: Condvar,
}

/// Holds `name` in the registry until dropped.
#[derive(Debug)]
pub struct LockGuard<'a> {
    locker: &'a Locker,
    name: String,
}

impl Locker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until no other holder exists for `name`, then hold it.
    pub fn lock(&self, name: &str) -> LockGuard<'_> {
        let mut held = self.held.lock().unwrap();
        while held.contains(name) {
            held = self.freed.wait(held).unwrap();
        }
        held.insert(name.to_string());
        LockGuard {
            locker: self,
            name: name.to_string(),
        }
    }

    #[cfg(test)]
    fn held_count(&self) -> usize {
        self.held.lock().unwrap().len()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.locker.held.lock().unwrap();
        held.remove(&self.name);
        self.locker.freed.notify_all();
    }
}
