// Copyright 2018 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Sync primitive types whose methods panic rather than returning error in case of poison.
//!
//! The engine is driven from two execution contexts: the thread that programs and triggers the
//! hardware, and the interrupt path that observes its status register. Both only ever need to
//! hand a single value from one side to the other, so besides the `Mutex`/`Condvar` wrappers this
//! crate provides a one-shot `Promise`/`Waitable` pair carrying that value.
//!
//! A panic while one of these locks is held takes down the whole process (release builds use
//! panic=abort), so callers never have to consider the possibility of poison.

mod condvar;
mod mutex;

use std::sync::Arc;
use std::time::Duration;

pub use crate::condvar::Condvar;
pub use crate::mutex::Mutex;

struct Slot<T> {
    condvar: Condvar,
    value: Mutex<Option<T>>,
}

/// Waitable allows one thread to wait for the value another thread resolves a `Promise` with.
///
/// A Waitable is created together with its Promise by `create_promise_and_waitable`. Neither side
/// uses OS-level synchronization primitives beyond a mutex and a condition variable.
pub struct Waitable<T>(Arc<Slot<T>>);

impl<T> Waitable<T> {
    /// Block until the value is available, or `timeout` has elapsed.
    ///
    /// Returns `None` on timeout. The value is moved out, so a second successful wait on the same
    /// Waitable is only possible if the Promise was never resolved before the first one.
    pub fn wait(&self, timeout: Option<Duration>) -> Option<T> {
        let timeout = timeout.unwrap_or(Duration::MAX);
        let slot = &*self.0;
        let (mut value, _) =
            slot.condvar
                .wait_timeout_while(slot.value.lock(), timeout, |value| value.is_none());
        value.take()
    }
}

/// Promise allows one thread to resolve the value a `Waitable` is waiting for.
pub struct Promise<T>(Arc<Slot<T>>);

impl<T> Promise<T> {
    /// Resolve this promise with `value` and wake up the associated Waitable.
    ///
    /// Consumes the promise: a value can only be delivered once.
    pub fn resolve(self, value: T) {
        let slot = &*self.0;
        *slot.value.lock() = Some(value);
        slot.condvar.notify_all();
    }
}

/// Create a paired Promise and Waitable.
///
/// Resolving the Promise wakes up the Waitable.
pub fn create_promise_and_waitable<T>() -> (Promise<T>, Waitable<T>) {
    let inner = Arc::new(Slot {
        condvar: Condvar::new(),
        value: Mutex::new(None),
    });
    (Promise(Arc::clone(&inner)), Waitable(inner))
}
