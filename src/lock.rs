// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A lightweight mutual-exclusion lock for mostly uncontended critical sections.

use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

/// An exclusive, unfair, non-reentrant lock.
///
/// The lock keeps a counter of threads that own or wait for it. Entering an unowned lock is a
/// single atomic increment. Only when the lock is contended does a thread park on a wait signal,
/// and only a release that observes waiters pays for waking one of them.
///
/// Ownership is scoped: [`FastLock::enter`] returns a guard that leaves the lock when dropped,
/// including during unwinding. Entering twice from the same thread deadlocks.
pub struct FastLock<T: ?Sized> {
    waiters: AtomicUsize,
    signal: WaitSignal,
    value: UnsafeCell<T>,
}

// SAFETY: the value is only reachable through a guard, and at most one guard exists at a time,
// so sharing the lock only hands out exclusive access to `T`.
unsafe impl<T: ?Sized + Send> Sync for FastLock<T> {}

impl<T> FastLock<T> {
    /// Create a new unowned lock protecting `value`.
    pub fn new(value: T) -> Self {
        Self {
            waiters: AtomicUsize::new(0),
            signal: WaitSignal::default(),
            value: UnsafeCell::new(value),
        }
    }

    /// Consume the lock, returning the protected value.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: ?Sized> FastLock<T> {
    /// Acquire exclusive ownership, blocking the calling thread while another thread owns it.
    pub fn enter(&self) -> FastLockGuard<'_, T> {
        if self.waiters.fetch_add(1, Ordering::AcqRel) != 0 {
            self.signal.wait();
        }
        FastLockGuard { lock: self }
    }

    /// Acquire exclusive ownership only if no other thread owns or waits for the lock.
    pub fn try_enter(&self) -> Option<FastLockGuard<'_, T>> {
        self.waiters
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FastLockGuard { lock: self })
    }

    fn leave(&self) {
        if self.waiters.fetch_sub(1, Ordering::AcqRel) != 1 {
            self.signal.set();
        }
    }
}

impl<T: Default> Default for FastLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized> fmt::Debug for FastLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastLock")
            .field("waiters", &self.waiters.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Scoped ownership of a [`FastLock`]; leaves the lock on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct FastLockGuard<'a, T: ?Sized> {
    lock: &'a FastLock<T>,
}

impl<T: ?Sized> Deref for FastLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard proves exclusive ownership.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T: ?Sized> DerefMut for FastLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves exclusive ownership.
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T: ?Sized> Drop for FastLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.leave();
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for FastLockGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

/// An auto-reset event: each `set` releases exactly one `wait`, and a `set` that happens before
/// the matching `wait` is not lost.
#[derive(Debug, Default)]
struct WaitSignal {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl WaitSignal {
    fn wait(&self) {
        let mut signaled = self.signaled.lock().unwrap_or_else(|e| e.into_inner());
        while !*signaled {
            signaled = self.cond.wait(signaled).unwrap_or_else(|e| e.into_inner());
        }
        *signaled = false;
    }

    fn set(&self) {
        let mut signaled = self.signaled.lock().unwrap_or_else(|e| e.into_inner());
        *signaled = true;
        self.cond.notify_one();
    }
}
