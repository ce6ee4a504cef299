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

use std::collections::VecDeque;
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use crate::Error;
use crate::Level;
use crate::LogRecord;
use crate::lock::FastLock;
use crate::lock::FastLockGuard;
use crate::rotation::RollingPolicy;
use crate::trap::Trap;

/// The queue-and-flush engine behind [`FileLog`](crate::FileLog).
///
/// Callers append to an in-memory queue and return. Whichever caller flips the save-status flag
/// from idle to running spawns a transient flush worker; the worker drains the queue into the
/// policy's target file, flips the flag back, and reschedules itself if records arrived in the
/// meantime. At most one worker exists at a time.
#[derive(Debug)]
pub(crate) struct LogEngine<P: RollingPolicy> {
    inner: Arc<Inner<P>>,
}

#[derive(Debug)]
struct Inner<P: RollingPolicy> {
    dir: PathBuf,
    prefix: String,
    policy: P,
    pending: FastLock<VecDeque<LogRecord>>,
    // true while a flush pass owns the right to drain `pending`
    saving: AtomicBool,
    // wakes callers waiting in `claim_blocking` when `saving` goes back to false
    idle: (Mutex<()>, Condvar),
    file_lock: FastLock<()>,
    thread_name: String,
    retry_interval: Duration,
    trap: Box<dyn Trap>,
}

impl<P: RollingPolicy> LogEngine<P> {
    pub(crate) fn new(
        dir: PathBuf,
        prefix: String,
        policy: P,
        thread_name: String,
        retry_interval: Duration,
        trap: Box<dyn Trap>,
    ) -> Result<Self, Error> {
        fs::create_dir_all(&dir).map_err(|err| {
            Error::new("failed to create log directory")
                .with_context("dir", dir.display())
                .with_source(err)
        })?;

        let inner = Inner {
            dir,
            prefix,
            policy,
            pending: FastLock::new(VecDeque::new()),
            saving: AtomicBool::new(false),
            idle: (Mutex::new(()), Condvar::new()),
            file_lock: FastLock::new(()),
            thread_name,
            retry_interval,
            trap,
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.inner.dir
    }

    pub(crate) fn prefix(&self) -> &str {
        &self.inner.prefix
    }

    pub(crate) fn pending(&self) -> usize {
        self.inner.pending.enter().len()
    }

    /// Queue a record and make sure a flush worker will pick it up. Never performs I/O.
    pub(crate) fn record_message(&self, record: LogRecord) {
        self.inner.enqueue(record);
        Inner::schedule(&self.inner);
    }

    /// Drain the queue on the calling thread once no flush worker is active.
    pub(crate) fn flush(&self) -> Result<(), Error> {
        self.inner.claim_blocking();
        let _claim = Claim(&self.inner);
        self.inner.flush_pass()
    }

    /// Hold the file-write lock and resolve the current target file.
    pub(crate) fn lock_target(&self) -> (FastLockGuard<'_, ()>, PathBuf) {
        let guard = self.inner.file_lock.enter();
        let filepath = self.inner.target_file();
        (guard, filepath)
    }
}

impl<P: RollingPolicy> Drop for LogEngine<P> {
    fn drop(&mut self) {
        let inner = &self.inner;
        inner.claim_blocking();
        if let Err(err) = inner.flush_pass() {
            let err = Error::new("failed to flush log records on dropped").with_source(err);
            inner.trap.trap(&err);
        }
        inner.pending.enter().clear();
        inner.unclaim();
    }
}

impl<P: RollingPolicy> Inner<P> {
    fn enqueue(&self, record: LogRecord) {
        self.pending.enter().push_back(record);
    }

    // a record that failed mid-write goes back to the head, ahead of later arrivals
    fn requeue(&self, record: LogRecord) {
        self.pending.enter().push_front(record);
    }

    fn dequeue(&self) -> Option<LogRecord> {
        self.pending.enter().pop_front()
    }

    fn has_pending(&self) -> bool {
        !self.pending.enter().is_empty()
    }

    fn try_claim(&self) -> bool {
        self.saving
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn claim_blocking(&self) {
        if self.try_claim() {
            return;
        }

        let (lock, cond) = &self.idle;
        let mut guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        while !self.try_claim() {
            guard = cond.wait(guard).unwrap_or_else(|e| e.into_inner());
        }
    }

    fn unclaim(&self) {
        self.saving.store(false, Ordering::Release);
        // taking the lock orders this store before any waiter's next check
        let (lock, cond) = &self.idle;
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        cond.notify_all();
    }

    fn schedule(this: &Arc<Self>) {
        if !this.try_claim() {
            // the active worker rechecks the queue before going idle
            return;
        }

        let inner = this.clone();
        let spawned = thread::Builder::new()
            .name(this.thread_name.clone())
            .spawn(move || inner.run());
        if let Err(err) = spawned {
            this.unclaim();
            let err = Error::new("failed to spawn flush worker").with_source(err);
            this.trap.trap(&err);
        }
    }

    fn run(self: Arc<Self>) {
        let _claim = Claim(&self);
        if self.flush_pass().is_err() && !self.retry_interval.is_zero() {
            thread::sleep(self.retry_interval);
        }
    }

    fn release(this: &Arc<Self>) {
        this.unclaim();
        if this.has_pending() {
            Self::schedule(this);
        }
    }

    fn target_file(&self) -> PathBuf {
        self.policy.current_target_file(&self.dir, &self.prefix)
    }

    /// Run one flush pass; the caller must hold the save-status flag.
    ///
    /// A failure is recorded as a fatal record queued behind the pending ones.
    fn flush_pass(&self) -> Result<(), Error> {
        let _guard = self.file_lock.enter();
        match self.write_pending() {
            Ok(()) => Ok(()),
            Err(err) => {
                let cause = err.to_string();
                self.enqueue(
                    LogRecord::new(Level::Fatal, "failed to write log records to file")
                        .with_error(err),
                );
                Err(Error::new("failed to write log records to file").with_context("cause", cause))
            }
        }
    }

    fn write_pending(&self) -> Result<(), Error> {
        fs::create_dir_all(&self.dir).map_err(|err| {
            Error::new("failed to create log directory")
                .with_context("dir", self.dir.display())
                .with_source(err)
        })?;

        let filepath = self.target_file();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&filepath)
            .map_err(|err| {
                Error::new("failed to open log file")
                    .with_context("path", filepath.display())
                    .with_source(err)
            })?;

        while let Some(record) = self.dequeue() {
            let mut line = record.render();
            line.push('\n');
            if let Err(err) = file.write_all(line.as_bytes()) {
                self.requeue(record);
                return Err(Error::new("failed to write log file")
                    .with_context("path", filepath.display())
                    .with_source(err));
            }
        }

        file.flush().map_err(|err| {
            Error::new("failed to flush log file")
                .with_context("path", filepath.display())
                .with_source(err)
        })
    }
}

/// Holds the save-status flag; releases it and rechecks the queue on drop, unwinding included.
struct Claim<'a, P: RollingPolicy>(&'a Arc<Inner<P>>);

impl<P: RollingPolicy> Drop for Claim<'_, P> {
    fn drop(&mut self) {
        Inner::release(self.0);
    }
}
