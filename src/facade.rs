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

use std::fs;
use std::fs::File;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::Error;
use crate::Level;
use crate::LogRecord;
use crate::engine::LogEngine;
use crate::rotation::DateBucketed;
use crate::rotation::RollingPolicy;
use crate::rotation::SingleFile;
use crate::rotation::SizeCapped;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// Name of the log directory under the executable's directory.
pub const DEFAULT_LOG_DIR: &str = "Logs";

const DEFAULT_THREAD_NAME: &str = "logspool-flush";
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// The default log directory, `<executable dir>/Logs`.
///
/// Falls back to `./Logs` if the executable path cannot be determined.
pub fn default_log_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default()
        .join(DEFAULT_LOG_DIR)
}

/// A builder to configure and create a [`FileLog`].
#[derive(Debug)]
pub struct FileLogBuilder<P: RollingPolicy> {
    // required
    policy: P,

    // has default
    basedir: Option<PathBuf>,
    prefix: Option<String>,
    thread_name: String,
    retry_interval: Duration,
    trap: Box<dyn Trap>,
}

impl<P: RollingPolicy> FileLogBuilder<P> {
    /// Create a new file log builder with the given rollover policy.
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            basedir: None,
            prefix: None,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Set the log directory.
    ///
    /// Default to [`default_log_dir`].
    pub fn basedir(mut self, basedir: impl Into<PathBuf>) -> Self {
        self.basedir = Some(basedir.into());
        self
    }

    /// Set the filename prefix.
    ///
    /// Default to the policy's prefix: `Log_Single_`, `Log_FileSize_` or `Log_Datetime_`.
    pub fn filename_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = if prefix.is_empty() {
            None
        } else {
            Some(prefix)
        };
        self
    }

    /// Set the name of flush worker threads.
    pub fn thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    /// Set how long a failed flush pass waits before the next attempt may start.
    ///
    /// Default to one second.
    pub fn retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    /// Set the trap for errors that cannot be written to the log file.
    ///
    /// Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Build the [`FileLog`].
    ///
    /// # Errors
    ///
    /// Return an error if the log directory cannot be created.
    pub fn build(self) -> Result<FileLog<P>, Error> {
        let Self {
            policy,
            basedir,
            prefix,
            thread_name,
            retry_interval,
            trap,
        } = self;

        let basedir = basedir.unwrap_or_else(default_log_dir);
        let prefix = prefix.unwrap_or_else(|| policy.default_prefix().to_string());
        let engine = LogEngine::new(basedir, prefix, policy, thread_name, retry_interval, trap)?;
        Ok(FileLog { engine })
    }
}

/// A file log: queues records without blocking and persists them in the background.
///
/// # Examples
///
/// ```
/// use logspool::FileLog;
/// use logspool::FileLogBuilder;
/// use logspool::Level;
/// use logspool::LogRecord;
/// use logspool::rotation::DateBucketed;
///
/// let dir = tempfile::tempdir().unwrap();
/// let log = FileLogBuilder::new(DateBucketed::default())
///     .basedir(dir.path())
///     .build()
///     .unwrap();
///
/// log.record_message(LogRecord::new(Level::Info, "service started"));
/// log.flush().unwrap();
/// assert!(log.read_all_saved_log().unwrap().contains("service started"));
/// ```
#[derive(Debug)]
pub struct FileLog<P: RollingPolicy> {
    engine: LogEngine<P>,
}

impl FileLog<SingleFile> {
    /// Create a log writing to `Logs/Log_Single_runtime.log`.
    pub fn single_file() -> Result<Self, Error> {
        FileLogBuilder::new(SingleFile::default()).build()
    }
}

impl FileLog<SizeCapped> {
    /// Create a log rolling over to a new `Logs/Log_FileSize_*.log` file every 5 MiB.
    pub fn size_capped() -> Result<Self, Error> {
        FileLogBuilder::new(SizeCapped::default()).build()
    }
}

impl FileLog<DateBucketed> {
    /// Create a log rolling over to a new `Logs/Log_Datetime_yyyyMMdd.log` file every day.
    pub fn date_bucketed() -> Result<Self, Error> {
        FileLogBuilder::new(DateBucketed::default()).build()
    }
}

impl<P: RollingPolicy> FileLog<P> {
    /// Queue a record for writing.
    ///
    /// This never blocks on file I/O and never fails; write failures are retried and
    /// recorded in the log file itself.
    pub fn record_message(&self, record: LogRecord) {
        self.engine.record_message(record);
    }

    /// Queue a [`Level::Debug`] message.
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.record_message(LogRecord::new(Level::Debug, message));
    }

    /// Queue a [`Level::Info`] message.
    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.record_message(LogRecord::new(Level::Info, message));
    }

    /// Queue a [`Level::Warn`] message.
    #[track_caller]
    pub fn warn(&self, message: impl Into<String>) {
        self.record_message(LogRecord::new(Level::Warn, message));
    }

    /// Queue a [`Level::Error`] message.
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.record_message(LogRecord::new(Level::Error, message));
    }

    /// Queue a [`Level::Fatal`] message.
    #[track_caller]
    pub fn fatal(&self, message: impl Into<String>) {
        self.record_message(LogRecord::new(Level::Fatal, message));
    }

    /// Queue a message with an error and its chain of causes attached.
    #[track_caller]
    pub fn error_with<E>(&self, level: Level, message: impl Into<String>, err: E)
    where
        E: Into<anyhow::Error>,
    {
        self.record_message(LogRecord::new(level, message).with_error(err));
    }

    /// Write every queued record before returning, unless the write fails.
    ///
    /// Waits for an active background flush to finish, then drains the queue on the calling
    /// thread. On failure the records stay queued and a background retry is scheduled.
    pub fn flush(&self) -> Result<(), Error> {
        self.engine.flush()
    }

    /// Number of records waiting to be written.
    pub fn pending(&self) -> usize {
        self.engine.pending()
    }

    /// The log directory.
    pub fn dir(&self) -> &Path {
        self.engine.dir()
    }

    /// The filename prefix.
    pub fn prefix(&self) -> &str {
        self.engine.prefix()
    }

    /// The file the next flush pass would write to.
    pub fn current_target_file(&self) -> PathBuf {
        let (_guard, filepath) = self.engine.lock_target();
        filepath
    }

    /// Truncate the current target file to empty, creating it if absent.
    ///
    /// Waits for an active flush pass to finish writing first. Queued records are kept.
    pub fn clear_log(&self) -> Result<(), Error> {
        let (_guard, filepath) = self.engine.lock_target();
        fs::create_dir_all(self.engine.dir())
            .and_then(|()| File::create(&filepath))
            .map(drop)
            .map_err(|err| {
                Error::new("failed to clear log file")
                    .with_context("path", filepath.display())
                    .with_source(err)
            })
    }

    /// Read the full text of the current target file, or an empty string if it does not exist.
    ///
    /// Waits for an active flush pass to finish writing first. Queued records are not included.
    pub fn read_all_saved_log(&self) -> Result<String, Error> {
        let (_guard, filepath) = self.engine.lock_target();
        match fs::read(&filepath) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(Error::new("failed to read log file")
                .with_context("path", filepath.display())
                .with_source(err)),
        }
    }

    /// Alias of [`FileLog::read_all_saved_log`].
    pub fn get_all_saved_log(&self) -> Result<String, Error> {
        self.read_all_saved_log()
    }
}
