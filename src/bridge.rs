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

//! A bridge to forward logs from the `log` crate to a [`FileLog`].

use crate::Error;
use crate::FileLog;
use crate::Level;
use crate::LogRecord;
use crate::rotation::RollingPolicy;

/// A [`log::Log`] implementation that records every enabled `log` record into a [`FileLog`].
#[derive(Debug)]
pub struct LogCrateLogger<P: RollingPolicy> {
    log: FileLog<P>,
    min_level: Level,
}

impl<P: RollingPolicy> LogCrateLogger<P> {
    /// Wrap a file log, accepting records at `min_level` or more severe.
    pub fn new(log: FileLog<P>, min_level: Level) -> Self {
        Self { log, min_level }
    }

    /// The wrapped file log.
    pub fn file_log(&self) -> &FileLog<P> {
        &self.log
    }
}

/// Map a `log` crate level onto a record level; `Trace` folds into `Debug`.
pub fn level_from_log(level: log::Level) -> Level {
    match level {
        log::Level::Error => Level::Error,
        log::Level::Warn => Level::Warn,
        log::Level::Info => Level::Info,
        log::Level::Debug | log::Level::Trace => Level::Debug,
    }
}

fn max_level_filter(min_level: Level) -> log::LevelFilter {
    match min_level {
        Level::Debug => log::LevelFilter::Trace,
        Level::Info => log::LevelFilter::Info,
        Level::Warn => log::LevelFilter::Warn,
        Level::Error | Level::Fatal => log::LevelFilter::Error,
    }
}

impl<P: RollingPolicy> log::Log for LogCrateLogger<P> {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        level_from_log(metadata.level()) >= self.min_level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = level_from_log(record.level());
        self.log
            .record_message(LogRecord::new(level, record.args().to_string()));
    }

    fn flush(&self) {
        // a failed pass is already queued as a fatal record and retried in the background
        let _ = self.log.flush();
    }
}

/// Set up the log crate global logger.
///
/// This function calls [`log::set_boxed_logger`] so that all logs from the log crate at
/// `min_level` or more severe are recorded into `log`, and sets the global maximum log level
/// to match.
///
/// # Errors
///
/// Return an error if the log crate global logger has already been set.
///
/// # Examples
///
/// ```
/// use logspool::FileLogBuilder;
/// use logspool::Level;
/// use logspool::rotation::SingleFile;
///
/// let dir = tempfile::tempdir().unwrap();
/// let log = FileLogBuilder::new(SingleFile::default())
///     .basedir(dir.path())
///     .build()
///     .unwrap();
///
/// if let Err(err) = logspool::bridge::try_setup_log_crate(log, Level::Info) {
///     eprintln!("failed to setup log crate: {err}");
/// }
/// log::info!("recorded into Log_Single_runtime.log");
/// ```
pub fn try_setup_log_crate<P: RollingPolicy>(
    log: FileLog<P>,
    min_level: Level,
) -> Result<(), Error> {
    log::set_boxed_logger(Box::new(LogCrateLogger::new(log, min_level)))
        .map_err(|err| Error::new("failed to set up log crate global logger").with_source(err))?;
    log::set_max_level(max_level_filter(min_level));
    Ok(())
}

/// Set up the log crate global logger.
///
/// # Panics
///
/// Panic if the log crate global logger has already been set.
pub fn setup_log_crate<P: RollingPolicy>(log: FileLog<P>, min_level: Level) {
    try_setup_log_crate(log, min_level).expect(
        "logspool::bridge::setup_log_crate must be called before the log crate global logger initialized",
    )
}
