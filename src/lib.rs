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

//! Logspool is an asynchronous file logger: application threads queue log records without
//! touching the disk, and a transient background worker appends them to a log file chosen by a
//! rollover policy.
//!
//! # Overview
//!
//! [`FileLog::record_message`] appends to an in-memory queue and returns. The first caller that
//! finds no flush in progress spawns a worker, which drains the queue into the current target
//! file and rechecks for newly arrived records before going idle. At most one worker runs at a
//! time. A failed write is never lost: the record goes back to the queue, followed by a
//! [`Level::Fatal`] record describing the failure, and both are written on the next pass.
//!
//! Three policies choose the target file in the log directory:
//!
//! * [`rotation::SingleFile`]: `Log_Single_runtime.log`.
//! * [`rotation::SizeCapped`]: `Log_FileSize_yyyyMMddHHmm.log`, a new file every 5 MiB.
//! * [`rotation::DateBucketed`]: `Log_Datetime_yyyyMMdd.log`, a new file every day.
//!
//! Each record is one line starting with [`RECORD_MARKER`]; error details follow on
//! continuation lines.
//!
//! # Examples
//!
//! ```
//! use logspool::FileLogBuilder;
//! use logspool::Level;
//! use logspool::rotation::SizeCapped;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let log = FileLogBuilder::new(SizeCapped::default())
//!     .basedir(dir.path())
//!     .build()
//!     .unwrap();
//!
//! log.info("service started");
//! log.error_with(
//!     Level::Error,
//!     "failed to load settings",
//!     std::io::Error::other("settings.toml is missing"),
//! );
//! log.flush().unwrap();
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod lock;
pub mod rotation;
pub mod trap;

#[cfg(feature = "bridge-log")]
pub mod bridge;

mod clock;
mod engine;
mod error;
mod facade;
mod record;

pub use self::error::Error;
pub use self::facade::DEFAULT_LOG_DIR;
pub use self::facade::FileLog;
pub use self::facade::FileLogBuilder;
pub use self::facade::default_log_dir;
pub use self::record::Level;
pub use self::record::LogRecord;
pub use self::record::MAX_ERROR_DEPTH;
pub use self::record::RECORD_MARKER;
pub use self::record::RecordBuilder;
