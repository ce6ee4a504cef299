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

//! Policies deciding which file in the log directory receives the next write.
//!
//! A policy is queried once per flush pass and by the synchronous file operations of
//! [`FileLog`](crate::FileLog). It never creates files; the caller opens the returned path for
//! append, creating it on first write.

use std::fmt;
use std::fs;
use std::fs::Metadata;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

pub use self::date::DateBucketed;
pub use self::single::SingleFile;
pub use self::size::DEFAULT_MAX_FILE_SIZE;
pub use self::size::SizeCapped;

mod date;
mod single;
mod size;

/// Extension suffix shared by all log files.
pub const LOG_FILE_EXTENSION: &str = ".log";

/// Strategy that selects the current target file from a naming prefix and the directory contents.
pub trait RollingPolicy: fmt::Debug + Send + Sync + 'static {
    /// The filename prefix used when the builder does not override it.
    fn default_prefix(&self) -> &'static str;

    /// Resolve the file the next write should go to.
    ///
    /// The returned path is inside `dir` and may not exist yet. Listing errors are treated as an
    /// empty directory.
    fn current_target_file(&self, dir: &Path, prefix: &str) -> PathBuf;
}

impl<T: RollingPolicy + ?Sized> RollingPolicy for Box<T> {
    fn default_prefix(&self) -> &'static str {
        (**self).default_prefix()
    }

    fn current_target_file(&self, dir: &Path, prefix: &str) -> PathBuf {
        (**self).current_target_file(dir, prefix)
    }
}

#[derive(Debug)]
struct LogFile {
    filepath: PathBuf,
    filename: String,
    metadata: Metadata,
}

/// List regular files named `<prefix>*.log`, sorted by filename.
fn list_logfiles(dir: &Path, prefix: &str) -> Vec<LogFile> {
    let Ok(read_dir) = fs::read_dir(dir) else {
        return vec![];
    };

    let mut files = read_dir
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let metadata = entry.metadata().ok()?;
            // the engine only writes files, never directories or symlinks
            if !metadata.is_file() {
                return None;
            }

            // if the filename is not a UTF-8 string, skip it.
            let filename = entry.file_name().into_string().ok()?;
            if !filename.starts_with(prefix) || !filename.ends_with(LOG_FILE_EXTENSION) {
                return None;
            }

            Some(LogFile {
                filepath: entry.path(),
                filename,
                metadata,
            })
        })
        .collect::<Vec<_>>();
    files.sort_by(|a, b| a.filename.cmp(&b.filename));
    files
}

/// The last file a policy resolved, so a hit costs one `metadata` call instead of a scan.
#[derive(Debug, Default)]
struct ActiveFile(Mutex<Option<Active>>);

#[derive(Debug)]
struct Active {
    dir: PathBuf,
    prefix: String,
    stamp: String,
    filepath: PathBuf,
}

impl ActiveFile {
    fn get(&self, dir: &Path, prefix: &str, stamp: &str) -> Option<PathBuf> {
        let active = self.0.lock().unwrap_or_else(|e| e.into_inner());
        active
            .as_ref()
            .filter(|a| a.dir == dir && a.prefix == prefix && a.stamp == stamp)
            .map(|a| a.filepath.clone())
    }

    fn set(&self, dir: &Path, prefix: &str, stamp: &str, filepath: &Path) {
        let mut active = self.0.lock().unwrap_or_else(|e| e.into_inner());
        *active = Some(Active {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
            stamp: stamp.to_string(),
            filepath: filepath.to_path_buf(),
        });
    }
}
