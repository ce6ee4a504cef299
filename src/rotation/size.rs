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
use std::num::NonZeroU64;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::clock::Clock;
use crate::rotation::ActiveFile;
use crate::rotation::LOG_FILE_EXTENSION;
use crate::rotation::RollingPolicy;
use crate::rotation::list_logfiles;

/// Default size threshold of [`SizeCapped`], 5 MiB.
pub const DEFAULT_MAX_FILE_SIZE: NonZeroU64 = NonZeroU64::new(5 * 1024 * 1024).unwrap();

/// Write to the first `<prefix>*.log` file smaller than a size threshold.
///
/// Once every matching file reached the threshold, a new file stamped with the current minute,
/// `<prefix>yyyyMMddHHmm.log`, is started. If that name is taken by a full file minted in the
/// same minute, `_1`, `_2`, ... is appended to the stamp.
///
/// The chosen file is remembered along with the files sorted before it, which were full at
/// scan time. The directory is scanned again only when the remembered file fills up or one of
/// those earlier files shrinks; a file that sorts earlier but was created by another process
/// after the scan is not noticed until then.
#[derive(Debug)]
pub struct SizeCapped {
    max_size: NonZeroU64,
    clock: Clock,
    active: ActiveFile,
    // files sorted before the active one; all were full when it was chosen
    full_before: Mutex<Vec<PathBuf>>,
}

impl Default for SizeCapped {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE)
    }
}

impl SizeCapped {
    /// Create a policy rolling over once a file reaches `max_size` bytes.
    pub fn new(max_size: NonZeroU64) -> Self {
        Self {
            max_size,
            clock: Clock::DefaultClock,
            active: ActiveFile::default(),
            full_before: Mutex::new(vec![]),
        }
    }

    /// The size threshold in bytes.
    pub fn max_size(&self) -> u64 {
        self.max_size.get()
    }

    #[cfg(test)]
    fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn has_room(&self, filepath: &Path) -> bool {
        fs::metadata(filepath).is_ok_and(|m| m.is_file() && m.len() < self.max_size.get())
    }

    fn mint(&self, dir: &Path, prefix: &str) -> PathBuf {
        let stamp = self.clock.now().strftime("%Y%m%d%H%M").to_string();
        let filepath = dir.join(format!("{prefix}{stamp}{LOG_FILE_EXTENSION}"));
        if !filepath.exists() {
            return filepath;
        }

        (1..)
            .map(|n| dir.join(format!("{prefix}{stamp}_{n}{LOG_FILE_EXTENSION}")))
            .find(|filepath| !filepath.exists())
            .unwrap_or(filepath)
    }
}

impl RollingPolicy for SizeCapped {
    fn default_prefix(&self) -> &'static str {
        "Log_FileSize_"
    }

    fn current_target_file(&self, dir: &Path, prefix: &str) -> PathBuf {
        let mut full_before = self.full_before.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(filepath) = self.active.get(dir, prefix, "") {
            if self.has_room(&filepath) && !full_before.iter().any(|f| self.has_room(f)) {
                return filepath;
            }
        }

        let files = list_logfiles(dir, prefix);
        let filepath = match files
            .iter()
            .position(|file| file.metadata.len() < self.max_size.get())
        {
            Some(index) => {
                *full_before = files[..index].iter().map(|f| f.filepath.clone()).collect();
                files[index].filepath.clone()
            }
            None => {
                *full_before = files.into_iter().map(|f| f.filepath).collect();
                self.mint(dir, prefix)
            }
        };
        self.active.set(dir, prefix, "", &filepath);
        filepath
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::fs::File;
    use std::str::FromStr;

    use jiff::Zoned;
    use tempfile::TempDir;

    use super::*;
    use crate::clock::ManualClock;

    const MIB: u64 = 1024 * 1024;

    fn policy_at(now: &str) -> (SizeCapped, ManualClock) {
        let clock = ManualClock::new(Zoned::from_str(now).unwrap());
        let policy = SizeCapped::default().clock(Clock::ManualClock(clock.clone()));
        (policy, clock)
    }

    fn create_sized(filepath: &Path, len: u64) {
        File::create(filepath).unwrap().set_len(len).unwrap();
    }

    #[test]
    fn test_mints_minute_stamped_file_in_empty_directory() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let (policy, _) = policy_at("2024-08-10T17:12:52+08[+08]");

        let target = policy.current_target_file(temp_dir.path(), "Log_FileSize_");
        assert_eq!(
            target,
            temp_dir.path().join("Log_FileSize_202408101712.log")
        );
    }

    #[test]
    fn test_reuses_file_until_threshold() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let existing = temp_dir.path().join("Log_FileSize_202408090800.log");
        create_sized(&existing, 4 * MIB);
        fs::write(temp_dir.path().join("unrelated.log"), "").unwrap();

        let (policy, clock) = policy_at("2024-08-10T17:12:52+08[+08]");
        assert_eq!(policy.max_size(), 5 * MIB);
        assert_eq!(
            policy.current_target_file(temp_dir.path(), "Log_FileSize_"),
            existing
        );

        create_sized(&existing, 5 * MIB - 1);
        assert_eq!(
            policy.current_target_file(temp_dir.path(), "Log_FileSize_"),
            existing
        );

        create_sized(&existing, 5 * MIB);
        clock.set_now(Zoned::from_str("2024-08-10T17:13:05+08[+08]").unwrap());
        assert_eq!(
            policy.current_target_file(temp_dir.path(), "Log_FileSize_"),
            temp_dir.path().join("Log_FileSize_202408101713.log")
        );
    }

    #[test]
    fn test_first_file_with_room_wins() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        create_sized(&temp_dir.path().join("Log_FileSize_202408090800.log"), 5 * MIB);
        let second = temp_dir.path().join("Log_FileSize_202408090900.log");
        create_sized(&second, 1024);
        create_sized(&temp_dir.path().join("Log_FileSize_202408091000.log"), 0);

        let (policy, _) = policy_at("2024-08-10T17:12:52+08[+08]");
        assert_eq!(
            policy.current_target_file(temp_dir.path(), "Log_FileSize_"),
            second
        );
    }

    #[test]
    fn test_full_file_minted_in_same_minute_gets_counter() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let (policy, _) = policy_at("2024-08-10T17:12:52+08[+08]");

        let first = policy.current_target_file(temp_dir.path(), "Log_FileSize_");
        create_sized(&first, 5 * MIB);
        assert_eq!(
            policy.current_target_file(temp_dir.path(), "Log_FileSize_"),
            temp_dir.path().join("Log_FileSize_202408101712_1.log")
        );
    }

    #[test]
    fn test_earlier_file_that_shrank_wins_again() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let first = temp_dir.path().join("Log_FileSize_202408090800.log");
        create_sized(&first, 5 * MIB);
        let second = temp_dir.path().join("Log_FileSize_202408090900.log");
        create_sized(&second, 1024);

        let (policy, _) = policy_at("2024-08-10T17:12:52+08[+08]");
        assert_eq!(
            policy.current_target_file(temp_dir.path(), "Log_FileSize_"),
            second
        );

        // truncated by another process
        create_sized(&first, 0);
        assert_eq!(
            policy.current_target_file(temp_dir.path(), "Log_FileSize_"),
            first
        );
    }
}
