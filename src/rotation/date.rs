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

use std::path::Path;
use std::path::PathBuf;

use crate::clock::Clock;
use crate::rotation::ActiveFile;
use crate::rotation::LOG_FILE_EXTENSION;
use crate::rotation::RollingPolicy;
use crate::rotation::list_logfiles;

/// Write to one file per calendar day, `<prefix>yyyyMMdd.log`, in the local time zone.
#[derive(Debug, Default)]
pub struct DateBucketed {
    clock: Clock,
    active: ActiveFile,
}

impl DateBucketed {
    #[cfg(test)]
    fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

impl RollingPolicy for DateBucketed {
    fn default_prefix(&self) -> &'static str {
        "Log_Datetime_"
    }

    fn current_target_file(&self, dir: &Path, prefix: &str) -> PathBuf {
        let stamp = self.clock.now().strftime("%Y%m%d").to_string();
        if let Some(filepath) = self.active.get(dir, prefix, &stamp) {
            if filepath.is_file() {
                return filepath;
            }
        }

        let filename = format!("{prefix}{stamp}{LOG_FILE_EXTENSION}");
        match list_logfiles(dir, prefix)
            .into_iter()
            .find(|file| file.filename.ends_with(&filename))
        {
            Some(file) => {
                self.active.set(dir, prefix, &stamp, &file.filepath);
                file.filepath
            }
            None => dir.join(filename),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::str::FromStr;

    use jiff::Zoned;
    use tempfile::TempDir;

    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_same_day_same_file_next_day_new_file() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let clock = ManualClock::new(Zoned::from_str("2024-08-10T00:00:01+08[+08]").unwrap());
        let policy = DateBucketed::default().clock(Clock::ManualClock(clock.clone()));

        let first = policy.current_target_file(temp_dir.path(), "Log_Datetime_");
        assert_eq!(first, temp_dir.path().join("Log_Datetime_20240810.log"));
        fs::write(&first, "\u{2}first pass\n").unwrap();

        clock.set_now(Zoned::from_str("2024-08-10T23:59:59+08[+08]").unwrap());
        assert_eq!(
            policy.current_target_file(temp_dir.path(), "Log_Datetime_"),
            first
        );

        clock.set_now(Zoned::from_str("2024-08-11T00:00:00+08[+08]").unwrap());
        assert_eq!(
            policy.current_target_file(temp_dir.path(), "Log_Datetime_"),
            temp_dir.path().join("Log_Datetime_20240811.log")
        );
    }

    #[test]
    fn test_ignores_other_days() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        fs::write(temp_dir.path().join("Log_Datetime_20240809.log"), "").unwrap();

        let clock = ManualClock::new(Zoned::from_str("2024-08-10T12:00:00+08[+08]").unwrap());
        let policy = DateBucketed::default().clock(Clock::ManualClock(clock));
        assert_eq!(
            policy.current_target_file(temp_dir.path(), "Log_Datetime_"),
            temp_dir.path().join("Log_Datetime_20240810.log")
        );
    }
}
