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

use crate::rotation::ActiveFile;
use crate::rotation::LOG_FILE_EXTENSION;
use crate::rotation::RollingPolicy;
use crate::rotation::list_logfiles;

const STAMP: &str = "runtime";

/// Write every record to one file, `<prefix>runtime.log`.
#[derive(Debug, Default)]
pub struct SingleFile {
    active: ActiveFile,
}

impl RollingPolicy for SingleFile {
    fn default_prefix(&self) -> &'static str {
        "Log_Single_"
    }

    fn current_target_file(&self, dir: &Path, prefix: &str) -> PathBuf {
        if let Some(filepath) = self.active.get(dir, prefix, STAMP) {
            if filepath.is_file() {
                return filepath;
            }
        }

        let filename = format!("{prefix}{STAMP}{LOG_FILE_EXTENSION}");
        match list_logfiles(dir, prefix)
            .into_iter()
            .find(|file| file.filename.ends_with(&filename))
        {
            Some(file) => {
                self.active.set(dir, prefix, STAMP, &file.filepath);
                file.filepath
            }
            // created on first write; not memoized until it exists
            None => dir.join(filename),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_canonical_path_in_empty_directory() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let policy = SingleFile::default();

        let target = policy.current_target_file(temp_dir.path(), "Log_Single_");
        assert_eq!(target, temp_dir.path().join("Log_Single_runtime.log"));
        assert!(!target.exists());
    }

    #[test]
    fn test_reuses_existing_file() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let existing = temp_dir.path().join("Log_Single_runtime.log");
        fs::write(&existing, "\u{2}earlier run\n").unwrap();
        fs::write(temp_dir.path().join("Log_Single_other.log"), "").unwrap();

        let policy = SingleFile::default();
        assert_eq!(
            policy.current_target_file(temp_dir.path(), "Log_Single_"),
            existing
        );
        // memoized hit
        assert_eq!(
            policy.current_target_file(temp_dir.path(), "Log_Single_"),
            existing
        );
    }

    #[test]
    fn test_prefix_is_part_of_the_name() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let policy = SingleFile::default();

        let target = policy.current_target_file(temp_dir.path(), "app_");
        assert_eq!(target, temp_dir.path().join("app_runtime.log"));
    }
}
