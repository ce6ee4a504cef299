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

//! Log record and its text rendering.

use std::backtrace::BacktraceStatus;
use std::fmt;
use std::fmt::Write;
use std::panic::AssertUnwindSafe;
use std::panic::Location;

use jiff::Zoned;

/// The first character of every rendered record.
///
/// Lines that start with the marker begin a new record; any other line continues the error
/// detail of the record above it.
pub const RECORD_MARKER: char = '\u{2}';

/// Maximum number of links rendered from an error's cause chain.
pub const MAX_ERROR_DEPTH: usize = 16;

/// The severity of a log record, ordered from least to most severe.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Level {
    /// Designates lower priority information.
    Debug,
    /// Designates useful information.
    Info,
    /// Designates hazardous situations.
    Warn,
    /// Designates errors.
    Error,
    /// Designates failures the application or the logger cannot recover from.
    Fatal,
}

impl Level {
    /// Return the string representation of the `Level`.
    ///
    /// This returns the same string as the `fmt::Display` implementation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug)]
struct RecordError {
    error: anyhow::Error,
    type_name: &'static str,
}

/// An immutable log entry awaiting persistence.
#[derive(Debug)]
pub struct LogRecord {
    // the observed time
    time: Zoned,
    level: Level,
    message: String,
    error: Option<RecordError>,
    location: &'static Location<'static>,
}

impl LogRecord {
    /// Create a record observed now, without an associated error.
    #[track_caller]
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            time: Zoned::now(),
            level,
            message: message.into(),
            error: None,
            location: Location::caller(),
        }
    }

    /// Returns a new builder.
    #[track_caller]
    pub fn builder() -> RecordBuilder {
        RecordBuilder {
            record: LogRecord::new(Level::Info, String::new()),
        }
    }

    /// Attach an error, along with its chain of causes, to this record.
    pub fn with_error<E>(mut self, err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        self.error = Some(RecordError {
            error: err.into(),
            type_name: std::any::type_name::<E>(),
        });
        self
    }

    /// The observed time.
    pub fn time(&self) -> &Zoned {
        &self.time
    }

    /// The severity of the record.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The message body.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The associated error, if any.
    pub fn error(&self) -> Option<&anyhow::Error> {
        self.error.as_ref().map(|e| &e.error)
    }

    /// The source location that created the record.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Render the record as text, without a trailing line terminator.
    ///
    /// ```text
    /// \u{2}2024-08-10 17:12:52.123 [ WARN] disk usage above 90%
    /// ```
    ///
    /// If an error is attached, one block per link of its cause chain follows on continuation
    /// lines. A failure while rendering the chain stops the walk; the text rendered so far is
    /// kept.
    pub fn render(&self) -> String {
        let mut text = String::new();
        let time = &self.time;
        // SAFETY: write to a string always succeeds
        write!(
            &mut text,
            "{RECORD_MARKER}{}.{:03} [{:>5}] {}",
            time.strftime("%Y-%m-%d %H:%M:%S"),
            time.millisecond(),
            self.level,
            strip_marker(&self.message),
        )
        .unwrap();

        if let Some(error) = &self.error {
            let mut detail = String::new();
            let _ = std::panic::catch_unwind(AssertUnwindSafe(|| {
                render_error_chain(&mut detail, error, self.location)
            }));
            text.push_str(&strip_marker(&detail));
        }

        text
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn render_error_chain(
    text: &mut String,
    error: &RecordError,
    location: &Location<'_>,
) -> fmt::Result {
    let RecordError { error, type_name } = error;
    for (depth, cause) in error.chain().take(MAX_ERROR_DEPTH).enumerate() {
        write!(text, "\n  Error[{depth}]: {cause}")?;
        write!(text, "\n    Detail: {cause:?}")?;
        if depth > 0 {
            continue;
        }

        write!(text, "\n    Type: {type_name}")?;
        write!(text, "\n    Location: {}:{}", location.file(), location.line())?;
        let backtrace = error.backtrace();
        if backtrace.status() == BacktraceStatus::Captured {
            write!(text, "\n    Backtrace:")?;
            for line in backtrace.to_string().lines() {
                write!(text, "\n      {}", line.trim_start())?;
            }
        }
    }
    Ok(())
}

fn strip_marker(text: &str) -> std::borrow::Cow<'_, str> {
    if text.contains(RECORD_MARKER) {
        text.replace(RECORD_MARKER, "").into()
    } else {
        text.into()
    }
}

/// Builder for [`LogRecord`].
#[derive(Debug)]
pub struct RecordBuilder {
    record: LogRecord,
}

impl RecordBuilder {
    /// Set the observed time; defaults to the time the builder was created.
    pub fn time(mut self, time: Zoned) -> Self {
        self.record.time = time;
        self
    }

    /// Set the level; defaults to [`Level::Info`].
    pub fn level(mut self, level: Level) -> Self {
        self.record.level = level;
        self
    }

    /// Set the message body.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.record.message = message.into();
        self
    }

    /// Attach an error and its chain of causes.
    pub fn error<E>(mut self, err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        self.record = self.record.with_error(err);
        self
    }

    /// Invoke the builder and return a `LogRecord`.
    pub fn build(self) -> LogRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::str::FromStr;

    use super::*;

    #[derive(Debug)]
    struct DiskFull {
        device: &'static str,
    }

    impl fmt::Display for DiskFull {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "no space left on {}", self.device)
        }
    }

    impl Error for DiskFull {}

    #[derive(Debug)]
    struct WriteFailed {
        source: DiskFull,
    }

    impl fmt::Display for WriteFailed {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("failed to write log file")
        }
    }

    impl Error for WriteFailed {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.source)
        }
    }

    #[derive(Debug)]
    struct Nested {
        depth: usize,
        source: Option<Box<Nested>>,
    }

    impl fmt::Display for Nested {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "nested {}", self.depth)
        }
    }

    impl Error for Nested {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            self.source.as_deref().map(|e| e as &(dyn Error + 'static))
        }
    }

    #[derive(Debug)]
    struct PanickingDisplay;

    impl fmt::Display for PanickingDisplay {
        fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
            panic!("broken display");
        }
    }

    impl Error for PanickingDisplay {}

    fn fixed_time() -> Zoned {
        Zoned::from_str("2024-08-10T17:12:52.123+08[+08]").unwrap()
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Fatal);
        assert_eq!(format!("[{:>5}]", Level::Warn), "[ WARN]");
        assert_eq!(format!("[{:>5}]", Level::Fatal), "[FATAL]");
    }

    #[test]
    fn test_render_without_error() {
        let record = LogRecord::builder()
            .time(fixed_time())
            .level(Level::Warn)
            .message("disk usage above 90%")
            .build();

        assert_eq!(
            record.render(),
            "\u{2}2024-08-10 17:12:52.123 [ WARN] disk usage above 90%"
        );
        assert_eq!(record.to_string(), record.render());
    }

    #[test]
    fn test_render_error_chain() {
        let record = LogRecord::builder()
            .time(fixed_time())
            .level(Level::Error)
            .message("flush failed")
            .error(WriteFailed {
                source: DiskFull { device: "sda1" },
            })
            .build();

        let rendered = record.render();
        assert!(rendered.contains("    Location: src/record.rs:"));

        // location and captured backtraces depend on the build environment
        let stable = rendered
            .replace(RECORD_MARKER, "<STX>")
            .lines()
            .filter(|line| {
                !line.starts_with("    Location:")
                    && !line.starts_with("    Backtrace:")
                    && !line.starts_with("      ")
            })
            .collect::<Vec<_>>()
            .join("\n");
        insta::assert_snapshot!(stable, @r#"
        <STX>2024-08-10 17:12:52.123 [ERROR] flush failed
          Error[0]: failed to write log file
            Detail: WriteFailed { source: DiskFull { device: "sda1" } }
            Type: logspool::record::tests::WriteFailed
          Error[1]: no space left on sda1
            Detail: DiskFull { device: "sda1" }
        "#);
    }

    #[test]
    fn test_render_caps_error_depth() {
        let mut error = Nested {
            depth: 0,
            source: None,
        };
        for depth in 1..(MAX_ERROR_DEPTH * 2) {
            error = Nested {
                depth,
                source: Some(Box::new(error)),
            };
        }

        let record = LogRecord::new(Level::Error, "deep").with_error(error);
        let rendered = record.render();
        assert_eq!(rendered.matches("  Error[").count(), MAX_ERROR_DEPTH);
    }

    #[test]
    fn test_render_swallows_error_rendering_failure() {
        let record = LogRecord::new(Level::Fatal, "still rendered").with_error(PanickingDisplay);
        let rendered = record.render();
        assert!(rendered.starts_with(RECORD_MARKER));
        assert!(rendered.contains("[FATAL] still rendered"));
    }

    #[test]
    fn test_render_strips_marker_from_message() {
        let record = LogRecord::new(Level::Info, "one\n\u{2}two");
        let rendered = record.render();
        assert_eq!(rendered.matches(RECORD_MARKER).count(), 1);
        assert!(rendered.ends_with("one\ntwo"));
    }
}
