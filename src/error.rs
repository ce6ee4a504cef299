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

use std::fmt;

/// A failure of a synchronous logspool operation.
///
/// Returned when the log directory cannot be created, when a synchronous flush pass or a
/// read/clear of the target file fails, and when the `log` crate bridge cannot be installed.
/// Failures of background flush passes never surface as an `Error` to callers; they are written
/// to the log file as [`Fatal`](crate::Level::Fatal) records instead.
///
/// The [`Display`](fmt::Display) form is a single line,
/// `message, context: { key: value }, sources: [cause]`, so it fits in the error block of a
/// rendered record.
pub struct Error {
    message: String,
    sources: Vec<anyhow::Error>,
    context: Vec<(&'static str, String)>,
}

impl Error {
    /// Create an error describing the failed operation, e.g. `"failed to open log file"`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sources: vec![],
            context: vec![],
        }
    }

    /// Attach a key/value pair, such as the path of the file involved.
    pub fn with_context(mut self, key: &'static str, value: impl ToString) -> Self {
        self.context.push((key, value.to_string()));
        self
    }

    /// Attach the underlying cause, typically an [`std::io::Error`].
    pub fn with_source(mut self, src: impl Into<anyhow::Error>) -> Self {
        self.sources.push(src.into());
        self
    }

    /// The failed operation, without context and sources.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The attached causes, in the order they were added.
    pub fn sources(&self) -> impl ExactSizeIterator<Item = &(dyn std::error::Error + 'static)> {
        self.sources.iter().map(|v| v.as_ref())
    }

    fn write_joined<T>(
        f: &mut fmt::Formatter<'_>,
        items: &[T],
        mut item: impl FnMut(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
    ) -> fmt::Result {
        for (i, it) in items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            item(f, it)?;
        }
        Ok(())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if !self.context.is_empty() {
            f.write_str(", context: { ")?;
            Self::write_joined(f, &self.context, |f, (k, v)| write!(f, "{k}: {v}"))?;
            f.write_str(" }")?;
        }
        if !self.sources.is_empty() {
            f.write_str(", sources: [")?;
            Self::write_joined(f, &self.sources, |f, source| write!(f, "{source}"))?;
            f.write_str("]")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return f
                .debug_struct("Error")
                .field("message", &self.message)
                .field("context", &self.context)
                .field("sources", &self.sources)
                .finish();
        }

        // one line per fact, readable in the continuation lines of a record
        write!(f, "{}", self.message)?;
        for (k, v) in &self.context {
            write!(f, "\n  {k}: {v}")?;
        }
        for source in &self.sources {
            write!(f, "\n  caused by: {source:#}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.sources.first().map(|v| v.as_ref())
    }
}
