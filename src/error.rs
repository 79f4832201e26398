// MIT License
//
// Copyright (c) 2024 Jerome Johnson
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Error handling for the Mustache front end
//!
//! Templates are compiled ahead of time, so every error here is fatal: the
//! pipeline halts on the first problem and reports it with the exact source
//! position. Nothing is retried and no partial token stream is produced.

use std::io;

use crate::position::Position;

/// Error type for template tokenization and resolution failures
///
/// Every variant carries the [`Position`] at which the problem was detected,
/// rendered IDE-style as `file:row:col: message`.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// A malformed tag: wrong brace counts, junk after an identifier,
    /// an unclosed tag or comment at end of file.
    #[error("{position}: {message}")]
    Syntax {
        /// Where the offending token was seen
        position: Position,
        message: String,
    },

    /// The payload of a delimiter-change tag could not be parsed as two
    /// whitespace-separated delimiter specs of one or two characters each.
    #[error("{position}: cannot parse delimiters from '{content}'")]
    InvalidDelimiters { position: Position, content: String },

    /// A partial or parent template could not be loaded.
    #[error("{position}: template \"{name}\" not found")]
    TemplateNotFound {
        /// Position of the partial/parent tag at the call site
        position: Position,
        /// The name the template was requested under
        name: String,
        #[source]
        source: io::Error,
    },

    /// A partial or parent template includes itself, directly or transitively.
    #[error("{position}: cyclic template inclusion: {chain}")]
    CyclicTemplate {
        position: Position,
        /// The template that closed the cycle
        name: String,
        /// The full expansion chain, root first
        chain: String,
    },
}

impl ParseError {
    pub(crate) fn syntax(position: &Position, message: impl Into<String>) -> Self {
        Self::Syntax {
            position: position.clone(),
            message: message.into(),
        }
    }
}

/// Result type for front-end operations
pub type Result<T> = std::result::Result<T, ParseError>;
