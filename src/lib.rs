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

//! Mustache template front end
//!
//! Turns Mustache template text into a normalized, position-annotated token
//! stream ready for a code generator or interpreter to consume. The pipeline
//! runs in four stages:
//!
//! - the braces lexer groups characters into delimiter events, honoring
//!   runtime delimiter changes (`{{=<% %>=}}`)
//! - the tag recognizer classifies tags by their sigil and produces semantic
//!   tokens
//! - the whitespace normalizer elides standalone control-tag lines and
//!   captures partial indentation
//! - the resolver flattens partials and template inheritance into a single
//!   stream
//!
//! Every token carries the file, row and column it came from, so consumers
//! can report `file:row:col` diagnostics long after parsing.
//!
//! # Example
//!
//! ```rust
//! use dry_mustache::{MapLoader, parse};
//!
//! let mut loader = MapLoader::new();
//! loader.insert("hello", "Hello {{name}}!\n{{>footer}}\n");
//! loader.insert("footer", "-- {{author}}\n");
//!
//! let tokens = parse(&loader, "hello").unwrap();
//! let mut raw = String::new();
//! for item in &tokens {
//!     item.token.append_raw(&mut raw);
//! }
//! assert_eq!(raw, "Hello {{name}}!\n-- {{author}}\n");
//! ```
//!
//! # Module Structure
//!
//! - `position.rs`: source positions and the character cursor
//! - `delimiters.rs`: delimiter pairs and the shared delimiter registry
//! - `braces.rs`: the low-level braces lexer
//! - `token.rs`: semantic tokens and the backend [`Visitor`] interface
//! - `tokenizer.rs`: the tag recognizer
//! - `whitespace.rs`: standalone-line whitespace normalization
//! - `resolve.rs`: partial and inheritance resolution
//! - `error.rs`: error types and handling

mod braces;
mod delimiters;
mod error;
mod position;
mod resolve;
mod token;
mod tokenizer;
mod whitespace;

pub use braces::{BracesLexer, BracesSink, BracesToken};
pub use delimiters::{DelimiterRegistry, Delimiters};
pub use error::{ParseError, Result};
pub use position::{Position, Positioned, SourceCursor};
pub use resolve::{DirectoryLoader, MapLoader, TemplateLoader, parse, parse_source};
pub use token::{
    MustacheTagKind, MustacheToken, NewlineKind, SpecialChar, Visitor, visit,
};
pub use tokenizer::{MustacheTokenizer, TokenSink, tokenize, tokenize_into};
pub use whitespace::{NormalizedToken, normalize};
