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

//! Mustache tag delimiters
//!
//! Templates open with `{{ }}` but may redefine the active pair at any point
//! with a delimiter-change tag (`{{=<% %>=}}`). A change must be visible to
//! the very next character the lexer scans, so the current pair lives in a
//! [`DelimiterRegistry`]: a shared cell the lexer re-reads once per character
//! and the tag recognizer writes through the moment a change tag closes.

use std::cell::Cell;
use std::fmt::Display;
use std::rc::Rc;

/// An open/close delimiter pair
///
/// Second characters are optional; `{{=| |=}}` installs single-character
/// delimiters. The third brace of a triple mustache is always a literal
/// `{`/`}` regardless of the active pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub start1: char,
    pub start2: Option<char>,
    pub end1: char,
    pub end2: Option<char>,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            start1: '{',
            start2: Some('{'),
            end1: '}',
            end2: Some('}'),
        }
    }
}

impl Delimiters {
    /// The literal third brace opening a triple mustache
    pub const fn start3() -> char {
        '{'
    }

    /// The literal third brace closing a triple mustache
    pub const fn end3() -> char {
        '}'
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Parses a delimiter-change payload such as `<% %>` or `| |`
    ///
    /// The payload must be two whitespace-separated specs of one or two
    /// characters each; anything else yields `None`.
    pub fn parse(content: &str) -> Option<Self> {
        let mut specs = content.split_whitespace();
        let start = specs.next()?;
        let end = specs.next()?;
        if specs.next().is_some() {
            return None;
        }
        let (start1, start2) = split_spec(start)?;
        let (end1, end2) = split_spec(end)?;
        Some(Self {
            start1,
            start2,
            end1,
            end2,
        })
    }

    /// Appends the opening delimiter characters to `out`
    pub fn append_start(&self, out: &mut String) {
        out.push(self.start1);
        if let Some(c) = self.start2 {
            out.push(c);
        }
    }

    /// Appends the closing delimiter characters to `out`
    pub fn append_end(&self, out: &mut String) {
        out.push(self.end1);
        if let Some(c) = self.end2 {
            out.push(c);
        }
    }
}

impl Display for Delimiters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = String::with_capacity(5);
        self.append_start(&mut s);
        s.push(' ');
        self.append_end(&mut s);
        f.write_str(&s)
    }
}

fn split_spec(spec: &str) -> Option<(char, Option<char>)> {
    let mut chars = spec.chars();
    let first = chars.next()?;
    let second = chars.next();
    if chars.next().is_some() {
        return None;
    }
    Some((first, second))
}

/// The currently active delimiter pair, shared between pipeline stages
///
/// Cloning yields another handle onto the same cell. The lexer refreshes its
/// snapshot from here once per character; a `set` from the tag recognizer is
/// therefore visible before the next character is processed, with no deferred
/// dispatch involved.
#[derive(Debug, Clone)]
pub struct DelimiterRegistry {
    current: Rc<Cell<Delimiters>>,
}

impl Default for DelimiterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DelimiterRegistry {
    /// Creates a registry holding the default `{{ }}` pair
    pub fn new() -> Self {
        Self {
            current: Rc::new(Cell::new(Delimiters::default())),
        }
    }

    pub fn current(&self) -> Delimiters {
        self.current.get()
    }

    pub fn set(&self, delimiters: Delimiters) {
        self.current.set(delimiters);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_two_character_delimiters() {
        let d = Delimiters::parse("<% %>").unwrap();
        assert_eq!(d.start1, '<');
        assert_eq!(d.start2, Some('%'));
        assert_eq!(d.end1, '%');
        assert_eq!(d.end2, Some('>'));
    }

    #[test]
    fn parses_single_character_delimiters_with_padding() {
        let d = Delimiters::parse(" @   @ ").unwrap();
        assert_eq!(d.start1, '@');
        assert_eq!(d.start2, None);
        assert_eq!(d.end1, '@');
        assert_eq!(d.end2, None);
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert_eq!(Delimiters::parse(""), None);
        assert_eq!(Delimiters::parse("only"), None);
        assert_eq!(Delimiters::parse("a b c"), None);
        assert_eq!(Delimiters::parse("abc de"), None);
    }

    #[test]
    fn registry_handles_share_one_cell() {
        let registry = DelimiterRegistry::new();
        let handle = registry.clone();
        assert!(handle.current().is_default());
        registry.set(Delimiters::parse("<% %>").unwrap());
        assert_eq!(handle.current(), Delimiters::parse("<% %>").unwrap());
    }

    #[test]
    fn displays_as_change_payload() {
        assert_eq!(Delimiters::default().to_string(), "{{ }}");
        assert_eq!(Delimiters::parse("| |").unwrap().to_string(), "| |");
    }
}
