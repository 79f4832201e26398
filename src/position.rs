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

//! Source positions for diagnostics
//!
//! Every character entering the lexer is annotated with its file, 1-based row
//! and column, and the raw text of the physical line it sits on, so that any
//! stage downstream can report `file:row:col` errors with context.

use std::fmt::Display;
use std::rc::Rc;

use std::str::Chars;

/// A location in a template source file
///
/// Rows and columns are 1-based. `line` holds the raw line text without its
/// terminator. Cloning is cheap: the file name and line text are shared.
#[derive(Debug, Clone)]
pub struct Position {
    file: Rc<str>,
    row: u32,
    line: Rc<str>,
    col: u32,
}

impl Position {
    pub fn new(file: Rc<str>, row: u32, line: Rc<str>, col: u32) -> Self {
        Self {
            file,
            row,
            line,
            col,
        }
    }

    /// A placeholder position for tokens created before any input is read
    pub fn none() -> Self {
        Self {
            file: Rc::from(""),
            row: 0,
            line: Rc::from(""),
            col: 0,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn col(&self) -> u32 {
        self.col
    }

    /// The raw text of the line this position sits on
    pub fn line(&self) -> &str {
        &self.line
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.row, self.col)
    }
}

/// A token paired with the position it originated from
#[derive(Debug, Clone)]
pub struct Positioned<T> {
    pub position: Position,
    pub token: T,
}

impl<T> Positioned<T> {
    pub fn new(position: Position, token: T) -> Self {
        Self { position, token }
    }
}

/// Walks template source one character at a time, yielding each character
/// with its [`Position`]
///
/// Lines are indexed up front so that every position can share the raw line
/// text instead of re-slicing it per character.
pub struct SourceCursor<'a> {
    file: Rc<str>,
    lines: Vec<Rc<str>>,
    empty: Rc<str>,
    chars: Chars<'a>,
    row: u32,
    col: u32,
}

impl<'a> SourceCursor<'a> {
    pub fn new(file_name: &str, source: &'a str) -> Self {
        Self {
            file: Rc::from(file_name),
            lines: source.lines().map(Rc::from).collect(),
            empty: Rc::from(""),
            chars: source.chars(),
            row: 1,
            col: 1,
        }
    }

    fn current_line(&self) -> Rc<str> {
        self.lines
            .get(self.row as usize - 1)
            .cloned()
            .unwrap_or_else(|| self.empty.clone())
    }

    /// The position just past the last character read, used for end-of-input
    /// tokens and errors
    pub fn end_position(&self) -> Position {
        Position::new(self.file.clone(), self.row, self.current_line(), self.col)
    }
}

impl Iterator for SourceCursor<'_> {
    type Item = (char, Position);

    fn next(&mut self) -> Option<Self::Item> {
        let c = self.chars.next()?;
        let position = Position::new(self.file.clone(), self.row, self.current_line(), self.col);
        if c == '\n' {
            self.row += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some((c, position))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn tracks_rows_and_columns() {
        let cursor = SourceCursor::new("t.mustache", "ab\ncd");
        let positions: Vec<_> = cursor
            .map(|(c, p)| (c, p.row(), p.col(), p.line().to_string()))
            .collect();
        assert_eq!(
            positions,
            vec![
                ('a', 1, 1, "ab".to_string()),
                ('b', 1, 2, "ab".to_string()),
                ('\n', 1, 3, "ab".to_string()),
                ('c', 2, 1, "cd".to_string()),
                ('d', 2, 2, "cd".to_string()),
            ]
        );
    }

    #[test]
    fn crlf_lines_keep_raw_text_without_terminator() {
        let mut cursor = SourceCursor::new("t", "a\r\nb");
        let (_, p) = cursor.next().unwrap();
        assert_eq!(p.line(), "a");
        cursor.next();
        cursor.next();
        let (c, p) = cursor.next().unwrap();
        assert_eq!(c, 'b');
        assert_eq!((p.row(), p.col()), (2, 1));
    }

    #[test]
    fn end_position_points_past_input() {
        let mut cursor = SourceCursor::new("t", "xy");
        cursor.by_ref().for_each(drop);
        let end = cursor.end_position();
        assert_eq!((end.row(), end.col()), (1, 3));
    }
}
