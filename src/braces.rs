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

//! The braces lexer
//!
//! Groups raw characters into delimiter events (`TwoOpen`, `ThreeOpen`,
//! `TwoClose`, `ThreeClose`) and plain characters. The lexer is asymmetric
//! on purpose: outside a tag only the opening delimiter is matched, so a
//! stray `}}` in plain text stays literal text; inside a tag only the
//! closing delimiter is matched, so a `{{` inside a tag body reaches the
//! recognizer as ordinary characters.
//!
//! The active delimiter pair is re-read from the [`DelimiterRegistry`] on
//! every character, so a delimiter change installed by the recognizer takes
//! effect for the very next character. A partial match abandoned on a
//! mismatch degrades to literal characters, including the mismatched
//! character itself, and is never retried. The lexer itself never fails;
//! every partial delimiter match at end of input is flushed as the event or
//! characters it had committed to.

use crate::delimiters::{DelimiterRegistry, Delimiters};
use crate::error::Result;
use crate::position::Position;

/// A low-level lexical event: a delimiter group or a single character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracesToken {
    /// The two-character (or single-character) opening delimiter
    TwoOpen,
    /// The opening delimiter followed by a literal `{`
    ThreeOpen,
    /// The two-character (or single-character) closing delimiter
    TwoClose,
    /// A literal `}` followed by the closing delimiter
    ThreeClose,
    Character(char),
    EndOfInput,
}

/// Consumer of the lexer's event stream
pub trait BracesSink {
    fn braces(&mut self, token: BracesToken, position: &Position) -> Result<()>;
}

impl BracesSink for Vec<BracesToken> {
    fn braces(&mut self, token: BracesToken, _position: &Position) -> Result<()> {
        self.push(token);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// In plain text; watching for the opening delimiter only
    Outside,
    /// Saw `start1` of a two-character opening delimiter
    SawOpen1,
    /// Saw the full opening delimiter; a `{` would make it a triple
    SawOpen2,
    /// Inside a tag; watching for the closing delimiter only
    Inside,
    /// Saw `end1` of a two-character closing delimiter
    SawClose1,
    /// Saw the full closing delimiter; a `}` would make it a triple
    SawClose2,
}

/// Streaming lexer over template characters
///
/// Feed characters with [`feed`](Self::feed) and finish with
/// [`finish`](Self::finish); events are pushed into the supplied
/// [`BracesSink`] as they complete.
pub struct BracesLexer {
    delimiters: DelimiterRegistry,
    state: State,
    /// Position of the first character of a partially matched delimiter;
    /// delimiter events are reported here rather than at the character that
    /// completed them
    mark: Position,
}

impl BracesLexer {
    pub fn new(delimiters: DelimiterRegistry) -> Self {
        Self {
            delimiters,
            state: State::Outside,
            mark: Position::none(),
        }
    }

    /// Processes one character, emitting any events it completes
    pub fn feed(
        &mut self,
        c: char,
        position: &Position,
        down: &mut impl BracesSink,
    ) -> Result<()> {
        let d = self.delimiters.current();
        match self.state {
            State::Outside => {
                if c == d.start1 {
                    self.mark = position.clone();
                    self.state = if d.start2.is_some() {
                        State::SawOpen1
                    } else {
                        State::SawOpen2
                    };
                } else {
                    down.braces(BracesToken::Character(c), position)?;
                }
            }
            State::SawOpen1 => {
                if Some(c) == d.start2 {
                    self.state = State::SawOpen2;
                } else {
                    // the abandoned match is not retried: the mismatched
                    // character degrades to a literal too
                    let mark = self.mark.clone();
                    down.braces(BracesToken::Character(d.start1), &mark)?;
                    down.braces(BracesToken::Character(c), position)?;
                    self.state = State::Outside;
                }
            }
            State::SawOpen2 => {
                let mark = self.mark.clone();
                if c == Delimiters::start3() {
                    down.braces(BracesToken::ThreeOpen, &mark)?;
                    self.state = State::Inside;
                } else {
                    down.braces(BracesToken::TwoOpen, &mark)?;
                    self.state = State::Inside;
                    self.feed(c, position, down)?;
                }
            }
            State::Inside => {
                if c == d.end1 {
                    self.mark = position.clone();
                    self.state = if d.end2.is_some() {
                        State::SawClose1
                    } else {
                        State::SawClose2
                    };
                } else {
                    down.braces(BracesToken::Character(c), position)?;
                }
            }
            State::SawClose1 => {
                if Some(c) == d.end2 {
                    self.state = State::SawClose2;
                } else {
                    // abandoned, not retried, same as SawOpen1
                    let mark = self.mark.clone();
                    down.braces(BracesToken::Character(d.end1), &mark)?;
                    down.braces(BracesToken::Character(c), position)?;
                    self.state = State::Inside;
                }
            }
            State::SawClose2 => {
                let mark = self.mark.clone();
                if c == Delimiters::end3() {
                    down.braces(BracesToken::ThreeClose, &mark)?;
                    self.state = State::Outside;
                } else {
                    down.braces(BracesToken::TwoClose, &mark)?;
                    // TwoClose may have just installed new delimiters through
                    // the recognizer; this character must be matched against
                    // the fresh pair.
                    self.state = State::Outside;
                    self.feed(c, position, down)?;
                }
            }
        }
        Ok(())
    }

    /// Flushes any partial delimiter match and emits `EndOfInput`
    pub fn finish(&mut self, position: &Position, down: &mut impl BracesSink) -> Result<()> {
        let d = self.delimiters.current();
        let mark = self.mark.clone();
        match self.state {
            State::Outside | State::Inside => {}
            State::SawOpen1 => down.braces(BracesToken::Character(d.start1), &mark)?,
            State::SawOpen2 => down.braces(BracesToken::TwoOpen, &mark)?,
            State::SawClose1 => down.braces(BracesToken::Character(d.end1), &mark)?,
            State::SawClose2 => down.braces(BracesToken::TwoClose, &mark)?,
        }
        self.state = State::Outside;
        down.braces(BracesToken::EndOfInput, position)
    }
}
