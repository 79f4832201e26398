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

//! The tag recognizer
//!
//! Consumes the braces lexer's event stream and produces semantic
//! [`MustacheToken`]s. The first non-whitespace character after an opening
//! delimiter is the sigil; it selects the tag kind and is consumed, never
//! treated as part of the name. Brace arity is enforced here: a tag opened
//! with three braces must close with three, and vice versa.
//!
//! Comment bodies are captured verbatim, ending at the first closing
//! delimiter; there is no nested-brace awareness. A delimiter-change tag is
//! applied to the shared [`DelimiterRegistry`] the moment its closing
//! delimiter is seen, and a [`MustacheToken::DelimitersChange`] record is
//! emitted so the raw text can still be reconstructed downstream.

use std::mem;

use tracing::trace;

use crate::braces::{BracesLexer, BracesSink, BracesToken};
use crate::delimiters::{DelimiterRegistry, Delimiters};
use crate::error::{ParseError, Result};
use crate::position::{Position, Positioned, SourceCursor};
use crate::token::{MustacheTagKind, MustacheToken, NewlineKind, SpecialChar};

/// Consumer of the semantic token stream
pub trait TokenSink {
    fn token(&mut self, token: Positioned<MustacheToken>) -> Result<()>;
}

impl TokenSink for Vec<Positioned<MustacheToken>> {
    fn token(&mut self, token: Positioned<MustacheToken>) -> Result<()> {
        self.push(token);
        Ok(())
    }
}

#[derive(Debug)]
enum State {
    /// In plain text between tags
    Outside { text: String, pending_cr: bool },
    /// Just saw the opening delimiter; waiting for the sigil
    Start,
    /// Sigil seen; skipping whitespace before the name
    BeforeIdentifier { kind: MustacheTagKind },
    /// Accumulating the tag name
    Identifier { kind: MustacheTagKind, name: String },
    /// Name complete; only whitespace may precede the closing delimiter
    AfterIdentifier { kind: MustacheTagKind, name: String },
    /// Inside a comment body
    Comment { text: String },
    /// Inside a delimiter-change tag
    DelimiterChange { content: String, closing: bool },
}

impl State {
    fn outside() -> Self {
        Self::Outside {
            text: String::new(),
            pending_cr: false,
        }
    }
}

/// Turns braces events into semantic tokens
///
/// Plug one of these into a [`BracesLexer`] as its sink; recognized tokens
/// flow on to the supplied [`TokenSink`].
pub struct MustacheTokenizer<'a, S> {
    delimiters: DelimiterRegistry,
    state: State,
    position: Position,
    /// Position of the opening delimiter of the tag being recognized; tag
    /// tokens are reported here
    tag_start: Position,
    down: &'a mut S,
}

impl<'a, S: TokenSink> MustacheTokenizer<'a, S> {
    pub fn new(delimiters: DelimiterRegistry, down: &'a mut S) -> Self {
        Self {
            delimiters,
            state: State::outside(),
            position: Position::none(),
            tag_start: Position::none(),
            down,
        }
    }

    fn emit(&mut self, token: MustacheToken) -> Result<()> {
        trace!(position = %self.position, ?token, "token");
        self.down
            .token(Positioned::new(self.position.clone(), token))
    }

    fn emit_at_tag_start(&mut self, token: MustacheToken) -> Result<()> {
        trace!(position = %self.tag_start, ?token, "token");
        self.down
            .token(Positioned::new(self.tag_start.clone(), token))
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::syntax(&self.position, message)
    }

    /// Handles a plain character while between tags
    fn outside_char(&mut self, c: char, mut text: String, pending_cr: bool) -> Result<()> {
        if pending_cr && c != '\n' {
            text.push('\r');
        }
        match c {
            '\r' => {
                self.state = State::Outside {
                    text,
                    pending_cr: true,
                };
            }
            '\n' => {
                let kind = if pending_cr {
                    NewlineKind::Crlf
                } else {
                    NewlineKind::Lf
                };
                self.flush_text(text)?;
                self.emit(MustacheToken::Newline(kind))?;
                self.state = State::outside();
            }
            '"' | '\\' => {
                let special = if c == '"' {
                    SpecialChar::QuotationMark
                } else {
                    SpecialChar::Backslash
                };
                self.flush_text(text)?;
                self.emit(MustacheToken::Special(special))?;
                self.state = State::outside();
            }
            _ => {
                text.push(c);
                self.state = State::Outside {
                    text,
                    pending_cr: false,
                };
            }
        }
        Ok(())
    }

    fn flush_text(&mut self, text: String) -> Result<()> {
        if !text.is_empty() {
            self.emit(MustacheToken::Text(text))?;
        }
        Ok(())
    }

    /// Flushes any buffered plain text, including a trailing bare `\r`
    fn leave_outside(&mut self, mut text: String, pending_cr: bool) -> Result<()> {
        if pending_cr {
            text.push('\r');
        }
        self.flush_text(text)
    }

    /// Dispatches the sigil character just after an opening delimiter
    fn start_char(&mut self, c: char) -> Result<()> {
        if c.is_whitespace() {
            self.state = State::Start;
            return Ok(());
        }
        self.state = match c {
            '#' => State::BeforeIdentifier {
                kind: MustacheTagKind::BeginSection,
            },
            '^' => State::BeforeIdentifier {
                kind: MustacheTagKind::BeginInvertedSection,
            },
            '/' => State::BeforeIdentifier {
                kind: MustacheTagKind::EndSection,
            },
            '>' => State::BeforeIdentifier {
                kind: MustacheTagKind::Partial,
            },
            '<' => State::BeforeIdentifier {
                kind: MustacheTagKind::BeginParentSection,
            },
            '$' => State::BeforeIdentifier {
                kind: MustacheTagKind::BeginBlockSection,
            },
            '&' => State::BeforeIdentifier {
                kind: MustacheTagKind::UnescapedVariableTwoBraces,
            },
            '!' => State::Comment {
                text: String::new(),
            },
            '=' => State::DelimiterChange {
                content: String::new(),
                closing: false,
            },
            _ => State::Identifier {
                kind: MustacheTagKind::Variable,
                name: c.to_string(),
            },
        };
        Ok(())
    }

    /// Closes an identifier tag, enforcing brace arity
    fn close_tag(&mut self, kind: MustacheTagKind, name: String, three: bool) -> Result<()> {
        let needs_three = kind == MustacheTagKind::UnescapedVariableThreeBraces;
        if needs_three && !three {
            return Err(self.error("expecting three closing braces, not two"));
        }
        if !needs_three && three {
            return Err(self.error("expecting two closing braces, not three"));
        }
        if name.is_empty() {
            return Err(self.error("empty tag name"));
        }
        self.emit_at_tag_start(MustacheToken::Tag(kind, name))?;
        self.state = State::outside();
        Ok(())
    }

    /// Closes a delimiter-change tag, installing the new pair
    fn close_delimiter_change(&mut self, content: String, closing: bool) -> Result<()> {
        if !closing {
            return Err(self.error("delimiter change tag must end with '='"));
        }
        let new = Delimiters::parse(&content).ok_or_else(|| ParseError::InvalidDelimiters {
            position: self.position.clone(),
            content: content.clone(),
        })?;
        let old = self.delimiters.current();
        self.delimiters.set(new);
        trace!(%old, %new, "delimiters changed");
        self.emit_at_tag_start(MustacheToken::DelimitersChange { old, new })?;
        self.state = State::outside();
        Ok(())
    }

    fn eof(&mut self, state: State) -> Result<()> {
        match state {
            State::Outside { text, pending_cr } => {
                self.leave_outside(text, pending_cr)?;
                self.emit(MustacheToken::EndOfFile)
            }
            State::Comment { .. } => Err(self.error("unclosed comment at end of file")),
            State::DelimiterChange { .. } => {
                Err(self.error("unclosed delimiter change tag at end of file"))
            }
            _ => Err(self.error("unclosed tag at end of file")),
        }
    }
}

impl<S: TokenSink> BracesSink for MustacheTokenizer<'_, S> {
    fn braces(&mut self, token: BracesToken, position: &Position) -> Result<()> {
        self.position = position.clone();
        let state = mem::replace(&mut self.state, State::outside());
        match state {
            State::Outside { text, pending_cr } => match token {
                BracesToken::Character(c) => self.outside_char(c, text, pending_cr),
                BracesToken::TwoOpen => {
                    self.leave_outside(text, pending_cr)?;
                    self.tag_start = self.position.clone();
                    self.state = State::Start;
                    Ok(())
                }
                BracesToken::ThreeOpen => {
                    self.leave_outside(text, pending_cr)?;
                    self.tag_start = self.position.clone();
                    self.state = State::BeforeIdentifier {
                        kind: MustacheTagKind::UnescapedVariableThreeBraces,
                    };
                    Ok(())
                }
                BracesToken::EndOfInput => self.eof(State::Outside { text, pending_cr }),
                // the lexer only emits closes while inside a tag
                BracesToken::TwoClose | BracesToken::ThreeClose => {
                    Err(self.error("unexpected closing braces"))
                }
            },
            State::Start => match token {
                BracesToken::Character(c) => {
                    self.start_char(c)?;
                    Ok(())
                }
                BracesToken::TwoClose | BracesToken::ThreeClose => {
                    Err(self.error("empty tag"))
                }
                BracesToken::TwoOpen | BracesToken::ThreeOpen => {
                    Err(self.error("unexpected open braces inside tag"))
                }
                BracesToken::EndOfInput => self.eof(State::Start),
            },
            State::BeforeIdentifier { kind } => match token {
                BracesToken::Character(c) if c.is_whitespace() => {
                    self.state = State::BeforeIdentifier { kind };
                    Ok(())
                }
                BracesToken::Character(c) => {
                    self.state = State::Identifier {
                        kind,
                        name: c.to_string(),
                    };
                    Ok(())
                }
                BracesToken::TwoClose => self.close_tag(kind, String::new(), false),
                BracesToken::ThreeClose => self.close_tag(kind, String::new(), true),
                BracesToken::TwoOpen | BracesToken::ThreeOpen => {
                    Err(self.error("unexpected open braces inside tag"))
                }
                BracesToken::EndOfInput => self.eof(State::BeforeIdentifier { kind }),
            },
            State::Identifier { kind, mut name } => match token {
                BracesToken::Character(c) if c.is_whitespace() => {
                    self.state = State::AfterIdentifier { kind, name };
                    Ok(())
                }
                BracesToken::Character(c) => {
                    name.push(c);
                    self.state = State::Identifier { kind, name };
                    Ok(())
                }
                BracesToken::TwoClose => self.close_tag(kind, name, false),
                BracesToken::ThreeClose => self.close_tag(kind, name, true),
                BracesToken::TwoOpen | BracesToken::ThreeOpen => {
                    Err(self.error("unexpected open braces inside tag"))
                }
                BracesToken::EndOfInput => self.eof(State::Identifier { kind, name }),
            },
            State::AfterIdentifier { kind, name } => match token {
                BracesToken::Character(c) if c.is_whitespace() => {
                    self.state = State::AfterIdentifier { kind, name };
                    Ok(())
                }
                BracesToken::Character(_) => {
                    Err(self.error(format!("unexpected characters after tag name \"{name}\"")))
                }
                BracesToken::TwoClose => self.close_tag(kind, name, false),
                BracesToken::ThreeClose => self.close_tag(kind, name, true),
                BracesToken::TwoOpen | BracesToken::ThreeOpen => {
                    Err(self.error("unexpected open braces inside tag"))
                }
                BracesToken::EndOfInput => self.eof(State::AfterIdentifier { kind, name }),
            },
            State::Comment { mut text } => match token {
                BracesToken::Character(c) => {
                    text.push(c);
                    self.state = State::Comment { text };
                    Ok(())
                }
                BracesToken::TwoOpen | BracesToken::ThreeOpen => {
                    Err(self.error("unexpected open braces inside tag"))
                }
                BracesToken::TwoClose => {
                    let delimiters = self.delimiters.current();
                    self.emit_at_tag_start(MustacheToken::Comment { text, delimiters })?;
                    self.state = State::outside();
                    Ok(())
                }
                BracesToken::ThreeClose => {
                    Err(self.error("expecting two closing braces, not three"))
                }
                BracesToken::EndOfInput => self.eof(State::Comment { text }),
            },
            State::DelimiterChange {
                mut content,
                closing,
            } => match token {
                BracesToken::Character('=') if !closing => {
                    self.state = State::DelimiterChange {
                        content,
                        closing: true,
                    };
                    Ok(())
                }
                BracesToken::Character(c) if closing => {
                    if c.is_whitespace() {
                        self.state = State::DelimiterChange {
                            content,
                            closing: true,
                        };
                        Ok(())
                    } else {
                        Err(self.error("unexpected characters after closing '='"))
                    }
                }
                BracesToken::Character(c) => {
                    content.push(c);
                    self.state = State::DelimiterChange { content, closing };
                    Ok(())
                }
                BracesToken::TwoClose => self.close_delimiter_change(content, closing),
                BracesToken::ThreeClose => {
                    Err(self.error("expecting two closing braces, not three"))
                }
                BracesToken::TwoOpen | BracesToken::ThreeOpen => {
                    Err(self.error("unexpected open braces inside tag"))
                }
                BracesToken::EndOfInput => self.eof(State::DelimiterChange { content, closing }),
            },
        }
    }
}

/// Tokenizes template source into the supplied sink
pub fn tokenize_into(file_name: &str, source: &str, sink: &mut impl TokenSink) -> Result<()> {
    let registry = DelimiterRegistry::new();
    let mut lexer = BracesLexer::new(registry.clone());
    let mut tokenizer = MustacheTokenizer::new(registry, sink);
    let mut cursor = SourceCursor::new(file_name, source);
    for (c, position) in cursor.by_ref() {
        lexer.feed(c, &position, &mut tokenizer)?;
    }
    lexer.finish(&cursor.end_position(), &mut tokenizer)
}

/// Tokenizes template source into a vector
pub fn tokenize(file_name: &str, source: &str) -> Result<Vec<Positioned<MustacheToken>>> {
    let mut tokens = Vec::new();
    tokenize_into(file_name, source, &mut tokens)?;
    Ok(tokens)
}
