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

//! The semantic token stream
//!
//! This is what the front end hands to a backend: text runs, classified tags
//! with their dotted names, comments, delimiter-change records, newline
//! markers, escaped-special-character markers and an end-of-input marker.
//! Backends consume the stream through the [`Visitor`] trait; section
//! begin/end nesting is validated there, not here — this layer only
//! guarantees every begin tag carries a name an end tag can be matched
//! against.

use crate::delimiters::Delimiters;
use crate::position::{Position, Positioned};

/// What kind of tag a sigil selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MustacheTagKind {
    /// `{{name}}`
    Variable,
    /// `{{&name}}`
    UnescapedVariableTwoBraces,
    /// `{{{name}}}`
    UnescapedVariableThreeBraces,
    /// `{{>name}}`
    Partial,
    /// `{{#name}}`
    BeginSection,
    /// `{{/name}}`
    EndSection,
    /// `{{^name}}`
    BeginInvertedSection,
    /// `{{<name}}`
    BeginParentSection,
    /// `{{$name}}`
    BeginBlockSection,
}

impl MustacheTagKind {
    pub fn is_section(self) -> bool {
        !matches!(
            self,
            Self::Variable
                | Self::UnescapedVariableTwoBraces
                | Self::UnescapedVariableThreeBraces
                | Self::Partial
        )
    }

    pub fn is_begin_section(self) -> bool {
        matches!(
            self,
            Self::BeginSection
                | Self::BeginInvertedSection
                | Self::BeginParentSection
                | Self::BeginBlockSection
        )
    }

    pub fn is_end_section(self) -> bool {
        self == Self::EndSection
    }

    /// The sigil character selecting this kind, if it has one
    pub fn sigil(self) -> Option<char> {
        match self {
            Self::Variable | Self::UnescapedVariableThreeBraces => None,
            Self::UnescapedVariableTwoBraces => Some('&'),
            Self::Partial => Some('>'),
            Self::BeginSection => Some('#'),
            Self::EndSection => Some('/'),
            Self::BeginInvertedSection => Some('^'),
            Self::BeginParentSection => Some('<'),
            Self::BeginBlockSection => Some('$'),
        }
    }
}

/// A line terminator as it appeared in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewlineKind {
    Lf,
    Crlf,
}

impl NewlineKind {
    pub fn characters(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
        }
    }
}

/// A character backends must re-escape when generating source code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialChar {
    QuotationMark,
    Backslash,
}

impl SpecialChar {
    pub fn character(self) -> char {
        match self {
            Self::QuotationMark => '"',
            Self::Backslash => '\\',
        }
    }
}

/// One element of the semantic token stream
#[derive(Debug, Clone, PartialEq)]
pub enum MustacheToken {
    /// A run of literal template text
    Text(String),
    /// A classified tag and its trimmed dotted name
    Tag(MustacheTagKind, String),
    /// A comment body, verbatim, with the delimiters active when it was read
    Comment {
        text: String,
        delimiters: Delimiters,
    },
    /// A delimiter redefinition that already took effect upstream
    DelimitersChange { old: Delimiters, new: Delimiters },
    Newline(NewlineKind),
    Special(SpecialChar),
    EndOfFile,
}

impl MustacheToken {
    /// Whether this is a text token containing only whitespace
    ///
    /// Newline tokens are not whitespace for standalone-line purposes.
    pub fn is_whitespace_text(&self) -> bool {
        match self {
            Self::Text(s) => s.chars().all(char::is_whitespace),
            _ => false,
        }
    }

    /// Whether this token may make a line standalone
    ///
    /// Comments, delimiter changes, section tags and partials qualify;
    /// variable tags never do.
    pub fn is_standalone(&self) -> bool {
        match self {
            Self::Comment { .. } | Self::DelimitersChange { .. } => true,
            Self::Tag(kind, _) => kind.is_section() || *kind == MustacheTagKind::Partial,
            _ => false,
        }
    }

    /// Whether this tag captures and reproduces leading indentation
    pub fn is_indented(&self) -> bool {
        matches!(
            self,
            Self::Tag(MustacheTagKind::Partial | MustacheTagKind::BeginParentSection, _)
        )
    }

    pub fn is_newline(&self) -> bool {
        matches!(self, Self::Newline(_))
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, Self::EndOfFile)
    }

    pub fn is_newline_or_eof(&self) -> bool {
        self.is_newline() || self.is_eof()
    }

    /// Reconstructs the source text of this token
    ///
    /// Tags are rendered in default-delimiter form; comments and delimiter
    /// changes use the delimiters recorded when they were read. Useful for
    /// echoing template fragments in backend diagnostics and for round-trip
    /// checks over tag-free templates.
    pub fn append_raw(&self, out: &mut String) {
        match self {
            Self::Text(s) => out.push_str(s),
            Self::Tag(kind, name) => {
                match kind {
                    MustacheTagKind::UnescapedVariableThreeBraces => {
                        out.push_str("{{{");
                        out.push_str(name);
                        out.push_str("}}}");
                        return;
                    }
                    _ => out.push_str("{{"),
                }
                if let Some(sigil) = kind.sigil() {
                    out.push(sigil);
                }
                out.push_str(name);
                out.push_str("}}");
            }
            Self::Comment { text, delimiters } => {
                delimiters.append_start(out);
                out.push('!');
                out.push_str(text);
                delimiters.append_end(out);
            }
            Self::DelimitersChange { old, new } => {
                old.append_start(out);
                out.push('=');
                new.append_start(out);
                out.push(' ');
                new.append_end(out);
                out.push('=');
                old.append_end(out);
            }
            Self::Newline(kind) => out.push_str(kind.characters()),
            Self::Special(c) => out.push(c.character()),
            Self::EndOfFile => {}
        }
    }

    /// Dispatches this token to the matching [`Visitor`] callback
    pub fn accept<V: Visitor>(
        &self,
        position: &Position,
        visitor: &mut V,
    ) -> std::result::Result<(), V::Error> {
        match self {
            Self::Text(s) => visitor.text(s, position),
            Self::Tag(kind, name) => match kind {
                MustacheTagKind::Variable => visitor.variable(name, position),
                MustacheTagKind::UnescapedVariableTwoBraces
                | MustacheTagKind::UnescapedVariableThreeBraces => {
                    visitor.unescaped_variable(name, position)
                }
                MustacheTagKind::Partial => visitor.partial(name, position),
                MustacheTagKind::BeginSection => visitor.begin_section(name, position),
                MustacheTagKind::EndSection => visitor.end_section(name, position),
                MustacheTagKind::BeginInvertedSection => {
                    visitor.begin_inverted_section(name, position)
                }
                MustacheTagKind::BeginParentSection => {
                    visitor.begin_parent_section(name, position)
                }
                MustacheTagKind::BeginBlockSection => visitor.begin_block_section(name, position),
            },
            Self::Comment { text, .. } => visitor.comment(text, position),
            Self::DelimitersChange { old, new } => {
                visitor.delimiters_change(*old, *new, position)
            }
            Self::Newline(kind) => visitor.newline(*kind, position),
            Self::Special(c) => visitor.special_character(*c, position),
            Self::EndOfFile => visitor.end_of_file(position),
        }
    }
}

/// The backend-consumer interface
///
/// One callback per tag kind — both unescaped-variable forms share
/// `unescaped_variable` since backends treat them identically — plus text,
/// comment, newline, special-character and end-of-file callbacks. Backends
/// own section-nesting validation and may generate code or interpret the
/// stream directly.
pub trait Visitor {
    type Error;

    fn begin_section(&mut self, name: &str, position: &Position) -> Result<(), Self::Error>;

    fn begin_inverted_section(
        &mut self,
        name: &str,
        position: &Position,
    ) -> Result<(), Self::Error>;

    fn begin_parent_section(&mut self, name: &str, position: &Position)
    -> Result<(), Self::Error>;

    fn begin_block_section(&mut self, name: &str, position: &Position)
    -> Result<(), Self::Error>;

    fn end_section(&mut self, name: &str, position: &Position) -> Result<(), Self::Error>;

    fn partial(&mut self, name: &str, position: &Position) -> Result<(), Self::Error>;

    fn variable(&mut self, name: &str, position: &Position) -> Result<(), Self::Error>;

    fn unescaped_variable(&mut self, name: &str, position: &Position) -> Result<(), Self::Error>;

    fn text(&mut self, text: &str, position: &Position) -> Result<(), Self::Error>;

    fn comment(&mut self, text: &str, position: &Position) -> Result<(), Self::Error>;

    /// Delimiter changes already took effect upstream; most backends ignore
    /// them.
    fn delimiters_change(
        &mut self,
        _old: Delimiters,
        _new: Delimiters,
        _position: &Position,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    fn newline(&mut self, kind: NewlineKind, position: &Position) -> Result<(), Self::Error>;

    fn special_character(
        &mut self,
        c: SpecialChar,
        position: &Position,
    ) -> Result<(), Self::Error>;

    fn end_of_file(&mut self, position: &Position) -> Result<(), Self::Error>;
}

/// Feeds every token of a stream to a visitor in order
pub fn visit<V: Visitor>(
    tokens: &[Positioned<MustacheToken>],
    visitor: &mut V,
) -> std::result::Result<(), V::Error> {
    for t in tokens {
        t.token.accept(&t.position, visitor)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn raw(token: &MustacheToken) -> String {
        let mut s = String::new();
        token.append_raw(&mut s);
        s
    }

    #[test]
    fn section_classification() {
        use MustacheTagKind::*;
        assert!(BeginSection.is_section());
        assert!(EndSection.is_section());
        assert!(BeginBlockSection.is_begin_section());
        assert!(!Variable.is_section());
        assert!(!Partial.is_section());
        assert!(!UnescapedVariableThreeBraces.is_begin_section());
        assert!(EndSection.is_end_section());
    }

    #[test]
    fn raw_text_reconstruction() {
        assert_eq!(
            raw(&MustacheToken::Tag(
                MustacheTagKind::BeginSection,
                "a.b".into()
            )),
            "{{#a.b}}"
        );
        assert_eq!(
            raw(&MustacheToken::Tag(
                MustacheTagKind::UnescapedVariableThreeBraces,
                "x".into()
            )),
            "{{{x}}}"
        );
        assert_eq!(
            raw(&MustacheToken::Comment {
                text: " note ".into(),
                delimiters: Delimiters::default(),
            }),
            "{{! note }}"
        );
        assert_eq!(raw(&MustacheToken::Newline(NewlineKind::Crlf)), "\r\n");
        assert_eq!(raw(&MustacheToken::Special(SpecialChar::Backslash)), "\\");
    }

    #[test]
    fn standalone_eligibility() {
        assert!(
            MustacheToken::Tag(MustacheTagKind::EndSection, "s".into()).is_standalone()
        );
        assert!(
            MustacheToken::Tag(MustacheTagKind::Partial, "p".into()).is_standalone()
        );
        assert!(
            !MustacheToken::Tag(MustacheTagKind::Variable, "v".into()).is_standalone()
        );
        assert!(
            !MustacheToken::Tag(MustacheTagKind::UnescapedVariableTwoBraces, "v".into())
                .is_standalone()
        );
        assert!(MustacheToken::Text("  \t".into()).is_whitespace_text());
        assert!(!MustacheToken::Text(" x ".into()).is_whitespace_text());
    }
}
