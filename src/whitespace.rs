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

//! Standalone-line whitespace normalization
//!
//! A line holding nothing but whitespace and exactly one structural tag (a
//! section begin/end, partial, comment or delimiter change) is "standalone":
//! Mustache elides its surrounding whitespace and line terminator so that
//! control tags do not leak blank lines into the output. Lines containing a
//! variable tag, or more than one structural tag, are left untouched.
//!
//! For partial and parent tags the elided leading whitespace is not dropped
//! outright; it is kept as the tag's indentation, which the resolver later
//! prefixes onto every line of the included template.

use tracing::trace;

use crate::position::Positioned;
use crate::token::MustacheToken;

/// A semantic token plus the indentation captured when its standalone line
/// was elided
#[derive(Debug, Clone)]
pub struct NormalizedToken {
    pub token: Positioned<MustacheToken>,
    /// Leading whitespace of the standalone line, kept only for partial and
    /// parent tags
    pub indent: Option<String>,
}

impl NormalizedToken {
    fn plain(token: Positioned<MustacheToken>) -> Self {
        Self {
            token,
            indent: None,
        }
    }
}

/// Applies standalone-line elision to a token stream
///
/// Tokens are buffered one physical line at a time; a line is processed when
/// its newline (or the end-of-file marker) arrives.
pub fn normalize(tokens: Vec<Positioned<MustacheToken>>) -> Vec<NormalizedToken> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut line: Vec<Positioned<MustacheToken>> = Vec::new();
    for token in tokens {
        if token.token.is_newline_or_eof() {
            flush_line(&mut out, std::mem::take(&mut line), token);
        } else {
            line.push(token);
        }
    }
    // a terminator always arrives, but tolerate a truncated stream
    for t in line {
        out.push(NormalizedToken::plain(t));
    }
    out
}

/// Emits one buffered line, eliding it if standalone
fn flush_line(
    out: &mut Vec<NormalizedToken>,
    line: Vec<Positioned<MustacheToken>>,
    terminator: Positioned<MustacheToken>,
) {
    if let Some(at) = standalone_index(&line) {
        trace!(position = %line[at].position, "standalone line elided");
        let indent = line[..at]
            .iter()
            .map(|t| match &t.token {
                MustacheToken::Text(s) => s.as_str(),
                _ => "",
            })
            .collect::<String>();
        let mut structural = NormalizedToken::plain(line.into_iter().nth(at).unwrap());
        if structural.token.token.is_indented() {
            structural.indent = Some(indent);
        }
        out.push(structural);
        if terminator.token.is_eof() {
            out.push(NormalizedToken::plain(terminator));
        }
        return;
    }
    for t in line {
        out.push(NormalizedToken::plain(t));
    }
    out.push(NormalizedToken::plain(terminator));
}

/// Index of the single structural token on a standalone line, if any
fn standalone_index(line: &[Positioned<MustacheToken>]) -> Option<usize> {
    let mut found = None;
    for (i, t) in line.iter().enumerate() {
        if t.token.is_standalone() {
            if found.is_some() {
                return None;
            }
            found = Some(i);
        } else if !t.token.is_whitespace_text() {
            return None;
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::token::MustacheTagKind;
    use crate::tokenizer::tokenize;

    fn normalized(source: &str) -> Vec<(MustacheToken, Option<String>)> {
        normalize(tokenize("t.mustache", source).unwrap())
            .into_iter()
            .map(|n| (n.token.token, n.indent))
            .collect()
    }

    /// Reconstructs source from a normalized stream, ignoring indentation
    fn raw(source: &str) -> String {
        let mut s = String::new();
        for (token, _) in normalized(source) {
            token.append_raw(&mut s);
        }
        s
    }

    #[test]
    fn standalone_section_lines_vanish() {
        assert_eq!(raw("a\n{{#s}}\nb\n{{/s}}\nc\n"), "a\n{{#s}}b\n{{/s}}c\n");
    }

    #[test]
    fn indented_standalone_lines_vanish_too() {
        assert_eq!(raw("a\n  {{#s}}  \nb\n"), "a\n{{#s}}b\n");
    }

    #[test]
    fn standalone_comment_line_vanishes() {
        assert_eq!(raw("a\n  {{! note }}\nb\n"), "a\n{{! note }}b\n");
    }

    #[test]
    fn standalone_delimiter_change_vanishes() {
        assert_eq!(raw("a\n{{=| |=}}\n|x|\n"), "a\n{{=| |=}}{{x}}\n");
    }

    #[test]
    fn variable_lines_are_untouched() {
        assert_eq!(raw("  {{v}}  \n"), "  {{v}}  \n");
    }

    #[test]
    fn two_tags_on_one_line_are_untouched() {
        assert_eq!(raw("{{#a}}{{/a}}\n"), "{{#a}}{{/a}}\n");
    }

    #[test]
    fn tag_with_surrounding_text_is_untouched() {
        assert_eq!(raw("x {{#s}}\n"), "x {{#s}}\n");
    }

    #[test]
    fn standalone_line_at_end_of_file_keeps_eof() {
        let tokens = normalized("a\n{{/s}}");
        assert_eq!(
            tokens.last().map(|(t, _)| t.clone()),
            Some(MustacheToken::EndOfFile)
        );
        assert_eq!(raw("a\n{{/s}}"), "a\n{{/s}}");
    }

    #[test]
    fn crlf_terminators_are_elided_with_the_line() {
        assert_eq!(raw("a\r\n{{#s}}\r\nb\r\n"), "a\r\n{{#s}}b\r\n");
    }

    #[test]
    fn partial_keeps_its_indentation() {
        let tokens = normalized("  {{>p}}\n");
        assert_eq!(
            tokens,
            vec![(
                MustacheToken::Tag(MustacheTagKind::Partial, "p".into()),
                Some("  ".into()),
            )]
        );
    }

    #[test]
    fn parent_keeps_its_indentation() {
        let tokens = normalized("\t{{<base}}\n{{/base}}\n");
        assert_eq!(
            tokens[0],
            (
                MustacheToken::Tag(MustacheTagKind::BeginParentSection, "base".into()),
                Some("\t".into()),
            )
        );
        assert_eq!(
            tokens[1],
            (
                MustacheToken::Tag(MustacheTagKind::EndSection, "base".into()),
                None,
            )
        );
    }

    #[test]
    fn inline_partial_has_no_indent() {
        let tokens = normalized("x{{>p}}y\n");
        assert_eq!(
            tokens[1],
            (MustacheToken::Tag(MustacheTagKind::Partial, "p".into()), None)
        );
    }
}
