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

//! Partial and template-inheritance resolution
//!
//! Flattens a template and everything it includes into one token stream.
//! Partials (`{{>name}}`) are loaded through a [`TemplateLoader`] and spliced
//! in place, with the partial's captured indentation prefixed onto every
//! non-empty line. Parent sections (`{{<name}}...{{/name}}`) additionally
//! collect block overrides (`{{$block}}...{{/block}}`) from their body and
//! substitute them into the parent's blocks; when the same block is
//! overridden at several levels of a parent chain, the outermost override
//! wins.
//!
//! Inclusion is tracked on a stack so that a template including itself,
//! directly or through intermediaries, is reported as a cycle instead of
//! recursing forever.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{ParseError, Result};
use crate::position::{Position, Positioned};
use crate::token::{MustacheTagKind, MustacheToken};
use crate::tokenizer::tokenize;
use crate::whitespace::{NormalizedToken, normalize};

/// Source of template text for partials and parents
pub trait TemplateLoader {
    /// Loads the source of the template registered under `name`
    fn load(&self, name: &str) -> io::Result<String>;
}

/// An in-memory loader backed by a name-to-source map
#[derive(Debug, Default)]
pub struct MapLoader {
    templates: HashMap<String, String>,
}

impl MapLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(name.into(), source.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapLoader {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            templates: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl TemplateLoader for MapLoader {
    fn load(&self, name: &str) -> io::Result<String> {
        self.templates.get(name).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no template \"{name}\""))
        })
    }
}

/// Loads templates as files relative to a root directory
#[derive(Debug)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TemplateLoader for DirectoryLoader {
    fn load(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.root.join(name))
    }
}

/// Block overrides collected from a parent section's body, keyed by block
/// name
type BlockOverrides = HashMap<String, Vec<NormalizedToken>>;

/// Loads, tokenizes, normalizes and fully resolves the named template
///
/// The returned stream contains no partial or parent tags, and captured
/// indentation has already been applied as text; block-section markers
/// survive only where no override replaced them.
pub fn parse(
    loader: &dyn TemplateLoader,
    name: &str,
) -> Result<Vec<Positioned<MustacheToken>>> {
    let source = loader
        .load(name)
        .map_err(|source| ParseError::TemplateNotFound {
            position: Position::none(),
            name: name.to_string(),
            source,
        })?;
    parse_source(loader, name, &source)
}

/// Like [`parse`] but with the root template's source supplied directly
pub fn parse_source(
    loader: &dyn TemplateLoader,
    name: &str,
    source: &str,
) -> Result<Vec<Positioned<MustacheToken>>> {
    let mut resolver = Resolver {
        loader,
        stack: vec![name.to_string()],
    };
    let items = normalize(tokenize(name, source)?);
    let resolved = resolver.resolve_items(items, &BlockOverrides::new())?;
    Ok(resolved.into_iter().map(|n| n.token).collect())
}

struct Resolver<'a> {
    loader: &'a dyn TemplateLoader,
    /// Names of templates currently being expanded, root first
    stack: Vec<String>,
}

impl Resolver<'_> {
    fn resolve_items(
        &mut self,
        items: Vec<NormalizedToken>,
        overrides: &BlockOverrides,
    ) -> Result<Vec<NormalizedToken>> {
        let mut out = Vec::with_capacity(items.len());
        let mut i = 0;
        while i < items.len() {
            let item = &items[i];
            match &item.token.token {
                MustacheToken::Tag(MustacheTagKind::Partial, name) => {
                    let name = name.clone();
                    let indent = item.indent.clone();
                    let position = item.token.position.clone();
                    let sub = self.expand(&name, &position, &BlockOverrides::new())?;
                    splice(&mut out, sub, indent.as_deref());
                    i += 1;
                }
                MustacheToken::Tag(MustacheTagKind::BeginParentSection, name) => {
                    let name = name.clone();
                    let indent = item.indent.clone();
                    let position = item.token.position.clone();
                    let (local, consumed) =
                        collect_overrides(&items[i + 1..], &name, &position)?;
                    // overrides from further out take precedence
                    let mut merged = local;
                    for (block, body) in overrides {
                        merged.insert(block.clone(), body.clone());
                    }
                    let sub = self.expand(&name, &position, &merged)?;
                    splice(&mut out, sub, indent.as_deref());
                    i += 1 + consumed;
                }
                MustacheToken::Tag(MustacheTagKind::BeginBlockSection, name) => {
                    if let Some(body) = overrides.get(name) {
                        debug!(block = %name, "block overridden");
                        let body = body.clone();
                        out.extend(self.resolve_items(body, &BlockOverrides::new())?);
                        let consumed =
                            skip_section(&items[i + 1..], name, &item.token.position)?;
                        i += 1 + consumed;
                    } else {
                        out.push(item.clone());
                        i += 1;
                    }
                }
                _ => {
                    out.push(item.clone());
                    i += 1;
                }
            }
        }
        Ok(out)
    }

    /// Loads and resolves an included template, guarding against cycles
    ///
    /// The included template's end-of-file marker is dropped; only the root
    /// template terminates the final stream.
    fn expand(
        &mut self,
        name: &str,
        position: &Position,
        overrides: &BlockOverrides,
    ) -> Result<Vec<NormalizedToken>> {
        if self.stack.iter().any(|n| n == name) {
            return Err(ParseError::CyclicTemplate {
                position: position.clone(),
                name: name.to_string(),
                chain: format!("{} -> {name}", self.stack.join(" -> ")),
            });
        }
        let source = self
            .loader
            .load(name)
            .map_err(|source| ParseError::TemplateNotFound {
                position: position.clone(),
                name: name.to_string(),
                source,
            })?;
        debug!(template = %name, depth = self.stack.len(), "expanding");
        self.stack.push(name.to_string());
        let items = normalize(tokenize(name, &source)?);
        let mut sub = self.resolve_items(items, overrides)?;
        self.stack.pop();
        if sub.last().is_some_and(|t| t.token.token.is_eof()) {
            sub.pop();
        }
        Ok(sub)
    }
}

/// Appends an expanded template, prefixing `indent` onto each non-empty line
fn splice(out: &mut Vec<NormalizedToken>, sub: Vec<NormalizedToken>, indent: Option<&str>) {
    let indent = match indent {
        Some(s) if !s.is_empty() => s,
        _ => {
            out.extend(sub);
            return;
        }
    };
    let mut at_line_start = true;
    for item in sub {
        if at_line_start && !item.token.token.is_newline_or_eof() {
            out.push(NormalizedToken {
                token: Positioned::new(
                    item.token.position.clone(),
                    MustacheToken::Text(indent.to_string()),
                ),
                indent: None,
            });
        }
        at_line_start = item.token.token.is_newline();
        out.push(item);
    }
}

/// Error for an end tag that does not match the innermost open section
fn end_mismatch(position: &Position, found: &str, expected: Option<&str>) -> ParseError {
    let message = match expected {
        Some(expected) => {
            format!("unexpected end section \"{found}\", expected \"{expected}\"")
        }
        None => format!("unexpected end section \"{found}\""),
    };
    ParseError::syntax(position, message)
}

/// Collects block overrides from a parent section's body
///
/// Returns the overrides and the number of items consumed, including the
/// parent's end tag. Content directly inside the parent body but outside any
/// block is discarded.
fn collect_overrides(
    items: &[NormalizedToken],
    parent: &str,
    position: &Position,
) -> Result<(BlockOverrides, usize)> {
    let mut overrides = BlockOverrides::new();
    let mut open: Vec<String> = vec![parent.to_string()];
    let mut capture: Option<(String, usize)> = None;
    for (idx, item) in items.iter().enumerate() {
        match &item.token.token {
            MustacheToken::Tag(kind, name) if kind.is_begin_section() => {
                if open.len() == 1 && *kind == MustacheTagKind::BeginBlockSection {
                    capture = Some((name.clone(), idx + 1));
                }
                open.push(name.clone());
            }
            MustacheToken::Tag(MustacheTagKind::EndSection, name) => {
                match open.pop() {
                    Some(expected) if expected == *name => {}
                    expected => {
                        return Err(end_mismatch(&item.token.position, name, expected.as_deref()));
                    }
                }
                if open.is_empty() {
                    return Ok((overrides, idx + 1));
                }
                if open.len() == 1
                    && let Some((block, start)) = capture.take()
                {
                    if overrides
                        .insert(block.clone(), items[start..idx].to_vec())
                        .is_some()
                    {
                        return Err(ParseError::syntax(
                            &item.token.position,
                            format!("duplicate block \"{block}\""),
                        ));
                    }
                }
            }
            _ => {}
        }
    }
    Err(ParseError::syntax(
        position,
        format!("parent section \"{parent}\" never closed"),
    ))
}

/// Skips past the end tag matching an already-consumed block begin tag
///
/// Returns the number of items consumed, including the end tag.
fn skip_section(items: &[NormalizedToken], name: &str, position: &Position) -> Result<usize> {
    let mut open: Vec<&str> = vec![name];
    for (idx, item) in items.iter().enumerate() {
        match &item.token.token {
            MustacheToken::Tag(kind, inner) if kind.is_begin_section() => {
                open.push(inner);
            }
            MustacheToken::Tag(MustacheTagKind::EndSection, inner) => {
                match open.pop() {
                    Some(expected) if expected == inner.as_str() => {}
                    expected => {
                        return Err(end_mismatch(&item.token.position, inner, expected));
                    }
                }
                if open.is_empty() {
                    return Ok(idx + 1);
                }
            }
            _ => {}
        }
    }
    Err(ParseError::syntax(
        position,
        format!("block section \"{name}\" never closed"),
    ))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn loader(templates: &[(&str, &str)]) -> MapLoader {
        templates.iter().copied().collect()
    }

    fn render_raw(loader: &MapLoader, name: &str) -> String {
        let mut s = String::new();
        for item in parse(loader, name).unwrap() {
            item.token.append_raw(&mut s);
        }
        s
    }

    fn parse_err(loader: &MapLoader, name: &str) -> ParseError {
        parse(loader, name).unwrap_err()
    }

    #[test]
    fn inline_partial_is_spliced_in_place() {
        let l = loader(&[("main", "x{{>p}}y"), ("p", "P")]);
        assert_eq!(render_raw(&l, "main"), "xPy");
    }

    #[test]
    fn standalone_partial_reproduces_indentation() {
        let l = loader(&[
            ("main", " |\n  {{>p}}\n |\n"),
            ("p", "a\nb\n\nc\n"),
        ]);
        assert_eq!(render_raw(&l, "main"), " |\n  a\n  b\n\n  c\n |\n");
    }

    #[test]
    fn nested_partial_indentation_composes() {
        let l = loader(&[
            ("main", "  {{>outer}}\n"),
            ("outer", "o\n {{>inner}}\n"),
            ("inner", "i\n"),
        ]);
        assert_eq!(render_raw(&l, "main"), "  o\n   i\n");
    }

    #[test]
    fn block_default_survives_without_override() {
        let l = loader(&[("main", "1{{$b}}d{{/b}}9")]);
        assert_eq!(render_raw(&l, "main"), "1{{$b}}d{{/b}}9");
    }

    #[test]
    fn parent_block_is_overridden() {
        let l = loader(&[
            ("child", "{{<base}}{{$b}}R{{/b}}{{/base}}"),
            ("base", "1{{$b}}d{{/b}}9"),
        ]);
        assert_eq!(render_raw(&l, "child"), "1R9");
    }

    #[test]
    fn parent_block_without_override_keeps_default() {
        let l = loader(&[
            ("child", "{{<base}}{{/base}}"),
            ("base", "1{{$b}}d{{/b}}9"),
        ]);
        assert_eq!(render_raw(&l, "child"), "1{{$b}}d{{/b}}9");
    }

    #[test]
    fn outermost_override_wins_across_levels() {
        let l = loader(&[
            ("leaf", "{{<mid}}{{$b}}R{{/b}}{{/mid}}"),
            ("mid", "{{<base}}{{$b}}m{{/b}}{{/base}}"),
            ("base", "1{{$b}}d{{/b}}9"),
        ]);
        assert_eq!(render_raw(&l, "leaf"), "1R9");
    }

    #[test]
    fn override_body_may_use_partials() {
        let l = loader(&[
            ("child", "{{<base}}{{$b}}[{{>p}}]{{/b}}{{/base}}"),
            ("base", "{{$b}}d{{/b}}"),
            ("p", "P"),
        ]);
        assert_eq!(render_raw(&l, "child"), "[P]");
    }

    #[test]
    fn text_between_blocks_in_parent_body_is_discarded() {
        let l = loader(&[
            ("child", "{{<base}} ignored {{$b}}R{{/b}} also {{/base}}"),
            ("base", "<{{$b}}d{{/b}}>"),
        ]);
        assert_eq!(render_raw(&l, "child"), "<R>");
    }

    #[test]
    fn missing_partial_is_reported_with_call_site() {
        let l = loader(&[("main", "a\n{{>nope}}")]);
        let err = parse_err(&l, "main");
        assert!(matches!(err, ParseError::TemplateNotFound { .. }));
        assert_eq!(err.to_string(), "main:2:1: template \"nope\" not found");
    }

    #[test]
    fn direct_cycle_is_detected() {
        let l = loader(&[("a", "{{>a}}")]);
        let err = parse_err(&l, "a").to_string();
        assert!(err.contains("cyclic template inclusion: a -> a"));
    }

    #[test]
    fn indirect_cycle_reports_the_chain() {
        let l = loader(&[("a", "{{>b}}"), ("b", "{{>c}}"), ("c", "{{>a}}")]);
        let err = parse_err(&l, "a").to_string();
        assert!(err.contains("a -> b -> c -> a"));
    }

    #[test]
    fn repeated_inclusion_is_not_a_cycle() {
        let l = loader(&[("main", "{{>p}}{{>p}}"), ("p", "P")]);
        assert_eq!(render_raw(&l, "main"), "PP");
    }

    #[test]
    fn duplicate_block_is_rejected() {
        let l = loader(&[
            ("child", "{{<base}}{{$b}}1{{/b}}{{$b}}2{{/b}}{{/base}}"),
            ("base", "{{$b}}d{{/b}}"),
        ]);
        assert!(
            parse_err(&l, "child")
                .to_string()
                .contains("duplicate block \"b\"")
        );
    }

    #[test]
    fn mismatched_end_in_parent_body_is_rejected() {
        let l = loader(&[
            ("child", "{{<base}}{{$b}}x{{/other}}{{/base}}"),
            ("base", ""),
        ]);
        assert!(
            parse_err(&l, "child")
                .to_string()
                .contains("unexpected end section \"other\", expected \"b\"")
        );
    }

    #[test]
    fn mismatched_end_in_skipped_default_body_is_rejected() {
        let l = loader(&[
            ("child", "{{<base}}{{$b}}R{{/b}}{{/base}}"),
            ("base", "{{$b}}{{#s}}x{{/t}}{{/b}}"),
        ]);
        assert!(
            parse_err(&l, "child")
                .to_string()
                .contains("unexpected end section \"t\", expected \"s\"")
        );
    }

    #[test]
    fn unclosed_parent_is_rejected() {
        let l = loader(&[("child", "{{<base}}{{$b}}x{{/b}}"), ("base", "")]);
        assert!(
            parse_err(&l, "child")
                .to_string()
                .contains("parent section \"base\" never closed")
        );
    }

    #[test]
    fn missing_root_template_is_reported() {
        let l = loader(&[]);
        assert!(matches!(
            parse_err(&l, "absent"),
            ParseError::TemplateNotFound { .. }
        ));
    }
}
