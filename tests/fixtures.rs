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

//! End-to-end fixtures exercising the whole pipeline through the public API.

use std::convert::Infallible;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

use dry_mustache::{
    MapLoader, NewlineKind, Position, SpecialChar, Visitor, normalize, parse, tokenize, visit,
};

fn reconstruct(source: &str) -> String {
    let mut out = String::new();
    for item in tokenize("fixture.mustache", source).unwrap() {
        item.token.append_raw(&mut out);
    }
    out
}

fn normalized_raw(source: &str) -> String {
    let mut out = String::new();
    for item in normalize(tokenize("fixture.mustache", source).unwrap()) {
        item.token.token.append_raw(&mut out);
    }
    out
}

fn resolved_raw(templates: &[(&str, &str)], root: &str) -> String {
    let loader: MapLoader = templates.iter().copied().collect();
    let mut out = String::new();
    for item in parse(&loader, root).unwrap() {
        item.token.append_raw(&mut out);
    }
    out
}

#[rstest]
#[case::section_line("a\n{{#s}}\nb\n{{/s}}\n", "a\n{{#s}}b\n{{/s}}")]
#[case::indented_section("a\n   {{#s}}\nb\n{{/s}}\n", "a\n{{#s}}b\n{{/s}}")]
#[case::comment_line("a\n{{! hi }}\nb\n", "a\n{{! hi }}b\n")]
#[case::delimiter_line("a\n{{=| |=}}\nb\n", "a\n{{=| |=}}b\n")]
#[case::variable_line_untouched("a\n{{v}}\nb\n", "a\n{{v}}\nb\n")]
#[case::crowded_line_untouched("{{#s}} {{/s}}\n", "{{#s}} {{/s}}\n")]
fn standalone_lines(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(normalized_raw(source), expected);
}

#[test]
fn inheritance_with_partials_and_indentation() {
    let raw = resolved_raw(
        &[
            (
                "page",
                "{{<layout}}\n{{$title}}Home{{/title}}\n{{$body}}\n  {{>widget}}\n{{/body}}\n{{/layout}}\n",
            ),
            (
                "layout",
                "<title>{{$title}}Untitled{{/title}}</title>\n<main>\n{{$body}}{{/body}}</main>\n",
            ),
            ("widget", "w1\nw2\n"),
        ],
        "page",
    );
    assert_eq!(raw, "<title>Home</title>\n<main>\n  w1\n  w2\n</main>\n");
}

#[test]
fn delimiter_change_survives_into_partials_independently() {
    // a change in one template never leaks into another
    let raw = resolved_raw(
        &[
            ("main", "{{=| |=}}|>p|{{q}}"),
            ("p", "{{v}}"),
        ],
        "main",
    );
    assert_eq!(raw, "{{=| |=}}{{v}}{{q}}");
}

#[derive(Default)]
struct Events(Vec<String>);

impl Visitor for Events {
    type Error = Infallible;

    fn begin_section(&mut self, name: &str, _: &Position) -> Result<(), Infallible> {
        self.0.push(format!("begin {name}"));
        Ok(())
    }

    fn begin_inverted_section(&mut self, name: &str, _: &Position) -> Result<(), Infallible> {
        self.0.push(format!("begin-inverted {name}"));
        Ok(())
    }

    fn begin_parent_section(&mut self, name: &str, _: &Position) -> Result<(), Infallible> {
        self.0.push(format!("begin-parent {name}"));
        Ok(())
    }

    fn begin_block_section(&mut self, name: &str, _: &Position) -> Result<(), Infallible> {
        self.0.push(format!("begin-block {name}"));
        Ok(())
    }

    fn end_section(&mut self, name: &str, _: &Position) -> Result<(), Infallible> {
        self.0.push(format!("end {name}"));
        Ok(())
    }

    fn partial(&mut self, name: &str, _: &Position) -> Result<(), Infallible> {
        self.0.push(format!("partial {name}"));
        Ok(())
    }

    fn variable(&mut self, name: &str, _: &Position) -> Result<(), Infallible> {
        self.0.push(format!("var {name}"));
        Ok(())
    }

    fn unescaped_variable(&mut self, name: &str, _: &Position) -> Result<(), Infallible> {
        self.0.push(format!("raw {name}"));
        Ok(())
    }

    fn text(&mut self, text: &str, _: &Position) -> Result<(), Infallible> {
        self.0.push(format!("text {text}"));
        Ok(())
    }

    fn comment(&mut self, _: &str, _: &Position) -> Result<(), Infallible> {
        self.0.push("comment".to_string());
        Ok(())
    }

    fn newline(&mut self, _: NewlineKind, _: &Position) -> Result<(), Infallible> {
        self.0.push("newline".to_string());
        Ok(())
    }

    fn special_character(&mut self, c: SpecialChar, _: &Position) -> Result<(), Infallible> {
        self.0.push(format!("special {}", c.character()));
        Ok(())
    }

    fn end_of_file(&mut self, _: &Position) -> Result<(), Infallible> {
        self.0.push("eof".to_string());
        Ok(())
    }
}

#[test]
fn visitor_sees_resolved_stream_in_order() {
    let loader: MapLoader = [
        ("main", "Hi {{name}}!\n{{#items}}\n{{{value}}}{{&other}}\n{{/items}}\n{{>tail}}\n"),
        ("tail", "bye \"all\"\n"),
    ]
    .into_iter()
    .collect();
    let tokens = parse(&loader, "main").unwrap();
    let mut events = Events::default();
    visit(&tokens, &mut events).unwrap();
    assert_eq!(
        events.0,
        vec![
            "text Hi ",
            "var name",
            "text !",
            "newline",
            "begin items",
            "raw value",
            "raw other",
            "newline",
            "end items",
            "text bye ",
            "special \"",
            "text all",
            "special \"",
            "newline",
            "eof",
        ]
    );
}

proptest! {
    /// Tokenizing splits text, newlines and specials apart but never loses a
    /// character, so any tag-free template reconstructs exactly.
    #[test]
    fn tag_free_templates_round_trip(source in "[^{]{0,64}") {
        prop_assert_eq!(reconstruct(&source), source);
    }

    /// Standalone elision never touches lines without structural tags.
    #[test]
    fn normalization_is_identity_without_tags(source in "[^{}]{0,64}") {
        prop_assert_eq!(normalized_raw(&source), source.clone());
    }
}
