//! Built-in trigger highlighter.
//!
//! Wraps every token that starts with a trigger character in
//! `<span class="tag tagN">`, where `N` is the 1-based index of the trigger.
//! Markup from a previous pass is stripped first so the rewrite is idempotent.
//!
//! A token runs from its trigger to the next whitespace, tag, character
//! reference, or another trigger. The caret marker never counts toward the
//! token length. A marker ending a token is moved after the span, so typing
//! on from there leaves the token.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::marker::MARKER;
use crate::trigger::Rewrite;

/// Minimum chars after the trigger for a token to be wrapped.
const MIN_TOKEN_CHARS: usize = 1;

static SPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<span class="tag tag\d+">|<span(?:\s[^>]*)?>|</span>"#).unwrap()
});

/// Highlighting rewrite for a set of trigger characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Highlighter {
    triggers: Vec<char>,
}

impl Highlighter {
    /// Characters that can never start a token are dropped.
    pub fn new(triggers: impl IntoIterator<Item = char>) -> Self {
        let mut kept: Vec<char> = Vec::new();
        for c in triggers {
            if c.is_whitespace() || matches!(c, '<' | '>' | '&' | MARKER) || kept.contains(&c) {
                tracing::debug!(target: "retype::highlight", trigger = ?c, "ignoring trigger");
                continue;
            }
            kept.push(c);
        }
        Self { triggers: kept }
    }

    pub fn triggers(&self) -> &[char] {
        &self.triggers
    }

    /// Highlight `html`, replacing any highlighting from an earlier pass.
    pub fn highlight(&self, html: &str) -> String {
        let stripped = strip_highlighting(html);
        if self.triggers.is_empty() {
            return stripped;
        }
        self.wrap_tokens(&stripped)
    }

    fn trigger_index(&self, c: char) -> Option<usize> {
        self.triggers.iter().position(|&t| t == c)
    }

    fn wrap_tokens(&self, html: &str) -> String {
        let mut out = String::with_capacity(html.len());
        let mut run = Run::default();
        let mut rest = html;

        while let Some(c) = rest.chars().next() {
            match c {
                '<' | '&' => {
                    run.flush(&mut out);
                    let close = if c == '<' { '>' } else { ';' };
                    let end = rest.find(close).map_or(rest.len(), |i| i + 1);
                    out.push_str(&rest[..end]);
                    rest = &rest[end..];
                    continue;
                }
                c if c.is_whitespace() => {
                    run.flush(&mut out);
                    out.push(c);
                }
                c => match self.trigger_index(c) {
                    Some(index) => {
                        run.flush(&mut out);
                        run.start(index, c);
                    }
                    None if run.is_open() => run.push(c),
                    None => out.push(c),
                },
            }
            rest = &rest[c.len_utf8()..];
        }
        run.flush(&mut out);
        out
    }
}

impl Rewrite for Highlighter {
    fn rewrite(&self, content: &str) -> String {
        self.highlight(content)
    }
}

/// A token being collected.
#[derive(Default)]
struct Run {
    trigger: Option<usize>,
    text: String,
    chars: usize,
}

impl Run {
    fn is_open(&self) -> bool {
        self.trigger.is_some()
    }

    fn start(&mut self, trigger: usize, c: char) {
        self.trigger = Some(trigger);
        self.text.push(c);
    }

    fn push(&mut self, c: char) {
        if c != MARKER {
            self.chars += 1;
        }
        self.text.push(c);
    }

    fn flush(&mut self, out: &mut String) {
        let Some(trigger) = self.trigger.take() else {
            return;
        };
        if self.chars >= MIN_TOKEN_CHARS {
            let body = self.text.trim_end_matches(MARKER);
            out.push_str(&format!("<span class=\"tag tag{}\">", trigger + 1));
            out.push_str(body);
            out.push_str("</span>");
            out.push_str(&self.text[body.len()..]);
        } else {
            out.push_str(&self.text);
        }
        self.text.clear();
        self.chars = 0;
    }
}

/// Remove highlighting spans, keeping any other spans and their closing tags.
pub fn strip_highlighting(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut open: Vec<bool> = Vec::new();
    let mut last = 0;

    for m in SPAN_RE.find_iter(html) {
        out.push_str(&html[last..m.start()]);
        last = m.end();
        let tag = m.as_str();
        if tag.starts_with("</") {
            if open.pop() != Some(true) {
                out.push_str(tag);
            }
        } else if is_highlight_tag(tag) {
            open.push(true);
        } else {
            open.push(false);
            out.push_str(tag);
        }
    }
    out.push_str(&html[last..]);
    out
}

fn is_highlight_tag(tag: &str) -> bool {
    let lower = tag.to_ascii_lowercase();
    lower
        .strip_prefix("<span class=\"tag tag")
        .and_then(|rest| rest.strip_suffix("\">"))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}
