use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Turns raw dialog-agent replies into plain display text.
///
/// Markdown markup is stripped (emphasis, headings, links, inline code),
/// list items become bullets, pipe tables and JSON code blocks are dropped
/// since the flight table is rendered separately.
pub struct ReplyCleaner;

impl ReplyCleaner {
    pub fn new() -> Self {
        Self
    }

    /// Clean a reply for display. Never fails; empty input gives empty output.
    pub fn clean(&self, content: &str) -> String {
        let normalized = self.normalize(content);
        if normalized.trim().is_empty() {
            return String::new();
        }

        let plain = self.strip_markdown(&normalized);
        let without_boilerplate = self.strip_boilerplate(&plain);
        let cleaned = self.normalize(&without_boilerplate);

        debug!(input = content.len(), output = cleaned.len(), "Cleaned reply text");
        cleaned.trim().to_string()
    }

    /// Normalize whitespace without touching markup
    pub fn normalize(&self, content: &str) -> String {
        static BLANK_RUNS: OnceLock<Regex> = OnceLock::new();
        let blank_runs = BLANK_RUNS.get_or_init(|| Regex::new(r"\n{3,}").expect("valid blank-line pattern"));

        // Normalize line endings
        let normalized = content.replace("\r\n", "\n").replace('\r', "\n");

        // Trim trailing whitespace from lines
        let trimmed = normalized
            .lines()
            .map(|line| line.trim_end())
            .collect::<Vec<_>>()
            .join("\n");

        // Fix excessive blank lines
        blank_runs.replace_all(&trimmed, "\n\n").to_string()
    }

    fn strip_markdown(&self, content: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);

        let mut out = String::new();
        let mut in_table = false;
        let mut skip_code = false;
        let mut list_depth: usize = 0;

        for event in Parser::new_ext(content, options) {
            match event {
                Event::Start(Tag::Table(_)) => {
                    in_table = true;
                }
                Event::End(TagEnd::Table) => {
                    in_table = false;
                }
                Event::Start(Tag::CodeBlock(kind)) => {
                    // Structured payloads are noise next to the rendered table
                    skip_code = matches!(kind, CodeBlockKind::Fenced(ref lang) if lang.eq_ignore_ascii_case("json"));
                }
                Event::End(TagEnd::CodeBlock) => {
                    skip_code = false;
                    ensure_newline(&mut out);
                }
                Event::Start(Tag::List(_)) => {
                    list_depth += 1;
                    ensure_newline(&mut out);
                }
                Event::End(TagEnd::List(_)) => {
                    list_depth = list_depth.saturating_sub(1);
                    if list_depth == 0 {
                        out.push('\n');
                    }
                }
                Event::Start(Tag::Item) => {
                    ensure_newline(&mut out);
                    out.push_str(&"  ".repeat(list_depth.saturating_sub(1)));
                    out.push_str("• ");
                }
                Event::End(TagEnd::Item) => ensure_newline(&mut out),
                Event::End(TagEnd::Paragraph) | Event::End(TagEnd::Heading(_)) => {
                    ensure_newline(&mut out);
                    if list_depth == 0 {
                        out.push('\n');
                    }
                }
                Event::Text(text) | Event::Code(text) => {
                    if skip_code || in_table {
                        continue;
                    }
                    out.push_str(&text);
                }
                Event::SoftBreak | Event::HardBreak => {
                    if !in_table {
                        out.push('\n');
                    }
                }
                Event::Rule => ensure_newline(&mut out),
                _ => {}
            }
        }

        out
    }

    fn strip_boilerplate(&self, content: &str) -> String {
        static LEAD_IN: OnceLock<Regex> = OnceLock::new();
        let lead_in = LEAD_IN.get_or_init(|| {
            Regex::new(r"(?i)^\s*(here\s+(is|are)|below\s+(is|are))\b.*\b(table|list|flights?)\b[^.]*:\s*$")
                .expect("valid lead-in pattern")
        });

        content
            .lines()
            .filter(|line| !lead_in.is_match(line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ReplyCleaner {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_newline(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}
