//! Minimal reStructuredText reader
//!
//! Only what example extraction needs: section headings and the bodies of
//! code directives. Heading levels follow the order in which adornment
//! styles first appear in a page, as in docutils.

use once_cell::sync::Lazy;
use regex::Regex;

const ADORNMENT_CHARS: &[char] = &['=', '-', '~', '^', '+', '`', '*', '#', '"'];

static DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*)\.\.\s+(code-block|code|sourcecode|io-code-block|input|output)::\s*(.*?)\s*$").unwrap()
});

static OPTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^:([\w-]+):\s*(.*?)\s*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// `.. code-block::` and friends
    Code,
    /// `.. input::` inside an `io-code-block`
    Input,
    /// `.. output::` inside an `io-code-block`
    Output,
}

/// A directive body with its indentation removed
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub language: Option<String>,
    pub options: Vec<(String, String)>,
    pub body: String,
}

impl Block {
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Blocks marked `:copyable: false` show results rather than commands
    pub fn is_copyable(&self) -> bool {
        self.option("copyable") != Some("false")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Heading text with inline literal markup removed
    pub title: String,
    /// 1 for the page title; 0 for text before the first heading
    pub level: usize,
    pub blocks: Vec<Block>,
}

/// Splits `text` into sections in document order
pub fn parse(text: &str) -> Vec<Section> {
    let lines: Vec<&str> = text.lines().collect();
    let mut styles: Vec<(char, bool)> = Vec::new();
    let mut sections = vec![Section {
        title: String::new(),
        level: 0,
        blocks: Vec::new(),
    }];

    let mut i = 0;
    while i < lines.len() {
        if let Some((title, style, consumed)) = heading_at(&lines, i) {
            let level = match styles.iter().position(|s| *s == style) {
                Some(pos) => pos + 1,
                None => {
                    styles.push(style);
                    styles.len()
                }
            };
            sections.push(Section {
                title: clean_title(title),
                level,
                blocks: Vec::new(),
            });
            i += consumed;
            continue;
        }

        if let Some(caps) = DIRECTIVE.captures(lines[i]) {
            let indent = caps[1].len();
            let name = &caps[2];
            let argument = caps[3].to_string();
            if name == "io-code-block" {
                // nested input/output directives are picked up on later lines
                i += 1;
                continue;
            }
            let end = block_end(&lines, i + 1, indent);
            let block = read_block(name, argument, &lines[i + 1..end]);
            if let Some(section) = sections.last_mut() {
                section.blocks.push(block);
            }
            i = end;
            continue;
        }

        i += 1;
    }

    sections
}

/// Heading starting at line `i`: title, style and lines consumed
fn heading_at<'a>(lines: &[&'a str], i: usize) -> Option<(&'a str, (char, bool), usize)> {
    let line = lines[i];
    // overline, title, underline
    if let Some(c) = adornment(line) {
        let title = lines.get(i + 1)?;
        let under = lines.get(i + 2)?;
        if !title.trim().is_empty() && adornment(title).is_none() && adornment(under) == Some(c) {
            return Some((title.trim(), (c, true), 3));
        }
        return None;
    }
    if line.trim().is_empty() || line.starts_with(char::is_whitespace) {
        return None;
    }
    let under = lines.get(i + 1)?;
    let c = adornment(under)?;
    if under.trim_end().chars().count() + 2 < line.trim_end().chars().count() {
        return None;
    }
    Some((line.trim(), (c, false), 2))
}

fn adornment(line: &str) -> Option<char> {
    let line = line.trim_end();
    let first = line.chars().next()?;
    if line.len() < 3 || !ADORNMENT_CHARS.contains(&first) || !line.chars().all(|c| c == first) {
        return None;
    }
    Some(first)
}

fn clean_title(title: &str) -> String {
    title.replace("``", "").trim().to_string()
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// `line` without its first `margin` bytes, when those are ASCII whitespace
fn dedent(line: &str, margin: usize) -> &str {
    match line.get(..margin) {
        Some(prefix) if prefix.bytes().all(|b| b.is_ascii_whitespace()) => &line[margin..],
        _ => line.trim_start(),
    }
}

/// First line after a directive at `indent` that is not part of its body
fn block_end(lines: &[&str], from: usize, indent: usize) -> usize {
    let mut end = from;
    let mut last_content = from;
    while end < lines.len() {
        let line = lines[end];
        if line.trim().is_empty() {
            end += 1;
            continue;
        }
        if indent_of(line) <= indent {
            break;
        }
        end += 1;
        last_content = end;
    }
    last_content
}

fn read_block(name: &str, argument: String, body: &[&str]) -> Block {
    let kind = match name {
        "input" => BlockKind::Input,
        "output" => BlockKind::Output,
        _ => BlockKind::Code,
    };

    let mut options = Vec::new();
    let mut start = 0;
    for line in body {
        match OPTION.captures(line.trim()) {
            Some(caps) if !line.trim().is_empty() => {
                options.push((caps[1].to_string(), caps[2].to_string()));
                start += 1;
            }
            _ => break,
        }
    }

    let content = &body[start..];
    let margin = content
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0);
    let text = content
        .iter()
        .map(|l| dedent(l, margin))
        .collect::<Vec<_>>()
        .join("\n");

    let language = if argument.is_empty() {
        options
            .iter()
            .find(|(key, _)| key == "language")
            .map(|(_, value)| value.clone())
    } else {
        Some(argument)
    };

    Block {
        kind,
        language,
        options,
        body: text.trim_matches('\n').to_string(),
    }
}
