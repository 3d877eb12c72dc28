use once_cell::sync::Lazy;
use regex::Regex;

use crate::textutil::is_cyrillic;

pub const SPACED_SEPARATOR: &str = " : ";
pub const TIGHT_SEPARATOR: &str = ": ";

pub const COMMAND_PREFIX: &str = "$$";
pub const NAVIGATION_MARKER: &str = ";;";

pub const MAX_SPEAKER_CHARS: usize = 30;

const SPACED_PATTERNS: [&str; 4] = [" : \"", " : \u{00AB}", " : \u{201C}", " : \u{2018}"];
const TIGHT_PATTERNS: [&str; 4] = [": \"", ": \u{00AB}", ": \u{201C}", ": \u{2018}"];

// Text extraction deliberately ignores the single-quote variants.
const TEXT_PATTERNS: [&str; 6] = [
    " : \"",
    " : \u{00AB}",
    " : \u{201C}",
    ": \"",
    ": \u{00AB}",
    ": \u{201C}",
];

static CHOICE_ECHO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:[a-z]+:").expect("choice echo regex"));

static OBJECT_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+)_\d+$").expect("object suffix regex"));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeakerSeparator {
    Spaced,
    Tight,
}

impl SpeakerSeparator {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spaced => SPACED_SEPARATOR,
            Self::Tight => TIGHT_SEPARATOR,
        }
    }

    /// The first line carrying either quoted-speaker pattern decides; `": "` otherwise.
    pub fn detect<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        for line in lines {
            if SPACED_PATTERNS.iter().any(|p| line.contains(p)) {
                return Self::Spaced;
            }
            if TIGHT_PATTERNS.iter().any(|p| line.contains(p)) {
                return Self::Tight;
            }
        }
        Self::Tight
    }
}

#[inline]
pub fn is_command(line: &str) -> bool {
    line.starts_with(COMMAND_PREFIX)
}

#[inline]
pub fn is_navigation(line: &str) -> bool {
    line.contains(NAVIGATION_MARKER)
}

/// `NAME: "text"` / `NAME : «text»` -> `NAME`.
pub fn speaker_name(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if is_command(trimmed) || trimmed.starts_with('*') || trimmed.starts_with('{') {
        return None;
    }

    let idx = first_pattern(trimmed, &SPACED_PATTERNS)
        .or_else(|| first_pattern(trimmed, &TIGHT_PATTERNS))?;
    if idx == 0 {
        return None;
    }

    let name = trimmed[..idx].trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_SPEAKER_CHARS {
        return None;
    }
    let valid = name
        .chars()
        .all(|c| c.is_uppercase() || matches!(c, ' ' | '_' | '?' | '-') || is_cyrillic(c));
    valid.then_some(name)
}

/// Everything after the separator, opening quote included.
pub fn speaker_text(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    TEXT_PATTERNS.iter().find_map(|p| {
        let idx = trimmed.find(p)?;
        let sep_len = if p.starts_with(' ') { 3 } else { 2 };
        Some(&trimmed[idx + sep_len..])
    })
}

/// Splits a leading `:tag:` into `(":tag:", rest)`; rest is not trimmed.
pub fn split_emote(text: &str) -> Option<(&str, &str)> {
    let after = text.strip_prefix(':')?;
    let end = after.find(':')?;
    let tag_len = 1 + end + 1;
    Some((&text[..tag_len], &text[tag_len..]))
}

/// A lowercase `:tag:` line left behind by choice extraction.
pub fn is_choice_echo(line: &str) -> bool {
    CHOICE_ECHO_RE.is_match(line)
}

/// `NAME: text` without quotes; yields the candidate name and the remaining text.
///
/// Only the shape is checked here; callers decide whether the name is a known speaker.
pub fn unquoted_speaker(line: &str) -> Option<(&str, &str)> {
    let idx = line.find(": ")?;
    let prefix_chars = line[..idx].chars().count();
    if prefix_chars == 0 || prefix_chars > MAX_SPEAKER_CHARS {
        return None;
    }
    let name = line[..idx].trim();
    let len = name.chars().count();
    if !(2..=MAX_SPEAKER_CHARS).contains(&len) {
        return None;
    }
    if !name.chars().all(|c| c.is_uppercase() || c == '-' || c == ' ') {
        return None;
    }
    Some((name, &line[idx + 2..]))
}

/// Drops a leading dash and a stray single quote left over from unquoted dialogue.
pub fn strip_dialogue_artifacts(text: &str) -> &str {
    let mut txt = text.trim();
    if let Some(rest) = txt
        .strip_prefix('\u{2014}')
        .or_else(|| txt.strip_prefix('\u{2013}'))
    {
        txt = rest.trim();
    }
    if let Some(rest) = txt.strip_prefix('\'') {
        txt = rest.trim();
    }
    txt
}

#[inline]
pub fn starts_with_quote(line: &str) -> bool {
    line.starts_with('"') || line.starts_with('\u{201C}')
}

/// `"text"` -> `« text »`; an unbalanced closing quote is dropped from the middle.
pub fn to_guillemets(line: &str) -> String {
    let mut chars = line.chars();
    chars.next();
    let mut inner = chars.as_str().to_string();
    if inner.ends_with('"') || inner.ends_with('\u{201D}') {
        inner.pop();
    } else if inner.chars().count() > 1 {
        let last = inner.rfind('"').or_else(|| inner.rfind('\u{201D}'));
        if let Some(pos) = last {
            inner.remove(pos);
        }
    }
    format!("\u{00AB} {} \u{00BB}", inner.trim())
}

pub fn emphasize(line: &str) -> String {
    format!("<i>{line}</i>")
}

/// `034_phil_01` -> `034_phil`; names without a numeric suffix are returned as-is.
pub fn object_base(name: &str) -> &str {
    OBJECT_SUFFIX_RE
        .captures(name)
        .and_then(|c| c.get(1))
        .map_or(name, |m| m.as_str())
}

fn first_pattern(text: &str, patterns: &[&str]) -> Option<usize> {
    patterns.iter().find_map(|p| text.find(p))
}
