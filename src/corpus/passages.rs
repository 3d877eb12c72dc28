use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::markup::{is_choice_echo, is_command, is_navigation, split_emote};
use crate::textutil::fix_punctuation_spacing;

pub const PASSAGE_MARKER: &str = "===";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PassageChoice {
    pub text: String,
    pub link: String,
    pub emote: Option<String>,
}

impl PassageChoice {
    /// Text as the host shows it: `":silence: ..."` when an emote is attached.
    #[must_use]
    pub fn display_text(&self) -> String {
        match self.emote.as_deref() {
            Some(emote) => format!("{emote} {}", self.text),
            None => self.text.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassageRecord {
    pub lines: Vec<String>,
    pub choices: Vec<PassageChoice>,
}

impl PassageRecord {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.choices.is_empty()
    }
}

/// Which key a passage lookup was answered from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassageMatch {
    Qualified,
    Title,
}

/// One side of the store: a qualified `(object base, title)` index that takes the latest entry,
/// plus a title-only index that keeps the first.
#[derive(Debug)]
struct Keyed<T> {
    items: Vec<T>,
    qualified: HashMap<(String, String), usize>,
    by_title: HashMap<String, usize>,
}

impl<T> Default for Keyed<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            qualified: HashMap::new(),
            by_title: HashMap::new(),
        }
    }
}

impl<T> Keyed<T> {
    fn insert(&mut self, object_base: &str, title: &str, item: T) {
        let idx = self.items.len();
        self.items.push(item);
        self.qualified
            .insert((object_base.to_string(), title.to_string()), idx);
        self.by_title.entry(title.to_string()).or_insert(idx);
    }

    fn qualified(&self, object_base: &str, title: &str) -> Option<&T> {
        self.qualified
            .get(&(object_base.to_string(), title.to_string()))
            .map(|&i| &self.items[i])
    }

    fn by_title(&self, title: &str) -> Option<&T> {
        self.by_title.get(title).map(|&i| &self.items[i])
    }

    fn lookup(&self, object_base: &str, title: &str) -> Option<(PassageMatch, &T)> {
        if let Some(item) = self.qualified(object_base, title) {
            return Some((PassageMatch::Qualified, item));
        }
        self.by_title(title).map(|item| (PassageMatch::Title, item))
    }
}

/// Translated passages. Lines and choices are indexed separately, and each side is only
/// written when the passage has something for it, so a choice-only passage never hides
/// another file's lines for the same title.
#[derive(Debug, Default)]
pub struct PassageStore {
    lines: Keyed<Vec<String>>,
    choices: Keyed<Vec<PassageChoice>>,
}

impl PassageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Passages committed with at least one line.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.items.is_empty() && self.choices.items.is_empty()
    }

    /// Stores each non-empty side of `record`; returns whether any side was stored.
    pub fn commit(&mut self, object_base: &str, title: &str, record: PassageRecord) -> bool {
        let PassageRecord { lines, choices } = record;
        let stored = !lines.is_empty() || !choices.is_empty();
        if !lines.is_empty() {
            self.lines.insert(object_base, title, lines);
        }
        if !choices.is_empty() {
            self.choices.insert(object_base, title, choices);
        }
        stored
    }

    #[must_use]
    pub fn qualified_lines(&self, object_base: &str, title: &str) -> Option<&[String]> {
        self.lines.qualified(object_base, title).map(Vec::as_slice)
    }

    #[must_use]
    pub fn title_lines(&self, title: &str) -> Option<&[String]> {
        self.lines.by_title(title).map(Vec::as_slice)
    }

    #[must_use]
    pub fn qualified_choices(&self, object_base: &str, title: &str) -> Option<&[PassageChoice]> {
        self.choices.qualified(object_base, title).map(Vec::as_slice)
    }

    #[must_use]
    pub fn title_choices(&self, title: &str) -> Option<&[PassageChoice]> {
        self.choices.by_title(title).map(Vec::as_slice)
    }

    /// True when some passage with lines uses `title`.
    #[must_use]
    pub fn has_lines_titled(&self, title: &str) -> bool {
        self.lines.by_title.contains_key(title)
    }

    #[must_use]
    pub fn contains_title(&self, title: &str) -> bool {
        self.lines.by_title.contains_key(title) || self.choices.by_title.contains_key(title)
    }

    /// Every committed title, each once.
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        let lines = self.lines.by_title.keys();
        let choice_only = self
            .choices
            .by_title
            .keys()
            .filter(|t| !self.lines.by_title.contains_key(*t));
        lines.chain(choice_only).map(String::as_str)
    }

    /// Every committed choice list in commit order, each exactly once.
    pub fn choice_lists(&self) -> impl Iterator<Item = &[PassageChoice]> {
        self.choices.items.iter().map(Vec::as_slice)
    }

    #[must_use]
    pub fn lines_for(&self, object_base: &str, title: &str) -> Option<(PassageMatch, &[String])> {
        self.lines
            .lookup(object_base, title)
            .map(|(m, lines)| (m, lines.as_slice()))
    }

    #[must_use]
    pub fn choices_for(&self, object_base: &str, title: &str) -> &[PassageChoice] {
        self.choices
            .lookup(object_base, title)
            .map(|(_, choices)| choices.as_slice())
            .unwrap_or_default()
    }
}

/// `link -> [display text, ...]` in encounter order.
#[derive(Debug, Default)]
pub struct LinkChoiceIndex {
    by_link: HashMap<String, Vec<String>>,
}

impl LinkChoiceIndex {
    pub fn from_choices<'a>(choices: impl IntoIterator<Item = &'a PassageChoice>) -> Self {
        let mut by_link: HashMap<String, Vec<String>> = HashMap::new();
        for choice in choices {
            if choice.link.is_empty() {
                continue;
            }
            by_link
                .entry(choice.link.clone())
                .or_default()
                .push(choice.display_text());
        }
        Self { by_link }
    }

    #[must_use]
    pub fn texts(&self, link: &str) -> Option<&[String]> {
        self.by_link.get(link).map(Vec::as_slice)
    }

    /// Like [`Self::texts`], also handing back the stored link.
    #[must_use]
    pub fn entry(&self, link: &str) -> Option<(&str, &[String])> {
        self.by_link
            .get_key_value(link)
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_link.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_link.is_empty()
    }
}

/// Parses one passage file into `store`; returns how many passages were committed.
pub fn parse_passage_file(store: &mut PassageStore, object_base: &str, text: &str) -> usize {
    let file_titles: HashSet<&str> = text
        .split('\n')
        .filter_map(|l| l.trim_end_matches(['\r', '\n']).strip_prefix(PASSAGE_MARKER))
        .map(str::trim)
        .collect();

    let mut committed = 0usize;
    let mut current: Option<(String, PassageRecord)> = None;

    for raw in text.split('\n') {
        let line = raw.trim_end_matches(['\r', '\n']);

        if let Some(rest) = line.strip_prefix(PASSAGE_MARKER) {
            if let Some((title, record)) = current.take() {
                if store.commit(object_base, &title, record) {
                    committed += 1;
                }
            }
            current = Some((rest.trim().to_string(), PassageRecord::default()));
            continue;
        }

        let Some((_, record)) = current.as_mut() else {
            continue;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("%%") {
            continue;
        }

        if let Some(body) = trimmed.strip_prefix('*') {
            match parse_choice(body) {
                Some(choice) => record.choices.push(choice),
                None => debug!(object_base, line = trimmed, "skipping choice without text"),
            }
            continue;
        }

        if is_discarded(trimmed, &file_titles, store) {
            continue;
        }

        let content = if is_command(trimmed) {
            trimmed.to_string()
        } else {
            fix_punctuation_spacing(trimmed)
        };
        record.lines.push(content);
    }

    if let Some((title, record)) = current.take() {
        if store.commit(object_base, &title, record) {
            committed += 1;
        }
    }
    committed
}

/// `text -> link` with an optional leading `:emote:`. Choices without text are dropped.
pub fn parse_choice(body: &str) -> Option<PassageChoice> {
    let mut body = body.trim();
    let mut link = "";
    if let Some(idx) = body.rfind("->") {
        link = body[idx + 2..].trim();
        body = body[..idx].trim();
    }

    let mut emote = None;
    if let Some((tag, rest)) = split_emote(body) {
        emote = Some(tag.to_string());
        body = rest.trim();
    }

    if body.is_empty() {
        return None;
    }
    Some(PassageChoice {
        text: body.to_string(),
        link: link.to_string(),
        emote,
    })
}

fn is_discarded(line: &str, file_titles: &HashSet<&str>, store: &PassageStore) -> bool {
    (line.starts_with('{') && line.ends_with('}'))
        || line.starts_with("->")
        || file_titles.contains(line)
        || store.has_lines_titled(line)
        || is_navigation(line)
        || is_choice_echo(line)
}
