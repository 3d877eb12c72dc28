use std::collections::HashMap;

use crate::corpus::passages::PASSAGE_MARKER;
use crate::markup::is_command;

const HEADER_PREFIXES: [&str; 3] = ["%%", "VAR ", "+++ "];

/// Untitled translated text, split into blocks at known passage titles.
#[derive(Debug, Default)]
pub struct RawBlockStore {
    blocks: HashMap<String, Vec<Vec<String>>>,
}

impl RawBlockStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits `text` into blocks for `object_base`. Files with passage markers are left to the
    /// passage parser. Returns the number of blocks stored; a later scan of the same base
    /// replaces the earlier one.
    pub fn scan_file(&mut self, object_base: &str, text: &str, is_title: impl Fn(&str) -> bool) -> usize {
        if has_passage_markers(text) {
            return 0;
        }

        let mut blocks = Vec::new();
        let mut current: Vec<String> = Vec::new();
        for raw in text.split('\n') {
            let line = raw.trim();
            if line.is_empty() || HEADER_PREFIXES.iter().any(|p| line.starts_with(p)) {
                continue;
            }
            if is_title(line) {
                if !current.is_empty() {
                    blocks.push(std::mem::take(&mut current));
                }
                continue;
            }
            if is_command(line) {
                continue;
            }
            current.push(line.to_string());
        }
        if !current.is_empty() {
            blocks.push(current);
        }

        let count = blocks.len();
        if count > 0 {
            self.blocks.insert(object_base.to_string(), blocks);
        }
        count
    }

    #[must_use]
    pub fn blocks(&self, object_base: &str) -> Option<&[Vec<String>]> {
        self.blocks.get(object_base).map(Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, object_base: &str) -> bool {
        self.blocks.contains_key(object_base)
    }

    #[must_use]
    pub fn files(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn total_blocks(&self) -> usize {
        self.blocks.values().map(Vec::len).sum()
    }
}

pub fn has_passage_markers(text: &str) -> bool {
    text.split('\n').any(|l| l.trim_start().starts_with(PASSAGE_MARKER))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(line: &str) -> bool {
        matches!(line, "intro" | "middle")
    }

    #[test]
    fn splits_at_known_titles_and_skips_headers() {
        let text = "%% header\nVAR x = 1\n+++ meta\n\nПервый блок\n$$wait\nещё\nintro\nВторой\nmiddle\nmiddle\nТретий\r\n";
        let mut store = RawBlockStore::new();
        assert_eq!(store.scan_file("001_patricia", text, titles), 3);
        let blocks = store.blocks("001_patricia").expect("blocks");
        assert_eq!(blocks[0], vec!["Первый блок".to_string(), "ещё".to_string()]);
        assert_eq!(blocks[1], vec!["Второй".to_string()]);
        assert_eq!(blocks[2], vec!["Третий".to_string()]);
        assert_eq!(store.total_blocks(), 3);
    }

    #[test]
    fn files_with_passage_markers_are_ignored() {
        let mut store = RawBlockStore::new();
        assert_eq!(store.scan_file("a", "=== intro\nтекст\n", titles), 0);
        assert!(!store.contains("a"));
    }

    #[test]
    fn empty_scan_keeps_no_entry() {
        let mut store = RawBlockStore::new();
        assert_eq!(store.scan_file("a", "%% only header\n$$cmd\nintro\n", titles), 0);
        assert!(store.blocks("a").is_none());
    }
}
