//! In-memory translation tables, built once from already-read text resources.

pub mod blocks;
pub mod json;
pub mod passages;
pub mod speakers;

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::textutil::normalize;

pub use blocks::RawBlockStore;
pub use passages::{LinkChoiceIndex, PassageChoice, PassageMatch, PassageRecord, PassageStore};
pub use speakers::{ReverseSpeakerMap, SpeakerEvent};

/// One text file, tagged with the object base it belongs to (`001_patricia`).
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub object_base: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(object_base: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            object_base: object_base.into(),
            text: text.into(),
        }
    }
}

/// Everything the corpus is built from. Missing resources are simply `None` / empty.
#[derive(Clone, Debug, Default)]
pub struct CorpusSources {
    pub ui_map: Option<String>,
    pub key_map: Option<String>,
    /// Passage-formatted files, in the order "first file wins" should see them.
    pub passage_files: Vec<SourceFile>,
    /// Files scanned for the sequential fallback. Files with `===` markers are ignored there, so
    /// the passage files themselves can be handed in when no separate raw set exists.
    pub raw_files: Vec<SourceFile>,
    /// Extra block boundaries for raw files, usually taken from a passage dump.
    pub known_titles: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct CorpusStats {
    pub ui_entries: usize,
    pub ui_normalized_added: usize,
    pub ui_lowercase_entries: usize,
    pub key_entries: usize,
    pub skipped_entries: usize,
    pub passages: usize,
    pub passage_titles: usize,
    pub choice_links: usize,
    pub raw_block_files: usize,
    pub raw_blocks: usize,
    pub reverse_speakers: usize,
}

#[derive(Debug, Default)]
pub struct Corpus {
    ui: HashMap<String, String>,
    ui_lower: HashMap<String, String>,
    keys: HashMap<String, String>,
    passages: PassageStore,
    blocks: RawBlockStore,
    speakers: ReverseSpeakerMap,
    links: LinkChoiceIndex,
    stats: CorpusStats,
}

impl Corpus {
    #[must_use]
    pub fn build(sources: &CorpusSources) -> Self {
        let mut stats = CorpusStats::default();

        let ui_pairs = sources
            .ui_map
            .as_deref()
            .map(|text| json::parse_flat_map(text, "ui_map"))
            .unwrap_or_default();
        let key_pairs = sources
            .key_map
            .as_deref()
            .map(|text| json::parse_flat_map(text, "key_map"))
            .unwrap_or_default();
        stats.skipped_entries = ui_pairs.skipped + key_pairs.skipped;

        let mut ui: HashMap<String, String> = HashMap::with_capacity(ui_pairs.pairs.len());
        let mut ordered: Vec<(String, String)> = Vec::with_capacity(ui_pairs.pairs.len());
        for (k, v) in ui_pairs.pairs {
            if ui.insert(k.clone(), v.clone()).is_none() {
                ordered.push((k, v));
            } else if let Some(slot) = ordered.iter_mut().find(|(ok, _)| *ok == k) {
                slot.1 = v;
            }
        }
        stats.ui_entries = ui.len();

        let mut added: Vec<(String, String)> = Vec::new();
        let mut added_keys: HashSet<String> = HashSet::new();
        for (k, v) in &ordered {
            let nk = normalize(k);
            if nk != *k && !ui.contains_key(&nk) && added_keys.insert(nk.clone()) {
                added.push((nk, v.clone()));
            }
        }
        stats.ui_normalized_added = added.len();
        for (k, v) in &added {
            ui.insert(k.clone(), v.clone());
        }
        ordered.extend(added);

        let mut ui_lower: HashMap<String, String> = HashMap::with_capacity(ordered.len());
        for (k, v) in &ordered {
            let lower = k.to_lowercase();
            let normalized_lower = normalize(k).to_lowercase();
            ui_lower.entry(lower).or_insert_with(|| v.clone());
            ui_lower.entry(normalized_lower).or_insert_with(|| v.clone());
        }
        stats.ui_lowercase_entries = ui_lower.len();

        let mut speakers = ReverseSpeakerMap::new();
        for event in speakers.learn(ordered.iter().map(|(k, v)| (k.as_str(), v.as_str()))) {
            if let SpeakerEvent::Kept {
                target,
                existing,
                proposed,
            } = event
            {
                debug!(%target, %existing, %proposed, "reverse speaker collision, keeping longer name");
            }
        }
        stats.reverse_speakers = speakers.len();

        let keys: HashMap<String, String> = key_pairs.pairs.into_iter().collect();
        stats.key_entries = keys.len();

        let mut store = PassageStore::new();
        for file in &sources.passage_files {
            let committed = passages::parse_passage_file(&mut store, &file.object_base, &file.text);
            debug!(object_base = %file.object_base, passages = committed, "parsed passage file");
        }
        stats.passages = store.len();
        stats.passage_titles = store.titles().count();

        let known: HashSet<&str> = sources.known_titles.iter().map(String::as_str).collect();
        let is_title = |line: &str| store.contains_title(line) || known.contains(line);
        let mut blocks = RawBlockStore::new();
        for file in &sources.raw_files {
            let n = blocks.scan_file(&file.object_base, &file.text, &is_title);
            if n > 0 {
                debug!(object_base = %file.object_base, blocks = n, "scanned raw blocks");
            }
        }
        stats.raw_block_files = blocks.files();
        stats.raw_blocks = blocks.total_blocks();

        let links = LinkChoiceIndex::from_choices(store.choice_lists().flatten());
        stats.choice_links = links.len();

        info!(
            ui = stats.ui_entries,
            normalized = stats.ui_normalized_added,
            keys = stats.key_entries,
            skipped = stats.skipped_entries,
            "loaded string maps"
        );
        info!(
            passages = stats.passages,
            titles = stats.passage_titles,
            links = stats.choice_links,
            raw_files = stats.raw_block_files,
            raw_blocks = stats.raw_blocks,
            speakers = stats.reverse_speakers,
            "built passage corpus"
        );

        Self {
            ui,
            ui_lower,
            keys,
            passages: store,
            blocks,
            speakers,
            links,
            stats,
        }
    }

    #[must_use]
    pub fn ui(&self, key: &str) -> Option<&str> {
        self.ui.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn ui_lowercase(&self, lowered: &str) -> Option<&str> {
        self.ui_lower.get(lowered).map(String::as_str)
    }

    #[must_use]
    pub fn key(&self, key: &str) -> Option<&str> {
        self.keys.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn passages(&self) -> &PassageStore {
        &self.passages
    }

    #[must_use]
    pub fn blocks(&self) -> &RawBlockStore {
        &self.blocks
    }

    #[must_use]
    pub fn speakers(&self) -> &ReverseSpeakerMap {
        &self.speakers
    }

    #[must_use]
    pub fn links(&self) -> &LinkChoiceIndex {
        &self.links
    }

    #[must_use]
    pub fn stats(&self) -> &CorpusStats {
        &self.stats
    }
}
