use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::corpus::LinkChoiceIndex;

/// A choice as the host holds it: display text plus the passage it leads to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueChoice {
    pub text: String,
    #[serde(default)]
    pub link: Option<String>,
}

impl DialogueChoice {
    pub fn new(text: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            link: Some(link.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnresolvedChoice {
    pub link: String,
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChoiceResolution {
    pub resolved: usize,
    pub from_global: usize,
    pub unresolved: Vec<UnresolvedChoice>,
}

/// Per-link consumption counters over one index.
struct LinkCursor<'a> {
    index: &'a LinkChoiceIndex,
    consumed: HashMap<&'a str, usize>,
}

impl<'a> LinkCursor<'a> {
    fn new(index: &'a LinkChoiceIndex) -> Self {
        Self {
            index,
            consumed: HashMap::new(),
        }
    }

    fn next(&mut self, link: &str) -> Option<&'a str> {
        let (key, texts) = self.index.entry(link)?;
        let n = self.consumed.entry(key).or_insert(0);
        let text = texts.get(*n)?;
        *n += 1;
        Some(text.as_str())
    }
}

/// Replaces choice texts by link: this passage's translated choices first, in encounter order,
/// then the global link index with its own counters. Choices that match neither keep their text.
pub fn resolve_choices(
    title: &str,
    choices: &mut [DialogueChoice],
    local: &LinkChoiceIndex,
    global: &LinkChoiceIndex,
) -> ChoiceResolution {
    let mut local_cursor = LinkCursor::new(local);
    let mut global_cursor = LinkCursor::new(global);
    let mut out = ChoiceResolution::default();

    for choice in choices.iter_mut() {
        let Some(link) = choice.link.as_deref() else {
            continue;
        };
        if let Some(text) = local_cursor.next(link) {
            choice.text = text.to_string();
            out.resolved += 1;
            continue;
        }
        if let Some(text) = global_cursor.next(link) {
            debug!(title, link, from = %choice.text, to = text, "choice resolved from global links");
            choice.text = text.to_string();
            out.resolved += 1;
            out.from_global += 1;
            continue;
        }
        warn!(title, link, text = %choice.text, "choice left untranslated");
        out.unresolved.push(UnresolvedChoice {
            link: link.to_string(),
            text: choice.text.clone(),
        });
    }
    out
}
