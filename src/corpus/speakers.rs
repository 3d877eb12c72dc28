use std::collections::HashMap;

use crate::markup::MAX_SPEAKER_CHARS;
use crate::textutil::is_cyrillic_upper;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpeakerEvent {
    Added {
        target: String,
        source: String,
    },
    Replaced {
        target: String,
        previous: String,
        source: String,
    },
    Kept {
        target: String,
        existing: String,
        proposed: String,
    },
}

/// Translated speaker name -> source speaker name, learned from bare-name UI entries.
#[derive(Debug, Default)]
pub struct ReverseSpeakerMap {
    names: HashMap<String, String>,
}

impl ReverseSpeakerMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn get(&self, translated: &str) -> Option<&str> {
        self.names.get(translated).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, translated: &str) -> bool {
        self.names.contains_key(translated)
    }

    /// Feeds `(source, translated)` UI pairs; non-name pairs are ignored. On collision the longer
    /// source name wins, ties keep the first.
    pub fn learn<'a>(
        &mut self,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Vec<SpeakerEvent> {
        let mut events = Vec::new();
        for (source, target) in pairs {
            if !is_source_name(source) || !is_target_name(target) {
                continue;
            }
            match self.names.get_mut(target) {
                None => {
                    self.names.insert(target.to_string(), source.to_string());
                    events.push(SpeakerEvent::Added {
                        target: target.to_string(),
                        source: source.to_string(),
                    });
                }
                Some(existing) if source.chars().count() > existing.chars().count() => {
                    let previous = std::mem::replace(existing, source.to_string());
                    events.push(SpeakerEvent::Replaced {
                        target: target.to_string(),
                        previous,
                        source: source.to_string(),
                    });
                }
                Some(existing) => {
                    if existing != source {
                        events.push(SpeakerEvent::Kept {
                            target: target.to_string(),
                            existing: existing.clone(),
                            proposed: source.to_string(),
                        });
                    }
                }
            }
        }
        events
    }
}

fn is_bare_name(name: &str) -> bool {
    let len = name.chars().count();
    (2..=MAX_SPEAKER_CHARS).contains(&len) && !name.contains(' ')
}

fn is_source_name(name: &str) -> bool {
    is_bare_name(name) && name.chars().all(|c| c.is_uppercase() || c == '-')
}

fn is_target_name(name: &str) -> bool {
    is_bare_name(name) && name.chars().all(|c| is_cyrillic_upper(c) || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learns_only_bare_uppercase_names() {
        let mut map = ReverseSpeakerMap::new();
        map.learn([
            ("PATRICIA", "ПАТРИСИЯ"),
            ("JEAN-PAUL", "ЖАН-ПОЛЬ"),
            ("Hello", "Привет"),
            ("MR SMITH", "МР СМИТ"),
            ("X", "Х"),
            ("TAXI", "Taxi"),
        ]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("ПАТРИСИЯ"), Some("PATRICIA"));
        assert_eq!(map.get("ЖАН-ПОЛЬ"), Some("JEAN-PAUL"));
        assert!(!map.contains("Привет"));
    }

    #[test]
    fn longer_source_wins_on_collision() {
        let mut map = ReverseSpeakerMap::new();
        let events = map.learn([("HERVE", "ЭРВЕ"), ("HERVEY", "ЭРВЕ"), ("HERV", "ЭРВЕ")]);
        assert_eq!(map.get("ЭРВЕ"), Some("HERVEY"));
        assert!(matches!(events[1], SpeakerEvent::Replaced { .. }));
        assert!(matches!(events[2], SpeakerEvent::Kept { .. }));
    }
}
