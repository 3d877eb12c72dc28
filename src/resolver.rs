use crate::corpus::Corpus;
use crate::textutil::{
    collapse_newlines, has_cyrillic, is_all_uppercase, is_currency_or_time_like, normalize,
    sentence_case, strip_accents, strip_markers,
};

const MIN_MULTILINE_PARTS: usize = 2;
const MAX_MULTILINE_PARTS: usize = 20;

/// Tiered lookup of short UI strings against the corpus string maps.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    corpus: &'a Corpus,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(corpus: &'a Corpus) -> Self {
        Self { corpus }
    }

    /// Resolves `text` through the UI map. Already-translated text (any Cyrillic) and numeric,
    /// currency or clock content never resolve. When `__key__` markers were present and nothing
    /// matched, the marker-stripped text is returned.
    #[must_use]
    pub fn resolve(&self, text: &str) -> Option<String> {
        let cleaned = Self::lookup_key(text)?;
        self.lookup(cleaned)
            .or_else(|| strip_markers(text).map(str::to_string))
    }

    /// Line-level variant used when a whole passage has to be translated one line at a time:
    /// after the regular tiers it also consults the case-insensitive index.
    #[must_use]
    pub fn resolve_line(&self, text: &str) -> Option<String> {
        let cleaned = Self::lookup_key(text)?;
        self.lookup(cleaned)
            .or_else(|| self.lookup_lowercase(cleaned))
            .or_else(|| strip_markers(text).map(str::to_string))
    }

    #[must_use]
    pub fn resolve_key(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }
        self.corpus
            .key(key)
            .or_else(|| self.corpus.key(&key.to_uppercase()))
            .or_else(|| self.corpus.key(&key.to_lowercase()))
            .map(str::to_string)
    }

    /// Key map first, the UI resolver on a miss.
    #[must_use]
    pub fn resolve_keyed(&self, key: Option<&str>, text: &str) -> Option<String> {
        key.and_then(|k| self.resolve_key(k))
            .or_else(|| self.resolve(text))
    }

    fn lookup_key(text: &str) -> Option<&str> {
        if text.is_empty() || has_cyrillic(text) || is_currency_or_time_like(text) {
            return None;
        }
        Some(strip_markers(text).unwrap_or(text))
    }

    fn lookup(&self, cleaned: &str) -> Option<String> {
        let normalized = normalize(cleaned);
        self.basic_tiers(cleaned, &normalized)
            .or_else(|| self.case_tiers(cleaned, &normalized))
            .or_else(|| self.multi_line(cleaned))
    }

    /// Exact, normalized, collapsed and normalized-collapsed.
    fn basic_tiers(&self, cleaned: &str, normalized: &str) -> Option<String> {
        self.ui(cleaned)
            .or_else(|| self.ui(normalized))
            .or_else(|| self.ui(&collapse_newlines(cleaned)))
            .or_else(|| self.ui(&collapse_newlines(normalized)))
    }

    fn case_tiers(&self, cleaned: &str, normalized: &str) -> Option<String> {
        let candidates = [
            cleaned.to_uppercase(),
            cleaned.to_lowercase(),
            normalized.to_uppercase(),
            normalized.to_lowercase(),
            sentence_case(cleaned),
            sentence_case(normalized),
        ];
        if let Some(hit) = candidates.iter().find_map(|c| self.ui(c)) {
            return Some(hit);
        }
        let stripped = strip_accents(cleaned);
        self.ui(&stripped)
            .or_else(|| self.ui(&stripped.to_uppercase()))
    }

    fn multi_line(&self, cleaned: &str) -> Option<String> {
        if !cleaned.contains('\n') {
            return None;
        }
        let parts: Vec<&str> = cleaned.split('\n').collect();
        if !(MIN_MULTILINE_PARTS..=MAX_MULTILINE_PARTS).contains(&parts.len()) {
            return None;
        }

        let mut out = Vec::with_capacity(parts.len());
        let mut translated = 0usize;
        for part in parts {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                out.push(part.to_string());
                continue;
            }
            let hit = self.basic_tiers(trimmed, &normalize(trimmed))?;
            out.push(hit);
            translated += 1;
        }
        (translated > 0).then(|| out.join("\n"))
    }

    fn lookup_lowercase(&self, cleaned: &str) -> Option<String> {
        let trimmed = cleaned.trim();
        let hit = self.corpus.ui_lowercase(&trimmed.to_lowercase())?;
        if is_all_uppercase(trimmed) && !hit.is_empty() {
            Some(hit.to_uppercase())
        } else {
            Some(hit.to_string())
        }
    }

    fn ui(&self, key: &str) -> Option<String> {
        self.corpus.ui(key).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusSources;

    fn corpus(json: &str) -> Corpus {
        Corpus::build(&CorpusSources {
            ui_map: Some(json.to_string()),
            key_map: Some(r#"{"MENU_START": "Начать", "menu_quit": "Выход"}"#.to_string()),
            ..CorpusSources::default()
        })
    }

    #[test]
    fn exact_match_beats_case_insensitive_tier() {
        let c = corpus(r#"{"Hello": "А", "hello": "Б"}"#);
        let r = Resolver::new(&c);
        assert_eq!(r.resolve("Hello").as_deref(), Some("А"));
        assert_eq!(r.resolve("hello").as_deref(), Some("Б"));
        assert_eq!(r.resolve("HELLO").as_deref(), Some("Б"));
    }

    #[test]
    fn cyrillic_and_numeric_text_never_resolves() {
        let c = corpus(r#"{"Привет": "Привет", "22:00": "22:00", "__Привет__": "x"}"#);
        let r = Resolver::new(&c);
        assert_eq!(r.resolve("Привет"), None);
        assert_eq!(r.resolve("__Привет__"), None);
        assert_eq!(r.resolve("22:00"), None);
        assert_eq!(r.resolve("327.00 \u{20AC}"), None);
        assert_eq!(r.resolve(""), None);
    }

    #[test]
    fn normalized_collapsed_and_cased_tiers() {
        let c = corpus(r#"{"It's late": "Поздно", "Two words": "Два слова", "Start game": "Начать игру", "HERVE": "ЭРВЕ"}"#);
        let r = Resolver::new(&c);
        assert_eq!(r.resolve("It\u{2019}s late").as_deref(), Some("Поздно"));
        assert_eq!(r.resolve("  Two\r\nwords ").as_deref(), Some("Два слова"));
        assert_eq!(r.resolve("START GAME").as_deref(), Some("Начать игру"));
        assert_eq!(r.resolve("Herv\u{00E9}").as_deref(), Some("ЭРВЕ"));
    }

    #[test]
    fn multi_line_is_all_or_nothing() {
        let c = corpus(r#"{"Yes": "Да", "No": "Нет"}"#);
        let r = Resolver::new(&c);
        assert_eq!(r.resolve("Yes\n\nNo").as_deref(), Some("Да\n\nНет"));
        assert_eq!(r.resolve("Yes\nMaybe"), None);
        assert_eq!(r.resolve("\nYes\nNo\n").as_deref(), Some("\nДа\nНет\n"));
        let many = vec!["Yes"; 21].join("\n");
        assert_eq!(r.resolve(&many), None);
    }

    #[test]
    fn markers_are_stripped_before_lookup_and_returned_on_miss() {
        let c = corpus(r#"{"MENU": "Меню"}"#);
        let r = Resolver::new(&c);
        assert_eq!(r.resolve("__MENU__").as_deref(), Some("Меню"));
        assert_eq!(r.resolve("__UNKNOWN__").as_deref(), Some("UNKNOWN"));
        assert_eq!(r.resolve("UNKNOWN"), None);
    }

    #[test]
    fn line_fallback_uses_lowercase_index() {
        let c = corpus("{\"Wait\u{2026} what\": \"Стой... что\", \"gO aWay\": \"уходи\"}");
        let r = Resolver::new(&c);
        assert_eq!(r.resolve("Go Away"), None);
        assert_eq!(r.resolve_line("Go Away").as_deref(), Some("уходи"));
        assert_eq!(r.resolve_line("GO AWAY").as_deref(), Some("УХОДИ"));
        assert_eq!(r.resolve_line("GO AWAY!"), None);
        assert_eq!(r.resolve_line("wAIT... WHAT").as_deref(), Some("Стой... что"));
        assert_eq!(r.resolve_line("WAIT... WHAT").as_deref(), Some("Стой... что"));
    }

    #[test]
    fn keys_are_consulted_first() {
        let c = corpus(r#"{"Start": "Старт"}"#);
        let r = Resolver::new(&c);
        assert_eq!(r.resolve_key("MENU_START").as_deref(), Some("Начать"));
        assert_eq!(r.resolve_key("menu_start").as_deref(), Some("Начать"));
        assert_eq!(r.resolve_key("MENU_QUIT").as_deref(), Some("Выход"));
        assert_eq!(r.resolve_keyed(Some("MENU_START"), "Start").as_deref(), Some("Начать"));
        assert_eq!(r.resolve_keyed(Some("MISSING"), "Start").as_deref(), Some("Старт"));
        assert_eq!(r.resolve_keyed(None, "Start").as_deref(), Some("Старт"));
    }
}
