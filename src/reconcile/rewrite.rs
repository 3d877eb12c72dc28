use std::collections::{HashMap, HashSet};

use crate::corpus::ReverseSpeakerMap;
use crate::markup::{
    emphasize, is_command, is_navigation, speaker_name, speaker_text, split_emote,
    starts_with_quote, strip_dialogue_artifacts, to_guillemets, unquoted_speaker,
    SpeakerSeparator,
};

/// Speaker names in order of first appearance, each once.
pub fn ordered_speakers<'l, I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = &'l S>,
    S: AsRef<str> + 'l + ?Sized,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for line in lines {
        if let Some(name) = speaker_name(line.as_ref()) {
            if seen.insert(name) {
                out.push(name.to_string());
            }
        }
    }
    out
}

/// Maps translated speaker names back to the names the host's dialogue parser expects.
///
/// Lookup order: position within the passage, then the global reverse map, then the translated
/// name itself.
pub struct SpeakerRemap<'a> {
    positional: HashMap<String, String>,
    reverse: &'a ReverseSpeakerMap,
}

impl<'a> SpeakerRemap<'a> {
    #[must_use]
    pub fn new(original: &[String], translated: &[String], reverse: &'a ReverseSpeakerMap) -> Self {
        let positional = translated
            .iter()
            .zip(original)
            .map(|(t, o)| (t.clone(), o.clone()))
            .collect();
        Self { positional, reverse }
    }

    #[must_use]
    pub fn knows(&self, name: &str) -> bool {
        self.positional.contains_key(name) || self.reverse.contains(name)
    }

    #[must_use]
    pub fn printable<'n>(&'n self, translated: &'n str) -> &'n str {
        self.positional
            .get(translated)
            .map(String::as_str)
            .or_else(|| self.reverse.get(translated))
            .unwrap_or(translated)
    }

    #[must_use]
    pub fn positional_len(&self) -> usize {
        self.positional.len()
    }
}

/// Rewrites translated passage lines into the shape the host renders, using the original lines
/// for speaker correspondence and separator format.
pub fn rewrite_lines(
    original: &[String],
    replacement: &[String],
    reverse: &ReverseSpeakerMap,
) -> Vec<String> {
    let original_speakers = ordered_speakers(original);
    let translated_speakers = ordered_speakers(replacement);
    let remap = SpeakerRemap::new(&original_speakers, &translated_speakers, reverse);
    let separator = SpeakerSeparator::detect(original.iter().map(String::as_str));

    replacement
        .iter()
        .map(|line| rewrite_line(line, &remap, separator))
        .collect()
}

fn rewrite_line(line: &str, remap: &SpeakerRemap<'_>, separator: SpeakerSeparator) -> String {
    if is_navigation(line) {
        return line.to_string();
    }

    let mut processed = line;
    if let Some((_, rest)) = split_emote(line) {
        let rest = rest.trim();
        if !rest.is_empty() {
            processed = rest;
        }
    }

    // Speaker shape is judged on the unstripped line.
    if let Some(name) = speaker_name(line) {
        return match speaker_text(line) {
            Some(text) => format!("{}{}{}", remap.printable(name), separator.as_str(), text),
            None => processed.to_string(),
        };
    }

    let trimmed = processed.trim();
    if trimmed.is_empty() || is_command(trimmed) {
        return processed.to_string();
    }

    if let Some((name, rest)) = unquoted_speaker(trimmed).filter(|(n, _)| remap.knows(n)) {
        let text = strip_dialogue_artifacts(rest);
        return format!("{}{}\"{}\"", remap.printable(name), separator.as_str(), text);
    }
    if starts_with_quote(trimmed) {
        return to_guillemets(trimmed);
    }
    if trimmed.starts_with('\u{00AB}') {
        return processed.to_string();
    }
    emphasize(processed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn speakers_are_ordered_and_unique() {
        let src = lines(&["B: \"1\"", "narration", "A : \"2\"", "B: \"3\""]);
        assert_eq!(ordered_speakers(&src), vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn positional_mapping_follows_appearance_order() {
        let original = lines(&["ALICE: \"Hi\"", "BOB: \"Hey\"", "BOB: \"Bye\""]);
        let replacement = lines(&["Я: \"Привет\"", "Б: \"Эй\"", "Б: \"Пока\""]);
        let out = rewrite_lines(&original, &replacement, &ReverseSpeakerMap::new());
        assert_eq!(out, lines(&["ALICE: \"Привет\"", "BOB: \"Эй\"", "BOB: \"Пока\""]));
    }

    #[test]
    fn remap_falls_back_to_reverse_map_then_verbatim() {
        let mut reverse = ReverseSpeakerMap::new();
        reverse.learn([("CAROL", "КЭРОЛ")]);
        let original = lines(&["ALICE : \"Hi\""]);
        let replacement = lines(&["Я: \"Привет\"", "КЭРОЛ: \"Да\"", "ДЕД: \"Ну\""]);
        let out = rewrite_lines(&original, &replacement, &reverse);
        assert_eq!(
            out,
            lines(&["ALICE : \"Привет\"", "CAROL : \"Да\"", "ДЕД : \"Ну\""])
        );
    }

    #[test]
    fn line_shapes_are_rewritten() {
        let mut reverse = ReverseSpeakerMap::new();
        reverse.learn([("CAROL", "КЭРОЛ")]);
        let original = lines(&["BOB: \"x\""]);
        let replacement = lines(&[
            "go_back ;; cond",
            ":silence: ...",
            "КЭРОЛ: \u{2014} 'Ну и ну",
            "ГРОМКО: шёпот",
            "\"Садитесь\" - сказал я.",
            "\u{00AB} Уже \u{00BB}",
            "$$wait 1",
            "",
            "Дождь шёл.",
        ]);
        let out = rewrite_lines(&original, &replacement, &reverse);
        assert_eq!(
            out,
            lines(&[
                "go_back ;; cond",
                "<i>...</i>",
                "CAROL: \"Ну и ну\"",
                "<i>ГРОМКО: шёпот</i>",
                "\u{00AB} Садитесь - сказал я. \u{00BB}",
                "\u{00AB} Уже \u{00BB}",
                "$$wait 1",
                "",
                "<i>Дождь шёл.</i>",
            ])
        );
    }

    #[test]
    fn separator_comes_from_original_lines() {
        let original = lines(&["narration", "BOB : \u{00AB}Hi\u{00BB}"]);
        let replacement = lines(&["БОБ: \"Привет\""]);
        let out = rewrite_lines(&original, &replacement, &ReverseSpeakerMap::new());
        assert_eq!(out, lines(&["BOB : \"Привет\""]));
    }
}
