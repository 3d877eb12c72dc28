//! Text snapshot of the host's compiled dialogue objects.
//!
//! ```text
//! OBJ 001_patricia_01 2
//! P intro 2 1
//! L PATRICIA: "Hello."
//! L $$wait 1
//! C Yes	next
//! ```
//!
//! Payloads escape `\\`, newlines, carriage returns and tabs so every record stays on one line.

use std::path::Path;

use anyhow::Context;
use tracing::warn;

use crate::reconcile::{DialogueChoice, DialogueObject, InstanceId};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DumpedPassage {
    pub title: String,
    pub lines: Vec<String>,
    pub choices: Vec<DialogueChoice>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DumpedObject {
    pub name: String,
    pub instance: InstanceId,
    pub passages: Vec<DumpedPassage>,
}

impl DialogueObject for DumpedObject {
    fn instance_id(&self) -> InstanceId {
        self.instance
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn passage_count(&self) -> usize {
        self.passages.len()
    }

    fn passage_title(&self, passage: usize) -> Option<&str> {
        self.passages.get(passage).map(|p| p.title.as_str())
    }

    fn passage_lines(&self, passage: usize) -> Vec<String> {
        self.passages
            .get(passage)
            .map(|p| p.lines.clone())
            .unwrap_or_default()
    }

    fn set_passage_lines(&mut self, passage: usize, lines: Vec<String>) {
        if let Some(p) = self.passages.get_mut(passage) {
            p.lines = lines;
        }
    }

    fn choices(&self, passage: usize) -> Vec<DialogueChoice> {
        self.passages
            .get(passage)
            .map(|p| p.choices.clone())
            .unwrap_or_default()
    }

    fn set_choices(&mut self, passage: usize, choices: Vec<DialogueChoice>) {
        if let Some(p) = self.passages.get_mut(passage) {
            p.choices = choices;
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassageDump {
    pub objects: Vec<DumpedObject>,
}

impl PassageDump {
    /// Parses a dump; malformed lines are skipped. Objects get instance ids in file order,
    /// starting at 1.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let text = text.trim_start_matches('\u{FEFF}');
        let mut objects: Vec<DumpedObject> = Vec::new();

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix("OBJ ") {
                let Some((name, _count)) = split_counts::<1>(rest) else {
                    warn!(line = lineno + 1, "malformed OBJ line in passage dump");
                    continue;
                };
                let instance = objects.len() as InstanceId + 1;
                objects.push(DumpedObject {
                    name: name.to_string(),
                    instance,
                    passages: Vec::new(),
                });
                continue;
            }

            let Some(object) = objects.last_mut() else {
                warn!(line = lineno + 1, "passage dump content before first OBJ");
                continue;
            };

            if let Some(rest) = line.strip_prefix("P ") {
                let Some((title, _counts)) = split_counts::<2>(rest) else {
                    warn!(line = lineno + 1, "malformed P line in passage dump");
                    continue;
                };
                object.passages.push(DumpedPassage {
                    title: title.to_string(),
                    ..DumpedPassage::default()
                });
                continue;
            }

            let Some(passage) = object.passages.last_mut() else {
                warn!(line = lineno + 1, "passage dump content before first P");
                continue;
            };

            if line == "L" {
                passage.lines.push(String::new());
            } else if let Some(rest) = line.strip_prefix("L ") {
                passage.lines.push(unescape(rest));
            } else if let Some(rest) = line.strip_prefix("C ") {
                let (text, link) = rest.rsplit_once('\t').unwrap_or((rest, ""));
                passage.choices.push(DialogueChoice {
                    text: unescape(text),
                    link: (!link.is_empty()).then(|| unescape(link)),
                });
            } else {
                warn!(line = lineno + 1, "unrecognised passage dump line");
            }
        }

        Self { objects }
    }

    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read passage dump: {}", path.display()))?;
        let (text, _) = encoding_rs::UTF_8.decode_with_bom_removal(&bytes);
        Ok(Self::parse(&text))
    }

    /// Every passage title, in dump order, each once.
    #[must_use]
    pub fn known_titles(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.objects
            .iter()
            .flat_map(|o| o.passages.iter())
            .filter(|p| seen.insert(p.title.as_str()))
            .map(|p| p.title.clone())
            .collect()
    }

    #[must_use]
    pub fn passage_count(&self) -> usize {
        self.objects.iter().map(|o| o.passages.len()).sum()
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for object in &self.objects {
            out.push_str(&format!("OBJ {} {}\n", object.name, object.passages.len()));
            for p in &object.passages {
                out.push_str(&format!("P {} {} {}\n", p.title, p.lines.len(), p.choices.len()));
                for line in &p.lines {
                    out.push_str("L ");
                    escape_into(&mut out, line);
                    out.push('\n');
                }
                for c in &p.choices {
                    out.push_str("C ");
                    escape_into(&mut out, &c.text);
                    out.push('\t');
                    escape_into(&mut out, c.link.as_deref().unwrap_or(""));
                    out.push('\n');
                }
            }
        }
        out
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir: {}", parent.display()))?;
        }
        std::fs::write(path, self.render())
            .with_context(|| format!("write passage dump: {}", path.display()))?;
        Ok(())
    }
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
}

/// Inverse of [`escape_into`]; unknown escapes are kept verbatim.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// `"<name with spaces> n1 .. nN"` -> name, provided the last `N` tokens are counts.
fn split_counts<const N: usize>(rest: &str) -> Option<(&str, [usize; N])> {
    let mut counts = [0usize; N];
    let mut head = rest.trim_end();
    for slot in counts.iter_mut().rev() {
        let (before, last) = head.rsplit_once(' ')?;
        *slot = last.parse().ok()?;
        head = before;
    }
    let name = head.trim();
    (!name.is_empty()).then_some((name, counts))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "\u{FEFF}OBJ 001_patricia_01 2\nP intro 2 1\nL PATRICIA: \"Hello.\"\nL \nC Yes\tnext\nP customer add clue 0 0\ngarbage\nOBJ 002_bob 1\nP intro 0 1\nC Leave\t\n";

    #[test]
    fn parses_objects_passages_lines_and_choices() {
        let dump = PassageDump::parse(DUMP);
        assert_eq!(dump.objects.len(), 2);
        let patricia = &dump.objects[0];
        assert_eq!(patricia.instance, 1);
        assert_eq!(patricia.passages[0].lines, vec!["PATRICIA: \"Hello.\"".to_string(), String::new()]);
        assert_eq!(patricia.passages[0].choices, vec![DialogueChoice::new("Yes", "next")]);
        assert_eq!(patricia.passages[1].title, "customer add clue");
        assert_eq!(dump.objects[1].passages[0].choices[0].link, None);
        assert_eq!(dump.known_titles(), vec!["intro".to_string(), "customer add clue".to_string()]);
        assert_eq!(dump.passage_count(), 3);
    }

    #[test]
    fn render_is_parseable() {
        let dump = PassageDump::parse(DUMP);
        assert_eq!(PassageDump::parse(&dump.render()), dump);
    }

    #[test]
    fn multi_line_payloads_survive_render_and_parse() {
        let mut dump = PassageDump::parse("OBJ a 1\nP t 1 1\nL x\nC Go\tnext\n");
        let passage = &mut dump.objects[0].passages[0];
        passage.lines[0] = "Да\nНет\r\nC:\\path".to_string();
        passage.choices[0].text = "Tab\there".to_string();

        let rendered = dump.render();
        assert_eq!(rendered.lines().count(), 4);
        assert_eq!(PassageDump::parse(&rendered), dump);
    }

    #[test]
    fn choice_link_is_the_last_tab_field() {
        let dump = PassageDump::parse("OBJ a 1\nP t 0 1\nC left\tright\tlink\n");
        let choice = &dump.objects[0].passages[0].choices[0];
        assert_eq!(choice.text, "left\tright");
        assert_eq!(choice.link.as_deref(), Some("link"));
    }

    #[test]
    fn malformed_headers_are_skipped() {
        let dump = PassageDump::parse("OBJ nocount\nP t 1 1\nOBJ ok 1\nP t x 1\nP t 1 1\nL a\n");
        assert_eq!(dump.objects.len(), 1);
        assert_eq!(dump.objects[0].name, "ok");
        assert_eq!(dump.objects[0].passages.len(), 1);
        assert_eq!(dump.objects[0].instance, 1);
    }

    #[test]
    fn dumped_object_implements_adapter() {
        let mut obj = PassageDump::parse(DUMP).objects.remove(0);
        assert_eq!(obj.passage_count(), 2);
        assert_eq!(obj.passage_title(1), Some("customer add clue"));
        obj.set_passage_lines(0, vec!["x".to_string()]);
        assert_eq!(obj.passage_lines(0), vec!["x".to_string()]);
        assert!(obj.passage_lines(9).is_empty());
    }
}
