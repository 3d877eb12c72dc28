use serde_json::{Map, Value};
use tracing::warn;

/// Ordered `key -> value` pairs read from a flat JSON object.
#[derive(Clone, Debug, Default)]
pub struct FlatPairs {
    pub pairs: Vec<(String, String)>,
    pub skipped: usize,
}

/// Reads a flat string-to-string JSON object.
///
/// Well-formed documents go through `serde_json`; non-string values and empty keys or values are
/// skipped. A document that does not parse as a whole is scanned pair by pair instead, so one
/// broken entry never takes the rest of the file down with it.
pub fn parse_flat_map(text: &str, source: &str) -> FlatPairs {
    let text = text.trim_start_matches('\u{FEFF}');
    match serde_json::from_str::<Map<String, Value>>(text) {
        Ok(map) => {
            let mut out = FlatPairs::default();
            for (key, value) in map {
                match value {
                    Value::String(v) if !key.is_empty() && !v.is_empty() => out.pairs.push((key, v)),
                    other => {
                        out.skipped += 1;
                        warn!(source, key = %key, value = %other, "skipping non-string map entry");
                    }
                }
            }
            out
        }
        Err(err) => {
            warn!(source, error = %err, "map is not valid JSON, scanning entries leniently");
            scan_pairs(text, source)
        }
    }
}

fn scan_pairs(text: &str, source: &str) -> FlatPairs {
    let body = text.trim();
    let body = body.strip_prefix('{').unwrap_or(body);
    let body = body.strip_suffix('}').unwrap_or(body);
    let chars: Vec<char> = body.chars().collect();

    let mut out = FlatPairs::default();
    let mut i = 0usize;
    while i < chars.len() {
        while i < chars.len() && chars[i] != '"' {
            i += 1;
        }
        let Some((key, next)) = read_string(&chars, i) else {
            break;
        };
        i = skip_ws(&chars, next);
        if chars.get(i) != Some(&':') {
            out.skipped += 1;
            warn!(source, key = %key, "entry without ':' separator");
            continue;
        }
        i = skip_ws(&chars, i + 1);
        if chars.get(i) != Some(&'"') {
            out.skipped += 1;
            warn!(source, key = %key, "entry value is not a string");
            i = skip_past_comma(&chars, i);
            continue;
        }
        let Some((value, next)) = read_string(&chars, i) else {
            out.skipped += 1;
            warn!(source, key = %key, "unterminated string value");
            break;
        };
        if key.is_empty() || value.is_empty() {
            out.skipped += 1;
        } else {
            out.pairs.push((key, value));
        }
        i = skip_past_comma(&chars, next);
    }
    out
}

fn read_string(chars: &[char], start: usize) -> Option<(String, usize)> {
    if chars.get(start) != Some(&'"') {
        return None;
    }
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '"' => return Some((out, i + 1)),
            '\\' => {
                let esc = *chars.get(i + 1)?;
                match esc {
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    '"' => out.push('"'),
                    '\\' => out.push('\\'),
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                }
                i += 2;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    None
}

fn skip_ws(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

fn skip_past_comma(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i] != ',' {
        i += 1;
    }
    i + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_document_in_order() {
        let text = "\u{FEFF}{\"Hello\": \"Привет\", \"Bye\": \"Пока\", \"Line\\nTwo\": \"А\\nБ\"}";
        let parsed = parse_flat_map(text, "test");
        assert_eq!(parsed.skipped, 0);
        assert_eq!(
            parsed.pairs,
            vec![
                ("Hello".to_string(), "Привет".to_string()),
                ("Bye".to_string(), "Пока".to_string()),
                ("Line\nTwo".to_string(), "А\nБ".to_string()),
            ]
        );
    }

    #[test]
    fn skips_non_string_and_empty_values() {
        let parsed = parse_flat_map(r#"{"a": 1, "b": "", "c": "в", "": "x"}"#, "test");
        assert_eq!(parsed.pairs, vec![("c".to_string(), "в".to_string())]);
        assert_eq!(parsed.skipped, 3);
    }

    #[test]
    fn malformed_document_keeps_good_entries() {
        let text = "{\n \"One\": \"Один\",\n \"Two\": 2,\n \"Three\": \"Три\\\"\",\n \"Four\" \"Четыре\",\n \"Five\": \"Пять\"\n";
        let parsed = parse_flat_map(text, "test");
        let keys: Vec<&str> = parsed.pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["One", "Three", "Five"]);
        assert_eq!(parsed.pairs[1].1, "Три\"");
        assert!(parsed.skipped >= 2);
    }
}
