use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub const CURRENCY_SYMBOLS: [char; 4] = ['\u{20AC}', '$', '\u{00A3}', '\u{00A5}'];

const MARKER: &str = "__";

static DECIMAL_DIGIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{Nd}").expect("decimal digit regex"));

/// Replaces typographic punctuation with its plain ASCII counterpart.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2026}' => out.push_str("..."),
            '\u{00AB}' => out.push('<'),
            '\u{00BB}' => out.push('>'),
            '\u{00A0}' => out.push(' '),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            _ => out.push(ch),
        }
    }
    out
}

/// Drops combining marks after canonical decomposition (HERVÉ -> HERVE).
///
/// Marks attached to a Cyrillic base are kept, so `й` and `ё` come back intact.
pub fn strip_accents(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut base_is_cyrillic = false;
    for ch in text.nfd() {
        if is_combining_mark(ch) {
            if base_is_cyrillic {
                out.push(ch);
            }
            continue;
        }
        base_is_cyrillic = is_cyrillic(ch);
        out.push(ch);
    }
    out.nfc().collect()
}

/// Amounts, clock times and bare numbers are formatted at runtime and never looked up.
pub fn is_currency_or_time_like(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }

    let has_currency = trimmed.contains(&CURRENCY_SYMBOLS[..]);
    // Decimal digits only: fractions and superscripts count as neither digit nor letter.
    let digits = DECIMAL_DIGIT_RE.find_iter(trimmed).count();
    let letters = trimmed.chars().filter(|c| c.is_alphabetic()).count();

    if has_currency && digits > letters {
        return true;
    }
    if trimmed.chars().count() <= 10 && trimmed.contains(':') && digits >= 2 && letters == 0 {
        return true;
    }
    letters == 0 && digits > 0
}

#[inline]
pub fn is_cyrillic(ch: char) -> bool {
    ('\u{0400}'..='\u{04FF}').contains(&ch)
}

pub fn has_cyrillic(text: &str) -> bool {
    text.chars().any(is_cyrillic)
}

/// Uppercase Cyrillic letter (А..Я plus Ё).
#[inline]
pub fn is_cyrillic_upper(ch: char) -> bool {
    ('\u{0410}'..='\u{042F}').contains(&ch) || ch == '\u{0401}'
}

/// True when no letter in `text` is lowercase.
pub fn is_all_uppercase(text: &str) -> bool {
    text.chars()
        .filter(|c| c.is_alphabetic())
        .all(char::is_uppercase)
}

/// First character upper-cased, the rest lower-cased.
pub fn sentence_case(text: &str) -> String {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let mut out = String::with_capacity(text.len());
    out.extend(first.to_uppercase());
    out.push_str(&chars.as_str().to_lowercase());
    out
}

/// Trims, drops carriage returns and folds newlines into spaces.
pub fn collapse_newlines(text: &str) -> String {
    text.trim().replace('\r', "").replace('\n', " ")
}

/// Returns the inner text of a `__key__` marker pair, if present.
pub fn strip_markers(text: &str) -> Option<&str> {
    if text.len() > 2 * MARKER.len() && text.starts_with(MARKER) && text.ends_with(MARKER) {
        Some(&text[MARKER.len()..text.len() - MARKER.len()])
    } else {
        None
    }
}

/// Inserts the missing space in `"Да.Нет"` style joins. Runs like `...` or `?!` are left alone
/// when the repeated character is the one touching the Cyrillic letter.
pub fn fix_punctuation_spacing(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len() + 8);
    for (i, &ch) in chars.iter().enumerate() {
        out.push(ch);
        if !matches!(ch, '.' | '?' | '!') {
            continue;
        }
        let next_is_cyrillic = chars.get(i + 1).is_some_and(|&n| is_cyrillic(n));
        let repeated = i > 0 && chars[i - 1] == ch;
        if next_is_cyrillic && !repeated {
            out.push(' ');
        }
    }
    out
}
