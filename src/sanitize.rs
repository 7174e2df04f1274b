use std::borrow::Cow;

use encoding_rs::WINDOWS_1252;

/// Cleans a channel name scraped out of a playlist.
///
/// Repairs UTF-8 text that was mis-decoded as a single-byte encoding, drops every
/// character that isn't a CJK ideograph, an ASCII letter or digit, whitespace, `-`,
/// `_` or `#`, then trims the result. Never fails; the output may be empty.
#[must_use]
pub fn sanitize(raw: &str) -> String {
    let repaired = repair_mojibake(raw).map_or(Cow::Borrowed(raw), Cow::Owned);

    repaired
        .chars()
        .filter(|&c| is_kept(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Re-reads a mis-decoded string as UTF-8.
///
/// Returns `None` when the string is plain ASCII or when its single-byte form is not
/// valid UTF-8, in which case the caller keeps the original.
#[must_use]
pub fn repair_mojibake(raw: &str) -> Option<String> {
    if raw.is_ascii() {
        return None;
    }

    let bytes = latin1_bytes(raw).or_else(|| windows_1252_bytes(raw))?;
    String::from_utf8(bytes).ok().filter(|s| s != raw)
}

fn latin1_bytes(s: &str) -> Option<Vec<u8>> {
    s.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}

fn windows_1252_bytes(s: &str) -> Option<Vec<u8>> {
    let (bytes, _, had_unmappable) = WINDOWS_1252.encode(s);
    (!had_unmappable).then(|| bytes.into_owned())
}

fn is_kept(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_whitespace() || matches!(c, '-' | '_' | '#') || is_cjk(c)
}

const fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2A6DF}')
}
