//! Text preparation for plain-text (`parse_mode=none`) delivery.
//!
//! Telegram renders plain-text messages literally, so anything left over from
//! an HTML template (tags, entities, indentation) would show up verbatim.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Prepare composed text for plain-text delivery.
///
/// Strips markup tags, decodes HTML entities, removes trailing whitespace and
/// collapses any whitespace run that follows a newline down to the newline.
pub fn sanitize_plain_text(input: &str) -> String {
    let stripped = strip_tags(input);
    let decoded = decode_html_entities(&stripped);
    let trimmed = decoded.trim_end();
    newline_indent_re().replace_all(trimmed, "\n").into_owned()
}

/// Remove markup tags and comments. A tag or comment left open at the end of
/// the input is removed too. A bare `<` that does not open a tag (e.g.
/// `a < b`) is kept.
pub fn strip_tags(input: &str) -> String {
    tag_re().replace_all(input, "").into_owned()
}

/// Decode named and numeric HTML entities in a single pass, so `&amp;lt;`
/// becomes `&lt;` rather than `<`. Unknown entities are left untouched.
pub fn decode_html_entities(input: &str) -> String {
    entity_re()
        .replace_all(input, |caps: &Captures<'_>| {
            let body = &caps[1];
            decode_entity(body).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_entity(body: &str) -> Option<String> {
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }

    let ch = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "laquo" => '\u{ab}',
        "raquo" => '\u{bb}',
        "hellip" => '\u{2026}',
        "bull" => '\u{2022}',
        "middot" => '\u{b7}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "trade" => '\u{2122}',
        "euro" => '\u{20ac}',
        "pound" => '\u{a3}',
        "yen" => '\u{a5}',
        "cent" => '\u{a2}',
        "deg" => '\u{b0}',
        "times" => '\u{d7}',
        _ => return None,
    };
    Some(ch.to_string())
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<!--.*?(?:-->|$)|</?[A-Za-z!?][^>]*(?:>|$)").expect("valid regex")
    })
}

fn entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});")
            .expect("valid regex")
    })
}

fn newline_indent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s+").expect("valid regex"))
}
