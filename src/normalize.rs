//! Text cleanup: whitespace collapsing and catalog title normalization.
//!
//! Catalog titles arrive as e.g. `"Anime and manga books With Appendix) Foo Bar Poster"`
//! and leave as `"Foo Bar + Poster"`. Every step is a plain string transform, so the
//! whole pipeline is deterministic and idempotent on its own output.

use once_cell::sync::Lazy;
use regex::Regex;

// Pre-compiled regex for whitespace normalization (compile once, use many times)
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").expect("Invalid whitespace regex pattern")
});

/// "With Appendix)"-style marker announcing a bonus item
static APPENDIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\(?\s*with\s+(?:appendix|appendices|bonus|extras?)\s*\)?")
        .expect("Invalid appendix regex")
});

/// Catalog category prefixes; they can stack ("Books Anime and manga books ...")
static CATEGORY_PREFIXES: &[&str] = &[
    "Anime and manga books",
    "Anime & manga books",
    "Game Strategy Guide Book",
    "Game strategy guides",
    "Illustration collection",
    "Setting materials",
    "Art book",
    "Artbook",
    "Magazines",
    "Books",
    "Others",
];

static PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    let alternatives = CATEGORY_PREFIXES
        .iter()
        .map(|p| regex::escape(p).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)^\s*(?:{})(?:\s*[:/|\-]\s*|\s+|$)", alternatives))
        .expect("Invalid prefix regex")
});

/// Bonus labels, most specific first
static BONUS_LABELS: &[&str] = &[
    "Spelling Poster",
    "Double-sided Poster",
    "B2 Poster",
    "Clear File",
    "Postcard Set",
    "Illustration Card",
    "Acrylic Stand",
    "Postcard",
    "Shikishi",
    "Booklet",
    "Bookmark",
    "Sticker",
    "Poster",
    "Card",
];

static THE_ART_OF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bthe\s+art\s+of\b").expect("Invalid art-of regex"));

static GLUED_ART_OF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([^\s\-:(/–])\s*\bart\s+of\b").expect("Invalid glued art-of regex")
});

static HYPHEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+-\s*").expect("Invalid hyphen regex"));

static RE_SOURCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bre\s*:\s*source\b").expect("Invalid re:source regex"));

static ROMAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[IVXLCDM]+$").expect("Invalid roman numeral regex"));

/// Upper-case tokens that stay upper-case
static ACRONYMS: &[&str] = &[
    "DVD", "OVA", "OST", "BGM", "RPG", "JRPG", "TRPG", "CG", "PS2", "PS3", "PS4", "PS5", "SNK",
    "NHK", "ISBN", "CLAMP", "TYPE-MOON", "NES", "SNES", "GBA", "3DS", "HD", "DX", "EX", "TV",
];

/// Normalize whitespace: collapse multiple spaces/newlines into single space
pub fn normalize_whitespace(content: &str) -> String {
    WHITESPACE_RE.replace_all(content, " ").trim().to_string()
}

/// Clean a raw catalog title into its display form
pub fn normalize_title(raw: &str) -> String {
    let mut title = raw.to_string();

    let label = detect_bonus_label(&title);

    loop {
        let stripped = PREFIX_RE.replace(&title, "").to_string();
        if stripped == title {
            break;
        }
        title = stripped;
    }

    title = THE_ART_OF_RE.replace_all(&title, "Art of").to_string();

    if let Some(label) = label {
        title = APPENDIX_RE.replace(&title, " ").to_string();
        if let Some(re) = label_regex(label) {
            title = re.replace(&title, " ").to_string();
        }
    }

    title = GLUED_ART_OF_RE.replace_all(&title, "$1 - Art of").to_string();
    title = HYPHEN_RE.replace_all(&title, " - ").to_string();
    title = RE_SOURCE_RE.replace_all(&title, "re:Source").to_string();
    title = normalize_whitespace(&title);
    title = recase_shouting(&title);

    match label {
        Some(label) if !title.is_empty() => format!("{} + {}", title, label),
        Some(label) => label.to_string(),
        None => title,
    }
}

/// Find the most specific bonus label following an appendix marker
pub fn detect_bonus_label(title: &str) -> Option<&'static str> {
    let marker = APPENDIX_RE.find(title)?;
    let after = &title[marker.end()..];
    let haystack = if after.trim().is_empty() { title } else { after };
    BONUS_LABELS
        .iter()
        .copied()
        .find(|label| label_regex(label).is_some_and(|re| re.is_match(haystack)))
}

fn label_regex(label: &str) -> Option<Regex> {
    let body = regex::escape(label).replace(' ', r"\s+");
    Regex::new(&format!(r"(?i)\b{}\b", body)).ok()
}

/// Title-case ALL-CAPS words longer than two characters, keeping roman numerals
/// and known acronyms as they are.
fn recase_shouting(title: &str) -> String {
    title
        .split(' ')
        .map(recase_token)
        .collect::<Vec<_>>()
        .join(" ")
}

fn recase_token(token: &str) -> String {
    let inner = token.trim_start_matches(|c: char| "([\"'【「".contains(c));
    let head = &token[..token.len() - inner.len()];
    let core = inner.trim_end_matches(|c: char| ".,:;!?)]\"'】」".contains(c));
    let tail = &inner[core.len()..];

    let has_letters = core.chars().any(char::is_alphabetic);
    let shouting = has_letters && !core.chars().any(char::is_lowercase);
    if !shouting
        || core.chars().count() <= 2
        || ROMAN_RE.is_match(core)
        || ACRONYMS.contains(&core)
    {
        return token.to_string();
    }

    let recased = core
        .split('-')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join("-");
    format!("{}{}{}", head, recased, tail)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
