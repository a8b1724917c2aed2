/*!
 * Language utilities for BCP 47 style language codes.
 *
 * The engine only ever compares languages by their primary subtag
 * (`fr-CA` and `fr` are the same language for rendering purposes).
 */

use isolang::Language;
use once_cell::sync::Lazy;
use regex::Regex;

/// Primary subtags written right-to-left
pub const RTL_LANGUAGES: [&str; 10] = ["ar", "fa", "he", "ur", "ps", "ku", "dv", "yi", "sd", "ug"];

static LANGUAGE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}(?:[-_][A-Za-z0-9]{1,8})*$").expect("language tag pattern is valid")
});

/// Text direction of a language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDirection {
    LeftToRight,
    RightToLeft,
}

impl TextDirection {
    /// Value of the `dir` attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeftToRight => "ltr",
            Self::RightToLeft => "rtl",
        }
    }
}

/// Normalize separators and surrounding whitespace (`pt_BR ` -> `pt-BR`)
pub fn normalize_tag(code: &str) -> String {
    code.trim().replace('_', "-")
}

/// Lowercase primary subtag of a language code
pub fn primary_subtag(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Check whether two codes name the same language
pub fn primary_subtags_match(code1: &str, code2: &str) -> bool {
    let primary1 = primary_subtag(code1);
    !primary1.is_empty() && primary1 == primary_subtag(code2)
}

/// Whether the code is shaped like a language tag
pub fn is_well_formed(code: &str) -> bool {
    LANGUAGE_TAG.is_match(code.trim())
}

pub fn is_rtl(code: &str) -> bool {
    let primary = primary_subtag(code);
    RTL_LANGUAGES.contains(&primary.as_str())
}

pub fn text_direction(code: &str) -> TextDirection {
    if is_rtl(code) {
        TextDirection::RightToLeft
    } else {
        TextDirection::LeftToRight
    }
}

fn lookup(code: &str) -> Option<Language> {
    let primary = primary_subtag(code);
    match primary.len() {
        2 => Language::from_639_1(&primary),
        3 => Language::from_639_3(&primary),
        _ => None,
    }
}

/// Name of the language in the language itself, when known
pub fn native_name(code: &str) -> Option<String> {
    lookup(code).and_then(|lang| lang.to_autonym().map(|name| name.to_string()))
}

/// English name of the language, when known
pub fn english_name(code: &str) -> Option<String> {
    lookup(code).map(|lang| lang.to_name().to_string())
}

/// Language of the process environment (`LC_ALL`, then `LANG`)
///
/// POSIX locales such as `fr_FR.UTF-8` become `fr-FR`; the `C` and `POSIX`
/// locales carry no language.
pub fn environment_language() -> Option<String> {
    ["LC_ALL", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(|value| locale_to_tag(&value))
}

/// Convert a POSIX locale string into a language tag
pub fn locale_to_tag(locale: &str) -> Option<String> {
    let base = locale.split(['.', '@']).next().unwrap_or_default().trim();
    if base.is_empty() || base.eq_ignore_ascii_case("c") || base.eq_ignore_ascii_case("posix") {
        return None;
    }

    let tag = normalize_tag(base);
    is_well_formed(&tag).then_some(tag)
}
