/*!
 * Tests for language utility functions
 */

use tovik::language_utils::{
    TextDirection, english_name, is_rtl, is_well_formed, native_name, normalize_tag,
    primary_subtags_match, text_direction,
};

/// Test matching of language codes by primary subtag
#[test]
fn test_primarySubtagsMatch_withRegionalVariants_shouldMatch() {
    assert!(primary_subtags_match("fr", "fr-CA"));
    assert!(primary_subtags_match("EN-gb", "en_US"));
    assert!(primary_subtags_match("pt-BR", "pt"));

    assert!(!primary_subtags_match("fr", "de"));
    assert!(!primary_subtags_match("", ""));
    assert!(!primary_subtags_match("en", ""));
}

/// Test normalization of separators and whitespace
#[test]
fn test_normalizeTag_withUnderscore_shouldUseHyphen() {
    assert_eq!(normalize_tag("pt_BR"), "pt-BR");
    assert_eq!(normalize_tag("  fr "), "fr");
    assert_eq!(normalize_tag("zh-Hant"), "zh-Hant");
}

/// Test language tag shape validation
#[test]
fn test_isWellFormed_withVariousCodes_shouldValidateShape() {
    for code in ["en", "fra", "pt-BR", "zh-Hant-TW", "es_419"] {
        assert!(is_well_formed(code), "{}", code);
    }
    for code in ["", "e", "english language", "12", "fr--CA"] {
        assert!(!is_well_formed(code), "{}", code);
    }
}

/// Test text direction detection
#[test]
fn test_isRtl_withCommonLanguages_shouldDetectDirection() {
    assert!(is_rtl("ar"));
    assert!(is_rtl("fa-IR"));
    assert!(is_rtl("HE"));
    assert!(!is_rtl("en"));
    assert!(!is_rtl("ja"));

    assert_eq!(text_direction("ur").as_str(), "rtl");
    assert_eq!(text_direction("de").as_str(), "ltr");
    assert_eq!(text_direction("ar"), TextDirection::RightToLeft);
}

/// Test language name lookups
#[test]
fn test_languageNames_withKnownAndUnknownCodes_shouldResolve() {
    assert_eq!(english_name("fr").as_deref(), Some("French"));
    assert_eq!(english_name("deu").as_deref(), Some("German"));
    assert_eq!(english_name("en-GB").as_deref(), Some("English"));
    assert!(native_name("fr").is_some());

    assert!(english_name("xx").is_none());
    assert!(native_name("").is_none());
}
