use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SubmintError;

/// Label of the untranslated transcript track
pub const ORIGINAL_LABEL: &str = "Original";

/// Target languages offered by the processing service.
///
/// Variant order is the display order and the order of the comma-joined
/// `target_languages` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    French,
    Spanish,
    German,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::French, Language::Spanish, Language::German];

    /// Code sent to and returned by the processing service
    pub fn code(&self) -> &'static str {
        match self {
            Self::French => "french",
            Self::Spanish => "spanish",
            Self::German => "german",
        }
    }

    pub fn iso_code(&self) -> &'static str {
        match self {
            Self::French => "fr",
            Self::Spanish => "es",
            Self::German => "de",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::French => "French",
            Self::Spanish => "Spanish",
            Self::German => "German",
        }
    }

    /// Lenient lookup used on server responses, which may key translations
    /// by service code or ISO code
    pub fn lookup(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|lang| {
            value.eq_ignore_ascii_case(lang.code())
                || value.eq_ignore_ascii_case(lang.iso_code())
                || value.eq_ignore_ascii_case(lang.label())
        })
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Language {
    type Err = SubmintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| {
            SubmintError::Validation(format!("Unsupported target language: {}", s))
        })
    }
}

/// Display label for a translation key returned by the service.
/// Unknown keys get their first letter upper-cased.
pub fn display_label(key: &str) -> String {
    if let Some(lang) = Language::lookup(key) {
        return lang.label().to_string();
    }
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Parse a comma-separated language list, e.g. from the command line
pub fn parse_language_list(value: &str) -> Result<Vec<Language>, SubmintError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Language::from_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_accepts_codes_and_labels() {
        assert_eq!(Language::lookup("fr"), Some(Language::French));
        assert_eq!(Language::lookup("French"), Some(Language::French));
        assert_eq!(Language::lookup("GERMAN"), Some(Language::German));
        assert_eq!(Language::lookup("klingon"), None);
    }

    #[test]
    fn test_display_label() {
        assert_eq!(display_label("es"), "Spanish");
        assert_eq!(display_label("french"), "French");
        assert_eq!(display_label("italian"), "Italian");
        assert_eq!(display_label(""), "");
    }

    #[test]
    fn test_parse_language_list() {
        let langs = parse_language_list("french, de,,Spanish").unwrap();
        assert_eq!(langs, vec![Language::French, Language::German, Language::Spanish]);
        assert!(parse_language_list("french,latin").is_err());
    }
}
