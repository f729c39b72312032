//! Display units and word forms.
//!
//! A limit counts abstract events; the [`DisplayUnit`] only decides how the
//! count is spelled out ("10 items", "3 reports") and which short code appears
//! in the limit reference.

use serde::{Deserialize, Serialize};

/// Singular and plural spelling of a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WordForms {
    /// "day", "item".
    pub singular: &'static str,
    /// "days", "items".
    pub plural: &'static str,
}

impl WordForms {
    /// Create word forms from both spellings.
    pub const fn new(singular: &'static str, plural: &'static str) -> Self {
        Self { singular, plural }
    }

    /// The spelling that agrees with `count`.
    pub fn for_count(&self, count: u64) -> &'static str {
        if count == 1 { self.singular } else { self.plural }
    }
}

/// What a limit counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DisplayUnit {
    /// Generic pieces; the default unit, omitted from references.
    #[default]
    #[serde(rename = "item")]
    Item,
    /// Conventional (accounting) units.
    #[serde(rename = "cu")]
    ConventionalUnit,
    /// Generated reports.
    #[serde(rename = "report")]
    Report,
}

impl DisplayUnit {
    /// All predefined units.
    pub fn all() -> [Self; 3] {
        [Self::Item, Self::ConventionalUnit, Self::Report]
    }

    /// Full reference name.
    pub fn reference(&self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::ConventionalUnit => "cu",
            Self::Report => "report",
        }
    }

    /// Short code used inside limit references.
    pub fn short_code(&self) -> &'static str {
        match self {
            Self::Item => "i",
            Self::ConventionalUnit => "cu",
            Self::Report => "r",
        }
    }

    /// Abbreviation for compact text.
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Self::Item => "pcs.",
            Self::ConventionalUnit => "c.u.",
            Self::Report => "rep.",
        }
    }

    /// Display words.
    pub fn words(&self) -> WordForms {
        match self {
            Self::Item => WordForms::new("item", "items"),
            Self::ConventionalUnit => WordForms::new("conventional unit", "conventional units"),
            Self::Report => WordForms::new("report", "reports"),
        }
    }

    /// Look up a unit by its full name or short code.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|unit| unit.short_code() == code || unit.reference() == code)
    }

    /// Check if this is the unit omitted from references.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_either_code() {
        assert_eq!(DisplayUnit::from_code("i"), Some(DisplayUnit::Item));
        assert_eq!(DisplayUnit::from_code("item"), Some(DisplayUnit::Item));
        assert_eq!(DisplayUnit::from_code("r"), Some(DisplayUnit::Report));
        assert_eq!(DisplayUnit::from_code("cu"), Some(DisplayUnit::ConventionalUnit));
        assert_eq!(DisplayUnit::from_code("kg"), None);
    }

    #[test]
    fn test_word_agreement() {
        let words = DisplayUnit::Report.words();
        assert_eq!(words.for_count(1), "report");
        assert_eq!(words.for_count(0), "reports");
        assert_eq!(words.for_count(5), "reports");
    }
}
