//! News categories
//!
//! A closed set of lowercase single tokens. The same token is written to the
//! vector store metadata by the ingestion job and compared against by the
//! query orchestrator.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Category {
    Politics,
    Sports,
    Tech,
    Business,
    Entertainment,
    Health,
    Science,
    World,
    Environment,
    Military,
    Crime,
    Economy,
    #[default]
    General,
}

impl Category {
    /// Every category, `General` last
    pub const ALL: [Category; 13] = [
        Category::Politics,
        Category::Sports,
        Category::Tech,
        Category::Business,
        Category::Entertainment,
        Category::Health,
        Category::Science,
        Category::World,
        Category::Environment,
        Category::Military,
        Category::Crime,
        Category::Economy,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Politics => "politics",
            Category::Sports => "sports",
            Category::Tech => "tech",
            Category::Business => "business",
            Category::Entertainment => "entertainment",
            Category::Health => "health",
            Category::Science => "science",
            Category::World => "world",
            Category::Environment => "environment",
            Category::Military => "military",
            Category::Crime => "crime",
            Category::Economy => "economy",
            Category::General => "general",
        }
    }

    /// Parse a free-form label. Case-insensitive, surrounding whitespace
    /// ignored. Returns `None` for labels outside the set.
    pub fn parse(label: &str) -> Option<Category> {
        let normalized = label.trim().to_lowercase();
        let category = match normalized.as_str() {
            "politics" => Category::Politics,
            "sports" | "sport" => Category::Sports,
            "tech" | "technology" => Category::Tech,
            "business" => Category::Business,
            "entertainment" => Category::Entertainment,
            "health" => Category::Health,
            "science" => Category::Science,
            "world" | "world news" | "world-news" | "world_news" => Category::World,
            "environment" => Category::Environment,
            "military" => Category::Military,
            "crime" => Category::Crime,
            "economy" => Category::Economy,
            "general" => Category::General,
            _ => return None,
        };
        Some(category)
    }

    /// Comma separated list used in prompts
    pub fn prompt_list() -> String {
        Self::ALL
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Category::parse(&label)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown category '{}'", label)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_lowercase_single_words() {
        for category in Category::ALL {
            let token = category.as_str();
            assert_eq!(token, token.to_lowercase());
            assert!(!token.contains(char::is_whitespace));
            assert!(token.len() > 2);
            assert_eq!(Category::parse(token), Some(category));
        }
    }

    #[test]
    fn test_parse_aliases_and_case() {
        assert_eq!(Category::parse("  Sports "), Some(Category::Sports));
        assert_eq!(Category::parse("World News"), Some(Category::World));
        assert_eq!(Category::parse("technology"), Some(Category::Tech));
        assert_eq!(Category::parse("astrology"), None);
        assert_eq!(Category::parse(""), None);
    }

    #[test]
    fn test_serde_round_trip_uses_tokens() {
        let json = serde_json::to_string(&Category::World).unwrap();
        assert_eq!(json, "\"world\"");
        let parsed: Category = serde_json::from_str("\"CRIME\"").unwrap();
        assert_eq!(parsed, Category::Crime);
        assert!(serde_json::from_str::<Category>("\"weather\"").is_err());
    }
}
