//! # News records
//! Canonical record types shared by ingestion, the caches, classification and
//! the analyst chat.
//!
//! Records are serialized in camelCase so the on-disk `news.json` layout stays
//! readable by other tooling.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Treasury classification buckets. `general` is the catch-all.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Liquidity,
    CapitalMarkets,
    FxRates,
    CreditRatings,
    #[serde(rename = "ma", alias = "m&a")]
    MergersAcquisitions,
    Risk,
    Macro,
    Pensions,
    Geopolitical,
    General,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Liquidity,
        Category::CapitalMarkets,
        Category::FxRates,
        Category::CreditRatings,
        Category::MergersAcquisitions,
        Category::Risk,
        Category::Macro,
        Category::Pensions,
        Category::Geopolitical,
        Category::General,
    ];

    /// Wire name, as used in prompts, query strings and `news.json`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Liquidity => "liquidity",
            Category::CapitalMarkets => "capital-markets",
            Category::FxRates => "fx-rates",
            Category::CreditRatings => "credit-ratings",
            Category::MergersAcquisitions => "ma",
            Category::Risk => "risk",
            Category::Macro => "macro",
            Category::Pensions => "pensions",
            Category::Geopolitical => "geopolitical",
            Category::General => "general",
        }
    }

    /// Human label for digests.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Liquidity => "Liquidity & Cash",
            Category::CapitalMarkets => "Capital Markets",
            Category::FxRates => "FX & Rates",
            Category::CreditRatings => "Credit & Ratings",
            Category::MergersAcquisitions => "M&A",
            Category::Risk => "Risk & Insurance",
            Category::Macro => "Macro & Markets",
            Category::Pensions => "Pensions",
            Category::Geopolitical => "Geopolitical",
            Category::General => "General",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        if key == "m&a" {
            return Ok(Category::MergersAcquisitions);
        }
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == key)
            .ok_or_else(|| anyhow::anyhow!("unknown category: {s}"))
    }
}

/// Treasury impact, 1 (minimal) ..= 5 (critical).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub struct Urgency(u8);

impl Urgency {
    pub const MIN: Urgency = Urgency(1);
    pub const MEDIUM: Urgency = Urgency(3);
    pub const CRITICAL: Urgency = Urgency(5);

    pub fn new(v: u8) -> Option<Self> {
        (1..=5).contains(&v).then_some(Urgency(v))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::MEDIUM
    }
}

impl TryFrom<u8> for Urgency {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Urgency::new(v).ok_or_else(|| format!("urgency out of range 1..=5: {v}"))
    }
}

impl From<Urgency> for u8 {
    fn from(u: Urgency) -> u8 {
        u.0
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One ingested article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub source_url: String,
    pub source_name: String,
    pub published_at: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
    pub category: Category,
    pub urgency: Urgency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
}

impl NewsRecord {
    /// Pending records have not been through classification yet.
    pub fn is_pending(&self) -> bool {
        self.ai_summary.is_none()
    }

    /// Case-insensitive match against title, description and source name.
    pub fn matches_search(&self, needle_lower: &str) -> bool {
        self.title.to_lowercase().contains(needle_lower)
            || self.description.to_lowercase().contains(needle_lower)
            || self.source_name.to_lowercase().contains(needle_lower)
    }
}

/// Annotation returned by the classifier for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub id: String,
    pub category: Option<Category>,
    pub urgency: Option<Urgency>,
    pub ai_summary: String,
}

/// One generated executive briefing; `date` is the natural key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Briefing {
    pub date: NaiveDate,
    pub content: String,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_wire_names_round_trip_through_from_str() {
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
        assert_eq!(
            "M&A".parse::<Category>().unwrap(),
            Category::MergersAcquisitions
        );
        assert!("equities".parse::<Category>().is_err());
    }

    #[test]
    fn category_serde_matches_wire_names() {
        let v = serde_json::to_value(Category::CapitalMarkets).unwrap();
        assert_eq!(v, "capital-markets");
        let v = serde_json::to_value(Category::MergersAcquisitions).unwrap();
        assert_eq!(v, "ma");
        let c: Category = serde_json::from_str("\"m&a\"").unwrap();
        assert_eq!(c, Category::MergersAcquisitions);
    }

    #[test]
    fn urgency_rejects_out_of_range() {
        assert!(Urgency::new(0).is_none());
        assert!(Urgency::new(6).is_none());
        assert_eq!(Urgency::new(5), Some(Urgency::CRITICAL));
        assert!(serde_json::from_str::<Urgency>("9").is_err());
        assert_eq!(Urgency::default().value(), 3);
    }
}
