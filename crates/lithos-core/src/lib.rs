//! Core domain model and display helpers for Lithos.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "lithos-core";

/// Canonical persisted mining-project record.
///
/// Financial metrics are in millions USD except `irr` (percent) and `aisc`
/// (USD per produced unit). `location` is a comma-separated hierarchy ending
/// in a country/region name. Any of the optional columns may be NULL in the
/// store; absence is always `None`, never a sentinel value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub commodities: Vec<String>,
    pub capex: Option<f64>,
    pub npv: Option<f64>,
    pub irr: Option<f64>,
    pub aisc: Option<f64>,
    pub stage: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub watchlist: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Presentation-only re-casing of `location` segments and commodity
    /// labels. Stored data and scoring inputs are never normalized.
    pub fn normalized_for_display(mut self) -> Self {
        if let Some(location) = &self.location {
            self.location = Some(normalize_location_display(location));
        }
        self.commodities = self
            .commodities
            .iter()
            .map(|commodity| title_case_label(commodity))
            .collect();
        self
    }
}

/// First letter uppercased, the rest lowercased.
pub fn title_case_label(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.as_str().to_lowercase().chars())
            .collect(),
        None => String::new(),
    }
}

/// Re-case a comma-separated location hierarchy segment by segment,
/// normalizing separator whitespace to ", ".
pub fn normalize_location_display(location: &str) -> String {
    location
        .split(',')
        .map(|segment| title_case_label(segment.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn mk_project() -> Project {
        Project {
            id: "p-1".into(),
            name: "Red Mountain".into(),
            commodities: vec!["COPPER".into(), "gold".into()],
            capex: Some(500.0),
            npv: Some(1000.0),
            irr: Some(22.5),
            aisc: None,
            stage: Some("Production".into()),
            location: Some("red lake,  ontario,CANADA".into()),
            description: None,
            latitude: None,
            longitude: None,
            watchlist: false,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().unwrap(),
            updated_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().unwrap(),
        }
    }

    #[test]
    fn labels_recase_first_letter_only() {
        assert_eq!(title_case_label("COPPER"), "Copper");
        assert_eq!(title_case_label("gold"), "Gold");
        assert_eq!(title_case_label(""), "");
    }

    #[test]
    fn location_recases_every_segment() {
        assert_eq!(
            normalize_location_display("red lake,  ontario,CANADA"),
            "Red lake, Ontario, Canada"
        );
        assert_eq!(normalize_location_display("nevada"), "Nevada");
    }

    #[test]
    fn display_normalization_leaves_metrics_untouched() {
        let normalized = mk_project().normalized_for_display();
        assert_eq!(normalized.commodities, vec!["Copper", "Gold"]);
        assert_eq!(normalized.location.as_deref(), Some("Red lake, Ontario, Canada"));
        assert_eq!(normalized.capex, Some(500.0));
        assert_eq!(normalized.stage.as_deref(), Some("Production"));
    }
}
