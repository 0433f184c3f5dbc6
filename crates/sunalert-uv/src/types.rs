use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label shown while no UV reading is available yet.
pub const PENDING_LABEL: &str = "Checking UV index";

/// Advice shown while no UV reading is available yet.
pub const PENDING_ADVICE: &str =
    "Loading UV data to give you a recommendation that fits current conditions.";

/// Exposure risk categories derived from the UV index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
    Extreme,
}

impl RiskLevel {
    /// Classify a UV index. Upper bounds are inclusive: 2, 5, 7, 10.
    pub fn from_uv(uv: f64) -> Self {
        if uv <= 2.0 {
            Self::Low
        } else if uv <= 5.0 {
            Self::Moderate
        } else if uv <= 7.0 {
            Self::High
        } else if uv <= 10.0 {
            Self::VeryHigh
        } else {
            Self::Extreme
        }
    }

    /// Human-readable risk label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low risk",
            Self::Moderate => "Moderate risk",
            Self::High => "High risk",
            Self::VeryHigh => "Very high risk",
            Self::Extreme => "Extreme risk",
        }
    }

    /// Protection advice for this level
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Low => {
                "UV exposure is still low. Wear sunglasses on bright days and sunscreen if you have sensitive skin."
            }
            Self::Moderate => {
                "UV exposure is noticeable. Stay in the shade around midday and use SPF 30+ sunscreen, covering clothing and sunglasses."
            }
            Self::High => {
                "UV is harmful. Reduce outdoor activity during peak hours and use full protection: sunscreen, a hat and UV sunglasses."
            }
            Self::VeryHigh => {
                "UV exposure is very strong. Limit time in the sun and always use sunscreen, protective clothing and UV sunglasses."
            }
            Self::Extreme => {
                "UV is at an extreme level. Avoid direct exposure wherever possible and use full protection if you must go outside."
            }
        }
    }

    /// Display color as a hex string
    pub fn color_hex(&self) -> &'static str {
        match self {
            Self::Low => "#4CAF50",
            Self::Moderate => "#FFEB3B",
            Self::High => "#FF9800",
            Self::VeryHigh => "#F44336",
            Self::Extreme => "#9C27B0",
        }
    }

    /// Look up a level by its label, as stored in history records.
    pub fn from_label(label: &str) -> Option<Self> {
        [Self::Low, Self::Moderate, Self::High, Self::VeryHigh, Self::Extreme]
            .into_iter()
            .find(|level| level.label().eq_ignore_ascii_case(label))
    }
}

/// Label and advice for an optional reading.
///
/// A missing reading yields the pending pair, never the `Low` category.
pub fn describe(uv: Option<f64>) -> (&'static str, &'static str) {
    match uv {
        Some(uv) => {
            let level = RiskLevel::from_uv(uv);
            (level.label(), level.advice())
        }
        None => (PENDING_LABEL, PENDING_ADVICE),
    }
}

/// Geographic location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Whether both coordinates are finite and inside their valid ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Current UV conditions for a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UvReading {
    pub uv: f64,
    pub uv_max: Option<f64>,
    pub uv_max_time: Option<String>,
}

impl UvReading {
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_uv(self.uv)
    }

    /// Time of today's peak UV, when the API reported one
    pub fn uv_max_at(&self) -> Option<DateTime<Utc>> {
        self.uv_max_time
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// UV provider errors
#[derive(Debug, thiserror::Error)]
pub enum UvError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("UV API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid coordinates: {latitude}, {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
}

impl UvError {
    pub fn user_message(&self) -> &'static str {
        match self {
            UvError::Network(_) => "Unable to reach the UV service. Check your connection.",
            UvError::InvalidApiKey => "UV API key is invalid. Check settings.",
            UvError::Api { status, .. } if *status >= 500 => {
                "UV service unavailable. Please try again later."
            }
            UvError::Api { .. } => "UV service error. Please try again.",
            UvError::Parse(_) => "Received unexpected UV data. Please try again.",
            UvError::InvalidCoordinates { .. } => "Location is invalid. Check GPS and try again.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_low_upper_bound_inclusive() {
        assert_eq!(RiskLevel::from_uv(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_uv(2.0), RiskLevel::Low);
    }

    #[test]
    fn test_risk_moderate() {
        assert_eq!(RiskLevel::from_uv(2.01), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_uv(5.0), RiskLevel::Moderate);
    }

    #[test]
    fn test_risk_high() {
        assert_eq!(RiskLevel::from_uv(6.2), RiskLevel::High);
        assert_eq!(RiskLevel::from_uv(7.0), RiskLevel::High);
    }

    #[test]
    fn test_risk_very_high() {
        assert_eq!(RiskLevel::from_uv(7.5), RiskLevel::VeryHigh);
        assert_eq!(RiskLevel::from_uv(10.0), RiskLevel::VeryHigh);
    }

    #[test]
    fn test_risk_extreme() {
        assert_eq!(RiskLevel::from_uv(10.5), RiskLevel::Extreme);
        assert_eq!(RiskLevel::from_uv(14.0), RiskLevel::Extreme);
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Moderate);
        assert!(RiskLevel::VeryHigh < RiskLevel::Extreme);
    }

    #[test]
    fn test_label_round_trip() {
        assert_eq!(RiskLevel::from_label("High risk"), Some(RiskLevel::High));
        assert_eq!(RiskLevel::from_label("extreme RISK"), Some(RiskLevel::Extreme));
        assert_eq!(RiskLevel::from_label("unknown"), None);
    }

    #[test]
    fn test_describe_missing_reading_is_pending() {
        let (label, advice) = describe(None);
        assert_eq!(label, PENDING_LABEL);
        assert_eq!(advice, PENDING_ADVICE);
        assert_ne!(label, RiskLevel::Low.label());
    }

    #[test]
    fn test_describe_reading() {
        let (label, _) = describe(Some(0.0));
        assert_eq!(label, "Low risk");
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(RiskLevel::Low.color_hex(), "#4CAF50");
        assert_eq!(RiskLevel::Extreme.color_hex(), "#9C27B0");
    }

    #[test]
    fn test_location_validity() {
        assert!(Location::new(-6.2, 106.8).is_valid());
        assert!(!Location::new(91.0, 0.0).is_valid());
        assert!(!Location::new(0.0, -180.5).is_valid());
        assert!(!Location::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_uv_max_at_parses_rfc3339() {
        let reading = UvReading {
            uv: 3.1,
            uv_max: Some(9.8),
            uv_max_time: Some("2026-10-19T05:12:40.000Z".to_string()),
        };
        let at = reading.uv_max_at().unwrap();
        assert_eq!(at.to_rfc3339(), "2026-10-19T05:12:40+00:00");
    }

    #[test]
    fn test_uv_max_at_ignores_garbage() {
        let reading = UvReading {
            uv: 3.1,
            uv_max: None,
            uv_max_time: Some("noon".to_string()),
        };
        assert!(reading.uv_max_at().is_none());
    }

    #[test]
    fn test_risk_level_serialization() {
        let json = serde_json::to_string(&RiskLevel::VeryHigh).unwrap();
        assert_eq!(json, "\"very_high\"");
    }
}
