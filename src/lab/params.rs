//! Variant parameters
//!
//! Every parameter is a closed enum. Wire values and stored presets go through
//! the same parsing, so an unknown value is rejected at the boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Declares a parameter enum whose serialized form is its display label
macro_rules! param_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            /// Case-insensitive match against the display labels
            pub fn parse(value: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(value.trim()))
            }
        }
    };
}

param_enum! {
    /// How decisive vs contextual the answer sounds
    ConfidenceRange {
        Focused => "Focused",
        Balanced => "Balanced",
        Broad => "Broad",
    }
}

param_enum! {
    /// What the answer may be based on
    EvidenceSource {
        ProductArtifacts => "Product artifacts",
        PublicKnowledge => "Public knowledge",
        Both => "Both",
    }
}

param_enum! {
    /// How easily the engine refuses vs proceeds
    RiskTolerance {
        Cautious => "Cautious",
        Pragmatic => "Pragmatic",
        Adventurous => "Adventurous",
    }
}

param_enum! {
    /// Proof-forward vs smooth readability
    ExpressionStyle {
        Concrete => "Concrete",
        Conversational => "Conversational",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("Unknown parameter: {0}")]
    UnknownKey(String),
    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Names of the four tunable parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKey {
    ConfidenceRange,
    EvidenceSource,
    RiskTolerance,
    ExpressionStyle,
}

impl ParamKey {
    pub const ALL: [ParamKey; 4] = [
        ParamKey::ConfidenceRange,
        ParamKey::EvidenceSource,
        ParamKey::RiskTolerance,
        ParamKey::ExpressionStyle,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ParamKey::ConfidenceRange => "confidence_range",
            ParamKey::EvidenceSource => "evidence_source",
            ParamKey::RiskTolerance => "risk_tolerance",
            ParamKey::ExpressionStyle => "expression_style",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ParamKey::ConfidenceRange => "Confidence Range",
            ParamKey::EvidenceSource => "Evidence Source",
            ParamKey::RiskTolerance => "Risk Tolerance",
            ParamKey::ExpressionStyle => "Expression Style",
        }
    }

    pub fn info(self) -> &'static str {
        match self {
            ParamKey::ConfidenceRange => "How decisive vs contextual the assistant sounds.",
            ParamKey::EvidenceSource => "What the assistant is allowed to base answers on.",
            ParamKey::RiskTolerance => "How easily the assistant refuses vs proceeds.",
            ParamKey::ExpressionStyle => "Proof-forward vs smooth readability.",
        }
    }

    /// Allowed values, in display order
    pub fn options(self) -> Vec<&'static str> {
        match self {
            ParamKey::ConfidenceRange => ConfidenceRange::ALL.iter().map(|v| v.as_str()).collect(),
            ParamKey::EvidenceSource => EvidenceSource::ALL.iter().map(|v| v.as_str()).collect(),
            ParamKey::RiskTolerance => RiskTolerance::ALL.iter().map(|v| v.as_str()).collect(),
            ParamKey::ExpressionStyle => ExpressionStyle::ALL.iter().map(|v| v.as_str()).collect(),
        }
    }

    pub fn parse(key: &str) -> Result<Self, ParamError> {
        Self::ALL
            .into_iter()
            .find(|k| k.key() == key)
            .ok_or_else(|| ParamError::UnknownKey(key.to_string()))
    }
}

/// One variant's parameter tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantParams {
    pub confidence_range: ConfidenceRange,
    pub evidence_source: EvidenceSource,
    pub risk_tolerance: RiskTolerance,
    pub expression_style: ExpressionStyle,
}

impl Default for VariantParams {
    fn default() -> Self {
        Self {
            confidence_range: ConfidenceRange::Balanced,
            evidence_source: EvidenceSource::ProductArtifacts,
            risk_tolerance: RiskTolerance::Pragmatic,
            expression_style: ExpressionStyle::Concrete,
        }
    }
}

impl VariantParams {
    /// Defaults of the second built-in variant
    pub fn cautious() -> Self {
        Self {
            confidence_range: ConfidenceRange::Focused,
            risk_tolerance: RiskTolerance::Cautious,
            ..Self::default()
        }
    }

    pub fn get(&self, key: ParamKey) -> &'static str {
        match key {
            ParamKey::ConfidenceRange => self.confidence_range.as_str(),
            ParamKey::EvidenceSource => self.evidence_source.as_str(),
            ParamKey::RiskTolerance => self.risk_tolerance.as_str(),
            ParamKey::ExpressionStyle => self.expression_style.as_str(),
        }
    }

    /// Parse and set one parameter. On error nothing changes.
    pub fn set(&mut self, key: ParamKey, value: &str) -> Result<(), ParamError> {
        let invalid = || ParamError::InvalidValue {
            key: key.key(),
            value: value.to_string(),
        };
        match key {
            ParamKey::ConfidenceRange => {
                self.confidence_range = ConfidenceRange::parse(value).ok_or_else(invalid)?;
            }
            ParamKey::EvidenceSource => {
                self.evidence_source = EvidenceSource::parse(value).ok_or_else(invalid)?;
            }
            ParamKey::RiskTolerance => {
                self.risk_tolerance = RiskTolerance::parse(value).ok_or_else(invalid)?;
            }
            ParamKey::ExpressionStyle => {
                self.expression_style = ExpressionStyle::parse(value).ok_or_else(invalid)?;
            }
        }
        Ok(())
    }
}

/// Reviewer judgment labels
pub const JUDGMENT_CHECKS: [&str; 5] = [
    "Clear",
    "Trustworthy",
    "Overconfident",
    "Too cautious",
    "Distracting evidence",
];

pub fn is_judgment_check(label: &str) -> bool {
    JUDGMENT_CHECKS.contains(&label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape_uses_labels() {
        let json = serde_json::to_value(VariantParams::cautious()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "confidence_range": "Focused",
                "evidence_source": "Product artifacts",
                "risk_tolerance": "Cautious",
                "expression_style": "Concrete",
            })
        );
    }

    #[test]
    fn test_unknown_value_rejected_on_deserialize() {
        let raw = r#"{"confidence_range":"Wild","evidence_source":"Both","risk_tolerance":"Cautious","expression_style":"Concrete"}"#;
        assert!(serde_json::from_str::<VariantParams>(raw).is_err());
    }

    #[test]
    fn test_set_validates_before_mutating() {
        let mut params = VariantParams::default();

        params.set(ParamKey::EvidenceSource, "public knowledge").unwrap();
        assert_eq!(params.evidence_source, EvidenceSource::PublicKnowledge);

        let err = params.set(ParamKey::RiskTolerance, "Reckless").unwrap_err();
        assert!(matches!(err, ParamError::InvalidValue { key: "risk_tolerance", .. }));
        assert_eq!(params.risk_tolerance, RiskTolerance::Pragmatic);
    }

    #[test]
    fn test_param_keys() {
        assert_eq!(ParamKey::parse("expression_style"), Ok(ParamKey::ExpressionStyle));
        assert_eq!(
            ParamKey::parse("temperature"),
            Err(ParamError::UnknownKey("temperature".to_string()))
        );
        assert_eq!(
            ParamKey::EvidenceSource.options(),
            vec!["Product artifacts", "Public knowledge", "Both"]
        );
        assert_eq!(VariantParams::default().get(ParamKey::ConfidenceRange), "Balanced");
    }

    #[test]
    fn test_judgment_checks() {
        assert!(is_judgment_check("Too cautious"));
        assert!(!is_judgment_check("too cautious"));
    }
}
