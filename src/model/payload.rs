//! Lens- and toolkit-specific structured payloads returned alongside insights.
//!
//! On the wire each payload appears under its own optional top-level key
//! (`systemsDiagram`, `futuresScenarios`, ...). Internally it is a closed
//! tagged union so a session holds at most one.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemsDiagram {
    pub elements: Vec<String>,
    pub feedback_loops: Vec<String>,
    pub leverage_points: Vec<String>,
}

/// Scenario triple
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FuturesScenarios {
    pub optimistic: String,
    pub pessimistic: String,
    pub wildcard: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EthicalEntry {
    pub stakeholder: String,
    pub impact: String,
    pub consideration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NarrativeArc {
    pub setup: String,
    pub conflict: String,
    pub turning_point: String,
    pub resolution: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StakeholderEntry {
    pub name: String,
    pub influence: String,
    pub interest: String,
    pub need: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum StructuredPayload {
    SystemsDiagram(SystemsDiagram),
    FuturesScenarios(FuturesScenarios),
    EthicalMatrix(Vec<EthicalEntry>),
    FirstPrinciplesList(Vec<String>),
    NarrativeArc(NarrativeArc),
    StakeholderMatrix(Vec<StakeholderEntry>),
}

impl StructuredPayload {
    /// Top-level response key this payload travels under
    pub fn wire_key(&self) -> &'static str {
        match self {
            Self::SystemsDiagram(_) => "systemsDiagram",
            Self::FuturesScenarios(_) => "futuresScenarios",
            Self::EthicalMatrix(_) => "ethicalMatrix",
            Self::FirstPrinciplesList(_) => "firstPrinciplesList",
            Self::NarrativeArc(_) => "narrativeArc",
            Self::StakeholderMatrix(_) => "stakeholderMatrix",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::SystemsDiagram(_) => "Systems Diagram",
            Self::FuturesScenarios(_) => "Future Scenarios",
            Self::EthicalMatrix(_) => "Ethical Matrix",
            Self::FirstPrinciplesList(_) => "First Principles",
            Self::NarrativeArc(_) => "Narrative Arc",
            Self::StakeholderMatrix(_) => "Stakeholder Matrix",
        }
    }

    /// Decode the payload stored under `key`. Unknown keys yield `None`.
    pub fn from_wire(key: &str, value: serde_json::Value) -> Option<serde_json::Result<Self>> {
        let decoded = match key {
            "systemsDiagram" => serde_json::from_value(value).map(Self::SystemsDiagram),
            "futuresScenarios" => serde_json::from_value(value).map(Self::FuturesScenarios),
            "ethicalMatrix" => serde_json::from_value(value).map(Self::EthicalMatrix),
            "firstPrinciplesList" => serde_json::from_value(value).map(Self::FirstPrinciplesList),
            "narrativeArc" => serde_json::from_value(value).map(Self::NarrativeArc),
            "stakeholderMatrix" => serde_json::from_value(value).map(Self::StakeholderMatrix),
            _ => return None,
        };
        Some(decoded)
    }

    /// Encode the inner value as it appears under [`Self::wire_key`].
    pub fn to_wire(&self) -> serde_json::Value {
        let encoded = match self {
            Self::SystemsDiagram(v) => serde_json::to_value(v),
            Self::FuturesScenarios(v) => serde_json::to_value(v),
            Self::EthicalMatrix(v) => serde_json::to_value(v),
            Self::FirstPrinciplesList(v) => serde_json::to_value(v),
            Self::NarrativeArc(v) => serde_json::to_value(v),
            Self::StakeholderMatrix(v) => serde_json::to_value(v),
        };
        encoded.unwrap_or(serde_json::Value::Null)
    }
}

/// Every key a structured payload may arrive under, in lookup order.
pub const PAYLOAD_KEYS: [&str; 6] = [
    "systemsDiagram",
    "futuresScenarios",
    "ethicalMatrix",
    "firstPrinciplesList",
    "narrativeArc",
    "stakeholderMatrix",
];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_wire_tolerates_missing_fields() {
        let decoded =
            StructuredPayload::from_wire("futuresScenarios", json!({"optimistic": "growth"}))
                .unwrap()
                .unwrap();
        match decoded {
            StructuredPayload::FuturesScenarios(s) => {
                assert_eq!(s.optimistic, "growth");
                assert!(s.wildcard.is_empty());
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_from_wire_unknown_key() {
        assert!(StructuredPayload::from_wire("horoscope", json!({})).is_none());
    }

    #[test]
    fn test_from_wire_wrong_shape_is_error() {
        let decoded = StructuredPayload::from_wire("firstPrinciplesList", json!({"a": 1})).unwrap();
        assert!(decoded.is_err());
    }

    #[test]
    fn test_snapshot_encoding_is_tagged() {
        let payload = StructuredPayload::FirstPrinciplesList(vec!["energy is conserved".into()]);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["kind"], "firstPrinciplesList");
        assert_eq!(value["data"][0], "energy is conserved");
        assert_eq!(payload.to_wire(), json!(["energy is conserved"]));
    }
}
