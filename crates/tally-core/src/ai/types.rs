//! AI backend request/response types
//!
//! These types are backend-agnostic. `ExtractionCandidate` is decoded from
//! whatever the model sent back, so every field is optional and wrong-typed
//! values decode as absent rather than failing the whole record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Source medium of an extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionChannel {
    /// Spoken description (voice memo)
    Audio,
    /// One or more receipt photos
    Images,
    /// Typed description
    Text,
}

impl ExtractionChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Images => "images",
            Self::Text => "text",
        }
    }

    pub fn all() -> &'static [ExtractionChannel] {
        &[Self::Audio, Self::Images, Self::Text]
    }
}

impl std::str::FromStr for ExtractionChannel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "audio" | "voice" => Ok(Self::Audio),
            "images" | "image" | "photo" => Ok(Self::Images),
            "text" => Ok(Self::Text),
            _ => Err(format!("Unknown extraction channel: {}", s)),
        }
    }
}

impl std::fmt::Display for ExtractionChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Binary media sent to the provider
#[derive(Debug, Clone)]
pub struct MediaPart {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl MediaPart {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }
}

/// One category allocation as the model reported it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAmountHint {
    #[serde(default, deserialize_with = "lenient")]
    pub category_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub items: Option<String>,
}

/// A payer (or split participant) as the model reported it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberAmountHint {
    #[serde(default, deserialize_with = "lenient")]
    pub member_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub amount: Option<f64>,
}

/// Untrusted record decoded from a model response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionCandidate {
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(
        rename = "detectedCategoryAmounts",
        alias = "categoryAmounts",
        default,
        deserialize_with = "lenient_seq"
    )]
    pub category_amounts: Option<Vec<CategoryAmountHint>>,
    #[serde(
        rename = "detectedPayments",
        alias = "payments",
        default,
        deserialize_with = "lenient_seq"
    )]
    pub payments: Option<Vec<MemberAmountHint>>,
    /// Carried for completeness; splits are always derived from the group policy
    #[serde(
        rename = "detectedSplits",
        alias = "splits",
        default,
        deserialize_with = "lenient_seq"
    )]
    pub splits: Option<Vec<MemberAmountHint>>,
}

/// Decode a field, treating a wrong-typed value as absent
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Decode a sequence field; a non-array is absent, a bad element is blank
fn lenient_seq<'de, D, T>(deserializer: D) -> std::result::Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Array(items) => Ok(Some(
            items
                .into_iter()
                .map(|item| T::deserialize(item).unwrap_or_default())
                .collect(),
        )),
        _ => Ok(None),
    }
}
