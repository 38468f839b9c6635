use std::fmt;

use serde::de::DeserializeOwned;
use serde::de::value::MapDeserializer;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::HarvestError;

/// A raw document as stored in a collection.
pub type Document = Map<String, Value>;

/// Key added to every staged document.
pub const KEEP_ABSTRACT_KEY: &str = "keep_abstract";

/// A bibliographic scalar that the API sends either as a string or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(Number),
    Text(String),
}

impl Scalar {
    pub fn is_blank(&self) -> bool {
        match self {
            Scalar::Number(_) => false,
            Scalar::Text(value) => value.is_empty(),
        }
    }
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::Text(String::new())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(value) => write!(f, "{value}"),
            Scalar::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalId {
    #[serde(default, deserialize_with = "lenient")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<Scalar>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Title {
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Author {
    #[serde(default, deserialize_with = "lenient")]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceName {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Publisher {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductSource {
    #[serde(default, deserialize_with = "lenient_seq")]
    pub names: Vec<SourceName>,
    #[serde(default, deserialize_with = "lenient")]
    pub publisher: Option<Publisher>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BibliographicInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub volume: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    pub issue: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    pub start_page: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    pub end_page: Option<Scalar>,
}

/// Typed view over a research-product document.
///
/// Every field is optional and a value of the wrong shape is read as absent,
/// so building a view from an arbitrary document never fails.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Product {
    #[serde(default, deserialize_with = "lenient_seq")]
    pub external_ids: Vec<ExternalId>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub titles: Vec<Title>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub authors: Vec<Author>,
    #[serde(default, deserialize_with = "lenient")]
    pub source: Option<ProductSource>,
    #[serde(default, deserialize_with = "lenient")]
    pub bibliographic_info: Option<BibliographicInfo>,
    #[serde(default, deserialize_with = "lenient")]
    pub year_published: Option<Scalar>,
    #[serde(default, rename = "abstract", deserialize_with = "present")]
    pub abstract_text: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub keep_abstract: Option<Value>,
}

impl Product {
    pub fn from_document(document: &Document) -> Self {
        let deserializer = MapDeserializer::<_, serde_json::Error>::new(
            document.iter().map(|(key, value)| (key.as_str(), value)),
        );
        Self::deserialize(deserializer).unwrap_or_default()
    }

    /// An absent flag keeps the abstract; a present one is read for truthiness.
    pub fn keeps_abstract(&self) -> bool {
        self.keep_abstract.as_ref().is_none_or(is_truthy)
    }

    pub fn has_external_source(&self, source: &str) -> bool {
        self.external_ids
            .iter()
            .any(|entry| entry.source.as_deref() == Some(source))
    }

    /// Last id registered under `source`, if any.
    pub fn external_id(&self, source: &str) -> Option<String> {
        self.external_ids
            .iter()
            .rev()
            .find(|entry| entry.source.as_deref() == Some(source))
            .map(|entry| entry.id.as_ref().map(ToString::to_string).unwrap_or_default())
    }
}

/// One page of the `affiliation` products listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductsPage {
    #[serde(default)]
    pub data: Vec<Document>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub page: Option<u64>,
    pub total_results: u64,
}

/// Flat record consumed by the MOAI harvesting service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub journal: String,
    pub publisher: String,
    pub country: String,
    pub title: String,
    pub author: String,
    pub year: Scalar,
    pub volume: Scalar,
    pub issue: Scalar,
    pub page: String,
    pub language: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Value,
    pub doi: String,
    pub pmid: String,
}

impl NormalizedRecord {
    pub fn into_document(self) -> Result<Document, HarvestError> {
        match serde_json::to_value(self).map_err(|err| HarvestError::Store(err.to_string()))? {
            Value::Object(document) => Ok(document),
            _ => Err(HarvestError::Store(
                "normalized record did not serialize to an object".to_string(),
            )),
        }
    }
}

/// JSON truthiness: `null`, `false`, zero and empty values are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|number| number != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Keeps a present key as `Some`, `null` included.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}
