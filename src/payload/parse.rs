use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GraphPayload {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default, alias = "links")]
    pub relationships: Vec<RawRelationship>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawNode {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub degree: u32,
    #[serde(default, alias = "centralityScore")]
    pub centrality_score: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawRelationship {
    #[serde(default, deserialize_with = "optional_id_string")]
    pub id: Option<String>,
    #[serde(default, rename = "type", alias = "relationType")]
    pub relation_type: String,
    #[serde(default, deserialize_with = "optional_id_string")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "optional_id_string")]
    pub target: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

fn value_to_id(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn id_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_id(value).ok_or_else(|| serde::de::Error::custom("id must be a string or number"))
}

fn optional_id_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(value_to_id(Value::deserialize(deserializer)?))
}

pub fn parse_payload(raw: &str) -> Result<GraphPayload> {
    serde_json::from_str(raw).context("invalid graph payload JSON")
}

pub(super) fn string_property<'a>(properties: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| properties.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|value| !value.is_empty())
}

pub(super) fn number_property(properties: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| properties.get(*key))
        .find_map(|value| match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
        .filter(|value| value.is_finite())
}
