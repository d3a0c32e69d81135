//! Dining Table Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::{deserialize_id, null_as_default};

/// Dining table entity (桌台) as listed by `GET /tables`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiningTable {
    #[serde(alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, alias = "number", deserialize_with = "deserialize_name")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub capacity: u32,
    #[serde(default, alias = "occupied", deserialize_with = "null_as_default")]
    pub is_occupied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_session_started_at: Option<DateTime<Utc>>,
}

/// Table numbers arrive as either strings or integers
fn deserialize_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrap(#[serde(deserialize_with = "deserialize_id")] String);

    Ok(Option::<Wrap>::deserialize(deserializer)?
        .map(|w| w.0)
        .unwrap_or_default())
}
