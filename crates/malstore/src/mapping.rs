//! 🗺️ Index schemas — settings + field types, rendered into the body of `PUT /{index}`.
//!
//! Two presets ship in the box:
//! - [`IndexSchema::samples`]: the malice samples index (`scan_date`, `file`, `plugins`).
//! - [`IndexSchema::geo_autocomplete`]: the variant with a geo-point and a completion
//!   (autocomplete) field, for indexes that want to be found on a map or by typing "mal...".
//!
//! Renders typeless mappings (no `_doc` type wrapper), which is what ES 7+ expects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// 🏷️ The field types we know how to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Date,
    Keyword,
    Text,
    Object,
    Long,
    Boolean,
    GeoPoint,
    /// 🔮 Autocomplete. Elasticsearch calls it a "completion suggester". We call it magic.
    Completion,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Date => "date",
            FieldType::Keyword => "keyword",
            FieldType::Text => "text",
            FieldType::Object => "object",
            FieldType::Long => "long",
            FieldType::Boolean => "boolean",
            FieldType::GeoPoint => "geo_point",
            FieldType::Completion => "completion",
        }
    }
}

/// 📐 Shard/replica settings plus a flat map of top-level field types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
    #[serde(default)]
    pub properties: BTreeMap<String, FieldType>,
}

impl IndexSchema {
    pub fn new(number_of_shards: u32, number_of_replicas: u32) -> Self {
        Self {
            number_of_shards,
            number_of_replicas,
            properties: BTreeMap::new(),
        }
    }

    /// 🏗️ Builder-style field declaration. Later declarations of the same name win.
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.properties.insert(name.into(), field_type);
        self
    }

    /// 🧫 The samples index: one shard, zero replicas, three fields. Small lab, small cluster.
    pub fn samples() -> Self {
        Self::new(1, 0)
            .field("scan_date", FieldType::Date)
            .field("file", FieldType::Object)
            .field("plugins", FieldType::Object)
    }

    /// 🗺️ The mapping variant with a geo-point and an autocomplete field.
    pub fn geo_autocomplete() -> Self {
        Self::new(1, 0)
            .field("tags", FieldType::Keyword)
            .field("location", FieldType::GeoPoint)
            .field("suggest_field", FieldType::Completion)
    }

    /// 📦 The JSON body for index creation.
    pub fn to_body(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, field_type)| (name.clone(), json!({ "type": field_type.as_str() })))
            .collect();

        json!({
            "settings": {
                "number_of_shards": self.number_of_shards,
                "number_of_replicas": self.number_of_replicas
            },
            "mappings": {
                "properties": properties
            }
        })
    }
}

impl Default for IndexSchema {
    fn default() -> Self {
        Self::samples()
    }
}
