//! Resource documents pushed into a store.
//!
//! Documents follow the JSON:API resource shape:
//!
//! ```json
//! { "data": [{ "id": "1", "type": "person",
//!              "attributes": { "name": "Scumbag Dale" },
//!              "relationships": { "bestFriend": { "data": { "id": "2", "type": "person" } } } }] }
//! ```

use crate::value::Value;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

/// Identifies a resource by remote id and model name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    pub id: String,
    #[serde(rename = "type")]
    pub model: String,
}

/// The linkage of one relationship; `data: null` clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipData {
    #[serde(default)]
    pub data: Option<ResourceIdentifier>,
}

/// One resource: identity, attributes and relationships.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordData {
    pub id: String,
    #[serde(rename = "type")]
    pub model: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipData>,
}

impl RecordData {
    /// Creates a resource with no attributes.
    pub fn new(id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
        }
    }

    /// Adds an attribute.
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Adds a relationship to `(id, model)`, or a null linkage for `None`.
    pub fn relationship(mut self, name: impl Into<String>, target: Option<(&str, &str)>) -> Self {
        let data = target.map(|(id, model)| ResourceIdentifier {
            id: id.into(),
            model: model.into(),
        });
        self.relationships.insert(name.into(), RelationshipData { data });
        self
    }
}

/// Primary data of a document: a single resource or a list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentData {
    One(RecordData),
    Many(Vec<RecordData>),
}

/// A top-level resource document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub data: DocumentData,
}

impl Document {
    /// Creates a document holding many resources.
    pub fn many(records: Vec<RecordData>) -> Self {
        Self {
            data: DocumentData::Many(records),
        }
    }

    /// Creates a document holding one resource.
    pub fn one(record: RecordData) -> Self {
        Self {
            data: DocumentData::One(record),
        }
    }

    /// Returns the resources in document order.
    pub fn into_records(self) -> Vec<RecordData> {
        match self.data {
            DocumentData::One(record) => vec![record],
            DocumentData::Many(records) => records,
        }
    }
}
