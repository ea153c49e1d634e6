use serde::{Deserialize, Serialize};

use crate::core::Document;

const DEFAULT_SCHEMA: &str = "plume";

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

/// JSON envelope for dumping a document model, used by tooling and tests.
/// The authoring markup dialect in `plume-markup` is the persisted form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlumeValue {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub document: Document,
}

impl PlumeValue {
    pub fn from_document(document: Document) -> Self {
        Self {
            schema: default_schema(),
            document,
        }
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
