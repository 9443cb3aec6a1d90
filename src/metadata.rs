//! Parsing of the output metadata stored in a stack template.
//!
//! The blob is a JSON object whose values may be unrelated to backend
//! outputs. Entries carrying either a `version` or a `stackOutputNames`
//! field are treated as output metadata and must then pass strict
//! validation; everything else is ignored.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::error::Error;

const VERSION_FIELD: &str = "version";
const STACK_OUTPUT_NAMES_FIELD: &str = "stackOutputNames";

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataEntry {
    pub version: String,
    pub stack_output_names: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct MetadataEntrySchema {
    #[validate(required, length(min = 1))]
    version: Option<String>,

    #[validate(required, length(min = 1), custom = "validate_unique_output_names")]
    stack_output_names: Option<Vec<String>>,
}

pub type Metadata = IndexMap<String, MetadataEntry>;

/// Parses `blob` into validated metadata entries, keeping the blob's key order.
pub fn parse(blob: &str) -> Result<Metadata, Error> {
    let value: serde_json::Value = match serde_json::from_str(blob) {
        Ok(value) => value,
        Err(error) => {
            return Err(Error::MetadataRetrievalError(format!(
                "metadata is not valid JSON: {}",
                error
            )))
        }
    };

    let entries = match value {
        serde_json::Value::Object(entries) => entries,
        _ => {
            return Err(Error::MetadataRetrievalError(String::from(
                "metadata is not a JSON object",
            )))
        }
    };

    let mut metadata = Metadata::new();
    for (name, entry) in entries {
        if !looks_like_metadata_entry(&entry) {
            tracing::debug!(%name, "ignoring unrelated metadata entry");
            continue;
        }

        let entry = validate_entry(&name, entry)?;
        metadata.insert(name, entry);
    }

    return Ok(metadata);
}

fn looks_like_metadata_entry(entry: &serde_json::Value) -> bool {
    match entry.as_object() {
        Some(fields) => {
            fields.contains_key(VERSION_FIELD) || fields.contains_key(STACK_OUTPUT_NAMES_FIELD)
        }
        None => false,
    }
}

fn validate_entry(name: &str, entry: serde_json::Value) -> Result<MetadataEntry, Error> {
    let schema: MetadataEntrySchema = match serde_json::from_value(entry) {
        Ok(schema) => schema,
        Err(error) => {
            return Err(Error::SchemaValidationError(format!(
                "entry `{}`: {}",
                name, error
            )))
        }
    };

    if let Err(errors) = schema.validate() {
        return Err(Error::SchemaValidationError(format!(
            "entry `{}`: {}",
            name, errors
        )));
    }

    match (schema.version, schema.stack_output_names) {
        (Some(version), Some(stack_output_names)) => Ok(MetadataEntry {
            version,
            stack_output_names,
        }),
        _ => Err(Error::SchemaValidationError(format!(
            "entry `{}`: missing required fields",
            name
        ))),
    }
}

fn validate_unique_output_names(names: &Vec<String>) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    if names.iter().all(|name| seen.insert(name)) {
        return Ok(());
    }

    return Err(ValidationError::new(
        "stackOutputNames must not contain duplicates",
    ));
}
