#![deny(clippy::unwrap_used, clippy::expect_used)]

use serde::Deserialize;
use std::path::Path;

use crate::error::ContextError;
use crate::layout::truncate_description;

pub const NAME_FALLBACK: &str = "Name not specified";
pub const LOCATION_FALLBACK: &str = "Location not specified";
pub const PHONE_FALLBACK: &str = "Phone not specified";
pub const DESCRIPTION_FALLBACK: &str = "No description available";

/// The input document, a list of people in the order in which they are laid out.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PeopleDocument {
    pub people: Vec<PersonRecord>,
}

impl PeopleDocument {
    /// Reads and parses the people document found at the given path.
    pub fn from_path(document_path: &Path) -> Result<PeopleDocument, ContextError> {
        let document_content = std::fs::read_to_string(document_path).map_err(|error| {
            ContextError::with_error(
                format!("Unable to read the people document {:?}", document_path),
                &error,
            )
        })?;
        Self::from_json(&document_content).map_err(|error| ContextError {
            context: format!("Unable to parse the people document {:?}", document_path),
            source_error: error.source_error,
        })
    }

    pub fn from_json(document_content: &str) -> Result<PeopleDocument, ContextError> {
        serde_json::from_str(document_content).map_err(|error| {
            ContextError::with_error("Unable to parse the people document", &error)
        })
    }
}

/// One entry of the people document, rendered as one card of the contact sheet.
///
/// Fields are kept as raw JSON values: strings are written as they are, other scalars through
/// their JSON representation, while `null` counts as a missing field.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct PersonRecord {
    #[serde(default)]
    pub name: Option<serde_json::Value>,
    #[serde(default)]
    pub location: Option<serde_json::Value>,
    #[serde(default)]
    pub phone: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<serde_json::Value>,
    /// `None` only when the key is absent, an explicit `null` is kept as a value.
    #[serde(default, deserialize_with = "present_value")]
    pub image: Option<serde_json::Value>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl PersonRecord {
    pub fn name(&self) -> String {
        field_text(&self.name).unwrap_or_else(|| NAME_FALLBACK.into())
    }

    pub fn location(&self) -> String {
        field_text(&self.location).unwrap_or_else(|| LOCATION_FALLBACK.into())
    }

    /// The phone line as it appears on the card, label included.
    pub fn phone_line(&self) -> String {
        let phone = field_text(&self.phone).unwrap_or_else(|| PHONE_FALLBACK.into());
        format!("Phone: {}", phone)
    }

    /// The description as it is going to be wrapped on the card, already truncated.
    pub fn description(&self) -> String {
        let description =
            field_text(&self.description).unwrap_or_else(|| DESCRIPTION_FALLBACK.into());
        truncate_description(&description)
    }

    /// Whether the record has the `image` key, which is the only mandatory field of a record.
    pub fn has_image_field(&self) -> bool {
        self.image.is_some()
    }

    /// The URL of the picture, when it is a string.
    pub fn image_url(&self) -> Result<&str, ContextError> {
        match &self.image {
            Some(serde_json::Value::String(url)) => Ok(url),
            None => Err(ContextError::with_context("The record has no image field")),
            Some(serde_json::Value::Null) => {
                Err(ContextError::with_context("The image URL of the record is null"))
            }
            Some(other) => Err(ContextError::with_context(format!(
                "The image URL of the record is not a string: {}",
                other
            ))),
        }
    }
}

fn field_text(value: &Option<serde_json::Value>) -> Option<String> {
    match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(text)) => Some(text.clone()),
        Some(other) => Some(other.to_string()),
    }
}
