use serde::Serialize;
use thiserror::Error;

use crate::http::form::FormData;

/// Format of [`Item::created_at`], local time with minute precision.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One reported lost item. Immutable once created by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Sequential identifier, starting at 1.
    pub id: u64,
    /// Short name of the item, never empty.
    pub title: String,
    /// Free text description, never empty.
    pub description: String,
    /// Where it was lost or found.
    pub place: String,
    /// When it was lost, free-form.
    pub date: String,
    /// How to reach the reporter.
    pub contact: String,
    /// Creation time formatted with [`CREATED_AT_FORMAT`].
    pub created_at: String,
}

/// Rejection of a submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `title` or `description` is empty after trimming.
    #[error("Title and description are required.")]
    MissingRequiredField,
}

/// A validated submission waiting for an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewItem {
    /// Trimmed, non-empty title.
    pub title: String,
    /// Trimmed, non-empty description.
    pub description: String,
    /// Trimmed place, possibly empty.
    pub place: String,
    /// Trimmed date, possibly empty.
    pub date: String,
    /// Trimmed contact, possibly empty.
    pub contact: String,
}

impl NewItem {
    /// Builds a submission from its fields, trimming each of them.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingRequiredField`] when the trimmed title or description is empty.
    pub fn new(
        title: &str,
        description: &str,
        place: &str,
        date: &str,
        contact: &str,
    ) -> Result<Self, ValidationError> {
        let item = Self {
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            place: place.trim().to_string(),
            date: date.trim().to_string(),
            contact: contact.trim().to_string(),
        };
        if item.title.is_empty() || item.description.is_empty() {
            return Err(ValidationError::MissingRequiredField);
        }
        Ok(item)
    }

    /// Builds a submission from a decoded form, missing fields count as empty.
    ///
    /// # Errors
    ///
    /// See [`NewItem::new`].
    pub fn from_form(form: &FormData) -> Result<Self, ValidationError> {
        Self::new(
            form.get("title").unwrap_or_default(),
            form.get("description").unwrap_or_default(),
            form.get("place").unwrap_or_default(),
            form.get("date").unwrap_or_default(),
            form.get("contact").unwrap_or_default(),
        )
    }

    /// Turns the submission into an item with the given identifier and timestamp.
    #[must_use]
    pub fn into_item(self, id: u64, created_at: String) -> Item {
        Item {
            id,
            title: self.title,
            description: self.description,
            place: self.place,
            date: self.date,
            contact: self.contact,
            created_at,
        }
    }
}
