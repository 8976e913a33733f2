//! Store documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scout_core::{GeoPoint, Owner, StoreId};

use super::{ValidationError, require_text};

const MAX_NAME_LENGTH: usize = 120;
const MAX_ADDRESS_LENGTH: usize = 300;

/// A store as stored in the `stores` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub address: String,
    pub location: GeoPoint,
    /// Immutable after creation.
    #[serde(rename = "userId", default)]
    pub owner: Owner,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set on stores imported from an earlier data set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_from_existing: Option<bool>,
}

/// Payload for creating a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewStore {
    pub name: String,
    pub address: String,
    pub location: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_from_existing: Option<bool>,
}

impl NewStore {
    /// Validate field lengths.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the name or address is blank or too long.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, MAX_NAME_LENGTH)?;
        require_text("address", &self.address, MAX_ADDRESS_LENGTH)
    }
}

/// Partial update of a store. Absent fields are left unchanged.
///
/// Owner and timestamps are not updatable; payloads naming them are rejected
/// at deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StorePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_from_existing: Option<bool>,
}

impl StorePatch {
    /// Validate the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the patch is empty or a present field is
    /// blank or too long.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_none()
            && self.address.is_none()
            && self.location.is_none()
            && self.converted_from_existing.is_none()
        {
            return Err(ValidationError::EmptyPatch);
        }
        if let Some(name) = &self.name {
            require_text("name", name, MAX_NAME_LENGTH)?;
        }
        if let Some(address) = &self.address {
            require_text("address", address, MAX_ADDRESS_LENGTH)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn new_store(name: &str) -> NewStore {
        NewStore {
            name: name.to_owned(),
            address: "Hauptstr. 1".to_owned(),
            location: GeoPoint::new(52.5, 13.4).unwrap(),
            converted_from_existing: None,
        }
    }

    #[test]
    fn test_new_store_validation() {
        assert!(new_store("Burger Bude").validate().is_ok());
        assert_eq!(
            new_store("  ").validate(),
            Err(ValidationError::Empty("name"))
        );
        assert!(matches!(
            new_store(&"x".repeat(121)).validate(),
            Err(ValidationError::TooLong { field: "name", .. })
        ));
    }

    #[test]
    fn test_new_store_rejects_owner_and_timestamps() {
        let payload = json!({
            "name": "A",
            "address": "B",
            "location": {"latitude": 1.0, "longitude": 2.0},
            "userId": "someone-else"
        });
        assert!(serde_json::from_value::<NewStore>(payload).is_err());
    }

    #[test]
    fn test_patch_rejects_immutable_fields() {
        assert!(serde_json::from_value::<StorePatch>(json!({"createdAt": "x"})).is_err());
        assert!(serde_json::from_value::<StorePatch>(json!({"userId": "x"})).is_err());
        let ok: StorePatch = serde_json::from_value(json!({"name": "New"})).unwrap();
        assert_eq!(ok.name.as_deref(), Some("New"));
    }

    #[test]
    fn test_empty_patch_is_invalid() {
        assert_eq!(
            StorePatch::default().validate(),
            Err(ValidationError::EmptyPatch)
        );
    }

    #[test]
    fn test_patch_serializes_only_present_fields() {
        let patch = StorePatch {
            address: Some("Neue Str. 2".into()),
            ..StorePatch::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"address": "Neue Str. 2"})
        );
    }

    #[test]
    fn test_store_reads_legacy_document_without_owner() {
        let store: Store = serde_json::from_value(json!({
            "id": "s1",
            "name": "Old Place",
            "address": "Somewhere",
            "location": {"latitude": 0.0, "longitude": 0.0},
            "createdAt": "2024-05-01T10:00:00.000000Z",
            "updatedAt": "2024-05-01T10:00:00.000000Z",
            "convertedFromExisting": true
        }))
        .unwrap();
        assert_eq!(store.owner, Owner::Unset);
        assert_eq!(store.converted_from_existing, Some(true));
    }
}
