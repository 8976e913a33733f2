//! Document values and write payloads.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::BackendError;

/// Field map of a stored document.
pub type Fields = Map<String, Value>;

/// A document as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Backend-assigned identifier, unique within the collection.
    pub id: String,
    /// Document fields. Never contains the `id` key.
    pub data: Fields,
}

impl Document {
    /// Decode the document into a model type.
    ///
    /// The document id is exposed to the model as an `id` field.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if the fields do not match the model.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let mut object = self.data.clone();
        object.insert("id".to_owned(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(object))
    }

    /// Returns a field value, if present.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

/// A single field in a write.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A concrete value supplied by the caller.
    Value(Value),
    /// Placeholder replaced by the backend's clock at commit time.
    ServerTimestamp,
}

/// Fields to write in a create or partial update.
///
/// Every [`FieldValue::ServerTimestamp`] placeholder in one write resolves to
/// the same instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteFields(BTreeMap<String, FieldValue>);

impl WriteFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a write from any value that serializes to a JSON object.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotAnObject` if the value is not an object, or
    /// `BackendError::Serialization` if serialization fails.
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self, BackendError> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self(
                map.into_iter()
                    .map(|(k, v)| (k, FieldValue::Value(v)))
                    .collect(),
            )),
            _ => Err(BackendError::NotAnObject),
        }
    }

    /// Set a field to a concrete value.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), FieldValue::Value(value.into()));
        self
    }

    /// Set a field to the commit timestamp.
    #[must_use]
    pub fn server_timestamp(mut self, key: impl Into<String>) -> Self {
        self.0.insert(key.into(), FieldValue::ServerTimestamp);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve placeholders and merge into `target`.
    pub(crate) fn apply(self, target: &mut Fields, now: DateTime<Utc>) {
        let stamp = encode_timestamp(now);
        for (key, value) in self.0 {
            // `id` is metadata, not a field
            if key == "id" {
                continue;
            }
            let resolved = match value {
                FieldValue::Value(v) => v,
                FieldValue::ServerTimestamp => stamp.clone(),
            };
            target.insert(key, resolved);
        }
    }

    /// Resolve placeholders into a fresh field map.
    pub(crate) fn resolve(self, now: DateTime<Utc>) -> Fields {
        let mut fields = Fields::new();
        self.apply(&mut fields, now);
        fields
    }
}

/// Encode a timestamp the way documents store it.
///
/// RFC 3339 in UTC with a fixed microsecond precision, so string order is
/// chronological order.
#[must_use]
pub fn encode_timestamp(ts: DateTime<Utc>) -> Value {
    Value::String(ts.to_rfc3339_opts(SecondsFormat::Micros, true))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Payload {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
    }

    #[test]
    fn test_placeholders_share_one_instant() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let fields = WriteFields::new()
            .set("name", "Grill House")
            .server_timestamp("createdAt")
            .server_timestamp("updatedAt")
            .resolve(now);

        assert_eq!(fields["createdAt"], fields["updatedAt"]);
        assert_eq!(fields["createdAt"], json!("2025-03-01T12:00:00.000000Z"));
        assert_eq!(fields["name"], json!("Grill House"));
    }

    #[test]
    fn test_from_serializable_skips_absent_fields() {
        let write = WriteFields::from_serializable(&Payload {
            name: "x".into(),
            image_url: None,
        })
        .unwrap();
        assert!(write.get("name").is_some());
        assert!(write.get("imageUrl").is_none());
    }

    #[test]
    fn test_from_serializable_rejects_non_objects() {
        assert!(matches!(
            WriteFields::from_serializable(&5),
            Err(BackendError::NotAnObject)
        ));
    }

    #[test]
    fn test_apply_merges_and_ignores_id() {
        let now = Utc::now();
        let mut target = Fields::new();
        target.insert("name".into(), json!("old"));
        target.insert("address".into(), json!("Main St 1"));

        WriteFields::new()
            .set("name", "new")
            .set("id", "forged")
            .apply(&mut target, now);

        assert_eq!(target["name"], json!("new"));
        assert_eq!(target["address"], json!("Main St 1"));
        assert!(!target.contains_key("id"));
    }

    #[test]
    fn test_decode_exposes_id() {
        #[derive(Deserialize)]
        struct Named {
            id: String,
            name: String,
        }

        let mut data = Fields::new();
        data.insert("name".into(), json!("Burger Bar"));
        let doc = Document {
            id: "abc".into(),
            data,
        };
        let named: Named = doc.decode().unwrap();
        assert_eq!(named.id, "abc");
        assert_eq!(named.name, "Burger Bar");
    }

    #[test]
    fn test_timestamp_encoding_sorts_chronologically() {
        let a = encode_timestamp(Utc.with_ymd_and_hms(2025, 1, 9, 0, 0, 0).unwrap());
        let b = encode_timestamp(Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap());
        assert!(a.as_str().unwrap() < b.as_str().unwrap());
    }
}
