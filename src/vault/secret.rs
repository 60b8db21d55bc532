//! Secret records and their index entries.
//!
//! A `Secret` carries shared metadata (id, name, description, tags,
//! timestamps) plus a `SecretData` payload tagged by `SecretType`.  The
//! vault layer treats the payload as opaque; only `SecretType::fields()`
//! describes its shape, for UIs and bulk import.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, VaultError};

/// Separator used for the flattened tag string in `IndexEntry`.
pub const TAG_DELIMITER: char = ',';

/// Discriminator for the `SecretData` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecretType {
    Web,
    Note,
    ApiKey,
    Card,
}

/// Static description of one payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Key used in raw rows and in the serialized payload.
    pub name: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Whether the value should be masked when displayed.
    pub sensitive: bool,
}

const fn field(name: &'static str, label: &'static str, sensitive: bool) -> FieldDescriptor {
    FieldDescriptor {
        name,
        label,
        sensitive,
    }
}

const WEB_FIELDS: &[FieldDescriptor] = &[
    field("url", "URL", false),
    field("username", "Username", false),
    field("password", "Password", true),
    field("notes", "Notes", false),
];

const NOTE_FIELDS: &[FieldDescriptor] = &[field("text", "Text", true)];

const API_KEY_FIELDS: &[FieldDescriptor] = &[
    field("key", "API key", true),
    field("endpoint", "Endpoint", false),
];

const CARD_FIELDS: &[FieldDescriptor] = &[
    field("cardholder", "Cardholder", false),
    field("number", "Card number", true),
    field("expiry", "Expiry", false),
    field("cvv", "CVV", true),
];

impl SecretType {
    pub const ALL: [SecretType; 4] = [Self::Web, Self::Note, Self::ApiKey, Self::Card];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Note => "note",
            Self::ApiKey => "api-key",
            Self::Card => "card",
        }
    }

    /// The fields a payload of this type carries, in display order.
    pub fn fields(self) -> &'static [FieldDescriptor] {
        match self {
            Self::Web => WEB_FIELDS,
            Self::Note => NOTE_FIELDS,
            Self::ApiKey => API_KEY_FIELDS,
            Self::Card => CARD_FIELDS,
        }
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecretType {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "web" | "login" => Ok(Self::Web),
            "note" => Ok(Self::Note),
            "api-key" | "apikey" => Ok(Self::ApiKey),
            "card" => Ok(Self::Card),
            other => Err(VaultError::InvalidArgument(format!(
                "unknown secret type '{other}' (expected web, note, api-key or card)"
            ))),
        }
    }
}

/// A typed secret payload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SecretData {
    Web {
        #[serde(default)]
        url: String,
        #[serde(default)]
        username: String,
        #[serde(default)]
        password: String,
        #[serde(default)]
        notes: String,
    },
    Note {
        #[serde(default)]
        text: String,
    },
    ApiKey {
        #[serde(default)]
        key: String,
        #[serde(default)]
        endpoint: String,
    },
    Card {
        #[serde(default)]
        cardholder: String,
        #[serde(default)]
        number: String,
        #[serde(default)]
        expiry: String,
        #[serde(default)]
        cvv: String,
    },
}

impl SecretData {
    pub fn secret_type(&self) -> SecretType {
        match self {
            Self::Web { .. } => SecretType::Web,
            Self::Note { .. } => SecretType::Note,
            Self::ApiKey { .. } => SecretType::ApiKey,
            Self::Card { .. } => SecretType::Card,
        }
    }

    /// Build a payload of `secret_type` from named field values.
    ///
    /// Missing fields become empty strings; names not in the type's
    /// descriptor table are rejected.
    pub fn from_fields(secret_type: SecretType, fields: &HashMap<String, String>) -> Result<Self> {
        let known = secret_type.fields();
        if let Some(unknown) = fields
            .keys()
            .find(|k| !known.iter().any(|d| d.name == k.as_str()))
        {
            return Err(VaultError::InvalidArgument(format!(
                "field '{unknown}' does not exist on {secret_type} secrets"
            )));
        }

        let take = |name: &str| fields.get(name).cloned().unwrap_or_default();
        Ok(match secret_type {
            SecretType::Web => Self::Web {
                url: take("url"),
                username: take("username"),
                password: take("password"),
                notes: take("notes"),
            },
            SecretType::Note => Self::Note { text: take("text") },
            SecretType::ApiKey => Self::ApiKey {
                key: take("key"),
                endpoint: take("endpoint"),
            },
            SecretType::Card => Self::Card {
                cardholder: take("cardholder"),
                number: take("number"),
                expiry: take("expiry"),
                cvv: take("cvv"),
            },
        })
    }

    /// Field values in descriptor order.
    pub fn field_values(&self) -> Vec<(&'static FieldDescriptor, &str)> {
        let values: Vec<&str> = match self {
            Self::Web {
                url,
                username,
                password,
                notes,
            } => vec![url.as_str(), username.as_str(), password.as_str(), notes.as_str()],
            Self::Note { text } => vec![text.as_str()],
            Self::ApiKey { key, endpoint } => vec![key.as_str(), endpoint.as_str()],
            Self::Card {
                cardholder,
                number,
                expiry,
                cvv,
            } => vec![
                cardholder.as_str(),
                number.as_str(),
                expiry.as_str(),
                cvv.as_str(),
            ],
        };
        self.secret_type().fields().iter().zip(values).collect()
    }
}

impl fmt::Debug for SecretData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretData::{}([REDACTED])", self.secret_type())
    }
}

/// A single secret record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub data: SecretData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Secret {
    /// A new secret with a fresh id.
    pub fn new(name: impl Into<String>, data: SecretData) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
            data,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn secret_type(&self) -> SecretType {
        self.data.secret_type()
    }

    /// The index entry describing this secret.
    pub fn index_entry(&self) -> IndexEntry {
        IndexEntry {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            tags: join_tags(&self.tags),
        }
    }
}

/// Listable metadata for one secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Comma-delimited tags.
    #[serde(default)]
    pub tags: String,
}

impl IndexEntry {
    /// Tags split on the delimiter, trimmed, empties dropped.
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .split(TAG_DELIMITER)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Case-insensitive match against name, description and tags.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.name.to_lowercase().contains(&q)
            || self.description.to_lowercase().contains(&q)
            || self.tag_list().iter().any(|t| t.to_lowercase().contains(&q))
    }
}

pub(crate) fn join_tags(tags: &[String]) -> String {
    let separator = TAG_DELIMITER.to_string();
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(separator.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn web() -> SecretData {
        SecretData::Web {
            url: "https://example.com".into(),
            username: "me".into(),
            password: "hunter2".into(),
            notes: String::new(),
        }
    }

    #[test]
    fn payload_serializes_with_type_tag() {
        let json = serde_json::to_value(web()).unwrap();
        assert_eq!(json["type"], "Web");
        assert_eq!(json["username"], "me");

        let back: SecretData = serde_json::from_value(json).unwrap();
        assert_eq!(back, web());
    }

    #[test]
    fn debug_hides_payload() {
        let printed = format!("{:?}", Secret::new("login", web()));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn every_type_has_fields() {
        for t in SecretType::ALL {
            assert!(!t.fields().is_empty());
            assert_eq!(t.as_str().parse::<SecretType>().unwrap(), t);
        }
        assert!(SecretType::Web.fields().iter().any(|f| f.sensitive));
    }

    #[test]
    fn from_fields_fills_missing_and_rejects_unknown() {
        let mut fields = HashMap::new();
        fields.insert("key".to_string(), "sk-123".to_string());
        let data = SecretData::from_fields(SecretType::ApiKey, &fields).unwrap();
        assert_eq!(
            data,
            SecretData::ApiKey {
                key: "sk-123".into(),
                endpoint: String::new()
            }
        );

        fields.insert("password".to_string(), "x".to_string());
        assert!(matches!(
            SecretData::from_fields(SecretType::ApiKey, &fields),
            Err(VaultError::InvalidArgument(_))
        ));
    }

    #[test]
    fn field_values_follow_descriptor_order() {
        let data = web();
        let values = data.field_values();
        let names: Vec<_> = values.iter().map(|(d, _)| d.name).collect();
        assert_eq!(names, ["url", "username", "password", "notes"]);
        assert_eq!(values[2].1, "hunter2");
    }

    #[test]
    fn index_entry_flattens_tags() {
        let secret = Secret::new("db", SecretData::Note { text: "x".into() })
            .with_tags(["prod", " infra ", ""]);
        let entry = secret.index_entry();
        assert_eq!(entry.tags, "prod,infra");
        assert_eq!(entry.tag_list(), vec!["prod", "infra"]);
        assert_eq!(entry.id, secret.id);
    }

    #[test]
    fn index_entry_search_is_case_insensitive() {
        let entry = Secret::new("GitHub", web())
            .with_description("work account")
            .with_tags(["Dev"])
            .index_entry();
        assert!(entry.matches("github"));
        assert!(entry.matches("WORK"));
        assert!(entry.matches("dev"));
        assert!(!entry.matches("bank"));
    }
}
