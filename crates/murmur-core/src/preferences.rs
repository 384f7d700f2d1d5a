//! User preferences: a handful of typed fields plus open extension fields.
//!
//! Preferences are stored encrypted (see `murmur_crypto::preferences`), so
//! the structural check here runs both before encryption and after
//! decryption of untrusted JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::metadata::{validate_metadata_value, MetadataValue};

const KNOWN_FIELDS: [&str; 4] = ["theme", "language", "notifications", "privacy"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileVisibility {
    #[default]
    Public,
    Friends,
    Private,
}

impl ProfileVisibility {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Self::Public),
            "friends" => Some(Self::Friends),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessagePrivacy {
    Anyone,
    #[default]
    Friends,
    None,
}

impl MessagePrivacy {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "anyone" => Some(Self::Anyone),
            "friends" => Some(Self::Friends),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrivacySettings {
    pub profile_visibility: ProfileVisibility,
    pub message_privacy: MessagePrivacy,
}

/// Per-user preferences. Unknown keys land in `extra` and must be valid
/// metadata values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserPreferences {
    pub theme: String,
    pub language: String,
    pub notifications: bool,
    pub privacy: PrivacySettings,
    #[serde(flatten)]
    pub extra: BTreeMap<String, MetadataValue>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: "light".into(),
            language: "en".into(),
            notifications: true,
            privacy: PrivacySettings::default(),
            extra: BTreeMap::new(),
        }
    }
}

impl UserPreferences {
    /// Validate the extension fields of a typed value.
    pub fn validate(&self) -> Result<(), String> {
        for (key, value) in &self.extra {
            if KNOWN_FIELDS.contains(&key.as_str()) {
                return Err(format!("extension field '{key}' shadows a known preference"));
            }
            if !validate_metadata_value(value) {
                return Err(format!("extension field '{key}' is not a valid metadata value"));
            }
        }
        Ok(())
    }
}

/// Structural check of an untyped preferences document.
///
/// Known fields are optional but must have the right type when present, and
/// the privacy enums are checked against their closed value sets. Every other
/// field must be a valid metadata value.
pub fn is_valid_user_preferences(value: &serde_json::Value) -> bool {
    let Some(prefs) = value.as_object() else {
        return false;
    };

    if prefs.get("theme").is_some_and(|v| !v.is_string()) {
        return false;
    }
    if prefs.get("language").is_some_and(|v| !v.is_string()) {
        return false;
    }
    if prefs.get("notifications").is_some_and(|v| !v.is_boolean()) {
        return false;
    }

    if let Some(privacy) = prefs.get("privacy") {
        let Some(privacy) = privacy.as_object() else {
            return false;
        };
        if let Some(visibility) = privacy.get("profileVisibility") {
            if visibility.as_str().and_then(ProfileVisibility::parse).is_none() {
                return false;
            }
        }
        if let Some(message_privacy) = privacy.get("messagePrivacy") {
            if message_privacy.as_str().and_then(MessagePrivacy::parse).is_none() {
                return false;
            }
        }
    }

    prefs
        .iter()
        .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
        .all(|(_, v)| validate_metadata_value(&MetadataValue::from(v.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let prefs = UserPreferences::default();
        assert_eq!(prefs.theme, "light");
        assert_eq!(prefs.language, "en");
        assert!(prefs.notifications);
        assert_eq!(prefs.privacy.profile_visibility, ProfileVisibility::Public);
        assert_eq!(prefs.privacy.message_privacy, MessagePrivacy::Friends);
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let prefs: UserPreferences =
            serde_json::from_value(json!({"theme": "dark", "fontSize": 14})).unwrap();
        assert_eq!(prefs.theme, "dark");
        assert_eq!(prefs.language, "en");
        assert_eq!(prefs.extra.get("fontSize"), Some(&MetadataValue::Number(14.0)));
        assert!(prefs.validate().is_ok());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(UserPreferences::default()).unwrap();
        assert_eq!(json["privacy"]["profileVisibility"], "public");
        assert_eq!(json["privacy"]["messagePrivacy"], "friends");
    }

    #[test]
    fn test_valid_documents() {
        assert!(is_valid_user_preferences(&json!({})));
        assert!(is_valid_user_preferences(&json!({
            "theme": "dark",
            "language": "fr",
            "notifications": false,
            "privacy": {"profileVisibility": "private", "messagePrivacy": "none"},
            "custom": {"nested": [1, "two", null]}
        })));
    }

    #[test]
    fn test_rejects_non_objects() {
        assert!(!is_valid_user_preferences(&json!(null)));
        assert!(!is_valid_user_preferences(&json!("prefs")));
        assert!(!is_valid_user_preferences(&json!([1, 2])));
    }

    #[test]
    fn test_rejects_wrong_field_types() {
        assert!(!is_valid_user_preferences(&json!({"theme": 3})));
        assert!(!is_valid_user_preferences(&json!({"language": null})));
        assert!(!is_valid_user_preferences(&json!({"notifications": "yes"})));
        assert!(!is_valid_user_preferences(&json!({"privacy": "public"})));
    }

    #[test]
    fn test_rejects_values_outside_enum_sets() {
        assert!(!is_valid_user_preferences(
            &json!({"privacy": {"profileVisibility": "everyone"}})
        ));
        assert!(!is_valid_user_preferences(
            &json!({"privacy": {"messagePrivacy": "friends-of-friends"}})
        ));
        assert!(!is_valid_user_preferences(
            &json!({"privacy": {"messagePrivacy": 1}})
        ));
    }

    #[test]
    fn test_typed_validate_rejects_bad_extension() {
        let mut prefs = UserPreferences::default();
        prefs.extra.insert("ratio".into(), MetadataValue::Number(f64::INFINITY));
        assert!(prefs.validate().is_err());

        let mut prefs = UserPreferences::default();
        prefs.extra.insert("theme".into(), MetadataValue::from("dark"));
        assert!(prefs.validate().is_err());
    }
}
