//! murmur-core: shared types for the murmur E2E messaging core
//!
//! - `config`: TOML configuration schema (`murmur.toml`)
//! - `metadata`: the recursive `MetadataValue` type attached to messages
//! - `preferences`: typed user preferences with open extension fields
//! - `now_millis`: wall-clock timestamps in epoch milliseconds

pub mod config;
pub mod error;
pub mod metadata;
pub mod preferences;

pub use error::{MurmurError, MurmurResult};
pub use metadata::{validate_metadata_value, MessageMetadata, MetadataValue};
pub use preferences::{
    is_valid_user_preferences, MessagePrivacy, PrivacySettings, ProfileVisibility,
    UserPreferences,
};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time in milliseconds since the Unix epoch; 0 if the clock is
/// set before 1970.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
