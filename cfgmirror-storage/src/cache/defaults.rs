//! Hardcoded default dataset.
//!
//! Served by the fallback provider when the store cannot be used, and the
//! source of the named per-field defaults of the domain readers. Every entry
//! carries a declared kind and its value must satisfy it, so consumers see
//! the same shapes whether data is live or not.

use cfgmirror_core::{PublicEntry, ValueKind, COMPLAINT_TYPE_ENTRY_TYPE};

/// Well-known configuration keys.
pub mod keys {
    pub const APP_NAME: &str = "APP_NAME";
    pub const APP_VERSION: &str = "APP_VERSION";
    pub const APP_LOGO_URL: &str = "APP_LOGO_URL";
    pub const APP_PRIMARY_COLOR: &str = "APP_PRIMARY_COLOR";
    pub const APP_TAGLINE: &str = "APP_TAGLINE";

    pub const EMAIL_FROM_NAME: &str = "EMAIL_FROM_NAME";
    pub const EMAIL_FROM_ADDRESS: &str = "EMAIL_FROM_ADDRESS";
    pub const EMAIL_REPLY_TO: &str = "EMAIL_REPLY_TO";
    pub const EMAIL_FOOTER: &str = "EMAIL_FOOTER";

    pub const OTP_EXPIRY_MINUTES: &str = "OTP_EXPIRY_MINUTES";
    pub const SESSION_TIMEOUT_HOURS: &str = "SESSION_TIMEOUT_HOURS";
    pub const COMPLAINT_AUTO_CLOSE_DAYS: &str = "COMPLAINT_AUTO_CLOSE_DAYS";
    pub const MAX_FILE_SIZE: &str = "MAX_FILE_SIZE";
    pub const MAX_DESCRIPTION_LENGTH: &str = "MAX_DESCRIPTION_LENGTH";
    pub const ATTACHMENT_LIMIT: &str = "ATTACHMENT_LIMIT";

    pub const EMAIL_NOTIFICATIONS_ENABLED: &str = "EMAIL_NOTIFICATIONS_ENABLED";
    pub const SMS_NOTIFICATIONS_ENABLED: &str = "SMS_NOTIFICATIONS_ENABLED";
    pub const MAINTENANCE_MODE: &str = "MAINTENANCE_MODE";

    pub const NOTIFICATION_SETTINGS: &str = "NOTIFICATION_SETTINGS";
    pub const SERVICE_AREA_BOUNDARY: &str = "SERVICE_AREA_BOUNDARY";
}

pub const DEFAULT_APP_NAME: &str = "Citizen Complaint Portal";
pub const DEFAULT_APP_VERSION: &str = "1.0.0";
pub const DEFAULT_APP_LOGO_URL: &str = "/logo.png";
pub const DEFAULT_APP_PRIMARY_COLOR: &str = "#0f766e";
pub const DEFAULT_APP_TAGLINE: &str = "Report and track civic issues";

pub const DEFAULT_EMAIL_FROM_NAME: &str = DEFAULT_APP_NAME;
pub const DEFAULT_EMAIL_FROM_ADDRESS: &str = "noreply@example.org";
pub const DEFAULT_EMAIL_REPLY_TO: &str = "support@example.org";
pub const DEFAULT_EMAIL_FOOTER: &str = "This is an automated message. Please do not reply.";

/// One entry of the default dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultSetting {
    pub key: &'static str,
    pub value: &'static str,
    pub kind: ValueKind,
    pub description: &'static str,
}

impl DefaultSetting {
    const fn new(
        key: &'static str,
        value: &'static str,
        kind: ValueKind,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            value,
            kind,
            description,
        }
    }

    pub fn to_entry(&self) -> PublicEntry {
        PublicEntry {
            key: self.key.to_string(),
            value: self.value.to_string(),
            description: Some(self.description.to_string()),
            entry_type: Some(self.kind.as_str().to_string()),
            enabled: true,
        }
    }
}

pub static DEFAULT_SETTINGS: &[DefaultSetting] = &[
    DefaultSetting::new(keys::APP_NAME, DEFAULT_APP_NAME, ValueKind::String, "Application display name"),
    DefaultSetting::new(keys::APP_VERSION, DEFAULT_APP_VERSION, ValueKind::String, "Application version"),
    DefaultSetting::new(keys::APP_LOGO_URL, DEFAULT_APP_LOGO_URL, ValueKind::String, "Logo image URL"),
    DefaultSetting::new(keys::APP_PRIMARY_COLOR, DEFAULT_APP_PRIMARY_COLOR, ValueKind::String, "Primary brand color"),
    DefaultSetting::new(keys::APP_TAGLINE, DEFAULT_APP_TAGLINE, ValueKind::String, "Tagline shown under the logo"),
    DefaultSetting::new(keys::OTP_EXPIRY_MINUTES, "5", ValueKind::Number, "One-time password lifetime in minutes"),
    DefaultSetting::new(keys::SESSION_TIMEOUT_HOURS, "24", ValueKind::Number, "Session lifetime in hours"),
    DefaultSetting::new(keys::COMPLAINT_AUTO_CLOSE_DAYS, "7", ValueKind::Number, "Days before resolved complaints close"),
    DefaultSetting::new(keys::MAX_FILE_SIZE, "10485760", ValueKind::Number, "Maximum upload size in bytes"),
    DefaultSetting::new(keys::MAX_DESCRIPTION_LENGTH, "2000", ValueKind::Number, "Maximum complaint description length"),
    DefaultSetting::new(keys::ATTACHMENT_LIMIT, "5", ValueKind::Number, "Maximum attachments per complaint"),
    DefaultSetting::new(keys::EMAIL_NOTIFICATIONS_ENABLED, "true", ValueKind::Boolean, "Send email notifications"),
    DefaultSetting::new(keys::SMS_NOTIFICATIONS_ENABLED, "false", ValueKind::Boolean, "Send SMS notifications"),
    DefaultSetting::new(keys::MAINTENANCE_MODE, "false", ValueKind::Boolean, "Reject new complaints while enabled"),
    DefaultSetting::new(
        keys::NOTIFICATION_SETTINGS,
        r#"{"email":true,"sms":false,"inApp":true}"#,
        ValueKind::Json,
        "Notification channel toggles",
    ),
    DefaultSetting::new(
        keys::SERVICE_AREA_BOUNDARY,
        r#"{"type":"Polygon","coordinates":[]}"#,
        ValueKind::Json,
        "GeoJSON boundary of the service area",
    ),
    DefaultSetting::new(keys::EMAIL_FROM_NAME, DEFAULT_EMAIL_FROM_NAME, ValueKind::String, "Sender display name"),
    DefaultSetting::new(keys::EMAIL_FROM_ADDRESS, DEFAULT_EMAIL_FROM_ADDRESS, ValueKind::String, "Sender address"),
    DefaultSetting::new(keys::EMAIL_REPLY_TO, DEFAULT_EMAIL_REPLY_TO, ValueKind::String, "Reply-to address"),
    DefaultSetting::new(keys::EMAIL_FOOTER, DEFAULT_EMAIL_FOOTER, ValueKind::String, "Footer appended to emails"),
];

/// `(code, name, description)` of the default complaint types.
pub static DEFAULT_COMPLAINT_TYPES: &[(&str, &str, &str)] = &[
    ("WATER_SUPPLY", "Water Supply", "Water supply interruptions and leaks"),
    ("ELECTRICITY", "Electricity", "Power outages and faulty connections"),
    ("ROAD_REPAIR", "Road Repair", "Potholes and damaged roads"),
    ("GARBAGE", "Garbage Collection", "Missed pickups and illegal dumping"),
    ("STREET_LIGHTING", "Street Lighting", "Broken or missing street lights"),
    ("DRAINAGE", "Drainage", "Blocked drains and flooding"),
    ("OTHER", "Other", "Anything not covered above"),
];

/// Default value for a key, if the default dataset has one.
pub fn default_value(key: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS
        .iter()
        .find(|setting| setting.key == key)
        .map(|setting| setting.value)
}

/// The default configuration entries, in public entry shape.
pub fn default_config_entries() -> Vec<PublicEntry> {
    DEFAULT_SETTINGS.iter().map(DefaultSetting::to_entry).collect()
}

/// The default complaint types, in public entry shape.
pub fn default_complaint_types() -> Vec<PublicEntry> {
    DEFAULT_COMPLAINT_TYPES
        .iter()
        .map(|(code, name, description)| PublicEntry {
            key: code.to_string(),
            value: name.to_string(),
            description: Some(description.to_string()),
            entry_type: Some(COMPLAINT_TYPE_ENTRY_TYPE.to_string()),
            enabled: true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_defaults_satisfy_declared_kind() {
        for entry in default_config_entries() {
            let declared = entry.entry_type.as_deref().unwrap();
            let kind = ValueKind::from_declared(declared).unwrap();
            assert!(
                kind.accepts(&entry.value),
                "{} = {:?} is not a valid {}",
                entry.key,
                entry.value,
                kind
            );
        }
    }

    #[test]
    fn test_defaults_agree_with_key_conventions() {
        for setting in DEFAULT_SETTINGS {
            assert_eq!(
                ValueKind::infer_from_key(setting.key),
                setting.kind,
                "{} declares {} but its name implies otherwise",
                setting.key,
                setting.kind
            );
        }
    }

    #[test]
    fn test_default_keys_are_unique() {
        let keys: HashSet<_> = DEFAULT_SETTINGS.iter().map(|s| s.key).collect();
        assert_eq!(keys.len(), DEFAULT_SETTINGS.len());

        let codes: HashSet<_> = DEFAULT_COMPLAINT_TYPES.iter().map(|(c, _, _)| *c).collect();
        assert_eq!(codes.len(), DEFAULT_COMPLAINT_TYPES.len());
    }

    #[test]
    fn test_default_entries_have_full_shape() {
        for entry in default_config_entries().iter().chain(default_complaint_types().iter()) {
            assert!(!entry.key.is_empty());
            assert!(entry.description.is_some());
            assert!(entry.entry_type.is_some());
            assert!(entry.enabled);
        }
    }

    #[test]
    fn test_default_value_lookup() {
        assert_eq!(default_value(keys::APP_NAME), Some(DEFAULT_APP_NAME));
        assert_eq!(default_value(keys::MAINTENANCE_MODE), Some("false"));
        assert_eq!(default_value("NOPE"), None);
    }
}
