//! User profile fields
//!
//! Profile persistence is plain CRUD against the key-value store; the
//! interesting identity behavior (state transitions, inbox
//! subscription, listener startup) lives in [`crate::client`].

use chrono::Local;
use std::collections::HashMap;

/// Display order for known profile fields
const FIELD_ORDER: [&str; 5] = ["name", "age", "gender", "location", "join_date"];

/// Profile fields collected at identification
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub age: String,
    pub gender: String,
    pub location: String,
}

impl UserProfile {
    pub fn new(
        age: impl Into<String>,
        gender: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            age: age.into(),
            gender: gender.into(),
            location: location.into(),
        }
    }

    /// The stored hash record for this profile, join-dated now
    pub fn to_fields(&self, username: &str) -> HashMap<String, String> {
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), username.to_string());
        fields.insert("age".to_string(), self.age.clone());
        fields.insert("gender".to_string(), self.gender.clone());
        fields.insert("location".to_string(), self.location.clone());
        fields.insert(
            "join_date".to_string(),
            Local::now().format("%Y-%m-%d %I:%M:%S").to_string(),
        );
        fields
    }
}

/// Key of a user's profile record
pub fn user_key(username: &str) -> String {
    format!("user:{}", username)
}

/// Username from a profile record key
pub fn username_from_key(key: &str) -> Option<&str> {
    key.strip_prefix("user:")
}

/// Format stored profile fields for display, one `Key: value` line each,
/// known fields first in a stable order
pub fn format_fields(fields: &HashMap<String, String>, skip_name: bool) -> Vec<String> {
    let mut lines = Vec::new();

    for field in FIELD_ORDER {
        if skip_name && field == "name" {
            continue;
        }
        if let Some(value) = fields.get(field) {
            lines.push(format!("{}: {}", capitalize(field), value));
        }
    }

    let mut extra: Vec<&String> = fields
        .keys()
        .filter(|k| !FIELD_ORDER.contains(&k.as_str()))
        .collect();
    extra.sort();
    for key in extra {
        lines.push(format!("{}: {}", capitalize(key), &fields[key]));
    }

    lines
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_fields() {
        let profile = UserProfile::new("30", "f", "paris");
        let fields = profile.to_fields("alice");

        assert_eq!(fields.get("name"), Some(&"alice".to_string()));
        assert_eq!(fields.get("location"), Some(&"paris".to_string()));
        assert!(fields.contains_key("join_date"));
    }

    #[test]
    fn test_user_key_round_trip() {
        assert_eq!(user_key("alice"), "user:alice");
        assert_eq!(username_from_key("user:alice"), Some("alice"));
        assert_eq!(username_from_key("channels:alice"), None);
    }

    #[test]
    fn test_format_fields_order_and_skip() {
        let fields = UserProfile::new("30", "f", "paris").to_fields("alice");

        let lines = format_fields(&fields, true);
        assert_eq!(lines[0], "Age: 30");
        assert!(!lines.iter().any(|l| l.starts_with("Name:")));

        let lines = format_fields(&fields, false);
        assert_eq!(lines[0], "Name: alice");
        assert_eq!(lines[1], "Age: 30");
    }
}
