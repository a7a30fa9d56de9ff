//! Profile completeness evaluation
//!
//! A profile is a flat JSON object. Every key that is not excluded counts as
//! one field; a field is complete when its value is not empty.

use serde::Serialize;
use serde_json::Value;

/// Administrative and derived fields that members cannot edit
pub const ADMIN_FIELDS: [&str; 12] = [
    "id",
    "created_at",
    "updated_at",
    "is_active",
    "is_admin",
    "is_staff",
    "membership_type",
    "membership_detail",
    "payment_status",
    "plan_type",
    "profile_pic",
    "bio",
];

/// Result of a profile completeness check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileCompletion {
    pub total_fields: usize,
    pub completed_fields: usize,
    /// Empty fields, in the order they appear in the profile
    pub incomplete_fields: Vec<String>,
    /// Rounded to the nearest integer, 0 when there are no fields
    pub completion_percentage: u8,
    pub is_complete: bool,
}

/// Check how complete a profile is
///
/// Anything other than a JSON object, `null` included, is treated as a
/// profile without fields.
pub fn check_profile_completion(profile: &Value, exclude_fields: &[&str]) -> ProfileCompletion {
    let fields = profile
        .as_object()
        .into_iter()
        .flatten()
        .filter(|(key, _)| !exclude_fields.contains(&key.as_str()));

    let mut total_fields = 0;
    let mut incomplete_fields = Vec::new();
    for (key, value) in fields {
        total_fields += 1;
        if is_empty_value(value) {
            incomplete_fields.push(key.clone());
        }
    }

    let completed_fields = total_fields - incomplete_fields.len();
    let completion_percentage = if total_fields == 0 {
        0
    } else {
        (completed_fields as f64 / total_fields as f64 * 100.0).round() as u8
    };

    ProfileCompletion {
        total_fields,
        completed_fields,
        is_complete: incomplete_fields.is_empty(),
        incomplete_fields,
        completion_percentage,
    }
}

/// Whether a profile value counts as not filled in
///
/// `0` and `false` are answers, not blanks.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
