use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordRequirements {
    pub min_length: u32,
    pub max_length: u32,
    #[serde(default)]
    pub requirements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordStrength {
    pub length: u32,
    pub has_uppercase: bool,
    pub has_lowercase: bool,
    pub has_digit: bool,
    pub has_symbol: bool,
    pub has_spaces: bool,
    pub has_repeating_chars: bool,
    pub is_common: bool,
    pub score: i32,
    pub strength: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordValidation {
    pub is_valid: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Request body shared by the strength and validation endpoints
#[derive(Debug, Serialize)]
pub(crate) struct PasswordCheck<'a> {
    pub password: &'a str,
}
