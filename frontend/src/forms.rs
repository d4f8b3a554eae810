use serde::Deserialize;
use validator::Validate;

/// Login form posted from the home page. Missing fields decode as empty
/// strings so they are reported by validation rather than by the extractor.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}
