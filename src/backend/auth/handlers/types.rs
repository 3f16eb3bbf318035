/**
 * Authentication Handler Types
 */

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Deserialize, Serialize, Debug)]
pub struct SignupRequest {
    pub email: String,
    /// Plain password, hashed before storage
    pub password: String,
    /// Remaining user fields (`firstName`, `userName`, `workingDays`, ...)
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

/// `email` may also carry a user name
#[derive(Deserialize, Serialize, Debug)]
pub struct LoginRequest {
    #[serde(alias = "userName", alias = "username")]
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Debug)]
pub struct AuthResponse {
    /// JWT, also set as the `coredevs` cookie
    pub token: String,
    /// Client-facing user document
    pub user: Value,
}
