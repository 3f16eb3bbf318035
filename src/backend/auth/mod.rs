//! Authentication Module
//!
//! - **`sessions`** - JWT creation and verification
//! - **`handlers`** - signup, login, logout and current-user endpoints
//!
//! Users are ordinary documents of the `users` collection; passwords are
//! stored as bcrypt hashes in the hidden `password` field.

pub mod handlers;
pub mod sessions;

use bcrypt::{hash, DEFAULT_COST};
use serde_json::{Map, Value};
use tracing::{error, warn};

pub use handlers::types::{AuthResponse, LoginRequest, SignupRequest};
pub use handlers::{get_me, login, logout, signup};
pub use sessions::{create_token, verify_token, Claims};

use crate::backend::error::BackendError;
use crate::backend::services::user::USERS;
use crate::backend::store::{Document, Store};
use crate::shared::Environment;

/// bcrypt's minimum cost keeps the test suite fast
const TEST_COST: u32 = 4;

pub fn hash_password(password: &str, environment: Environment) -> Result<String, BackendError> {
    let cost = match environment {
        Environment::Test => TEST_COST,
        _ => DEFAULT_COST,
    };
    hash(password, cost).map_err(|e| {
        error!("Failed to hash password: {:?}", e);
        BackendError::internal("Server error")
    })
}

/// Verify a token and load its user; `None` on any failure
pub async fn decode_auth_token(store: &Store, secret: &str, token: &str) -> Option<Document> {
    let claims = match verify_token(secret, token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!("Invalid auth token: {}", e);
            return None;
        }
    };

    let users = match store.collection(USERS) {
        Ok(users) => users,
        Err(e) => {
            error!("{}", e);
            return None;
        }
    };

    let mut filter = Map::new();
    filter.insert("id".to_string(), Value::String(claims.id.clone()));
    match users.find_one(filter, None).await {
        Ok(Some(user)) => Some(user),
        Ok(None) => {
            warn!(user = %claims.id, "Token user not found");
            None
        }
        Err(e) => {
            error!("Failed to load token user: {}", e);
            None
        }
    }
}
