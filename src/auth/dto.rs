use serde::{Deserialize, Serialize};

use crate::users::model::PlainPassword;

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: PlainPassword,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub user: String, // IRI of the logged in user
}
