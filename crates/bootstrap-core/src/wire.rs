//! HTTP/JSON wire contract shared by the gateway and the admin client.

use serde::{Deserialize, Serialize};

use crate::domain::entities::{AccountInfo, RegistrationAttempt, RegistrationFields};

/// `GET` issues a nonce.
pub const NONCE_PATH: &str = "/_synapse/admin/v1/register/nonce";

/// `POST` submits a signed registration.
pub const REGISTER_PATH: &str = "/_synapse/admin/v1/register";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceResponse {
    pub nonce: String,
}

/// Body of a registration request.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub nonce: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayname: Option<String>,
    pub mac: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("admin", &self.admin)
            .field("user_type", &self.user_type)
            .field("displayname", &self.displayname)
            .finish_non_exhaustive()
    }
}

impl From<RegisterRequest> for RegistrationAttempt {
    fn from(req: RegisterRequest) -> Self {
        RegistrationAttempt {
            fields: RegistrationFields {
                nonce: req.nonce,
                username: req.username,
                password: req.password,
                admin: req.admin,
                user_type: req.user_type,
            },
            mac: req.mac,
            display_name: req.displayname,
        }
    }
}

pub type RegisterResponse = AccountInfo;

/// Error body: `{"errcode": "...", "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub errcode: String,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}
