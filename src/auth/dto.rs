use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::User;

/// Request body for user registration. Required fields are validated by the
/// handler so missing values map to 400 rather than a deserialization error.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Public part of the user returned to clients. The credential hash never
/// leaves the repo layer.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            is_active: u.is_active,
            created_at: u.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn user_response_shape() {
        let resp = UserResponse {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            first_name: Some("Alice".into()),
            last_name: None,
            is_active: true,
            created_at: datetime!(2024-01-01 00:00:00 UTC),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["email"], "alice@example.com");
        assert_eq!(json["is_active"], true);
        assert_eq!(json["last_name"], serde_json::Value::Null);
        assert_eq!(json["created_at"], "2024-01-01T00:00:00Z");
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn register_request_tolerates_missing_fields() {
        let req: RegisterRequest = serde_json::from_str(r#"{"username": "bob"}"#).unwrap();
        assert_eq!(req.username.as_deref(), Some("bob"));
        assert!(req.email.is_none());
        assert!(req.password.is_none());
    }
}
