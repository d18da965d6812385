//! Wire types shared by the login and registration handlers.

use serde::Serialize;
use utoipa::ToSchema;

use super::storage::User;

/// Response for a successful login or registration: the access token plus a
/// profile echo the mobile client renders immediately.
#[derive(ToSchema, Serialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub age: Option<i32>,
    pub weight: Option<i32>,
    pub height: Option<i32>,
    pub goal: Option<String>,
    pub diet: Option<String>,
    pub activity_level: Option<String>,
    pub health_conditions: Option<String>,
}

impl TokenResponse {
    #[must_use]
    pub fn new(access_token: String, user: &User) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            age: user.age,
            weight: user.weight,
            height: user.height,
            goal: user.goal.clone(),
            diet: user.diet.clone(),
            activity_level: user.activity_level.clone(),
            health_conditions: user.health_conditions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_token_type_is_bearer() {
        let user = User {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
            hashed_password: "digest".to_string(),
            age: Some(30),
            weight: None,
            height: None,
            goal: Some("maintain".to_string()),
            diet: None,
            activity_level: None,
            health_conditions: None,
            profile_picture: None,
        };

        let response = TokenResponse::new("token".to_string(), &user);

        assert_eq!(response.token_type, "bearer");
        assert_eq!(response.access_token, "token");
        assert_eq!(response.age, Some(30));
        assert_eq!(response.goal.as_deref(), Some("maintain"));
    }
}
