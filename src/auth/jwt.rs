use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Access-token claims. Tokens are issued by the identity service; this
/// service only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}


#[cfg(test)]
mod tests {
    use super::testing::{SECRET, token};
    use super::*;

    #[test]
    fn accepts_own_tokens() {
        let claims = verify_token(&token(3, Some(40), 900), SECRET).unwrap();
        assert_eq!(claims.employee_id, Some(40));
        assert_eq!(claims.role, 3);
    }

    #[test]
    fn rejects_foreign_and_expired_tokens() {
        assert!(verify_token(&token(3, Some(40), 900), "other-secret").is_err());
        // well past the default 60s leeway
        assert!(verify_token(&token(3, Some(40), -3600), SECRET).is_err());
    }
}
