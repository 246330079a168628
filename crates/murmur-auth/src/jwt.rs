// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HS256 access tokens.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use murmur_config::model::AuthConfig;
use murmur_core::types::{Principal, User, UserId};
use murmur_core::{IdentityResolver, MurmurError, StorageAdapter};
use serde::{Deserialize, Serialize};
use tracing::debug;

const ACCESS_TOKEN_TYPE: &str = "access";

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user_id: UserId,
    pub mobile_number: String,
    #[serde(rename = "type")]
    pub token_type: String,
    /// Expiry as a unix timestamp.
    pub exp: i64,
}

/// Signs and verifies access tokens with a shared secret.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiration_hours: u64,
}

impl TokenIssuer {
    pub fn new(secret: &str, expiration_hours: u64) -> Result<Self, MurmurError> {
        if secret.trim().is_empty() {
            return Err(MurmurError::Config("auth.jwt_secret must not be empty".into()));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiration_hours,
        })
    }

    /// Builds an issuer from `[auth]`. A missing secret is a configuration error.
    pub fn from_config(config: &AuthConfig) -> Result<Self, MurmurError> {
        let secret = config
            .jwt_secret
            .as_deref()
            .ok_or_else(|| MurmurError::Config("auth.jwt_secret is required".into()))?;
        Self::new(secret, config.jwt_expiration_hours)
    }

    pub fn expiration_hours(&self) -> u64 {
        self.expiration_hours
    }

    pub fn issue(&self, user: &User) -> Result<String, MurmurError> {
        self.issue_for(user.id, &user.mobile_number)
    }

    pub fn issue_for(&self, user_id: UserId, mobile_number: &str) -> Result<String, MurmurError> {
        let hours = i64::try_from(self.expiration_hours).unwrap_or(i64::MAX / 3600);
        let claims = AccessClaims {
            user_id,
            mobile_number: mobile_number.to_string(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
            exp: (chrono::Utc::now() + chrono::Duration::hours(hours)).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| MurmurError::Internal(format!("failed to sign token: {e}")))
    }

    /// Checks signature, expiry and token type.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, MurmurError> {
        let data = jsonwebtoken::decode::<AccessClaims>(
            token,
            &self.decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| {
            debug!(error = %e, "rejected access token");
            MurmurError::Unauthenticated("Could not validate credentials".into())
        })?;
        if data.claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(MurmurError::Unauthenticated("Invalid token type".into()));
        }
        Ok(data.claims)
    }
}

/// Resolves bearer tokens to principals of active, existing users.
pub struct JwtIdentity {
    issuer: Arc<TokenIssuer>,
    storage: Arc<dyn StorageAdapter>,
}

impl JwtIdentity {
    pub fn new(issuer: Arc<TokenIssuer>, storage: Arc<dyn StorageAdapter>) -> Self {
        Self { issuer, storage }
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentity {
    async fn resolve_principal(&self, credential: &str) -> Result<Principal, MurmurError> {
        let claims = self.issuer.verify(credential)?;
        let user = self
            .storage
            .get_user(claims.user_id)
            .await?
            .ok_or_else(|| MurmurError::Unauthenticated("User not found".into()))?;
        if !user.is_active {
            return Err(MurmurError::Unauthenticated("Inactive user".into()));
        }
        Ok(Principal::from(&user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_config::model::StorageConfig;
    use murmur_storage::SqliteStorage;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret", 24).unwrap()
    }

    #[test]
    fn issued_token_verifies() {
        let issuer = issuer();
        let token = issuer.issue_for(UserId(7), "+1555").unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.user_id, UserId(7));
        assert_eq!(claims.mobile_number, "+1555");
        assert_eq!(claims.token_type, "access");
        assert!(claims.exp > chrono::Utc::now().timestamp());
    }

    #[test]
    fn token_from_other_secret_rejected() {
        let token = TokenIssuer::new("other", 24)
            .unwrap()
            .issue_for(UserId(1), "+1")
            .unwrap();
        assert!(matches!(
            issuer().verify(&token),
            Err(MurmurError::Unauthenticated(_))
        ));
    }

    #[test]
    fn expired_token_rejected() {
        let claims = AccessClaims {
            user_id: UserId(1),
            mobile_number: "+1".into(),
            token_type: "access".into(),
            exp: chrono::Utc::now().timestamp() - 3600,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert!(issuer().verify(&token).is_err());
    }

    #[test]
    fn empty_or_missing_secret_is_config_error() {
        assert!(matches!(TokenIssuer::new("  ", 24), Err(MurmurError::Config(_))));
        assert!(matches!(
            TokenIssuer::from_config(&AuthConfig::default()),
            Err(MurmurError::Config(_))
        ));
    }

    #[tokio::test]
    async fn resolves_active_users_only() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::new(StorageConfig {
            database_path: dir.path().join("auth.db").to_string_lossy().to_string(),
            wal_mode: true,
        });
        storage.initialize().await.unwrap();
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);
        let user = storage.create_user("+15556000").await.unwrap();

        let issuer = Arc::new(issuer());
        let identity = JwtIdentity::new(Arc::clone(&issuer), Arc::clone(&storage));

        let principal = identity
            .resolve_principal(&issuer.issue(&user).unwrap())
            .await
            .unwrap();
        assert_eq!(principal.user_id, user.id);

        let ghost = issuer.issue_for(UserId(9_999), "+0").unwrap();
        assert!(matches!(
            identity.resolve_principal(&ghost).await,
            Err(MurmurError::Unauthenticated(_))
        ));
        assert!(identity.resolve_principal("garbage").await.is_err());
    }
}
