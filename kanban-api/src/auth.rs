//! Authentication Module
//!
//! Bearer-token authentication for the kanban API. Tokens are HS256 JWTs
//! carrying the caller's user id in a `user_id` claim (`sub` is accepted
//! as a fallback). Registration and login live elsewhere; this module only
//! validates tokens and, for tooling and tests, issues them.

use crate::error::{ApiError, ApiResult};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use kanban_core::UserId;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

// ============================================================================
// CLOCK ABSTRACTION
// ============================================================================

/// Clock used for JWT time validation.
///
/// Time checks are done here rather than inside `jsonwebtoken` so tests can
/// pin the clock and a broken host clock fails loudly instead of panicking.
pub trait JwtClock: Send + Sync {
    /// Current time as Unix epoch seconds. Negative before 1970.
    fn now_epoch_secs(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}


// ============================================================================
// JWT SECRET
// ============================================================================

/// Signing secret that never shows up in logs or `Debug` output.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// # Errors
    /// Returns an error if the secret is empty.
    pub fn new(secret: String) -> ApiResult<Self> {
        if secret.is_empty() {
            return Err(ApiError::malformed("JWT secret must not be empty"));
        }
        Ok(Self(SecretString::new(secret.into())))
    }

    /// Only for signing and verification.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: JwtSecret,

    /// Signing algorithm (HS256)
    pub jwt_algorithm: Algorithm,

    /// Lifetime of issued tokens in seconds (default: 24 hours)
    pub jwt_expiration_secs: i64,

    /// Tolerated clock drift in seconds when checking `exp`/`nbf` (default: 60)
    pub jwt_clock_skew_secs: i64,

    pub clock: Arc<dyn JwtClock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("jwt_clock_skew_secs", &self.jwt_clock_skew_secs)
            .field("clock", &"<JwtClock>")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: build_jwt_secret(INSECURE_DEFAULT_SECRET.to_string()),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: 86_400,
            jwt_clock_skew_secs: 60,
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// Build the configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `KANBAN_JWT_SECRET`: HMAC signing secret
    /// - `KANBAN_JWT_EXPIRATION_SECS`: token lifetime (default: 86400)
    /// - `KANBAN_JWT_CLOCK_SKEW_SECS`: clock skew tolerance (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let secret_str = std::env::var("KANBAN_JWT_SECRET")
            .unwrap_or_else(|_| INSECURE_DEFAULT_SECRET.to_string());

        Self {
            jwt_secret: build_jwt_secret(secret_str),
            jwt_expiration_secs: std::env::var("KANBAN_JWT_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jwt_expiration_secs),
            jwt_clock_skew_secs: std::env::var("KANBAN_JWT_CLOCK_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jwt_clock_skew_secs),
            ..defaults
        }
    }

    /// Refuse to start a production server with a weak secret.
    ///
    /// Outside production the same problems are only logged.
    pub fn validate_for_production(&self, is_production: bool) -> ApiResult<()> {
        if self.jwt_secret.is_insecure_default() {
            if is_production {
                return Err(ApiError::malformed(
                    "Cannot start in production with the insecure default JWT secret. \
                     Set KANBAN_JWT_SECRET to a secure value.",
                ));
            }
            tracing::warn!(
                "Using the insecure default JWT secret. Set KANBAN_JWT_SECRET \
                 to a random value of at least 32 characters before deploying."
            );
        }

        if self.jwt_secret.len() < 32 {
            if is_production {
                return Err(ApiError::malformed(format!(
                    "JWT secret is too short for production use ({} chars). \
                     It must be at least 32 characters long.",
                    self.jwt_secret.len()
                )));
            } else if !self.jwt_secret.is_insecure_default() {
                tracing::warn!(
                    length = self.jwt_secret.len(),
                    "JWT secret is shorter than 32 characters"
                );
            }
        }

        Ok(())
    }
}

fn build_jwt_secret(secret_str: String) -> JwtSecret {
    let normalized = if secret_str.trim().is_empty() {
        INSECURE_DEFAULT_SECRET.to_string()
    } else {
        secret_str
    };

    match JwtSecret::new(normalized) {
        Ok(secret) => secret,
        Err(_) => JwtSecret(SecretString::new(INSECURE_DEFAULT_SECRET.to_string().into())),
    }
}

// ============================================================================
// JWT CLAIMS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Caller's user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Standard subject claim, used when `user_id` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: UserId, expiration_secs: i64, clock: &dyn JwtClock) -> Self {
        let now = clock.now_epoch_secs();
        Self {
            user_id: Some(user_id.to_string()),
            sub: None,
            iat: Some(now),
            nbf: None,
            exp: now + expiration_secs,
        }
    }

    pub fn is_expired(&self, clock: &dyn JwtClock) -> bool {
        self.exp < clock.now_epoch_secs()
    }

    /// The authenticated user, from `user_id` or else `sub`.
    pub fn caller(&self) -> ApiResult<UserId> {
        let raw = self
            .user_id
            .as_deref()
            .or(self.sub.as_deref())
            .ok_or_else(|| ApiError::invalid_token("Token carries no user id"))?;
        raw.parse::<UserId>()
            .map_err(|_| ApiError::invalid_token("Token user id is not a valid UUID"))
    }
}

// ============================================================================
// AUTHENTICATION CONTEXT
// ============================================================================

/// Injected into request extensions after successful authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: UserId,
}

// ============================================================================
// AUTHENTICATION FUNCTIONS
// ============================================================================

fn validate_claim_times(now: i64, exp: i64, nbf: Option<i64>, leeway_secs: i64) -> ApiResult<()> {
    if let Some(nbf) = nbf {
        if now + leeway_secs < nbf {
            return Err(ApiError::invalid_token("Token not yet valid (nbf)"));
        }
    }

    if exp < now - leeway_secs {
        return Err(ApiError::token_expired());
    }

    Ok(())
}

/// Verify the signature of `token` and check its times against the
/// configured clock.
pub fn validate_jwt_token(config: &AuthConfig, token: &str) -> ApiResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose().as_bytes());

    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims = HashSet::from(["exp".to_string()]);

    let token_data =
        decode::<Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::InvalidToken => {
                ApiError::invalid_token("Token is invalid")
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                ApiError::invalid_token("Token signature is invalid")
            }
            _ => ApiError::invalid_token(format!("Token validation failed: {}", e)),
        })?;

    let claims = token_data.claims;
    let now = config.clock.now_epoch_secs();

    if now < 0 {
        tracing::error!(
            timestamp = now,
            "System clock returned pre-epoch time - server time is broken"
        );
        return Err(ApiError::internal_error(
            "Server time configuration error - please contact support",
        ));
    }

    validate_claim_times(now, claims.exp, claims.nbf, config.jwt_clock_skew_secs)?;

    Ok(claims)
}

/// Issue a token for `user_id`.
pub fn generate_jwt_token(config: &AuthConfig, user_id: UserId) -> ApiResult<String> {
    let claims = Claims::new(user_id, config.jwt_expiration_secs, &*config.clock);
    let encoding_key = EncodingKey::from_secret(config.jwt_secret.expose().as_bytes());
    let header = Header::new(config.jwt_algorithm);

    encode(&header, &claims, &encoding_key)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))
}

/// Authenticate an `Authorization` header value.
///
/// The scheme must be `Bearer` (any case) followed by a single space and
/// the token.
pub fn authenticate(config: &AuthConfig, auth_header: Option<&str>) -> ApiResult<AuthContext> {
    let header = auth_header.ok_or_else(|| ApiError::unauthorized("Authorization header missing"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| ApiError::unauthorized("Invalid token format"))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(ApiError::unauthorized("Invalid token format"));
    }

    let claims = validate_jwt_token(config, token.trim())?;
    Ok(AuthContext {
        user_id: claims.caller()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use kanban_core::EntityIdType;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    struct EnvVarGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let previous = std::env::var(key).ok();
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
            Self { key, previous }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.previous.as_deref() {
                Some(value) => std::env::set_var(self.key, value),
                None => std::env::remove_var(self.key),
            }
        }
    }

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: JwtSecret::new("test_secret".to_string()).expect("valid secret"),
            clock: Arc::new(test_clocks::valid()),
            ..AuthConfig::default()
        }
    }

    fn sign(config: &AuthConfig, claims: &serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(config.jwt_secret.expose().as_bytes()),
        )
        .expect("encode")
    }

    #[test]
    fn test_jwt_generation_and_validation() -> ApiResult<()> {
        let config = test_config();
        let user = UserId::now_v7();

        let token = generate_jwt_token(&config, user)?;
        let claims = validate_jwt_token(&config, &token)?;

        assert_eq!(claims.caller()?, user);
        assert!(!claims.is_expired(&test_clocks::valid()));
        Ok(())
    }

    #[test]
    fn test_expired_token() -> ApiResult<()> {
        let mut config = test_config();
        let token = generate_jwt_token(&config, UserId::now_v7())?;

        config.clock = Arc::new(test_clocks::future());
        let err = validate_jwt_token(&config, &token).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);
        Ok(())
    }

    #[test]
    fn test_wrong_secret_is_invalid_token() -> ApiResult<()> {
        let config = test_config();
        let token = generate_jwt_token(&config, UserId::now_v7())?;

        let other = AuthConfig {
            jwt_secret: JwtSecret::new("another_secret".to_string())?,
            ..test_config()
        };
        let err = validate_jwt_token(&other, &token).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
        Ok(())
    }

    #[test]
    fn test_sub_claim_accepted_when_user_id_absent() -> ApiResult<()> {
        let config = test_config();
        let user = UserId::now_v7();
        let token = sign(
            &config,
            &serde_json::json!({ "sub": user.to_string(), "exp": 1704067200 + 3600 }),
        );

        let ctx = authenticate(&config, Some(&format!("Bearer {token}")))?;
        assert_eq!(ctx.user_id, user);
        Ok(())
    }

    #[test]
    fn test_token_without_user_is_rejected() {
        let config = test_config();
        let token = sign(&config, &serde_json::json!({ "exp": 1704067200 + 3600 }));
        let err = authenticate(&config, Some(&format!("Bearer {token}"))).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);

        let token = sign(
            &config,
            &serde_json::json!({ "user_id": "not-a-uuid", "exp": 1704067200 + 3600 }),
        );
        let err = authenticate(&config, Some(&format!("Bearer {token}"))).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
    }

    #[test]
    fn test_token_without_exp_is_rejected() {
        let config = test_config();
        let token = sign(
            &config,
            &serde_json::json!({ "user_id": UserId::now_v7().to_string() }),
        );
        assert!(validate_jwt_token(&config, &token).is_err());
    }

    #[test]
    fn test_not_before_in_future_is_rejected() {
        let config = test_config();
        let token = sign(
            &config,
            &serde_json::json!({
                "user_id": UserId::now_v7().to_string(),
                "nbf": 1704067200 + 600,
                "exp": 1704067200 + 3600,
            }),
        );
        let err = validate_jwt_token(&config, &token).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
    }

    #[test]
    fn test_authenticate_header_formats() -> ApiResult<()> {
        let config = test_config();
        let user = UserId::now_v7();
        let token = generate_jwt_token(&config, user)?;

        assert_eq!(
            authenticate(&config, None).unwrap_err().code,
            ErrorCode::Unauthorized
        );
        assert_eq!(
            authenticate(&config, Some(&token)).unwrap_err().code,
            ErrorCode::Unauthorized
        );
        assert_eq!(
            authenticate(&config, Some(&format!("Basic {token}")))
                .unwrap_err()
                .code,
            ErrorCode::Unauthorized
        );
        assert_eq!(
            authenticate(&config, Some("Bearer ")).unwrap_err().code,
            ErrorCode::Unauthorized
        );
        assert_eq!(
            authenticate(&config, Some(&format!("bearer {token}")))?.user_id,
            user
        );
        Ok(())
    }

    #[test]
    fn test_from_env_reads_overrides() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _secret = EnvVarGuard::set("KANBAN_JWT_SECRET", Some("from-env-secret"));
        let _exp = EnvVarGuard::set("KANBAN_JWT_EXPIRATION_SECS", Some("120"));
        let _skew = EnvVarGuard::set("KANBAN_JWT_CLOCK_SKEW_SECS", None);

        let config = AuthConfig::from_env();
        assert_eq!(config.jwt_secret.expose(), "from-env-secret");
        assert_eq!(config.jwt_expiration_secs, 120);
        assert_eq!(config.jwt_clock_skew_secs, 60);
    }

    #[test]
    fn test_blank_env_secret_falls_back_to_default() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _secret = EnvVarGuard::set("KANBAN_JWT_SECRET", Some("   "));

        assert!(AuthConfig::from_env().jwt_secret.is_insecure_default());
    }

    #[test]
    fn test_production_validation() {
        let default = AuthConfig::default();
        assert!(default.validate_for_production(true).is_err());
        assert!(default.validate_for_production(false).is_ok());

        let short = AuthConfig {
            jwt_secret: JwtSecret::new("short".to_string()).expect("valid secret"),
            ..AuthConfig::default()
        };
        assert!(short.validate_for_production(true).is_err());

        let secure = AuthConfig {
            jwt_secret: JwtSecret::new(
                "this-is-a-very-secure-secret-that-is-at-least-32-characters-long".to_string(),
            )
            .expect("valid secret"),
            ..AuthConfig::default()
        };
        assert!(secure.validate_for_production(true).is_ok());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = JwtSecret::new("hunter2".to_string()).expect("valid secret");
        let debug = format!("{secret:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("7 chars"));
    }

    #[test]
    fn test_clock_skew_tolerance() -> ApiResult<()> {
        let mut config = test_config();
        config.jwt_expiration_secs = 100;
        let token = generate_jwt_token(&config, UserId::now_v7())?;

        config.clock = Arc::new(FixedClock(1704067200 + 130));
        assert!(validate_jwt_token(&config, &token).is_ok());

        config.clock = Arc::new(FixedClock(1704067200 + 200));
        assert_eq!(
            validate_jwt_token(&config, &token).unwrap_err().code,
            ErrorCode::TokenExpired
        );
        Ok(())
    }

    #[test]
    fn test_pre_epoch_clock_fails_loud() -> ApiResult<()> {
        let mut config = test_config();
        let token = generate_jwt_token(&config, UserId::now_v7())?;

        config.clock = Arc::new(FixedClock(-1000));
        let err = validate_jwt_token(&config, &token).unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalError);
        assert!(err.message.contains("time configuration error"));
        Ok(())
    }
}
