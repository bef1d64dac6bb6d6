//! Authentication service: sign-up, password and phone sign-in, token rotation

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared::{
    normalize_phone, validate_location, validate_otp_code, validate_password, validate_phone,
    GeoPoint, User, UserRole,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::error::{map_unique_violation, AppError, AppResult};
use crate::services::user::{UserRow, UserService};

type HmacSha256 = Hmac<Sha256>;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
    otp_expiry: i64,
    otp_max_attempts: i32,
    log_otp_codes: bool,
}

/// Input for creating a marketplace account
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    pub role: UserRole,
    #[validate(length(min = 1, max = 200, message = "Business name is required"))]
    pub business_name: String,
    #[validate(length(min = 1, max = 200, message = "Contact name is required"))]
    pub contact_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpRequestInput {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpVerifyInput {
    pub phone: String,
    pub code: String,
}

/// Issued when a code has been generated
#[derive(Debug, Serialize)]
pub struct OtpChallengeIssued {
    pub phone: String,
    pub expires_in: i64,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Tokens plus the signed-in account
#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub user: User,
    #[serde(flatten)]
    pub tokens: AuthTokens,
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    id: Uuid,
    role: String,
    password_hash: Option<String>,
    is_active: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct OtpRow {
    id: Uuid,
    code_hash: String,
    attempts: i32,
}

/// Count one guess against the newest live challenge for a phone, returning
/// it only while attempts remain. The row lock makes concurrent claims queue
/// and re-check `attempts`.
const CLAIM_OTP_ATTEMPT: &str = r#"
    UPDATE otp_challenges
    SET attempts = attempts + 1
    WHERE id = (
        SELECT id FROM otp_challenges
        WHERE phone = $1 AND consumed_at IS NULL AND expires_at > NOW()
        ORDER BY created_at DESC
        LIMIT 1
        FOR UPDATE
    )
    AND attempts < $2
    RETURNING id, code_hash, attempts
"#;

/// Decode and validate an access token
pub fn decode_access_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
            otp_expiry: config.otp.expiry_seconds,
            otp_max_attempts: config.otp.max_attempts,
            log_otp_codes: config.is_development(),
        }
    }

    /// Create an account and sign it in
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthSession> {
        input.validate()?;
        validate_password(&input.password).map_err(|e| AppError::validation("password", e))?;
        let phone = match input.phone.as_deref() {
            Some(phone) => {
                validate_phone(phone).map_err(|e| AppError::validation("phone", e))?;
                Some(normalize_phone(phone))
            }
            None => None,
        };
        if let Some(location) = &input.location {
            validate_location(location).map_err(|e| AppError::validation("location", e))?;
        }

        let email = input.email.trim().to_lowercase();
        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (role, business_name, contact_name, email, phone, password_hash,
                               latitude, longitude)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, role, business_name, contact_name, email, phone, latitude, longitude,
                      compliance_status, license_number, reward_points, created_at, updated_at
            "#,
        )
        .bind(input.role.as_str())
        .bind(input.business_name.trim())
        .bind(input.contact_name.trim())
        .bind(&email)
        .bind(&phone)
        .bind(&password_hash)
        .bind(input.location.map(|l| l.latitude))
        .bind(input.location.map(|l| l.longitude))
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, "email or phone"))?;

        let user = row.into_model()?;
        tracing::info!(user_id = %user.id, role = %user.role, "account registered");

        let tokens = self.issue_tokens(user.id, user.role).await?;
        Ok(AuthSession { user, tokens })
    }

    /// Authenticate user with email and password
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthSession> {
        input.validate()?;
        let email = input.email.trim().to_lowercase();

        let credentials = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, role, password_hash, is_active FROM users WHERE email = $1",
        )
        .bind(&email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        if !credentials.is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        let Some(password_hash) = credentials.password_hash.as_deref() else {
            return Err(AppError::InvalidCredentials);
        };
        let valid = verify(&input.password, password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        self.start_session(credentials.id, &credentials.role).await
    }

    /// Issue a one-time code for a registered phone number
    pub async fn request_otp(&self, input: OtpRequestInput) -> AppResult<OtpChallengeIssued> {
        validate_phone(&input.phone).map_err(|e| AppError::validation("phone", e))?;
        let phone = normalize_phone(&input.phone);

        let known = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE phone = $1 AND is_active = true)",
        )
        .bind(&phone)
        .fetch_one(&self.db)
        .await?;
        // Unknown numbers get the same answer so the endpoint cannot be used
        // to find out which phones have accounts
        if !known {
            tracing::info!(%phone, "one-time code requested for unknown phone");
            return Ok(OtpChallengeIssued {
                phone,
                expires_in: self.otp_expiry,
            });
        }

        let code = generate_otp_code();
        let expires_at = Utc::now() + Duration::seconds(self.otp_expiry);

        let mut tx = self.db.begin().await?;

        // A new code supersedes any outstanding one
        sqlx::query(
            "UPDATE otp_challenges SET consumed_at = NOW() WHERE phone = $1 AND consumed_at IS NULL",
        )
        .bind(&phone)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO otp_challenges (phone, code_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(&phone)
        .bind(self.hash_otp(&phone, &code)?)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if self.log_otp_codes {
            tracing::info!(%phone, %code, "one-time code issued");
        } else {
            tracing::info!(%phone, "one-time code issued");
        }

        Ok(OtpChallengeIssued {
            phone,
            expires_in: self.otp_expiry,
        })
    }

    /// Exchange a one-time code for tokens
    pub async fn verify_otp(&self, input: OtpVerifyInput) -> AppResult<AuthSession> {
        validate_phone(&input.phone).map_err(|e| AppError::validation("phone", e))?;
        validate_otp_code(&input.code).map_err(|e| AppError::validation("code", e))?;
        let phone = normalize_phone(&input.phone);

        // Claiming the attempt and reading the hash is one statement, so
        // parallel guesses cannot exceed the attempt limit
        let challenge = sqlx::query_as::<_, OtpRow>(CLAIM_OTP_ATTEMPT)
            .bind(&phone)
            .bind(self.otp_max_attempts)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| {
                AppError::Unauthorized(
                    "Verification code expired or too many attempts, request a new code".to_string(),
                )
            })?;

        if !self.verify_otp_hash(&phone, &input.code, &challenge.code_hash)? {
            tracing::debug!(%phone, attempts = challenge.attempts, "incorrect one-time code");
            return Err(AppError::Unauthorized("Incorrect verification code".to_string()));
        }

        let consumed = sqlx::query(
            "UPDATE otp_challenges SET consumed_at = NOW() WHERE id = $1 AND consumed_at IS NULL",
        )
        .bind(challenge.id)
        .execute(&self.db)
        .await?;
        if consumed.rows_affected() == 0 {
            return Err(AppError::Unauthorized("Verification code already used".to_string()));
        }

        let credentials = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, role, password_hash, is_active FROM users WHERE phone = $1",
        )
        .bind(&phone)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Account for this phone number".to_string()))?;

        if !credentials.is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        self.start_session(credentials.id, &credentials.role).await
    }

    /// Rotate a refresh token
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let token_hash = hash_token(refresh_token);

        let mut tx = self.db.begin().await?;

        let (user_id, role) = sqlx::query_as::<_, (Uuid, String)>(
            r#"
            UPDATE refresh_tokens rt
            SET revoked_at = NOW()
            FROM users u
            WHERE rt.token_hash = $1
              AND u.id = rt.user_id
              AND rt.expires_at > NOW()
              AND rt.revoked_at IS NULL
              AND u.is_active = true
            RETURNING rt.user_id, u.role
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired refresh token".to_string()))?;

        let role = role.parse::<UserRole>()?;
        let tokens = self.generate_tokens(user_id, role)?;
        self.store_refresh_token(&mut *tx, user_id, &tokens.refresh_token)
            .await?;

        tx.commit().await?;

        Ok(tokens)
    }

    /// Revoke a refresh token. Unknown tokens are ignored.
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(hash_token(refresh_token))
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn start_session(&self, user_id: Uuid, role: &str) -> AppResult<AuthSession> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        let role = role.parse::<UserRole>()?;
        let tokens = self.issue_tokens(user_id, role).await?;
        let user = UserService::new(self.db.clone()).get_user(user_id).await?;

        Ok(AuthSession { user, tokens })
    }

    async fn issue_tokens(&self, user_id: Uuid, role: UserRole) -> AppResult<AuthTokens> {
        let tokens = self.generate_tokens(user_id, role)?;
        self.store_refresh_token(&self.db, user_id, &tokens.refresh_token)
            .await?;
        Ok(tokens)
    }

    /// Generate access and refresh tokens
    fn generate_tokens(&self, user_id: Uuid, role: UserRole) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let access_exp = now + Duration::seconds(self.access_token_expiry);

        let access_claims = Claims {
            sub: user_id.to_string(),
            role: role.as_str().to_string(),
            exp: access_exp.timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &access_claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        // Refresh token (opaque random value, stored hashed)
        let refresh_token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    /// Store refresh token in database
    async fn store_refresh_token<'e, E>(&self, executor: E, user_id: Uuid, token: &str) -> AppResult<()>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let expires_at = Utc::now() + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(hash_token(token))
        .bind(expires_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    fn otp_mac(&self, phone: &str, code: &str) -> AppResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.jwt_secret.as_bytes())
            .map_err(|e| AppError::Internal(format!("HMAC key error: {}", e)))?;
        mac.update(phone.as_bytes());
        mac.update(b":");
        mac.update(code.as_bytes());
        Ok(mac)
    }

    fn hash_otp(&self, phone: &str, code: &str) -> AppResult<String> {
        let mac = self.otp_mac(phone, code)?;
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    fn verify_otp_hash(&self, phone: &str, code: &str, stored: &str) -> AppResult<bool> {
        let Ok(expected) = URL_SAFE_NO_PAD.decode(stored) else {
            return Ok(false);
        };
        Ok(self.otp_mac(phone, code)?.verify_slice(&expected).is_ok())
    }
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}

/// Six decimal digits drawn from a v4 UUID
fn generate_otp_code() -> String {
    format!("{:06}", Uuid::new_v4().as_u128() % 1_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService {
            db: PgPool::connect_lazy("postgres://localhost/tradeflow_test").unwrap(),
            jwt_secret: "test-secret".to_string(),
            access_token_expiry: 60,
            refresh_token_expiry: 120,
            otp_expiry: 300,
            otp_max_attempts: 5,
            log_otp_codes: false,
        }
    }

    #[test]
    fn token_hash_is_stable_and_opaque() {
        let a = hash_token("abc");
        assert_eq!(a, hash_token("abc"));
        assert_ne!(a, hash_token("abd"));
        assert!(!a.contains("abc"));
        // 32 bytes -> 43 base64 chars without padding
        assert_eq!(a.len(), 43);
    }

    #[test]
    fn otp_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_otp_code();
            assert!(validate_otp_code(&code).is_ok(), "bad code {}", code);
        }
    }

    #[tokio::test]
    async fn otp_hash_binds_phone_and_code() {
        let svc = service();
        let stored = svc.hash_otp("+66812345678", "123456").unwrap();
        assert!(svc.verify_otp_hash("+66812345678", "123456", &stored).unwrap());
        assert!(!svc.verify_otp_hash("+66812345678", "654321", &stored).unwrap());
        assert!(!svc.verify_otp_hash("+66800000000", "123456", &stored).unwrap());
        assert!(!svc.verify_otp_hash("+66812345678", "123456", "not base64!").unwrap());
    }

    #[tokio::test]
    #[ignore] // Requires database connection
    async fn parallel_otp_guesses_respect_attempt_limit() {
        let url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/tradeflow_test".to_string());
        let db = PgPool::connect(&url).await.unwrap();
        sqlx::migrate!("./migrations").run(&db).await.unwrap();

        let svc = AuthService { db: db.clone(), ..service() };
        let phone = format!("+669{:08}", Uuid::new_v4().as_u128() % 100_000_000);
        sqlx::query(
            "INSERT INTO otp_challenges (phone, code_hash, expires_at) VALUES ($1, $2, NOW() + INTERVAL '5 minutes')",
        )
        .bind(&phone)
        .bind(svc.hash_otp(&phone, "123456").unwrap())
        .execute(&db)
        .await
        .unwrap();

        let mut guesses = tokio::task::JoinSet::new();
        for _ in 0..20 {
            let svc = svc.clone();
            let phone = phone.clone();
            guesses.spawn(async move {
                svc.verify_otp(OtpVerifyInput {
                    phone,
                    code: "000000".to_string(),
                })
                .await
            });
        }

        let mut compared = 0;
        while let Some(result) = guesses.join_next().await {
            match result.unwrap() {
                Err(AppError::Unauthorized(msg)) if msg == "Incorrect verification code" => compared += 1,
                Err(AppError::Unauthorized(_)) => {}
                other => panic!("unexpected result: {:?}", other.map(|_| ())),
            }
        }
        assert_eq!(compared, 5);

        let attempts: i32 = sqlx::query_scalar("SELECT attempts FROM otp_challenges WHERE phone = $1")
            .bind(&phone)
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(attempts, 5);
    }

    #[tokio::test]
    #[ignore] // Requires database connection
    async fn unknown_phone_gets_the_same_otp_answer() {
        let url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/tradeflow_test".to_string());
        let db = PgPool::connect(&url).await.unwrap();
        sqlx::migrate!("./migrations").run(&db).await.unwrap();

        let svc = AuthService { db: db.clone(), ..service() };
        let phone = format!("+669{:08}", Uuid::new_v4().as_u128() % 100_000_000);
        let issued = svc
            .request_otp(OtpRequestInput { phone: phone.clone() })
            .await
            .unwrap();
        assert_eq!(issued.phone, phone);
        assert_eq!(issued.expires_in, 300);

        let challenges: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM otp_challenges WHERE phone = $1")
            .bind(&phone)
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(challenges, 0);
    }

    #[test]
    fn attempt_claim_is_guarded_in_one_statement() {
        let sql = CLAIM_OTP_ATTEMPT;
        assert!(sql.contains("SET attempts = attempts + 1"));
        assert!(sql.contains("AND attempts < $2"));
        assert!(sql.contains("FOR UPDATE"));
        assert!(sql.contains("RETURNING id, code_hash, attempts"));
    }

    #[tokio::test]
    async fn access_tokens_round_trip() {
        let svc = service();
        let user_id = Uuid::new_v4();
        let tokens = svc.generate_tokens(user_id, UserRole::Vendor).unwrap();
        let claims = decode_access_token(&tokens.access_token, "test-secret").unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, "vendor");
        assert!(decode_access_token(&tokens.access_token, "other-secret").is_err());
        assert_ne!(tokens.refresh_token, svc.generate_tokens(user_id, UserRole::Vendor).unwrap().refresh_token);
    }
}
