//! Accounts, credentials and bearer tokens.
//!
//! Tokens are HS256 JWTs carrying a `purpose` claim so a verification link
//! can never be replayed as an access token. Logged-out tokens are kept as
//! SHA-256 digests until they would have expired anyway.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{info, warn};
use validator::Validate;

use super::error::{conflicting, missing, ServiceError, ServiceResult};
use super::{messages, Actor};
use crate::config::AuthSettings;
use crate::db::repository::FullRepository;
use crate::mail::Mailer;
use crate::models::{NewUser, User, UserChanges, UserRole, UserStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Access,
    Verify,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub role: UserRole,
    pub purpose: TokenPurpose,
    pub iat: i64,
    pub exp: i64,
}

/// Signs, verifies and revokes tokens, and hashes passwords.
pub struct AuthService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_secs: i64,
    verification_ttl_secs: i64,
    bcrypt_cost: u32,
    /// digest -> expiry (unix seconds)
    revoked: RwLock<HashMap<String, i64>>,
}

impl AuthService {
    pub fn new(settings: &AuthSettings) -> Self {
        let secret = settings.jwt_secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl_secs: settings.access_ttl_secs(),
            verification_ttl_secs: settings.verification_ttl_secs(),
            bcrypt_cost: settings.bcrypt_cost,
            revoked: RwLock::new(HashMap::new()),
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }

    pub fn mint(&self, user: &User, purpose: TokenPurpose) -> ServiceResult<String> {
        let ttl = match purpose {
            TokenPurpose::Access => self.access_ttl_secs,
            TokenPurpose::Verify => self.verification_ttl_secs,
        };
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            purpose,
            iat: now,
            exp: now + ttl,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ServiceError::Internal(format!("failed to sign token: {}", e)))
    }

    /// Decode a token and check its purpose and revocation state.
    pub fn verify(&self, token: &str, purpose: TokenPurpose) -> ServiceResult<Claims> {
        let invalid = || ServiceError::unauthorized(messages::TOKEN_INVALID);

        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                warn!(error = %e, "rejected token");
                invalid()
            })?;
        if data.claims.purpose != purpose {
            warn!(user_id = data.claims.user_id, "token used for the wrong purpose");
            return Err(invalid());
        }
        if self.revoked.read().contains_key(&digest(token)) {
            return Err(invalid());
        }
        Ok(data.claims)
    }

    /// Resolve an `Authorization` header value into the calling user.
    pub fn authenticate(&self, header: Option<&str>) -> ServiceResult<Actor> {
        let header = header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ServiceError::unauthorized(messages::TOKEN_REQUIRED))?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ServiceError::unauthorized(messages::TOKEN_INVALID))?;
        let claims = self.verify(token, TokenPurpose::Access)?;
        Ok(Actor {
            user_id: claims.user_id,
            email: claims.email,
            role: claims.role,
        })
    }

    /// Revoke a token until its natural expiry.
    pub fn revoke(&self, token: &str) -> ServiceResult<()> {
        let claims = self.verify(token, TokenPurpose::Access)?;
        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.write();
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(digest(token), claims.exp);
        Ok(())
    }

    pub fn revoked_count(&self) -> usize {
        self.revoked.read().len()
    }

    async fn hash_password(&self, password: &str) -> ServiceResult<String> {
        let password = password.to_string();
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| ServiceError::Internal(format!("Task join error: {}", e)))?
            .map_err(|e| ServiceError::Internal(format!("failed to hash password: {}", e)))
    }

    async fn check_password(&self, password: &str, hash: &str) -> ServiceResult<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| ServiceError::Internal(format!("Task join error: {}", e)))?
            .or(Ok(false))
    }
}

fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Account fields returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: String,
    pub role: UserRole,
    pub status: UserStatus,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            phone: user.phone,
            email: user.email,
            role: user.role,
            status: user.status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub user: UserInfo,
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub user: UserInfo,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[serde(default)]
    #[validate(length(max = 100))]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Create an inactive account and send its verification link.
pub async fn register<R: FullRepository + ?Sized>(
    repo: &R,
    auth: &AuthService,
    mailer: &dyn Mailer,
    frontend_url: &str,
    input: RegisterInput,
) -> ServiceResult<UserInfo> {
    input.validate()?;
    let role: UserRole = input
        .role
        .parse()
        .map_err(|_| ServiceError::validation(messages::INVALID_ROLE))?;
    if role == UserRole::Admin {
        warn!(email = %input.email, "admin self-registration rejected");
        return Err(ServiceError::validation(messages::INVALID_ROLE));
    }

    if repo.find_user_by_email(&input.email).await?.is_some() {
        warn!(email = %input.email, "registration with existing e-mail");
        return Err(ServiceError::conflict(messages::EMAIL_TAKEN));
    }

    let password_hash = auth.hash_password(&input.password).await?;
    let user = repo
        .create_user(&NewUser {
            name: input.name.trim().to_string(),
            phone: blank_to_none(input.phone),
            email: input.email,
            password_hash,
            role,
            status: UserStatus::Inactive,
        })
        .await
        .map_err(conflicting(messages::EMAIL_TAKEN))?;

    let token = auth.mint(&user, TokenPurpose::Verify)?;
    let link = format!(
        "{}/verify-account?token={}",
        frontend_url.trim_end_matches('/'),
        token
    );
    if let Err(e) = mailer.send_verification(&user.email, &user.name, &link).await {
        tracing::error!(user_id = user.id, error = %e, "failed to send verification e-mail");
    }

    info!(user_id = user.id, role = %user.role, "account registered");
    Ok(user.into())
}

/// Activate the account named by a verification token.
pub async fn verify_email<R: FullRepository + ?Sized>(
    repo: &R,
    auth: &AuthService,
    token: &str,
) -> ServiceResult<UserInfo> {
    let claims = auth.verify(token, TokenPurpose::Verify)?;
    let user = repo
        .update_user(
            claims.user_id,
            &UserChanges {
                status: Some(UserStatus::Active),
                ..Default::default()
            },
        )
        .await
        .map_err(missing(messages::USER_NOT_FOUND))?;
    info!(user_id = user.id, "account activated");
    Ok(user.into())
}

pub async fn login<R: FullRepository + ?Sized>(
    repo: &R,
    auth: &AuthService,
    input: LoginInput,
) -> ServiceResult<LoginResponse> {
    input
        .validate()
        .map_err(|_| ServiceError::unauthorized(messages::INVALID_CREDENTIALS))?;

    let user = repo
        .find_user_by_email(&input.email)
        .await?
        .ok_or_else(|| ServiceError::unauthorized(messages::INVALID_CREDENTIALS))?;
    if !auth.check_password(&input.password, &user.password_hash).await? {
        warn!(user_id = user.id, "login with wrong password");
        return Err(ServiceError::unauthorized(messages::INVALID_CREDENTIALS));
    }
    if user.status != UserStatus::Active {
        warn!(user_id = user.id, "login to inactive account");
        return Err(ServiceError::Forbidden(messages::ACCOUNT_INACTIVE.to_string()));
    }

    let access_token = auth.mint(&user, TokenPurpose::Access)?;
    info!(user_id = user.id, "user logged in");
    Ok(LoginResponse {
        user: user.into(),
        access_token,
        expires_in: auth.access_ttl_secs(),
    })
}

pub async fn profile<R: FullRepository + ?Sized>(
    repo: &R,
    user_id: i64,
) -> ServiceResult<ProfileResponse> {
    let user = repo
        .get_user(user_id)
        .await
        .map_err(missing(messages::USER_NOT_FOUND))?;
    Ok(ProfileResponse { user: user.into() })
}

/// Non-empty name and e-mail replace the stored values; a missing or empty
/// phone clears it.
pub async fn update_profile<R: FullRepository + ?Sized>(
    repo: &R,
    user_id: i64,
    input: UpdateProfileInput,
) -> ServiceResult<ProfileResponse> {
    input.validate()?;
    let current = repo
        .get_user(user_id)
        .await
        .map_err(missing(messages::USER_NOT_FOUND))?;

    let email = blank_to_none(input.email);
    if let Some(ref email) = email {
        if !validator::ValidateEmail::validate_email(email) {
            return Err(ServiceError::validation(messages::INVALID_DATA));
        }
        if let Some(owner) = repo.find_user_by_email(email).await? {
            if owner.id != current.id {
                return Err(ServiceError::conflict(messages::EMAIL_TAKEN));
            }
        }
    }

    let changes = UserChanges {
        name: blank_to_none(input.name),
        email,
        phone: Some(blank_to_none(input.phone)),
        status: None,
    };
    let user = repo
        .update_user(user_id, &changes)
        .await
        .map_err(conflicting(messages::EMAIL_TAKEN))?;
    info!(user_id, "profile updated");
    Ok(ProfileResponse { user: user.into() })
}

pub fn logout(auth: &AuthService, token: &str) -> ServiceResult<()> {
    auth.revoke(token)?;
    info!("token revoked");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::mail::LogMailer;

    fn auth_service() -> AuthService {
        AuthService::new(&AuthSettings {
            bcrypt_cost: 4,
            ..Default::default()
        })
    }

    fn register_input(email: &str, role: &str) -> RegisterInput {
        RegisterInput {
            name: "Nguyen Lan".into(),
            email: email.into(),
            password: "secret123".into(),
            phone: Some("0901234567".into()),
            role: role.into(),
        }
    }

    fn token_from_link(mail_body: &str) -> String {
        mail_body
            .split("token=")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_register_verify_login() {
        let repo = LocalRepository::new();
        let auth = auth_service();
        let mailer = LogMailer::new();

        let user = register(
            &repo,
            &auth,
            &mailer,
            "http://localhost:3000",
            register_input("lan@example.com", "guest"),
        )
        .await
        .unwrap();
        assert_eq!(user.status, UserStatus::Inactive);

        let err = login(
            &repo,
            &auth,
            LoginInput {
                email: "lan@example.com".into(),
                password: "secret123".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let mail = mailer.last_to("lan@example.com").unwrap();
        assert!(mail
            .body
            .contains("http://localhost:3000/verify-account?token="));
        let activated = verify_email(&repo, &auth, &token_from_link(&mail.body))
            .await
            .unwrap();
        assert_eq!(activated.status, UserStatus::Active);

        let response = login(
            &repo,
            &auth,
            LoginInput {
                email: "lan@example.com".into(),
                password: "secret123".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(response.expires_in, 2_592_000);
        let actor = auth
            .authenticate(Some(&format!("Bearer {}", response.access_token)))
            .unwrap();
        assert_eq!(actor.user_id, user.id);
        assert_eq!(actor.role, UserRole::Guest);
    }

    #[tokio::test]
    async fn test_admin_cannot_self_register() {
        let repo = LocalRepository::new();
        let err = register(
            &repo,
            &auth_service(),
            &LogMailer::new(),
            "http://x",
            register_input("root@example.com", "admin"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.public_message(), messages::INVALID_ROLE);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let repo = LocalRepository::new();
        let auth = auth_service();
        let mailer = LogMailer::new();
        register(&repo, &auth, &mailer, "http://x", register_input("a@example.com", "host"))
            .await
            .unwrap();
        let err = register(&repo, &auth, &mailer, "http://x", register_input("a@example.com", "guest"))
            .await
            .unwrap_err();
        assert_eq!(err.public_message(), messages::EMAIL_TAKEN);
    }

    #[tokio::test]
    async fn test_wrong_password_is_invalid_credentials() {
        let repo = LocalRepository::new();
        let auth = auth_service();
        register(&repo, &auth, &LogMailer::new(), "http://x", register_input("b@example.com", "guest"))
            .await
            .unwrap();
        let err = login(
            &repo,
            &auth,
            LoginInput {
                email: "b@example.com".into(),
                password: "not-the-password".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.public_message(), messages::INVALID_CREDENTIALS);
    }

    #[tokio::test]
    async fn test_verification_token_is_not_an_access_token() {
        let repo = LocalRepository::new();
        let auth = auth_service();
        let mailer = LogMailer::new();
        register(&repo, &auth, &mailer, "http://x", register_input("c@example.com", "guest"))
            .await
            .unwrap();
        let token = token_from_link(&mailer.last_to("c@example.com").unwrap().body);
        let err = auth
            .authenticate(Some(&format!("Bearer {}", token)))
            .unwrap_err();
        assert_eq!(err.public_message(), messages::TOKEN_INVALID);
    }

    #[tokio::test]
    async fn test_update_profile_clears_phone() {
        let repo = LocalRepository::new();
        let auth = auth_service();
        let user = register(&repo, &auth, &LogMailer::new(), "http://x", register_input("d@example.com", "guest"))
            .await
            .unwrap();
        let updated = update_profile(
            &repo,
            user.id,
            UpdateProfileInput {
                name: Some("Tran Binh".into()),
                email: Some(String::new()),
                phone: Some(String::new()),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.user.name, "Tran Binh");
        assert_eq!(updated.user.email, "d@example.com");
        assert_eq!(updated.user.phone, None);
    }

    #[test]
    fn test_missing_and_malformed_headers() {
        let auth = auth_service();
        assert_eq!(
            auth.authenticate(None).unwrap_err().public_message(),
            messages::TOKEN_REQUIRED
        );
        assert_eq!(
            auth.authenticate(Some("Token abc")).unwrap_err().public_message(),
            messages::TOKEN_INVALID
        );
        assert_eq!(
            auth.authenticate(Some("Bearer not.a.jwt")).unwrap_err().public_message(),
            messages::TOKEN_INVALID
        );
    }

    #[test]
    fn test_revoked_token_is_rejected() {
        let auth = auth_service();
        let user = User {
            id: 9,
            name: "Host".into(),
            phone: None,
            email: "host@example.com".into(),
            password_hash: String::new(),
            role: UserRole::Host,
            status: UserStatus::Active,
            created_at: Utc::now(),
        };
        let token = auth.mint(&user, TokenPurpose::Access).unwrap();
        let header = format!("Bearer {}", token);
        assert!(auth.authenticate(Some(&header)).is_ok());

        logout(&auth, &token).unwrap();
        assert_eq!(auth.revoked_count(), 1);
        assert!(auth.authenticate(Some(&header)).is_err());
    }
}
