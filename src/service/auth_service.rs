// service/auth_service.rs
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    db::{db::StoreError, Store, UserExt},
    dtos::userdtos::{
        FilterUserDto, LoginPhoneDto, LoginUserDto, RegisterPhoneDto, RegisterUserDto,
        UpdateProfileDto, UserLoginResponseDto,
    },
    error::HttpError,
    models::usermodel::{NewUser, User, UserRole},
    service::error::ServiceError,
    utils::{password, token},
};

pub const MIN_PASSWORD_CHARS: usize = 6;
pub const PHONE_EMAIL_DOMAIN: &str = "kaambazar.local";
pub const MAX_FAILED_LOGINS: usize = 5;
pub const FAILED_LOGIN_WINDOW: Duration = Duration::from_secs(15 * 60);

/// The only failures a caller of sign-up or sign-in ever sees.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("An account with this email already exists")]
    EmailAlreadyInUse,

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Password should be at least 6 characters long")]
    WeakPassword,

    #[error("No account found with this email/password")]
    UserNotFound,

    #[error("Incorrect password")]
    WrongPassword,

    #[error("Too many failed attempts. Please try again later")]
    TooManyRequests,

    #[error("Authentication failed. Please try again")]
    Failed,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::EmailAlreadyInUse => "email-already-in-use",
            AuthError::InvalidEmail => "invalid-email",
            AuthError::WeakPassword => "weak-password",
            AuthError::UserNotFound => "user-not-found",
            AuthError::WrongPassword => "wrong-password",
            AuthError::TooManyRequests => "too-many-requests",
            AuthError::Failed => "default",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::EmailAlreadyInUse => StatusCode::CONFLICT,
            AuthError::InvalidEmail | AuthError::WeakPassword => StatusCode::BAD_REQUEST,
            AuthError::UserNotFound | AuthError::WrongPassword => StatusCode::UNAUTHORIZED,
            AuthError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AuthError::Failed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Duplicate(_) => AuthError::EmailAlreadyInUse,
            other => {
                tracing::error!("auth store failure: {}", other);
                AuthError::Failed
            }
        }
    }
}

impl From<AuthError> for HttpError {
    fn from(error: AuthError) -> Self {
        HttpError::new(error.to_string(), error.status_code())
    }
}

/// Failed sign-in attempts per identifier inside a sliding window.
#[derive(Debug)]
pub struct LoginThrottle {
    failures: Mutex<HashMap<String, Vec<Instant>>>,
    max_failures: usize,
    window: Duration,
}

impl LoginThrottle {
    pub fn new(max_failures: usize, window: Duration) -> Self {
        Self {
            failures: Mutex::new(HashMap::new()),
            max_failures,
            window,
        }
    }

    pub fn is_blocked(&self, key: &str) -> bool {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        let Some(entry) = failures.get_mut(key) else {
            return false;
        };
        entry.retain(|&at| now.duration_since(at) < self.window);
        if entry.is_empty() {
            failures.remove(key);
            return false;
        }
        entry.len() >= self.max_failures
    }

    /// Also drops every identifier whose failures have all aged out.
    pub fn record_failure(&self, key: &str) {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        failures.retain(|_, entry| {
            entry.retain(|&at| now.duration_since(at) < self.window);
            !entry.is_empty()
        });
        failures.entry(key.to_string()).or_default().push(now);
    }

    pub fn clear(&self, key: &str) {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        failures.remove(key);
    }
}

impl Default for LoginThrottle {
    fn default() -> Self {
        Self::new(MAX_FAILED_LOGINS, FAILED_LOGIN_WINDOW)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Phone accounts sign in through a synthetic address.
pub fn phone_email(phone: &str) -> String {
    format!("{}@{}", normalize_phone(phone), PHONE_EMAIL_DOMAIN)
}

fn normalize_phone(phone: &str) -> String {
    phone.split_whitespace().collect()
}

#[derive(Clone)]
pub struct AuthService {
    db_client: Arc<dyn Store>,
    jwt_secret: String,
    jwt_maxage: i64,
    throttle: Arc<LoginThrottle>,
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("jwt_maxage", &self.jwt_maxage)
            .field("throttle", &self.throttle)
            .finish()
    }
}

impl AuthService {
    pub fn new(db_client: Arc<dyn Store>, jwt_secret: impl Into<String>, jwt_maxage: i64) -> Self {
        Self::with_throttle(db_client, jwt_secret, jwt_maxage, LoginThrottle::default())
    }

    pub fn with_throttle(
        db_client: Arc<dyn Store>,
        jwt_secret: impl Into<String>,
        jwt_maxage: i64,
        throttle: LoginThrottle,
    ) -> Self {
        Self {
            db_client,
            jwt_secret: jwt_secret.into(),
            jwt_maxage,
            throttle: Arc::new(throttle),
        }
    }

    pub fn jwt_maxage(&self) -> i64 {
        self.jwt_maxage
    }

    fn session(&self, user: &User) -> Result<UserLoginResponseDto, AuthError> {
        let token = token::create_token(
            &user.id.to_string(),
            self.jwt_secret.as_bytes(),
            self.jwt_maxage,
        )
        .map_err(|e| {
            tracing::error!("token creation failed: {}", e);
            AuthError::Failed
        })?;

        Ok(UserLoginResponseDto {
            token,
            user: FilterUserDto::filter_user(user),
        })
    }

    async fn register(
        &self,
        name: String,
        email: String,
        password: &str,
        role: UserRole,
        phone: Option<String>,
    ) -> Result<UserLoginResponseDto, AuthError> {
        if !validator::validate_email(&email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthError::WeakPassword);
        }

        if self.db_client.get_user(None, Some(&email)).await?.is_some() {
            return Err(AuthError::EmailAlreadyInUse);
        }

        let hashed_password = password::hash(password).map_err(|e| {
            tracing::warn!("password rejected at registration: {}", e.to_string());
            AuthError::Failed
        })?;

        let user = self
            .db_client
            .save_user(NewUser {
                name: name.trim().to_string(),
                email,
                password: hashed_password,
                role,
                phone,
            })
            .await?;

        tracing::info!("registered {} account {}", user.role.to_str(), user.id);
        self.session(&user)
    }

    async fn login(&self, email: String, password: &str) -> Result<UserLoginResponseDto, AuthError> {
        if self.throttle.is_blocked(&email) {
            tracing::warn!("sign-in blocked for {}", email);
            return Err(AuthError::TooManyRequests);
        }

        let Some(user) = self.db_client.get_user(None, Some(&email)).await? else {
            self.throttle.record_failure(&email);
            return Err(AuthError::UserNotFound);
        };

        if !password::compare(password, &user.password).unwrap_or(false) {
            self.throttle.record_failure(&email);
            return Err(AuthError::WrongPassword);
        }

        self.throttle.clear(&email);
        if let Err(e) = self.db_client.touch_user(user.id).await {
            tracing::warn!("could not record sign-in for {}: {}", user.id, e);
        }

        self.session(&user)
    }

    pub async fn register_with_email(&self, body: RegisterUserDto) -> Result<UserLoginResponseDto, AuthError> {
        self.register(
            body.name,
            normalize_email(&body.email),
            &body.password,
            body.role,
            None,
        )
        .await
    }

    pub async fn register_with_phone(&self, body: RegisterPhoneDto) -> Result<UserLoginResponseDto, AuthError> {
        let phone = normalize_phone(&body.phone);
        self.register(
            body.name,
            phone_email(&phone),
            &body.password,
            body.role,
            Some(phone),
        )
        .await
    }

    pub async fn login_with_email(&self, body: LoginUserDto) -> Result<UserLoginResponseDto, AuthError> {
        self.login(normalize_email(&body.email), &body.password).await
    }

    pub async fn login_with_phone(&self, body: LoginPhoneDto) -> Result<UserLoginResponseDto, AuthError> {
        self.login(phone_email(&body.phone), &body.password).await
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        body: UpdateProfileDto,
    ) -> Result<FilterUserDto, ServiceError> {
        let user = self
            .db_client
            .update_user_profile(user_id, body.into())
            .await?;

        tracing::info!("profile updated for {}", user.id);
        Ok(FilterUserDto::filter_user(&user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryDb;

    const SECRET: &str = "kaambazar-test-secret";

    fn service() -> (Arc<MemoryDb>, AuthService) {
        let db = Arc::new(MemoryDb::new());
        let auth = AuthService::new(db.clone(), SECRET, 60);
        (db, auth)
    }

    fn email_signup(email: &str, password: &str) -> RegisterUserDto {
        RegisterUserDto {
            name: "Asha Verma".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: UserRole::Employer,
        }
    }

    #[tokio::test]
    async fn email_registration_and_login() {
        let (_db, auth) = service();

        let session = auth
            .register_with_email(email_signup("  Asha@Example.com ", "secret123"))
            .await
            .unwrap();
        assert_eq!(session.user.email, "asha@example.com");
        assert_eq!(session.user.role, "employer");
        assert_eq!(
            token::decode_token(&session.token, SECRET.as_bytes()).unwrap(),
            session.user.id
        );

        let session = auth
            .login_with_email(LoginUserDto {
                email: "asha@example.com".to_string(),
                password: "secret123".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.user.name, "Asha Verma");

        let err = auth
            .login_with_email(LoginUserDto {
                email: "asha@example.com".to_string(),
                password: "secret124".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::WrongPassword);
        assert_eq!(err.to_string(), "Incorrect password");
    }

    #[tokio::test]
    async fn registration_errors_use_fixed_messages() {
        let (_db, auth) = service();

        let err = auth
            .register_with_email(email_signup("not-an-email", "secret123"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please enter a valid email address");

        let err = auth
            .register_with_email(email_signup("ravi@example.com", "12345"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Password should be at least 6 characters long");
        assert_eq!(err.code(), "weak-password");

        auth.register_with_email(email_signup("ravi@example.com", "123456"))
            .await
            .unwrap();
        let err = auth
            .register_with_email(email_signup("RAVI@example.com", "123456"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "An account with this email already exists");
        assert_eq!(HttpError::from(err).status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn phone_accounts_use_a_synthetic_email() {
        let (_db, auth) = service();

        let session = auth
            .register_with_phone(RegisterPhoneDto {
                name: "Sunil".to_string(),
                phone: "98765 43210".to_string(),
                password: "pass1234".to_string(),
                role: UserRole::Worker,
            })
            .await
            .unwrap();
        assert_eq!(session.user.email, "9876543210@kaambazar.local");
        assert_eq!(session.user.phone.as_deref(), Some("9876543210"));
        assert_eq!(session.user.role, "worker");

        let session = auth
            .login_with_phone(LoginPhoneDto {
                phone: "9876543210".to_string(),
                password: "pass1234".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.user.name, "Sunil");
    }

    #[tokio::test]
    async fn unknown_account_and_backend_failure() {
        let (db, auth) = service();

        let err = auth
            .login_with_email(LoginUserDto {
                email: "ghost@example.com".to_string(),
                password: "whatever".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No account found with this email/password");

        db.simulate_outage("connection reset").await;
        let err = auth
            .register_with_email(email_signup("new@example.com", "secret123"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Authentication failed. Please try again");
        assert_eq!(err.code(), "default");
    }

    #[tokio::test]
    async fn repeated_failures_are_throttled() {
        let (_db, auth) = service();
        let attempt = || {
            auth.login_with_email(LoginUserDto {
                email: "ghost@example.com".to_string(),
                password: "guess".to_string(),
            })
        };

        for _ in 0..MAX_FAILED_LOGINS {
            assert_eq!(attempt().await.unwrap_err(), AuthError::UserNotFound);
        }
        let err = attempt().await.unwrap_err();
        assert_eq!(err, AuthError::TooManyRequests);
        assert_eq!(HttpError::from(err).status, StatusCode::TOO_MANY_REQUESTS);

        // Other identifiers are unaffected.
        let err = auth
            .login_with_email(LoginUserDto {
                email: "other@example.com".to_string(),
                password: "guess".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::UserNotFound);
    }

    #[test]
    fn throttle_window_expires_and_clear_resets() {
        let throttle = LoginThrottle::new(2, Duration::from_millis(50));

        throttle.record_failure("a");
        throttle.record_failure("a");
        assert!(throttle.is_blocked("a"));

        std::thread::sleep(Duration::from_millis(60));
        assert!(!throttle.is_blocked("a"));

        throttle.record_failure("b");
        throttle.record_failure("b");
        throttle.clear("b");
        assert!(!throttle.is_blocked("b"));
    }

    #[test]
    fn expired_identifiers_are_forgotten() {
        let throttle = LoginThrottle::new(5, Duration::from_millis(300));
        for i in 0..200 {
            throttle.record_failure(&format!("user{}@example.com", i));
        }
        assert_eq!(throttle.failures.lock().unwrap().len(), 200);

        std::thread::sleep(Duration::from_millis(350));
        assert!(!throttle.is_blocked("user0@example.com"));
        assert_eq!(throttle.failures.lock().unwrap().len(), 199);

        throttle.record_failure("fresh@example.com");
        let failures = throttle.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert!(failures.contains_key("fresh@example.com"));
    }

    #[tokio::test]
    async fn profile_update_keeps_role() {
        let (_db, auth) = service();
        let session = auth
            .register_with_email(email_signup("meena@example.com", "secret123"))
            .await
            .unwrap();
        let id = Uuid::parse_str(&session.user.id).unwrap();

        let user = auth
            .update_profile(
                id,
                UpdateProfileDto {
                    location: Some("Lucknow".to_string()),
                    skills: Some(vec!["masonry".to_string()]),
                    ..UpdateProfileDto::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(user.role, "employer");
        assert_eq!(user.name, "Asha Verma");
        assert_eq!(user.profile.location.as_deref(), Some("Lucknow"));
        assert_eq!(user.profile.skills, Some(vec!["masonry".to_string()]));
    }
}
