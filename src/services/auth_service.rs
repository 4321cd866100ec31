use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    db::{
        client_store::insert_consignee,
        user_store::{UserStore, insert_user},
    },
    error::{AppError, Result},
    models::{
        client::ConsigneeForm,
        user::{AuthResponse, NewUser, Role, SetupRequest, SignInRequest, SignUpRequest, User},
    },
};

const MIN_PASSWORD_LEN: usize = 8;

/// JWT payload carried in the session cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly issued session
#[derive(Debug)]
pub struct Session {
    pub token: String,
    pub response: AuthResponse,
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::PasswordHash(e.to_string()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn validate_credentials(email: &str, password: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }
    let email = email.trim();
    if email.len() < 3 || !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(AppError::Validation("A valid email is required".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accounts and sessions
#[derive(Clone)]
pub struct AuthService {
    users: UserStore,
    jwt_secret: String,
    session_hours: i64,
}

impl AuthService {
    pub fn new(users: UserStore, jwt_secret: String, session_hours: i64) -> Self {
        Self {
            users,
            jwt_secret,
            session_hours,
        }
    }

    pub fn issue_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.session_hours)).timestamp(),
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?)
    }

    pub fn decode_token(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }

    /// Resolve a session token to its user. Deleted users are unauthorized.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let claims = self.decode_token(token)?;
        match self.users.get_user_by_id(&claims.sub).await {
            Ok(user) => Ok(user),
            Err(AppError::NotFound(_)) => Err(AppError::Unauthorized("unknown session user".into())),
            Err(e) => Err(e),
        }
    }

    async fn session_for(&self, user: User) -> Result<Session> {
        let token = self.issue_token(&user)?;
        let has_clients = self.users.has_clients(&user.id).await?;
        let role = user.role;
        Ok(Session {
            token,
            response: AuthResponse {
                user: user.into(),
                role,
                redirect_to: role.dashboard_path(),
                has_clients,
            },
        })
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> Result<Session> {
        validate_credentials(&request.email, &request.password, &request.name)?;
        if !matches!(request.role, Role::Broker | Role::Client) {
            return Err(AppError::Validation("Role must be BROKER or CLIENT".into()));
        }

        let email = request.email.trim().to_lowercase();
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".into()));
        }

        let company_name = non_blank(request.company_name);
        let company_address = non_blank(request.company_address);
        let contact_number = non_blank(request.contact_number);

        let mut tx = self.users.pool().begin().await.map_err(AppError::Database)?;
        let user = insert_user(
            &mut tx,
            NewUser {
                email,
                name: request.name.trim().to_string(),
                role: request.role,
                password_hash: hash_password(&request.password)?,
                company_name: company_name.clone(),
                company_address: company_address.clone(),
                contact_number: contact_number.clone(),
            },
        )
        .await?;

        // the account and its company consignee land together or not at all
        if let Some(company) = company_name {
            let form = ConsigneeForm {
                name: company.clone(),
                registered_name: company,
                business_address: company_address.unwrap_or_default(),
                contact_person: user.name.clone(),
                contact_number: contact_number.unwrap_or_default(),
                email: user.email.clone(),
                ..Default::default()
            };
            insert_consignee(&mut tx, &user.id, &form).await?;
        }
        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "user signed up");
        self.session_for(user).await
    }

    pub async fn sign_in(&self, request: SignInRequest) -> Result<Session> {
        let email = request.email.trim().to_lowercase();
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .filter(|user| verify_password(&request.password, &user.password_hash));

        let Some(user) = user else {
            tracing::info!(%email, "failed sign-in");
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        };

        tracing::info!(user_id = %user.id, "user signed in");
        self.session_for(user).await
    }

    /// Create the first super admin. Only possible while none exists.
    pub async fn setup_super_admin(&self, request: SetupRequest) -> Result<Session> {
        validate_credentials(&request.email, &request.password, &request.name)?;
        if self.users.count_with_role(Role::SuperAdmin).await? > 0 {
            return Err(AppError::Conflict("Super admin already exists".into()));
        }

        let user = self
            .users
            .create_user(NewUser {
                email: request.email.trim().to_lowercase(),
                name: request.name.trim().to_string(),
                role: Role::SuperAdmin,
                password_hash: hash_password(&request.password)?,
                company_name: None,
                company_address: None,
                contact_number: None,
            })
            .await?;

        tracing::info!(user_id = %user.id, "super admin created");
        self.session_for(user).await
    }
}
