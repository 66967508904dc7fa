//! User service for authentication and user management
//!
//! Password hashing and verification run on the blocking thread pool.
//! Tokens carry the role read from storage at issue time, so a role change
//! made by an admin takes effect on the user's next login or refresh.

use crate::auth::{AuthUser, JwtService, PasswordService};
use crate::error::ApiError;
use crate::metrics as names;
use crate::policy::filter_visible;
use crate::repositories::{NewUser, PackageRecord, Storage, UserRecord, UserUpdate};
use helix_shared::types::{
    AuthResponse, LoginRequest, PackageResponse, RegisterRequest, UpdateUserRequest, UserResponse,
};
use helix_shared::validation::{normalize_email, validate_email, validate_password};
use helix_shared::Role;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Generated initials avatar for a display name
pub fn avatar_url(name: &str) -> String {
    match reqwest::Url::parse_with_params(
        "https://ui-avatars.com/api/",
        &[("name", name), ("background", "random")],
    ) {
        Ok(url) => url.to_string(),
        Err(_) => "https://ui-avatars.com/api/?background=random".to_string(),
    }
}

/// Combine a user with their resolved package
pub fn user_response(user: UserRecord, package: Option<PackageRecord>) -> UserResponse {
    UserResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        avatar: user.avatar,
        active_package: package.map(PackageResponse::from),
        package_end_date: user.package_end_date,
        created_at: user.created_at,
    }
}

/// User service for authentication operations
pub struct UserService;

impl UserService {
    /// Register a new CLIENT account
    pub async fn register(
        store: &dyn Storage,
        jwt: &JwtService,
        request: RegisterRequest,
    ) -> Result<AuthResponse, ApiError> {
        if matches!(request.role, Some(role) if role != Role::Client) {
            return Err(ApiError::Forbidden(
                "Only client accounts can be self-registered".to_string(),
            ));
        }
        request.validate()?;

        let email = normalize_email(&request.email);
        validate_email(&email).map_err(ApiError::Validation)?;
        validate_password(&request.password).map_err(ApiError::Validation)?;

        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::Validation("Name is required".to_string()));
        }

        let password_hash = PasswordService::hash_async(request.password).await?;

        let user = store
            .insert_user(NewUser {
                email,
                password_hash,
                avatar: Some(avatar_url(&name)),
                name,
                role: Role::Client,
            })
            .await?
            .ok_or(ApiError::DuplicateEmail)?;

        metrics::counter!(names::REGISTRATIONS).increment(1);
        info!(user_id = %user.id, "User registered");

        Self::issue_tokens(store, jwt, user).await
    }

    /// Login with email and password, optionally asserting the role
    pub async fn login(
        store: &dyn Storage,
        jwt: &JwtService,
        request: LoginRequest,
    ) -> Result<AuthResponse, ApiError> {
        let email = normalize_email(&request.email);
        let user = store
            .find_user_by_email(&email)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        let valid =
            PasswordService::verify_async(request.password, user.password_hash.clone()).await?;
        if !valid {
            return Err(ApiError::InvalidCredentials);
        }

        if matches!(request.role, Some(role) if role != user.role) {
            return Err(ApiError::InvalidCredentials);
        }

        info!(user_id = %user.id, role = %user.role, "User logged in");
        Self::issue_tokens(store, jwt, user).await
    }

    /// Exchange a refresh token for a fresh pair
    pub async fn refresh(
        store: &dyn Storage,
        jwt: &JwtService,
        refresh_token: &str,
    ) -> Result<AuthResponse, ApiError> {
        let claims = jwt
            .validate_refresh_token(refresh_token)
            .map_err(|e| ApiError::Unauthorized(format!("Invalid refresh token: {}", e)))?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::Unauthorized("Invalid user ID in token".to_string()))?;

        let user = store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

        Self::issue_tokens(store, jwt, user).await
    }

    /// Current user's profile
    pub async fn me(store: &dyn Storage, user_id: Uuid) -> Result<UserResponse, ApiError> {
        let user = store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        Self::to_response(store, user).await
    }

    /// Users the actor may see in the directory
    pub async fn list_users(
        store: &dyn Storage,
        actor: &AuthUser,
    ) -> Result<Vec<UserResponse>, ApiError> {
        let users = filter_visible(store.list_users().await?, actor);
        let packages: HashMap<Uuid, PackageRecord> = store
            .list_packages(false)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        Ok(users
            .into_iter()
            .map(|user| {
                let package = user
                    .active_package_id
                    .and_then(|id| packages.get(&id).cloned());
                user_response(user, package)
            })
            .collect())
    }

    /// Admin edit of role and subscription
    pub async fn update_user(
        store: &dyn Storage,
        actor: &AuthUser,
        id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<UserResponse, ApiError> {
        actor.require_role(Role::Admin)?;

        if let Some(package_id) = request.package_id {
            store
                .find_package(package_id)
                .await?
                .ok_or(ApiError::PackageNotFound)?;
        }

        let user = store
            .update_user(
                id,
                UserUpdate {
                    role: request.role,
                    active_package_id: request.package_id,
                    package_end_date: request.package_end_date,
                },
            )
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        info!(admin_id = %actor.user_id, user_id = %id, role = %user.role, "User updated");
        Self::to_response(store, user).await
    }

    /// Resolve the active package and build the wire form
    pub async fn to_response(
        store: &dyn Storage,
        user: UserRecord,
    ) -> Result<UserResponse, ApiError> {
        let package = match user.active_package_id {
            Some(id) => store.find_package(id).await?,
            None => None,
        };
        Ok(user_response(user, package))
    }

    async fn issue_tokens(
        store: &dyn Storage,
        jwt: &JwtService,
        user: UserRecord,
    ) -> Result<AuthResponse, ApiError> {
        let token = jwt.generate_access_token(user.id, user.role)?;
        let refresh_token = jwt.generate_refresh_token(user.id, user.role)?;

        Ok(AuthResponse {
            user: Self::to_response(store, user).await?,
            token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: jwt.access_token_expiry_secs(),
        })
    }
}
