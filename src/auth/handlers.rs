use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, JwtKeys, LoginRequest, MessageResponse,
            PublicUser, RefreshRequest, RegisterRequest, ResetPasswordRequest, SetRoleRequest,
            UpdateProfileRequest,
        },
        extractors::{AdminUser, AuthUser},
        repo::{NewUser, ProfileUpdate, User},
        services::{
            hash_password, hash_token, is_valid_email, random_token, verify_password,
            MIN_PASSWORD_LEN, MIN_USERNAME_LEN, RESET_TOKEN_TTL,
        },
        Role,
    },
    error::{AppError, AppResult},
    mailer::{password_reset_email, verification_email},
    params::{PageQuery, Paged, Pagination},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/verify-email/:token", get(verify_email))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password/:token", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(get_me))
        .route("/auth/profile", put(update_profile))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id/role", put(set_role))
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::bad_request("Invalid email"));
    }

    if payload.username.chars().count() < MIN_USERNAME_LEN {
        return Err(AppError::bad_request(format!(
            "Username must be at least {MIN_USERNAME_LEN} characters"
        )));
    }

    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    // Ensure email and username are not taken
    if User::email_or_username_taken(&state.db, &payload.email, &payload.username).await? {
        warn!(email = %payload.email, "user already exists");
        return Err(AppError::Conflict("User already exists".into()));
    }

    let hash = hash_password(&payload.password)?;

    let is_admin = state.config.admin_email.as_deref() == Some(payload.email.as_str());
    let needs_verification = state.config.require_email_verification;
    let verification_token = needs_verification.then(random_token);

    let user = User::create(
        &state.db,
        NewUser {
            username: &payload.username,
            email: &payload.email,
            password_hash: &hash,
            role: if is_admin { Role::Admin } else { Role::User },
            verification_token: verification_token.as_deref(),
            is_verified: !needs_verification,
        },
    )
    .await?;

    if let Some(token) = &verification_token {
        let email = verification_email(&user.email, &state.config.public_url, token);
        if let Err(e) = state.mailer.send(email).await {
            error!(error = %e, user_id = %user.id, "verification email failed");
        }
    }

    let keys = JwtKeys::from_ref(&state);
    let (access_token, refresh_token) = keys.sign_pair(user.id, user.role)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    let message = if needs_verification {
        "User created successfully. Please check your email to verify your account."
    } else {
        "User created successfully."
    };
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: Some(message.into()),
            access_token,
            refresh_token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    match User::verify_email(&state.db, &token).await? {
        Some(user_id) => {
            info!(%user_id, "email verified");
            Ok(Json(MessageResponse::new("Email verified successfully")))
        }
        None => Err(AppError::bad_request("Invalid verification token")),
    }
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::bad_request("Invalid email"));
    }

    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    if state.config.require_email_verification && !user.is_verified {
        warn!(user_id = %user.id, "login before email verification");
        return Err(AppError::Unauthorized(
            "Please verify your email first".into(),
        ));
    }

    let keys = JwtKeys::from_ref(&state);
    let (access_token, refresh_token) = keys.sign_pair(user.id, user.role)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        message: Some("Login successful".into()),
        access_token,
        refresh_token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    // Role may have changed since the refresh token was issued
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    let (access_token, refresh_token) = keys.sign_pair(user.id, user.role)?;
    Ok(Json(AuthResponse {
        message: None,
        access_token,
        refresh_token,
        user: user.into(),
    }))
}

#[instrument]
pub async fn logout(user: AuthUser) -> Json<MessageResponse> {
    info!(user_id = %user.id, "user logged out");
    Json(MessageResponse::new("Logout successful"))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let email = payload.email.trim().to_lowercase();
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let token = random_token();
    let expires_at = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;
    User::set_reset_token(&state.db, user.id, &hash_token(&token), expires_at).await?;

    state
        .mailer
        .send(password_reset_email(&user.email, &state.config.public_url, &token))
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user.id, "password reset email failed");
            AppError::Internal(e)
        })?;

    info!(user_id = %user.id, "password reset requested");
    Ok(Json(MessageResponse::new("Password reset email sent")))
}

#[instrument(skip(state, token, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let hash = hash_password(&payload.password)?;
    match User::reset_password(&state.db, &hash_token(&token), &hash).await? {
        Some(user_id) => {
            info!(%user_id, "password reset");
            Ok(Json(MessageResponse::new("Password reset successful")))
        }
        None => Err(AppError::bad_request("Invalid or expired token")),
    }
}

#[instrument(skip(state))]
pub async fn get_me(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<PublicUser>> {
    let found = User::find_by_id(&state.db, user.id).await?.ok_or_else(|| {
        error!(user_id = %user.id, "user not found");
        AppError::Unauthorized("User not found".into())
    })?;
    Ok(Json(found.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<PublicUser>> {
    let address = payload.address.map(|a| a.normalized()).transpose()?;
    let update = ProfileUpdate {
        first_name: optional_text(payload.first_name),
        last_name: optional_text(payload.last_name),
        phone: optional_text(payload.phone),
        address,
    };
    let updated = User::update_profile(&state.db, user.id, update)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    info!(user_id = %user.id, "profile updated");
    Ok(Json(updated.into()))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Paged<PublicUser>>> {
    let p = Pagination::from(q);
    let (users, total) = User::list(&state.db, p.limit, p.offset).await?;
    Ok(Json(Paged {
        items: users.into_iter().map(PublicUser::from).collect(),
        total,
        limit: p.limit,
        offset: p.offset,
    }))
}

#[instrument(skip(state))]
pub async fn set_role(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetRoleRequest>,
) -> AppResult<Json<PublicUser>> {
    if id == admin_id && payload.role != Role::Admin {
        return Err(AppError::bad_request("Admins cannot demote themselves"));
    }
    let user = User::set_role(&state.db, id, payload.role)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    info!(user_id = %id, role = ?payload.role, by = %admin_id, "role changed");
    Ok(Json(user.into()))
}

#[cfg(test)]
mod me_tests {
    use super::*;
    use crate::auth::dto::Profile;

    #[test]
    fn test_me_response_serialization() {
        let response = PublicUser {
            id: uuid::Uuid::new_v4(),
            username: "buyer".into(),
            email: "test@example.com".to_string(),
            role: Role::User,
            is_verified: true,
            preferred_currency: "USD".into(),
            profile: Profile {
                first_name: None,
                last_name: None,
                phone: None,
                address: None,
            },
            created_at: OffsetDateTime::UNIX_EPOCH,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["email"], "test@example.com");
        assert_eq!(json["role"], "user");
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn optional_text_drops_blanks() {
        assert_eq!(optional_text(Some("  ".into())), None);
        assert_eq!(optional_text(Some(" Ada ".into())), Some("Ada".into()));
        assert_eq!(optional_text(None), None);
    }
}
