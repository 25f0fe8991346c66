use axum::{
    extract::{FromRef, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::{get, patch, post},
    Json, Router,
};
use time::{Duration, OffsetDateTime};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            ForgotPasswordRequest, LoginRequest, MessageResponse, ResetPasswordRequest,
            SignupRequest, UpdatePasswordRequest, UserData, UserResponse, UsersData,
            UsersResponse,
        },
        guard::CurrentUser,
        session::TokenIssuer,
    },
    error::{AppError, AppResult},
    extract::AppJson,
    mail::Email,
    state::AppState,
    users::{normalize_email, password, reset_token, NewUser},
};

/// Status sent with the session re-issued after a password reset or update.
/// Kept at the value existing clients observe.
pub const REISSUE_STATUS: StatusCode = StatusCode::BAD_REQUEST;

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/forgotPassword", post(forgot_password))
        .route("/resetPassword/:token", patch(reset_password))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/updateMyPassword", patch(update_password))
        .route("/me", get(get_me))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/", get(list_users))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SignupRequest>,
) -> AppResult<Response> {
    let new_user = NewUser::parse(
        &payload.name,
        &payload.email,
        &payload.password,
        &payload.password_confirm,
        payload.password_changed_at,
    )
    .inspect_err(|e| warn!(error = %e, "signup rejected"))?;

    let user = state.users.create(new_user).await?;
    info!(user_id = %user.id, email = %user.email, "user signed up");

    TokenIssuer::from_ref(&state).issue(user, StatusCode::CREATED)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Option<AppJson<LoginRequest>>,
) -> AppResult<Response> {
    // an unreadable body carries no credentials
    let LoginRequest {
        email,
        password: candidate,
    } = payload.map(|AppJson(p)| p).unwrap_or_default();
    let (email, candidate) = match (email, candidate) {
        (Some(email), Some(candidate)) if !email.trim().is_empty() && !candidate.is_empty() => {
            (normalize_email(&email), candidate)
        }
        _ => return Err(AppError::bad_request("Please provide email and password!")),
    };

    let user = match state.users.find_by_email(&email).await? {
        Some(user) if user.correct_password(&candidate)? => user,
        Some(user) => {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::unauthorized("Incorrect email or password"));
        }
        None => {
            password::match_unknown_account(&candidate);
            warn!(email = %email, "login unknown email");
            return Err(AppError::unauthorized("Incorrect email or password"));
        }
    };

    info!(user_id = %user.id, "user logged in");
    TokenIssuer::from_ref(&state).issue(user, StatusCode::OK)
}

/// `<protocol>://<host>` of the incoming request.
fn request_origin(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    format!("{}://{}", proto, host)
}

fn reset_email(to: &str, reset_url: &str, ttl_minutes: i64) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("Your password reset token (valid for {} min)", ttl_minutes),
        message: format!(
            "Forgot your password? Submit a PATCH request with your new password and \
             passwordConfirm to: {}.\nIf you didn't forget your password, please ignore this email!",
            reset_url
        ),
    }
}

#[instrument(skip(state, headers, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(payload): AppJson<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let email = payload
        .email
        .map(|e| normalize_email(&e))
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::bad_request("Please provide your email address."))?;

    let mut user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::not_found("There is no user with that email address."))?;

    let ttl_minutes = state.config.reset_token_ttl_minutes;
    let plain = user.create_password_reset_token(
        Duration::minutes(ttl_minutes),
        OffsetDateTime::now_utc(),
    );
    state.users.save(&user).await?;

    let reset_url = format!(
        "{}/api/v1/users/resetPassword/{}",
        request_origin(&headers),
        plain
    );
    let message = reset_email(&user.email, &reset_url, ttl_minutes);

    if let Err(e) = state.mailer.send(&message).await {
        error!(error = ?e, user_id = %user.id, "reset email failed; clearing token");
        user.clear_password_reset_token();
        state.users.save(&user).await?;
        return Err(AppError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "There was an error sending the email. Try again later!",
        ));
    }

    info!(user_id = %user.id, "reset token sent");
    Ok(Json(MessageResponse {
        status: "success",
        message: "Token sent to email!".into(),
    }))
}

#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> AppResult<Response> {
    let hashed = reset_token::hash(&token);
    let now = OffsetDateTime::now_utc();

    let mut user = state
        .users
        .find_by_reset_token(&hashed, now)
        .await?
        .ok_or_else(|| {
            warn!("invalid or expired reset token");
            AppError::bad_request("Token is invalid or has expired")
        })?;

    user.set_password(&payload.password, &payload.password_confirm, now)?;
    user.clear_password_reset_token();
    state.users.save(&user).await?;
    info!(user_id = %user.id, "password reset");

    TokenIssuer::from_ref(&state).issue(user, REISSUE_STATUS)
}

#[instrument(skip_all)]
pub async fn update_password(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    AppJson(payload): AppJson<UpdatePasswordRequest>,
) -> AppResult<Response> {
    let mut user = state
        .users
        .find_by_id(current.id)
        .await?
        .ok_or_else(|| {
            AppError::unauthorized("The user belonging to this token does no longer exist.")
        })?;

    if !user.correct_password(&payload.password_current)? {
        warn!(user_id = %user.id, "current password mismatch");
        return Err(AppError::unauthorized("Your current password is wrong."));
    }

    user.set_password(
        &payload.password,
        &payload.password_confirm,
        OffsetDateTime::now_utc(),
    )?;
    state.users.save(&user).await?;
    info!(user_id = %user.id, "password updated");

    TokenIssuer::from_ref(&state).issue(user, REISSUE_STATUS)
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse {
        status: "success",
        data: UserData { user },
    })
}

#[instrument(skip_all)]
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<UsersResponse>> {
    let users = state.users.list().await?;
    Ok(Json(UsersResponse {
        status: "success",
        results: users.len(),
        data: UsersData { users },
    }))
}
