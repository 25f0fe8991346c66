use axum::{
    extract::FromRef,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use time::{Duration, OffsetDateTime};
use tracing::info;

use crate::{
    auth::{
        dto::{AuthResponse, UserData},
        jwt::JwtKeys,
    },
    error::AppResult,
    state::AppState,
    users::User,
};

pub const COOKIE_NAME: &str = "jwt";

/// Signs session tokens and hands them to the client as both a cookie and a
/// JSON body.
#[derive(Clone)]
pub struct TokenIssuer {
    keys: JwtKeys,
    cookie_ttl: Duration,
    secure: bool,
}

impl FromRef<AppState> for TokenIssuer {
    fn from_ref(state: &AppState) -> Self {
        Self {
            keys: JwtKeys::from_ref(state),
            cookie_ttl: Duration::days(state.config.jwt.cookie_ttl_days),
            secure: state.config.environment.is_production(),
        }
    }
}

impl TokenIssuer {
    pub fn issue(&self, user: User, status: StatusCode) -> AppResult<Response> {
        let token = self
            .keys
            .sign(user.id)
            .map_err(|e| anyhow::Error::new(e).context("sign session token"))?;
        info!(user_id = %user.id, %status, "session issued");

        let jar = CookieJar::new().add(self.cookie(token.clone()));
        let body = AuthResponse {
            status: "success",
            token,
            data: UserData { user },
        };
        Ok((status, jar, Json(body)).into_response())
    }

    fn cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((COOKIE_NAME, token))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .expires(OffsetDateTime::now_utc() + self.cookie_ttl)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::state::testing::TestApp;
    use crate::users::{model::sample_user, Role};
    use axum::http::header::SET_COOKIE;

    fn set_cookie(res: &Response) -> String {
        res.headers()
            .get(SET_COOKIE)
            .expect("cookie set")
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn issue_sets_cookie_and_body() {
        let app = TestApp::spawn();
        let issuer = TokenIssuer::from_ref(&app.state);
        let user = sample_user("ada@example.com", "pass1234", Role::User);
        let id = user.id;

        let res = issuer.issue(user, StatusCode::CREATED).expect("issue");
        assert_eq!(res.status(), StatusCode::CREATED);
        let cookie = set_cookie(&res);
        assert!(cookie.starts_with("jwt="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Expires="));
        assert!(!cookie.contains("Secure"));

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "success");
        assert!(body["data"]["user"].get("passwordHash").is_none());
        assert!(body["data"]["user"].get("password").is_none());

        let token = body["token"].as_str().unwrap();
        assert!(cookie.contains(token));
        let claims = JwtKeys::from_ref(&app.state).verify(token).expect("verify");
        assert_eq!(claims.sub, id);
    }

    #[tokio::test]
    async fn production_cookie_is_secure() {
        let app = TestApp::spawn_in(Environment::Production);
        let issuer = TokenIssuer::from_ref(&app.state);
        let user = sample_user("ada@example.com", "pass1234", Role::User);

        let res = issuer.issue(user, StatusCode::OK).expect("issue");
        assert!(set_cookie(&res).contains("Secure"));
    }
}
