//! OAuth front-end for the companion web UI.
//!
//! Login redirects to the platform's authorize page; the callback exchanges
//! the code, fetches the user, and sets an HMAC-signed session cookie. No
//! state is shared with the bot core beyond the read-only catalog route.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tracing::warn;

use mentor_core::config::OauthConfig;

use crate::app::AppState;

const COOKIE_NAME: &str = "mentor_session";
const AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";
const TOKEN_URL: &str = "https://discord.com/api/oauth2/token";
const ME_URL: &str = "https://discord.com/api/users/@me";

#[derive(Debug, Clone, serde::Serialize)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub avatar: Option<String>,
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    code: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct MeResponse {
    id: String,
    username: String,
    avatar: Option<String>,
}

/// GET /auth/login — redirect to the platform authorize page.
pub async fn login_handler(State(state): State<Arc<AppState>>) -> Response {
    let Some(oauth) = state.config.oauth.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let url = format!(
        "{AUTHORIZE_URL}?client_id={}&response_type=code&scope=identify&redirect_uri={}",
        oauth.client_id,
        urlencode(&oauth.redirect_uri),
    );
    Redirect::temporary(&url).into_response()
}

/// GET /auth/callback?code= — exchange the code and set the session cookie.
pub async fn callback_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(oauth) = state.config.oauth.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let user = match exchange_code(&state.http_client, oauth, &query.code).await {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, "oauth code exchange failed");
            return (StatusCode::BAD_GATEWAY, "login failed").into_response();
        }
    };

    let cookie_value = sign_session(&oauth.cookie_secret, &user.id);
    state.web_users.insert(user.id.clone(), user);

    (
        [(
            header::SET_COOKIE,
            format!("{COOKIE_NAME}={cookie_value}; HttpOnly; Path=/; SameSite=Lax"),
        )],
        Redirect::temporary("/auth/me"),
    )
        .into_response()
}

/// GET /auth/me — the cookie-identified user record.
pub async fn me_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(oauth) = state.config.oauth.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let Some(user_id) = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| extract_cookie(cookies, COOKIE_NAME))
        .and_then(|value| verify_session(&oauth.cookie_secret, &value))
    else {
        return (StatusCode::UNAUTHORIZED, "not logged in").into_response();
    };

    match state.web_users.get(&user_id) {
        Some(user) => Json(json!(user.value().clone())).into_response(),
        None => (StatusCode::UNAUTHORIZED, "session expired").into_response(),
    }
}

async fn exchange_code(
    client: &reqwest::Client,
    oauth: &OauthConfig,
    code: &str,
) -> anyhow::Result<AuthUser> {
    let token: TokenResponse = client
        .post(TOKEN_URL)
        .form(&[
            ("client_id", oauth.client_id.as_str()),
            ("client_secret", oauth.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", oauth.redirect_uri.as_str()),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let me: MeResponse = client
        .get(ME_URL)
        .bearer_auth(&token.access_token)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(AuthUser {
        id: me.id,
        username: me.username,
        avatar: me.avatar,
    })
}

/// `user_id.hex(hmac)` — forgeable only with the cookie secret.
fn sign_session(secret: &str, user_id: &str) -> String {
    format!("{user_id}.{}", hmac_hex(secret, user_id))
}

/// Returns the user id when the signature checks out.
fn verify_session(secret: &str, cookie_value: &str) -> Option<String> {
    let (user_id, sig) = cookie_value.rsplit_once('.')?;
    if hmac_hex(secret, user_id) == sig {
        Some(user_id.to_string())
    } else {
        None
    }
}

fn hmac_hex(secret: &str, payload: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn extract_cookie(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

fn urlencode(s: &str) -> String {
    s.replace(':', "%3A").replace('/', "%2F")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_roundtrip_and_tamper_detection() {
        let cookie = sign_session("secret", "12345");
        assert_eq!(verify_session("secret", &cookie), Some("12345".into()));
        assert_eq!(verify_session("other-secret", &cookie), None);

        let forged = cookie.replace("12345", "99999");
        assert_eq!(verify_session("secret", &forged), None);
    }

    #[test]
    fn cookie_extraction() {
        let header = "theme=dark; mentor_session=1.abc; lang=en";
        assert_eq!(extract_cookie(header, "mentor_session"), Some("1.abc".into()));
        assert_eq!(extract_cookie(header, "missing"), None);
    }
}
