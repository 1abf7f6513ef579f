//! Token login and the auth gate in front of pages and API routes.
//!
//! A request is let through when it carries the access token as a bearer
//! header or a `token` query parameter, or when its session cookie names a
//! live session.

use axum::{
    Form,
    extract::{Query, Request, State},
    http::Uri,
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::{
    TypedHeader,
    extract::{
        CookieJar,
        cookie::{Cookie, SameSite},
    },
    headers::{Authorization, authorization::Bearer},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ServiceError;

use super::AppState;

pub const SESSION_COOKIE: &str = "rehost_session";

/// Login form body
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub token: String,
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

fn is_authorized(
    state: &AppState,
    jar: &CookieJar,
    bearer: Option<&Authorization<Bearer>>,
    uri: &Uri,
) -> bool {
    let service = &state.service;

    if let Some(bearer) = bearer
        && service.check_token(bearer.token())
    {
        return true;
    }

    if let Some(token) = Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(query)| query.token)
        && service.check_token(&token)
    {
        return true;
    }

    jar.get(SESSION_COOKIE)
        .is_some_and(|cookie| service.sessions.is_valid(cookie.value()))
}

/// Auth gate for JSON routes: 401 on failure
pub async fn require_api_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    req: Request,
    next: Next,
) -> Response {
    let bearer = bearer.as_ref().map(|TypedHeader(header)| header);
    if is_authorized(&state, &jar, bearer, req.uri()) {
        return next.run(req).await;
    }

    ServiceError::Unauthorized.into_response()
}

/// Auth gate for HTML pages: redirect to the login form on failure
pub async fn require_page_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    req: Request,
    next: Next,
) -> Response {
    let bearer = bearer.as_ref().map(|TypedHeader(header)| header);
    if is_authorized(&state, &jar, bearer, req.uri()) {
        return next.run(req).await;
    }

    Redirect::to("/login").into_response()
}

pub async fn login_page_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.pages().login(None))
}

pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let service = &state.service;

    if !service.check_token(&form.token) {
        warn!("Rejected login with invalid token");
        let message = service.i18n.get(service.locale(), "login-invalid-token", None);
        return Html(state.pages().login(Some(&message))).into_response();
    }

    let session = service.sessions.create();
    info!("Login succeeded, session created");

    let cookie = Cookie::build((SESSION_COOKIE, session))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    (jar.add(cookie), Redirect::to("/")).into_response()
}

pub async fn logout_handler(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.service.sessions.remove(cookie.value());
    }

    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to("/login"),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use crate::api::tests::{TOKEN, body_json, test_app};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::SESSION_COOKIE;

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn login_request(token: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("token={}", token)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_api_requires_token() {
        let tmp = TempDir::new().unwrap();
        let (app, _) = test_app(&tmp);

        let response = app.oneshot(get("/api/history")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn test_api_accepts_bearer_and_query_token() {
        let tmp = TempDir::new().unwrap();
        let (app, _) = test_app(&tmp);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/history")
                    .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(get(&format!("/api/history?token={}", TOKEN)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get("/api/history?token=wrong")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_pages_redirect_to_login() {
        let tmp = TempDir::new().unwrap();
        let (app, _) = test_app(&tmp);

        let response = app.oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_login_sets_session_cookie() {
        let tmp = TempDir::new().unwrap();
        let (app, service) = test_app(&tmp);

        let response = app.clone().oneshot(login_request(TOKEN)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");

        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.contains("HttpOnly"));
        let pair = set_cookie.split(';').next().unwrap().to_string();
        let session = pair
            .strip_prefix(&format!("{}=", SESSION_COOKIE))
            .unwrap()
            .to_string();
        assert!(service.sessions.is_valid(&session));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::COOKIE, &pair)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/logout")
                    .header(header::COOKIE, &pair)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
        assert!(!service.sessions.is_valid(&session));
    }

    #[tokio::test]
    async fn test_login_with_wrong_token_shows_error() {
        let tmp = TempDir::new().unwrap();
        let (app, _) = test_app(&tmp);

        let response = app.oneshot(login_request("wrong")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Invalid token"));
    }
}
