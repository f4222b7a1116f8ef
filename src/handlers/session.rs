use actix_web::cookie::time::Duration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{RequestContext, SESSION_COOKIE};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::UserSummary;
use crate::{DbPool, db, store};

use super::required;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

// Handler to start a session from username and password
pub async fn login(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, ApiError> {
    let username = required(form.username.as_deref(), "Username is required.")?;
    let password = form
        .password
        .clone()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::validation("Password is required."))?;
    let ttl_hours = config.session_ttl_hours;

    let (user, token) = db::run(&pool, move |conn| {
        let user = store::users::authenticate(conn, &username, &password)?.ok_or(ApiError::BadCredentials)?;
        let token = store::users::create_session(conn, user.id, ttl_hours)?;
        Ok((user, token))
    })
    .await?;

    tracing::info!(user_id = user.id, role = %user.role, "user logged in");

    let cookie = Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::hours(ttl_hours))
        .finish();
    Ok(HttpResponse::Ok().cookie(cookie).json(json!({
        "success": true,
        "message": format!("Welcome, {}", user.full_name),
        "user": UserSummary::from(user),
    })))
}

// Handler to end the current session
pub async fn logout(pool: web::Data<DbPool>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    if let Some(token) = req.cookie(SESSION_COOKIE).map(|c| c.value().to_owned()) {
        db::run(&pool, move |conn| Ok(store::users::delete_session(conn, &token)?)).await?;
    }

    let removal = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .max_age(Duration::ZERO)
        .finish();
    Ok(HttpResponse::Ok().cookie(removal).json(json!({
        "success": true,
        "message": "Logged out.",
    })))
}

pub async fn me(ctx: RequestContext) -> HttpResponse {
    HttpResponse::Ok().json(ctx)
}
