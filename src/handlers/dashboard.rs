use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::auth::{Capability, RequestContext};
use crate::error::ApiError;
use crate::{DbPool, db, store};

pub async fn dashboard(pool: web::Data<DbPool>, ctx: RequestContext) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::ViewDashboard)?;
    let (role, user_id) = (ctx.role, ctx.user_id);

    let stats = db::run(&pool, move |conn| Ok(store::stats::dashboard(conn, role, user_id)?)).await?;
    Ok(HttpResponse::Ok().json(json!({
        "user": ctx,
        "stats": stats,
    })))
}

pub async fn admin_dashboard(pool: web::Data<DbPool>, ctx: RequestContext) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::Administer)?;
    let user_id = ctx.user_id;

    let stats = db::run(&pool, move |conn| Ok(store::stats::admin_dashboard(conn, user_id)?)).await?;
    Ok(HttpResponse::Ok().json(json!({
        "user": ctx,
        "stats": stats,
    })))
}
