use actix_web::{HttpResponse, web};
use serde::Serialize;

use crate::auth::{Capability, RequestContext};
use crate::enums::QueueStatus;
use crate::error::ApiError;
use crate::models::Patient;
use crate::store::queue::{QueueCounts, QueueRow};
use crate::{DbPool, db, store};

use super::outcome;

#[derive(Debug, Serialize)]
struct WaitingView {
    waiting: Vec<Patient>,
    seen_today: Vec<Patient>,
    waiting_count: usize,
    seen_today_count: usize,
}

#[derive(Debug, Serialize)]
struct QueueView {
    next: Option<QueueRow>,
    entries: Vec<QueueRow>,
    counts: QueueCounts,
}

// Handler to show registered patients who have not had a first visit yet
pub async fn waiting(pool: web::Data<DbPool>, ctx: RequestContext) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::ViewDoctorQueue)?;

    let (waiting, seen_today) = db::run(&pool, |conn| {
        let waiting = store::patients::waiting_list(conn)?;
        let seen_today = store::patients::seen_today(conn)?;
        Ok((waiting, seen_today))
    })
    .await?;

    Ok(HttpResponse::Ok().json(WaitingView {
        waiting_count: waiting.len(),
        seen_today_count: seen_today.len(),
        waiting,
        seen_today,
    }))
}

// Handler to show the doctor's queue in serving order
pub async fn active(pool: web::Data<DbPool>, ctx: RequestContext) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::ViewDoctorQueue)?;

    let (entries, counts) = db::run(&pool, |conn| {
        let entries = store::queue::active_queue(conn)?;
        let counts = store::queue::counts(conn)?;
        Ok((entries, counts))
    })
    .await?;

    let next = entries
        .iter()
        .find(|row| row.entry.status == QueueStatus::Waiting)
        .cloned();
    Ok(HttpResponse::Ok().json(QueueView { next, entries, counts }))
}

pub async fn start(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::RunDoctorQueue)?;
    let queue_id = path.into_inner();
    let clinician_id = ctx.user_id;

    let started = db::run(&pool, move |conn| Ok(store::queue::start_visit(conn, queue_id, clinician_id)?)).await?;
    if started {
        tracing::info!(queue_id, clinician_id, "visit started");
        Ok(outcome(true, "Visit started."))
    } else {
        tracing::warn!(queue_id, clinician_id, "start rejected, entry is not waiting");
        Ok(outcome(false, "Could not start visit."))
    }
}

pub async fn complete(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::RunDoctorQueue)?;
    let queue_id = path.into_inner();

    let completed = db::run(&pool, move |conn| Ok(store::queue::complete_visit(conn, queue_id)?)).await?;
    if completed {
        tracing::info!(queue_id, clinician_id = ctx.user_id, "visit completed");
        Ok(outcome(true, "Visit completed."))
    } else {
        tracing::warn!(queue_id, clinician_id = ctx.user_id, "complete rejected, entry is not in progress");
        Ok(outcome(false, "Could not complete visit."))
    }
}
