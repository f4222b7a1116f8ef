use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::auth::{Capability, RequestContext};
use crate::config::AppConfig;
use crate::enums::{PatientStatus, Priority, Role, Sex};
use crate::error::ApiError;
use crate::store::patients::{PatientFilter, Registration};
use crate::{DbPool, db, store};

use super::{choice, created, filter_choice, optional_text, outcome, required};

#[derive(Debug, Deserialize)]
pub struct PatientForm {
    pub full_name: Option<String>,
    pub sex: Option<String>,
    pub phone: Option<String>,
    pub card_number: Option<String>,
}

impl PatientForm {
    fn validate(&self) -> Result<Registration, ApiError> {
        Ok(Registration {
            full_name: required(self.full_name.as_deref(), "Full name is required.")?,
            sex: choice::<Sex>(self.sex.as_deref(), "Sex is required.")?,
            phone: optional_text(self.phone.as_deref()),
            card_number: required(self.card_number.as_deref(), "Card number is required.")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PatientQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendToDoctorForm {
    pub priority: Option<String>,
    pub notes: Option<String>,
}

// Handler to register a new patient
pub async fn register(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    form: web::Form<PatientForm>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::RegisterPatients)?;
    let registration = form.validate()?;

    let patient = db::run(&pool, move |conn| store::patients::register(conn, &registration)).await?;
    tracing::info!(patient_id = patient.id, registered_by = ctx.user_id, "patient registered");

    Ok(created("Patient registered successfully.", &patient))
}

// Handler to list patients with search, status filter and pagination
pub async fn list(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    ctx: RequestContext,
    query: web::Query<PatientQuery>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::ViewPatients)?;
    let filter = PatientFilter {
        search: query.search.clone(),
        status: filter_choice::<PatientStatus>(query.status.as_deref(), "status")?,
        page: query.page.unwrap_or(1),
        per_page: config.page_size,
        waiting_first: ctx.role == Role::Doctor,
    };

    let page = db::run(&pool, move |conn| store::patients::search(conn, &filter)).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::ViewPatients)?;
    let patient_id = path.into_inner();

    let patient = db::run(&pool, move |conn| Ok(store::patients::find(conn, patient_id)?))
        .await?
        .ok_or(ApiError::NotFound("patient"))?;
    Ok(HttpResponse::Ok().json(patient))
}

pub async fn update(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    path: web::Path<i32>,
    form: web::Form<PatientForm>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::ManagePatients)?;
    let patient_id = path.into_inner();
    let registration = form.validate()?;

    let updated = db::run(&pool, move |conn| store::patients::update(conn, patient_id, &registration)).await?;
    if !updated {
        return Err(ApiError::NotFound("patient"));
    }
    Ok(outcome(true, "Patient updated successfully."))
}

// Manual activate/deactivate
pub async fn set_status(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    path: web::Path<i32>,
    form: web::Form<StatusForm>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::ManagePatients)?;
    let patient_id = path.into_inner();
    let status = choice::<PatientStatus>(form.status.as_deref(), "Invalid status.")?;

    let updated = db::run(&pool, move |conn| Ok(store::patients::set_status(conn, patient_id, status)?)).await?;
    if !updated {
        return Err(ApiError::NotFound("patient"));
    }
    tracing::info!(patient_id, %status, changed_by = ctx.user_id, "patient status changed");
    Ok(outcome(true, format!("Patient marked {}.", status)))
}

// Handler to route a patient into the doctor's queue
pub async fn send_to_doctor(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    path: web::Path<i32>,
    form: web::Form<SendToDoctorForm>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::SendToDoctor)?;
    let patient_id = path.into_inner();
    let priority = filter_choice::<Priority>(form.priority.as_deref(), "priority")?.unwrap_or_default();
    let notes = optional_text(form.notes.as_deref());
    let sent_by = ctx.user_id;

    let entry = db::run(&pool, move |conn| {
        let patient = store::patients::find(conn, patient_id)?.ok_or(ApiError::NotFound("patient"))?;
        let entry = store::queue::enqueue(conn, patient.id, sent_by, priority, &notes)?;
        Ok(entry)
    })
    .await?;

    tracing::info!(queue_id = entry.id, patient_id, %priority, sent_by, "patient sent to doctor");
    Ok(created("Patient sent to doctor successfully.", &entry))
}
