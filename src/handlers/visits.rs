use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::auth::{Capability, RequestContext};
use crate::enums::{Department, VisitType};
use crate::error::ApiError;
use crate::models::DepartmentReferral;
use crate::store::visits::{VisitFilter, VisitForm, VisitRow};
use crate::{DbPool, db, store};

use super::{choice, created, filter_choice, optional_id, optional_text, outcome, positive_id};

#[derive(Debug, Deserialize)]
pub struct VisitInput {
    pub patient_id: Option<String>,
    pub visit_type: Option<String>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    /// Queue entry the visit was started from, completed on save.
    pub queue_id: Option<String>,
}

impl VisitInput {
    fn validate(&self) -> Result<VisitForm, ApiError> {
        Ok(VisitForm {
            patient_id: positive_id(self.patient_id.as_deref(), "Please select a patient.")?,
            visit_type: choice::<VisitType>(self.visit_type.as_deref(), "Please select visit type.")?,
            symptoms: optional_text(self.symptoms.as_deref()),
            diagnosis: optional_text(self.diagnosis.as_deref()),
            prescription: optional_text(self.prescription.as_deref()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct VisitQuery {
    pub patient_search: Option<String>,
    pub visit_type: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReferForm {
    pub department: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
struct VisitDetail {
    #[serde(flatten)]
    visit: VisitRow,
    referrals: Vec<DepartmentReferral>,
}

fn date_filter(value: Option<&str>, name: &str) -> Result<Option<NaiveDate>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::validation(format!("Invalid {}: {}", name, text))),
        None => Ok(None),
    }
}

// Handler to record a visit, activating the patient on their first one
pub async fn create(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    form: web::Form<VisitInput>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::RecordVisits)?;
    let visit_form = form.validate()?;
    let queue_id = optional_id(form.queue_id.as_deref(), "queue id")?;
    let clinician_id = ctx.user_id;

    let recorded = db::run(&pool, move |conn| store::visits::record(conn, clinician_id, &visit_form, queue_id)).await?;

    tracing::info!(
        visit_id = recorded.visit.id,
        patient_id = recorded.visit.patient_id,
        clinician_id,
        activated = recorded.activated,
        "visit recorded"
    );
    if recorded.queue_completed == Some(false) {
        tracing::warn!(queue_id = ?queue_id, "visit saved but queue entry was not in progress");
    }
    Ok(created("Visit recorded successfully.", &recorded))
}

pub async fn list(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    query: web::Query<VisitQuery>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::RecordVisits)?;
    let filter = VisitFilter {
        patient_search: query.patient_search.clone(),
        visit_type: filter_choice::<VisitType>(query.visit_type.as_deref(), "visit type")?,
        date_from: date_filter(query.date_from.as_deref(), "date_from")?,
        date_to: date_filter(query.date_to.as_deref(), "date_to")?,
        limit: None,
    };

    let visits = db::run(&pool, move |conn| Ok(store::visits::list(conn, &filter)?)).await?;
    Ok(HttpResponse::Ok().json(visits))
}

pub async fn get(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::RecordVisits)?;
    let visit_id = path.into_inner();

    let detail = db::run(&pool, move |conn| {
        let visit = store::visits::find(conn, visit_id)?.ok_or(ApiError::NotFound("visit"))?;
        let referrals = store::referrals::for_visit(conn, visit_id)?;
        Ok(VisitDetail { visit, referrals })
    })
    .await?;
    Ok(HttpResponse::Ok().json(detail))
}

pub async fn update(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    path: web::Path<i32>,
    form: web::Form<VisitInput>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::RecordVisits)?;
    let visit_id = path.into_inner();
    let visit_form = form.validate()?;

    let updated = db::run(&pool, move |conn| store::visits::update(conn, visit_id, &visit_form)).await?;
    if !updated {
        return Err(ApiError::NotFound("visit"));
    }
    Ok(outcome(true, "Visit updated successfully."))
}

pub async fn delete(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::RecordVisits)?;
    let visit_id = path.into_inner();

    let deleted = db::run(&pool, move |conn| Ok(store::visits::delete(conn, visit_id)?)).await?;
    if !deleted {
        return Err(ApiError::NotFound("visit"));
    }
    tracing::info!(visit_id, deleted_by = ctx.user_id, "visit deleted");
    Ok(outcome(true, "Visit deleted successfully."))
}

// Handler to refer the patient from a visit to a department
pub async fn refer(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    path: web::Path<i32>,
    form: web::Form<ReferForm>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::RecordVisits)?;
    let visit_id = path.into_inner();
    let department = choice::<Department>(form.department.as_deref(), "Please select a department.")?;
    let notes = optional_text(form.notes.as_deref());
    let doctor_id = ctx.user_id;

    let referral = db::run(&pool, move |conn| {
        store::referrals::create(conn, visit_id, doctor_id, department, &notes)
    })
    .await?;

    tracing::info!(referral_id = referral.id, visit_id, %department, "patient referred");
    Ok(created(&format!("Patient referred to {}.", department), &referral))
}
