//! Doctor-side test requests and technician-side result entry.
//!
//! Doctors raise lab requests and ultrasound requests against active
//! patients; lab and ultrasound technicians work the pending lists and
//! complete each request exactly once by attaching their result.

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use crate::auth::{Capability, RequestContext};
use crate::enums::{RequestStatus, Role};
use crate::error::ApiError;
use crate::models::{Patient, PatientSummary};
use crate::store::requests::{LabRequestRow, RequestCounts, RequestFilter, UltrasoundRow};
use crate::{DbPool, db, store};

use super::{created, filter_choice, optional_text, outcome, positive_id, required};

#[derive(Debug, Deserialize)]
pub struct LabRequestForm {
    pub patient_id: Option<String>,
    pub tests_requested: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UltrasoundForm {
    pub patient_id: Option<String>,
    pub ultrasound_type: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResultForm {
    pub result_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportForm {
    pub report_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RequestQuery {
    pub status: Option<String>,
    pub patient_search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub patient_search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResultKind {
    All,
    Lab,
    Ultrasound,
}

impl std::str::FromStr for ResultKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(ResultKind::All),
            "lab" => Ok(ResultKind::Lab),
            "ultrasound" => Ok(ResultKind::Ultrasound),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestList<T> {
    requests: Vec<T>,
    counts: RequestCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    patients: Option<Vec<PatientSummary>>,
}

#[derive(Debug, Serialize)]
struct ResultsView {
    lab_results: Vec<LabRequestRow>,
    ultrasound_reports: Vec<UltrasoundRow>,
    total_lab_results: i64,
    total_ultrasound_reports: i64,
}

// Doctors see their own requests; admins see the whole clinic
fn requester(ctx: &RequestContext) -> Option<i32> {
    (ctx.role == Role::Doctor).then_some(ctx.user_id)
}

fn summaries(patients: Vec<Patient>) -> Option<Vec<PatientSummary>> {
    Some(patients.into_iter().map(PatientSummary::from).collect())
}

pub async fn create_lab_request(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    form: web::Form<LabRequestForm>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::RequestTests)?;
    let patient_id = positive_id(form.patient_id.as_deref(), "Please select a patient.")?;
    let tests = required(form.tests_requested.as_deref(), "Please specify the tests requested.")?;
    let notes = optional_text(form.notes.as_deref());
    let doctor_id = ctx.user_id;

    let request = db::run(&pool, move |conn| {
        store::patients::find(conn, patient_id)?.ok_or(ApiError::NotFound("patient"))?;
        Ok(store::requests::create_lab_request(conn, patient_id, doctor_id, &tests, &notes)?)
    })
    .await?;

    tracing::info!(request_id = request.id, patient_id, doctor_id, "lab request created");
    Ok(created("Lab request sent successfully.", &request))
}

// Handler to list the requester's lab requests with counts and the patient picker
pub async fn list_lab_requests(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    query: web::Query<RequestQuery>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::RequestTests)?;
    let requested_by = requester(&ctx);
    let filter = RequestFilter {
        requested_by,
        status: filter_choice::<RequestStatus>(query.status.as_deref(), "status")?,
        patient_search: query.patient_search.clone(),
    };

    let view = db::run(&pool, move |conn| {
        Ok(RequestList {
            requests: store::requests::list_lab_requests(conn, &filter)?,
            counts: store::requests::lab_counts(conn, requested_by)?,
            patients: summaries(store::patients::active_by_name(conn)?),
        })
    })
    .await?;
    Ok(HttpResponse::Ok().json(view))
}

pub async fn pending_lab_requests(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    query: web::Query<RequestQuery>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::RecordLabResults)?;
    let filter = RequestFilter {
        requested_by: None,
        status: Some(RequestStatus::Pending),
        patient_search: query.patient_search.clone(),
    };

    let view = db::run(&pool, move |conn| {
        Ok(RequestList {
            requests: store::requests::list_lab_requests(conn, &filter)?,
            counts: store::requests::lab_counts(conn, None)?,
            patients: None,
        })
    })
    .await?;
    Ok(HttpResponse::Ok().json(view))
}

pub async fn record_lab_result(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    path: web::Path<i32>,
    form: web::Form<ResultForm>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::RecordLabResults)?;
    let request_id = path.into_inner();
    let result_text = required(form.result_text.as_deref(), "Result text is required.")?;
    let technician_id = ctx.user_id;

    let completed = db::run(&pool, move |conn| {
        Ok(store::requests::complete_lab_request(conn, request_id, technician_id, &result_text)?)
    })
    .await?;

    if completed {
        tracing::info!(request_id, technician_id, "lab result recorded");
        Ok(outcome(true, "Lab result saved."))
    } else {
        tracing::warn!(request_id, technician_id, "lab result rejected, request is not pending");
        Ok(outcome(false, "Lab request is not pending."))
    }
}

pub async fn create_ultrasound_request(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    form: web::Form<UltrasoundForm>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::RequestTests)?;
    let patient_id = positive_id(form.patient_id.as_deref(), "Please select a patient.")?;
    let ultrasound_type = required(form.ultrasound_type.as_deref(), "Please specify the ultrasound type.")?;
    let notes = optional_text(form.notes.as_deref());
    let requested_by = ctx.user_id;

    let report = db::run(&pool, move |conn| {
        store::patients::find(conn, patient_id)?.ok_or(ApiError::NotFound("patient"))?;
        Ok(store::requests::create_ultrasound_request(
            conn,
            patient_id,
            requested_by,
            &ultrasound_type,
            &notes,
        )?)
    })
    .await?;

    tracing::info!(report_id = report.id, patient_id, requested_by, "ultrasound requested");
    Ok(created("Ultrasound request sent successfully.", &report))
}

pub async fn list_ultrasound_requests(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    query: web::Query<RequestQuery>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::RequestTests)?;
    let requested_by = requester(&ctx);
    let filter = RequestFilter {
        requested_by,
        status: filter_choice::<RequestStatus>(query.status.as_deref(), "status")?,
        patient_search: query.patient_search.clone(),
    };

    let view = db::run(&pool, move |conn| {
        Ok(RequestList {
            requests: store::requests::list_ultrasound_reports(conn, &filter)?,
            counts: store::requests::ultrasound_counts(conn, requested_by)?,
            patients: summaries(store::patients::active_by_name(conn)?),
        })
    })
    .await?;
    Ok(HttpResponse::Ok().json(view))
}

pub async fn pending_ultrasound_requests(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    query: web::Query<RequestQuery>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::RecordUltrasoundReports)?;
    let filter = RequestFilter {
        requested_by: None,
        status: Some(RequestStatus::Pending),
        patient_search: query.patient_search.clone(),
    };

    let view = db::run(&pool, move |conn| {
        Ok(RequestList {
            requests: store::requests::list_ultrasound_reports(conn, &filter)?,
            counts: store::requests::ultrasound_counts(conn, None)?,
            patients: None,
        })
    })
    .await?;
    Ok(HttpResponse::Ok().json(view))
}

pub async fn record_ultrasound_report(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    path: web::Path<i32>,
    form: web::Form<ReportForm>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::RecordUltrasoundReports)?;
    let report_id = path.into_inner();
    let report_text = required(form.report_text.as_deref(), "Report text is required.")?;
    let technician_id = ctx.user_id;

    let completed = db::run(&pool, move |conn| {
        Ok(store::requests::complete_ultrasound_report(conn, report_id, technician_id, &report_text)?)
    })
    .await?;

    if completed {
        tracing::info!(report_id, technician_id, "ultrasound report recorded");
        Ok(outcome(true, "Ultrasound report saved."))
    } else {
        tracing::warn!(report_id, technician_id, "ultrasound report rejected, request is not pending");
        Ok(outcome(false, "Ultrasound request is not pending."))
    }
}

// Handler for the doctor's completed results, lab and ultrasound together
pub async fn results(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    query: web::Query<ResultsQuery>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Capability::RequestTests)?;
    let kind = filter_choice::<ResultKind>(query.kind.as_deref(), "result type")?.unwrap_or(ResultKind::All);
    let requested_by = requester(&ctx);
    let filter = RequestFilter {
        requested_by,
        status: Some(RequestStatus::Completed),
        patient_search: query.patient_search.clone(),
    };

    let view = db::run(&pool, move |conn| {
        let lab_results = match kind {
            ResultKind::All | ResultKind::Lab => store::requests::list_lab_requests(conn, &filter)?,
            ResultKind::Ultrasound => Vec::new(),
        };
        let ultrasound_reports = match kind {
            ResultKind::All | ResultKind::Ultrasound => store::requests::list_ultrasound_reports(conn, &filter)?,
            ResultKind::Lab => Vec::new(),
        };
        Ok(ResultsView {
            lab_results,
            ultrasound_reports,
            total_lab_results: store::requests::completed_lab_total(conn, requested_by)?,
            total_ultrasound_reports: store::requests::completed_ultrasound_total(conn, requested_by)?,
        })
    })
    .await?;
    Ok(HttpResponse::Ok().json(view))
}
