//! Lab requests and ultrasound reports. Both follow `pending → completed`,
//! where completion attaches the technician's result text.

use diesel::pg::Pg;
use diesel::prelude::*;
use serde::Serialize;

use crate::enums::{RequestStatus, Workflow};
use crate::models::{
    LabRequest, NewLabRequest, NewUltrasoundReport, Patient, PatientSummary, UltrasoundReport,
};
use crate::schema::{lab_requests, patients, ultrasound_reports, users};

#[derive(Debug, Clone, Serialize)]
pub struct LabRequestRow {
    #[serde(flatten)]
    pub request: LabRequest,
    pub patient: PatientSummary,
    pub doctor_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UltrasoundRow {
    #[serde(flatten)]
    pub report: UltrasoundReport,
    pub patient: PatientSummary,
    pub requested_by_name: String,
    pub technician_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RequestCounts {
    pub pending: i64,
    pub completed_today: i64,
}

/// Which side of a request list is being read.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    /// Only requests raised by this doctor.
    pub requested_by: Option<i32>,
    pub status: Option<RequestStatus>,
    pub patient_search: Option<String>,
}

pub fn create_lab_request(
    conn: &mut PgConnection,
    patient_id: i32,
    doctor_id: i32,
    tests_requested: &str,
    notes: &str,
) -> QueryResult<LabRequest> {
    diesel::insert_into(lab_requests::table)
        .values(&NewLabRequest {
            patient_id,
            doctor_id,
            tests_requested,
            notes,
            status: RequestStatus::Pending,
        })
        .returning(LabRequest::as_returning())
        .get_result(conn)
}

/// Most recently completed first, then newest request; pending requests
/// (no completion time) come after every completed one.
pub fn list_lab_requests(conn: &mut PgConnection, filter: &RequestFilter) -> QueryResult<Vec<LabRequestRow>> {
    let mut query = lab_requests::table
        .inner_join(patients::table)
        .inner_join(users::table)
        .into_boxed();
    if let Some(doctor_id) = filter.requested_by {
        query = query.filter(lab_requests::doctor_id.eq(doctor_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(lab_requests::status.eq(status));
    }
    if let Some(term) = filter.patient_search.as_deref().filter(|t| !t.trim().is_empty()) {
        query = query.filter(patients::full_name.ilike(super::like_pattern(term)));
    }

    let rows: Vec<(LabRequest, Patient, String)> = query
        .order((
            lab_requests::date_completed.desc().nulls_last(),
            lab_requests::date_requested.desc(),
            lab_requests::id.desc(),
        ))
        .select((LabRequest::as_select(), Patient::as_select(), users::full_name))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(request, patient, doctor_name)| LabRequestRow {
            request,
            patient: patient.into(),
            doctor_name,
        })
        .collect())
}

/// Attaches a result. Only requests in the state preceding `completed`
/// (pending) can be completed.
pub fn complete_lab_request(
    conn: &mut PgConnection,
    request_id: i32,
    technician_id: i32,
    result_text: &str,
) -> QueryResult<bool> {
    let to = RequestStatus::Completed;
    let Some(from) = to.predecessor() else {
        return Ok(false);
    };
    let updated = diesel::update(
        lab_requests::table
            .filter(lab_requests::id.eq(request_id))
            .filter(lab_requests::status.eq(from)),
    )
    .set((
        lab_requests::status.eq(to),
        lab_requests::technician_id.eq(technician_id),
        lab_requests::result_text.eq(result_text),
        lab_requests::date_completed.eq(super::now()),
    ))
    .execute(conn)?;
    Ok(updated == 1)
}

/// Counts for one doctor's requests, or the whole clinic when `None`.
pub fn lab_counts(conn: &mut PgConnection, doctor_id: Option<i32>) -> QueryResult<RequestCounts> {
    let scoped = || {
        let mut query: lab_requests::BoxedQuery<'_, Pg> = lab_requests::table.into_boxed();
        if let Some(id) = doctor_id {
            query = query.filter(lab_requests::doctor_id.eq(id));
        }
        query
    };
    let pending = scoped()
        .filter(lab_requests::status.eq(RequestStatus::Pending))
        .count()
        .get_result(conn)?;
    let completed_today = scoped()
        .filter(lab_requests::status.eq(RequestStatus::Completed))
        .filter(lab_requests::date_completed.ge(super::start_of_today()))
        .count()
        .get_result(conn)?;
    Ok(RequestCounts { pending, completed_today })
}

pub fn completed_lab_total(conn: &mut PgConnection, doctor_id: Option<i32>) -> QueryResult<i64> {
    let mut query = lab_requests::table
        .filter(lab_requests::status.eq(RequestStatus::Completed))
        .into_boxed();
    if let Some(id) = doctor_id {
        query = query.filter(lab_requests::doctor_id.eq(id));
    }
    query.count().get_result(conn)
}

pub fn create_ultrasound_request(
    conn: &mut PgConnection,
    patient_id: i32,
    requested_by: i32,
    ultrasound_type: &str,
    notes: &str,
) -> QueryResult<UltrasoundReport> {
    diesel::insert_into(ultrasound_reports::table)
        .values(&NewUltrasoundReport {
            patient_id,
            requested_by,
            ultrasound_type,
            notes,
            status: RequestStatus::Pending,
        })
        .returning(UltrasoundReport::as_returning())
        .get_result(conn)
}

pub fn list_ultrasound_reports(conn: &mut PgConnection, filter: &RequestFilter) -> QueryResult<Vec<UltrasoundRow>> {
    let mut query = ultrasound_reports::table
        .inner_join(patients::table)
        .inner_join(users::table)
        .into_boxed();
    if let Some(doctor_id) = filter.requested_by {
        query = query.filter(ultrasound_reports::requested_by.eq(doctor_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(ultrasound_reports::status.eq(status));
    }
    if let Some(term) = filter.patient_search.as_deref().filter(|t| !t.trim().is_empty()) {
        query = query.filter(patients::full_name.ilike(super::like_pattern(term)));
    }

    let rows: Vec<(UltrasoundReport, Patient, String)> = query
        .order((ultrasound_reports::created_at.desc(), ultrasound_reports::id.desc()))
        .select((UltrasoundReport::as_select(), Patient::as_select(), users::full_name))
        .load(conn)?;

    let technician_ids: Vec<i32> = rows.iter().filter_map(|(r, _, _)| r.technician_id).collect();
    let technicians = super::users::names(conn, &technician_ids)?;

    Ok(rows
        .into_iter()
        .map(|(report, patient, requested_by_name)| UltrasoundRow {
            technician_name: report.technician_id.and_then(|id| technicians.get(&id).cloned()),
            report,
            patient: patient.into(),
            requested_by_name,
        })
        .collect())
}

/// Attaches the technician's report. Only pending requests can be completed.
pub fn complete_ultrasound_report(
    conn: &mut PgConnection,
    report_id: i32,
    technician_id: i32,
    report_text: &str,
) -> QueryResult<bool> {
    let to = RequestStatus::Completed;
    let Some(from) = to.predecessor() else {
        return Ok(false);
    };
    let updated = diesel::update(
        ultrasound_reports::table
            .filter(ultrasound_reports::id.eq(report_id))
            .filter(ultrasound_reports::status.eq(from)),
    )
    .set((
        ultrasound_reports::status.eq(to),
        ultrasound_reports::technician_id.eq(technician_id),
        ultrasound_reports::report_text.eq(report_text),
        ultrasound_reports::completed_at.eq(super::now()),
    ))
    .execute(conn)?;
    Ok(updated == 1)
}

pub fn ultrasound_counts(conn: &mut PgConnection, requested_by: Option<i32>) -> QueryResult<RequestCounts> {
    let scoped = || {
        let mut query: ultrasound_reports::BoxedQuery<'_, Pg> = ultrasound_reports::table.into_boxed();
        if let Some(id) = requested_by {
            query = query.filter(ultrasound_reports::requested_by.eq(id));
        }
        query
    };
    let pending = scoped()
        .filter(ultrasound_reports::status.eq(RequestStatus::Pending))
        .count()
        .get_result(conn)?;
    let completed_today = scoped()
        .filter(ultrasound_reports::status.eq(RequestStatus::Completed))
        .filter(ultrasound_reports::completed_at.ge(super::start_of_today()))
        .count()
        .get_result(conn)?;
    Ok(RequestCounts { pending, completed_today })
}

pub fn completed_ultrasound_total(conn: &mut PgConnection, requested_by: Option<i32>) -> QueryResult<i64> {
    let mut query = ultrasound_reports::table
        .filter(ultrasound_reports::status.eq(RequestStatus::Completed))
        .into_boxed();
    if let Some(id) = requested_by {
        query = query.filter(ultrasound_reports::requested_by.eq(id));
    }
    query.count().get_result(conn)
}
