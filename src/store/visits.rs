use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::Serialize;

use crate::enums::VisitType;
use crate::error::ApiError;
use crate::models::{NewVisit, Patient, Visit, VisitChanges};
use crate::schema::{patients, users, visits};

/// Validated visit form input.
#[derive(Debug, Clone)]
pub struct VisitForm {
    pub patient_id: i32,
    pub visit_type: VisitType,
    pub symptoms: String,
    pub diagnosis: String,
    pub prescription: String,
}

#[derive(Debug, Clone, Default)]
pub struct VisitFilter {
    pub patient_search: Option<String>,
    pub visit_type: Option<VisitType>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisitRow {
    #[serde(flatten)]
    pub visit: Visit,
    pub patient_name: String,
    pub card_number: String,
    pub clinician_name: String,
}

/// What creating a visit changed besides the visit row itself.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedVisit {
    pub visit: Visit,
    /// This was the patient's first visit.
    pub activated: bool,
    /// Outcome of closing the queue entry the visit was started from.
    pub queue_completed: Option<bool>,
}

/// Records an encounter. The patient is activated if this is their first
/// visit, and the originating queue entry (if any) is completed when it
/// belongs to the same patient. Each step is its own statement.
pub fn record(
    conn: &mut PgConnection,
    clinician_id: i32,
    form: &VisitForm,
    queue_id: Option<i32>,
) -> Result<RecordedVisit, ApiError> {
    if super::patients::find(conn, form.patient_id)?.is_none() {
        return Err(ApiError::NotFound("patient"));
    }

    let visit = diesel::insert_into(visits::table)
        .values(&NewVisit {
            patient_id: form.patient_id,
            clinician_id,
            visit_type: form.visit_type,
            symptoms: &form.symptoms,
            diagnosis: &form.diagnosis,
            prescription: &form.prescription,
        })
        .returning(Visit::as_returning())
        .get_result(conn)?;

    let activated = super::patients::activate_on_first_visit(conn, form.patient_id)?;
    let queue_completed = match queue_id {
        Some(id) => Some(super::queue::complete_visit_for(conn, id, form.patient_id)?),
        None => None,
    };

    Ok(RecordedVisit { visit, activated, queue_completed })
}

pub fn find(conn: &mut PgConnection, visit_id: i32) -> QueryResult<Option<VisitRow>> {
    visits::table
        .inner_join(patients::table)
        .inner_join(users::table)
        .filter(visits::id.eq(visit_id))
        .select((Visit::as_select(), Patient::as_select(), users::full_name))
        .first::<(Visit, Patient, String)>(conn)
        .optional()
        .map(|row| row.map(into_row))
}

pub fn update(conn: &mut PgConnection, visit_id: i32, form: &VisitForm) -> Result<bool, ApiError> {
    if super::patients::find(conn, form.patient_id)?.is_none() {
        return Err(ApiError::NotFound("patient"));
    }
    let updated = diesel::update(visits::table.find(visit_id))
        .set(&VisitChanges {
            patient_id: form.patient_id,
            visit_type: form.visit_type,
            symptoms: &form.symptoms,
            diagnosis: &form.diagnosis,
            prescription: &form.prescription,
        })
        .execute(conn)?;
    Ok(updated == 1)
}

pub fn delete(conn: &mut PgConnection, visit_id: i32) -> QueryResult<bool> {
    let deleted = diesel::delete(visits::table.find(visit_id)).execute(conn)?;
    Ok(deleted == 1)
}

/// Newest first.
pub fn list(conn: &mut PgConnection, filter: &VisitFilter) -> QueryResult<Vec<VisitRow>> {
    let mut query = visits::table
        .inner_join(patients::table)
        .inner_join(users::table)
        .into_boxed();
    if let Some(term) = filter.patient_search.as_deref().filter(|t| !t.trim().is_empty()) {
        query = query.filter(patients::full_name.ilike(super::like_pattern(term)));
    }
    if let Some(visit_type) = filter.visit_type {
        query = query.filter(visits::visit_type.eq(visit_type));
    }
    if let Some(from) = filter.date_from {
        query = query.filter(visits::created_at.ge(day_start(from)));
    }
    if let Some(to) = filter.date_to {
        if let Some(next) = to.succ_opt() {
            query = query.filter(visits::created_at.lt(day_start(next)));
        }
    }
    if let Some(limit) = filter.limit {
        query = query.limit(limit);
    }

    let rows: Vec<(Visit, Patient, String)> = query
        .order((visits::created_at.desc(), visits::id.desc()))
        .select((Visit::as_select(), Patient::as_select(), users::full_name))
        .load(conn)?;
    Ok(rows.into_iter().map(into_row).collect())
}

pub fn count_today(conn: &mut PgConnection) -> QueryResult<i64> {
    visits::table
        .filter(visits::created_at.ge(super::start_of_today()))
        .count()
        .get_result(conn)
}

fn day_start(day: NaiveDate) -> NaiveDateTime {
    day.and_time(chrono::NaiveTime::MIN)
}

fn into_row((visit, patient, clinician_name): (Visit, Patient, String)) -> VisitRow {
    VisitRow {
        visit,
        patient_name: patient.full_name,
        card_number: patient.card_number,
        clinician_name,
    }
}
