use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::dsl::{count, exists, max};
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::Serialize;

use crate::enums::{PatientStatus, QueueStatus, Sex};
use crate::error::ApiError;
use crate::flow;
use crate::models::{NewPatient, Patient, PatientChanges};
use crate::schema::{doctor_queue, patients, visits};

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub full_name: String,
    pub sex: Sex,
    pub phone: String,
    pub card_number: String,
}

#[derive(Debug, Clone, Default)]
pub struct PatientFilter {
    pub search: Option<String>,
    pub status: Option<PatientStatus>,
    pub page: i64,
    pub per_page: i64,
    /// Unseen patients first, oldest registration first.
    pub waiting_first: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientRow {
    #[serde(flatten)]
    pub patient: Patient,
    pub visit_count: i64,
    pub last_visit: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientPage {
    pub patients: Vec<PatientRow>,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
}

pub fn card_number_taken(conn: &mut PgConnection, card_number: &str, except_id: Option<i32>) -> QueryResult<bool> {
    let mut query = patients::table
        .filter(patients::card_number.eq(card_number))
        .into_boxed();
    if let Some(id) = except_id {
        query = query.filter(patients::id.ne(id));
    }
    diesel::select(exists(query)).get_result(conn)
}

/// New patients start inactive and join the waiting list.
pub fn register(conn: &mut PgConnection, registration: &Registration) -> Result<Patient, ApiError> {
    if card_number_taken(conn, &registration.card_number, None)? {
        return Err(ApiError::Conflict("Card number already exists.".into()));
    }

    diesel::insert_into(patients::table)
        .values(&NewPatient {
            full_name: &registration.full_name,
            sex: registration.sex,
            phone: &registration.phone,
            card_number: &registration.card_number,
            status: PatientStatus::Inactive,
            date_registered: super::now(),
        })
        .returning(Patient::as_returning())
        .get_result(conn)
        .map_err(|e| ApiError::on_duplicate(e, "Card number already exists."))
}

pub fn find(conn: &mut PgConnection, patient_id: i32) -> QueryResult<Option<Patient>> {
    patients::table
        .find(patient_id)
        .select(Patient::as_select())
        .first(conn)
        .optional()
}

pub fn find_by_card_number(conn: &mut PgConnection, card_number: &str) -> QueryResult<Option<Patient>> {
    patients::table
        .filter(patients::card_number.eq(card_number))
        .select(Patient::as_select())
        .first(conn)
        .optional()
}

pub fn update(conn: &mut PgConnection, patient_id: i32, registration: &Registration) -> Result<bool, ApiError> {
    if card_number_taken(conn, &registration.card_number, Some(patient_id))? {
        return Err(ApiError::Conflict("Card number already exists.".into()));
    }

    let updated = diesel::update(patients::table.find(patient_id))
        .set(&PatientChanges {
            full_name: &registration.full_name,
            sex: registration.sex,
            phone: &registration.phone,
            card_number: &registration.card_number,
        })
        .execute(conn)
        .map_err(|e| ApiError::on_duplicate(e, "Card number already exists."))?;
    Ok(updated == 1)
}

/// Manual activate/deactivate from the patient list.
pub fn set_status(conn: &mut PgConnection, patient_id: i32, status: PatientStatus) -> QueryResult<bool> {
    let updated = diesel::update(patients::table.find(patient_id))
        .set(patients::status.eq(status))
        .execute(conn)?;
    Ok(updated == 1)
}

/// Flips an inactive patient to active and stamps the first visit date.
/// Returns `false` when the patient was already active (or does not exist).
pub fn activate_on_first_visit(conn: &mut PgConnection, patient_id: i32) -> QueryResult<bool> {
    let updated = diesel::update(
        patients::table
            .filter(patients::id.eq(patient_id))
            .filter(patients::status.eq(PatientStatus::Inactive)),
    )
    .set((
        patients::status.eq(PatientStatus::Active),
        patients::first_visit_date.eq(super::today()),
    ))
    .execute(conn)?;
    Ok(updated == 1)
}

// Inactive patients not holding a waiting or in-progress queue slot
fn waiting<'a>() -> patients::BoxedQuery<'a, Pg> {
    let queued = doctor_queue::table
        .filter(doctor_queue::status.eq_any(QueueStatus::ACTIVE))
        .select(doctor_queue::patient_id);

    patients::table
        .filter(patients::status.eq(PatientStatus::Inactive))
        .filter(patients::id.ne_all(queued))
        .into_boxed()
}

/// Inactive patients not already holding a waiting or in-progress slot in
/// the doctor's queue, first come first served.
pub fn waiting_list(conn: &mut PgConnection) -> QueryResult<Vec<Patient>> {
    let rows = waiting()
        .order(patients::id.asc())
        .select(Patient::as_select())
        .load(conn)?;
    Ok(flow::order_waiting_list(rows))
}

/// Size of [`waiting_list`].
pub fn waiting_count(conn: &mut PgConnection) -> QueryResult<i64> {
    waiting().count().get_result(conn)
}

/// Patients whose first visit happened today.
pub fn seen_today(conn: &mut PgConnection) -> QueryResult<Vec<Patient>> {
    patients::table
        .filter(patients::status.eq(PatientStatus::Active))
        .filter(patients::first_visit_date.eq(super::today()))
        .order(patients::date_registered.asc())
        .select(Patient::as_select())
        .load(conn)
}

/// Active patients for request forms, by name.
pub fn active_by_name(conn: &mut PgConnection) -> QueryResult<Vec<Patient>> {
    patients::table
        .filter(patients::status.eq(PatientStatus::Active))
        .order(patients::full_name.asc())
        .select(Patient::as_select())
        .load(conn)
}

fn filtered<'a>(filter: &PatientFilter) -> patients::BoxedQuery<'a, Pg> {
    let mut query = patients::table.into_boxed();
    if let Some(term) = filter.search.as_deref().filter(|t| !t.trim().is_empty()) {
        let pattern = super::like_pattern(term);
        query = query.filter(
            patients::full_name
                .ilike(pattern.clone())
                .or(patients::card_number.ilike(pattern.clone()))
                .or(patients::phone.ilike(pattern)),
        );
    }
    if let Some(status) = filter.status {
        query = query.filter(patients::status.eq(status));
    }
    query
}

pub fn search(conn: &mut PgConnection, filter: &PatientFilter) -> Result<PatientPage, ApiError> {
    let per_page = filter.per_page.max(1);
    let page = filter.page.max(1);
    let offset = page_offset(page, per_page)?;
    let total: i64 = filtered(filter).count().get_result(conn)?;

    let mut query = filtered(filter);
    query = if filter.waiting_first {
        // 'inactive' sorts after 'active'
        query.order((
            patients::status.desc(),
            patients::date_registered.asc(),
            patients::id.asc(),
        ))
    } else {
        query.order((patients::full_name.asc(), patients::id.asc()))
    };
    let rows: Vec<Patient> = query
        .limit(per_page)
        .offset(offset)
        .select(Patient::as_select())
        .load(conn)?;

    let ids: Vec<i32> = rows.iter().map(|p| p.id).collect();
    let mut activity: HashMap<i32, (i64, Option<NaiveDateTime>)> = visits::table
        .filter(visits::patient_id.eq_any(&ids))
        .group_by(visits::patient_id)
        .select((visits::patient_id, count(visits::id), max(visits::created_at)))
        .load::<(i32, i64, Option<NaiveDateTime>)>(conn)?
        .into_iter()
        .map(|(id, visits, last)| (id, (visits, last)))
        .collect();

    let patients = rows
        .into_iter()
        .map(|patient| {
            let (visit_count, last_visit) = activity.remove(&patient.id).unwrap_or((0, None));
            PatientRow { patient, visit_count, last_visit }
        })
        .collect();

    Ok(PatientPage {
        patients,
        total,
        page,
        pages: page_count(total, per_page),
    })
}

/// Rows skipped before `page`; pages past the addressable range are rejected.
pub fn page_offset(page: i64, per_page: i64) -> Result<i64, ApiError> {
    page.max(1)
        .checked_sub(1)
        .and_then(|skipped| skipped.checked_mul(per_page.max(1)))
        .ok_or_else(|| ApiError::validation("Page number is out of range."))
}

pub fn page_count(total: i64, per_page: i64) -> i64 {
    (total + per_page - 1) / per_page.max(1)
}

#[cfg(test)]
mod tests {
    use super::{page_count, page_offset};
    use crate::error::ApiError;

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, 20), 0);
        assert_eq!(page_count(1, 20), 1);
        assert_eq!(page_count(20, 20), 1);
        assert_eq!(page_count(41, 20), 3);
    }

    #[test]
    fn page_offset_skips_whole_pages() {
        assert_eq!(page_offset(1, 20).unwrap(), 0);
        assert_eq!(page_offset(3, 20).unwrap(), 40);
        assert_eq!(page_offset(0, 20).unwrap(), 0);
        assert_eq!(page_offset(-5, 20).unwrap(), 0);
    }

    #[test]
    fn huge_page_numbers_are_rejected_not_wrapped() {
        assert!(matches!(page_offset(i64::MAX, 20), Err(ApiError::Validation(_))));
        assert!(matches!(page_offset(i64::MAX / 10, 20), Err(ApiError::Validation(_))));
        assert_eq!(page_offset(i64::MAX, 1).unwrap(), i64::MAX - 1);
    }
}
