use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::enums::{Department, ReferralStatus, VisitType, Workflow};
use crate::error::ApiError;
use crate::flow::{self, Referred};
use crate::models::{DepartmentReferral, NewReferral, Patient, PatientSummary, Visit};
use crate::schema::{department_referrals, patients, users, visits};

#[derive(Debug, Clone, Serialize)]
pub struct ReferralRow {
    #[serde(flatten)]
    pub referral: DepartmentReferral,
    pub patient: PatientSummary,
    pub visit_type: VisitType,
    pub symptoms: String,
    pub diagnosis: String,
    pub doctor_name: String,
}

impl Referred for ReferralRow {
    fn referral_status(&self) -> ReferralStatus {
        self.referral.status
    }

    fn referred_at(&self) -> NaiveDateTime {
        self.referral.created_at
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReferralCounts {
    pub pending: i64,
    pub in_progress: i64,
    pub completed_today: i64,
}

/// Refers the patient seen in `visit_id` to `department`.
pub fn create(
    conn: &mut PgConnection,
    visit_id: i32,
    from_doctor_id: i32,
    department: Department,
    notes: &str,
) -> Result<DepartmentReferral, ApiError> {
    let patient_id: i32 = visits::table
        .find(visit_id)
        .select(visits::patient_id)
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound("visit"))?;

    let default_notes;
    let notes = if notes.trim().is_empty() {
        default_notes = format!("Referred from visit #{}", visit_id);
        default_notes.as_str()
    } else {
        notes
    };

    Ok(diesel::insert_into(department_referrals::table)
        .values(&NewReferral {
            patient_id,
            visit_id,
            from_doctor_id,
            to_department: department,
            status: ReferralStatus::Pending,
            notes,
        })
        .returning(DepartmentReferral::as_returning())
        .get_result(conn)?)
}

pub fn for_visit(conn: &mut PgConnection, visit_id: i32) -> QueryResult<Vec<DepartmentReferral>> {
    department_referrals::table
        .filter(department_referrals::visit_id.eq(visit_id))
        .order(department_referrals::id.asc())
        .select(DepartmentReferral::as_select())
        .load(conn)
}

/// A department's referrals in worklist order.
pub fn worklist(conn: &mut PgConnection, department: Department) -> QueryResult<Vec<ReferralRow>> {
    let rows: Vec<(DepartmentReferral, Patient, Visit, String)> = department_referrals::table
        .inner_join(patients::table)
        .inner_join(visits::table)
        .inner_join(users::table)
        .filter(department_referrals::to_department.eq(department))
        .order(department_referrals::id.asc())
        .select((
            DepartmentReferral::as_select(),
            Patient::as_select(),
            Visit::as_select(),
            users::full_name,
        ))
        .load(conn)?;

    let rows = rows
        .into_iter()
        .map(|(referral, patient, visit, doctor_name)| ReferralRow {
            referral,
            patient: patient.into(),
            visit_type: visit.visit_type,
            symptoms: visit.symptoms,
            diagnosis: visit.diagnosis,
            doctor_name,
        })
        .collect();
    Ok(flow::order_referrals(rows))
}

/// Moves a referral one step forward within `department`. The update only
/// matches when the row belongs to that department and currently sits in
/// the state that precedes `to`; anything else returns `false`.
pub fn transition(
    conn: &mut PgConnection,
    department: Department,
    referral_id: i32,
    to: ReferralStatus,
) -> QueryResult<bool> {
    let Some(from) = to.predecessor() else {
        return Ok(false);
    };
    let completed_at = (to == ReferralStatus::Completed).then(super::now);

    let updated = diesel::update(
        department_referrals::table
            .filter(department_referrals::id.eq(referral_id))
            .filter(department_referrals::to_department.eq(department))
            .filter(department_referrals::status.eq(from)),
    )
    .set((
        department_referrals::status.eq(to),
        department_referrals::completed_at.eq(completed_at),
    ))
    .execute(conn)?;
    Ok(updated == 1)
}

pub fn counts(conn: &mut PgConnection, department: Department) -> QueryResult<ReferralCounts> {
    let pending = department_referrals::table
        .filter(department_referrals::to_department.eq(department))
        .filter(department_referrals::status.eq(ReferralStatus::Pending))
        .count()
        .get_result(conn)?;
    let in_progress = department_referrals::table
        .filter(department_referrals::to_department.eq(department))
        .filter(department_referrals::status.eq(ReferralStatus::InProgress))
        .count()
        .get_result(conn)?;
    let completed_today = department_referrals::table
        .filter(department_referrals::to_department.eq(department))
        .filter(department_referrals::status.eq(ReferralStatus::Completed))
        .filter(department_referrals::completed_at.ge(super::start_of_today()))
        .count()
        .get_result(conn)?;
    Ok(ReferralCounts { pending, in_progress, completed_today })
}
