use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::enums::{Priority, QueueStatus, Workflow};
use crate::error::ApiError;
use crate::flow::{self, Queued};
use crate::models::{NewQueueEntry, Patient, PatientSummary, QueueEntry};
use crate::schema::{doctor_queue, patients, users};

/// A queue entry joined with what the doctor needs to see.
#[derive(Debug, Clone, Serialize)]
pub struct QueueRow {
    #[serde(flatten)]
    pub entry: QueueEntry,
    pub patient: PatientSummary,
    pub sent_by_name: String,
    pub minutes_waiting: i64,
}

impl Queued for QueueRow {
    fn priority(&self) -> Priority {
        self.entry.priority
    }

    fn sent_at(&self) -> NaiveDateTime {
        self.entry.sent_at
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub waiting: i64,
    pub in_progress: i64,
    pub completed_today: i64,
}

pub fn find(conn: &mut PgConnection, queue_id: i32) -> QueryResult<Option<QueueEntry>> {
    doctor_queue::table
        .find(queue_id)
        .select(QueueEntry::as_select())
        .first(conn)
        .optional()
}

pub fn active_entry_for(conn: &mut PgConnection, patient_id: i32) -> QueryResult<Option<QueueEntry>> {
    doctor_queue::table
        .filter(doctor_queue::patient_id.eq(patient_id))
        .filter(doctor_queue::status.eq_any(QueueStatus::ACTIVE))
        .select(QueueEntry::as_select())
        .first(conn)
        .optional()
}

/// Routes a patient to the doctor. A patient holds at most one waiting or
/// in-progress entry; a second send is rejected.
pub fn enqueue(
    conn: &mut PgConnection,
    patient_id: i32,
    sent_by: i32,
    priority: Priority,
    notes: &str,
) -> Result<QueueEntry, ApiError> {
    const ALREADY_QUEUED: &str = "Patient is already in the doctor's queue.";

    if active_entry_for(conn, patient_id)?.is_some() {
        return Err(ApiError::Conflict(ALREADY_QUEUED.into()));
    }

    diesel::insert_into(doctor_queue::table)
        .values(&NewQueueEntry {
            patient_id,
            sent_by,
            priority,
            status: QueueStatus::Waiting,
            notes,
        })
        .returning(QueueEntry::as_returning())
        .get_result(conn)
        .map_err(|e| ApiError::on_duplicate(e, ALREADY_QUEUED))
}

/// Waiting and in-progress entries in serving order.
pub fn active_queue(conn: &mut PgConnection) -> QueryResult<Vec<QueueRow>> {
    let now = super::now();
    let rows: Vec<(QueueEntry, Patient, String)> = doctor_queue::table
        .inner_join(patients::table)
        .inner_join(users::table)
        .filter(doctor_queue::status.eq_any(QueueStatus::ACTIVE))
        .order(doctor_queue::id.asc())
        .select((QueueEntry::as_select(), Patient::as_select(), users::full_name))
        .load(conn)?;

    let rows = rows
        .into_iter()
        .map(|(entry, patient, sent_by_name)| QueueRow {
            minutes_waiting: flow::minutes_waiting(entry.sent_at, now),
            entry,
            patient: patient.into(),
            sent_by_name,
        })
        .collect();
    Ok(flow::order_doctor_queue(rows))
}

/// `waiting → in_progress`. Records the clinician and start time. Matches
/// zero rows, and returns `false`, unless the entry sits in the state the
/// transition table allows entering `in_progress` from.
pub fn start_visit(conn: &mut PgConnection, queue_id: i32, clinician_id: i32) -> QueryResult<bool> {
    let to = QueueStatus::InProgress;
    let Some(from) = to.predecessor() else {
        return Ok(false);
    };
    let updated = diesel::update(
        doctor_queue::table
            .filter(doctor_queue::id.eq(queue_id))
            .filter(doctor_queue::status.eq(from)),
    )
    .set((
        doctor_queue::status.eq(to),
        doctor_queue::doctor_id.eq(clinician_id),
        doctor_queue::started_at.eq(super::now()),
    ))
    .execute(conn)?;
    Ok(updated == 1)
}

/// `in_progress → completed`. Records the completion time. Matches zero
/// rows, and returns `false`, unless the entry is currently in progress.
pub fn complete_visit(conn: &mut PgConnection, queue_id: i32) -> QueryResult<bool> {
    let to = QueueStatus::Completed;
    let Some(from) = to.predecessor() else {
        return Ok(false);
    };
    let updated = diesel::update(
        doctor_queue::table
            .filter(doctor_queue::id.eq(queue_id))
            .filter(doctor_queue::status.eq(from)),
    )
    .set((doctor_queue::status.eq(to), doctor_queue::completed_at.eq(super::now())))
    .execute(conn)?;
    Ok(updated == 1)
}

/// Like [`complete_visit`], but only when the entry belongs to `patient_id`.
pub fn complete_visit_for(conn: &mut PgConnection, queue_id: i32, patient_id: i32) -> QueryResult<bool> {
    let to = QueueStatus::Completed;
    let Some(from) = to.predecessor() else {
        return Ok(false);
    };
    let updated = diesel::update(
        doctor_queue::table
            .filter(doctor_queue::id.eq(queue_id))
            .filter(doctor_queue::patient_id.eq(patient_id))
            .filter(doctor_queue::status.eq(from)),
    )
    .set((doctor_queue::status.eq(to), doctor_queue::completed_at.eq(super::now())))
    .execute(conn)?;
    Ok(updated == 1)
}

pub fn counts(conn: &mut PgConnection) -> QueryResult<QueueCounts> {
    let waiting = doctor_queue::table
        .filter(doctor_queue::status.eq(QueueStatus::Waiting))
        .count()
        .get_result(conn)?;
    let in_progress = doctor_queue::table
        .filter(doctor_queue::status.eq(QueueStatus::InProgress))
        .count()
        .get_result(conn)?;
    let completed_today = doctor_queue::table
        .filter(doctor_queue::status.eq(QueueStatus::Completed))
        .filter(doctor_queue::completed_at.ge(super::start_of_today()))
        .count()
        .get_result(conn)?;
    Ok(QueueCounts { waiting, in_progress, completed_today })
}
