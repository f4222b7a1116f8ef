use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::enums::{
    Department, PatientStatus, Priority, QueueStatus, ReferralStatus, RequestStatus, Role, Sex,
    VisitType,
};
use crate::schema::{
    department_referrals, doctor_queue, lab_requests, patients, sessions, ultrasound_reports,
    users, visits,
};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub full_name: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub full_name: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = sessions)]
pub struct NewSession<'a> {
    pub token: &'a str,
    pub user_id: i32,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = patients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Patient {
    pub id: i32,
    pub full_name: String,
    pub sex: Sex,
    pub phone: String,
    pub card_number: String,
    pub status: PatientStatus,
    pub date_registered: NaiveDateTime,
    pub first_visit_date: Option<NaiveDate>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = patients)]
pub struct NewPatient<'a> {
    pub full_name: &'a str,
    pub sex: Sex,
    pub phone: &'a str,
    pub card_number: &'a str,
    pub status: PatientStatus,
    pub date_registered: NaiveDateTime,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = patients)]
pub struct PatientChanges<'a> {
    pub full_name: &'a str,
    pub sex: Sex,
    pub phone: &'a str,
    pub card_number: &'a str,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = visits)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Visit {
    pub id: i32,
    pub patient_id: i32,
    pub clinician_id: i32,
    pub visit_type: VisitType,
    pub symptoms: String,
    pub diagnosis: String,
    pub prescription: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = visits)]
pub struct NewVisit<'a> {
    pub patient_id: i32,
    pub clinician_id: i32,
    pub visit_type: VisitType,
    pub symptoms: &'a str,
    pub diagnosis: &'a str,
    pub prescription: &'a str,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = visits)]
pub struct VisitChanges<'a> {
    pub patient_id: i32,
    pub visit_type: VisitType,
    pub symptoms: &'a str,
    pub diagnosis: &'a str,
    pub prescription: &'a str,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = doctor_queue)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct QueueEntry {
    pub id: i32,
    pub patient_id: i32,
    pub sent_by: i32,
    pub doctor_id: Option<i32>,
    pub priority: Priority,
    pub status: QueueStatus,
    pub notes: String,
    pub sent_at: NaiveDateTime,
    pub started_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = doctor_queue)]
pub struct NewQueueEntry<'a> {
    pub patient_id: i32,
    pub sent_by: i32,
    pub priority: Priority,
    pub status: QueueStatus,
    pub notes: &'a str,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = department_referrals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DepartmentReferral {
    pub id: i32,
    pub patient_id: i32,
    pub visit_id: i32,
    pub from_doctor_id: i32,
    pub to_department: Department,
    pub status: ReferralStatus,
    pub notes: String,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = department_referrals)]
pub struct NewReferral<'a> {
    pub patient_id: i32,
    pub visit_id: i32,
    pub from_doctor_id: i32,
    pub to_department: Department,
    pub status: ReferralStatus,
    pub notes: &'a str,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = lab_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LabRequest {
    pub id: i32,
    pub patient_id: i32,
    pub doctor_id: i32,
    pub technician_id: Option<i32>,
    pub tests_requested: String,
    pub notes: String,
    pub result_text: Option<String>,
    pub status: RequestStatus,
    pub date_requested: NaiveDateTime,
    pub date_completed: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = lab_requests)]
pub struct NewLabRequest<'a> {
    pub patient_id: i32,
    pub doctor_id: i32,
    pub tests_requested: &'a str,
    pub notes: &'a str,
    pub status: RequestStatus,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = ultrasound_reports)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UltrasoundReport {
    pub id: i32,
    pub patient_id: i32,
    pub requested_by: i32,
    pub technician_id: Option<i32>,
    pub ultrasound_type: String,
    pub notes: String,
    pub report_text: Option<String>,
    pub status: RequestStatus,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = ultrasound_reports)]
pub struct NewUltrasoundReport<'a> {
    pub patient_id: i32,
    pub requested_by: i32,
    pub ultrasound_type: &'a str,
    pub notes: &'a str,
    pub status: RequestStatus,
}

/// Patient columns shown next to queue entries, referrals and requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientSummary {
    pub id: i32,
    pub full_name: String,
    pub card_number: String,
    pub sex: Sex,
    pub phone: String,
    pub status: PatientStatus,
}

impl From<Patient> for PatientSummary {
    fn from(patient: Patient) -> Self {
        PatientSummary {
            id: patient.id,
            full_name: patient.full_name,
            card_number: patient.card_number,
            sex: patient.sex,
            phone: patient.phone,
            status: patient.status,
        }
    }
}

/// What a client is allowed to see of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i32,
    pub full_name: String,
    pub username: String,
    pub role: Role,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        UserSummary {
            id: user.id,
            full_name: user.full_name,
            username: user.username,
            role: user.role,
        }
    }
}
