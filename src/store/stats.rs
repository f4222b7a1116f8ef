use diesel::prelude::*;
use serde::Serialize;

use crate::enums::{Department, PatientStatus, Role};
use crate::schema::patients;

use super::queue::QueueCounts;
use super::referrals::ReferralCounts;
use super::requests::RequestCounts;
use super::visits::{VisitFilter, VisitRow};

#[derive(Debug, Clone, Default, Serialize)]
pub struct Dashboard {
    pub total_patients: i64,
    pub active_patients: i64,
    pub waiting_patients: i64,
    pub today_visits: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<QueueCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrals: Option<ReferralCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lab_requests: Option<RequestCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ultrasound_requests: Option<RequestCounts>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    #[serde(flatten)]
    pub overview: Dashboard,
    pub pending_lab_requests: i64,
    pub users: i64,
    pub recent_visits: Vec<VisitRow>,
}

const RECENT_VISITS: i64 = 5;

/// Clinic-wide totals plus the counts relevant to `role`'s own work.
pub fn dashboard(conn: &mut PgConnection, role: Role, user_id: i32) -> QueryResult<Dashboard> {
    let total_patients = patients::table.count().get_result(conn)?;
    let active_patients = patients::table
        .filter(patients::status.eq(PatientStatus::Active))
        .count()
        .get_result(conn)?;

    let mut dashboard = Dashboard {
        total_patients,
        active_patients,
        waiting_patients: super::patients::waiting_count(conn)?,
        today_visits: super::visits::count_today(conn)?,
        ..Dashboard::default()
    };

    match role {
        Role::Doctor => {
            dashboard.queue = Some(super::queue::counts(conn)?);
            dashboard.lab_requests = Some(super::requests::lab_counts(conn, Some(user_id))?);
            dashboard.ultrasound_requests = Some(super::requests::ultrasound_counts(conn, Some(user_id))?);
        }
        Role::Receptionist | Role::Admin => {
            dashboard.queue = Some(super::queue::counts(conn)?);
        }
        Role::Lab => {
            dashboard.referrals = Some(super::referrals::counts(conn, Department::Lab)?);
            dashboard.lab_requests = Some(super::requests::lab_counts(conn, None)?);
        }
        Role::Ultrasound => {
            dashboard.referrals = Some(super::referrals::counts(conn, Department::Ultrasound)?);
            dashboard.ultrasound_requests = Some(super::requests::ultrasound_counts(conn, None)?);
        }
        Role::Emergency => {
            dashboard.referrals = Some(super::referrals::counts(conn, Department::Emergency)?);
        }
    }
    Ok(dashboard)
}

pub fn admin_dashboard(conn: &mut PgConnection, user_id: i32) -> QueryResult<AdminDashboard> {
    let overview = dashboard(conn, Role::Admin, user_id)?;
    let pending_lab_requests = super::requests::lab_counts(conn, None)?.pending;
    let users = super::users::count(conn)?;
    let recent_visits = super::visits::list(
        conn,
        &VisitFilter {
            limit: Some(RECENT_VISITS),
            ..VisitFilter::default()
        },
    )?;
    Ok(AdminDashboard {
        overview,
        pending_lab_requests,
        users,
        recent_visits,
    })
}
