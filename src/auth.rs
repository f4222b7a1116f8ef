//! Request identity and role gating.
//!
//! Every authenticated handler takes a [`RequestContext`], which is resolved
//! once per request from the session cookie. Handlers then name the
//! [`Capability`] they exercise and the context checks it against the
//! capability's role set.

use std::fmt;

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest, web};
use anyhow::anyhow;
use futures::future::{FutureExt, LocalBoxFuture};
use serde::Serialize;

use crate::DbPool;
use crate::db;
use crate::enums::{Department, Role};
use crate::error::ApiError;
use crate::models::User;
use crate::store;

pub const SESSION_COOKIE: &str = "emr_session";

const EVERYONE: &[Role] = &[
    Role::Doctor,
    Role::Lab,
    Role::Ultrasound,
    Role::Receptionist,
    Role::Emergency,
    Role::Admin,
];
const FRONT_DESK: &[Role] = &[Role::Receptionist, Role::Admin];
const CLINICIANS: &[Role] = &[Role::Doctor, Role::Admin];
const LAB: &[Role] = &[Role::Lab, Role::Admin];
const ULTRASOUND: &[Role] = &[Role::Ultrasound, Role::Admin];
const EMERGENCY: &[Role] = &[Role::Emergency, Role::Admin];
const ADMIN: &[Role] = &[Role::Admin];

/// Something a handler does on behalf of the logged-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewDashboard,
    ViewPatients,
    RegisterPatients,
    ManagePatients,
    SendToDoctor,
    ViewDoctorQueue,
    RunDoctorQueue,
    RecordVisits,
    RequestTests,
    WorkDepartment(Department),
    RecordLabResults,
    RecordUltrasoundReports,
    Administer,
}

impl Capability {
    pub fn roles(self) -> &'static [Role] {
        match self {
            Capability::ViewDashboard | Capability::ViewPatients => EVERYONE,
            Capability::RegisterPatients | Capability::ManagePatients | Capability::SendToDoctor => {
                FRONT_DESK
            }
            Capability::ViewDoctorQueue
            | Capability::RunDoctorQueue
            | Capability::RecordVisits
            | Capability::RequestTests => CLINICIANS,
            Capability::WorkDepartment(Department::Lab) | Capability::RecordLabResults => LAB,
            Capability::WorkDepartment(Department::Ultrasound) | Capability::RecordUltrasoundReports => {
                ULTRASOUND
            }
            Capability::WorkDepartment(Department::Emergency) => EMERGENCY,
            Capability::Administer => ADMIN,
        }
    }

    pub fn permits(self, role: Role) -> bool {
        self.roles().contains(&role)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::ViewDashboard => f.write_str("view the dashboard"),
            Capability::ViewPatients => f.write_str("view patients"),
            Capability::RegisterPatients => f.write_str("register patients"),
            Capability::ManagePatients => f.write_str("manage patient records"),
            Capability::SendToDoctor => f.write_str("send patients to the doctor"),
            Capability::ViewDoctorQueue => f.write_str("view the doctor's queue"),
            Capability::RunDoctorQueue => f.write_str("start or complete visits"),
            Capability::RecordVisits => f.write_str("record visits"),
            Capability::RequestTests => f.write_str("request lab tests or ultrasounds"),
            Capability::WorkDepartment(dept) => write!(f, "work the {} referral list", dept),
            Capability::RecordLabResults => f.write_str("record lab results"),
            Capability::RecordUltrasoundReports => f.write_str("record ultrasound reports"),
            Capability::Administer => f.write_str("administer the system"),
        }
    }
}

/// Identity of the user behind the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    pub user_id: i32,
    pub full_name: String,
    pub role: Role,
}

impl RequestContext {
    pub fn authorize(&self, capability: Capability) -> Result<(), ApiError> {
        if capability.permits(self.role) {
            Ok(())
        } else {
            tracing::warn!(user_id = self.user_id, role = %self.role, %capability, "permission denied");
            Err(ApiError::Forbidden { role: self.role, capability })
        }
    }
}

impl From<User> for RequestContext {
    fn from(user: User) -> Self {
        RequestContext {
            user_id: user.id,
            full_name: user.full_name,
            role: user.role,
        }
    }
}

impl FromRequest for RequestContext {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = req.cookie(SESSION_COOKIE).map(|c| c.value().to_owned());
        let pool = req.app_data::<web::Data<DbPool>>().cloned();

        async move {
            let token = token.ok_or(ApiError::Unauthenticated)?;
            let pool = pool.ok_or_else(|| ApiError::Internal(anyhow!("database pool is not configured")))?;
            let user = db::run(&pool, move |conn| Ok(store::users::find_by_session(conn, &token)?)).await?;
            user.map(RequestContext::from).ok_or(ApiError::Unauthenticated)
        }
        .boxed_local()
    }
}
