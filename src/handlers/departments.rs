use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use crate::auth::{Capability, RequestContext};
use crate::enums::{Department, ReferralStatus};
use crate::error::ApiError;
use crate::store::referrals::{ReferralCounts, ReferralRow};
use crate::{DbPool, db, store};

use super::{choice, outcome};

#[derive(Debug, Deserialize)]
pub struct TransitionForm {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
struct Worklist {
    department: Department,
    referrals: Vec<ReferralRow>,
    counts: ReferralCounts,
}

fn department(name: &str) -> Result<Department, ApiError> {
    name.parse().map_err(|_| ApiError::NotFound("department"))
}

// Handler to show one department's referrals in worklist order
pub async fn worklist(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let department = department(&path)?;
    ctx.authorize(Capability::WorkDepartment(department))?;

    let (referrals, counts) = db::run(&pool, move |conn| {
        let referrals = store::referrals::worklist(conn, department)?;
        let counts = store::referrals::counts(conn, department)?;
        Ok((referrals, counts))
    })
    .await?;

    Ok(HttpResponse::Ok().json(Worklist { department, referrals, counts }))
}

// Handler to move a referral to its next status
pub async fn transition(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    path: web::Path<(String, i32)>,
    form: web::Form<TransitionForm>,
) -> Result<HttpResponse, ApiError> {
    let (name, referral_id) = path.into_inner();
    let department = department(&name)?;
    ctx.authorize(Capability::WorkDepartment(department))?;
    let to = choice::<ReferralStatus>(form.status.as_deref(), "Invalid status.")?;

    let moved = db::run(&pool, move |conn| {
        Ok(store::referrals::transition(conn, department, referral_id, to)?)
    })
    .await?;

    if moved {
        tracing::info!(referral_id, %department, status = %to, by = ctx.user_id, "referral status changed");
        Ok(outcome(true, format!("Referral marked {}.", to)))
    } else {
        tracing::warn!(referral_id, %department, status = %to, by = ctx.user_id, "referral transition rejected");
        Ok(outcome(false, "Could not update referral."))
    }
}
