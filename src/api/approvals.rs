use crate::api::logged;
use crate::auth::auth::AuthUser;
use crate::workflow::ApprovalWorkflow;
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ApproverQuery {
    /// Approver to inspect; HR/admin only. Defaults to the caller.
    pub approver_id: Option<u64>,
}

impl ApproverQuery {
    fn resolve(&self, auth: &AuthUser) -> actix_web::Result<u64> {
        match self.approver_id {
            Some(id) => {
                auth.require_self_or_hr(id)?;
                Ok(id)
            }
            None => auth.employee(),
        }
    }
}

/// Approval rows waiting on the caller, including those of colleagues who
/// delegated leave approval to them.
#[utoipa::path(
    get,
    path = "/api/approvals/pending",
    params(ApproverQuery),
    responses(
        (status = 200, description = "Actionable approvals", body = [crate::workflow::controller::PendingApproval]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Approvals"
)]
pub async fn pending_approvals(
    auth: AuthUser,
    workflow: web::Data<ApprovalWorkflow>,
    query: web::Query<ApproverQuery>,
) -> actix_web::Result<impl Responder> {
    let approver_id = query.resolve(&auth)?;

    let pending = workflow
        .pending_approvals(approver_id, Utc::now())
        .await
        .map_err(|e| logged("pending approvals", approver_id, e))?;

    Ok(HttpResponse::Ok().json(pending))
}

#[utoipa::path(
    get,
    path = "/api/approvals/activity/today",
    params(ApproverQuery),
    responses(
        (status = 200, description = "Decisions taken today", body = crate::workflow::controller::ApprovalActivity),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Approvals"
)]
pub async fn todays_activity(
    auth: AuthUser,
    workflow: web::Data<ApprovalWorkflow>,
    query: web::Query<ApproverQuery>,
) -> actix_web::Result<impl Responder> {
    let approver_id = query.resolve(&auth)?;

    let activity = workflow
        .daily_approval_activity(approver_id, Utc::now())
        .await
        .map_err(|e| logged("approval activity", approver_id, e))?;

    Ok(HttpResponse::Ok().json(activity))
}
