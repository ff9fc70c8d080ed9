use crate::api::logged;
use crate::auth::auth::AuthUser;
use crate::model::delegation::{ApprovalDelegation, DelegationPatch, DelegationType, NewDelegation};
use crate::workflow::ApprovalWorkflow;
use crate::workflow::delegation::OverlapQuery;
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct CurrentQuery {
    /// Approval type, e.g. `leave_approval`
    #[param(value_type = String)]
    pub delegation_type: DelegationType,
}

/// Only HR/admin or the delegator may touch an existing grant.
async fn owned_delegation(
    workflow: &ApprovalWorkflow,
    auth: &AuthUser,
    id: u64,
) -> actix_web::Result<ApprovalDelegation> {
    let delegation = workflow
        .delegation(id)
        .await
        .map_err(|e| logged("get delegation", id, e))?;
    auth.require_self_or_hr(delegation.delegator_id)?;
    Ok(delegation)
}

/* =========================
Create delegation
========================= */
#[utoipa::path(
    post,
    path = "/api/delegations",
    request_body(
        content = NewDelegation,
        description = "Delegation payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Delegation created", body = ApprovalDelegation),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Delegator or delegatee not found"),
        (status = 409, description = "Invalid or overlapping delegation", body = Object, example = json!({
            "message": "delegation 5 already covers an overlapping period"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Delegation"
)]
pub async fn create_delegation(
    auth: AuthUser,
    workflow: web::Data<ApprovalWorkflow>,
    payload: web::Json<NewDelegation>,
) -> actix_web::Result<impl Responder> {
    auth.require_self_or_hr(payload.delegator_id)?;

    let delegation = workflow
        .create_delegation(&payload, auth.employee_id, Utc::now())
        .await
        .map_err(|e| logged("create delegation", payload.delegator_id, e))?;

    info!(
        delegation_id = delegation.id,
        created_by = ?auth.employee_id,
        user_id = auth.user_id,
        username = %auth.username,
        "Delegation created via API"
    );
    Ok(HttpResponse::Created().json(delegation))
}

#[utoipa::path(
    get,
    path = "/api/delegations/{delegation_id}",
    params(
        ("delegation_id" = u64, Path, description = "ID of the delegation")
    ),
    responses(
        (status = 200, description = "Delegation found", body = ApprovalDelegation),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Delegation not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Delegation"
)]
pub async fn get_delegation(
    auth: AuthUser,
    workflow: web::Data<ApprovalWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();

    let delegation = workflow
        .delegation(id)
        .await
        .map_err(|e| logged("get delegation", id, e))?;
    if auth.require_self_or_hr(delegation.delegator_id).is_err() {
        auth.require_self_or_hr(delegation.delegatee_id)?;
    }

    Ok(HttpResponse::Ok().json(delegation))
}

#[utoipa::path(
    put,
    path = "/api/delegations/{delegation_id}",
    params(
        ("delegation_id" = u64, Path, description = "ID of the delegation to edit")
    ),
    request_body(
        content = DelegationPatch,
        description = "Fields to change",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Delegation updated", body = ApprovalDelegation),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Delegation not found"),
        (status = 409, description = "Inactive, invalid or overlapping after the edit")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Delegation"
)]
pub async fn update_delegation(
    auth: AuthUser,
    workflow: web::Data<ApprovalWorkflow>,
    path: web::Path<u64>,
    payload: web::Json<DelegationPatch>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();
    owned_delegation(&workflow, &auth, id).await?;

    let delegation = workflow
        .update_delegation(id, &payload, Utc::now())
        .await
        .map_err(|e| logged("update delegation", id, e))?;

    Ok(HttpResponse::Ok().json(delegation))
}

#[utoipa::path(
    put,
    path = "/api/delegations/{delegation_id}/deactivate",
    params(
        ("delegation_id" = u64, Path, description = "ID of the delegation to revoke")
    ),
    responses(
        (status = 200, description = "Delegation deactivated", body = ApprovalDelegation),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Delegation not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Delegation"
)]
pub async fn deactivate_delegation(
    auth: AuthUser,
    workflow: web::Data<ApprovalWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();
    owned_delegation(&workflow, &auth, id).await?;

    let delegation = workflow
        .deactivate_delegation(id, Utc::now())
        .await
        .map_err(|e| logged("deactivate delegation", id, e))?;

    Ok(HttpResponse::Ok().json(delegation))
}

#[utoipa::path(
    get,
    path = "/api/delegations/overlapping",
    params(OverlapQuery),
    responses(
        (status = 200, description = "Active delegations meeting the window", body = [ApprovalDelegation]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Delegation"
)]
pub async fn overlapping_delegations(
    auth: AuthUser,
    workflow: web::Data<ApprovalWorkflow>,
    query: web::Query<OverlapQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_self_or_hr(query.delegator_id)?;

    let found = workflow
        .overlapping_delegations(&query)
        .await
        .map_err(|e| logged("overlapping delegations", query.delegator_id, e))?;

    Ok(HttpResponse::Ok().json(found))
}

/// Grants given by an employee that have not ended yet.
#[utoipa::path(
    get,
    path = "/api/delegations/delegator/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Delegating employee")
    ),
    responses(
        (status = 200, description = "Current and upcoming delegations", body = [ApprovalDelegation]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Delegation"
)]
pub async fn delegations_given(
    auth: AuthUser,
    workflow: web::Data<ApprovalWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    auth.require_self_or_hr(employee_id)?;

    let found = workflow
        .active_delegations_for_delegator(employee_id, Utc::now())
        .await
        .map_err(|e| logged("delegations given", employee_id, e))?;

    Ok(HttpResponse::Ok().json(found))
}

/// Grants held by an employee that have not ended yet.
#[utoipa::path(
    get,
    path = "/api/delegations/delegatee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Receiving employee")
    ),
    responses(
        (status = 200, description = "Current and upcoming delegations", body = [ApprovalDelegation]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Delegation"
)]
pub async fn delegations_held(
    auth: AuthUser,
    workflow: web::Data<ApprovalWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    auth.require_self_or_hr(employee_id)?;

    let found = workflow
        .active_delegations_for_delegatee(employee_id, Utc::now())
        .await
        .map_err(|e| logged("delegations held", employee_id, e))?;

    Ok(HttpResponse::Ok().json(found))
}

/// Who is covering for an employee today.
#[utoipa::path(
    get,
    path = "/api/delegations/delegator/{employee_id}/current",
    params(
        ("employee_id" = u64, Path, description = "Delegating employee"),
        CurrentQuery
    ),
    responses(
        (status = 200, description = "Delegation in force today", body = ApprovalDelegation),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Nobody is covering", body = Object, example = json!({
            "message": "No active delegation"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Delegation"
)]
pub async fn current_delegation(
    auth: AuthUser,
    workflow: web::Data<ApprovalWorkflow>,
    path: web::Path<u64>,
    query: web::Query<CurrentQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    auth.require_self_or_hr(employee_id)?;

    let found = workflow
        .current_delegation(employee_id, query.delegation_type, Utc::now())
        .await
        .map_err(|e| logged("current delegation", employee_id, e))?;

    match found {
        Some(delegation) => Ok(HttpResponse::Ok().json(delegation)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "No active delegation"
        }))),
    }
}
