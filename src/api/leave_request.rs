use crate::api::logged;
use crate::auth::auth::AuthUser;
use crate::model::leave_request::LeaveRequest;
use crate::workflow::ApprovalWorkflow;
use crate::workflow::controller::LeaveApplication;
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ApprovalNote {
    #[schema(example = "Enjoy your time off")]
    /// Comment stored on the approval row
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Rejection {
    #[schema(example = "Quarter close, please move a week later")]
    pub reason: Option<String>,
}

/// Requester, HR/admin, or anyone on the request's approval chain.
async fn require_viewer(
    workflow: &ApprovalWorkflow,
    auth: &AuthUser,
    request: &LeaveRequest,
) -> actix_web::Result<()> {
    if auth.is_hr_or_admin() || auth.employee_id == Some(request.employee_id) {
        return Ok(());
    }
    let Some(me) = auth.employee_id else {
        return Err(actix_web::error::ErrorForbidden("No employee profile"));
    };
    let rows = workflow
        .approval_history(request.id)
        .await
        .map_err(|e| logged("approval history", request.id, e))?;
    if rows
        .iter()
        .any(|r| r.approver_id == me || r.original_approver_id == Some(me))
    {
        Ok(())
    } else {
        Err(actix_web::error::ErrorForbidden("Not a party to this leave request"))
    }
}

/* =========================
Submit leave request
========================= */
/// Swagger doc for submit_leave endpoint
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = LeaveApplication,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request recorded and routed", body = crate::workflow::controller::PlanSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found or inactive"),
        (status = 409, description = "Invalid date range", body = Object, example = json!({
            "message": "start_date cannot be after end_date"
        })),
        (status = 422, description = "Nobody can approve this request", body = Object, example = json!({
            "message": "no approver can be assigned to leave requests of employee 1000"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn submit_leave(
    auth: AuthUser,
    workflow: web::Data<ApprovalWorkflow>,
    payload: web::Json<LeaveApplication>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee()?;

    let summary = workflow
        .submit(employee_id, &payload, Utc::now())
        .await
        .map_err(|e| logged("submit leave", employee_id, e))?;

    info!(
        leave_request_id = summary.leave_request_id,
        employee_id,
        auto_approved = summary.auto_approved,
        "Leave request submitted"
    );
    Ok(HttpResponse::Created().json(summary))
}

/* =========================
Initialize workflow (HR/Admin)
========================= */
/// Runs auto-approval or plan building for a request recorded without one.
#[utoipa::path(
    post,
    path = "/api/leave/{leave_id}/initialize",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to route")
    ),
    responses(
        (status = 200, description = "Workflow initialized", body = crate::workflow::controller::PlanSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Already initialized or no longer pending"),
        (status = 422, description = "Nobody can approve this request")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn initialize_leave(
    auth: AuthUser,
    workflow: web::Data<ApprovalWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    if !auth.is_hr_or_admin() {
        return Err(actix_web::error::ErrorForbidden("HR/Admin only"));
    }
    let leave_id = path.into_inner();

    let summary = workflow
        .initialize(leave_id, Utc::now())
        .await
        .map_err(|e| logged("initialize leave", leave_id, e))?;

    Ok(HttpResponse::Ok().json(summary))
}

/* =========================
Approve leave (current approver or delegatee)
========================= */
/// Swagger doc for approve_leave endpoint
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    request_body(
        content = ApprovalNote,
        description = "Optional approval note",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Level approved", body = crate::workflow::controller::ApprovalOutcome, example = json!({
            "outcome": "forwarded",
            "leave_request_id": 1,
            "approved_level": 1,
            "next_level": 2,
            "next_approver_id": 20
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not the current approver or a delegatee"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already processed", body = Object, example = json!({
            "message": "leave request 1 is already approved"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    workflow: web::Data<ApprovalWorkflow>,
    path: web::Path<u64>,
    payload: Option<web::Json<ApprovalNote>>,
) -> actix_web::Result<impl Responder> {
    let actor_id = auth.employee()?;
    let leave_id = path.into_inner();
    let notes = payload.and_then(|p| p.into_inner().notes);

    let outcome = workflow
        .approve(leave_id, actor_id, notes, Utc::now())
        .await
        .map_err(|e| logged("approve leave", leave_id, e))?;

    Ok(HttpResponse::Ok().json(outcome))
}

/* =========================
Reject leave (current approver or delegatee)
========================= */
/// Swagger doc for reject_leave endpoint
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    request_body(
        content = Rejection,
        description = "Optional rejection reason",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not the current approver or a delegatee"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already processed")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    workflow: web::Data<ApprovalWorkflow>,
    path: web::Path<u64>,
    payload: Option<web::Json<Rejection>>,
) -> actix_web::Result<impl Responder> {
    let actor_id = auth.employee()?;
    let leave_id = path.into_inner();
    let reason = payload.and_then(|p| p.into_inner().reason);

    let request = workflow
        .reject(leave_id, actor_id, reason, Utc::now())
        .await
        .map_err(|e| logged("reject leave", leave_id, e))?;

    Ok(HttpResponse::Ok().json(request))
}

/// Requester withdraws a pending leave, or an approved one that has not started.
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to cancel")
    ),
    responses(
        (status = 200, description = "Leave cancelled", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the requester can cancel"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave can no longer be cancelled")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    workflow: web::Data<ApprovalWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let actor_id = auth.employee()?;
    let leave_id = path.into_inner();

    let request = workflow
        .cancel(leave_id, actor_id, Utc::now())
        .await
        .map_err(|e| logged("cancel leave", leave_id, e))?;

    Ok(HttpResponse::Ok().json(request))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "leave request 1 not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    workflow: web::Data<ApprovalWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let request = workflow
        .leave_request(leave_id)
        .await
        .map_err(|e| logged("get leave", leave_id, e))?;
    require_viewer(&workflow, &auth, &request).await?;

    Ok(HttpResponse::Ok().json(request))
}

/// Approval rows of one request, lowest level first.
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}/approvals",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request")
    ),
    responses(
        (status = 200, description = "Approval history", body = [crate::model::leave_approval::LeaveApproval]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approval_history(
    auth: AuthUser,
    workflow: web::Data<ApprovalWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let request = workflow
        .leave_request(leave_id)
        .await
        .map_err(|e| logged("approval history", leave_id, e))?;
    require_viewer(&workflow, &auth, &request).await?;

    let rows = workflow
        .approval_history(leave_id)
        .await
        .map_err(|e| logged("approval history", leave_id, e))?;

    Ok(HttpResponse::Ok().json(rows))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    use crate::auth::jwt::testing::employee;
    use crate::workflow::testing::Fixture;

    #[actix_web::test]
    async fn submit_and_approve_over_http() {
        let fx = Fixture::standard().await;
        let app = test_service!(fx);

        let req = test::TestRequest::post()
            .uri("/api/leave")
            .insert_header(employee(40))
            .set_json(json!({
                "start_date": "2030-01-07",
                "end_date": "2030-01-18",
                "leave_type": "annual",
                "reason": "Family visit"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let summary: Value = test::read_body_json(resp).await;
        assert_eq!(summary["total_approval_levels"], 2);
        assert_eq!(summary["current_approver_id"], 30);
        let id = summary["leave_request_id"].as_u64().unwrap();

        let req = test::TestRequest::put()
            .uri(&format!("/api/leave/{id}/approve"))
            .insert_header(employee(31))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::put()
            .uri(&format!("/api/leave/{id}/approve"))
            .insert_header(employee(30))
            .set_json(json!({ "notes": "fine by me" }))
            .to_request();
        let outcome: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(outcome["outcome"], "forwarded");
        assert_eq!(outcome["next_approver_id"], 20);

        let req = test::TestRequest::get()
            .uri(&format!("/api/leave/{id}/approvals"))
            .insert_header(employee(20))
            .to_request();
        let rows: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(rows[0]["status"], "approved");
        assert_eq!(rows[1]["status"], "pending");

        // a colleague outside the chain cannot look
        let req = test::TestRequest::get()
            .uri(&format!("/api/leave/{id}"))
            .insert_header(employee(41))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn missing_token_and_unknown_leave() {
        let fx = Fixture::standard().await;
        let app = test_service!(fx);

        let req = test::TestRequest::get().uri("/api/leave/1").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/api/leave/404")
            .insert_header(employee(40))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "leave request 404 not found");
    }
}
