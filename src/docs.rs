use crate::api::leave_request::{ApprovalNote, Rejection};
use crate::model::delegation::{ApprovalDelegation, DelegationPatch, DelegationType, NewDelegation};
use crate::model::leave_approval::{ApprovalStatus, LeaveApproval};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::workflow::controller::{
    ApprovalActivity, ApprovalOutcome, LeaveApplication, PendingApproval, PlanSummary,
};
use crate::workflow::plan::{ApproverSource, PlannedLevel};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Approval API",
        version = "1.0.0",
        description = r#"
## Multi-level Leave Approval

Routes leave requests through the requester's reporting chain, padded from the branch
approver pool when the chain is short.

### Key Features
- **Submission**
  - Business-day counting, auto-approval for short leave and top-tier staff
- **Approval chain**
  - One approver per level, approve or reject in order, full approval on the final level
- **Delegation**
  - Time-bounded hand-over of approval authority, single-use or capped

### Security
Every endpoint requires a **JWT Bearer** token carrying the caller's `employee_id`.
HR and admins may act on delegations and queues of other employees.

### Response Format
- JSON bodies, errors as `{"message": "..."}`

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_request::submit_leave,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::initialize_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::cancel_leave,
        crate::api::leave_request::approval_history,

        crate::api::approvals::pending_approvals,
        crate::api::approvals::todays_activity,

        crate::api::delegation::create_delegation,
        crate::api::delegation::get_delegation,
        crate::api::delegation::update_delegation,
        crate::api::delegation::deactivate_delegation,
        crate::api::delegation::overlapping_delegations,
        crate::api::delegation::delegations_given,
        crate::api::delegation::delegations_held,
        crate::api::delegation::current_delegation
    ),
    components(
        schemas(
            LeaveApplication,
            LeaveRequest,
            LeaveStatus,
            LeaveType,
            LeaveApproval,
            ApprovalStatus,
            PlanSummary,
            PlannedLevel,
            ApproverSource,
            ApprovalOutcome,
            PendingApproval,
            ApprovalActivity,
            ApprovalNote,
            Rejection,
            ApprovalDelegation,
            DelegationType,
            NewDelegation,
            DelegationPatch
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave submission and approval APIs"),
        (name = "Approvals", description = "Approver queues and activity"),
        (name = "Delegation", description = "Approval delegation APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
