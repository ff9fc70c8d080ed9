use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use utoipa::ToSchema;

use super::{
    ApprovalWorkflow, auto_approval, delegation,
    error::WorkflowError,
    plan::{self, PlannedLevel},
};
use crate::model::{
    delegation::{ApprovalDelegation, DelegationType},
    leave_approval::{ApprovalStatus, LeaveApproval, NewLeaveApproval},
    leave_request::{LeaveRequest, LeaveStatus, LeaveType, NewLeaveRequest},
};
use crate::store::WorkflowTx;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LeaveApplication {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-16", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "annual")]
    pub leave_type: LeaveType,
    #[schema(example = "Family visit")]
    pub reason: Option<String>,
}

/// What initialization decided for a request.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PlanSummary {
    #[schema(example = 1)]
    pub leave_request_id: u64,
    pub status: LeaveStatus,
    #[schema(example = 10)]
    pub days_count: u32,
    #[schema(example = false)]
    pub auto_approved: bool,
    #[schema(example = true)]
    pub requires_multi_level_approval: bool,
    #[schema(example = 2)]
    pub total_approval_levels: u32,
    #[schema(example = 900)]
    pub current_approver_id: Option<u64>,
    pub levels: Vec<PlannedLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApprovalOutcome {
    FullyApproved {
        leave_request_id: u64,
        approved_level: u32,
    },
    Forwarded {
        leave_request_id: u64,
        approved_level: u32,
        next_level: u32,
        next_approver_id: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PendingApproval {
    pub approval: LeaveApproval,
    pub leave_request: LeaveRequest,
    /// Assigned approver when the row is reachable only through a delegation.
    pub on_behalf_of: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ApprovalActivity {
    #[schema(example = 900)]
    pub approver_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = 3)]
    pub approved: u32,
    #[schema(example = 1)]
    pub rejected: u32,
    #[schema(example = 4)]
    pub total: u32,
}

/// The row an actor may act on, and the delegation that lets them if it is not theirs.
struct Authority {
    index: usize,
    delegation: Option<ApprovalDelegation>,
}

async fn lock_pending(
    tx: &mut dyn WorkflowTx,
    leave_request_id: u64,
) -> Result<LeaveRequest, WorkflowError> {
    let request = tx
        .lock_leave_request(leave_request_id)
        .await?
        .ok_or(WorkflowError::NotFound {
            entity: "leave request",
            id: leave_request_id,
        })?;
    if !request.is_pending() {
        return Err(WorkflowError::conflict(format!(
            "leave request {leave_request_id} is already {}",
            request.status
        )));
    }
    Ok(request)
}

/// Direct path first, then any assigned approver at the current level who has
/// delegated leave approval to `actor_id`.
async fn resolve_authority(
    tx: &mut dyn WorkflowTx,
    request: &LeaveRequest,
    rows: &[LeaveApproval],
    actor_id: u64,
    today: NaiveDate,
) -> Result<Authority, WorkflowError> {
    let level = request.current_approval_level.ok_or_else(|| {
        WorkflowError::conflict(format!(
            "leave request {} has no approval workflow yet",
            request.id
        ))
    })?;

    let current: Vec<(usize, &LeaveApproval)> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.level == level && row.is_pending())
        .collect();

    if let Some((index, _)) = current.iter().find(|(_, row)| row.approver_id == actor_id) {
        return Ok(Authority {
            index: *index,
            delegation: None,
        });
    }

    for (index, row) in current {
        let grant = delegation::find_active_to(
            tx,
            row.approver_id,
            actor_id,
            DelegationType::LeaveApproval,
            today,
        )
        .await?;
        if let Some(grant) = grant {
            return Ok(Authority {
                index,
                delegation: Some(grant),
            });
        }
    }

    Err(WorkflowError::forbidden(format!(
        "employee {actor_id} cannot act on level {level} of leave request {}",
        request.id
    )))
}

/// Marks the authoritative row, switching it to the actor when authority came
/// from a delegation, and spends that delegation.
async fn act_on_row(
    tx: &mut dyn WorkflowTx,
    row: &mut LeaveApproval,
    authority: &Authority,
    actor_id: u64,
    status: ApprovalStatus,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    if let Some(grant) = &authority.delegation {
        delegation::consume(tx, grant.id, now).await?;
        row.original_approver_id = Some(row.approver_id);
        row.approver_id = actor_id;
    }
    row.status = status;
    row.notes = notes;
    row.acted_at = Some(now);
    tx.update_approval(row).await?;
    Ok(())
}

async fn skip_pending(
    tx: &mut dyn WorkflowTx,
    rows: &mut [LeaveApproval],
    now: DateTime<Utc>,
) -> Result<usize, WorkflowError> {
    let mut skipped = 0;
    for row in rows.iter_mut().filter(|r| r.is_pending()) {
        row.status = ApprovalStatus::Skipped;
        row.acted_at = Some(now);
        tx.update_approval(row).await?;
        skipped += 1;
    }
    Ok(skipped)
}

/// Auto-approval or plan; `request` must already be locked by the caller.
async fn initialize_locked(
    tx: &mut dyn WorkflowTx,
    request: &mut LeaveRequest,
    now: DateTime<Utc>,
) -> Result<PlanSummary, WorkflowError> {
    if request.total_approval_levels > 0 || !tx.approvals_for(request.id).await?.is_empty() {
        return Err(WorkflowError::conflict(format!(
            "leave request {} already has an approval workflow",
            request.id
        )));
    }

    let requester = tx
        .employee(request.employee_id)
        .await?
        .ok_or(WorkflowError::NotFound {
            entity: "employee",
            id: request.employee_id,
        })?;
    let designation = tx
        .designation(requester.designation_id)
        .await?
        .ok_or(WorkflowError::NotFound {
            entity: "designation",
            id: requester.designation_id,
        })?;

    if auto_approval::can_auto_approve(request, &designation) {
        request.status = LeaveStatus::Approved;
        request.approved_at = Some(now);
        request.is_fully_approved = true;
        request.updated_at = now;
        tx.update_leave_request(request).await?;

        info!(
            leave_request_id = request.id,
            employee_id = request.employee_id,
            days_count = request.days_count,
            "Leave request auto-approved"
        );
        return Ok(PlanSummary {
            leave_request_id: request.id,
            status: request.status,
            days_count: request.days_count,
            auto_approved: true,
            requires_multi_level_approval: false,
            total_approval_levels: 0,
            current_approver_id: None,
            levels: Vec::new(),
        });
    }

    let plan = match plan::build_plan(tx, request, &requester, &designation).await {
        Ok(plan) => plan,
        Err(e) => {
            error!(
                error = %e,
                leave_request_id = request.id,
                employee_id = request.employee_id,
                "Could not build an approval plan, operator attention needed"
            );
            return Err(e);
        }
    };
    let Some(first) = plan.levels.first() else {
        return Err(WorkflowError::Unassignable {
            employee_id: request.employee_id,
        });
    };

    for (sequence, level) in plan.levels.iter().enumerate() {
        let new = NewLeaveApproval {
            leave_request_id: request.id,
            approver_id: level.approver_id,
            level: level.level,
            is_final_approval: level.is_final_approval,
            sequence: sequence as u32 + 1,
        };
        tx.insert_approval(&new, now).await?;
    }

    request.current_approver_id = Some(first.approver_id);
    request.current_approval_level = Some(first.level);
    request.total_approval_levels = plan.levels.len() as u32;
    request.requires_multi_level_approval = plan.requires_multi_level;
    request.updated_at = now;
    tx.update_leave_request(request).await?;

    info!(
        leave_request_id = request.id,
        total_levels = request.total_approval_levels,
        current_approver_id = first.approver_id,
        "Approval workflow initialized"
    );
    Ok(PlanSummary {
        leave_request_id: request.id,
        status: request.status,
        days_count: request.days_count,
        auto_approved: false,
        requires_multi_level_approval: plan.requires_multi_level,
        total_approval_levels: request.total_approval_levels,
        current_approver_id: request.current_approver_id,
        levels: plan.levels,
    })
}

impl ApprovalWorkflow {
    /// Records a new leave request for `employee_id` and initializes its workflow.
    pub async fn submit(
        &self,
        employee_id: u64,
        application: &LeaveApplication,
        now: DateTime<Utc>,
    ) -> Result<PlanSummary, WorkflowError> {
        if application.start_date > application.end_date {
            return Err(WorkflowError::conflict(
                "start_date cannot be after end_date",
            ));
        }
        let days_count = self
            .calendar
            .business_days(application.start_date, application.end_date);
        if days_count == 0 {
            return Err(WorkflowError::conflict(
                "leave range contains no business days",
            ));
        }

        let mut tx = self.store.begin().await?;
        let employee = tx.employee(employee_id).await?;
        if !employee.is_some_and(|e| e.is_active()) {
            return Err(WorkflowError::NotFound {
                entity: "employee",
                id: employee_id,
            });
        }

        let new = NewLeaveRequest {
            employee_id,
            start_date: application.start_date,
            end_date: application.end_date,
            days_count,
            leave_type: application.leave_type,
            reason: application.reason.clone(),
        };
        let mut request = tx.insert_leave_request(&new, now).await?;
        let summary = initialize_locked(tx.as_mut(), &mut request, now).await?;
        tx.commit().await?;
        Ok(summary)
    }

    /// Runs auto-approval or builds the plan for an existing request.
    /// A request that already has approval rows is refused, never re-planned.
    pub async fn initialize(
        &self,
        leave_request_id: u64,
        now: DateTime<Utc>,
    ) -> Result<PlanSummary, WorkflowError> {
        let mut tx = self.store.begin().await?;
        let mut request = lock_pending(tx.as_mut(), leave_request_id).await?;
        let summary = initialize_locked(tx.as_mut(), &mut request, now).await?;
        tx.commit().await?;
        Ok(summary)
    }

    pub async fn approve(
        &self,
        leave_request_id: u64,
        actor_id: u64,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ApprovalOutcome, WorkflowError> {
        let mut tx = self.store.begin().await?;
        let mut request = lock_pending(tx.as_mut(), leave_request_id).await?;
        let mut rows = tx.approvals_for(leave_request_id).await?;
        let authority =
            resolve_authority(tx.as_mut(), &request, &rows, actor_id, now.date_naive()).await?;

        let row = &mut rows[authority.index];
        act_on_row(
            tx.as_mut(),
            row,
            &authority,
            actor_id,
            ApprovalStatus::Approved,
            notes.clone(),
            now,
        )
        .await?;
        let approved_level = row.level;
        let was_final = row.is_final_approval;

        request.completed_approval_levels += 1;
        request.updated_at = now;

        let outcome = if was_final || request.completed_approval_levels >= request.total_approval_levels
        {
            request.status = LeaveStatus::Approved;
            request.approved_at = Some(now);
            request.is_fully_approved = true;
            request.approval_notes = notes;
            request.current_approver_id = None;
            let skipped = skip_pending(tx.as_mut(), &mut rows, now).await?;
            if skipped > 0 {
                info!(leave_request_id, skipped, "Remaining approval levels skipped");
            }
            ApprovalOutcome::FullyApproved {
                leave_request_id,
                approved_level,
            }
        } else {
            let next = rows
                .iter()
                .filter(|r| r.is_pending() && r.level > approved_level)
                .min_by_key(|r| (r.level, r.sequence));
            let Some(next) = next else {
                error!(
                    leave_request_id,
                    approved_level,
                    completed = request.completed_approval_levels,
                    total = request.total_approval_levels,
                    "Approval plan has no pending level left, operator attention needed"
                );
                return Err(WorkflowError::PlanExhausted {
                    leave_request_id,
                    level: approved_level,
                });
            };
            if next.level != approved_level + 1 {
                warn!(
                    leave_request_id,
                    approved_level,
                    next_level = next.level,
                    "Approval plan has a gap between levels"
                );
            }
            request.current_approver_id = Some(next.approver_id);
            request.current_approval_level = Some(next.level);
            ApprovalOutcome::Forwarded {
                leave_request_id,
                approved_level,
                next_level: next.level,
                next_approver_id: next.approver_id,
            }
        };

        tx.update_leave_request(&request).await?;
        tx.commit().await?;

        info!(
            leave_request_id,
            actor_id,
            approved_level,
            delegated = authority.delegation.is_some(),
            "Leave approval recorded"
        );
        Ok(outcome)
    }

    /// A rejection at any level ends the workflow; levels still pending are skipped.
    pub async fn reject(
        &self,
        leave_request_id: u64,
        actor_id: u64,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, WorkflowError> {
        let mut tx = self.store.begin().await?;
        let mut request = lock_pending(tx.as_mut(), leave_request_id).await?;
        let mut rows = tx.approvals_for(leave_request_id).await?;
        let authority =
            resolve_authority(tx.as_mut(), &request, &rows, actor_id, now.date_naive()).await?;

        let row = &mut rows[authority.index];
        act_on_row(
            tx.as_mut(),
            row,
            &authority,
            actor_id,
            ApprovalStatus::Rejected,
            reason.clone(),
            now,
        )
        .await?;
        let rejected_level = row.level;

        request.status = LeaveStatus::Rejected;
        request.rejection_reason = reason;
        request.current_approver_id = None;
        request.updated_at = now;
        skip_pending(tx.as_mut(), &mut rows, now).await?;

        tx.update_leave_request(&request).await?;
        tx.commit().await?;

        info!(
            leave_request_id,
            actor_id,
            rejected_level,
            delegated = authority.delegation.is_some(),
            "Leave request rejected"
        );
        Ok(request)
    }

    /// Withdrawal by the requester: while pending, or while approved and not yet started.
    pub async fn cancel(
        &self,
        leave_request_id: u64,
        actor_id: u64,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, WorkflowError> {
        let mut tx = self.store.begin().await?;
        let mut request = tx
            .lock_leave_request(leave_request_id)
            .await?
            .ok_or(WorkflowError::NotFound {
                entity: "leave request",
                id: leave_request_id,
            })?;

        if request.employee_id != actor_id {
            return Err(WorkflowError::forbidden(
                "only the requester can cancel a leave request",
            ));
        }
        let cancellable = match request.status {
            LeaveStatus::Pending => true,
            LeaveStatus::Approved => now.date_naive() < request.start_date,
            LeaveStatus::Rejected | LeaveStatus::Cancelled => false,
        };
        if !cancellable {
            return Err(WorkflowError::conflict(format!(
                "leave request {leave_request_id} can no longer be cancelled"
            )));
        }

        let mut rows = tx.approvals_for(leave_request_id).await?;
        skip_pending(tx.as_mut(), &mut rows, now).await?;

        request.status = LeaveStatus::Cancelled;
        request.is_fully_approved = false;
        request.current_approver_id = None;
        request.cancelled_at = Some(now);
        request.updated_at = now;
        tx.update_leave_request(&request).await?;
        tx.commit().await?;

        info!(leave_request_id, "Leave request cancelled");
        Ok(request)
    }

    pub async fn leave_request(&self, leave_request_id: u64) -> Result<LeaveRequest, WorkflowError> {
        let mut tx = self.store.begin().await?;
        let request = tx
            .leave_request(leave_request_id)
            .await?
            .ok_or(WorkflowError::NotFound {
                entity: "leave request",
                id: leave_request_id,
            })?;
        tx.commit().await?;
        Ok(request)
    }

    /// Every approval row of the request, by level.
    pub async fn approval_history(
        &self,
        leave_request_id: u64,
    ) -> Result<Vec<LeaveApproval>, WorkflowError> {
        let mut tx = self.store.begin().await?;
        if tx.leave_request(leave_request_id).await?.is_none() {
            return Err(WorkflowError::NotFound {
                entity: "leave request",
                id: leave_request_id,
            });
        }
        let rows = tx.approvals_for(leave_request_id).await?;
        tx.commit().await?;
        Ok(rows)
    }

    /// Rows `approver_id` can act on right now, their own and those of
    /// colleagues who delegated leave approval to them.
    pub async fn pending_approvals(
        &self,
        approver_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<PendingApproval>, WorkflowError> {
        let mut tx = self.store.begin().await?;
        let mut owners = vec![approver_id];
        owners.extend(delegation::delegators_for(tx.as_mut(), approver_id, now.date_naive()).await?);

        let rows = tx.actionable_approvals(&owners).await?;
        let mut pending = Vec::with_capacity(rows.len());
        for approval in rows {
            let Some(leave_request) = tx.leave_request(approval.leave_request_id).await? else {
                continue;
            };
            let on_behalf_of = (approval.approver_id != approver_id).then_some(approval.approver_id);
            pending.push(PendingApproval {
                approval,
                leave_request,
                on_behalf_of,
            });
        }
        tx.commit().await?;
        Ok(pending)
    }

    pub async fn daily_approval_activity(
        &self,
        approver_id: u64,
        now: DateTime<Utc>,
    ) -> Result<ApprovalActivity, WorkflowError> {
        let today = now.date_naive();
        let mut tx = self.store.begin().await?;
        let rows = tx.approvals_acted_on(approver_id, today).await?;
        tx.commit().await?;

        let approved = rows
            .iter()
            .filter(|r| r.status == ApprovalStatus::Approved)
            .count() as u32;
        let rejected = rows
            .iter()
            .filter(|r| r.status == ApprovalStatus::Rejected)
            .count() as u32;
        Ok(ApprovalActivity {
            approver_id,
            date: today,
            approved,
            rejected,
            total: approved + rejected,
        })
    }
}
