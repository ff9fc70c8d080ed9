use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{MySql, MySqlPool, Transaction};

use super::{StoreError, WorkflowStore, WorkflowTx};
use crate::model::{
    delegation::{ApprovalDelegation, DelegationType, NewDelegation},
    designation::Designation,
    employee::Employee,
    leave_approval::{LeaveApproval, NewLeaveApproval},
    leave_request::{LeaveRequest, NewLeaveRequest},
};

const EMPLOYEE_COLUMNS: &str = "id, reporting_manager_id, designation_id, branch_id, status";

const LEAVE_REQUEST_COLUMNS: &str = r#"
    id, employee_id, start_date, end_date, days_count, leave_type, reason, status,
    current_approver_id, current_approval_level, total_approval_levels,
    completed_approval_levels, is_fully_approved, requires_multi_level_approval,
    approved_at, approval_notes, rejection_reason, cancelled_at, created_at, updated_at
"#;

const APPROVAL_COLUMNS: &str = r#"
    id, leave_request_id, approver_id, level, status, is_final_approval,
    original_approver_id, sequence, notes, acted_at, created_at
"#;

const DELEGATION_COLUMNS: &str = r#"
    id, delegator_id, delegatee_id, delegation_type, branch_id, start_date, end_date,
    reason, is_active, is_reusable, max_approvals, used_approvals, created_by,
    created_at, updated_at
"#;

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowStore for MySqlStore {
    async fn begin(&self) -> Result<Box<dyn WorkflowTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlTx { tx }))
    }
}

pub struct MySqlTx {
    tx: Transaction<'static, MySql>,
}

impl MySqlTx {
    async fn fetch_leave_request(
        &mut self,
        id: u64,
        for_update: bool,
    ) -> Result<Option<LeaveRequest>, StoreError> {
        let sql = format!(
            "SELECT {} FROM leave_requests WHERE id = ?{}",
            LEAVE_REQUEST_COLUMNS,
            if for_update { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn fetch_approval(&mut self, id: u64) -> Result<LeaveApproval, StoreError> {
        let sql = format!("SELECT {} FROM leave_approvals WHERE id = ?", APPROVAL_COLUMNS);
        sqlx::query_as::<_, LeaveApproval>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or(StoreError::Missing {
                table: "leave_approvals",
                id,
            })
    }

    async fn fetch_delegation(
        &mut self,
        id: u64,
        for_update: bool,
    ) -> Result<Option<ApprovalDelegation>, StoreError> {
        let sql = format!(
            "SELECT {} FROM approval_delegations WHERE id = ?{}",
            DELEGATION_COLUMNS,
            if for_update { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query_as::<_, ApprovalDelegation>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }
}

#[async_trait]
impl WorkflowTx for MySqlTx {
    async fn employee(&mut self, id: u64) -> Result<Option<Employee>, StoreError> {
        let sql = format!("SELECT {} FROM employees WHERE id = ?", EMPLOYEE_COLUMNS);
        let row = sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn designation(&mut self, id: u64) -> Result<Option<Designation>, StoreError> {
        let row = sqlx::query_as::<_, Designation>(
            r#"
            SELECT id, title, level, can_approve_leave, auto_approve_leave_days
            FROM designations
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn approver_pool(&mut self, branch_id: u64) -> Result<Vec<Employee>, StoreError> {
        let rows = sqlx::query_as::<_, Employee>(
            r#"
            SELECT e.id, e.reporting_manager_id, e.designation_id, e.branch_id, e.status
            FROM employees e
            JOIN designations d ON d.id = e.designation_id
            WHERE e.branch_id = ?
            AND e.status = 'active'
            AND d.can_approve_leave = TRUE
            ORDER BY e.id
            "#,
        )
        .bind(branch_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    async fn insert_leave_request(
        &mut self,
        new: &NewLeaveRequest,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, start_date, end_date, days_count, leave_type, reason, status,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?)
            "#,
        )
        .bind(new.employee_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.days_count)
        .bind(new.leave_type.as_ref())
        .bind(new.reason.as_deref())
        .bind(now)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        let id = result.last_insert_id();
        self.fetch_leave_request(id, false)
            .await?
            .ok_or(StoreError::Missing {
                table: "leave_requests",
                id,
            })
    }

    async fn leave_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        self.fetch_leave_request(id, false).await
    }

    async fn lock_leave_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        self.fetch_leave_request(id, true).await
    }

    async fn update_leave_request(&mut self, request: &LeaveRequest) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?,
                current_approver_id = ?,
                current_approval_level = ?,
                total_approval_levels = ?,
                completed_approval_levels = ?,
                is_fully_approved = ?,
                requires_multi_level_approval = ?,
                approved_at = ?,
                approval_notes = ?,
                rejection_reason = ?,
                cancelled_at = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(request.status.as_ref())
        .bind(request.current_approver_id)
        .bind(request.current_approval_level)
        .bind(request.total_approval_levels)
        .bind(request.completed_approval_levels)
        .bind(request.is_fully_approved)
        .bind(request.requires_multi_level_approval)
        .bind(request.approved_at)
        .bind(request.approval_notes.as_deref())
        .bind(request.rejection_reason.as_deref())
        .bind(request.cancelled_at)
        .bind(request.updated_at)
        .bind(request.id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing {
                table: "leave_requests",
                id: request.id,
            });
        }
        Ok(())
    }

    async fn approvals_for(
        &mut self,
        leave_request_id: u64,
    ) -> Result<Vec<LeaveApproval>, StoreError> {
        let sql = format!(
            "SELECT {} FROM leave_approvals WHERE leave_request_id = ? ORDER BY level, sequence, id",
            APPROVAL_COLUMNS
        );
        let rows = sqlx::query_as::<_, LeaveApproval>(&sql)
            .bind(leave_request_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows)
    }

    async fn insert_approval(
        &mut self,
        new: &NewLeaveApproval,
        now: DateTime<Utc>,
    ) -> Result<LeaveApproval, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_approvals
                (leave_request_id, approver_id, level, status, is_final_approval, sequence,
                 created_at)
            VALUES (?, ?, ?, 'pending', ?, ?, ?)
            "#,
        )
        .bind(new.leave_request_id)
        .bind(new.approver_id)
        .bind(new.level)
        .bind(new.is_final_approval)
        .bind(new.sequence)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        self.fetch_approval(result.last_insert_id()).await
    }

    async fn update_approval(&mut self, approval: &LeaveApproval) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE leave_approvals
            SET approver_id = ?,
                status = ?,
                original_approver_id = ?,
                notes = ?,
                acted_at = ?
            WHERE id = ?
            "#,
        )
        .bind(approval.approver_id)
        .bind(approval.status.as_ref())
        .bind(approval.original_approver_id)
        .bind(approval.notes.as_deref())
        .bind(approval.acted_at)
        .bind(approval.id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing {
                table: "leave_approvals",
                id: approval.id,
            });
        }
        Ok(())
    }

    async fn actionable_approvals(
        &mut self,
        approver_ids: &[u64],
    ) -> Result<Vec<LeaveApproval>, StoreError> {
        if approver_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; approver_ids.len()].join(", ");
        let sql = format!(
            r#"
            SELECT a.id, a.leave_request_id, a.approver_id, a.level, a.status,
                   a.is_final_approval, a.original_approver_id, a.sequence, a.notes,
                   a.acted_at, a.created_at
            FROM leave_approvals a
            JOIN leave_requests r ON r.id = a.leave_request_id
            WHERE a.status = 'pending'
            AND r.status = 'pending'
            AND r.current_approval_level = a.level
            AND a.approver_id IN ({})
            ORDER BY a.id
            "#,
            placeholders
        );

        let mut query = sqlx::query_as::<_, LeaveApproval>(&sql);
        for id in approver_ids {
            query = query.bind(*id);
        }
        let rows = query.fetch_all(&mut *self.tx).await?;
        Ok(rows)
    }

    async fn approvals_acted_on(
        &mut self,
        approver_id: u64,
        day: NaiveDate,
    ) -> Result<Vec<LeaveApproval>, StoreError> {
        let sql = format!(
            r#"
            SELECT {} FROM leave_approvals
            WHERE approver_id = ?
            AND status IN ('approved', 'rejected')
            AND DATE(acted_at) = ?
            ORDER BY acted_at
            "#,
            APPROVAL_COLUMNS
        );
        let rows = sqlx::query_as::<_, LeaveApproval>(&sql)
            .bind(approver_id)
            .bind(day)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows)
    }

    async fn insert_delegation(
        &mut self,
        new: &NewDelegation,
        created_by: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<ApprovalDelegation, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO approval_delegations
                (delegator_id, delegatee_id, delegation_type, branch_id, start_date, end_date,
                 reason, is_active, is_reusable, max_approvals, used_approvals, created_by,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, TRUE, ?, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(new.delegator_id)
        .bind(new.delegatee_id)
        .bind(new.delegation_type.as_ref())
        .bind(new.branch_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.reason.as_deref())
        .bind(new.is_reusable)
        .bind(new.max_approvals)
        .bind(created_by)
        .bind(now)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        let id = result.last_insert_id();
        self.fetch_delegation(id, false)
            .await?
            .ok_or(StoreError::Missing {
                table: "approval_delegations",
                id,
            })
    }

    async fn delegation(&mut self, id: u64) -> Result<Option<ApprovalDelegation>, StoreError> {
        self.fetch_delegation(id, false).await
    }

    async fn lock_delegation(
        &mut self,
        id: u64,
    ) -> Result<Option<ApprovalDelegation>, StoreError> {
        self.fetch_delegation(id, true).await
    }

    async fn update_delegation(
        &mut self,
        delegation: &ApprovalDelegation,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE approval_delegations
            SET start_date = ?,
                end_date = ?,
                reason = ?,
                is_active = ?,
                is_reusable = ?,
                max_approvals = ?,
                used_approvals = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(delegation.start_date)
        .bind(delegation.end_date)
        .bind(delegation.reason.as_deref())
        .bind(delegation.is_active)
        .bind(delegation.is_reusable)
        .bind(delegation.max_approvals)
        .bind(delegation.used_approvals)
        .bind(delegation.updated_at)
        .bind(delegation.id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing {
                table: "approval_delegations",
                id: delegation.id,
            });
        }
        Ok(())
    }

    async fn lock_delegations_from(
        &mut self,
        delegator_id: u64,
        delegation_type: DelegationType,
    ) -> Result<Vec<ApprovalDelegation>, StoreError> {
        let sql = format!(
            r#"
            SELECT {} FROM approval_delegations
            WHERE delegator_id = ? AND delegation_type = ?
            ORDER BY id
            FOR UPDATE
            "#,
            DELEGATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, ApprovalDelegation>(&sql)
            .bind(delegator_id)
            .bind(delegation_type.as_ref())
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows)
    }

    async fn delegations_from(
        &mut self,
        delegator_id: u64,
    ) -> Result<Vec<ApprovalDelegation>, StoreError> {
        let sql = format!(
            "SELECT {} FROM approval_delegations WHERE delegator_id = ? ORDER BY id",
            DELEGATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, ApprovalDelegation>(&sql)
            .bind(delegator_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows)
    }

    async fn delegations_to(
        &mut self,
        delegatee_id: u64,
    ) -> Result<Vec<ApprovalDelegation>, StoreError> {
        let sql = format!(
            "SELECT {} FROM approval_delegations WHERE delegatee_id = ? ORDER BY id",
            DELEGATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, ApprovalDelegation>(&sql)
            .bind(delegatee_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
