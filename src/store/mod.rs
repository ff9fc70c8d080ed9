use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::model::{
    delegation::{ApprovalDelegation, DelegationType, NewDelegation},
    designation::Designation,
    employee::Employee,
    leave_approval::{LeaveApproval, NewLeaveApproval},
    leave_request::{LeaveRequest, NewLeaveRequest},
};

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[cfg(test)]
pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("row {id} in {table} vanished mid-transaction")]
    Missing { table: &'static str, id: u64 },
}

/// Entry point for every unit of work. Dropping a [`WorkflowTx`] without
/// calling [`WorkflowTx::commit`] discards everything it wrote.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn WorkflowTx>, StoreError>;
}

/// Reads and writes inside one transaction.
///
/// `lock_*` methods take a write lock on the returned rows for the rest of the
/// transaction so that concurrent approvals of the same request serialize.
#[async_trait]
pub trait WorkflowTx: Send {
    // Directory, read-only.
    async fn employee(&mut self, id: u64) -> Result<Option<Employee>, StoreError>;
    async fn designation(&mut self, id: u64) -> Result<Option<Designation>, StoreError>;
    /// Active employees of `branch_id` whose designation may approve leave, by id.
    async fn approver_pool(&mut self, branch_id: u64) -> Result<Vec<Employee>, StoreError>;

    async fn insert_leave_request(
        &mut self,
        new: &NewLeaveRequest,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, StoreError>;
    async fn leave_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, StoreError>;
    async fn lock_leave_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, StoreError>;
    async fn update_leave_request(&mut self, request: &LeaveRequest) -> Result<(), StoreError>;

    /// Ordered by level, then sequence.
    async fn approvals_for(&mut self, leave_request_id: u64)
    -> Result<Vec<LeaveApproval>, StoreError>;
    async fn insert_approval(
        &mut self,
        new: &NewLeaveApproval,
        now: DateTime<Utc>,
    ) -> Result<LeaveApproval, StoreError>;
    async fn update_approval(&mut self, approval: &LeaveApproval) -> Result<(), StoreError>;
    /// Pending rows held by any of `approver_ids` that sit at their request's
    /// current level while the request itself is still pending.
    async fn actionable_approvals(
        &mut self,
        approver_ids: &[u64],
    ) -> Result<Vec<LeaveApproval>, StoreError>;
    /// Approved or rejected rows acted on by `approver_id` during `day` (UTC).
    async fn approvals_acted_on(
        &mut self,
        approver_id: u64,
        day: NaiveDate,
    ) -> Result<Vec<LeaveApproval>, StoreError>;

    async fn insert_delegation(
        &mut self,
        new: &NewDelegation,
        created_by: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<ApprovalDelegation, StoreError>;
    async fn delegation(&mut self, id: u64) -> Result<Option<ApprovalDelegation>, StoreError>;
    async fn lock_delegation(&mut self, id: u64)
    -> Result<Option<ApprovalDelegation>, StoreError>;
    async fn update_delegation(&mut self, delegation: &ApprovalDelegation)
    -> Result<(), StoreError>;
    /// Every delegation granted by `delegator_id` of the given type, locked.
    async fn lock_delegations_from(
        &mut self,
        delegator_id: u64,
        delegation_type: DelegationType,
    ) -> Result<Vec<ApprovalDelegation>, StoreError>;
    async fn delegations_from(
        &mut self,
        delegator_id: u64,
    ) -> Result<Vec<ApprovalDelegation>, StoreError>;
    async fn delegations_to(
        &mut self,
        delegatee_id: u64,
    ) -> Result<Vec<ApprovalDelegation>, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
