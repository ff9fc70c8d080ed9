//! In-process store backing the workflow tests.
//!
//! A transaction holds the state mutex for its whole lifetime and works on a
//! copy, so transactions are serialized and an uncommitted one leaves no trace.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::lock::{Mutex, OwnedMutexGuard};

use super::{StoreError, WorkflowStore, WorkflowTx};
use crate::model::{
    delegation::{ApprovalDelegation, DelegationType, NewDelegation},
    designation::Designation,
    employee::{Employee, EmployeeStatus},
    leave_approval::{ApprovalStatus, LeaveApproval, NewLeaveApproval},
    leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest},
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    employees: BTreeMap<u64, Employee>,
    designations: BTreeMap<u64, Designation>,
    leave_requests: BTreeMap<u64, LeaveRequest>,
    approvals: BTreeMap<u64, LeaveApproval>,
    delegations: BTreeMap<u64, ApprovalDelegation>,
    last_id: u64,
}

impl MemoryState {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_employee(&self, employee: Employee) {
        self.state.lock().await.employees.insert(employee.id, employee);
    }

    pub async fn put_designation(&self, designation: Designation) {
        self.state
            .lock()
            .await
            .designations
            .insert(designation.id, designation);
    }

    pub async fn put_employee_status(&self, id: u64, status: EmployeeStatus) {
        if let Some(employee) = self.state.lock().await.employees.get_mut(&id) {
            employee.status = status;
        }
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn WorkflowTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let work = (*guard).clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

#[async_trait]
impl WorkflowTx for MemoryTx {
    async fn employee(&mut self, id: u64) -> Result<Option<Employee>, StoreError> {
        Ok(self.work.employees.get(&id).cloned())
    }

    async fn designation(&mut self, id: u64) -> Result<Option<Designation>, StoreError> {
        Ok(self.work.designations.get(&id).cloned())
    }

    async fn approver_pool(&mut self, branch_id: u64) -> Result<Vec<Employee>, StoreError> {
        let designations = &self.work.designations;
        Ok(self
            .work
            .employees
            .values()
            .filter(|e| e.branch_id == branch_id && e.is_active())
            .filter(|e| {
                designations
                    .get(&e.designation_id)
                    .is_some_and(|d| d.can_approve_leave)
            })
            .cloned()
            .collect())
    }

    async fn insert_leave_request(
        &mut self,
        new: &NewLeaveRequest,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, StoreError> {
        let request = LeaveRequest {
            id: self.work.next_id(),
            employee_id: new.employee_id,
            start_date: new.start_date,
            end_date: new.end_date,
            days_count: new.days_count,
            leave_type: new.leave_type,
            reason: new.reason.clone(),
            status: LeaveStatus::Pending,
            current_approver_id: None,
            current_approval_level: None,
            total_approval_levels: 0,
            completed_approval_levels: 0,
            is_fully_approved: false,
            requires_multi_level_approval: false,
            approved_at: None,
            approval_notes: None,
            rejection_reason: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        };
        self.work.leave_requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn leave_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        Ok(self.work.leave_requests.get(&id).cloned())
    }

    async fn lock_leave_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        self.leave_request(id).await
    }

    async fn update_leave_request(&mut self, request: &LeaveRequest) -> Result<(), StoreError> {
        match self.work.leave_requests.get_mut(&request.id) {
            Some(slot) => {
                *slot = request.clone();
                Ok(())
            }
            None => Err(StoreError::Missing {
                table: "leave_requests",
                id: request.id,
            }),
        }
    }

    async fn approvals_for(
        &mut self,
        leave_request_id: u64,
    ) -> Result<Vec<LeaveApproval>, StoreError> {
        let mut rows: Vec<_> = self
            .work
            .approvals
            .values()
            .filter(|a| a.leave_request_id == leave_request_id)
            .cloned()
            .collect();
        rows.sort_by_key(|a| (a.level, a.sequence, a.id));
        Ok(rows)
    }

    async fn insert_approval(
        &mut self,
        new: &NewLeaveApproval,
        now: DateTime<Utc>,
    ) -> Result<LeaveApproval, StoreError> {
        let approval = LeaveApproval {
            id: self.work.next_id(),
            leave_request_id: new.leave_request_id,
            approver_id: new.approver_id,
            level: new.level,
            status: ApprovalStatus::Pending,
            is_final_approval: new.is_final_approval,
            original_approver_id: None,
            sequence: new.sequence,
            notes: None,
            acted_at: None,
            created_at: now,
        };
        self.work.approvals.insert(approval.id, approval.clone());
        Ok(approval)
    }

    async fn update_approval(&mut self, approval: &LeaveApproval) -> Result<(), StoreError> {
        match self.work.approvals.get_mut(&approval.id) {
            Some(slot) => {
                *slot = approval.clone();
                Ok(())
            }
            None => Err(StoreError::Missing {
                table: "leave_approvals",
                id: approval.id,
            }),
        }
    }

    async fn actionable_approvals(
        &mut self,
        approver_ids: &[u64],
    ) -> Result<Vec<LeaveApproval>, StoreError> {
        let requests = &self.work.leave_requests;
        Ok(self
            .work
            .approvals
            .values()
            .filter(|a| a.is_pending() && approver_ids.contains(&a.approver_id))
            .filter(|a| {
                requests.get(&a.leave_request_id).is_some_and(|r| {
                    r.is_pending() && r.current_approval_level == Some(a.level)
                })
            })
            .cloned()
            .collect())
    }

    async fn approvals_acted_on(
        &mut self,
        approver_id: u64,
        day: NaiveDate,
    ) -> Result<Vec<LeaveApproval>, StoreError> {
        Ok(self
            .work
            .approvals
            .values()
            .filter(|a| a.approver_id == approver_id)
            .filter(|a| matches!(a.status, ApprovalStatus::Approved | ApprovalStatus::Rejected))
            .filter(|a| a.acted_at.is_some_and(|t| t.date_naive() == day))
            .cloned()
            .collect())
    }

    async fn insert_delegation(
        &mut self,
        new: &NewDelegation,
        created_by: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<ApprovalDelegation, StoreError> {
        let delegation = ApprovalDelegation {
            id: self.work.next_id(),
            delegator_id: new.delegator_id,
            delegatee_id: new.delegatee_id,
            delegation_type: new.delegation_type,
            branch_id: new.branch_id,
            start_date: new.start_date,
            end_date: new.end_date,
            reason: new.reason.clone(),
            is_active: true,
            is_reusable: new.is_reusable,
            max_approvals: new.max_approvals,
            used_approvals: 0,
            created_by,
            created_at: now,
            updated_at: now,
        };
        self.work.delegations.insert(delegation.id, delegation.clone());
        Ok(delegation)
    }

    async fn delegation(&mut self, id: u64) -> Result<Option<ApprovalDelegation>, StoreError> {
        Ok(self.work.delegations.get(&id).cloned())
    }

    async fn lock_delegation(
        &mut self,
        id: u64,
    ) -> Result<Option<ApprovalDelegation>, StoreError> {
        self.delegation(id).await
    }

    async fn update_delegation(
        &mut self,
        delegation: &ApprovalDelegation,
    ) -> Result<(), StoreError> {
        match self.work.delegations.get_mut(&delegation.id) {
            Some(slot) => {
                *slot = delegation.clone();
                Ok(())
            }
            None => Err(StoreError::Missing {
                table: "approval_delegations",
                id: delegation.id,
            }),
        }
    }

    async fn lock_delegations_from(
        &mut self,
        delegator_id: u64,
        delegation_type: DelegationType,
    ) -> Result<Vec<ApprovalDelegation>, StoreError> {
        Ok(self
            .work
            .delegations
            .values()
            .filter(|d| d.delegator_id == delegator_id && d.delegation_type == delegation_type)
            .cloned()
            .collect())
    }

    async fn delegations_from(
        &mut self,
        delegator_id: u64,
    ) -> Result<Vec<ApprovalDelegation>, StoreError> {
        Ok(self
            .work
            .delegations
            .values()
            .filter(|d| d.delegator_id == delegator_id)
            .cloned()
            .collect())
    }

    async fn delegations_to(
        &mut self,
        delegatee_id: u64,
    ) -> Result<Vec<ApprovalDelegation>, StoreError> {
        Ok(self
            .work
            .delegations
            .values()
            .filter(|d| d.delegatee_id == delegatee_id)
            .cloned()
            .collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}
