//! Shared fixtures for workflow tests.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use super::{ApprovalWorkflow, calendar::BusinessCalendar};
use crate::model::{
    designation::{Designation, DesignationLevel},
    employee::{Employee, EmployeeStatus},
    leave_request::{LeaveRequest, LeaveStatus, LeaveType},
};
use crate::store::MemoryStore;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 09:00 UTC on the given day.
pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
}

pub fn designation(
    id: u64,
    level: DesignationLevel,
    can_approve_leave: bool,
    auto_approve_leave_days: u32,
) -> Designation {
    Designation {
        id,
        title: level.to_string(),
        level,
        can_approve_leave,
        auto_approve_leave_days,
    }
}

/// Unsaved pending request; only the policy-relevant fields are meaningful.
pub fn leave_request(employee_id: u64, days_count: u32, leave_type: LeaveType) -> LeaveRequest {
    let now = at(2026, 1, 1);
    LeaveRequest {
        id: 0,
        employee_id,
        start_date: date(2026, 1, 5),
        end_date: date(2026, 1, 5),
        days_count,
        leave_type,
        reason: None,
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
    }
}

pub struct Fixture {
    pub store: MemoryStore,
    pub workflow: ApprovalWorkflow,
}

impl Fixture {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let workflow = ApprovalWorkflow::new(Arc::new(store.clone()), BusinessCalendar::default());
        Self { store, workflow }
    }

    /// Designations:
    /// 1 officer (auto-approves up to 2 days), 2 manager, 3 general manager, 4 director.
    ///
    /// Branch 1: 10 director <- 20 GM <- 30, 31 managers <- 40, 41 officers (report to 30).
    /// Branch 2: 60 manager <- 61 officer; 62 manager and 63 GM report to nobody.
    /// Branch 3: 70 officer without a manager.
    pub async fn standard() -> Self {
        let fx = Self::new();
        fx.designation(1, DesignationLevel::Officer, false, 2).await;
        fx.designation(2, DesignationLevel::Manager, true, 0).await;
        fx.designation(3, DesignationLevel::GeneralManager, true, 0)
            .await;
        fx.designation(4, DesignationLevel::Director, true, 0).await;

        fx.employee(10, None, 4, 1).await;
        fx.employee(20, Some(10), 3, 1).await;
        fx.employee(30, Some(20), 2, 1).await;
        fx.employee(31, Some(20), 2, 1).await;
        fx.employee(40, Some(30), 1, 1).await;
        fx.employee(41, Some(30), 1, 1).await;

        fx.employee(60, None, 2, 2).await;
        fx.employee(61, Some(60), 1, 2).await;
        fx.employee(62, None, 2, 2).await;
        fx.employee(63, None, 3, 2).await;

        fx.employee(70, None, 1, 3).await;
        fx
    }

    pub async fn designation(
        &self,
        id: u64,
        level: DesignationLevel,
        can_approve_leave: bool,
        auto_approve_leave_days: u32,
    ) {
        self.store
            .put_designation(designation(id, level, can_approve_leave, auto_approve_leave_days))
            .await;
    }

    pub async fn employee(
        &self,
        id: u64,
        reporting_manager_id: Option<u64>,
        designation_id: u64,
        branch_id: u64,
    ) {
        self.store
            .put_employee(Employee {
                id,
                reporting_manager_id,
                designation_id,
                branch_id,
                status: EmployeeStatus::Active,
            })
            .await;
    }

    pub async fn deactivate(&self, id: u64) {
        self.store
            .put_employee_status(id, EmployeeStatus::Inactive)
            .await;
    }
}
