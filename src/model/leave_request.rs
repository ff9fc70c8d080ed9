use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Casual,
    Unpaid,
    Paternity,
    Maternity,
    Study,
}

impl LeaveType {
    /// Leave types that always go through the multi-level chain.
    pub fn escalates(self) -> bool {
        matches!(self, LeaveType::Maternity | LeaveType::Study)
    }
}

impl TryFrom<String> for LeaveType {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl TryFrom<String> for LeaveStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "start_date": "2026-01-05",
    "end_date": "2026-01-16",
    "days_count": 10,
    "leave_type": "annual",
    "reason": "Family visit",
    "status": "pending",
    "current_approver_id": 900,
    "current_approval_level": 1,
    "total_approval_levels": 2,
    "completed_approval_levels": 0,
    "is_fully_approved": false,
    "requires_multi_level_approval": true,
    "approved_at": null,
    "approval_notes": null,
    "rejection_reason": null,
    "cancelled_at": null,
    "created_at": "2026-01-01T09:00:00Z",
    "updated_at": "2026-01-01T09:00:00Z"
}))]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    /// Business days charged for the range.
    pub days_count: u32,
    #[sqlx(try_from = "String")]
    pub leave_type: LeaveType,
    pub reason: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: LeaveStatus,
    pub current_approver_id: Option<u64>,
    pub current_approval_level: Option<u32>,
    pub total_approval_levels: u32,
    pub completed_approval_levels: u32,
    pub is_fully_approved: bool,
    pub requires_multi_level_approval: bool,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub approved_at: Option<DateTime<Utc>>,
    pub approval_notes: Option<String>,
    pub rejection_reason: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl LeaveRequest {
    pub fn is_pending(&self) -> bool {
        self.status == LeaveStatus::Pending
    }
}

/// Insert payload for a freshly submitted request; everything else starts at its default.
#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub employee_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_count: u32,
    pub leave_type: LeaveType,
    pub reason: Option<String>,
}
