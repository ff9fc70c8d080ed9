use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Skipped,
}

impl TryFrom<String> for ApprovalStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One level of a leave request's approval plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 11,
    "leave_request_id": 1,
    "approver_id": 900,
    "level": 1,
    "status": "approved",
    "is_final_approval": false,
    "original_approver_id": null,
    "sequence": 1,
    "notes": "Enjoy",
    "acted_at": "2026-01-02T10:15:00Z",
    "created_at": "2026-01-01T09:00:00Z"
}))]
pub struct LeaveApproval {
    pub id: u64,
    pub leave_request_id: u64,
    /// Employee who holds (or, once acted on, exercised) the approval.
    pub approver_id: u64,
    pub level: u32,
    #[sqlx(try_from = "String")]
    pub status: ApprovalStatus,
    pub is_final_approval: bool,
    /// Assigned approver when the row was acted on through a delegation.
    pub original_approver_id: Option<u64>,
    pub sequence: u32,
    pub notes: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub acted_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl LeaveApproval {
    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLeaveApproval {
    pub leave_request_id: u64,
    pub approver_id: u64,
    pub level: u32,
    pub is_final_approval: bool,
    pub sequence: u32,
}
