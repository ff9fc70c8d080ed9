use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DelegationType {
    LeaveApproval,
    AttendanceApproval,
    PayrollApproval,
}

impl TryFrom<String> for DelegationType {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A time-bounded grant of `delegator_id`'s approval authority to `delegatee_id`.
/// Both window ends are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 5,
    "delegator_id": 900,
    "delegatee_id": 901,
    "delegation_type": "leave_approval",
    "branch_id": 1,
    "start_date": "2026-01-01",
    "end_date": "2026-01-31",
    "reason": "Annual leave",
    "is_active": true,
    "is_reusable": true,
    "max_approvals": null,
    "used_approvals": 0,
    "created_by": 1,
    "created_at": "2025-12-20T08:00:00Z",
    "updated_at": "2025-12-20T08:00:00Z"
}))]
pub struct ApprovalDelegation {
    pub id: u64,
    pub delegator_id: u64,
    pub delegatee_id: u64,
    #[sqlx(try_from = "String")]
    pub delegation_type: DelegationType,
    pub branch_id: u64,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub reason: Option<String>,
    pub is_active: bool,
    pub is_reusable: bool,
    pub max_approvals: Option<u32>,
    pub used_approvals: u32,
    pub created_by: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
pub struct NewDelegation {
    #[schema(example = 900)]
    pub delegator_id: u64,
    #[schema(example = 901)]
    pub delegatee_id: u64,
    #[schema(example = "leave_approval")]
    pub delegation_type: DelegationType,
    #[schema(example = 1)]
    pub branch_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-31", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Annual leave")]
    pub reason: Option<String>,
    #[serde(default)]
    #[schema(example = true)]
    pub is_reusable: bool,
    #[schema(example = 10, nullable = true)]
    pub max_approvals: Option<u32>,
}

/// Keeps an explicit `null` apart from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Administrator edits; an absent field is left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct DelegationPatch {
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-02-15", format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub is_reusable: Option<bool>,
    /// `null` removes the cap.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<u32>, nullable = true, example = 10)]
    pub max_approvals: Option<Option<u32>>,
}
