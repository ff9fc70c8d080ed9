use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmployeeStatus {
    Active,
    Inactive,
}

impl TryFrom<String> for EmployeeStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Read-only view of an employee as the approval workflow sees it.
///
/// `reporting_manager_id` forms the approval chain; it is owned by the HR
/// directory and is not guaranteed to be acyclic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1000,
        "reporting_manager_id": 900,
        "designation_id": 3,
        "branch_id": 1,
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = 1000)]
    pub id: u64,

    #[schema(example = 900, nullable = true)]
    pub reporting_manager_id: Option<u64>,

    #[schema(example = 3)]
    pub designation_id: u64,

    #[schema(example = 1)]
    pub branch_id: u64,

    #[sqlx(try_from = "String")]
    #[schema(example = "active")]
    pub status: EmployeeStatus,
}

impl Employee {
    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }
}
