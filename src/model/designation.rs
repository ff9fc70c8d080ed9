use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Seniority ladder, lowest first. Declaration order is the ordering.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    ToSchema,
    AsRefStr,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DesignationLevel {
    Staff,
    Officer,
    SeniorOfficer,
    AssistantManager,
    Manager,
    SeniorManager,
    GeneralManager,
    Director,
    ManagingDirector,
    ChiefExecutive,
}

impl DesignationLevel {
    /// Chief-executive-equivalent roles and directors.
    pub fn is_top_tier(self) -> bool {
        matches!(
            self,
            DesignationLevel::Director
                | DesignationLevel::ManagingDirector
                | DesignationLevel::ChiefExecutive
        )
    }

    /// Manager and above.
    pub fn is_senior(self) -> bool {
        self >= DesignationLevel::Manager
    }
}

impl TryFrom<String> for DesignationLevel {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Designation {
    #[schema(example = 3)]
    pub id: u64,

    #[schema(example = "Officer")]
    pub title: String,

    #[sqlx(try_from = "String")]
    #[schema(example = "officer")]
    pub level: DesignationLevel,

    #[schema(example = false)]
    pub can_approve_leave: bool,

    /// Requests at or under this many business days skip the approval chain.
    #[schema(example = 2)]
    pub auto_approve_leave_days: u32,
}
