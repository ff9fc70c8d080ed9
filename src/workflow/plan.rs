use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use super::{error::WorkflowError, hierarchy};
use crate::model::{
    designation::Designation,
    employee::Employee,
    leave_request::{LeaveRequest, LeaveType},
};
use crate::store::WorkflowTx;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApproverSource {
    ReportingChain,
    ApproverPool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlannedLevel {
    #[schema(example = 1)]
    pub level: u32,
    #[schema(example = 900)]
    pub approver_id: u64,
    #[schema(example = false)]
    pub is_final_approval: bool,
    pub source: ApproverSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalPlan {
    pub requires_multi_level: bool,
    pub levels: Vec<PlannedLevel>,
}

pub fn requires_multi_level(request: &LeaveRequest, designation: &Designation) -> bool {
    request.days_count > 3 || request.leave_type.escalates() || designation.level.is_senior()
}

pub fn required_levels(request: &LeaveRequest) -> u32 {
    if request.days_count > 15 || request.leave_type == LeaveType::Maternity {
        3
    } else if request.days_count > 7 {
        2
    } else {
        1
    }
}

/// Picks one approver per level for `request`.
///
/// Multi-level requests take the reporting chain first and pad any shortfall
/// from the branch's approver pool (ascending id, requester and already-picked
/// approvers excluded). Everything else goes to the immediate manager alone.
/// An empty plan is an error: the request would have nobody to act on it.
pub async fn build_plan(
    tx: &mut dyn WorkflowTx,
    request: &LeaveRequest,
    requester: &Employee,
    designation: &Designation,
) -> Result<ApprovalPlan, WorkflowError> {
    let multi_level = requires_multi_level(request, designation);
    let mut approvers: Vec<(u64, ApproverSource)> = Vec::new();

    if multi_level {
        let wanted = required_levels(request) as usize;
        for superior in hierarchy::chain(tx, requester, wanted).await? {
            approvers.push((superior.id, ApproverSource::ReportingChain));
        }

        if approvers.len() < wanted {
            let pool = tx.approver_pool(requester.branch_id).await?;
            let shortfall = wanted - approvers.len();
            let padding: Vec<u64> = pool
                .iter()
                .map(|e| e.id)
                .filter(|id| *id != requester.id && !approvers.iter().any(|(a, _)| a == id))
                .take(shortfall)
                .collect();
            if padding.len() < shortfall {
                warn!(
                    employee_id = requester.id,
                    branch_id = requester.branch_id,
                    wanted,
                    found = approvers.len() + padding.len(),
                    "Approver pool too small for required approval levels"
                );
            }
            approvers.extend(padding.into_iter().map(|id| (id, ApproverSource::ApproverPool)));
        }
    } else if let Some(manager_id) = requester.reporting_manager_id {
        if manager_id == requester.id {
            warn!(
                employee_id = requester.id,
                "Employee is recorded as their own reporting manager"
            );
            return Err(WorkflowError::HierarchyCycle {
                employee_id: requester.id,
                repeated_id: manager_id,
            });
        }
        match tx.employee(manager_id).await? {
            Some(manager) if manager.is_active() => {
                approvers.push((manager.id, ApproverSource::ReportingChain));
            }
            _ => warn!(
                employee_id = requester.id,
                manager_id, "Reporting manager is missing or inactive"
            ),
        }
    }

    if approvers.is_empty() {
        return Err(WorkflowError::Unassignable {
            employee_id: requester.id,
        });
    }

    let last = approvers.len() - 1;
    let levels: Vec<PlannedLevel> = approvers
        .into_iter()
        .enumerate()
        .map(|(i, (approver_id, source))| PlannedLevel {
            level: i as u32 + 1,
            approver_id,
            is_final_approval: i == last,
            source,
        })
        .collect();

    info!(
        employee_id = requester.id,
        levels = levels.len(),
        multi_level,
        "Approval plan built"
    );

    Ok(ApprovalPlan {
        requires_multi_level: multi_level,
        levels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::designation::DesignationLevel;
    use crate::store::WorkflowStore;
    use crate::workflow::testing::{Fixture, designation, leave_request};

    fn approvers(plan: &ApprovalPlan) -> Vec<u64> {
        plan.levels.iter().map(|l| l.approver_id).collect()
    }

    #[test]
    fn multi_level_triggers() {
        let officer = designation(1, DesignationLevel::Officer, false, 0);
        let manager = designation(2, DesignationLevel::Manager, true, 0);

        assert!(!requires_multi_level(&leave_request(40, 3, LeaveType::Annual), &officer));
        assert!(requires_multi_level(&leave_request(40, 4, LeaveType::Annual), &officer));
        assert!(requires_multi_level(&leave_request(40, 1, LeaveType::Study), &officer));
        assert!(requires_multi_level(&leave_request(40, 1, LeaveType::Maternity), &officer));
        assert!(requires_multi_level(&leave_request(30, 1, LeaveType::Annual), &manager));
    }

    #[test]
    fn level_count_by_duration_and_type() {
        assert_eq!(required_levels(&leave_request(40, 7, LeaveType::Annual)), 1);
        assert_eq!(required_levels(&leave_request(40, 8, LeaveType::Annual)), 2);
        assert_eq!(required_levels(&leave_request(40, 15, LeaveType::Annual)), 2);
        assert_eq!(required_levels(&leave_request(40, 16, LeaveType::Annual)), 3);
        assert_eq!(required_levels(&leave_request(40, 2, LeaveType::Maternity)), 3);
        assert_eq!(required_levels(&leave_request(40, 2, LeaveType::Study)), 1);
    }

    #[actix_web::test]
    async fn ten_days_take_two_chain_levels() {
        let fx = Fixture::standard().await;
        let mut tx = fx.store.begin().await.unwrap();
        let officer = tx.employee(40).await.unwrap().unwrap();
        let request = leave_request(40, 10, LeaveType::Annual);
        let officer_designation = designation(1, DesignationLevel::Officer, false, 2);

        let plan = build_plan(tx.as_mut(), &request, &officer, &officer_designation)
            .await
            .unwrap();

        assert!(plan.requires_multi_level);
        assert_eq!(approvers(&plan), vec![30, 20]);
        assert!(!plan.levels[0].is_final_approval);
        assert!(plan.levels[1].is_final_approval);
        assert_eq!(plan.levels[1].level, 2);
    }

    #[actix_web::test]
    async fn short_chain_is_padded_from_branch_pool() {
        let fx = Fixture::standard().await;
        let mut tx = fx.store.begin().await.unwrap();
        let requester = tx.employee(61).await.unwrap().unwrap();
        let request = leave_request(61, 20, LeaveType::Annual);
        let officer_designation = designation(1, DesignationLevel::Officer, false, 2);

        let plan = build_plan(tx.as_mut(), &request, &requester, &officer_designation)
            .await
            .unwrap();

        // chain gives 60 only; pool of branch 2 is 60, 62, 63 by id
        assert_eq!(approvers(&plan), vec![60, 62, 63]);
        assert_eq!(plan.levels[0].source, ApproverSource::ReportingChain);
        assert_eq!(plan.levels[1].source, ApproverSource::ApproverPool);
        assert_eq!(
            plan.levels.iter().filter(|l| l.is_final_approval).count(),
            1
        );
    }

    #[actix_web::test]
    async fn single_level_goes_to_immediate_manager() {
        let fx = Fixture::standard().await;
        let mut tx = fx.store.begin().await.unwrap();
        let officer = tx.employee(40).await.unwrap().unwrap();
        let request = leave_request(40, 3, LeaveType::Annual);
        let officer_designation = designation(1, DesignationLevel::Officer, false, 2);

        let plan = build_plan(tx.as_mut(), &request, &officer, &officer_designation)
            .await
            .unwrap();

        assert!(!plan.requires_multi_level);
        assert_eq!(approvers(&plan), vec![30]);
        assert!(plan.levels[0].is_final_approval);
    }

    #[actix_web::test]
    async fn no_manager_and_no_pool_is_unassignable() {
        let fx = Fixture::standard().await;
        let mut tx = fx.store.begin().await.unwrap();
        let loner = tx.employee(70).await.unwrap().unwrap();
        let request = leave_request(70, 3, LeaveType::Annual);
        let officer_designation = designation(1, DesignationLevel::Officer, false, 2);

        let err = build_plan(tx.as_mut(), &request, &loner, &officer_designation)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Unassignable { employee_id: 70 }));
    }

    #[actix_web::test]
    async fn self_reporting_single_level_is_a_cycle() {
        let fx = Fixture::standard().await;
        fx.employee(95, Some(95), 1, 1).await;
        let mut tx = fx.store.begin().await.unwrap();
        let selfish = tx.employee(95).await.unwrap().unwrap();
        let request = leave_request(95, 3, LeaveType::Annual);
        let officer_designation = designation(1, DesignationLevel::Officer, false, 2);

        let err = build_plan(tx.as_mut(), &request, &selfish, &officer_designation)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::HierarchyCycle {
                employee_id: 95,
                repeated_id: 95
            }
        ));
    }
}
