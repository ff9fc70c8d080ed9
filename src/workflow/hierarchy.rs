use std::collections::HashSet;

use tracing::{debug, warn};

use super::error::WorkflowError;
use crate::model::employee::Employee;
use crate::store::WorkflowTx;

/// Hard cap on reporting-manager hops, whatever depth is requested.
pub const MAX_CHAIN_DEPTH: usize = 5;

/// Up to `depth` active superiors of `employee`, nearest first.
///
/// Inactive managers are walked through but not returned; their hop still
/// counts against [`MAX_CHAIN_DEPTH`]. A manager reference that points at a
/// missing employee ends the walk. Meeting an employee twice means the
/// reporting graph loops, which is reported rather than truncated.
pub async fn chain(
    tx: &mut dyn WorkflowTx,
    employee: &Employee,
    depth: usize,
) -> Result<Vec<Employee>, WorkflowError> {
    let wanted = depth.min(MAX_CHAIN_DEPTH);
    let mut seen = HashSet::from([employee.id]);
    let mut superiors = Vec::with_capacity(wanted);
    let mut next = employee.reporting_manager_id;
    let mut hops = 0;

    while let Some(manager_id) = next {
        if superiors.len() >= wanted || hops >= MAX_CHAIN_DEPTH {
            break;
        }
        if !seen.insert(manager_id) {
            warn!(
                employee_id = employee.id,
                repeated_id = manager_id,
                "Reporting chain contains a cycle"
            );
            return Err(WorkflowError::HierarchyCycle {
                employee_id: employee.id,
                repeated_id: manager_id,
            });
        }
        hops += 1;

        let Some(manager) = tx.employee(manager_id).await? else {
            warn!(
                employee_id = employee.id,
                manager_id, "Reporting manager reference points at a missing employee"
            );
            break;
        };

        next = manager.reporting_manager_id;
        if manager.is_active() {
            superiors.push(manager);
        } else {
            debug!(manager_id, "Skipping inactive manager in reporting chain");
        }
    }

    Ok(superiors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::WorkflowStore;
    use crate::workflow::testing::Fixture;

    fn ids(chain: &[Employee]) -> Vec<u64> {
        chain.iter().map(|e| e.id).collect()
    }

    #[actix_web::test]
    async fn walks_up_to_requested_depth() {
        let fx = Fixture::standard().await;
        let mut tx = fx.store.begin().await.unwrap();
        let officer = tx.employee(40).await.unwrap().unwrap();

        let two = chain(tx.as_mut(), &officer, 2).await.unwrap();
        assert_eq!(ids(&two), vec![30, 20]);

        let all = chain(tx.as_mut(), &officer, 10).await.unwrap();
        assert_eq!(ids(&all), vec![30, 20, 10]);
    }

    #[actix_web::test]
    async fn stops_at_hard_depth_bound() {
        let fx = Fixture::new();
        fx.designation(1, crate::model::designation::DesignationLevel::Manager, true, 0)
            .await;
        // 100 reports to 101, 101 to 102 ... up to 107
        for id in 100..108u64 {
            let manager = if id < 107 { Some(id + 1) } else { None };
            fx.employee(id, manager, 1, 1).await;
        }
        let mut tx = fx.store.begin().await.unwrap();
        let bottom = tx.employee(100).await.unwrap().unwrap();

        let walked = chain(tx.as_mut(), &bottom, 20).await.unwrap();
        assert_eq!(ids(&walked), vec![101, 102, 103, 104, 105]);
    }

    #[actix_web::test]
    async fn inactive_manager_is_passed_over() {
        let fx = Fixture::standard().await;
        fx.deactivate(30).await;
        let mut tx = fx.store.begin().await.unwrap();
        let officer = tx.employee(40).await.unwrap().unwrap();

        let walked = chain(tx.as_mut(), &officer, 2).await.unwrap();
        assert_eq!(ids(&walked), vec![20, 10]);
    }

    #[actix_web::test]
    async fn cycle_is_reported() {
        let fx = Fixture::new();
        fx.designation(1, crate::model::designation::DesignationLevel::Manager, true, 0)
            .await;
        fx.employee(80, Some(81), 1, 4).await;
        fx.employee(81, Some(80), 1, 4).await;
        let mut tx = fx.store.begin().await.unwrap();
        let start = tx.employee(80).await.unwrap().unwrap();

        let err = chain(tx.as_mut(), &start, 3).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::HierarchyCycle {
                employee_id: 80,
                repeated_id: 80
            }
        ));
    }

    #[actix_web::test]
    async fn dangling_manager_ends_chain() {
        let fx = Fixture::new();
        fx.designation(1, crate::model::designation::DesignationLevel::Officer, false, 0)
            .await;
        fx.employee(90, Some(999), 1, 1).await;
        let mut tx = fx.store.begin().await.unwrap();
        let start = tx.employee(90).await.unwrap().unwrap();

        assert!(chain(tx.as_mut(), &start, 3).await.unwrap().is_empty());
    }
}
