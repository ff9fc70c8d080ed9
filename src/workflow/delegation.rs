//! Delegation registry: time-bounded grants of one employee's approval
//! authority to another.
//!
//! Windows are inclusive on both ends. `used_approvals` only grows and
//! `is_active` only flips from true to false on its own; both are written under
//! the row lock of the surrounding transaction.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;

use super::{ApprovalWorkflow, error::WorkflowError};
use crate::model::delegation::{ApprovalDelegation, DelegationPatch, DelegationType, NewDelegation};
use crate::store::WorkflowTx;

/// Active, inside its window, and with uses left.
pub fn is_usable(delegation: &ApprovalDelegation, as_of: NaiveDate) -> bool {
    delegation.is_active
        && delegation.start_date <= as_of
        && as_of <= delegation.end_date
        && (delegation.is_reusable || delegation.used_approvals < 1)
        && delegation
            .max_approvals
            .is_none_or(|max| delegation.used_approvals < max)
}

pub fn overlaps(delegation: &ApprovalDelegation, start: NaiveDate, end: NaiveDate) -> bool {
    delegation.start_date <= end && start <= delegation.end_date
}

fn is_exhausted(delegation: &ApprovalDelegation) -> bool {
    (!delegation.is_reusable && delegation.used_approvals >= 1)
        || delegation
            .max_approvals
            .is_some_and(|max| delegation.used_approvals >= max)
}

fn most_recent(candidates: Vec<ApprovalDelegation>) -> Option<ApprovalDelegation> {
    candidates
        .into_iter()
        .max_by_key(|d| (d.created_at, d.id))
}

fn validate_window(start: NaiveDate, end: NaiveDate) -> Result<(), WorkflowError> {
    if start >= end {
        return Err(WorkflowError::conflict(
            "delegation end_date must be after start_date",
        ));
    }
    Ok(())
}

fn validate_cap(max_approvals: Option<u32>, used_approvals: u32) -> Result<(), WorkflowError> {
    match max_approvals {
        Some(0) => Err(WorkflowError::conflict("max_approvals must be at least 1")),
        Some(max) if max < used_approvals => Err(WorkflowError::conflict(format!(
            "max_approvals {max} is below the {used_approvals} approvals already used"
        ))),
        _ => Ok(()),
    }
}

/// Active delegations for the same (delegator, delegatee, type) whose window
/// meets `[start, end]`, excluding `exclude_id`.
pub async fn find_overlapping(
    tx: &mut dyn WorkflowTx,
    delegator_id: u64,
    delegatee_id: u64,
    delegation_type: DelegationType,
    start: NaiveDate,
    end: NaiveDate,
    exclude_id: Option<u64>,
) -> Result<Vec<ApprovalDelegation>, WorkflowError> {
    let candidates = tx.lock_delegations_from(delegator_id, delegation_type).await?;
    Ok(candidates
        .into_iter()
        .filter(|d| d.delegatee_id == delegatee_id && d.is_active)
        .filter(|d| Some(d.id) != exclude_id)
        .filter(|d| overlaps(d, start, end))
        .collect())
}

pub async fn create(
    tx: &mut dyn WorkflowTx,
    new: &NewDelegation,
    created_by: Option<u64>,
    now: DateTime<Utc>,
) -> Result<ApprovalDelegation, WorkflowError> {
    if new.delegator_id == new.delegatee_id {
        return Err(WorkflowError::conflict(
            "an employee cannot delegate to themselves",
        ));
    }
    validate_window(new.start_date, new.end_date)?;
    validate_cap(new.max_approvals, 0)?;

    for employee_id in [new.delegator_id, new.delegatee_id] {
        let employee = tx
            .employee(employee_id)
            .await?
            .ok_or(WorkflowError::NotFound {
                entity: "employee",
                id: employee_id,
            })?;
        if employee.branch_id != new.branch_id {
            return Err(WorkflowError::conflict(format!(
                "employee {employee_id} does not belong to branch {}",
                new.branch_id
            )));
        }
    }

    let clashes = find_overlapping(
        tx,
        new.delegator_id,
        new.delegatee_id,
        new.delegation_type,
        new.start_date,
        new.end_date,
        None,
    )
    .await?;
    if let Some(existing) = clashes.first() {
        return Err(WorkflowError::conflict(format!(
            "delegation {} already covers an overlapping period",
            existing.id
        )));
    }

    let delegation = tx.insert_delegation(new, created_by, now).await?;
    info!(
        delegation_id = delegation.id,
        delegator_id = delegation.delegator_id,
        delegatee_id = delegation.delegatee_id,
        delegation_type = %delegation.delegation_type,
        "Delegation created"
    );
    Ok(delegation)
}

pub async fn update(
    tx: &mut dyn WorkflowTx,
    id: u64,
    patch: &DelegationPatch,
    now: DateTime<Utc>,
) -> Result<ApprovalDelegation, WorkflowError> {
    let mut delegation = tx.lock_delegation(id).await?.ok_or(WorkflowError::NotFound {
        entity: "delegation",
        id,
    })?;
    if !delegation.is_active {
        return Err(WorkflowError::conflict(format!(
            "delegation {id} is no longer active"
        )));
    }

    if let Some(start) = patch.start_date {
        delegation.start_date = start;
    }
    if let Some(end) = patch.end_date {
        delegation.end_date = end;
    }
    if let Some(reason) = &patch.reason {
        delegation.reason = Some(reason.clone());
    }
    if let Some(reusable) = patch.is_reusable {
        delegation.is_reusable = reusable;
    }
    if let Some(max_approvals) = patch.max_approvals {
        delegation.max_approvals = max_approvals;
    }

    validate_window(delegation.start_date, delegation.end_date)?;
    validate_cap(delegation.max_approvals, delegation.used_approvals)?;

    let clashes = find_overlapping(
        tx,
        delegation.delegator_id,
        delegation.delegatee_id,
        delegation.delegation_type,
        delegation.start_date,
        delegation.end_date,
        Some(id),
    )
    .await?;
    if let Some(existing) = clashes.first() {
        return Err(WorkflowError::conflict(format!(
            "delegation {} already covers an overlapping period",
            existing.id
        )));
    }

    if is_exhausted(&delegation) {
        delegation.is_active = false;
    }
    delegation.updated_at = now;
    tx.update_delegation(&delegation).await?;
    Ok(delegation)
}

pub async fn deactivate(
    tx: &mut dyn WorkflowTx,
    id: u64,
    now: DateTime<Utc>,
) -> Result<ApprovalDelegation, WorkflowError> {
    let mut delegation = tx.lock_delegation(id).await?.ok_or(WorkflowError::NotFound {
        entity: "delegation",
        id,
    })?;
    if delegation.is_active {
        delegation.is_active = false;
        delegation.updated_at = now;
        tx.update_delegation(&delegation).await?;
        info!(delegation_id = id, "Delegation deactivated");
    }
    Ok(delegation)
}

/// The most recently created usable delegation granted by `delegator_id`.
pub async fn find_active(
    tx: &mut dyn WorkflowTx,
    delegator_id: u64,
    delegation_type: DelegationType,
    as_of: NaiveDate,
) -> Result<Option<ApprovalDelegation>, WorkflowError> {
    let candidates = tx.lock_delegations_from(delegator_id, delegation_type).await?;
    Ok(most_recent(
        candidates.into_iter().filter(|d| is_usable(d, as_of)).collect(),
    ))
}

/// Like [`find_active`], restricted to grants held by `delegatee_id`.
pub async fn find_active_to(
    tx: &mut dyn WorkflowTx,
    delegator_id: u64,
    delegatee_id: u64,
    delegation_type: DelegationType,
    as_of: NaiveDate,
) -> Result<Option<ApprovalDelegation>, WorkflowError> {
    let candidates = tx.lock_delegations_from(delegator_id, delegation_type).await?;
    Ok(most_recent(
        candidates
            .into_iter()
            .filter(|d| d.delegatee_id == delegatee_id && is_usable(d, as_of))
            .collect(),
    ))
}

/// Records one use. Must run in the transaction of the write it authorizes.
pub async fn consume(
    tx: &mut dyn WorkflowTx,
    id: u64,
    now: DateTime<Utc>,
) -> Result<ApprovalDelegation, WorkflowError> {
    let mut delegation = tx.lock_delegation(id).await?.ok_or(WorkflowError::NotFound {
        entity: "delegation",
        id,
    })?;
    if !delegation.is_active || is_exhausted(&delegation) {
        return Err(WorkflowError::conflict(format!(
            "delegation {id} has no approvals left"
        )));
    }

    delegation.used_approvals += 1;
    if is_exhausted(&delegation) {
        delegation.is_active = false;
    }
    delegation.updated_at = now;
    tx.update_delegation(&delegation).await?;

    info!(
        delegation_id = id,
        used_approvals = delegation.used_approvals,
        still_active = delegation.is_active,
        "Delegation consumed"
    );
    Ok(delegation)
}

/// Employees whose leave approvals `delegatee_id` may currently act on.
pub async fn delegators_for(
    tx: &mut dyn WorkflowTx,
    delegatee_id: u64,
    as_of: NaiveDate,
) -> Result<Vec<u64>, WorkflowError> {
    let mut delegators: Vec<u64> = tx
        .delegations_to(delegatee_id)
        .await?
        .into_iter()
        .filter(|d| d.delegation_type == DelegationType::LeaveApproval && is_usable(d, as_of))
        .map(|d| d.delegator_id)
        .collect();
    delegators.sort_unstable();
    delegators.dedup();
    Ok(delegators)
}

fn current_or_upcoming(delegations: Vec<ApprovalDelegation>, today: NaiveDate) -> Vec<ApprovalDelegation> {
    delegations
        .into_iter()
        .filter(|d| d.is_active && d.end_date >= today)
        .collect()
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct OverlapQuery {
    /// Delegating employee
    pub delegator_id: u64,
    /// Receiving employee
    pub delegatee_id: u64,
    /// Approval type, e.g. `leave_approval`
    #[param(value_type = String)]
    pub delegation_type: DelegationType,
    /// Window start (inclusive)
    #[param(value_type = String)]
    pub start_date: NaiveDate,
    /// Window end (inclusive)
    #[param(value_type = String)]
    pub end_date: NaiveDate,
    /// Delegation to leave out, when checking an edit
    pub exclude_id: Option<u64>,
}

impl ApprovalWorkflow {
    pub async fn create_delegation(
        &self,
        new: &NewDelegation,
        created_by: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<ApprovalDelegation, WorkflowError> {
        let mut tx = self.store.begin().await?;
        let delegation = create(tx.as_mut(), new, created_by, now).await?;
        tx.commit().await?;
        Ok(delegation)
    }

    pub async fn update_delegation(
        &self,
        id: u64,
        patch: &DelegationPatch,
        now: DateTime<Utc>,
    ) -> Result<ApprovalDelegation, WorkflowError> {
        let mut tx = self.store.begin().await?;
        let delegation = update(tx.as_mut(), id, patch, now).await?;
        tx.commit().await?;
        Ok(delegation)
    }

    pub async fn deactivate_delegation(
        &self,
        id: u64,
        now: DateTime<Utc>,
    ) -> Result<ApprovalDelegation, WorkflowError> {
        let mut tx = self.store.begin().await?;
        let delegation = deactivate(tx.as_mut(), id, now).await?;
        tx.commit().await?;
        Ok(delegation)
    }

    pub async fn delegation(&self, id: u64) -> Result<ApprovalDelegation, WorkflowError> {
        let mut tx = self.store.begin().await?;
        let delegation = tx.delegation(id).await?.ok_or(WorkflowError::NotFound {
            entity: "delegation",
            id,
        })?;
        tx.commit().await?;
        Ok(delegation)
    }

    /// Who is covering for `delegator_id` today, if anyone.
    pub async fn current_delegation(
        &self,
        delegator_id: u64,
        delegation_type: DelegationType,
        now: DateTime<Utc>,
    ) -> Result<Option<ApprovalDelegation>, WorkflowError> {
        let mut tx = self.store.begin().await?;
        let found = find_active(tx.as_mut(), delegator_id, delegation_type, now.date_naive()).await?;
        tx.commit().await?;
        Ok(found)
    }

    pub async fn overlapping_delegations(
        &self,
        query: &OverlapQuery,
    ) -> Result<Vec<ApprovalDelegation>, WorkflowError> {
        let mut tx = self.store.begin().await?;
        let found = find_overlapping(
            tx.as_mut(),
            query.delegator_id,
            query.delegatee_id,
            query.delegation_type,
            query.start_date,
            query.end_date,
            query.exclude_id,
        )
        .await?;
        tx.commit().await?;
        Ok(found)
    }

    pub async fn active_delegations_for_delegator(
        &self,
        delegator_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<ApprovalDelegation>, WorkflowError> {
        let mut tx = self.store.begin().await?;
        let found = tx.delegations_from(delegator_id).await?;
        tx.commit().await?;
        Ok(current_or_upcoming(found, now.date_naive()))
    }

    pub async fn active_delegations_for_delegatee(
        &self,
        delegatee_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<ApprovalDelegation>, WorkflowError> {
        let mut tx = self.store.begin().await?;
        let found = tx.delegations_to(delegatee_id).await?;
        tx.commit().await?;
        Ok(current_or_upcoming(found, now.date_naive()))
    }
}
