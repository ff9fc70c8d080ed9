//! Multi-level leave approval workflow.
//!
//! [`ApprovalWorkflow`] is the only writer of a leave request's approval state.
//! Each public operation runs inside one store transaction and either commits
//! as a whole or leaves nothing behind.

use std::sync::Arc;

use crate::store::WorkflowStore;

pub mod auto_approval;
pub mod calendar;
pub mod controller;
pub mod delegation;
pub mod error;
pub mod hierarchy;
pub mod plan;

#[cfg(test)]
pub mod testing;

pub use calendar::BusinessCalendar;
pub use error::WorkflowError;

#[derive(Clone)]
pub struct ApprovalWorkflow {
    store: Arc<dyn WorkflowStore>,
    calendar: BusinessCalendar,
}

impl ApprovalWorkflow {
    pub fn new(store: Arc<dyn WorkflowStore>, calendar: BusinessCalendar) -> Self {
        Self { store, calendar }
    }

    pub fn calendar(&self) -> &BusinessCalendar {
        &self.calendar
    }
}
