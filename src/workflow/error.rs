use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Every failure is final for the caller: fix the input, the hierarchy or the
/// delegation and try again. Nothing here is retryable as-is.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("no approver could be assigned to leave request of employee {employee_id}")]
    Unassignable { employee_id: u64 },

    #[error("reporting chain of employee {employee_id} loops back to employee {repeated_id}")]
    HierarchyCycle { employee_id: u64, repeated_id: u64 },

    #[error("leave request {leave_request_id} has no pending level after level {level}")]
    PlanExhausted { leave_request_id: u64, level: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    pub fn conflict(message: impl Into<String>) -> Self {
        WorkflowError::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        WorkflowError::Forbidden(message.into())
    }
}

impl ResponseError for WorkflowError {
    fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
            WorkflowError::Conflict(_) => StatusCode::CONFLICT,
            WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
            WorkflowError::Unassignable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::HierarchyCycle { .. }
            | WorkflowError::PlanExhausted { .. }
            | WorkflowError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            WorkflowError::Store(_) => "Internal Server Error".to_string(),
            WorkflowError::HierarchyCycle { .. } | WorkflowError::PlanExhausted { .. } => {
                "Approval configuration error, contact with system admin".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_http_status() {
        let not_found = WorkflowError::NotFound {
            entity: "leave request",
            id: 7,
        };
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.to_string(), "leave request 7 not found");
        assert_eq!(
            WorkflowError::conflict("x").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            WorkflowError::forbidden("x").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            WorkflowError::Unassignable { employee_id: 1 }.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            WorkflowError::PlanExhausted {
                leave_request_id: 1,
                level: 2
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
