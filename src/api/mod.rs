use actix_web::ResponseError;
use tracing::{error, warn};

use crate::workflow::WorkflowError;

/// Test app with the protected API mounted under `/api` and the fixture's workflow.
#[cfg(test)]
macro_rules! test_service {
    ($fx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($crate::routes::testing::config()))
                .app_data(actix_web::web::Data::new($fx.workflow.clone()))
                .service(
                    actix_web::web::scope("/api")
                        .wrap(actix_web::middleware::from_fn(
                            $crate::auth::middleware::auth_middleware,
                        ))
                        .configure($crate::routes::api_routes),
                ),
        )
        .await
    };
}

pub mod approvals;
pub mod delegation;
pub mod leave_request;

/// Logs a failed workflow call at a level matching its status and hands the
/// error back for the response.
pub(crate) fn logged(action: &'static str, id: u64, e: WorkflowError) -> WorkflowError {
    if e.status_code().is_server_error() {
        error!(error = %e, id, action, "Workflow call failed");
    } else {
        warn!(error = %e, id, action, "Workflow call refused");
    }
    e
}
