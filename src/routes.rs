use crate::{
    api::{approvals, delegation, leave_request},
    auth::middleware::auth_middleware,
};
use anyhow::Context;
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Built once and shared by all workers.
pub fn build_limiter(requests_per_min: u32) -> anyhow::Result<Limiter> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .context("RATE_PROTECTED_PER_MIN must be greater than zero")?;
    Ok(Arc::new(Governor::new(&cfg)))
}

pub fn configure(cfg: &mut web::ServiceConfig, api_prefix: &str, limiter: Limiter) {
    // Protected routes
    cfg.service(
        web::scope(api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiter) // rate limiting
            .configure(api_routes),
    );
}

pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/leave")
            // /leave
            .service(web::resource("").route(web::post().to(leave_request::submit_leave)))
            // /leave/{id}
            .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
            .service(
                web::resource("/{id}/initialize")
                    .route(web::post().to(leave_request::initialize_leave)),
            )
            .service(
                web::resource("/{id}/approve").route(web::put().to(leave_request::approve_leave)),
            )
            .service(
                web::resource("/{id}/reject").route(web::put().to(leave_request::reject_leave)),
            )
            .service(
                web::resource("/{id}/cancel").route(web::put().to(leave_request::cancel_leave)),
            )
            .service(
                web::resource("/{id}/approvals")
                    .route(web::get().to(leave_request::approval_history)),
            ),
    )
    .service(
        web::scope("/approvals")
            .service(web::resource("/pending").route(web::get().to(approvals::pending_approvals)))
            .service(
                web::resource("/activity/today").route(web::get().to(approvals::todays_activity)),
            ),
    )
    .service(
        web::scope("/delegations")
            // /delegations
            .service(web::resource("").route(web::post().to(delegation::create_delegation)))
            // registered before /{id} so the literal segment wins
            .service(
                web::resource("/overlapping")
                    .route(web::get().to(delegation::overlapping_delegations)),
            )
            .service(
                web::resource("/delegator/{id}")
                    .route(web::get().to(delegation::delegations_given)),
            )
            .service(
                web::resource("/delegator/{id}/current")
                    .route(web::get().to(delegation::current_delegation)),
            )
            .service(
                web::resource("/delegatee/{id}").route(web::get().to(delegation::delegations_held)),
            )
            // /delegations/{id}
            .service(
                web::resource("/{id}")
                    .route(web::get().to(delegation::get_delegation))
                    .route(web::put().to(delegation::update_delegation)),
            )
            .service(
                web::resource("/{id}/deactivate")
                    .route(web::put().to(delegation::deactivate_delegation)),
            ),
    );
}

#[cfg(test)]
pub mod testing {
    use chrono::Weekday;

    use crate::auth::jwt::testing::SECRET;
    use crate::config::Config;

    pub fn config() -> Config {
        Config {
            database_url: "mysql://unused".to_string(),
            jwt_secret: SECRET.to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            log_dir: "logs".to_string(),
            weekend_days: vec![Weekday::Sat, Weekday::Sun],
        }
    }
}
