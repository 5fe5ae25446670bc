use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::get,
};
use carebridge_auth::{Authenticator, auth_routes};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::metrics::{metrics_handler, track_http};
use crate::routes::health::healthz;
use crate::routes::patients::{PatientState, create_patient, list_patients};

/// Router of the auth service: `/login`, `/validate`, `/healthz`, `/metrics`.
pub fn build_auth_app(authenticator: Arc<Authenticator>) -> Router {
    with_layers(auth_routes(authenticator).merge(system_routes()))
}

/// Router of the patient service: `/patients`, `/healthz`, `/metrics`.
pub fn build_patient_app(state: PatientState) -> Router {
    let patients = Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .with_state(state);

    with_layers(patients.merge(system_routes()))
}

fn system_routes() -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
}

fn with_layers(router: Router) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(
                TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                    )
                }),
            )
            .layer(middleware::from_fn(track_http)),
    )
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
