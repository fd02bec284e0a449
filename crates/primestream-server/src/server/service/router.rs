use super::handler::{PrimeService, health, prime_factors, prime_numbers};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Builds the application router.
///
/// The two computations only answer `POST`; any other method on their paths
/// gets `405 Method Not Allowed`. Everything else is served from the public
/// directory.
pub fn build_router(service: PrimeService) -> Router {
    let public = ServeDir::new(&service.config().public_dir);

    Router::new()
        .route("/primefactors", post(prime_factors))
        .route("/primenumbers", post(prime_numbers))
        .route("/healthz", get(health))
        .fallback_service(public)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
