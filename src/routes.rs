//! Route table.
//!
//! Public routes need no API key: health, signup, property browsing, the pricing
//! preview, feature flags and provider webhooks. Everything else runs behind
//! [`auth_middleware`].

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{get, patch, post, put},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    config::Config,
    handlers::{
        bookings, consent, dashboard, feature_flags, health, payments, payouts, properties,
        uploads, users, verifications,
    },
    middleware::auth::auth_middleware,
    state::AppState,
};

fn cors_layer(config: &Config) -> CorsLayer {
    let origin = match config
        .cors_origin
        .as_deref()
        .and_then(|origin| HeaderValue::from_str(origin).ok())
    {
        Some(origin) => AllowOrigin::exact(origin),
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/users", post(users::create_user))
        .route("/api/properties", get(properties::list_properties))
        .route("/api/properties/{id}", get(properties::get_property))
        .route("/api/pricing/breakdown", post(bookings::pricing_breakdown))
        .route("/api/feature-flags", get(feature_flags::list_feature_flags))
        .route("/api/payments/webhooks/chapa", post(payments::chapa_webhook))
        .route("/api/payments/webhooks/stripe", post(payments::stripe_webhook))
        .route(
            "/api/payments/webhooks/arifpay",
            post(payments::arifpay_webhook),
        );

    let authenticated_routes = Router::new()
        // Users
        .route("/api/users/me", get(users::get_me))
        .route(
            "/api/users/me/payout-account",
            put(users::set_payout_account),
        )
        // Properties
        .route("/api/properties", post(properties::create_property))
        .route("/api/host/properties", get(properties::list_host_properties))
        // Bookings
        .route(
            "/api/bookings",
            post(bookings::create_booking).get(bookings::list_my_bookings),
        )
        .route("/api/bookings/{id}", get(bookings::get_booking))
        .route(
            "/api/bookings/{id}/status",
            patch(bookings::update_booking_status),
        )
        .route("/api/host/bookings", get(bookings::list_host_bookings))
        .route("/api/host/dashboard", get(dashboard::host_dashboard))
        // Alga Pay
        .route(
            "/api/payments/alga-pay",
            post(payments::create_alga_pay_checkout),
        )
        .route(
            "/api/payments/alga-pay/verify/{tx_ref}",
            get(payments::verify_alga_pay),
        )
        // Payouts
        .route("/api/payouts", get(payouts::list_my_payouts))
        .route("/api/admin/payouts/run", post(payouts::run_payouts))
        // Consent and flags
        .route(
            "/api/consent",
            post(consent::record_consent).get(consent::latest_consents),
        )
        .route(
            "/api/admin/feature-flags/{name}",
            put(feature_flags::upsert_feature_flag),
        )
        // Uploads read their own bounded body
        .route(
            "/api/uploads",
            post(uploads::upload_image).layer(DefaultBodyLimit::disable()),
        )
        // Verifications
        .route(
            "/api/verifications",
            post(verifications::submit_verification),
        )
        .route("/api/verifications/me", get(verifications::my_verification))
        .route(
            "/api/admin/verifications/{id}",
            patch(verifications::review_verification),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
