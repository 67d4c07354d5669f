pub mod records;
pub mod signatories;
pub mod subscriptions;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
};

use crate::db::AppState;
use crate::middleware::user_auth;

pub fn router(state: AppState) -> Router<AppState> {
    // Stripe proxy
    let subscription_routes = Router::new()
        .route("/api/subscription/v1/checkout-session", post(subscriptions::create_checkout_session))
        .route("/api/subscription/v1/subscriptions", post(subscriptions::create_subscription))
        .route("/api/subscription/v1/subscriptions/{id}", get(subscriptions::get_subscription))
        .route("/api/subscription/v1/payments", post(subscriptions::create_payment))
        .route("/api/subscription/v1/payments/{id}/status", get(subscriptions::payment_status))
        .route(
            "/api/subscription/v1/payment-links/{product_id}/{price_id}",
            post(subscriptions::create_payment_link),
        )
        .route("/api/subscription/v1/payment-links/{id}", get(subscriptions::get_payment_link))
        .route(
            "/api/subscription/v1/payment-links/{id}/summary",
            get(subscriptions::payment_link_summary),
        );

    // Contribution records
    let record_routes = Router::new()
        .route("/api/record/v1", get(records::list_records))
        .route("/api/record/v1/", get(records::list_records))
        .route("/api/record/v1/s", post(records::create_record))
        .route("/api/record/v1/validate", get(records::validate_batch))
        .route("/api/record/v1/pdf", get(records::generate_pdf))
        .route("/api/record/v1/batch/delete", delete(records::delete_batch))
        .route(
            "/api/record/v1/upload",
            post(records::upload_batch).layer(DefaultBodyLimit::max(state.max_upload_bytes)),
        )
        .route("/api/record/v1/{id}", get(records::get_record).delete(records::delete_record))
        .route("/api/record/v1/{id}/sbr", put(records::update_sbr));

    let account_routes = Router::new()
        .route(
            "/api/signatories/v1",
            get(signatories::get_signatories).put(signatories::update_signatories),
        )
        .route("/api/user/v1", get(users::profile));

    Router::new()
        .merge(subscription_routes)
        .merge(record_routes)
        .merge(account_routes)
        .layer(middleware::from_fn_with_state(state, user_auth))
        .route("/health", get(|| async { "ok" }))
}
