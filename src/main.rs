mod database;
mod error;
mod handlers;
mod middleware;
mod models;
mod utils;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use dotenvy::dotenv;
use std::env;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use database::{create_database_pool, Database};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = create_database_pool(&database_url)
        .await
        .expect("Failed to connect to database");

    log::info!("database connection established");

    let app = create_router(db);

    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{}", port);

    log::info!("atithi server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

fn create_router(db: Database) -> Router {
    Router::new()
        // Auth (login/register/refresh are the only unauthenticated routes)
        .route("/users/login", post(handlers::auth::login))
        .route("/users/register", post(handlers::auth::register))
        .route("/users/refresh", post(handlers::auth::refresh))
        .route("/users/validateToken", get(handlers::auth::validate_token))
        .route("/users/caretaker", post(handlers::auth::create_caretaker))
        // Bookings
        .route(
            "/api/bookings",
            get(handlers::bookings::list_bookings).post(handlers::bookings::create_booking),
        )
        .route(
            "/api/bookings/bulk-delete",
            post(handlers::bookings::bulk_delete_bookings),
        )
        .route(
            "/api/bookings/:id",
            get(handlers::bookings::get_booking)
                .put(handlers::bookings::update_booking)
                .delete(handlers::bookings::delete_booking),
        )
        .route(
            "/api/bookings/:id/confirm",
            post(handlers::bookings::confirm_booking),
        )
        .route(
            "/api/bookings/:id/cancel",
            post(handlers::bookings::cancel_booking),
        )
        // Bills
        .route("/api/bills/generate/:id", post(handlers::bills::generate_bill))
        .route(
            "/api/bills/booking/:id",
            get(handlers::bills::get_bill_by_booking),
        )
        // Customer masters
        .route(
            "/api/customers",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route(
            "/api/customers/:id",
            get(handlers::customers::get_customer)
                .put(handlers::customers::update_customer)
                .delete(handlers::customers::delete_customer),
        )
        // Expenses
        .route(
            "/api/expenses",
            get(handlers::expenses::list_expenses).post(handlers::expenses::create_expense),
        )
        .route(
            "/api/expenses/:id",
            get(handlers::expenses::get_expense)
                .put(handlers::expenses::update_expense)
                .delete(handlers::expenses::delete_expense),
        )
        // Property revenues
        .route(
            "/api/property-revenues",
            get(handlers::revenues::list_revenues).post(handlers::revenues::create_revenue),
        )
        .route(
            "/api/property-revenues/:id",
            put(handlers::revenues::update_revenue).delete(handlers::revenues::delete_revenue),
        )
        // Bank accounts & ledger
        .route(
            "/api/bank-accounts",
            get(handlers::banks::list_accounts).post(handlers::banks::create_account),
        )
        .route(
            "/api/bank-accounts/:id",
            get(handlers::banks::get_account).delete(handlers::banks::deactivate_account),
        )
        .route(
            "/api/bank-accounts/:id/transactions",
            get(handlers::banks::list_transactions),
        )
        // Properties
        .route(
            "/properties",
            get(handlers::properties::list_properties).post(handlers::properties::create_property),
        )
        .route(
            "/properties/:id",
            get(handlers::properties::get_property).put(handlers::properties::update_property),
        )
        // User administration & profile
        .route("/api/users", get(handlers::users::list_users))
        .route(
            "/api/users/:id",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route("/api/users/:id/lock", post(handlers::users::lock_user))
        .route("/api/users/:id/unlock", post(handlers::users::unlock_user))
        .route(
            "/api/profile",
            get(handlers::users::get_profile).put(handlers::users::update_profile),
        )
        // Dashboard
        .route("/api/dashboard", get(handlers::dashboard))
        // Receipt images
        .nest_service("/static", ServeDir::new("static"))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(10 * 1024 * 1024)), // 10MB
        )
        .with_state(db)
}
