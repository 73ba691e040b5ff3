// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, questions, quiz, users},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, questions, quizzes, users, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new().route("/me", get(auth::get_me)).layer(
                middleware::from_fn_with_state(state.clone(), auth_middleware),
            ),
        );

    // Question bank is public, read-only.
    let question_routes = Router::new()
        .route("/", get(questions::list_questions))
        .route("/types", get(questions::list_types))
        .route("/categories", get(questions::list_categories))
        .route("/count/{categoryId}", get(questions::get_question_count));

    let quiz_routes = Router::new()
        .route("/start", post(quiz::start_quiz))
        .route("/{id}/submit", post(quiz::submit_quiz))
        .route("/history", get(quiz::get_history))
        .route("/result/{id}", get(quiz::get_result))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let user_routes = Router::new()
        .route("/leaderboard", get(users::get_leaderboard))
        .route(
            "/me",
            get(users::get_profile).put(users::update_profile),
        )
        .route("/update-password", put(users::update_password))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/types", post(admin::create_type))
        .route("/categories", post(admin::create_category))
        .route("/questions", post(admin::create_question))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/questions", question_routes)
        // `nest` does not match the bare trailing-slash form of its prefix,
        // so wire `GET /api/v1/questions/` explicitly.
        .route("/api/v1/questions/", get(questions::list_questions))
        .nest("/api/v1/quizzes", quiz_routes)
        .nest("/api/v1/users", user_routes)
        .nest("/api/v1/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
