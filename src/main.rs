mod call_filter;
mod call_types;
mod db_types;
mod error;
mod handlers;
mod openai_stream;
mod openai_types;
mod sse;
mod store;
mod twilio_types;
mod types;

use crate::types::AppState;

use axum::{
    routing::{get, patch, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let subscriber = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_file(true)
                .with_line_number(true),
        )
        .with(tracing_subscriber::filter::Targets::new().with_targets([
            ("hyper", tracing_subscriber::filter::LevelFilter::OFF),
            ("calldesk_rs", tracing_subscriber::filter::LevelFilter::DEBUG),
        ]));
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let openai_api_key = env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set!");
    let twilio_account_sid = env::var("TWILIO_ACCOUNT_SID").expect("TWILIO_ACCOUNT_SID not set!");
    let twilio_auth_token = env::var("TWILIO_AUTH_TOKEN").expect("TWILIO_AUTH_TOKEN not set!");
    let twilio_phone_number =
        env::var("TWILIO_PHONE_NUMBER").expect("TWILIO_PHONE_NUMBER not set!");
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL not set!");

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("failed to connect to database");
    sqlx::migrate!()
        .run(&db_pool)
        .await
        .expect("failed to run migrations");
    let http_client = reqwest::Client::new();

    let app_state = Arc::new(AppState {
        openai_api_key,
        twilio_account_sid,
        twilio_auth_token,
        twilio_phone_number,
        http_client,
        db_pool,
    });

    let app = Router::new()
        .route("/twilio/twiml/voice", post(handlers::twiml_voice))
        .route("/twilio/status", post(handlers::twilio_status))
        .route("/twilio/transcription", post(handlers::twilio_transcription))
        .route(
            "/calls",
            get(handlers::list_calls).delete(handlers::cleanup_calls),
        )
        .route("/calls/history", get(handlers::call_history))
        .route("/calls/import", post(handlers::import_calls))
        .route("/calls/:id", patch(handlers::update_call))
        .route("/calls/:id/toggle", post(handlers::toggle_call))
        .route("/sms", post(handlers::send_sms))
        .route("/suggest-message", post(handlers::suggest_message))
        .route(
            "/suggest-message/stream",
            post(handlers::suggest_message_stream),
        )
        .route("/", get(|| async { "calldesk" }))
        .with_state(app_state);

    axum::Server::bind(&"0.0.0.0:3000".parse().unwrap())
        .serve(app.into_make_service())
        .await
        .unwrap();
}
