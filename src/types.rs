use sqlx::{Pool, Postgres};

pub struct AppState {
    pub openai_api_key: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
    pub http_client: reqwest::Client,
    pub db_pool: Pool<Postgres>,
}
