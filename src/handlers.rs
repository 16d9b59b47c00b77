use crate::call_filter::{filter_calls, priority_sort, CallFilter};
use crate::call_types::{CallDocument, CallRecord, CallStatus, CallUpdate};
use crate::error::AppError;
use crate::openai_stream::CompletionStream;
use crate::openai_types::{
    OpenAIBatchResponse, OpenAIMessage, OpenAIPayload, OPENAI_CHAT_COMPLETIONS_URL,
};
use crate::store;
use crate::twilio_types::{
    wrap_twiml, HangupAction, RecordAction, Response, ResponseAction, SayAction,
    TwilioMessageResponse, TwilioStatusPayload, TwilioTranscriptionPayload, TwilioVoicePayload,
};
use crate::types::AppState;

use axum::body::StreamBody;
use axum::extract::{Host, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use futures_util::stream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

const VOICEMAIL_GREETING: &str =
    "Thank you for calling. We can't take your call right now. \
     Please leave a message after the beep and we will get back to you.";

// ---------------------------------------------------------------------------
// Twilio webhooks

/// Inbound-voice webhook: materialize a pending record and answer with TwiML
/// that takes a voicemail with async transcription.
pub async fn twiml_voice(
    Host(host): Host,
    State(app_state): State<Arc<AppState>>,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    trace!(body=%body, "voice webhook body");
    let payload = serde_urlencoded::from_str::<TwilioVoicePayload>(&body).map_err(|e| {
        error!(error=%e, "failed to deserialize Twilio voice payload");
        AppError::Parse("bad voice webhook body".to_string())
    })?;

    let record = store::new_inbound_call(&payload.account_sid, &payload.from);
    store::insert_call(&app_state.db_pool, &record, Some(&payload.call_sid)).await?;
    debug!(call_sid=%payload.call_sid, from=%payload.from, "recorded inbound call");

    let say_action = SayAction {
        text: VOICEMAIL_GREETING.to_string(),
        ..Default::default()
    };
    let record_action = RecordAction {
        max_length: Some(120),
        play_beep: Some("true".to_string()),
        transcribe: Some("true".to_string()),
        transcribe_callback: Some(format!("https://{host}/twilio/transcription")),
    };
    let response = Response {
        actions: vec![
            ResponseAction::Say(say_action),
            ResponseAction::Record(record_action),
            ResponseAction::Hangup(HangupAction::default()),
        ],
    };

    let twiml = wrap_twiml(xmlserde::xml_serialize(response));
    trace!("twiml: '{}'", twiml);

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, "application/xml".parse().unwrap());
    Ok((StatusCode::OK, headers, twiml))
}

/// Call-status callback: record the connected duration; busy/failed/no-answer
/// calls get the legacy missed tag.
pub async fn twilio_status(
    State(app_state): State<Arc<AppState>>,
    body: String,
) -> Result<StatusCode, AppError> {
    let payload = serde_urlencoded::from_str::<TwilioStatusPayload>(&body).map_err(|e| {
        error!(error=%e, "failed to deserialize Twilio status payload");
        AppError::Parse("bad status callback body".to_string())
    })?;

    if let Some(raw) = &payload.call_duration {
        match raw.parse::<u32>() {
            Ok(seconds) => {
                store::set_duration(&app_state.db_pool, &payload.call_sid, seconds).await?
            }
            // degrade by omission; a junk duration never fails the callback
            Err(e) => warn!(error=%e, duration=%raw, "ignoring un-parseable call duration"),
        }
    }
    use crate::twilio_types::CallStatus as TwilioCallStatus;
    if matches!(
        payload.call_status,
        TwilioCallStatus::Busy | TwilioCallStatus::Failed | TwilioCallStatus::NoAnswer
    ) {
        store::mark_missed(&app_state.db_pool, &payload.call_sid).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Async transcription callback fired once Twilio has processed a voicemail.
pub async fn twilio_transcription(
    State(app_state): State<Arc<AppState>>,
    body: String,
) -> Result<StatusCode, AppError> {
    let payload = serde_urlencoded::from_str::<TwilioTranscriptionPayload>(&body).map_err(|e| {
        error!(error=%e, "failed to deserialize Twilio transcription payload");
        AppError::Parse("bad transcription callback body".to_string())
    })?;

    match (payload.transcription_status.as_str(), payload.transcription_text) {
        ("completed", Some(text)) => {
            store::set_transcription(&app_state.db_pool, &payload.call_sid, &text).await?;
            debug!(call_sid=%payload.call_sid, "stored voicemail transcription");
        }
        (status, _) => {
            warn!(call_sid=%payload.call_sid, status=%status, "transcription unavailable");
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Call browsing and mutation

#[derive(Deserialize, Debug)]
pub struct CallListQuery {
    pub owner_id: String,
    pub search_term: Option<String>,
    /// Comma-separated status tags.
    pub statuses: Option<String>,
    /// YYYY-MM-DD, inclusive, interpreted in UTC.
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

fn parse_query_date(raw: &str) -> Result<Date, AppError> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(raw, &format)
        .map_err(|e| AppError::Parse(format!("bad date '{raw}' in query: {e}")))
}

impl CallListQuery {
    fn filter(&self) -> Result<CallFilter, AppError> {
        let statuses = self
            .statuses
            .as_deref()
            .unwrap_or("")
            .split(',')
            .filter(|s| !s.is_empty())
            .map(|s| CallStatus::from(s.to_string()))
            .collect();
        let from_date = self.from_date.as_deref().map(parse_query_date).transpose()?;
        let to_date = self.to_date.as_deref().map(parse_query_date).transpose()?;

        Ok(CallFilter {
            search_term: self.search_term.clone(),
            statuses,
            from_date,
            to_date,
        })
    }
}

/// Filtered call list: fetch the owner's snapshot, then run the filter/sort
/// engine over it.
pub async fn list_calls(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<CallListQuery>,
) -> Result<Json<Vec<CallRecord>>, AppError> {
    let filter = query.filter()?;
    let calls = store::list_calls_for_owner(&app_state.db_pool, &query.owner_id).await?;

    Ok(Json(filter_calls(&calls, &filter)))
}

#[derive(Deserialize, Debug)]
pub struct OwnerQuery {
    pub owner_id: String,
}

/// Default call-history view: no user filters, priority ordering.
pub async fn call_history(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<CallRecord>>, AppError> {
    let mut calls = store::list_calls_for_owner(&app_state.db_pool, &query.owner_id).await?;
    priority_sort(&mut calls);

    Ok(Json(calls))
}

/// Partial merge update.  A callback date in the past is rejected at booking
/// time; already-stored dates are never re-validated.
pub async fn update_call(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(update): Json<CallUpdate>,
) -> Result<Json<CallRecord>, AppError> {
    if let Some(cb) = &update.scheduled_callback {
        if cb.date < OffsetDateTime::now_utc() {
            return Err(AppError::Data(
                "scheduled callback date is in the past".to_string(),
            ));
        }
    }
    let record = store::find_call(&app_state.db_pool, id).await?;
    let merged = update.apply(record);
    store::replace_call(&app_state.db_pool, &merged).await?;

    Ok(Json(merged))
}

/// The pending/urgent toggle.  Any other status is a silent no-op: the
/// unchanged record comes back.
pub async fn toggle_call(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CallRecord>, AppError> {
    let record = store::find_call(&app_state.db_pool, id).await?;
    match record.status.toggled() {
        Some(next) => {
            let updated = store::set_status(&app_state.db_pool, id, &next).await?;
            debug!(id=%id, status=%next, "toggled call status");
            Ok(Json(updated))
        }
        None => {
            debug!(id=%id, status=%record.status, "ignoring toggle on non-toggleable status");
            Ok(Json(record))
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ImportResponse {
    pub imported: usize,
    pub skipped: usize,
}

/// Bulk ingestion of raw documents.  Documents with un-coercible dates are
/// dropped and counted, never fatal.
pub async fn import_calls(
    State(app_state): State<Arc<AppState>>,
    Json(documents): Json<Vec<CallDocument>>,
) -> Result<Json<ImportResponse>, AppError> {
    let mut imported = 0;
    let mut skipped = 0;
    for doc in documents {
        match CallRecord::try_from(doc) {
            Ok(record) => {
                store::insert_call(&app_state.db_pool, &record, None).await?;
                imported += 1;
            }
            Err(e) => {
                warn!(error=%e, "skipping un-coercible call document");
                skipped += 1;
            }
        }
    }

    Ok(Json(ImportResponse { imported, skipped }))
}

#[derive(Serialize, Debug)]
pub struct CleanupResponse {
    pub deleted: u64,
}

/// Owner-initiated cleanup: removes every record for the owner.
pub async fn cleanup_calls(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<CleanupResponse>, AppError> {
    let deleted = store::delete_calls_for_owner(&app_state.db_pool, &query.owner_id).await?;
    debug!(owner_id=%query.owner_id, deleted=%deleted, "cleaned up call records");

    Ok(Json(CleanupResponse { deleted }))
}

// ---------------------------------------------------------------------------
// SMS dispatch

#[derive(Deserialize, Debug)]
pub struct SendSmsRequest {
    pub to: String,
    pub body: String,
}

#[derive(Serialize, Debug)]
pub struct SendSmsResponse {
    pub message_sid: String,
}

/// Dispatch one SMS through the Twilio Messages API.
pub async fn send_sms(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<SendSmsRequest>,
) -> Result<Json<SendSmsResponse>, AppError> {
    let account_sid = &app_state.twilio_account_sid;
    let url = format!("https://api.twilio.com/2010-04-01/Accounts/{account_sid}/Messages.json");
    let mut form = HashMap::new();
    form.insert("From", app_state.twilio_phone_number.clone());
    form.insert("To", request.to);
    form.insert("Body", request.body);
    let resp = app_state
        .http_client
        .post(url)
        .basic_auth(account_sid, Some(&app_state.twilio_auth_token))
        .form(&form)
        .send()
        .await
        .map_err(|e| {
            error!(error=%e, "failed to send sms request to twilio");
            AppError::Transport("failed to reach twilio".to_string())
        })?;
    let message = resp.json::<TwilioMessageResponse>().await.map_err(|e| {
        error!(error=%e, "failed to deserialize twilio message response");
        AppError::Parse("bad twilio message response".to_string())
    })?;
    debug!(sid=%message.sid, status=?message.status, "twilio accepted sms");

    Ok(Json(SendSmsResponse {
        message_sid: message.sid,
    }))
}

// ---------------------------------------------------------------------------
// AI message suggestions

#[derive(Deserialize, Debug)]
pub struct SuggestRequest {
    pub transcription: String,
    pub date: String,
    pub time: String,
}

#[derive(Serialize, Debug)]
pub struct SuggestResponse {
    pub suggestion: String,
}

fn suggestion_messages(request: &SuggestRequest) -> Vec<OpenAIMessage> {
    let prompt = format!(
        "Based on this call transcription: \"{}\"\n\n\
         Generate a professional and friendly SMS confirmation message for an \
         appointment scheduled for {} at {}.\n\
         The message should:\n\
         1. Be concise and clear\n\
         2. Include the date and time\n\
         3. Reference the key points from the conversation if relevant\n\
         4. Be friendly but professional\n\
         5. Not exceed 160 characters",
        request.transcription, request.date, request.time
    );

    vec![
        OpenAIMessage {
            role: "system".to_string(),
            content: "You are a professional assistant helping to generate SMS \
                      confirmation messages for appointments."
                .to_string(),
        },
        OpenAIMessage {
            role: "user".to_string(),
            content: prompt,
        },
    ]
}

fn suggestion_payload(request: &SuggestRequest) -> OpenAIPayload {
    OpenAIPayload {
        model: "gpt-4".to_string(),
        messages: suggestion_messages(request),
        temperature: Some(0.7),
        max_tokens: Some(100),
        ..Default::default()
    }
}

/// One-shot suggestion: single batch completion, trimmed suggestion back.
pub async fn suggest_message(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<SuggestRequest>,
) -> Result<Json<SuggestResponse>, AppError> {
    let payload = suggestion_payload(&request);
    let key = app_state.openai_api_key.as_str();
    let resp = app_state
        .http_client
        .post(OPENAI_CHAT_COMPLETIONS_URL)
        .header(reqwest::header::AUTHORIZATION, format!("Bearer {key}"))
        .json(&payload)
        .send()
        .await
        .map_err(|e| {
            error!(error=%e, "failed to send request to OpenAI");
            AppError::Transport("failed to reach OpenAI".to_string())
        })?;
    let suggestion = suggestion_from_response(resp).await?;

    Ok(Json(SuggestResponse { suggestion }))
}

/// Decode a batch completion response.  An upstream error status is a
/// transport failure; only a 2xx body gets parsed.
async fn suggestion_from_response(resp: reqwest::Response) -> Result<String, AppError> {
    let resp = resp.error_for_status().map_err(|e| {
        error!(error=%e, "OpenAI returned an error status");
        AppError::Transport("OpenAI returned an error status".to_string())
    })?;
    let resp = resp.json::<OpenAIBatchResponse>().await.map_err(|e| {
        error!(error=%e, "failed to deserialize openai suggestion response");
        AppError::Parse("bad OpenAI response".to_string())
    })?;
    resp.choices
        .first()
        .map(|c| c.message.content.trim().to_string())
        .ok_or_else(|| AppError::Parse("OpenAI response carried no choices".to_string()))
}

/// Streaming suggestion: the adapter runs in a spawned task; fragments flow
/// through a channel into the response body as they decode.
pub async fn suggest_message_stream(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<SuggestRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = suggestion_payload(&request);
    // max_tokens caps how much can ever queue here; a closed channel just
    // means the client went away
    let (fragment_sink, fragment_stream) = mpsc::unbounded_channel::<String>();
    let adapter = CompletionStream::new(payload)
        .on_data(move |fragment| {
            let _ = fragment_sink.send(fragment.to_string());
        })
        .on_end(|| debug!("suggestion stream complete"));

    let client = app_state.http_client.clone();
    let key = app_state.openai_api_key.clone();
    tokio::spawn(async move {
        if let Err(e) = adapter.start(&client, &key).await {
            error!(error=%e, "suggestion stream failed");
        }
    });

    let body = StreamBody::new(stream::unfold(fragment_stream, |mut rx| async move {
        rx.recv().await.map(|f| (Ok::<_, Infallible>(f), rx))
    }));

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        "text/plain; charset=utf-8".parse().unwrap(),
    );
    Ok((headers, body))
}
