use crate::call_types::{CallRecord, CallStatus};
use crate::db_types::CallRow;
use crate::error::AppError;

use sqlx::{Pool, Postgres};
use time::OffsetDateTime;
use tracing::error;
use uuid::Uuid;

fn db_error(e: sqlx::Error) -> AppError {
    error!(error=%e, "database error");
    AppError::Transport("database error".to_string())
}

/// All of an owner's records, most recent first.
pub async fn list_calls_for_owner(
    pool: &Pool<Postgres>,
    owner_id: &str,
) -> Result<Vec<CallRecord>, AppError> {
    let rows = sqlx::query_as::<_, CallRow>(
        "
        select *
        from calls
        where owner_id = $1
        order by created_at desc
        ",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
    .map_err(db_error)?;

    Ok(rows.into_iter().map(CallRecord::from).collect())
}

pub async fn find_call(pool: &Pool<Postgres>, id: Uuid) -> Result<CallRecord, AppError> {
    let row = sqlx::query_as::<_, CallRow>(
        "
        select *
        from calls
        where id = $1
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(db_error)?
    .ok_or(AppError::NotFound("no call with that id"))?;

    Ok(row.into())
}

pub async fn insert_call(
    pool: &Pool<Postgres>,
    record: &CallRecord,
    twilio_call_sid: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query(
        "
        insert into calls (
          id,
          owner_id,
          twilio_call_sid,
          from_number,
          created_at,
          duration_seconds,
          status,
          transcription,
          notes,
          callback_date,
          callback_notes
        ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ",
    )
    .bind(record.id)
    .bind(&record.owner_id)
    .bind(twilio_call_sid)
    .bind(&record.from)
    .bind(record.created_at)
    .bind(record.duration_seconds as i32)
    .bind(record.status.as_str())
    .bind(&record.transcription)
    .bind(&record.notes)
    .bind(record.scheduled_callback.as_ref().map(|cb| cb.date))
    .bind(
        record
            .scheduled_callback
            .as_ref()
            .and_then(|cb| cb.notes.clone()),
    )
    .execute(pool)
    .await
    .map_err(db_error)?;

    Ok(())
}

/// Write back a record's mutable fields.  The merge itself happens in
/// `CallUpdate::apply` so it stays testable without a database.
pub async fn replace_call(pool: &Pool<Postgres>, record: &CallRecord) -> Result<(), AppError> {
    let result = sqlx::query(
        "
        update calls
        set status = $2,
            notes = $3,
            callback_date = $4,
            callback_notes = $5
        where id = $1
        ",
    )
    .bind(record.id)
    .bind(record.status.as_str())
    .bind(&record.notes)
    .bind(record.scheduled_callback.as_ref().map(|cb| cb.date))
    .bind(
        record
            .scheduled_callback
            .as_ref()
            .and_then(|cb| cb.notes.clone()),
    )
    .execute(pool)
    .await
    .map_err(db_error)?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("no call with that id"));
    }

    Ok(())
}

pub async fn set_status(
    pool: &Pool<Postgres>,
    id: Uuid,
    status: &CallStatus,
) -> Result<CallRecord, AppError> {
    let row = sqlx::query_as::<_, CallRow>(
        "
        update calls
        set status = $2
        where id = $1
        returning *
        ",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await
    .map_err(db_error)?
    .ok_or(AppError::NotFound("no call with that id"))?;

    Ok(row.into())
}

/// Record the connected-call duration reported by the status callback.
pub async fn set_duration(
    pool: &Pool<Postgres>,
    twilio_call_sid: &str,
    duration_seconds: u32,
) -> Result<(), AppError> {
    sqlx::query(
        "
        update calls
        set duration_seconds = $2
        where twilio_call_sid = $1
        ",
    )
    .bind(twilio_call_sid)
    .bind(duration_seconds as i32)
    .execute(pool)
    .await
    .map_err(db_error)?;

    Ok(())
}

/// Tag a call that never connected with the legacy missed status.
pub async fn mark_missed(pool: &Pool<Postgres>, twilio_call_sid: &str) -> Result<(), AppError> {
    sqlx::query(
        "
        update calls
        set status = $2
        where twilio_call_sid = $1
        ",
    )
    .bind(twilio_call_sid)
    .bind(CallStatus::Missed.as_str())
    .execute(pool)
    .await
    .map_err(db_error)?;

    Ok(())
}

/// Attach a voicemail transcription and tag the record accordingly.
pub async fn set_transcription(
    pool: &Pool<Postgres>,
    twilio_call_sid: &str,
    transcription: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "
        update calls
        set transcription = $2,
            status = $3
        where twilio_call_sid = $1
        ",
    )
    .bind(twilio_call_sid)
    .bind(transcription)
    .bind(CallStatus::Voicemail.as_str())
    .execute(pool)
    .await
    .map_err(db_error)?;

    Ok(())
}

/// Owner-initiated bulk cleanup.  Returns the number of deleted records.
pub async fn delete_calls_for_owner(
    pool: &Pool<Postgres>,
    owner_id: &str,
) -> Result<u64, AppError> {
    let result = sqlx::query(
        "
        delete from calls
        where owner_id = $1
        ",
    )
    .bind(owner_id)
    .execute(pool)
    .await
    .map_err(db_error)?;

    Ok(result.rows_affected())
}

/// Freshly-ingested webhook record: pending, zero duration, created now.
pub fn new_inbound_call(owner_id: &str, from: &str) -> CallRecord {
    CallRecord {
        id: Uuid::new_v4(),
        owner_id: owner_id.to_string(),
        from: from.to_string(),
        created_at: OffsetDateTime::now_utc(),
        duration_seconds: 0,
        status: CallStatus::Pending,
        transcription: None,
        notes: None,
        scheduled_callback: None,
    }
}
