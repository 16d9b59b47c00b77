use crate::call_types::{CallRecord, CallStatus, ScheduledCallback};

use sqlx::types::time::OffsetDateTime;
use sqlx::FromRow;
use uuid::Uuid;

/// One row of the `calls` table.  The scheduled callback is flattened into
/// two nullable columns; `duration_seconds` is clamped non-negative on the
/// way out.
#[derive(Debug, FromRow)]
pub struct CallRow {
    pub id: Uuid,
    pub owner_id: String,
    pub twilio_call_sid: Option<String>,
    pub from_number: String,
    pub created_at: OffsetDateTime,
    pub duration_seconds: i32,
    pub status: String,
    pub transcription: Option<String>,
    pub notes: Option<String>,
    pub callback_date: Option<OffsetDateTime>,
    pub callback_notes: Option<String>,
}

impl From<CallRow> for CallRecord {
    fn from(row: CallRow) -> Self {
        let scheduled_callback = row.callback_date.map(|date| ScheduledCallback {
            date,
            notes: row.callback_notes,
        });

        CallRecord {
            id: row.id,
            owner_id: row.owner_id,
            from: row.from_number,
            created_at: row.created_at,
            duration_seconds: row.duration_seconds.max(0) as u32,
            status: CallStatus::from(row.status),
            transcription: row.transcription,
            notes: row.notes,
            scheduled_callback,
        }
    }
}
