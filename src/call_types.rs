use crate::error::AppError;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

/// Lifecycle tag on a call record.  The well-known variants drive the toggle
/// and priority rules; users can attach arbitrary labels at runtime, so the
/// set stays open through `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CallStatus {
    Pending,
    Confirmed,
    Urgent,
    Scheduled,
    // legacy tags from early records
    Missed,
    Answered,
    Voicemail,
    Custom(String),
}

impl CallStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CallStatus::Pending => "pending",
            CallStatus::Confirmed => "confirmed",
            CallStatus::Urgent => "urgent",
            CallStatus::Scheduled => "scheduled",
            CallStatus::Missed => "missed",
            CallStatus::Answered => "answered",
            CallStatus::Voicemail => "voicemail",
            CallStatus::Custom(label) => label,
        }
    }

    /// The pending/urgent toggle.  Any other status has no toggle target and
    /// the caller treats `None` as a silent no-op.
    pub fn toggled(&self) -> Option<CallStatus> {
        match self {
            CallStatus::Pending => Some(CallStatus::Urgent),
            CallStatus::Urgent => Some(CallStatus::Pending),
            _ => None,
        }
    }

    /// Display priority for the unfiltered call-history view.  Lower sorts
    /// first.  The substring test deliberately catches custom labels like
    /// "rescheduled".
    pub fn priority_rank(&self) -> u8 {
        match self {
            CallStatus::Urgent => 0,
            CallStatus::Pending => 1,
            s if s.as_str().contains("scheduled") => 2,
            _ => 3,
        }
    }
}

impl From<String> for CallStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => CallStatus::Pending,
            "confirmed" => CallStatus::Confirmed,
            "urgent" => CallStatus::Urgent,
            "scheduled" => CallStatus::Scheduled,
            "missed" => CallStatus::Missed,
            "answered" => CallStatus::Answered,
            "voicemail" => CallStatus::Voicemail,
            _ => CallStatus::Custom(s),
        }
    }
}

impl From<CallStatus> for String {
    fn from(status: CallStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An appointment booked against a call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledCallback {
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One inbound call/voicemail interaction.  `owner_id` is never reassigned;
/// `created_at` is immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub from: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub duration_seconds: u32,
    pub status: CallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_callback: Option<ScheduledCallback>,
}

/// Partial update of a record's mutable fields.  Absent fields keep their
/// stored values; a present `scheduled_callback` replaces the whole nested
/// object.
#[derive(Debug, Clone, Deserialize)]
pub struct CallUpdate {
    pub status: Option<CallStatus>,
    pub notes: Option<String>,
    pub scheduled_callback: Option<ScheduledCallback>,
}

impl CallUpdate {
    pub fn apply(self, mut record: CallRecord) -> CallRecord {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(notes) = self.notes {
            record.notes = Some(notes);
        }
        if let Some(callback) = self.scheduled_callback {
            record.scheduled_callback = Some(callback);
        }
        record
    }
}

/// Raw, pre-validation shape of a record as it arrives in import/seed
/// payloads.  Timestamps are opaque strings here; they are coerced exactly
/// once, at this boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct CallDocument {
    pub owner_id: String,
    pub from: String,
    pub created_at: String,
    #[serde(default)]
    pub duration_seconds: u32,
    pub status: String,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub callback_date: Option<String>,
    #[serde(default)]
    pub callback_notes: Option<String>,
}

impl TryFrom<CallDocument> for CallRecord {
    type Error = AppError;

    fn try_from(doc: CallDocument) -> Result<Self, AppError> {
        let created_at = parse_instant(&doc.created_at)?;
        let scheduled_callback = match doc.callback_date {
            Some(raw) => Some(ScheduledCallback {
                date: parse_instant(&raw)?,
                notes: doc.callback_notes,
            }),
            None => None,
        };

        Ok(CallRecord {
            id: Uuid::new_v4(),
            owner_id: doc.owner_id,
            from: doc.from,
            created_at,
            duration_seconds: doc.duration_seconds,
            status: CallStatus::from(doc.status),
            transcription: doc.transcription,
            notes: doc.notes,
            scheduled_callback,
        })
    }
}

/// Coerce an RFC 3339 string to an instant.  An un-coercible date is a
/// `Data` error; callers drop the offending record instead of aborting.
pub fn parse_instant(raw: &str) -> Result<OffsetDateTime, AppError> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .map_err(|e| AppError::Data(format!("un-coercible timestamp '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for raw in ["pending", "confirmed", "urgent", "scheduled", "voicemail"] {
            let status = CallStatus::from(raw.to_string());
            assert_eq!(status.as_str(), raw);
        }
        let custom = CallStatus::from("follow-up-friday".to_string());
        assert_eq!(custom, CallStatus::Custom("follow-up-friday".to_string()));
        assert_eq!(custom.as_str(), "follow-up-friday");
    }

    #[test]
    fn toggle_flips_pending_and_urgent_only() {
        assert_eq!(CallStatus::Pending.toggled(), Some(CallStatus::Urgent));
        assert_eq!(CallStatus::Urgent.toggled(), Some(CallStatus::Pending));
        assert_eq!(CallStatus::Confirmed.toggled(), None);
        assert_eq!(CallStatus::Custom("vip".to_string()).toggled(), None);
    }

    #[test]
    fn priority_rank_orders_urgent_first() {
        assert_eq!(CallStatus::Urgent.priority_rank(), 0);
        assert_eq!(CallStatus::Pending.priority_rank(), 1);
        assert_eq!(CallStatus::Scheduled.priority_rank(), 2);
        // custom labels containing "scheduled" share the scheduled rank
        assert_eq!(
            CallStatus::Custom("rescheduled".to_string()).priority_rank(),
            2
        );
        assert_eq!(CallStatus::Confirmed.priority_rank(), 3);
        assert_eq!(CallStatus::Voicemail.priority_rank(), 3);
    }

    fn stored_record() -> CallRecord {
        CallRecord {
            id: Uuid::new_v4(),
            owner_id: "AC123".to_string(),
            from: "+15551234567".to_string(),
            created_at: parse_instant("2026-01-05T10:30:00Z").unwrap(),
            duration_seconds: 42,
            status: CallStatus::Pending,
            transcription: Some("please call me back".to_string()),
            notes: Some("regular customer".to_string()),
            scheduled_callback: None,
        }
    }

    #[test]
    fn update_with_absent_fields_keeps_stored_values() {
        let update = CallUpdate {
            status: None,
            notes: None,
            scheduled_callback: None,
        };
        let before = stored_record();
        let after = update.apply(before.clone());
        assert_eq!(after.status, before.status);
        assert_eq!(after.notes, before.notes);
        assert!(after.scheduled_callback.is_none());
    }

    #[test]
    fn update_merges_only_the_present_fields() {
        let update = CallUpdate {
            status: Some(CallStatus::Confirmed),
            notes: None,
            scheduled_callback: None,
        };
        let after = update.apply(stored_record());
        assert_eq!(after.status, CallStatus::Confirmed);
        // notes untouched by a status-only update
        assert_eq!(after.notes.as_deref(), Some("regular customer"));

        let update = CallUpdate {
            status: None,
            notes: Some("asked for a callback".to_string()),
            scheduled_callback: Some(ScheduledCallback {
                date: parse_instant("2026-01-06T09:00:00Z").unwrap(),
                notes: Some("morning slot".to_string()),
            }),
        };
        let after = update.apply(after);
        assert_eq!(after.status, CallStatus::Confirmed);
        assert_eq!(after.notes.as_deref(), Some("asked for a callback"));
        let cb = after.scheduled_callback.unwrap();
        assert_eq!(cb.notes.as_deref(), Some("morning slot"));
    }

    #[test]
    fn document_with_bad_date_is_a_data_error() {
        let doc = CallDocument {
            owner_id: "AC123".to_string(),
            from: "+15551234567".to_string(),
            created_at: "not a date".to_string(),
            duration_seconds: 0,
            status: "pending".to_string(),
            transcription: None,
            notes: None,
            callback_date: None,
            callback_notes: None,
        };
        match CallRecord::try_from(doc) {
            Err(AppError::Data(_)) => (),
            other => panic!("expected data error, got {other:?}"),
        }
    }

    #[test]
    fn document_with_valid_dates_converts() {
        let doc = CallDocument {
            owner_id: "AC123".to_string(),
            from: "+15551234567".to_string(),
            created_at: "2026-01-05T10:30:00Z".to_string(),
            duration_seconds: 42,
            status: "voicemail".to_string(),
            transcription: Some("please call me back".to_string()),
            notes: None,
            callback_date: Some("2026-01-06T09:00:00Z".to_string()),
            callback_notes: Some("morning slot".to_string()),
        };
        let record = CallRecord::try_from(doc).unwrap();
        assert_eq!(record.status, CallStatus::Voicemail);
        assert_eq!(record.duration_seconds, 42);
        let cb = record.scheduled_callback.unwrap();
        assert_eq!(cb.notes.as_deref(), Some("morning slot"));
    }
}
