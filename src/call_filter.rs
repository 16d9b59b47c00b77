use crate::call_types::{CallRecord, CallStatus};

use time::{Date, UtcOffset};

/// User-selected criteria for the call list.  Absent field = no constraint.
#[derive(Debug, Clone, Default)]
pub struct CallFilter {
    /// Case-insensitive substring match against the caller number or the
    /// transcription text.
    pub search_term: Option<String>,
    /// Empty = unfiltered.  Selecting `confirmed` widens to `scheduled`.
    pub statuses: Vec<CallStatus>,
    /// Inclusive calendar-date bounds, interpreted in UTC.
    pub from_date: Option<Date>,
    pub to_date: Option<Date>,
}

/// Compute the visible, ordered subset of `calls` under `filter`.  Pure: the
/// input snapshot is never mutated.  Output is always sorted by `created_at`
/// descending, independent of filter state.
pub fn filter_calls(calls: &[CallRecord], filter: &CallFilter) -> Vec<CallRecord> {
    let mut visible: Vec<CallRecord> = calls
        .iter()
        .filter(|call| {
            matches_search(call, filter)
                && matches_status(call, filter)
                && matches_date_range(call, filter)
        })
        .cloned()
        .collect();
    visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    visible
}

/// Default ordering for the unfiltered call-history view: urgent first, then
/// pending, then anything scheduled, then the rest.  The sort is stable so
/// ties keep arrival order.
pub fn priority_sort(calls: &mut [CallRecord]) {
    calls.sort_by_key(|call| call.status.priority_rank());
}

fn matches_search(call: &CallRecord, filter: &CallFilter) -> bool {
    let term = match &filter.search_term {
        Some(term) if !term.is_empty() => term.to_lowercase(),
        _ => return true,
    };
    if call.from.to_lowercase().contains(&term) {
        return true;
    }
    call.transcription
        .as_ref()
        .map(|t| t.to_lowercase().contains(&term))
        .unwrap_or(false)
}

fn matches_status(call: &CallRecord, filter: &CallFilter) -> bool {
    if filter.statuses.is_empty() {
        return true;
    }
    filter.statuses.iter().any(|selected| match selected {
        // confirmed and scheduled are synonymous from a filtering perspective
        CallStatus::Confirmed => {
            call.status == CallStatus::Confirmed || call.status == CallStatus::Scheduled
        }
        other => call.status == *other,
    })
}

fn matches_date_range(call: &CallRecord, filter: &CallFilter) -> bool {
    if filter.from_date.is_none() && filter.to_date.is_none() {
        return true;
    }
    let call_date = call.created_at.to_offset(UtcOffset::UTC).date();
    filter.from_date.map_or(true, |from| from <= call_date)
        && filter.to_date.map_or(true, |to| call_date <= to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_types::CallStatus;

    use time::macros::datetime;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn record(from: &str, status: CallStatus, created_at: OffsetDateTime) -> CallRecord {
        CallRecord {
            id: Uuid::new_v4(),
            owner_id: "AC123".to_string(),
            from: from.to_string(),
            created_at,
            duration_seconds: 30,
            status,
            transcription: None,
            notes: None,
            scheduled_callback: None,
        }
    }

    fn snapshot() -> Vec<CallRecord> {
        vec![
            record(
                "+15550001111",
                CallStatus::Pending,
                datetime!(2026-01-01 09:00 UTC),
            ),
            record(
                "+15550002222",
                CallStatus::Confirmed,
                datetime!(2026-01-02 09:00 UTC),
            ),
            record(
                "+15550003333",
                CallStatus::Scheduled,
                datetime!(2026-01-03 09:00 UTC),
            ),
            record(
                "+15550004444",
                CallStatus::Urgent,
                datetime!(2026-01-04 09:00 UTC),
            ),
        ]
    }

    #[test]
    fn empty_filter_returns_everything_newest_first() {
        let calls = snapshot();
        let visible = filter_calls(&calls, &CallFilter::default());
        assert_eq!(visible.len(), calls.len());
        for pair in visible.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
        assert_eq!(visible[0].from, "+15550004444");
    }

    #[test]
    fn confirmed_widens_to_scheduled() {
        let calls = snapshot();
        let filter = CallFilter {
            statuses: vec![CallStatus::Confirmed],
            ..Default::default()
        };
        let visible = filter_calls(&calls, &filter);
        let statuses: Vec<&CallStatus> = visible.iter().map(|c| &c.status).collect();
        assert_eq!(visible.len(), 2);
        assert!(statuses.contains(&&CallStatus::Confirmed));
        assert!(statuses.contains(&&CallStatus::Scheduled));
    }

    #[test]
    fn other_statuses_match_exactly() {
        let calls = snapshot();
        let filter = CallFilter {
            statuses: vec![CallStatus::Scheduled],
            ..Default::default()
        };
        let visible = filter_calls(&calls, &filter);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].status, CallStatus::Scheduled);
    }

    #[test]
    fn date_bounds_are_inclusive_and_independent() {
        let calls = snapshot();

        let filter = CallFilter {
            from_date: Some(datetime!(2026-01-02 00:00 UTC).date()),
            to_date: Some(datetime!(2026-01-03 00:00 UTC).date()),
            ..Default::default()
        };
        let visible = filter_calls(&calls, &filter);
        assert_eq!(visible.len(), 2);
        for call in &visible {
            let date = call.created_at.date();
            assert!(date >= filter.from_date.unwrap() && date <= filter.to_date.unwrap());
        }

        // lower bound alone
        let filter = CallFilter {
            from_date: Some(datetime!(2026-01-03 00:00 UTC).date()),
            ..Default::default()
        };
        assert_eq!(filter_calls(&calls, &filter).len(), 2);

        // upper bound alone
        let filter = CallFilter {
            to_date: Some(datetime!(2026-01-01 00:00 UTC).date()),
            ..Default::default()
        };
        assert_eq!(filter_calls(&calls, &filter).len(), 1);
    }

    #[test]
    fn search_matches_number_or_transcription_case_insensitively() {
        let mut calls = snapshot();
        calls[0].transcription = Some("Please RESCHEDULE my appointment".to_string());

        let filter = CallFilter {
            search_term: Some("reschedule".to_string()),
            ..Default::default()
        };
        let visible = filter_calls(&calls, &filter);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].from, "+15550001111");

        let filter = CallFilter {
            search_term: Some("0002222".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_calls(&calls, &filter).len(), 1);
    }

    #[test]
    fn filtering_is_idempotent() {
        let calls = snapshot();
        let filter = CallFilter {
            statuses: vec![CallStatus::Confirmed, CallStatus::Urgent],
            from_date: Some(datetime!(2026-01-01 00:00 UTC).date()),
            ..Default::default()
        };
        let first = filter_calls(&calls, &filter);
        let second = filter_calls(&calls, &filter);
        let first_ids: Vec<_> = first.iter().map(|c| c.id).collect();
        let second_ids: Vec<_> = second.iter().map(|c| c.id).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn priority_sort_ignores_timestamps() {
        // urgent is oldest, scheduled is newest; priority order wins anyway
        let mut calls = vec![
            record(
                "+15550001111",
                CallStatus::Urgent,
                datetime!(2026-01-01 09:00 UTC),
            ),
            record(
                "+15550002222",
                CallStatus::Pending,
                datetime!(2026-01-02 09:00 UTC),
            ),
            record(
                "+15550003333",
                CallStatus::Scheduled,
                datetime!(2026-01-03 09:00 UTC),
            ),
        ];
        priority_sort(&mut calls);
        assert_eq!(calls[0].status, CallStatus::Urgent);
        assert_eq!(calls[1].status, CallStatus::Pending);
        assert_eq!(calls[2].status, CallStatus::Scheduled);
    }

    #[test]
    fn priority_sort_is_stable_within_a_rank() {
        let mut calls = vec![
            record(
                "+15550001111",
                CallStatus::Pending,
                datetime!(2026-01-05 09:00 UTC),
            ),
            record(
                "+15550002222",
                CallStatus::Pending,
                datetime!(2026-01-01 09:00 UTC),
            ),
            record(
                "+15550003333",
                CallStatus::Urgent,
                datetime!(2026-01-02 09:00 UTC),
            ),
        ];
        priority_sort(&mut calls);
        assert_eq!(calls[0].status, CallStatus::Urgent);
        // arrival order preserved among the two pending records
        assert_eq!(calls[1].from, "+15550001111");
        assert_eq!(calls[2].from, "+15550002222");
    }
}
