// Address history store
// Owns the ordered list of address segments per person and the supersession
// rule: at most one open segment, strictly increasing start dates, and the
// close-then-insert transition performed in one transaction.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::db::get_person;
use crate::error::HistoryError;
use crate::schema::AddressPayload;

// ============================================================================
// ADDRESS SEGMENT
// ============================================================================

/// One contiguous period during which a person resided at one address.
///
/// `end_date` of `None` marks the open (current) segment. Segments are
/// immutable once superseded except for the single end_date stamp applied
/// when a successor is inserted.
#[derive(Debug, Clone, Serialize)]
pub struct AddressSegment {
    pub id: Uuid,
    pub person_id: Uuid,
    pub street_one: String,
    pub street_two: Option<String>,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl AddressSegment {
    /// True while this segment represents the person's current address.
    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }
}

/// Result of a successful append.
///
/// `closed_previous` is set when an existing open segment was superseded,
/// carrying that segment with its freshly stamped end_date.
#[derive(Debug)]
pub struct AppendOutcome {
    pub created: AddressSegment,
    pub closed_previous: Option<AddressSegment>,
}

impl AppendOutcome {
    /// The segment the write operation echoes back to the caller.
    ///
    /// On supersession this is the now-closed previous segment, not the new
    /// one; on a first append it is the created segment. The asymmetry is the
    /// published API contract (see DESIGN.md).
    pub fn response_segment(&self) -> &AddressSegment {
        self.closed_previous.as_ref().unwrap_or(&self.created)
    }
}

// ============================================================================
// READ PATH
// ============================================================================

/// Fetch the current address segment for a person.
///
/// "Current" means last-inserted. The `as_of` date is accepted for wire
/// compatibility but does not filter: callers always see the latest segment.
pub fn get_current(
    conn: &Connection,
    person_id: Uuid,
    _as_of: NaiveDate,
) -> Result<AddressSegment, HistoryError> {
    if get_person(conn, person_id)?.is_none() {
        return Err(HistoryError::PersonNotFound);
    }

    match latest_row(conn, person_id)? {
        Some((_, segment)) => Ok(segment),
        None => Err(HistoryError::NoAddressOnFile),
    }
}

// ============================================================================
// WRITE PATH
// ============================================================================

/// Append a new address segment for a person, superseding the open one.
///
/// `written_on` is the date of the write (today, computed per request); it
/// becomes the end_date of the superseded segment. Both mutations of a
/// supersession run inside one IMMEDIATE transaction: the write lock is taken
/// up front so concurrent submissions serialize, and any early return rolls
/// back with nothing visible.
pub fn append_segment(
    conn: &mut Connection,
    person_id: Uuid,
    payload: &AddressPayload,
    written_on: NaiveDate,
) -> Result<AppendOutcome, HistoryError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if get_person(&tx, person_id)?.is_none() {
        return Err(HistoryError::PersonNotFound);
    }

    let outcome = match latest_row(&tx, person_id)? {
        // Case A: first segment for this person, no comparison needed
        None => {
            let created = insert_segment(&tx, person_id, payload)?;
            debug!(person_id = %person_id, segment_id = %created.id, "first segment created");
            AppendOutcome {
                created,
                closed_previous: None,
            }
        }
        // Case B: close the latest segment, then insert the successor
        Some((row_id, mut latest)) => {
            if payload.start_date <= latest.start_date {
                return Err(HistoryError::InvalidTransition {
                    candidate: payload.start_date,
                    latest: latest.start_date,
                });
            }

            tx.execute(
                "UPDATE address_segments SET end_date = ?1 WHERE id = ?2",
                params![written_on.to_string(), row_id],
            )?;
            latest.end_date = Some(written_on);

            let created = insert_segment(&tx, person_id, payload)?;
            debug!(
                person_id = %person_id,
                closed = %latest.id,
                created = %created.id,
                "segment superseded"
            );
            AppendOutcome {
                created,
                closed_previous: Some(latest),
            }
        }
    };

    tx.commit()?;
    Ok(outcome)
}

fn insert_segment(
    conn: &Connection,
    person_id: Uuid,
    payload: &AddressPayload,
) -> rusqlite::Result<AddressSegment> {
    let segment = AddressSegment {
        id: Uuid::new_v4(),
        person_id,
        street_one: payload.street_one.clone(),
        street_two: payload.street_two.clone(),
        city: payload.city.clone(),
        state: payload.state.clone(),
        zip_code: payload.zip_code.clone(),
        start_date: payload.start_date,
        end_date: None,
    };

    conn.execute(
        "INSERT INTO address_segments (
            segment_uuid, person_id, street_one, street_two, city, state,
            zip_code, start_date, end_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            segment.id.to_string(),
            segment.person_id.to_string(),
            segment.street_one,
            segment.street_two,
            segment.city,
            segment.state,
            segment.zip_code,
            segment.start_date.to_string(),
            Option::<String>::None,
        ],
    )?;

    Ok(segment)
}

/// Latest segment for a person by insertion order, with its row id so the
/// write path can stamp end_date on exactly that row.
fn latest_row(
    conn: &Connection,
    person_id: Uuid,
) -> rusqlite::Result<Option<(i64, AddressSegment)>> {
    conn.query_row(
        "SELECT id, segment_uuid, person_id, street_one, street_two, city,
                state, zip_code, start_date, end_date
         FROM address_segments
         WHERE person_id = ?1
         ORDER BY id DESC
         LIMIT 1",
        params![person_id.to_string()],
        segment_from_row,
    )
    .optional()
}

fn segment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, AddressSegment)> {
    let row_id: i64 = row.get(0)?;
    let uuid_str: String = row.get(1)?;
    let person_str: String = row.get(2)?;
    let start_str: String = row.get(8)?;
    let end_str: Option<String> = row.get(9)?;

    let segment = AddressSegment {
        id: Uuid::parse_str(&uuid_str).map_err(|_| rusqlite::Error::InvalidQuery)?,
        person_id: Uuid::parse_str(&person_str).map_err(|_| rusqlite::Error::InvalidQuery)?,
        street_one: row.get(3)?,
        street_two: row.get(4)?,
        city: row.get(5)?,
        state: row.get(6)?,
        zip_code: row.get(7)?,
        start_date: start_str
            .parse()
            .map_err(|_| rusqlite::Error::InvalidQuery)?,
        end_date: match end_str {
            Some(s) => Some(s.parse().map_err(|_| rusqlite::Error::InvalidQuery)?),
            None => None,
        },
    };

    Ok((row_id, segment))
}

/// All segments for a person in insertion order. Used by tests and the CLI
/// to inspect a full timeline.
pub fn segment_history(
    conn: &Connection,
    person_id: Uuid,
) -> rusqlite::Result<Vec<AddressSegment>> {
    let mut stmt = conn.prepare(
        "SELECT id, segment_uuid, person_id, street_one, street_two, city,
                state, zip_code, start_date, end_date
         FROM address_segments
         WHERE person_id = ?1
         ORDER BY id",
    )?;

    let segments = stmt
        .query_map(params![person_id.to_string()], segment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(segments.into_iter().map(|(_, s)| s).collect())
}
