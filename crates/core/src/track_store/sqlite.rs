//! SQLite-backed track store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::carrier::TrackEvent;
use crate::queue::{StoreId, UserId};

use super::{TrackProcessingService, TrackRecord, TrackStoreError};

pub struct SqliteTrackStore {
    conn: Mutex<Connection>,
}

impl SqliteTrackStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, TrackStoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Result<Self, TrackStoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TrackStoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tracks (
                track_number TEXT PRIMARY KEY,
                store_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                last_status TEXT NOT NULL,
                last_event_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS track_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                track_number TEXT NOT NULL,
                occurred_at TEXT NOT NULL,
                description TEXT NOT NULL,
                location TEXT,
                UNIQUE(track_number, occurred_at, description)
            );

            CREATE INDEX IF NOT EXISTS idx_tracks_user ON tracks(user_id);
            CREATE INDEX IF NOT EXISTS idx_track_events_number ON track_events(track_number);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state of a track, if it was ever saved.
    pub fn get(&self, track_number: &str) -> Result<Option<TrackRecord>, TrackStoreError> {
        let conn = self.lock();
        let record = conn
            .query_row(
                "SELECT track_number, store_id, user_id, last_status, last_event_at, updated_at
                 FROM tracks WHERE track_number = ?1",
                params![track_number],
                |row| {
                    let last_event_at: String = row.get(4)?;
                    let updated_at: String = row.get(5)?;
                    Ok(TrackRecord {
                        track_number: row.get(0)?,
                        store_id: row.get(1)?,
                        user_id: row.get(2)?,
                        last_status: row.get(3)?,
                        last_event_at: parse_timestamp(&last_event_at),
                        updated_at: parse_timestamp(&updated_at),
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Stored history of a track, newest first.
    pub fn events_for(&self, track_number: &str) -> Result<Vec<TrackEvent>, TrackStoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT occurred_at, description, location FROM track_events
             WHERE track_number = ?1 ORDER BY occurred_at DESC, id ASC",
        )?;
        let events = stmt
            .query_map(params![track_number], |row| {
                let occurred_at: String = row.get(0)?;
                Ok(TrackEvent {
                    occurred_at: parse_timestamp(&occurred_at),
                    description: row.get(1)?,
                    location: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    pub fn count(&self) -> Result<u64, TrackStoreError> {
        let conn = self.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl TrackProcessingService for SqliteTrackStore {
    fn save(
        &self,
        track_number: &str,
        events: &[TrackEvent],
        store_id: StoreId,
        user_id: UserId,
    ) -> Result<(), TrackStoreError> {
        let latest = events
            .first()
            .ok_or_else(|| TrackStoreError::NoEvents(track_number.to_string()))?;

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO tracks (track_number, store_id, user_id, last_status, last_event_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(track_number) DO UPDATE SET
                store_id = excluded.store_id,
                user_id = excluded.user_id,
                last_status = excluded.last_status,
                last_event_at = excluded.last_event_at,
                updated_at = excluded.updated_at
            "#,
            params![
                track_number,
                store_id,
                user_id,
                latest.description,
                latest.occurred_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        for event in events {
            tx.execute(
                "INSERT OR IGNORE INTO track_events (track_number, occurred_at, description, location)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    track_number,
                    event.occurred_at.to_rfc3339(),
                    event.description,
                    event.location,
                ],
            )?;
        }
        tx.commit()?;

        tracing::debug!(track_number, events = events.len(), "Saved track events");
        Ok(())
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
