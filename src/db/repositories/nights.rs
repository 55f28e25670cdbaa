use anyhow::{Context, Result};
use log::error;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::{Database, NightFeed},
    helpers::{now_rfc3339, parse_quality},
    models::SessionRecord,
};

const SELECT_COLUMNS: &str = "SELECT id, start_time_ms, end_time_ms, quality FROM sleep_nights";

fn row_to_night(row: &Row) -> Result<SessionRecord> {
    let quality: i64 = row.get("quality")?;

    Ok(SessionRecord {
        id: row.get("id")?,
        start_time_ms: row.get("start_time_ms")?,
        end_time_ms: row.get("end_time_ms")?,
        quality: parse_quality(quality, "quality")?,
    })
}

/// Every night, newest first.
pub(crate) fn load_all(conn: &Connection) -> Result<Vec<SessionRecord>> {
    let mut stmt =
        conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY start_time_ms DESC, id DESC"))?;

    let mut rows = stmt.query([])?;
    let mut nights = Vec::new();
    while let Some(row) = rows.next()? {
        nights.push(row_to_night(row)?);
    }

    Ok(nights)
}

/// Pushes the table contents to observers. A failed reload leaves the
/// previous contents in place; the write itself has already committed.
fn refresh_feed(conn: &Connection, feed: &NightFeed) {
    match load_all(conn) {
        Ok(nights) => {
            feed.send_replace(nights);
        }
        Err(err) => error!("Failed to reload sleep nights after write: {err:#}"),
    }
}

impl Database {
    pub async fn insert_night(&self, night: &SessionRecord) -> Result<i64> {
        let record = night.clone();
        let feed = self.feed();
        self.execute(move |conn| {
            let now = now_rfc3339();
            conn.execute(
                "INSERT INTO sleep_nights (start_time_ms, end_time_ms, quality, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.start_time_ms,
                    record.end_time_ms,
                    record.quality,
                    now,
                    now,
                ],
            )
            .with_context(|| "failed to insert sleep night")?;
            let id = conn.last_insert_rowid();
            refresh_feed(conn, &feed);
            Ok(id)
        })
        .await
    }

    /// Returns the number of rows touched; zero means the id no longer exists.
    pub async fn update_night(&self, night: &SessionRecord) -> Result<usize> {
        let record = night.clone();
        let feed = self.feed();
        self.execute(move |conn| {
            let rows_affected = conn
                .execute(
                    "UPDATE sleep_nights
                     SET start_time_ms = ?1,
                         end_time_ms = ?2,
                         quality = ?3,
                         updated_at = ?4
                     WHERE id = ?5",
                    params![
                        record.start_time_ms,
                        record.end_time_ms,
                        record.quality,
                        now_rfc3339(),
                        record.id,
                    ],
                )
                .with_context(|| "failed to update sleep night")?;
            if rows_affected > 0 {
                refresh_feed(conn, &feed);
            }
            Ok(rows_affected)
        })
        .await
    }

    pub async fn get_latest_night(&self) -> Result<Option<SessionRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS} ORDER BY start_time_ms DESC, id DESC LIMIT 1"
            ))?;

            let mut rows = stmt.query([])?;
            let night = match rows.next()? {
                Some(row) => Some(row_to_night(row)?),
                None => None,
            };
            Ok(night)
        })
        .await
    }

    pub async fn get_night(&self, night_id: i64) -> Result<Option<SessionRecord>> {
        self.execute(move |conn| {
            let night = conn
                .query_row(
                    &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                    params![night_id],
                    |row| Ok(row_to_night(row)),
                )
                .optional()?
                .transpose()?;
            Ok(night)
        })
        .await
    }

    pub async fn clear_nights(&self) -> Result<()> {
        let feed = self.feed();
        self.execute(move |conn| {
            conn.execute("DELETE FROM sleep_nights", [])
                .with_context(|| "failed to clear sleep nights")?;
            refresh_feed(conn, &feed);
            Ok(())
        })
        .await
    }
}
