//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    ChannelRecord, ChannelUpsert, RoomDetailUpdate, RoomObserved, RoomRecord, SiteRecord,
    StorageCounts,
};
use crate::LivetideError;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    pub fn new(path: &Path) -> Result<Self, LivetideError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self, LivetideError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn parse_utc(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_start_time(value: Option<String>) -> Option<NaiveDateTime> {
    value.and_then(|s| NaiveDateTime::parse_from_str(&s, START_TIME_FORMAT).ok())
}

fn channel_from_row(row: &Row<'_>) -> rusqlite::Result<ChannelRecord> {
    Ok(ChannelRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        office_id: row.get(2)?,
        name: row.get(3)?,
        code: row.get(4)?,
        url: row.get(5)?,
        image_url: row.get(6)?,
        icon_url: row.get(7)?,
        valid: row.get(8)?,
        room_total: row.get(9)?,
        room_range: row.get(10)?,
        crawl_date: parse_utc(row.get(11)?),
    })
}

const CHANNEL_COLUMNS: &str = "id, site_id, office_id, name, code, url, image_url, icon_url, \
                               valid, room_total, room_range, crawl_date";

fn room_from_row(row: &Row<'_>) -> rusqlite::Result<RoomRecord> {
    Ok(RoomRecord {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        office_id: row.get(2)?,
        name: row.get(3)?,
        url: row.get(4)?,
        image_url: row.get(5)?,
        owner_name: row.get(6)?,
        owner_uid: row.get(7)?,
        owner_avatar: row.get(8)?,
        spectators: row.get(9)?,
        followers: row.get(10)?,
        weight: row.get(11)?,
        weight_int: row.get(12)?,
        openstatus: row.get(13)?,
        crawl_date: parse_utc(row.get(14)?),
        start_time: parse_start_time(row.get(15)?),
    })
}

const ROOM_COLUMNS: &str = "id, channel_id, office_id, name, url, image_url, owner_name, \
                            owner_uid, owner_avatar, spectators, followers, weight, weight_int, \
                            openstatus, crawl_date, start_time";

impl Storage for SqliteStorage {
    // ===== Sites =====

    fn ensure_site(&mut self, code: &str, name: &str, url: &str) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO sites (code, name, url) VALUES (?1, ?2, ?3)
             ON CONFLICT(code) DO UPDATE SET name = excluded.name, url = excluded.url",
            params![code, name, url],
        )?;

        let id = self
            .conn
            .query_row("SELECT id FROM sites WHERE code = ?1", params![code], |row| {
                row.get(0)
            })
            .optional()?
            .ok_or_else(|| StorageError::SiteNotFound(code.to_string()))?;

        Ok(id)
    }

    fn get_site(&self, code: &str) -> StorageResult<Option<SiteRecord>> {
        let site = self
            .conn
            .query_row(
                "SELECT id, code, name, url, crawl_date FROM sites WHERE code = ?1",
                params![code],
                |row| {
                    Ok(SiteRecord {
                        id: row.get(0)?,
                        code: row.get(1)?,
                        name: row.get(2)?,
                        url: row.get(3)?,
                        crawl_date: parse_utc(row.get(4)?),
                    })
                },
            )
            .optional()?;

        Ok(site)
    }

    // ===== Channels =====

    fn replace_channel_list(
        &mut self,
        site_id: i64,
        entries: &[ChannelUpsert],
        crawl_date: DateTime<Utc>,
    ) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;

        // Channels absent from this pass stay invalid until they reappear.
        tx.execute(
            "UPDATE channels SET valid = 0 WHERE site_id = ?1",
            params![site_id],
        )?;

        for entry in entries {
            let updated = tx.execute(
                "UPDATE channels
                 SET name = ?3, code = ?4, url = ?5, image_url = ?6, icon_url = ?7, valid = 1
                 WHERE site_id = ?1 AND office_id = ?2",
                params![
                    site_id,
                    entry.office_id,
                    entry.name,
                    entry.code,
                    entry.url,
                    entry.image_url,
                    entry.icon_url,
                ],
            )?;

            if updated == 0 {
                tx.execute(
                    "INSERT INTO channels (site_id, office_id, name, code, url, image_url, icon_url, valid)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
                    params![
                        site_id,
                        entry.office_id,
                        entry.name,
                        entry.code,
                        entry.url,
                        entry.image_url,
                        entry.icon_url,
                    ],
                )?;
            }
        }

        tx.execute(
            "UPDATE sites SET crawl_date = ?2 WHERE id = ?1",
            params![site_id, crawl_date.to_rfc3339()],
        )?;

        tx.commit()?;
        Ok(entries.len())
    }

    fn list_valid_channels(&self, site_id: i64) -> StorageResult<Vec<ChannelRecord>> {
        let sql = format!(
            "SELECT {} FROM channels WHERE site_id = ?1 AND valid = 1 ORDER BY id",
            CHANNEL_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let channels = stmt
            .query_map(params![site_id], channel_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(channels)
    }

    fn get_channel(&self, site_id: i64, office_id: &str) -> StorageResult<Option<ChannelRecord>> {
        let sql = format!(
            "SELECT {} FROM channels WHERE site_id = ?1 AND office_id = ?2",
            CHANNEL_COLUMNS
        );
        let channel = self
            .conn
            .query_row(&sql, params![site_id, office_id], channel_from_row)
            .optional()?;
        Ok(channel)
    }

    fn apply_channel_counters(
        &mut self,
        channel_id: i64,
        room_total: i64,
        room_range: i64,
        crawl_date: DateTime<Utc>,
    ) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        let updated = tx.execute(
            "UPDATE channels SET room_total = ?2, room_range = ?3, crawl_date = ?4 WHERE id = ?1",
            params![channel_id, room_total, room_range, crawl_date.to_rfc3339()],
        )?;
        if updated == 0 {
            return Err(StorageError::ChannelNotFound(channel_id.to_string()));
        }

        tx.execute(
            "INSERT INTO channel_snapshots (channel_id, room_total, created_at)
             VALUES (?1, ?2, ?3)",
            params![channel_id, room_total, crawl_date.to_rfc3339()],
        )?;

        tx.commit()?;
        Ok(())
    }

    // ===== Rooms =====

    fn mark_channel_rooms_closed(&mut self, channel_id: i64) -> StorageResult<usize> {
        let affected = self.conn.execute(
            "UPDATE rooms SET openstatus = 0 WHERE channel_id = ?1",
            params![channel_id],
        )?;
        Ok(affected)
    }

    fn apply_room_page(
        &mut self,
        channel_id: i64,
        rooms: &[RoomObserved],
        crawl_date: DateTime<Utc>,
    ) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        let crawl_date = crawl_date.to_rfc3339();

        for room in rooms {
            let existing: Option<(i64, i64)> = tx
                .query_row(
                    "SELECT id, followers FROM rooms WHERE office_id = ?1",
                    params![room.office_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let (room_id, followers) = match existing {
                Some((id, current_followers)) => {
                    let followers = room.followers.unwrap_or(current_followers);
                    tx.execute(
                        "UPDATE rooms
                         SET channel_id = ?2, name = ?3, url = ?4, image_url = ?5,
                             owner_name = ?6, owner_uid = ?7, owner_avatar = ?8,
                             spectators = ?9, followers = ?10, openstatus = 1, crawl_date = ?11
                         WHERE id = ?1",
                        params![
                            id,
                            channel_id,
                            room.name,
                            room.url,
                            room.image_url,
                            room.owner_name,
                            room.owner_uid,
                            room.owner_avatar,
                            room.spectators,
                            followers,
                            crawl_date,
                        ],
                    )?;
                    (id, followers)
                }
                None => {
                    let followers = room.followers.unwrap_or(0);
                    tracing::info!(
                        "new room {}: {}",
                        room.office_id,
                        room.name
                    );
                    tx.execute(
                        "INSERT INTO rooms (channel_id, office_id, name, url, image_url,
                                            owner_name, owner_uid, owner_avatar,
                                            spectators, followers, openstatus, crawl_date)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, ?11)",
                        params![
                            channel_id,
                            room.office_id,
                            room.name,
                            room.url,
                            room.image_url,
                            room.owner_name,
                            room.owner_uid,
                            room.owner_avatar,
                            room.spectators,
                            followers,
                            crawl_date,
                        ],
                    )?;
                    (tx.last_insert_rowid(), followers)
                }
            };

            // The list path never sees a weight, so the snapshot leaves it NULL.
            tx.execute(
                "INSERT INTO room_snapshots (room_id, spectators, followers, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![room_id, room.spectators, followers, crawl_date],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn apply_room_detail(
        &mut self,
        update: &RoomDetailUpdate,
        crawl_date: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let tx = self.conn.transaction()?;

        let room_id: Option<i64> = tx
            .query_row(
                "SELECT id FROM rooms WHERE office_id = ?1",
                params![update.office_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(room_id) = room_id else {
            return Ok(false);
        };

        tx.execute(
            "UPDATE rooms
             SET name = ?2, image_url = ?3, owner_name = ?4, owner_avatar = ?5,
                 spectators = ?6, followers = ?7, openstatus = ?8,
                 weight = ?9, weight_int = ?10, crawl_date = ?11, start_time = ?12
             WHERE id = ?1",
            params![
                room_id,
                update.name,
                update.image_url,
                update.owner_name,
                update.owner_avatar,
                update.spectators,
                update.followers,
                update.openstatus,
                update.weight,
                update.weight_int,
                crawl_date.to_rfc3339(),
                update.start_time.format(START_TIME_FORMAT).to_string(),
            ],
        )?;

        tx.execute(
            "INSERT INTO room_snapshots (room_id, spectators, followers, weight, weight_int, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                room_id,
                update.spectators,
                update.followers,
                update.weight,
                update.weight_int,
                crawl_date.to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        Ok(true)
    }

    fn list_open_rooms(&self) -> StorageResult<Vec<RoomRecord>> {
        let sql = format!(
            "SELECT {} FROM rooms WHERE openstatus = 1 ORDER BY id",
            ROOM_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rooms = stmt
            .query_map([], room_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rooms)
    }

    fn get_room(&self, office_id: &str) -> StorageResult<Option<RoomRecord>> {
        let sql = format!("SELECT {} FROM rooms WHERE office_id = ?1", ROOM_COLUMNS);
        let room = self
            .conn
            .query_row(&sql, params![office_id], room_from_row)
            .optional()?;
        Ok(room)
    }

    // ===== Statistics =====

    fn counts(&self) -> StorageResult<StorageCounts> {
        let count = |sql: &str| -> rusqlite::Result<u64> {
            self.conn.query_row(sql, [], |row| row.get(0))
        };

        Ok(StorageCounts {
            channels: count("SELECT COUNT(*) FROM channels")?,
            valid_channels: count("SELECT COUNT(*) FROM channels WHERE valid = 1")?,
            rooms: count("SELECT COUNT(*) FROM rooms")?,
            open_rooms: count("SELECT COUNT(*) FROM rooms WHERE openstatus = 1")?,
            channel_snapshots: count("SELECT COUNT(*) FROM channel_snapshots")?,
            room_snapshots: count("SELECT COUNT(*) FROM room_snapshots")?,
        })
    }

    fn count_room_snapshots_for(&self, office_id: &str) -> StorageResult<u64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM room_snapshots s
             JOIN rooms r ON r.id = s.room_id
             WHERE r.office_id = ?1",
            params![office_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn count_channel_snapshots_for(&self, site_id: i64, office_id: &str) -> StorageResult<u64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM channel_snapshots s
             JOIN channels c ON c.id = s.channel_id
             WHERE c.site_id = ?1 AND c.office_id = ?2",
            params![site_id, office_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
