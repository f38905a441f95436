//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Livetide database.

use rusqlite::Connection;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Crawled platforms; one row per configured site
CREATE TABLE IF NOT EXISTS sites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    url TEXT NOT NULL,
    crawl_date TEXT
);

-- Channels (categories); soft-deleted via valid = 0, never removed
CREATE TABLE IF NOT EXISTS channels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL REFERENCES sites(id),
    office_id TEXT NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    code TEXT NOT NULL DEFAULT '',
    url TEXT NOT NULL DEFAULT '',
    image_url TEXT NOT NULL DEFAULT '',
    icon_url TEXT NOT NULL DEFAULT '',
    valid INTEGER NOT NULL DEFAULT 1,
    room_total INTEGER NOT NULL DEFAULT 0,
    room_range INTEGER NOT NULL DEFAULT 0,
    crawl_date TEXT,
    UNIQUE(site_id, office_id)
);

CREATE INDEX IF NOT EXISTS idx_channels_site ON channels(site_id);
CREATE INDEX IF NOT EXISTS idx_channels_valid ON channels(site_id, valid);

-- Rooms (broadcasts); office_id is globally unique, the channel link
-- is reassignable between crawls
CREATE TABLE IF NOT EXISTS rooms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    channel_id INTEGER NOT NULL REFERENCES channels(id),
    office_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL DEFAULT '',
    url TEXT NOT NULL DEFAULT '',
    image_url TEXT NOT NULL DEFAULT '',
    owner_name TEXT NOT NULL DEFAULT '',
    owner_uid TEXT NOT NULL DEFAULT '',
    owner_avatar TEXT NOT NULL DEFAULT '',
    spectators INTEGER NOT NULL DEFAULT 0,
    followers INTEGER NOT NULL DEFAULT 0,
    weight TEXT,
    weight_int INTEGER,
    openstatus INTEGER NOT NULL DEFAULT 1,
    crawl_date TEXT,
    start_time TEXT
);

CREATE INDEX IF NOT EXISTS idx_rooms_channel ON rooms(channel_id);
CREATE INDEX IF NOT EXISTS idx_rooms_open ON rooms(openstatus);

-- Append-only channel history: room count at crawl time
CREATE TABLE IF NOT EXISTS channel_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    channel_id INTEGER NOT NULL REFERENCES channels(id),
    room_total INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_channel_snapshots_channel ON channel_snapshots(channel_id);

-- Append-only room history; weight columns are only filled by the
-- detail crawl path
CREATE TABLE IF NOT EXISTS room_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    room_id INTEGER NOT NULL REFERENCES rooms(id),
    spectators INTEGER NOT NULL,
    followers INTEGER NOT NULL,
    weight TEXT,
    weight_int INTEGER,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_room_snapshots_room ON room_snapshots(room_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
