//! SQL used by the SQLite store.

pub(super) const CREATE_LOCATIONS: &str = "CREATE TABLE IF NOT EXISTS locations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ip_address TEXT NOT NULL UNIQUE,
    country_code TEXT NOT NULL,
    country TEXT NOT NULL,
    city TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    mystery_value INTEGER NOT NULL,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT DEFAULT CURRENT_TIMESTAMP
)";

pub(super) const INSERT_LOCATION: &str = "INSERT OR IGNORE INTO locations
    (ip_address, country_code, country, city, latitude, longitude, mystery_value)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

pub(super) const SELECT_BY_IP: &str = "SELECT id, ip_address, country_code, country, city,
    latitude, longitude, mystery_value, created_at, updated_at
    FROM locations WHERE ip_address = ?1";
