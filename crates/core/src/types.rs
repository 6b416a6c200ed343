/// Task identifiers are PostgreSQL BIGSERIAL (or a monotonic counter in memory).
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Opaque pointer (URL or path) to an image asset.
pub type AssetRef = String;
