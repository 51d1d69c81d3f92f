//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Error as SqlError;
use serde::de::DeserializeOwned;

use crate::models::EnumParseError;

fn conversion_failure(err: impl std::error::Error + Send + Sync + 'static) -> SqlError {
    SqlError::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(err))
}

/// Parse a DateTime from an RFC3339 string
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, SqlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(conversion_failure)
}

/// Parse an optional DateTime from an RFC3339 string
pub fn parse_datetime_opt(s: Option<String>) -> Result<Option<DateTime<Utc>>, SqlError> {
    s.map(|s| parse_datetime(&s)).transpose()
}

/// Parse a stored enum string via its FromStr impl
pub fn parse_enum<T>(s: &str) -> Result<T, SqlError>
where
    T: FromStr<Err = EnumParseError>,
{
    s.parse::<T>().map_err(conversion_failure)
}

/// Parse an optional stored enum string
pub fn parse_enum_opt<T>(s: Option<String>) -> Result<Option<T>, SqlError>
where
    T: FromStr<Err = EnumParseError>,
{
    s.map(|s| parse_enum(&s)).transpose()
}

/// Parse a UUID from a database string column
pub fn parse_uuid(s: &str) -> Result<uuid::Uuid, SqlError> {
    uuid::Uuid::parse_str(s).map_err(conversion_failure)
}

/// Parse a JSON text column
pub fn parse_json<T: DeserializeOwned>(s: &str) -> Result<T, SqlError> {
    serde_json::from_str(s).map_err(conversion_failure)
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
