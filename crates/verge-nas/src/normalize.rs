//! Normalization of browse job results.
//!
//! The backend reports a finished listing in one of several shapes: no
//! result at all, a JSON document encoded as a string, a bare array of
//! records, or an object wrapping the records under `entries`. Everything
//! past this module sees only `Vec<RawEntry>`.

use crate::models::RawEntry;
use serde_json::{Map, Value};
use tracing::debug;
use verge_core::{Error, Result};

/// The shapes a completed browse job's `result` field can take.
#[derive(Debug, Clone, PartialEq)]
pub enum BrowseResult {
    /// No result: an empty directory
    Empty,
    /// A JSON document encoded as a string
    Encoded(String),
    /// A bare array of records
    Entries(Vec<Value>),
    /// An object carrying the records under `entries`
    Wrapped(Vec<Value>),
    /// A lone record object without `entries`
    Single(Map<String, Value>),
}

impl BrowseResult {
    /// Classify a raw `result` payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedResult`] for scalars and for an `entries`
    /// field that is neither an array nor null.
    pub fn classify(raw: Option<Value>) -> Result<Self> {
        match raw {
            None | Some(Value::Null) => Ok(Self::Empty),
            Some(Value::String(encoded)) => Ok(Self::Encoded(encoded)),
            Some(Value::Array(entries)) => Ok(Self::Entries(entries)),
            Some(Value::Object(mut object)) => match object.remove("entries") {
                Some(Value::Array(entries)) => Ok(Self::Wrapped(entries)),
                Some(Value::Null) => Ok(Self::Empty),
                Some(other) => Err(Error::MalformedResult(format!(
                    "`entries` must be an array, got {other}"
                ))),
                None if object.is_empty() => Ok(Self::Empty),
                None => Ok(Self::Single(object)),
            },
            Some(other) => Err(Error::MalformedResult(format!(
                "unexpected browse result {other}"
            ))),
        }
    }

    /// Resolve the payload into entry records, in backend order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedResult`] when an encoded payload is not
    /// valid JSON or decodes to another string.
    pub fn into_records(self) -> Result<Vec<RawEntry>> {
        match self {
            Self::Empty => Ok(Vec::new()),
            Self::Encoded(encoded) => {
                let decoded: Value = serde_json::from_str(&encoded).map_err(|err| {
                    Error::MalformedResult(format!(
                        "invalid result from volume browser: {encoded}: {err}"
                    ))
                })?;
                match Self::classify(Some(decoded))? {
                    Self::Encoded(_) => Err(Error::MalformedResult(
                        "result is encoded more than once".to_string(),
                    )),
                    decoded => decoded.into_records(),
                }
            }
            Self::Entries(entries) | Self::Wrapped(entries) => Ok(records(entries)),
            Self::Single(record) => Ok(vec![RawEntry::from_map(&record)]),
        }
    }
}

fn records(entries: Vec<Value>) -> Vec<RawEntry> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match entry {
            Value::Object(record) if !record.is_empty() => Some(RawEntry::from_map(&record)),
            other => {
                debug!(index, entry = %other, "skipping non-record browse entry");
                None
            }
        })
        .collect()
}

/// Normalize a raw `result` payload into entry records.
///
/// # Errors
///
/// See [`BrowseResult::classify`] and [`BrowseResult::into_records`].
pub fn normalize(raw: Option<Value>) -> Result<Vec<RawEntry>> {
    BrowseResult::classify(raw)?.into_records()
}
