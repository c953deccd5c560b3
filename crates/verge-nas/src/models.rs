//! Volume browser models: listing entries, browse jobs and request payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use verge_core::{JobKey, VolumeKey};

/// Query name understood by the `volume_browser` endpoint for directory listings.
pub const GET_DIR_QUERY: &str = "get-dir";

/// Default page size ceiling for a listing.
pub const DEFAULT_LIST_LIMIT: u32 = 1000;

/// Default time to wait for a browse job to finish.
pub const DEFAULT_BROWSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Whether an entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file (and anything not recognised as a directory)
    File,
    /// Directory
    Directory,
}

impl EntryKind {
    /// Interpret the backend's `type` field.
    ///
    /// Only `directory` and `d` mark a directory; every other value,
    /// including an absent one, is a file.
    #[must_use]
    pub fn from_type(raw: &str) -> Self {
        match raw {
            "directory" | "d" => Self::Directory,
            _ => Self::File,
        }
    }
}

/// One entry record as sent by the backend, with fields extracted leniently.
///
/// Missing or malformed fields fall back to empty/zero values; extraction
/// never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    /// `name` field
    pub name: String,
    /// `type` field
    pub entry_type: String,
    /// `size` field in bytes
    pub size: u64,
    /// `date` field as Unix seconds; `None` when absent or zero
    pub date: Option<i64>,
}

impl RawEntry {
    /// Extract the known fields from a backend record.
    #[must_use]
    pub fn from_map(record: &Map<String, Value>) -> Self {
        Self {
            name: text_field(record, "name"),
            entry_type: text_field(record, "type"),
            size: unsigned_field(record, "size"),
            date: timestamp_field(record, "date"),
        }
    }
}

fn text_field(record: &Map<String, Value>, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unsigned_field(record: &Map<String, Value>, key: &str) -> u64 {
    match record.get(key) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map_or(0, |f| f as u64)
        }),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn timestamp_field(record: &Map<String, Value>, key: &str) -> Option<i64> {
    let seconds = match record.get(key)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (seconds != 0).then_some(seconds)
}

/// A file or directory inside a NAS volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Entry name
    pub name: String,
    /// File or directory
    pub kind: EntryKind,
    /// Size in bytes
    pub size_bytes: u64,
    /// Last modification time
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub modified_at: Option<DateTime<Utc>>,
    /// Absolute path inside the volume, always starting with `/`
    pub full_path: String,
    /// Volume the entry was listed from
    pub volume_key: VolumeKey,
    /// Display name of the volume, when the caller supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_name: Option<String>,
}

impl DirectoryEntry {
    /// Build an entry from a raw record and the request context.
    #[must_use]
    pub fn from_raw(
        raw: RawEntry,
        full_path: String,
        volume_key: VolumeKey,
        volume_name: Option<String>,
    ) -> Self {
        Self {
            kind: EntryKind::from_type(&raw.entry_type),
            size_bytes: raw.size,
            modified_at: raw
                .date
                .and_then(|seconds| DateTime::from_timestamp(seconds, 0)),
            name: raw.name,
            full_path,
            volume_key,
            volume_name,
        }
    }

    /// Whether this entry is a directory.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Whether this entry is a file.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Human-readable size, e.g. `100.00 KB`.
    #[must_use]
    pub fn size_display(&self) -> String {
        format_size(self.size_bytes)
    }
}

/// Format a byte count with binary (1024) units.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}

/// Status of a browse job as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Accepted, not yet started (also used when no status was reported)
    Pending,
    /// In progress, or any status this client does not recognise
    Running,
    /// Finished; `result` holds the listing
    Complete,
    /// Failed; `result` holds the error message
    Error,
}

impl JobStatus {
    /// Interpret the backend's `status` field.
    #[must_use]
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("" | "pending" | "queued") => Self::Pending,
            Some("complete") => Self::Complete,
            Some("error") => Self::Error,
            Some(_) => Self::Running,
        }
    }

    /// Whether polling can stop.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// Snapshot of a browse job returned by one poll.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowseJob {
    /// Job key echoed by the backend
    pub key: Option<JobKey>,
    /// Reported status
    pub status: JobStatus,
    /// Untyped result; only meaningful once the status is terminal
    pub result: Option<Value>,
}

impl BrowseJob {
    /// Read a poll response; `None` when the response is not an object.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            key: JobKey::from_response(value),
            status: JobStatus::from_wire(object.get("status").and_then(Value::as_str)),
            result: object.get("result").filter(|v| !v.is_null()).cloned(),
        })
    }

    /// Error message of a failed job: the `result` field verbatim.
    #[must_use]
    pub fn error_message(&self) -> String {
        match &self.result {
            Some(Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
            None => "Unknown error".to_string(),
        }
    }
}

/// Options for listing a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    /// Maximum number of entries to return
    pub limit: u32,
    /// Pagination offset
    pub offset: Option<u32>,
    /// File extensions to include (empty means all)
    pub extensions: Vec<String>,
    /// Sort field understood by the backend
    pub sort: String,
    /// How long to wait for the browse job
    pub timeout: Duration,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            offset: None,
            extensions: Vec::new(),
            sort: String::new(),
            timeout: DEFAULT_BROWSE_TIMEOUT,
        }
    }
}

impl ListOptions {
    /// Set the page size ceiling.
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Set the pagination offset.
    #[must_use]
    pub const fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Restrict the listing to the given extensions.
    #[must_use]
    pub fn with_extensions<I, T>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Set the sort field.
    #[must_use]
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = sort.into();
        self
    }

    /// Set how long to wait for the browse job.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extensions filter as sent on the wire (comma-joined).
    #[must_use]
    pub fn extensions_filter(&self) -> String {
        self.extensions
            .iter()
            .map(|ext| ext.trim())
            .filter(|ext| !ext.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Body of `POST /volume_browser`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowseRequest {
    /// Volume to browse
    pub volume: VolumeKey,
    /// Browse query name
    pub query: String,
    /// Query parameters
    pub params: BrowseParams,
}

/// Parameters of a `get-dir` browse query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowseParams {
    /// Directory in wire form: empty for the root, no leading slash otherwise
    pub dir: String,
    /// Page size ceiling
    pub limit: u32,
    /// Pagination offset, sent as `null` when unset
    pub offset: Option<u32>,
    /// Extension filter
    pub filter: ExtensionFilter,
    /// Volume to browse (repeated inside the params by the API)
    pub volume: VolumeKey,
    /// Sort field
    pub sort: String,
}

/// Extension filter of a browse query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionFilter {
    /// Comma-joined extensions, empty for no filtering
    pub extensions: String,
}

impl BrowseRequest {
    /// Build a directory listing request.
    #[must_use]
    pub fn get_dir(volume: &VolumeKey, dir: String, options: &ListOptions) -> Self {
        Self {
            volume: volume.clone(),
            query: GET_DIR_QUERY.to_string(),
            params: BrowseParams {
                dir,
                limit: options.limit,
                offset: options.offset,
                filter: ExtensionFilter {
                    extensions: options.extensions_filter(),
                },
                volume: volume.clone(),
                sort: options.sort.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawEntry {
        RawEntry::from_map(value.as_object().unwrap())
    }

    fn volume() -> VolumeKey {
        VolumeKey::parse_str("8f73f8bcc9c9f1aaba32f733bfc295acaf548554").unwrap()
    }

    #[test]
    fn entry_kind_recognises_directory_markers() {
        assert_eq!(EntryKind::from_type("directory"), EntryKind::Directory);
        assert_eq!(EntryKind::from_type("d"), EntryKind::Directory);
        assert_eq!(EntryKind::from_type("file"), EntryKind::File);
        assert_eq!(EntryKind::from_type("symlink"), EntryKind::File);
        assert_eq!(EntryKind::from_type(""), EntryKind::File);
    }

    #[test]
    fn raw_entry_extracts_fields() {
        let raw = record(json!({
            "name": "document.pdf",
            "n_name": "document.pdf",
            "size": 102_400,
            "date": 1_737_792_000,
            "type": "file"
        }));
        assert_eq!(raw.name, "document.pdf");
        assert_eq!(raw.entry_type, "file");
        assert_eq!(raw.size, 102_400);
        assert_eq!(raw.date, Some(1_737_792_000));
    }

    #[test]
    fn raw_entry_degrades_malformed_fields() {
        let raw = record(json!({"name": 42, "size": "lots", "date": 0, "type": null}));
        assert_eq!(raw.name, "42");
        assert_eq!(raw.entry_type, "");
        assert_eq!(raw.size, 0);
        assert_eq!(raw.date, None);

        let raw = record(json!({"size": -5, "date": "1737792000"}));
        assert_eq!(raw.name, "");
        assert_eq!(raw.size, 0);
        assert_eq!(raw.date, Some(1_737_792_000));

        let raw = record(json!({"size": "2048", "date": true}));
        assert_eq!(raw.size, 2048);
        assert_eq!(raw.date, None);
    }

    #[test]
    fn directory_entry_from_raw() {
        let raw = record(json!({"name": "images", "type": "d", "size": 4096, "date": 1_737_705_600}));
        let entry = DirectoryEntry::from_raw(
            raw,
            "/images".into(),
            volume(),
            Some("TestVolume".into()),
        );

        assert!(entry.is_directory());
        assert!(!entry.is_file());
        assert_eq!(entry.size_bytes, 4096);
        assert_eq!(entry.full_path, "/images");
        assert_eq!(entry.volume_name.as_deref(), Some("TestVolume"));
        assert_eq!(
            entry.modified_at,
            DateTime::from_timestamp(1_737_705_600, 0)
        );
    }

    #[test]
    fn directory_entry_without_date() {
        let entry = DirectoryEntry::from_raw(
            record(json!({"name": "test", "type": "file"})),
            "/test".into(),
            volume(),
            None,
        );
        assert!(entry.is_file());
        assert!(entry.modified_at.is_none());
        assert_eq!(entry.size_display(), "0 B");
    }

    #[test]
    fn directory_entry_serializes_timestamp_as_seconds() {
        let entry = DirectoryEntry::from_raw(
            record(json!({"name": "a.txt", "type": "file", "size": 10, "date": 100})),
            "/a.txt".into(),
            volume(),
            None,
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["modified_at"], json!(100));
        assert_eq!(json["kind"], json!("file"));
        assert!(json.get("volume_name").is_none());
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(102_400), "100.00 KB");
        assert_eq!(format_size(1_572_864), "1.50 MB");
        assert_eq!(format_size(1_073_741_824), "1.00 GB");
        assert_eq!(format_size(1 << 60), "1024.00 PB");
    }

    #[test]
    fn job_status_from_wire() {
        assert_eq!(JobStatus::from_wire(None), JobStatus::Pending);
        assert_eq!(JobStatus::from_wire(Some("pending")), JobStatus::Pending);
        assert_eq!(JobStatus::from_wire(Some("running")), JobStatus::Running);
        assert_eq!(JobStatus::from_wire(Some("indexing")), JobStatus::Running);
        assert_eq!(JobStatus::from_wire(Some("complete")), JobStatus::Complete);
        assert_eq!(JobStatus::from_wire(Some("error")), JobStatus::Error);
        assert!(JobStatus::Complete.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn browse_job_from_value() {
        let job = BrowseJob::from_value(&json!({"id": "job1", "status": "complete", "result": null}))
            .unwrap();
        assert_eq!(job.key.unwrap().as_str(), "job1");
        assert_eq!(job.status, JobStatus::Complete);
        assert!(job.result.is_none());

        assert!(BrowseJob::from_value(&json!("running")).is_none());
    }

    #[test]
    fn browse_job_error_message() {
        let job = BrowseJob::from_value(&json!({"status": "error", "result": "volume offline"}))
            .unwrap();
        assert_eq!(job.error_message(), "volume offline");

        let job = BrowseJob::from_value(&json!({"status": "error"})).unwrap();
        assert_eq!(job.error_message(), "Unknown error");
    }

    #[test]
    fn browse_request_wire_shape() {
        let options = ListOptions::default()
            .with_limit(50)
            .with_extensions(["pdf", " txt", ""])
            .with_sort("name");
        let request = BrowseRequest::get_dir(&volume(), "documents".into(), &options);

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "volume": "8f73f8bcc9c9f1aaba32f733bfc295acaf548554",
                "query": "get-dir",
                "params": {
                    "dir": "documents",
                    "limit": 50,
                    "offset": null,
                    "filter": {"extensions": "pdf,txt"},
                    "volume": "8f73f8bcc9c9f1aaba32f733bfc295acaf548554",
                    "sort": "name"
                }
            })
        );
    }

    #[test]
    fn list_options_defaults() {
        let options = ListOptions::default();
        assert_eq!(options.limit, 1000);
        assert!(options.offset.is_none());
        assert_eq!(options.extensions_filter(), "");
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.with_offset(20).offset, Some(20));
    }
}
