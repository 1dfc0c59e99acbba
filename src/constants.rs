//! Constants and default values for field visit processing.
//!
//! Central location for polling defaults, retry policy, state folder
//! names, and safety limits used across the crate.

/// Default hot-folder polling interval in seconds
pub const DEFAULT_POLLING_INTERVAL_SECS: u64 = 30;

/// Default quiet period in seconds a file must remain unmodified
/// before it is considered stable enough to process
pub const DEFAULT_QUIET_PERIOD_SECS: u64 = 10;

/// Default number of connection attempts before giving up
pub const DEFAULT_MAX_CONNECTION_ATTEMPTS: u32 = 3;

/// Default delay between connection attempts in seconds
pub const DEFAULT_CONNECTION_RETRY_DELAY_SECS: u64 = 5;

/// Minimum remote store version the processor is compatible with,
/// as (major, minor)
pub const MIN_SERVER_VERSION: (u32, u32) = (2020, 1);

/// Maximum declared size of a single archive attachment that will be
/// buffered in memory, in bytes
pub const MAX_ATTACHMENT_BYTES: u64 = 256 * 1024 * 1024;

/// Folder name for files currently being processed
pub const PROCESSING_FOLDER: &str = "Processing";

/// Folder name for files whose visits all uploaded cleanly
pub const UPLOADED_FOLDER: &str = "Uploaded";

/// Folder name for files with at least one visit withheld due to conflict
pub const PARTIAL_FOLDER: &str = "PartialUploads";

/// Folder name for files that failed parsing or uploading
pub const FAILED_FOLDER: &str = "Failed";

/// Default file patterns considered eligible for processing
pub const DEFAULT_FILE_PATTERNS: &[&str] = &["*"];

/// Plugin identifiers enabled when the configuration names none
pub const DEFAULT_PLUGINS: &[&str] = &["json-field-data"];

/// Upper bound multiplier on concurrent file workers relative to
/// available processing units, to cap remote-server load
pub const MAX_WORKER_MULTIPLIER: usize = 2;
