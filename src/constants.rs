//! Default paths and file names shared across ngsite.

/// Directory holding every site record, enabled or not.
pub const DEFAULT_SITES_AVAILABLE: &str = "/etc/nginx/sites-available";

/// Directory whose entries nginx actually includes.
pub const DEFAULT_SITES_ENABLED: &str = "/etc/nginx/sites-enabled";

/// Directory for advisory lock files.
pub const DEFAULT_LOCK_DIR: &str = "/run/lock/ngsite";

/// Escalation program used for privileged operations.
pub const DEFAULT_SUDO_PROGRAM: &str = "sudo";

/// Locations searched, in order, when no configuration path is given.
pub const CONFIG_SEARCH_PATHS: &[&str] = &["ngsite.yaml", "/etc/ngsite/ngsite.yaml"];

/// Name of the lock serialising every validate-then-reload sequence.
pub const RELOAD_LOCK_NAME: &str = "reload";

/// Suffix for lock files inside the lock directory.
pub const LOCK_FILE_SUFFIX: &str = ".lock";

/// Prefix for the temporary file written before a record is renamed into place.
pub const TEMP_RECORD_PREFIX: &str = ".ngsite-";
