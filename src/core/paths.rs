//! Path and Type constants for the registry namespace
//!
//! Centralized registry for all paths and scroll types.

/// Registry paths (relative to the mount point)
pub mod registry {
    pub const MOUNT: &str = "/registry";

    pub const STATUS: &str = "/status";
    pub const ACCOUNT: &str = "/account";
    pub const NETWORK: &str = "/network";
    pub const ENTRIES: &str = "/entries";
    pub const ENTRY_PREFIX: &str = "/entries/";

    pub const ALL: &[&str] = &[STATUS, ACCOUNT, NETWORK, ENTRIES];
}

/// Registry scroll types
pub mod registry_types {
    pub const STATUS: &str = "registry/status@v1";
    pub const ACCOUNT: &str = "registry/account@v1";
    pub const NETWORK: &str = "registry/network@v1";
    pub const ENTRIES: &str = "registry/entries@v1";
    pub const ENTRY: &str = "registry/entry@v1";
}
