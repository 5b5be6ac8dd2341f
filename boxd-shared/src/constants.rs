//! Small string constants shared between the containers service and the
//! process it spawns for exec'd commands.

pub mod executor {
    /// Environment variable name carrying the owning container's id into an
    /// exec'd process, when the caller hasn't already set one explicitly.
    pub const ENV_VAR: &str = "BOXD_CONTAINER_ID";
    pub const CONTAINER_KEY: &str = "BOXD_CONTAINER_ID";
}

pub mod limits {
    /// Maximum published-port entries per container (§3).
    pub const MAX_PUBLISHED_PORTS: usize = 64;
    /// Maximum label key length in bytes (§3).
    pub const MAX_LABEL_KEY_LEN: usize = 128;
    /// Maximum total `key=value` label bytes (§3).
    pub const MAX_LABEL_TOTAL_LEN: usize = 4096;
}
