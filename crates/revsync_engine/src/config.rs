//! Configuration for the sync engine.

use revsync_protocol::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};

/// Suffix that marks a directory as a repository during discovery.
pub const DEFAULT_REPOSITORY_SUFFIX: &str = ".git";

/// Configuration for sync operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Send thin payloads that may reference objects the peer already has.
    pub thin: bool,
    /// Directory name suffix used by repository discovery.
    pub repository_suffix: String,
    /// Largest payload chunk written to the channel.
    pub payload_chunk_size: usize,
}

impl SyncConfig {
    /// Creates a new sync configuration with defaults.
    pub fn new() -> Self {
        Self {
            thin: true,
            repository_suffix: DEFAULT_REPOSITORY_SUFFIX.to_string(),
            payload_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Sets thin or full payloads.
    pub fn with_thin(mut self, thin: bool) -> Self {
        self.thin = thin;
        self
    }

    /// Sets the repository directory suffix.
    pub fn with_repository_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.repository_suffix = suffix.into();
        self
    }

    /// Sets the payload chunk size, clamped to the wire limit.
    pub fn with_payload_chunk_size(mut self, size: usize) -> Self {
        self.payload_chunk_size = size.clamp(1, MAX_CHUNK_SIZE);
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_defaults() {
        let config = SyncConfig::default();
        assert!(config.thin);
        assert_eq!(config.repository_suffix, ".git");
        assert_eq!(config.payload_chunk_size, 64 * 1024);
    }

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new()
            .with_thin(false)
            .with_repository_suffix(".repo")
            .with_payload_chunk_size(512);

        assert!(!config.thin);
        assert_eq!(config.repository_suffix, ".repo");
        assert_eq!(config.payload_chunk_size, 512);
    }

    #[test]
    fn chunk_size_is_clamped() {
        assert_eq!(SyncConfig::new().with_payload_chunk_size(0).payload_chunk_size, 1);
        assert_eq!(
            SyncConfig::new()
                .with_payload_chunk_size(usize::MAX)
                .payload_chunk_size,
            MAX_CHUNK_SIZE
        );
    }
}
