use std::path::{Path, PathBuf};

/// Data directory name (under $HOME)
pub const DATA_DIR: &str = ".skyhistory/mainnet";

/// Database directory inside the data directory
pub const DB_DIR_NAME: &str = "history.db";

/// Memtable size per column family (64 MB)
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 64 * 1024 * 1024;

/// Shared LRU block cache (256 MB)
pub const DEFAULT_BLOCK_CACHE_SIZE: usize = 256 * 1024 * 1024;

/// Environment override for the data directory
pub const ENV_DATA_DIR: &str = "SKYHISTORY_DATA_DIR";

/// Environment override for commit fsync ("0" / "false" disables)
pub const ENV_SYNC: &str = "SKYHISTORY_SYNC";

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    /// fsync the WAL on every committed write transaction
    pub sync_writes: bool,
    pub write_buffer_size: usize,
    pub block_cache_size: usize,
}

impl DbConfig {
    pub fn mainnet() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self::at(Path::new(&home).join(DATA_DIR).join(DB_DIR_NAME))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            path: path.into(),
            sync_writes: true,
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            block_cache_size: DEFAULT_BLOCK_CACHE_SIZE,
        }
    }

    /// Mainnet defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = match std::env::var(ENV_DATA_DIR) {
            Ok(dir) => Self::at(Path::new(&dir).join(DB_DIR_NAME)),
            Err(_) => Self::mainnet(),
        };
        if let Ok(v) = std::env::var(ENV_SYNC) {
            config.sync_writes = !matches!(v.as_str(), "0" | "false" | "no");
        }
        config
    }

    /// Small caches and no fsync, for tests and tooling
    pub fn ephemeral(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            path: path.into(),
            sync_writes: false,
            write_buffer_size: 4 * 1024 * 1024,
            block_cache_size: 8 * 1024 * 1024,
        }
    }
}
