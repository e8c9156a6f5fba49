//! Local key/value persistence
//!
//! Player preferences and the pending resume snapshot, kept as a flat
//! string map in a JSON file next to the game.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::game::constants::{is_valid_player_name, player};
use crate::game::result::ResumeSnapshot;

/// Well-known keys
pub mod keys {
    pub const PLAYER_NAME: &str = "playerName";
    pub const MUSIC_VOLUME: &str = "musicVolume";
    pub const SFX_VOLUME: &str = "sfxVolume";
    pub const PENDING_RESUME: &str = "pendingResume";
}

/// Default music/sfx volume
pub const DEFAULT_VOLUME: f32 = 0.8;

/// Refuse to load store files above this size
const MAX_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to access store file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse store file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Store file too large ({0} bytes)")]
    TooLarge(u64),
}

/// Flat string map, optionally backed by a file
#[derive(Debug, Clone, Default)]
pub struct LocalStore {
    path: Option<PathBuf>,
    values: BTreeMap<String, String>,
}

impl LocalStore {
    /// Store that never touches disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a store file. A missing file gives an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        if !path.exists() {
            debug!("No store file at {}", path.display());
            return Ok(Self {
                path: Some(path.to_path_buf()),
                values: BTreeMap::new(),
            });
        }

        let metadata = fs::metadata(path)?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(StoreError::TooLarge(metadata.len()));
        }

        let contents = fs::read_to_string(path)?;
        let values: BTreeMap<String, String> = serde_json::from_str(&contents)?;
        debug!("Loaded {} keys from {}", values.len(), path.display());

        Ok(Self {
            path: Some(path.to_path_buf()),
            values,
        })
    }

    /// Write the store back to its file (no-op for in-memory stores)
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = serde_json::to_string_pretty(&self.values)?;
        fs::write(path, contents)?;
        debug!("Saved store to {}", path.display());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Saved player name, or the default when unset/blank
    pub fn player_name(&self) -> String {
        self.get(keys::PLAYER_NAME)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(player::DEFAULT_NAME)
            .to_string()
    }

    /// Store a trimmed player name. Returns false if it is invalid.
    pub fn set_player_name(&mut self, name: &str) -> bool {
        if !is_valid_player_name(name) {
            return false;
        }
        self.set(keys::PLAYER_NAME, name.trim());
        true
    }

    fn volume(&self, key: &str) -> f32 {
        self.get(key)
            .and_then(|v| v.parse::<f32>().ok())
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_VOLUME)
    }

    pub fn music_volume(&self) -> f32 {
        self.volume(keys::MUSIC_VOLUME)
    }

    pub fn sfx_volume(&self) -> f32 {
        self.volume(keys::SFX_VOLUME)
    }

    pub fn set_music_volume(&mut self, volume: f32) {
        self.set(keys::MUSIC_VOLUME, volume.clamp(0.0, 1.0).to_string());
    }

    pub fn set_sfx_volume(&mut self, volume: f32) {
        self.set(keys::SFX_VOLUME, volume.clamp(0.0, 1.0).to_string());
    }

    /// Master volume is the average of music and sfx
    pub fn master_volume(&self) -> f32 {
        (self.music_volume() + self.sfx_volume()) / 2.0
    }

    /// Pending resume snapshot. Malformed data is dropped.
    pub fn pending_resume(&mut self) -> Option<ResumeSnapshot> {
        let raw = self.get(keys::PENDING_RESUME)?;
        match serde_json::from_str::<ResumeSnapshot>(raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Discarding malformed resume snapshot: {}", e);
                self.remove(keys::PENDING_RESUME);
                None
            }
        }
    }

    pub fn set_pending_resume(&mut self, snapshot: &ResumeSnapshot) -> Result<(), StoreError> {
        let raw = serde_json::to_string(snapshot)?;
        self.set(keys::PENDING_RESUME, raw);
        info!(
            "Stored resume snapshot for '{}' (phase {})",
            snapshot.player_name, snapshot.phase_index
        );
        Ok(())
    }

    /// Remove and return the pending snapshot; a resume is used once
    pub fn take_resume(&mut self) -> Option<ResumeSnapshot> {
        let snapshot = self.pending_resume();
        self.remove(keys::PENDING_RESUME);
        snapshot
    }

    pub fn has_resume(&mut self) -> bool {
        self.pending_resume().is_some()
    }
}
