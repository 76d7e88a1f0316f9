use crate::error::{DemuxError, Result};
use lazy_static::lazy_static;
use std::env;
use std::fs;
use std::sync::RwLock;

lazy_static! {
    static ref CONFIG: RwLock<DemuxConfig> = RwLock::new(DemuxConfig::load());
}

/// Default number of bytes pulled from an async source per `append`.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 64 * 1024;

const CONFIG_PATHS: [&str; 2] = ["./tsdemux.toml", "./tsdemux_config.toml"];

/// Demuxer tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemuxConfig {
    /// Drop video samples until a keyframe has been seen, unless SPS is already known and
    /// the parse window is contiguous or already has samples.
    pub force_key_frame_on_discontinuity: bool,
    /// Accept MPEG-1/2 audio (stream types 0x03/0x04) in the PMT.
    pub mpeg_audio_supported: bool,
    /// Skip PAT/PMT sections whose CRC32 does not match.
    pub verify_psi_crc: bool,
    /// Chunk size used by [`crate::format::ts::TSSegmentReader`].
    pub read_chunk_size: usize,
}

impl Default for DemuxConfig {
    fn default() -> Self {
        Self {
            force_key_frame_on_discontinuity: true,
            mpeg_audio_supported: true,
            verify_psi_crc: false,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

impl DemuxConfig {
    /// Builds a config from defaults, then `TSDEMUX_*` environment variables, then the first
    /// readable config file. Invalid values are logged and ignored.
    pub fn load() -> Self {
        let mut config = DemuxConfig::default();

        for (var, key) in [
            ("TSDEMUX_FORCE_KEY_FRAME", "force_key_frame_on_discontinuity"),
            ("TSDEMUX_MPEG_AUDIO", "mpeg_audio_supported"),
            ("TSDEMUX_VERIFY_PSI_CRC", "verify_psi_crc"),
            ("TSDEMUX_READ_CHUNK_SIZE", "read_chunk_size"),
        ] {
            if let Ok(value) = env::var(var) {
                if let Err(e) = config.set(key, &value) {
                    log::warn!("Ignoring {}={:?}: {}", var, value, e);
                }
            }
        }

        for path in &CONFIG_PATHS {
            if let Ok(content) = fs::read_to_string(path) {
                match config.apply_str(&content) {
                    Ok(()) => log::debug!("Loaded demuxer config from {}", path),
                    Err(e) => log::warn!("Ignoring invalid config file {}: {}", path, e),
                }
                break;
            }
        }

        config
    }

    /// Parses `key = value` lines on top of the defaults.
    pub fn parse_str(content: &str) -> Result<Self> {
        let mut config = DemuxConfig::default();
        config.apply_str(content)?;
        Ok(config)
    }

    fn apply_str(&mut self, content: &str) -> Result<()> {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                DemuxError::InvalidData(format!("expected key = value, got {:?}", line))
            })?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            self.set(key.trim(), value)?;
        }
        Ok(())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "force_key_frame_on_discontinuity" => {
                self.force_key_frame_on_discontinuity = value.parse()?
            }
            "mpeg_audio_supported" => self.mpeg_audio_supported = value.parse()?,
            "verify_psi_crc" => self.verify_psi_crc = value.parse()?,
            "read_chunk_size" => {
                let size: usize = value.parse()?;
                if size == 0 {
                    return Err(DemuxError::InvalidData(
                        "read_chunk_size must be non-zero".into(),
                    ));
                }
                self.read_chunk_size = size;
            }
            _ => return Err(DemuxError::InvalidData(format!("unknown config key {:?}", key))),
        }
        Ok(())
    }

    /// Returns a copy of the process-wide configuration.
    pub fn global() -> DemuxConfig {
        match CONFIG.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Re-reads the environment and config files into the process-wide configuration.
    pub fn reload() {
        let new_config = DemuxConfig::load();
        if let Ok(mut config) = CONFIG.write() {
            *config = new_config;
        }
    }
}
