//! Local audio playback sink
//!
//! Plays synthesized assets straight to the default output device so the
//! broadcast software picks them up from desktop audio. Decoding and output
//! run on a blocking thread; the async `play` resolves when the file has
//! finished.

#![warn(missing_docs)]
#![warn(clippy::all)]

use async_trait::async_trait;
use livehost_core::playback::AudioSink;
use livehost_core::{LiveHostError, Result};
use rodio::{Decoder, OutputStream, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Playback sink backed by the system default output device
pub struct RodioSink {
    /// Playback volume, 0.0 to 1.0
    volume: f32,
}

impl RodioSink {
    /// Create a sink at full volume
    pub fn new() -> Self {
        Self { volume: 1.0 }
    }

    /// Create a sink with a specific volume (clamped to 0.0..=1.0)
    pub fn with_volume(volume: f32) -> Self {
        Self {
            volume: volume.clamp(0.0, 1.0),
        }
    }

    fn play_blocking(path: &Path, volume: f32) -> Result<()> {
        // The output stream must outlive the sink; both live on this
        // blocking thread for the duration of the file
        let (_stream, handle) = OutputStream::try_default()
            .map_err(|e| LiveHostError::playback(format!("no output device: {}", e)))?;
        let sink = Sink::try_new(&handle)
            .map_err(|e| LiveHostError::playback(format!("cannot open sink: {}", e)))?;

        let file = File::open(path)?;
        let decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| LiveHostError::playback(format!("cannot decode {}: {}", path.display(), e)))?;

        sink.set_volume(volume);
        sink.append(decoder);
        sink.sleep_until_end();
        Ok(())
    }
}

impl Default for RodioSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioSink for RodioSink {
    async fn play(&self, path: &Path) -> Result<()> {
        let path: PathBuf = path.to_path_buf();
        let volume = self.volume;
        tokio::task::spawn_blocking(move || Self::play_blocking(&path, volume))
            .await
            .map_err(|e| LiveHostError::playback(format!("playback thread panicked: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_is_clamped() {
        assert_eq!(RodioSink::with_volume(2.5).volume, 1.0);
        assert_eq!(RodioSink::with_volume(-1.0).volume, 0.0);
        assert_eq!(RodioSink::with_volume(0.4).volume, 0.4);
    }

    #[tokio::test]
    async fn test_missing_file_is_a_playback_error() {
        let sink = RodioSink::new();
        let err = sink.play(Path::new("/no/such/file.mp3")).await.unwrap_err();
        // Either the device or the file fails first depending on the host;
        // both surface as errors rather than hanging the queue
        assert!(!err.to_string().is_empty());
    }
}
