//! SaveClipAction - writes the detection's audio clip to disk
//!
//! Not independently throttled: invoked inline by the persistence action
//! once the store write has succeeded. Encodes raw PCM either as WAV
//! written directly, or through an external encoder for compressed
//! formats.

use std::path::Path;
use std::process::Stdio;

use bytes::Bytes;
use contracts::{ActionError, ClipFormat, SettingsHandle};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

/// PCM layout shared with the capture frontend: 48 kHz mono s16le
const SAMPLE_RATE: u32 = 48_000;
const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;

/// Writes one clip under the configured export directory
pub struct SaveClipAction {
    settings: SettingsHandle,
    clip_name: String,
    pcm: Bytes,
}

impl SaveClipAction {
    pub fn new(settings: SettingsHandle, clip_name: String, pcm: Bytes) -> Self {
        Self {
            settings,
            clip_name,
            pcm,
        }
    }

    pub fn describe(&self) -> String {
        format!("Save audio clip '{}'", self.clip_name)
    }

    #[instrument(
        name = "save_clip_execute",
        skip(self),
        fields(clip = %self.clip_name)
    )]
    pub async fn execute(&mut self) -> Result<(), ActionError> {
        let export = self.settings.snapshot().await.export;
        let output_path = export.path.join(&self.clip_name);

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| ActionError::clip_export(&self.clip_name, err.to_string()))?;
        }

        match export.format {
            ClipFormat::Wav => write_wav(&output_path, &self.pcm)
                .await
                .map_err(|err| ActionError::clip_export(&self.clip_name, err.to_string()))?,
            ClipFormat::Flac | ClipFormat::Mp3 => {
                encode_with_ffmpeg(&export.ffmpeg_path, &self.pcm, &output_path, &self.clip_name)
                    .await?
            }
        }

        debug!(path = %output_path.display(), bytes = self.pcm.len(), "Clip exported");
        Ok(())
    }
}

/// Write raw PCM under a minimal RIFF/WAVE header
async fn write_wav(path: &Path, pcm: &Bytes) -> std::io::Result<()> {
    let data_len = pcm.len() as u32;
    let byte_rate = SAMPLE_RATE * u32::from(CHANNELS) * u32::from(BITS_PER_SAMPLE) / 8;
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;

    let mut out = Vec::with_capacity(44 + pcm.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&CHANNELS.to_le_bytes());
    out.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(pcm);

    fs::write(path, out).await
}

/// Pipe raw PCM through the external encoder
async fn encode_with_ffmpeg(
    ffmpeg_path: &str,
    pcm: &Bytes,
    output_path: &Path,
    clip_name: &str,
) -> Result<(), ActionError> {
    let mut child = Command::new(ffmpeg_path)
        .args(["-hide_banner", "-loglevel", "error", "-y"])
        .args(["-f", "s16le"])
        .args(["-ar", &SAMPLE_RATE.to_string()])
        .args(["-ac", &CHANNELS.to_string()])
        .args(["-i", "pipe:0"])
        .arg(output_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| ActionError::clip_export(clip_name, format!("spawn encoder: {err}")))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| ActionError::clip_export(clip_name, "encoder stdin unavailable"))?;
    stdin
        .write_all(pcm)
        .await
        .map_err(|err| ActionError::clip_export(clip_name, format!("feed encoder: {err}")))?;
    drop(stdin);

    let output = child
        .wait_with_output()
        .await
        .map_err(|err| ActionError::clip_export(clip_name, err.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ActionError::clip_export(
            clip_name,
            format!("encoder exited with {}: {}", output.status, stderr.trim()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Settings;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_writes_wav_with_header() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.export.path = dir.path().to_path_buf();

        let pcm = Bytes::from(vec![0u8; 4800]);
        let mut action = SaveClipAction::new(
            SettingsHandle::new(settings),
            "robin/clip_1.wav".to_string(),
            pcm,
        );

        action.execute().await.unwrap();

        let written = std::fs::read(dir.path().join("robin/clip_1.wav")).unwrap();
        assert_eq!(&written[..4], b"RIFF");
        assert_eq!(&written[8..12], b"WAVE");
        assert_eq!(written.len(), 44 + 4800);
    }

    #[tokio::test]
    async fn test_directory_creation_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.export.path = dir.path().to_path_buf();
        let handle = SettingsHandle::new(settings);

        for i in 0..2 {
            let mut action = SaveClipAction::new(
                handle.clone(),
                format!("nested/deep/clip_{i}.wav"),
                Bytes::from_static(&[0u8; 16]),
            );
            action.execute().await.unwrap();
        }

        assert!(dir.path().join("nested/deep/clip_0.wav").exists());
        assert!(dir.path().join("nested/deep/clip_1.wav").exists());
    }

    #[tokio::test]
    async fn test_missing_encoder_is_reported() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.export.path = dir.path().to_path_buf();
        settings.export.format = ClipFormat::Flac;
        settings.export.ffmpeg_path = "/nonexistent/encoder".to_string();

        let mut action = SaveClipAction::new(
            SettingsHandle::new(settings),
            "clip.flac".to_string(),
            Bytes::from_static(&[0u8; 16]),
        );

        let err = action.execute().await.unwrap_err();
        assert!(matches!(err, ActionError::ClipExport { .. }));
    }
}
