use std::io::BufWriter;
use std::path::Path;

use anyhow::Context;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

/// Extracts the raw sample data from a WAV file as little-endian 16-bit
/// PCM bytes, ready for chunked streaming.
pub fn read_pcm(path: impl AsRef<Path>) -> anyhow::Result<Vec<u8>> {
    let path = path.as_ref();
    let mut reader =
        WavReader::open(path).with_context(|| format!("failed to open {}", path.display()))?;

    let spec = reader.spec();
    anyhow::ensure!(
        spec.bits_per_sample == 16 && spec.sample_format == SampleFormat::Int,
        "expected 16-bit integer PCM, got {}-bit {:?}",
        spec.bits_per_sample,
        spec.sample_format
    );

    let mut data = Vec::with_capacity(reader.len() as usize * 2);
    for sample in reader.samples::<i16>() {
        let sample = sample.with_context(|| format!("failed to read {}", path.display()))?;
        data.extend_from_slice(&sample.to_le_bytes());
    }
    Ok(data)
}

/// Records both sides of a conversation into one stereo WAV file: user
/// audio on the left channel, agent audio on the right, with silence on
/// whichever channel is not being written.
///
/// [`DualChannelRecorder::finalize`] must be called before the file is
/// valid; writes after finalize fail.
pub struct DualChannelRecorder {
    writer: Option<WavWriter<BufWriter<std::fs::File>>>,
}

impl DualChannelRecorder {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self, hound::Error> {
        let spec = WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        Ok(Self {
            writer: Some(WavWriter::create(path, spec)?),
        })
    }

    /// Writes user audio to the left channel.
    pub fn write_left(&mut self, data: &[u8]) -> Result<(), hound::Error> {
        self.write_channel(data, true)
    }

    /// Writes agent audio to the right channel.
    pub fn write_right(&mut self, data: &[u8]) -> Result<(), hound::Error> {
        self.write_channel(data, false)
    }

    fn write_channel(&mut self, data: &[u8], left: bool) -> Result<(), hound::Error> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(std::io::Error::other("recorder already finalized").into());
        };

        for chunk in data.chunks_exact(2) {
            let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
            if left {
                writer.write_sample(sample)?;
                writer.write_sample(0i16)?;
            } else {
                writer.write_sample(0i16)?;
                writer.write_sample(sample)?;
            }
        }
        Ok(())
    }

    /// Flushes the headers and closes the file.
    pub fn finalize(&mut self) -> Result<(), hound::Error> {
        match self.writer.take() {
            Some(writer) => writer.finalize(),
            None => Ok(()),
        }
    }
}

impl Drop for DualChannelRecorder {
    // The header lengths are only patched by finalize, so a recorder
    // abandoned on an error path must still finalize for the file to be
    // readable.
    fn drop(&mut self) {
        if self.writer.is_some() {
            if let Err(e) = self.finalize() {
                tracing::error!("failed to finalize recording: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_pcm_returns_little_endian_sample_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("question.wav");

        let spec = WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for sample in [0i16, 1, -1, i16::MAX, i16::MIN] {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();

        let data = read_pcm(&path).unwrap();
        let mut expected = Vec::new();
        for sample in [0i16, 1, -1, i16::MAX, i16::MIN] {
            expected.extend_from_slice(&sample.to_le_bytes());
        }
        assert_eq!(data, expected);
    }

    #[test]
    fn read_pcm_rejects_non_pcm16_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");

        let spec = WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0.5f32).unwrap();
        writer.finalize().unwrap();

        assert!(read_pcm(&path).is_err());
    }

    #[test]
    fn recorder_interleaves_against_silence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversation.wav");

        let mut recorder = DualChannelRecorder::create(&path, 44_100).unwrap();
        recorder.write_left(&1i16.to_le_bytes()).unwrap();
        recorder.write_right(&2i16.to_le_bytes()).unwrap();
        recorder.finalize().unwrap();

        let mut reader = WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![1, 0, 0, 2]);
    }

    #[test]
    fn drop_finalizes_an_abandoned_recorder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abandoned.wav");

        {
            let mut recorder = DualChannelRecorder::create(&path, 44_100).unwrap();
            recorder.write_left(&1i16.to_le_bytes()).unwrap();
        }

        // The file is valid even though finalize was never called.
        let mut reader = WavReader::open(&path).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![1, 0]);
    }

    #[test]
    fn writes_after_finalize_fail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("closed.wav");

        let mut recorder = DualChannelRecorder::create(&path, 44_100).unwrap();
        recorder.finalize().unwrap();
        assert!(recorder.write_left(&[0, 0]).is_err());

        // A second finalize is a no-op.
        recorder.finalize().unwrap();
    }
}
