//! WAV output for rendered batches.
//!
//! Files are mono, 32-bit IEEE float, with no metadata chunks, so identical
//! samples always produce identical bytes.

use std::io::{Cursor, Seek, Write};
use std::path::Path;

use crate::error::KernelResult;

/// Format used for every file written here.
pub fn wav_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    }
}

/// Encodes `samples` into any seekable writer.
pub fn write_samples<W: Write + Seek>(writer: W, samples: &[f32], sample_rate: u32) -> KernelResult<()> {
    let mut wav = hound::WavWriter::new(writer, wav_spec(sample_rate))?;
    for &s in samples {
        wav.write_sample(s)?;
    }
    wav.finalize()?;
    Ok(())
}

/// Encodes `samples` into an in-memory WAV file.
pub fn wav_bytes(samples: &[f32], sample_rate: u32) -> KernelResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 4));
    write_samples(&mut cursor, samples, sample_rate)?;
    Ok(cursor.into_inner())
}

/// Writes `samples` to a WAV file at `path`.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> KernelResult<()> {
    let bytes = wav_bytes(samples, sample_rate)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Reads back the samples of a file written by [`write_wav`].
pub fn read_wav(path: &Path) -> KernelResult<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)?;
    let rate = reader.spec().sample_rate;
    let samples = reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?;
    Ok((samples, rate))
}
