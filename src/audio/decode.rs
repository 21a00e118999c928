//! Decoding of backend audio payloads into PCM.
//!
//! The backend attaches audio as a base64 string wrapping a compressed
//! container (MP3 from the TTS service, WAV/PCM in tests). Symphonia probes
//! the container and the decode loop downmixes to mono f32.

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// A fully decoded payload: mono samples at the container's native rate.
#[derive(Debug, Clone)]
pub struct PcmBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PcmBuffer {
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

pub fn decode_base64_payload(payload: &str) -> Result<PcmBuffer> {
    let bytes = BASE64
        .decode(payload.trim())
        .context("payload is not valid base64")?;
    decode_bytes(bytes)
}

pub fn decode_bytes(bytes: Vec<u8>) -> Result<PcmBuffer> {
    let mss = MediaSourceStream::new(Box::new(std::io::Cursor::new(bytes)), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("unrecognized audio container")?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("no decodable audio track")?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("unsupported codec")?;

    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1)
        .max(1);

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e).context("failed to read audio packet"),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                if sample_buf.is_none() {
                    let spec = *decoded.spec();
                    sample_rate = spec.rate;
                    channels = spec.channels.count().max(1);
                    sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                }
                if let Some(buf) = &mut sample_buf {
                    buf.copy_interleaved_ref(decoded);
                    for frame in buf.samples().chunks_exact(channels) {
                        samples.push(frame.iter().sum::<f32>() / channels as f32);
                    }
                }
            }
            // Recoverable: skip the malformed packet and continue.
            Err(SymphoniaError::DecodeError(e)) => {
                log::debug!("Skipping bad packet: {}", e);
            }
            Err(e) => return Err(e).context("audio decode failed"),
        }
    }

    if samples.is_empty() || sample_rate == 0 {
        bail!("decoded stream contained no samples");
    }
    Ok(PcmBuffer {
        samples,
        sample_rate,
    })
}

/// Test fixtures shared by the audio modules.
#[cfg(test)]
pub(crate) mod test_support {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;

    /// Minimal PCM s16le mono WAV container.
    pub(crate) fn wav_bytes(samples: &[i16], sample_rate: u32) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let mut out = Vec::with_capacity(44 + samples.len() * 2);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
        out.extend_from_slice(&2u16.to_le_bytes()); // block align
        out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    pub(crate) fn wav_base64(samples: &[i16], sample_rate: u32) -> String {
        BASE64.encode(wav_bytes(samples, sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{wav_base64, wav_bytes};
    use super::*;

    #[test]
    fn decodes_pcm_wav() {
        let samples: Vec<i16> = (0..800)
            .map(|i| (8000.0 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 8000.0).sin()) as i16)
            .collect();
        let buffer = decode_bytes(wav_bytes(&samples, 8000)).unwrap();
        assert_eq!(buffer.sample_rate, 8000);
        assert_eq!(buffer.samples.len(), 800);
        assert!((buffer.duration_secs() - 0.1).abs() < 1e-3);
        // Signal survives the int→float conversion
        assert!(buffer.samples.iter().any(|s| s.abs() > 0.1));
    }

    #[test]
    fn base64_roundtrip() {
        let payload = wav_base64(&[0i16; 160], 16000);
        let buffer = decode_base64_payload(&payload).unwrap();
        assert_eq!(buffer.sample_rate, 16000);
        assert_eq!(buffer.samples.len(), 160);
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(decode_base64_payload("not base64 !!!").is_err());
    }

    #[test]
    fn rejects_garbage_bytes() {
        assert!(decode_bytes(vec![0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01]).is_err());
    }

    #[test]
    fn rejects_empty_payload() {
        assert!(decode_bytes(Vec::new()).is_err());
    }
}
