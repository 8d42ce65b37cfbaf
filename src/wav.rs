//! Silence padding for WAV responses.
//!
//! The container is decoded and re-encoded so the RIFF and data chunk sizes
//! match the new frame count. Anything other than integer 16-bit PCM at the
//! requested rate is passed through untouched.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use tracing::debug;

/// Frames of silence for `pad_ms` at `sample_rate`.
pub fn pad_frames(pad_ms: u32, sample_rate: u32) -> u32 {
    (sample_rate as f64 * pad_ms as f64 / 1000.0).round() as u32
}

/// Insert `pad_ms` of silence before the audio, and after it as well when
/// `trailing` is set. Returns the input unchanged when it cannot be padded.
pub fn pad_silence(wav: Vec<u8>, pad_ms: u32, sample_rate: u32, trailing: bool) -> Vec<u8> {
    let frames = pad_frames(pad_ms, sample_rate);
    if frames == 0 {
        return wav;
    }
    match rewrite_with_silence(&wav, frames, sample_rate, trailing) {
        Ok(Some(padded)) => padded,
        Ok(None) => wav,
        Err(e) => {
            debug!(error = %e, "Could not parse WAV for padding, returning original audio");
            wav
        }
    }
}

fn rewrite_with_silence(
    wav: &[u8],
    frames: u32,
    sample_rate: u32,
    trailing: bool,
) -> Result<Option<Vec<u8>>, hound::Error> {
    let mut reader = WavReader::new(Cursor::new(wav))?;
    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int
        || spec.bits_per_sample != 16
        || spec.sample_rate != sample_rate
    {
        debug!(
            bits = spec.bits_per_sample,
            rate = spec.sample_rate,
            requested_rate = sample_rate,
            "WAV is not 16-bit PCM at the requested rate, skipping padding"
        );
        return Ok(None);
    }

    let samples = reader.samples::<i16>().collect::<Result<Vec<_>, _>>()?;
    let silence = frames as usize * spec.channels as usize;

    let out_spec = WavSpec {
        channels: spec.channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut out = Cursor::new(Vec::with_capacity(wav.len() + silence * 4));
    {
        let mut writer = WavWriter::new(&mut out, out_spec)?;
        for _ in 0..silence {
            writer.write_sample(0i16)?;
        }
        for s in &samples {
            writer.write_sample(*s)?;
        }
        if trailing {
            for _ in 0..silence {
                writer.write_sample(0i16)?;
            }
        }
        writer.finalize()?;
    }
    Ok(Some(out.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_wav(frames: u32, channels: u16, rate: u32, bits: u16) -> Vec<u8> {
        let spec = WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: bits,
            sample_format: SampleFormat::Int,
        };
        let mut out = Cursor::new(Vec::new());
        {
            let mut w = WavWriter::new(&mut out, spec).unwrap();
            for i in 0..frames * channels as u32 {
                if bits == 8 {
                    w.write_sample((i % 100) as i8).unwrap();
                } else {
                    w.write_sample((i % 1000) as i16 + 1).unwrap();
                }
            }
            w.finalize().unwrap();
        }
        out.into_inner()
    }

    fn frames_of(wav: &[u8]) -> u32 {
        WavReader::new(Cursor::new(wav)).unwrap().duration()
    }

    #[test]
    fn test_pad_200ms_at_24k() {
        let wav = make_wav(1000, 1, 24000, 16);
        let padded = pad_silence(wav, 200, 24000, false);
        assert_eq!(frames_of(&padded), 1000 + 4800);

        let mut reader = WavReader::new(Cursor::new(&padded)).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert!(samples[..4800].iter().all(|s| *s == 0));
        assert_eq!(samples[4800], 1);
    }

    #[test]
    fn test_pad_stereo_trailing() {
        let wav = make_wav(10, 2, 22050, 16);
        let padded = pad_silence(wav, 10, 22050, true);
        // round(22050 * 0.01) = 221 frames on each side
        assert_eq!(frames_of(&padded), 10 + 2 * 221);
        assert_eq!(WavReader::new(Cursor::new(&padded)).unwrap().spec().channels, 2);
    }

    #[test]
    fn test_rate_mismatch_untouched() {
        let wav = make_wav(100, 1, 22050, 16);
        assert_eq!(pad_silence(wav.clone(), 200, 24000, false), wav);
    }

    #[test]
    fn test_non_pcm16_untouched() {
        let wav = make_wav(100, 1, 24000, 8);
        assert_eq!(pad_silence(wav.clone(), 200, 24000, false), wav);
    }

    #[test]
    fn test_garbage_untouched() {
        let junk = b"ID3\x03not a wav".to_vec();
        assert_eq!(pad_silence(junk.clone(), 200, 24000, false), junk);
    }

    #[test]
    fn test_zero_pad_untouched() {
        let wav = make_wav(5, 1, 24000, 16);
        assert_eq!(pad_silence(wav.clone(), 0, 24000, false), wav);
    }
}
