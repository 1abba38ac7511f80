//! PCM sound-effect mixing (spec §4.8). Samples are single-channel signed
//! 8-bit, with an optional loop point encoded in a small header.

use byteorder::{BigEndian, ReadBytesExt};
use log::warn;
use thiserror::Error;

pub const CHANNEL_COUNT: usize = 4;

#[derive(Error, Debug)]
pub enum SampleError {
    #[error("sound resource of {0} bytes is too short for its header")]
    TooShort(usize),
}

/// A decoded sound-effect resource: signed 8-bit PCM with an optional loop
/// tail (spec §4.8, grounded on the Another World sound resource layout).
#[derive(Debug)]
pub struct SoundSample {
    data: Vec<i8>,
    len: u16,
    loop_len: u16,
}

impl SoundSample {
    pub fn from_resource_bytes(bytes: &[u8]) -> Result<Self, SampleError> {
        if bytes.len() < 8 {
            return Err(SampleError::TooShort(bytes.len()));
        }
        let mut header = &bytes[0..4];
        let len = header.read_u16::<BigEndian>().unwrap();
        let loop_len = header.read_u16::<BigEndian>().unwrap();
        let declared_len = len as usize * 2 + loop_len as usize * 2;
        let actual_len = bytes.len() - 8;
        let data_len = if declared_len != actual_len {
            warn!("sound resource reported a length of {declared_len} bytes, but data is {actual_len} bytes");
            declared_len.min(actual_len)
        } else {
            actual_len
        };
        let data = bytes[8..8 + data_len].iter().map(|&b| b as i8).collect::<Vec<_>>();
        Ok(SoundSample { data, len, loop_len })
    }

    /// Start of the loop tail, the byte right after the main segment
    /// (spec §4.8).
    pub fn loop_pos(&self) -> Option<usize> {
        if self.loop_len == 0 {
            None
        } else {
            Some((self.len as usize * 2).min(self.data.len()))
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A mixer capable of playing samples over [`CHANNEL_COUNT`] channels and
/// producing interleaved mono output (spec §4.8).
pub trait Mixer {
    fn add_sample(&mut self, id: u16, sample: SoundSample);
    fn play(&mut self, sample_id: u16, channel: u8, freq_hz: u32, volume: u8);
    fn stop(&mut self, channel: u8);
    fn reset(&mut self);
    fn produce(&mut self, out: &mut [u8]);
}

enum ChannelState {
    Inactive,
    Active {
        sample_id: u16,
        volume: u8,
        chunk_pos: usize,
        chunk_inc: usize,
    },
}

/// The classic sub-sample-interpolating mixer used by the original engine
/// (spec §4.8).
pub struct ClassicMixer {
    samples: std::collections::HashMap<u16, SoundSample>,
    channels: [ChannelState; CHANNEL_COUNT],
    output_rate: u32,
}

impl ClassicMixer {
    pub fn new(output_rate: u32) -> Self {
        ClassicMixer {
            samples: std::collections::HashMap::new(),
            channels: [
                ChannelState::Inactive,
                ChannelState::Inactive,
                ChannelState::Inactive,
                ChannelState::Inactive,
            ],
            output_rate,
        }
    }
}

impl Mixer for ClassicMixer {
    fn add_sample(&mut self, id: u16, sample: SoundSample) {
        self.samples.insert(id, sample);
    }

    fn play(&mut self, sample_id: u16, channel: u8, freq_hz: u32, volume: u8) {
        if !self.samples.contains_key(&sample_id) {
            return;
        }
        let chunk_inc = ((freq_hz as u64) << 8) / self.output_rate as u64;
        self.channels[channel as usize & 3] = ChannelState::Active {
            sample_id,
            volume: volume.min(0x40),
            chunk_pos: 0,
            chunk_inc: chunk_inc as usize,
        };
    }

    fn stop(&mut self, channel: u8) {
        self.channels[channel as usize & 3] = ChannelState::Inactive;
    }

    fn reset(&mut self) {
        self.samples.clear();
        for channel in self.channels.iter_mut() {
            *channel = ChannelState::Inactive;
        }
    }

    fn produce(&mut self, out: &mut [u8]) {
        out.fill(0x80);
        for channel in self.channels.iter_mut() {
            let ChannelState::Active {
                sample_id,
                volume,
                chunk_pos,
                chunk_inc,
            } = channel
            else {
                continue;
            };
            let Some(sample) = self.samples.get(sample_id) else {
                *channel = ChannelState::Inactive;
                continue;
            };
            let loop_pos = sample.loop_pos();

            for byte in out.iter_mut() {
                let mut pos = *chunk_pos >> 8;
                if pos >= sample.len() {
                    match loop_pos {
                        None => {
                            *channel = ChannelState::Inactive;
                            break;
                        }
                        Some(start) => {
                            pos = start + (pos - sample.len());
                            *chunk_pos = (pos << 8) + (*chunk_pos & 0xFF);
                        }
                    }
                }
                let next_pos = match pos + 1 {
                    p if p >= sample.len() => loop_pos.unwrap_or(pos),
                    p => p,
                };
                let frac = (*chunk_pos & 0xFF) as i32;
                let sample_data = sample_ref(sample);
                let s1 = sample_data[pos] as i32;
                let s2 = sample_data[next_pos] as i32;
                let interpolated = (s1 * (0x100 - frac) + s2 * frac) >> 8;
                let scaled = (interpolated * *volume as i32) / 0x40;
                let mixed = scaled + (*byte as i32 - 0x80);
                *byte = (mixed.clamp(-128, 127) as u8) ^ 0x80;
                *chunk_pos += *chunk_inc;
            }
        }
    }
}

fn sample_ref(sample: &SoundSample) -> &[i8] {
    &sample.data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: u16, loop_len: u16, data: &[i8]) -> Vec<u8> {
        let mut bytes = vec![0u8; 8];
        bytes[0..2].copy_from_slice(&len.to_be_bytes());
        bytes[2..4].copy_from_slice(&loop_len.to_be_bytes());
        bytes.extend(data.iter().map(|&b| b as u8));
        bytes
    }

    #[test]
    fn sample_without_loop_reports_none() {
        let bytes = sample(2, 0, &[1, 2, 3, 4]);
        let s = SoundSample::from_resource_bytes(&bytes).unwrap();
        assert_eq!(s.loop_pos(), None);
    }

    #[test]
    fn sample_with_loop_reports_the_byte_after_the_main_segment() {
        let bytes = sample(2, 1, &[1, 2, 3, 4, 5, 6]);
        let s = SoundSample::from_resource_bytes(&bytes).unwrap();
        assert_eq!(s.loop_pos(), Some(4));
        assert_eq!(s.len(), 6);
    }

    #[test]
    fn declared_length_longer_than_actual_data_is_clamped() {
        // Header claims 10 bytes (len=5, loop_len=0) but only 4 are present.
        let bytes = sample(5, 0, &[1, 2, 3, 4]);
        let s = SoundSample::from_resource_bytes(&bytes).unwrap();
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn declared_length_shorter_than_actual_data_is_clamped() {
        // Header claims 2 bytes (len=1, loop_len=0) but 4 are present.
        let bytes = sample(1, 0, &[1, 2, 3, 4]);
        let s = SoundSample::from_resource_bytes(&bytes).unwrap();
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn stopped_channel_produces_silence() {
        let mut mixer = ClassicMixer::new(22050);
        let mut out = vec![0u8; 8];
        mixer.produce(&mut out);
        assert!(out.iter().all(|&b| b == 0x80));
    }

    #[test]
    fn playing_an_unknown_sample_id_is_a_no_op() {
        let mut mixer = ClassicMixer::new(22050);
        mixer.play(5, 0, 4000, 63);
        let mut out = vec![0u8; 4];
        mixer.produce(&mut out);
        assert!(out.iter().all(|&b| b == 0x80));
    }
}
