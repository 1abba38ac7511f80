//! `Audio`: routes the four sound/music bytecode ops into a [`Mixer`] and
//! [`MusicPlayer`] and produces PCM for the host (spec §4.8).

use log::warn;

use crate::audio::mixer::{ClassicMixer, Mixer, SoundSample};
use crate::audio::music::{MusicModule, MusicPlayer, Stepper};

/// Frequency table indexed by the `freq` operand of `ControlSound`
/// (spec §4.8), inherited from the original engine's fixed lookup table.
pub const PLAYBACK_FREQUENCY_TABLE: [u16; 40] = [
    0x0CFF, 0x0DC3, 0x0E91, 0x0F6F, 0x1056, 0x114E, 0x1259, 0x136C, 0x149F, 0x15D9, 0x1726, 0x1888,
    0x19FD, 0x1B86, 0x1D21, 0x1EDE, 0x20AB, 0x229C, 0x24B3, 0x26D7, 0x293F, 0x2BB2, 0x2E4C, 0x3110,
    0x33FB, 0x370D, 0x3A43, 0x3DDF, 0x4157, 0x4538, 0x4998, 0x4DAE, 0x5240, 0x5764, 0x5C9A, 0x61C8,
    0x6793, 0x6E19, 0x7485, 0x7BBD,
];

pub struct Audio {
    mixer: ClassicMixer,
    music: Stepper,
    output_rate: u32,
}

impl Audio {
    pub fn new(output_rate: u32) -> Self {
        Audio {
            mixer: ClassicMixer::new(output_rate),
            music: Stepper::default(),
            output_rate,
        }
    }

    /// Bytecode op 24, `ControlSound` (spec §4.6). A missing resource is
    /// logged and ignored, per spec §7's local-recovery rule.
    pub fn play_sound(&mut self, sample_bytes: &[u8], sample_id: u16, channel: u8, freq_index: u8, volume: u8) {
        if volume == 0 {
            self.mixer.stop(channel);
            return;
        }
        match SoundSample::from_resource_bytes(sample_bytes) {
            Ok(sample) => {
                self.mixer.add_sample(sample_id, sample);
                let index = (freq_index as usize).min(PLAYBACK_FREQUENCY_TABLE.len() - 1);
                let freq_hz = PLAYBACK_FREQUENCY_TABLE[index] as u32;
                self.mixer.play(sample_id, channel, freq_hz, volume);
            }
            Err(err) => warn!("sound resource {sample_id} could not be decoded: {err}"),
        }
    }

    pub fn stop_channel(&mut self, channel: u8) {
        self.mixer.stop(channel);
    }

    /// Bytecode op 26, `ControlMusic` (spec §4.6).
    pub fn control_music(&mut self, music_bytes: Option<&[u8]>, tempo: u16, offset: u8) {
        match music_bytes {
            Some(bytes) => match MusicModule::parse(bytes) {
                Ok(module) => self.music.play(module, tempo, offset),
                Err(err) => warn!("music resource could not be decoded: {err}"),
            },
            None if tempo != 0 => self.music.set_tempo(tempo),
            None => self.music.stop(),
        }
    }

    /// Advances music playback by one tic and returns a marker value if the
    /// current row set one (spec §4.8, register `music_mark`).
    pub fn tick_music(&mut self) -> Option<i16> {
        self.music.step(&mut self.mixer)
    }

    pub fn produce_audio(&mut self, out: &mut [u8]) {
        self.mixer.produce(out);
    }

    /// Synthesizes the PCM a `RenderVideoBuffer` frame delay is worth, at
    /// this `Audio`'s configured output rate (spec §4.8).
    pub fn produce_for_duration(&mut self, duration_ms: u32) -> Vec<u8> {
        let sample_count = (self.output_rate as u64 * duration_ms as u64 / 1000) as usize;
        let mut out = vec![0u8; sample_count];
        self.produce_audio(&mut out);
        out
    }

    pub fn reset(&mut self) {
        self.mixer.reset();
        self.music.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_volume_stops_the_channel_instead_of_playing() {
        let mut audio = Audio::new(22050);
        audio.play_sound(&[0u8; 16], 3, 1, 0, 0);
        let mut out = vec![0u8; 4];
        audio.produce_audio(&mut out);
        assert!(out.iter().all(|&b| b == 0x80));
    }
}
