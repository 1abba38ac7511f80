//! The 4-channel music module format (spec §4.8): a pattern list plus an
//! order table, stepped one row at a time by [`MusicPlayer`].

use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt};
use thiserror::Error;

use crate::audio::mixer::Mixer;

const NUM_INSTRUMENTS: usize = 15;
const ORDER_TABLE_LEN: usize = 0x80;
const LINES_PER_PATTERN: usize = 64;
const NOTE_WORDS: usize = 4; // 4 channels, 2 words per note.

#[derive(Error, Debug)]
pub enum MusicError {
    #[error("music resource of {0} bytes is too short for its header")]
    TooShort(usize),
    #[error("pattern data length {0} is not a multiple of a single pattern")]
    Misaligned(usize),
}

#[derive(Debug, Clone, Copy)]
pub struct Instrument {
    pub resource_id: u16,
    pub volume: u16,
}

#[derive(Debug, Clone, Copy)]
enum NoteEffect {
    VolumeUp(u8),
    VolumeDown(u8),
}

#[derive(Debug, Clone, Copy)]
enum Note {
    Silent,
    Stop,
    SetMarker(i16),
    Play {
        instrument: u8,
        freq_hz: u32,
        effect: Option<NoteEffect>,
    },
}

impl Note {
    fn parse(note: u16, sample_word: u16) -> Note {
        match note {
            0 => Note::Silent,
            0xFFFE => Note::Stop,
            0xFFFD => Note::SetMarker(sample_word as i16),
            0x0037..=0x0FFF => {
                let instrument = ((sample_word & 0xF000) >> 12) as u8;
                let freq_hz = 7_159_092u32 / (note as u32 * 2);
                let param = (sample_word & 0x00FF) as u8;
                let effect = match (sample_word & 0x0F00) >> 8 {
                    5 => Some(NoteEffect::VolumeUp(param)),
                    6 => Some(NoteEffect::VolumeDown(param)),
                    _ => None,
                };
                Note::Play {
                    instrument,
                    freq_hz,
                    effect,
                }
            }
            _ => Note::Silent,
        }
    }
}

/// A single playback row: up to 4 notes, one per channel.
#[derive(Debug, Clone, Copy)]
struct PatternLine([Note; 4]);

#[derive(Debug)]
struct Pattern {
    lines: Vec<PatternLine>,
}

/// A parsed music resource: tempo, instrument table, order table, and the
/// patterns they reference (spec §4.8).
#[derive(Debug)]
pub struct MusicModule {
    pub delay: u16,
    pub instruments: [Instrument; NUM_INSTRUMENTS],
    order_table: Vec<u8>,
    patterns: Vec<Pattern>,
}

impl MusicModule {
    pub fn parse(bytes: &[u8]) -> Result<Self, MusicError> {
        let header_len = 2 + NUM_INSTRUMENTS * 4 + 2 + ORDER_TABLE_LEN;
        if bytes.len() < header_len {
            return Err(MusicError::TooShort(bytes.len()));
        }
        let mut cursor = bytes;
        let delay = cursor.read_u16::<BigEndian>().unwrap();
        let mut instruments = [Instrument {
            resource_id: 0,
            volume: 0,
        }; NUM_INSTRUMENTS];
        for instrument in instruments.iter_mut() {
            instrument.resource_id = cursor.read_u16::<BigEndian>().unwrap();
            instrument.volume = cursor.read_u16::<BigEndian>().unwrap();
        }
        let num_order = cursor.read_u16::<BigEndian>().unwrap() as usize;
        let mut order_table = vec![0u8; ORDER_TABLE_LEN];
        cursor.read_exact(&mut order_table).unwrap();
        order_table.truncate(num_order.min(ORDER_TABLE_LEN));

        let pattern_bytes = &bytes[header_len..];
        let bytes_per_pattern = LINES_PER_PATTERN * NOTE_WORDS * 2;
        if pattern_bytes.len() % bytes_per_pattern != 0 {
            return Err(MusicError::Misaligned(pattern_bytes.len()));
        }
        let patterns = pattern_bytes
            .chunks_exact(bytes_per_pattern)
            .map(|chunk| {
                let mut lines = Vec::with_capacity(LINES_PER_PATTERN);
                for line_chunk in chunk.chunks_exact(NOTE_WORDS * 2) {
                    let mut notes = [Note::Silent; 4];
                    let mut words = line_chunk;
                    for note in notes.iter_mut() {
                        let a = words.read_u16::<BigEndian>().unwrap();
                        let b = words.read_u16::<BigEndian>().unwrap();
                        *note = Note::parse(a, b);
                    }
                    lines.push(PatternLine(notes));
                }
                Pattern { lines }
            })
            .collect();

        Ok(MusicModule {
            delay,
            instruments,
            order_table,
            patterns,
        })
    }
}

pub trait MusicPlayer {
    fn play(&mut self, module: MusicModule, tempo: u16, start_pos: u8);
    fn set_tempo(&mut self, tempo: u16);
    fn stop(&mut self);
    /// Advances playback by one tic, issuing `Mixer` calls for any notes
    /// triggered, and returning a marker value if a `SetMarker` note fired
    /// (written back into the VM's music-mark register, spec §4.8).
    fn step(&mut self, mixer: &mut dyn Mixer) -> Option<i16>;
}

/// Steps one row per tic through the order table (spec §4.8).
pub struct Stepper {
    module: Option<MusicModule>,
    tempo: u16,
    order_index: usize,
    row_index: usize,
}

impl Default for Stepper {
    fn default() -> Self {
        Stepper {
            module: None,
            tempo: 0,
            order_index: 0,
            row_index: 0,
        }
    }
}

impl MusicPlayer for Stepper {
    fn play(&mut self, module: MusicModule, tempo: u16, start_pos: u8) {
        self.tempo = if tempo != 0 { tempo } else { module.delay };
        self.order_index = start_pos as usize;
        self.row_index = 0;
        self.module = Some(module);
    }

    fn set_tempo(&mut self, tempo: u16) {
        if tempo != 0 {
            self.tempo = tempo;
        }
    }

    fn stop(&mut self) {
        self.module = None;
    }

    fn step(&mut self, mixer: &mut dyn Mixer) -> Option<i16> {
        let module = self.module.as_ref()?;
        let pattern_index = *module.order_table.get(self.order_index)? as usize;
        let pattern = module.patterns.get(pattern_index)?;
        let line = pattern.lines.get(self.row_index)?;

        let mut marker = None;
        for (channel, note) in line.0.iter().enumerate() {
            match note {
                Note::Silent => {}
                Note::Stop => mixer.stop(channel as u8),
                Note::SetMarker(value) => marker = Some(*value),
                Note::Play {
                    instrument,
                    freq_hz,
                    effect: _,
                } => {
                    if *instrument != 0 {
                        let resource_id = module.instruments[*instrument as usize - 1].resource_id;
                        let volume = module.instruments[*instrument as usize - 1].volume.min(0x40) as u8;
                        mixer.play(resource_id, channel as u8, *freq_hz, volume);
                    }
                }
            }
        }

        self.row_index += 1;
        if self.row_index >= LINES_PER_PATTERN {
            self.row_index = 0;
            self.order_index += 1;
        }
        marker
    }
}
