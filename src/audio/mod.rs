//! The 4-channel PCM mixer and music stepper (spec §4.8).

pub mod audio;
pub mod mixer;
pub mod music;

pub use audio::{Audio, PLAYBACK_FREQUENCY_TABLE};
pub use mixer::{ClassicMixer, Mixer, SampleError, SoundSample, CHANNEL_COUNT};
pub use music::{MusicError, MusicModule, MusicPlayer, Stepper};
