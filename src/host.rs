//! The capability set the VM is polymorphic over (spec §4.9). The VM calls
//! these three methods and never blocks inside them.

use crate::video::Rgba;
use crate::video::{HEIGHT, WIDTH};

/// A 320x200 RGBA surface the host owns and the VM blits into.
pub type Surface = [Rgba; WIDTH * HEIGHT];

pub trait Host {
    /// A new front frame is ready; `delay_ms` is the pacing hint computed
    /// from `R[frame_duration]` and the configured timing mode (spec §4.7).
    fn video_frame_ready(&mut self, buffer_id: u8, delay_ms: u32);

    /// Observation hook fired after every draw mutation to any buffer.
    /// Hosts that only care about the published front buffer can ignore it.
    fn video_buffer_changed(&mut self, buffer_id: u8) {
        let _ = buffer_id;
    }

    /// Delivers mixed 8-bit PCM samples produced during the last frame delay.
    fn audio_ready(&mut self, buffer_samples: &[u8]);
}
