//! Crate-wide configuration: timing mode and seed. Out-of-scope collaborators
//! (file I/O, CLI parsing) own the `PathBuf`; the VM core only needs
//! [`TimingMode`] and a `u32` seed.

/// PAL runs at 50Hz, NTSC at 60Hz; `RenderVideoBuffer` converts a register's
/// frame-count delay into milliseconds using whichever is configured
/// (spec §4.7, §8 scenario 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimingMode {
    #[default]
    Pal,
    Ntsc,
}

impl TimingMode {
    /// Milliseconds per tic unit for this timing mode.
    pub const fn ms_per_tic(self) -> u32 {
        match self {
            TimingMode::Pal => 1000 / 50,
            TimingMode::Ntsc => 1000 / 60,
        }
    }
}

/// Machine-wide configuration. Seed defaults to a random value, as the
/// original does when none is supplied (spec §6).
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub seed: u32,
    pub timing: TimingMode,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            seed: rand::random(),
            timing: TimingMode::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pal_delay_matches_spec_scenario() {
        assert_eq!(4 * TimingMode::Pal.ms_per_tic(), 80);
    }

    #[test]
    fn ntsc_delay_matches_spec_scenario() {
        assert_eq!(4 * TimingMode::Ntsc.ms_per_tic(), 66);
    }
}
