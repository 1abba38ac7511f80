use std::num::NonZeroU32;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use aw_vm::resource::FsResourceReader;
use aw_vm::video::{FRONT_BUFFER_ID, HEIGHT, WIDTH};
use aw_vm::{Config, DefaultStringTable, GamePart, Host, Input, Machine, Surface, TimingMode};
use clap::Parser;
use log::{error, info};
use softbuffer::{Context, Surface as SoftbufferSurface};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::EventLoopExtPumpEvents;
use winit::window::WindowBuilder;

const SCALE_FACTOR: usize = 3;
const SCALED_W: usize = WIDTH * SCALE_FACTOR;
const SCALED_H: usize = HEIGHT * SCALE_FACTOR;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory containing MEMLIST.BIN and the BANK* files.
    #[arg(short, long, default_value = "./another_world")]
    data_dir: String,

    #[arg(long)]
    ntsc: bool,

    #[arg(long)]
    seed: Option<u32>,
}

/// Accumulates the pressed/released key state into the VM's [`Input`]
/// between tics (spec §4.9 host responsibilities).
#[derive(Default)]
struct InputState {
    input: Input,
}

impl InputState {
    fn apply(&mut self, key: KeyCode, state: ElementState) {
        let pressed = state == ElementState::Pressed;
        match key {
            KeyCode::ArrowLeft => self.input.left = pressed,
            KeyCode::ArrowRight => self.input.right = pressed,
            KeyCode::ArrowUp => self.input.up = pressed,
            KeyCode::ArrowDown => self.input.down = pressed,
            KeyCode::Space | KeyCode::Enter => self.input.action = pressed,
            KeyCode::F1 if pressed => self.input.show_password_screen = true,
            _ => {}
        }
    }
}

/// Blits a VM-rendered [`Surface`] into a softbuffer window, nearest-neighbor
/// scaled, and plays back mixed PCM through no output device of its own;
/// `aw_vm` only produces samples, a real frontend would forward them to an
/// audio backend.
struct Frontend<'a> {
    surface: SoftbufferSurface<&'a winit::window::Window, &'a winit::window::Window>,
}

impl<'a> Frontend<'a> {
    fn new(window: &'a winit::window::Window) -> Self {
        let context = Context::new(window).expect("softbuffer context");
        let surface = SoftbufferSurface::new(&context, window).expect("softbuffer surface");
        Frontend { surface }
    }

    fn present(&mut self, frame: &Surface) {
        let (Some(w), Some(h)) = (NonZeroU32::new(SCALED_W as u32), NonZeroU32::new(SCALED_H as u32)) else {
            return;
        };
        if self.surface.resize(w, h).is_err() {
            return;
        }
        let Ok(mut dest) = self.surface.buffer_mut() else {
            return;
        };
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                let c = frame[y * WIDTH + x];
                let packed = (u32::from(c.r) << 16) | (u32::from(c.g) << 8) | u32::from(c.b);
                for sy in 0..SCALE_FACTOR {
                    let row = (y * SCALE_FACTOR + sy) * SCALED_W;
                    for sx in 0..SCALE_FACTOR {
                        dest[row + x * SCALE_FACTOR + sx] = packed;
                    }
                }
            }
        }
        let _ = dest.present();
    }
}

/// Host adapter: records the last rendered front buffer and the PCM produced
/// alongside it (spec §4.9). The event loop drains both after every tic.
struct WindowHost {
    frame: Surface,
    frame_ready: bool,
    delay_ms: u32,
    audio: Vec<u8>,
}

impl Default for WindowHost {
    fn default() -> Self {
        WindowHost {
            frame: [Default::default(); WIDTH * HEIGHT],
            frame_ready: false,
            delay_ms: 0,
            audio: Vec::new(),
        }
    }
}

impl Host for WindowHost {
    fn video_frame_ready(&mut self, buffer_id: u8, delay_ms: u32) {
        let _ = buffer_id;
        self.frame_ready = true;
        self.delay_ms = delay_ms;
    }

    fn audio_ready(&mut self, buffer_samples: &[u8]) {
        self.audio.extend_from_slice(buffer_samples);
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(err) = run(args) {
        error!("terminated: {err}");
        process::exit(1);
    }
    info!("terminated successfully");
}

#[derive(Debug)]
enum RunError {
    Machine(aw_vm::MachineError),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Machine(e) => write!(f, "{e}"),
        }
    }
}

impl From<aw_vm::MachineError> for RunError {
    fn from(value: aw_vm::MachineError) -> Self {
        RunError::Machine(value)
    }
}

fn run(args: Args) -> Result<(), RunError> {
    let reader = FsResourceReader::new(PathBuf::from(args.data_dir));
    let config = Config {
        seed: args.seed.unwrap_or_else(|| Config::default().seed),
        timing: if args.ntsc { TimingMode::Ntsc } else { TimingMode::Pal },
    };
    let mut machine = Machine::new(reader, config, Box::new(DefaultStringTable::default()))?;
    machine.schedule_game_part(GamePart::IntroCinematic);

    let mut event_loop = EventLoop::new().unwrap();
    let window = WindowBuilder::new()
        .with_title("Another World")
        .with_inner_size(LogicalSize::new(SCALED_W as u32, SCALED_H as u32))
        .with_resizable(false)
        .build(&event_loop)
        .unwrap();
    let mut frontend = Frontend::new(&window);
    let mut input_state = InputState::default();
    let mut running = true;

    while running {
        event_loop.pump_events(Some(Duration::ZERO), |event, _| {
            match event {
                Event::WindowEvent { event: WindowEvent::CloseRequested, .. } => running = false,
                Event::WindowEvent { event: WindowEvent::KeyboardInput { event, .. }, .. } => {
                    if let PhysicalKey::Code(code) = event.physical_key {
                        input_state.apply(code, event.state);
                    }
                }
                _ => {}
            }
        });

        let mut host = WindowHost::default();
        machine.run_tic(&input_state.input, &mut host)?;
        input_state.input.show_password_screen = false;

        if host.frame_ready {
            machine.render_buffer_to_surface(FRONT_BUFFER_ID, &mut host.frame)?;
            frontend.present(&host.frame);
        }
    }

    Ok(())
}
