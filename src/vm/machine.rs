//! `Machine`: the per-tic thread scheduler wired to resources, video, audio
//! and the host (spec §4.5, §4.6).

use log::{debug, warn};
use thiserror::Error;

use crate::audio::Audio;
use crate::config::Config;
use crate::host::{Host, Surface};
use crate::numeric::Point;
use crate::resource::{GamePart, Memory, MemoryError, ResourceKind, ResourceReader};
use crate::strings::{StringError, StringTable};
use crate::video::{Video, VideoError};

use super::bytecode::{self, BytecodeError, Opcode, RhsOperand, SpriteBank, SpriteCoordSource, ThreadRangeOp, ZoomSource};
use super::program::{Program, ProgramError};
use super::registers::{self, Registers};
use super::stack::{CallStack, StackError};
use super::thread::{ExecutionState, PauseState, Threads, THREAD_COUNT};

/// Generous safety net against a thread that never yields; real bytecode
/// never comes close (spec §4.5).
pub const MAX_INSTRUCTIONS_PER_TIC: u32 = 50_000;

/// Default PCM output rate; matches the rate the original engine's mixer
/// ran at (spec §4.8).
pub const DEFAULT_AUDIO_OUTPUT_RATE: u32 = 22_050;

/// `DrawBackgroundPolygon`/`DrawSpritePolygon` with an unspecified zoom use
/// this scale (spec §4.6): no scaling at all (`scale/64 == 1`).
const DEFAULT_ZOOM: u16 = 0x40;

#[derive(Error, Debug)]
pub enum MachineError {
    #[error("resource error")]
    Memory(MemoryError),
    #[error("video error")]
    Video(VideoError),
    #[error("bytecode decode error")]
    Bytecode(BytecodeError),
    #[error("program error")]
    Program(ProgramError),
    #[error("call stack error")]
    Stack(StackError),
    #[error("string table error")]
    String(StringError),
    #[error("thread id {0} is outside the 0..64 range")]
    InvalidThreadID(u8),
    #[error("thread range {start}..={end} is invalid")]
    InvalidThreadRange { start: u8, end: u8 },
    #[error("resource {0} is required by the current game part but is not loaded")]
    CoreResourceMissing(usize),
    #[error("thread {tid} exceeded {limit} instructions in one tic")]
    InstructionLimitExceeded { tid: u8, limit: u32 },
    #[error("DrawSpritePolygon named the animations bank but the current part has none loaded")]
    AnimationsNotLoaded,
}

impl From<MemoryError> for MachineError {
    fn from(value: MemoryError) -> Self {
        MachineError::Memory(value)
    }
}

impl From<VideoError> for MachineError {
    fn from(value: VideoError) -> Self {
        MachineError::Video(value)
    }
}

impl From<BytecodeError> for MachineError {
    fn from(value: BytecodeError) -> Self {
        MachineError::Bytecode(value)
    }
}

impl From<ProgramError> for MachineError {
    fn from(value: ProgramError) -> Self {
        MachineError::Program(value)
    }
}

impl From<StackError> for MachineError {
    fn from(value: StackError) -> Self {
        MachineError::Stack(value)
    }
}

impl From<StringError> for MachineError {
    fn from(value: StringError) -> Self {
        MachineError::String(value)
    }
}

/// One tic's worth of host input (spec §4.5 step 2, §6).
#[derive(Debug, Clone, Copy, Default)]
pub struct Input {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub action: bool,
    /// ASCII of the key pressed since the last tic, if any. Only honored
    /// while `password_entry` is the active part (spec §6).
    pub last_pressed_character: u8,
    /// Requests a transition to the password-entry part. Honored only for
    /// parts that allow it (spec §6).
    pub show_password_screen: bool,
}

/// What ended a thread's slice this tic (spec §4.5).
enum ThreadControl {
    Yield,
    Kill,
    RenderedFrame,
}

pub struct Machine<R: ResourceReader> {
    registers: Registers,
    threads: Threads,
    call_stack: CallStack,
    program: Program,
    memory: Memory<R>,
    video: Video,
    audio: Audio,
    strings: Box<dyn StringTable>,
    config: Config,
    scheduled_part: Option<GamePart>,
    palettes_id: usize,
    bytecode_id: usize,
    polygons_id: usize,
    animations_id: Option<usize>,
}

impl<R: ResourceReader> Machine<R> {
    pub fn new(reader: R, config: Config, strings: Box<dyn StringTable>) -> Result<Self, MachineError> {
        let memory = Memory::new(reader)?;
        Ok(Machine {
            registers: Registers::new(config.seed),
            threads: Threads::default(),
            call_stack: CallStack::new(),
            program: Program::new(Vec::new())?,
            memory,
            video: Video::default(),
            audio: Audio::new(DEFAULT_AUDIO_OUTPUT_RATE),
            strings,
            config,
            scheduled_part: None,
            palettes_id: 0,
            bytecode_id: 0,
            polygons_id: 0,
            animations_id: None,
        })
    }

    /// Requests a game part switch; applied at the start of the next tic
    /// (spec §4.5 step 1), mirroring `ControlResources`'s own deferral.
    pub fn schedule_game_part(&mut self, part: GamePart) {
        self.scheduled_part = Some(part);
    }

    pub fn render_buffer_to_surface(&self, buffer_id: u8, surface: &mut Surface) -> Result<(), MachineError> {
        Ok(self.video.render_to_rgba(buffer_id, surface)?)
    }

    fn load_game_part(&mut self, part: GamePart) -> Result<(), MachineError> {
        let addresses = self.memory.load_game_part(part)?;
        self.palettes_id = addresses.palettes_id;
        self.bytecode_id = addresses.bytecode_id;
        self.polygons_id = addresses.polygons_id;
        self.animations_id = addresses.animations_id;

        let bytecode_bytes = self
            .memory
            .resource_location(self.bytecode_id, ResourceKind::Bytecode)
            .ok_or(MachineError::CoreResourceMissing(self.bytecode_id))?
            .to_vec();
        self.program = Program::new(bytecode_bytes)?;
        self.threads.reset_for_new_part();
        self.call_stack.clear();

        // The original engine stamps this on every part load regardless of
        // what the bytecode itself does; silent in the opcode table but
        // observable across every part transition (spec §6 is silent on it).
        self.registers.set(0xE4, 0x14);

        if let Some(bitmap) = addresses.bitmap {
            self.video.load_bitmap(&bitmap)?;
        }
        Ok(())
    }

    fn apply_input(&mut self, input: &Input) {
        let axis = |neg: bool, pos: bool| -> i16 {
            match (neg, pos) {
                (true, false) => -1,
                (false, true) => 1,
                _ => 0,
            }
        };
        let left_right = axis(input.left, input.right);
        let up_down = axis(input.up, input.down);
        self.registers.set(registers::LEFT_RIGHT_INPUT as u8, left_right);
        self.registers.set(registers::HERO_POS_UP_DOWN as u8, up_down);
        self.registers.set(registers::UP_DOWN_INPUT_MIRROR as u8, up_down);
        self.registers.set(registers::ACTION_INPUT as u8, input.action as i16);

        let movement = ((input.left as u8) << 3) | ((input.right as u8) << 2) | ((input.up as u8) << 1) | (input.down as u8);
        self.registers.set_unsigned(registers::MOVEMENT_INPUTS as u8, movement as u16);
        let all_inputs = movement as u16 | ((input.action as u16) << 7);
        self.registers.set_unsigned(registers::ALL_INPUTS as u8, all_inputs);

        if self.memory.current_part() == Some(GamePart::PasswordEntry) {
            self.registers
                .set_unsigned(registers::LAST_PRESSED_CHARACTER as u8, input.last_pressed_character as u16);
        }

        if input.show_password_screen {
            if let Some(part) = self.memory.current_part() {
                if part.allows_password_entry() {
                    self.scheduled_part = Some(GamePart::PasswordEntry);
                }
            }
        }
    }

    /// Runs one tic to completion: part switch, input, thread scheduling,
    /// and every runnable thread's instruction slice (spec §4.5).
    pub fn run_tic(&mut self, input: &Input, host: &mut dyn Host) -> Result<(), MachineError> {
        if let Some(part) = self.scheduled_part.take() {
            self.load_game_part(part)?;
        }
        self.apply_input(input);
        for thread in self.threads.slots.iter_mut() {
            thread.apply_scheduled();
        }
        for tid in 0..THREAD_COUNT {
            if !self.threads.slots[tid].is_runnable() {
                continue;
            }
            self.run_thread(tid, host)?;
        }
        Ok(())
    }

    fn run_thread(&mut self, tid: usize, host: &mut dyn Host) -> Result<(), MachineError> {
        let addr = match self.threads.slots[tid].execution_state {
            ExecutionState::Active(addr) => addr,
            ExecutionState::Inactive => return Ok(()),
        };
        self.program.jump(addr)?;
        self.call_stack.clear();

        for _ in 0..MAX_INSTRUCTIONS_PER_TIC {
            let opcode = bytecode::decode(&mut self.program)?;
            match self.execute(opcode, host)? {
                None => continue,
                Some(ThreadControl::Yield) | Some(ThreadControl::RenderedFrame) => {
                    let resume = self.program.counter();
                    self.threads.slots[tid].execution_state = ExecutionState::Active(resume);
                    return Ok(());
                }
                Some(ThreadControl::Kill) => {
                    self.threads.slots[tid].execution_state = ExecutionState::Inactive;
                    return Ok(());
                }
            }
        }
        Err(MachineError::InstructionLimitExceeded {
            tid: tid as u8,
            limit: MAX_INSTRUCTIONS_PER_TIC,
        })
    }

    fn execute(&mut self, opcode: Opcode, host: &mut dyn Host) -> Result<Option<ThreadControl>, MachineError> {
        match opcode {
            Opcode::RegisterSet { dst, val } => self.registers.set(dst, val),
            Opcode::RegisterCopy { dst, src } => {
                let v = self.registers.get(src);
                self.registers.set(dst, v);
            }
            Opcode::RegisterAdd { dst, src } => {
                let v = self.registers.get(src);
                self.registers.wrapping_add(dst, v);
            }
            Opcode::RegisterAddConstant { dst, val } => self.registers.wrapping_add(dst, val),
            Opcode::RegisterSubtract { dst, src } => {
                let v = self.registers.get(src);
                self.registers.wrapping_sub(dst, v);
            }
            Opcode::RegisterAnd { dst, mask } => {
                let v = self.registers.get_unsigned(dst);
                self.registers.set_unsigned(dst, v & mask);
            }
            Opcode::RegisterOr { dst, mask } => {
                let v = self.registers.get_unsigned(dst);
                self.registers.set_unsigned(dst, v | mask);
            }
            Opcode::RegisterShiftLeft { dst, amount } => {
                let v = self.registers.get_unsigned(dst);
                self.registers.set_unsigned(dst, v.wrapping_shl(amount as u32));
            }
            Opcode::RegisterShiftRight { dst, amount } => {
                let v = self.registers.get_unsigned(dst);
                self.registers.set_unsigned(dst, v.wrapping_shr(amount as u32));
            }

            Opcode::Call { addr } => {
                self.call_stack.push(self.program.counter())?;
                self.program.jump(addr)?;
            }
            Opcode::Return => {
                let addr = self.call_stack.pop()?;
                self.program.jump(addr)?;
            }
            Opcode::Jump { addr } => self.program.jump(addr)?,
            Opcode::JumpIfNotZero { reg, addr } => {
                let v = self.registers.get(reg).wrapping_sub(1);
                self.registers.set(reg, v);
                if v != 0 {
                    self.program.jump(addr)?;
                }
            }
            Opcode::JumpConditional { comparator, lhs_reg, rhs, addr } => {
                let lhs = self.registers.get(lhs_reg);
                let rhs_val = match rhs {
                    RhsOperand::Register(r) => self.registers.get(r),
                    RhsOperand::ConstantByte(b) => b as i16,
                    RhsOperand::ConstantWord(w) => w,
                };
                if comparator.holds(lhs, rhs_val) {
                    self.program.jump(addr)?;
                }
            }

            Opcode::ActivateThread { tid, addr } => {
                if tid as usize >= THREAD_COUNT {
                    return Err(MachineError::InvalidThreadID(tid));
                }
                self.threads.slots[tid as usize].scheduled_execution_state = Some(ExecutionState::Active(addr));
            }
            Opcode::ControlThreads { start, end, op } => {
                if start > end || end as usize >= THREAD_COUNT {
                    return Err(MachineError::InvalidThreadRange { start, end });
                }
                for tid in start..=end {
                    let thread = &mut self.threads.slots[tid as usize];
                    match op {
                        ThreadRangeOp::Resume => thread.scheduled_pause_state = Some(PauseState::Running),
                        ThreadRangeOp::Pause => thread.scheduled_pause_state = Some(PauseState::Paused),
                        ThreadRangeOp::Deactivate => thread.scheduled_execution_state = Some(ExecutionState::Inactive),
                    }
                }
            }
            Opcode::Yield => return Ok(Some(ThreadControl::Yield)),
            Opcode::Kill => return Ok(Some(ThreadControl::Kill)),

            Opcode::SelectPalette { pal_id } => {
                let bytes = self
                    .memory
                    .resource_location(self.palettes_id, ResourceKind::Palettes)
                    .ok_or(MachineError::CoreResourceMissing(self.palettes_id))?;
                self.video.select_palette(bytes, pal_id)?;
            }
            Opcode::SelectVideoBuffer { buf_id } => self.video.select_target_buffer(buf_id),
            Opcode::FillVideoBuffer { buf_id, color } => {
                self.video.fill_buffer(buf_id, color);
                host.video_buffer_changed(self.video.resolve_buffer(buf_id));
            }
            Opcode::CopyVideoBuffer { src, dst, y_reg } => {
                let y = self.registers.get(y_reg);
                let resolved_dst = self.video.resolve_buffer(dst);
                if self.video.resolve_buffer(src) != resolved_dst {
                    self.video.copy_buffer(src, dst, y);
                    host.video_buffer_changed(resolved_dst);
                }
            }
            Opcode::RenderVideoBuffer { buf_id } => {
                let published = self.video.mark_buffer_ready(buf_id);
                let frame_count = self.registers.get_unsigned(registers::FRAME_DURATION as u8) as u32;
                let delay_ms = frame_count * self.config.timing.ms_per_tic();

                if let Some(mark) = self.audio.tick_music() {
                    self.registers.set(registers::MUSIC_MARK as u8, mark);
                }
                let pcm = self.audio.produce_for_duration(delay_ms);

                host.video_frame_ready(published, delay_ms);
                host.audio_ready(&pcm);
                return Ok(Some(ThreadControl::RenderedFrame));
            }

            Opcode::DrawString { str_id, color, x, y } => {
                let text = self.strings.get(str_id)?;
                debug!("draw string {text:?} at ({x}, {y}) color {color}");
            }

            Opcode::ControlSound { res_id, freq, vol, channel } => {
                if vol == 0 {
                    self.audio.stop_channel(channel);
                } else {
                    match self.memory.resource_location(res_id as usize, ResourceKind::SoundOrEmpty) {
                        Some(bytes) => self.audio.play_sound(bytes, res_id, channel, freq, vol),
                        None => warn!("sound resource {res_id} is not loaded"),
                    }
                }
            }
            Opcode::ControlMusic { res_id, tempo, offset } => {
                if res_id != 0 {
                    match self.memory.resource_location(res_id as usize, ResourceKind::Music) {
                        Some(bytes) => self.audio.control_music(Some(bytes), tempo, offset),
                        None => warn!("music resource {res_id} is not loaded"),
                    }
                } else {
                    self.audio.control_music(None, tempo, offset);
                }
            }
            Opcode::ControlResources { id_or_part } => {
                if id_or_part == 0 {
                    self.memory.unload_all_individual_resources();
                } else if let Ok(part) = GamePart::try_from_raw(id_or_part) {
                    debug!("scheduling game part {part:?}");
                    self.scheduled_part = Some(part);
                } else if let Some(bitmap) = self.memory.load_individual_resource(id_or_part as usize)? {
                    self.video.load_bitmap(&bitmap.0)?;
                }
            }

            Opcode::DrawBackgroundPolygon { addr, x, y } => {
                let bank = self
                    .memory
                    .resource_location(self.polygons_id, ResourceKind::Polygons)
                    .ok_or(MachineError::CoreResourceMissing(self.polygons_id))?;
                self.video.draw_polygon(bank, addr, Point::new(x, y), DEFAULT_ZOOM, 0xFF)?;
                host.video_buffer_changed(self.video.target_buffer());
            }
            Opcode::DrawSpritePolygon { addr, x, y, zoom, bank } => {
                let x = match x {
                    SpriteCoordSource::Literal(v) => v,
                    SpriteCoordSource::Register(r) => self.registers.get(r),
                };
                let y = match y {
                    SpriteCoordSource::Literal(v) => v,
                    SpriteCoordSource::Register(r) => self.registers.get(r),
                };
                let scale = match zoom {
                    ZoomSource::Default => DEFAULT_ZOOM,
                    ZoomSource::Literal(v) => v as u16,
                    ZoomSource::Register(r) => self.registers.get(r) as u16,
                };
                let (resource_id, kind) = match bank {
                    SpriteBank::Polygons => (self.polygons_id, ResourceKind::Polygons),
                    SpriteBank::Animations => (
                        self.animations_id.ok_or(MachineError::AnimationsNotLoaded)?,
                        ResourceKind::SpritePolygons,
                    ),
                };
                let bank_bytes = self
                    .memory
                    .resource_location(resource_id, kind)
                    .ok_or(MachineError::CoreResourceMissing(resource_id))?;
                self.video.draw_polygon(bank_bytes, addr, Point::new(x, y), scale, 0xFF)?;
                host.video_buffer_changed(self.video.target_buffer());
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io;

    use crate::strings::DefaultStringTable;

    struct FakeReader {
        list: Vec<u8>,
        banks: RefCell<HashMap<u8, Vec<u8>>>,
    }

    impl ResourceReader for FakeReader {
        fn read_bank(&self, bank_id: u8) -> io::Result<Vec<u8>> {
            Ok(self.banks.borrow().get(&bank_id).cloned().unwrap_or_default())
        }

        fn read_resource_list(&self) -> io::Result<Vec<u8>> {
            Ok(self.list.clone())
        }
    }

    struct NoOpHost {
        frames: Vec<(u8, u32)>,
        buffer_changes: Vec<u8>,
    }

    impl Default for NoOpHost {
        fn default() -> Self {
            NoOpHost { frames: Vec::new(), buffer_changes: Vec::new() }
        }
    }

    impl Host for NoOpHost {
        fn video_frame_ready(&mut self, buffer_id: u8, delay_ms: u32) {
            self.frames.push((buffer_id, delay_ms));
        }

        fn video_buffer_changed(&mut self, buffer_id: u8) {
            self.buffer_changes.push(buffer_id);
        }

        fn audio_ready(&mut self, _buffer_samples: &[u8]) {}
    }

    fn record(kind: u8, bank: u8, offset: u32, packed: u16, unpacked: u16) -> Vec<u8> {
        let mut buf = vec![0u8; 20];
        buf[0] = 0x01;
        buf[1] = kind;
        buf[7] = bank;
        buf[8..12].copy_from_slice(&offset.to_be_bytes());
        buf[14..16].copy_from_slice(&packed.to_be_bytes());
        buf[18..20].copy_from_slice(&unpacked.to_be_bytes());
        buf
    }

    /// Builds a machine with `CopyProtection` (ids 0x14/0x15/0x16, no
    /// animations bank) scheduled and loaded, running `bytecode` as its
    /// single bytecode resource. Resources below id 0x14 are unused filler.
    fn machine_with_bytecode(bytecode: &[u8]) -> Machine<FakeReader> {
        let palettes = vec![0u8; 1024];
        let polygons: Vec<u8> = Vec::new();

        let mut list = Vec::new();
        for _ in 0..0x14 {
            list.extend(record(0, 0, 0, 0, 0));
        }
        let mut bank = Vec::new();
        let palettes_offset = bank.len() as u32;
        bank.extend_from_slice(&palettes);
        let bytecode_offset = bank.len() as u32;
        bank.extend_from_slice(bytecode);
        let polygons_offset = bank.len() as u32;
        bank.extend_from_slice(&polygons);

        list.extend(record(3, 1, palettes_offset, palettes.len() as u16, palettes.len() as u16));
        list.extend(record(4, 1, bytecode_offset, bytecode.len() as u16, bytecode.len() as u16));
        list.extend(record(5, 1, polygons_offset, polygons.len() as u16, polygons.len() as u16));
        list.push(0xFF);

        let mut banks = HashMap::new();
        banks.insert(1u8, bank);
        let reader = FakeReader { list, banks: RefCell::new(banks) };

        let mut machine = Machine::new(reader, Config::default(), Box::new(DefaultStringTable::default())).unwrap();
        machine.schedule_game_part(GamePart::CopyProtection);
        let mut host = NoOpHost::default();
        machine.run_tic(&Input::default(), &mut host).unwrap();
        machine
    }

    #[test]
    fn register_set_runs_and_yields_resume_at_the_byte_after_yield() {
        // RegisterSet(5, 42); Yield
        let bytecode = [0, 5, 0, 42, 6];
        let mut machine = machine_with_bytecode(&bytecode);
        assert_eq!(machine.registers.get(5), 42);
        assert_eq!(machine.threads.slots[0].execution_state, ExecutionState::Active(5));
    }

    #[test]
    fn thread_resumes_past_the_yield_without_rerunning_earlier_opcodes() {
        // RegisterSet(0, 10); Yield; RegisterAddConstant(0, 1); Kill
        let bytecode = [0, 0, 0, 10, 6, 3, 0, 0, 1, 17];
        let mut machine = machine_with_bytecode(&bytecode);
        assert_eq!(machine.registers.get(0), 10);
        assert_eq!(machine.threads.slots[0].execution_state, ExecutionState::Active(5));

        let mut host = NoOpHost::default();
        machine.run_tic(&Input::default(), &mut host).unwrap();
        assert_eq!(machine.registers.get(0), 11);
        assert_eq!(machine.threads.slots[0].execution_state, ExecutionState::Inactive);
    }

    #[test]
    fn jump_if_not_zero_loops_within_a_single_tic() {
        // RegisterSet(1, 3); JumpIfNotZero(1, ->self); Kill
        let bytecode = [0, 1, 0, 3, 9, 1, 0, 4, 17];
        let machine = machine_with_bytecode(&bytecode);
        assert_eq!(machine.registers.get(1), 0);
        assert_eq!(machine.threads.slots[0].execution_state, ExecutionState::Inactive);
    }

    #[test]
    fn unconditional_self_jump_hits_the_instruction_limit() {
        // Jump(0) forever.
        let bytecode = [7, 0, 0];
        let mut list = Vec::new();
        for _ in 0..0x14 {
            list.extend(record(0, 0, 0, 0, 0));
        }
        let mut bank = Vec::new();
        bank.extend_from_slice(&[0u8; 1024]);
        let bytecode_offset = bank.len() as u32;
        bank.extend_from_slice(&bytecode);
        list.extend(record(3, 1, 0, 1024, 1024));
        list.extend(record(4, 1, bytecode_offset, bytecode.len() as u16, bytecode.len() as u16));
        list.extend(record(5, 1, 0, 0, 0));
        list.push(0xFF);
        let mut banks = HashMap::new();
        banks.insert(1u8, bank);
        let reader = FakeReader { list, banks: RefCell::new(banks) };

        let mut machine = Machine::new(reader, Config::default(), Box::new(DefaultStringTable::default())).unwrap();
        machine.schedule_game_part(GamePart::CopyProtection);
        let mut host = NoOpHost::default();
        let err = machine.run_tic(&Input::default(), &mut host).unwrap_err();
        assert!(matches!(err, MachineError::InstructionLimitExceeded { tid: 0, .. }));
    }

    #[test]
    fn apply_input_sets_movement_and_action_registers() {
        let mut machine = machine_with_bytecode(&[6]);
        let input = Input {
            left: true,
            action: true,
            ..Input::default()
        };
        machine.apply_input(&input);
        assert_eq!(machine.registers.get(registers::LEFT_RIGHT_INPUT as u8), -1);
        assert_eq!(machine.registers.get(registers::ACTION_INPUT as u8), 1);
        assert_eq!(machine.registers.get_unsigned(registers::MOVEMENT_INPUTS as u8), 0b1000);
        assert_eq!(machine.registers.get_unsigned(registers::ALL_INPUTS as u8), 0b1000 | (1 << 7));
    }

    #[test]
    fn render_video_buffer_reports_pal_delay_and_yields() {
        // RegisterSet(frame_duration, 4); RenderVideoBuffer(back)
        let bytecode = [0, registers::FRAME_DURATION as u8, 0, 4, 16, 0xFF];
        let mut list = Vec::new();
        for _ in 0..0x14 {
            list.extend(record(0, 0, 0, 0, 0));
        }
        let mut bank = vec![0u8; 1024];
        let bytecode_offset = bank.len() as u32;
        bank.extend_from_slice(&bytecode);
        list.extend(record(3, 1, 0, 1024, 1024));
        list.extend(record(4, 1, bytecode_offset, bytecode.len() as u16, bytecode.len() as u16));
        list.extend(record(5, 1, 0, 0, 0));
        list.push(0xFF);
        let mut banks = HashMap::new();
        banks.insert(1u8, bank);
        let reader = FakeReader { list, banks: RefCell::new(banks) };

        let mut machine = Machine::new(reader, Config::default(), Box::new(DefaultStringTable::default())).unwrap();
        machine.schedule_game_part(GamePart::CopyProtection);
        let mut host = NoOpHost::default();
        machine.run_tic(&Input::default(), &mut host).unwrap();

        // Video::default() starts front=2, back=1; marking `back` ready swaps them.
        assert_eq!(host.frames, vec![(1, 80)]);
        assert_eq!(machine.threads.slots[0].execution_state, ExecutionState::Active(6));
    }

    #[test]
    fn fill_video_buffer_reports_the_resolved_buffer_to_the_host() {
        // FillVideoBuffer(buf_id=2, color=5); Yield
        let bytecode = [14, 2, 5, 6];
        let mut list = Vec::new();
        for _ in 0..0x14 {
            list.extend(record(0, 0, 0, 0, 0));
        }
        let mut bank = vec![0u8; 1024];
        let bytecode_offset = bank.len() as u32;
        bank.extend_from_slice(&bytecode);
        list.extend(record(3, 1, 0, 1024, 1024));
        list.extend(record(4, 1, bytecode_offset, bytecode.len() as u16, bytecode.len() as u16));
        list.extend(record(5, 1, 0, 0, 0));
        list.push(0xFF);
        let mut banks = HashMap::new();
        banks.insert(1u8, bank);
        let reader = FakeReader { list, banks: RefCell::new(banks) };

        let mut machine = Machine::new(reader, Config::default(), Box::new(DefaultStringTable::default())).unwrap();
        machine.schedule_game_part(GamePart::CopyProtection);
        let mut host = NoOpHost::default();
        machine.run_tic(&Input::default(), &mut host).unwrap();
        assert_eq!(host.buffer_changes, vec![2]);
    }
}
