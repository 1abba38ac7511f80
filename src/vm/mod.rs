//! The bytecode VM core: registers, call stack, cooperative threads, the
//! instruction decoder, and the per-tic scheduler that ties them to
//! resources, video, audio and the host (spec §4.4–§4.6).

pub mod bytecode;
pub mod machine;
pub mod program;
pub mod registers;
pub mod stack;
pub mod thread;

pub use bytecode::{
    decode, BytecodeError, Comparator, Opcode, RhsOperand, SpriteBank, SpriteCoordSource,
    ThreadRangeOp, ZoomSource,
};
pub use machine::{Input, Machine, MachineError, DEFAULT_AUDIO_OUTPUT_RATE, MAX_INSTRUCTIONS_PER_TIC};
pub use program::{Program, ProgramError, ReadOperand, MAX_PROGRAM_SIZE};
pub use registers::{Registers, REGISTER_COUNT};
pub use stack::{CallStack, StackError, MAX_CALL_DEPTH};
pub use thread::{ExecutionState, PauseState, Thread, Threads, THREAD_COUNT};
