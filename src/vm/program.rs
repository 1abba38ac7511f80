//! `Program`: a byte cursor over the currently executing bytecode resource
//! (spec §4.4).

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

/// Bytecode resources larger than this are rejected at load time, before a
/// `Program` is ever constructed (spec §4.4, §5).
pub const MAX_PROGRAM_SIZE: usize = 65536;

#[derive(Error, Debug)]
pub enum ProgramError {
    #[error("read past the end of the program")]
    EndOfProgram,
    #[error("jump to address {0} is outside the program")]
    InvalidAddress(u16),
    #[error("bytecode resource of {0} bytes exceeds the {MAX_PROGRAM_SIZE} byte limit")]
    ProgramTooLarge(usize),
}

/// Anything `Program::read` can pull off the wire: unsigned and signed,
/// 8- and 16-bit, all big-endian.
pub trait ReadOperand: Sized {
    fn read_from(bytes: &[u8]) -> Self;
    const WIDTH: usize;
}

impl ReadOperand for u8 {
    fn read_from(bytes: &[u8]) -> Self {
        bytes[0]
    }
    const WIDTH: usize = 1;
}

impl ReadOperand for i8 {
    fn read_from(bytes: &[u8]) -> Self {
        bytes[0] as i8
    }
    const WIDTH: usize = 1;
}

impl ReadOperand for u16 {
    fn read_from(bytes: &[u8]) -> Self {
        BigEndian::read_u16(bytes)
    }
    const WIDTH: usize = 2;
}

impl ReadOperand for i16 {
    fn read_from(bytes: &[u8]) -> Self {
        BigEndian::read_i16(bytes)
    }
    const WIDTH: usize = 2;
}

/// A big-endian byte cursor over a single bytecode resource. Every thread
/// seeks this to its own active address before interpreting (spec §4.5).
pub struct Program {
    bytes: Vec<u8>,
    counter: usize,
}

impl Program {
    pub fn new(bytes: Vec<u8>) -> Result<Self, ProgramError> {
        if bytes.len() > MAX_PROGRAM_SIZE {
            return Err(ProgramError::ProgramTooLarge(bytes.len()));
        }
        Ok(Program { bytes, counter: 0 })
    }

    pub fn counter(&self) -> u16 {
        self.counter as u16
    }

    pub fn jump(&mut self, addr: u16) -> Result<(), ProgramError> {
        let addr = addr as usize;
        if addr >= self.bytes.len() {
            return Err(ProgramError::InvalidAddress(addr as u16));
        }
        self.counter = addr;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) {
        self.counter = (self.counter + n).min(self.bytes.len());
    }

    /// Reads a big-endian `T` and advances the counter by `T::WIDTH`. On
    /// underrun the counter clamps at `bytes.len()` and `EndOfProgram` is
    /// returned (spec §4.4).
    pub fn read<T: ReadOperand>(&mut self) -> Result<T, ProgramError> {
        let end = self.counter + T::WIDTH;
        if end > self.bytes.len() {
            self.counter = self.bytes.len();
            return Err(ProgramError::EndOfProgram);
        }
        let value = T::read_from(&self.bytes[self.counter..end]);
        self.counter = end;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_large_is_rejected_at_construction() {
        let bytes = vec![0u8; MAX_PROGRAM_SIZE + 1];
        assert!(matches!(
            Program::new(bytes),
            Err(ProgramError::ProgramTooLarge(n)) if n == MAX_PROGRAM_SIZE + 1
        ));
    }

    #[test]
    fn read_advances_and_decodes_big_endian() {
        let mut program = Program::new(vec![0x01, 0x02, 0x03]).unwrap();
        assert_eq!(program.read::<u8>().unwrap(), 0x01);
        assert_eq!(program.read::<u16>().unwrap(), 0x0203);
        assert_eq!(program.counter(), 3);
    }

    #[test]
    fn read_past_end_clamps_counter_and_fails() {
        let mut program = Program::new(vec![0x01]).unwrap();
        assert!(matches!(program.read::<u16>(), Err(ProgramError::EndOfProgram)));
        assert_eq!(program.counter(), 1);
    }

    #[test]
    fn jump_to_len_is_invalid_jump_to_len_minus_one_is_valid() {
        let mut program = Program::new(vec![0x00, 0x01, 0x02]).unwrap();
        assert!(matches!(program.jump(3), Err(ProgramError::InvalidAddress(3))));
        assert!(program.jump(2).is_ok());
        assert_eq!(program.counter(), 2);
    }

    #[test]
    fn skip_clamps_to_end() {
        let mut program = Program::new(vec![0x00, 0x01]).unwrap();
        program.skip(100);
        assert_eq!(program.counter(), 2);
    }
}
