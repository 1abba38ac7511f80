//! Decompresses a packed resource buffer (spec §4.2). The stream is
//! processed backwards: 32-bit chunks are consumed from the end of the
//! compressed buffer towards its start, each XORed into a running checksum,
//! and bits are read out of each chunk MSB-first to drive the opcode table.

use std::io::{self, Read};

use byteorder::{BigEndian, ReadBytesExt};
use iter_read::IterRead;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RleError {
    #[error("RLE checksum did not reach zero")]
    ChecksumFailed,
    #[error("RLE output buffer filled before the input was exhausted")]
    FinishedEarly,
    #[error("declared unpacked_size does not match the destination buffer")]
    UncompressedSizeMismatch,
    #[error("unexpected end of the compressed stream")]
    EndOfStream,
}

impl From<io::Error> for RleError {
    fn from(_: io::Error) -> Self {
        RleError::EndOfStream
    }
}

struct BitReader<I: Read> {
    reader: I,
    chunks_available: usize,
    chunks_read: usize,
    chk: u32,
    crc: u32,
}

impl<I: Read> BitReader<I> {
    fn next_u32(&mut self) -> Result<u32, RleError> {
        if self.chunks_read >= self.chunks_available {
            return Err(RleError::EndOfStream);
        }
        self.chunks_read += 1;
        Ok(self.reader.read_u32::<BigEndian>()?)
    }

    fn get_next_bit(&mut self) -> Result<u8, RleError> {
        let mut lsb = self.rcr(false);
        if self.chk == 0 {
            self.chk = self.next_u32()?;
            self.crc ^= self.chk;
            lsb = self.rcr(true);
        }
        Ok(lsb)
    }

    fn rcr(&mut self, carry_in: bool) -> u8 {
        let lsb = (self.chk & 1) as u8;
        self.chk >>= 1;
        if carry_in {
            self.chk |= 0x8000_0000;
        }
        lsb
    }

    fn get_code(&mut self, bit_length: u8) -> Result<u32, RleError> {
        let mut code: u32 = 0;
        for _ in 0..bit_length {
            code = (code << 1) | self.get_next_bit()? as u32;
        }
        Ok(code)
    }
}

/// Decompresses `packed` (whose declared unpacked size is `unpacked_size`)
/// into a freshly allocated buffer. `packed` may equal the source resource's
/// full compressed byte range; no separate unpacked-size parameter is taken
/// from the caller beyond what's encoded in the stream's own trailer, but the
/// caller-supplied `unpacked_size` is validated against it.
pub fn decode(packed: &[u8], unpacked_size: usize) -> Result<Vec<u8>, RleError> {
    if packed.len() % 4 != 0 || packed.len() < 8 {
        return Err(RleError::EndOfStream);
    }

    let total_chunks = packed.len() / 4;
    let reversed: Vec<u8> = packed.chunks(4).rev().flatten().copied().collect();
    let mut bits = BitReader {
        reader: IterRead::new(reversed.iter().copied()),
        chunks_available: total_chunks,
        chunks_read: 0,
        chk: 0,
        crc: 0,
    };

    let data_size = bits.next_u32()? as i32;
    let initial_checksum = bits.next_u32()?;
    bits.crc = initial_checksum;

    if data_size as usize != unpacked_size {
        return Err(RleError::UncompressedSizeMismatch);
    }

    let mut output: Vec<u8> = Vec::with_capacity(unpacked_size);
    let mut remaining = data_size;

    while remaining > 0 {
        if bits.get_next_bit()? == 0 {
            if bits.get_next_bit()? == 0 {
                // "00": copy next (count+1) literal bytes, count:3
                let count = bits.get_code(3)? + 1;
                remaining -= copy_literal(&mut bits, &mut output, count)?;
            } else {
                // "01": copy 2 bytes from output at write_cursor+offset, offset:8
                let offset = bits.get_code(8)?;
                remaining -= copy_back_reference(&mut output, offset, 2)?;
            }
        } else {
            let prefix = bits.get_code(2)?;
            if prefix == 3 {
                // "111": copy next (count+9) literal bytes, count:8
                let count = bits.get_code(8)? + 9;
                remaining -= copy_literal(&mut bits, &mut output, count)?;
            } else if prefix < 2 {
                // "100"/"101": copy 3 or 4 bytes, offset:9 or offset:10
                let bit_length = prefix as u8 + 9;
                let length = prefix + 3;
                let offset = bits.get_code(bit_length)?;
                remaining -= copy_back_reference(&mut output, offset, length)?;
            } else {
                // "110": copy (count+1) bytes, count:8, offset:12
                let count = bits.get_code(8)? + 1;
                let offset = bits.get_code(12)?;
                remaining -= copy_back_reference(&mut output, offset, count)?;
            }
        }
    }

    if remaining < 0 {
        return Err(RleError::FinishedEarly);
    }

    output.reverse();

    if bits.crc != 0 {
        return Err(RleError::ChecksumFailed);
    }

    if output.len() != unpacked_size {
        return Err(RleError::UncompressedSizeMismatch);
    }

    Ok(output)
}

fn copy_literal<I: Read>(
    bits: &mut BitReader<I>,
    output: &mut Vec<u8>,
    count: u32,
) -> Result<i32, RleError> {
    for _ in 0..count {
        output.push(bits.get_code(8)? as u8);
    }
    Ok(count as i32)
}

fn copy_back_reference(
    output: &mut Vec<u8>,
    offset: u32,
    count: u32,
) -> Result<i32, RleError> {
    let base = output.len() as u32;
    for i in 0..count {
        let src = base.wrapping_sub(offset).wrapping_add(i);
        let byte = output.get(src as usize).copied().unwrap_or(0);
        output.push(byte);
    }
    Ok(count as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Packs one 32-bit payload chunk encoding a single "00"-prefixed
    /// literal opcode (count = 0, i.e. one literal byte), MSB-first,
    /// zero-padded in the low bits, and builds the matching 12-byte RLE
    /// stream (payload, checksum, data_size) whose checksum makes the
    /// decoder's running XOR land on zero.
    fn single_literal_byte_stream(value: u8) -> Vec<u8> {
        let bits: Vec<u8> = [0, 0, 0, 0, 0] // "00" prefix + count:3 = 0
            .into_iter()
            .chain((0..8).rev().map(|b| (value >> b) & 1))
            .collect();

        let mut chunk: u32 = 0;
        for (i, &bit) in bits.iter().enumerate() {
            chunk |= (bit as u32) << (31 - i);
        }
        let payload = chunk.to_be_bytes();

        let mut stream = Vec::new();
        stream.extend_from_slice(&payload);
        stream.extend_from_slice(&chunk.to_be_bytes()); // checksum == chunk -> crc ends at 0
        stream.extend_from_slice(&1i32.to_be_bytes()); // data_size = 1 byte
        stream
    }

    #[test]
    fn decodes_a_single_literal_byte() {
        let stream = single_literal_byte_stream(0x42);
        let out = decode(&stream, 1).unwrap();
        assert_eq!(out, vec![0x42]);
    }

    #[test]
    fn bad_checksum_is_rejected() {
        let mut stream = single_literal_byte_stream(0x42);
        // Flip a bit in the stored checksum so the running XOR can't reach 0.
        stream[4] ^= 0x01;
        let err = decode(&stream, 1).unwrap_err();
        assert!(matches!(err, RleError::ChecksumFailed));
    }

    #[test]
    fn size_mismatch_against_caller_is_rejected() {
        let stream = single_literal_byte_stream(0x42);
        let err = decode(&stream, 2).unwrap_err();
        assert!(matches!(err, RleError::UncompressedSizeMismatch));
    }

    #[test]
    fn rejects_non_multiple_of_four_length() {
        let err = decode(&[1, 2, 3], 0).unwrap_err();
        assert!(matches!(err, RleError::EndOfStream));
    }
}
