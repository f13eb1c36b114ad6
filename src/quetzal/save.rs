//! Save game functionality for the Quetzal format.

use crate::error::ZError;
use crate::memory::Memory;
use crate::quetzal::chunks::{CMemChunk, IFhdChunk, StksChunk, UMemChunk};
use crate::quetzal::iff::IffFile;
use crate::stack::Stack;
use log::info;
use std::path::Path;

/// Whether to compress the dynamic memory chunk with XOR-RLE (`CMem`) or
/// store it verbatim (`UMem`). Compressed saves are smaller; uncompressed
/// ones are simpler to debug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryEncoding {
    Compressed,
    Uncompressed,
}

pub struct SaveGame;

impl SaveGame {
    /// Build a Quetzal IFF image of the current machine state.
    pub fn capture(memory: &Memory, stack: &Stack, pc: u32, encoding: MemoryEncoding) -> IffFile {
        let mut iff = IffFile::new();

        let ifhd = IFhdChunk::capture(memory, pc);
        iff.add_chunk(*b"IFhd", ifhd.to_bytes());

        match encoding {
            MemoryEncoding::Compressed => {
                let cmem = CMemChunk::capture(memory);
                iff.add_chunk(*b"CMem", cmem.to_bytes());
            }
            MemoryEncoding::Uncompressed => {
                let umem = UMemChunk::capture(memory);
                iff.add_chunk(*b"UMem", umem.to_bytes());
            }
        }

        let stks = StksChunk::capture(stack);
        iff.add_chunk(*b"Stks", stks.to_bytes());

        iff
    }

    pub fn write_to_file(memory: &Memory, stack: &Stack, pc: u32, encoding: MemoryEncoding, path: &Path) -> Result<(), ZError> {
        let iff = Self::capture(memory, stack, pc, encoding);
        iff.write_to_file(path).map_err(|e| ZError::save_file("FORM", e))?;
        info!("saved game to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::MAX_LOCALS;

    fn minimal_v3() -> Memory {
        let mut bytes = vec![0u8; 0x200];
        bytes[0x00] = 3;
        bytes[0x0E] = 0x01;
        Memory::load(bytes).unwrap()
    }

    #[test]
    fn capture_produces_ifhd_and_memory_and_stks_chunks() {
        let memory = minimal_v3();
        let mut stack = Stack::new();
        stack.call(0, None, [0; MAX_LOCALS], 0, &[]);
        let iff = SaveGame::capture(&memory, &stack, 0x1234, MemoryEncoding::Uncompressed);
        assert!(iff.find_chunk(b"IFhd").is_some());
        assert!(iff.find_chunk(b"UMem").is_some());
        assert!(iff.find_chunk(b"Stks").is_some());
    }
}
