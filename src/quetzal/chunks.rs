//! Quetzal chunk definitions: IFhd, (C/U)Mem, Stks.

use crate::error::ZError;
use crate::memory::Memory;
use crate::quetzal::compressed_memory::{compress_memory, decompress_memory};
use crate::stack::{CallFrame, Stack, MAX_LOCALS};

/// IFhd chunk: release/serial/checksum identify the story file; `pc` is
/// the saved program counter, stored as a full 3-byte byte address (not
/// truncated to 2 bytes).
pub struct IFhdChunk {
    pub release: u16,
    pub serial: [u8; 6],
    pub checksum: u16,
    pub pc: u32,
}

impl IFhdChunk {
    pub fn capture(memory: &Memory, pc: u32) -> Self {
        let mut serial = [0u8; 6];
        serial.copy_from_slice(memory.raw()[0x12..0x18].as_ref());
        IFhdChunk { release: memory.header.release, serial, checksum: memory.header.checksum_file, pc }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(13);
        bytes.extend_from_slice(&self.release.to_be_bytes());
        bytes.extend_from_slice(&self.serial);
        bytes.extend_from_slice(&self.checksum.to_be_bytes());
        let pc_bytes = self.pc.to_be_bytes();
        bytes.extend_from_slice(&pc_bytes[1..4]); // low 3 bytes, full address
        bytes
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ZError> {
        if data.len() < 13 {
            return Err(ZError::save_file("IFhd", "chunk too small"));
        }
        let release = u16::from_be_bytes([data[0], data[1]]);
        let mut serial = [0u8; 6];
        serial.copy_from_slice(&data[2..8]);
        let checksum = u16::from_be_bytes([data[8], data[9]]);
        let pc = ((data[10] as u32) << 16) | ((data[11] as u32) << 8) | data[12] as u32;
        Ok(IFhdChunk { release, serial, checksum, pc })
    }

    /// Verify the save file was produced for this story, per the standard:
    /// release/serial must match, checksum differences are a warning only.
    pub fn verify(&self, memory: &Memory) -> Result<(), ZError> {
        if self.release != memory.header.release {
            return Err(ZError::save_file(
                "IFhd",
                format!("save is for release {}, story is release {}", self.release, memory.header.release),
            ));
        }
        let mut game_serial = [0u8; 6];
        game_serial.copy_from_slice(memory.raw()[0x12..0x18].as_ref());
        if self.serial != game_serial {
            return Err(ZError::save_file("IFhd", "serial number does not match the running story"));
        }
        Ok(())
    }
}

pub struct UMemChunk {
    pub memory: Vec<u8>,
}

impl UMemChunk {
    pub fn capture(memory: &Memory) -> Self {
        UMemChunk { memory: memory.dynamic_region().to_vec() }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.memory.clone()
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        UMemChunk { memory: data }
    }

    pub fn restore_to(&self, memory: &mut Memory) -> Result<(), ZError> {
        memory.restore_dynamic_memory(&self.memory)
    }
}

pub struct CMemChunk {
    pub data: Vec<u8>,
}

impl CMemChunk {
    pub fn capture(memory: &Memory) -> Self {
        let data = compress_memory(memory.dynamic_region(), memory.dynamic_region_pristine());
        CMemChunk { data }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.clone()
    }

    pub fn restore_to(&self, memory: &mut Memory) -> Result<(), ZError> {
        let restored = decompress_memory(&self.data, memory.dynamic_region_pristine())
            .map_err(|e| ZError::save_file("CMem", e))?;
        memory.restore_dynamic_memory(&restored)
    }
}

/// Stks chunk: one variable-length record per call frame, outermost first.
pub struct StksChunk {
    pub data: Vec<u8>,
}

impl StksChunk {
    pub fn capture(stack: &Stack) -> Self {
        let mut data = Vec::new();
        for (idx, frame) in stack.frames.iter().enumerate() {
            let pc_bytes = frame.return_pc.to_be_bytes();
            data.extend_from_slice(&pc_bytes[1..4]);

            let mut flags = frame.num_locals & 0x0F;
            if frame.return_store.is_none() {
                flags |= 0x10;
            }
            data.push(flags);

            data.push(frame.return_store.unwrap_or(0));
            data.push(frame.args_supplied);

            let values = stack.stack_slice_for_frame(idx);
            data.extend_from_slice(&(values.len() as u16).to_be_bytes());

            for i in 0..frame.num_locals as usize {
                data.extend_from_slice(&frame.locals[i].to_be_bytes());
            }
            for v in values {
                data.extend_from_slice(&v.to_be_bytes());
            }
        }
        StksChunk { data }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.clone()
    }

    pub fn restore(&self) -> Result<Stack, ZError> {
        let mut stack = Stack::new();
        let data = &self.data;
        let mut offset = 0usize;

        while offset < data.len() {
            if offset + 4 > data.len() {
                return Err(ZError::save_file("Stks", "truncated frame header"));
            }
            let return_pc = ((data[offset] as u32) << 16) | ((data[offset + 1] as u32) << 8) | data[offset + 2] as u32;
            offset += 3;

            let flags = data[offset];
            offset += 1;
            let num_locals = flags & 0x0F;
            let has_no_store = flags & 0x10 != 0;

            if offset + 2 > data.len() {
                return Err(ZError::save_file("Stks", "truncated store/args bytes"));
            }
            let store_byte = data[offset];
            let args_supplied = data[offset + 1];
            offset += 2;
            let return_store = if has_no_store { None } else { Some(store_byte) };

            if offset + 2 > data.len() {
                return Err(ZError::save_file("Stks", "truncated eval stack count"));
            }
            let stack_count = u16::from_be_bytes([data[offset], data[offset + 1]]) as usize;
            offset += 2;

            let mut locals = [0u16; MAX_LOCALS];
            if offset + num_locals as usize * 2 > data.len() {
                return Err(ZError::save_file("Stks", "truncated locals"));
            }
            for local in locals.iter_mut().take(num_locals as usize) {
                *local = u16::from_be_bytes([data[offset], data[offset + 1]]);
                offset += 2;
            }

            if offset + stack_count * 2 > data.len() {
                return Err(ZError::save_file("Stks", "truncated evaluation stack"));
            }
            let stack_base = stack.values.len();
            for _ in 0..stack_count {
                stack.values.push(u16::from_be_bytes([data[offset], data[offset + 1]]));
                offset += 2;
            }

            stack.frames.push(CallFrame { return_pc, return_store, num_locals, locals, args_supplied, stack_base });
        }

        Ok(stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ifhd_round_trip_preserves_full_pc() {
        let chunk = IFhdChunk { release: 3, serial: *b"123456", checksum: 0xBEEF, pc: 0x01_2345 };
        let bytes = chunk.to_bytes();
        let back = IFhdChunk::from_bytes(&bytes).unwrap();
        assert_eq!(back.pc, 0x01_2345);
        assert_eq!(back.release, 3);
    }

    #[test]
    fn stks_round_trip() {
        let mut stack = Stack::new();
        stack.call(0x100, Some(5), [0; MAX_LOCALS], 2, &[10, 20]);
        stack.push(99).unwrap();
        let chunk = StksChunk::capture(&stack);
        let restored = chunk.restore().unwrap();
        assert_eq!(restored.frames.len(), 1);
        assert_eq!(restored.frames[0].locals[0], 10);
        assert_eq!(restored.values, vec![99]);
    }
}
