//! Segmented story-image memory: dynamic/static/high regions, the three
//! address encodings, and header write authorization.

use crate::error::ZError;
use crate::header::Header;
use log::{debug, warn};

pub struct Memory {
    bytes: Vec<u8>,
    pristine: Vec<u8>,
    pub header: Header,
}

impl Memory {
    pub fn load(bytes: Vec<u8>) -> Result<Self, String> {
        let header = Header::parse(&bytes)?;
        let pristine = bytes.clone();
        Ok(Memory { bytes, pristine, header })
    }

    pub fn version(&self) -> u8 {
        self.header.version
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn static_start(&self) -> u32 {
        self.header.base_static_mem as u32
    }

    pub fn raw(&self) -> &[u8] {
        &self.bytes
    }

    pub fn pristine(&self) -> &[u8] {
        &self.pristine
    }

    pub fn dynamic_region(&self) -> &[u8] {
        &self.bytes[..(self.static_start() as usize).min(self.bytes.len())]
    }

    pub fn dynamic_region_pristine(&self) -> &[u8] {
        &self.pristine[..(self.static_start() as usize).min(self.pristine.len())]
    }

    /// Byte address: unsigned 1:1 offset.
    pub fn byte_address(raw: u16) -> u32 {
        raw as u32
    }

    /// Word address (v1-5): abbreviation table entries.
    pub fn word_address(raw: u16) -> u32 {
        raw as u32 * 2
    }

    /// Packed address: 2x in v1-3, 4x in v4-5.
    pub fn packed_address(&self, raw: u16) -> u32 {
        match self.header.version {
            1..=3 => raw as u32 * 2,
            _ => raw as u32 * 4,
        }
    }

    pub fn read_byte(&self, addr: u32) -> Result<u8, ZError> {
        self.bytes
            .get(addr as usize)
            .copied()
            .ok_or_else(|| ZError::memory(addr, "read out of bounds"))
    }

    pub fn read_word(&self, addr: u32) -> Result<u16, ZError> {
        let hi = self.read_byte(addr)? as u16;
        let lo = self.read_byte(addr + 1)? as u16;
        Ok((hi << 8) | lo)
    }

    /// Raw in-bounds write with no region permission check. Used internally
    /// by restore and by the header-authorization path.
    fn write_byte_unchecked(&mut self, addr: u32, value: u8) -> Result<(), ZError> {
        let slot = self
            .bytes
            .get_mut(addr as usize)
            .ok_or_else(|| ZError::memory(addr, "write out of bounds"))?;
        *slot = value;
        Ok(())
    }

    /// Write to dynamic memory only; static/high memory writes are fatal.
    pub fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), ZError> {
        if addr < 64 {
            return Err(ZError::memory(addr, "direct header write; use a header accessor"));
        }
        if addr >= self.static_start() {
            return Err(ZError::memory(addr, "write to static or high memory"));
        }
        self.write_byte_unchecked(addr, value)
    }

    pub fn write_word(&mut self, addr: u32, value: u16) -> Result<(), ZError> {
        self.write_byte(addr, (value >> 8) as u8)?;
        self.write_byte(addr + 1, (value & 0xFF) as u8)
    }

    fn authorized_header_write(
        &mut self,
        offset: u16,
        value: u8,
        by_game: bool,
    ) -> Result<(), ZError> {
        let auth = Header::authorization(offset as usize)
            .ok_or_else(|| ZError::memory(offset as u32, "header byte has no write authorization"))?;
        if self.header.version < auth.min_version {
            return Err(ZError::memory(offset as u32, "header byte not writable below its minimum version"));
        }
        let allowed = if by_game { auth.game_may_write } else { auth.interpreter_may_write };
        if !allowed {
            return Err(ZError::memory(offset as u32, "writer not authorized for this header byte"));
        }
        self.write_byte_unchecked(offset as u32, value)
    }

    pub fn game_set_header(&mut self, offset: u16, value: u8) -> Result<(), ZError> {
        self.authorized_header_write(offset, value, true)
    }

    pub fn interpreter_set_header(&mut self, offset: u16, value: u8) -> Result<(), ZError> {
        self.authorized_header_write(offset, value, false)
    }

    pub fn read_global(&self, var: u8) -> Result<u16, ZError> {
        if var < 0x10 {
            return Err(ZError::memory(var as u32, "not a global variable index"));
        }
        let addr = self.header.global_variables as u32 + (var - 0x10) as u32 * 2;
        self.read_word(addr)
    }

    pub fn write_global(&mut self, var: u8, value: u16) -> Result<(), ZError> {
        if var < 0x10 {
            return Err(ZError::memory(var as u32, "not a global variable index"));
        }
        let addr = self.header.global_variables as u32 + (var - 0x10) as u32 * 2;
        self.write_word(addr, value)
    }

    pub fn verify_checksum(&self) -> bool {
        if self.header.checksum_file == 0 {
            return true; // older/incomplete files may legitimately carry 0
        }
        let computed = Header::checksum(&self.pristine, self.header.len_file);
        if computed != self.header.checksum_file {
            debug!(
                "checksum mismatch: computed {:#06x}, header says {:#06x}",
                computed, self.header.checksum_file
            );
            return false;
        }
        true
    }

    /// Replace dynamic memory wholesale (used by Quetzal restore).
    pub fn restore_dynamic_memory(&mut self, data: &[u8]) -> Result<(), ZError> {
        let limit = self.static_start() as usize;
        if data.len() != limit {
            warn!(
                "restored dynamic memory length {} does not match expected {}",
                data.len(),
                limit
            );
            return Err(ZError::save_file("CMem/UMem", "dynamic memory size mismatch"));
        }
        self.bytes[..limit].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_v3(static_start: u16) -> Vec<u8> {
        let mut m = vec![0u8; 0x400];
        m[0x00] = 3;
        m[0x0C] = 0x01; // globals at 0x100
        m[0x0E] = (static_start >> 8) as u8;
        m[0x0F] = (static_start & 0xFF) as u8;
        m
    }

    #[test]
    fn writes_below_static_succeed() {
        let mut mem = Memory::load(minimal_v3(0x200)).unwrap();
        mem.write_byte(0x100, 0xAB).unwrap();
        assert_eq!(mem.read_byte(0x100).unwrap(), 0xAB);
    }

    #[test]
    fn writes_at_or_above_static_fail() {
        let mut mem = Memory::load(minimal_v3(0x200)).unwrap();
        assert!(mem.write_byte(0x200, 0xFF).is_err());
    }

    #[test]
    fn direct_header_writes_are_rejected() {
        let mut mem = Memory::load(minimal_v3(0x200)).unwrap();
        assert!(mem.write_byte(0x01, 0x04).is_err());
    }

    #[test]
    fn authorized_header_write_checks_version_and_writer() {
        let mut mem = Memory::load(minimal_v3(0x200)).unwrap();
        // Flags2 requires v4+; this is a v3 story.
        assert!(mem.interpreter_set_header(0x0A, 1).is_err());
        // Screen height is writable by the interpreter from v1.
        assert!(mem.interpreter_set_header(0x20, 25).is_ok());
        assert!(mem.game_set_header(0x20, 25).is_err());
    }

    #[test]
    fn global_round_trip() {
        let mut mem = Memory::load(minimal_v3(0x200)).unwrap();
        mem.write_global(0x10, 0x1234).unwrap();
        assert_eq!(mem.read_global(0x10).unwrap(), 0x1234);
    }
}
