//! Restore game functionality for the Quetzal format.

use crate::error::ZError;
use crate::memory::Memory;
use crate::quetzal::chunks::{CMemChunk, IFhdChunk, StksChunk, UMemChunk};
use crate::quetzal::iff::IffFile;
use crate::stack::Stack;
use log::info;
use std::path::Path;

pub struct RestoreGame {
    iff: IffFile,
}

impl RestoreGame {
    pub fn from_file(path: &Path) -> Result<Self, ZError> {
        let iff = IffFile::read_from_file(path).map_err(|e| ZError::save_file("FORM", e))?;
        if &iff.form_type != b"IFZS" {
            return Err(ZError::save_file("FORM", "not a Quetzal save file"));
        }
        if iff.find_chunk(b"IFhd").is_none() {
            return Err(ZError::save_file("IFhd", "missing required chunk"));
        }
        if iff.find_chunk(b"CMem").is_none() && iff.find_chunk(b"UMem").is_none() {
            return Err(ZError::save_file("CMem/UMem", "missing memory chunk"));
        }
        if iff.find_chunk(b"Stks").is_none() {
            return Err(ZError::save_file("Stks", "missing required chunk"));
        }
        Ok(RestoreGame { iff })
    }

    /// Apply this save to `memory`, replacing `stack` wholesale. Returns
    /// the saved PC so the caller can resume execution there; per the
    /// standard, v1-3 `restore` actually ignores this and continues from
    /// the instruction after `restore` itself, re-reading its own result.
    pub fn restore(&self, memory: &mut Memory, stack: &mut Stack) -> Result<u32, ZError> {
        let ifhd_chunk = self.iff.find_chunk(b"IFhd").ok_or_else(|| ZError::save_file("IFhd", "missing"))?;
        let ifhd = IFhdChunk::from_bytes(&ifhd_chunk.data)?;
        ifhd.verify(memory)?;

        if let Some(cmem) = self.iff.find_chunk(b"CMem") {
            let chunk = CMemChunk { data: cmem.data.clone() };
            chunk.restore_to(memory)?;
        } else if let Some(umem) = self.iff.find_chunk(b"UMem") {
            let chunk = UMemChunk::from_bytes(umem.data.clone());
            chunk.restore_to(memory)?;
        }

        let stks_chunk = self.iff.find_chunk(b"Stks").ok_or_else(|| ZError::save_file("Stks", "missing"))?;
        let stks = StksChunk { data: stks_chunk.data.clone() };
        *stack = stks.restore()?;

        info!("restored game, {} call frames", stack.frames.len());
        Ok(ifhd.pc)
    }
}

pub fn load_from_prompt() -> Result<RestoreGame, ZError> {
    use std::io::{self, Write};
    print!("Enter save filename: ");
    io::stdout().flush().map_err(ZError::from)?;
    let mut filename = String::new();
    io::stdin().read_line(&mut filename).map_err(ZError::from)?;
    let filename = filename.trim();
    if filename.is_empty() {
        return Err(ZError::save_file("FORM", "no filename provided"));
    }
    let filename = if filename.ends_with(".sav") || filename.ends_with(".qzl") { filename.to_string() } else { format!("{filename}.sav") };
    RestoreGame::from_file(Path::new(&filename))
}
