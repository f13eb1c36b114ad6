//! Typed error taxonomy shared by every component of the interpreter.

use thiserror::Error;

/// All faults a running machine can raise, grouped the way the Z-Machine
/// standard and the Quetzal specification group them.
#[derive(Debug, Error)]
pub enum ZError {
    #[error("memory fault at {address:#06x}: {reason}")]
    Memory { address: u32, reason: String },

    #[error("decode fault at {pc:#06x}: {reason}")]
    Decode { pc: u32, reason: String },

    #[error("execution fault at {pc:#06x}: {reason}")]
    Execution { pc: u32, reason: String },

    #[error("I/O fault: {0}")]
    Io(String),

    #[error("save file fault in chunk {chunk}: {reason}")]
    SaveFile { chunk: String, reason: String },

    #[error("cancelled by user")]
    UserCancel,
}

impl ZError {
    pub fn memory(address: u32, reason: impl Into<String>) -> Self {
        ZError::Memory { address, reason: reason.into() }
    }

    pub fn decode(pc: u32, reason: impl Into<String>) -> Self {
        ZError::Decode { pc, reason: reason.into() }
    }

    pub fn execution(pc: u32, reason: impl Into<String>) -> Self {
        ZError::Execution { pc, reason: reason.into() }
    }

    pub fn save_file(chunk: impl Into<String>, reason: impl Into<String>) -> Self {
        ZError::SaveFile { chunk: chunk.into(), reason: reason.into() }
    }

    /// MemoryFault, DecodeFault and ExecutionFault halt the CPU loop.
    /// IOFault and SaveFileFault are recoverable at the opcode boundary.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ZError::Memory { .. } | ZError::Decode { .. } | ZError::Execution { .. })
    }
}

impl From<std::io::Error> for ZError {
    fn from(e: std::io::Error) -> Self {
        ZError::Io(e.to_string())
    }
}

pub type ZResult<T> = Result<T, ZError>;
