use thiserror::Error;

/// Everything that can go fatally wrong inside the core: bad cartridge
/// configuration at construction time, an undefined opcode reaching the
/// executor, or a `STOP` instruction asking the run loop to shut down.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid cartridge configuration: {reason}")]
    ConfigError { reason: String },

    #[error("illegal opcode {opcode:#04x} at PC={pc:#06x}")]
    IllegalOpcode { opcode: u8, pc: u16 },

    #[error("STOP executed, shutting down")]
    StopRequested,
}

pub type Result<T> = std::result::Result<T, CoreError>;
