use thiserror::Error;

use crate::decoder::{AddrMode, Mnemonic, Scaling};

/// Conditions under which an instruction yields no effect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiftError {
    #[error("invalid register R{0}")]
    InvalidRegister(u16),
    #[error("addressing mode {mode:?} has no {access}")]
    InvalidAddressingMode { mode: AddrMode, access: &'static str },
    #[error("{mnemonic:?} is missing operand {index}")]
    MissingOperand { mnemonic: Mnemonic, index: usize },
    #[error("scaling {0:?} cannot size a memory access")]
    InvalidScaling(Scaling),
    #[error("invalid instruction (opcode {opcode:#06x})")]
    InvalidInstruction { opcode: u16 },
}

#[derive(Error, Debug)]
pub enum VmError {
    #[error("unknown {scope} variable `{name}`")]
    UnknownVariable { scope: &'static str, name: String },
    #[error("variable `{0}` already exists")]
    DuplicateVariable(String),
    #[error("type mismatch: expected a {expected}")]
    TypeMismatch { expected: &'static str },
    #[error("width mismatch: {left} vs {right} bits")]
    WidthMismatch { left: u32, right: u32 },
    #[error("cast to a zero-width bit-vector")]
    ZeroWidth,
    #[error("memory access of {0} bits is not byte sized")]
    UnalignedAccess(u32),
    #[error("address {0} does not fit the memory key")]
    AddressOverflow(String),
    #[error("bus error at {addr:#010x}: {source}")]
    Bus {
        addr: u32,
        #[source]
        source: anyhow::Error,
    },
    #[error("a register binding is already set up")]
    BindingAlreadySet,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("register `{0}` is not part of the profile")]
    UnknownRegister(String),
    #[error("register `{0}` is listed twice")]
    DuplicateName(String),
}

/// Setup errors found while moving physical state into the IL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("no register binding is set up")]
    NoBinding,
    #[error("no IL variable exists for bound registers: {}", .0.join(", "))]
    UnboundVariables(Vec<String>),
}

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("invalid register profile: {0}")]
    Json(#[from] serde_json::Error),
    #[error("register `{0}` has zero width")]
    ZeroWidth(String),
    #[error("register `{0}` does not fit the register arena")]
    Overlong(String),
    #[error("register `{0}` is defined twice")]
    DuplicateName(String),
    #[error("program counter alias `{0}` names no register")]
    UnknownPc(String),
}
