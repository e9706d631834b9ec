use anyhow::Error;
use tracing::{debug, warn};

use crate::decoder::{Decoder, ShOp};
use crate::error::{LiftError, SyncError, VmError};
use crate::il::vm::{Event, IlConfig, IlVm};
use crate::isa::sh4::{self, lift::Lifter, Sh4Lifter};
use crate::memory::Bus;
use crate::reg::{sync, RegProfile, RegisterBinding, RegisterFile};

/// Every SH-4 instruction is one 16-bit word.
pub const INSN_SIZE: u32 = 2;

#[derive(thiserror::Error, Debug)]
pub enum Trap {
    #[error("Invalid instruction at {pc:#010x}")]
    InvalidInstruction { pc: u32 },
    #[error("Bus error at {addr:#010x}: {source}")]
    Bus {
        addr: u32,
        #[source]
        source: Error,
    },
    #[error("Cannot lift instruction at {pc:#010x}: {source}")]
    Lift {
        pc: u32,
        #[source]
        source: LiftError,
    },
    #[error("Exception `{name}` at {pc:#010x}")]
    Exception { pc: u32, name: String },
    #[error(transparent)]
    Vm(#[from] VmError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// A register file driven through the IL interpreter, one instruction per
/// step.
pub struct Session<L: Lifter = Sh4Lifter> {
    vm: IlVm,
    regs: RegisterFile,
    lifter: L,
}

impl Session<Sh4Lifter> {
    /// SH-4 session over the built-in register profile.
    pub fn sh4(big_endian: bool) -> Result<Self, VmError> {
        Self::new(sh4::profile(), sh4::il_config(big_endian), Sh4Lifter)
    }
}

impl<L: Lifter> Session<L> {
    /// Binds the registers derived from `profile` into a fresh interpreter.
    pub fn new(profile: RegProfile, config: IlConfig, lifter: L) -> Result<Self, VmError> {
        let mut vm = IlVm::new(config);
        vm.setup_reg_binding(RegisterBinding::derive(&profile))?;
        Ok(Self {
            vm,
            regs: RegisterFile::new(profile),
            lifter,
        })
    }

    pub fn regs(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    pub fn vm(&self) -> &IlVm {
        &self.vm
    }

    pub fn pc(&self) -> u32 {
        self.regs.pc().unwrap_or(0) as u32
    }

    pub fn reset(&mut self, reset_pc: u32) {
        self.regs.set_pc(reset_pc as u64);
    }

    /// Fetches, decodes and executes the instruction at the PC.
    pub fn step<B: Bus, D: Decoder>(&mut self, bus: &mut B, dec: &D) -> Result<(), Trap> {
        let pc = self.pc();
        let raw16 = bus
            .read_u16(pc)
            .map_err(|source| Trap::Bus { addr: pc, source })?;
        let op = dec.decode(raw16).ok_or(Trap::InvalidInstruction { pc })?;
        self.execute(&op, bus)
    }

    /// Executes an already decoded instruction at the PC.
    ///
    /// A raised exception still completes the step (the PC moves past the
    /// instruction) and is then reported as [`Trap::Exception`].
    pub fn execute<B: Bus>(&mut self, op: &ShOp, bus: &mut B) -> Result<(), Trap> {
        sync::from_physical(&mut self.vm, &self.regs)?;
        let pc = self.vm.pc().to_u64() as u32;
        let lifted = match self.lifter.lift(op, pc as u64, &self.vm) {
            Ok(lifted) => lifted,
            Err(LiftError::InvalidInstruction { .. }) => return Err(Trap::InvalidInstruction { pc }),
            Err(source) => return Err(Trap::Lift { pc, source }),
        };
        debug!(il = %lifted, "execute {pc:#010x}");
        self.vm.step(&lifted, bus, INSN_SIZE)?;
        if !sync::to_physical(&self.vm, &mut self.regs) {
            warn!("register file only partially updated");
        }
        match self.vm.take_events().into_iter().next() {
            Some(Event::Exception(name)) => Err(Trap::Exception { pc, name }),
            None => Ok(()),
        }
    }
}
