//! Translation of decoded SH-4 instructions into IL.
//!
//! Every mnemonic maps to one function in a family module. Lifting is pure:
//! privileged instructions consult a [`PrivilegeOracle`] and come back as
//! [`Lifted::Exception`] instead of touching interpreter state.

use tracing::{debug, warn};

use super::addressing::{self, ParamRead};
use super::{reg, StatusFlags, RESINST};
use crate::decoder::{Mnemonic, Param, Scaling, ShOp};
use crate::error::LiftError;
use crate::il::op::*;
use crate::il::vm::{IlVm, Value};
use crate::il::{Effect, Lifted, Pure};

mod arith;
mod branch;
mod data;
mod logic;
mod system;

/// Answers whether the CPU currently runs in privileged mode.
pub trait PrivilegeOracle {
    fn privileged(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuMode {
    #[default]
    User,
    Privileged,
}

impl PrivilegeOracle for CpuMode {
    fn privileged(&self) -> bool {
        *self == CpuMode::Privileged
    }
}

impl PrivilegeOracle for StatusFlags {
    fn privileged(&self) -> bool {
        self.contains(StatusFlags::MD)
    }
}

/// Reads SR.MD from the interpreter; a missing flag means user mode.
impl PrivilegeOracle for IlVm {
    fn privileged(&self) -> bool {
        match self.get(super::status::SR_D) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Bitv(bv)) => !bv.is_zero(),
            None => false,
        }
    }
}

pub trait Lifter {
    fn lift(&self, op: &ShOp, pc: u64, mode: &dyn PrivilegeOracle) -> Result<Lifted, LiftError>;
}

pub struct Sh4Lifter;

impl Lifter for Sh4Lifter {
    fn lift(&self, op: &ShOp, pc: u64, mode: &dyn PrivilegeOracle) -> Result<Lifted, LiftError> {
        lift(op, pc, mode)
    }
}

/// Lifts `op` located at `pc`.
///
/// Invalid instructions and malformed operands are errors. Mnemonics
/// without semantics yield [`Effect::Empty`].
pub fn lift(op: &ShOp, pc: u64, mode: &dyn PrivilegeOracle) -> Result<Lifted, LiftError> {
    let cx = Ctx { op, pc };
    let effect = match op.mnemonic {
        Mnemonic::Invalid => return Err(LiftError::InvalidInstruction { opcode: op.opcode }),
        Mnemonic::Mov => data::mov(&cx)?,
        Mnemonic::Movt => data::movt(&cx)?,
        Mnemonic::Swap => data::swap(&cx)?,
        Mnemonic::Xtrct => data::xtrct(&cx)?,
        Mnemonic::Movca => data::mov(&cx)?,
        Mnemonic::Add => arith::add(&cx)?,
        Mnemonic::Addc => arith::addc(&cx)?,
        Mnemonic::Addv => arith::addv(&cx)?,
        Mnemonic::CmpEq => arith::cmp_eq(&cx)?,
        Mnemonic::CmpHs => arith::cmp_hs(&cx)?,
        Mnemonic::CmpGe => arith::cmp_ge(&cx)?,
        Mnemonic::CmpHi => arith::cmp_hi(&cx)?,
        Mnemonic::CmpGt => arith::cmp_gt(&cx)?,
        Mnemonic::CmpPz => arith::cmp_pz(&cx)?,
        Mnemonic::CmpPl => arith::cmp_pl(&cx)?,
        Mnemonic::CmpStr => arith::cmp_str(&cx)?,
        Mnemonic::Div1 => arith::div1(&cx)?,
        Mnemonic::Div0s => arith::div0s(&cx)?,
        Mnemonic::Div0u => arith::div0u(),
        Mnemonic::Dmuls => arith::dmul(&cx, true)?,
        Mnemonic::Dmulu => arith::dmul(&cx, false)?,
        Mnemonic::Dt => arith::dt(&cx)?,
        Mnemonic::Exts => arith::ext(&cx, true)?,
        Mnemonic::Extu => arith::ext(&cx, false)?,
        Mnemonic::Mac => arith::mac(&cx)?,
        Mnemonic::Mul => arith::mul_l(&cx)?,
        Mnemonic::Muls => arith::mul_w(&cx, true)?,
        Mnemonic::Mulu => arith::mul_w(&cx, false)?,
        Mnemonic::Neg => arith::neg(&cx)?,
        Mnemonic::Negc => arith::negc(&cx)?,
        Mnemonic::Sub => arith::sub(&cx)?,
        Mnemonic::Subc => arith::subc(&cx)?,
        Mnemonic::Subv => arith::subv(&cx)?,
        Mnemonic::And => logic::and(&cx)?,
        Mnemonic::Not => logic::not(&cx)?,
        Mnemonic::Or => logic::or(&cx)?,
        Mnemonic::Tas => logic::tas(&cx)?,
        Mnemonic::Tst => logic::tst(&cx)?,
        Mnemonic::Xor => logic::xor(&cx)?,
        Mnemonic::Rotl => logic::rotl(&cx)?,
        Mnemonic::Rotr => logic::rotr(&cx)?,
        Mnemonic::Rotcl => logic::rotcl(&cx)?,
        Mnemonic::Rotcr => logic::rotcr(&cx)?,
        Mnemonic::Shad => logic::shift_dynamic(&cx, true)?,
        Mnemonic::Shld => logic::shift_dynamic(&cx, false)?,
        Mnemonic::Shal | Mnemonic::Shll => logic::shll(&cx)?,
        Mnemonic::Shar => logic::shar(&cx)?,
        Mnemonic::Shlr => logic::shlr(&cx)?,
        Mnemonic::Shll2 => logic::shift_by(&cx, true, 2)?,
        Mnemonic::Shlr2 => logic::shift_by(&cx, false, 2)?,
        Mnemonic::Shll8 => logic::shift_by(&cx, true, 8)?,
        Mnemonic::Shlr8 => logic::shift_by(&cx, false, 8)?,
        Mnemonic::Shll16 => logic::shift_by(&cx, true, 16)?,
        Mnemonic::Shlr16 => logic::shift_by(&cx, false, 16)?,
        Mnemonic::Bf | Mnemonic::Bfs => branch::conditional(&cx, false)?,
        Mnemonic::Bt | Mnemonic::Bts => branch::conditional(&cx, true)?,
        Mnemonic::Bra | Mnemonic::Braf | Mnemonic::Jmp => branch::jump(&cx)?,
        Mnemonic::Bsr | Mnemonic::Bsrf | Mnemonic::Jsr => branch::call(&cx)?,
        Mnemonic::Rts => branch::rts(),
        Mnemonic::Clrmac => system::clrmac(),
        Mnemonic::Clrs => setg(super::status::SR_S, il_false()),
        Mnemonic::Clrt => setg(super::status::SR_T, il_false()),
        Mnemonic::Sets => setg(super::status::SR_S, il_true()),
        Mnemonic::Sett => setg(super::status::SR_T, il_true()),
        Mnemonic::Nop => nop(),
        Mnemonic::Lds | Mnemonic::Sts => data::mov(&cx)?,
        Mnemonic::Ldc => return guarded(mode, cx.reg_of(1), || data::mov(&cx)),
        Mnemonic::Stc => return guarded(mode, cx.reg_of(0), || data::mov(&cx)),
        Mnemonic::Rte => return guarded(mode, None, || Ok(system::rte())),
        Mnemonic::Sleep => return guarded(mode, None, || Ok(nop())),
        Mnemonic::Unimpl => {
            warn!("unimplemented instruction {:#06x}", op.opcode);
            empty()
        }
    };
    Ok(Lifted::Effect(effect))
}

/// Runs `body` only in privileged mode, or for GBR when `target` names it.
/// Otherwise the instruction becomes a reserved-instruction exception.
fn guarded(
    mode: &dyn PrivilegeOracle,
    target: Option<u16>,
    body: impl FnOnce() -> Result<Effect, LiftError>,
) -> Result<Lifted, LiftError> {
    if !mode.privileged() && target != Some(reg::GBR) {
        debug!(?target, "privileged instruction in user mode");
        return Ok(Lifted::Exception(RESINST.into()));
    }
    body().map(Lifted::Effect)
}

/// Operand access for one instruction.
pub(crate) struct Ctx<'a> {
    op: &'a ShOp,
    pc: u64,
}

impl Ctx<'_> {
    fn param(&self, index: usize) -> Result<&Param, LiftError> {
        self.op
            .params
            .get(index)
            .ok_or(LiftError::MissingOperand {
                mnemonic: self.op.mnemonic,
                index,
            })
    }

    fn reg_of(&self, index: usize) -> Option<u16> {
        self.op.params.get(index).and_then(Param::reg)
    }

    fn scaling(&self) -> Scaling {
        self.op.scaling
    }

    fn read(&self, index: usize) -> Result<ParamRead, LiftError> {
        addressing::read(self.param(index)?, self.op.scaling, self.pc)
    }

    /// Operand value at the instruction's scaling.
    fn get(&self, index: usize) -> Result<Pure, LiftError> {
        self.get_at(index, self.op.scaling)
    }

    fn get_at(&self, index: usize, scaling: Scaling) -> Result<Pure, LiftError> {
        Ok(addressing::read(self.param(index)?, scaling, self.pc)?.pure)
    }

    fn set(&self, index: usize, value: Pure) -> Result<Effect, LiftError> {
        self.set_at(index, value, self.op.scaling)
    }

    fn set_at(&self, index: usize, value: Pure, scaling: Scaling) -> Result<Effect, LiftError> {
        addressing::write(self.param(index)?, value, scaling, self.pc)
    }

    fn ea(&self, index: usize) -> Result<Pure, LiftError> {
        let param = self.param(index)?;
        addressing::effective_address(param, self.op.scaling, self.pc)?.ok_or(
            LiftError::InvalidAddressingMode {
                mode: param.mode(),
                access: "effective address",
            },
        )
    }
}
