//! Operand access: register banking, effective addresses, reads and writes.

use tracing::error;

use super::status::{get_status_reg, set_status_reg, SR_D, SR_R};
use super::{banked_reg_name, is_banked, reg, reg_name, ADDR_SIZE, REG_SIZE};
use crate::decoder::{Param, Scaling};
use crate::error::LiftError;
use crate::il::op::*;
use crate::il::{Effect, Pure};

fn invalid_reg(idx: u16) -> LiftError {
    error!("invalid register R{idx}");
    LiftError::InvalidRegister(idx)
}

fn bank1_selected() -> Pure {
    and(var(SR_D), var(SR_R))
}

/// Value of register `idx`. Banked registers select their copy at runtime
/// from SR.MD and SR.RB; SR is assembled from its flags.
pub fn get_reg(idx: u16) -> Result<Pure, LiftError> {
    if is_banked(idx) {
        let (b0, b1) = bank_pair(idx)?;
        return Ok(ite(bank1_selected(), var(b1), var(b0)));
    }
    match idx {
        reg::SR => Ok(get_status_reg()),
        reg::R0_BANK..=reg::R7_BANK => {
            let (b0, b1) = bank_pair(idx - reg::R0_BANK)?;
            Ok(ite(var(SR_R), var(b0), var(b1)))
        }
        _ => reg_name(idx).map(|name| var(name)).ok_or_else(|| invalid_reg(idx)),
    }
}

pub fn set_reg(idx: u16, value: Pure) -> Result<Effect, LiftError> {
    if is_banked(idx) {
        let (b0, b1) = bank_pair(idx)?;
        let dup = value.dup();
        return Ok(branch(bank1_selected(), setg(b1, value), setg(b0, dup)));
    }
    match idx {
        reg::SR => Ok(set_status_reg(value)),
        reg::R0_BANK..=reg::R7_BANK => {
            let (b0, b1) = bank_pair(idx - reg::R0_BANK)?;
            let dup = value.dup();
            Ok(branch(var(SR_R), setg(b0, value), setg(b1, dup)))
        }
        _ => reg_name(idx)
            .map(|name| setg(name, value))
            .ok_or_else(|| invalid_reg(idx)),
    }
}

fn bank_pair(idx: u16) -> Result<(&'static str, &'static str), LiftError> {
    match (banked_reg_name(idx, 0), banked_reg_name(idx, 1)) {
        (Some(b0), Some(b1)) => Ok((b0, b1)),
        _ => Err(invalid_reg(idx)),
    }
}

fn addr(v: u64) -> Pure {
    un(ADDR_SIZE, v)
}

fn access_size(scaling: Scaling) -> Result<u64, LiftError> {
    scaling
        .size()
        .map(u64::from)
        .ok_or(LiftError::InvalidScaling(scaling))
}

/// Effective address of a memory or PC-relative operand. `pc` is the
/// address of the instruction; PC-relative forms add the 4-byte fetch
/// offset. Register and immediate operands have none.
pub fn effective_address(param: &Param, scaling: Scaling, pc: u64) -> Result<Option<Pure>, LiftError> {
    let pc = addr(pc);
    let ea = match *param {
        Param::RegIndirect(n) | Param::PostInc(n) | Param::PreDec(n) => get_reg(n)?,
        Param::Disp { reg: n, disp } => add(
            get_reg(n)?,
            mul(addr(disp as u64), addr(access_size(scaling)?)),
        ),
        Param::Indexed(n) => add(get_reg(reg::R0)?, get_reg(n)?),
        Param::GbrDisp(disp) => add(
            get_reg(reg::GBR)?,
            mul(addr(disp as u64), addr(access_size(scaling)?)),
        ),
        Param::GbrIndexed => add(get_reg(reg::GBR)?, get_reg(reg::R0)?),
        Param::PcDisp(disp) => {
            let size = access_size(scaling)?;
            let base = if scaling == Scaling::L {
                logand(pc, addr(0xffff_fffc))
            } else {
                pc
            };
            add(add(base, addr(4)), mul(addr(disp as u64), addr(size)))
        }
        Param::Pc8(disp) => add(add(pc, addr(4)), word_disp(8, disp)),
        Param::Pc12(disp) => add(add(pc, addr(4)), word_disp(12, disp)),
        Param::PcReg(n) => add(add(pc, addr(4)), get_reg(n)?),
        Param::RegDirect(_) | Param::ImmU(_) | Param::ImmS(_) => return Ok(None),
    };
    Ok(Some(ea))
}

/// Branch displacement of `bits` bits in words, sign-extended to bytes.
fn word_disp(bits: u32, raw: u16) -> Pure {
    shiftl0(signed(ADDR_SIZE, un(bits, raw as u64)), addr(1))
}

fn memory_address(param: &Param, scaling: Scaling, pc: u64) -> Result<Pure, LiftError> {
    effective_address(param, scaling, pc)?.ok_or_else(|| {
        error!(mode = ?param.mode(), "no effective address");
        LiftError::InvalidAddressingMode {
            mode: param.mode(),
            access: "effective address",
        }
    })
}

/// Effects around an operand value: `pre` runs before the value is used,
/// `post` after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamRead {
    pub pre: Option<Effect>,
    pub pure: Pure,
    pub post: Option<Effect>,
}

impl ParamRead {
    fn value(pure: Pure) -> Self {
        Self {
            pre: None,
            pure,
            post: None,
        }
    }

    /// `target` wrapped in this read's pre and post effects.
    pub fn around(pre: Option<Effect>, target: Effect, post: Option<Effect>) -> Effect {
        match (pre, post) {
            (None, None) => target,
            (pre, post) => seq(pre.into_iter().chain([target]).chain(post)),
        }
    }
}

fn imm_width(scaling: Scaling) -> u32 {
    match scaling {
        Scaling::B | Scaling::W => scaling.bits().unwrap_or(REG_SIZE),
        _ => REG_SIZE,
    }
}

/// Reads an operand at `scaling`. Register reads below a long word keep the
/// low bits; memory reads load `scaling` bytes. Immediates come out at the
/// scaling width (a full register when unsized).
pub fn read(param: &Param, scaling: Scaling, pc: u64) -> Result<ParamRead, LiftError> {
    let load_bits = || {
        scaling
            .bits()
            .ok_or(LiftError::InvalidScaling(scaling))
    };
    Ok(match *param {
        Param::RegDirect(n) => {
            let value = get_reg(n)?;
            ParamRead::value(match scaling {
                Scaling::Invalid | Scaling::L => value,
                _ => unsigned(load_bits()?, value),
            })
        }
        Param::PostInc(n) => {
            let size = access_size(scaling)?;
            ParamRead {
                pre: None,
                pure: load(load_bits()?, memory_address(param, scaling, pc)?),
                post: Some(set_reg(n, add(get_reg(n)?, addr(size)))?),
            }
        }
        Param::PreDec(n) => {
            let size = access_size(scaling)?;
            ParamRead {
                pre: Some(set_reg(n, sub(get_reg(n)?, addr(size)))?),
                pure: load(load_bits()?, memory_address(param, scaling, pc)?),
                post: None,
            }
        }
        Param::ImmU(v) => ParamRead::value(un(imm_width(scaling), v as u64)),
        Param::ImmS(v) => ParamRead::value(sn(imm_width(scaling), v as i64)),
        _ => ParamRead::value(load(load_bits()?, memory_address(param, scaling, pc)?)),
    })
}

/// Writes `value` to an operand. Register writes below a long word are
/// sign-extended to the full register.
pub fn write(param: &Param, value: Pure, scaling: Scaling, pc: u64) -> Result<Effect, LiftError> {
    match *param {
        Param::RegDirect(n) => match scaling {
            Scaling::Invalid | Scaling::L => set_reg(n, value),
            _ => set_reg(n, signed(REG_SIZE, value)),
        },
        Param::ImmU(_) | Param::ImmS(_) => {
            error!(mode = ?param.mode(), "cannot write to an immediate");
            Err(LiftError::InvalidAddressingMode {
                mode: param.mode(),
                access: "write",
            })
        }
        _ => {
            let access = read(param, scaling, pc)?;
            let target = store(memory_address(param, scaling, pc)?, value);
            Ok(ParamRead::around(access.pre, target, access.post))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::AddrMode;

    #[test]
    fn register_direct_has_no_address() {
        assert_eq!(
            effective_address(&Param::RegDirect(1), Scaling::L, 0),
            Ok(None)
        );
        assert_eq!(effective_address(&Param::ImmS(-1), Scaling::L, 0), Ok(None));
    }

    #[test]
    fn immediates_cannot_be_written() {
        assert_eq!(
            write(&Param::ImmU(3), un(32, 1), Scaling::Invalid, 0),
            Err(LiftError::InvalidAddressingMode {
                mode: AddrMode::ImmU,
                access: "write"
            })
        );
    }

    #[test]
    fn out_of_range_register_is_rejected() {
        assert_eq!(get_reg(reg::COUNT), Err(LiftError::InvalidRegister(reg::COUNT)));
        assert!(set_reg(99, un(32, 0)).is_err());
    }

    #[test]
    fn displacement_needs_a_size() {
        assert_eq!(
            effective_address(&Param::GbrDisp(1), Scaling::Invalid, 0),
            Err(LiftError::InvalidScaling(Scaling::Invalid))
        );
    }

    #[test]
    fn banked_write_branches_on_mode() {
        let e = set_reg(3, un(32, 7)).unwrap();
        assert_eq!(
            e.to_string(),
            "(branch (&& (var sr_d) (var sr_r)) (set r3b (bv 32 0x7)) (set r3 (bv 32 0x7)))"
        );
        assert_eq!(get_reg(9).unwrap(), var("r9"));
    }
}
