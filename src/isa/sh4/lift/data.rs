use super::Ctx;
use crate::decoder::{Param, Scaling};
use crate::error::LiftError;
use crate::il::op::*;
use crate::il::Effect;
use crate::isa::sh4::addressing::ParamRead;
use crate::isa::sh4::status::{flag_bit, SR_T};
use crate::isa::sh4::REG_SIZE;

/// Copy source to destination at the instruction's scaling. Also covers
/// LDC, LDS, STC, STS and MOVCA.
pub(super) fn mov(cx: &Ctx) -> Result<Effect, LiftError> {
    let src = cx.read(0)?;
    let store = cx.set(1, src.pure)?;
    // `@Rn+, Rn` keeps the loaded value instead of the incremented address.
    let post = match (cx.param(0)?, cx.param(1)?) {
        (Param::PostInc(m), Param::RegDirect(n)) if m == n => None,
        _ => src.post,
    };
    Ok(ParamRead::around(src.pre, store, post))
}

pub(super) fn movt(cx: &Ctx) -> Result<Effect, LiftError> {
    cx.set(0, flag_bit(SR_T))
}

pub(super) fn swap(cx: &Ctx) -> Result<Effect, LiftError> {
    let swapped = match cx.scaling() {
        Scaling::B => logor(
            logor(
                logand(varl("src"), un(REG_SIZE, 0xffff_0000)),
                shiftl0(logand(varl("src"), un(REG_SIZE, 0xff)), un(REG_SIZE, 8)),
            ),
            logand(shiftr0(varl("src"), un(REG_SIZE, 8)), un(REG_SIZE, 0xff)),
        ),
        Scaling::W => logor(
            shiftl0(varl("src"), un(REG_SIZE, 16)),
            shiftr0(varl("src"), un(REG_SIZE, 16)),
        ),
        other => return Err(LiftError::InvalidScaling(other)),
    };
    Ok(seq([
        setl("src", cx.get_at(0, Scaling::L)?),
        cx.set_at(1, swapped, Scaling::L)?,
    ]))
}

/// Middle 32 bits of Rm:Rn.
pub(super) fn xtrct(cx: &Ctx) -> Result<Effect, LiftError> {
    cx.set(
        1,
        logor(
            shiftl0(cx.get(0)?, un(REG_SIZE, 16)),
            shiftr0(cx.get(1)?, un(REG_SIZE, 16)),
        ),
    )
}
