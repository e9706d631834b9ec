use super::Ctx;
use crate::decoder::Scaling;
use crate::error::LiftError;
use crate::il::op::*;
use crate::il::{Effect, Pure};
use crate::isa::sh4::status::{flag_bit, SR_T};
use crate::isa::sh4::REG_SIZE;

fn amount(n: u64) -> Pure {
    un(REG_SIZE, n)
}

/// `dst = f(src, dst)`, evaluated at the instruction's scaling.
fn binary(cx: &Ctx, f: fn(Pure, Pure) -> Pure) -> Result<Effect, LiftError> {
    cx.set(1, f(cx.get(0)?, cx.get(1)?))
}

pub(super) fn and(cx: &Ctx) -> Result<Effect, LiftError> {
    binary(cx, logand)
}

pub(super) fn or(cx: &Ctx) -> Result<Effect, LiftError> {
    binary(cx, logor)
}

pub(super) fn xor(cx: &Ctx) -> Result<Effect, LiftError> {
    binary(cx, logxor)
}

pub(super) fn not(cx: &Ctx) -> Result<Effect, LiftError> {
    cx.set(1, lognot(cx.get(0)?))
}

/// TAS.B: T = (byte == 0), then bit 7 of the byte is set.
pub(super) fn tas(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(seq([
        setl("byte", cx.get_at(0, Scaling::B)?),
        setg(SR_T, is_zero(varl("byte"))),
        cx.set_at(0, logor(varl("byte"), un(8, 0x80)), Scaling::B)?,
    ]))
}

pub(super) fn tst(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(setg(SR_T, is_zero(logand(cx.get(0)?, cx.get(1)?))))
}

pub(super) fn rotl(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(seq([
        setl("v", cx.get(0)?),
        setg(SR_T, msb(varl("v"))),
        cx.set(
            0,
            logor(
                shiftl0(varl("v"), amount(1)),
                shiftr0(varl("v"), amount(REG_SIZE as u64 - 1)),
            ),
        )?,
    ]))
}

pub(super) fn rotr(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(seq([
        setl("v", cx.get(0)?),
        setg(SR_T, lsb(varl("v"))),
        cx.set(
            0,
            logor(
                shiftr0(varl("v"), amount(1)),
                shiftl0(varl("v"), amount(REG_SIZE as u64 - 1)),
            ),
        )?,
    ]))
}

/// Rotate left through T.
pub(super) fn rotcl(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(seq([
        setl("v", cx.get(0)?),
        cx.set(
            0,
            logor(shiftl0(varl("v"), amount(1)), flag_bit(SR_T)),
        )?,
        setg(SR_T, msb(varl("v"))),
    ]))
}

/// Rotate right through T.
pub(super) fn rotcr(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(seq([
        setl("v", cx.get(0)?),
        cx.set(
            0,
            logor(
                shiftr0(varl("v"), amount(1)),
                shiftl0(flag_bit(SR_T), amount(REG_SIZE as u64 - 1)),
            ),
        )?,
        setg(SR_T, lsb(varl("v"))),
    ]))
}

/// SHAD/SHLD Rm, Rn: a non-negative Rm shifts left by its low five bits,
/// a negative one shifts right by 32 minus them. A right shift of 32
/// fills Rn with the shifted-in bit.
pub(super) fn shift_dynamic(cx: &Ctx, arithmetic: bool) -> Result<Effect, LiftError> {
    let low = || logand(varl("amount"), amount(0x1f));
    let right = sub(amount(REG_SIZE as u64), low());
    let shifted_right = if arithmetic {
        shiftra(varl("v"), right)
    } else {
        shiftr0(varl("v"), right)
    };
    Ok(seq([
        setl("amount", cx.get(0)?),
        setl("v", cx.get(1)?),
        branch(
            sge(varl("amount"), amount(0)),
            cx.set(1, shiftl0(varl("v"), low()))?,
            cx.set(1, shifted_right)?,
        ),
    ]))
}

/// SHAL/SHLL: T = msb, shift left one.
pub(super) fn shll(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(seq([
        setg(SR_T, msb(cx.get(0)?)),
        cx.set(0, shiftl0(cx.get(0)?, amount(1)))?,
    ]))
}

pub(super) fn shar(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(seq([
        setg(SR_T, lsb(cx.get(0)?)),
        cx.set(0, shiftra(cx.get(0)?, amount(1)))?,
    ]))
}

pub(super) fn shlr(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(seq([
        setg(SR_T, lsb(cx.get(0)?)),
        cx.set(0, shiftr0(cx.get(0)?, amount(1)))?,
    ]))
}

/// SHLLn/SHLRn: fixed logical shift, T untouched.
pub(super) fn shift_by(cx: &Ctx, left: bool, n: u64) -> Result<Effect, LiftError> {
    let value = cx.get(0)?;
    let shifted = if left {
        shiftl0(value, amount(n))
    } else {
        shiftr0(value, amount(n))
    };
    cx.set(0, shifted)
}
