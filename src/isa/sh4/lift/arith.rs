use super::Ctx;
use crate::decoder::Scaling;
use crate::error::LiftError;
use crate::il::op::{self, *};
use crate::il::{Effect, Pure};
use crate::isa::sh4::alu::{
    self, is_add_carry, is_add_overflow, is_sub_borrow, is_sub_underflow, MacForm,
};
use crate::isa::sh4::status::{flag_bit, SR_M, SR_Q, SR_T};
use crate::isa::sh4::REG_SIZE;

fn zero() -> Pure {
    un(REG_SIZE, 0)
}

pub(super) fn add(cx: &Ctx) -> Result<Effect, LiftError> {
    cx.set(1, op::add(cx.get(0)?, cx.get(1)?))
}

/// Rn = Rn + Rm + T, T = carry.
pub(super) fn addc(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(seq([
        setl("x", cx.get(1)?),
        setl("y", cx.get(0)?),
        setl(
            "res",
            op::add(op::add(varl("x"), varl("y")), flag_bit(SR_T)),
        ),
        cx.set(1, varl("res"))?,
        setg(SR_T, is_add_carry(varl("res"), varl("x"), varl("y"))),
    ]))
}

/// Rn = Rn + Rm, T = signed overflow.
pub(super) fn addv(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(seq([
        setl("x", cx.get(1)?),
        setl("y", cx.get(0)?),
        setl("res", op::add(varl("x"), varl("y"))),
        cx.set(1, varl("res"))?,
        setg(SR_T, is_add_overflow(varl("res"), varl("x"), varl("y"))),
    ]))
}

pub(super) fn cmp_eq(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(setg(SR_T, eq(cx.get(0)?, cx.get(1)?)))
}

pub(super) fn cmp_hs(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(setg(SR_T, uge(cx.get(1)?, cx.get(0)?)))
}

pub(super) fn cmp_ge(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(setg(SR_T, sge(cx.get(1)?, cx.get(0)?)))
}

pub(super) fn cmp_hi(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(setg(SR_T, ugt(cx.get(1)?, cx.get(0)?)))
}

pub(super) fn cmp_gt(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(setg(SR_T, sgt(cx.get(1)?, cx.get(0)?)))
}

pub(super) fn cmp_pz(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(setg(SR_T, sge(cx.get(0)?, zero())))
}

pub(super) fn cmp_pl(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(setg(SR_T, sgt(cx.get(0)?, zero())))
}

/// T is set when any byte of Rm equals the same byte of Rn.
pub(super) fn cmp_str(cx: &Ctx) -> Result<Effect, LiftError> {
    let byte_zero = |shift: u64| {
        is_zero(logand(
            shiftr0(varl("diff"), un(REG_SIZE, shift)),
            un(REG_SIZE, 0xff),
        ))
    };
    Ok(seq([
        setl("diff", logxor(cx.get(0)?, cx.get(1)?)),
        setg(
            SR_T,
            or(
                or(byte_zero(0), byte_zero(8)),
                or(byte_zero(16), byte_zero(24)),
            ),
        ),
    ]))
}

pub(super) fn div1(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(seq([
        alu::div1_step(cx.get(1)?, cx.get(0)?),
        cx.set(1, varl("rem"))?,
    ]))
}

/// Signed division setup: M and Q take the signs of divisor and dividend.
pub(super) fn div0s(cx: &Ctx) -> Result<Effect, LiftError> {
    let m = msb(cx.get(0)?);
    let q = msb(cx.get(1)?);
    Ok(seq([
        setg(SR_M, m.dup()),
        setg(SR_Q, q.dup()),
        setg(SR_T, xor(m, q)),
    ]))
}

pub(super) fn div0u() -> Effect {
    seq([
        setg(SR_M, il_false()),
        setg(SR_Q, il_false()),
        setg(SR_T, il_false()),
    ])
}

/// MACH:MACL = Rn * Rm over 64 bits.
pub(super) fn dmul(cx: &Ctx, is_signed: bool) -> Result<Effect, LiftError> {
    let wide = 2 * REG_SIZE;
    let extend = |p: Pure| {
        if is_signed {
            signed(wide, p)
        } else {
            unsigned(wide, p)
        }
    };
    Ok(seq([
        setl("prod", mul(extend(cx.get(0)?), extend(cx.get(1)?))),
        setg("macl", unsigned(REG_SIZE, varl("prod"))),
        setg(
            "mach",
            unsigned(REG_SIZE, shiftr0(varl("prod"), un(wide, REG_SIZE as u64))),
        ),
    ]))
}

/// Rn -= 1, T = (Rn == 0).
pub(super) fn dt(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(seq([
        cx.set(0, op::sub(cx.get(0)?, un(REG_SIZE, 1)))?,
        setg(SR_T, is_zero(cx.get(0)?)),
    ]))
}

/// EXTS/EXTU: extend the low byte or word of Rm into Rn.
pub(super) fn ext(cx: &Ctx, is_signed: bool) -> Result<Effect, LiftError> {
    let bits = match cx.scaling() {
        s @ (Scaling::B | Scaling::W) => s.bits().ok_or(LiftError::InvalidScaling(s))?,
        other => return Err(LiftError::InvalidScaling(other)),
    };
    let low = unsigned(bits, cx.get_at(0, Scaling::L)?);
    let value = if is_signed {
        signed(REG_SIZE, low)
    } else {
        unsigned(REG_SIZE, low)
    };
    cx.set_at(1, value, Scaling::L)
}

/// MAC.L / MAC.W @Rm+, @Rn+. Rn is loaded and stepped before Rm, so the
/// same register used twice reads two consecutive values.
pub(super) fn mac(cx: &Ctx) -> Result<Effect, LiftError> {
    let form = match cx.scaling() {
        Scaling::L => MacForm::Long,
        Scaling::W => MacForm::Word,
        other => return Err(LiftError::InvalidScaling(other)),
    };
    let n = cx.read(1)?;
    let m = cx.read(0)?;
    let mut effects = vec![setl("mac_n", n.pure)];
    effects.extend(n.post);
    effects.push(setl("mac_m", m.pure));
    effects.extend(m.post);
    effects.push(alu::mac(form, varl("mac_n"), varl("mac_m")));
    Ok(seq(effects))
}

pub(super) fn mul_l(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(setg("macl", mul(cx.get(0)?, cx.get(1)?)))
}

/// MULS.W / MULU.W: 16 x 16 into MACL.
pub(super) fn mul_w(cx: &Ctx, is_signed: bool) -> Result<Effect, LiftError> {
    let extend = |p: Pure| {
        let low = unsigned(16, p);
        if is_signed {
            signed(REG_SIZE, low)
        } else {
            unsigned(REG_SIZE, low)
        }
    };
    Ok(setg(
        "macl",
        mul(
            extend(cx.get_at(0, Scaling::L)?),
            extend(cx.get_at(1, Scaling::L)?),
        ),
    ))
}

pub(super) fn neg(cx: &Ctx) -> Result<Effect, LiftError> {
    cx.set(1, op::neg(cx.get(0)?))
}

/// Rn = 0 - Rm - T, T = borrow.
pub(super) fn negc(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(seq([
        setl("y", cx.get(0)?),
        setl("res", op::sub(op::sub(zero(), varl("y")), flag_bit(SR_T))),
        cx.set(1, varl("res"))?,
        setg(SR_T, is_sub_borrow(varl("res"), zero(), varl("y"))),
    ]))
}

pub(super) fn sub(cx: &Ctx) -> Result<Effect, LiftError> {
    cx.set(1, op::sub(cx.get(1)?, cx.get(0)?))
}

/// Rn = Rn - Rm - T, T = borrow.
pub(super) fn subc(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(seq([
        setl("x", cx.get(1)?),
        setl("y", cx.get(0)?),
        setl(
            "res",
            op::sub(op::sub(varl("x"), varl("y")), flag_bit(SR_T)),
        ),
        cx.set(1, varl("res"))?,
        setg(SR_T, is_sub_borrow(varl("res"), varl("x"), varl("y"))),
    ]))
}

/// Rn = Rn - Rm, T = signed underflow.
pub(super) fn subv(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(seq([
        setl("x", cx.get(1)?),
        setl("y", cx.get(0)?),
        setl("res", op::sub(varl("x"), varl("y"))),
        cx.set(1, varl("res"))?,
        setg(SR_T, is_sub_underflow(varl("res"), varl("x"), varl("y"))),
    ]))
}
