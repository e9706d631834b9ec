//! Flag formulas and multi-step arithmetic.
//!
//! The carry, borrow, overflow and underflow predicates only look at the
//! most significant bits of the operands and the result, so they hold for
//! any width and with a carry or borrow into the addition.

use super::status::{flag_bit, SR_M, SR_Q, SR_S, SR_T};
use super::REG_SIZE;
use crate::il::op::*;
use crate::il::{Effect, Pure};

/// Carry out of `r = x + y`, from the three msbs.
pub fn add_carry(x: bool, y: bool, r: bool) -> bool {
    (x && y) || (!r && y) || (x && !r)
}

/// Signed overflow of `r = x + y`.
pub fn add_overflow(x: bool, y: bool, r: bool) -> bool {
    (!r && x && y) || (r && !x && !y)
}

/// Borrow out of `r = x - y`.
pub fn sub_borrow(x: bool, y: bool, r: bool) -> bool {
    (!x && y) || (y && r) || (r && !x)
}

/// Signed underflow of `r = x - y`.
pub fn sub_underflow(x: bool, y: bool, r: bool) -> bool {
    (!r && x && !y) || (r && !x && y)
}

struct Msbs {
    x: Pure,
    y: Pure,
    r: Pure,
}

impl Msbs {
    fn of(res: Pure, x: Pure, y: Pure) -> Self {
        Self {
            x: msb(x),
            y: msb(y),
            r: msb(res),
        }
    }
}

pub fn is_add_carry(res: Pure, x: Pure, y: Pure) -> Pure {
    let m = Msbs::of(res, x, y);
    or(
        or(and(m.x.dup(), m.y.dup()), and(inv(m.r.dup()), m.y)),
        and(m.x, inv(m.r)),
    )
}

pub fn is_add_overflow(res: Pure, x: Pure, y: Pure) -> Pure {
    let m = Msbs::of(res, x, y);
    or(
        and(and(inv(m.r.dup()), m.x.dup()), m.y.dup()),
        and(and(m.r, inv(m.x)), inv(m.y)),
    )
}

pub fn is_sub_borrow(res: Pure, x: Pure, y: Pure) -> Pure {
    let m = Msbs::of(res, x, y);
    or(
        or(and(inv(m.x.dup()), m.y.dup()), and(m.y, m.r.dup())),
        and(m.r, inv(m.x)),
    )
}

pub fn is_sub_underflow(res: Pure, x: Pure, y: Pure) -> Pure {
    let m = Msbs::of(res, x, y);
    or(
        and(and(inv(m.r.dup()), m.x.dup()), inv(m.y.dup())),
        and(and(m.r, inv(m.x)), m.y),
    )
}

/// One DIV1 step on the dividend/remainder `rem` and `divisor`.
///
/// Both are read once up front; the new remainder is left in the local
/// `rem` for the caller to write back. Q is replaced by the remainder's
/// msb, the remainder is shifted left with T entering at bit 0, then one
/// of four add/subtract arms runs, picked by the old Q and by M. Each arm
/// folds the unsigned carry/borrow of its operation into Q. T ends as
/// `Q == M`.
pub fn div1_step(rem: Pure, divisor: Pure) -> Effect {
    let arm = |subtract: bool, q_keeps: bool| {
        let (next, moved) = if subtract {
            (
                sub(varl("rem"), varl("divisor")),
                ugt(varl("rem"), varl("tmp0")),
            )
        } else {
            (
                add(varl("rem"), varl("divisor")),
                ult(varl("rem"), varl("tmp0")),
            )
        };
        let (when_q, when_not_q) = if q_keeps {
            (varl("tmp1"), inv(varl("tmp1")))
        } else {
            (inv(varl("tmp1")), varl("tmp1"))
        };
        seq([
            setl("tmp0", varl("rem")),
            setl("rem", next),
            setl("tmp1", moved),
            branch(var(SR_Q), setg(SR_Q, when_q), setg(SR_Q, when_not_q)),
        ])
    };
    let q0m0 = arm(true, false);
    let q0m1 = arm(false, true);
    let q1m0 = arm(false, false);
    let q1m1 = arm(true, true);

    seq([
        setl("old_q", var(SR_Q)),
        setl("divisor", divisor),
        setl("rem", rem),
        setg(SR_Q, msb(varl("rem"))),
        setl(
            "rem",
            logor(shiftl0(varl("rem"), un(REG_SIZE, 1)), flag_bit(SR_T)),
        ),
        branch(
            varl("old_q"),
            branch(var(SR_M), q1m1, q1m0),
            branch(var(SR_M), q0m1, q0m0),
        ),
        setg(SR_T, eq(var(SR_Q), var(SR_M))),
    ])
}

/// Multiply-accumulate form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacForm {
    /// 32 x 32 signed, saturating at 48 bits.
    Long,
    /// 16 x 16 signed, saturating at 32 bits.
    Word,
}

impl MacForm {
    pub fn saturation_bits(self) -> u32 {
        match self {
            MacForm::Long => 48,
            MacForm::Word => 32,
        }
    }
}

/// MAC += n * m over the 64-bit MACH:MACL pair. With S set the sum is cut
/// to the saturation width and sign-extended back.
pub fn mac(form: MacForm, n: Pure, m: Pure) -> Effect {
    let wide = 2 * REG_SIZE;
    let k = form.saturation_bits();
    seq([
        setl(
            "mac",
            logor(
                shiftl0(unsigned(wide, var("mach")), un(wide, REG_SIZE as u64)),
                unsigned(wide, var("macl")),
            ),
        ),
        setl("mac", add(mul(signed(wide, n), signed(wide, m)), varl("mac"))),
        branch(
            var(SR_S),
            setl("mac", signed(wide, unsigned(k, varl("mac")))),
            nop(),
        ),
        setg("macl", unsigned(REG_SIZE, varl("mac"))),
        setg(
            "mach",
            unsigned(REG_SIZE, shiftr0(varl("mac"), un(wide, REG_SIZE as u64))),
        ),
    ])
}
