use super::Ctx;
use crate::error::LiftError;
use crate::il::op::*;
use crate::il::Effect;
use crate::isa::sh4::status::SR_T;
use crate::isa::sh4::ADDR_SIZE;

/// BT/BF and their delay-slot forms. The slot itself is not modelled.
pub(super) fn conditional(cx: &Ctx, when: bool) -> Result<Effect, LiftError> {
    let taken = jmp(cx.ea(0)?);
    Ok(if when {
        branch(var(SR_T), taken, nop())
    } else {
        branch(var(SR_T), nop(), taken)
    })
}

/// BRA, BRAF and JMP.
pub(super) fn jump(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(jmp(cx.ea(0)?))
}

/// BSR, BSRF and JSR: PR gets the address after the delay slot.
pub(super) fn call(cx: &Ctx) -> Result<Effect, LiftError> {
    Ok(seq([
        setg("pr", un(ADDR_SIZE, cx.pc.wrapping_add(4))),
        jmp(cx.ea(0)?),
    ]))
}

pub(super) fn rts() -> Effect {
    jmp(var("pr"))
}
