use crate::il::op::*;
use crate::il::Effect;
use crate::isa::sh4::status::set_status_reg;
use crate::isa::sh4::REG_SIZE;

pub(super) fn clrmac() -> Effect {
    seq([setg("mach", un(REG_SIZE, 0)), setg("macl", un(REG_SIZE, 0))])
}

/// Restores SR from SSR and resumes at SPC.
pub(super) fn rte() -> Effect {
    seq([set_status_reg(var("ssr")), jmp(var("spc"))])
}
