//! SuperH-4 integer core.

use crate::il::vm::IlConfig;
use crate::reg::{RegClass, RegItem, RegProfile};

pub mod addressing;
pub mod alu;
pub mod lift;
pub mod status;

pub use lift::{CpuMode, PrivilegeOracle, Sh4Lifter};
pub use status::StatusFlags;

pub const REG_SIZE: u32 = 32;
pub const ADDR_SIZE: u32 = 32;
/// r0..r7 have a second copy selected by SR.MD and SR.RB.
pub const BANKED_REG_COUNT: u16 = 8;

/// Exception raised for privileged instructions executed in user mode.
pub const RESINST: &str = "SuperH: RESINST";

/// Register indices used by operands.
pub mod reg {
    pub const R0: u16 = 0;
    pub const R15: u16 = 15;
    pub const SR: u16 = 16;
    pub const GBR: u16 = 17;
    pub const SSR: u16 = 18;
    pub const SPC: u16 = 19;
    pub const SGR: u16 = 20;
    pub const DBR: u16 = 21;
    pub const VBR: u16 = 22;
    pub const MACH: u16 = 23;
    pub const MACL: u16 = 24;
    pub const PR: u16 = 25;
    /// `R0_BANK`..`R7_BANK`: the bank not selected by SR.RB.
    pub const R0_BANK: u16 = 26;
    pub const R7_BANK: u16 = 33;
    pub const COUNT: u16 = 34;
}

const GPR_NAMES: [&str; 16] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "r13",
    "r14", "r15",
];

const BANK1_NAMES: [&str; 8] = ["r0b", "r1b", "r2b", "r3b", "r4b", "r5b", "r6b", "r7b"];

const CONTROL_NAMES: [&str; 10] = [
    "sr", "gbr", "ssr", "spc", "sgr", "dbr", "vbr", "mach", "macl", "pr",
];

/// Name of the variable behind `idx` for registers that are not banked and
/// not SR.
pub fn reg_name(idx: u16) -> Option<&'static str> {
    match idx {
        0..=15 => Some(GPR_NAMES[idx as usize]),
        reg::SR..=reg::PR => Some(CONTROL_NAMES[(idx - reg::SR) as usize]),
        _ => None,
    }
}

/// Variable of banked register `idx` in `bank` (0 or 1).
pub fn banked_reg_name(idx: u16, bank: u8) -> Option<&'static str> {
    if idx >= BANKED_REG_COUNT {
        return None;
    }
    match bank {
        0 => Some(GPR_NAMES[idx as usize]),
        1 => Some(BANK1_NAMES[idx as usize]),
        _ => None,
    }
}

pub fn is_valid_reg(idx: u16) -> bool {
    idx < reg::COUNT
}

pub fn is_banked(idx: u16) -> bool {
    idx < BANKED_REG_COUNT
}

pub fn il_config(big_endian: bool) -> IlConfig {
    IlConfig {
        pc_bits: ADDR_SIZE,
        big_endian,
        mem_key_bits: ADDR_SIZE,
    }
}

/// Built-in register profile. The SR flags are 1-bit views into `sr`.
pub fn profile() -> RegProfile {
    let names = GPR_NAMES
        .iter()
        .chain(&CONTROL_NAMES)
        .chain(&["pc"])
        .chain(&BANK1_NAMES);
    let mut items: Vec<RegItem> = names
        .zip((0..).step_by(REG_SIZE as usize))
        .map(|(name, offset)| RegItem::new(*name, RegClass::Gpr, offset, REG_SIZE))
        .collect();
    let sr_offset = 16 * REG_SIZE;
    for (flag, name) in status::FLAG_NAMES {
        items.push(RegItem::new(
            name,
            RegClass::Gpr,
            sr_offset + flag.bits().trailing_zeros(),
            1,
        ));
    }
    RegProfile {
        items,
        pc: Some("pc".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reg::RegisterBinding;

    #[test]
    fn profile_is_valid() {
        let p = profile();
        p.validate().unwrap();
        assert_eq!(p.get("sr_t").map(|i| i.offset), p.get("sr").map(|i| i.offset));
        assert_eq!(
            p.get("sr_d").map(|i| i.offset),
            p.get("sr").map(|i| i.offset + 30)
        );
    }

    #[test]
    fn derived_binding_replaces_sr_with_flags() {
        let rb = RegisterBinding::derive(&profile());
        assert!(!rb.contains("sr"));
        assert!(!rb.contains("pc"));
        for (_, name) in status::FLAG_NAMES {
            assert_eq!(rb.get(name).map(|i| i.size), Some(1));
        }
        for name in GPR_NAMES.iter().chain(&BANK1_NAMES) {
            assert!(rb.contains(name), "{name} not bound");
        }
        assert_eq!(rb.len(), 9 + 16 + 9 + 8);
    }

    #[test]
    fn register_names() {
        assert_eq!(reg_name(reg::PR), Some("pr"));
        assert_eq!(reg_name(reg::R0_BANK), None);
        assert_eq!(banked_reg_name(7, 1), Some("r7b"));
        assert_eq!(banked_reg_name(8, 1), None);
        assert!(!is_valid_reg(reg::COUNT));
    }
}
