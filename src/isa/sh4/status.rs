//! SR packing. Each flag is its own IL variable; SR is assembled from them
//! on read and split back into them on write.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::REG_SIZE;
use crate::bitvector::BitVector;
use crate::il::op::*;
use crate::il::{Effect, Pure};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct StatusFlags: u32 {
        const T = 1 << 0;
        /// MAC saturation.
        const S = 1 << 1;
        /// Interrupt mask, tracked as a single "any bit set" flag.
        const I = 1 << 4;
        const Q = 1 << 8;
        const M = 1 << 9;
        /// FPU disable.
        const FD = 1 << 15;
        /// Exception block.
        const BL = 1 << 28;
        /// Register bank select.
        const RB = 1 << 29;
        /// Privileged mode.
        const MD = 1 << 30;
    }
}

/// Mask of SR bits 4..7 that feed the I flag.
const IMASK: u32 = 0xf0;

pub const FLAG_NAMES: [(StatusFlags, &str); 9] = [
    (StatusFlags::T, "sr_t"),
    (StatusFlags::S, "sr_s"),
    (StatusFlags::I, "sr_i"),
    (StatusFlags::Q, "sr_q"),
    (StatusFlags::M, "sr_m"),
    (StatusFlags::FD, "sr_f"),
    (StatusFlags::BL, "sr_b"),
    (StatusFlags::RB, "sr_r"),
    (StatusFlags::MD, "sr_d"),
];

pub const SR_T: &str = "sr_t";
pub const SR_S: &str = "sr_s";
pub const SR_Q: &str = "sr_q";
pub const SR_M: &str = "sr_m";
pub const SR_R: &str = "sr_r";
pub const SR_D: &str = "sr_d";

impl StatusFlags {
    pub fn pack(self) -> BitVector {
        BitVector::from_u64(REG_SIZE, self.bits() as u64)
    }

    pub fn unpack(sr: &BitVector) -> Self {
        let raw = sr.zero_extend(REG_SIZE).to_u64() as u32;
        let mut flags = StatusFlags::from_bits_truncate(raw);
        flags.set(StatusFlags::I, raw & IMASK != 0);
        flags
    }
}

fn flag_mask(flag: StatusFlags) -> u64 {
    if flag == StatusFlags::I {
        IMASK as u64
    } else {
        flag.bits() as u64
    }
}

/// Single flag as a register-sized 0 or 1.
pub fn flag_bit(name: &'static str) -> Pure {
    ite(var(name), un(REG_SIZE, 1), un(REG_SIZE, 0))
}

/// SR assembled from the flag variables.
pub fn get_status_reg() -> Pure {
    FLAG_NAMES
        .iter()
        .fold(un(REG_SIZE, 0), |acc, &(flag, name)| {
            let shift = flag.bits().trailing_zeros() as u64;
            logor(acc, shiftl0(flag_bit(name), un(REG_SIZE, shift)))
        })
}

/// Splits `value` into the flag variables. The value is evaluated once.
pub fn set_status_reg(value: Pure) -> Effect {
    let mut effects = vec![setl("sr_val", value)];
    for (flag, name) in FLAG_NAMES {
        effects.push(setg(
            name,
            non_zero(logand(varl("sr_val"), un(REG_SIZE, flag_mask(flag)))),
        ));
    }
    seq(effects)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupt_mask_collapses_to_one_flag() {
        let f = StatusFlags::unpack(&BitVector::from_u64(32, 0x0000_00a0));
        assert_eq!(f, StatusFlags::I);
        assert_eq!(f.pack().to_u64(), 0x10);
    }

    #[test]
    fn reserved_bits_are_dropped() {
        let f = StatusFlags::unpack(&BitVector::from_u64(32, 0x8000_0301));
        assert_eq!(f, StatusFlags::T | StatusFlags::Q | StatusFlags::M);
    }
}
