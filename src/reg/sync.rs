//! Moving register state between the IL interpreter and a register file.
//!
//! Call [`from_physical`] before interpreting an instruction and
//! [`to_physical`] after it.

use tracing::error;

use super::RegisterFile;
use crate::bitvector::BitVector;
use crate::error::SyncError;
use crate::il::vm::{IlVm, Value};

/// Copies the low `width` bits of `src`, zero-filling the rest.
fn fit(src: &BitVector, width: u32) -> BitVector {
    src.zero_extend(width)
}

/// Writes the PC and every bound variable into `regs`.
///
/// Applies every write it can. Returns false when anything needed repair:
/// a missing register or variable, a width mismatch, or no binding at all.
pub fn to_physical(vm: &IlVm, regs: &mut RegisterFile) -> bool {
    let mut perfect = true;
    match regs.profile().pc_item().map(|i| (i.name.clone(), i.size)) {
        Some((name, size)) => {
            perfect &= size == vm.pc().width();
            perfect &= regs.set_bv(&name, &fit(vm.pc(), size));
        }
        None => perfect = false,
    }
    if vm.binding().is_none() {
        return false;
    }
    for (item, var) in vm.bound_vars() {
        let Some(size) = regs.item(&item.name).map(|i| i.size) else {
            perfect = false;
            continue;
        };
        let Some(var) = var else {
            perfect = false;
            regs.set_bv(&item.name, &BitVector::zero(size));
            continue;
        };
        let value = vm.value(var).to_bitv();
        if value.width() != size {
            perfect = false;
        }
        perfect &= regs.set_bv(&item.name, &fit(&value, size));
    }
    perfect
}

/// Loads the PC and every bound variable from `regs`.
///
/// A register missing from the file reads as zero of the bound width. Bound
/// names without an IL variable are a setup error; they are skipped and
/// reported together once everything else is synced.
pub fn from_physical(vm: &mut IlVm, regs: &RegisterFile) -> Result<(), SyncError> {
    if let Some(pc) = regs.profile().pc.as_deref().and_then(|pc| regs.get_bv(pc)) {
        let width = vm.config().pc_bits;
        vm.set_pc(fit(&pc, width));
    }
    if vm.binding().is_none() {
        return Err(SyncError::NoBinding);
    }
    let mut unbound = Vec::new();
    for (item, var) in vm.bound_vars() {
        let Some(var) = var else {
            error!(reg = %item.name, "IL variable does not exist for bound register");
            unbound.push(item.name);
            continue;
        };
        let bits = regs
            .get_bv(&item.name)
            .map(|bv| fit(&bv, item.size))
            .unwrap_or_else(|| BitVector::zero(item.size));
        let value = match vm.value(var) {
            Value::Bool(_) => Value::Bool(bits.lsb()),
            Value::Bitv(_) => Value::Bitv(bits),
        };
        vm.replace_value(var, value);
    }
    if unbound.is_empty() {
        Ok(())
    } else {
        Err(SyncError::UnboundVariables(unbound))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::il::vm::IlConfig;
    use crate::reg::{RegClass, RegItem, RegProfile, RegisterBinding};

    fn profile() -> RegProfile {
        RegProfile::new(
            vec![
                RegItem::new("r0", RegClass::Gpr, 0, 32),
                RegItem::new("r1", RegClass::Gpr, 32, 32),
                RegItem::new("t", RegClass::Gpr, 64, 1),
                RegItem::new("pc", RegClass::Gpr, 96, 32),
            ],
            Some("pc"),
        )
        .unwrap()
    }

    #[test]
    fn round_trip_is_exact() {
        let p = profile();
        let mut regs = RegisterFile::new(p.clone());
        regs.set("r0", 0xdead_beef);
        regs.set("r1", 7);
        regs.set("t", 1);
        regs.set_pc(0x8c00_0010);
        let before = regs.clone();

        let mut vm = IlVm::new(IlConfig::default());
        vm.setup_reg_binding(RegisterBinding::derive(&p)).unwrap();
        from_physical(&mut vm, &regs).unwrap();
        assert_eq!(vm.get("t"), Some(&Value::Bool(true)));
        assert!(to_physical(&vm, &mut regs));
        assert_eq!(regs, before);
    }

    #[test]
    fn width_mismatch_is_repaired_but_imperfect() {
        let p = profile();
        let mut vm = IlVm::new(IlConfig::default());
        vm.add_global("r0", Value::Bitv(BitVector::from_u64(16, 0xabcd)))
            .unwrap();
        vm.add_global("r1", Value::Bitv(BitVector::from_u64(64, 0x1_0000_0002)))
            .unwrap();
        vm.attach_binding(RegisterBinding::exactly(&p, &["r0", "r1", "t"]).unwrap())
            .unwrap();
        let mut regs = RegisterFile::new(p);
        assert!(!to_physical(&vm, &mut regs));
        assert_eq!(regs.get("r0"), Some(0xabcd));
        assert_eq!(regs.get("r1"), Some(2));

        let err = from_physical(&mut vm, &regs).unwrap_err();
        assert_eq!(err, SyncError::UnboundVariables(vec!["t".into()]));
        assert_eq!(vm.get("r0").map(Value::width), Some(32));
    }

    #[test]
    fn missing_physical_register_reads_zero() {
        let p = profile();
        let mut vm = IlVm::new(IlConfig::default());
        vm.add_global("ghost", Value::Bitv(BitVector::from_u64(32, 5)))
            .unwrap();
        let other = RegProfile::new(vec![RegItem::new("ghost", RegClass::Gpr, 0, 32)], None).unwrap();
        vm.attach_binding(RegisterBinding::exactly(&other, &["ghost"]).unwrap())
            .unwrap();
        let mut regs = RegisterFile::new(p);
        from_physical(&mut vm, &regs).unwrap();
        assert_eq!(vm.get("ghost"), Some(&Value::Bitv(BitVector::zero(32))));
        assert!(!to_physical(&vm, &mut regs));
    }

    #[test]
    fn no_binding_is_never_perfect() {
        let vm = IlVm::new(IlConfig::default());
        let mut regs = RegisterFile::new(profile());
        assert!(!to_physical(&vm, &mut regs));
    }
}
