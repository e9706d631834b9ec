//! Physical register layouts and storage.
//!
//! A [`RegProfile`] lists register descriptors whose bit ranges may overlap
//! within a class. [`RegisterFile`] stores one bit arena per class, so
//! overlapping descriptors alias the same bits.

use std::collections::{HashMap, HashSet};

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bitvector::BitVector;
use crate::error::ProfileError;

pub mod binding;
pub mod sync;

pub use binding::{RegisterBinding, RegisterBindingItem};

/// Largest bit position a profile item may reach within its class arena.
pub const MAX_PROFILE_BITS: u32 = 1 << 20;

/// Register type class. Offsets are only comparable within one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegClass {
    Gpr,
    Drx,
    Fpu,
    Mmx,
    Xmm,
    Ymm,
    Flg,
    Seg,
    Sys,
    Sec,
    Vc,
    Vcc,
    Ctr,
}

impl RegClass {
    pub const ALL: [RegClass; 13] = [
        RegClass::Gpr,
        RegClass::Drx,
        RegClass::Fpu,
        RegClass::Mmx,
        RegClass::Xmm,
        RegClass::Ymm,
        RegClass::Flg,
        RegClass::Seg,
        RegClass::Sys,
        RegClass::Sec,
        RegClass::Vc,
        RegClass::Vcc,
        RegClass::Ctr,
    ];
}

/// One register descriptor. `offset` and `size` are in bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegItem {
    pub name: String,
    pub offset: u32,
    pub size: u32,
    #[serde(default = "default_class")]
    pub class: RegClass,
}

fn default_class() -> RegClass {
    RegClass::Gpr
}

impl RegItem {
    pub fn new(name: impl Into<String>, class: RegClass, offset: u32, size: u32) -> Self {
        Self {
            name: name.into(),
            offset,
            size,
            class,
        }
    }

    pub fn end(&self) -> u32 {
        self.offset.saturating_add(self.size)
    }

    /// True when the two items share at least one bit of the same class.
    pub fn overlaps(&self, other: &RegItem) -> bool {
        self.class == other.class && self.offset < other.end() && other.offset < self.end()
    }
}

/// Physical register layout plus the name of the program counter alias.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegProfile {
    pub items: Vec<RegItem>,
    #[serde(default)]
    pub pc: Option<String>,
}

impl RegProfile {
    pub fn new(items: Vec<RegItem>, pc: Option<&str>) -> Result<Self, ProfileError> {
        let profile = Self {
            items,
            pc: pc.map(str::to_owned),
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_json(text: &str) -> Result<Self, ProfileError> {
        let profile: RegProfile = serde_json::from_str(text)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        let mut seen = HashSet::new();
        for item in &self.items {
            if item.size == 0 {
                return Err(ProfileError::ZeroWidth(item.name.clone()));
            }
            if item.offset.checked_add(item.size).map_or(true, |end| end > MAX_PROFILE_BITS) {
                return Err(ProfileError::Overlong(item.name.clone()));
            }
            if !seen.insert(item.name.as_str()) {
                return Err(ProfileError::DuplicateName(item.name.clone()));
            }
        }
        if let Some(pc) = &self.pc {
            if !seen.contains(pc.as_str()) {
                return Err(ProfileError::UnknownPc(pc.clone()));
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RegItem> {
        self.items.iter().find(|i| i.name == name)
    }

    pub fn pc_item(&self) -> Option<&RegItem> {
        self.pc.as_deref().and_then(|pc| self.get(pc))
    }

    /// Items of one class in profile order.
    pub fn class_items(&self, class: RegClass) -> impl Iterator<Item = &RegItem> {
        self.items.iter().filter(move |i| i.class == class)
    }
}

/// Register storage laid out by a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    profile: RegProfile,
    arenas: HashMap<RegClass, BitVec<u64, Lsb0>>,
}

impl RegisterFile {
    pub fn new(profile: RegProfile) -> Self {
        let mut arenas: HashMap<RegClass, BitVec<u64, Lsb0>> = HashMap::new();
        for item in &profile.items {
            let arena = arenas.entry(item.class).or_default();
            if arena.len() < item.end() as usize {
                arena.resize(item.end() as usize, false);
            }
        }
        Self { profile, arenas }
    }

    pub fn profile(&self) -> &RegProfile {
        &self.profile
    }

    pub fn item(&self, name: &str) -> Option<&RegItem> {
        self.profile.get(name)
    }

    fn slice(&self, item: &RegItem) -> Option<&BitSlice<u64, Lsb0>> {
        self.arenas
            .get(&item.class)
            .and_then(|a| a.get(item.offset as usize..item.end() as usize))
    }

    pub fn get_bv(&self, name: &str) -> Option<BitVector> {
        let item = self.item(name)?;
        self.slice(item).map(BitVector::from_bits)
    }

    /// Low 64 bits of a register.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.get_bv(name).map(|v| v.to_u64())
    }

    /// Writes `value` into `name`. Fails when the register is unknown or the
    /// width differs from the register size.
    pub fn set_bv(&mut self, name: &str, value: &BitVector) -> bool {
        let Some(item) = self.profile.get(name) else {
            return false;
        };
        if item.size != value.width() {
            return false;
        }
        let range = item.offset as usize..item.end() as usize;
        match self.arenas.get_mut(&item.class).and_then(|a| a.get_mut(range)) {
            Some(bits) => {
                bits.copy_from_bitslice(value.as_bits());
                true
            }
            None => false,
        }
    }

    /// Writes the low bits of `value`, truncated to the register size.
    pub fn set(&mut self, name: &str, value: u64) -> bool {
        match self.item(name).map(|i| i.size) {
            Some(size) => self.set_bv(name, &BitVector::from_u64(size, value)),
            None => false,
        }
    }

    pub fn pc(&self) -> Option<u64> {
        self.profile.pc.as_deref().and_then(|pc| self.get(pc))
    }

    pub fn set_pc(&mut self, value: u64) -> bool {
        match self.profile.pc.clone() {
            Some(pc) => self.set(&pc, value),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> RegProfile {
        RegProfile::new(
            vec![
                RegItem::new("eax", RegClass::Gpr, 0, 32),
                RegItem::new("ax", RegClass::Gpr, 0, 16),
                RegItem::new("ah", RegClass::Gpr, 8, 8),
                RegItem::new("cf", RegClass::Flg, 0, 1),
                RegItem::new("eip", RegClass::Gpr, 32, 32),
            ],
            Some("eip"),
        )
        .unwrap()
    }

    #[test]
    fn overlapping_registers_alias() {
        let mut regs = RegisterFile::new(layout());
        assert!(regs.set("eax", 0x1234_5678));
        assert_eq!(regs.get("ax"), Some(0x5678));
        assert_eq!(regs.get("ah"), Some(0x56));
        assert!(regs.set("ah", 0xff));
        assert_eq!(regs.get("eax"), Some(0x1234_ff78));
        assert_eq!(regs.get("cf"), Some(0));
    }

    #[test]
    fn set_rejects_width_mismatch() {
        let mut regs = RegisterFile::new(layout());
        assert!(!regs.set_bv("ax", &BitVector::from_u64(32, 1)));
        assert!(!regs.set_bv("nope", &BitVector::from_u64(32, 1)));
        assert!(regs.set_pc(0x100));
        assert_eq!(regs.pc(), Some(0x100));
    }

    #[test]
    fn profile_validation() {
        let dup = RegProfile::new(
            vec![
                RegItem::new("a", RegClass::Gpr, 0, 8),
                RegItem::new("a", RegClass::Gpr, 8, 8),
            ],
            None,
        );
        assert!(matches!(dup, Err(ProfileError::DuplicateName(n)) if n == "a"));
        let zero = RegProfile::new(vec![RegItem::new("z", RegClass::Gpr, 0, 0)], None);
        assert!(matches!(zero, Err(ProfileError::ZeroWidth(_))));
        let pc = RegProfile::new(vec![RegItem::new("a", RegClass::Gpr, 0, 8)], Some("pc"));
        assert!(matches!(pc, Err(ProfileError::UnknownPc(_))));
    }

    #[test]
    fn profile_from_json() {
        let p = RegProfile::from_json(
            r#"{"items":[{"name":"r0","offset":0,"size":32},
                         {"name":"t","offset":0,"size":1,"class":"flg"}],
                "pc":"r0"}"#,
        )
        .unwrap();
        assert_eq!(p.items[1].class, RegClass::Flg);
        assert_eq!(p.pc_item().map(|i| i.size), Some(32));
    }

    #[test]
    fn profile_rejects_items_past_the_arena() {
        let wraps = RegProfile::from_json(r#"{"items":[{"name":"x","offset":4294967295,"size":2}]}"#);
        assert!(matches!(wraps, Err(ProfileError::Overlong(n)) if n == "x"));
        let huge = RegProfile::from_json(r#"{"items":[{"name":"y","offset":4000000000,"size":8}]}"#);
        assert!(matches!(huge, Err(ProfileError::Overlong(_))));
        let edge = RegProfile::new(
            vec![RegItem::new("top", RegClass::Gpr, MAX_PROFILE_BITS - 8, 8)],
            None,
        )
        .unwrap();
        assert_eq!(RegisterFile::new(edge).get("top"), Some(0));
    }
}
