//! Selection of the registers exposed as IL variables.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{RegClass, RegItem, RegProfile};
use crate::error::BindingError;

/// One bound register: its name and width in bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterBindingItem {
    pub name: String,
    pub size: u32,
}

/// Ordered, immutable set of bound registers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegisterBinding {
    items: Vec<RegisterBindingItem>,
}

impl RegisterBinding {
    /// Derives the largest set of non-overlapping registers from `profile`.
    ///
    /// Per class: every 1-bit register is bound unless an earlier one sits at
    /// the same offset. Of the others, registers covering a bound flag are
    /// dropped, then registers strictly contained in a larger one. The rest
    /// are walked by offset; a register starting inside the previously kept
    /// one is dropped, and the program counter is never bound. Registers
    /// with identical offset and size keep the first one in profile order.
    pub fn derive(profile: &RegProfile) -> Self {
        let pc = profile.pc.as_deref();
        let mut items = Vec::new();
        for class in RegClass::ALL {
            let regs: Vec<&RegItem> = profile.class_items(class).collect();
            if regs.is_empty() {
                continue;
            }

            let mut flags: Vec<&RegItem> = Vec::new();
            for &reg in regs.iter().filter(|r| r.size == 1) {
                if let Some(first) = flags.iter().find(|f| f.offset == reg.offset) {
                    debug!(reg = %reg.name, shadowed_by = %first.name, "flag shares an offset");
                    continue;
                }
                flags.push(reg);
                items.push(RegisterBindingItem {
                    name: reg.name.clone(),
                    size: 1,
                });
            }

            let nonflags: Vec<&RegItem> = regs
                .iter()
                .copied()
                .filter(|r| r.size != 1)
                .filter(|r| {
                    let covered = flags
                        .iter()
                        .any(|f| f.offset >= r.offset && f.offset < r.end());
                    if covered {
                        debug!(reg = %r.name, "register contains a bound flag");
                    }
                    !covered
                })
                .collect();

            let mut kept: Vec<&RegItem> = nonflags
                .iter()
                .copied()
                .filter(|r| {
                    let outer = nonflags.iter().find(|o| {
                        o.size > r.size && o.offset <= r.offset && o.end() >= r.end()
                    });
                    if let Some(outer) = outer {
                        debug!(reg = %r.name, inside = %outer.name, "register is covered");
                    }
                    outer.is_none()
                })
                .collect();
            kept.sort_by_key(|r| r.offset);

            let mut prev: Option<&RegItem> = None;
            for reg in kept {
                if let Some(p) = prev {
                    if p.end() > reg.offset {
                        debug!(reg = %reg.name, after = %p.name, "partial overlap, dropped");
                        continue;
                    }
                }
                if pc == Some(reg.name.as_str()) {
                    continue;
                }
                items.push(RegisterBindingItem {
                    name: reg.name.clone(),
                    size: reg.size,
                });
                prev = Some(reg);
            }
        }
        debug!(count = items.len(), "derived register binding");
        Self { items }
    }

    /// Binds exactly `names`, in the given order, with sizes from `profile`.
    pub fn exactly<S: AsRef<str>>(profile: &RegProfile, names: &[S]) -> Result<Self, BindingError> {
        let mut items: Vec<RegisterBindingItem> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let reg = profile
                .get(name)
                .ok_or_else(|| BindingError::UnknownRegister(name.to_owned()))?;
            if items.iter().any(|i| i.name == name) {
                return Err(BindingError::DuplicateName(name.to_owned()));
            }
            items.push(RegisterBindingItem {
                name: reg.name.clone(),
                size: reg.size,
            });
        }
        Ok(Self { items })
    }

    pub fn items(&self) -> &[RegisterBindingItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&RegisterBindingItem> {
        self.items.iter().find(|i| i.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn names(rb: &RegisterBinding) -> Vec<&str> {
        rb.items().iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn larger_register_wins_containment() {
        let p = RegProfile::new(
            vec![
                RegItem::new("al", RegClass::Gpr, 0, 8),
                RegItem::new("ax", RegClass::Gpr, 0, 16),
                RegItem::new("eax", RegClass::Gpr, 0, 32),
                RegItem::new("ebx", RegClass::Gpr, 32, 32),
            ],
            None,
        )
        .unwrap();
        assert_eq!(names(&RegisterBinding::derive(&p)), vec!["eax", "ebx"]);
    }

    #[test]
    fn flags_come_first_and_evict_their_container() {
        let p = RegProfile::new(
            vec![
                RegItem::new("r0", RegClass::Gpr, 0, 32),
                RegItem::new("sr", RegClass::Gpr, 32, 32),
                RegItem::new("pc", RegClass::Gpr, 64, 32),
                RegItem::new("t", RegClass::Gpr, 32, 1),
                RegItem::new("t_alias", RegClass::Gpr, 32, 1),
                RegItem::new("s", RegClass::Gpr, 33, 1),
            ],
            Some("pc"),
        )
        .unwrap();
        let rb = RegisterBinding::derive(&p);
        assert_eq!(names(&rb), vec!["t", "s", "r0"]);
        assert_eq!(rb.get("t").map(|i| i.size), Some(1));
    }

    #[test]
    fn partial_overlap_keeps_lower_offset() {
        let p = RegProfile::new(
            vec![
                RegItem::new("hi", RegClass::Gpr, 8, 16),
                RegItem::new("lo", RegClass::Gpr, 0, 16),
                RegItem::new("twin_a", RegClass::Gpr, 32, 8),
                RegItem::new("twin_b", RegClass::Gpr, 32, 8),
            ],
            None,
        )
        .unwrap();
        assert_eq!(names(&RegisterBinding::derive(&p)), vec!["lo", "twin_a"]);
    }

    #[test]
    fn exactly_takes_sizes_from_profile() {
        let p = RegProfile::new(
            vec![
                RegItem::new("a", RegClass::Gpr, 0, 32),
                RegItem::new("b", RegClass::Gpr, 0, 8),
            ],
            None,
        )
        .unwrap();
        let rb = RegisterBinding::exactly(&p, &["b", "a"]).unwrap();
        assert_eq!(
            rb.items(),
            &[
                RegisterBindingItem {
                    name: "b".into(),
                    size: 8
                },
                RegisterBindingItem {
                    name: "a".into(),
                    size: 32
                },
            ]
        );
        assert_eq!(
            RegisterBinding::exactly(&p, &["c"]),
            Err(BindingError::UnknownRegister("c".into()))
        );
        assert_eq!(
            RegisterBinding::exactly(&p, &["a", "a"]),
            Err(BindingError::DuplicateName("a".into()))
        );
    }
}
