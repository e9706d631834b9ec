//! Reference interpreter for IL trees.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{BinOp, BoolOp, CmpOp, Effect, Lifted, Pure, Scope, ShiftOp, Var};
use crate::bitvector::BitVector;
use crate::error::VmError;
use crate::memory::Bus;
use crate::reg::{RegisterBinding, RegisterBindingItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Bitv(BitVector),
}

impl Value {
    pub fn as_bool(&self) -> Result<bool, VmError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Bitv(_) => Err(VmError::TypeMismatch { expected: "bool" }),
        }
    }

    pub fn as_bitv(&self) -> Result<&BitVector, VmError> {
        match self {
            Value::Bitv(bv) => Ok(bv),
            Value::Bool(_) => Err(VmError::TypeMismatch {
                expected: "bitvector",
            }),
        }
    }

    /// Bit-vector view. Booleans become one bit wide.
    pub fn to_bitv(&self) -> BitVector {
        match self {
            Value::Bool(b) => BitVector::from_bool(*b),
            Value::Bitv(bv) => bv.clone(),
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            Value::Bool(_) => 1,
            Value::Bitv(bv) => bv.width(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<BitVector> for Value {
    fn from(bv: BitVector) -> Self {
        Value::Bitv(bv)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Bitv(bv) => write!(f, "{bv}"),
        }
    }
}

/// Handle of a global variable, resolved once from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(usize);

/// Per-architecture interpreter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IlConfig {
    pub pc_bits: u32,
    pub big_endian: bool,
    pub mem_key_bits: u32,
}

impl Default for IlConfig {
    fn default() -> Self {
        Self {
            pc_bits: 32,
            big_endian: false,
            mem_key_bits: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Exception(String),
}

#[derive(Debug, Clone)]
struct Global {
    name: String,
    value: Value,
}

#[derive(Debug, Clone)]
pub struct IlVm {
    config: IlConfig,
    pc: BitVector,
    globals: Vec<Global>,
    by_name: HashMap<String, VarId>,
    locals: HashMap<String, Value>,
    events: Vec<Event>,
    binding: Option<RegisterBinding>,
    bound: Vec<Option<VarId>>,
    jumped: bool,
}

impl IlVm {
    pub fn new(config: IlConfig) -> Self {
        Self {
            config,
            pc: BitVector::zero(config.pc_bits),
            globals: Vec::new(),
            by_name: HashMap::new(),
            locals: HashMap::new(),
            events: Vec::new(),
            binding: None,
            bound: Vec::new(),
            jumped: false,
        }
    }

    pub fn config(&self) -> &IlConfig {
        &self.config
    }

    pub fn pc(&self) -> &BitVector {
        &self.pc
    }

    /// Sets the PC, resized to the configured width.
    pub fn set_pc(&mut self, pc: BitVector) {
        self.pc = pc.zero_extend(self.config.pc_bits);
    }

    pub fn add_global(&mut self, name: impl Into<String>, init: Value) -> Result<VarId, VmError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(VmError::DuplicateVariable(name));
        }
        let id = VarId(self.globals.len());
        self.by_name.insert(name.clone(), id);
        self.globals.push(Global { name, value: init });
        Ok(id)
    }

    pub fn var_id(&self, name: &str) -> Option<VarId> {
        self.by_name.get(name).copied()
    }

    pub fn var_name(&self, id: VarId) -> &str {
        &self.globals[id.0].name
    }

    pub fn value(&self, id: VarId) -> &Value {
        &self.globals[id.0].value
    }

    /// Replaces a global. The new value must keep the variable's sort.
    pub fn set_value(&mut self, id: VarId, value: Value) -> Result<(), VmError> {
        let slot = &mut self.globals[id.0].value;
        match (&*slot, &value) {
            (Value::Bool(_), Value::Bool(_)) => {}
            (Value::Bitv(old), Value::Bitv(new)) if old.width() != new.width() => {
                return Err(VmError::WidthMismatch {
                    left: old.width(),
                    right: new.width(),
                });
            }
            (Value::Bitv(_), Value::Bitv(_)) => {}
            (Value::Bool(_), _) => return Err(VmError::TypeMismatch { expected: "bool" }),
            (Value::Bitv(_), _) => {
                return Err(VmError::TypeMismatch {
                    expected: "bitvector",
                })
            }
        }
        *slot = value;
        Ok(())
    }

    /// Rebinds a global without checking its sort.
    pub(crate) fn replace_value(&mut self, id: VarId, value: Value) {
        self.globals[id.0].value = value;
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.var_id(name).map(|id| self.value(id))
    }

    pub fn set(&mut self, name: &str, value: Value) -> Result<(), VmError> {
        let id = self.var_id(name).ok_or_else(|| VmError::UnknownVariable {
            scope: "global",
            name: name.to_owned(),
        })?;
        self.set_value(id, value)
    }

    pub fn globals(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.globals.iter().map(|g| (g.name.as_str(), &g.value))
    }

    /// Creates one global per bound register: 1-bit registers become
    /// booleans, the rest zero bit-vectors of the bound width.
    pub fn setup_reg_binding(&mut self, binding: RegisterBinding) -> Result<(), VmError> {
        if self.binding.is_some() {
            return Err(VmError::BindingAlreadySet);
        }
        let mut bound = Vec::with_capacity(binding.len());
        for item in binding.items() {
            let init = if item.size == 1 {
                Value::Bool(false)
            } else {
                Value::Bitv(BitVector::zero(item.size))
            };
            bound.push(Some(self.add_global(item.name.clone(), init)?));
        }
        self.bound = bound;
        self.binding = Some(binding);
        Ok(())
    }

    /// Adopts a binding over already existing globals. Names without a
    /// variable stay unresolved and are reported by the sync layer.
    pub fn attach_binding(&mut self, binding: RegisterBinding) -> Result<(), VmError> {
        if self.binding.is_some() {
            return Err(VmError::BindingAlreadySet);
        }
        self.bound = binding.items().iter().map(|i| self.var_id(&i.name)).collect();
        self.binding = Some(binding);
        Ok(())
    }

    pub fn binding(&self) -> Option<&RegisterBinding> {
        self.binding.as_ref()
    }

    /// Bound items paired with their resolved variables.
    pub fn bound_vars(&self) -> Vec<(RegisterBindingItem, Option<VarId>)> {
        match &self.binding {
            Some(rb) => rb
                .items()
                .iter()
                .cloned()
                .zip(self.bound.iter().copied())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn raise(&mut self, name: impl Into<String>) {
        let name = name.into();
        trace!(%name, "exception event");
        self.events.push(Event::Exception(name));
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Interprets one lifted instruction. The PC advances by `insn_size`
    /// unless the effect jumped.
    pub fn step<B: Bus + ?Sized>(
        &mut self,
        lifted: &Lifted,
        bus: &mut B,
        insn_size: u32,
    ) -> Result<(), VmError> {
        self.locals.clear();
        self.jumped = false;
        trace!(pc = %self.pc, il = %lifted, "step");
        match lifted {
            Lifted::Effect(e) => self.exec(e, bus)?,
            Lifted::Exception(name) => self.raise(name.to_string()),
        }
        if !self.jumped {
            let size = BitVector::from_u64(self.config.pc_bits, insn_size as u64);
            self.pc = self.pc.add(&size);
        }
        Ok(())
    }

    pub fn exec<B: Bus + ?Sized>(&mut self, effect: &Effect, bus: &mut B) -> Result<(), VmError> {
        match effect {
            Effect::Nop | Effect::Empty => Ok(()),
            Effect::Set { var, value } => {
                let v = self.eval(value, bus)?;
                self.assign(var, v)
            }
            Effect::Store { addr, value } => {
                let addr = self.eval_addr(addr, bus)?;
                let v = self.eval(value, bus)?.to_bitv();
                self.store(bus, addr, &v)
            }
            Effect::Seq(items) => {
                for e in items {
                    self.exec(e, bus)?;
                }
                Ok(())
            }
            Effect::Branch {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond, bus)?.as_bool()? {
                    self.exec(then, bus)
                } else {
                    self.exec(otherwise, bus)
                }
            }
            Effect::Jmp(target) => {
                let target = self.eval(target, bus)?.to_bitv();
                self.set_pc(target);
                self.jumped = true;
                Ok(())
            }
            Effect::Raise(name) => {
                self.raise(name.to_string());
                Ok(())
            }
        }
    }

    fn assign(&mut self, var: &Var, value: Value) -> Result<(), VmError> {
        match var.scope {
            Scope::Global => self.set(&var.name, value),
            Scope::Local => {
                self.locals.insert(var.name.to_string(), value);
                Ok(())
            }
        }
    }

    fn lookup(&self, var: &Var) -> Result<Value, VmError> {
        let found = match var.scope {
            Scope::Global => self.get(&var.name),
            Scope::Local => self.locals.get(&*var.name),
        };
        found.cloned().ok_or_else(|| VmError::UnknownVariable {
            scope: match var.scope {
                Scope::Global => "global",
                Scope::Local => "local",
            },
            name: var.name.to_string(),
        })
    }

    fn bitv_pair<B: Bus + ?Sized>(
        &mut self,
        x: &Pure,
        y: &Pure,
        bus: &mut B,
    ) -> Result<(BitVector, BitVector), VmError> {
        let x = self.eval(x, bus)?.as_bitv()?.clone();
        let y = self.eval(y, bus)?.as_bitv()?.clone();
        if x.width() != y.width() {
            return Err(VmError::WidthMismatch {
                left: x.width(),
                right: y.width(),
            });
        }
        Ok((x, y))
    }

    pub fn eval<B: Bus + ?Sized>(&mut self, pure: &Pure, bus: &mut B) -> Result<Value, VmError> {
        Ok(match pure {
            Pure::Bool(b) => Value::Bool(*b),
            Pure::Bitv(bv) => Value::Bitv(bv.clone()),
            Pure::Var(var) => self.lookup(var)?,
            Pure::Ite {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond, bus)?.as_bool()? {
                    self.eval(then, bus)?
                } else {
                    self.eval(otherwise, bus)?
                }
            }
            Pure::Inv(x) => Value::Bool(!self.eval(x, bus)?.as_bool()?),
            Pure::Logic { op, x, y } => {
                let x = self.eval(x, bus)?.as_bool()?;
                let y = self.eval(y, bus)?.as_bool()?;
                Value::Bool(match op {
                    BoolOp::And => x && y,
                    BoolOp::Or => x || y,
                    BoolOp::Xor => x ^ y,
                })
            }
            Pure::Msb(x) => Value::Bool(self.eval(x, bus)?.as_bitv()?.msb()),
            Pure::Lsb(x) => Value::Bool(self.eval(x, bus)?.as_bitv()?.lsb()),
            Pure::IsZero(x) => Value::Bool(self.eval(x, bus)?.as_bitv()?.is_zero()),
            Pure::Cmp { op, x, y } => {
                if *op == CmpOp::Eq {
                    let a = self.eval(x, bus)?;
                    let b = self.eval(y, bus)?;
                    if a.width() != b.width() {
                        return Err(VmError::WidthMismatch {
                            left: a.width(),
                            right: b.width(),
                        });
                    }
                    return Ok(Value::Bool(a.to_bitv() == b.to_bitv()));
                }
                let (x, y) = self.bitv_pair(x, y, bus)?;
                let (u, s) = (x.ucmp(&y), x.scmp(&y));
                Value::Bool(match op {
                    CmpOp::Eq => u.is_eq(),
                    CmpOp::Ult => u.is_lt(),
                    CmpOp::Ule => u.is_le(),
                    CmpOp::Ugt => u.is_gt(),
                    CmpOp::Uge => u.is_ge(),
                    CmpOp::Slt => s.is_lt(),
                    CmpOp::Sle => s.is_le(),
                    CmpOp::Sgt => s.is_gt(),
                    CmpOp::Sge => s.is_ge(),
                })
            }
            Pure::Binary { op, x, y } => {
                let (x, y) = self.bitv_pair(x, y, bus)?;
                Value::Bitv(match op {
                    BinOp::Add => x.add(&y),
                    BinOp::Sub => x.sub(&y),
                    BinOp::Mul => x.mul(&y),
                    BinOp::LogAnd => x.and(&y),
                    BinOp::LogOr => x.or(&y),
                    BinOp::LogXor => x.xor(&y),
                })
            }
            Pure::Neg(x) => Value::Bitv(self.eval(x, bus)?.as_bitv()?.neg()),
            Pure::LogNot(x) => Value::Bitv(self.eval(x, bus)?.as_bitv()?.not()),
            Pure::Shift { op, value, amount } => {
                let value = self.eval(value, bus)?.as_bitv()?.clone();
                let amount = self.eval(amount, bus)?.to_bitv();
                let amount = amount.to_prim::<u64>().unwrap_or(u64::MAX);
                Value::Bitv(match op {
                    ShiftOp::Left => value.shl(amount),
                    ShiftOp::Right => value.lshr(amount),
                    ShiftOp::RightArith => value.ashr(amount),
                })
            }
            Pure::Cast {
                signed,
                width,
                value,
            } => {
                if *width == 0 {
                    return Err(VmError::ZeroWidth);
                }
                let v = self.eval(value, bus)?.to_bitv();
                Value::Bitv(if *signed {
                    v.sign_extend(*width)
                } else {
                    v.zero_extend(*width)
                })
            }
            Pure::Load { bits, addr } => {
                let addr = self.eval_addr(addr, bus)?;
                Value::Bitv(self.load(bus, addr, *bits)?)
            }
        })
    }

    fn eval_addr<B: Bus + ?Sized>(&mut self, addr: &Pure, bus: &mut B) -> Result<u32, VmError> {
        let addr = self.eval(addr, bus)?.as_bitv()?.clone();
        if addr.width() != self.config.mem_key_bits {
            return Err(VmError::WidthMismatch {
                left: addr.width(),
                right: self.config.mem_key_bits,
            });
        }
        addr.to_prim::<u32>()
            .ok_or_else(|| VmError::AddressOverflow(addr.to_string()))
    }

    fn load<B: Bus + ?Sized>(&self, bus: &mut B, addr: u32, bits: u32) -> Result<BitVector, VmError> {
        if bits == 0 || bits % 8 != 0 {
            return Err(VmError::UnalignedAccess(bits));
        }
        let mut bytes = Vec::with_capacity((bits / 8) as usize);
        for i in 0..bits / 8 {
            let at = addr.wrapping_add(i);
            let b = bus
                .read_u8(at)
                .map_err(|source| VmError::Bus { addr: at, source })?;
            bytes.push(b);
        }
        if self.config.big_endian {
            bytes.reverse();
        }
        Ok(BitVector::from_le_bytes(&bytes))
    }

    fn store<B: Bus + ?Sized>(&self, bus: &mut B, addr: u32, value: &BitVector) -> Result<(), VmError> {
        if value.width() % 8 != 0 {
            return Err(VmError::UnalignedAccess(value.width()));
        }
        let mut bytes = value.to_le_bytes();
        if self.config.big_endian {
            bytes.reverse();
        }
        for (i, b) in bytes.into_iter().enumerate() {
            let at = addr.wrapping_add(i as u32);
            bus.write_u8(at, b)
                .map_err(|source| VmError::Bus { addr: at, source })?;
        }
        Ok(())
    }
}
