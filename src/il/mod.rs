//! Architecture-neutral intermediate language.
//!
//! Two node kinds: [`Pure`] expressions produce a value without touching
//! state, [`Effect`] nodes mutate state and may sequence sub-effects. Every
//! node owns its children. Referencing one logical value from two positions
//! requires [`Pure::dup`], which yields an independent structural copy.

use std::borrow::Cow;

use crate::bitvector::BitVector;

pub mod display;
pub mod vm;

/// Variable name. Lifters use static names, bindings may supply owned ones.
pub type Name = Cow<'static, str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Var {
    pub scope: Scope,
    pub name: Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    LogAnd,
    LogOr,
    LogXor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ult,
    Ule,
    Ugt,
    Uge,
    Slt,
    Sle,
    Sgt,
    Sge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    /// Toward the msb, zero fill.
    Left,
    /// Toward the lsb, zero fill.
    Right,
    /// Toward the lsb, sign fill.
    RightArith,
}

/// Value-producing, side-effect-free expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pure {
    Bool(bool),
    Bitv(BitVector),
    Var(Var),
    Ite {
        cond: Box<Pure>,
        then: Box<Pure>,
        otherwise: Box<Pure>,
    },
    Inv(Box<Pure>),
    Logic {
        op: BoolOp,
        x: Box<Pure>,
        y: Box<Pure>,
    },
    Msb(Box<Pure>),
    Lsb(Box<Pure>),
    IsZero(Box<Pure>),
    Cmp {
        op: CmpOp,
        x: Box<Pure>,
        y: Box<Pure>,
    },
    Binary {
        op: BinOp,
        x: Box<Pure>,
        y: Box<Pure>,
    },
    Neg(Box<Pure>),
    LogNot(Box<Pure>),
    Shift {
        op: ShiftOp,
        value: Box<Pure>,
        amount: Box<Pure>,
    },
    /// Resize to `width`, sign-extending when `signed`, zero-extending
    /// otherwise. Narrowing keeps the low bits.
    Cast {
        signed: bool,
        width: u32,
        value: Box<Pure>,
    },
    /// Memory read of `bits` bits at `addr`.
    Load {
        bits: u32,
        addr: Box<Pure>,
    },
}

impl Pure {
    /// Structurally identical, independently owned copy.
    pub fn dup(&self) -> Pure {
        self.clone()
    }
}

/// State-mutating operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Nop,
    /// Produced for instructions without semantics; distinct from `Nop` so an
    /// interpreter can tell a real no-op from a missing lifter.
    Empty,
    Set {
        var: Var,
        value: Pure,
    },
    Store {
        addr: Pure,
        value: Pure,
    },
    /// Evaluated strictly left to right.
    Seq(Vec<Effect>),
    Branch {
        cond: Pure,
        then: Box<Effect>,
        otherwise: Box<Effect>,
    },
    Jmp(Pure),
    /// Raise a named exception event in the interpreter.
    Raise(Name),
}

impl Effect {
    pub fn is_empty(&self) -> bool {
        matches!(self, Effect::Empty)
    }
}

/// Outcome of lifting one instruction: either semantics to evaluate, or a
/// named exception to deliver to the interpreter instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lifted {
    Effect(Effect),
    Exception(Name),
}

impl Lifted {
    pub fn effect(&self) -> Option<&Effect> {
        match self {
            Lifted::Effect(e) => Some(e),
            Lifted::Exception(_) => None,
        }
    }
}

impl From<Effect> for Lifted {
    fn from(e: Effect) -> Self {
        Lifted::Effect(e)
    }
}

/// Builder functions, one per node kind.
pub mod op {
    use super::*;

    fn b(p: Pure) -> Box<Pure> {
        Box::new(p)
    }

    pub fn il_true() -> Pure {
        Pure::Bool(true)
    }

    pub fn il_false() -> Pure {
        Pure::Bool(false)
    }

    pub fn bitv(v: BitVector) -> Pure {
        Pure::Bitv(v)
    }

    /// Unsigned constant of `width` bits.
    pub fn un(width: u32, v: u64) -> Pure {
        Pure::Bitv(BitVector::from_u64(width, v))
    }

    /// Signed constant of `width` bits.
    pub fn sn(width: u32, v: i64) -> Pure {
        Pure::Bitv(BitVector::from_i64(width, v))
    }

    pub fn var(name: impl Into<Name>) -> Pure {
        Pure::Var(Var {
            scope: Scope::Global,
            name: name.into(),
        })
    }

    pub fn varl(name: impl Into<Name>) -> Pure {
        Pure::Var(Var {
            scope: Scope::Local,
            name: name.into(),
        })
    }

    pub fn ite(cond: Pure, then: Pure, otherwise: Pure) -> Pure {
        Pure::Ite {
            cond: b(cond),
            then: b(then),
            otherwise: b(otherwise),
        }
    }

    pub fn inv(x: Pure) -> Pure {
        Pure::Inv(b(x))
    }

    pub fn and(x: Pure, y: Pure) -> Pure {
        Pure::Logic {
            op: BoolOp::And,
            x: b(x),
            y: b(y),
        }
    }

    pub fn or(x: Pure, y: Pure) -> Pure {
        Pure::Logic {
            op: BoolOp::Or,
            x: b(x),
            y: b(y),
        }
    }

    pub fn xor(x: Pure, y: Pure) -> Pure {
        Pure::Logic {
            op: BoolOp::Xor,
            x: b(x),
            y: b(y),
        }
    }

    pub fn msb(x: Pure) -> Pure {
        Pure::Msb(b(x))
    }

    pub fn lsb(x: Pure) -> Pure {
        Pure::Lsb(b(x))
    }

    pub fn is_zero(x: Pure) -> Pure {
        Pure::IsZero(b(x))
    }

    pub fn non_zero(x: Pure) -> Pure {
        inv(is_zero(x))
    }

    fn cmp(op: CmpOp, x: Pure, y: Pure) -> Pure {
        Pure::Cmp {
            op,
            x: b(x),
            y: b(y),
        }
    }

    pub fn eq(x: Pure, y: Pure) -> Pure {
        cmp(CmpOp::Eq, x, y)
    }

    pub fn ult(x: Pure, y: Pure) -> Pure {
        cmp(CmpOp::Ult, x, y)
    }

    pub fn ule(x: Pure, y: Pure) -> Pure {
        cmp(CmpOp::Ule, x, y)
    }

    pub fn ugt(x: Pure, y: Pure) -> Pure {
        cmp(CmpOp::Ugt, x, y)
    }

    pub fn uge(x: Pure, y: Pure) -> Pure {
        cmp(CmpOp::Uge, x, y)
    }

    pub fn slt(x: Pure, y: Pure) -> Pure {
        cmp(CmpOp::Slt, x, y)
    }

    pub fn sle(x: Pure, y: Pure) -> Pure {
        cmp(CmpOp::Sle, x, y)
    }

    pub fn sgt(x: Pure, y: Pure) -> Pure {
        cmp(CmpOp::Sgt, x, y)
    }

    pub fn sge(x: Pure, y: Pure) -> Pure {
        cmp(CmpOp::Sge, x, y)
    }

    fn binary(op: BinOp, x: Pure, y: Pure) -> Pure {
        Pure::Binary {
            op,
            x: b(x),
            y: b(y),
        }
    }

    pub fn add(x: Pure, y: Pure) -> Pure {
        binary(BinOp::Add, x, y)
    }

    pub fn sub(x: Pure, y: Pure) -> Pure {
        binary(BinOp::Sub, x, y)
    }

    pub fn mul(x: Pure, y: Pure) -> Pure {
        binary(BinOp::Mul, x, y)
    }

    pub fn logand(x: Pure, y: Pure) -> Pure {
        binary(BinOp::LogAnd, x, y)
    }

    pub fn logor(x: Pure, y: Pure) -> Pure {
        binary(BinOp::LogOr, x, y)
    }

    pub fn logxor(x: Pure, y: Pure) -> Pure {
        binary(BinOp::LogXor, x, y)
    }

    pub fn neg(x: Pure) -> Pure {
        Pure::Neg(b(x))
    }

    pub fn lognot(x: Pure) -> Pure {
        Pure::LogNot(b(x))
    }

    fn shift(op: ShiftOp, value: Pure, amount: Pure) -> Pure {
        Pure::Shift {
            op,
            value: b(value),
            amount: b(amount),
        }
    }

    pub fn shiftl0(value: Pure, amount: Pure) -> Pure {
        shift(ShiftOp::Left, value, amount)
    }

    pub fn shiftr0(value: Pure, amount: Pure) -> Pure {
        shift(ShiftOp::Right, value, amount)
    }

    pub fn shiftra(value: Pure, amount: Pure) -> Pure {
        shift(ShiftOp::RightArith, value, amount)
    }

    pub fn unsigned(width: u32, value: Pure) -> Pure {
        Pure::Cast {
            signed: false,
            width,
            value: b(value),
        }
    }

    pub fn signed(width: u32, value: Pure) -> Pure {
        Pure::Cast {
            signed: true,
            width,
            value: b(value),
        }
    }

    pub fn load(bits: u32, addr: Pure) -> Pure {
        Pure::Load {
            bits,
            addr: b(addr),
        }
    }

    pub fn setg(name: impl Into<Name>, value: Pure) -> Effect {
        Effect::Set {
            var: Var {
                scope: Scope::Global,
                name: name.into(),
            },
            value,
        }
    }

    pub fn setl(name: impl Into<Name>, value: Pure) -> Effect {
        Effect::Set {
            var: Var {
                scope: Scope::Local,
                name: name.into(),
            },
            value,
        }
    }

    pub fn store(addr: Pure, value: Pure) -> Effect {
        Effect::Store { addr, value }
    }

    /// Sequence of effects. Nested sequences are flattened.
    pub fn seq(effects: impl IntoIterator<Item = Effect>) -> Effect {
        let mut out = Vec::new();
        for e in effects {
            match e {
                Effect::Seq(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        Effect::Seq(out)
    }

    pub fn branch(cond: Pure, then: Effect, otherwise: Effect) -> Effect {
        Effect::Branch {
            cond,
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn jmp(addr: Pure) -> Effect {
        Effect::Jmp(addr)
    }

    pub fn nop() -> Effect {
        Effect::Nop
    }

    pub fn empty() -> Effect {
        Effect::Empty
    }

    pub fn raise(name: impl Into<Name>) -> Effect {
        Effect::Raise(name.into())
    }
}

#[cfg(test)]
mod tests {
    use super::op::*;
    use super::*;

    #[test]
    fn dup_yields_equal_independent_tree() {
        let x = add(var("r1"), un(32, 1));
        let y = x.dup();
        assert_eq!(x, y);
        let mut z = y;
        if let Pure::Binary { y: rhs, .. } = &mut z {
            **rhs = un(32, 2);
        }
        assert_ne!(x, z);
    }

    #[test]
    fn seq_flattens_nested_sequences() {
        let e = seq([nop(), seq([setg("r0", un(32, 0)), nop()]), empty()]);
        match e {
            Effect::Seq(items) => assert_eq!(items.len(), 4),
            other => panic!("unexpected {other:?}"),
        }
    }
}
