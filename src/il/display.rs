use std::fmt;

use super::{BinOp, BoolOp, CmpOp, Effect, Lifted, Pure, Scope, ShiftOp};

fn bin_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::LogAnd => "&",
        BinOp::LogOr => "|",
        BinOp::LogXor => "^",
    }
}

fn bool_symbol(op: BoolOp) -> &'static str {
    match op {
        BoolOp::And => "&&",
        BoolOp::Or => "||",
        BoolOp::Xor => "^^",
    }
}

fn cmp_symbol(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "==",
        CmpOp::Ult => "ult",
        CmpOp::Ule => "ule",
        CmpOp::Ugt => "ugt",
        CmpOp::Uge => "uge",
        CmpOp::Slt => "slt",
        CmpOp::Sle => "sle",
        CmpOp::Sgt => "sgt",
        CmpOp::Sge => "sge",
    }
}

fn shift_symbol(op: ShiftOp) -> &'static str {
    match op {
        ShiftOp::Left => "<<",
        ShiftOp::Right => ">>",
        ShiftOp::RightArith => ">>>",
    }
}

impl fmt::Display for Pure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pure::Bool(v) => write!(f, "{v}"),
            Pure::Bitv(bv) => write!(f, "(bv {} {})", bv.width(), bv),
            Pure::Var(v) => match v.scope {
                Scope::Global => write!(f, "(var {})", v.name),
                Scope::Local => write!(f, "(varl {})", v.name),
            },
            Pure::Ite {
                cond,
                then,
                otherwise,
            } => write!(f, "(ite {cond} {then} {otherwise})"),
            Pure::Inv(x) => write!(f, "(! {x})"),
            Pure::Logic { op, x, y } => write!(f, "({} {x} {y})", bool_symbol(*op)),
            Pure::Msb(x) => write!(f, "(msb {x})"),
            Pure::Lsb(x) => write!(f, "(lsb {x})"),
            Pure::IsZero(x) => write!(f, "(is_zero {x})"),
            Pure::Cmp { op, x, y } => write!(f, "({} {x} {y})", cmp_symbol(*op)),
            Pure::Binary { op, x, y } => write!(f, "({} {x} {y})", bin_symbol(*op)),
            Pure::Neg(x) => write!(f, "(neg {x})"),
            Pure::LogNot(x) => write!(f, "(~ {x})"),
            Pure::Shift { op, value, amount } => {
                write!(f, "({} {value} {amount})", shift_symbol(*op))
            }
            Pure::Cast {
                signed,
                width,
                value,
            } => {
                let kind = if *signed { "signed" } else { "unsigned" };
                write!(f, "({kind} {width} {value})")
            }
            Pure::Load { bits, addr } => write!(f, "(load {bits} {addr})"),
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Nop => f.write_str("nop"),
            Effect::Empty => f.write_str("empty"),
            Effect::Set { var, value } => match var.scope {
                Scope::Global => write!(f, "(set {} {value})", var.name),
                Scope::Local => write!(f, "(setl {} {value})", var.name),
            },
            Effect::Store { addr, value } => write!(f, "(store {addr} {value})"),
            Effect::Seq(items) => {
                f.write_str("(seq")?;
                for e in items {
                    write!(f, " {e}")?;
                }
                f.write_str(")")
            }
            Effect::Branch {
                cond,
                then,
                otherwise,
            } => write!(f, "(branch {cond} {then} {otherwise})"),
            Effect::Jmp(addr) => write!(f, "(jmp {addr})"),
            Effect::Raise(name) => write!(f, "(raise \"{name}\")"),
        }
    }
}

impl fmt::Display for Lifted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifted::Effect(e) => e.fmt(f),
            Lifted::Exception(name) => write!(f, "(exception \"{name}\")"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::il::op::*;

    #[test]
    fn renders_sexpr() {
        let e = seq([
            setg("r1", add(var("r1"), un(32, 1))),
            setl("c", msb(varl("x"))),
            branch(var("sr_t"), jmp(un(32, 0x1000)), nop()),
        ]);
        assert_eq!(
            e.to_string(),
            "(seq (set r1 (+ (var r1) (bv 32 0x1))) (setl c (msb (varl x))) \
             (branch (var sr_t) (jmp (bv 32 0x1000)) nop))"
        );
    }
}
