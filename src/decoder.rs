//! Operand/opcode records handed over by an external SH-4 decoder.

use serde::{Deserialize, Serialize};

/// Closed set of lifted mnemonics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mnemonic {
    Invalid,
    Mov,
    Movt,
    Swap,
    Xtrct,
    Add,
    Addc,
    Addv,
    CmpEq,
    CmpHs,
    CmpGe,
    CmpHi,
    CmpGt,
    CmpPz,
    CmpPl,
    CmpStr,
    Div1,
    Div0s,
    Div0u,
    Dmuls,
    Dmulu,
    Dt,
    Exts,
    Extu,
    Mac,
    Mul,
    Muls,
    Mulu,
    Neg,
    Negc,
    Sub,
    Subc,
    Subv,
    And,
    Not,
    Or,
    Tas,
    Tst,
    Xor,
    Rotl,
    Rotr,
    Rotcl,
    Rotcr,
    Shad,
    Shal,
    Shar,
    Shld,
    Shll,
    Shlr,
    Shll2,
    Shlr2,
    Shll8,
    Shlr8,
    Shll16,
    Shlr16,
    Bf,
    Bfs,
    Bt,
    Bts,
    Bra,
    Braf,
    Bsr,
    Bsrf,
    Jmp,
    Jsr,
    Rts,
    Clrmac,
    Clrs,
    Clrt,
    Ldc,
    Lds,
    Movca,
    Nop,
    Rte,
    Sets,
    Sett,
    Sleep,
    Stc,
    Sts,
    /// Decoded, but no semantics are provided.
    Unimpl,
}

/// Data width of an operand access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scaling {
    #[default]
    Invalid,
    B,
    W,
    L,
}

impl Scaling {
    /// Access size in bytes.
    pub fn size(self) -> Option<u32> {
        match self {
            Scaling::Invalid => None,
            Scaling::B => Some(1),
            Scaling::W => Some(2),
            Scaling::L => Some(4),
        }
    }

    pub fn bits(self) -> Option<u32> {
        self.size().map(|s| s * 8)
    }
}

/// Addressing mode tag of a [`Param`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddrMode {
    RegDirect,
    RegIndirect,
    RegIndirectPostInc,
    RegIndirectPreDec,
    RegIndirectDisp,
    RegIndirectIndexed,
    GbrIndirectDisp,
    GbrIndirectIndexed,
    PcRelativeDisp,
    PcRelative8,
    PcRelative12,
    PcRelativeReg,
    ImmU,
    ImmS,
}

/// One decoded operand. Register fields are indices into the SH-4 register
/// numbering of [`crate::isa::sh4::reg`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    /// `Rn`
    RegDirect(u16),
    /// `@Rn`
    RegIndirect(u16),
    /// `@Rn+`
    PostInc(u16),
    /// `@-Rn`
    PreDec(u16),
    /// `@(disp, Rn)`, displacement in access-size units.
    Disp { reg: u16, disp: u16 },
    /// `@(R0, Rn)`
    Indexed(u16),
    /// `@(disp, GBR)`
    GbrDisp(u16),
    /// `@(R0, GBR)`
    GbrIndexed,
    /// `@(disp, PC)`
    PcDisp(u16),
    /// Raw 8-bit branch displacement in words.
    Pc8(u16),
    /// Raw 12-bit branch displacement in words.
    Pc12(u16),
    /// `Rn + PC`
    PcReg(u16),
    ImmU(u32),
    ImmS(i32),
}

impl Param {
    pub fn mode(&self) -> AddrMode {
        match self {
            Param::RegDirect(_) => AddrMode::RegDirect,
            Param::RegIndirect(_) => AddrMode::RegIndirect,
            Param::PostInc(_) => AddrMode::RegIndirectPostInc,
            Param::PreDec(_) => AddrMode::RegIndirectPreDec,
            Param::Disp { .. } => AddrMode::RegIndirectDisp,
            Param::Indexed(_) => AddrMode::RegIndirectIndexed,
            Param::GbrDisp(_) => AddrMode::GbrIndirectDisp,
            Param::GbrIndexed => AddrMode::GbrIndirectIndexed,
            Param::PcDisp(_) => AddrMode::PcRelativeDisp,
            Param::Pc8(_) => AddrMode::PcRelative8,
            Param::Pc12(_) => AddrMode::PcRelative12,
            Param::PcReg(_) => AddrMode::PcRelativeReg,
            Param::ImmU(_) => AddrMode::ImmU,
            Param::ImmS(_) => AddrMode::ImmS,
        }
    }

    /// Register named by the operand, if any.
    pub fn reg(&self) -> Option<u16> {
        match *self {
            Param::RegDirect(r)
            | Param::RegIndirect(r)
            | Param::PostInc(r)
            | Param::PreDec(r)
            | Param::Indexed(r)
            | Param::PcReg(r) => Some(r),
            Param::Disp { reg, .. } => Some(reg),
            _ => None,
        }
    }
}

/// A decoded instruction. Operands are in assembler order (source first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShOp {
    pub mnemonic: Mnemonic,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub scaling: Scaling,
    #[serde(default)]
    pub opcode: u16,
}

impl ShOp {
    pub fn new(mnemonic: Mnemonic) -> Self {
        Self {
            mnemonic,
            params: Vec::new(),
            scaling: Scaling::Invalid,
            opcode: 0,
        }
    }

    pub fn with(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn scaled(mut self, scaling: Scaling) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn opcode(mut self, opcode: u16) -> Self {
        self.opcode = opcode;
        self
    }
}

/// Contract expected from a decoder: one 16-bit instruction word in, one
/// operand record out.
pub trait Decoder {
    fn decode(&self, raw16: u16) -> Option<ShOp>;
}

impl<F> Decoder for F
where
    F: Fn(u16) -> Option<ShOp>,
{
    fn decode(&self, raw16: u16) -> Option<ShOp> {
        self(raw16)
    }
}
