use serde::Serialize;

use crate::decoder::Mnemonic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrClass {
    Data,
    Arithmetic,
    Logic,
    Shift,
    Branch,
    System,
}

impl InstrClass {
    pub fn as_str(self) -> &'static str {
        match self {
            InstrClass::Data => "data",
            InstrClass::Arithmetic => "arithmetic",
            InstrClass::Logic => "logic",
            InstrClass::Shift => "shift",
            InstrClass::Branch => "branch",
            InstrClass::System => "system",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InstrDesc {
    pub mnemonic: Mnemonic,
    pub name: &'static str,
    pub class: InstrClass,
}

macro_rules! table {
    ($($m:ident => $name:literal, $class:ident;)*) => {
        pub const TABLE: &[InstrDesc] = &[
            $(InstrDesc {
                mnemonic: Mnemonic::$m,
                name: $name,
                class: InstrClass::$class,
            },)*
        ];
    };
}

table! {
    Mov => "mov", Data;
    Movt => "movt", Data;
    Movca => "movca.l", Data;
    Swap => "swap", Data;
    Xtrct => "xtrct", Data;
    Add => "add", Arithmetic;
    Addc => "addc", Arithmetic;
    Addv => "addv", Arithmetic;
    CmpEq => "cmp/eq", Arithmetic;
    CmpHs => "cmp/hs", Arithmetic;
    CmpGe => "cmp/ge", Arithmetic;
    CmpHi => "cmp/hi", Arithmetic;
    CmpGt => "cmp/gt", Arithmetic;
    CmpPz => "cmp/pz", Arithmetic;
    CmpPl => "cmp/pl", Arithmetic;
    CmpStr => "cmp/str", Arithmetic;
    Div1 => "div1", Arithmetic;
    Div0s => "div0s", Arithmetic;
    Div0u => "div0u", Arithmetic;
    Dmuls => "dmuls.l", Arithmetic;
    Dmulu => "dmulu.l", Arithmetic;
    Dt => "dt", Arithmetic;
    Exts => "exts", Arithmetic;
    Extu => "extu", Arithmetic;
    Mac => "mac", Arithmetic;
    Mul => "mul.l", Arithmetic;
    Muls => "muls.w", Arithmetic;
    Mulu => "mulu.w", Arithmetic;
    Neg => "neg", Arithmetic;
    Negc => "negc", Arithmetic;
    Sub => "sub", Arithmetic;
    Subc => "subc", Arithmetic;
    Subv => "subv", Arithmetic;
    And => "and", Logic;
    Not => "not", Logic;
    Or => "or", Logic;
    Tas => "tas.b", Logic;
    Tst => "tst", Logic;
    Xor => "xor", Logic;
    Rotl => "rotl", Shift;
    Rotr => "rotr", Shift;
    Rotcl => "rotcl", Shift;
    Rotcr => "rotcr", Shift;
    Shad => "shad", Shift;
    Shal => "shal", Shift;
    Shar => "shar", Shift;
    Shld => "shld", Shift;
    Shll => "shll", Shift;
    Shlr => "shlr", Shift;
    Shll2 => "shll2", Shift;
    Shlr2 => "shlr2", Shift;
    Shll8 => "shll8", Shift;
    Shlr8 => "shlr8", Shift;
    Shll16 => "shll16", Shift;
    Shlr16 => "shlr16", Shift;
    Bf => "bf", Branch;
    Bfs => "bf/s", Branch;
    Bt => "bt", Branch;
    Bts => "bt/s", Branch;
    Bra => "bra", Branch;
    Braf => "braf", Branch;
    Bsr => "bsr", Branch;
    Bsrf => "bsrf", Branch;
    Jmp => "jmp", Branch;
    Jsr => "jsr", Branch;
    Rts => "rts", Branch;
    Clrmac => "clrmac", System;
    Clrs => "clrs", System;
    Clrt => "clrt", System;
    Ldc => "ldc", System;
    Lds => "lds", System;
    Nop => "nop", System;
    Rte => "rte", System;
    Sets => "sets", System;
    Sett => "sett", System;
    Sleep => "sleep", System;
    Stc => "stc", System;
    Sts => "sts", System;
}

/// Table entry for `mnemonic`; `Invalid` and `Unimpl` have none.
pub fn describe(mnemonic: Mnemonic) -> Option<&'static InstrDesc> {
    TABLE.iter().find(|d| d.mnemonic == mnemonic)
}

/// Assembler name, falling back to the debug name of the mnemonic.
pub fn name_of(mnemonic: Mnemonic) -> String {
    describe(mnemonic)
        .map(|d| d.name.to_string())
        .unwrap_or_else(|| format!("{mnemonic:?}").to_lowercase())
}

/// Class column for listings; `-` for mnemonics outside the table.
pub fn class_of(mnemonic: Mnemonic) -> &'static str {
    describe(mnemonic).map_or("-", |d| d.class.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_lifted_mnemonic_is_listed_once() {
        assert_eq!(TABLE.len(), 78);
        for (i, d) in TABLE.iter().enumerate() {
            assert!(
                TABLE[i + 1..].iter().all(|o| o.mnemonic != d.mnemonic),
                "{} listed twice",
                d.name
            );
        }
        assert!(describe(Mnemonic::Invalid).is_none());
        assert_eq!(name_of(Mnemonic::Unimpl), "unimpl");
        assert_eq!(describe(Mnemonic::CmpStr).map(|d| d.class), Some(InstrClass::Arithmetic));
    }

    #[test]
    fn listing_columns() {
        assert_eq!(class_of(Mnemonic::Bsrf), "branch");
        assert_eq!(class_of(Mnemonic::Shld), "shift");
        assert_eq!(class_of(Mnemonic::Invalid), "-");
        assert_eq!(name_of(Mnemonic::Movca), "movca.l");
    }
}
