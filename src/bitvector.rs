use std::cmp::Ordering;
use std::fmt;

use bitvec::prelude::*;
use num_traits::{NumCast, PrimInt};

const LIMB_BITS: usize = u64::BITS as usize;

fn limb_count(width: u32) -> usize {
    (width as usize).div_ceil(LIMB_BITS)
}

/// Fixed-width bit-vector value.
///
/// The width is part of the value, not of the type. Whether the bits are read
/// as signed or unsigned is decided by each operation. Binary operations
/// require both operands to have the same width.
///
/// Storage is a `BitVec` over `u64` limbs with index 0 as the least
/// significant bit. Bits past the width in the last limb are kept zero.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitVector {
    bits: BitVec<u64, Lsb0>,
}

impl BitVector {
    /// All-zero vector of `width` bits.
    ///
    /// # Panics
    /// If `width` is 0.
    pub fn zero(width: u32) -> Self {
        Self::from_limbs(width, Vec::new())
    }

    /// All-ones vector of `width` bits.
    pub fn ones(width: u32) -> Self {
        Self::from_limbs(width, vec![u64::MAX; limb_count(width)])
    }

    /// `value` truncated or zero-extended to `width` bits.
    pub fn from_u64(width: u32, value: u64) -> Self {
        Self::from_limbs(width, vec![value])
    }

    /// `value` truncated or sign-extended to `width` bits.
    pub fn from_i64(width: u32, value: i64) -> Self {
        let fill = if value < 0 { u64::MAX } else { 0 };
        let mut limbs = vec![fill; limb_count(width).max(1)];
        limbs[0] = value as u64;
        Self::from_limbs(width, limbs)
    }

    pub fn from_bool(bit: bool) -> Self {
        Self::from_u64(1, bit as u64)
    }

    /// Little-endian byte image; the width is eight times the byte count.
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        let limbs = bytes
            .chunks(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf[..chunk.len()].copy_from_slice(chunk);
                u64::from_le_bytes(buf)
            })
            .collect();
        Self::from_limbs((bytes.len() * 8) as u32, limbs)
    }

    /// Copy of a bit range, bit 0 of `src` becoming the lsb.
    pub fn from_bits(src: &BitSlice<u64, Lsb0>) -> Self {
        let mut bv = Self::zero(src.len() as u32);
        bv.bits.copy_from_bitslice(src);
        bv
    }

    pub fn as_bits(&self) -> &BitSlice<u64, Lsb0> {
        &self.bits
    }

    fn from_limbs(width: u32, mut limbs: Vec<u64>) -> Self {
        assert!(width > 0, "bit-vector width must be at least 1");
        limbs.resize(limb_count(width), 0);
        let mut bits = BitVec::from_vec(limbs);
        bits.truncate(width as usize);
        let mut bv = Self { bits };
        bv.clear_dead_bits();
        bv
    }

    fn clear_dead_bits(&mut self) {
        let live = self.bits.len() % LIMB_BITS;
        if live != 0 {
            if let Some(last) = self.bits.as_raw_mut_slice().last_mut() {
                *last &= (1u64 << live) - 1;
            }
        }
    }

    fn limbs(&self) -> &[u64] {
        self.bits.as_raw_slice()
    }

    pub fn width(&self) -> u32 {
        self.bits.len() as u32
    }

    pub fn bit(&self, index: u32) -> bool {
        self.bits[index as usize]
    }

    pub fn msb(&self) -> bool {
        self.bits[self.bits.len() - 1]
    }

    pub fn lsb(&self) -> bool {
        self.bits[0]
    }

    pub fn is_zero(&self) -> bool {
        self.limbs().iter().all(|&l| l == 0)
    }

    /// Low 64 bits, zero-extended.
    pub fn to_u64(&self) -> u64 {
        self.limbs()[0]
    }

    /// Low 64 bits of the value read as signed.
    pub fn to_i64(&self) -> i64 {
        if self.width() >= 64 {
            self.to_u64() as i64
        } else {
            self.sign_extend(64).to_u64() as i64
        }
    }

    /// Unsigned value as `T`, or `None` when it does not fit.
    pub fn to_prim<T: PrimInt>(&self) -> Option<T> {
        if self.limbs()[1..].iter().any(|&l| l != 0) {
            return None;
        }
        <T as NumCast>::from(self.limbs()[0])
    }

    /// Byte image, least significant byte first. A trailing partial byte is
    /// zero-padded.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let len = (self.bits.len()).div_ceil(8);
        self.limbs()
            .iter()
            .flat_map(|l| l.to_le_bytes())
            .take(len)
            .collect()
    }

    fn expect_same_width(&self, rhs: &Self, op: &str) {
        assert_eq!(
            self.width(),
            rhs.width(),
            "bit-vector width mismatch in {op}"
        );
    }

    fn zip_limbs(&self, rhs: &Self, f: impl Fn(u64, u64) -> u64) -> Self {
        let limbs = self
            .limbs()
            .iter()
            .zip(rhs.limbs())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Self::from_limbs(self.width(), limbs)
    }

    /// Wrapping addition.
    ///
    /// # Panics
    /// If the widths differ.
    pub fn add(&self, rhs: &Self) -> Self {
        self.expect_same_width(rhs, "add");
        let mut carry = false;
        let limbs = self
            .limbs()
            .iter()
            .zip(rhs.limbs())
            .map(|(&a, &b)| {
                let (s, c1) = a.overflowing_add(b);
                let (s, c2) = s.overflowing_add(carry as u64);
                carry = c1 || c2;
                s
            })
            .collect();
        Self::from_limbs(self.width(), limbs)
    }

    /// Wrapping subtraction.
    pub fn sub(&self, rhs: &Self) -> Self {
        self.expect_same_width(rhs, "sub");
        let mut borrow = false;
        let limbs = self
            .limbs()
            .iter()
            .zip(rhs.limbs())
            .map(|(&a, &b)| {
                let (d, b1) = a.overflowing_sub(b);
                let (d, b2) = d.overflowing_sub(borrow as u64);
                borrow = b1 || b2;
                d
            })
            .collect();
        Self::from_limbs(self.width(), limbs)
    }

    /// Wrapping multiplication (low `width` bits of the product).
    pub fn mul(&self, rhs: &Self) -> Self {
        self.expect_same_width(rhs, "mul");
        let (a, b) = (self.limbs(), rhs.limbs());
        let n = a.len();
        let mut out = vec![0u64; n];
        for i in 0..n {
            let mut carry: u128 = 0;
            for j in 0..n - i {
                let cur = out[i + j] as u128 + (a[i] as u128) * (b[j] as u128) + carry;
                out[i + j] = cur as u64;
                carry = cur >> 64;
            }
        }
        Self::from_limbs(self.width(), out)
    }

    pub fn neg(&self) -> Self {
        Self::zero(self.width()).sub(self)
    }

    pub fn and(&self, rhs: &Self) -> Self {
        self.expect_same_width(rhs, "and");
        self.zip_limbs(rhs, |a, b| a & b)
    }

    pub fn or(&self, rhs: &Self) -> Self {
        self.expect_same_width(rhs, "or");
        self.zip_limbs(rhs, |a, b| a | b)
    }

    pub fn xor(&self, rhs: &Self) -> Self {
        self.expect_same_width(rhs, "xor");
        self.zip_limbs(rhs, |a, b| a ^ b)
    }

    pub fn not(&self) -> Self {
        let limbs = self.limbs().iter().map(|&l| !l).collect();
        Self::from_limbs(self.width(), limbs)
    }

    /// Logical shift toward the most significant bit, filling with zeros.
    pub fn shl(&self, amount: u64) -> Self {
        if amount >= self.width() as u64 {
            return Self::zero(self.width());
        }
        let mut out = self.clone();
        // bitvec shifts are index-relative: "right" moves bits away from index 0
        out.bits.shift_right(amount as usize);
        out
    }

    /// Logical shift toward the least significant bit, filling with zeros.
    pub fn lshr(&self, amount: u64) -> Self {
        if amount >= self.width() as u64 {
            return Self::zero(self.width());
        }
        let mut out = self.clone();
        out.bits.shift_left(amount as usize);
        out
    }

    /// Arithmetic shift toward the least significant bit, filling with the
    /// sign bit.
    pub fn ashr(&self, amount: u64) -> Self {
        let msb = self.msb();
        if amount >= self.width() as u64 {
            return if msb {
                Self::ones(self.width())
            } else {
                Self::zero(self.width())
            };
        }
        let mut out = self.lshr(amount);
        let width = out.bits.len();
        out.bits[width - amount as usize..].fill(msb);
        out
    }

    /// Unsigned comparison.
    pub fn ucmp(&self, rhs: &Self) -> Ordering {
        self.expect_same_width(rhs, "ucmp");
        self.limbs().iter().rev().cmp(rhs.limbs().iter().rev())
    }

    /// Two's complement signed comparison.
    pub fn scmp(&self, rhs: &Self) -> Ordering {
        self.expect_same_width(rhs, "scmp");
        match (self.msb(), rhs.msb()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self.ucmp(rhs),
        }
    }

    /// Zero-extends to `width`, or keeps the low `width` bits when narrower.
    pub fn zero_extend(&self, width: u32) -> Self {
        Self::from_limbs(width, self.limbs().to_vec())
    }

    /// Sign-extends to `width`, or keeps the low `width` bits when narrower.
    pub fn sign_extend(&self, width: u32) -> Self {
        assert!(width > 0, "bit-vector width must be at least 1");
        let mut out = self.clone();
        out.bits.resize(width as usize, self.msb());
        out.clear_dead_bits();
        out
    }
}

impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let limbs = self.limbs();
        let top = limbs.iter().rposition(|&l| l != 0).unwrap_or(0);
        write!(f, "{:#x}", limbs[top])?;
        for limb in limbs[..top].iter().rev() {
            write!(f, "{limb:016x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}:{}", self.width())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bv(width: u32, v: u64) -> BitVector {
        BitVector::from_u64(width, v)
    }

    #[test]
    fn construction_masks_to_width() {
        assert_eq!(bv(8, 0x1ff).to_u64(), 0xff);
        assert_eq!(BitVector::from_i64(12, -1).to_u64(), 0xfff);
        assert_eq!(BitVector::ones(70).zero_extend(64).to_u64(), u64::MAX);
        assert_eq!(BitVector::from_i64(8, -2).to_i64(), -2);
    }

    #[test]
    fn wrapping_arithmetic() {
        assert!(bv(32, 0xffff_ffff).add(&bv(32, 1)).is_zero());
        assert_eq!(bv(32, 0).sub(&bv(32, 1)).to_u64(), 0xffff_ffff);
        assert_eq!(bv(16, 0x1234).mul(&bv(16, 0x10)).to_u64(), 0x2340);
        assert_eq!(bv(8, 1).neg().to_u64(), 0xff);
    }

    #[test]
    fn multi_limb_arithmetic_carries_across_limbs() {
        let a = BitVector::from_u64(96, u64::MAX);
        let sum = a.add(&BitVector::from_u64(96, 1));
        assert_eq!(sum.to_u64(), 0);
        assert!(sum.bit(64));
        let wide = BitVector::from_u64(128, u64::MAX).mul(&BitVector::from_u64(128, u64::MAX));
        // (2^64 - 1)^2 = 2^128 - 2^65 + 1
        assert_eq!(wide.to_u64(), 1);
        assert_eq!(wide.lshr(64).to_u64(), u64::MAX - 1);
    }

    #[test]
    fn shifts() {
        assert_eq!(bv(32, 0x8000_0001).shl(1).to_u64(), 2);
        assert_eq!(bv(32, 0x8000_0001).lshr(1).to_u64(), 0x4000_0000);
        assert_eq!(bv(32, 0x8000_0000).ashr(4).to_u64(), 0xf800_0000);
        assert_eq!(bv(32, 0x8000_0000).ashr(40).to_u64(), 0xffff_ffff);
        assert!(bv(32, 0xdead).shl(32).is_zero());
    }

    #[test]
    fn comparisons() {
        let m2 = BitVector::from_i64(32, -2);
        let one = bv(32, 1);
        assert_eq!(m2.scmp(&one), Ordering::Less);
        assert_eq!(m2.ucmp(&one), Ordering::Greater);
        assert_eq!(one.scmp(&one), Ordering::Equal);
    }

    #[test]
    fn extension_and_bits() {
        let b = bv(8, 0x80);
        assert!(b.msb());
        assert!(!b.lsb());
        assert_eq!(b.sign_extend(32).to_u64(), 0xffff_ff80);
        assert_eq!(b.zero_extend(32).to_u64(), 0x80);
        assert_eq!(bv(32, 0x1234_5678).zero_extend(16).to_u64(), 0x5678);
        assert_eq!(BitVector::from_bool(true).sign_extend(4).to_u64(), 0xf);
    }

    #[test]
    fn byte_images() {
        let v = BitVector::from_le_bytes(&[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(v.width(), 32);
        assert_eq!(v.to_u64(), 0x1234_5678);
        assert_eq!(v.to_le_bytes(), vec![0x78, 0x56, 0x34, 0x12]);
        assert_eq!(v.to_prim::<u16>(), None);
        assert_eq!(bv(32, 7).to_prim::<u8>(), Some(7));
    }

    #[test]
    fn formatting() {
        assert_eq!(bv(32, 0xff).to_string(), "0xff");
        assert_eq!(format!("{:?}", bv(8, 3)), "0x3:8");
        let wide = BitVector::from_u64(80, 1).shl(64);
        assert_eq!(wide.to_string(), "0x10000000000000000");
    }
}
