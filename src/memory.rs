use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub trait Bus {
    fn read_u8(&mut self, addr: u32) -> Result<u8>;
    fn read_u16(&mut self, addr: u32) -> Result<u16>;
    fn read_u32(&mut self, addr: u32) -> Result<u32>;
    fn write_u8(&mut self, addr: u32, val: u8) -> Result<()>;
    fn write_u16(&mut self, addr: u32, val: u16) -> Result<()>;
    fn write_u32(&mut self, addr: u32, val: u32) -> Result<()>;
}

/// Flat RAM mapped at `base`. Multi-byte accesses follow `big_endian`.
#[derive(Clone, Serialize, Deserialize)]
pub struct LinearMemory {
    pub mem: Vec<u8>,
    pub base: u32,
    #[serde(default)]
    pub big_endian: bool,
}

impl LinearMemory {
    pub fn new(size: usize) -> Self {
        Self {
            mem: vec![0; size],
            base: 0,
            big_endian: false,
        }
    }

    pub fn with_base(mut self, base: u32) -> Self {
        self.base = base;
        self
    }

    pub fn big_endian(mut self, big_endian: bool) -> Self {
        self.big_endian = big_endian;
        self
    }

    /// Copy `bytes` into memory starting at bus address `addr`.
    pub fn load(&mut self, addr: u32, bytes: &[u8]) -> Result<()> {
        let off = self.offset(addr, bytes.len())?;
        self.mem[off..off + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn offset(&self, addr: u32, len: usize) -> Result<usize> {
        let off = addr
            .checked_sub(self.base)
            .ok_or_else(|| anyhow!("address {addr:#010x} below base {:#010x}", self.base))?
            as usize;
        match off.checked_add(len) {
            Some(end) if end <= self.mem.len() => Ok(off),
            _ => Err(anyhow!(
                "{len}-byte access at {addr:#010x} outside {} bytes of memory",
                self.mem.len()
            )),
        }
    }

    fn read_bytes<const N: usize>(&self, addr: u32) -> Result<[u8; N]> {
        let off = self.offset(addr, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.mem[off..off + N]);
        if self.big_endian {
            out.reverse();
        }
        Ok(out)
    }

    fn write_bytes<const N: usize>(&mut self, addr: u32, mut le: [u8; N]) -> Result<()> {
        let off = self.offset(addr, N)?;
        if self.big_endian {
            le.reverse();
        }
        self.mem[off..off + N].copy_from_slice(&le);
        Ok(())
    }
}

impl Bus for LinearMemory {
    fn read_u8(&mut self, addr: u32) -> Result<u8> {
        Ok(self.read_bytes::<1>(addr)?[0])
    }
    fn read_u16(&mut self, addr: u32) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_bytes(addr)?))
    }
    fn read_u32(&mut self, addr: u32) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_bytes(addr)?))
    }
    fn write_u8(&mut self, addr: u32, val: u8) -> Result<()> {
        self.write_bytes(addr, [val])
    }
    fn write_u16(&mut self, addr: u32, val: u16) -> Result<()> {
        self.write_bytes(addr, val.to_le_bytes())
    }
    fn write_u32(&mut self, addr: u32, val: u32) -> Result<()> {
        self.write_bytes(addr, val.to_le_bytes())
    }
}
