use shil::decoder::{Mnemonic, Param, ShOp};
use shil::{Bus, LinearMemory, Session, Trap};

/// Just enough of the SH-4 encoding for the programs below.
fn decode(raw: u16) -> Option<ShOp> {
    let n = (raw >> 8) & 0xf;
    let op = match raw {
        0x0009 => ShOp::new(Mnemonic::Nop),
        0x002b => ShOp::new(Mnemonic::Rte),
        0x000b => ShOp::new(Mnemonic::Rts),
        _ if raw >> 12 == 0x7 => ShOp::new(Mnemonic::Add)
            .with(Param::ImmS(raw as u8 as i8 as i32))
            .with(Param::RegDirect(n)),
        _ if raw >> 12 == 0xa => ShOp::new(Mnemonic::Bra).with(Param::Pc12(raw & 0xfff)),
        _ if raw & 0xf0ff == 0x4010 => ShOp::new(Mnemonic::Dt).with(Param::RegDirect(n)),
        _ if raw & 0xff00 == 0x8b00 => ShOp::new(Mnemonic::Bf).with(Param::Pc8(raw & 0xff)),
        0xfffd => ShOp::new(Mnemonic::Unimpl).opcode(raw),
        0xffff => ShOp::new(Mnemonic::Invalid).opcode(raw),
        _ => return None,
    };
    Some(op.opcode(raw))
}

fn load(mem: &mut LinearMemory, words: &[u16]) {
    for (i, w) in words.iter().enumerate() {
        mem.write_u16(2 * i as u32, *w).unwrap();
    }
}

#[test]
fn counted_loop() {
    let mut mem = LinearMemory::new(0x100);
    // r1 = 3; loop: add #2, r2; dt r1; bf loop
    load(&mut mem, &[0x7103, 0x7202, 0x4110, 0x8bfc, 0x0009]);
    let mut s = Session::sh4(false).unwrap();
    s.reset(0);
    while s.pc() != 8 {
        s.step(&mut mem, &decode).unwrap();
    }
    assert_eq!(s.regs().get("r2"), Some(6));
    assert_eq!(s.regs().get("r1"), Some(0));
    assert_eq!(s.regs().get("sr_t"), Some(1));
}

#[test]
fn big_endian_fetch() {
    let mut mem = LinearMemory::new(0x10).big_endian(true);
    mem.write_u16(0, 0x7105).unwrap();
    assert_eq!(&mem.mem[..2], &[0x71, 0x05]);
    let mut s = Session::sh4(true).unwrap();
    s.step(&mut mem, &decode).unwrap();
    assert_eq!(s.regs().get("r1"), Some(5));
}

#[test]
fn negative_immediate_wraps() {
    let mut mem = LinearMemory::new(0x10);
    load(&mut mem, &[0x71ff]);
    let mut s = Session::sh4(false).unwrap();
    s.step(&mut mem, &decode).unwrap();
    assert_eq!(s.regs().get("r1"), Some(0xffff_ffff));
}

#[test]
fn traps() {
    let mut mem = LinearMemory::new(0x10);
    load(&mut mem, &[0x002b, 0x1234, 0xffff, 0xfffd]);
    let mut s = Session::sh4(false).unwrap();

    match s.step(&mut mem, &decode) {
        Err(Trap::Exception { pc: 0, name }) => assert_eq!(name, "SuperH: RESINST"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(s.pc(), 2);
    assert!(matches!(
        s.step(&mut mem, &decode),
        Err(Trap::InvalidInstruction { pc: 2 })
    ));
    s.reset(4);
    assert!(matches!(
        s.step(&mut mem, &decode),
        Err(Trap::InvalidInstruction { pc: 4 })
    ));
    s.reset(6);
    s.step(&mut mem, &decode).unwrap();
    assert_eq!(s.pc(), 8);

    s.reset(0x40);
    assert!(matches!(
        s.step(&mut mem, &decode),
        Err(Trap::Bus { addr: 0x40, .. })
    ));
}

#[test]
fn memory_fault_inside_an_instruction() {
    let mut mem = LinearMemory::new(0x10);
    let mut s = Session::sh4(false).unwrap();
    s.regs_mut().set("r1", 0x1000);
    let op = ShOp::new(Mnemonic::Mov)
        .with(Param::RegIndirect(1))
        .with(Param::RegDirect(2))
        .scaled(shil::Scaling::L);
    assert!(matches!(
        s.execute(&op, &mut mem),
        Err(Trap::Vm(shil::VmError::Bus { addr: 0x1000, .. }))
    ));
    assert_eq!(s.pc(), 0);
}
