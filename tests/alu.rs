use pretty_assertions::assert_eq;

use shil::decoder::{Mnemonic, Param, Scaling, ShOp};
use shil::il::op::*;
use shil::il::vm::{IlVm, Value};
use shil::isa::sh4::alu::{
    add_carry, add_overflow, is_add_carry, is_add_overflow, is_sub_borrow, is_sub_underflow,
    sub_borrow, sub_underflow,
};
use shil::isa::sh4::status::{get_status_reg, set_status_reg, FLAG_NAMES};
use shil::isa::sh4::{self, StatusFlags};
use shil::{BitVector, LinearMemory, Pure, RegisterBinding, Session};

fn mask(w: u32) -> u128 {
    (1u128 << w) - 1
}

fn boundaries(w: u32) -> Vec<u128> {
    let half = 1u128 << (w - 1);
    let mut v = vec![0, 1, half - 1, half, half + 1, mask(w) - 1, mask(w)];
    v.iter_mut().for_each(|x| *x &= mask(w));
    v.dedup();
    v
}

fn signed(x: u128, w: u32) -> i128 {
    if (x >> (w - 1)) & 1 == 1 {
        x as i128 - (1i128 << w)
    } else {
        x as i128
    }
}

fn msb(x: u128, w: u32) -> bool {
    (x >> (w - 1)) & 1 == 1
}

#[test]
fn carry_and_overflow_match_wide_arithmetic() {
    for w in 1..=64u32 {
        let (min, max) = (-(1i128 << (w - 1)), (1i128 << (w - 1)) - 1);
        for &x in &boundaries(w) {
            for &y in &boundaries(w) {
                for c in 0..=1u128 {
                    let sum = x + y + c;
                    let r = sum & mask(w);
                    let (mx, my, mr) = (msb(x, w), msb(y, w), msb(r, w));
                    assert_eq!(add_carry(mx, my, mr), sum >> w != 0, "w={w} {x}+{y}+{c}");
                    let ssum = signed(x, w) + signed(y, w) + c as i128;
                    assert_eq!(
                        add_overflow(mx, my, mr),
                        ssum < min || ssum > max,
                        "w={w} {x}+{y}+{c}"
                    );

                    let r = x.wrapping_sub(y).wrapping_sub(c) & mask(w);
                    let mr = msb(r, w);
                    assert_eq!(sub_borrow(mx, my, mr), x < y + c, "w={w} {x}-{y}-{c}");
                    let sdiff = signed(x, w) - signed(y, w) - c as i128;
                    assert_eq!(
                        sub_underflow(mx, my, mr),
                        sdiff < min || sdiff > max,
                        "w={w} {x}-{y}-{c}"
                    );
                }
            }
        }
    }
}

#[test]
fn flag_formulas_evaluate_in_the_interpreter() {
    let mut vm = IlVm::new(Default::default());
    let mut mem = LinearMemory::new(0);
    for w in [1u32, 8, 32, 64] {
        for &x in &boundaries(w) {
            for &y in &boundaries(w) {
                let (bx, by) = (
                    BitVector::from_u64(w, x as u64),
                    BitVector::from_u64(w, y as u64),
                );
                let sum = bx.add(&by);
                let diff = bx.sub(&by);
                let eval = |vm: &mut IlVm, mem: &mut LinearMemory, p: Pure| {
                    vm.eval(&p, mem).unwrap().as_bool().unwrap()
                };
                let (px, py) = (bitv(bx.clone()), bitv(by.clone()));
                assert_eq!(
                    eval(&mut vm, &mut mem, is_add_carry(bitv(sum.clone()), px.dup(), py.dup())),
                    add_carry(bx.msb(), by.msb(), sum.msb())
                );
                assert_eq!(
                    eval(&mut vm, &mut mem, is_add_overflow(bitv(sum.clone()), px.dup(), py.dup())),
                    add_overflow(bx.msb(), by.msb(), sum.msb())
                );
                assert_eq!(
                    eval(&mut vm, &mut mem, is_sub_borrow(bitv(diff.clone()), px.dup(), py.dup())),
                    x < y
                );
                assert_eq!(
                    eval(&mut vm, &mut mem, is_sub_underflow(bitv(diff.clone()), px, py)),
                    sub_underflow(bx.msb(), by.msb(), diff.msb())
                );
            }
        }
    }
}

fn flag_vm() -> IlVm {
    let mut vm = IlVm::new(sh4::il_config(false));
    vm.setup_reg_binding(RegisterBinding::derive(&sh4::profile()))
        .unwrap();
    vm
}

#[test]
fn status_register_round_trips_every_flag_combination() {
    let mut vm = flag_vm();
    let mut mem = LinearMemory::new(0);
    for combo in 0u32..512 {
        let mut flags = StatusFlags::empty();
        for (i, (flag, name)) in FLAG_NAMES.iter().enumerate() {
            let on = combo & (1 << i) != 0;
            flags.set(*flag, on);
            vm.set(name, Value::Bool(on)).unwrap();
        }
        let packed = vm.eval(&get_status_reg(), &mut mem).unwrap();
        assert_eq!(packed, Value::Bitv(flags.pack()), "combo {combo:#x}");
        assert_eq!(StatusFlags::unpack(&flags.pack()), flags);

        for (flag, name) in FLAG_NAMES {
            vm.set(name, Value::Bool(!flags.contains(flag))).unwrap();
        }
        vm.exec(&set_status_reg(bitv(flags.pack())), &mut mem).unwrap();
        for (flag, name) in FLAG_NAMES {
            assert_eq!(
                vm.get(name),
                Some(&Value::Bool(flags.contains(flag))),
                "combo {combo:#x} {name}"
            );
        }
    }
}

#[test]
fn interrupt_mask_bits_all_set_the_i_flag() {
    let mut vm = flag_vm();
    let mut mem = LinearMemory::new(0);
    for bit in 4..8 {
        vm.exec(&set_status_reg(un(32, 1 << bit)), &mut mem).unwrap();
        assert_eq!(vm.get("sr_i"), Some(&Value::Bool(true)));
    }
}

/// DIV1 as the programming manual spells it out, one arm per old Q and M.
fn div1_model(rn: u32, rm: u32, q: bool, m: bool, t: bool) -> (u32, bool, bool) {
    let old_q = q;
    let q = rn >> 31 == 1;
    let rn = (rn << 1) | t as u32;
    let sub = |rn: u32| {
        let r = rn.wrapping_sub(rm);
        (r, r > rn)
    };
    let add = |rn: u32| {
        let r = rn.wrapping_add(rm);
        (r, r < rn)
    };
    let (rn, q) = match (old_q, m) {
        (false, false) => {
            let (rn, tmp1) = sub(rn);
            (rn, if q { !tmp1 } else { tmp1 })
        }
        (false, true) => {
            let (rn, tmp1) = add(rn);
            (rn, if q { tmp1 } else { !tmp1 })
        }
        (true, false) => {
            let (rn, tmp1) = add(rn);
            (rn, if q { !tmp1 } else { tmp1 })
        }
        (true, true) => {
            let (rn, tmp1) = sub(rn);
            (rn, if q { tmp1 } else { !tmp1 })
        }
    };
    (rn, q, q == m)
}

fn div1() -> ShOp {
    ShOp::new(Mnemonic::Div1)
        .with(Param::RegDirect(1))
        .with(Param::RegDirect(2))
}

#[test]
fn div1_matches_the_reference_step() {
    let values = [0u32, 1, 7, 0x7fff_ffff, 0x8000_0000, 0x8000_0001, 0xffff_fffe, 0xffff_ffff];
    let mut mem = LinearMemory::new(0);
    for &rn in &values {
        for &rm in &values {
            for bits in 0..8u32 {
                let (q, m, t) = (bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
                let mut s = Session::sh4(false).unwrap();
                let regs = s.regs_mut();
                regs.set("r1", rm as u64);
                regs.set("r2", rn as u64);
                regs.set("sr_q", q as u64);
                regs.set("sr_m", m as u64);
                regs.set("sr_t", t as u64);
                s.execute(&div1(), &mut mem).unwrap();

                let (want_rn, want_q, want_t) = div1_model(rn, rm, q, m, t);
                let got = (
                    s.regs().get("r2").unwrap() as u32,
                    s.regs().get("sr_q") == Some(1),
                    s.regs().get("sr_t") == Some(1),
                );
                assert_eq!(got, (want_rn, want_q, want_t), "rn={rn:#x} rm={rm:#x} q={q} m={m} t={t}");
                assert_eq!(s.regs().get("r1"), Some(rm as u64));
            }
        }
    }
}

#[test]
fn unsigned_32_by_16_division() {
    let mut s = Session::sh4(false).unwrap();
    let mut mem = LinearMemory::new(0);
    s.regs_mut().set("r0", 7);
    s.regs_mut().set("r1", 100_000);
    let reg = |n| Param::RegDirect(n);
    let program = std::iter::once(ShOp::new(Mnemonic::Shll16).with(reg(0)))
        .chain(std::iter::once(ShOp::new(Mnemonic::Div0u)))
        .chain((0..16).map(|_| ShOp::new(Mnemonic::Div1).with(reg(0)).with(reg(1))))
        .chain(std::iter::once(ShOp::new(Mnemonic::Rotcl).with(reg(1))))
        .chain(std::iter::once(
            ShOp::new(Mnemonic::Extu)
                .with(reg(1))
                .with(reg(1))
                .scaled(Scaling::W),
        ));
    for op in program {
        s.execute(&op, &mut mem).unwrap();
    }
    assert_eq!(s.regs().get("r1"), Some(100_000 / 7));
    assert_eq!(s.pc(), 2 * 20);
}

#[test]
fn division_steps_follow_the_manual_trace() {
    let mut s = Session::sh4(false).unwrap();
    let mut mem = LinearMemory::new(0);
    s.regs_mut().set("r0", 7 << 16);
    s.regs_mut().set("r1", 100_000);
    s.regs_mut().set("sr_m", 1);
    s.regs_mut().set("sr_q", 1);
    s.regs_mut().set("sr_t", 1);
    s.execute(&ShOp::new(Mnemonic::Div0u), &mut mem).unwrap();
    assert_eq!(
        (s.regs().get("sr_q"), s.regs().get("sr_m"), s.regs().get("sr_t")),
        (Some(0), Some(0), Some(0))
    );

    // (r1, q, t) after each DIV1 r0, r1
    let trace: [(u32, u64, u64); 16] = [
        (0xfffc_0d40, 1, 0),
        (0xffff_1a80, 1, 0),
        (0x0005_3500, 0, 1),
        (0x0003_6a01, 0, 1),
        (0xffff_d403, 1, 0),
        (0x0006_a806, 0, 1),
        (0x0006_500d, 0, 1),
        (0x0005_a01b, 0, 1),
        (0x0004_4037, 0, 1),
        (0x0001_806f, 0, 1),
        (0xfffc_00df, 1, 0),
        (0xffff_01be, 1, 0),
        (0x0005_037c, 0, 1),
        (0x0003_06f9, 0, 1),
        (0xffff_0df3, 1, 0),
        (0x0005_1be6, 0, 1),
    ];
    let step = ShOp::new(Mnemonic::Div1)
        .with(Param::RegDirect(0))
        .with(Param::RegDirect(1));
    for (i, &(r1, q, t)) in trace.iter().enumerate() {
        s.execute(&step, &mut mem).unwrap();
        let got = (
            s.regs().get("r1").unwrap() as u32,
            s.regs().get("sr_q").unwrap(),
            s.regs().get("sr_t").unwrap(),
        );
        assert_eq!(got, (r1, q, t), "step {}", i + 1);
        assert_eq!(s.regs().get("sr_m"), Some(0));
    }
    s.execute(&ShOp::new(Mnemonic::Rotcl).with(Param::RegDirect(1)), &mut mem)
        .unwrap();
    assert_eq!(s.regs().get("r1").map(|v| v & 0xffff), Some(14285));
}
