mod common;

use common::{power_on, program_rom};
use fami_core::cpu::Interrupt;

#[test]
fn power_on_state_follows_reset_vector() {
    let nes = power_on(&program_rom(&[]));
    assert_eq!(nes.cpu.pc, 0x8000);
    assert_eq!(nes.cpu.sp, 0xFD);
    assert_eq!(nes.cpu.flags, 0x24);
    assert_eq!(nes.cpu.interrupt, Interrupt::None);
}

#[test]
fn loads_set_zero_and_negative_flags() {
    // LDA #$00 ; LDA #$80
    let mut nes = power_on(&program_rom(&[0xA9, 0x00, 0xA9, 0x80]));
    nes.step();
    assert_eq!(nes.cpu.a, 0x00);
    assert_eq!(nes.cpu.flags & 0x02, 0x02);
    nes.step();
    assert_eq!(nes.cpu.a, 0x80);
    assert_eq!(nes.cpu.flags & 0x80, 0x80);
    assert_eq!(nes.cpu.flags & 0x02, 0x00);
}

#[test]
fn base_cycle_counts_match_the_table() {
    // LDA #$01 (2) ; LDA $0000 (4) ; NOP (2) ; INC $10 (5)
    let mut nes = power_on(&program_rom(&[
        0xA9, 0x01, 0xAD, 0x00, 0x00, 0xEA, 0xE6, 0x10,
    ]));
    assert_eq!(nes.step(), 2);
    assert_eq!(nes.step(), 4);
    assert_eq!(nes.step(), 2);
    assert_eq!(nes.step(), 5);
}

#[test]
fn absolute_x_charges_page_cross_penalty() {
    // LDX #$FF ; LDA $8001,X (crosses into $8100) ; LDX #$00 ; LDA $8001,X
    let mut nes = power_on(&program_rom(&[
        0xA2, 0xFF, 0xBD, 0x01, 0x80, 0xA2, 0x00, 0xBD, 0x01, 0x80,
    ]));
    nes.step();
    assert_eq!(nes.step(), 5);
    nes.step();
    assert_eq!(nes.step(), 4);
}

#[test]
fn taken_branch_costs_extra_and_more_across_pages() {
    // $8000: LDA #$01        (Z clear)
    // $8002: BNE +0          (taken, same page: 3 cycles)
    // $8004: JMP $80FD
    // $80FD: BNE +1          (taken, target $8100: 4 cycles)
    let mut prg_program = vec![0xA9, 0x01, 0xD0, 0x00, 0x4C, 0xFD, 0x80];
    prg_program.resize(0xFD, 0xEA);
    prg_program.extend_from_slice(&[0xD0, 0x01]);
    let mut nes = power_on(&program_rom(&prg_program));

    nes.step();
    assert_eq!(nes.step(), 3);
    nes.step(); // JMP
    assert_eq!(nes.cpu.pc, 0x80FD);
    assert_eq!(nes.step(), 4);
    assert_eq!(nes.cpu.pc, 0x8100);
}

#[test]
fn untaken_branch_costs_base_cycles() {
    // LDA #$00 ; BNE +4 (not taken: Z set)
    let mut nes = power_on(&program_rom(&[0xA9, 0x00, 0xD0, 0x04]));
    nes.step();
    assert_eq!(nes.step(), 2);
    assert_eq!(nes.cpu.pc, 0x8004);
}

#[test]
fn jmp_indirect_wraps_pointer_within_page() {
    // JMP ($02FF) with the pointer split across the page-wrap defect: the
    // high byte comes from $0200, not $0300.
    let mut nes = power_on(&program_rom(&[0x6C, 0xFF, 0x02]));
    nes.bus.write_byte(0x02FF, 0x34);
    nes.bus.write_byte(0x0200, 0x12);
    nes.bus.write_byte(0x0300, 0x77);
    nes.step();
    assert_eq!(nes.cpu.pc, 0x1234);
}

#[test]
fn php_pushes_b_bit_set() {
    let mut nes = power_on(&program_rom(&[0x08]));
    nes.step();
    assert_eq!(nes.cpu.sp, 0xFC);
    assert_eq!(nes.bus.read_byte(0x01FD), 0x24 | 0x10);
}

#[test]
fn pla_round_trips_through_the_stack() {
    // LDA #$C3 ; PHA ; LDA #$00 ; PLA
    let mut nes = power_on(&program_rom(&[0xA9, 0xC3, 0x48, 0xA9, 0x00, 0x68]));
    for _ in 0..4 {
        nes.step();
    }
    assert_eq!(nes.cpu.a, 0xC3);
    assert_eq!(nes.cpu.sp, 0xFD);
    assert_eq!(nes.cpu.flags & 0x80, 0x80);
}

#[test]
fn adc_signed_overflow() {
    // LDA #$50 ; ADC #$50 -> $A0: V and N set, C clear
    let mut nes = power_on(&program_rom(&[0xA9, 0x50, 0x69, 0x50]));
    nes.step();
    nes.step();
    assert_eq!(nes.cpu.a, 0xA0);
    assert_eq!(nes.cpu.flags & 0x40, 0x40);
    assert_eq!(nes.cpu.flags & 0x80, 0x80);
    assert_eq!(nes.cpu.flags & 0x01, 0x00);
}

#[test]
fn sbc_borrow_clears_carry() {
    // LDA #$00 ; SEC ; SBC #$01 -> $FF with borrow (C clear)
    let mut nes = power_on(&program_rom(&[0xA9, 0x00, 0x38, 0xE9, 0x01]));
    for _ in 0..3 {
        nes.step();
    }
    assert_eq!(nes.cpu.a, 0xFF);
    assert_eq!(nes.cpu.flags & 0x01, 0x00);
    assert_eq!(nes.cpu.flags & 0x80, 0x80);
}

#[test]
fn ram_is_mirrored_through_1fff() {
    let mut nes = power_on(&program_rom(&[]));
    nes.bus.write_byte(0x0000, 0xAB);
    assert_eq!(nes.bus.read_byte(0x0800), 0xAB);
    assert_eq!(nes.bus.read_byte(0x1000), 0xAB);
    assert_eq!(nes.bus.read_byte(0x1800), 0xAB);
    nes.bus.write_byte(0x1FFF, 0x11);
    assert_eq!(nes.bus.read_byte(0x07FF), 0x11);
}

#[test]
fn oam_dma_copies_a_page_and_stalls_513_on_even_cycle() {
    // LDA #$02 (2 cycles) ; STA $4014 (4 cycles) -> DMA lands on cycle 6.
    let mut nes = power_on(&program_rom(&[0xA9, 0x02, 0x8D, 0x14, 0x40]));
    for i in 0..256u16 {
        nes.bus.write_byte(0x0200 + i, i as u8);
    }
    nes.step();
    nes.step();
    assert_eq!(nes.cpu.stall, 513);
    for i in 0..256usize {
        assert_eq!(nes.bus.ppu.oam[i], i as u8);
    }
    // Stall cycles drain one per step.
    assert_eq!(nes.step(), 1);
    assert_eq!(nes.cpu.stall, 512);
}

#[test]
fn oam_dma_stalls_514_on_odd_cycle() {
    // LDA $00 (3 cycles) ; LDA #$02 (2) ; STA $4014 (4) -> cycle 9, odd.
    let mut nes = power_on(&program_rom(&[0xA5, 0x00, 0xA9, 0x02, 0x8D, 0x14, 0x40]));
    for _ in 0..3 {
        nes.step();
    }
    assert_eq!(nes.cpu.stall, 514);
}

#[test]
fn irq_respects_interrupt_disable() {
    let mut nes = power_on(&program_rom(&[0xEA, 0xEA, 0xEA]));
    // I is set out of reset.
    nes.cpu.trigger_irq();
    assert_eq!(nes.cpu.interrupt, Interrupt::None);

    nes.cpu.flags &= !0x04;
    nes.cpu.trigger_irq();
    assert_eq!(nes.cpu.interrupt, Interrupt::Irq);
}

#[test]
fn nmi_services_through_fffa() {
    // NOP sled at $8000; handler NOP at $9000.
    let mut prg = vec![0u8; 0x4000];
    prg[..4].fill(0xEA);
    prg[0x1000] = 0xEA;
    prg[0x3FFC] = 0x00;
    prg[0x3FFD] = 0x80;
    // NMI vector -> $9000.
    prg[0x3FFA] = 0x00;
    prg[0x3FFB] = 0x90;
    let mut nes = power_on(&common::build_rom(&prg, &[], 0, 0));

    nes.cpu.trigger_nmi();
    let cycles = nes.step();
    // 7 for the interrupt sequence plus the handler's first NOP.
    assert_eq!(cycles, 9);
    assert_eq!(nes.cpu.pc, 0x9001);
    assert_eq!(nes.cpu.flags & 0x04, 0x04);
    // Return address and flags are on the stack.
    assert_eq!(nes.cpu.sp, 0xFA);
    assert_eq!(nes.bus.read_byte(0x01FD), 0x80);
    assert_eq!(nes.bus.read_byte(0x01FC), 0x00);
    // Pushed status has B clear, bit 5 set.
    assert_eq!(nes.bus.read_byte(0x01FB) & 0x30, 0x20);
}
