#![allow(dead_code)]

use fami_core::audio_queue::AudioConsumer;
use fami_core::cartridge::Cartridge;
use fami_core::nes::Nes;

pub const PRG_BANK: usize = 0x4000;
pub const CHR_BANK: usize = 0x2000;

/// Assemble an iNES v1 image in memory. `ctrl1_low` provides the mirroring
/// and battery bits of byte 6; the mapper number lands in both header
/// nibbles.
pub fn build_rom(prg: &[u8], chr: &[u8], mapper: u8, ctrl1_low: u8) -> Vec<u8> {
    assert!(!prg.is_empty() && prg.len() % PRG_BANK == 0);
    assert!(chr.len() % CHR_BANK == 0);

    let mut rom = Vec::with_capacity(16 + prg.len() + chr.len());
    rom.extend_from_slice(b"NES\x1A");
    rom.push((prg.len() / PRG_BANK) as u8);
    rom.push((chr.len() / CHR_BANK) as u8);
    rom.push((mapper << 4) | (ctrl1_low & 0x0F));
    rom.push(mapper & 0xF0);
    rom.extend_from_slice(&[0; 8]);
    rom.extend_from_slice(prg);
    rom.extend_from_slice(chr);
    rom
}

/// One 16 KiB NROM bank with `program` assembled at $8000, the reset vector
/// pointing there, and 8 KiB of CHR-RAM.
pub fn program_rom(program: &[u8]) -> Vec<u8> {
    let mut prg = vec![0u8; PRG_BANK];
    prg[..program.len()].copy_from_slice(program);
    prg[0x3FFC] = 0x00;
    prg[0x3FFD] = 0x80;
    build_rom(&prg, &[], 0, 0)
}

/// PRG-ROM where every 16 KiB bank is filled with its own index, so a single
/// read identifies the mapped bank.
pub fn banked_prg(banks: usize) -> Vec<u8> {
    let mut prg = vec![0u8; banks * PRG_BANK];
    for (b, bank) in prg.chunks_mut(PRG_BANK).enumerate() {
        bank.fill(b as u8);
    }
    prg
}

/// CHR-ROM marked per `granularity`-sized bank.
pub fn banked_chr(len: usize, granularity: usize) -> Vec<u8> {
    let mut chr = vec![0u8; len];
    for (b, bank) in chr.chunks_mut(granularity).enumerate() {
        bank.fill(b as u8);
    }
    chr
}

pub fn power_on(rom: &[u8]) -> Nes {
    let cart = Cartridge::from_bytes(rom).expect("test ROM should parse");
    let (nes, _audio) = Nes::new(cart).expect("test ROM should boot");
    nes
}

pub fn power_on_with_audio(rom: &[u8]) -> (Nes, AudioConsumer) {
    let cart = Cartridge::from_bytes(rom).expect("test ROM should parse");
    Nes::new(cart).expect("test ROM should boot")
}

/// Advance the PPU by one dot without running the CPU.
pub fn tick_ppu(nes: &mut Nes) {
    let Nes { cpu, bus } = nes;
    bus.tick_ppu(cpu);
}
