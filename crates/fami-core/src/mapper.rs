use crate::cartridge::{Cartridge, Mirroring, RomError};
use crate::cpu::Cpu;

/// Cartridge address-translation unit.
///
/// One variant per supported board family; the bus dispatches every PRG/CHR
/// access through a match, so keep these lean. NROM boards are modelled as
/// UxROM with both banks fixed, exactly as the original hardware degenerates.
pub enum Mapper {
    Uxrom(Uxrom),
    Mmc1(Mmc1),
    Cnrom(Cnrom),
    Mmc3(Mmc3),
    Axrom(Axrom),
}

impl Mapper {
    pub fn for_cartridge(cart: &Cartridge) -> Result<Self, RomError> {
        match cart.mapper_id {
            0 | 2 => Ok(Mapper::Uxrom(Uxrom::new(cart))),
            1 => Ok(Mapper::Mmc1(Mmc1::new(cart))),
            3 => Ok(Mapper::Cnrom(Cnrom::new(cart))),
            4 => Ok(Mapper::Mmc3(Mmc3::new(cart))),
            7 => Ok(Mapper::Axrom(Axrom::new())),
            id => Err(RomError::UnsupportedMapper(id)),
        }
    }

    /// Read from cartridge space: pattern tables at $0000-$1FFF on the PPU
    /// bus, SRAM at $6000-$7FFF and PRG-ROM at $8000-$FFFF on the CPU bus.
    pub fn read(&self, cart: &Cartridge, addr: u16) -> u8 {
        match self {
            Mapper::Uxrom(m) => m.read(cart, addr),
            Mapper::Mmc1(m) => m.read(cart, addr),
            Mapper::Cnrom(m) => m.read(cart, addr),
            Mapper::Mmc3(m) => m.read(cart, addr),
            Mapper::Axrom(m) => m.read(cart, addr),
        }
    }

    /// Write into cartridge space. Writes into the ROM region reconfigure
    /// bank registers; writes below $2000 land in CHR (RAM on most boards
    /// that allow it).
    pub fn write(&mut self, cart: &mut Cartridge, addr: u16, value: u8) {
        match self {
            Mapper::Uxrom(m) => m.write(cart, addr, value),
            Mapper::Mmc1(m) => m.write(cart, addr, value),
            Mapper::Cnrom(m) => m.write(cart, addr, value),
            Mapper::Mmc3(m) => m.write(cart, addr, value),
            Mapper::Axrom(m) => m.write(cart, addr, value),
        }
    }

    /// Scanline hook for the MMC3 IRQ counter; every other board ignores it.
    pub fn tick_scanline(&mut self, cpu: &mut Cpu) {
        if let Mapper::Mmc3(m) = self {
            m.clock_counter(cpu);
        }
    }
}

/// Compute a byte offset into `mem_len` bytes of ROM for a bank index.
/// Indexes ≥ 0x80 are sign-extended from u8 and negative indexes count back
/// from the last bank, so -1 is always the final bank.
fn bank_offset(mem_len: usize, bank_len: usize, index: i64) -> usize {
    let banks = (mem_len / bank_len).max(1) as i64;
    let index = if index >= 0x80 { index - 0x100 } else { index };
    let mut offset = (index % banks) * bank_len as i64;
    if offset < 0 {
        offset += mem_len as i64;
    }
    offset as usize
}

fn read_sram(cart: &Cartridge, addr: u16) -> u8 {
    cart.sram
        .get(addr as usize - 0x6000)
        .copied()
        .unwrap_or(0)
}

fn write_sram(cart: &mut Cartridge, addr: u16, value: u8) {
    if let Some(b) = cart.sram.get_mut(addr as usize - 0x6000) {
        *b = value;
    }
}

/// UxROM (mapper 2): 16 KiB switchable bank at $8000, last bank fixed at
/// $C000. Also covers NROM (mapper 0), whose banks simply never move.
pub struct Uxrom {
    prg_banks: usize,
    bank: usize,
    last: usize,
}

impl Uxrom {
    fn new(cart: &Cartridge) -> Self {
        let prg_banks = (cart.prg.len() / 0x4000).max(1);
        Self {
            prg_banks,
            bank: 0,
            last: prg_banks - 1,
        }
    }

    fn read(&self, cart: &Cartridge, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => cart.chr.get(addr as usize).copied().unwrap_or(0),
            0xC000..=0xFFFF => {
                let index = self.last * 0x4000 + (addr as usize - 0xC000);
                cart.prg.get(index).copied().unwrap_or(0)
            }
            0x8000..=0xBFFF => {
                let index = self.bank * 0x4000 + (addr as usize - 0x8000);
                cart.prg.get(index).copied().unwrap_or(0)
            }
            0x6000..=0x7FFF => read_sram(cart, addr),
            _ => 0,
        }
    }

    fn write(&mut self, cart: &mut Cartridge, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => {
                if let Some(b) = cart.chr.get_mut(addr as usize) {
                    *b = value;
                }
            }
            0x8000..=0xFFFF => self.bank = value as usize % self.prg_banks,
            0x6000..=0x7FFF => write_sram(cart, addr, value),
            _ => {}
        }
    }
}

/// CNROM (mapper 3): fixed PRG like NROM plus an 8 KiB switchable CHR bank.
pub struct Cnrom {
    chr_bank: usize,
    bank: usize,
    last: usize,
}

impl Cnrom {
    fn new(cart: &Cartridge) -> Self {
        let prg_banks = (cart.prg.len() / 0x4000).max(1);
        Self {
            chr_bank: 0,
            bank: 0,
            last: prg_banks - 1,
        }
    }

    fn read(&self, cart: &Cartridge, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => {
                let index = self.chr_bank * 0x2000 + addr as usize;
                cart.chr.get(index).copied().unwrap_or(0)
            }
            0xC000..=0xFFFF => {
                let index = self.last * 0x4000 + (addr as usize - 0xC000);
                cart.prg.get(index).copied().unwrap_or(0)
            }
            0x8000..=0xBFFF => {
                let index = self.bank * 0x4000 + (addr as usize - 0x8000);
                cart.prg.get(index).copied().unwrap_or(0)
            }
            0x6000..=0x7FFF => read_sram(cart, addr),
            _ => 0,
        }
    }

    fn write(&mut self, cart: &mut Cartridge, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => {
                let index = self.chr_bank * 0x2000 + addr as usize;
                if let Some(b) = cart.chr.get_mut(index) {
                    *b = value;
                }
            }
            0x8000..=0xFFFF => self.chr_bank = (value & 3) as usize,
            0x6000..=0x7FFF => write_sram(cart, addr, value),
            _ => {}
        }
    }
}

/// AxROM (mapper 7): one 32 KiB switchable PRG bank, single-screen
/// mirroring selected by bit 4 of the bank register.
pub struct Axrom {
    prg_bank: usize,
}

impl Axrom {
    fn new() -> Self {
        Self { prg_bank: 0 }
    }

    fn read(&self, cart: &Cartridge, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => cart.chr.get(addr as usize).copied().unwrap_or(0),
            0x8000..=0xFFFF => {
                let index = (self.prg_bank << 15) + (addr as usize - 0x8000);
                cart.prg.get(index).copied().unwrap_or(0)
            }
            0x6000..=0x7FFF => read_sram(cart, addr),
            _ => 0,
        }
    }

    fn write(&mut self, cart: &mut Cartridge, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => {
                if let Some(b) = cart.chr.get_mut(addr as usize) {
                    *b = value;
                }
            }
            0x8000..=0xFFFF => {
                self.prg_bank = (value & 7) as usize;
                cart.mirroring = if value & 0x10 == 0 {
                    Mirroring::Single0
                } else {
                    Mirroring::Single1
                };
            }
            0x6000..=0x7FFF => write_sram(cart, addr, value),
            _ => {}
        }
    }
}

/// MMC1 (mapper 1): registers loaded one bit at a time through a 5-write
/// serial port at $8000-$FFFF.
pub struct Mmc1 {
    shift: u8,
    control: u8,
    prg_mode: u8,
    chr_mode: u8,
    prg_bank: u8,
    chr_bank0: u8,
    chr_bank1: u8,
    prg_offsets: [usize; 2],
    chr_offsets: [usize; 2],
}

impl Mmc1 {
    fn new(cart: &Cartridge) -> Self {
        Self {
            shift: 0x10,
            control: 0,
            prg_mode: 0,
            chr_mode: 0,
            prg_bank: 0,
            chr_bank0: 0,
            chr_bank1: 0,
            // Power-on: last bank fixed at $C000.
            prg_offsets: [0, bank_offset(cart.prg.len(), 0x4000, -1)],
            chr_offsets: [0, 0],
        }
    }

    fn read(&self, cart: &Cartridge, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => {
                let bank = (addr >> 12) as usize;
                let offset = (addr & 0x0FFF) as usize;
                cart.chr
                    .get(self.chr_offsets[bank] + offset)
                    .copied()
                    .unwrap_or(0)
            }
            0x8000..=0xFFFF => {
                let rel = addr - 0x8000;
                let bank = (rel >> 14) as usize;
                let offset = (rel & 0x3FFF) as usize;
                cart.prg
                    .get(self.prg_offsets[bank] + offset)
                    .copied()
                    .unwrap_or(0)
            }
            0x6000..=0x7FFF => read_sram(cart, addr),
            _ => 0,
        }
    }

    fn write(&mut self, cart: &mut Cartridge, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => {
                let bank = (addr >> 12) as usize;
                let offset = (addr & 0x0FFF) as usize;
                if let Some(b) = cart.chr.get_mut(self.chr_offsets[bank] + offset) {
                    *b = value;
                }
            }
            0x8000..=0xFFFF => self.load_register(cart, addr, value),
            0x6000..=0x7FFF => write_sram(cart, addr, value),
            _ => {}
        }
    }

    fn load_register(&mut self, cart: &mut Cartridge, addr: u16, value: u8) {
        if value & 0x80 != 0 {
            // Reset: empty the shift register and force PRG mode 3.
            self.shift = 0x10;
            let control = self.control | 0x0C;
            self.write_control(cart, control);
            self.update_offsets(cart);
            return;
        }

        // Bits arrive LSB first; the marker bit reaching position 0 means
        // this write completes a 5-bit value.
        let complete = self.shift & 1 == 1;
        self.shift >>= 1;
        self.shift |= (value & 1) << 4;
        if complete {
            let loaded = self.shift;
            match addr {
                0x8000..=0x9FFF => self.write_control(cart, loaded),
                0xA000..=0xBFFF => self.chr_bank0 = loaded,
                0xC000..=0xDFFF => self.chr_bank1 = loaded,
                _ => self.prg_bank = loaded & 0x0F,
            }
            self.update_offsets(cart);
            self.shift = 0x10;
        }
    }

    fn write_control(&mut self, cart: &mut Cartridge, value: u8) {
        self.control = value;
        self.chr_mode = (value >> 4) & 1;
        self.prg_mode = (value >> 2) & 3;
        cart.mirroring = match value & 3 {
            0 => Mirroring::Single0,
            1 => Mirroring::Single1,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        };
    }

    // PRG mode 0/1: switch 32 KiB at $8000, ignoring the bank number's low bit.
    //          2  : fix the first bank at $8000, switch 16 KiB at $C000.
    //          3  : fix the last bank at $C000, switch 16 KiB at $8000.
    // CHR mode 0  : switch 8 KiB as a pair.
    //          1  : switch two independent 4 KiB banks.
    fn update_offsets(&mut self, cart: &Cartridge) {
        let prg = |index: i64| bank_offset(cart.prg.len(), 0x4000, index);
        let chr = |index: i64| bank_offset(cart.chr.len(), 0x1000, index);

        match self.prg_mode {
            0 | 1 => {
                self.prg_offsets = [
                    prg((self.prg_bank & 0xFE) as i64),
                    prg((self.prg_bank | 0x01) as i64),
                ];
            }
            2 => self.prg_offsets = [0, prg(self.prg_bank as i64)],
            _ => self.prg_offsets = [prg(self.prg_bank as i64), prg(-1)],
        }

        match self.chr_mode {
            0 => {
                self.chr_offsets = [
                    chr((self.chr_bank0 & 0xFE) as i64),
                    chr((self.chr_bank0 | 0x01) as i64),
                ];
            }
            _ => {
                self.chr_offsets = [chr(self.chr_bank0 as i64), chr(self.chr_bank1 as i64)];
            }
        }
    }
}

/// MMC3 (mapper 4): eight 1 KiB CHR banks, four 8 KiB PRG slots and a
/// scanline IRQ counter.
pub struct Mmc3 {
    reg: u8,
    regs: [u8; 8],
    prg_mode: u8,
    chr_mode: u8,
    prg_offsets: [usize; 4],
    chr_offsets: [usize; 8],
    reload: u8,
    counter: u8,
    irq_enabled: bool,
}

impl Mmc3 {
    fn new(cart: &Cartridge) -> Self {
        let prg = |index: i64| bank_offset(cart.prg.len(), 0x2000, index);
        Self {
            reg: 0,
            regs: [0; 8],
            prg_mode: 0,
            chr_mode: 0,
            prg_offsets: [prg(0), prg(1), prg(-2), prg(-1)],
            chr_offsets: [0; 8],
            reload: 0,
            counter: 0,
            irq_enabled: false,
        }
    }

    fn read(&self, cart: &Cartridge, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => {
                let bank = (addr >> 10) as usize;
                let offset = (addr & 0x03FF) as usize;
                cart.chr
                    .get(self.chr_offsets[bank] + offset)
                    .copied()
                    .unwrap_or(0)
            }
            0x8000..=0xFFFF => {
                let rel = addr - 0x8000;
                let bank = (rel >> 13) as usize;
                let offset = (rel & 0x1FFF) as usize;
                cart.prg
                    .get(self.prg_offsets[bank] + offset)
                    .copied()
                    .unwrap_or(0)
            }
            0x6000..=0x7FFF => read_sram(cart, addr),
            _ => 0,
        }
    }

    fn write(&mut self, cart: &mut Cartridge, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => {
                let bank = (addr >> 10) as usize;
                let offset = (addr & 0x03FF) as usize;
                if let Some(b) = cart.chr.get_mut(self.chr_offsets[bank] + offset) {
                    *b = value;
                }
            }
            0x8000..=0xFFFF => self.write_register(cart, addr, value),
            0x6000..=0x7FFF => write_sram(cart, addr, value),
            _ => {}
        }
    }

    fn write_register(&mut self, cart: &mut Cartridge, addr: u16, value: u8) {
        let even = addr & 1 == 0;
        match (addr, even) {
            (0x8000..=0x9FFF, true) => {
                // Bank select.
                self.prg_mode = (value >> 6) & 1;
                self.chr_mode = (value >> 7) & 1;
                self.reg = value & 7;
                self.update_offsets(cart);
            }
            (0x8000..=0x9FFF, false) => {
                // Bank data.
                self.regs[self.reg as usize] = value;
                self.update_offsets(cart);
            }
            (0xA000..=0xBFFF, true) => {
                cart.mirroring = if value & 1 == 0 {
                    Mirroring::Vertical
                } else {
                    Mirroring::Horizontal
                };
            }
            (0xA000..=0xBFFF, false) => {
                // PRG-RAM protect; unimplemented on this board model.
            }
            (0xC000..=0xDFFF, true) => self.reload = value,
            (0xC000..=0xDFFF, false) => self.counter = 0,
            (_, true) => self.irq_enabled = false,
            (_, false) => self.irq_enabled = true,
        }
    }

    fn update_offsets(&mut self, cart: &Cartridge) {
        let prg = |index: i64| bank_offset(cart.prg.len(), 0x2000, index);
        let chr = |index: i64| bank_offset(cart.chr.len(), 0x0400, index);
        let r = &self.regs;

        self.prg_offsets = match self.prg_mode {
            0 => [prg(r[6] as i64), prg(r[7] as i64), prg(-2), prg(-1)],
            _ => [prg(-2), prg(r[7] as i64), prg(r[6] as i64), prg(-1)],
        };

        self.chr_offsets = match self.chr_mode {
            0 => [
                chr((r[0] & 0xFE) as i64),
                chr((r[0] | 0x01) as i64),
                chr((r[1] & 0xFE) as i64),
                chr((r[1] | 0x01) as i64),
                chr(r[2] as i64),
                chr(r[3] as i64),
                chr(r[4] as i64),
                chr(r[5] as i64),
            ],
            _ => [
                chr(r[2] as i64),
                chr(r[3] as i64),
                chr(r[4] as i64),
                chr(r[5] as i64),
                chr((r[0] & 0xFE) as i64),
                chr((r[0] | 0x01) as i64),
                chr((r[1] & 0xFE) as i64),
                chr((r[1] | 0x01) as i64),
            ],
        };
    }

    /// Clocked by the PPU once per rendered scanline (dot 280 while
    /// rendering is enabled, a proxy for the A12 rise).
    fn clock_counter(&mut self, cpu: &mut Cpu) {
        if self.counter == 0 {
            self.counter = self.reload;
        } else {
            self.counter -= 1;
            if self.counter == 0 && self.irq_enabled {
                cpu.trigger_irq();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_offset_wraps_negative_indexes() {
        // 8 banks of 16 KiB.
        let len = 8 * 0x4000;
        assert_eq!(bank_offset(len, 0x4000, 0), 0);
        assert_eq!(bank_offset(len, 0x4000, 3), 3 * 0x4000);
        assert_eq!(bank_offset(len, 0x4000, -1), 7 * 0x4000);
        assert_eq!(bank_offset(len, 0x4000, -2), 6 * 0x4000);
    }

    #[test]
    fn bank_offset_sign_extends_high_indexes() {
        let len = 4 * 0x2000;
        assert_eq!(bank_offset(len, 0x2000, 0xFF), bank_offset(len, 0x2000, -1));
        assert_eq!(bank_offset(len, 0x2000, 0xFE), bank_offset(len, 0x2000, -2));
    }

    #[test]
    fn bank_offset_reduces_modulo_bank_count() {
        let len = 2 * 0x4000;
        assert_eq!(bank_offset(len, 0x4000, 5), 0x4000);
    }
}
