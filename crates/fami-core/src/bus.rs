use crate::apu::Apu;
use crate::audio_queue::AudioProducer;
use crate::cartridge::Cartridge;
use crate::controller::Controller;
use crate::cpu::Cpu;
use crate::mapper::Mapper;
use crate::ppu::Ppu;

const RAM_LEN: usize = 2048;

/// Everything on the far side of the CPU pins: system RAM, the PPU and APU
/// register files, both joypads and the cartridge. The CPU borrows the bus
/// for every memory operation; the bus in turn borrows the CPU when a
/// component needs to raise an interrupt or stall it.
pub struct Bus {
    ram: [u8; RAM_LEN],
    pub ppu: Ppu,
    pub apu: Apu,
    pub cart: Cartridge,
    pub mapper: Mapper,
    pub controller1: Controller,
    pub controller2: Controller,
}

impl Bus {
    pub fn new(cart: Cartridge, mapper: Mapper, samples: AudioProducer) -> Self {
        Self {
            ram: [0; RAM_LEN],
            ppu: Ppu::new(),
            apu: Apu::new(samples),
            cart,
            mapper,
            controller1: Controller::new(),
            controller2: Controller::new(),
        }
    }

    pub fn read_byte(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            0x2000..=0x3FFF => {
                let Bus {
                    ppu, mapper, cart, ..
                } = self;
                ppu.read_register(mapper, cart, 0x2000 + (addr & 7))
            }
            0x4014 => 0,
            0x4015 => self.apu.read_status(),
            0x4016 => self.controller1.read(),
            0x4017 => self.controller2.read(),
            // $4000-$4013 are write-only; $4020-$5FFF is open bus.
            0x4000..=0x5FFF => 0,
            _ => self.mapper.read(&self.cart, addr),
        }
    }

    pub fn write_byte(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize] = value,
            0x2000..=0x3FFF => {
                let Bus {
                    ppu, mapper, cart, ..
                } = self;
                ppu.write_register(mapper, cart, 0x2000 + (addr & 7), value);
            }
            0x4016 => {
                // One strobe line drives both controllers.
                self.controller1.write(value);
                self.controller2.write(value);
            }
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.write_register(addr, value),
            // $4014 OAM DMA is intercepted on the CPU side; a stray write
            // landing here (no CPU in the loop) has nowhere to DMA from.
            0x4014 => {}
            0x4018..=0x5FFF => {}
            _ => {
                let Bus { mapper, cart, .. } = self;
                mapper.write(cart, addr, value);
            }
        }
    }

    /// One PPU dot, plus the MMC3 scanline-counter hook at dot 280 of every
    /// rendered line (including pre-render).
    pub fn tick_ppu(&mut self, cpu: &mut Cpu) {
        let Bus {
            ppu, mapper, cart, ..
        } = self;
        ppu.tick(mapper, cart, cpu);

        if ppu.cycle == 280
            && (ppu.scanline <= 239 || ppu.scanline == 261)
            && ppu.rendering_enabled()
        {
            mapper.tick_scanline(cpu);
        }
    }

    /// One APU cycle: channel timers on their dividers, then the frame
    /// sequencer and sample emitter. DMC sample fetches go through the full
    /// CPU bus here, charge the CPU a 4-cycle stall each, and raise the
    /// channel's IRQ when a non-looping sample runs out.
    pub fn tick_apu(&mut self, cpu: &mut Cpu) {
        let cycle1 = self.apu.cycle;
        self.apu.cycle += 1;
        let cycle2 = self.apu.cycle;

        if self.apu.cycle & 1 == 0 {
            self.apu.pulse1.clock_timer();
            self.apu.pulse2.clock_timer();
            self.apu.noise.clock_timer();
            if self.apu.dmc.enabled {
                if self.apu.dmc.wants_byte() {
                    cpu.stall += 4;
                    let addr = self.apu.dmc.current_address;
                    let value = self.read_byte(addr);
                    if self.apu.dmc.load_byte(value) {
                        cpu.trigger_irq();
                    }
                }
                self.apu.dmc.clock_shifter();
            }
        }
        self.apu.triangle.clock_timer();

        if self.apu.clock_sequencers(cycle1, cycle2) {
            cpu.trigger_irq();
        }
    }
}
