use std::io;

use crate::CPU_FREQ;
use crate::audio_queue::{AudioConsumer, DEFAULT_CAPACITY, audio_queue};
use crate::bus::Bus;
use crate::cartridge::{Cartridge, RomError};
use crate::cpu::Cpu;
use crate::mapper::Mapper;

/// The console: CPU plus everything on its bus.
///
/// Stepping contract: one CPU step of N cycles is followed by 3N PPU dots
/// and N APU cycles, in that order. The ordering is load-bearing — an OAM
/// DMA stall must be in place before the next opcode, and a PPU NMI must be
/// observable at the next instruction boundary.
pub struct Nes {
    pub cpu: Cpu,
    pub bus: Bus,
}

impl Nes {
    /// Wire a cartridge into a powered-on console. Returns the console and
    /// the consuming end of its audio queue.
    pub fn new(cart: Cartridge) -> Result<(Self, AudioConsumer), RomError> {
        let mapper = Mapper::for_cartridge(&cart)?;
        let (samples, audio) = audio_queue(DEFAULT_CAPACITY);
        let mut bus = Bus::new(cart, mapper, samples);
        let mut cpu = Cpu::new();
        cpu.reset(&mut bus);
        Ok((Self { cpu, bus }, audio))
    }

    /// Run one CPU step and keep the PPU and APU in lockstep. Returns the
    /// CPU cycles consumed.
    pub fn step(&mut self) -> u32 {
        let cpu_cycles = self.cpu.step(&mut self.bus);

        for _ in 0..cpu_cycles * 3 {
            self.bus.tick_ppu(&mut self.cpu);
        }
        for _ in 0..cpu_cycles {
            self.bus.tick_apu(&mut self.cpu);
        }

        cpu_cycles
    }

    /// Advance the console by a wall-clock interval. The driver calls this
    /// once per host frame; the final instruction may overshoot by a few
    /// cycles, which is noise at 1.79 MHz.
    pub fn emulate(&mut self, seconds: f64) {
        let mut budget = (CPU_FREQ * seconds + 0.5) as i64;
        while budget > 0 {
            budget -= self.step() as i64;
        }
    }

    /// Run until the next completed frame is handed off at v_blank.
    pub fn step_frame(&mut self) {
        let frame = self.bus.ppu.frame;
        while self.bus.ppu.frame == frame {
            self.step();
        }
    }

    /// Latch host input for controller 1.
    pub fn set_buttons1(&mut self, state: u8) {
        self.bus.controller1.set_buttons(state);
    }

    /// Latch host input for controller 2.
    pub fn set_buttons2(&mut self, state: u8) {
        self.bus.controller2.set_buttons(state);
    }

    /// The most recently completed 256x240 frame, 0xAARRGGBB per pixel.
    pub fn frame_buffer(&self) -> &[u32] {
        self.bus.ppu.frame_buffer()
    }

    pub fn frame_count(&self) -> u64 {
        self.bus.ppu.frame
    }

    /// Persist battery-backed SRAM, if the board has any.
    pub fn save_sram(&self) -> io::Result<()> {
        self.bus.cart.save_sram()
    }
}
