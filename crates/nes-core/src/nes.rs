//! Top-level console driver.
//!
//! One console tick = three PPU dots (consuming any NMI edge after each),
//! then one CPU cycle — or one halt cycle when the APU reports pending
//! stall cycles from a DMC fetch or OAM DMA — then one APU cycle. After
//! the APU cycle the CPU's IRQ line is refreshed from the APU's pending
//! IRQs.

use emu_core::{AudioConfig, Machine, Tickable, VideoConfig};
use ricoh_2a03::Cpu;

use crate::apu::SAMPLE_RATE;
use crate::bus::NesBus;
use crate::cartridge::Cartridge;
use crate::input::InputQueue;
use crate::ppu::{FB_HEIGHT, FB_WIDTH};

/// PPU dots per CPU cycle.
const PPU_PER_CPU: u32 = 3;

/// The console: CPU plus the bus that owns everything else.
pub struct Nes {
    cpu: Cpu,
    bus: NesBus,
    /// Completed frame counter for the timed input queue.
    frame: u64,
    input_queue: InputQueue,
}

impl Nes {
    /// A console with no cartridge inserted. It will not produce anything
    /// useful until `insert_cartridge` succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            bus: NesBus::new(),
            frame: 0,
            input_queue: InputQueue::new(),
        }
    }

    /// Parse an iNES image and boot it.
    ///
    /// # Errors
    ///
    /// Propagates cartridge parse errors; the console state is untouched
    /// on failure.
    pub fn insert_cartridge(&mut self, rom: &[u8]) -> Result<(), String> {
        let cartridge = Cartridge::from_ines(rom)?;
        self.bus.cartridge = Some(cartridge);
        self.reset();
        Ok(())
    }

    /// Remove the cartridge. The console refuses to run without one, so
    /// the caller is expected to stop clocking.
    pub fn remove_cartridge(&mut self) {
        self.bus.cartridge = None;
    }

    /// True while a cartridge is inserted.
    #[must_use]
    pub fn cartridge_inserted(&self) -> bool {
        self.bus.cartridge.is_some()
    }

    /// Console reset: the cartridge survives, the PPU clears its
    /// nametables, and the CPU re-vectors.
    pub fn reset(&mut self) {
        if let Some(cart) = self.bus.cartridge.as_mut() {
            cart.reset();
        }
        self.bus.ppu.reset();
        self.bus.apu.reset();
        self.cpu.reset(&mut self.bus);
    }

    /// One console tick.
    pub fn clock(&mut self) {
        for _ in 0..PPU_PER_CPU {
            self.bus.tick_ppu();
            if self.bus.ppu.take_nmi() {
                self.cpu.nmi();
            }
        }

        if self.bus.apu.take_stall_cycle() {
            self.cpu.halt_cycle(&mut self.bus);
        } else {
            self.cpu.clock(&mut self.bus);
        }

        // An OAM DMA triggered during this CPU cycle charges its suspend
        // through the APU stall channel: 513 cycles, plus one on odd CPU
        // cycles.
        if let Some(stall) = self.bus.take_dma_stall() {
            let parity = (self.cpu.cycles() & 1) as u32;
            self.bus.apu.add_stall(stall + parity);
        }

        self.bus.clock_apu();
        self.cpu.set_irq_line(self.bus.apu.irq_pending());
    }

    /// Drain pending PCM into `out`; at most 4096 samples per call.
    pub fn drain_audio(&mut self, out: &mut [f32]) -> usize {
        self.bus.apu.drain(out)
    }

    #[must_use]
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &NesBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut NesBus {
        &mut self.bus
    }

    /// RGBA framebuffer bytes.
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        self.bus.ppu.framebuffer()
    }

    /// Completed frame count.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Timed input queue (frame-stamped button events).
    pub fn input_queue(&mut self) -> &mut InputQueue {
        &mut self.input_queue
    }
}

impl Default for Nes {
    fn default() -> Self {
        Self::new()
    }
}

impl Tickable for Nes {
    fn tick(&mut self) {
        self.clock();
    }
}

impl Machine for Nes {
    fn video_config(&self) -> VideoConfig {
        VideoConfig {
            width: FB_WIDTH as u32,
            height: FB_HEIGHT as u32,
        }
    }

    fn audio_config(&self) -> AudioConfig {
        AudioConfig {
            sample_rate: SAMPLE_RATE,
            samples_per_frame: (SAMPLE_RATE / 60) as usize,
        }
    }

    fn run_frame(&mut self) {
        let Self {
            bus,
            input_queue,
            frame,
            ..
        } = self;
        if let Some(controller) = bus.controller_mut(0) {
            input_queue.process(*frame, controller);
        }
        self.frame += 1;

        let target = self.bus.ppu.frame_count() + 1;
        while self.bus.ppu.frame_count() < target {
            self.clock();
        }
    }

    fn render(&self, frame: &mut [u8]) {
        let fb = self.bus.ppu.framebuffer();
        frame[..fb.len()].copy_from_slice(fb);
    }

    fn drain_audio(&mut self, out: &mut [f32]) -> usize {
        self.bus.apu.drain(out)
    }

    fn set_controller(&mut self, player: usize, buttons: u8) {
        self.bus.set_controller(player, buttons);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nop_rom() -> Vec<u8> {
        // 32 KiB of NOPs with the reset vector at $8000.
        let mut data = vec![0u8; 16 + 32 * 1024 + 8 * 1024];
        data[0..4].copy_from_slice(b"NES\x1a");
        data[4] = 2;
        data[5] = 1;
        for i in 0..32 * 1024 {
            data[16 + i] = 0xEA;
        }
        data[16 + 0x7FFC] = 0x00;
        data[16 + 0x7FFD] = 0x80;
        data
    }

    #[test]
    fn insert_rejects_garbage() {
        let mut nes = Nes::new();
        assert!(nes.insert_cartridge(&[0u8; 40]).is_err());
        assert!(!nes.cartridge_inserted());
    }

    #[test]
    fn reset_loads_pc_from_vector() {
        let mut nes = Nes::new();
        nes.insert_cartridge(&nop_rom()).unwrap();
        assert_eq!(nes.cpu().pc, 0x8000);
        nes.reset();
        assert_eq!(nes.cpu().pc, 0x8000);
    }

    #[test]
    fn one_tick_is_three_ppu_dots_and_one_cpu_cycle() {
        let mut nes = Nes::new();
        nes.insert_cartridge(&nop_rom()).unwrap();
        let ppu_before = nes.bus().ppu.total_cycles();
        let cpu_before = nes.cpu().cycles();
        nes.clock();
        assert_eq!(nes.bus().ppu.total_cycles() - ppu_before, 3);
        assert_eq!(nes.cpu().cycles() - cpu_before, 1);
    }

    #[test]
    fn run_frame_advances_exactly_one_ppu_frame() {
        let mut nes = Nes::new();
        nes.insert_cartridge(&nop_rom()).unwrap();
        let frames = nes.bus().ppu.frame_count();
        nes.run_frame();
        assert_eq!(nes.bus().ppu.frame_count(), frames + 1);
    }

    #[test]
    fn render_fills_rgba_with_opaque_alpha() {
        let mut nes = Nes::new();
        nes.insert_cartridge(&nop_rom()).unwrap();
        nes.run_frame();
        let mut frame = vec![0u8; 256 * 240 * 4];
        nes.render(&mut frame);
        for px in frame.chunks_exact(4) {
            assert_eq!(px[3], 0xFF);
        }
    }
}
