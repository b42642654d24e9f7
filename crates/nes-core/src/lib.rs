//! Cycle-accurate NES console core.
//!
//! One console tick = three PPU dots, then one CPU cycle (or a halt cycle
//! stolen by DMC/OAM DMA), then one APU cycle. The bus serializes every
//! access the devices observe; the tick interleaving is the definition of
//! correctness.

mod apu;
mod bus;
pub mod capture;
mod cartridge;
mod controller;
pub mod input;
mod mapper;
mod nes;
mod palette;
pub mod ppu;

pub use apu::{Apu, CPU_FREQ, SAMPLE_RATE};
pub use bus::NesBus;
pub use cartridge::{Cartridge, Mirroring};
pub use controller::Controller;
pub use input::{InputQueue, NesButton};
pub use mapper::{Mapped, Mapper};
pub use nes::Nes;
pub use palette::SYSTEM_PALETTE;
pub use ppu::Ppu;
