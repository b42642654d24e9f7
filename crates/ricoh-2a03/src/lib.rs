//! Ricoh 2A03 CPU core.
//!
//! The 2A03 is an NMOS 6502 with the decimal-mode circuitry cut: the D flag
//! still exists as a status bit, but ADC/SBC always compute in binary. The
//! full unofficial opcode set is implemented, including the unstable SH*
//! stores, because NES software depends on it.
//!
//! Execution is modeled with a per-instruction cycle countdown: at an
//! instruction boundary the CPU fetches, decodes, and applies the complete
//! instruction effect — emitting every real and dummy bus access in hardware
//! order — then idles for the instruction's remaining cycles. The unstable
//! stores instead run one bus access per cycle through a small
//! micro-sequencer, because DMC cycle stealing changes what they write.

mod cpu;
mod flags;
mod opcodes;
mod unstable;

pub use cpu::Cpu;
pub use flags::Status;
pub use opcodes::{AccessKind, AddrMode, Opcode, OPCODES};
