//! The 2A03 CPU execution engine.

use emu_core::Bus;

use crate::flags::{B, C, D, I, N, U, V, Z};
use crate::opcodes::{AccessKind, AddrMode, OPCODES};
use crate::unstable::UnstableStore;
use crate::Status;

const NMI_VECTOR: u16 = 0xFFFA;
const RESET_VECTOR: u16 = 0xFFFC;
const IRQ_VECTOR: u16 = 0xFFFE;

/// Magic constant for the bus-noise term of ANE/LXA. Matches the common
/// NMOS behaviour at NES operating temperature.
const ANE_MAGIC: u8 = 0xEE;

/// Ricoh 2A03 CPU.
///
/// One `clock()` call is one CPU cycle. At an instruction boundary the full
/// instruction effect is applied up front (with every bus access, dummy
/// reads included, in hardware order) and the CPU then idles down the
/// instruction's cycle count. `halt_cycle()` consumes a cycle on behalf of
/// DMA/DMC cycle stealing without advancing the instruction.
pub struct Cpu {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    /// Stack pointer, addressing page 1.
    pub s: u8,
    pub pc: u16,
    pub p: Status,

    cycles: u64,
    /// Pre-index base address of the current instruction.
    base_addr: u16,
    /// Resolved effective address.
    eff_addr: u16,
    /// Operand byte fetched for read instructions.
    fetched: u8,
    /// Cycles left before the next instruction boundary.
    cycles_remaining: u8,
    /// Extra cycles requested by the operation (taken branches).
    extra_cycles: u8,
    page_crossed: bool,

    /// Edge-triggered NMI request.
    nmi_pending: bool,
    /// Level-sensitive IRQ line.
    irq_line: bool,
    /// IRQ observed at the poll point of the previous instruction.
    irq_latched: bool,
    /// The I flag value the poll point sees. CLI/SEI/PLP leave their old
    /// value here so the change is deferred by one instruction.
    i_for_poll: bool,

    /// In-flight unstable store, if any.
    unstable: Option<UnstableStore>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    #[must_use]
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0xFD,
            pc: 0,
            p: Status::from_byte(U | I),
            cycles: 0,
            base_addr: 0,
            eff_addr: 0,
            fetched: 0,
            cycles_remaining: 0,
            extra_cycles: 0,
            page_crossed: false,
            nmi_pending: false,
            irq_line: false,
            irq_latched: false,
            i_for_poll: true,
            unstable: None,
        }
    }

    /// Reset: registers to their power-on values, PC from $FFFC/$FFFD,
    /// then 8 idle cycles before the first instruction.
    pub fn reset(&mut self, bus: &mut dyn Bus) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.s = 0xFD;
        self.p = Status::from_byte(U | I);
        let lo = bus.read(RESET_VECTOR);
        let hi = bus.read(RESET_VECTOR + 1);
        self.pc = u16::from(lo) | (u16::from(hi) << 8);
        self.cycles = 0;
        self.cycles_remaining = 8;
        self.extra_cycles = 0;
        self.nmi_pending = false;
        self.irq_line = false;
        self.irq_latched = false;
        self.i_for_poll = true;
        self.unstable = None;
    }

    /// Total cycles executed, halt cycles included.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// True when the CPU is at an instruction boundary.
    #[must_use]
    pub fn at_instruction_boundary(&self) -> bool {
        self.cycles_remaining == 0 && self.unstable.is_none()
    }

    /// Assert the edge-triggered NMI input.
    pub fn nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Drive the level-sensitive IRQ line.
    pub fn set_irq_line(&mut self, level: bool) {
        self.irq_line = level;
        if !level {
            self.irq_latched = false;
        }
    }

    /// Execute one CPU cycle.
    pub fn clock(&mut self, bus: &mut dyn Bus) {
        self.cycles += 1;

        if self.unstable.is_some() {
            self.unstable_step(bus);
            return;
        }

        if self.cycles_remaining == 0 {
            self.begin(bus);
            if self.unstable.is_some() {
                // This cycle was the opcode fetch of an unstable store.
                return;
            }
        }

        self.cycles_remaining -= 1;
        if self.cycles_remaining == 1 {
            // Poll point: one cycle before the final cycle of the
            // instruction. An IRQ asserted later than this is not seen
            // until the poll point of the next instruction.
            self.irq_latched = self.irq_line && !self.i_for_poll;
        }
    }

    /// Consume one cycle on behalf of a DMC fetch or OAM DMA without
    /// advancing the current instruction. A halt landing two cycles before
    /// an unstable store's write changes its AND source; a halt landing on
    /// the write cycle itself does not suppress the write (RDY does not
    /// hold writes), so the write commits now.
    pub fn halt_cycle(&mut self, bus: &mut dyn Bus) {
        self.cycles += 1;

        if let Some(st) = self.unstable {
            let write = st.write_step();
            if st.step == write {
                self.unstable_step(bus);
            } else if st.step + 2 == write {
                if let Some(st) = self.unstable.as_mut() {
                    st.rdy_before_write = true;
                }
            }
        }
    }

    /// Instruction boundary: service a pending interrupt or fetch, decode,
    /// and apply the next instruction.
    fn begin(&mut self, bus: &mut dyn Bus) {
        if self.nmi_pending {
            self.nmi_pending = false;
            self.interrupt(bus, NMI_VECTOR);
            return;
        }
        if self.irq_latched {
            self.irq_latched = false;
            self.interrupt(bus, IRQ_VECTOR);
            return;
        }

        let opcode = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);

        if let Some(st) = UnstableStore::decode(opcode) {
            self.unstable = Some(st);
            return;
        }

        let entry = &OPCODES[opcode as usize];
        self.page_crossed = false;
        self.extra_cycles = 0;
        let i_before = self.p.is_set(I);

        self.resolve(bus, entry.mode, entry.kind);
        (entry.op)(self, bus);

        // CLI, SEI, and PLP change I after the poll point, so the poll for
        // this instruction still sees the old value.
        self.i_for_poll = match opcode {
            0x28 | 0x58 | 0x78 => i_before,
            _ => self.p.is_set(I),
        };

        let mut cycles = entry.cycles;
        if entry.kind == AccessKind::Read && self.page_crossed {
            cycles += 1;
        }
        self.cycles_remaining = cycles + self.extra_cycles;
    }

    /// 7-cycle interrupt sequence shared by NMI and IRQ.
    fn interrupt(&mut self, bus: &mut dyn Bus, vector: u16) {
        let _ = bus.read(self.pc);
        let _ = bus.read(self.pc);
        self.push(bus, (self.pc >> 8) as u8);
        self.push(bus, self.pc as u8);
        self.push(bus, self.p.to_byte_irq());
        self.p.set(I);
        let lo = bus.read(vector);
        let hi = bus.read(vector.wrapping_add(1));
        self.pc = u16::from(lo) | (u16::from(hi) << 8);
        self.i_for_poll = true;
        self.cycles_remaining = 7;
    }

    // === Addressing ===

    fn resolve(&mut self, bus: &mut dyn Bus, mode: AddrMode, kind: AccessKind) {
        match mode {
            AddrMode::None => {}
            AddrMode::Imp => {
                // Discarded fetch of the next opcode byte.
                let _ = bus.read(self.pc);
            }
            AddrMode::Acc => {
                let _ = bus.read(self.pc);
                self.fetched = self.a;
            }
            AddrMode::Imm | AddrMode::Rel => {
                self.fetched = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            AddrMode::Zp => {
                self.eff_addr = u16::from(bus.read(self.pc));
                self.pc = self.pc.wrapping_add(1);
            }
            AddrMode::Zpx => {
                let ptr = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                let _ = bus.read(u16::from(ptr));
                self.eff_addr = u16::from(ptr.wrapping_add(self.x));
            }
            AddrMode::Zpy => {
                let ptr = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                let _ = bus.read(u16::from(ptr));
                self.eff_addr = u16::from(ptr.wrapping_add(self.y));
            }
            AddrMode::Abs => {
                let lo = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                let hi = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                self.base_addr = u16::from(lo) | (u16::from(hi) << 8);
                self.eff_addr = self.base_addr;
            }
            AddrMode::Abx => self.resolve_indexed(bus, kind, true),
            AddrMode::Aby => self.resolve_indexed(bus, kind, false),
            AddrMode::Ind => {
                let lo = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                let hi = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                let ptr = u16::from(lo) | (u16::from(hi) << 8);
                let target_lo = bus.read(ptr);
                // The high byte is read from the same page: ($xxFF) wraps
                // to $xx00.
                let wrapped = (ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF);
                let target_hi = bus.read(wrapped);
                self.eff_addr = u16::from(target_lo) | (u16::from(target_hi) << 8);
            }
            AddrMode::Izx => {
                let ptr = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                let _ = bus.read(u16::from(ptr));
                let ptr = ptr.wrapping_add(self.x);
                let lo = bus.read(u16::from(ptr));
                let hi = bus.read(u16::from(ptr.wrapping_add(1)));
                self.base_addr = u16::from(lo) | (u16::from(hi) << 8);
                self.eff_addr = self.base_addr;
            }
            AddrMode::Izy => {
                let ptr = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                let lo = bus.read(u16::from(ptr));
                let hi = bus.read(u16::from(ptr.wrapping_add(1)));
                self.base_addr = u16::from(lo) | (u16::from(hi) << 8);
                self.eff_addr = self.base_addr.wrapping_add(u16::from(self.y));
                self.page_crossed = (self.base_addr ^ self.eff_addr) & 0xFF00 != 0;
                self.indexed_dummy_read(bus, kind);
            }
        }

        // Read instructions fetch their operand as the final access of the
        // addressing sequence.
        if kind == AccessKind::Read {
            match mode {
                AddrMode::None | AddrMode::Imp | AddrMode::Acc | AddrMode::Imm | AddrMode::Rel => {}
                _ => self.fetched = bus.read(self.eff_addr),
            }
        }
    }

    fn resolve_indexed(&mut self, bus: &mut dyn Bus, kind: AccessKind, use_x: bool) {
        let lo = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        let hi = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        let index = if use_x { self.x } else { self.y };
        self.base_addr = u16::from(lo) | (u16::from(hi) << 8);
        self.eff_addr = self.base_addr.wrapping_add(u16::from(index));
        self.page_crossed = (self.base_addr ^ self.eff_addr) & 0xFF00 != 0;
        self.indexed_dummy_read(bus, kind);
    }

    /// The dummy read at the un-carried address. Reads emit it only when
    /// the index addition crossed a page; stores and read-modify-writes
    /// always emit it.
    fn indexed_dummy_read(&mut self, bus: &mut dyn Bus, kind: AccessKind) {
        let uncarried = (self.base_addr & 0xFF00) | (self.eff_addr & 0x00FF);
        match kind {
            AccessKind::Read => {
                if self.page_crossed {
                    let _ = bus.read(uncarried);
                }
            }
            AccessKind::Write | AccessKind::Rmw => {
                let _ = bus.read(uncarried);
            }
            AccessKind::Other => {}
        }
    }

    // === Stack ===

    fn push(&mut self, bus: &mut dyn Bus, value: u8) {
        bus.write(0x0100 | u16::from(self.s), value);
        self.s = self.s.wrapping_sub(1);
    }

    fn pull(&mut self, bus: &mut dyn Bus) -> u8 {
        self.s = self.s.wrapping_add(1);
        bus.read(0x0100 | u16::from(self.s))
    }

    fn stack_dummy_read(&mut self, bus: &mut dyn Bus) {
        let _ = bus.read(0x0100 | u16::from(self.s));
    }

    // === ALU helpers ===

    fn add(&mut self, value: u8) {
        // Binary only: the 2A03 honours D as a flag bit but has no BCD
        // adder.
        let carry = u16::from(self.p.is_set(C));
        let sum = u16::from(self.a) + u16::from(value) + carry;
        let result = sum as u8;
        self.p.set_if(C, sum > 0xFF);
        self.p
            .set_if(V, (self.a ^ result) & (value ^ result) & 0x80 != 0);
        self.a = result;
        self.p.update_nz(result);
    }

    fn compare(&mut self, reg: u8, value: u8) {
        self.p.set_if(C, reg >= value);
        self.p.update_nz(reg.wrapping_sub(value));
    }

    fn alu_asl(&mut self, value: u8) -> u8 {
        self.p.set_if(C, value & 0x80 != 0);
        let result = value << 1;
        self.p.update_nz(result);
        result
    }

    fn alu_lsr(&mut self, value: u8) -> u8 {
        self.p.set_if(C, value & 0x01 != 0);
        let result = value >> 1;
        self.p.update_nz(result);
        result
    }

    fn alu_rol(&mut self, value: u8) -> u8 {
        let carry_in = u8::from(self.p.is_set(C));
        self.p.set_if(C, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.p.update_nz(result);
        result
    }

    fn alu_ror(&mut self, value: u8) -> u8 {
        let carry_in = if self.p.is_set(C) { 0x80 } else { 0 };
        self.p.set_if(C, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.p.update_nz(result);
        result
    }

    fn alu_inc(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.p.update_nz(result);
        result
    }

    fn alu_dec(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.p.update_nz(result);
        result
    }

    /// Read, write the old value back, write the new value. Returns the
    /// new value for the combined unofficial operations.
    fn rmw(&mut self, bus: &mut dyn Bus, f: fn(&mut Cpu, u8) -> u8) -> u8 {
        let value = bus.read(self.eff_addr);
        bus.write(self.eff_addr, value);
        let result = f(self, value);
        bus.write(self.eff_addr, result);
        result
    }

    fn branch(&mut self, bus: &mut dyn Bus, taken: bool) {
        if !taken {
            return;
        }
        self.extra_cycles += 1;
        // Discarded fetch of the instruction that would have run.
        let _ = bus.read(self.pc);
        let offset = i16::from(self.fetched as i8);
        let target = self.pc.wrapping_add(offset as u16);
        if (target ^ self.pc) & 0xFF00 != 0 {
            self.extra_cycles += 1;
            // Fix-up read at the un-carried target.
            let _ = bus.read((self.pc & 0xFF00) | (target & 0x00FF));
        }
        self.pc = target;
    }

    // === Operations: loads, stores, transfers ===

    pub(crate) fn op_lda(&mut self, _bus: &mut dyn Bus) {
        self.a = self.fetched;
        self.p.update_nz(self.a);
    }

    pub(crate) fn op_ldx(&mut self, _bus: &mut dyn Bus) {
        self.x = self.fetched;
        self.p.update_nz(self.x);
    }

    pub(crate) fn op_ldy(&mut self, _bus: &mut dyn Bus) {
        self.y = self.fetched;
        self.p.update_nz(self.y);
    }

    pub(crate) fn op_sta(&mut self, bus: &mut dyn Bus) {
        bus.write(self.eff_addr, self.a);
    }

    pub(crate) fn op_stx(&mut self, bus: &mut dyn Bus) {
        bus.write(self.eff_addr, self.x);
    }

    pub(crate) fn op_sty(&mut self, bus: &mut dyn Bus) {
        bus.write(self.eff_addr, self.y);
    }

    pub(crate) fn op_tax(&mut self, _bus: &mut dyn Bus) {
        self.x = self.a;
        self.p.update_nz(self.x);
    }

    pub(crate) fn op_tay(&mut self, _bus: &mut dyn Bus) {
        self.y = self.a;
        self.p.update_nz(self.y);
    }

    pub(crate) fn op_txa(&mut self, _bus: &mut dyn Bus) {
        self.a = self.x;
        self.p.update_nz(self.a);
    }

    pub(crate) fn op_tya(&mut self, _bus: &mut dyn Bus) {
        self.a = self.y;
        self.p.update_nz(self.a);
    }

    pub(crate) fn op_tsx(&mut self, _bus: &mut dyn Bus) {
        self.x = self.s;
        self.p.update_nz(self.x);
    }

    pub(crate) fn op_txs(&mut self, _bus: &mut dyn Bus) {
        // TXS does not affect flags.
        self.s = self.x;
    }

    // === Operations: arithmetic and logic ===

    pub(crate) fn op_adc(&mut self, _bus: &mut dyn Bus) {
        self.add(self.fetched);
    }

    pub(crate) fn op_sbc(&mut self, _bus: &mut dyn Bus) {
        self.add(!self.fetched);
    }

    pub(crate) fn op_and(&mut self, _bus: &mut dyn Bus) {
        self.a &= self.fetched;
        self.p.update_nz(self.a);
    }

    pub(crate) fn op_ora(&mut self, _bus: &mut dyn Bus) {
        self.a |= self.fetched;
        self.p.update_nz(self.a);
    }

    pub(crate) fn op_eor(&mut self, _bus: &mut dyn Bus) {
        self.a ^= self.fetched;
        self.p.update_nz(self.a);
    }

    pub(crate) fn op_cmp(&mut self, _bus: &mut dyn Bus) {
        self.compare(self.a, self.fetched);
    }

    pub(crate) fn op_cpx(&mut self, _bus: &mut dyn Bus) {
        self.compare(self.x, self.fetched);
    }

    pub(crate) fn op_cpy(&mut self, _bus: &mut dyn Bus) {
        self.compare(self.y, self.fetched);
    }

    pub(crate) fn op_bit(&mut self, _bus: &mut dyn Bus) {
        self.p.set_if(Z, self.a & self.fetched == 0);
        self.p.set_if(N, self.fetched & 0x80 != 0);
        self.p.set_if(V, self.fetched & 0x40 != 0);
    }

    pub(crate) fn op_inx(&mut self, _bus: &mut dyn Bus) {
        self.x = self.x.wrapping_add(1);
        self.p.update_nz(self.x);
    }

    pub(crate) fn op_iny(&mut self, _bus: &mut dyn Bus) {
        self.y = self.y.wrapping_add(1);
        self.p.update_nz(self.y);
    }

    pub(crate) fn op_dex(&mut self, _bus: &mut dyn Bus) {
        self.x = self.x.wrapping_sub(1);
        self.p.update_nz(self.x);
    }

    pub(crate) fn op_dey(&mut self, _bus: &mut dyn Bus) {
        self.y = self.y.wrapping_sub(1);
        self.p.update_nz(self.y);
    }

    // === Operations: shifts and memory increments ===

    pub(crate) fn op_asl(&mut self, bus: &mut dyn Bus) {
        self.rmw(bus, Cpu::alu_asl);
    }

    pub(crate) fn op_lsr(&mut self, bus: &mut dyn Bus) {
        self.rmw(bus, Cpu::alu_lsr);
    }

    pub(crate) fn op_rol(&mut self, bus: &mut dyn Bus) {
        self.rmw(bus, Cpu::alu_rol);
    }

    pub(crate) fn op_ror(&mut self, bus: &mut dyn Bus) {
        self.rmw(bus, Cpu::alu_ror);
    }

    pub(crate) fn op_inc(&mut self, bus: &mut dyn Bus) {
        self.rmw(bus, Cpu::alu_inc);
    }

    pub(crate) fn op_dec(&mut self, bus: &mut dyn Bus) {
        self.rmw(bus, Cpu::alu_dec);
    }

    pub(crate) fn op_asl_a(&mut self, _bus: &mut dyn Bus) {
        self.a = self.alu_asl(self.a);
    }

    pub(crate) fn op_lsr_a(&mut self, _bus: &mut dyn Bus) {
        self.a = self.alu_lsr(self.a);
    }

    pub(crate) fn op_rol_a(&mut self, _bus: &mut dyn Bus) {
        self.a = self.alu_rol(self.a);
    }

    pub(crate) fn op_ror_a(&mut self, _bus: &mut dyn Bus) {
        self.a = self.alu_ror(self.a);
    }

    // === Operations: flags ===

    pub(crate) fn op_clc(&mut self, _bus: &mut dyn Bus) {
        self.p.clear(C);
    }

    pub(crate) fn op_sec(&mut self, _bus: &mut dyn Bus) {
        self.p.set(C);
    }

    pub(crate) fn op_cli(&mut self, _bus: &mut dyn Bus) {
        self.p.clear(I);
    }

    pub(crate) fn op_sei(&mut self, _bus: &mut dyn Bus) {
        self.p.set(I);
    }

    pub(crate) fn op_clv(&mut self, _bus: &mut dyn Bus) {
        self.p.clear(V);
    }

    pub(crate) fn op_cld(&mut self, _bus: &mut dyn Bus) {
        self.p.clear(D);
    }

    pub(crate) fn op_sed(&mut self, _bus: &mut dyn Bus) {
        self.p.set(D);
    }

    // === Operations: stack ===

    pub(crate) fn op_pha(&mut self, bus: &mut dyn Bus) {
        self.push(bus, self.a);
    }

    pub(crate) fn op_php(&mut self, bus: &mut dyn Bus) {
        let value = self.p.to_byte_brk();
        self.push(bus, value);
    }

    pub(crate) fn op_pla(&mut self, bus: &mut dyn Bus) {
        self.stack_dummy_read(bus);
        self.a = self.pull(bus);
        self.p.update_nz(self.a);
    }

    pub(crate) fn op_plp(&mut self, bus: &mut dyn Bus) {
        self.stack_dummy_read(bus);
        let value = self.pull(bus);
        self.p = Status::from_byte(value & !B);
    }

    // === Operations: control flow ===

    pub(crate) fn op_jmp(&mut self, _bus: &mut dyn Bus) {
        self.pc = self.eff_addr;
    }

    pub(crate) fn op_jsr(&mut self, bus: &mut dyn Bus) {
        let lo = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        self.stack_dummy_read(bus);
        self.push(bus, (self.pc >> 8) as u8);
        self.push(bus, self.pc as u8);
        let hi = bus.read(self.pc);
        self.pc = u16::from(lo) | (u16::from(hi) << 8);
    }

    pub(crate) fn op_rts(&mut self, bus: &mut dyn Bus) {
        let _ = bus.read(self.pc);
        self.stack_dummy_read(bus);
        let lo = self.pull(bus);
        let hi = self.pull(bus);
        let addr = u16::from(lo) | (u16::from(hi) << 8);
        let _ = bus.read(addr);
        self.pc = addr.wrapping_add(1);
    }

    pub(crate) fn op_rti(&mut self, bus: &mut dyn Bus) {
        let _ = bus.read(self.pc);
        self.stack_dummy_read(bus);
        let value = self.pull(bus);
        self.p = Status::from_byte(value & !B);
        let lo = self.pull(bus);
        let hi = self.pull(bus);
        self.pc = u16::from(lo) | (u16::from(hi) << 8);
    }

    pub(crate) fn op_brk(&mut self, bus: &mut dyn Bus) {
        // The padding byte was consumed by the immediate fetch.
        self.push(bus, (self.pc >> 8) as u8);
        self.push(bus, self.pc as u8);
        let value = self.p.to_byte_brk();
        self.push(bus, value);
        self.p.set(I);
        let lo = bus.read(IRQ_VECTOR);
        let hi = bus.read(IRQ_VECTOR + 1);
        self.pc = u16::from(lo) | (u16::from(hi) << 8);
    }

    pub(crate) fn op_bpl(&mut self, bus: &mut dyn Bus) {
        let taken = !self.p.is_set(N);
        self.branch(bus, taken);
    }

    pub(crate) fn op_bmi(&mut self, bus: &mut dyn Bus) {
        let taken = self.p.is_set(N);
        self.branch(bus, taken);
    }

    pub(crate) fn op_bvc(&mut self, bus: &mut dyn Bus) {
        let taken = !self.p.is_set(V);
        self.branch(bus, taken);
    }

    pub(crate) fn op_bvs(&mut self, bus: &mut dyn Bus) {
        let taken = self.p.is_set(V);
        self.branch(bus, taken);
    }

    pub(crate) fn op_bcc(&mut self, bus: &mut dyn Bus) {
        let taken = !self.p.is_set(C);
        self.branch(bus, taken);
    }

    pub(crate) fn op_bcs(&mut self, bus: &mut dyn Bus) {
        let taken = self.p.is_set(C);
        self.branch(bus, taken);
    }

    pub(crate) fn op_bne(&mut self, bus: &mut dyn Bus) {
        let taken = !self.p.is_set(Z);
        self.branch(bus, taken);
    }

    pub(crate) fn op_beq(&mut self, bus: &mut dyn Bus) {
        let taken = self.p.is_set(Z);
        self.branch(bus, taken);
    }

    pub(crate) fn op_nop(&mut self, _bus: &mut dyn Bus) {}

    // === Operations: unofficial ===

    pub(crate) fn op_lax(&mut self, _bus: &mut dyn Bus) {
        self.a = self.fetched;
        self.x = self.fetched;
        self.p.update_nz(self.a);
    }

    pub(crate) fn op_sax(&mut self, bus: &mut dyn Bus) {
        bus.write(self.eff_addr, self.a & self.x);
    }

    pub(crate) fn op_slo(&mut self, bus: &mut dyn Bus) {
        let result = self.rmw(bus, Cpu::alu_asl);
        self.a |= result;
        self.p.update_nz(self.a);
    }

    pub(crate) fn op_rla(&mut self, bus: &mut dyn Bus) {
        let result = self.rmw(bus, Cpu::alu_rol);
        self.a &= result;
        self.p.update_nz(self.a);
    }

    pub(crate) fn op_sre(&mut self, bus: &mut dyn Bus) {
        let result = self.rmw(bus, Cpu::alu_lsr);
        self.a ^= result;
        self.p.update_nz(self.a);
    }

    pub(crate) fn op_rra(&mut self, bus: &mut dyn Bus) {
        let result = self.rmw(bus, Cpu::alu_ror);
        self.add(result);
    }

    pub(crate) fn op_dcp(&mut self, bus: &mut dyn Bus) {
        let result = self.rmw(bus, Cpu::alu_dec);
        self.compare(self.a, result);
    }

    pub(crate) fn op_isc(&mut self, bus: &mut dyn Bus) {
        let result = self.rmw(bus, Cpu::alu_inc);
        self.add(!result);
    }

    pub(crate) fn op_anc(&mut self, _bus: &mut dyn Bus) {
        self.a &= self.fetched;
        self.p.update_nz(self.a);
        self.p.set_if(C, self.a & 0x80 != 0);
    }

    pub(crate) fn op_asr(&mut self, _bus: &mut dyn Bus) {
        self.a &= self.fetched;
        self.a = self.alu_lsr(self.a);
    }

    pub(crate) fn op_arr(&mut self, _bus: &mut dyn Bus) {
        let carry_in = if self.p.is_set(C) { 0x80 } else { 0 };
        self.a = ((self.a & self.fetched) >> 1) | carry_in;
        self.p.update_nz(self.a);
        self.p.set_if(C, self.a & 0x40 != 0);
        self.p
            .set_if(V, ((self.a >> 6) ^ (self.a >> 5)) & 0x01 != 0);
    }

    pub(crate) fn op_ane(&mut self, _bus: &mut dyn Bus) {
        self.a = (self.a | ANE_MAGIC) & self.x & self.fetched;
        self.p.update_nz(self.a);
    }

    pub(crate) fn op_lxa(&mut self, _bus: &mut dyn Bus) {
        let value = (self.a | ANE_MAGIC) & self.fetched;
        self.a = value;
        self.x = value;
        self.p.update_nz(value);
    }

    pub(crate) fn op_axs(&mut self, _bus: &mut dyn Bus) {
        let base = self.a & self.x;
        self.p.set_if(C, base >= self.fetched);
        self.x = base.wrapping_sub(self.fetched);
        self.p.update_nz(self.x);
    }

    pub(crate) fn op_las(&mut self, _bus: &mut dyn Bus) {
        let value = self.fetched & self.s;
        self.a = value;
        self.x = value;
        self.s = value;
        self.p.update_nz(value);
    }

    // === Unstable store micro-sequencer ===

    /// Execute one cycle of an in-flight SH* store.
    fn unstable_step(&mut self, bus: &mut dyn Bus) {
        let Some(mut st) = self.unstable else {
            return;
        };

        match (st.opcode, st.step) {
            // SHA (zp),Y: pointer fetch, two dereferences, un-carried dummy
            // read, write.
            (0x93, 2) => {
                st.ptr = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            (0x93, 3) => {
                st.lo = bus.read(u16::from(st.ptr));
            }
            (0x93, 4) => {
                st.hi = bus.read(u16::from(st.ptr.wrapping_add(1)));
            }
            // Absolute-indexed forms: two operand fetches, un-carried dummy
            // read, write.
            (_, 2) => {
                st.lo = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            (_, 3) => {
                st.hi = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            (_, step) if step + 1 == st.write_step() => {
                let index = self.unstable_index(st.opcode);
                let uncarried =
                    (u16::from(st.hi) << 8) | u16::from(st.lo.wrapping_add(index));
                let _ = bus.read(uncarried);
            }
            (_, step) if step == st.write_step() => {
                self.unstable_write(bus, &st);
                self.unstable = None;
                self.irq_latched = self.irq_line && !self.p.is_set(I);
                return;
            }
            _ => unreachable!(),
        }

        st.step += 1;
        self.unstable = Some(st);
    }

    fn unstable_index(&self, opcode: u8) -> u8 {
        if opcode == 0x9C {
            self.x
        } else {
            self.y
        }
    }

    /// The final write of an SH* store. The value is the source register
    /// ANDed with (high byte + 1); the high byte comes from the carried
    /// address, or from the pre-carry base when RDY dropped two cycles
    /// before this one.
    fn unstable_write(&mut self, bus: &mut dyn Bus, st: &UnstableStore) {
        let index = self.unstable_index(st.opcode);
        let base = (u16::from(st.hi) << 8) | u16::from(st.lo);
        let addr = base.wrapping_add(u16::from(index));
        let src_high = if st.rdy_before_write {
            st.hi
        } else {
            (addr >> 8) as u8
        };
        let reg = match st.opcode {
            0x9C => self.y,
            0x9E => self.x,
            _ => self.a & self.x,
        };
        if st.opcode == 0x9B {
            // The stack store sets S before the write.
            self.s = self.a & self.x;
        }
        bus.write(addr, reg & src_high.wrapping_add(1));
    }
}
