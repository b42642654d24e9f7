//! Instruction-level behaviour tests.
//!
//! These drive the CPU over a flat test bus and check architectural results,
//! cycle counts, and bus access patterns (dummy reads included).

use emu_core::{Bus, SimpleBus};
use ricoh_2a03::Cpu;

/// Bus wrapper that records every access, for access-pattern assertions.
struct RecordingBus {
    inner: SimpleBus,
    reads: Vec<u16>,
    writes: Vec<(u16, u8)>,
}

impl RecordingBus {
    fn new() -> Self {
        Self {
            inner: SimpleBus::new(),
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    fn accesses(&self) -> usize {
        self.reads.len() + self.writes.len()
    }
}

impl Bus for RecordingBus {
    fn read(&mut self, address: u16) -> u8 {
        self.reads.push(address);
        self.inner.read(address)
    }

    fn write(&mut self, address: u16, value: u8) {
        self.writes.push((address, value));
        self.inner.write(address, value)
    }
}

/// Reset with the vector pointing at `origin`, load `program` there, and
/// consume the 8 reset idle cycles.
fn boot(bus: &mut SimpleBus, origin: u16, program: &[u8]) -> Cpu {
    bus.load(0xFFFC, &[origin as u8, (origin >> 8) as u8]);
    bus.load(origin, program);
    let mut cpu = Cpu::new();
    cpu.reset(bus);
    for _ in 0..8 {
        cpu.clock(bus);
    }
    assert!(cpu.at_instruction_boundary());
    cpu
}

/// Run exactly one instruction, returning the cycles it took.
fn step_instruction(cpu: &mut Cpu, bus: &mut dyn Bus) -> u64 {
    let start = cpu.cycles();
    cpu.clock(bus);
    while !cpu.at_instruction_boundary() {
        cpu.clock(bus);
    }
    cpu.cycles() - start
}

#[test]
fn lda_immediate_zero() {
    let mut bus = SimpleBus::new();
    let mut cpu = boot(&mut bus, 0x0200, &[0xA9, 0x00]);
    cpu.clock(&mut bus);
    cpu.clock(&mut bus);
    assert_eq!(cpu.a, 0x00);
    assert_eq!(cpu.p.0 & 0x02, 0x02, "Zero set");
    assert_eq!(cpu.p.0 & 0x80, 0x00, "Negative clear");
}

#[test]
fn adc_overflow() {
    let mut bus = SimpleBus::new();
    let mut cpu = boot(&mut bus, 0x0200, &[0xA9, 0x50, 0x69, 0x50]);
    step_instruction(&mut cpu, &mut bus);
    step_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0xA0);
    assert_eq!(cpu.p.0 & 0x40, 0x40, "Overflow set");
    assert_eq!(cpu.p.0 & 0x80, 0x80, "Negative set");
    assert_eq!(cpu.p.0 & 0x01, 0x00, "Carry clear");
}

#[test]
fn jsr_and_rts_round_trip() {
    // 0000: JSR $0006 / 0003: LDA #$01 / 0005: BRK
    // 0006: LDA #$07 / 0008: RTS
    let mut bus = SimpleBus::new();
    let mut cpu = boot(
        &mut bus,
        0x0000,
        &[0x20, 0x06, 0x00, 0xA9, 0x01, 0x00, 0xA9, 0x07, 0x60],
    );
    step_instruction(&mut cpu, &mut bus); // JSR
    assert_eq!(cpu.pc, 0x0006);
    step_instruction(&mut cpu, &mut bus); // LDA #$07
    assert_eq!(cpu.a, 0x07);
    step_instruction(&mut cpu, &mut bus); // RTS
    assert_eq!(cpu.pc, 0x0003);
    step_instruction(&mut cpu, &mut bus); // LDA #$01
    assert_eq!(cpu.a, 0x01);
}

#[test]
fn jmp_indirect_page_wrap_bug() {
    // JMP ($02FF): low byte from $02FF, high byte from $0200 — not $0300.
    let mut bus = SimpleBus::new();
    bus.load(0x02FF, &[0x06]);
    bus.load(0x0200, &[0x00]);
    bus.load(0x0006, &[0xA9, 0x44]);
    let mut cpu = boot(&mut bus, 0x0000, &[0x6C, 0xFF, 0x02]);
    step_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.pc, 0x0006);
    step_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0x44);
}

#[test]
fn branch_cycle_counts() {
    // BEQ not taken (Z clear): 2 cycles.
    let mut bus = SimpleBus::new();
    let mut cpu = boot(&mut bus, 0x0200, &[0xF0, 0x10]);
    assert_eq!(step_instruction(&mut cpu, &mut bus), 2);

    // BNE taken, same page: 3 cycles.
    let mut bus = SimpleBus::new();
    let mut cpu = boot(&mut bus, 0x0200, &[0xD0, 0x10]);
    assert_eq!(step_instruction(&mut cpu, &mut bus), 3);
    assert_eq!(cpu.pc, 0x0212);

    // BNE taken across a page: 4 cycles (1 taken + 1 cross).
    let mut bus = SimpleBus::new();
    let mut cpu = boot(&mut bus, 0x02F0, &[0xD0, 0x20]);
    assert_eq!(step_instruction(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.pc, 0x0312);
}

#[test]
fn page_cross_adds_cycle_for_reads_only() {
    // LDA $12F0,X with X=0x20 crosses: 5 cycles.
    let mut bus = SimpleBus::new();
    let mut cpu = boot(&mut bus, 0x0200, &[0xBD, 0xF0, 0x12]);
    cpu.x = 0x20;
    assert_eq!(step_instruction(&mut cpu, &mut bus), 5);

    // Same without crossing: 4 cycles.
    let mut bus = SimpleBus::new();
    let mut cpu = boot(&mut bus, 0x0200, &[0xBD, 0x01, 0x12]);
    cpu.x = 0x02;
    assert_eq!(step_instruction(&mut cpu, &mut bus), 4);

    // STA $12F0,X is always 5 cycles, crossing or not.
    let mut bus = SimpleBus::new();
    let mut cpu = boot(&mut bus, 0x0200, &[0x9D, 0x01, 0x12]);
    cpu.x = 0x02;
    assert_eq!(step_instruction(&mut cpu, &mut bus), 5);
}

#[test]
fn indexed_store_emits_dummy_read_at_uncarried_address() {
    let mut bus = RecordingBus::new();
    bus.inner.load(0x0200, &[0x9D, 0xF0, 0x12]); // STA $12F0,X
    let mut cpu = Cpu::new();
    cpu.pc = 0x0200;
    cpu.x = 0x20;
    cpu.a = 0xAB;
    bus.reads.clear();
    step_instruction(&mut cpu, &mut bus);
    // Dummy read at $1210 (un-carried), write at $1310.
    assert!(bus.reads.contains(&0x1210));
    assert_eq!(bus.writes, vec![(0x1310, 0xAB)]);
}

#[test]
fn rmw_reads_then_writes_old_then_new() {
    let mut bus = RecordingBus::new();
    bus.inner.load(0x0200, &[0xEE, 0x40, 0x00]); // INC $0040
    bus.inner.load(0x0040, &[0x7F]);
    let mut cpu = Cpu::new();
    cpu.pc = 0x0200;
    step_instruction(&mut cpu, &mut bus);
    assert_eq!(bus.writes, vec![(0x0040, 0x7F), (0x0040, 0x80)]);
    assert_eq!(cpu.p.0 & 0x80, 0x80);
}

#[test]
fn every_opcode_terminates_with_one_access_per_cycle() {
    for opcode in 0..=255u8 {
        let mut bus = RecordingBus::new();
        bus.inner.load(0x0200, &[opcode, 0x00, 0x00]);
        let mut cpu = Cpu::new();
        cpu.pc = 0x0200;
        let cycles = step_instruction(&mut cpu, &mut bus);
        assert!(cycles >= 2 && cycles <= 8, "opcode {opcode:#04X}: {cycles}");
        assert_eq!(
            bus.accesses() as u64,
            cycles,
            "opcode {opcode:#04X}: {} accesses over {} cycles",
            bus.accesses(),
            cycles
        );
    }
}

#[test]
fn unknown_opcode_is_two_cycle_nop() {
    let mut bus = SimpleBus::new();
    let mut cpu = boot(&mut bus, 0x0200, &[0x02, 0xEA]);
    let a = cpu.a;
    let p = cpu.p;
    assert_eq!(step_instruction(&mut cpu, &mut bus), 2);
    assert_eq!(cpu.pc, 0x0201);
    assert_eq!(cpu.a, a);
    assert_eq!(cpu.p, p);
}

#[test]
fn reset_loads_vector_and_idles_eight_cycles() {
    let mut bus = RecordingBus::new();
    bus.inner.load(0xFFFC, &[0x34, 0x12]);
    let mut cpu = Cpu::new();
    cpu.reset(&mut bus);
    assert_eq!(cpu.pc, 0x1234);
    bus.reads.clear();
    for _ in 0..8 {
        cpu.clock(&mut bus);
    }
    // The idle cycles issue no bus traffic; the ninth cycle fetches.
    assert!(bus.reads.is_empty());
    cpu.clock(&mut bus);
    assert_eq!(bus.reads.first(), Some(&0x1234));
}

#[test]
fn nmi_vectors_and_pushes_status_with_break_clear() {
    let mut bus = SimpleBus::new();
    bus.load(0xFFFA, &[0x00, 0x90]);
    let mut cpu = boot(&mut bus, 0x0200, &[0xEA, 0xEA]);
    step_instruction(&mut cpu, &mut bus);
    cpu.nmi();
    let cycles = step_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 7);
    assert_eq!(cpu.pc, 0x9000);
    assert!(cpu.p.is_set(0x04), "I set after NMI");
    // Pushed status: B clear, U set.
    let pushed = bus.peek(0x0100 | u16::from(cpu.s.wrapping_add(1)));
    assert_eq!(pushed & 0x10, 0x00);
    assert_eq!(pushed & 0x20, 0x20);
}

#[test]
fn irq_after_cli_is_deferred_one_instruction() {
    let mut bus = SimpleBus::new();
    bus.load(0xFFFE, &[0x00, 0x80]);
    // SEI, CLI, NOP, NOP — IRQ line high the whole time.
    let mut cpu = boot(&mut bus, 0x0200, &[0x78, 0x58, 0xEA, 0xEA]);
    cpu.set_irq_line(true);

    step_instruction(&mut cpu, &mut bus); // SEI
    step_instruction(&mut cpu, &mut bus); // CLI — polls with the old I
    assert_eq!(cpu.pc, 0x0202);
    step_instruction(&mut cpu, &mut bus); // NOP still runs
    assert_eq!(cpu.pc, 0x0203);
    let cycles = step_instruction(&mut cpu, &mut bus); // now the IRQ
    assert_eq!(cycles, 7);
    assert_eq!(cpu.pc, 0x8000);
    // Return address on the stack is the deferred instruction's successor.
    let lo = bus.peek(0x0100 | u16::from(cpu.s.wrapping_add(2)));
    let hi = bus.peek(0x0100 | u16::from(cpu.s.wrapping_add(3)));
    assert_eq!(u16::from(lo) | (u16::from(hi) << 8), 0x0203);
}

#[test]
fn irq_masked_while_i_set() {
    let mut bus = SimpleBus::new();
    bus.load(0xFFFE, &[0x00, 0x80]);
    let mut cpu = boot(&mut bus, 0x0200, &[0xEA, 0xEA, 0xEA]);
    cpu.set_irq_line(true);
    // I is set from reset; nothing fires.
    for _ in 0..3 {
        step_instruction(&mut cpu, &mut bus);
    }
    assert_eq!(cpu.pc, 0x0203);
}

#[test]
fn brk_pushes_break_set_and_vectors() {
    let mut bus = SimpleBus::new();
    bus.load(0xFFFE, &[0x00, 0x70]);
    let mut cpu = boot(&mut bus, 0x0200, &[0x00, 0xFF]);
    let cycles = step_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 7);
    assert_eq!(cpu.pc, 0x7000);
    let pushed_p = bus.peek(0x0100 | u16::from(cpu.s.wrapping_add(1)));
    assert_eq!(pushed_p & 0x10, 0x10, "B set in BRK push");
    // Return address skips the padding byte.
    let lo = bus.peek(0x0100 | u16::from(cpu.s.wrapping_add(2)));
    let hi = bus.peek(0x0100 | u16::from(cpu.s.wrapping_add(3)));
    assert_eq!(u16::from(lo) | (u16::from(hi) << 8), 0x0202);
}

#[test]
fn sha_absolute_y_page_cross_value() {
    // SHA $BFFF,Y with Y=1: the store lands at $C000 and the value is
    // A & X masked by (carried high byte + 1).
    let mut bus = SimpleBus::new();
    let mut cpu = boot(&mut bus, 0x0200, &[0x9F, 0xFF, 0xBF]);
    cpu.a = 0x55;
    cpu.x = 0x01;
    cpu.y = 0x01;
    let cycles = step_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 5);
    assert_eq!(bus.peek(0xC000), 0x55 & 0x01 & 0xC1);
    assert_eq!(bus.peek(0xC000), 0x01);
}

#[test]
fn shx_value_masked_by_high_byte_plus_one() {
    let mut bus = SimpleBus::new();
    let mut cpu = boot(&mut bus, 0x0200, &[0x9E, 0xFF, 0xBF]); // SHX $BFFF,Y
    cpu.x = 0xFF;
    cpu.y = 0x01;
    step_instruction(&mut cpu, &mut bus);
    assert_eq!(bus.peek(0xC000), 0xFF & 0xC1);
}

#[test]
fn sha_stall_two_before_write_uses_base_high_byte() {
    let mut bus = SimpleBus::new();
    bus.load(0xFFFC, &[0x00, 0x02]);
    bus.load(0x0200, &[0x9F, 0xFF, 0xBF]);
    let mut cpu = Cpu::new();
    cpu.reset(&mut bus);
    for _ in 0..8 {
        cpu.clock(&mut bus);
    }
    cpu.a = 0xFF;
    cpu.x = 0xFF;
    cpu.y = 0x01;

    cpu.clock(&mut bus); // opcode fetch, sequencer armed
    cpu.clock(&mut bus); // low operand; next pending cycle is 3 = write - 2
    cpu.halt_cycle(&mut bus); // RDY drop two cycles before the write
    while !cpu.at_instruction_boundary() {
        cpu.clock(&mut bus);
    }
    // AND source falls back to the pre-carry high byte $BF.
    assert_eq!(bus.peek(0xC000), 0xFF & 0xBF_u8.wrapping_add(1));
}

#[test]
fn sha_stall_on_write_cycle_still_commits() {
    let mut bus = SimpleBus::new();
    bus.load(0xFFFC, &[0x00, 0x02]);
    bus.load(0x0200, &[0x9F, 0xFF, 0xBF]);
    let mut cpu = Cpu::new();
    cpu.reset(&mut bus);
    for _ in 0..8 {
        cpu.clock(&mut bus);
    }
    cpu.a = 0xFF;
    cpu.x = 0xFF;
    cpu.y = 0x01;

    cpu.clock(&mut bus); // opcode
    cpu.clock(&mut bus); // lo
    cpu.clock(&mut bus); // hi
    cpu.clock(&mut bus); // un-carried dummy read
    cpu.halt_cycle(&mut bus); // lands on the write cycle: write commits
    assert!(cpu.at_instruction_boundary());
    assert_eq!(bus.peek(0xC000), 0xFF & 0xC1);
}

#[test]
fn shs_sets_stack_pointer_before_write() {
    let mut bus = SimpleBus::new();
    let mut cpu = boot(&mut bus, 0x0200, &[0x9B, 0x00, 0x44]); // SHS $4400,Y
    cpu.a = 0xF0;
    cpu.x = 0x3C;
    cpu.y = 0x00;
    step_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.s, 0xF0 & 0x3C);
    assert_eq!(bus.peek(0x4400), 0xF0 & 0x3C & 0x45);
}

#[test]
fn las_loads_a_x_s_from_memory_and_s() {
    let mut bus = SimpleBus::new();
    bus.load(0x4410, &[0b1100_1100]);
    let mut cpu = boot(&mut bus, 0x0200, &[0xBB, 0x10, 0x44]); // LAE $4410,Y
    cpu.s = 0b1010_1010;
    cpu.y = 0;
    step_instruction(&mut cpu, &mut bus);
    let expected = 0b1100_1100 & 0b1010_1010;
    assert_eq!(cpu.a, expected);
    assert_eq!(cpu.x, expected);
    assert_eq!(cpu.s, expected);
}

#[test]
fn unofficial_lax_and_sax() {
    let mut bus = SimpleBus::new();
    bus.load(0x0040, &[0x5A]);
    let mut cpu = boot(&mut bus, 0x0200, &[0xA7, 0x40, 0x87, 0x41]); // LAX $40 / SAX $41
    step_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0x5A);
    assert_eq!(cpu.x, 0x5A);
    step_instruction(&mut cpu, &mut bus);
    assert_eq!(bus.peek(0x0041), 0x5A);
}

#[test]
fn unofficial_dcp_combines_dec_and_cmp() {
    let mut bus = SimpleBus::new();
    bus.load(0x0040, &[0x11]);
    let mut cpu = boot(&mut bus, 0x0200, &[0xC7, 0x40]); // DCP $40
    cpu.a = 0x10;
    step_instruction(&mut cpu, &mut bus);
    assert_eq!(bus.peek(0x0040), 0x10);
    assert_eq!(cpu.p.0 & 0x02, 0x02, "Zero from A == M-1");
    assert_eq!(cpu.p.0 & 0x01, 0x01, "Carry from A >= M-1");
}

#[test]
fn unofficial_axs_subtracts_without_borrow() {
    let mut bus = SimpleBus::new();
    let mut cpu = boot(&mut bus, 0x0200, &[0xCB, 0x02]); // AXS #$02
    cpu.a = 0x0F;
    cpu.x = 0x07;
    step_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.x, 0x05);
    assert_eq!(cpu.p.0 & 0x01, 0x01);
}

#[test]
fn sbc_mirror_eb_matches_e9() {
    let run = |opcode: u8| {
        let mut bus = SimpleBus::new();
        let mut cpu = boot(&mut bus, 0x0200, &[0x38, opcode, 0x30]); // SEC, SBC #$30
        cpu.a = 0x50;
        step_instruction(&mut cpu, &mut bus);
        step_instruction(&mut cpu, &mut bus);
        (cpu.a, cpu.p)
    };
    assert_eq!(run(0xE9), run(0xEB));
}
