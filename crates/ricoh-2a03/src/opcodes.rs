//! The 256-entry instruction table.
//!
//! Every opcode decodes to an operation, an addressing mode, an access kind,
//! and a base cycle count. The base count is the worst case for stores and
//! read-modify-writes; read instructions add one cycle dynamically when an
//! indexed mode crosses a page. Undefined slots (the JAM opcodes) decode as
//! 2-cycle no-ops.

use crate::cpu::Cpu;
use emu_core::Bus;

/// Operation entry point. Addressing has already been resolved; the
/// operation performs its own data reads and writes.
pub type OpFn = fn(&mut Cpu, &mut dyn Bus);

/// Addressing mode of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// No operand resolution; the operation emits every access itself
    /// (JSR, RTS, RTI).
    None,
    /// Implied: a discarded fetch of the next byte.
    Imp,
    /// Accumulator: like implied, but the operand is A.
    Acc,
    /// Immediate: operand is the next byte.
    Imm,
    /// Relative: signed 8-bit branch displacement.
    Rel,
    Zp,
    Zpx,
    Zpy,
    Abs,
    Abx,
    Aby,
    /// Absolute indirect, with the page-wrap bug on the pointer low byte.
    Ind,
    /// (zp,X) indexed indirect.
    Izx,
    /// (zp),Y indirect indexed.
    Izy,
}

/// What the instruction does with its effective address. Decides the extra
/// page-cross cycle and the dummy-read pattern of indexed modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// Reads the operand; +1 cycle on page cross, dummy read only then.
    Read,
    /// Stores; worst-case cycles, always a dummy read at the un-carried
    /// address.
    Write,
    /// Read, write-back, write; worst-case cycles like stores.
    Rmw,
    /// Everything else (control flow, stack, flag ops).
    Other,
}

/// One decoded instruction.
pub struct Opcode {
    pub mnemonic: &'static str,
    pub op: OpFn,
    pub mode: AddrMode,
    pub kind: AccessKind,
    pub cycles: u8,
}

const fn entry(
    mnemonic: &'static str,
    op: OpFn,
    mode: AddrMode,
    kind: AccessKind,
    cycles: u8,
) -> Opcode {
    Opcode {
        mnemonic,
        op,
        mode,
        kind,
        cycles,
    }
}

use AccessKind::{Other, Read, Rmw, Write};
use AddrMode::{Abs, Abx, Aby, Acc, Imm, Imp, Ind, Izx, Izy, Rel, Zp, Zpx, Zpy};

/// The full decode table. Entries for the unstable stores ($93/$9B/$9C/$9E/
/// $9F) are descriptive only; the CPU intercepts those opcodes and runs them
/// through the per-cycle micro-sequencer instead.
#[rustfmt::skip]
pub static OPCODES: [Opcode; 256] = [
    // 0x00
    entry("BRK", Cpu::op_brk, Imm, Other, 7),
    entry("ORA", Cpu::op_ora, Izx, Read, 6),
    entry("NOP", Cpu::op_nop, Imp, Other, 2),
    entry("SLO", Cpu::op_slo, Izx, Rmw, 8),
    entry("NOP", Cpu::op_nop, Zp, Read, 3),
    entry("ORA", Cpu::op_ora, Zp, Read, 3),
    entry("ASL", Cpu::op_asl, Zp, Rmw, 5),
    entry("SLO", Cpu::op_slo, Zp, Rmw, 5),
    entry("PHP", Cpu::op_php, Imp, Other, 3),
    entry("ORA", Cpu::op_ora, Imm, Read, 2),
    entry("ASL", Cpu::op_asl_a, Acc, Other, 2),
    entry("ANC", Cpu::op_anc, Imm, Read, 2),
    entry("NOP", Cpu::op_nop, Abs, Read, 4),
    entry("ORA", Cpu::op_ora, Abs, Read, 4),
    entry("ASL", Cpu::op_asl, Abs, Rmw, 6),
    entry("SLO", Cpu::op_slo, Abs, Rmw, 6),
    // 0x10
    entry("BPL", Cpu::op_bpl, Rel, Other, 2),
    entry("ORA", Cpu::op_ora, Izy, Read, 5),
    entry("NOP", Cpu::op_nop, Imp, Other, 2),
    entry("SLO", Cpu::op_slo, Izy, Rmw, 8),
    entry("NOP", Cpu::op_nop, Zpx, Read, 4),
    entry("ORA", Cpu::op_ora, Zpx, Read, 4),
    entry("ASL", Cpu::op_asl, Zpx, Rmw, 6),
    entry("SLO", Cpu::op_slo, Zpx, Rmw, 6),
    entry("CLC", Cpu::op_clc, Imp, Other, 2),
    entry("ORA", Cpu::op_ora, Aby, Read, 4),
    entry("NOP", Cpu::op_nop, Imp, Other, 2),
    entry("SLO", Cpu::op_slo, Aby, Rmw, 7),
    entry("NOP", Cpu::op_nop, Abx, Read, 4),
    entry("ORA", Cpu::op_ora, Abx, Read, 4),
    entry("ASL", Cpu::op_asl, Abx, Rmw, 7),
    entry("SLO", Cpu::op_slo, Abx, Rmw, 7),
    // 0x20
    entry("JSR", Cpu::op_jsr, AddrMode::None, Other, 6),
    entry("AND", Cpu::op_and, Izx, Read, 6),
    entry("NOP", Cpu::op_nop, Imp, Other, 2),
    entry("RLA", Cpu::op_rla, Izx, Rmw, 8),
    entry("BIT", Cpu::op_bit, Zp, Read, 3),
    entry("AND", Cpu::op_and, Zp, Read, 3),
    entry("ROL", Cpu::op_rol, Zp, Rmw, 5),
    entry("RLA", Cpu::op_rla, Zp, Rmw, 5),
    entry("PLP", Cpu::op_plp, Imp, Other, 4),
    entry("AND", Cpu::op_and, Imm, Read, 2),
    entry("ROL", Cpu::op_rol_a, Acc, Other, 2),
    entry("ANC", Cpu::op_anc, Imm, Read, 2),
    entry("BIT", Cpu::op_bit, Abs, Read, 4),
    entry("AND", Cpu::op_and, Abs, Read, 4),
    entry("ROL", Cpu::op_rol, Abs, Rmw, 6),
    entry("RLA", Cpu::op_rla, Abs, Rmw, 6),
    // 0x30
    entry("BMI", Cpu::op_bmi, Rel, Other, 2),
    entry("AND", Cpu::op_and, Izy, Read, 5),
    entry("NOP", Cpu::op_nop, Imp, Other, 2),
    entry("RLA", Cpu::op_rla, Izy, Rmw, 8),
    entry("NOP", Cpu::op_nop, Zpx, Read, 4),
    entry("AND", Cpu::op_and, Zpx, Read, 4),
    entry("ROL", Cpu::op_rol, Zpx, Rmw, 6),
    entry("RLA", Cpu::op_rla, Zpx, Rmw, 6),
    entry("SEC", Cpu::op_sec, Imp, Other, 2),
    entry("AND", Cpu::op_and, Aby, Read, 4),
    entry("NOP", Cpu::op_nop, Imp, Other, 2),
    entry("RLA", Cpu::op_rla, Aby, Rmw, 7),
    entry("NOP", Cpu::op_nop, Abx, Read, 4),
    entry("AND", Cpu::op_and, Abx, Read, 4),
    entry("ROL", Cpu::op_rol, Abx, Rmw, 7),
    entry("RLA", Cpu::op_rla, Abx, Rmw, 7),
    // 0x40
    entry("RTI", Cpu::op_rti, AddrMode::None, Other, 6),
    entry("EOR", Cpu::op_eor, Izx, Read, 6),
    entry("NOP", Cpu::op_nop, Imp, Other, 2),
    entry("SRE", Cpu::op_sre, Izx, Rmw, 8),
    entry("NOP", Cpu::op_nop, Zp, Read, 3),
    entry("EOR", Cpu::op_eor, Zp, Read, 3),
    entry("LSR", Cpu::op_lsr, Zp, Rmw, 5),
    entry("SRE", Cpu::op_sre, Zp, Rmw, 5),
    entry("PHA", Cpu::op_pha, Imp, Other, 3),
    entry("EOR", Cpu::op_eor, Imm, Read, 2),
    entry("LSR", Cpu::op_lsr_a, Acc, Other, 2),
    entry("ASR", Cpu::op_asr, Imm, Read, 2),
    entry("JMP", Cpu::op_jmp, Abs, Other, 3),
    entry("EOR", Cpu::op_eor, Abs, Read, 4),
    entry("LSR", Cpu::op_lsr, Abs, Rmw, 6),
    entry("SRE", Cpu::op_sre, Abs, Rmw, 6),
    // 0x50
    entry("BVC", Cpu::op_bvc, Rel, Other, 2),
    entry("EOR", Cpu::op_eor, Izy, Read, 5),
    entry("NOP", Cpu::op_nop, Imp, Other, 2),
    entry("SRE", Cpu::op_sre, Izy, Rmw, 8),
    entry("NOP", Cpu::op_nop, Zpx, Read, 4),
    entry("EOR", Cpu::op_eor, Zpx, Read, 4),
    entry("LSR", Cpu::op_lsr, Zpx, Rmw, 6),
    entry("SRE", Cpu::op_sre, Zpx, Rmw, 6),
    entry("CLI", Cpu::op_cli, Imp, Other, 2),
    entry("EOR", Cpu::op_eor, Aby, Read, 4),
    entry("NOP", Cpu::op_nop, Imp, Other, 2),
    entry("SRE", Cpu::op_sre, Aby, Rmw, 7),
    entry("NOP", Cpu::op_nop, Abx, Read, 4),
    entry("EOR", Cpu::op_eor, Abx, Read, 4),
    entry("LSR", Cpu::op_lsr, Abx, Rmw, 7),
    entry("SRE", Cpu::op_sre, Abx, Rmw, 7),
    // 0x60
    entry("RTS", Cpu::op_rts, AddrMode::None, Other, 6),
    entry("ADC", Cpu::op_adc, Izx, Read, 6),
    entry("NOP", Cpu::op_nop, Imp, Other, 2),
    entry("RRA", Cpu::op_rra, Izx, Rmw, 8),
    entry("NOP", Cpu::op_nop, Zp, Read, 3),
    entry("ADC", Cpu::op_adc, Zp, Read, 3),
    entry("ROR", Cpu::op_ror, Zp, Rmw, 5),
    entry("RRA", Cpu::op_rra, Zp, Rmw, 5),
    entry("PLA", Cpu::op_pla, Imp, Other, 4),
    entry("ADC", Cpu::op_adc, Imm, Read, 2),
    entry("ROR", Cpu::op_ror_a, Acc, Other, 2),
    entry("ARR", Cpu::op_arr, Imm, Read, 2),
    entry("JMP", Cpu::op_jmp, Ind, Other, 5),
    entry("ADC", Cpu::op_adc, Abs, Read, 4),
    entry("ROR", Cpu::op_ror, Abs, Rmw, 6),
    entry("RRA", Cpu::op_rra, Abs, Rmw, 6),
    // 0x70
    entry("BVS", Cpu::op_bvs, Rel, Other, 2),
    entry("ADC", Cpu::op_adc, Izy, Read, 5),
    entry("NOP", Cpu::op_nop, Imp, Other, 2),
    entry("RRA", Cpu::op_rra, Izy, Rmw, 8),
    entry("NOP", Cpu::op_nop, Zpx, Read, 4),
    entry("ADC", Cpu::op_adc, Zpx, Read, 4),
    entry("ROR", Cpu::op_ror, Zpx, Rmw, 6),
    entry("RRA", Cpu::op_rra, Zpx, Rmw, 6),
    entry("SEI", Cpu::op_sei, Imp, Other, 2),
    entry("ADC", Cpu::op_adc, Aby, Read, 4),
    entry("NOP", Cpu::op_nop, Imp, Other, 2),
    entry("RRA", Cpu::op_rra, Aby, Rmw, 7),
    entry("NOP", Cpu::op_nop, Abx, Read, 4),
    entry("ADC", Cpu::op_adc, Abx, Read, 4),
    entry("ROR", Cpu::op_ror, Abx, Rmw, 7),
    entry("RRA", Cpu::op_rra, Abx, Rmw, 7),
    // 0x80
    entry("NOP", Cpu::op_nop, Imm, Read, 2),
    entry("STA", Cpu::op_sta, Izx, Write, 6),
    entry("NOP", Cpu::op_nop, Imm, Read, 2),
    entry("SAX", Cpu::op_sax, Izx, Write, 6),
    entry("STY", Cpu::op_sty, Zp, Write, 3),
    entry("STA", Cpu::op_sta, Zp, Write, 3),
    entry("STX", Cpu::op_stx, Zp, Write, 3),
    entry("SAX", Cpu::op_sax, Zp, Write, 3),
    entry("DEY", Cpu::op_dey, Imp, Other, 2),
    entry("NOP", Cpu::op_nop, Imm, Read, 2),
    entry("TXA", Cpu::op_txa, Imp, Other, 2),
    entry("ANE", Cpu::op_ane, Imm, Read, 2),
    entry("STY", Cpu::op_sty, Abs, Write, 4),
    entry("STA", Cpu::op_sta, Abs, Write, 4),
    entry("STX", Cpu::op_stx, Abs, Write, 4),
    entry("SAX", Cpu::op_sax, Abs, Write, 4),
    // 0x90
    entry("BCC", Cpu::op_bcc, Rel, Other, 2),
    entry("STA", Cpu::op_sta, Izy, Write, 6),
    entry("NOP", Cpu::op_nop, Imp, Other, 2),
    entry("SHA", Cpu::op_nop, Izy, Write, 6),
    entry("STY", Cpu::op_sty, Zpx, Write, 4),
    entry("STA", Cpu::op_sta, Zpx, Write, 4),
    entry("STX", Cpu::op_stx, Zpy, Write, 4),
    entry("SAX", Cpu::op_sax, Zpy, Write, 4),
    entry("TYA", Cpu::op_tya, Imp, Other, 2),
    entry("STA", Cpu::op_sta, Aby, Write, 5),
    entry("TXS", Cpu::op_txs, Imp, Other, 2),
    entry("SHS", Cpu::op_nop, Aby, Write, 5),
    entry("SHY", Cpu::op_nop, Abx, Write, 5),
    entry("STA", Cpu::op_sta, Abx, Write, 5),
    entry("SHX", Cpu::op_nop, Aby, Write, 5),
    entry("SHA", Cpu::op_nop, Aby, Write, 5),
    // 0xA0
    entry("LDY", Cpu::op_ldy, Imm, Read, 2),
    entry("LDA", Cpu::op_lda, Izx, Read, 6),
    entry("LDX", Cpu::op_ldx, Imm, Read, 2),
    entry("LAX", Cpu::op_lax, Izx, Read, 6),
    entry("LDY", Cpu::op_ldy, Zp, Read, 3),
    entry("LDA", Cpu::op_lda, Zp, Read, 3),
    entry("LDX", Cpu::op_ldx, Zp, Read, 3),
    entry("LAX", Cpu::op_lax, Zp, Read, 3),
    entry("TAY", Cpu::op_tay, Imp, Other, 2),
    entry("LDA", Cpu::op_lda, Imm, Read, 2),
    entry("TAX", Cpu::op_tax, Imp, Other, 2),
    entry("LXA", Cpu::op_lxa, Imm, Read, 2),
    entry("LDY", Cpu::op_ldy, Abs, Read, 4),
    entry("LDA", Cpu::op_lda, Abs, Read, 4),
    entry("LDX", Cpu::op_ldx, Abs, Read, 4),
    entry("LAX", Cpu::op_lax, Abs, Read, 4),
    // 0xB0
    entry("BCS", Cpu::op_bcs, Rel, Other, 2),
    entry("LDA", Cpu::op_lda, Izy, Read, 5),
    entry("NOP", Cpu::op_nop, Imp, Other, 2),
    entry("LAX", Cpu::op_lax, Izy, Read, 5),
    entry("LDY", Cpu::op_ldy, Zpx, Read, 4),
    entry("LDA", Cpu::op_lda, Zpx, Read, 4),
    entry("LDX", Cpu::op_ldx, Zpy, Read, 4),
    entry("LAX", Cpu::op_lax, Zpy, Read, 4),
    entry("CLV", Cpu::op_clv, Imp, Other, 2),
    entry("LDA", Cpu::op_lda, Aby, Read, 4),
    entry("TSX", Cpu::op_tsx, Imp, Other, 2),
    entry("LAE", Cpu::op_las, Aby, Read, 4),
    entry("LDY", Cpu::op_ldy, Abx, Read, 4),
    entry("LDA", Cpu::op_lda, Abx, Read, 4),
    entry("LDX", Cpu::op_ldx, Aby, Read, 4),
    entry("LAX", Cpu::op_lax, Aby, Read, 4),
    // 0xC0
    entry("CPY", Cpu::op_cpy, Imm, Read, 2),
    entry("CMP", Cpu::op_cmp, Izx, Read, 6),
    entry("NOP", Cpu::op_nop, Imm, Read, 2),
    entry("DCP", Cpu::op_dcp, Izx, Rmw, 8),
    entry("CPY", Cpu::op_cpy, Zp, Read, 3),
    entry("CMP", Cpu::op_cmp, Zp, Read, 3),
    entry("DEC", Cpu::op_dec, Zp, Rmw, 5),
    entry("DCP", Cpu::op_dcp, Zp, Rmw, 5),
    entry("INY", Cpu::op_iny, Imp, Other, 2),
    entry("CMP", Cpu::op_cmp, Imm, Read, 2),
    entry("DEX", Cpu::op_dex, Imp, Other, 2),
    entry("AXS", Cpu::op_axs, Imm, Read, 2),
    entry("CPY", Cpu::op_cpy, Abs, Read, 4),
    entry("CMP", Cpu::op_cmp, Abs, Read, 4),
    entry("DEC", Cpu::op_dec, Abs, Rmw, 6),
    entry("DCP", Cpu::op_dcp, Abs, Rmw, 6),
    // 0xD0
    entry("BNE", Cpu::op_bne, Rel, Other, 2),
    entry("CMP", Cpu::op_cmp, Izy, Read, 5),
    entry("NOP", Cpu::op_nop, Imp, Other, 2),
    entry("DCP", Cpu::op_dcp, Izy, Rmw, 8),
    entry("NOP", Cpu::op_nop, Zpx, Read, 4),
    entry("CMP", Cpu::op_cmp, Zpx, Read, 4),
    entry("DEC", Cpu::op_dec, Zpx, Rmw, 6),
    entry("DCP", Cpu::op_dcp, Zpx, Rmw, 6),
    entry("CLD", Cpu::op_cld, Imp, Other, 2),
    entry("CMP", Cpu::op_cmp, Aby, Read, 4),
    entry("NOP", Cpu::op_nop, Imp, Other, 2),
    entry("DCP", Cpu::op_dcp, Aby, Rmw, 7),
    entry("NOP", Cpu::op_nop, Abx, Read, 4),
    entry("CMP", Cpu::op_cmp, Abx, Read, 4),
    entry("DEC", Cpu::op_dec, Abx, Rmw, 7),
    entry("DCP", Cpu::op_dcp, Abx, Rmw, 7),
    // 0xE0
    entry("CPX", Cpu::op_cpx, Imm, Read, 2),
    entry("SBC", Cpu::op_sbc, Izx, Read, 6),
    entry("NOP", Cpu::op_nop, Imm, Read, 2),
    entry("ISC", Cpu::op_isc, Izx, Rmw, 8),
    entry("CPX", Cpu::op_cpx, Zp, Read, 3),
    entry("SBC", Cpu::op_sbc, Zp, Read, 3),
    entry("INC", Cpu::op_inc, Zp, Rmw, 5),
    entry("ISC", Cpu::op_isc, Zp, Rmw, 5),
    entry("INX", Cpu::op_inx, Imp, Other, 2),
    entry("SBC", Cpu::op_sbc, Imm, Read, 2),
    entry("NOP", Cpu::op_nop, Imp, Other, 2),
    entry("SBC", Cpu::op_sbc, Imm, Read, 2),
    entry("CPX", Cpu::op_cpx, Abs, Read, 4),
    entry("SBC", Cpu::op_sbc, Abs, Read, 4),
    entry("INC", Cpu::op_inc, Abs, Rmw, 6),
    entry("ISC", Cpu::op_isc, Abs, Rmw, 6),
    // 0xF0
    entry("BEQ", Cpu::op_beq, Rel, Other, 2),
    entry("SBC", Cpu::op_sbc, Izy, Read, 5),
    entry("NOP", Cpu::op_nop, Imp, Other, 2),
    entry("ISC", Cpu::op_isc, Izy, Rmw, 8),
    entry("NOP", Cpu::op_nop, Zpx, Read, 4),
    entry("SBC", Cpu::op_sbc, Zpx, Read, 4),
    entry("INC", Cpu::op_inc, Zpx, Rmw, 6),
    entry("ISC", Cpu::op_isc, Zpx, Rmw, 6),
    entry("SED", Cpu::op_sed, Imp, Other, 2),
    entry("SBC", Cpu::op_sbc, Aby, Read, 4),
    entry("NOP", Cpu::op_nop, Imp, Other, 2),
    entry("ISC", Cpu::op_isc, Aby, Rmw, 7),
    entry("NOP", Cpu::op_nop, Abx, Read, 4),
    entry("SBC", Cpu::op_sbc, Abx, Read, 4),
    entry("INC", Cpu::op_inc, Abx, Rmw, 7),
    entry("ISC", Cpu::op_isc, Abx, Rmw, 7),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_256_entries_with_sane_cycle_counts() {
        for (i, e) in OPCODES.iter().enumerate() {
            assert!(
                (2..=8).contains(&e.cycles),
                "opcode {i:#04X} has cycle count {}",
                e.cycles
            );
        }
    }

    #[test]
    fn jam_slots_decode_as_two_cycle_nops() {
        for op in [0x02, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0xB2, 0xD2, 0xF2] {
            let e = &OPCODES[op];
            assert_eq!(e.mnemonic, "NOP");
            assert_eq!(e.cycles, 2);
        }
    }

    #[test]
    fn unofficial_rmw_on_indirect_modes_takes_eight_cycles() {
        for op in [0x03, 0x13, 0x23, 0x33, 0x43, 0x53, 0x63, 0x73, 0xC3, 0xD3, 0xE3, 0xF3] {
            assert_eq!(OPCODES[op].cycles, 8, "opcode {op:#04X}");
            assert_eq!(OPCODES[op].kind, AccessKind::Rmw);
        }
    }
}
