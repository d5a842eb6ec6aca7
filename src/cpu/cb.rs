use super::Cpu;
use log::trace;

impl Cpu {
    /// Decodes and runs one `0xCB`-prefixed opcode. All 256 extension
    /// opcodes share one regular shape: bits 0-2 select the operand
    /// (`B,C,D,E,H,L,(HL),A`), bits 3-5 select the bit index (for
    /// `BIT`/`RES`/`SET`) or the rotate/shift variant, and bits 6-7 select
    /// the group -- so this is decoded algorithmically rather than via a
    /// 256-arm match.
    pub(super) fn execute_cb(&mut self, op: u8) -> u32 {
        trace!("(cb) {:#04x} {}", op, super::opcodes::describe_cb(op).mnemonic);

        let operand_idx = op & 0x07;
        let is_hl = operand_idx == 6;
        let val = self.read_r8(operand_idx);

        match op >> 6 {
            0 => {
                let result = match (op >> 3) & 0x07 {
                    0 => self.rotate_left(val),
                    1 => self.rotate_right(val),
                    2 => self.rotate_left_through_carry(val),
                    3 => self.rotate_right_through_carry(val),
                    4 => self.shift_left_arithmetic(val),
                    5 => self.shift_right_arithmetic(val),
                    6 => self.alu_swap(val),
                    _ => self.shift_right_logical(val),
                };
                // Unlike the accumulator-only rotate opcodes (which always
                // clear Z), the CB forms set Z from the result. `rotate_*`
                // leaves Z untouched so it can be shared by both callers;
                // set it here instead.
                self.reg
                    .flags_mut()
                    .set_flag(super::registers::Flags::ZERO, result == 0);
                self.write_r8(operand_idx, result);
                if is_hl {
                    4
                } else {
                    2
                }
            }
            1 => {
                let bit = (op >> 3) & 0x07;
                self.alu_bit(bit, val);
                if is_hl {
                    3
                } else {
                    2
                }
            }
            2 => {
                let bit = (op >> 3) & 0x07;
                let result = val & !(1 << bit);
                self.write_r8(operand_idx, result);
                if is_hl {
                    4
                } else {
                    2
                }
            }
            _ => {
                let bit = (op >> 3) & 0x07;
                let result = val | (1 << bit);
                self.write_r8(operand_idx, result);
                if is_hl {
                    4
                } else {
                    2
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::{rom_only::RomOnly, Cartridge};
    use crate::cpu::registers::Reg8;
    use crate::mmu::Bus;

    fn cpu() -> Cpu {
        Cpu::new(Bus::new(Cartridge::Flat(RomOnly::new(vec![0u8; 0x8000]))))
    }

    #[test]
    fn rlc_b_sets_zero_and_carry_from_result() {
        let mut c = cpu();
        c.reg.write8(Reg8::B, 0x80);
        let cycles = c.execute_cb(0x00); // RLC B
        assert_eq!(c.reg.read8(Reg8::B), 0x01);
        assert!(c.reg.flags().c());
        assert!(!c.reg.flags().z());
        assert_eq!(cycles, 2);
    }

    #[test]
    fn bit_on_hl_operand_costs_three_cycles_and_does_not_write() {
        let mut c = cpu();
        c.reg.write16(crate::cpu::registers::Reg16::HL, 0xC000);
        c.bus_mut().write8(0xC000, 0x00);
        let cycles = c.execute_cb(0x46); // BIT 0,(HL)
        assert!(c.reg.flags().z());
        assert_eq!(cycles, 3);
    }

    #[test]
    fn set_then_res_round_trips_a_single_bit() {
        let mut c = cpu();
        c.reg.write8(Reg8::A, 0x00);
        c.execute_cb(0xFF); // SET 7,A
        assert_eq!(c.reg.read8(Reg8::A), 0x80);
        c.execute_cb(0xBF); // RES 7,A
        assert_eq!(c.reg.read8(Reg8::A), 0x00);
    }

    #[test]
    fn swap_exchanges_nibbles() {
        let mut c = cpu();
        c.reg.write8(Reg8::A, 0x12);
        c.execute_cb(0x37); // SWAP A
        assert_eq!(c.reg.read8(Reg8::A), 0x21);
    }
}
