use log::error;

use super::registers::{Reg16, Reg8};
use super::Cpu;
use crate::error::{CoreError, Result};
use crate::mmu::memory::Memory;

impl Cpu {
    /// Decodes and runs one primary (non-`0xCB`) opcode, returning the
    /// M-cycles it consumed. `pc` is the address the opcode was fetched
    /// from, used only to annotate `IllegalOpcode`.
    pub(super) fn execute(&mut self, op: u8, pc: u16) -> Result<u32> {
        // 0x40-0x7F: LD r,r' (8x8 grid), except 0x76 = HALT.
        if (0x40..=0x7F).contains(&op) && op != 0x76 {
            let dst = (op >> 3) & 0x07;
            let src = op & 0x07;
            let val = self.read_r8(src);
            self.write_r8(dst, val);
            return Ok(if dst == 6 || src == 6 { 2 } else { 1 });
        }

        // 0x80-0xBF: ALU A,r (8 ops x 8 operands).
        if (0x80..=0xBF).contains(&op) {
            let src = op & 0x07;
            let val = self.read_r8(src);
            match (op >> 3) & 0x07 {
                0 => self.alu_add(val),
                1 => self.alu_adc(val),
                2 => self.alu_sub(val),
                3 => self.alu_sbc(val),
                4 => self.alu_and(val),
                5 => self.alu_xor(val),
                6 => self.alu_or(val),
                _ => self.alu_cp(val),
            }
            return Ok(if src == 6 { 2 } else { 1 });
        }

        let cycles = match op {
            0x00 => 1,

            0x01 => {
                let v = self.fetch_word();
                self.reg.write16(Reg16::BC, v);
                3
            }
            0x02 => {
                let a = self.reg.read8(Reg8::A);
                self.bus.write8(self.reg.read16(Reg16::BC), a);
                2
            }
            0x03 => {
                let v = self.reg.read16(Reg16::BC).wrapping_add(1);
                self.reg.write16(Reg16::BC, v);
                2
            }
            0x04 => {
                let r = self.alu_inc(self.reg.read8(Reg8::B));
                self.reg.write8(Reg8::B, r);
                1
            }
            0x05 => {
                let r = self.alu_dec(self.reg.read8(Reg8::B));
                self.reg.write8(Reg8::B, r);
                1
            }
            0x06 => {
                let v = self.fetch_byte();
                self.reg.write8(Reg8::B, v);
                2
            }
            0x07 => {
                let r = self.rotate_left(self.reg.read8(Reg8::A));
                self.reg.write8(Reg8::A, r);
                self.reg.flags_mut().set_flag(super::registers::Flags::ZERO, false);
                1
            }
            0x08 => {
                let addr = self.fetch_word();
                let sp = self.reg.read16(Reg16::SP);
                self.bus.write16(addr, sp);
                5
            }
            0x09 => {
                self.alu_add_hl(self.reg.read16(Reg16::BC));
                2
            }
            0x0A => {
                let v = self.bus.read8(self.reg.read16(Reg16::BC));
                self.reg.write8(Reg8::A, v);
                2
            }
            0x0B => {
                let v = self.reg.read16(Reg16::BC).wrapping_sub(1);
                self.reg.write16(Reg16::BC, v);
                2
            }
            0x0C => {
                let r = self.alu_inc(self.reg.read8(Reg8::C));
                self.reg.write8(Reg8::C, r);
                1
            }
            0x0D => {
                let r = self.alu_dec(self.reg.read8(Reg8::C));
                self.reg.write8(Reg8::C, r);
                1
            }
            0x0E => {
                let v = self.fetch_byte();
                self.reg.write8(Reg8::C, v);
                2
            }
            0x0F => {
                let r = self.rotate_right(self.reg.read8(Reg8::A));
                self.reg.write8(Reg8::A, r);
                self.reg.flags_mut().set_flag(super::registers::Flags::ZERO, false);
                1
            }

            0x10 => {
                self.fetch_byte(); // STOP's mandatory (and ignored) second byte.
                return Err(CoreError::StopRequested);
            }

            0x11 => {
                let v = self.fetch_word();
                self.reg.write16(Reg16::DE, v);
                3
            }
            0x12 => {
                let a = self.reg.read8(Reg8::A);
                self.bus.write8(self.reg.read16(Reg16::DE), a);
                2
            }
            0x13 => {
                let v = self.reg.read16(Reg16::DE).wrapping_add(1);
                self.reg.write16(Reg16::DE, v);
                2
            }
            0x14 => {
                let r = self.alu_inc(self.reg.read8(Reg8::D));
                self.reg.write8(Reg8::D, r);
                1
            }
            0x15 => {
                let r = self.alu_dec(self.reg.read8(Reg8::D));
                self.reg.write8(Reg8::D, r);
                1
            }
            0x16 => {
                let v = self.fetch_byte();
                self.reg.write8(Reg8::D, v);
                2
            }
            0x17 => {
                let r = self.rotate_left_through_carry(self.reg.read8(Reg8::A));
                self.reg.write8(Reg8::A, r);
                self.reg.flags_mut().set_flag(super::registers::Flags::ZERO, false);
                1
            }
            0x18 => {
                self.jump_relative();
                3
            }
            0x19 => {
                self.alu_add_hl(self.reg.read16(Reg16::DE));
                2
            }
            0x1A => {
                let v = self.bus.read8(self.reg.read16(Reg16::DE));
                self.reg.write8(Reg8::A, v);
                2
            }
            0x1B => {
                let v = self.reg.read16(Reg16::DE).wrapping_sub(1);
                self.reg.write16(Reg16::DE, v);
                2
            }
            0x1C => {
                let r = self.alu_inc(self.reg.read8(Reg8::E));
                self.reg.write8(Reg8::E, r);
                1
            }
            0x1D => {
                let r = self.alu_dec(self.reg.read8(Reg8::E));
                self.reg.write8(Reg8::E, r);
                1
            }
            0x1E => {
                let v = self.fetch_byte();
                self.reg.write8(Reg8::E, v);
                2
            }
            0x1F => {
                let r = self.rotate_right_through_carry(self.reg.read8(Reg8::A));
                self.reg.write8(Reg8::A, r);
                self.reg.flags_mut().set_flag(super::registers::Flags::ZERO, false);
                1
            }

            0x20 => self.jump_relative_if(!self.reg.flags().z()),
            0x21 => {
                let v = self.fetch_word();
                self.reg.write16(Reg16::HL, v);
                3
            }
            0x22 => {
                let a = self.reg.read8(Reg8::A);
                let hl = self.reg.read16(Reg16::HL);
                self.bus.write8(hl, a);
                self.reg.write16(Reg16::HL, hl.wrapping_add(1));
                2
            }
            0x23 => {
                let v = self.reg.read16(Reg16::HL).wrapping_add(1);
                self.reg.write16(Reg16::HL, v);
                2
            }
            0x24 => {
                let r = self.alu_inc(self.reg.read8(Reg8::H));
                self.reg.write8(Reg8::H, r);
                1
            }
            0x25 => {
                let r = self.alu_dec(self.reg.read8(Reg8::H));
                self.reg.write8(Reg8::H, r);
                1
            }
            0x26 => {
                let v = self.fetch_byte();
                self.reg.write8(Reg8::H, v);
                2
            }
            0x27 => {
                self.alu_daa();
                1
            }
            0x28 => self.jump_relative_if(self.reg.flags().z()),
            0x29 => {
                self.alu_add_hl(self.reg.read16(Reg16::HL));
                2
            }
            0x2A => {
                let hl = self.reg.read16(Reg16::HL);
                let v = self.bus.read8(hl);
                self.reg.write8(Reg8::A, v);
                self.reg.write16(Reg16::HL, hl.wrapping_add(1));
                2
            }
            0x2B => {
                let v = self.reg.read16(Reg16::HL).wrapping_sub(1);
                self.reg.write16(Reg16::HL, v);
                2
            }
            0x2C => {
                let r = self.alu_inc(self.reg.read8(Reg8::L));
                self.reg.write8(Reg8::L, r);
                1
            }
            0x2D => {
                let r = self.alu_dec(self.reg.read8(Reg8::L));
                self.reg.write8(Reg8::L, r);
                1
            }
            0x2E => {
                let v = self.fetch_byte();
                self.reg.write8(Reg8::L, v);
                2
            }
            0x2F => {
                self.alu_cpl();
                1
            }

            0x30 => self.jump_relative_if(!self.reg.flags().c()),
            0x31 => {
                let v = self.fetch_word();
                self.reg.write16(Reg16::SP, v);
                3
            }
            0x32 => {
                let a = self.reg.read8(Reg8::A);
                let hl = self.reg.read16(Reg16::HL);
                self.bus.write8(hl, a);
                self.reg.write16(Reg16::HL, hl.wrapping_sub(1));
                2
            }
            0x33 => {
                let v = self.reg.read16(Reg16::SP).wrapping_add(1);
                self.reg.write16(Reg16::SP, v);
                2
            }
            0x34 => {
                let hl = self.reg.read16(Reg16::HL);
                let v = self.bus.read8(hl);
                let r = self.alu_inc(v);
                self.bus.write8(hl, r);
                3
            }
            0x35 => {
                let hl = self.reg.read16(Reg16::HL);
                let v = self.bus.read8(hl);
                let r = self.alu_dec(v);
                self.bus.write8(hl, r);
                3
            }
            0x36 => {
                let v = self.fetch_byte();
                let hl = self.reg.read16(Reg16::HL);
                self.bus.write8(hl, v);
                3
            }
            0x37 => {
                self.alu_scf();
                1
            }
            0x38 => self.jump_relative_if(self.reg.flags().c()),
            0x39 => {
                self.alu_add_hl(self.reg.read16(Reg16::SP));
                2
            }
            0x3A => {
                let hl = self.reg.read16(Reg16::HL);
                let v = self.bus.read8(hl);
                self.reg.write8(Reg8::A, v);
                self.reg.write16(Reg16::HL, hl.wrapping_sub(1));
                2
            }
            0x3B => {
                let v = self.reg.read16(Reg16::SP).wrapping_sub(1);
                self.reg.write16(Reg16::SP, v);
                2
            }
            0x3C => {
                let r = self.alu_inc(self.reg.read8(Reg8::A));
                self.reg.write8(Reg8::A, r);
                1
            }
            0x3D => {
                let r = self.alu_dec(self.reg.read8(Reg8::A));
                self.reg.write8(Reg8::A, r);
                1
            }
            0x3E => {
                let v = self.fetch_byte();
                self.reg.write8(Reg8::A, v);
                2
            }
            0x3F => {
                self.alu_ccf();
                1
            }

            0x76 => {
                self.execute_halt();
                1
            }

            0xC0 => self.ret_if(!self.reg.flags().z(), 2, 5),
            0xC1 => {
                let v = self.pop16();
                self.reg.write16(Reg16::BC, v);
                3
            }
            0xC2 => self.jump_if(!self.reg.flags().z(), 3, 4),
            0xC3 => {
                let target = self.fetch_word();
                self.reg.write16(Reg16::PC, target);
                4
            }
            0xC4 => self.call_if(!self.reg.flags().z(), 3, 6),
            0xC5 => {
                self.push16(self.reg.read16(Reg16::BC));
                4
            }
            0xC6 => {
                let v = self.fetch_byte();
                self.alu_add(v);
                2
            }
            0xC7 => self.rst(0x00),
            0xC8 => self.ret_if(self.reg.flags().z(), 2, 5),
            0xC9 => {
                let target = self.pop16();
                self.reg.write16(Reg16::PC, target);
                4
            }
            0xCA => self.jump_if(self.reg.flags().z(), 3, 4),
            0xCC => self.call_if(self.reg.flags().z(), 3, 6),
            0xCD => {
                let target = self.fetch_word();
                let ret_addr = self.reg.read16(Reg16::PC);
                self.push16(ret_addr);
                self.reg.write16(Reg16::PC, target);
                6
            }
            0xCE => {
                let v = self.fetch_byte();
                self.alu_adc(v);
                2
            }
            0xCF => self.rst(0x08),

            0xD0 => self.ret_if(!self.reg.flags().c(), 2, 5),
            0xD1 => {
                let v = self.pop16();
                self.reg.write16(Reg16::DE, v);
                3
            }
            0xD2 => self.jump_if(!self.reg.flags().c(), 3, 4),
            0xD4 => self.call_if(!self.reg.flags().c(), 3, 6),
            0xD5 => {
                self.push16(self.reg.read16(Reg16::DE));
                4
            }
            0xD6 => {
                let v = self.fetch_byte();
                self.alu_sub(v);
                2
            }
            0xD7 => self.rst(0x10),
            0xD8 => self.ret_if(self.reg.flags().c(), 2, 5),
            0xD9 => {
                let target = self.pop16();
                self.reg.write16(Reg16::PC, target);
                self.reg.set_ime(true);
                4
            }
            0xDA => self.jump_if(self.reg.flags().c(), 3, 4),
            0xDC => self.call_if(self.reg.flags().c(), 3, 6),
            0xDE => {
                let v = self.fetch_byte();
                self.alu_sbc(v);
                2
            }
            0xDF => self.rst(0x18),

            0xE0 => {
                let off = self.fetch_byte();
                let a = self.reg.read8(Reg8::A);
                self.bus.write8(0xFF00 + off as u16, a);
                3
            }
            0xE1 => {
                let v = self.pop16();
                self.reg.write16(Reg16::HL, v);
                3
            }
            0xE2 => {
                let c = self.reg.read8(Reg8::C);
                let a = self.reg.read8(Reg8::A);
                self.bus.write8(0xFF00 + c as u16, a);
                2
            }
            0xE5 => {
                self.push16(self.reg.read16(Reg16::HL));
                4
            }
            0xE6 => {
                let v = self.fetch_byte();
                self.alu_and(v);
                2
            }
            0xE7 => self.rst(0x20),
            0xE8 => {
                let e = self.fetch_byte() as i8;
                let r = self.alu_add_sp_signed(e);
                self.reg.write16(Reg16::SP, r);
                4
            }
            0xE9 => {
                let hl = self.reg.read16(Reg16::HL);
                self.reg.write16(Reg16::PC, hl);
                1
            }
            0xEA => {
                let addr = self.fetch_word();
                let a = self.reg.read8(Reg8::A);
                self.bus.write8(addr, a);
                4
            }
            0xEE => {
                let v = self.fetch_byte();
                self.alu_xor(v);
                2
            }
            0xEF => self.rst(0x28),

            0xF0 => {
                let off = self.fetch_byte();
                let v = self.bus.read8(0xFF00 + off as u16);
                self.reg.write8(Reg8::A, v);
                3
            }
            0xF1 => {
                let v = self.pop16();
                self.reg.write16(Reg16::AF, v);
                3
            }
            0xF2 => {
                let c = self.reg.read8(Reg8::C);
                let v = self.bus.read8(0xFF00 + c as u16);
                self.reg.write8(Reg8::A, v);
                2
            }
            0xF3 => {
                self.reg.set_ime(false);
                1
            }
            0xF5 => {
                self.push16(self.reg.read16(Reg16::AF));
                4
            }
            0xF6 => {
                let v = self.fetch_byte();
                self.alu_or(v);
                2
            }
            0xF7 => self.rst(0x30),
            0xF8 => {
                let e = self.fetch_byte() as i8;
                let r = self.alu_add_sp_signed(e);
                self.reg.write16(Reg16::HL, r);
                3
            }
            0xF9 => {
                let hl = self.reg.read16(Reg16::HL);
                self.reg.write16(Reg16::SP, hl);
                2
            }
            0xFA => {
                let addr = self.fetch_word();
                let v = self.bus.read8(addr);
                self.reg.write8(Reg8::A, v);
                4
            }
            0xFB => {
                self.arm_ei();
                1
            }
            0xFE => {
                let v = self.fetch_byte();
                self.alu_cp(v);
                2
            }
            0xFF => self.rst(0x38),

            0xD3 | 0xDB | 0xDD | 0xE3 | 0xE4 | 0xEB | 0xEC | 0xED | 0xF4 | 0xFC | 0xFD => {
                error!("illegal opcode {:#04x} at PC={:#06x}", op, pc);
                return Err(CoreError::IllegalOpcode { opcode: op, pc });
            }

            _ => unreachable!("every remaining opcode byte is handled above"),
        };

        Ok(cycles)
    }

    /// `JR e8`: relative jump, always taken.
    fn jump_relative(&mut self) {
        let e = self.fetch_byte() as i8;
        let pc = self.reg.read16(Reg16::PC);
        self.reg.write16(Reg16::PC, pc.wrapping_add(e as i16 as u16));
    }

    /// `JR cc,e8`: the offset byte is always consumed, whether or not the
    /// jump is taken.
    fn jump_relative_if(&mut self, condition: bool) -> u32 {
        let e = self.fetch_byte() as i8;
        if condition {
            let pc = self.reg.read16(Reg16::PC);
            self.reg.write16(Reg16::PC, pc.wrapping_add(e as i16 as u16));
            3
        } else {
            2
        }
    }

    fn jump_if(&mut self, condition: bool, not_taken: u32, taken: u32) -> u32 {
        let target = self.fetch_word();
        if condition {
            self.reg.write16(Reg16::PC, target);
            taken
        } else {
            not_taken
        }
    }

    fn call_if(&mut self, condition: bool, not_taken: u32, taken: u32) -> u32 {
        let target = self.fetch_word();
        if condition {
            let ret_addr = self.reg.read16(Reg16::PC);
            self.push16(ret_addr);
            self.reg.write16(Reg16::PC, target);
            taken
        } else {
            not_taken
        }
    }

    fn ret_if(&mut self, condition: bool, not_taken: u32, taken: u32) -> u32 {
        if condition {
            let target = self.pop16();
            self.reg.write16(Reg16::PC, target);
            taken
        } else {
            not_taken
        }
    }

    fn rst(&mut self, vector: u16) -> u32 {
        let ret_addr = self.reg.read16(Reg16::PC);
        self.push16(ret_addr);
        self.reg.write16(Reg16::PC, vector);
        4
    }
}
