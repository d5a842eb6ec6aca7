mod alu;
mod cb;
mod execute;
pub mod interrupts;
pub mod opcodes;
pub mod registers;

use log::{debug, trace};

use self::interrupts::InterruptKind;
use self::registers::{Reg16, Reg8, Registers};
use crate::error::{CoreError, Result};
use crate::mmu::memory::Memory;
use crate::mmu::Bus;

/// The DMG-01 had a Sharp LR35902 CPU (speculated to be a SM83 core), a
/// hybrid of the Z80 and 8080 instruction sets. See
/// <https://gbdev.io/gb-opcodes/optables/errata>.
///
/// The CPU owns the bus outright (§5): there is no PPU/timer thread
/// contending for it in this core, so unlike the teacher crate's
/// `Rc<RefCell<Mmu>>`, plain ownership is enough.
pub struct Cpu {
    reg: Registers,
    bus: Bus,

    /// Set by `HALT` when no interrupt dispatch occurs, cleared when an
    /// interrupt (pending, regardless of IME) wakes the CPU back up.
    halted: bool,

    /// Set when `HALT` executes with IME disabled and an interrupt is
    /// already pending: the *next* opcode fetch reads PC but does not
    /// advance it, so that instruction effectively executes twice
    /// (§4.3's "HALT bug").
    halt_bug: bool,

    /// Countdown for `EI`'s one-instruction-delayed enable. `2` when
    /// freshly armed by `EI`; decremented once per `step()` and IME is
    /// enabled on the transition from `1` to `0`, i.e. after the
    /// instruction following `EI` has executed, not before.
    ime_delay: u8,
}

impl Cpu {
    pub fn new(bus: Bus) -> Self {
        Self {
            reg: Registers::new(),
            bus,
            halted: false,
            halt_bug: false,
            ime_delay: 0,
        }
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    /// Runs one fetch-decode-execute step (or one interrupt dispatch, or
    /// one idle HALT tick) and returns the M-cycles consumed. Returns
    /// `Err(CoreError::StopRequested)` if the instruction was `STOP`, and
    /// `Err(CoreError::IllegalOpcode)` if it decoded to one of the bytes
    /// with no defined operation.
    pub fn step(&mut self) -> Result<u32> {
        self.apply_ei_delay();

        if let Some(kind) = self.pending_interrupt() {
            if self.reg.ime() {
                self.halted = false;
                return Ok(self.dispatch_interrupt(kind));
            } else if self.halted {
                // An enabled-but-masked-by-IME interrupt still wakes the
                // CPU from HALT; it just isn't serviced.
                self.halted = false;
            }
        }

        if self.halted {
            return Ok(1);
        }

        let pc = self.reg.read16(Reg16::PC);
        let op = self.fetch_opcode();

        if op == 0xCB {
            let cb_op = self.fetch_byte();
            return Ok(self.execute_cb(cb_op));
        }

        trace!("{:#06x}: {:#04x} {}", pc, op, opcodes::describe(op).mnemonic);
        self.execute(op, pc)
    }

    fn apply_ei_delay(&mut self) {
        if self.ime_delay > 0 {
            self.ime_delay -= 1;
            if self.ime_delay == 0 {
                self.reg.set_ime(true);
            }
        }
    }

    pub(super) fn arm_ei(&mut self) {
        self.ime_delay = 2;
    }

    fn pending_interrupt(&self) -> Option<InterruptKind> {
        InterruptKind::pending(self.bus.if_flags(), self.bus.ie())
    }

    /// §4.3's dispatch sequence: 2 M-cycles of internal delay, push PC (2
    /// M-cycles), jump to the vector (1 M-cycle) = 5 M-cycles total.
    /// Clears IME and the serviced interrupt's IF bit.
    fn dispatch_interrupt(&mut self, kind: InterruptKind) -> u32 {
        debug!("dispatching interrupt {:?}", kind);
        self.reg.set_ime(false);
        self.bus.clear_interrupt(kind);
        let pc = self.reg.read16(Reg16::PC);
        self.push16(pc);
        self.reg.write16(Reg16::PC, kind.vector());
        5
    }

    /// Reads the opcode at PC. Under the HALT bug, PC is read but not
    /// advanced, so the following fetch reads the same byte again.
    fn fetch_opcode(&mut self) -> u8 {
        let pc = self.reg.read16(Reg16::PC);
        let op = self.bus.read8(pc);
        if self.halt_bug {
            self.halt_bug = false;
        } else {
            self.reg.write16(Reg16::PC, pc.wrapping_add(1));
        }
        op
    }

    fn fetch_byte(&mut self) -> u8 {
        let pc = self.reg.bump_pc();
        self.bus.read8(pc)
    }

    fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch_byte();
        let hi = self.fetch_byte();
        u16::from_le_bytes([lo, hi])
    }

    fn read_r8(&mut self, idx: u8) -> u8 {
        match idx {
            0 => self.reg.read8(Reg8::B),
            1 => self.reg.read8(Reg8::C),
            2 => self.reg.read8(Reg8::D),
            3 => self.reg.read8(Reg8::E),
            4 => self.reg.read8(Reg8::H),
            5 => self.reg.read8(Reg8::L),
            6 => {
                let hl = self.reg.read16(Reg16::HL);
                self.bus.read8(hl)
            }
            7 => self.reg.read8(Reg8::A),
            _ => unreachable!("3-bit register index"),
        }
    }

    fn write_r8(&mut self, idx: u8, val: u8) {
        match idx {
            0 => self.reg.write8(Reg8::B, val),
            1 => self.reg.write8(Reg8::C, val),
            2 => self.reg.write8(Reg8::D, val),
            3 => self.reg.write8(Reg8::E, val),
            4 => self.reg.write8(Reg8::H, val),
            5 => self.reg.write8(Reg8::L, val),
            6 => {
                let hl = self.reg.read16(Reg16::HL);
                self.bus.write8(hl, val);
            }
            7 => self.reg.write8(Reg8::A, val),
            _ => unreachable!("3-bit register index"),
        }
    }

    fn push16(&mut self, val: u16) {
        let sp = self.reg.read16(Reg16::SP).wrapping_sub(2);
        self.reg.write16(Reg16::SP, sp);
        self.bus.write16(sp, val);
    }

    fn pop16(&mut self) -> u16 {
        let sp = self.reg.read16(Reg16::SP);
        let val = self.bus.read16(sp);
        self.reg.write16(Reg16::SP, sp.wrapping_add(2));
        val
    }

    /// Reconciles `HALT`'s two behaviors: a plain halt, or (when IME is
    /// off and an interrupt is already pending) the HALT bug.
    fn execute_halt(&mut self) {
        if !self.reg.ime() && self.pending_interrupt().is_some() {
            self.halt_bug = true;
        } else {
            self.halted = true;
        }
    }

    /// A one-line register dump, for `--testing` CLI output.
    pub fn dump_registers(&self) -> String {
        format!(
            "AF={:#06x} BC={:#06x} DE={:#06x} HL={:#06x} SP={:#06x} PC={:#06x} IME={}",
            self.reg.read16(Reg16::AF),
            self.reg.read16(Reg16::BC),
            self.reg.read16(Reg16::DE),
            self.reg.read16(Reg16::HL),
            self.reg.read16(Reg16::SP),
            self.reg.read16(Reg16::PC),
            self.reg.ime(),
        )
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("reg", &self.reg)
            .field("halted", &self.halted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::{rom_only::RomOnly, Cartridge};

    fn cpu_with_rom(rom: Vec<u8>) -> Cpu {
        let mut image = rom;
        image.resize(0x8000, 0);
        Cpu::new(Bus::new(Cartridge::Flat(RomOnly::new(image))))
    }

    #[test]
    fn nop_advances_pc_by_one_and_takes_one_m_cycle() {
        let mut cpu = cpu_with_rom(vec![0x00]);
        let cycles = cpu.step().unwrap();
        assert_eq!(cycles, 1);
        assert_eq!(cpu.reg.read16(Reg16::PC), 1);
    }

    #[test]
    fn stop_is_reported_as_an_error_not_a_panic() {
        let mut cpu = cpu_with_rom(vec![0x10, 0x00]);
        assert_eq!(cpu.step(), Err(CoreError::StopRequested));
    }

    #[test]
    fn undefined_opcode_is_illegal_opcode_error() {
        let mut cpu = cpu_with_rom(vec![0xD3]);
        assert_eq!(
            cpu.step(),
            Err(CoreError::IllegalOpcode {
                opcode: 0xD3,
                pc: 0x0000
            })
        );
    }

    #[test]
    fn ei_takes_effect_after_the_following_instruction() {
        // EI ; NOP ; NOP -- IME must still be false after the first NOP,
        // and true by the time the second one runs.
        let mut cpu = cpu_with_rom(vec![0xFB, 0x00, 0x00]);
        cpu.step().unwrap(); // EI
        assert!(!cpu.reg.ime());
        cpu.step().unwrap(); // NOP (delay armed during this call)
        assert!(!cpu.reg.ime());
        cpu.step().unwrap(); // NOP (IME takes effect at the end of the previous step)
        assert!(cpu.reg.ime());
    }

    #[test]
    fn reti_latency_takes_the_interrupt_only_after_the_instruction_following_ei() {
        // boundary scenario 5: IME=0, IF=0x01, IE=0x01, PC=0x0100 -> EI; NOP; ...
        // Step 1 runs EI; IME is still 0 afterwards. Step 2 runs NOP, with
        // EI's delay counted down but not yet zero, so IME is still 0. Only
        // at the start of step 3 does the delay reach zero and IME latch
        // true -- and since that happens before step 3's own fetch, it is
        // the interrupt dispatch that runs, not a third instruction.
        let mut rom = vec![0u8; 0x8000];
        rom[0x0100] = 0xFB; // EI
        rom[0x0101] = 0x00; // NOP
        let mut cpu = cpu_with_rom(rom);
        cpu.reg.write16(Reg16::PC, 0x0100);
        cpu.reg.write16(Reg16::SP, 0xFFFE);
        cpu.bus_mut().set_if_flags(InterruptKind::VBlank.mask());
        cpu.bus_mut().write8(0xFFFF, InterruptKind::VBlank.mask());

        cpu.step().unwrap(); // EI
        assert!(!cpu.reg.ime());
        assert_eq!(cpu.reg.read16(Reg16::PC), 0x0101);

        cpu.step().unwrap(); // NOP (delay armed by EI is still counting down)
        assert!(!cpu.reg.ime());
        assert_eq!(cpu.reg.read16(Reg16::PC), 0x0102);

        cpu.step().unwrap(); // IME latches true, then the interrupt dispatches immediately
        assert_eq!(cpu.reg.read16(Reg16::PC), InterruptKind::VBlank.vector());
        assert!(!cpu.reg.ime());
        assert_eq!(cpu.bus().if_flags() & InterruptKind::VBlank.mask(), 0);
    }

    #[test]
    fn halt_bug_replays_the_following_byte() {
        // HALT with IME off and an interrupt already pending does not
        // actually halt; PC fails to advance past HALT, so the next
        // opcode fetch re-reads the HALT-following byte (0x3C, INC A)
        // as if it appeared twice.
        let mut cpu = cpu_with_rom(vec![0x76, 0x3C]);
        cpu.bus_mut().set_if_flags(InterruptKind::VBlank.mask());
        cpu.bus_mut().write8(0xFFFF, InterruptKind::VBlank.mask());
        cpu.step().unwrap(); // HALT: detects the bug, does not set `halted`
        assert!(!cpu.halted);
        cpu.step().unwrap(); // first INC A
        assert_eq!(cpu.reg.read16(Reg16::PC), 1);
        assert_eq!(cpu.reg.read8(Reg8::A), 1);
    }

    #[test]
    fn interrupt_dispatch_pushes_pc_and_jumps_to_vector() {
        let mut cpu = cpu_with_rom(vec![0x00, 0x00, 0x00]);
        cpu.reg.set_ime(true);
        cpu.reg.write16(Reg16::SP, 0xFFFE);
        cpu.bus_mut().set_if_flags(InterruptKind::Timer.mask());
        cpu.bus_mut().write8(0xFFFF, InterruptKind::Timer.mask());
        cpu.reg.write16(Reg16::PC, 0x0100);
        let cycles = cpu.step().unwrap();
        assert_eq!(cycles, 5);
        assert_eq!(cpu.reg.read16(Reg16::PC), InterruptKind::Timer.vector());
        assert!(!cpu.reg.ime());
        assert_eq!(cpu.bus().if_flags() & InterruptKind::Timer.mask(), 0);
    }

    #[test]
    fn vblank_is_serviced_before_joypad_when_both_pending() {
        let mut cpu = cpu_with_rom(vec![0x00]);
        cpu.reg.set_ime(true);
        cpu.reg.write16(Reg16::SP, 0xFFFE);
        let both = InterruptKind::VBlank.mask() | InterruptKind::Joypad.mask();
        cpu.bus_mut().set_if_flags(both);
        cpu.bus_mut().write8(0xFFFF, both);
        cpu.step().unwrap();
        assert_eq!(cpu.reg.read16(Reg16::PC), InterruptKind::VBlank.vector());
        assert_eq!(cpu.bus().if_flags(), InterruptKind::Joypad.mask());
    }
}
