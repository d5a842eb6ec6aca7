use log::info;

use crate::cartridge::Cartridge;
use crate::clock::Scheduler;
use crate::cpu::Cpu;
use crate::error::Result;
use crate::mmu::Bus;

/// The GameBoy DMG-01 (non-color): cartridge, bus, CPU and clock wired
/// together, with a `run` loop on top for the binary to drive.
pub struct GameBoy {
    cpu: Cpu,
    scheduler: Scheduler,
}

impl GameBoy {
    /// Builds a GameBoy from a ROM image already read into memory.
    /// `seed` feeds the cartridge's PRNG (disabled-SRAM reads); pass a
    /// fixed value for reproducible runs.
    pub fn new(rom: Vec<u8>, seed: u64) -> Result<Self> {
        let cartridge = Cartridge::from_bytes(rom, seed)?;
        let bus = Bus::new(cartridge);
        Ok(Self {
            cpu: Cpu::new(bus),
            scheduler: Scheduler::new(),
        })
    }

    /// Runs one CPU step (or interrupt dispatch) and advances the clock
    /// scheduler by however many M-cycles it took.
    pub fn step(&mut self) -> Result<u32> {
        let cycles = self.cpu.step()?;
        self.scheduler.advance(cycles);
        Ok(cycles)
    }

    /// Runs until the program executes `STOP`, at which point this core
    /// treats the machine as cleanly shut down (§4.3's "STOP-as-clean-
    /// shutdown simplification") rather than emulating the real hardware's
    /// low-power wait-for-button-press state.
    pub fn run(&mut self) -> Result<()> {
        loop {
            match self.step() {
                Ok(_) => {}
                Err(crate::error::CoreError::StopRequested) => {
                    info!(
                        "STOP executed after {} CPU cycles, shutting down",
                        self.scheduler.cpu_cycles()
                    );
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn cpu_cycles(&self) -> u64 {
        self.scheduler.cpu_cycles()
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_rom() -> Vec<u8> {
        vec![0u8; 0x8000]
    }

    #[test]
    fn construction_succeeds_for_a_rom_only_image() {
        assert!(GameBoy::new(flat_rom(), 0).is_ok());
    }

    #[test]
    fn run_stops_cleanly_on_stop_opcode() {
        let mut rom = flat_rom();
        rom[0] = 0x10; // STOP
        rom[1] = 0x00;
        let mut gb = GameBoy::new(rom, 0).unwrap();
        assert!(gb.run().is_ok());
    }

    #[test]
    fn step_advances_the_scheduler_by_the_reported_cycles() {
        let mut rom = flat_rom();
        rom[0] = 0x00; // NOP
        let mut gb = GameBoy::new(rom, 0).unwrap();
        gb.step().unwrap();
        assert_eq!(gb.cpu_cycles(), 1);
    }
}
