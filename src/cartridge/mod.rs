pub mod header;
pub mod mbc1;
pub mod rom_only;

use log::{error, info};

use self::header::{CartridgeType, RamSize, RomSize};
use self::mbc1::Mbc1;
use self::rom_only::RomOnly;
use crate::error::{CoreError, Result};

/// A Game Boy cartridge, dispatched by a tagged enum rather than a trait
/// object (§9's "Polymorphic cartridge types -> tagged variant"): only
/// `Flat` and `Mbc1` are specified, so there is no need to pay for dynamic
/// dispatch or leave room for a `Box<dyn Cartridge>` that could only ever
/// hold two concrete shapes.
pub enum Cartridge {
    Flat(RomOnly),
    Mbc1(Mbc1),
}

impl Cartridge {
    /// Builds a cartridge from a raw ROM image, inspecting its header to
    /// select the controller (§4.1's "header-driven construction"). `seed`
    /// feeds the MBC1's PRNG for disabled-SRAM reads; it is ignored for the
    /// flat controller, which has no SRAM.
    pub fn from_bytes(rom: Vec<u8>, seed: u64) -> Result<Self> {
        let title = header::read_title(&rom);
        let type_byte = header::byte_at(&rom, header::CARTRIDGE_TYPE_ADDR);
        let rom_size_byte = header::byte_at(&rom, header::ROM_SIZE_ADDR);
        let ram_size_byte = header::byte_at(&rom, header::RAM_SIZE_ADDR);

        info!(
            "loading cartridge \"{}\" (type={:#04x}, rom_size_code={:#04x}, ram_size_code={:#04x})",
            title, type_byte, rom_size_byte, ram_size_byte
        );

        let ram_size = RamSize::try_from(ram_size_byte)
            .map_err(|_| {
                let reason = format!("unsupported RAM size code {:#04x}", ram_size_byte);
                error!("invalid cartridge configuration: {}", reason);
                CoreError::ConfigError { reason }
            })?
            .bytes();

        match CartridgeType::try_from(type_byte) {
            Ok(CartridgeType::RomOnly) => Ok(Cartridge::Flat(RomOnly::new(rom))),
            Ok(_other_mbc1_variant) => Ok(Cartridge::Mbc1(Mbc1::new(rom, ram_size, seed)?)),
            Err(_) => {
                // Recognize but do not reject cartridge types this core has
                // no MBC for (MBC2/3/5/...): degrade to the flat controller
                // (§4.1), which is close enough to keep a ROM-bank-0 fetch
                // loop alive rather than refusing to run at all.
                let declared = RomSize::try_from(rom_size_byte).ok().map(RomSize::bytes);
                if let Some(expected) = declared {
                    if expected != rom.len() {
                        info!(
                            "cartridge type {:#04x} unrecognized; header ROM size ({} bytes) disagrees with image ({} bytes), trusting the image",
                            type_byte, expected, rom.len()
                        );
                    }
                }
                Ok(Cartridge::Flat(RomOnly::new(rom)))
            }
        }
    }

    pub fn read(&mut self, addr: u16) -> u8 {
        match self {
            Cartridge::Flat(c) => c.read(addr),
            Cartridge::Mbc1(c) => c.read(addr),
        }
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        match self {
            Cartridge::Flat(c) => c.write(addr, value),
            Cartridge::Mbc1(c) => c.write(addr, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rom_only_header_selects_flat_controller() {
        let mut rom = vec![0u8; 0x8000];
        rom[header::CARTRIDGE_TYPE_ADDR] = CartridgeType::RomOnly as u8;
        let cart = Cartridge::from_bytes(rom, 0).unwrap();
        assert!(matches!(cart, Cartridge::Flat(_)));
    }

    #[test]
    fn mbc1_header_selects_mbc1_controller() {
        let mut rom = vec![0u8; 0x8000];
        rom[header::CARTRIDGE_TYPE_ADDR] = CartridgeType::Mbc1 as u8;
        let cart = Cartridge::from_bytes(rom, 0).unwrap();
        assert!(matches!(cart, Cartridge::Mbc1(_)));
    }

    #[test]
    fn bad_ram_size_code_is_config_error() {
        let mut rom = vec![0u8; 0x8000];
        rom[header::RAM_SIZE_ADDR] = 0xFF;
        assert!(Cartridge::from_bytes(rom, 0).is_err());
    }

    #[test]
    fn unrecognized_cartridge_type_degrades_to_flat_controller() {
        let mut rom = vec![0u8; 0x8000];
        rom[header::CARTRIDGE_TYPE_ADDR] = 0xFF;
        let cart = Cartridge::from_bytes(rom, 0).unwrap();
        assert!(matches!(cart, Cartridge::Flat(_)));
    }
}
