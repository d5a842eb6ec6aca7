use std::fs;
use std::process::ExitCode;

use clap::{Arg, ArgAction, Command};
use log::{error, info};

/// CLI ergonomics default for `--seed`; independent of the cartridge's own
/// seedable-PRNG requirement, this just makes unseeded runs reproducible.
const DEFAULT_SEED: u64 = 0xFE_ED_FA_CE;

fn main() -> ExitCode {
    env_logger::init();

    let matches = Command::new("ferrum")
        .version("0.1.0")
        .author("m0x <https://github.com/m0xsec/ferrum>")
        .about("A cycle-paced Game Boy (DMG) CPU/MBC1/bus emulation core.")
        .arg(
            Arg::new("rom")
                .short('r')
                .long("rom")
                .value_name("FILE")
                .help("Sets the ROM file to load.")
                .required(true),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("N")
                .help("Seed for the cartridge's disabled-SRAM PRNG."),
        )
        .arg(
            Arg::new("testing")
                .short('t')
                .long("testing")
                .help("Dumps CPU register state after every step, for test-harness consumption.")
                .action(ArgAction::SetTrue),
        )
        .arg_required_else_help(true)
        .get_matches();

    let rom_path = matches.get_one::<String>("rom").expect("required");
    let testing = matches.get_flag("testing");
    let seed = match matches.get_one::<String>("seed") {
        None => DEFAULT_SEED,
        Some(s) => match s.parse() {
            Ok(v) => v,
            Err(_) => {
                error!("--seed must be a valid u64");
                return ExitCode::FAILURE;
            }
        },
    };

    let rom = match fs::read(rom_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("failed to read ROM {}: {}", rom_path, e);
            return ExitCode::FAILURE;
        }
    };

    let mut ferrum = match ferrum_core::GameBoy::new(rom, seed) {
        Ok(gb) => gb,
        Err(e) => {
            error!("failed to power on: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("powered on, running {}", rom_path);

    loop {
        match ferrum.step() {
            Ok(_) => {
                if testing {
                    println!("{}", ferrum.cpu().dump_registers());
                }
            }
            Err(ferrum_core::CoreError::StopRequested) => {
                info!("STOP executed after {} CPU cycles", ferrum.cpu_cycles());
                return ExitCode::SUCCESS;
            }
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        }
    }
}
