use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config as LogConfig, TermLogger, TerminalMode};

use uzebox_spi_peripherals::config::Config;
use uzebox_spi_peripherals::sd::SdCard;
use uzebox_spi_peripherals::sram::SpiSram;

/// Exercises the SD and SRAM SPI peripherals against a host directory.
#[derive(Parser)]
#[command(name = "spi-bridge-demo")]
struct Cli {
    /// Host directory to present as the SD card's FAT16 volume.
    #[arg(value_name = "SD_DIRECTORY")]
    sd_directory: Option<PathBuf>,

    /// Path to an optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn install_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = TermLogger::init(level, LogConfig::default(), TerminalMode::Mixed, ColorChoice::Auto);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    install_logger(cli.verbose);

    let config = match &cli.config {
        Some(path) => Some(Config::load(path)?),
        None => None,
    };

    let sd_directory = cli
        .sd_directory
        .or_else(|| config.as_ref().and_then(|c| c.sd_directory.clone()))
        .unwrap_or_else(|| PathBuf::from("."));

    let mut sd = SdCard::new_or_absent(&sd_directory);
    info!("SD card presenting {:?} as a FAT16 volume", sd_directory);

    sd.chip_select_changed(true);
    let mut last = 0u8;
    for byte in [0x40u8, 0x00, 0x00, 0x00, 0x00, 0x95] {
        last = sd.handle_spi_byte(byte);
    }
    info!("CMD0 (GO_IDLE) last byte exchanged: {last:#04x}");
    sd.chip_select_changed(false);

    let sram_enabled = config.as_ref().map(|c| c.sram_enabled).unwrap_or(true);
    if sram_enabled {
        let mut sram = SpiSram::new();
        sram.chip_select_changed(true);
        sram.handle_spi_byte(0x01); // WRSR
        sram.handle_spi_byte(0x02); // write-enable
        sram.handle_spi_byte(0x02); // WRITE
        for b in [0x00u8, 0x00, 0x00] {
            sram.handle_spi_byte(b);
        }
        for b in b"hello" {
            sram.handle_spi_byte(*b);
        }
        sram.chip_select_changed(false);

        sram.chip_select_changed(true);
        sram.handle_spi_byte(0x03); // READ
        for b in [0x00u8, 0x00, 0x00] {
            sram.handle_spi_byte(b);
        }
        let readback: Vec<u8> = (0..5).map(|_| sram.handle_spi_byte(0xFF)).collect();
        sram.chip_select_changed(false);
        info!("SRAM self-test readback: {:?}", String::from_utf8_lossy(&readback));
    }

    Ok(())
}
