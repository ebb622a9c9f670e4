use std::path::Path;

use log::error;

use crate::error::SdError;

use super::boot_sector::BiosParameterBlock;
use super::host_dir::HostDirectoryListing;
use super::image::SdVolume;
use super::spi::SdSpiEngine;

/// The SD-card peripheral: a host directory presented as a read-only FAT16
/// volume behind the two-method SPI bus contract.
///
/// Grounded on `SDEmulator.h`'s `SDEmu` struct, split into composed types
/// (`SdVolume` owning the byte layout, `SdSpiEngine` owning the protocol
/// state machine) rather than one struct holding every field inline,
/// matching how `disk/disk_image.rs` composes `Mbr` + `BiosParameterBlock`.
pub struct SdCard {
    volume: SdVolume,
    spi: SdSpiEngine,
}

impl SdCard {
    /// Builds the card from a host directory. Fails if the directory cannot
    /// be opened or enumerated (spec.md §7, category 1) — callers that want
    /// "card absent, protocol still completes" behaviour should fall back to
    /// [`SdCard::absent`].
    pub fn new(directory: &Path) -> Result<Self, SdError> {
        let bpb = BiosParameterBlock::uzebox_default();
        let listing = HostDirectoryListing::load(directory, &bpb)?;
        Ok(SdCard {
            volume: SdVolume::new(&bpb, listing),
            spi: SdSpiEngine::new(),
        })
    }

    /// A card with no backing directory: every command still completes
    /// protocol-wise, but block reads beyond the synthetic metadata produce
    /// zeros (spec.md §7, category 1).
    pub fn absent() -> Self {
        let bpb = BiosParameterBlock::uzebox_default();
        let listing = HostDirectoryListing::empty(&bpb);
        SdCard {
            volume: SdVolume::new(&bpb, listing),
            spi: SdSpiEngine::new(),
        }
    }

    /// Convenience combining [`SdCard::new`] and [`SdCard::absent`]: logs
    /// the initialisation failure and falls back to an absent card instead
    /// of propagating the error, for callers that prefer a card that always
    /// exists.
    pub fn new_or_absent(directory: &Path) -> Self {
        match SdCard::new(directory) {
            Ok(card) => card,
            Err(err) => {
                error!("SD card initialisation failed, presenting an absent card: {err}");
                SdCard::absent()
            }
        }
    }

    pub fn chip_select_changed(&mut self, selected: bool) {
        self.spi.chip_select_changed(selected);
    }

    pub fn handle_spi_byte(&mut self, byte: u8) -> u8 {
        self.spi.handle_spi_byte(byte, &mut self.volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn absent_card_completes_reset_handshake() {
        let mut card = SdCard::absent();
        card.chip_select_changed(true);
        let mut last = 0;
        for b in [0x40u8, 0x00, 0x00, 0x00, 0x00, 0x95] {
            last = card.handle_spi_byte(b);
        }
        assert_eq!(last, 0x00);
        assert_eq!(card.handle_spi_byte(0xFF), 0xFF);
        assert_eq!(card.handle_spi_byte(0xFF), 0x01);
    }

    #[test]
    fn new_with_unreadable_directory_is_an_error() {
        let result = SdCard::new(Path::new("/no/such/path/at/all"));
        assert!(result.is_err());
    }

    #[test]
    fn new_or_absent_falls_back_without_panicking() {
        let _card = SdCard::new_or_absent(Path::new("/no/such/path/at/all"));
    }

    #[test]
    fn new_with_real_directory_serves_the_boot_sector() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("A.BIN"), [0x42]).unwrap();
        let mut card = SdCard::new(dir.path()).unwrap();

        for b in [0x51u8, 0x00, 0x00, 0x02, 0x00, 0x95] {
            card.handle_spi_byte(b);
        }
        card.handle_spi_byte(0xFF); // 8-clock wait
        card.handle_spi_byte(0xFF); // R1, no error
        card.handle_spi_byte(0xFF); // start-block token
        let jump: Vec<u8> = (0..3).map(|_| card.handle_spi_byte(0xFF)).collect();
        assert_eq!(jump, vec![0xEB, 0x3C, 0x90]);
    }
}
