//! SPI SRAM peripheral: a 512 KiB byte-addressable memory with address
//! auto-increment and a write-enable latch.

mod spi;

pub use spi::{SpiSram, SPIRAM_SIZE};
