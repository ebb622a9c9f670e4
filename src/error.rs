use std::path::PathBuf;

use thiserror::Error;

/// Initialisation-time failures for the SD card emulator (spec §7, category 1).
///
/// Protocol errors (unknown opcode) and data-path errors (host file vanished
/// mid-session) are never surfaced through this type — per spec they are
/// logged and absorbed so the SPI state machine always completes with a
/// well-formed byte.
#[derive(Debug, Error)]
pub enum SdError {
    #[error("host directory {path:?} could not be opened: {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not stat {path:?}: {source}")]
    StatFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("directory {path:?} contains more than {max} files; extras were dropped")]
    TooManyFiles { path: PathBuf, max: usize },
}
