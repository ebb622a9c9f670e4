use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::SdError;

use super::boot_sector::BiosParameterBlock;
use super::dir_entry::DirEntry;
use super::MAX_FILES;

/// Result of scanning a host directory: a TOC, a parallel path table, and
/// the FAT chain covering every file's clusters (spec.md §4.1).
///
/// Grounded on `SDEmulator.cpp: init_with_directory`.
pub struct HostDirectoryListing {
    pub toc: Vec<DirEntry>,
    pub paths: Vec<Option<PathBuf>>,
    pub fat: Vec<u16>,
}

impl HostDirectoryListing {
    /// A listing with only the synthetic volume-label entry — used both as
    /// the "SD card treated as absent" fallback (spec.md §7 category 1) and
    /// as a deliberately empty fixture in tests.
    pub fn empty(bpb: &BiosParameterBlock) -> Self {
        HostDirectoryListing {
            toc: vec![DirEntry::volume_label()],
            paths: vec![None],
            fat: zeroed_fat(bpb),
        }
    }

    pub fn load(dir: &Path, bpb: &BiosParameterBlock) -> Result<Self, SdError> {
        let read_dir = fs::read_dir(dir).map_err(|source| SdError::DirectoryUnreadable {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut entries: Vec<fs::DirEntry> = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|source| SdError::DirectoryUnreadable {
                path: dir.to_path_buf(),
                source,
            })?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') {
                continue;
            }
            let file_type = entry.file_type().map_err(|source| SdError::StatFailed {
                path: entry.path(),
                source,
            })?;
            if !file_type.is_file() {
                continue;
            }
            entries.push(entry);
        }

        let truncated = entries.len() > MAX_FILES - 1;
        if truncated {
            warn!(
                "{:?} contains {} files, only the first {} are visible",
                dir,
                entries.len(),
                MAX_FILES - 1
            );
            entries.truncate(MAX_FILES - 1);
        }

        let cluster_size = bpb.cluster_size();
        let mut toc = vec![DirEntry::volume_label()];
        let mut paths = vec![None];
        let mut fat = zeroed_fat(bpb);
        let mut next_cluster: u32 = 2;

        for entry in entries {
            let path = entry.path();
            let metadata = entry.metadata().map_err(|source| SdError::StatFailed {
                path: path.clone(),
                source,
            })?;
            let size = metadata.len().min(u32::MAX as u64) as u32;
            let (name, extension) = long_to_short_name(&entry.file_name().to_string_lossy());

            let cluster_no = next_cluster;
            let clusters_needed = clusters_needed(size, cluster_size);
            write_chain(&mut fat, cluster_no, clusters_needed);
            next_cluster += clusters_needed;

            toc.push(DirEntry::file(name, extension, cluster_no as u16, size));
            paths.push(Some(path));
        }

        Ok(HostDirectoryListing { toc, paths, fat })
    }
}

fn zeroed_fat(bpb: &BiosParameterBlock) -> Vec<u16> {
    vec![0u16; bpb.sectors_per_fat as usize * bpb.bytes_per_sector as usize / 2]
}

/// `ceil(size / cluster_bytes)`, floored at 1 so a zero-byte file still
/// reserves exactly one cluster (spec.md §3: "a zero-byte file reserves a
/// cluster range of length one whose sole entry is 0xFFFF" — the original
/// C's `ceil(0/x)` evaluates to 0 and corrupts the previous file's chain
/// terminator; spec.md's own stated behaviour is followed here instead).
fn clusters_needed(size: u32, cluster_bytes: u32) -> u32 {
    (((size as u64) + cluster_bytes as u64 - 1) / cluster_bytes as u64).max(1) as u32
}

fn write_chain(fat: &mut [u16], start_cluster: u32, count: u32) {
    for i in 0..count {
        let cluster = (start_cluster + i) as usize;
        if cluster >= fat.len() {
            break;
        }
        fat[cluster] = if i + 1 == count {
            0xFFFF
        } else {
            (start_cluster + i + 1) as u16
        };
    }
}

/// `SDEmulator.cpp: long2shortfilename`. Name is everything before the
/// first `.`, truncated to 8 bytes; extension is the next up to 3 raw bytes
/// after that dot (may itself contain a literal `.` for multi-dot names —
/// see SPEC_FULL.md §9.1). Both are upper-cased with ASCII rules and space
/// padded.
fn long_to_short_name(filename: &str) -> ([u8; 8], [u8; 3]) {
    let mut name = [0x20u8; 8];
    let mut extension = [0x20u8; 3];

    match filename.find('.') {
        Some(dot) => {
            let base = &filename[..dot];
            for (i, c) in base.bytes().take(8).enumerate() {
                name[i] = c.to_ascii_uppercase();
            }
            let after_dot = &filename[dot + 1..];
            for (i, c) in after_dot.bytes().take(3).enumerate() {
                extension[i] = c.to_ascii_uppercase();
            }
        }
        None => {
            for (i, c) in filename.bytes().take(8).enumerate() {
                name[i] = c.to_ascii_uppercase();
            }
        }
    }

    (name, extension)
}
