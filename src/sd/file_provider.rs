use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

use log::warn;

use super::dir_entry::DirEntry;

struct FileCache {
    start: u32,
    end: u32,
    handle: File,
    last_pos: Option<u32>,
}

/// The one-entry host-file cache backing the data region (spec.md §4.3).
///
/// Grounded on `SDEmulator.cpp: SDEmu::read`'s data-sector branch: a linear
/// TOC scan on cache miss, reposition-only-if-not-sequential, and
/// post-EOF/after-open-failure zero padding.
pub struct HostFileProvider {
    cache: Option<FileCache>,
}

impl HostFileProvider {
    pub fn new() -> Self {
        HostFileProvider { cache: None }
    }

    pub fn byte_at(
        &mut self,
        data_offset: u32,
        toc: &[DirEntry],
        paths: &[Option<PathBuf>],
        cluster_size: u32,
    ) -> u8 {
        let cluster = data_offset / cluster_size + 2;

        let needs_rescan = match &self.cache {
            Some(cache) => data_offset < cache.start || data_offset > cache.end,
            None => true,
        };

        if needs_rescan {
            self.cache = None;
            if let Some((index, entry)) = find_owning_file(toc, cluster, cluster_size) {
                let start = (entry.cluster_no as u32 - 2) * cluster_size;
                let clusters = clusters_needed(entry.file_size, cluster_size);
                let end = start + clusters * cluster_size - 1;
                match paths.get(index).and_then(|p| p.as_ref()) {
                    Some(path) => match File::open(path) {
                        Ok(handle) => {
                            self.cache = Some(FileCache {
                                start,
                                end,
                                handle,
                                last_pos: None,
                            });
                        }
                        Err(err) => warn!("could not reopen {:?}: {}", path, err),
                    },
                    None => {}
                }
            }
        }

        let Some(cache) = self.cache.as_mut() else {
            return 0;
        };

        let within_file = data_offset - cache.start;

        let sequential = cache.last_pos == Some(data_offset.wrapping_sub(1));
        if !sequential {
            if let Err(err) = cache.handle.seek(SeekFrom::Start(within_file as u64)) {
                warn!("seek failed mid-session: {}", err);
                cache.last_pos = Some(data_offset);
                return 0;
            }
        }
        cache.last_pos = Some(data_offset);

        // Beyond the real file's length, but still within its cluster-sized
        // reservation: zero-pad to the cluster boundary.
        if data_offset >= cache.start + owning_file_size(toc, cache.start, cluster_size) {
            return 0;
        }

        let mut byte = [0u8; 1];
        match cache.handle.read_exact(&mut byte) {
            Ok(()) => byte[0],
            Err(_) => 0,
        }
    }
}

fn clusters_needed(size: u32, cluster_bytes: u32) -> u32 {
    (((size as u64) + cluster_bytes as u64 - 1) / cluster_bytes as u64).max(1) as u32
}

fn find_owning_file(toc: &[DirEntry], cluster: u32, cluster_size: u32) -> Option<(usize, &DirEntry)> {
    toc.iter().enumerate().find(|(_, entry)| {
        if entry.is_free() || entry.cluster_no < 2 {
            return false;
        }
        let start = entry.cluster_no as u32;
        let count = clusters_needed(entry.file_size, cluster_size);
        cluster >= start && cluster < start + count
    })
}

/// Re-derives the owning file's size from its cached start position, used
/// only to compute the EOF cutoff inside the cache hit path (the cache
/// struct itself stores cluster-rounded bounds, not the exact byte size).
fn owning_file_size(toc: &[DirEntry], cache_start: u32, cluster_size: u32) -> u32 {
    let start_cluster = cache_start / cluster_size + 2;
    toc.iter()
        .find(|entry| !entry.is_free() && entry.cluster_no as u32 == start_cluster)
        .map(|entry| entry.file_size)
        .unwrap_or(0)
}
