use std::path::PathBuf;

use super::boot_sector::{BiosParameterBlock, BOOT_SECTOR_SIZE};
use super::dir_entry::{DirEntry, DIR_ENTRY_SIZE};
use super::file_provider::HostFileProvider;
use super::host_dir::HostDirectoryListing;
use super::partition_entry::{PartitionEntry, PARTITION_ENTRY_SIZE};
use super::PARTITION_SECTOR_OFFSET;

const PARTITION_TABLE_OFFSET: usize = 0x1BE;
const MBR_SIGNATURE_OFFSET: usize = 0x1FE;

/// The FAT16 partition view: boot sector, FAT, root directory and data
/// region, addressed by a single byte cursor (spec.md §4.2 table).
///
/// Grounded on `SDEmulator.cpp: SDBuildMBR`/`read` (the boot-sector/FAT/
/// root-dir branches; the data branch delegates to `HostFileProvider`, §4.3)
/// and `disk/disk_image.rs`'s sector-to-region split, generalised from
/// sector-indexed to byte-indexed addressing.
pub struct FatImage {
    boot_sector_bytes: [u8; BOOT_SECTOR_SIZE],
    fat_bytes: Vec<u8>,
    root_dir_bytes: Vec<u8>,
    file_provider: HostFileProvider,
    toc: Vec<DirEntry>,
    paths: Vec<Option<PathBuf>>,

    bytes_per_sector: u32,
    pos_fat_sector: u32,
    pos_root_dir: u32,
    pos_data_sector: u32,
    cluster_size: u32,

    cursor: u32,
}

impl FatImage {
    pub fn new(bpb: &BiosParameterBlock, listing: HostDirectoryListing) -> Self {
        let bytes_per_sector = bpb.bytes_per_sector as u32;

        // Preserved position bias (spec.md §9): the boot-sector region is
        // addressed as `p - bytes_per_sector`, and `pos_fat_sector` itself
        // carries one extra `bytes_per_sector` beyond the reserved-sector
        // region. Do not "fix" — see DESIGN.md.
        let pos_fat_sector = bytes_per_sector + bpb.reserved_sector_count as u32 * bytes_per_sector;
        let pos_root_dir =
            pos_fat_sector + bpb.table_count as u32 * bpb.sectors_per_fat as u32 * bytes_per_sector;
        let root_dir_region_bytes =
            (bpb.root_entry_count as u32 * DIR_ENTRY_SIZE as u32 / bytes_per_sector) * bytes_per_sector;
        let pos_data_sector = pos_root_dir + root_dir_region_bytes;

        let fat_bytes = fat_to_bytes(&listing.fat);
        let root_dir_bytes = toc_to_bytes(&listing.toc, bpb.root_entry_count as usize);

        FatImage {
            boot_sector_bytes: bpb.to_bytes(),
            fat_bytes,
            root_dir_bytes,
            file_provider: HostFileProvider::new(),
            toc: listing.toc,
            paths: listing.paths,
            bytes_per_sector,
            pos_fat_sector,
            pos_root_dir,
            pos_data_sector,
            cluster_size: bpb.cluster_size(),
            cursor: 0,
        }
    }

    pub fn seek(&mut self, pos: u32) {
        self.cursor = pos;
    }

    pub fn read_byte(&mut self) -> u8 {
        let pos = self.cursor;
        self.cursor = self.cursor.wrapping_add(1);
        self.byte_at(pos)
    }

    /// Stateless convenience built on top of `seek`/`read_byte` (SPEC_FULL.md
    /// §4.2) — used by tests and property checks that want `read_byte_at`
    /// without threading the cursor themselves.
    pub fn read_byte_at(&mut self, pos: u32) -> u8 {
        self.seek(pos);
        self.read_byte()
    }

    fn byte_at(&mut self, pos: u32) -> u8 {
        if pos < self.pos_fat_sector {
            let offset = pos as i64 - self.bytes_per_sector as i64;
            if offset >= 0 && (offset as usize) < self.boot_sector_bytes.len() {
                self.boot_sector_bytes[offset as usize]
            } else {
                0
            }
        } else if pos < self.pos_root_dir {
            let offset = (pos - self.pos_fat_sector) as usize;
            self.fat_bytes.get(offset).copied().unwrap_or(0)
        } else if pos < self.pos_data_sector {
            let offset = (pos - self.pos_root_dir) as usize;
            self.root_dir_bytes.get(offset).copied().unwrap_or(0)
        } else {
            let data_offset = pos - self.pos_data_sector;
            self.file_provider
                .byte_at(data_offset, &self.toc, &self.paths, self.cluster_size)
        }
    }
}

fn fat_to_bytes(fat: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(fat.len() * 2);
    for entry in fat {
        bytes.extend_from_slice(&entry.to_le_bytes());
    }
    bytes
}

/// Only the first `root_entry_count` TOC entries are ever reachable through
/// the on-disk root-directory region — the TOC itself may hold up to
/// `MAX_FILES` (1024) entries, twice `root_entry_count` (512), a mismatch
/// inherited unchanged from the original (`toc[MAX_FILES]` vs. a 512-entry
/// BPB root region): files beyond the 512th directory slot get a valid FAT
/// chain and data bytes but no visible directory entry.
fn toc_to_bytes(toc: &[DirEntry], root_entry_count: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; root_entry_count * DIR_ENTRY_SIZE];
    for (i, entry) in toc.iter().take(root_entry_count).enumerate() {
        let offset = i * DIR_ENTRY_SIZE;
        bytes[offset..offset + DIR_ENTRY_SIZE].copy_from_slice(&entry.to_bytes());
    }
    bytes
}

fn build_mbr(partition: &PartitionEntry, sector_offset: u32, bytes_per_sector: u32) -> Vec<u8> {
    let mut mbr = vec![0u8; (sector_offset * bytes_per_sector) as usize];
    let entry_bytes = partition.to_bytes();
    mbr[PARTITION_TABLE_OFFSET..PARTITION_TABLE_OFFSET + PARTITION_ENTRY_SIZE]
        .copy_from_slice(&entry_bytes);
    mbr[MBR_SIGNATURE_OFFSET] = 0x55;
    mbr[MBR_SIGNATURE_OFFSET + 1] = 0xAA;
    mbr
}

/// Wraps `FatImage` with the outer MBR overlay cursor (spec.md §4.2): reads
/// below `emulatedMBRLength` come from the synthetic MBR sector; once the
/// cursor leaves that region, reads flow through the partition view indexed
/// by the same absolute position.
pub struct SdVolume {
    mbr_bytes: Vec<u8>,
    fat_image: FatImage,
    mbr_cursor: Option<u32>,
}

impl SdVolume {
    pub fn new(bpb: &BiosParameterBlock, listing: HostDirectoryListing) -> Self {
        let partition = PartitionEntry::fat16(PARTITION_SECTOR_OFFSET, bpb.total_sectors_32);
        let mbr_bytes = build_mbr(&partition, PARTITION_SECTOR_OFFSET, bpb.bytes_per_sector as u32);
        SdVolume {
            mbr_bytes,
            fat_image: FatImage::new(bpb, listing),
            mbr_cursor: None,
        }
    }

    pub fn seek(&mut self, pos: u32) {
        if (pos as usize) < self.mbr_bytes.len() {
            self.mbr_cursor = Some(pos);
        } else {
            self.mbr_cursor = None;
            self.fat_image.seek(pos);
        }
    }

    pub fn read_byte(&mut self) -> u8 {
        match self.mbr_cursor {
            Some(pos) => {
                let byte = self.mbr_bytes.get(pos as usize).copied().unwrap_or(0);
                self.mbr_cursor = Some(pos + 1);
                byte
            }
            None => self.fat_image.read_byte(),
        }
    }
}
