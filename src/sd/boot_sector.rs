use super::{BYTES_PER_SECTOR, MEDIA_TYPE, RESERVED_SECTOR_COUNT, ROOT_ENTRY_COUNT, SECTORS_PER_CLUSTER, SECTORS_PER_FAT, TABLE_COUNT};

pub const BOOT_SECTOR_SIZE: usize = 512;

/// The 512-byte FAT16 boot sector / BIOS Parameter Block.
///
/// Field values are the constants `init_with_directory` in the original
/// source hard-codes for every emulated card; there is no per-directory
/// variation (sizes come from the FAT/TOC regions the directory produces,
/// not from the BPB itself).
#[derive(Debug, Clone)]
pub struct BiosParameterBlock {
    pub jump: [u8; 3],
    pub oem_name: [u8; 8],
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sector_count: u16,
    pub table_count: u8,
    pub root_entry_count: u16,
    pub total_sectors_16: u16,
    pub media_type: u8,
    pub sectors_per_fat: u16,
    pub sectors_per_track: u16,
    pub head_side_count: u16,
    pub hidden_sector_count: u32,
    pub total_sectors_32: u32,
    pub drive_no: u16,
    pub extended_fields: u8,
    pub serial_number: u32,
    pub volume_label: [u8; 11],
    pub filesystem_type: [u8; 8],
    pub signature: [u8; 2],
}

impl BiosParameterBlock {
    /// The exact BPB the card presents, byte for byte: 64 sectors/cluster
    /// (32 KiB clusters), 118 sectors/FAT, serial `1234567`, geometry
    /// 32 heads × 32 sectors/track — none of these vary with directory
    /// contents, matching the original's single hard-coded boot sector.
    pub fn uzebox_default() -> Self {
        let mut filesystem_type = [0u8; 8];
        filesystem_type[..5].copy_from_slice(b"FAT16");

        let mut oem_name = [0u8; 8];
        oem_name[..7].copy_from_slice(b"uzemSDe");

        BiosParameterBlock {
            jump: [0xEB, 0x3C, 0x90],
            oem_name,
            bytes_per_sector: BYTES_PER_SECTOR,
            sectors_per_cluster: SECTORS_PER_CLUSTER,
            reserved_sector_count: RESERVED_SECTOR_COUNT,
            table_count: TABLE_COUNT,
            root_entry_count: ROOT_ENTRY_COUNT,
            total_sectors_16: 0,
            media_type: MEDIA_TYPE,
            sectors_per_fat: SECTORS_PER_FAT,
            sectors_per_track: 32,
            head_side_count: 32,
            hidden_sector_count: 0,
            total_sectors_32: 3_854_201,
            drive_no: 4,
            extended_fields: 0x29,
            serial_number: 1_234_567,
            volume_label: *b"UZEBOX     ",
            filesystem_type,
            signature: [0x55, 0xAA],
        }
    }

    pub fn cluster_size(&self) -> u32 {
        self.bytes_per_sector as u32 * self.sectors_per_cluster as u32
    }

    pub fn to_bytes(&self) -> [u8; BOOT_SECTOR_SIZE] {
        let mut b = [0u8; BOOT_SECTOR_SIZE];
        b[0..3].copy_from_slice(&self.jump);
        b[3..11].copy_from_slice(&self.oem_name);
        b[11..13].copy_from_slice(&self.bytes_per_sector.to_le_bytes());
        b[13] = self.sectors_per_cluster;
        b[14..16].copy_from_slice(&self.reserved_sector_count.to_le_bytes());
        b[16] = self.table_count;
        b[17..19].copy_from_slice(&self.root_entry_count.to_le_bytes());
        b[19..21].copy_from_slice(&self.total_sectors_16.to_le_bytes());
        b[21] = self.media_type;
        b[22..24].copy_from_slice(&self.sectors_per_fat.to_le_bytes());
        b[24..26].copy_from_slice(&self.sectors_per_track.to_le_bytes());
        b[26..28].copy_from_slice(&self.head_side_count.to_le_bytes());
        b[28..32].copy_from_slice(&self.hidden_sector_count.to_le_bytes());
        b[32..36].copy_from_slice(&self.total_sectors_32.to_le_bytes());
        b[36..38].copy_from_slice(&self.drive_no.to_le_bytes());
        b[38] = self.extended_fields;
        b[39..43].copy_from_slice(&self.serial_number.to_le_bytes());
        b[43..54].copy_from_slice(&self.volume_label);
        b[54..62].copy_from_slice(&self.filesystem_type);
        // b[62..510] boot code, left zero.
        b[510..512].copy_from_slice(&self.signature);
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_at_510_511() {
        let bytes = BiosParameterBlock::uzebox_default().to_bytes();
        assert_eq!(bytes[510], 0x55);
        assert_eq!(bytes[511], 0xAA);
    }

    #[test]
    fn jump_and_oem_prefix() {
        let bytes = BiosParameterBlock::uzebox_default().to_bytes();
        assert_eq!(&bytes[0..5], &[0xEB, 0x3C, 0x90, b'u', b'z']);
    }

    #[test]
    fn filesystem_type_is_zero_padded_not_space_padded() {
        let bytes = BiosParameterBlock::uzebox_default().to_bytes();
        assert_eq!(&bytes[54..59], b"FAT16");
        assert_eq!(&bytes[59..62], &[0, 0, 0]);
    }

    #[test]
    fn cluster_size_is_32_kib() {
        assert_eq!(BiosParameterBlock::uzebox_default().cluster_size(), 32 * 1024);
    }
}
