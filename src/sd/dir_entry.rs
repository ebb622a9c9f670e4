use bitflags::bitflags;
use chrono::{Datelike, NaiveDateTime, Timelike};

bitflags! {
    /// The root-directory attribute byte (spec.md §3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FatAttributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN    = 0x02;
        const SYSTEM    = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE   = 0x20;
    }
}

/// A packed FAT date or time word, built from explicit shifts/masks rather
/// than compiler bit-fields (spec.md §9).
///
/// The bit order here is the original's: for dates, `year` occupies the
/// *low* 7 bits, `month` the next 4, `day` the top 5 — the reverse of the
/// canonical on-disk FAT date word, but this crate's default directory
/// entries all carry zeroed date/time fields (matching the original, which
/// never actually populates them for synthesised files), so the unusual
/// ordering is only exercised by callers who opt into `from_datetime`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FatTimestamp {
    pub date: u16,
    pub time: u16,
    pub tenths: u8,
}

impl FatTimestamp {
    pub fn zero() -> Self {
        FatTimestamp::default()
    }

    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        let year = (dt.year() - 1980).clamp(0, 0x7F) as u16;
        let month = dt.month() as u16 & 0xF;
        let day = dt.day() as u16 & 0x1F;
        let date = (year & 0x7F) | (month << 7) | (day << 11);

        let hour = dt.hour() as u16 & 0x1F;
        let minute = dt.minute() as u16 & 0x3F;
        let half_seconds = (dt.second() / 2) as u16 & 0x1F;
        let time = hour | (minute << 5) | (half_seconds << 11);

        FatTimestamp { date, time, tenths: 0 }
    }

    pub fn year(&self) -> u16 {
        self.date & 0x7F
    }
    pub fn month(&self) -> u16 {
        (self.date >> 7) & 0xF
    }
    pub fn day(&self) -> u16 {
        (self.date >> 11) & 0x1F
    }
    pub fn hour(&self) -> u16 {
        self.time & 0x1F
    }
    pub fn minute(&self) -> u16 {
        (self.time >> 5) & 0x3F
    }
    pub fn half_seconds(&self) -> u16 {
        (self.time >> 11) & 0x1F
    }
}

pub const DIR_ENTRY_SIZE: usize = 32;

/// A 32-byte root-directory entry (spec.md §3).
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: [u8; 8],
    pub extension: [u8; 3],
    pub attributes: FatAttributes,
    pub nt_reserved: u8,
    pub creation_tenths: u8,
    pub creation: FatTimestamp,
    pub accessed_date: u16,
    pub modified: FatTimestamp,
    pub cluster_no: u16,
    pub file_size: u32,
}

impl DirEntry {
    pub fn empty() -> Self {
        DirEntry {
            name: [0x20; 8],
            extension: [0x20; 3],
            attributes: FatAttributes::empty(),
            nt_reserved: 0,
            creation_tenths: 0,
            creation: FatTimestamp::zero(),
            accessed_date: 0,
            modified: FatTimestamp::zero(),
            cluster_no: 0,
            file_size: 0,
        }
    }

    /// The synthetic entry 0: the volume label, 8 bytes `"UZEBOX  "` (not
    /// the 11-byte boot-sector volume label, a separate field — see
    /// SPEC_FULL.md §9.1).
    pub fn volume_label() -> Self {
        let mut entry = DirEntry::empty();
        entry.name = *b"UZEBOX  ";
        entry.attributes = FatAttributes::ARCHIVE | FatAttributes::VOLUME_ID;
        entry
    }

    /// Builds an 8.3 entry from a short-filename pair, a cluster assignment
    /// and a file size — the name/extension split itself is `long2shortname`
    /// in `host_dir.rs`, kept separate so this type stays pure byte layout.
    pub fn file(name: [u8; 8], extension: [u8; 3], cluster_no: u16, file_size: u32) -> Self {
        let mut entry = DirEntry::empty();
        entry.name = name;
        entry.extension = extension;
        entry.attributes = FatAttributes::ARCHIVE;
        entry.cluster_no = cluster_no;
        entry.file_size = file_size;
        entry
    }

    pub fn is_free(&self) -> bool {
        self.name[0] == 0
    }

    pub fn to_bytes(&self) -> [u8; DIR_ENTRY_SIZE] {
        let mut b = [0u8; DIR_ENTRY_SIZE];
        b[0..8].copy_from_slice(&self.name);
        b[8..11].copy_from_slice(&self.extension);
        b[11] = self.attributes.bits();
        b[12] = self.nt_reserved;
        b[13] = self.creation_tenths;
        b[14..16].copy_from_slice(&self.creation.time.to_le_bytes());
        b[16..18].copy_from_slice(&self.creation.date.to_le_bytes());
        b[18..20].copy_from_slice(&self.accessed_date.to_le_bytes());
        // b[20..22] reserved, left zero.
        b[22..24].copy_from_slice(&self.modified.time.to_le_bytes());
        b[24..26].copy_from_slice(&self.modified.date.to_le_bytes());
        b[26..28].copy_from_slice(&self.cluster_no.to_le_bytes());
        b[28..32].copy_from_slice(&self.file_size.to_le_bytes());
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_label_bytes() {
        let entry = DirEntry::volume_label();
        let bytes = entry.to_bytes();
        assert_eq!(&bytes[0..8], b"UZEBOX  ");
        assert_eq!(&bytes[8..11], b"   ");
        assert_eq!(bytes[11], (FatAttributes::ARCHIVE | FatAttributes::VOLUME_ID).bits());
    }

    #[test]
    fn file_entry_roundtrips_cluster_and_size() {
        let entry = DirEntry::file(*b"A       ", *b"BIN", 2, 1);
        let bytes = entry.to_bytes();
        assert_eq!(u16::from_le_bytes([bytes[26], bytes[27]]), 2);
        assert_eq!(u32::from_le_bytes([bytes[28], bytes[29], bytes[30], bytes[31]]), 1);
    }

    #[test]
    fn to_bytes_is_32_bytes() {
        assert_eq!(DirEntry::empty().to_bytes().len(), 32);
    }

    #[test]
    fn timestamp_packs_year_low_month_mid_day_high() {
        let dt = NaiveDateTime::parse_from_str("2020-03-04 05:06:07", "%Y-%m-%d %H:%M:%S").unwrap();
        let ts = FatTimestamp::from_datetime(dt);
        assert_eq!(ts.year(), 40); // 2020 - 1980
        assert_eq!(ts.month(), 3);
        assert_eq!(ts.day(), 4);
        assert_eq!(ts.hour(), 5);
        assert_eq!(ts.minute(), 6);
        assert_eq!(ts.half_seconds(), 3);
    }

    #[test]
    fn default_synthesised_entries_carry_zero_timestamps() {
        assert_eq!(DirEntry::volume_label().creation, FatTimestamp::zero());
    }
}
