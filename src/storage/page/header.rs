//! The fixed-size page header.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::storage::disk::{decode_page_link, NO_PAGE};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageType;

/// On-disk size of a page header.
pub const PAGE_HEADER_SIZE: usize = 21;

/// Header of one page slot.
///
/// Stored as 21 bytes at the start of the slot: page type (1), previous
/// and next chain links (4 + 4, [`NO_PAGE`] when absent), entry count (2),
/// first and last entry ids (4 + 4) and the page's current byte size (2).
/// The page number is not stored; it is derived from the slot position.
///
/// `current_size_bytes` always equals [`PAGE_HEADER_SIZE`] plus the sum of
/// the sizes of the entries currently in the page. An empty page has
/// `first_entry_id == last_entry_id == 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub page_number: u32,
    pub previous_page: Option<u32>,
    pub next_page: Option<u32>,
    pub entry_count: u16,
    pub first_entry_id: u32,
    pub last_entry_id: u32,
    pub current_size_bytes: u16,
}

impl PageHeader {
    pub fn new(page_type: PageType, page_number: u32) -> Self {
        Self {
            page_type,
            page_number,
            previous_page: None,
            next_page: None,
            entry_count: 0,
            first_entry_id: 0,
            last_entry_id: 0,
            current_size_bytes: PAGE_HEADER_SIZE as u16,
        }
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> StorageResult<()> {
        writer.write_u8(self.page_type.as_u8())?;
        writer.write_u32::<LittleEndian>(self.previous_page.unwrap_or(NO_PAGE))?;
        writer.write_u32::<LittleEndian>(self.next_page.unwrap_or(NO_PAGE))?;
        writer.write_u16::<LittleEndian>(self.entry_count)?;
        writer.write_u32::<LittleEndian>(self.first_entry_id)?;
        writer.write_u32::<LittleEndian>(self.last_entry_id)?;
        writer.write_u16::<LittleEndian>(self.current_size_bytes)?;
        Ok(())
    }

    pub fn decode<R: Read>(page_number: u32, reader: &mut R) -> StorageResult<Self> {
        let page_type = PageType::from_u8(reader.read_u8()?)?;
        let previous_page = decode_page_link(reader.read_u32::<LittleEndian>()?);
        let next_page = decode_page_link(reader.read_u32::<LittleEndian>()?);
        let entry_count = reader.read_u16::<LittleEndian>()?;
        let first_entry_id = reader.read_u32::<LittleEndian>()?;
        let last_entry_id = reader.read_u32::<LittleEndian>()?;
        let current_size_bytes = reader.read_u16::<LittleEndian>()?;

        if (current_size_bytes as usize) < PAGE_HEADER_SIZE {
            return Err(StorageError::CorruptPage {
                detail: format!(
                    "page {page_number} reports {current_size_bytes} bytes, \
                     less than its own header"
                ),
            });
        }

        Ok(Self {
            page_type,
            page_number,
            previous_page,
            next_page,
            entry_count,
            first_entry_id,
            last_entry_id,
            current_size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_header_accounts_for_itself() {
        let header = PageHeader::new(PageType::NodeReference, 3);
        assert_eq!(header.current_size_bytes as usize, PAGE_HEADER_SIZE);
        assert_eq!(header.entry_count, 0);
        assert_eq!(header.first_entry_id, 0);
        assert_eq!(header.last_entry_id, 0);
    }

    #[test]
    fn test_encode_decode() {
        let header = PageHeader {
            page_type: PageType::ItemReference,
            page_number: 5,
            previous_page: Some(2),
            next_page: None,
            entry_count: 3,
            first_entry_id: 10,
            last_entry_id: 42,
            current_size_bytes: 57,
        };

        let mut bytes = Vec::new();
        header.encode(&mut bytes).unwrap();
        assert_eq!(bytes.len(), PAGE_HEADER_SIZE);

        let decoded = PageHeader::decode(5, &mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_decode_rejects_undersized_page() {
        let mut header = PageHeader::new(PageType::NodeReference, 0);
        header.current_size_bytes = 4;

        let mut bytes = Vec::new();
        header.encode(&mut bytes).unwrap();

        let result = PageHeader::decode(0, &mut bytes.as_slice());
        assert!(matches!(result, Err(StorageError::CorruptPage { .. })));
    }
}
