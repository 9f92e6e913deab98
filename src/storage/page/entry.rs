//! Page entry variants and their wire encoding.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageType;

/// Fixed wire size of node-reference and item-reference entries.
pub const REFERENCE_ENTRY_SIZE: usize = 12;

/// Wire size of an item-key entry before its key bytes.
pub const ITEM_KEY_ENTRY_BASE_SIZE: usize = 6;

/// A single record inside a page.
///
/// Entries within a page are kept sorted ascending by owner id; several
/// entries may share one owner (a trie node with many children or items).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A trie edge: `owner_id` has a child `child_node_id` reached through
    /// `matched_char`.
    NodeReference {
        owner_id: u32,
        child_node_id: u32,
        matched_char: char,
    },
    /// An occurrence of an indexed item at a word position under the owning
    /// trie node.
    ItemReference {
        owner_id: u32,
        item_id: u32,
        word_position: u32,
    },
    /// A catalog record binding an item id to its external key. Owned by the
    /// item id itself.
    ItemKey { item_id: u32, key: String },
}

impl Entry {
    /// Id of the trie node (or item, for catalog records) this entry
    /// belongs to.
    pub fn owner_id(&self) -> u32 {
        match self {
            Entry::NodeReference { owner_id, .. } => *owner_id,
            Entry::ItemReference { owner_id, .. } => *owner_id,
            Entry::ItemKey { item_id, .. } => *item_id,
        }
    }

    /// Id of the thing the entry points at.
    pub fn referenced_id(&self) -> u32 {
        match self {
            Entry::NodeReference { child_node_id, .. } => *child_node_id,
            Entry::ItemReference { item_id, .. } => *item_id,
            Entry::ItemKey { item_id, .. } => *item_id,
        }
    }

    /// Bytes this entry occupies on disk.
    pub fn size_bytes(&self) -> usize {
        match self {
            Entry::NodeReference { .. } | Entry::ItemReference { .. } => REFERENCE_ENTRY_SIZE,
            Entry::ItemKey { key, .. } => ITEM_KEY_ENTRY_BASE_SIZE + key.len(),
        }
    }

    /// The page category this entry kind is stored in.
    pub fn page_type(&self) -> PageType {
        match self {
            Entry::NodeReference { .. } => PageType::NodeReference,
            Entry::ItemReference { .. } => PageType::ItemReference,
            Entry::ItemKey { .. } => PageType::ItemKey,
        }
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> StorageResult<()> {
        match self {
            Entry::NodeReference {
                owner_id,
                child_node_id,
                matched_char,
            } => {
                writer.write_u32::<LittleEndian>(*owner_id)?;
                writer.write_u32::<LittleEndian>(*child_node_id)?;
                writer.write_u32::<LittleEndian>(*matched_char as u32)?;
            }
            Entry::ItemReference {
                owner_id,
                item_id,
                word_position,
            } => {
                writer.write_u32::<LittleEndian>(*owner_id)?;
                writer.write_u32::<LittleEndian>(*item_id)?;
                writer.write_u32::<LittleEndian>(*word_position)?;
            }
            Entry::ItemKey { item_id, key } => {
                writer.write_u32::<LittleEndian>(*item_id)?;
                writer.write_u16::<LittleEndian>(key.len() as u16)?;
                writer.write_all(key.as_bytes())?;
            }
        }
        Ok(())
    }

    /// Decodes one entry of the kind held by `page_type` pages.
    pub fn decode<R: Read>(page_type: PageType, reader: &mut R) -> StorageResult<Self> {
        match page_type {
            PageType::NodeReference => {
                let owner_id = reader.read_u32::<LittleEndian>()?;
                let child_node_id = reader.read_u32::<LittleEndian>()?;
                let raw_char = reader.read_u32::<LittleEndian>()?;
                let matched_char =
                    char::from_u32(raw_char).ok_or_else(|| StorageError::CorruptPage {
                        detail: format!("invalid character scalar {raw_char} in node reference"),
                    })?;
                Ok(Entry::NodeReference {
                    owner_id,
                    child_node_id,
                    matched_char,
                })
            }
            PageType::ItemReference => {
                let owner_id = reader.read_u32::<LittleEndian>()?;
                let item_id = reader.read_u32::<LittleEndian>()?;
                let word_position = reader.read_u32::<LittleEndian>()?;
                Ok(Entry::ItemReference {
                    owner_id,
                    item_id,
                    word_position,
                })
            }
            PageType::ItemKey => {
                let item_id = reader.read_u32::<LittleEndian>()?;
                let key_len = reader.read_u16::<LittleEndian>()? as usize;
                let mut key_bytes = vec![0u8; key_len];
                reader.read_exact(&mut key_bytes)?;
                let key = String::from_utf8(key_bytes).map_err(|e| StorageError::CorruptPage {
                    detail: format!("item key is not valid UTF-8: {e}"),
                })?;
                Ok(Entry::ItemKey { item_id, key })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_sizes() {
        let node = Entry::NodeReference {
            owner_id: 1,
            child_node_id: 2,
            matched_char: 'x',
        };
        let item = Entry::ItemReference {
            owner_id: 1,
            item_id: 9,
            word_position: 3,
        };
        let key = Entry::ItemKey {
            item_id: 4,
            key: "docs/a.txt".to_string(),
        };

        assert_eq!(node.size_bytes(), 12);
        assert_eq!(item.size_bytes(), 12);
        assert_eq!(key.size_bytes(), 6 + 10);
    }

    #[test]
    fn test_encode_decode() {
        let entries = [
            Entry::NodeReference {
                owner_id: 7,
                child_node_id: 8,
                matched_char: 'é',
            },
            Entry::ItemReference {
                owner_id: 7,
                item_id: 44,
                word_position: 12,
            },
            Entry::ItemKey {
                item_id: 44,
                key: "kƏy".to_string(),
            },
        ];

        for entry in &entries {
            let mut bytes = Vec::new();
            entry.encode(&mut bytes).unwrap();
            assert_eq!(bytes.len(), entry.size_bytes());

            let decoded = Entry::decode(entry.page_type(), &mut bytes.as_slice()).unwrap();
            assert_eq!(&decoded, entry);
        }
    }

    #[test]
    fn test_decode_rejects_bad_scalar() {
        let mut bytes = Vec::new();
        Entry::ItemReference {
            owner_id: 1,
            item_id: 2,
            word_position: 0xD800, // surrogate range, not a valid char scalar
        }
        .encode(&mut bytes)
        .unwrap();

        let result = Entry::decode(PageType::NodeReference, &mut bytes.as_slice());
        assert!(matches!(result, Err(StorageError::CorruptPage { .. })));
    }
}
