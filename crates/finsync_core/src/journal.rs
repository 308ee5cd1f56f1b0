//! Append-only journal of store mutations.
//!
//! Every store write is one frame:
//!
//! ```text
//! magic "FJNL" (4) | version u16 (2) | length u32 (4) | payload | crc32 (4)
//! ```
//!
//! The payload is a CBOR-encoded [`JournalFrame`]: a sequence number and
//! the operations of one logical write. Appending a frame is the commit
//! point, so a multi-row pull is all-or-nothing on disk.
//!
//! During replay a frame cut short by a crash ends the journal; a complete
//! frame whose magic, version or checksum is wrong is corruption.

use crate::error::{CoreError, CoreResult};
use crate::id::{EntityId, OwnerId};
use finsync_storage::StorageBackend;
use serde::{Deserialize, Serialize};

/// Magic bytes opening every frame.
pub const JOURNAL_MAGIC: [u8; 4] = *b"FJNL";

/// Current frame format version.
pub const JOURNAL_VERSION: u16 = 1;

/// magic (4) + version (2) + length (4)
const HEADER_SIZE: usize = 10;

const CRC_SIZE: usize = 4;

/// One row-level mutation recorded in the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalOp {
    /// Insert or fully replace a row.
    Put {
        /// Table name.
        table: String,
        /// Row id.
        id: EntityId,
        /// Owning user.
        owner_id: OwnerId,
        /// Sync flag stored with the row.
        synced: bool,
        /// CBOR-encoded entity.
        payload: Vec<u8>,
    },
    /// Remove a row.
    Delete {
        /// Table name.
        table: String,
        /// Row id.
        id: EntityId,
    },
    /// Flip a row's sync flag to true.
    MarkSynced {
        /// Table name.
        table: String,
        /// Row id.
        id: EntityId,
    },
    /// Remember that a deleted row still has to be deleted remotely.
    Tombstone {
        /// Table name.
        table: String,
        /// Row id.
        id: EntityId,
        /// Owner of the deleted row.
        owner_id: OwnerId,
    },
    /// Forget a tombstone after the remote delete was confirmed.
    ClearTombstone {
        /// Table name.
        table: String,
        /// Row id.
        id: EntityId,
    },
}

impl JournalOp {
    /// Returns the table the operation touches.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::Put { table, .. }
            | Self::Delete { table, .. }
            | Self::MarkSynced { table, .. }
            | Self::Tombstone { table, .. }
            | Self::ClearTombstone { table, .. } => table,
        }
    }

    /// Short operation name for logs and dumps.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Put { .. } => "put",
            Self::Delete { .. } => "delete",
            Self::MarkSynced { .. } => "mark_synced",
            Self::Tombstone { .. } => "tombstone",
            Self::ClearTombstone { .. } => "clear_tombstone",
        }
    }
}

/// The unit of atomicity: all operations of one store write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalFrame {
    /// Store sequence assigned to this write. Rows written by it carry it
    /// as their revision.
    pub sequence: u64,
    /// Operations, applied in order.
    pub ops: Vec<JournalOp>,
}

impl JournalFrame {
    /// Encodes the frame with its envelope and checksum.
    ///
    /// # Errors
    ///
    /// Returns an error if CBOR encoding fails or the payload exceeds 4 GiB.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let mut payload = Vec::new();
        ciborium::into_writer(self, &mut payload)
            .map_err(|e| CoreError::codec(format!("encode journal frame: {e}")))?;

        let len = u32::try_from(payload.len())
            .map_err(|_| CoreError::invalid_operation("journal frame too large"))?;

        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&JOURNAL_MAGIC);
        data.extend_from_slice(&JOURNAL_VERSION.to_le_bytes());
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&payload);

        let crc = compute_crc32(&data);
        data.extend_from_slice(&crc.to_le_bytes());
        Ok(data)
    }
}

/// A frame read back from the journal with its location.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    /// Offset of the frame's first byte.
    pub offset: u64,
    /// Encoded size including envelope.
    pub len: u64,
    /// Decoded frame.
    pub frame: JournalFrame,
}

/// Iterates over the frames of a journal backend.
///
/// Yields frames until the end of the journal or the first torn frame;
/// [`JournalReader::valid_end`] then reports where intact data stops.
pub struct JournalReader<'a> {
    backend: &'a dyn StorageBackend,
    size: u64,
    offset: u64,
    done: bool,
}

impl<'a> JournalReader<'a> {
    /// Starts reading at offset zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend size cannot be read.
    pub fn new(backend: &'a dyn StorageBackend) -> CoreResult<Self> {
        Ok(Self {
            backend,
            size: backend.size()?,
            offset: 0,
            done: false,
        })
    }

    /// Offset just past the last intact frame read so far.
    #[must_use]
    pub fn valid_end(&self) -> u64 {
        self.offset
    }

    /// Total backend size when reading started.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    fn read_frame(&mut self) -> CoreResult<Option<FrameRecord>> {
        let start = self.offset;
        let remaining = self.size - start;
        if remaining < (HEADER_SIZE + CRC_SIZE) as u64 {
            return Ok(None);
        }

        let header = self.backend.read_at(start, HEADER_SIZE)?;
        if header[0..4] != JOURNAL_MAGIC {
            return Err(CoreError::journal_corruption(start, "bad frame magic"));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != JOURNAL_VERSION {
            return Err(CoreError::journal_corruption(
                start,
                format!("unsupported frame version {version}"),
            ));
        }
        let len = u32::from_le_bytes([header[6], header[7], header[8], header[9]]) as u64;

        let total = HEADER_SIZE as u64 + len + CRC_SIZE as u64;
        if remaining < total {
            return Ok(None);
        }

        let body = self.backend.read_at(start, total as usize)?;
        let crc_at = body.len() - CRC_SIZE;
        let stored = u32::from_le_bytes([
            body[crc_at],
            body[crc_at + 1],
            body[crc_at + 2],
            body[crc_at + 3],
        ]);
        let actual = compute_crc32(&body[..crc_at]);
        if stored != actual {
            return Err(CoreError::journal_corruption(
                start,
                format!("checksum mismatch: expected {stored:08x}, got {actual:08x}"),
            ));
        }

        let frame: JournalFrame = ciborium::from_reader(&body[HEADER_SIZE..crc_at])
            .map_err(|e| CoreError::journal_corruption(start, format!("undecodable frame: {e}")))?;

        self.offset = start + total;
        Ok(Some(FrameRecord {
            offset: start,
            len: total,
            frame,
        }))
    }
}

impl Iterator for JournalReader<'_> {
    type Item = CoreResult<FrameRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_frame() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Computes the IEEE CRC32 of `data`.
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsync_storage::InMemoryBackend;

    fn put(id: &str) -> JournalOp {
        JournalOp::Put {
            table: "wallets".into(),
            id: EntityId::from(id),
            owner_id: OwnerId::new("u1"),
            synced: false,
            payload: vec![0xA1, 0x01, 0x02],
        }
    }

    fn frame(sequence: u64, ops: Vec<JournalOp>) -> Vec<u8> {
        JournalFrame { sequence, ops }.encode().unwrap()
    }

    #[test]
    fn frames_read_back_in_order() {
        let mut backend = InMemoryBackend::new();
        backend.append(&frame(1, vec![put("a")])).unwrap();
        backend
            .append(&frame(2, vec![put("b"), JournalOp::Delete {
                table: "wallets".into(),
                id: EntityId::from("a"),
            }]))
            .unwrap();

        let frames: Vec<_> = JournalReader::new(&backend)
            .unwrap()
            .collect::<CoreResult<_>>()
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].frame.sequence, 1);
        assert_eq!(frames[1].frame.ops.len(), 2);
        assert_eq!(frames[1].offset, frames[0].len);
    }

    #[test]
    fn torn_tail_ends_the_journal() {
        let mut backend = InMemoryBackend::new();
        let first = frame(1, vec![put("a")]);
        let second = frame(2, vec![put("b")]);
        backend.append(&first).unwrap();
        backend.append(&second[..second.len() - 3]).unwrap();

        let mut reader = JournalReader::new(&backend).unwrap();
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().is_none());
        assert_eq!(reader.valid_end(), first.len() as u64);
    }

    #[test]
    fn flipped_byte_is_corruption() {
        let mut bytes = frame(1, vec![put("a")]);
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0xFF;
        let backend = InMemoryBackend::with_data(bytes);

        let result = JournalReader::new(&backend).unwrap().next().unwrap();
        assert!(matches!(result, Err(CoreError::JournalCorruption { offset: 0, .. })));
    }

    #[test]
    fn bad_magic_is_corruption() {
        let mut bytes = frame(1, vec![put("a")]);
        bytes[0] = b'X';
        let backend = InMemoryBackend::with_data(bytes);

        let result = JournalReader::new(&backend).unwrap().next().unwrap();
        assert!(matches!(result, Err(CoreError::JournalCorruption { .. })));
    }

    #[test]
    fn crc32_known_value() {
        assert_eq!(compute_crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(compute_crc32(b""), 0);
    }

    #[test]
    fn op_accessors() {
        let op = put("a");
        assert_eq!(op.table(), "wallets");
        assert_eq!(op.kind(), "put");
    }
}
