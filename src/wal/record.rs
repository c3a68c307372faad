//! WAL record codec
//!
//! Encodes and decodes single log records and verifies their checksums.
//! Nothing outside this file knows the numeric op codes.

use std::fmt;
use std::io::{self, Read};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::Result;

/// Fixed header: op (1) + key length (4) + value length (4)
pub const HEADER_SIZE: usize = 9;

/// Trailing CRC32
pub const CHECKSUM_SIZE: usize = 4;

/// Largest key accepted on either side of the codec (1 MiB)
pub const MAX_KEY_SIZE: usize = 1 << 20;

/// Largest value accepted on either side of the codec (64 MiB)
pub const MAX_VALUE_SIZE: usize = 64 << 20;

const OP_SET: u8 = 1;
const OP_DEL: u8 = 2;

/// Kind of mutation carried by a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Set,
    Del,
}

impl Op {
    /// Wire byte for this op
    pub fn as_byte(self) -> u8 {
        match self {
            Op::Set => OP_SET,
            Op::Del => OP_DEL,
        }
    }

    /// Parse a wire byte, `None` for anything unknown
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            OP_SET => Some(Op::Set),
            OP_DEL => Some(Op::Del),
            _ => None,
        }
    }
}

/// A single decoded mutation
///
/// Decoded records own their key and value; nothing borrows from the
/// replayer's read buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Insert or overwrite a key
    Set { key: Vec<u8>, value: Vec<u8> },

    /// Remove a key
    Del { key: Vec<u8> },
}

impl Record {
    /// Build a record from an op and owned parts (the value is dropped for `Del`)
    pub fn new(op: Op, key: Vec<u8>, value: Vec<u8>) -> Self {
        match op {
            Op::Set => Record::Set { key, value },
            Op::Del => Record::Del { key },
        }
    }

    pub fn op(&self) -> Op {
        match self {
            Record::Set { .. } => Op::Set,
            Record::Del { .. } => Op::Del,
        }
    }

    pub fn key(&self) -> &[u8] {
        match self {
            Record::Set { key, .. } | Record::Del { key } => key,
        }
    }

    /// Value bytes, empty for `Del`
    pub fn value(&self) -> &[u8] {
        match self {
            Record::Set { value, .. } => value,
            Record::Del { .. } => &[],
        }
    }

    /// Size of this record on disk
    pub fn encoded_len(&self) -> usize {
        encoded_len(self.key().len(), self.value().len())
    }

    pub fn encode(&self) -> Bytes {
        encode(self.op(), self.key(), self.value())
    }
}

/// Size on disk of a record with the given key and value lengths
pub fn encoded_len(key_len: usize, value_len: usize) -> usize {
    HEADER_SIZE + key_len + value_len + CHECKSUM_SIZE
}

/// Encode a record into a fresh buffer
pub fn encode(op: Op, key: &[u8], value: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(encoded_len(key.len(), value.len()));
    encode_into(&mut buf, op, key, value);
    buf.freeze()
}

/// Append an encoded record to `buf`
///
/// Callers must keep `key` and `value` within [`MAX_KEY_SIZE`] and
/// [`MAX_VALUE_SIZE`]; `value` must be empty for [`Op::Del`].
pub fn encode_into(buf: &mut BytesMut, op: Op, key: &[u8], value: &[u8]) {
    debug_assert!(op == Op::Set || value.is_empty());

    let start = buf.len();
    buf.reserve(encoded_len(key.len(), value.len()));

    buf.put_u8(op.as_byte());
    buf.put_u32_le(key.len() as u32);
    buf.put_u32_le(value.len() as u32);
    buf.put_slice(key);
    buf.put_slice(value);

    let crc = crc32fast::hash(&buf[start..]);
    buf.put_u32_le(crc);
}

/// Outcome of decoding one record from a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A complete, checksum-valid record
    Record(Record),

    /// The stream ended before a full header could be read
    EndOfLog,

    /// The bytes at this position are not a valid record
    Corrupt(Corruption),
}

/// Why a record was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corruption {
    EmptyKey,
    KeyTooLarge(u32),
    ValueTooLarge(u32),
    UnknownOp(u8),
    /// A delete record declaring a non-empty value
    DeleteWithValue(u32),
    /// Fewer bytes remain than the header declares
    Truncated,
    ChecksumMismatch { expected: u32, actual: u32 },
}

impl fmt::Display for Corruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Corruption::EmptyKey => write!(f, "zero-length key"),
            Corruption::KeyTooLarge(len) => write!(f, "key length {} exceeds limit", len),
            Corruption::ValueTooLarge(len) => write!(f, "value length {} exceeds limit", len),
            Corruption::UnknownOp(op) => write!(f, "unknown op code {:#04x}", op),
            Corruption::DeleteWithValue(len) => {
                write!(f, "delete record carries {} value bytes", len)
            }
            Corruption::Truncated => write!(f, "record truncated"),
            Corruption::ChecksumMismatch { expected, actual } => write!(
                f,
                "checksum mismatch (stored {:#010x}, computed {:#010x})",
                expected, actual
            ),
        }
    }
}

/// Decode the next record from `reader`
///
/// Only genuine I/O failures are returned as `Err`. Running out of bytes
/// inside the header is a clean end of log; running out anywhere after it
/// is a torn record and reported as [`Corruption::Truncated`].
///
/// A checksum-valid record with an unknown op byte, or a delete carrying a
/// value, is also reported as corruption: replay stops there, and a store
/// opened with `truncate_torn_tail` cuts every record after it.
pub fn decode<R: Read>(reader: &mut R) -> Result<Decoded> {
    let mut header = [0u8; HEADER_SIZE];
    match reader.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(Decoded::EndOfLog),
        Err(e) => return Err(e.into()),
    }

    let mut fields = &header[..];
    let op_byte = fields.get_u8();
    let key_len = fields.get_u32_le();
    let value_len = fields.get_u32_le();

    // Reject garbled lengths before allocating anything for them
    if key_len == 0 {
        return Ok(Decoded::Corrupt(Corruption::EmptyKey));
    }
    if key_len as usize > MAX_KEY_SIZE {
        return Ok(Decoded::Corrupt(Corruption::KeyTooLarge(key_len)));
    }
    if value_len as usize > MAX_VALUE_SIZE {
        return Ok(Decoded::Corrupt(Corruption::ValueTooLarge(value_len)));
    }
    let op = match Op::from_byte(op_byte) {
        Some(op) => op,
        None => return Ok(Decoded::Corrupt(Corruption::UnknownOp(op_byte))),
    };
    if op == Op::Del && value_len != 0 {
        return Ok(Decoded::Corrupt(Corruption::DeleteWithValue(value_len)));
    }

    let key_len = key_len as usize;
    let body_len = key_len + value_len as usize;
    let mut payload = vec![0u8; body_len + CHECKSUM_SIZE];
    match reader.read_exact(&mut payload) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Ok(Decoded::Corrupt(Corruption::Truncated))
        }
        Err(e) => return Err(e.into()),
    }

    let expected = (&payload[body_len..]).get_u32_le();
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&header);
    hasher.update(&payload[..body_len]);
    let actual = hasher.finalize();
    if actual != expected {
        return Ok(Decoded::Corrupt(Corruption::ChecksumMismatch { expected, actual }));
    }

    payload.truncate(body_len);
    let value = payload.split_off(key_len);
    Ok(Decoded::Record(Record::new(op, payload, value)))
}
