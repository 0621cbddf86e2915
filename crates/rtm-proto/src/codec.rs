//! Length-prefixed binary encoding of route entries and tables
//!
//! All multi-byte integers are little-endian. An entry record is
//! self-describing: a leading `u32` total length (counting itself), then
//! each field as a `u32` byte-length prefix followed by the field bytes:
//!
//! ```text
//! total_length : u32          = 29 + len(interface)
//! 4u32  destination : u32
//! 4u32  gateway     : u32
//! 1u32  mask        : u8
//! Nu32  interface   : N bytes, no NUL terminator
//! ```
//!
//! A table record is `total_bytes u32 | entry_count u32 | entry..` with the
//! entries in ascending key order. Declared lengths are never trusted past
//! the buffer bound; every field read is bounds-checked first.

use byteorder::{ByteOrder, LittleEndian};
use rtm_types::{RouteEntry, RoutingTable};

use crate::error::{CodecError, Result};

/// Framing bytes around an entry's payload: the record length plus four
/// per-field length prefixes.
const ENTRY_FRAMING_LEN: usize = 5 * 4;

/// Table record header: total byte count plus entry count.
const TABLE_HEADER_LEN: usize = 2 * 4;

/// Encoded size of an entry record, framing included.
pub fn encoded_entry_len(entry: &RouteEntry) -> usize {
    ENTRY_FRAMING_LEN + entry.payload_len()
}

/// Encode one entry into a freshly sized buffer. Infallible for any
/// well-formed entry, interface names of length 0 included.
pub fn encode_entry(entry: &RouteEntry) -> Vec<u8> {
    let total = encoded_entry_len(entry);
    let mut buf = Vec::with_capacity(total);

    put_u32(&mut buf, total as u32);
    put_u32(&mut buf, 4);
    put_u32(&mut buf, entry.destination);
    put_u32(&mut buf, 4);
    put_u32(&mut buf, entry.gateway);
    put_u32(&mut buf, 1);
    buf.push(entry.mask);
    put_u32(&mut buf, entry.interface.len() as u32);
    buf.extend_from_slice(entry.interface.as_bytes());

    debug_assert_eq!(buf.len(), total);
    buf
}

/// Decode one entry from the front of `buf`.
///
/// Returns the entry and the number of bytes consumed. Fails with
/// [`CodecError::TruncatedInput`] when the buffer ends before a declared
/// field does, and [`CodecError::MalformedLength`] when the internal length
/// accounting is inconsistent.
pub fn decode_entry(buf: &[u8]) -> Result<(RouteEntry, usize)> {
    let mut reader = Reader::new(buf);

    let total = reader.read_u32()? as usize;

    expect_field_len(&mut reader, "destination", 4)?;
    let destination = reader.read_u32()?;

    expect_field_len(&mut reader, "gateway", 4)?;
    let gateway = reader.read_u32()?;

    expect_field_len(&mut reader, "mask", 1)?;
    let mask = reader.read_u8()?;

    let oif_len = reader.read_u32()? as usize;
    let oif_bytes = reader.read_bytes(oif_len)?;
    let interface = std::str::from_utf8(oif_bytes)?.to_string();

    if total != reader.consumed() {
        return Err(CodecError::MalformedLength {
            field: "entry",
            declared: total,
            expected: reader.consumed(),
        });
    }

    Ok((
        RouteEntry {
            destination,
            mask,
            gateway,
            interface,
        },
        total,
    ))
}

/// Encode a full table: header followed by every entry in ascending key
/// order.
pub fn encode_table(table: &RoutingTable) -> Vec<u8> {
    let total = TABLE_HEADER_LEN + table.iter().map(encoded_entry_len).sum::<usize>();
    let mut buf = Vec::with_capacity(total);

    put_u32(&mut buf, total as u32);
    put_u32(&mut buf, table.size() as u32);
    for entry in table.iter() {
        buf.extend_from_slice(&encode_entry(entry));
    }

    debug_assert_eq!(buf.len(), total);
    buf
}

/// Decode a full table from the front of `buf` into a fresh table.
///
/// Reads exactly `entry_count` self-delimited entries. A mismatch between
/// the declared total and the bytes those entries actually span signals
/// [`CodecError::TruncatedInput`].
pub fn decode_table(buf: &[u8]) -> Result<(RoutingTable, usize)> {
    let mut reader = Reader::new(buf);
    let total = reader.read_u32()? as usize;
    let entry_count = reader.read_u32()? as usize;

    let mut table = RoutingTable::new();
    let mut offset = TABLE_HEADER_LEN;
    for _ in 0..entry_count {
        let (entry, used) = decode_entry(&buf[offset..])?;
        table.create_entry(entry);
        offset += used;
    }

    if offset != total {
        return Err(CodecError::TruncatedInput {
            needed: total,
            available: offset,
        });
    }

    Ok((table, offset))
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    let mut word = [0u8; 4];
    LittleEndian::write_u32(&mut word, value);
    buf.extend_from_slice(&word);
}

fn expect_field_len(reader: &mut Reader<'_>, field: &'static str, expected: usize) -> Result<()> {
    let declared = reader.read_u32()? as usize;
    if declared != expected {
        return Err(CodecError::MalformedLength {
            field,
            declared,
            expected,
        });
    }
    Ok(())
}

/// Bounds-checked cursor over an input slice.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn consumed(&self) -> usize {
        self.pos
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let available = self.buf.len() - self.pos;
        if len > available {
            return Err(CodecError::TruncatedInput {
                needed: len,
                available,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(LittleEndian::read_u32(bytes))
    }

    fn read_u8(&mut self) -> Result<u8> {
        let bytes = self.read_bytes(1)?;
        Ok(bytes[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rtm_types::parse_address;

    fn entry(dest: &str, mask: u8, gw: &str, oif: &str) -> RouteEntry {
        RouteEntry::new(
            parse_address(dest).unwrap(),
            mask,
            parse_address(gw).unwrap(),
            oif,
        )
    }

    #[test]
    fn test_entry_exact_byte_layout() {
        let e = entry("10.0.0.1", 32, "10.0.0.254", "eth0");
        let bytes = encode_entry(&e);

        // 20 framing bytes + 9 payload bytes + 4 interface bytes.
        assert_eq!(bytes.len(), 33);
        #[rustfmt::skip]
        let expected: Vec<u8> = vec![
            33, 0, 0, 0,            // total_length
            4, 0, 0, 0,             // destination length
            0x01, 0x00, 0x00, 0x0a, // 10.0.0.1 as little-endian u32
            4, 0, 0, 0,             // gateway length
            0xfe, 0x00, 0x00, 0x0a, // 10.0.0.254 as little-endian u32
            1, 0, 0, 0,             // mask length
            32,                     // mask
            4, 0, 0, 0,             // interface length
            b'e', b't', b'h', b'0',
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_entry_round_trip() {
        let e = entry("122.1.1.1", 32, "10.1.1.1", "ens31");
        let bytes = encode_entry(&e);
        let (decoded, used) = decode_entry(&bytes).unwrap();
        assert_eq!(used, bytes.len());
        assert_eq!(decoded, e);
    }

    #[test]
    fn test_entry_round_trip_empty_interface() {
        let e = entry("0.0.0.0", 0, "255.255.255.255", "");
        let bytes = encode_entry(&e);
        assert_eq!(bytes.len(), 29);
        let (decoded, used) = decode_entry(&bytes).unwrap();
        assert_eq!(used, 29);
        assert_eq!(decoded, e);
    }

    #[test]
    fn test_entry_decode_ignores_trailing_bytes() {
        let e = entry("10.0.0.1", 32, "10.0.0.254", "eth0");
        let mut bytes = encode_entry(&e);
        bytes.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        let (decoded, used) = decode_entry(&bytes).unwrap();
        assert_eq!(used, 33);
        assert_eq!(decoded, e);
    }

    #[test]
    fn test_entry_decode_truncated_at_every_boundary() {
        let e = entry("10.0.0.1", 32, "10.0.0.254", "eth0");
        let bytes = encode_entry(&e);
        for len in 0..bytes.len() {
            let err = decode_entry(&bytes[..len]).unwrap_err();
            assert!(
                matches!(err, CodecError::TruncatedInput { .. }),
                "unexpected error at cut {len}: {err}"
            );
        }
    }

    #[test]
    fn test_entry_decode_rejects_bad_field_length() {
        let e = entry("10.0.0.1", 32, "10.0.0.254", "eth0");
        let mut bytes = encode_entry(&e);
        // Corrupt the destination field's declared length.
        bytes[4] = 2;
        let err = decode_entry(&bytes).unwrap_err();
        assert!(matches!(
            err,
            CodecError::MalformedLength {
                field: "destination",
                declared: 2,
                expected: 4,
            }
        ));
    }

    #[test]
    fn test_entry_decode_rejects_inconsistent_total() {
        let e = entry("10.0.0.1", 32, "10.0.0.254", "eth0");
        let mut bytes = encode_entry(&e);
        bytes[0] = bytes[0].wrapping_add(1);
        let err = decode_entry(&bytes).unwrap_err();
        assert!(matches!(
            err,
            CodecError::MalformedLength { field: "entry", .. }
        ));
    }

    #[test]
    fn test_entry_decode_rejects_oversized_interface_length() {
        let e = entry("10.0.0.1", 32, "10.0.0.254", "eth0");
        let mut bytes = encode_entry(&e);
        // Declare far more interface bytes than the buffer holds.
        let oif_len_offset = 25;
        bytes[oif_len_offset..oif_len_offset + 4].copy_from_slice(&1_000u32.to_le_bytes());
        let err = decode_entry(&bytes).unwrap_err();
        assert!(matches!(
            err,
            CodecError::TruncatedInput {
                needed: 1000,
                available: 4,
            }
        ));
    }

    #[test]
    fn test_entry_decode_rejects_invalid_utf8_interface() {
        let e = entry("10.0.0.1", 32, "10.0.0.254", "eth0");
        let mut bytes = encode_entry(&e);
        bytes[29] = 0xff;
        let err = decode_entry(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::MalformedInterface(_)));
    }

    #[test]
    fn test_empty_table_round_trip() {
        let table = RoutingTable::new();
        let bytes = encode_table(&table);
        assert_eq!(bytes, vec![8, 0, 0, 0, 0, 0, 0, 0]);

        let (decoded, used) = decode_table(&bytes).unwrap();
        assert_eq!(used, 8);
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_table_round_trip() {
        let table: RoutingTable = vec![
            entry("157.0.2.3", 24, "20.1.1.1", "eth2"),
            entry("122.1.1.1", 32, "10.1.1.1", "eth0"),
            entry("130.1.1.0", 24, "10.1.1.1", "eth1"),
        ]
        .into_iter()
        .collect();

        let bytes = encode_table(&table);
        let (decoded, used) = decode_table(&bytes).unwrap();
        assert_eq!(used, bytes.len());
        assert_eq!(decoded, table);
    }

    #[test]
    fn test_table_entries_emitted_in_key_order() {
        let table: RoutingTable = vec![
            entry("157.0.2.3", 24, "20.1.1.1", "eth2"),
            entry("122.1.1.1", 32, "10.1.1.1", "eth0"),
        ]
        .into_iter()
        .collect();

        let bytes = encode_table(&table);
        let (first, _) = decode_entry(&bytes[8..]).unwrap();
        assert_eq!(first.destination, parse_address("122.1.1.1").unwrap());
    }

    #[test]
    fn test_table_decode_rejects_count_byte_mismatch() {
        let table: RoutingTable = vec![entry("10.0.0.1", 32, "10.0.0.254", "eth0")]
            .into_iter()
            .collect();
        let mut bytes = encode_table(&table);
        // Declare one more byte than the single entry spans.
        let total = bytes.len() as u32 + 1;
        bytes[..4].copy_from_slice(&total.to_le_bytes());

        let err = decode_table(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::TruncatedInput { .. }));
    }

    #[test]
    fn test_table_decode_truncated_entry_list() {
        let table: RoutingTable = vec![
            entry("10.0.0.1", 32, "10.0.0.254", "eth0"),
            entry("10.0.0.2", 32, "10.0.0.254", "eth1"),
        ]
        .into_iter()
        .collect();
        let bytes = encode_table(&table);

        let err = decode_table(&bytes[..bytes.len() - 5]).unwrap_err();
        assert!(matches!(err, CodecError::TruncatedInput { .. }));
    }

    #[test]
    fn test_table_decode_last_write_wins_on_duplicate_keys() {
        // Hand-build a table record carrying the same destination twice.
        let a = entry("10.0.0.1", 32, "10.0.0.254", "eth0");
        let b = entry("10.0.0.1", 24, "10.0.0.1", "eth1");
        let ea = encode_entry(&a);
        let eb = encode_entry(&b);

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&((8 + ea.len() + eb.len()) as u32).to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&ea);
        bytes.extend_from_slice(&eb);

        let (decoded, _) = decode_table(&bytes).unwrap();
        assert_eq!(decoded.size(), 1);
        assert_eq!(decoded.get(a.destination).unwrap(), &b);
    }
}
