//! Tests for WAL Recovery
//!
//! These tests verify:
//! - Recovery from a clean WAL and from an empty or missing one
//! - Torn tails at every possible cut point
//! - Checksum sensitivity to single-bit flips
//! - Verify mode (stats only, file untouched)

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use walkv::config::SyncPolicy;
use walkv::wal::{encode, Corruption, Op, Record, StopReason, WalRecovery, WalWriter};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

/// Write records using WalWriter (produces a well-formed WAL)
fn write_records_via_writer(path: &PathBuf, count: usize) {
    let mut writer = WalWriter::open(path, SyncPolicy::EveryWrite).unwrap();
    for i in 0..count {
        writer
            .append_set(format!("key{}", i).as_bytes(), format!("value{}", i).as_bytes())
            .unwrap();
    }
}

/// Write raw bytes directly to a file (for crafting corruption)
fn write_raw(path: &PathBuf, bytes: &[u8]) {
    let mut file = File::create(path).unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

fn recover(path: &PathBuf) -> (Vec<Record>, walkv::wal::RecoveryResult) {
    let mut records = Vec::new();
    let result = WalRecovery::replay(path, 4096, |r| records.push(r)).unwrap();
    (records, result)
}

/// Three records: SET a, SET b, DEL a
fn three_records() -> Vec<Vec<u8>> {
    vec![
        encode(Op::Set, b"a", b"1").to_vec(),
        encode(Op::Set, b"b", b"22").to_vec(),
        encode(Op::Del, b"a", &[]).to_vec(),
    ]
}

// =============================================================================
// Clean WAL Tests
// =============================================================================

#[test]
fn test_recover_missing_file() {
    let (_temp, wal_path) = setup_temp_wal();

    let (records, result) = recover(&wal_path);

    assert!(records.is_empty());
    assert_eq!(result.records_applied, 0);
    assert_eq!(result.stop, StopReason::EndOfLog);
    assert!(!wal_path.exists());
}

#[test]
fn test_recover_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let (records, result) = recover(&wal_path);

    assert!(records.is_empty());
    assert_eq!(result.valid_len, 0);
    assert_eq!(result.file_len, 0);
    assert!(!result.has_torn_tail());
}

#[test]
fn test_recover_multiple_records() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records_via_writer(&wal_path, 10);

    let (records, result) = recover(&wal_path);

    assert_eq!(records.len(), 10);
    assert_eq!(result.records_applied, 10);
    assert_eq!(result.sets, 10);
    assert_eq!(result.deletes, 0);
    assert_eq!(result.stop, StopReason::EndOfLog);
    assert_eq!(result.valid_len, result.file_len);

    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.key(), format!("key{}", i).as_bytes());
        assert_eq!(record.value(), format!("value{}", i).as_bytes());
    }
}

#[test]
fn test_recover_preserves_operations() {
    let (_temp, wal_path) = setup_temp_wal();
    write_raw(&wal_path, &three_records().concat());

    let (records, result) = recover(&wal_path);

    assert_eq!(result.sets, 2);
    assert_eq!(result.deletes, 1);
    assert!(matches!(records[0], Record::Set { .. }));
    assert!(matches!(records[1], Record::Set { .. }));
    assert!(matches!(records[2], Record::Del { .. }));
}

#[test]
fn test_replay_is_repeatable() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records_via_writer(&wal_path, 25);

    let (first, first_result) = recover(&wal_path);
    let (second, second_result) = recover(&wal_path);

    assert_eq!(first, second);
    assert_eq!(first_result, second_result);
}

#[test]
fn test_replay_leaves_writer_position_alone() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, SyncPolicy::Never).unwrap();
    writer.append_set(b"k1", b"v1").unwrap();

    let (records, _) = recover(&wal_path);
    assert_eq!(records.len(), 1);

    writer.append_set(b"k2", b"v2").unwrap();
    let (records, _) = recover(&wal_path);
    assert_eq!(records.len(), 2);
}

#[test]
fn test_tiny_read_buffer() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records_via_writer(&wal_path, 5);

    let mut count = 0;
    WalRecovery::replay(&wal_path, 1, |_| count += 1).unwrap();
    assert_eq!(count, 5);
}

// =============================================================================
// Torn Tail Tests
// =============================================================================

#[test]
fn test_recover_stray_bytes_after_records() {
    let (_temp, wal_path) = setup_temp_wal();

    // Two complete records, then 3 bytes of a header that never finished
    let mut bytes = three_records()[..2].concat();
    let valid = bytes.len() as u64;
    bytes.extend_from_slice(&[1, 0, 0]);
    write_raw(&wal_path, &bytes);

    let (records, result) = recover(&wal_path);

    assert_eq!(records.len(), 2);
    assert_eq!(result.stop, StopReason::EndOfLog);
    assert_eq!(result.valid_len, valid);
    assert!(result.has_torn_tail());
    assert_eq!(result.torn_bytes(), 3);
}

#[test]
fn test_recover_truncated_at_every_offset_of_last_record() {
    let (_temp, wal_path) = setup_temp_wal();

    let records = three_records();
    let full = records.concat();
    let prefix_len = records[0].len() + records[1].len();

    for cut in prefix_len + 1..full.len() {
        write_raw(&wal_path, &full[..cut]);

        let (recovered, result) = recover(&wal_path);

        assert_eq!(recovered.len(), 2, "cut at {}", cut);
        assert_eq!(result.valid_len, prefix_len as u64, "cut at {}", cut);
        assert!(result.has_torn_tail(), "cut at {}", cut);
    }
}

#[test]
fn test_recover_truncated_payload_reports_corruption() {
    let (_temp, wal_path) = setup_temp_wal();

    let records = three_records();
    let mut bytes = records[0].clone();
    bytes.extend_from_slice(&records[1][..records[1].len() - 2]);
    write_raw(&wal_path, &bytes);

    let (_, result) = recover(&wal_path);

    assert_eq!(
        result.stop,
        StopReason::Corrupt {
            offset: records[0].len() as u64,
            cause: Corruption::Truncated,
        }
    );
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_recover_corrupted_value_byte() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut bad = encode(Op::Set, b"x", b"y").to_vec();
    bad[10] ^= 0xFF; // the single value byte
    write_raw(&wal_path, &bad);

    let (records, result) = recover(&wal_path);

    assert!(records.is_empty());
    assert!(matches!(
        result.stop,
        StopReason::Corrupt { offset: 0, cause: Corruption::ChecksumMismatch { .. } }
    ));
}

#[test]
fn test_corruption_hides_every_later_record() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut records = three_records();
    let flip_at = records[1].len() / 2;
    records[1][flip_at] ^= 0x10;
    write_raw(&wal_path, &records.concat());

    let (recovered, result) = recover(&wal_path);

    // The third record is intact but follows the corrupt one
    assert_eq!(recovered.len(), 1);
    assert_eq!(result.valid_len, records[0].len() as u64);
}

#[test]
fn test_any_single_bit_flip_stops_replay() {
    let (_temp, wal_path) = setup_temp_wal();

    let records = three_records();
    let start = records[0].len();
    let end = start + records[1].len();
    let clean = records.concat();

    for byte in start..end {
        for bit in 0..8 {
            let mut bytes = clean.clone();
            bytes[byte] ^= 1 << bit;
            write_raw(&wal_path, &bytes);

            let (recovered, result) = recover(&wal_path);

            assert_eq!(recovered.len(), 1, "flip byte {} bit {}", byte, bit);
            assert_eq!(result.valid_len, start as u64, "flip byte {} bit {}", byte, bit);
            assert!(
                matches!(result.stop, StopReason::Corrupt { .. }),
                "flip byte {} bit {}",
                byte,
                bit
            );
        }
    }
}

#[test]
fn test_zero_filled_tail_is_corruption() {
    let (_temp, wal_path) = setup_temp_wal();

    // Preallocated-but-unwritten space reads as zeros
    let mut bytes = three_records()[0].clone();
    bytes.extend_from_slice(&[0u8; 64]);
    write_raw(&wal_path, &bytes);

    let (recovered, result) = recover(&wal_path);

    assert_eq!(recovered.len(), 1);
    assert!(matches!(
        result.stop,
        StopReason::Corrupt { cause: Corruption::EmptyKey, .. }
    ));
}

// =============================================================================
// Verify Tests
// =============================================================================

#[test]
fn test_verify_clean_wal() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records_via_writer(&wal_path, 5);

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.records_applied, 5);
    assert!(!result.has_torn_tail());
}

#[test]
fn test_verify_does_not_modify_file() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records_via_writer(&wal_path, 3);

    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[0xde, 0xad]).unwrap();
    drop(file);
    let before = fs::read(&wal_path).unwrap();

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.records_applied, 3);
    assert_eq!(result.torn_bytes(), 2);
    assert_eq!(fs::read(&wal_path).unwrap(), before);
}
