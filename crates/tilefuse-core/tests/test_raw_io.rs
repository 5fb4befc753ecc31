mod common;

use std::fs;

use approx::assert_abs_diff_eq;
use ndarray::Array3;

use tilefuse_core::error::StitchError;
use tilefuse_core::grid::TileShape;
use tilefuse_core::io::raw::{RAW_HEADER_SIZE, RAW_MAGIC};
use tilefuse_core::io::{write_raw_tile, RawTileReader, SlabSource};

fn random_volume(seed: u64, d: usize, v: usize, h: usize) -> Array3<f32> {
    let mut rng = common::Lcg::new(seed);
    let mut out = Array3::<f32>::zeros((d, v, h));
    for value in out.iter_mut() {
        *value = rng.next_f32();
    }
    out
}

#[test]
fn test_roundtrip_16_bit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tile.raw");
    let volume = random_volume(1, 4, 6, 5);

    write_raw_tile(&path, &volume, 16).unwrap();
    let reader = RawTileReader::open(&path).unwrap();
    assert_eq!(
        reader.shape(),
        TileShape {
            height: 6,
            width: 5,
            depth: 4
        }
    );
    assert_eq!(reader.header.bit_depth, 16);

    let back = reader.read_slab(0, 6, 0, 5, 0, 4).unwrap();
    for (a, b) in volume.iter().zip(back.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-4);
    }
}

#[test]
fn test_roundtrip_8_bit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tile.raw");
    let volume = random_volume(2, 3, 4, 4);

    write_raw_tile(&path, &volume, 8).unwrap();
    let reader = RawTileReader::open(&path).unwrap();
    assert_eq!(reader.header.bit_depth, 8);

    let back = reader.read_slab(0, 4, 0, 4, 0, 3).unwrap();
    for (a, b) in volume.iter().zip(back.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 5e-3);
    }
}

#[test]
fn test_sub_slab_matches_direct_slice() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tile.raw");
    let volume = random_volume(3, 6, 8, 8);
    write_raw_tile(&path, &volume, 16).unwrap();

    let reader = RawTileReader::open(&path).unwrap();
    let slab = reader.read_slab(2, 7, 1, 5, 1, 4).unwrap();
    assert_eq!(slab.dim(), (3, 5, 4));

    let expect = volume.slice(ndarray::s![1..4, 2..7, 1..5]);
    for (a, b) in expect.iter().zip(slab.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-4);
    }
}

#[test]
fn test_window_bounds_are_checked() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tile.raw");
    write_raw_tile(&path, &random_volume(4, 2, 4, 4), 16).unwrap();
    let reader = RawTileReader::open(&path).unwrap();

    let err = reader.read_slab(0, 5, 0, 4, 0, 2).unwrap_err();
    assert!(matches!(err, StitchError::InvalidInput(_)), "{err}");
    let err = reader.read_slab(2, 2, 0, 4, 0, 2).unwrap_err();
    assert!(matches!(err, StitchError::InvalidInput(_)), "{err}");
}

#[test]
fn test_rejects_bad_magic() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bogus.raw");
    let mut bytes = vec![0u8; RAW_HEADER_SIZE + 16];
    bytes[0..8].copy_from_slice(b"NOTATILE");
    fs::write(&path, &bytes).unwrap();

    let err = RawTileReader::open(&path).unwrap_err();
    assert!(matches!(err, StitchError::InvalidRaw(_)), "{err}");
}

#[test]
fn test_rejects_truncated_payload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.raw");
    let full = dir.path().join("full.raw");
    write_raw_tile(&full, &random_volume(5, 2, 4, 4), 16).unwrap();
    let bytes = fs::read(&full).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 8]).unwrap();

    let err = RawTileReader::open(&path).unwrap_err();
    assert!(matches!(err, StitchError::InvalidRaw(_)), "{err}");
    assert!(bytes.starts_with(RAW_MAGIC));
}

#[test]
fn test_rejects_unsupported_bit_depth() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tile.raw");
    let err = write_raw_tile(&path, &random_volume(6, 2, 4, 4), 12).unwrap_err();
    assert!(matches!(err, StitchError::InvalidInput(_)), "{err}");
}
