//! Memory-mapped raw tile store.
//!
//! One file per tile: a 24-byte little-endian header followed by the voxel
//! payload, depth-major, each slice row-major. 8-bit payloads store one byte
//! per voxel, 16-bit payloads two.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use memmap2::Mmap;
use ndarray::Array3;
use num_traits::{Bounded, ToPrimitive};

use crate::error::{Result, StitchError};
use crate::grid::TileShape;

use super::{check_window, SlabSource};

pub const RAW_MAGIC: &[u8; 8] = b"TFRAWV01";
pub const RAW_HEADER_SIZE: usize = 24;

/// Raw tile file header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawHeader {
    pub height: u32,
    pub width: u32,
    pub depth: u32,
    pub bit_depth: u16,
    pub channels: u16,
}

impl RawHeader {
    pub fn bytes_per_voxel(&self) -> usize {
        if self.bit_depth <= 8 {
            1
        } else {
            2
        }
    }

    pub fn payload_size(&self) -> usize {
        self.height as usize * self.width as usize * self.depth as usize * self.bytes_per_voxel()
    }

    pub fn shape(&self) -> TileShape {
        TileShape {
            height: self.height as usize,
            width: self.width as usize,
            depth: self.depth as usize,
        }
    }
}

fn parse_header(buf: &[u8]) -> Result<RawHeader> {
    if &buf[0..8] != RAW_MAGIC {
        return Err(StitchError::InvalidRaw("missing TFRAWV01 magic".into()));
    }
    let header = RawHeader {
        height: LittleEndian::read_u32(&buf[8..12]),
        width: LittleEndian::read_u32(&buf[12..16]),
        depth: LittleEndian::read_u32(&buf[16..20]),
        bit_depth: LittleEndian::read_u16(&buf[20..22]),
        channels: LittleEndian::read_u16(&buf[22..24]),
    };
    if header.height == 0 || header.width == 0 || header.depth == 0 {
        return Err(StitchError::InvalidRaw(format!(
            "degenerate dimensions {}x{}x{}",
            header.height, header.width, header.depth
        )));
    }
    if header.bit_depth != 8 && header.bit_depth != 16 {
        return Err(StitchError::InvalidRaw(format!(
            "unsupported bit depth {}",
            header.bit_depth
        )));
    }
    if header.channels != 1 {
        return Err(StitchError::InvalidRaw(format!(
            "only single-channel tiles are supported, got {} channels",
            header.channels
        )));
    }
    Ok(header)
}

fn normalize<T: Bounded + ToPrimitive>(value: T) -> f32 {
    let max = T::max_value().to_f32().expect("sample max fits in f32");
    value.to_f32().expect("sample fits in f32") / max
}

/// Memory-mapped raw tile reader.
pub struct RawTileReader {
    mmap: Mmap,
    pub header: RawHeader,
}

impl std::fmt::Debug for RawTileReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawTileReader")
            .field("header", &self.header)
            .finish()
    }
}

impl RawTileReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < RAW_HEADER_SIZE {
            return Err(StitchError::InvalidRaw("file too small for header".into()));
        }
        let header = parse_header(&mmap[..RAW_HEADER_SIZE])?;

        let expected = RAW_HEADER_SIZE + header.payload_size();
        if mmap.len() < expected {
            return Err(StitchError::InvalidRaw(format!(
                "file truncated: expected at least {expected} bytes, got {}",
                mmap.len()
            )));
        }

        Ok(Self { mmap, header })
    }

    /// Raw bytes of one slice row (zero-copy from the mmap).
    fn row_bytes(&self, d: usize, v: usize, h0: usize, h1: usize) -> &[u8] {
        let bpv = self.header.bytes_per_voxel();
        let w = self.header.width as usize;
        let hgt = self.header.height as usize;
        let start = RAW_HEADER_SIZE + ((d * hgt + v) * w + h0) * bpv;
        &self.mmap[start..start + (h1 - h0) * bpv]
    }
}

impl SlabSource for RawTileReader {
    fn shape(&self) -> TileShape {
        self.header.shape()
    }

    fn read_slab(
        &self,
        v0: usize,
        v1: usize,
        h0: usize,
        h1: usize,
        d0: usize,
        d1: usize,
    ) -> Result<Array3<f32>> {
        check_window(self.shape(), v0, v1, h0, h1, d0, d1)?;

        let mut slab = Array3::<f32>::zeros((d1 - d0, v1 - v0, h1 - h0));
        for d in d0..d1 {
            for v in v0..v1 {
                let bytes = self.row_bytes(d, v, h0, h1);
                let mut row = slab.slice_mut(ndarray::s![d - d0, v - v0, ..]);
                if self.header.bit_depth <= 8 {
                    for (dst, &b) in row.iter_mut().zip(bytes.iter()) {
                        *dst = normalize(b);
                    }
                } else {
                    for (dst, pair) in row.iter_mut().zip(bytes.chunks_exact(2)) {
                        *dst = normalize(LittleEndian::read_u16(pair));
                    }
                }
            }
        }
        Ok(slab)
    }
}

/// Write a (D,V,H) stack of [0,1] values as a raw tile file.
pub fn write_raw_tile(path: &Path, data: &Array3<f32>, bit_depth: u16) -> Result<()> {
    let (depth, height, width) = data.dim();
    if bit_depth != 8 && bit_depth != 16 {
        return Err(StitchError::InvalidInput(format!(
            "unsupported bit depth {bit_depth}"
        )));
    }

    let file = File::create(path)?;
    let mut out = BufWriter::new(file);

    out.write_all(RAW_MAGIC)?;
    out.write_u32::<LittleEndian>(height as u32)?;
    out.write_u32::<LittleEndian>(width as u32)?;
    out.write_u32::<LittleEndian>(depth as u32)?;
    out.write_u16::<LittleEndian>(bit_depth)?;
    out.write_u16::<LittleEndian>(1)?;

    for d in 0..depth {
        for v in 0..height {
            for h in 0..width {
                let value = data[[d, v, h]].clamp(0.0, 1.0);
                if bit_depth == 8 {
                    out.write_u8((value * 255.0) as u8)?;
                } else {
                    out.write_u16::<LittleEndian>((value * 65535.0) as u16)?;
                }
            }
        }
    }
    out.flush()?;
    Ok(())
}
