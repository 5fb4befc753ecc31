//! Grayscale image export for merged output slices.

use std::path::Path;

use image::{ImageBuffer, ImageFormat, Luma};
use ndarray::Array2;
use num_traits::NumCast;

use crate::error::Result;

/// Quantize a [0,1] slice into a grayscale image with `T`-valued samples.
///
/// The slice is (V,H); V becomes the image height. Values outside [0,1] are
/// clamped before scaling to `full_scale` (the sample type's maximum).
fn quantize<T>(slice: &Array2<f32>, full_scale: f32) -> ImageBuffer<Luma<T>, Vec<T>>
where
    T: NumCast,
    Luma<T>: image::Pixel<Subpixel = T>,
{
    let (rows, cols) = slice.dim();
    let samples: Vec<T> = slice
        .iter()
        .map(|&v| {
            let level = (v.clamp(0.0, 1.0) * full_scale).round();
            NumCast::from(level).expect("clamped grey level fits the sample type")
        })
        .collect();
    // ndarray iteration is row-major, matching the buffer layout.
    ImageBuffer::from_raw(cols as u32, rows as u32, samples)
        .expect("sample count equals rows * cols")
}

/// Write a slice as 16-bit grayscale TIFF.
pub fn save_slice_tiff(slice: &Array2<f32>, path: &Path) -> Result<()> {
    quantize::<u16>(slice, u16::MAX as f32).save(path)?;
    Ok(())
}

/// Write a slice as 8-bit grayscale PNG.
pub fn save_slice_png(slice: &Array2<f32>, path: &Path) -> Result<()> {
    quantize::<u8>(slice, u8::MAX as f32).save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Write a slice in the format the extension implies; TIFF when in doubt.
pub fn save_slice(slice: &Array2<f32>, path: &Path) -> Result<()> {
    if path.extension().and_then(|e| e.to_str()) == Some("png") {
        save_slice_png(slice, path)
    } else {
        save_slice_tiff(slice, path)
    }
}
