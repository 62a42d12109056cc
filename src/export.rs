use image::{imageops, RgbaImage};
use std::io::{self, Write};
use thiserror::Error;

use crate::{tile::Canvas, Palette};

const BMP_HEADER_SIZE: usize = 0x36;
const BMP_PALETTE_SIZE: usize = 0x40;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write image")]
    Io(#[from] io::Error),
    #[error("Failed to encode PNG")]
    Png(#[from] png::EncodingError),
    #[error("Image of {0}x{1} pixels is too large")]
    TooLarge(usize, usize),
}

/// Write a 4 bit indexed, top-down bitmap.
pub fn write_bmp<W: Write>(
    mut writer: W,
    palette: &Palette,
    canvas: &Canvas,
) -> Result<(), ExportError> {
    let (width, height) = canvas.dims();
    let too_large = || ExportError::TooLarge(width, height);

    // rows are padded to a multiple of 4 bytes
    let row_size = canvas.stride().div_ceil(4) * 4;
    let pixels_size = u32::try_from(row_size * height).map_err(|_| too_large())?;
    let file_size = pixels_size
        .checked_add((BMP_HEADER_SIZE + BMP_PALETTE_SIZE) as u32)
        .ok_or_else(too_large)?;
    let width = i32::try_from(width).map_err(|_| too_large())?;
    let height = i32::try_from(height).map_err(|_| too_large())?;

    let mut header = Vec::with_capacity(BMP_HEADER_SIZE);
    header.extend_from_slice(b"BM");
    header.extend_from_slice(&file_size.to_le_bytes());
    header.extend_from_slice(&[0; 4]);
    header.extend_from_slice(&((BMP_HEADER_SIZE + BMP_PALETTE_SIZE) as u32).to_le_bytes());

    header.extend_from_slice(&40u32.to_le_bytes());
    header.extend_from_slice(&width.to_le_bytes());
    // negative height stores the rows top to bottom
    header.extend_from_slice(&(-height).to_le_bytes());
    header.extend_from_slice(&1u16.to_le_bytes());
    header.extend_from_slice(&4u16.to_le_bytes());
    header.extend_from_slice(&0u32.to_le_bytes());
    header.extend_from_slice(&pixels_size.to_le_bytes());
    header.extend_from_slice(&[0; 16]);

    writer.write_all(&header)?;
    writer.write_all(&palette.to_bmp_bytes())?;
    let padding = [0; 3];
    for y in 0..canvas.height() {
        writer.write_all(canvas.row(y))?;
        writer.write_all(&padding[..row_size - canvas.stride()])?;
    }

    Ok(())
}

/// Write a 4 bit palette PNG with color 0 transparent.
pub fn write_png<W: Write>(
    writer: W,
    palette: &Palette,
    canvas: &Canvas,
) -> Result<(), ExportError> {
    let (width, height) = canvas.dims();
    let too_large = || ExportError::TooLarge(width, height);

    let mut encoder = png::Encoder::new(
        writer,
        u32::try_from(width).map_err(|_| too_large())?,
        u32::try_from(height).map_err(|_| too_large())?,
    );
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Four);
    encoder.set_palette(palette.to_rgb_bytes().to_vec());
    encoder.set_trns(vec![0u8]);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(canvas.data())?;
    writer.finish()?;

    Ok(())
}

/// Render the canvas to RGBA, scaled up by an integer factor.
pub fn to_rgba_image(canvas: &Canvas, palette: &Palette, scale: u32) -> RgbaImage {
    let img = canvas.to_rgba_image(palette);
    if scale <= 1 {
        return img;
    }

    imageops::resize(
        &img,
        img.width() * scale,
        img.height() * scale,
        imageops::FilterType::Nearest,
    )
}
