use crate::palette::{ColorIndex, Palette};
use image::{Rgba, RgbaImage};

/// Size of a 4bpp SNES tile in bytes.
pub const TILE_SIZE: usize = 32;
/// Width and height of a tile in pixels.
pub const TILE_DIM: usize = 8;

/// Convert a planar SNES tile into 8 rows of packed pixels (4 bytes per row,
/// left pixel in the high nibble).
///
/// Planes 0 and 1 of a row are stored next to each other in the first 16
/// bytes, planes 2 and 3 at the same position in the second 16 bytes.
pub fn tile_to_pixels(tile: &[u8; TILE_SIZE]) -> [u8; TILE_SIZE] {
    let mut pixels = [0; TILE_SIZE];

    for (row, out) in pixels.chunks_exact_mut(TILE_DIM / 2).enumerate() {
        let planes = [
            tile[row * 2],
            tile[row * 2 + 1],
            tile[0x10 + row * 2],
            tile[0x10 + row * 2 + 1],
        ];

        for (byte, value) in out.iter_mut().enumerate() {
            let shift = 7 - byte * 2;
            *value = (color_at(&planes, shift) << 4) | color_at(&planes, shift - 1);
        }
    }

    pixels
}

fn color_at(planes: &[u8; 4], shift: usize) -> u8 {
    planes
        .iter()
        .enumerate()
        .fold(0, |color, (plane, bits)| color | (((bits >> shift) & 1) << plane))
}

/// Unpack a row-major sheet of tiles into a packed pixel buffer of
/// `width * height / 2` bytes.
///
/// Tiles missing at the end of `tiles` leave their pixels at zero.
pub fn sheet_to_pixels(tiles: &[u8], width: usize, height: usize) -> Vec<u8> {
    assert!(
        width % TILE_DIM == 0 && height % TILE_DIM == 0,
        "Sheet dimensions must be a multiple of 8"
    );

    let mut pixels = vec![0; width * height / 2];
    let tiles_wide = width / TILE_DIM;
    let tile_count = tiles_wide * (height / TILE_DIM);

    for (i, chunk) in tiles.chunks_exact(TILE_SIZE).take(tile_count).enumerate() {
        let mut tile = [0; TILE_SIZE];
        tile.copy_from_slice(chunk);
        let tile_pixels = tile_to_pixels(&tile);

        let x = (i % tiles_wide) * TILE_DIM;
        let y = (i / tiles_wide) * TILE_DIM;

        copy_rect(
            &tile_pixels,
            (TILE_DIM, TILE_DIM),
            (0, 0),
            &mut pixels,
            (width, height),
            (x, y),
            (TILE_DIM, TILE_DIM),
            false,
        );
    }

    pixels
}

/// Copy a `size` pixel rectangle between two packed pixel buffers.
///
/// Dimensions and origins are `(x, y)` in pixels; widths and x positions must
/// be even since a byte holds two pixels. When `flip_horizontal` is set the
/// rectangle is mirrored, which also swaps the two pixels inside every byte.
#[allow(clippy::too_many_arguments)]
pub fn copy_rect(
    src: &[u8],
    src_dims: (usize, usize),
    src_origin: (usize, usize),
    dst: &mut [u8],
    dst_dims: (usize, usize),
    dst_origin: (usize, usize),
    size: (usize, usize),
    flip_horizontal: bool,
) {
    assert!(
        src_dims.0 % 2 == 0 && dst_dims.0 % 2 == 0 && size.0 % 2 == 0,
        "Widths must be even"
    );
    assert!(
        src_origin.0 % 2 == 0 && dst_origin.0 % 2 == 0,
        "X positions must be even"
    );
    assert!(
        src_origin.0 + size.0 <= src_dims.0 && src_origin.1 + size.1 <= src_dims.1,
        "Source rectangle out of bounds"
    );
    assert!(
        dst_origin.0 + size.0 <= dst_dims.0 && dst_origin.1 + size.1 <= dst_dims.1,
        "Target rectangle out of bounds"
    );

    let src_stride = src_dims.0 / 2;
    let dst_stride = dst_dims.0 / 2;
    let src_x = src_origin.0 / 2;
    let dst_x = dst_origin.0 / 2;
    let width = size.0 / 2;

    for y in 0..size.1 {
        let src_start = (src_origin.1 + y) * src_stride + src_x;
        let dst_start = (dst_origin.1 + y) * dst_stride + dst_x;

        let src_row = &src[src_start..src_start + width];
        let dst_row = &mut dst[dst_start..dst_start + width];

        if flip_horizontal {
            for (out, value) in dst_row.iter_mut().zip(src_row.iter().rev()) {
                *out = value.rotate_left(4);
            }
        } else {
            dst_row.copy_from_slice(src_row);
        }
    }
}

/// A packed pixel buffer together with its size in pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width % 2 == 0, "Canvas width must be even");

        Canvas {
            width,
            height,
            data: vec![0; width * height / 2],
        }
    }

    pub fn from_tiles(tiles: &[u8], width: usize, height: usize) -> Self {
        Canvas {
            width,
            height,
            data: sheet_to_pixels(tiles, width, height),
        }
    }

    pub fn from_pixels(data: Vec<u8>, width: usize, height: usize) -> Self {
        assert!(width % 2 == 0, "Canvas width must be even");
        assert_eq!(
            data.len(),
            width * height / 2,
            "Pixel data does not match canvas size"
        );

        Canvas {
            width,
            height,
            data,
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width / 2
    }

    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.stride()..(y + 1) * self.stride()]
    }

    pub fn pixel(&self, x: usize, y: usize) -> ColorIndex {
        let byte = self.data[y * self.stride() + x / 2];
        let nibble = if x % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        ColorIndex::new(nibble)
    }

    pub fn copy_rect_from(
        &mut self,
        src: &Canvas,
        src_origin: (usize, usize),
        dst_origin: (usize, usize),
        size: (usize, usize),
        flip_horizontal: bool,
    ) {
        let dst_dims = self.dims();
        copy_rect(
            &src.data,
            src.dims(),
            src_origin,
            &mut self.data,
            dst_dims,
            dst_origin,
            size,
            flip_horizontal,
        );
    }

    pub fn to_rgba_image(&self, palette: &Palette) -> RgbaImage {
        RgbaImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let color_index = self.pixel(x as usize, y as usize);

            if color_index.is_transparent() {
                Rgba([0, 0, 0, 0])
            } else {
                let color = palette.get(color_index);
                Rgba([color[0], color[1], color[2], 255])
            }
        })
    }
}
