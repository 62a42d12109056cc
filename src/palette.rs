use image::Rgb;

/// Size of a SNES palette in bytes (16 colors, BGR555).
pub const PALETTE_SIZE: usize = 0x20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette([Rgb<u8>; 16]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorIndex(u8);

impl ColorIndex {
    pub const fn new(index: u8) -> Self {
        assert!(index < 16, "ColorIndex must be less than 16");

        ColorIndex(index)
    }

    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    pub const fn is_transparent(&self) -> bool {
        self.0 == 0
    }
}

impl Palette {
    /// Evenly spaced gray levels, for looking at tiles without a known palette.
    pub const GRAYSCALE: Palette = {
        let mut colors = [Rgb([0, 0, 0]); 16];
        let mut i = 0;
        while i < 16 {
            let level = (i * 17) as u8;
            colors[i] = Rgb([level, level, level]);
            i += 1;
        }
        Palette(colors)
    };

    /// Convert a slice of bytes into a SNES palette.
    ///
    /// Each color is a little endian `0bbbbbgggggrrrrr` word, every channel is
    /// widened to 8 bits by shifting it left by three.
    pub fn from_slice(data: &[u8]) -> Self {
        assert!(
            data.len() == PALETTE_SIZE,
            "Palette data must be 32 bytes long"
        );

        let mut palette = [Rgb([0, 0, 0]); 16];
        for (i, color) in data.chunks_exact(2).enumerate() {
            let val_bgr15 = u16::from_le_bytes([color[0], color[1]]);
            let r = (val_bgr15 & 0x1F) << 3;
            let g = ((val_bgr15 >> 5) & 0x1F) << 3;
            let b = ((val_bgr15 >> 10) & 0x1F) << 3;

            palette[i] = Rgb([r as u8, g as u8, b as u8]);
        }
        Palette(palette)
    }

    pub const fn get(&self, index: ColorIndex) -> Rgb<u8> {
        self.0[index.0 as usize]
    }

    pub fn colors(&self) -> &[Rgb<u8>; 16] {
        &self.0
    }

    /// The palette as 16 `r, g, b` triples.
    pub fn to_rgb_bytes(&self) -> [u8; 48] {
        let mut out = [0; 48];
        for (dst, color) in out.chunks_exact_mut(3).zip(&self.0) {
            dst.copy_from_slice(&color.0);
        }
        out
    }

    /// The palette as a bitmap color table: `b, g, r, 0` per entry.
    pub fn to_bmp_bytes(&self) -> [u8; 64] {
        let mut out = [0; 64];
        for (dst, Rgb([r, g, b])) in out.chunks_exact_mut(4).zip(&self.0) {
            dst.copy_from_slice(&[*b, *g, *r, 0]);
        }
        out
    }
}

/// Convert 32 bytes of SNES palette data into 16 `r, g, b` triples.
pub fn palette_to_rgb(data: &[u8]) -> [u8; 48] {
    Palette::from_slice(data).to_rgb_bytes()
}
