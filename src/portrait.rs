use crate::tile::{Canvas, TILE_SIZE};

/// Portraits are stored as a sheet of 16x4 tiles.
pub const SHEET_SIZE: (usize, usize) = (128, 32);
/// Decompressed size of a portrait sheet.
pub const SHEET_BYTES: usize = SHEET_SIZE.0 * SHEET_SIZE.1 / 64 * TILE_SIZE;
/// Size of the portrait as it is shown in game.
pub const DISPLAY_SIZE: (usize, usize) = (48, 64);

/// Byte of the packed sheet that is only set when the sheet has mouth frames.
const SPEAK_MARKER: usize = 60;
const MOUTH_SIZE: (usize, usize) = (32, 16);
const MOUTH_FRAMES: [(usize, usize); 2] = [(96, 0), (96, 16)];
const MOUTH_TARGET: (usize, usize) = (16, 32);

#[derive(Debug, Clone)]
pub struct Portrait {
    pub sheet: Canvas,
    pub display: Canvas,
    /// The display image with each of the two mouth frames pasted in.
    pub speak: Option<[Canvas; 2]>,
}

impl Portrait {
    /// Assemble a portrait from decompressed tile data.
    ///
    /// The upper and lower half of the face sit next to each other in the
    /// sheet, the mouth frames occupy the rightmost 32 pixels.
    pub fn from_tiles(tiles: &[u8], flip: bool) -> Self {
        let sheet = Canvas::from_tiles(tiles, SHEET_SIZE.0, SHEET_SIZE.1);

        let mut display = Canvas::new(DISPLAY_SIZE.0, DISPLAY_SIZE.1);
        display.copy_rect_from(&sheet, (0, 0), (0, 0), (48, 32), flip);
        display.copy_rect_from(&sheet, (48, 0), (0, 32), (48, 32), flip);

        let speak = (sheet.data()[SPEAK_MARKER] != 0).then(|| {
            MOUTH_FRAMES.map(|origin| {
                let mut frame = display.clone();
                frame.copy_rect_from(&sheet, origin, MOUTH_TARGET, MOUTH_SIZE, flip);
                frame
            })
        });

        Portrait {
            sheet,
            display,
            speak,
        }
    }

    pub fn has_speak_frames(&self) -> bool {
        self.speak.is_some()
    }
}
