use heraldry::{copy_rect, sheet_to_pixels, tile_to_pixels, Canvas, ColorIndex, Palette};
use proptest::prelude::*;

/// A tile where every pixel has the same color.
fn solid_tile(color: u8) -> [u8; 32] {
    let mut tile = [0; 32];
    for row in 0..8 {
        for plane in 0..4 {
            let offset = (plane / 2) * 0x10 + row * 2 + plane % 2;
            if color & (1 << plane) != 0 {
                tile[offset] = 0xff;
            }
        }
    }
    tile
}

#[test]
fn zero_tile_is_all_color_zero() {
    assert_eq!(tile_to_pixels(&[0; 32]), [0; 32]);
}

#[test]
fn tile_planes_combine_into_color_index() {
    let mut tile = [0; 32];
    tile[0x00] = 0x80; // plane 0, row 0, pixel 0
    tile[0x01] = 0x40; // plane 1, row 0, pixel 1
    tile[0x10] = 0x01; // plane 2, row 0, pixel 7
    tile[0x11] = 0x01; // plane 3, row 0, pixel 7
    tile[0x0e] = 0x20; // plane 0, row 7, pixel 2

    let pixels = tile_to_pixels(&tile);

    assert_eq!(pixels[0..4], [0x12, 0x00, 0x00, 0x0c]);
    assert_eq!(pixels[28..32], [0x00, 0x10, 0x00, 0x00]);
    assert!(pixels[4..28].iter().all(|&b| b == 0));
}

#[test]
fn solid_tiles_unpack_to_solid_pixels() {
    for color in 0..16u8 {
        let pixels = tile_to_pixels(&solid_tile(color));
        assert!(pixels.iter().all(|&b| b == color << 4 | color));
    }
}

#[test]
fn sheet_places_tiles_row_major() {
    let mut first = [0; 32];
    first[0x00] = 0xff;
    let mut second = [0; 32];
    second[0x1f] = 0xff;

    let tiles = [first, second].concat();
    let pixels = sheet_to_pixels(&tiles, 16, 8);

    assert_eq!(pixels.len(), 64);
    assert_eq!(pixels[0..8], [0x11, 0x11, 0x11, 0x11, 0, 0, 0, 0]);
    assert_eq!(pixels[56..64], [0, 0, 0, 0, 0x88, 0x88, 0x88, 0x88]);
    assert!(pixels[8..56].iter().all(|&b| b == 0));
}

#[test]
fn sheet_with_second_tile_row() {
    let tiles = (0..4).flat_map(solid_tile).collect::<Vec<_>>();
    let canvas = Canvas::from_tiles(&tiles, 16, 16);

    assert_eq!(canvas.pixel(0, 0).as_u8(), 0);
    assert_eq!(canvas.pixel(15, 7).as_u8(), 1);
    assert_eq!(canvas.pixel(3, 8).as_u8(), 2);
    assert_eq!(canvas.pixel(8, 15).as_u8(), 3);
}

#[test]
fn short_sheet_leaves_missing_tiles_empty() {
    let pixels = sheet_to_pixels(&solid_tile(5), 16, 8);

    assert!(pixels[0..4].iter().all(|&b| b == 0x55));
    assert!(pixels[4..8].iter().all(|&b| b == 0));
    assert_eq!(sheet_to_pixels(&[], 8, 8), vec![0; 32]);
}

#[test]
fn flip_mirrors_bytes_and_nibbles() {
    let src = [0x12, 0x34, 0x56, 0x78];
    let mut dst = [0; 4];

    copy_rect(&src, (4, 2), (0, 0), &mut dst, (4, 2), (0, 0), (4, 2), true);
    assert_eq!(dst, [0x43, 0x21, 0x87, 0x65]);

    let mut dst = [0; 4];
    copy_rect(&src, (4, 2), (2, 1), &mut dst, (4, 2), (0, 0), (2, 1), true);
    assert_eq!(dst, [0x87, 0, 0, 0]);
}

#[test]
fn copy_into_larger_target() {
    let src = Canvas::from_pixels(vec![0xab; 8], 4, 4);
    let mut dst = Canvas::new(8, 8);

    dst.copy_rect_from(&src, (0, 0), (4, 2), (4, 4), false);

    for y in 0..8 {
        let expected: &[u8] = if (2..6).contains(&y) {
            &[0, 0, 0xab, 0xab]
        } else {
            &[0, 0, 0, 0]
        };
        assert_eq!(dst.row(y), expected, "row {}", y);
    }
}

#[test]
fn rgba_image_makes_color_zero_transparent() {
    let mut data = [0u8; 32];
    data[0] = 0x01;
    let mut colors = [0u8; 32];
    colors[2] = 0x1f;
    let palette = Palette::from_slice(&colors);

    let canvas = Canvas::from_pixels(data.to_vec(), 8, 8);
    let img = canvas.to_rgba_image(&palette);

    assert_eq!(img.dimensions(), (8, 8));
    assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 0]);
    assert_eq!(img.get_pixel(1, 0).0, [0xf8, 0, 0, 0xff]);
    assert!(canvas.pixel(0, 0).is_transparent());
    assert_eq!(canvas.pixel(1, 0), ColorIndex::new(1));
}

prop_compose! {
    fn canvas_and_rect()(
        data in prop::collection::vec(any::<u8>(), 256),
        x in 0..16usize,
        y in 0..16usize,
        width in 1..=16usize,
        height in 1..=16usize,
    ) -> (Canvas, (usize, usize), (usize, usize)) {
        let width = width.min(16 - x);
        let height = height.min(16 - y);
        (Canvas::from_pixels(data, 32, 16), (x * 2, y), (width * 2, height))
    }
}

proptest! {
    #[test]
    fn copy_out_and_back_restores_canvas((canvas, origin, size) in canvas_and_rect()) {
        let mut region = Canvas::new(size.0, size.1);
        region.copy_rect_from(&canvas, origin, (0, 0), size, false);

        let mut restored = canvas.clone();
        restored.copy_rect_from(&region, (0, 0), origin, size, false);

        prop_assert_eq!(restored, canvas);
    }

    #[test]
    fn flipping_twice_restores_region((canvas, origin, size) in canvas_and_rect()) {
        let mut flipped = Canvas::new(size.0, size.1);
        flipped.copy_rect_from(&canvas, origin, (0, 0), size, true);

        let mut cleared = canvas.clone();
        cleared.copy_rect_from(&Canvas::new(size.0, size.1), (0, 0), origin, size, false);
        cleared.copy_rect_from(&flipped, (0, 0), origin, size, true);

        prop_assert_eq!(cleared, canvas);
    }

    #[test]
    fn flip_matches_mirrored_pixels((canvas, origin, size) in canvas_and_rect()) {
        let mut flipped = Canvas::new(size.0, size.1);
        flipped.copy_rect_from(&canvas, origin, (0, 0), size, true);

        for y in 0..size.1 {
            for x in 0..size.0 {
                prop_assert_eq!(
                    flipped.pixel(x, y),
                    canvas.pixel(origin.0 + size.0 - 1 - x, origin.1 + y)
                );
            }
        }
    }
}
