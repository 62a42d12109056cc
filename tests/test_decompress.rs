use heraldry::{decompress, DecompressError, Decompressor, Operation};

fn decode(data: &[u8]) -> Result<(Vec<u8>, usize), DecompressError> {
    decompress(data, 0x10000).map(|result| (result.data, result.bytes_read))
}

#[test]
fn literal_runs_copy_bytes_verbatim() -> anyhow::Result<()> {
    for op in 0x00..=0x3fu8 {
        let count = usize::from(op) + 1;
        let payload = (0..count).map(|i| (i * 7 + 3) as u8).collect::<Vec<_>>();

        let mut data = vec![op];
        data.extend_from_slice(&payload);
        data.push(0xff);

        let (out, bytes_read) = decode(&data)?;
        assert_eq!(out, payload, "literal run {:#04x}", op);
        assert_eq!(bytes_read, count + 2);
    }

    Ok(())
}

#[test]
fn literal_then_terminator() -> anyhow::Result<()> {
    let (out, bytes_read) = decode(&[0x03, 0x01, 0x02, 0x03, 0x04, 0xfe])?;

    assert_eq!(out, [0x01, 0x02, 0x03, 0x04]);
    assert_eq!(bytes_read, 6);

    Ok(())
}

#[test]
fn double_run_writes_each_byte_twice() -> anyhow::Result<()> {
    assert_eq!(decode(&[0x50, 0xab, 0xff])?, (vec![0xab, 0xab], 3));
    assert_eq!(
        decode(&[0x52, 0x01, 0x02, 0x03, 0xff])?,
        (vec![0x01, 0x01, 0x02, 0x02, 0x03, 0x03], 5)
    );

    Ok(())
}

#[test]
fn prefix_and_suffix_runs_interleave_fixed_byte() -> anyhow::Result<()> {
    assert_eq!(
        decode(&[0x60, 0x11, 0x0a, 0x0b, 0xff])?,
        (vec![0x11, 0x0a, 0x11, 0x0b], 5)
    );
    assert_eq!(
        decode(&[0x71, 0x22, 0x0a, 0x0b, 0x0c, 0xff])?,
        (vec![0x0a, 0x22, 0x0b, 0x22, 0x0c, 0x22], 6)
    );

    Ok(())
}

#[test]
fn short_backref_copies_earlier_output() -> anyhow::Result<()> {
    // count 3, distance 5
    let (out, bytes_read) = decode(&[0x05, 1, 2, 3, 4, 5, 6, 0x84, 0x05, 0xff])?;

    assert_eq!(out, [1, 2, 3, 4, 5, 6, 2, 3, 4]);
    assert_eq!(bytes_read, 10);

    Ok(())
}

#[test]
fn overlapping_backref_repeats_pattern() -> anyhow::Result<()> {
    // count 5, distance 2
    let (out, _) = decode(&[0x01, 0x0a, 0x0b, 0x8c, 0x02, 0xff])?;

    assert_eq!(out, [0x0a, 0x0b, 0x0a, 0x0b, 0x0a, 0x0b, 0x0a]);

    Ok(())
}

#[test]
fn short_backref_uses_upper_distance_bits() -> anyhow::Result<()> {
    // one literal, 0x100 fill bytes, then distance 0x101 back to the literal
    let (out, _) = decode(&[0x00, 0x99, 0xe0, 0xfd, 0x33, 0x81, 0x01, 0xff])?;

    assert_eq!(out.len(), 0x103);
    assert_eq!(out[0x101..], [0x99, 0x33]);

    Ok(())
}

#[test]
fn long_backref_takes_count_bit_from_second_byte() -> anyhow::Result<()> {
    // count ((0 << 1) | 1) + 2 = 3, distance 2
    let (out, bytes_read) = decode(&[0xe0, 0xfd, 0x33, 0x00, 0x77, 0xc0, 0x80, 0x02, 0xff])?;

    assert_eq!(out.len(), 0x104);
    assert_eq!(out[0x100..], [0x77, 0x33, 0x77, 0x33]);
    assert_eq!(bytes_read, 9);

    Ok(())
}

#[test]
fn fill_runs_repeat_value() -> anyhow::Result<()> {
    let (out, bytes_read) = decode(&[0xf7, 0x44, 0xff])?;
    assert_eq!(out, vec![0x44; 10]);
    assert_eq!(bytes_read, 3);

    let (out, bytes_read) = decode(&[0xf0, 0x45, 0xff])?;
    assert_eq!(out, vec![0x45; 3]);
    assert_eq!(bytes_read, 3);

    let (out, bytes_read) = decode(&[0xe1, 0x02, 0x5a, 0xff])?;
    assert_eq!(out, vec![0x5a; 0x105]);
    assert_eq!(bytes_read, 4);

    Ok(())
}

#[test]
fn terminator_ignores_trailing_bytes() -> anyhow::Result<()> {
    for terminator in [0xfe, 0xff] {
        let (out, bytes_read) = decode(&[0x00, 0x11, terminator, 0x99, 0x42])?;

        assert_eq!(out, [0x11]);
        assert_eq!(bytes_read, 3);
    }

    assert_eq!(decode(&[0xff])?, (vec![], 1));

    Ok(())
}

#[test]
fn reserved_operations_are_unsupported() {
    for op in (0x40..=0x4fu8).chain(0xf8..=0xfd) {
        assert_eq!(
            decode(&[op, 0x00, 0x00, 0x00, 0xff]),
            Err(DecompressError::UnsupportedOpcode(op))
        );
    }

    // also after valid output was produced
    assert_eq!(
        decode(&[0x00, 0x11, 0xfa, 0xff]),
        Err(DecompressError::UnsupportedOpcode(0xfa))
    );
}

#[test]
fn capacity_is_checked_before_each_operation() -> anyhow::Result<()> {
    let data = [0x07, 1, 2, 3, 4, 5, 6, 7, 8, 0xff];

    assert_eq!(decompress(&data, 8)?.data.len(), 8);
    assert_eq!(decompress(&data, 4), Err(DecompressError::CapacityExceeded));

    // the fill starts at the capacity and runs past it, the terminator catches it
    let data = [0x01, 1, 2, 0xf7, 9, 0xff];
    assert_eq!(decompress(&data, 2), Err(DecompressError::CapacityExceeded));
    assert_eq!(decompress(&data, 11), Err(DecompressError::CapacityExceeded));
    assert_eq!(decompress(&data, 12)?.data.len(), 12);

    Ok(())
}

#[test]
fn truncated_input_is_reported() {
    assert_eq!(decode(&[]), Err(DecompressError::UnexpectedEnd { offset: 0 }));
    assert_eq!(
        decode(&[0x00, 0x01]),
        Err(DecompressError::UnexpectedEnd { offset: 2 })
    );
    assert_eq!(
        decode(&[0x03, 0x01, 0x02]),
        Err(DecompressError::UnexpectedEnd { offset: 3 })
    );
    assert_eq!(
        decode(&[0xe0]),
        Err(DecompressError::UnexpectedEnd { offset: 1 })
    );
}

#[test]
fn backref_outside_output_is_rejected() {
    assert_eq!(
        decode(&[0x80, 0x01, 0xff]),
        Err(DecompressError::InvalidBackref {
            distance: 1,
            available: 0
        })
    );
    assert_eq!(
        decode(&[0x00, 0x05, 0x80, 0x00, 0xff]),
        Err(DecompressError::InvalidBackref {
            distance: 0,
            available: 1
        })
    );
}

#[test]
fn decompress_at_offset() -> anyhow::Result<()> {
    let data = [0xaa, 0xbb, 0x00, 0x42, 0xff, 0xcc];
    let result = Decompressor::new(&data, 2).decompress()?;

    assert_eq!(result.data, [0x42]);
    assert_eq!(result.bytes_read, 3);

    Ok(())
}

#[test]
fn operations_decode_parameters() -> anyhow::Result<()> {
    let cases: &[(u8, &[u8], Operation)] = &[
        (0x3f, &[], Operation::CopySimple(64)),
        (0x5f, &[], Operation::CopyDoubled(16)),
        (
            0x6f,
            &[0x12],
            Operation::CopyInterleaved {
                count: 17,
                fixed_value: 0x12,
                fixed_first: true,
            },
        ),
        (
            0x70,
            &[0x34],
            Operation::CopyInterleaved {
                count: 2,
                fixed_value: 0x34,
                fixed_first: false,
            },
        ),
        (
            0xbf,
            &[0xff],
            Operation::CopyBackread {
                count: 17,
                back: 0x3ff,
            },
        ),
        (
            0xdf,
            &[0xff, 0xff],
            Operation::CopyBackread {
                count: 65,
                back: 0x7fff,
            },
        ),
        (
            0xef,
            &[0xff, 0x01],
            Operation::RepeatValue {
                count: 0x1002,
                value: 0x01,
            },
        ),
        (
            0xf3,
            &[0x02],
            Operation::RepeatValue {
                count: 6,
                value: 0x02,
            },
        ),
        (0x45, &[], Operation::Reserved(0x45)),
        (0xfd, &[], Operation::Reserved(0xfd)),
        (0xfe, &[], Operation::Exit),
    ];

    for (op, params, expected) in cases {
        let mut decompressor = Decompressor::new(params, 0);
        assert_eq!(Operation::decode(*op, &mut decompressor)?, *expected);
    }

    Ok(())
}
