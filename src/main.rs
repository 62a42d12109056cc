use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use heraldry::{export, MappedRom, Rom, RomMap};
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
    sync::Arc,
};

#[derive(Parser, Debug)]
struct Arguments {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Export portraits and palettes from a given ROM
    Export {
        rom: PathBuf,

        /// Supply a custom ROM map that provides the offsets of the portraits and palettes
        #[arg(short = 'm', long, conflicts_with = "game")]
        rom_map: Option<PathBuf>,

        /// Use the inbuilt ROM map with this name (fe4, fe5)
        #[arg(short, long)]
        game: Option<String>,

        #[command(flatten)]
        args: ExportArgs,
    },

    /// Decompress a single block starting at a file offset
    Decompress {
        rom: PathBuf,

        #[command(flatten)]
        args: DecompressArgs,
    },

    /// Scan a ROM for potential tile sheets. This will return a lot of garbage but can still be
    /// useful for finding data that is not in the inbuilt ROM maps
    Scan {
        rom: PathBuf,

        #[command(flatten)]
        args: ScanArgs,
    },
}

impl Commands {
    fn rom_path(&self) -> &Path {
        match self {
            Commands::Export { rom, .. } => rom,
            Commands::Decompress { rom, .. } => rom,
            Commands::Scan { rom, .. } => rom,
        }
    }

    fn get_mapped(&self, rom: &Rom) -> anyhow::Result<MappedRom> {
        let Commands::Export { rom_map, game, .. } = self else {
            anyhow::bail!("Only the export command uses a ROM map");
        };

        let map = if let Some(rom_map) = rom_map {
            Arc::new(
                RomMap::parse(&fs::read_to_string(rom_map)?)
                    .with_context(|| "Failed to parse ROM map")?,
            )
        } else if let Some(game) = game {
            RomMap::find_inbuilt(game)
                .with_context(|| format!("There is no inbuilt ROM map named '{}'", game))?
        } else {
            RomMap::find_inbuilt_for(rom).with_context(|| {
                "Failed to find a unique compatible ROM map, select one with --game or --rom-map"
            })?
        };

        if map.is_compatible_with(rom) {
            Ok(MappedRom::new(rom, &map)?)
        } else {
            log::warn!("ROM map is not compatible with the supplied ROM. Continuing anyway.");

            Ok(MappedRom::new_forced(rom, &map)?)
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Arguments::parse();
    colog::init();

    let rom = Rom::open(args.command.rom_path()).with_context(|| "Failed to open ROM")?;
    log::info!(
        "Loaded ROM with {:#x} bytes and CRC: {:#010x}",
        rom.data().len(),
        rom.crc()
    );

    match &args.command {
        Commands::Export { args: export_args, .. } => {
            let mapped = args.command.get_mapped(&rom)?;
            log::info!("Using ROM map for '{}'", mapped.metadata.name);

            export(mapped, export_args.clone())?;
        }
        Commands::Decompress { args, .. } => decompress(rom, args.clone())?,
        Commands::Scan { args, .. } => scan(rom, args.clone())?,
    }

    Ok(())
}

#[derive(Args, Debug, Clone)]
struct ExportArgs {
    /// The output directory to export the portraits to
    #[arg(short, long, default_value = "export")]
    out_dir: PathBuf,

    /// Overwrite the output directory if it already exists
    #[arg(long)]
    force: bool,

    #[arg(short, long, default_value = "png")]
    format: ExportFormat,

    /// Scale factor for RGBA images
    #[arg(short, long, default_value = "1")]
    scale: u32,
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum ExportFormat {
    /// Export as 4 bit indexed PNG images
    Png,

    /// Export as true color PNG images, optionally scaled up
    Rgba,
}

fn export(rom: MappedRom, args: ExportArgs) -> anyhow::Result<()> {
    use indicatif::ParallelProgressIterator;
    use rayon::prelude::*;

    log::info!("Exporting {} portraits...", rom.portraits.len());
    if !rom.failed.is_empty() {
        log::warn!(
            "{} tile blocks failed to decompress, their portraits are skipped",
            rom.failed.len()
        );
    }

    if args.force && args.out_dir.exists() {
        fs::remove_dir_all(&args.out_dir)
            .with_context(|| "Failed to clean up old export directory")?;
    }
    fs::create_dir(&args.out_dir).with_context(|| "Failed to create output directory")?;
    for dir in ["bmp", "png", "png_speak"] {
        fs::create_dir(args.out_dir.join(dir))
            .with_context(|| format!("Failed to create {} directory", dir))?;
    }

    let write_image = |path: PathBuf,
                       canvas: &heraldry::Canvas,
                       palette: &heraldry::Palette|
     -> anyhow::Result<()> {
        match args.format {
            ExportFormat::Png => {
                let file = BufWriter::new(File::create(&path)?);
                export::write_png(file, palette, canvas)?;
            }
            ExportFormat::Rgba => {
                export::to_rgba_image(canvas, palette, args.scale).save(&path)?;
            }
        }

        log::debug!("Exported image: {}", path.display());
        Ok(())
    };

    rom.portraits
        .par_iter()
        .progress_count(rom.portraits.len() as u64)
        .try_for_each(|mapped| -> anyhow::Result<()> {
            let portrait = &mapped.portrait;
            let palette = &mapped.palette;
            let index = mapped.index;

            let sheet_path = args.out_dir.join(format!("bmp/{:03}.bmp", index));
            let file = BufWriter::new(File::create(&sheet_path)?);
            export::write_bmp(file, palette, &portrait.sheet)?;

            write_image(
                args.out_dir.join(format!("png/{:03}.png", index)),
                &portrait.display,
                palette,
            )?;

            if let Some(frames) = &portrait.speak {
                for (frame, canvas) in frames.iter().enumerate() {
                    write_image(
                        args.out_dir
                            .join(format!("png_speak/{:03}_{}.png", index, frame + 1)),
                        canvas,
                        palette,
                    )?;
                }
            }

            Ok(())
        })?;

    log::info!("Done!");

    Ok(())
}

#[derive(Args, Debug, Clone)]
struct DecompressArgs {
    /// File offset of the compressed block, in hex
    #[arg(value_parser = parse_hex)]
    offset: usize,

    /// Maximum number of bytes to decompress, in hex
    #[arg(short, long, value_parser = parse_hex, default_value = "800")]
    capacity: usize,

    /// Write the decompressed data to this file
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn parse_hex(value: &str) -> Result<usize, std::num::ParseIntError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    usize::from_str_radix(digits, 16)
}

fn decompress(rom: Rom, args: DecompressArgs) -> anyhow::Result<()> {
    let result = heraldry::Decompressor::new(rom.data(), args.offset)
        .with_capacity(args.capacity)
        .decompress()
        .with_context(|| format!("Failed to decompress block at {:#08x}", args.offset))?;

    log::info!(
        "Decompressed {:#x} bytes from {:#x} bytes at {:#08x}-{:#08x}",
        result.data.len(),
        result.bytes_read,
        args.offset,
        args.offset + result.bytes_read
    );

    if let Some(out) = args.out {
        fs::write(&out, &result.data)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        log::info!("Wrote {}", out.display());
    }

    Ok(())
}

#[derive(Args, Debug, Clone)]
struct ScanArgs {
    /// The output directory to export found tile sheets to
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Overwrite the output directory if it already exists
    #[arg(short, long)]
    force: bool,

    /// The minimum number of tiles to consider a valid tile sheet
    /// Portraits are 64 tiles, so the default finds them but also returns some garbage
    #[arg(short, long, default_value = "64")]
    threshold: usize,
}

fn scan(rom: Rom, args: ScanArgs) -> anyhow::Result<()> {
    use heraldry::{tile::TILE_SIZE, Canvas, Decompressor, Palette};
    use indicatif::ProgressBar;
    use rayon::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Tiles per row of the dumped sheets
    const SHEET_TILES_WIDE: usize = 16;

    log::info!("Scanning entire ROM for tile sheets...");

    let out_dir = args
        .out_dir
        .unwrap_or_else(|| format!("scan_{:08x}", rom.crc()).into());

    if args.force && out_dir.exists() {
        fs::remove_dir_all(&out_dir).with_context(|| "Failed to clean up old scan directory")?;
    }
    fs::create_dir(&out_dir).with_context(|| "Failed to create output directory")?;

    let progress = ProgressBar::new(rom.data().len() as u64);

    let found = AtomicUsize::new(0);
    (0..rom.data().len())
        .into_par_iter()
        .try_for_each(|offset| -> anyhow::Result<()> {
            progress.inc(1);

            let Ok(result) = Decompressor::new(rom.data(), offset).decompress() else {
                return Ok(());
            };

            let tile_amt = result.data.len() / TILE_SIZE;
            if result.data.len() % TILE_SIZE != 0
                || tile_amt < args.threshold
                || !tile_amt.is_power_of_two()
            {
                return Ok(());
            }

            let end_position = offset + result.bytes_read;
            progress.println(format!(
                "Found potential tile sheet with {} tiles at {:#08x}-{:#08x}",
                tile_amt, offset, end_position
            ));
            found.fetch_add(1, Ordering::SeqCst);

            let width = SHEET_TILES_WIDE * 8;
            let height = tile_amt.div_ceil(SHEET_TILES_WIDE) * 8;
            let sheet = Canvas::from_tiles(&result.data, width, height);

            let path = out_dir.join(format!("tiles_{:#08x}-{:#08x}.bmp", offset, end_position));
            let file = BufWriter::new(File::create(&path)?);
            export::write_bmp(file, &Palette::GRAYSCALE, &sheet)?;

            Ok(())
        })?;

    progress.finish_and_clear();
    log::info!(
        "Done! Found {} potential tile sheets",
        found.load(Ordering::SeqCst)
    );

    Ok(())
}
