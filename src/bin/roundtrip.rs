//! xvc round trip: encode a raw I420 file, optionally persist the framed
//! stream, decode it again and report what came back.
//!
//! Usage:
//!   xvc-roundtrip -i <file.yuv> -w <width> -h <height> [options]
//!
//! Options:
//!   -i, --input <file>      Raw I420 input (frames back to back)
//!   -w, --width <px>        Picture width
//!   -h, --height <px>       Picture height
//!   --fps <n>               Frame rate (default: 30)
//!   --qp <n>                Quantization parameter (default: 32)
//!   --out <file>            Write the framed stream to this file
//!   --flush-every <n>       Flush the encoder every N frames (default: end only)
//!   --help                  Show this help

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use xvc::{
    expected_frame_size, ChromaFormat, CompressedUnit, Decoder, DecoderParams, Encoder,
    EncoderParams, FramedReader, FramedWriter, PlanarFrame, Plane,
};

struct Args {
    input: String,
    width: u32,
    height: u32,
    fps: f64,
    qp: i32,
    out: Option<String>,
    flush_every: Option<usize>,
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = std::env::args().collect();
    let mut input = None;
    let mut width = None;
    let mut height = None;
    let mut fps = 30.0;
    let mut qp = 32;
    let mut out = None;
    let mut flush_every = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-i" | "--input" if i + 1 < args.len() => {
                input = Some(args[i + 1].clone());
                i += 2;
            }
            "-w" | "--width" if i + 1 < args.len() => {
                width = args[i + 1].parse().ok();
                i += 2;
            }
            "-h" | "--height" if i + 1 < args.len() => {
                height = args[i + 1].parse().ok();
                i += 2;
            }
            "--fps" if i + 1 < args.len() => {
                fps = args[i + 1].parse().unwrap_or(30.0);
                i += 2;
            }
            "--qp" if i + 1 < args.len() => {
                qp = args[i + 1].parse().unwrap_or(32);
                i += 2;
            }
            "--out" if i + 1 < args.len() => {
                out = Some(args[i + 1].clone());
                i += 2;
            }
            "--flush-every" if i + 1 < args.len() => {
                flush_every = args[i + 1].parse().ok().filter(|n| *n > 0);
                i += 2;
            }
            "--help" => return None,
            other => {
                eprintln!("Unknown argument: {}", other);
                return None;
            }
        }
    }

    Some(Args {
        input: input?,
        width: width?,
        height: height?,
        fps,
        qp,
        out,
        flush_every,
    })
}

fn print_usage() {
    println!("xvc round trip");
    println!();
    println!("Usage: xvc-roundtrip -i <file.yuv> -w <width> -h <height> [options]");
    println!();
    println!("Options:");
    println!("  -i, --input <file>      Raw I420 input (frames back to back)");
    println!("  -w, --width <px>        Picture width");
    println!("  -h, --height <px>       Picture height");
    println!("  --fps <n>               Frame rate (default: 30)");
    println!("  --qp <n>                Quantization parameter (default: 32)");
    println!("  --out <file>            Write the framed stream to this file");
    println!("  --flush-every <n>       Flush the encoder every N frames");
    println!("  --help                  Show this help");
    println!();
    println!("Environment:");
    println!("  RUST_LOG=xvc=debug      More verbose session logging");
}

/// Reads the whole input and splits it into I420 frames.
fn read_frames(args: &Args) -> Result<Vec<PlanarFrame>> {
    let frame_size = expected_frame_size(args.width, args.height, ChromaFormat::Yuv420)
        .context("invalid picture size")?;
    let mut data = Vec::new();
    BufReader::new(File::open(&args.input).with_context(|| format!("open {}", args.input))?)
        .read_to_end(&mut data)?;

    if data.len() % frame_size != 0 {
        tracing::warn!(
            "input size {} is not a multiple of the frame size {}, ignoring the tail",
            data.len(),
            frame_size
        );
    }

    data.chunks_exact(frame_size)
        .map(|chunk| {
            PlanarFrame::from_i420(args.width, args.height, chunk.to_vec()).map_err(Into::into)
        })
        .collect()
}

fn collect(records: &mut Vec<Vec<u8>>, units: Vec<CompressedUnit>) {
    records.extend(units.iter().map(|unit| unit.bytes().to_vec()));
}

fn encode(args: &Args, frames: &[PlanarFrame]) -> Result<Vec<Vec<u8>>> {
    let params = EncoderParams::new(args.width, args.height, args.fps)
        .qp(args.qp)
        .build()?;
    let mut encoder = Encoder::new(params)?;
    let mut records = Vec::new();

    for (index, frame) in frames.iter().enumerate() {
        let units = encoder.encode_frame(frame, index as i64)?;
        collect(&mut records, units);

        if args.flush_every.is_some_and(|n| (index + 1) % n == 0) {
            let (units, _) = encoder.flush()?;
            collect(&mut records, units);
        }
    }

    let (units, ok) = encoder.flush()?;
    if !ok {
        tracing::warn!("final encoder flush reported a failure");
    }
    collect(&mut records, units);
    Ok(records)
}

fn persist(path: &str, records: &[Vec<u8>]) -> Result<Vec<Vec<u8>>> {
    let mut writer = FramedWriter::new(BufWriter::new(File::create(path)?));
    for record in records {
        writer.write_record(record)?;
    }
    writer.flush()?;
    tracing::info!("Wrote {} records to {}", writer.records_written(), path);

    // read back so the decoder sees exactly what is on disk
    let reader = FramedReader::new(BufReader::new(File::open(path)?));
    let mut read_back = Vec::new();
    for payload in reader {
        let payload = payload?;
        let mut record = Vec::with_capacity(payload.len() + 4);
        record.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        record.extend_from_slice(&payload);
        read_back.push(record);
    }
    Ok(read_back)
}

fn decode(records: &[Vec<u8>], frames: &[PlanarFrame]) -> Result<usize> {
    let mut decoder = Decoder::new(DecoderParams::new().build()?)?;
    let mut pictures = 0usize;
    let mut exact = 0usize;

    // pictures come back in display order, which is also input order
    let mut check = |decoder: &mut Decoder| -> Result<()> {
        while let Some(picture) = decoder.decoded_picture_ref()? {
            if let Some(source) = frames.get(pictures) {
                if source.image()?.rows(Plane::Y).eq(picture.image().rows(Plane::Y)) {
                    exact += 1;
                }
            }
            pictures += 1;
        }
        Ok(())
    };

    for (index, record) in records.iter().enumerate() {
        decoder.decode_tagged(record, index as i64)?;
        check(&mut decoder)?;
    }
    if !decoder.flush()? {
        tracing::warn!("decoder flush reported a failure");
    }
    check(&mut decoder)?;

    tracing::info!("{} of {} pictures match their source luma exactly", exact, pictures);
    Ok(pictures)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("xvc=info".parse()?)
                .add_directive("warn".parse()?),
        )
        .init();

    let Some(args) = parse_args() else {
        print_usage();
        return Ok(());
    };

    let frames = read_frames(&args)?;
    if frames.is_empty() {
        bail!("no complete frames in {}", args.input);
    }
    tracing::info!(
        "Loaded {} frames of {}x{} from {}",
        frames.len(),
        args.width,
        args.height,
        args.input
    );

    let start = Instant::now();
    let mut records = encode(&args, &frames)?;
    let bytes: usize = records.iter().map(Vec::len).sum();
    tracing::info!(
        "Encoded {} records ({} bytes) in {:.1}ms",
        records.len(),
        bytes,
        start.elapsed().as_secs_f64() * 1000.0
    );

    if let Some(path) = &args.out {
        records = persist(path, &records)?;
    }

    let start = Instant::now();
    let pictures = decode(&records, &frames)?;
    tracing::info!(
        "Decoded {} pictures in {:.1}ms",
        pictures,
        start.elapsed().as_secs_f64() * 1000.0
    );

    if pictures != frames.len() {
        bail!("expected {} pictures, decoded {}", frames.len(), pictures);
    }
    Ok(())
}
