//! Drives the codec over a raw headerless RGB24 frame sequence: `encode`
//! turns a flat stream of `width*height*3`-byte frames into the codec's
//! length-prefixed bitstream, `decode` reverses it.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use screenpress_ans::config::CodecConfig;
use screenpress_ans::frame::FrameTypeRequest;
use screenpress_ans::Codec;

#[derive(Parser, Debug)]
#[command(about = "Compress or decompress a raw headerless RGB24 frame sequence", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a raw RGB24 frame sequence into the codec's bitstream.
    Encode {
        input: PathBuf,
        output: PathBuf,

        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(long, default_value_t = 0)]
        loss: u8,
        #[arg(long)]
        worker_threads: Option<usize>,
    },
    /// Decode the codec's bitstream back into a raw RGB24 frame sequence.
    Decode {
        input: PathBuf,
        output: PathBuf,

        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(long)]
        worker_threads: Option<usize>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    match args.command {
        Command::Encode {
            input,
            output,
            width,
            height,
            loss,
            worker_threads,
        } => encode(input, output, width, height, loss, worker_threads),
        Command::Decode {
            input,
            output,
            width,
            height,
            worker_threads,
        } => decode(input, output, width, height, worker_threads),
    }
}

fn encode(
    input: PathBuf,
    output: PathBuf,
    width: u32,
    height: u32,
    loss: u8,
    worker_threads: Option<usize>,
) -> Result<()> {
    let mut config = CodecConfig::new(width, height).with_loss(loss);
    config.worker_threads = worker_threads;
    let mut codec = Codec::new(config.clone())?;

    let mut reader = BufReader::new(
        File::open(&input).with_context(|| format!("opening {}", input.display()))?,
    );
    let mut writer = BufWriter::new(
        File::create(&output).with_context(|| format!("creating {}", output.display()))?,
    );

    let frame_len = config.stride() * height as usize;
    let mut raw = vec![0u8; frame_len];
    let mut frame_count = 0usize;

    loop {
        match reader.read_exact(&mut raw) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e).context("reading a raw input frame"),
        }
        let encoded = codec.compress(&raw, FrameTypeRequest::Auto)?;
        writer.write_all(&(encoded.len() as u32).to_le_bytes())?;
        writer.write_all(&encoded)?;
        frame_count += 1;
    }
    writer.flush()?;
    info!("encoded {frame_count} frame(s)");
    Ok(())
}

fn decode(
    input: PathBuf,
    output: PathBuf,
    width: u32,
    height: u32,
    worker_threads: Option<usize>,
) -> Result<()> {
    let mut config = CodecConfig::new(width, height);
    config.worker_threads = worker_threads;
    let mut codec = Codec::new(config)?;

    let mut reader = BufReader::new(
        File::open(&input).with_context(|| format!("opening {}", input.display()))?,
    );
    let mut writer = BufWriter::new(
        File::create(&output).with_context(|| format!("creating {}", output.display()))?,
    );

    let mut frame_count = 0usize;
    loop {
        let mut len_buf = [0u8; 4];
        match reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e).context("reading a frame length prefix"),
        }
        let len = u32::from_le_bytes(len_buf) as usize;
        let mut body = vec![0u8; len];
        reader
            .read_exact(&mut body)
            .context("reading a frame body")?;
        let raw = codec.decompress(&body)?;
        writer.write_all(&raw)?;
        frame_count += 1;
    }
    writer.flush()?;
    info!("decoded {frame_count} frame(s)");
    Ok(())
}
