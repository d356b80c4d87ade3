use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use hfp_msbc_rs::audio::{DecodePipeline, MsbcBackend, MsbcDecoder, PipelineConfig};
use hfp_msbc_rs::config::Config;
use hfp_msbc_rs::packet::PacketReader;

#[derive(Parser, Debug)]
#[command(name = "hfp_msbc_rs")]
#[command(about = "Decode captured HFP mSBC packets to 16 kHz mono s16le PCM", long_about = None)]
struct Args {
    /// File of back-to-back 60-byte mSBC packets
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Raw PCM output ("-" for stdout; stdout by default unless --play)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Play the decoded audio on the configured ALSA device
    #[arg(long)]
    play: bool,

    /// Re-initialize the decoder after N consecutive failures (0 = never)
    #[arg(long, value_name = "N")]
    reinit_after: Option<u32>,

    /// Abort after N consecutive failures (0 = never)
    #[arg(long, value_name = "N")]
    max_failures: Option<u32>,
}

#[cfg(feature = "oi-sbc")]
fn open_backend() -> Result<Box<dyn MsbcBackend>> {
    Ok(Box::new(hfp_msbc_rs::audio::OiSbcBackend::new()))
}

#[cfg(not(feature = "oi-sbc"))]
fn open_backend() -> Result<Box<dyn MsbcBackend>> {
    anyhow::bail!("built without an SBC codec backend, rebuild with --features oi-sbc")
}

#[cfg(feature = "playback")]
type Player = hfp_msbc_rs::audio::Player;

#[cfg(feature = "playback")]
fn start_player(config: &Config) -> Result<Player> {
    Player::start(config.into())
}

#[cfg(not(feature = "playback"))]
struct Player;

#[cfg(not(feature = "playback"))]
impl Player {
    fn send(&self, _frame: hfp_msbc_rs::audio::PcmFrame) -> Result<()> {
        Ok(())
    }
}

#[cfg(not(feature = "playback"))]
fn start_player(_config: &Config) -> Result<Player> {
    anyhow::bail!("built without playback support, rebuild with --features playback")
}

fn open_output(path: Option<&PathBuf>, play: bool) -> Result<Option<Box<dyn Write>>> {
    match path {
        Some(p) if p.as_os_str() == "-" => Ok(Some(Box::new(io::stdout().lock()))),
        Some(p) => {
            let file = File::create(p)
                .with_context(|| format!("Failed to create output file {}", p.display()))?;
            Ok(Some(Box::new(BufWriter::new(file))))
        }
        None if play => Ok(None),
        None => Ok(Some(Box::new(io::stdout().lock()))),
    }
}

fn main() -> Result<()> {
    // 初始化日志
    env_logger::init();

    let args = Args::parse();

    // 加载配置，命令行参数优先
    let config = Config::new().unwrap_or_default();
    let mut pipeline_config = PipelineConfig::from(&config);
    if let Some(n) = args.reinit_after {
        pipeline_config.reinit_after_failures = n;
    }
    if let Some(n) = args.max_failures {
        pipeline_config.max_consecutive_failures = n;
    }

    log::info!("{} {} decoding {}", config.app_name, config.app_version, args.input.display());

    let input = File::open(&args.input)
        .with_context(|| format!("Failed to open input file {}", args.input.display()))?;
    let reader = PacketReader::new(BufReader::new(input));

    let mut output = open_output(args.output.as_ref(), args.play)?;
    let mut player = if args.play { Some(start_player(&config)?) } else { None };

    let decoder = MsbcDecoder::new(open_backend()?);
    let mut pipeline = DecodePipeline::new(decoder, pipeline_config);
    pipeline.start().context("Failed to initialize mSBC decoder")?;

    let stats = pipeline.run_with(reader, |frame| {
        if let Some(out) = output.as_mut() {
            out.write_all(&frame.to_le_bytes())?;
        }
        let playback_failed = match &player {
            Some(p) => p.send(*frame).is_err(),
            None => false,
        };
        if playback_failed {
            log::warn!("Playback stopped, continuing without audio output");
            player = None;
        }
        Ok(())
    })?;

    if let Some(out) = output.as_mut() {
        out.flush()?;
    }
    pipeline.finish();
    drop(player);

    eprintln!(
        "packets: {}, decoded: {}, failed: {}, reinits: {}",
        stats.packets, stats.decoded, stats.failed, stats.reinits
    );
    Ok(())
}
