use crate::config::Config;
use crate::pipeline::PlaybackCoordinator;
use crate::sink::{AudioSink, DeviceAudioSink, NullAudioSink, NullVideoSink, RawFileSink, VideoSink};
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use log::{error, info};
use std::path::Path;
use tokio_util::sync::CancellationToken;

pub mod config;
pub mod pipeline;
pub mod reader;
pub mod sink;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let matches = Command::new(config::app_name())
        .version(config::version())
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file; flags below override it."),
        )
        .arg(
            Arg::new("video-source")
                .long("video-source")
                .value_name("PATH")
                .help("Raw video byte source (file or named FIFO)."),
        )
        .arg(
            Arg::new("audio-source")
                .long("audio-source")
                .value_name("PATH")
                .help("Raw audio byte source (file or named FIFO)."),
        )
        .arg(
            Arg::new("video-out")
                .long("video-out")
                .value_name("PATH")
                .help("Where synchronized raw frames are written; discarded when unset."),
        )
        .arg(
            Arg::new("width")
                .long("width")
                .value_name("PIXELS")
                .help("Video frame width."),
        )
        .arg(
            Arg::new("height")
                .long("height")
                .value_name("PIXELS")
                .help("Video frame height."),
        )
        .arg(
            Arg::new("fps")
                .long("fps")
                .value_name("RATE")
                .help("Nominal video frame rate; also sets the delivery tick."),
        )
        .arg(
            Arg::new("pixel-format")
                .long("pixel-format")
                .value_name("FORMAT")
                .help("Pixel layout of the video source (yuv422/nv12/rgba)."),
        )
        .arg(
            Arg::new("channels")
                .long("channels")
                .value_name("COUNT")
                .help("Audio channel count."),
        )
        .arg(
            Arg::new("sample-rate")
                .long("sample-rate")
                .value_name("HZ")
                .help("Audio sample rate."),
        )
        .arg(
            Arg::new("sample-format")
                .long("sample-format")
                .value_name("FORMAT")
                .help("PCM sample format (s16/f32)."),
        )
        .arg(
            Arg::new("byte-order")
                .long("byte-order")
                .value_name("ORDER")
                .help("PCM byte order (little/big)."),
        )
        .arg(
            Arg::new("mute")
                .long("mute")
                .action(clap::ArgAction::SetTrue)
                .help("Discard audio instead of playing it."),
        )
        .get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::load(Path::new(path))?,
        None => Config::default(),
    };
    apply_overrides(&mut config, &matches)?;

    let video_sink: Box<dyn VideoSink> = match &config.video_out {
        Some(path) => match RawFileSink::create(path) {
            Ok(sink) => Box::new(sink),
            Err(e) => {
                error!("Failed to open video output {}: {}", path.display(), e);
                Box::new(NullVideoSink::new())
            }
        },
        None => {
            info!("No video output target, frames will be discarded");
            Box::new(NullVideoSink::new())
        }
    };

    let audio_sink: Box<dyn AudioSink> = if matches.get_flag("mute") {
        Box::new(NullAudioSink::new())
    } else {
        match DeviceAudioSink::new(&config.audio) {
            Ok(sink) => Box::new(sink),
            Err(e) => {
                error!("Failed to open audio device: {}", e);
                Box::new(NullAudioSink::new())
            }
        }
    };

    // gracefully close the pipeline when receiving SIGINT or SIGTERM
    let cancel = CancellationToken::new();
    let ctrlc_cancel = cancel.clone();
    ctrlc::set_handler(move || {
        ctrlc_cancel.cancel();
    })
    .expect("Error setting Ctrl-C handler");

    let coordinator = PlaybackCoordinator::launch(&config, video_sink, audio_sink);

    cancel.cancelled().await;
    info!("Shutdown requested");
    coordinator.shutdown().await;

    Ok(())
}

fn apply_overrides(config: &mut Config, matches: &ArgMatches) -> Result<()> {
    if let Some(path) = matches.get_one::<String>("video-source") {
        config.video_source = path.into();
    }
    if let Some(path) = matches.get_one::<String>("audio-source") {
        config.audio_source = path.into();
    }
    if let Some(path) = matches.get_one::<String>("video-out") {
        config.video_out = Some(path.into());
    }
    if let Some(width) = matches.get_one::<String>("width") {
        config.video.width = width.parse().context("invalid --width")?;
    }
    if let Some(height) = matches.get_one::<String>("height") {
        config.video.height = height.parse().context("invalid --height")?;
    }
    if let Some(fps) = matches.get_one::<String>("fps") {
        config.video.frame_rate = fps.parse().context("invalid --fps")?;
    }
    if let Some(format) = matches.get_one::<String>("pixel-format") {
        config.video.pixel_format = format.parse()?;
    }
    if let Some(channels) = matches.get_one::<String>("channels") {
        config.audio.channels = channels.parse().context("invalid --channels")?;
    }
    if let Some(rate) = matches.get_one::<String>("sample-rate") {
        config.audio.sample_rate = rate.parse().context("invalid --sample-rate")?;
    }
    if let Some(format) = matches.get_one::<String>("sample-format") {
        config.audio.sample_width = format.parse()?;
    }
    if let Some(order) = matches.get_one::<String>("byte-order") {
        config.audio.byte_order = order.parse()?;
    }
    Ok(())
}
