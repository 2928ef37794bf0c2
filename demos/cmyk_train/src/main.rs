use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use cmyk_nn::{
    color::{patterns_from_pixels, Cmyk, Converter, Rgba, TargetLayout},
    viz::LossGui,
    FeedForward, NetworkConfig, Optimizer,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "cmyk-train",
    about = "Train a CMYK to RGB network on synthesized color pairs"
)]
struct Args {
    /// Network file, restored if present and written after training
    #[arg(short = 'f', long, default_value = "network.json")]
    network: PathBuf,

    /// JSON network config used when no network file exists yet
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hidden units for a fresh network (ignored with --config)
    #[arg(long, default_value_t = 12)]
    hiddens: usize,

    /// Paired samples to synthesize
    #[arg(long, default_value_t = 4096)]
    samples: usize,

    #[arg(long, default_value_t = 20)]
    iterations: usize,

    #[arg(long, default_value_t = 0.6)]
    rate: f64,

    #[arg(long, default_value_t = 0.4)]
    momentum: f64,

    /// Seed for sample synthesis and fresh weights
    #[arg(long)]
    seed: Option<u64>,

    /// Log the loss every N iterations
    #[arg(long, default_value_t = 1)]
    log_every: usize,

    /// Plot the loss in a window while training
    #[arg(long)]
    gui: bool,
}

/// Textbook conversion, standing in for pixels of a real CMYK/RGB image pair.
fn naive_rgb(c: Cmyk) -> Rgba {
    let ch = |v: u8| ((255 - v as u32) * (255 - c.k as u32) / 255) as u8;
    Rgba::rgb(ch(c.c), ch(c.m), ch(c.y))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => NetworkConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => NetworkConfig::default()
            .with_hiddens(args.hiddens)
            .with_seed(args.seed),
    };

    let (mut net, restored) = FeedForward::load_or_init(&args.network, &config)
        .with_context(|| format!("loading {}", args.network.display()))?;
    if restored {
        tracing::info!(path = %args.network.display(), "updating saved network");
    } else {
        tracing::info!(
            hiddens = net.n_hiddens() - 1,
            "no saved network, starting fresh"
        );
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let cmyk: Vec<Cmyk> = (0..args.samples)
        .map(|_| Cmyk::new(rng.gen(), rng.gen(), rng.gen(), rng.gen()))
        .collect();
    let rgb: Vec<Rgba> = cmyk.iter().map(|&c| naive_rgb(c)).collect();
    let layout = if net.n_outputs() == TargetLayout::Rgba.outputs() {
        TargetLayout::Rgba
    } else {
        TargetLayout::Rgb
    };
    let patterns = patterns_from_pixels(&cmyk, &rgb, layout)?;

    let optim = Optimizer::new(args.iterations, args.rate, args.momentum)
        .with_log(Some(args.log_every));
    let losses = if args.gui {
        optim.train_gui::<LossGui>(&mut net, &patterns)?
    } else {
        optim.train(&mut net, &patterns)?
    };
    if let (Some(first), Some(last)) = (losses.first(), losses.last()) {
        tracing::info!(first, last, "training done");
    }

    net.dump(&args.network)
        .with_context(|| format!("writing {}", args.network.display()))?;

    let mut converter = Converter::new(net);
    for &c in cmyk.iter().take(5) {
        let got = converter.cmyk_to_rgba(c)?;
        let want = naive_rgb(c);
        println!(
            "cmyk({:3},{:3},{:3},{:3}) -> rgb({:3},{:3},{:3})  expected rgb({:3},{:3},{:3})",
            c.c, c.m, c.y, c.k, got.r, got.g, got.b, want.r, want.g, want.b
        );
    }

    Ok(())
}
