//! battlefx - frame-multiplier aware battle effect timing
//!
//! Headless runner: loads the battle config, steps a demo battle through the
//! effect scheduler and the script interpreter, and writes a JSONL trace.

mod config;
mod headless;

use anyhow::{Context, Result};
use battlefx_core::install_plan;
use config::{BattleConfig, DEFAULT_CONFIG_PATH};
use headless::HeadlessConfig;
use std::{env, path::PathBuf};
use tracing::info;

fn main() -> Result<()> {
    let cli = CliOptions::parse(env::args().skip(1));
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    // Config is read before tracing so it can pick the default filter.
    let (mut cfg, load_note) = match std::fs::metadata(&config_path) {
        Ok(_) => (BattleConfig::load_from_path(&config_path), None),
        Err(_) => (BattleConfig::default(), Some(config_path.clone())),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(default_filter(cfg.trace_battle_animation))
            }),
        )
        .init();

    info!("Starting battlefx v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = load_note {
        tracing::warn!("Battle config not found at {}. Using defaults", path.display());
    }

    if let Some(ticks) = cli.ticks {
        cfg.ticks = ticks;
    }
    if let Some(value) = cli.multiplier {
        cfg.frame_multiplier = Some(value);
    }
    if let Some(path) = cli.trace {
        cfg.trace_path = Some(path);
    }
    let multiplier = cfg
        .multiplier()
        .context("invalid frame multiplier in battle config")?;
    let plan = install_plan(multiplier, cfg.fps_limiter);
    info!(
        multiplier = multiplier.get(),
        limiter = cfg.fps_limiter.as_str(),
        patches = plan.len(),
        "patch plan resolved"
    );
    if cli.print_plan {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    }
    if cli.save_config {
        cfg.save_to_path(&config_path)
            .with_context(|| format!("failed to save config to {}", config_path.display()))?;
    }

    let summary = headless::run(HeadlessConfig {
        multiplier,
        ticks: cfg.ticks,
        trace_path: cfg.trace_path.clone(),
    })?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Every workspace crate that logs battle animation events.
const TRACE_FILTER: &str =
    "warn,battlefx=trace,battlefx_effects=trace,battlefx_script=trace,battlefx_testkit=trace";

fn default_filter(trace_battle_animation: bool) -> &'static str {
    if trace_battle_animation {
        TRACE_FILTER
    } else {
        "warn"
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct CliOptions {
    config: Option<PathBuf>,
    ticks: Option<u64>,
    multiplier: Option<u8>,
    trace: Option<PathBuf>,
    save_config: bool,
    print_plan: bool,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    if let Some(path) = args.next() {
                        opts.config = Some(PathBuf::from(path));
                    } else {
                        eprintln!("--config requires a file path");
                    }
                }
                "--ticks" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<u64>() {
                            Ok(value) => opts.ticks = Some(value),
                            Err(err) => eprintln!("--ticks must be an integer ({err}): {raw}"),
                        }
                    } else {
                        eprintln!("--ticks requires an integer");
                    }
                }
                "--multiplier" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<u8>() {
                            Ok(value) => opts.multiplier = Some(value),
                            Err(err) => {
                                eprintln!("--multiplier must be an integer 1-255 ({err}): {raw}")
                            }
                        }
                    } else {
                        eprintln!("--multiplier requires an integer");
                    }
                }
                "--trace" => {
                    if let Some(path) = args.next() {
                        opts.trace = Some(PathBuf::from(path));
                    } else {
                        eprintln!("--trace requires a file path");
                    }
                }
                "--save-config" => opts.save_config = true,
                "--print-plan" => opts.print_plan = true,
                other => eprintln!("Ignoring unknown argument {other}"),
            }
        }

        opts
    }
}
