//! Submint - AI Subtitle Client
//!
//! Command-line entry point: uploads a video for subtitle generation, writes
//! the resolved tracks for playback, and optionally mints an ownership record.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use submint::cli::{Args, Commands};
use submint::config::Config;
use submint::error::SubmintError;
use submint::language::{parse_language_list, Language};
use submint::mint::{MintOutcome, OwnershipLedger, RpcLedger};
use submint::service::HttpProcessingClient;
use submint::session::{NotificationKind, SubmitOutcome};
use submint::video::VideoFile;
use submint::workflow::Studio;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;
    info!("Starting Submint - AI Subtitle Client");

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Process {
            input,
            target_langs,
            output_dir,
            download,
            mint,
        } => {
            let languages = parse_language_list(&target_langs)?;
            let output_dir = output_dir.unwrap_or_else(|| PathBuf::from(&config.output.dir));
            process(&config, input, &languages, output_dir, download, mint).await?;
        }
        Commands::Languages => {
            println!("\nSupported Languages:");
            println!("{:<10} {:<10} {:<10}", "Name", "Code", "ISO");
            println!("{}", "-".repeat(30));
            for language in Language::ALL {
                println!("{:<10} {:<10} {:<10}", language.label(), language.code(), language.iso_code());
            }
        }
        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                return Err(SubmintError::Config(format!(
                    "{} already exists, use --force to overwrite",
                    path.display()
                ))
                .into());
            }
            Config::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    Ok(())
}

async fn process(
    config: &Config,
    input: PathBuf,
    languages: &[Language],
    output_dir: PathBuf,
    download: bool,
    mint: bool,
) -> Result<()> {
    let service = Arc::new(HttpProcessingClient::new(&config.service)?);

    let ledger: Option<Arc<dyn OwnershipLedger>> = if mint {
        match RpcLedger::connect(&config.ledger).await {
            Ok(ledger) => Some(Arc::new(ledger)),
            Err(e) => {
                warn!("Ledger unavailable: {}", e);
                None
            }
        }
    } else {
        None
    };

    let mut studio = Studio::new(config.service_base(), service, ledger);

    let video = VideoFile::from_path(&input).await?;
    println!("{} ({:.2} MB)", video.name, video.size() as f64 / (1024.0 * 1024.0));
    studio.select_file(video)?;
    for language in languages {
        studio.toggle_language(*language);
    }

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Processing: [{bar:40.cyan/blue}] {pos}%")?
            .progress_chars("#>-"),
    );

    let result = studio.submit_with_progress(|percent| pb.set_position(percent as u64)).await;
    pb.finish_and_clear();

    let notifications = studio.session().lock().take_notifications();
    for notification in notifications {
        match notification.kind {
            NotificationKind::Success => println!("{}", notification.message),
            NotificationKind::Error => eprintln!("{}", notification.message),
        }
    }

    let references = match result? {
        SubmitOutcome::Completed(references) => references,
        SubmitOutcome::Superseded => {
            warn!("Upload result was superseded");
            return Ok(());
        }
    };

    println!("\nSubtitles:");
    for reference in &references {
        println!("  {:<10} {}", reference.language, reference.remote_url);
    }

    let manifest = studio.write_playback(&output_dir).await?;
    println!("Playback manifest: {}", manifest.display());

    if download {
        let saved = studio.save_subtitles(&output_dir).await?;
        println!("Downloaded {} subtitle files to {}", saved.len(), output_dir.display());
    }

    if mint {
        match studio.mint().await {
            Ok(MintOutcome::Minted(receipt)) => {
                println!("Ownership registered in transaction {}", receipt.tx_hash);
            }
            Ok(MintOutcome::AlreadyMinted) => println!("Ownership already registered"),
            Err(SubmintError::ProviderUnavailable(reason)) => {
                eprintln!("Please start a wallet provider to mint ownership records ({})", reason);
            }
            Err(SubmintError::DuplicateRegistration) => {
                eprintln!("Ownership already exists for this video!");
            }
            Err(e) => error!("Minting failed: {}", e),
        }
    }

    studio.close_playback();
    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".submint").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "submint.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("submint.log").display()
    );

    Ok(())
}
