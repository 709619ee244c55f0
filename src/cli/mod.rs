use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};

use crate::config;
use crate::context::AppContext;
use crate::domain::{
    ids::TrackId,
    track::Track,
    upload::{AudioFile, UploadPayload},
};
use crate::http::server::GatewayServer;
use crate::playback::{coordinator::PlaybackCoordinator, player::Player, resource::ResourceRegistry};
use crate::upstream::{Backend, Catalog, Upstream};

#[derive(Parser)]
#[command(name = "tunegate")]
#[command(version = "0.1")]
#[command(about = "Gateway and playback client for an audio upload backend")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP gateway in front of the backend
    Serve,
    /// List uploaded tracks
    List,
    /// Confirm access to a track and fetch its audio
    Play {
        /// Object id of the track
        track_id: String,
        /// Write the fetched audio to this file
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Start muted
        #[arg(short, long)]
        mute: bool,
        /// Start at this fraction of the track (0.0 - 1.0)
        #[arg(short, long)]
        seek: Option<f64>,
    },
    /// Upload an audio file
    Upload {
        file: PathBuf,
        #[arg(short, long)]
        title: String,
        /// Wallet address of the artist, defaults to the configured one
        #[arg(short, long)]
        artist: Option<String>,
    },
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.to_string_lossy();
    let cfg = config::Config::load(&config_path)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cfg.logging.level.as_str()),
    )
    .init();

    let ctx = AppContext::init(cfg)?;

    match &cli.command {
        Commands::Serve => {
            let upstream: Arc<dyn Upstream> = ctx.upstream.clone();
            let http_server = GatewayServer::new(upstream, ctx.config.http.clone());

            println!(
                "HTTP gateway running at http://{}:{}",
                http_server.config.bind_addr, http_server.config.port
            );
            http_server.run();
        }

        Commands::List => {
            let tracks = ctx.upstream.list_tracks()?;
            if tracks.is_empty() {
                println!("No tracks found");
            }
            for track in &tracks {
                print_track(track);
            }
        }

        Commands::Play {
            track_id,
            out,
            mute,
            seek,
        } => {
            let track_id = TrackId::parse(track_id)?;
            let track = ctx
                .upstream
                .list_tracks()?
                .into_iter()
                .find(|t| t.object_id == track_id)
                .with_context(|| format!("track {track_id} not found"))?;

            let mut player = Player::new(ResourceRegistry::new());
            player.select(track);
            let action = PlaybackCoordinator::new(ctx.upstream.as_ref()).toggle(&mut player)?;
            log::debug!("play request became {action:?}");
            if *mute {
                player.toggle_mute();
            }
            if let Some(fraction) = seek {
                player.seek(*fraction);
            }

            let session = player
                .session()
                .with_context(|| "playback session vanished")?;
            print_track(session.track());
            if let Some(digest) = session.digest() {
                println!("  Transaction digest: {digest}");
            }
            println!(
                "  State: {}{}, at {:.0}%",
                session.state(),
                if session.is_muted() { " (muted)" } else { "" },
                session.progress() * 100.0
            );
            if let Some(resource) = session.resource() {
                println!(
                    "  Ready: {} ({} bytes, {})",
                    resource.url(),
                    resource.len(),
                    resource.mime()
                );
                if let Some(out) = out {
                    std::fs::write(out, resource.bytes())
                        .with_context(|| format!("Failed to write {}", out.display()))?;
                    println!("  Saved to {}", out.display());
                }
            }
            player.close();
        }

        Commands::Upload {
            file,
            title,
            artist,
        } => {
            let data = std::fs::read(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "audio".to_string());
            let artist = ctx.artist_address(artist.as_deref())?;

            let payload = UploadPayload::new(
                AudioFile {
                    filename,
                    mime: None,
                    data,
                },
                title,
                &artist,
                Utc::now(),
            )?;
            println!(
                "Uploading {} ({:.2} MB)...",
                payload.metadata.filename,
                payload.metadata.file_size as f64 / 1024.0 / 1024.0
            );

            let reply = ctx.upstream.upload(&payload)?;
            println!("Upload successful!");
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
    }

    ctx.shutdown();
    Ok(())
}

fn print_track(track: &Track) {
    println!("Track: {}", track.title);
    println!("  Artist: {}", track.artist.wallet_address);
    println!("  Uploaded: {}", track.uploaded_on());
    println!("  File size: {:.2} MB", track.size_mb());
    println!("  Type: {}", track.mime_type);
    println!("  Sui Object ID: {}", track.object_id);
    println!("  Walrus Blob ID: {}", track.blob_id);
    if let Some(on_chain) = &track.on_chain_object_id {
        println!("  Walrus Object ID: {on_chain}");
    }
}
