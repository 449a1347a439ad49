mod cli;

use std::{
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use hls_playlist::{parse_level_playlist, parse_master_playlist, parse_master_playlist_media};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "hls_playlist=debug"
    } else {
        "hls_playlist=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Master { ref input } => {
            let (text, base_url) = load(input, cli.base_url.as_deref())?;
            let playlist = parse_master_playlist(&text, &base_url);
            report(playlist.playlist_parsing_error.as_ref());
            print(&playlist, cli.pretty)
        }
        Commands::Media { ref input } => {
            let (text, base_url) = load(input, cli.base_url.as_deref())?;
            let master = parse_master_playlist(&text, &base_url);
            let groups = parse_master_playlist_media(&text, &base_url, &master);
            print(&groups, cli.pretty)
        }
        Commands::Level {
            ref input,
            level_id,
            level_type,
            start_sn,
            ref master,
        } => {
            let (text, base_url) = load(input, cli.base_url.as_deref())?;
            let parent = match master {
                Some(path) => {
                    let (master_text, master_url) = load(path, None)?;
                    parse_master_playlist(&master_text, &master_url).variable_list
                }
                None => None,
            };
            let details = parse_level_playlist(
                &text,
                &base_url,
                level_id,
                level_type.into(),
                start_sn,
                parent.as_ref(),
            );
            report(details.playlist_parsing_error.as_ref());
            print(&details, cli.pretty)
        }
    }
}

/// Read a playlist and work out the URL its relative URIs resolve against.
fn load(input: &Path, base_url: Option<&str>) -> Result<(String, String)> {
    if input == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read playlist from stdin")?;
        return Ok((text, base_url.unwrap_or_default().to_string()));
    }

    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read playlist {:?}", input))?;
    let base_url = match base_url {
        Some(url) => url.to_string(),
        None => file_url(input)?,
    };
    tracing::debug!("Parsing {:?} against {}", input, base_url);
    Ok((text, base_url))
}

fn file_url(path: &Path) -> Result<String> {
    let absolute: PathBuf = std::path::absolute(path)
        .with_context(|| format!("Failed to resolve path {:?}", path))?;
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|_| anyhow::anyhow!("Cannot build a file URL from {:?}", absolute))
}

fn report(error: Option<&hls_playlist::Error>) {
    if let Some(e) = error {
        tracing::warn!("Playlist parsing error: {}", e);
    }
}

fn print<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}
