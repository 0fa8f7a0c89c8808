// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parlor - a self-hosted embeddable commenting service.
//!
//! `server` boots the full service; the other subcommands are thin clients
//! against a running instance's admin API, except `avatar` which migrates
//! between stores in-process.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod avatar;
mod cleanup;
mod client;
mod server;

#[derive(Parser, Debug)]
#[command(name = "parlor", version, about, long_about = None)]
struct Cli {
    /// Config file path. Defaults to the XDG hierarchy plus environment.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the commenting service.
    Server,
    /// Replace a site's content from a dump file via the admin API.
    Import {
        #[arg(long)]
        site: String,
        #[arg(long)]
        file: PathBuf,
        /// One of native, disqus, wordpress, commento.
        #[arg(long, default_value = "native")]
        provider: String,
    },
    /// Download a gzipped native dump via the admin API.
    Backup {
        #[arg(long)]
        site: String,
        /// Output path; defaults to backup-<site>-<yyyymmdd>.gz.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Upload a gzipped native dump via the admin API.
    Restore {
        #[arg(long)]
        site: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Scan a site for spam comments and delete them via the admin API.
    Cleanup {
        #[arg(long)]
        site: String,
        /// Substring worth 10 spam points per hit.
        #[arg(long = "bad-word")]
        bad_words: Vec<String>,
        /// Username substring worth 50 spam points.
        #[arg(long = "bad-user")]
        bad_users: Vec<String>,
        /// Report matches without deleting.
        #[arg(long)]
        dry_run: bool,
    },
    /// Rewrite comment URLs via the admin API. The rules file holds one
    /// `old new` pair per line; a trailing `*` matches any suffix.
    Remap {
        #[arg(long)]
        site: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Copy avatars between two stores in-process.
    Avatar {
        /// Source store kind: fs or sqlite.
        #[arg(long)]
        from: String,
        #[arg(long)]
        from_path: String,
        /// Target store kind; defaults to the configured avatar store.
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        to_path: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match parlor_config::load_config_from_path(path) {
            Ok(config) => config,
            Err(e) => {
                error!(path = %path.display(), error = %e, "cannot load config");
                std::process::exit(1);
            }
        },
        None => match parlor_config::load_and_validate() {
            Ok(config) => config,
            Err(errors) => {
                parlor_config::render_errors(&errors);
                std::process::exit(1);
            }
        },
    };

    let result = match cli.command {
        Commands::Server => server::run_server(config).await,
        Commands::Import {
            site,
            file,
            provider,
        } => client::run_import(&config, &site, &file, &provider).await,
        Commands::Backup { site, file } => client::run_backup(&config, &site, file).await,
        Commands::Restore { site, file } => client::run_restore(&config, &site, &file).await,
        Commands::Cleanup {
            site,
            bad_words,
            bad_users,
            dry_run,
        } => cleanup::run_cleanup(&config, &site, &bad_words, &bad_users, dry_run).await,
        Commands::Remap { site, file } => client::run_remap(&config, &site, &file).await,
        Commands::Avatar {
            from,
            from_path,
            to,
            to_path,
        } => {
            let to = to.unwrap_or_else(|| config.avatar.kind.clone());
            let to_path = to_path.unwrap_or_else(|| config.avatar.path.clone());
            avatar::run_avatar(&from, &from_path, &to, &to_path).await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "command failed");
        std::process::exit(1);
    }
}
