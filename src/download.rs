// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Language resource download utility
//!
//! Installs the packages needed for preprocessing into the resource directory:
//! - punkt_tab: sentence tokenizer tables
//! - stopwords: stopword lists

use anyhow::Result;
use clap::Parser;
use review_eval::config::{CertificateVerification, ResourceConfig};
use review_eval::resources::{find_package, ResourceBootstrap, ResourcePackage, PACKAGES};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "setup-resources")]
#[command(about = "Download language resources used for preprocessing")]
#[command(version)]
struct Args {
    /// Resource directory (defaults to $NLTK_DATA or ~/nltk_data)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Packages to install (comma-separated: punkt_tab,stopwords or 'all')
    #[arg(short, long, default_value = "all")]
    packages: String,

    /// Force re-download even if packages are installed
    #[arg(short, long)]
    force: bool,

    /// Download timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Accept invalid TLS certificates (only for broken local certificate stores)
    #[arg(long)]
    insecure_skip_tls_verify: bool,
}

fn selected_packages(spec: &str) -> Result<Vec<&'static ResourcePackage>> {
    if spec.trim().eq_ignore_ascii_case("all") {
        return Ok(PACKAGES.iter().collect());
    }

    spec.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|id| {
            find_package(id).ok_or_else(|| {
                let known: Vec<&str> = PACKAGES.iter().map(|p| p.id).collect();
                anyhow::anyhow!("Unknown package '{}' (available: {})", id, known.join(", "))
            })
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    tracing::info!("Language Resource Setup");
    tracing::info!("=======================");

    let mut config = args
        .data_dir
        .map(ResourceConfig::with_data_dir)
        .unwrap_or_default();
    config.certificate_verification = CertificateVerification::from_insecure_flag(args.insecure_skip_tls_verify);
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }

    let packages = selected_packages(&args.packages)?;
    let bootstrap = ResourceBootstrap::new(config).force(args.force);

    for package in &packages {
        if let Err(e) = bootstrap.ensure(package) {
            tracing::error!("Failed to install {}: {:#}", package.id, e);
            tracing::info!("Manual install instructions for {}:", package.id);
            tracing::info!("  1. Download: {}", package.url);
            tracing::info!(
                "  2. Extract into: {}",
                package.category_dir(bootstrap.config()).display()
            );
            return Err(e);
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("Resource Setup Complete");
    println!("{}", "=".repeat(60));
    println!("\nInstalled in {}:", bootstrap.config().data_dir.display());
    for package in PACKAGES {
        let status = if bootstrap.is_installed(package) { "ok" } else { "missing" };
        println!("  - {:<10} {}", package.id, status);
    }

    Ok(())
}
