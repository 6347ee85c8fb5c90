//! drive_sweep CLI - Find and remove empty folders in SharePoint libraries.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use drive_sweep::auth::AUTHORITY_HOST;
use drive_sweep::candidates::timestamped_results_path;
use drive_sweep::config::GRAPH_API_BASE;
use drive_sweep::logging::init_logger;
use drive_sweep::{
    Authenticator, BatchDriver, ClientCredential, GraphTransport, Mode, SweepConfig, Throttle,
    ThrottleConfig, ThrottledClient, WalkConfig,
};

const DEFAULT_CANDIDATES: &str = "reports/empty_folder_candidates.csv";
const DEFAULT_SCAN_SUMMARY: &str = "reports/empty_folder_scan_summary.csv";

/// CLI tool for sweeping empty folders out of SharePoint document libraries.
///
/// Run `scan` first, review the candidate list it writes, then run `commit`.
#[derive(Parser)]
#[command(name = "drive_sweep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory (tenant) ID of the app registration.
    #[arg(long, env = "AZURE_TENANT_ID")]
    tenant_id: String,

    /// Application (client) ID of the app registration.
    #[arg(long, env = "AZURE_CLIENT_ID")]
    client_id: String,

    /// Client secret. Takes precedence over a certificate.
    #[arg(long, env = "AZURE_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// PEM file holding the certificate's RSA private key.
    #[arg(long, env = "AZURE_CLIENT_CERTIFICATE_PATH")]
    certificate_key: Option<PathBuf>,

    /// Hex SHA-1 thumbprint of the certificate registered with the app.
    #[arg(long, env = "AZURE_CLIENT_CERTIFICATE_THUMBPRINT")]
    certificate_thumbprint: Option<String>,

    /// Identity platform host.
    #[arg(long, env = "AZURE_AUTHORITY_HOST", default_value = AUTHORITY_HOST)]
    authority_host: String,

    /// Microsoft Graph base URL.
    #[arg(long, env = "GRAPH_BASE_URL", default_value = GRAPH_API_BASE)]
    graph_base: String,

    /// Pause after this many API calls (0 disables the pause).
    #[arg(long, env = "SWEEP_PAUSE_EVERY", default_value_t = 200)]
    pause_every: u64,

    /// Length of the periodic pause, in seconds.
    #[arg(long, env = "SWEEP_PAUSE_SECS", default_value_t = 2)]
    pause_secs: u64,

    /// Wait after a 429 that carries no Retry-After header, in seconds.
    #[arg(long, env = "SWEEP_DEFAULT_RETRY_AFTER", default_value_t = 10)]
    default_retry_after: u64,

    /// Page size ($top) for children listings.
    #[arg(long, env = "SWEEP_PAGE_SIZE", default_value_t = 5000, value_parser = clap::value_parser!(u32).range(1..))]
    page_size: u32,

    /// Also select and delete empty folders directly under a library root.
    #[arg(long, env = "SWEEP_ALLOW_TOP_LEVEL")]
    allow_top_level: bool,

    /// Enable debug logging.
    #[arg(long, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk every library and write empty folders to a candidate list. Deletes nothing.
    Scan {
        /// Library statistics CSV (site_id, library_id, site_name, library_name).
        #[arg(long, short = 'l')]
        libraries: PathBuf,

        /// Where to write the candidate list.
        #[arg(long, short = 'c', default_value = DEFAULT_CANDIDATES)]
        candidates: PathBuf,

        /// Where to write the per-library scan summary.
        #[arg(long, default_value = DEFAULT_SCAN_SUMMARY)]
        summary: PathBuf,
    },

    /// Delete the folders named in a reviewed candidate list.
    Commit {
        /// Reviewed candidate list.
        #[arg(long, short = 'c', default_value = DEFAULT_CANDIDATES)]
        candidates: PathBuf,

        /// Where to write deletion results (default: timestamped file in reports/).
        #[arg(long, short = 'o')]
        results: Option<PathBuf>,

        /// Scan summary used for before/after folder counts.
        #[arg(long)]
        scan_summary: Option<PathBuf>,
    },
}

impl Cli {
    fn credential(&self) -> Result<ClientCredential> {
        if let Some(secret) = &self.client_secret {
            return Ok(ClientCredential::Secret(secret.clone()));
        }

        match (&self.certificate_key, &self.certificate_thumbprint) {
            (Some(key_path), Some(thumbprint)) => {
                let private_key_pem = std::fs::read_to_string(key_path).with_context(|| {
                    format!("Failed to read certificate key from {:?}", key_path)
                })?;
                Ok(ClientCredential::Certificate {
                    private_key_pem,
                    thumbprint: thumbprint.clone(),
                })
            }
            (Some(_), None) => bail!("--certificate-key requires --certificate-thumbprint"),
            _ => bail!(
                "No client credential: set AZURE_CLIENT_SECRET or AZURE_CLIENT_CERTIFICATE_PATH and AZURE_CLIENT_CERTIFICATE_THUMBPRINT"
            ),
        }
    }

    fn sweep_config(&self) -> SweepConfig {
        SweepConfig {
            graph_base: self.graph_base.clone(),
            throttle: ThrottleConfig {
                pause_every: self.pause_every,
                pause: Duration::from_secs(self.pause_secs),
                default_retry_after: Duration::from_secs(self.default_retry_after),
            },
            walk: WalkConfig {
                page_size: self.page_size,
                protect_top_level: !self.allow_top_level,
            },
        }
    }

    fn mode(&self) -> Mode {
        match &self.command {
            Commands::Scan {
                libraries,
                candidates,
                summary,
            } => Mode::Scan {
                libraries_path: libraries.clone(),
                candidates_path: candidates.clone(),
                summary_path: summary.clone(),
            },
            Commands::Commit {
                candidates,
                results,
                scan_summary,
            } => Mode::Commit {
                candidates_path: candidates.clone(),
                results_path: results
                    .clone()
                    .unwrap_or_else(|| timestamped_results_path(&PathBuf::from("reports"))),
                scan_summary_path: scan_summary.clone(),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    // Nothing is safe to attempt without a working credential.
    let credential = cli.credential()?;
    let auth = Authenticator::new(cli.tenant_id.clone(), cli.client_id.clone(), credential)
        .context("Invalid app registration settings")?
        .with_authority_host(cli.authority_host.clone());
    auth.get_access_token()
        .await
        .context("Failed to acquire a Graph access token")?;

    let config = cli.sweep_config();
    let throttle = Arc::new(Throttle::new(config.throttle.clone()));
    let client = ThrottledClient::new(GraphTransport::new(auth), throttle);
    let driver = BatchDriver::new(client, config);

    let mode = cli.mode();
    let results = driver
        .run(&mode)
        .await
        .with_context(|| format!("{:?} failed", mode))?;

    if results.is_empty() {
        println!("No libraries processed.");
    } else {
        println!(
            "{:<30} {:<30} {:>8} {:>8} {:>8} {:>8} {:>8}",
            "SITE", "LIBRARY", "BEFORE", "EMPTY", "DELETED", "FAILED", "AFTER"
        );
        println!("{}", "-".repeat(110));
        for r in &results {
            println!(
                "{:<30} {:<30} {:>8} {:>8} {:>8} {:>8} {:>8}",
                r.site_name,
                r.library_name,
                r.folders_before.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
                r.empty_folders_found,
                r.folders_deleted,
                r.folders_failed,
                r.folders_after.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
            );
        }
    }

    Ok(())
}
