use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use listing_parser::download::{download_all, plan_downloads, DEFAULT_DOWNLOAD_ROOT};
use listing_parser::message::handle_message;
use listing_parser::sink::{upload_listing, ListingPayload, SinkConfig, DEFAULT_ENDPOINT};
use listing_parser::{
    extract_all_listings, extract_images, extract_listing, ErrorKind, FilterConfig, Page,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "listing-parser")]
#[command(about = "Extract listing data from saved marketplace page snapshots")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct Snapshot {
    /// Saved HTML of the rendered page
    html: PathBuf,

    /// Address the page was loaded from
    #[arg(long)]
    url: Option<String>,
}

impl Snapshot {
    fn load(&self) -> anyhow::Result<Page> {
        let html = fs::read_to_string(&self.html)
            .with_context(|| format!("failed to read {}", self.html.display()))?;
        Ok(Page::parse(&html, self.url.as_deref()))
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the listing record of a single-listing page
    Listing {
        #[command(flatten)]
        snapshot: Snapshot,
    },
    /// Print filtered overlay analytics for every listing on a results page
    Results {
        #[command(flatten)]
        snapshot: Snapshot,
        #[arg(long)]
        min_conversion_rate: Option<f64>,
        #[arg(long)]
        min_views: Option<f64>,
        #[arg(long)]
        min_sold: Option<f64>,
    },
    /// Print the listing's image URLs, optionally downloading them
    Images {
        #[command(flatten)]
        snapshot: Snapshot,
        #[arg(long)]
        download: bool,
        #[arg(long, env = "LISTING_DOWNLOAD_ROOT", default_value = DEFAULT_DOWNLOAD_ROOT)]
        root: String,
        /// Directory the download root is created in
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        #[arg(long, env = "LISTING_HTTP_TIMEOUT_SECS", default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Extract a listing and upload it to the collection endpoint
    Push {
        #[command(flatten)]
        snapshot: Snapshot,
        #[arg(long, env = "LISTING_PRODUCT_TYPE")]
        product_type: String,
        #[arg(long, env = "LISTING_ACCOUNT_ID")]
        account: String,
        #[arg(long, env = "LISTING_SINK_URL", default_value = DEFAULT_ENDPOINT)]
        endpoint: String,
        #[arg(long, env = "LISTING_HTTP_TIMEOUT_SECS", default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Run a raw message-protocol request, e.g. '{"action":"extractImages"}'
    Message {
        #[command(flatten)]
        snapshot: Snapshot,
        request: String,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Listing { snapshot } => {
            let page = snapshot.load()?;
            let record = extract_listing(&page).map_err(|e| {
                anyhow::anyhow!("{}: {}", ErrorKind::from(&e).user_message(), e)
            })?;
            print_json(&record)?;
        }
        Commands::Results {
            snapshot,
            min_conversion_rate,
            min_views,
            min_sold,
        } => {
            let page = snapshot.load()?;
            let config = FilterConfig {
                min_conversion_rate,
                min_views_24h: min_views,
                min_sold_24h: min_sold,
            };
            let outcome = extract_all_listings(&page, &config);
            if outcome.records().is_none() {
                tracing::warn!("{}", ErrorKind::NoResults.user_message());
            }
            print_json(&outcome)?;
        }
        Commands::Images {
            snapshot,
            download,
            root,
            dir,
            timeout_secs,
        } => {
            let page = snapshot.load()?;
            let images = extract_images(&page).map_err(|e| {
                anyhow::anyhow!("{}: {}", ErrorKind::from(&e).user_message(), e)
            })?;
            print_json(&images)?;

            if download {
                if images.image_urls.is_empty() {
                    bail!("no images to download");
                }
                let agent = SinkConfig {
                    timeout_secs,
                    ..SinkConfig::default()
                }
                .agent();
                let summary = download_all(&agent, &dir, &plan_downloads(&images, &root));
                print_json(&summary)?;
            }
        }
        Commands::Push {
            snapshot,
            product_type,
            account,
            endpoint,
            timeout_secs,
        } => {
            let page = snapshot.load()?;
            let record = extract_listing(&page).map_err(|e| {
                anyhow::anyhow!("{}: {}", ErrorKind::from(&e).user_message(), e)
            })?;
            let config = SinkConfig {
                endpoint,
                timeout_secs,
            };
            let payload = ListingPayload {
                listing: &record,
                product_type: &product_type,
                acc: &account,
            };
            let message = upload_listing(&config.agent(), &config.endpoint, &payload)?;
            println!("{}", message);
        }
        Commands::Message { snapshot, request } => {
            let page = snapshot.load()?;
            let response = handle_message(&page, &request).context("invalid request JSON")?;
            print_json(&response)?;
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
