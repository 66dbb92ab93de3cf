use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser};

use crate::extract::Extractor;
use crate::fetch::{FetchError, HttpFetcher, DEFAULT_TIMEOUT};
use crate::profile::{ImageChoice, ProfileChoice, ProfileSelector};

pub const DEFAULT_BIND: &str = "127.0.0.1:8765";
pub const DEFAULT_OUTPUT: &str = "chapter-data.json";

/// Options shared by both front ends.
#[derive(Debug, Clone, Args)]
pub struct ExtractOptions {
    /// Extraction profile: `auto` uses the site fast path for known hosts
    #[arg(long, value_enum, default_value_t = ProfileChoice::Auto)]
    pub profile: ProfileChoice,

    /// Override the minimum paragraph length (characters, exclusive)
    #[arg(long)]
    pub min_paragraph_chars: Option<usize>,

    /// Override how the representative image is picked
    #[arg(long, value_enum)]
    pub image_strategy: Option<ImageChoice>,

    /// Fetch timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,
}

impl ExtractOptions {
    pub fn selector(&self) -> ProfileSelector {
        ProfileSelector {
            choice: self.profile,
            min_paragraph_chars: self.min_paragraph_chars,
            image: self.image_strategy,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn build_extractor(&self) -> Result<Extractor, FetchError> {
        let fetcher = HttpFetcher::new(self.timeout(), self.insecure)?;
        Ok(Extractor::new(Arc::new(fetcher), self.selector()))
    }
}

/// Loopback proxy that lets a browser page fetch and extract chapters.
#[derive(Debug, Clone, Parser)]
#[command(name = "chapter-proxy", version)]
pub struct ProxyConfig {
    /// Address to listen on
    #[arg(long, default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    #[command(flatten)]
    pub extract: ExtractOptions,
}

/// Extract one chapter and save it as JSON.
#[derive(Debug, Clone, Parser)]
#[command(name = "scrape-chapter", version)]
pub struct BatchConfig {
    /// Page to extract, e.g. http://www.mediabuddha.net/m/news/view.php?number=35373
    pub url: String,

    /// Output file, overwritten on every run
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    #[command(flatten)]
    pub extract: ExtractOptions,
}
