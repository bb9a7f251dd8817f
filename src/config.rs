use clap::{Args, Parser, Subcommand};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file picked up from the working directory when none is given.
const CWD_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "QC_CONFIG_FILE", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify every edge of a corpus as passed, unresolved or ambiguous
    Classify(ClassifyArgs),
    /// Serve classified output for human review
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Edges JSON-lines file
    #[arg(long)]
    pub edges: PathBuf,

    /// Nodes JSON-lines file
    #[arg(long)]
    pub nodes: PathBuf,

    /// Directory for the per-classification output files
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Edges classified per lookup batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Stop after this many edges
    #[arg(long)]
    pub max_edges: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Directory holding classified output
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Interface to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub services: ServicesConfig,
    pub normalization: NormalizationConfig,
    pub synonyms: SynonymsConfig,
    pub lookup: LookupConfig,
    pub retry: RetryConfig,
    pub resilience: ResilienceConfig,
    pub pipeline: PipelineConfig,
    pub review: ReviewConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    pub node_normalizer_url: String,
    pub name_resolver_url: String,
    pub timeout_secs: u64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            node_normalizer_url: "https://nodenormalization-sri.renci.org".to_string(),
            name_resolver_url: "https://name-resolution-sri.renci.org".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ServicesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationConfig {
    pub batch_size: usize,
    pub conflate: bool,
    pub drug_chemical_conflate: bool,
    pub description: bool,
    pub individual_types: bool,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            batch_size: 2000,
            conflate: true,
            drug_chemical_conflate: true,
            description: false,
            individual_types: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynonymsConfig {
    pub batch_size: usize,
}

impl Default for SynonymsConfig {
    fn default() -> Self {
        Self { batch_size: 500 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Strings per bulk-lookup request.
    pub bulk_batch_size: usize,
    /// Candidates requested per string.
    pub limit: usize,
    /// Bulk requests in flight at once.
    pub concurrency: usize,
    /// Taxon gene lookups are restricted to.
    pub human_taxon: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            bulk_batch_size: 1000,
            limit: 10,
            concurrency: 4,
            human_taxon: "NCBITaxon:9606".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            jitter_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Outgoing requests per second across all services (0 disables pacing).
    pub requests_per_second: u32,
    pub burst_size: u32,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst_size: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub max_edges: Option<usize>,
    pub output_dir: PathBuf,
    /// Pause between consecutive normalizer / synonym batches.
    pub batch_pause_ms: u64,
    /// Keep lookup results across edge batches instead of dropping them.
    pub retain_lookup_cache: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_edges: None,
            output_dir: PathBuf::from("output"),
            batch_pause_ms: 100,
            retain_lookup_cache: false,
        }
    }
}

impl PipelineConfig {
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            request_timeout_secs: 30,
        }
    }
}

impl ReviewConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl AppConfig {
    /// Parse the process arguments and load the layered configuration.
    pub fn load() -> Result<(Cli, Self), config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<(Cli, Self), config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        let config = Self::from_cli(&cli)?;
        Ok((cli, config))
    }

    /// Build the configuration for an already parsed command line.
    ///
    /// Priority: CLI flag > `QC_` environment variable > config file > defaults.
    pub fn from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        // 1. Defaults
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        // 2. Config file: explicit path, else ./config.yaml when present
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path).required(true));
        } else if Path::new(CWD_CONFIG_FILE).exists() {
            builder = builder.add_source(File::with_name(CWD_CONFIG_FILE).required(false));
        }

        // 3. Environment, e.g. QC_PIPELINE__BATCH_SIZE=500
        builder = builder.add_source(
            Environment::with_prefix("QC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. CLI overrides
        match &cli.command {
            Command::Classify(args) => {
                if let Some(dir) = &args.output_dir {
                    builder = builder
                        .set_override("pipeline.output_dir", dir.to_string_lossy().to_string())?;
                }
                if let Some(size) = args.batch_size {
                    builder = builder.set_override("pipeline.batch_size", size as u64)?;
                }
                if let Some(max) = args.max_edges {
                    builder = builder.set_override("pipeline.max_edges", max as u64)?;
                }
            }
            Command::Serve(args) => {
                if let Some(dir) = &args.output_dir {
                    builder = builder
                        .set_override("pipeline.output_dir", dir.to_string_lossy().to_string())?;
                }
                if let Some(host) = &args.host {
                    builder = builder.set_override("review.host", host.clone())?;
                }
                if let Some(port) = args.port {
                    builder = builder.set_override("review.port", u64::from(port))?;
                }
            }
        }

        let cfg = builder.build()?;
        let config: Self = cfg.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        let positive = [
            ("pipeline.batch_size", self.pipeline.batch_size),
            ("normalization.batch_size", self.normalization.batch_size),
            ("synonyms.batch_size", self.synonyms.batch_size),
            ("lookup.bulk_batch_size", self.lookup.bulk_batch_size),
            ("lookup.concurrency", self.lookup.concurrency),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(config::ConfigError::Message(format!(
                    "{key} must be greater than zero"
                )));
            }
        }
        if self.retry.max_attempts == 0 {
            return Err(config::ConfigError::Message(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
