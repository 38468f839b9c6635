use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use impactu_harvest::app::{Harvester, ProgressSink, preview};
use impactu_harvest::config::{ConfigLoader, ResolvedConfig};
use impactu_harvest::domain::ProductsPage;
use impactu_harvest::error::HarvestError;
use impactu_harvest::impactu::{ImpactuHttpClient, ProductsClient};
use impactu_harvest::output::{ConsoleSink, JsonOutput, OutputMode, TextOutput};
use impactu_harvest::store::{Collection, JsonlCollection};

#[derive(Parser)]
#[command(name = "impactu-harvest")]
#[command(about = "Stage ImpactU products without a Google Scholar id and normalize them for MOAI")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    store_root: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Walk the products listing and stage products without a Scholar id")]
    Fetch(FetchArgs),
    #[command(about = "Normalize staged products into the destination collection")]
    Copy,
    #[command(about = "Fetch, then copy")]
    Run(FetchArgs),
    #[command(about = "Show document counts for both collections")]
    Status,
    #[command(about = "Print normalized records for staged products without writing them")]
    Preview(PreviewArgs),
}

#[derive(Args, Clone)]
struct FetchArgs {
    #[arg(long)]
    page_size: Option<u32>,

    #[arg(long)]
    api_base: Option<String>,

    #[arg(long)]
    delay_ms: Option<u64>,
}

#[derive(Args)]
struct PreviewArgs {
    #[arg(long, default_value_t = 10)]
    limit: usize,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<HarvestError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &HarvestError) -> u8 {
    match error {
        HarvestError::MissingConfig
        | HarvestError::ConfigRead(_)
        | HarvestError::ConfigParse(_)
        | HarvestError::InvalidConfig(_) => 2,
        err if err.is_remote() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let mut config = ConfigLoader::resolve_or_default(cli.config.as_deref())?;
    if let Some(root) = cli.store_root {
        config.store.root = Some(root.into());
    }

    match cli.command {
        Commands::Fetch(args) => {
            apply_fetch_overrides(&mut config, &args)?;
            let harvester = http_harvester(&config)?;
            let result = harvester.fetch(sink_for(output_mode))?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_fetch(&result).into_diagnostic()?,
                OutputMode::Text => println!("{}", TextOutput::fetch_summary(&result)),
            }
        }
        Commands::Copy => {
            let harvester = offline_harvester(&config)?;
            let result = harvester.copy(sink_for(output_mode))?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_copy(&result).into_diagnostic()?,
                OutputMode::Text => println!("{}", TextOutput::copy_summary(&result)),
            }
        }
        Commands::Run(args) => {
            apply_fetch_overrides(&mut config, &args)?;
            let harvester = http_harvester(&config)?;
            let result = harvester.run(sink_for(output_mode))?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_run(&result).into_diagnostic()?,
                OutputMode::Text => {
                    println!("{}", TextOutput::fetch_summary(&result.fetch));
                    println!("{}", TextOutput::copy_summary(&result.copy));
                }
            }
        }
        Commands::Status => {
            let harvester = offline_harvester(&config)?;
            let result = harvester.status()?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_status(&result).into_diagnostic()?,
                OutputMode::Text => println!("{}", TextOutput::status_summary(&result)),
            }
        }
        Commands::Preview(args) => {
            let harvester = offline_harvester(&config)?;
            let mut staged = harvester.staging().find_all()?;
            staged.truncate(args.limit);
            JsonOutput::print_preview(&preview(&staged)).into_diagnostic()?;
        }
    }
    Ok(())
}

fn apply_fetch_overrides(config: &mut ResolvedConfig, args: &FetchArgs) -> miette::Result<()> {
    if let Some(page_size) = args.page_size {
        if page_size == 0 {
            return Err(HarvestError::InvalidConfig("page_size must be at least 1".to_string()).into());
        }
        config.api.page_size = page_size;
    }
    if let Some(api_base) = &args.api_base {
        config.api.base_url = api_base.trim_end_matches('/').to_string();
    }
    if let Some(delay_ms) = args.delay_ms {
        config.api.request_delay = std::time::Duration::from_millis(delay_ms);
    }
    Ok(())
}

fn sink_for(output_mode: OutputMode) -> &'static dyn ProgressSink {
    match output_mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Text => &ConsoleSink,
    }
}

fn collections(config: &ResolvedConfig) -> miette::Result<(JsonlCollection, JsonlCollection)> {
    let store = config.store.open_store()?;
    Ok((
        store.collection(&config.store.database, &config.store.staging_collection),
        store.collection(&config.store.database, &config.store.destination_collection),
    ))
}

fn http_harvester(
    config: &ResolvedConfig,
) -> miette::Result<Harvester<ImpactuHttpClient, JsonlCollection, JsonlCollection>> {
    let client = ImpactuHttpClient::new(&config.api)?;
    let (staging, destination) = collections(config)?;
    Ok(
        Harvester::new(client, staging, destination, config.api.clone())
            .with_copy_batch_size(config.store.copy_batch_size),
    )
}

fn offline_harvester(
    config: &ResolvedConfig,
) -> miette::Result<Harvester<NopProducts, JsonlCollection, JsonlCollection>> {
    let (staging, destination) = collections(config)?;
    Ok(
        Harvester::new(NopProducts, staging, destination, config.api.clone())
            .with_copy_batch_size(config.store.copy_batch_size),
    )
}

#[derive(Clone, Copy)]
struct NopProducts;

impl ProductsClient for NopProducts {
    fn fetch_page(&self, _page: u32, _max: u32) -> Result<ProductsPage, HarvestError> {
        Err(HarvestError::ApiHttp(
            "ImpactU client not configured".to_string(),
        ))
    }
}
