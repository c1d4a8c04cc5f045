use chart_analyst::{
    commands::{run, validate},
    config::settings_from_env,
    context::{AppContext, RunOverrides},
    error::PipelineError,
};
use clap::{Args, Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "chart-analyst")]
#[command(about = "Render a TA chart, ask a vision model to read it, post both to Telegram")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    overrides: OverrideArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full chart, analysis and delivery workflow once (default)
    Run,
    /// Check configuration without making any network calls
    Validate,
}

#[derive(Args)]
struct OverrideArgs {
    /// Trading pair to chart (overrides SYMBOL)
    #[arg(long, global = true)]
    symbol: Option<String>,
    /// Chart timeframe, e.g. 1h or 4h (overrides INTERVAL)
    #[arg(long, global = true)]
    interval: Option<String>,
    /// Where to save the local chart image (overrides CHART_OUTPUT_PATH)
    #[arg(short, long = "output", value_name = "PATH", global = true)]
    output: Option<PathBuf>,
}

impl From<OverrideArgs> for RunOverrides {
    fn from(args: OverrideArgs) -> Self {
        RunOverrides {
            symbol: args.symbol,
            interval: args.interval,
            output: args.output,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let Cli { command, overrides } = Cli::parse();

    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app_context = AppContext::initialize(settings_from_env());

    let overrides = RunOverrides::from(overrides);
    let result = match command.unwrap_or(Commands::Run) {
        Commands::Run => run::run(&app_context, overrides).await.map(|_| ()),
        Commands::Validate => validate::run(&app_context, overrides).map(|_| ()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_fatal(&err);
            ExitCode::FAILURE
        }
    }
}

fn report_fatal(err: &anyhow::Error) {
    error!("{:#}", err);
    if err
        .downcast_ref::<PipelineError>()
        .is_some_and(|err| !err.missing_names().is_empty())
    {
        info!("Please check your .env file or GitHub Secrets.");
    }
}
