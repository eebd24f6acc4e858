use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use xcstrings_llm::logging::{self, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "xcstrings-llm",
    version,
    about = "Translate Xcode string catalogs with an LLM"
)]
struct Cli {
    /// String catalog to translate (.xcstrings)
    input: PathBuf,

    /// OpenAI API key (overrides OPENAI_API_KEY)
    #[arg(long = "api-key")]
    api_key: Option<String>,

    /// Source locale
    #[arg(short = 's', long = "source")]
    source: String,

    /// Target locale
    #[arg(short = 't', long = "target")]
    target: String,

    /// Chat model (default: gpt-4-turbo, or [translator] model in settings)
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// Character budget per request (default: 1000)
    #[arg(short = 'b', long = "batch-size")]
    batch_size: Option<usize>,

    /// Attempts per batch before giving up (default: 3)
    #[arg(short = 'r', long = "retry")]
    retry: Option<usize>,

    /// Log level
    #[arg(short = 'l', long = "log", value_enum, default_value_t = LogLevel::Info)]
    log: LogLevel,

    /// Write the result over the input file
    #[arg(long = "override")]
    override_input: bool,

    /// Output file (default: <input>.translated.xcstrings)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Read extra settings from a TOML file
    #[arg(long = "settings")]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    if let Err(err) = logging::init(cli.log) {
        eprintln!("failed to initialize logging: {:#}", err);
        return ExitCode::FAILURE;
    }

    let config = xcstrings_llm::Config {
        input: cli.input,
        api_key: cli.api_key,
        source_locale: cli.source,
        target_locale: cli.target,
        model: cli.model,
        batch_size: cli.batch_size,
        retry_limit: cli.retry,
        override_input: cli.override_input,
        output: cli.output,
        settings_path: cli.settings,
    };

    match xcstrings_llm::run(config).await {
        Ok(summary) => {
            info!(
                "wrote {} translations to {} (model {})",
                summary.translated,
                summary.output.display(),
                summary.model
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{:?}", err);
            ExitCode::FAILURE
        }
    }
}
