use std::path::PathBuf;

use clap::Parser;
use quizd::Settings;

#[derive(Parser)]
#[command(name = "quizd")]
#[command(about = "Serve quiz content from JSON files with hot reload")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "quizd.toml")]
    config: PathBuf,

    /// Address to listen on (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Directory holding the JSON content files (overrides config)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Debounce interval for file changes in milliseconds (overrides config)
    #[arg(long)]
    debounce_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_from(&cli.config).map_err(|e| anyhow::anyhow!(e))?;
    if let Some(bind) = cli.bind {
        settings.server.bind = bind;
    }
    if let Some(data_dir) = cli.data_dir {
        settings.data_dir = data_dir;
    }
    if let Some(debounce_ms) = cli.debounce_ms {
        settings.file_watch.debounce_ms = debounce_ms;
    }

    quizd::server::serve(settings).await
}
