use std::path::PathBuf;

use clap::Parser;
use mimalloc::MiMalloc;

mod parsers;
mod solve;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Base path of the instance: `<base>.containers.txt`,
    /// `<base>.otherlocs.txt`, `<base>.vehicles.txt` and optionally
    /// `<base>.dmatrix-time.txt`.
    base: PathBuf,

    #[arg(short, long, value_parser = parsers::parse_duration, default_value = "30s")]
    timeout: jiff::SignedDuration,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Emit one `vid seq_index node_id arrival departure load` record
    /// per visit instead of the human report.
    #[arg(long)]
    machine: bool,

    /// Solution file path; defaults to `<base>.sol.txt`.
    #[arg(long, short = 'o')]
    out: Option<PathBuf>,

    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let code = match solve::run(cli).await {
        Ok(code) => code,
        Err(error) => {
            tracing::error!("{error:#}");
            1
        }
    };

    std::process::exit(code);
}
