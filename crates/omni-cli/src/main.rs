mod analyze;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use omni_config::OmniConfig;
use omni_types::{MediaKind, Mode};

use crate::analyze::{MediaInput, Session, SessionOverrides};

#[derive(Parser)]
#[command(name = "omni", about = "Multimodal image and video analyst")]
struct Cli {
    /// Gemini API key (overrides GEMINI_API_KEY and the config file)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Config file path (default: ~/.omni-analyst/config.json5)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an image (jpg, png, jpeg)
    Image {
        /// Image file
        path: PathBuf,

        /// Specific question about the image
        #[arg(short, long)]
        question: Option<String>,

        /// Reasoning mode: fast or deep
        #[arg(short, long)]
        mode: Option<Mode>,

        /// Skip the spoken report
        #[arg(long)]
        no_audio: bool,

        /// Directory for report.mp3 (overrides config)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Analyze a short video (mp4, mov)
    Video {
        /// Video file
        path: PathBuf,

        /// Skip the spoken report
        #[arg(long)]
        no_audio: bool,

        /// Directory for report.mp3 (overrides config)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Give up if the upload is still processing after this many seconds
        #[arg(long)]
        poll_timeout: Option<u64>,
    },
    /// Show the effective configuration
    Health,
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // Loading the config also loads `.env`, so read the environment after it.
    let config = omni_config::load_config(cli.config.as_deref())?;
    let env_key = std::env::var(omni_config::API_KEY_ENV).ok();
    execute(cli, config, env_key.as_deref())
}

fn execute(cli: Cli, config: OmniConfig, env_key: Option<&str>) -> anyhow::Result<()> {
    let (input, overrides) = match cli.command {
        Commands::Health => {
            println!("omni is healthy");
            println!("  default mode: {}", config.mode);
            println!("  audio report: {}", config.audio_enabled);
            println!("  image model: {}", config.models.image);
            println!("  video model: {}", config.models.video);
            println!(
                "  poll: every {}s, at most {} queries / {}s",
                config.poll.interval_secs, config.poll.max_attempts, config.poll.timeout_secs
            );
            let key = omni_config::resolve_api_key_from(cli.api_key.as_deref(), env_key, &config);
            println!(
                "  api key: {}",
                if key.is_ok() { "configured" } else { "missing" }
            );
            return Ok(());
        }
        Commands::Image {
            path,
            question,
            mode,
            no_audio,
            output_dir,
        } => (
            MediaInput {
                kind: MediaKind::Image,
                path,
                question,
            },
            SessionOverrides {
                mode,
                no_audio,
                output_dir,
                poll_timeout: None,
            },
        ),
        Commands::Video {
            path,
            no_audio,
            output_dir,
            poll_timeout,
        } => (
            MediaInput {
                kind: MediaKind::Video,
                path,
                question: None,
            },
            SessionOverrides {
                mode: None,
                no_audio,
                output_dir,
                poll_timeout,
            },
        ),
    };

    // No credential, no session: nothing below is reachable without a key.
    let api_key = omni_config::resolve_api_key_from(cli.api_key.as_deref(), env_key, &config)?;
    let session = Session::new(api_key, config, overrides);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(analyze::run_analysis(session, input))
}
