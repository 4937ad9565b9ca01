use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use exam_grader::config::Config;
use exam_grader::models::ExtractionKind;
use exam_grader::utils::logging;
use exam_grader::App;

#[derive(Parser)]
#[command(
    name = "exam-grader",
    version,
    about = "Extract exam questions/answers from scanned PDFs and split class scans per student"
)]
struct Cli {
    /// TOML config file (environment variables override it)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Questions,
    Answers,
}

impl From<KindArg> for ExtractionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Questions => ExtractionKind::Questions,
            KindArg::Answers => ExtractionKind::Answers,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract labeled sections from a PDF, annotated text, or saved JSON
    Extract {
        /// Input file (.pdf, .json, or annotated text)
        input: PathBuf,

        /// What the document contains
        #[arg(short, long, value_enum, default_value = "answers")]
        kind: KindArg,

        /// Question file used to build the known-label registry
        #[arg(short, long, value_name = "FILE")]
        registry: Option<PathBuf>,
    },
    /// Split a class scan into one PDF per student
    Partition {
        /// Scanned PDF containing every student's answers
        input: PathBuf,

        /// Output directory (defaults to the configured one)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let mut config = match &cli.config {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::from_env(),
    };
    config.verbose_logging |= cli.verbose;

    // 初始化日志
    logging::init(config.verbose_logging);

    let app = App::initialize(config)?;

    match cli.command {
        Commands::Extract {
            input,
            kind,
            registry,
        } => {
            app.extract(&input, kind.into(), registry.as_deref()).await?;
        }
        Commands::Partition { input, output_dir } => {
            let documents = app.partition(&input, output_dir.as_deref()).await?;
            for doc in documents {
                println!("{}", doc.path.display());
            }
        }
    }

    Ok(())
}
