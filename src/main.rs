//! ocr-glossary: turn a scanned error glossary PDF into a spreadsheet.

use std::fs;
use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use rust_ocr_glossary::export::{self, ExportFormat};
use rust_ocr_glossary::{Config, Error, Pipeline, PostProcessor, Progress, Record, Segmenter};

#[derive(Parser)]
#[command(name = "ocr-glossary", version, about = "Rebuild error glossary tables from scanned PDFs")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// OCR a PDF (or page images in order) and export the table
    Extract {
        /// A PDF, or page images in page order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Segment fragments from a text file, one fragment per line
    Segment {
        /// Fragment file; form feeds separate pages
        input: PathBuf,
        /// Skip the clean-up pass
        #[arg(long)]
        raw: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print the normalized form of a fragment
    Normalize { text: String },
    /// Print the built-in configuration as TOML
    DefaultConfig,
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Output format (default: from the output extension, else csv)
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl OutputArgs {
    fn format(&self) -> ExportFormat {
        match (self.format, &self.output) {
            (Some(FormatArg::Csv), _) => ExportFormat::Csv,
            (Some(FormatArg::Json), _) => ExportFormat::Json,
            (None, Some(path)) => ExportFormat::from_path(path),
            (None, None) => ExportFormat::Csv,
        }
    }

    fn write(&self, records: &[Record], config: &Config) -> anyhow::Result<()> {
        let format = self.format();
        match &self.output {
            Some(path) => export::export_to_path(records, path, format, &config.export)
                .with_context(|| format!("writing {}", path.display()))?,
            None => {
                let stdout = io::stdout().lock();
                match format {
                    ExportFormat::Csv => {
                        // No BOM on a terminal
                        let export_config = export::ExportConfig {
                            bom: false,
                            ..config.export.clone()
                        };
                        export::write_csv(records, stdout, &export_config)?
                    }
                    ExportFormat::Json => export::write_json(records, stdout)?,
                }
            }
        }
        Ok(())
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn report(progress: &Progress) -> ControlFlow<()> {
    match progress {
        Progress::Rasterized { pages } => eprintln!("Rasterized {} pages", pages),
        Progress::PageRecognized {
            page,
            completed,
            total,
            fragments,
        } => eprintln!("[{}/{}] page {}: {} fragments", completed, total, page, fragments),
        Progress::Segmented { records } => eprintln!("Found {} entries", records),
    }
    ControlFlow::Continue(())
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Fragments per page: one per non-empty line, pages split on form feed.
fn read_fragment_file(path: &Path) -> anyhow::Result<Vec<Vec<String>>> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(content
        .split('\x0c')
        .map(|page| {
            page.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        })
        .collect())
}

const NOTHING_RECOGNIZED: &str =
    "No error-name headers were recognized; check the scan quality or the keyword configuration";

fn nothing_recognized<T>(result: rust_ocr_glossary::Result<T>) -> anyhow::Result<T> {
    match result {
        Err(Error::NothingRecognized) => bail!(NOTHING_RECOGNIZED),
        other => Ok(other?),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Extract { inputs, output } => {
            let pipeline = Pipeline::from_config(&config)?;
            let records = if let [pdf] = inputs.as_slice() {
                if is_pdf(pdf) {
                    nothing_recognized(pipeline.extract_pdf(pdf, report))?
                } else {
                    nothing_recognized(pipeline.extract_images(&inputs, report))?
                }
            } else {
                if let Some(pdf) = inputs.iter().find(|p| is_pdf(p)) {
                    bail!("{} is a PDF; pass a single PDF or only page images", pdf.display());
                }
                nothing_recognized(pipeline.extract_images(&inputs, report))?
            };
            output.write(&records, &config)
        }
        Command::Segment { input, raw, output } => {
            let pages = read_fragment_file(&input)?;
            let segmenter = Segmenter::from_config(&config);
            let mut records = segmenter.segment(pages.iter().flatten());
            if !raw {
                let post = PostProcessor::new(&config.post_process, segmenter.normalizer().clone())?;
                records = post.apply(records);
            }
            if records.is_empty() {
                bail!(NOTHING_RECOGNIZED);
            }
            eprintln!("Found {} entries", records.len());
            output.write(&records, &config)
        }
        Command::Normalize { text } => {
            let (normalized, subs) = Segmenter::from_config(&config)
                .normalizer()
                .normalize_counted(&text);
            println!("{}", normalized);
            log::info!("{} substitutions", subs);
            Ok(())
        }
        Command::DefaultConfig => {
            print!("{}", Config::default().to_toml_string()?);
            Ok(())
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli)
}
