use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use mosdl::config::Config;
use mosdl::diagnostics::format_error;
use mosdl::error::{MosdlError, ParseError};
use mosdl::runner::{CanonicalGenerator, Generator, NotationGenerator, Runner, SchemaGenerator};
use mosdl::{DocMode, ParseOptions, logger};

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "mosdl")]
#[command(about = "MOSDL service specification compiler", long_about = None)]
struct Cli {
    /// Debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the inputs and write the selected outputs. Without any output
    /// flag all three are written.
    Compile {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[arg(short = 'o', long)]
        out: PathBuf,

        /// Write the canonical JSON form.
        #[arg(long)]
        canonical: bool,

        /// Write MOSDL notation.
        #[arg(long)]
        mosdl: bool,

        /// Write XML Schema documents.
        #[arg(long)]
        xsd: bool,

        /// Comment placement for notation output.
        #[arg(long, value_enum)]
        doc: Option<DocMode>,

        /// Emit comments as schema annotations.
        #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
        xsd_docs: Option<bool>,

        /// Emit one body type per operation stage.
        #[arg(long)]
        body_types: bool,

        /// Keep going after recoverable notation errors.
        #[arg(long)]
        recover: bool,

        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Load the inputs and report diagnostics without writing anything.
    Check {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[arg(long)]
        recover: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    match cli.cmd {
        Commands::Compile {
            inputs,
            out,
            canonical,
            mosdl,
            xsd,
            doc,
            xsd_docs,
            body_types,
            recover,
            config,
        } => {
            let mut config = match &config {
                Some(path) => Config::from_file(path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => Config::default(),
            };
            if let Some(doc) = doc {
                config.notation.doc_mode = doc;
            }
            if let Some(include) = xsd_docs {
                config.schema.include_docs = include;
            }
            config.schema.include_body_types |= body_types;
            config.notation.recover |= recover;

            let all = !(canonical || mosdl || xsd);
            let mut generators: Vec<Box<dyn Generator>> = Vec::new();
            if all || canonical {
                generators.push(Box::new(CanonicalGenerator));
            }
            if all || mosdl {
                generators.push(Box::new(NotationGenerator {
                    doc_mode: config.notation.doc_mode,
                }));
            }
            if all || xsd {
                generators.push(Box::new(SchemaGenerator {
                    options: config.schema.clone(),
                }));
            }

            let options = ParseOptions {
                recover: config.notation.recover,
            };
            let runner = Runner::with_default_loaders(options, generators);
            let outcome = match runner.execute(&inputs, &out) {
                Ok(outcome) => outcome,
                Err(err) => return Err(fail(err)),
            };
            report_all(&outcome.parsed.diagnostics);
            println!("Wrote {} file(s)", outcome.written.len());
        }
        Commands::Check { inputs, recover } => {
            let runner = Runner::with_default_loaders(ParseOptions { recover }, Vec::new());
            let parsed = match runner.load(&inputs) {
                Ok(parsed) => parsed,
                Err(err) => return Err(fail(err)),
            };
            report_all(&parsed.diagnostics);
            if !parsed.diagnostics.is_empty() {
                bail!("{} problem(s) found", parsed.diagnostics.len());
            }
            info!(areas = parsed.spec.areas().len(), "specification is valid");
            println!("OK");
        }
    }

    Ok(())
}

fn fail(err: MosdlError) -> anyhow::Error {
    if let MosdlError::Parse(parse) = &err {
        report(parse);
    }
    anyhow::Error::new(err)
}

fn report_all(diagnostics: &[ParseError]) {
    for diagnostic in diagnostics {
        report(diagnostic);
    }
}

/// Print a diagnostic with its source snippet when the file can be read.
fn report(err: &ParseError) {
    let Some(location) = err.location() else {
        eprintln!("error: {err}");
        return;
    };
    let source = location
        .file
        .as_deref()
        .and_then(|file| std::fs::read_to_string(Path::new(file)).ok());
    match (&location.file, source) {
        (Some(file), Some(source)) => {
            eprintln!("error in {file} {}\n", format_error(&source, location, err));
        }
        _ => eprintln!("error: {err}"),
    }
}
