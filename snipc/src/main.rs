mod dump;
mod run;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use snip_scripting::{ScriptingConfig, ScriptingService};
use tracing::{error, info_span, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

use crate::{dump::Dump, run::RunArgs};

#[derive(Subcommand)]
enum Command {
    /// Compile a fragment and run it.
    ///
    /// Names the fragment uses without declaring them are bound from `--bind` arguments.
    Run(RunArgs),

    /// Compile a complete unit into a library archive that fragments can reference.
    Library {
        /// Source file containing the unit.
        file: PathBuf,

        /// Where to write the archive.
        #[clap(short, long)]
        output: PathBuf,

        /// Library archives the unit depends on, in dependency order.
        #[clap(short, long = "reference")]
        references: Vec<PathBuf>,

        /// Directory searched for references that are not found at their given path.
        #[clap(long)]
        search_root: Option<PathBuf>,
    },

    /// Read data from an archive.
    Dump {
        /// Archive to read from.
        archive: PathBuf,

        /// Which part to dump into stdout.
        #[clap(subcommand)]
        what: Dump,
    },
}

#[derive(Parser)]
struct Args {
    /// Tool to run.
    #[clap(subcommand)]
    command: Command,

    /// Write a Chrome trace of the run to this file.
    #[clap(long)]
    trace: Option<PathBuf>,
}

fn library(
    file: PathBuf,
    output: PathBuf,
    references: Vec<PathBuf>,
    search_root: Option<PathBuf>,
) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(&file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let name = file
        .file_stem()
        .and_then(|stem| stem.to_str())
        .context("library file name must be valid UTF-8")?;

    let mut config = ScriptingConfig::default();
    if let Some(search_root) = search_root {
        config = config.with_search_root(search_root);
    }
    let service = ScriptingService::new(config);
    for reference in &references {
        if !service.references().add_path(reference) {
            anyhow::bail!("cannot add reference {}", reference.display());
        }
    }

    let result = {
        let _span = info_span!("library", %name).entered();
        service.compile_library(name, &source, &output)?
    };
    if !result.success() {
        eprint!("{}", result.diagnostic_text);
        anyhow::bail!("library {name} has errors");
    }
    println!("{}", output.display());

    Ok(())
}

fn fallible_main(args: Args) -> anyhow::Result<()> {
    match args.command {
        Command::Run(run_args) => run::run(run_args)?,
        Command::Library {
            file,
            output,
            references,
            search_root,
        } => library(file, output, references, search_root)?,
        Command::Dump { archive, what } => dump::dump(&archive, what)?,
    }

    Ok(())
}

fn main() {
    let args = Args::parse();

    let (chrome_layer, guard) = match &args.trace {
        Some(path) => {
            let (layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
                .file(path)
                .include_args(true)
                .build();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .without_time()
                .with_writer(std::io::stderr)
                .with_filter(
                    EnvFilter::builder()
                        .with_default_directive(LevelFilter::INFO.into())
                        .from_env_lossy(),
                ),
        )
        .with(chrome_layer);
    tracing::subscriber::set_global_default(subscriber)
        .expect("cannot set default tracing subscriber");

    let result = fallible_main(args);
    if let Err(error) = &result {
        error!("{error:?}");
    }

    // Flushes the trace file.
    drop(guard);
    if result.is_err() {
        std::process::exit(1);
    }
}
