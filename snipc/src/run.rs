use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;
use snip_archive::LoadedAssembly;
use snip_core::Value;
use snip_scripting::{
    Artifact, BindingResolver, CompileOptions, ScriptingConfig, ScriptingService, ValueStore,
};
use tracing::{debug, info};

#[derive(Args)]
pub struct RunArgs {
    /// File containing the fragment.
    #[clap(required_unless_present = "expression", conflicts_with = "expression")]
    file: Option<PathBuf>,

    /// Fragment given on the command line.
    #[clap(short = 'e', long)]
    expression: Option<String>,

    /// Library archives the fragment may use.
    #[clap(short, long = "reference")]
    references: Vec<PathBuf>,

    /// Directory searched for references that are not found at their given path.
    #[clap(long)]
    search_root: Option<PathBuf>,

    /// Value for a name the fragment uses without declaring it, as `NAME=VALUE`.
    #[clap(short, long = "bind", value_parser = parse_binding)]
    bindings: Vec<(String, Value)>,

    /// Write the compiled fragment to the scratch directory instead of keeping it in memory.
    #[clap(long)]
    disk: bool,

    /// Directory compiled fragments are written to with `--disk`.
    #[clap(long)]
    scratch: Option<PathBuf>,
}

fn parse_binding(arg: &str) -> Result<(String, Value), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{arg}`"))?;
    if name.is_empty() {
        return Err(format!("binding `{arg}` has no name"));
    }
    let value = value.parse::<Value>().map_err(|error| error.to_string())?;
    Ok((name.to_owned(), value))
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let fragment = match (&args.expression, &args.file) {
        (Some(expression), _) => expression.clone(),
        (None, Some(file)) => std::fs::read_to_string(file)
            .with_context(|| format!("cannot read {}", file.display()))?,
        (None, None) => bail!("either a file or an expression must be given"),
    };

    let mut config = ScriptingConfig::default();
    if let Some(search_root) = args.search_root {
        config = config.with_search_root(search_root);
    }
    if let Some(scratch) = args.scratch {
        config = config.with_scratch_dir(scratch);
    }
    let service = ScriptingService::new(config);
    for reference in &args.references {
        if !service.references().add_path(reference) {
            bail!("cannot add reference {}", reference.display());
        }
    }

    let values = ValueStore::new();
    for (name, value) in args.bindings {
        debug!(%name, %value, "Binding");
        values.add(name, value);
    }

    let options = if args.disk {
        CompileOptions::disk()
    } else {
        CompileOptions::in_memory()
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;
    let result = runtime.block_on(service.compile(
        &fragment,
        &options,
        Some(&values as &dyn BindingResolver),
    ))?;

    if !result.success() {
        eprint!("{}", result.diagnostic_text);
        bail!("fragment has errors");
    }
    info!(passes = result.compile_passes, "Compiled");

    let assembly = match &result.artifact {
        Some(Artifact::InMemory(assembly)) => assembly.clone(),
        Some(Artifact::OnDisk(path)) => {
            info!(path = %path.display(), "Written");
            LoadedAssembly::load_file(path, &service.references().snapshot())
                .with_context(|| format!("cannot load {}", path.display()))?
        }
        None => bail!("compilation produced no artifact"),
    };

    let value = assembly
        .invoke_entry(&values)
        .context("fragment failed at run time")?;
    println!("{value}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_split_at_the_first_equals_sign() {
        assert_eq!(
            parse_binding("x=41").unwrap(),
            ("x".to_owned(), Value::Int(41))
        );
        assert_eq!(
            parse_binding("eq=a=b").unwrap(),
            ("eq".to_owned(), Value::from("a=b"))
        );
        assert!(parse_binding("x").is_err());
        assert!(parse_binding("=1").is_err());
    }
}
