//! Data Model Inspector
//!
//! Small command line tool for poking at the bundled catalog and at tree
//! documents during development.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin dm-inspect -- classes
//! cargo run --bin dm-inspect -- tags
//! cargo run --bin dm-inspect -- class Exposure
//! cargo run --bin dm-inspect -- new ImageModel /tmp/image.json
//! cargo run --bin dm-inspect -- open /tmp/image.json
//! cargo run --bin dm-inspect -- dump /tmp/image.json
//! ```
//!
//! Default shapes follow `DATAMODELS_DEFAULT_SHAPE` and
//! `DATAMODELS_USE_TESTING_SHAPE` (or `--testing-shape`). Log output is
//! controlled by `RUST_LOG`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use datamodels_core::{DataModel, DataModels, NodeKind, RuntimeConfig, TreeDocument, Value};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Synthesise default arrays with the small testing shape
    #[arg(long)]
    testing_shape: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists every registered class with its kind and tag.
    Classes,

    /// Lists registered tags with their class and data model.
    Tags,

    /// Shows the fields of one class.
    Class {
        #[clap(value_name = "NAME")]
        name: String,
    },

    /// Creates an empty model and saves it with its required fields.
    New {
        #[clap(value_name = "MODEL")]
        model: String,

        #[clap(value_name = "PATH")]
        path: PathBuf,
    },

    /// Opens a document and summarises its root node.
    Open {
        #[clap(value_name = "PATH")]
        path: PathBuf,
    },

    /// Decodes a document and prints it re-encoded.
    Dump {
        #[clap(value_name = "PATH")]
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dm_inspect=info,datamodels_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = RuntimeConfig::from_env().map_err(anyhow::Error::msg)?;
    if cli.testing_shape {
        config.use_testing_shape = true;
    }
    debug!("Runtime configuration: {:?}", config);
    let ctx = DataModels::bundled_with(config).context("Failed to load the bundled catalog")?;

    match cli.command {
        Commands::Classes => list_classes(&ctx),
        Commands::Tags => list_tags(&ctx),
        Commands::Class { name } => describe_class(&ctx, &name)?,
        Commands::New { model, path } => {
            let mut model = DataModel::new(&ctx, &model)?;
            model
                .save(&ctx, &path)
                .with_context(|| format!("Failed to save {}", path.display()))?;
            println!("Wrote {} to {}", model.model_type(), path.display());
        }
        Commands::Open { path } => {
            let model = DataModel::open(&ctx, &path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            summarize(&model);
        }
        Commands::Dump { path } => {
            // decode and re-encode so the output shows what the registry made of it
            let document = TreeDocument::open(&path, ctx.registry())?;
            println!("{}", serde_json::to_string_pretty(&document.to_json()?)?);
        }
    }
    Ok(())
}

fn list_classes(ctx: &DataModels) {
    let mut classes: Vec<_> = ctx.registry().classes().collect();
    classes.sort_by(|a, b| a.name().cmp(b.name()));

    for class in classes {
        let origin = match class.tag() {
            Some(tag) => tag.to_string(),
            None => {
                let owners: Vec<String> = class
                    .owners()
                    .iter()
                    .map(|(owner, field)| format!("{}.{}", owner, field))
                    .collect();
                format!("implied by {}", owners.join(", "))
            }
        };
        println!("{:<18} {:<7} {}", class.name(), kind_label(class.kind()), origin);
    }
}

fn list_tags(ctx: &DataModels) {
    for (tag, class) in ctx.registry().tags() {
        let model = ctx.registry().wrapper_for(class).unwrap_or("-");
        println!("{:<50} {:<16} {}", tag, class, model);
    }
}

fn describe_class(ctx: &DataModels, name: &str) -> anyhow::Result<()> {
    let class = ctx.registry().class(name)?;

    println!("{} ({})", class.name(), kind_label(class.kind()));
    if let Some(title) = class.title() {
        println!("  {}", title);
    }
    if let Some(uri) = class.schema_uri() {
        println!("  schema: {}", uri);
    }
    if let Some(model) = ctx.registry().wrapper_for(class.name()) {
        println!("  model:  {}", model);
    }

    if let Some(binding) = class.binding() {
        for field in binding.fields() {
            let marker = if binding.is_required(field.name()) { "*" } else { " " };
            println!("  {} {:<24} {}", marker, field.name(), field.kind().label());
        }
    }
    let literals = class.enum_literals();
    if !literals.is_empty() {
        let literals: Vec<String> = literals.iter().map(Value::to_string).collect();
        println!("  literals: {}", literals.join(", "));
    }
    Ok(())
}

fn summarize(model: &DataModel) {
    let node = model.node();
    println!(
        "{} ({})",
        model.model_type(),
        node.class_name().unwrap_or("untyped")
    );
    for key in node.keys() {
        let description = match node.get(key) {
            Some(Value::Array(array)) => format!("ndarray {:?} {}", array.shape(), array.dtype()),
            Some(Value::Object(child)) => format!(
                "{} with {} fields",
                child.class_name().unwrap_or("object"),
                child.len()
            ),
            Some(other) => other.type_name().to_string(),
            None => continue,
        };
        println!("  {:<24} {}", key, description);
    }
}

fn kind_label(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Object => "object",
        NodeKind::List => "list",
        NodeKind::Enum => "enum",
        NodeKind::Scalar => "scalar",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["dm-inspect", "--testing-shape", "new", "ImageModel", "image.json"]).unwrap();
        assert!(cli.testing_shape);
        match cli.command {
            Commands::New { model, path } => {
                assert_eq!(model, "ImageModel");
                assert_eq!(path, PathBuf::from("image.json"));
            }
            _ => panic!("expected the new subcommand"),
        }

        assert!(matches!(
            Cli::try_parse_from(["dm-inspect", "class", "Exposure"]).unwrap().command,
            Commands::Class { ref name } if name == "Exposure"
        ));
        assert!(Cli::try_parse_from(["dm-inspect", "open"]).is_err());
        assert!(Cli::try_parse_from(["dm-inspect", "frobnicate"]).is_err());
    }
}
