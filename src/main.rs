use anyhow::{Context, Result, bail};
use camel_schema::{Resolver, config::Config, validate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Schema file or directory, overriding the config file
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Prints a type's definition merged with everything it inherits
    Resolve {
        /// The type to resolve
        name: String,

        /// Print the definition on a single line
        #[arg(long)]
        compact: bool,
    },
    /// Lists all types in the schema
    List,
    /// Checks that every type in the schema resolves
    Check,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("could not load config: {:?}", path))?,
        None => Config::default(),
    };
    if let Some(schema) = args.schema {
        config.schema = Some(schema);
    }

    let resolver = Resolver::from_config(&config).with_context(|| match &config.schema {
        Some(path) => format!("could not load schema: {:?}", path),
        None => "could not load the packaged camel model".to_string(),
    })?;

    match &args.command {
        Commands::Resolve { name, compact } => {
            let definition = resolver
                .lookup_definition(name)
                .with_context(|| format!("could not resolve {}", name))?;
            let Some(definition) = definition else {
                bail!("no definition found for {}", name);
            };
            let json = if *compact {
                serde_json::to_string(&definition)
            } else {
                serde_json::to_string_pretty(&definition)
            }
            .with_context(|| format!("could not serialize {}", name))?;
            println!("{}", json);
        }
        Commands::List => {
            for (name, definition) in resolver.schema().iter() {
                println!(
                    "{}\t{}\t{}\t{}",
                    name,
                    definition.typ,
                    definition.title().unwrap_or("-"),
                    definition.group().unwrap_or("-"),
                );
            }
        }
        Commands::Check => {
            let report = validate::check_with_depth(resolver.schema(), resolver.max_depth());
            for issue in &report.issues {
                eprintln!("{}", issue);
            }
            if !report.is_ok() {
                bail!("{} issue(s) found in schema", report.issues.len());
            }
            println!("{} types resolve cleanly", report.order.len());
        }
    }

    Ok(())
}
