use clap::{Parser as ClapParser, Subcommand};
use spl_toolkit::cli::{self, CliError, DiscoverOptions, MapOptions, ValidateResult};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(ClapParser)]
#[command(name = "spl-toolkit")]
#[command(about = "Parse, field-map and inspect SPL search queries")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite field names in a query
    Map {
        /// The query (reads from stdin if not provided)
        query: Option<String>,

        /// JSON array of {source, target} mappings
        #[arg(short, long)]
        mappings: Option<PathBuf>,

        /// Conditional mapping config
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Context entry as key=value; repeatable. Detected from the query when absent
        #[arg(long = "context")]
        context: Vec<String>,
    },

    /// List data sources, lookups, macros and input fields of a query
    Discover {
        /// The query (reads from stdin if not provided)
        query: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Check query syntax
    Validate {
        /// The query (reads from stdin if not provided)
        query: Option<String>,
    },

    /// Print the parse tree as JSON
    Parse {
        /// The query (reads from stdin if not provided)
        query: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Validate a mapping config file
    CheckConfig {
        /// Path to the config JSON
        file: PathBuf,
    },
}

fn main() {
    // stdout carries results; logs go to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Map {
            query,
            mappings,
            config,
            context,
        } => read_query(query).and_then(|query| {
            let options = MapOptions {
                query,
                mappings,
                config,
                context,
            };
            println!("{}", cli::execute_map(&options)?);
            Ok(())
        }),
        Commands::Discover { query, pretty } => read_query(query).and_then(|query| {
            println!("{}", cli::execute_discover(&DiscoverOptions { query, pretty })?);
            Ok(())
        }),
        Commands::Validate { query } => read_query(query).and_then(|query| run_validate(&query)),
        Commands::Parse { query, pretty } => read_query(query).and_then(|query| {
            println!("{}", cli::execute_parse(&DiscoverOptions { query, pretty })?);
            Ok(())
        }),
        Commands::CheckConfig { file } => run_check_config(&file),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

/// The query argument, or stdin when it is piped.
fn read_query(query: Option<String>) -> Result<String, CliError> {
    match query {
        Some(q) => Ok(q),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).map_err(CliError::Io)?;
            let trimmed = buffer.trim_end_matches(['\n', '\r']);
            if trimmed.trim().is_empty() {
                return Err(CliError::NoInput);
            }
            Ok(trimmed.to_string())
        }
        None => Err(CliError::NoInput),
    }
}

fn run_validate(query: &str) -> Result<(), CliError> {
    match cli::execute_validate(query)? {
        ValidateResult::Valid => println!("valid"),
        ValidateResult::Invalid(errors) => {
            for error in &errors {
                println!("{}", error);
            }
            std::process::exit(1);
        }
    }
    Ok(())
}

fn run_check_config(path: &std::path::Path) -> Result<(), CliError> {
    let result = cli::execute_check_config(path)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.valid {
        std::process::exit(1);
    }
    Ok(())
}
