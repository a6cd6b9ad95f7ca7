mod commands;
mod output;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "tally",
    version,
    about = "ESG calculation engine: aggregate meter answers and render reports"
)]
struct Cli {
    /// Dataset JSON file (materials, forms, meters, calculations, ...)
    #[arg(short, long, global = true, value_name = "FILE", default_value = "dataset.json")]
    data: PathBuf,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG is used otherwise.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a named report for one company and financial year
    Report {
        /// Report name
        name: String,

        #[arg(short, long)]
        company: String,

        /// Financial year, e.g. 2023-12-31
        #[arg(short, long)]
        year: String,

        /// Translate names and units with this locale's custom fields
        #[arg(short, long)]
        locale: Option<String>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Evaluate one calculation
    Calculate {
        /// Calculation unique id
        calculation: String,

        #[arg(short, long)]
        company: String,

        #[arg(short, long)]
        year: String,

        /// Print every resolution step
        #[arg(long)]
        trace: bool,

        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Sum every numeric cell of a matrix material across meters
    Grid {
        /// Material unique id
        material: String,

        #[arg(short, long)]
        company: String,

        #[arg(short, long)]
        year: String,

        /// Only aggregate this form
        #[arg(short, long)]
        form: Option<String>,

        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// List the pointers available to formula authors
    Pointers {
        /// Only list pointers for this material unique id
        #[arg(short, long)]
        material: Option<String>,

        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Convert a value between two units using the dataset's unit edges
    Convert {
        value: String,
        from: String,
        to: String,
    },
    /// Load and validate the dataset, optionally checking a calculation draft
    Validate {
        /// Calculation draft JSON to validate
        #[arg(long, value_name = "FILE")]
        calculation: Option<PathBuf>,

        /// Store the draft as a new calculation or a new version, and write the dataset back
        #[arg(long, requires = "calculation")]
        save: bool,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let data = cli.data;
    let result = match cli.command {
        Commands::Report {
            name,
            company,
            year,
            locale,
            output,
        } => commands::report::run(&data, &name, &company, &year, locale.as_deref(), &output),
        Commands::Calculate {
            calculation,
            company,
            year,
            trace,
            output,
        } => commands::calculate::run(&data, &calculation, &company, &year, trace, &output),
        Commands::Grid {
            material,
            company,
            year,
            form,
            output,
        } => commands::grid::run(&data, &material, &company, &year, form.as_deref(), &output),
        Commands::Pointers { material, output } => {
            commands::pointers::run(&data, material.as_deref(), &output)
        }
        Commands::Convert { value, from, to } => commands::convert::run(&data, &value, &from, &to),
        Commands::Validate { calculation, save } => {
            commands::validate::run(&data, calculation.as_deref(), save)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
