//! Command-line interface for beanvalidator

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use beanvalidator::scenario::{Report, Scenario};
#[cfg(feature = "cli")]
use beanvalidator::validators::parse_validation_groups;
#[cfg(feature = "cli")]
use beanvalidator::Locale;

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "beanvalidator")]
#[command(author, version, about = "Bean Validation scenario runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the process-validations phase of a scenario
    Validate {
        /// Path to the JSON scenario file
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,

        /// View locale, overriding the scenario's (e.g. de_DE)
        #[arg(short, long)]
        locale: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Parse a comma-delimited validation group list
    Groups {
        /// The group list
        #[arg(value_name = "LIST")]
        list: String,

        /// Scenario declaring the known groups
        #[arg(short, long, value_name = "SCENARIO")]
        scenario: Option<PathBuf>,
    },
}

#[cfg(feature = "cli")]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate {
            scenario,
            locale,
            json,
        } => cmd_validate(scenario, locale, json),
        Commands::Groups { list, scenario } => cmd_groups(list, scenario),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

#[cfg(feature = "cli")]
fn cmd_validate(
    scenario_path: PathBuf,
    locale: Option<String>,
    json_output: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let scenario = Scenario::from_file(&scenario_path)?;
    let locale = locale.as_deref().map(Locale::parse).transpose()?;
    let report = scenario.run(locale)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(!report.failed)
}

#[cfg(feature = "cli")]
fn print_report(report: &Report) {
    if !report.failed {
        println!("✓ All inputs are valid");
        return;
    }

    println!("✗ Validation failed");
    println!();
    println!("Messages:");
    for message in &report.messages {
        let target = message.client_id.as_deref().unwrap_or("(global)");
        println!("  - {} [{}] {}", target, message.severity, message.detail);
    }
}

#[cfg(feature = "cli")]
fn cmd_groups(list: String, scenario: Option<PathBuf>) -> Result<bool, Box<dyn std::error::Error>> {
    let scenario = match scenario {
        Some(path) => Scenario::from_file(path)?,
        None => Scenario::default(),
    };
    let groups = parse_validation_groups(Some(&list), &scenario.group_registry())?;
    for marker in groups.markers() {
        println!("{}", marker);
    }
    Ok(true)
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
