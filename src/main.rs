mod browser;
mod config;
mod evidence;
mod models;
mod pipeline;
mod portal;
mod utils;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::AppConfig;
use crate::pipeline::Pipeline;
use crate::portal::segments::{
    Segment, endpoint_path_for, field_names, id_param_for, sort_column_for,
};

#[derive(Parser)]
#[command(
    name = "portal-rpa",
    about = "Social-benefit payments from the Portal da Transparência",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write logs to this file (e.g. rpa.log)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Search beneficiaries and collect their benefit installments
    Run {
        /// Name, CPF or NIS to search for
        #[arg(short, long)]
        query: Option<String>,

        /// Output JSON file (default from config: beneficiarios.json)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Show the browser window instead of running headless
        #[arg(long)]
        visible: bool,
    },

    /// Print the benefit segment registry
    Segments,
}

fn init_logging(verbose: u8, log_file: Option<&PathBuf>) -> Result<()> {
    let filter = match verbose {
        0 => "portal_rpa=info,warn",
        1 => "portal_rpa=debug,info",
        _ => "trace",
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Could not create log file {:?}", path))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(file_layer)
        .with(EnvFilter::new(filter))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_file.as_ref())?;

    let mut config = AppConfig::load()?;

    match cli.command {
        Command::Run { query, out, visible } => {
            let _t = utils::Timer::start("Beneficiary scrape");
            config.browser.visible |= visible;
            let out = out.unwrap_or_else(|| config.output.file.clone());

            Pipeline::new(config).run(query.as_deref(), &out).await?;
            println!("Saved to {}", out.display());
        }

        Command::Segments => {
            println!("─────────────────────────────────────────────────────────────");
            println!("  Benefit segments");
            println!("─────────────────────────────────────────────────────────────");
            for segment in Segment::KNOWN {
                println!("  {}", segment);
                println!("    endpoint : /beneficios/{}/{}", segment, endpoint_path_for(&segment));
                println!("    id param : {}", id_param_for(&segment));
                println!("    sort     : {} desc", sort_column_for(&segment));
                println!("    fields   : {}", field_names(&segment).join(", "));
            }
            println!("─────────────────────────────────────────────────────────────");
        }
    }

    Ok(())
}
