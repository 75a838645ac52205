use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{debug, info};
use oxibarrel_barrel_file::Config;
use oxibarrel_core::PackageError;
use std::io::{BufWriter, Write};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "oxibarrel")]
#[command(about = "Find barrel files that hurt tree-shaking in JavaScript/TypeScript packages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check a package's entrypoints for barrel files
    BarrelFiles(Config),
}

fn main() -> Result<()> {
    env_logger::init();

    // stdio is blocked by LineWriter, use a BufWriter to reduce syscalls.
    // See https://github.com/rust-lang/rust/issues/60673
    let mut stdout = BufWriter::new(std::io::stdout());

    let cli = Cli::parse();
    debug!("Parsed CLI arguments: {:?}", cli.command);

    let start = Instant::now();

    match cli.command {
        Commands::BarrelFiles(mut cfg) => {
            let num_threads = rayon::current_num_threads();
            info!("Running barrel file check (using {} threads)", num_threads);
            debug!("Config: {:?}", cfg);

            let result = match oxibarrel_barrel_file::run_barrel_check(&mut cfg) {
                Ok(result) => result,
                Err(e) => match e.downcast_ref::<PackageError>() {
                    Some(PackageError::MissingExportsField { .. }) => {
                        eprintln!("{} {}", "✖".red().bold(), e);
                        eprintln!("  Nothing to analyze: declare the package's public entrypoints first.");
                        std::process::exit(1);
                    }
                    _ => return Err(e),
                },
            };
            debug!(
                "Analyzed {} entrypoints, {} errors",
                result.entrypoints.len(),
                result.count(oxibarrel_barrel_file::Level::Error)
            );

            if cfg.json {
                oxibarrel_barrel_file::print_json(&mut stdout, &result)?;
            } else {
                let has_findings = result.entrypoints.iter().any(|e| !e.diagnostics.is_empty());
                if has_findings {
                    oxibarrel_barrel_file::print_diagnostics(&mut stdout, &result, cfg.info)?;
                } else {
                    oxibarrel_barrel_file::print_no_barrel_files_message(&mut stdout, &result)?;
                }

                let elapsed_ms = start.elapsed().as_millis();
                writeln!(
                    stdout,
                    "\n{} Finished in {}ms on {} files (using {} threads).",
                    "●".bright_blue(),
                    elapsed_ms.to_string().cyan(),
                    result.files_analyzed.to_string().cyan(),
                    num_threads.to_string().cyan()
                )?;
            }
            stdout.flush()?;

            if result.has_errors() {
                // Non-zero exit to fail CI
                std::process::exit(1);
            }

            Ok(())
        }
    }
}
