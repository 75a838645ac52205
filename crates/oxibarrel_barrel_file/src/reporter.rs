use std::{
    env,
    io::{self, Write},
    path::{Component, MAIN_SEPARATOR, Path, PathBuf},
};

use colored::Colorize;
use log::{debug, trace};

use crate::types::{CheckResult, Diagnostic, EntrypointReport, ImportChain, Level};

/// Relativize a path to the current working directory for clickable links
fn relativize_to_cwd(path: &Path) -> String {
    if path.is_relative() {
        return path.display().to_string();
    }
    let cwd = match env::current_dir() {
        Ok(cwd) => cwd,
        Err(_) => {
            debug!("Failed to get current directory");
            return path.display().to_string();
        }
    };

    match make_relative(path, &cwd) {
        Some(rel_path) => rel_path.to_string_lossy().to_string(),
        None => {
            trace!("Could not relativize '{}', keeping absolute path", path.display());
            path.display().to_string()
        }
    }
}

/// Shortens absolute paths under the current directory inside a message.
fn relativize_message(message: &str) -> String {
    match env::current_dir() {
        Ok(cwd) => message.replace(&format!("{}{}", cwd.display(), MAIN_SEPARATOR), ""),
        Err(_) => message.to_string(),
    }
}

/// Create a relative path from `base` to `target`
fn make_relative(target: &Path, base: &Path) -> Option<PathBuf> {
    let mut target_components = target.components().peekable();
    let mut base_components = base.components().peekable();

    // Skip the shared prefix
    let mut shared = 0;
    while let (Some(t), Some(b)) = (target_components.peek(), base_components.peek()) {
        if t != b {
            break;
        }
        target_components.next();
        base_components.next();
        shared += 1;
    }

    // Different roots (e.g. another drive) cannot be expressed relatively
    if shared == 0 && target.has_root() {
        return None;
    }

    let mut result = PathBuf::new();
    for _ in base_components {
        result.push("..");
    }
    for component in target_components {
        match component {
            Component::Normal(p) => result.push(p),
            Component::ParentDir => result.push(".."),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    if result.as_os_str().is_empty() { Some(PathBuf::from(".")) } else { Some(result) }
}

/// Renders chains as an indented tree, one block per chain.
///
/// The first module of a chain is the barrel file; each importer after it is
/// indented by two more spaces.
pub fn format_chains(chains: &[ImportChain]) -> String {
    let mut blocks = Vec::with_capacity(chains.len());
    for (i, chain) in chains.iter().enumerate() {
        let mut block = String::new();
        for (depth, module) in chain.iter().enumerate() {
            let display = relativize_to_cwd(module);
            let line = if depth == 0 {
                format!("#{}: {}", i + 1, display).bold().to_string()
            } else {
                display
            };
            block.push_str(&" ".repeat(2 * depth));
            block.push_str(&line);
            block.push('\n');
        }
        blocks.push(block);
    }
    blocks.join("\n").trim_end().to_string()
}

fn level_glyph(level: Level) -> colored::ColoredString {
    match level {
        Level::Error => "✖".red().bold(),
        Level::Warning => "⚠".yellow().bold(),
        Level::Info => "ℹ".blue().bold(),
    }
}

fn print_diagnostic<W: Write>(writer: &mut W, diagnostic: &Diagnostic, info: bool) -> io::Result<()> {
    let id = match diagnostic.level {
        Level::Error => diagnostic.id.as_str().red(),
        Level::Warning => diagnostic.id.as_str().yellow(),
        Level::Info => diagnostic.id.as_str().blue(),
    };
    write!(
        writer,
        "  {} {} {}",
        level_glyph(diagnostic.level),
        id,
        relativize_message(&diagnostic.message)
    )?;
    if let Some(loc) = diagnostic.loc {
        write!(writer, " {}", format!("[{}..{}]", loc.start, loc.end).dimmed())?;
    }
    writeln!(writer)?;

    let Some(chains) = diagnostic.data.as_ref().filter(|c| !c.is_empty()) else {
        return Ok(());
    };
    if info {
        writeln!(writer)?;
        for line in format_chains(chains).lines() {
            writeln!(writer, "      {}", line)?;
        }
        writeln!(writer)?;
    } else {
        writeln!(
            writer,
            "    {} {} import {} (run with --info to show them)",
            "└──".dimmed(),
            chains.len().to_string().cyan(),
            if chains.len() == 1 { "chain" } else { "chains" }
        )?;
    }
    Ok(())
}

fn print_entrypoint<W: Write>(
    writer: &mut W,
    report: &EntrypointReport,
    info: bool,
) -> io::Result<()> {
    writeln!(
        writer,
        "{} {} ({} modules)",
        report.key.bright_white().bold(),
        relativize_to_cwd(&report.file).blue(),
        report.module_count
    )?;
    for diagnostic in &report.diagnostics {
        print_diagnostic(writer, diagnostic, info)?;
    }
    writeln!(writer)?;
    Ok(())
}

/// Prints every entrypoint that has diagnostics, followed by a summary.
pub fn print_diagnostics<W: Write>(
    writer: &mut W,
    result: &CheckResult,
    info: bool,
) -> io::Result<()> {
    debug!("Printing diagnostics for {} entrypoints", result.entrypoints.len());

    for report in result.entrypoints.iter().filter(|r| !r.diagnostics.is_empty()) {
        trace!("Printing {} diagnostics for '{}'", report.diagnostics.len(), report.key);
        print_entrypoint(writer, report, info)?;
    }

    print_summary(writer, result)?;
    writer.flush()?;
    Ok(())
}

fn print_summary<W: Write>(writer: &mut W, result: &CheckResult) -> io::Result<()> {
    let affected = result.entrypoints.iter().filter(|r| !r.diagnostics.is_empty()).count();

    writeln!(writer, "{}", "─".repeat(60).dimmed())?;
    writeln!(writer, "{}", "Summary".bold())?;
    writeln!(writer, "  Errors: {}", result.count(Level::Error).to_string().red().bold())?;
    writeln!(writer, "  Warnings: {}", result.count(Level::Warning).to_string().yellow().bold())?;
    writeln!(
        writer,
        "  Entrypoints with findings: {} of {}",
        affected.to_string().bold(),
        result.entrypoints.len()
    )?;
    Ok(())
}

pub fn print_no_barrel_files_message<W: Write>(
    writer: &mut W,
    result: &CheckResult,
) -> io::Result<()> {
    debug!("No barrel files detected");
    writeln!(
        writer,
        "{} No barrel files detected in {} entrypoints.",
        "✓".green().bold(),
        result.entrypoints.len()
    )?;
    writer.flush()?;
    Ok(())
}

pub fn print_json<W: Write>(writer: &mut W, result: &CheckResult) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, result)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
