//! tsbridge CLI - inspect what the loader would see
//!
//! Usage: tsbridge <COMMAND>
//!
//! Commands:
//!   config   Locate and expand the compiler configuration
//!   options  Validate a loader options file

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tsbridge::config::{
    find_config_file, load_config_file, JsonConfigParser, LoadSettings, LoaderOptions,
};
use tsbridge::domain::ports::build_events::{emit, BuildEvent, BuildEventSink};
use tsbridge::domain::value_objects::paths::resolve;
use tsbridge::infrastructure::{ConsoleEventSink, JsonEventSink};
use tsbridge::LocalFileHost;

/// tsbridge - compile-on-demand bridge between a bundler and a compiler
#[derive(Parser, Debug)]
#[command(name = "tsbridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output NDJSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Locate and expand the compiler configuration
    Config {
        /// Config file name, path, or directory to search from
        #[arg(short, long)]
        project: Option<String>,

        /// Directory the search starts in
        #[arg(long)]
        from: Option<PathBuf>,
    },

    /// Validate a loader options file (TOML)
    Options {
        /// Path to the options file
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let sink: Arc<dyn BuildEventSink> = if cli.json {
        Arc::new(JsonEventSink::stdout().with_verbose(cli.verbose > 0))
    } else {
        Arc::new(ConsoleEventSink::stderr().with_verbose(cli.verbose > 0))
    };

    match cli.command {
        Commands::Config { project, from } => cmd_config(project.as_deref(), from, cli.json, sink),
        Commands::Options { file } => cmd_options(&file, cli.json, sink),
    }
}

fn cmd_config(
    project: Option<&str>,
    from: Option<PathBuf>,
    json: bool,
    sink: Arc<dyn BuildEventSink>,
) -> Result<()> {
    let cwd = std::env::current_dir().context("cannot read the current directory")?;
    let from = match from {
        Some(dir) => resolve(&cwd, &dir),
        None => cwd,
    };

    let host = LocalFileHost::new();
    let config_file = find_config_file(&host, &from, project)?;
    emit(
        sink.as_ref(),
        BuildEvent::ConfigResolved {
            config_file: config_file.clone(),
        },
    );

    let settings = LoadSettings {
        base_path: from.clone(),
        ..Default::default()
    };
    let build = load_config_file(&host, &JsonConfigParser::new(), config_file.as_deref(), &settings)?;

    let module = build
        .options
        .module
        .as_ref()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "default".to_string());
    let root_dir = build
        .options
        .root_dir
        .clone()
        .unwrap_or_else(|| build.config_directory.clone());

    if json {
        let output = serde_json::json!({
            "event": "config",
            "config_file": build.config_file,
            "root_dir": root_dir,
            "out_dir": build.out_dir(),
            "module": module,
            "root_files": build.root_files,
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    match &build.config_file {
        Some(path) => println!("Config:    {}", path.display()),
        None => println!("Config:    (default configuration)"),
    }
    println!("Root dir:  {}", root_dir.display());
    println!("Output:    {}", build.out_dir().display());
    println!("Module:    {}", module);
    println!("Files ({}):", build.root_files.len());
    for file in &build.root_files {
        println!("  {}", display_relative(&build.config_directory, file));
    }
    Ok(())
}

fn display_relative(base: &Path, file: &Path) -> String {
    file.strip_prefix(base)
        .unwrap_or(file)
        .display()
        .to_string()
}

fn cmd_options(file: &Path, json: bool, sink: Arc<dyn BuildEventSink>) -> Result<()> {
    let (options, warnings) = LoaderOptions::load_with_warnings(file)
        .with_context(|| format!("failed to load {}", file.display()))?;
    options.validate()?;

    for warning in &warnings {
        let mut message = format!("unknown option '{}'", warning.key);
        if let Some(line) = warning.line {
            message.push_str(&format!(" at line {}", line));
        }
        if let Some(suggestion) = &warning.suggestion {
            message.push_str(&format!(" (did you mean '{}'?)", suggestion));
        }
        emit(sink.as_ref(), BuildEvent::info(message));
    }

    let strategy = serde_json::to_value(options.resolver_strategy())?;
    if json {
        let output = serde_json::json!({
            "event": "options",
            "file": file,
            "config_name": options.config_name(),
            "resolver": strategy,
            "temp_build_dir": options.temp_build_dir,
            "warnings": warnings.len(),
        });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Options:   {}", file.display());
        println!(
            "Config:    {}",
            options.config_name().unwrap_or("tsconfig.json (searched)")
        );
        println!("Resolver:  {}", strategy.as_str().unwrap_or("hybrid"));
        if let Some(dir) = &options.temp_build_dir {
            println!("Build dir: {}", dir.display());
        }
        println!("Warnings:  {}", warnings.len());
    }
    Ok(())
}
