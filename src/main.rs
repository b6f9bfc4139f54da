use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use bloodreport::config::{Config, OutputFormat};
use bloodreport::ranges::Sex;
use bloodreport::report::Analyzer;

/// Headless CLI for blood report parameter extraction and condition scoring
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Text file extracted from the report ("-" reads stdin)
    input: Option<PathBuf>,

    /// Config file (defaults to ~/.bloodreport/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Parameter alias table (JSON)
    #[arg(long)]
    aliases: Option<PathBuf>,

    /// Reference range table (JSON)
    #[arg(long)]
    ranges: Option<PathBuf>,

    /// Disease rule table (JSON)
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Statistical predictor model (JSON centroid model)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Patient sex for sex-specific reference ranges ("male" or "female")
    #[arg(long)]
    sex: Option<Sex>,

    /// Output format: "json" or "text"
    #[arg(short, long)]
    output: Option<OutputFormat>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Save the effective configuration to the config file
    #[arg(long)]
    write_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Command-line flags override config file values
    fn apply(&self, config: &mut Config) {
        if let Some(ref path) = self.aliases {
            config.aliases_path = Some(path.clone());
        }
        if let Some(ref path) = self.ranges {
            config.ranges_path = Some(path.clone());
        }
        if let Some(ref path) = self.rules {
            config.rules_path = Some(path.clone());
        }
        if let Some(ref path) = self.model {
            config.model_path = Some(path.clone());
        }
        if self.sex.is_some() {
            config.sex = self.sex;
        }
        if let Some(format) = self.output {
            config.output_format = format;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging (stderr, so stdout stays machine readable)
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let mut config = Config::load(&config_path)?;
    args.apply(&mut config);
    debug!("Effective config: {:?}", config);

    if args.write_config {
        config.save(&config_path)?;
        info!("Config saved to {:?}", config_path);
    }

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let Some(input) = args.input.as_ref() else {
        if args.write_config {
            return Ok(());
        }
        eprintln!("No input given. Pass a text file extracted from a report, or \"-\" for stdin.");
        eprintln!("Run with --help for all options.");
        return Ok(());
    };

    let (source, text) = read_input(input)?;
    info!("Read {} characters from {}", text.chars().count(), source);

    let analyzer = Analyzer::from_config(&config)?;
    let report = analyzer.analyze_text(&source, &text);

    match config.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print!("{}", report.render_text()),
    }

    Ok(())
}

fn read_input(input: &Path) -> Result<(String, String)> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(("stdin".to_string(), text));
    }

    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read input file {:?}", input))?;
    let source = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());
    Ok((source, text))
}
