//! CLI entry point for `emlexport`.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use emlexport::config::{self, Config};
use emlexport::export::{eml, filename, inspect};
use emlexport::model::MailBundle;

/// Serialize mail bundles into RFC 822 / MIME `.eml` files.
#[derive(Parser)]
#[command(name = "emlexport", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a JSON mail bundle (or a list of bundles) into .eml files
    Encode {
        /// Bundle JSON file
        input: PathBuf,
        /// Output directory (defaults to the configured export directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write the encoded message to stdout instead of a file
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
    },
    /// Parse an .eml file and show its parts
    Inspect {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Encode {
            input,
            output,
            stdout,
        } => cmd_encode(&input, output, stdout, &config),
        Commands::Inspect { path, json } => cmd_inspect(&path, json),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "emlexport.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "emlexport", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::stdout().write_all(&buf)?;
    Ok(())
}

/// Encode every bundle in `input` and write the results.
fn cmd_encode(
    input: &Path,
    output: Option<PathBuf>,
    stdout: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let raw = std::fs::read(input).map_err(|e| emlexport::error::ExportError::io(input, e))?;
    let bundles = MailBundle::from_json_slice(&raw)?;

    if stdout {
        let [bundle] = bundles.as_slice() else {
            anyhow::bail!(
                "--stdout needs exactly one bundle, '{}' holds {}",
                input.display(),
                bundles.len()
            );
        };
        let mut out = std::io::stdout().lock();
        eml::write_eml(bundle, &mut out)?;
        return Ok(());
    }

    let output_dir = output.unwrap_or_else(|| config::output_dir(config));
    std::fs::create_dir_all(&output_dir)
        .map_err(|e| emlexport::error::ExportError::io(&output_dir, e))?;

    let pb = ProgressBar::new(bundles.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Encoding [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let mut written = Vec::with_capacity(bundles.len());
    for (i, bundle) in bundles.iter().enumerate() {
        pb.set_position(i as u64);
        let file = eml::mail_to_eml_file(bundle)?;
        let path = output_dir.join(filename::legalize_file_name(&file.name));
        let path = if config.export.overwrite {
            path
        } else {
            unique_path(&path)
        };
        std::fs::write(&path, &file.data).map_err(|e| emlexport::error::ExportError::io(&path, e))?;
        tracing::info!(path = %path.display(), bytes = file.data.len(), "Wrote EML file");
        written.push(path);
    }
    pb.finish_and_clear();

    println!(
        "  Exported {} .eml file(s) to {}",
        written.len(),
        output_dir.display()
    );
    Ok(())
}

/// Parse an `.eml` file and print its structure.
fn cmd_inspect(path: &Path, json: bool) -> anyhow::Result<()> {
    let raw = std::fs::read(path).map_err(|e| emlexport::error::ExportError::io(path, e))?;
    let summary = inspect::inspect_eml(&raw)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    use humansize::{format_size, BINARY};

    let dash = "-".to_string();
    println!();
    println!("  {:<14} {}", "Subject", summary.subject.as_ref().unwrap_or(&dash));
    println!("  {:<14} {}", "From", summary.from.as_ref().unwrap_or(&dash));
    println!("  {:<14} {}", "Date", summary.date.as_ref().unwrap_or(&dash));
    println!(
        "  {:<14} {}",
        "HTML body",
        summary
            .html
            .as_ref()
            .map(|h| format_size(h.len(), BINARY))
            .unwrap_or_else(|| dash.clone())
    );
    println!("  {:<14} {}", "Attachments", summary.attachments.len());

    if !summary.attachments.is_empty() {
        println!();
        println!(
            "  {:<4} {:<36} {:<28} {:>10}  {}",
            "#", "Name", "Type", "Size", "Content-Id"
        );
        println!("  {}", "-".repeat(92));
        for (i, part) in summary.attachments.iter().enumerate() {
            let name: String = part.name.chars().take(35).collect();
            println!(
                "  {:<4} {:<36} {:<28} {:>10}  {}",
                i + 1,
                name,
                part.content_type,
                format_size(part.size, BINARY),
                part.content_id.as_deref().unwrap_or("")
            );
        }
    }
    println!();

    Ok(())
}

/// If `path` already exists, append a counter to make it unique.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("mail");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("eml");
    let parent = path.parent().unwrap_or(Path::new("."));

    for i in 1..1000 {
        let candidate = parent.join(format!("{stem}_{i}.{ext}"));
        if !candidate.exists() {
            return candidate;
        }
    }

    parent.join(format!("{stem}_dup.{ext}"))
}
