//! CLI entry point for `mboxstat`.

use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mboxstat::config::Config;
use mboxstat::error::MboxError;
use mboxstat::parser::archive::ArchiveSource;
use mboxstat::report::{self, dump, grep, table, toplist};
use mboxstat::scan::Scanner;
use mboxstat::sniff::MagicSniffer;
use mboxstat::stats::Aggregator;

#[derive(Parser)]
#[command(name = "mboxstat", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan an MBOX archive and report header and payload statistics
    Scan(ScanArgs),
    /// Print the value frequencies of one header from a header JSON dump
    Grep {
        /// Header JSON dump (`-` for stdin)
        #[arg(short, long, default_value = "-", value_name = "FILENAME")]
        input: PathBuf,
        /// Output file (`-` for stdout)
        #[arg(short, long, default_value = "-", value_name = "FILENAME")]
        output: PathBuf,
        /// Lowercased header name to look up
        #[arg(short = 'r', long)]
        header: String,
    },
    /// Print the payload classification table from a payload-type JSON dump
    PayloadTable {
        /// Payload-type JSON dump (`-` for stdin)
        #[arg(short, long, default_value = "-", value_name = "FILENAME")]
        input: PathBuf,
        /// Output file (`-` for stdout)
        #[arg(short, long, default_value = "-", value_name = "FILENAME")]
        output: PathBuf,
    },
    /// Print the display names seen for each address of an address header
    NameVariants {
        /// Header JSON dump (`-` for stdin)
        #[arg(short, long, default_value = "-", value_name = "FILENAME")]
        input: PathBuf,
        /// Output file (`-` for stdout)
        #[arg(short, long, default_value = "-", value_name = "FILENAME")]
        output: PathBuf,
        /// Address header name (e.g. from, to)
        #[arg(short = 'r', long)]
        header: String,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(clap::Args)]
struct ScanArgs {
    /// Plain MBOX file (`-` for stdin). If it does not exist but a ZIP is
    /// given, the MBOX is extracted here from the ZIP.
    #[arg(short = 'm', long, value_name = "FILENAME.MBOX")]
    mbox_file: Option<PathBuf>,

    /// ZIP file containing the MBOX
    #[arg(short = 'i', long, value_name = "FILENAME.ZIP")]
    input_zip: Option<PathBuf>,

    /// Path of the MBOX inside the ZIP
    #[arg(short = 'p', long, value_name = "PATH/IN/ZIP")]
    mbox_path_in_zip: Option<String>,

    /// Output for the reports (`-` for stdout)
    #[arg(short, long, default_value = "-", value_name = "FILENAME")]
    output: PathBuf,

    /// Classify payload parts together with headers
    #[arg(short = 'k', long)]
    process_payload: bool,

    /// Write the frequency toplist of lowercased header names
    #[arg(short = 't', long)]
    header_toplist: bool,

    /// Write the frequency toplist of header case variants
    #[arg(short = 'c', long)]
    header_casevariants: bool,

    /// Write the headers that could not be normalized, as JSON
    #[arg(short = 'b', long)]
    bad_headers: bool,

    /// Write the normalized data of every message as JSON Lines (implies -k)
    #[arg(short = 'f', long)]
    final_data: bool,

    /// Write header-value frequencies to this JSON file
    #[arg(short = 'j', long, value_name = "FILENAME.JSON")]
    header_json: Option<PathBuf>,

    /// Write payload part feature frequencies to this JSON file
    #[arg(short = 'l', long, value_name = "FILENAME.JSON")]
    payload_type_json: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = mboxstat::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Scan(args) => cmd_scan(&args, &config, cli.verbose > 0),
        Commands::Grep {
            input,
            output,
            header,
        } => cmd_grep(&input, &output, &header),
        Commands::PayloadTable { input, output } => cmd_payload_table(&input, &output),
        Commands::NameVariants {
            input,
            output,
            header,
        } => cmd_name_variants(&input, &output, &header),
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

    // Try to set up file logging
    let log_path = mboxstat::config::log_file_path(config);
    let log_target = log_path
        .parent()
        .zip(log_path.file_name())
        .filter(|(dir, _)| std::fs::create_dir_all(dir).is_ok());
    if let Some((log_dir, file_name)) = log_target {
        let file_appender = tracing_appender::rolling::never(log_dir, file_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mboxstat", &mut std::io::stdout());
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

/// Scan an archive, writing the requested reports.
fn cmd_scan(args: &ScanArgs, config: &Config, verbose: bool) -> anyhow::Result<()> {
    use humansize::{format_size, BINARY};

    let source = ArchiveSource::resolve(
        args.mbox_file.as_deref(),
        args.input_zip.as_deref(),
        args.mbox_path_in_zip.as_deref(),
    )?;
    let process_payload = args.process_payload || args.final_data;

    let pb = if std::io::stderr().is_terminal() && !verbose {
        progress_bar(&source)?
    } else {
        ProgressBar::hidden()
    };

    let mut out = report::open_output(&args.output)?;
    let mut aggregator = Aggregator::new();
    let scanner = Scanner::new(config, &MagicSniffer, process_payload);

    let start = Instant::now();
    let count = scanner.scan(
        &source,
        &mut aggregator,
        &mut |_, summary| {
            if args.final_data {
                dump::write_summary_line(&mut out, summary)?;
            }
            Ok(())
        },
        Some(&|current, total| {
            if let Some(total) = total {
                pb.set_length(total);
            }
            pb.set_position(current);
        }),
    )?;
    pb.finish_and_clear();

    tracing::info!(
        source = %source,
        messages = count,
        size = %format_size(pb.position(), BINARY),
        elapsed = ?start.elapsed(),
        "Finished scanning"
    );

    if args.header_toplist {
        toplist::write_header_toplist(&mut out, &aggregator)?;
    }
    if args.header_casevariants {
        toplist::write_case_variants(&mut out, &aggregator)?;
    }
    if args.bad_headers {
        dump::write_bad_headers(&mut out, &aggregator.bad_headers, config.report.json_indent)?;
    }
    out.flush()?;

    if let Some(path) = &args.header_json {
        let mut fh = report::open_output(path)?;
        dump::write_header_json(&mut fh, &aggregator, config.report.json_indent)?;
        fh.flush()?;
    }
    if let Some(path) = &args.payload_type_json {
        let mut fh = report::open_output(path)?;
        dump::write_payload_json(&mut fh, &aggregator, config.report.json_indent)?;
        fh.flush()?;
    }

    Ok(())
}

/// Byte progress for sized sources, a spinner for stdin.
fn progress_bar(source: &ArchiveSource) -> anyhow::Result<ProgressBar> {
    if let ArchiveSource::Stdin = source {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} Scanning {bytes}")?);
        return Ok(pb);
    }

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} Scanning [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?
            .progress_chars("#>-"),
    );
    if let ArchiveSource::Mbox(path) = source {
        pb.set_length(std::fs::metadata(path)?.len());
    }
    Ok(pb)
}

/// Print value frequencies of one header from a header dump.
fn cmd_grep(input: &Path, output: &Path, header: &str) -> anyhow::Result<()> {
    let dump = dump::read_header_dump(&mut report::open_input(input)?)?;
    let rows = grep_or_exit(&dump, header)?;
    let mut out = report::open_output(output)?;
    grep::write_grep(&mut out, grep::header_name(header), &rows)?;
    out.flush()?;
    Ok(())
}

/// Print the payload classification table.
fn cmd_payload_table(input: &Path, output: &Path) -> anyhow::Result<()> {
    let dump = dump::read_payload_dump(&mut report::open_input(input)?)?;
    let table = table::payload_table(&dump)?;
    let mut out = report::open_output(output)?;
    table::write_payload_table(&mut out, &table)?;
    out.flush()?;
    Ok(())
}

/// Print the display-name variants of each address.
fn cmd_name_variants(input: &Path, output: &Path, header: &str) -> anyhow::Result<()> {
    let dump = dump::read_header_dump(&mut report::open_input(input)?)?;
    let rows = grep_or_exit(&dump, header)?;
    let variants = grep::name_variants(&rows);
    let mut out = report::open_output(output)?;
    grep::write_name_variants(&mut out, &variants)?;
    out.flush()?;
    Ok(())
}

/// An unknown header is a user error: message on stderr, exit status 1.
fn grep_or_exit(
    dump: &dump::HeaderDump,
    header: &str,
) -> anyhow::Result<Vec<(mboxstat::model::header::HeaderValues, u64)>> {
    match grep::grep_header(dump, header) {
        Ok(rows) => Ok(rows),
        Err(e @ MboxError::NoSuchHeader(_)) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
