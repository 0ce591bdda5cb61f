//! ilias2moodle - ILIAS course export to Moodle backup converter

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ilias2moodle::inspect::{BackupSummary, read_backup};
use ilias2moodle::{ConverterConfig, ExportReader, Warnings, convert_export, open_export};

#[derive(Parser)]
#[command(name = "ilias2moodle")]
#[command(version, about = "Convert ILIAS course exports into Moodle backups", long_about = None)]
#[command(after_help = "EXAMPLES:
    ilias2moodle convert export_dir/                 Write a .mbz next to the export
    ilias2moodle convert export.zip -o course.mbz    Convert a zip upload
    ilias2moodle inspect course.mbz                  Show sections and activities
    ilias2moodle tree export_dir/                    Show the container tree")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log more (debug level)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Log only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Convert an export directory or zip into a .mbz backup
    Convert {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file or directory
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// TOML file with rules, type mapping and backup settings
        #[arg(short, long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Write the conversion report to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,

        /// Report as JSON instead of Markdown
        #[arg(long)]
        json: bool,
    },
    /// Summarize and validate a .mbz backup
    Inspect {
        #[arg(value_name = "MBZ")]
        input: PathBuf,

        #[arg(long)]
        json: bool,
    },
    /// Print the parsed container tree of an export
    Tree {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::Convert {
            input,
            output,
            config,
            report,
            json,
        } => convert(&input, output.as_deref(), config.as_deref(), report.as_deref(), json),
        Command::Inspect { input, json } => inspect(&input, json),
        Command::Tree { input } => tree(&input),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default = match (verbose, quiet) {
        (true, _) => "debug",
        (_, true) => "warn",
        _ => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn convert(
    input: &Path,
    output: Option<&Path>,
    config: Option<&Path>,
    report_path: Option<&Path>,
    json: bool,
) -> Result<ExitCode, String> {
    let config = match config {
        Some(path) => ConverterConfig::from_path(path).map_err(|e| format!("{}: {e}", path.display()))?,
        None => ConverterConfig::default(),
    };

    let (path, outcome) = convert_export(input, output, &config).map_err(|e| e.to_string())?;
    let report = &outcome.report;

    let rendered = if json {
        serde_json::to_string_pretty(report).map_err(|e| e.to_string())?
    } else {
        report.to_markdown()
    };
    match report_path {
        Some(report_path) => fs::write(report_path, rendered).map_err(|e| e.to_string())?,
        None if json => println!("{rendered}"),
        None => {}
    }

    println!("Wrote {}", path.display());
    println!(
        "Sections: {}, activities: {}, warnings: {}",
        report.sections.len(),
        report.activity_count(),
        report.warnings.len()
    );
    Ok(ExitCode::SUCCESS)
}

fn inspect(input: &Path, json: bool) -> Result<ExitCode, String> {
    let file = File::open(input).map_err(|e| format!("{}: {e}", input.display()))?;
    let summary = read_backup(BufReader::new(file)).map_err(|e| e.to_string())?;
    let problems = summary.validate();

    if json {
        let value = serde_json::json!({ "backup": summary, "problems": problems });
        println!("{}", serde_json::to_string_pretty(&value).map_err(|e| e.to_string())?);
    } else {
        print_summary(&summary);
        if problems.is_empty() {
            println!("\nNo problems found.");
        } else {
            println!("\nProblems:");
            for problem in &problems {
                println!("  - {problem}");
            }
        }
    }

    Ok(if problems.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_summary(summary: &BackupSummary) {
    println!("Backup: {}", summary.name);
    println!("Course: {}", summary.course_title);
    if !summary.moodle_release.is_empty() {
        println!("Moodle: {}", summary.moodle_release);
    }
    println!("Files: {}", summary.files.len());
    for section in &summary.sections {
        println!("\n[{}] {}", section.number, section.title);
        for activity in summary.section_activities(section) {
            println!("    {:<10} {} ({})", activity.module_name, activity.title, activity.module_id);
        }
    }
}

fn tree(input: &Path) -> Result<ExitCode, String> {
    let source = open_export(input).map_err(|e| e.to_string())?;
    let mut warnings = Warnings::new();
    let reader = ExportReader::open(source.as_ref(), &mut warnings).map_err(|e| e.to_string())?;
    let structure = reader.read_container(&mut warnings).map_err(|e| e.to_string())?;

    println!("Course: {}", reader.manifest().title);
    println!("Container: {}", structure.source_path());
    println!();
    print!("{}", structure.outline());

    let counts = structure.type_counts();
    let counts: Vec<String> = counts.iter().map(|(t, n)| format!("{t}: {n}")).collect();
    println!("\n{} items ({})", structure.len(), counts.join(", "));
    Ok(ExitCode::SUCCESS)
}
