use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use eie_report_matrix::config::Config;
use eie_report_matrix::fetch::{normalize, ReportClient, ReportFetcher, ReportKey, ReportSnapshot};
use eie_report_matrix::filter::{FilterOptions, FilterState};
use eie_report_matrix::import::{self, ImportKind};
use eie_report_matrix::models::ReportResponse;
use eie_report_matrix::schema::ReportVariant;
use eie_report_matrix::{export, recognition, render};

#[derive(Parser)]
#[command(name = "eie-report")]
#[command(about = "EIE report matrix viewer and exporter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ReportArgs {
    #[arg(long, value_enum, default_value_t = ReportVariant::College)]
    variant: ReportVariant,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    school_year: Option<String>,
    #[arg(long)]
    semester: Option<String>,
    #[arg(long)]
    program: Option<String>,
    /// Free-text filter over program, course title and faculty
    #[arg(long, default_value = "")]
    search: String,
    /// Saved backend response to use instead of calling the API
    #[arg(long)]
    input: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the report matrix as an HTML table
    Render {
        #[command(flatten)]
        report: ReportArgs,
        #[arg(long)]
        year_level: Option<String>,
        #[arg(long, default_value = "report.html")]
        out: PathBuf,
    },
    /// Write the report matrix as CSV
    Export {
        #[command(flatten)]
        report: ReportArgs,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Write a markdown champion summary, optionally with certificates
    Champions {
        #[command(flatten)]
        report: ReportArgs,
        #[arg(long, default_value = "champions.md")]
        out: PathBuf,
        #[arg(long)]
        certificates: Option<PathBuf>,
    },
    /// Validate and upload a roster CSV
    Import {
        #[arg(long, value_enum)]
        kind: ImportKind,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show the selector options and their defaults
    Options {
        #[arg(long)]
        department: Option<String>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

struct Loaded {
    key: ReportKey,
    state: FilterState,
    snapshot: ReportSnapshot,
}

async fn load_report(config: &Config, args: &ReportArgs, today: NaiveDate) -> anyhow::Result<Loaded> {
    let mut state = FilterState {
        department: args.department.clone(),
        school_year: args.school_year.clone(),
        semester: args.semester.clone(),
        program: args.program.clone(),
        year_level: None,
        search: args.search.clone(),
    };

    if let Some(path) = &args.input {
        state.apply_defaults(&FilterOptions::offline(today));
        let key = state
            .report_key()
            .context("--department is required with --input")?;
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let response: Result<ReportResponse, _> = serde_json::from_str(&raw);
        let snapshot = normalize(
            key.clone(),
            response.with_context(|| format!("failed to parse {}", path.display())),
        );
        return Ok(Loaded { key, state, snapshot });
    }

    let client = ReportClient::new(config.api_url()?, config.session.clone(), config.timeout)?;
    let options = FilterOptions::load(&client, args.department.as_deref(), today).await;
    state.apply_defaults(&options);
    let Some(key) = state.report_key() else {
        bail!("department, school year and semester are required; none could be defaulted");
    };

    let fetcher = ReportFetcher::new(client);
    let snapshot = fetcher.refresh(args.variant, Some(key.clone())).await;
    if snapshot.key.is_none() {
        bail!("report was not fetched; the {:?} variant needs EIE_EMPLOYEE_ID", args.variant);
    }
    Ok(Loaded {
        key,
        state,
        snapshot: (*snapshot).clone(),
    })
}

fn report_issue(snapshot: &ReportSnapshot) {
    if let Some(issue) = &snapshot.issue {
        println!("{issue}");
    }
}

fn write_certificates(
    dir: &Path,
    key: &ReportKey,
    champions: &[recognition::ChampionEntry],
    today: NaiveDate,
) -> anyhow::Result<usize> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    for entry in champions {
        let path = dir.join(recognition::certificate_file_name(entry, key));
        std::fs::write(&path, recognition::certificate_text(entry, key, today))
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(champions.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = Config::from_env()?;
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Render {
            report,
            year_level,
            out,
        } => {
            let loaded = load_report(&config, &report, today).await?;
            report_issue(&loaded.snapshot);
            let months = loaded.key.semester().months();
            let available = FilterOptions::default().with_year_levels(&loaded.snapshot.matrix);
            if let Some(wanted) = &year_level {
                if !available.year_levels.contains(wanted) {
                    tracing::warn!(year_level = %wanted, available = ?available.year_levels, "year level not in report");
                }
            }
            let refined = loaded.state.refine(&loaded.snapshot.matrix);
            let table = render::render_table(
                &report.variant.schema(),
                months,
                &refined,
                loaded.snapshot.grand_totals.as_ref(),
                year_level.as_deref(),
            );
            std::fs::write(&out, table.to_html())
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report table written to {}.", out.display());
        }
        Commands::Export { report, out_dir } => {
            let loaded = load_report(&config, &report, today).await?;
            report_issue(&loaded.snapshot);
            let rows = export::build_rows(
                &report.variant.schema(),
                loaded.key.semester().months(),
                &loaded.snapshot.matrix,
                loaded.snapshot.grand_totals.as_ref(),
            );
            let path = export::write_export(&out_dir, report.variant.report_name(), &loaded.key, &rows)?;
            println!("Exported {} rows to {}.", rows.len() - 1, path.display());
        }
        Commands::Champions {
            report,
            out,
            certificates,
        } => {
            let loaded = load_report(&config, &report, today).await?;
            report_issue(&loaded.snapshot);
            let champions = recognition::collect_champions(&loaded.snapshot.matrix, loaded.key.semester());
            std::fs::write(&out, recognition::build_summary(&loaded.key, &champions))
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Champion summary written to {}.", out.display());

            if let Some(dir) = certificates {
                let written = write_certificates(&dir, &loaded.key, &champions, today)?;
                println!("Wrote {written} certificates to {}.", dir.display());
            }
        }
        Commands::Import { kind, csv } => {
            let client = ReportClient::new(config.api_url()?, config.session.clone(), config.timeout)?;
            let message = import::upload(&client, kind, &csv).await?;
            println!("{message}");
        }
        Commands::Options { department } => {
            let client = ReportClient::new(config.api_url()?, config.session.clone(), config.timeout)?;
            let options = FilterOptions::load(&client, department.as_deref(), today).await;
            let mut state = FilterState {
                department,
                ..FilterState::default()
            };
            state.apply_defaults(&options);

            print_options("Departments", &options.departments, state.department.as_deref());
            print_options("School years", &options.school_years, state.school_year.as_deref());
            print_options("Semesters", &options.semesters, state.semester.as_deref());
            print_options("Programs", &options.programs, None);
        }
    }

    Ok(())
}

fn print_options(title: &str, values: &[String], selected: Option<&str>) {
    println!("{title}:");
    if values.is_empty() {
        println!("  (none available)");
    }
    for value in values {
        let marker = if Some(value.as_str()) == selected { "*" } else { " " };
        println!(" {marker} {value}");
    }
}
