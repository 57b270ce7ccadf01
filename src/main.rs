use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod countries;
mod dates;
mod db;
mod embargo;
mod errors;
mod fixture;
mod grades;
mod models;
mod policy;
mod report;

use crate::dates::{DatesTabPayload, ResponseOptions};
use crate::embargo::{Country, RuleType};
use crate::errors::DatesError;
use crate::models::ViewerContext;
use crate::policy::BaseUrl;

#[derive(Parser)]
#[command(name = "course-home-dates")]
#[command(about = "Course home Dates tab payloads for LMS learners", long_about = None)]
struct Cli {
    /// Postgres connection string; not needed with --fixture
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,
    /// Base used to make content links absolute
    #[arg(
        long,
        env = "LMS_BASE_URL",
        default_value = "http://localhost:18000",
        global = true
    )]
    lms_base_url: String,
    /// Base for basket links; defaults to the LMS base
    #[arg(long, env = "ECOMMERCE_BASE_URL", global = true)]
    ecommerce_base_url: Option<String>,
    #[arg(
        long,
        env = "COURSE_SOCK_ENABLED",
        global = true,
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    course_sock_enabled: bool,
    #[arg(
        long,
        env = "CONTENT_TYPE_GATING_ENABLED",
        global = true,
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    content_type_gating_enabled: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Scope {
    #[arg(long)]
    course: String,
    #[arg(long)]
    user: String,
    /// Read the course snapshot from a JSON file instead of Postgres
    #[arg(long)]
    fixture: Option<PathBuf>,
    /// Evaluate deadlines as of this RFC 3339 instant
    #[arg(long)]
    now: Option<DateTime<Utc>>,
    /// Attach course grade, grading policy and completion summary
    #[arg(long)]
    with_grades: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo course with learners, dates and grades
    Seed,
    /// Import dated course events from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print the Dates tab payload as JSON
    Dates {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a markdown digest of the Dates tab
    Report {
        #[command(flatten)]
        scope: Scope,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Manage and check country access rules
    Embargo {
        #[command(subcommand)]
        action: EmbargoAction,
    },
}

#[derive(Subcommand)]
enum EmbargoAction {
    /// Add or replace a country rule for a course
    Restrict {
        #[arg(long)]
        course: String,
        #[arg(long)]
        country: String,
        #[arg(long, value_enum, default_value_t = RuleType::Blacklist)]
        rule: RuleType,
    },
    /// Check whether a country may access a course
    Check {
        #[arg(long)]
        course: String,
        #[arg(long)]
        country: String,
    },
}

async fn connect(database_url: Option<&str>) -> anyhow::Result<PgPool> {
    let database_url =
        database_url.context("DATABASE_URL must be set to a production Postgres instance")?;
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn build_payload(cli: &Cli, scope: &Scope) -> anyhow::Result<(DatesTabPayload, DateTime<Utc>)> {
    let now = scope.now.unwrap_or_else(Utc::now);

    let snapshot = match &scope.fixture {
        Some(path) => {
            let snapshot = fixture::load_snapshot(path)?;
            if snapshot.course_key != scope.course {
                return Err(DatesError::CourseNotFound(scope.course.clone()).into());
            }
            if snapshot.learner.username != scope.user {
                return Err(DatesError::InvalidInput(format!(
                    "fixture {} describes learner '{}', not '{}'",
                    path.display(),
                    snapshot.learner.username,
                    scope.user
                ))
                .into());
            }
            snapshot
        }
        None => {
            let pool = connect(cli.database_url.as_deref()).await?;
            db::load_snapshot(&pool, &scope.course, &scope.user).await?
        }
    };

    dates::ensure_can_view(&snapshot.learner)?;

    let lms = BaseUrl::parse(&cli.lms_base_url)
        .with_context(|| format!("invalid LMS base url: {}", cli.lms_base_url))?;
    let ecommerce = match &cli.ecommerce_base_url {
        Some(base) => BaseUrl::parse(base)
            .with_context(|| format!("invalid ecommerce base url: {base}"))?,
        None => lms.clone(),
    };
    let options = ResponseOptions {
        include_grades: scope.with_grades,
        show_upgrade_sock: cli.course_sock_enabled,
        content_type_gating: cli.content_type_gating_enabled,
    };

    let viewer = ViewerContext::for_learner(&snapshot.learner, now);
    let payload = dates::build_response(&snapshot, &viewer, &lms, &ecommerce, &options)?;
    Ok((payload, now))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::InitDb => {
            let pool = connect(cli.database_url.as_deref()).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(cli.database_url.as_deref()).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted for {}.", db::DEMO_COURSE);
        }
        Commands::Import { csv } => {
            let pool = connect(cli.database_url.as_deref()).await?;
            let inserted = db::import_csv(&pool, csv).await?;
            println!("Inserted {inserted} date blocks from {}.", csv.display());
        }
        Commands::Dates { scope, out } => {
            let (payload, _) = build_payload(&cli, scope).await?;
            let json = serde_json::to_string_pretty(&payload)?;
            match out {
                Some(path) => {
                    std::fs::write(path, json)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(path = %path.display(), "dates payload written");
                }
                None => println!("{json}"),
            }
        }
        Commands::Report { scope, out } => {
            let (payload, now) = build_payload(&cli, scope).await?;
            let report = report::build_report(&scope.course, now, &payload);
            std::fs::write(out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Embargo { action } => {
            let pool = connect(cli.database_url.as_deref()).await?;
            match action {
                EmbargoAction::Restrict {
                    course,
                    country,
                    rule,
                } => {
                    let country = Country::new(country)?;
                    db::restrict_course(&pool, course, &country, *rule).await?;
                    println!("{} is now {}ed for {}.", country.code, rule, course);
                }
                EmbargoAction::Check { course, country } => {
                    let (restricted, rules) = db::fetch_embargo(&pool, course).await?;
                    let allowed =
                        embargo::check_country_access(restricted.as_ref(), &rules, country)?;
                    if allowed {
                        println!("Access from {country} to {course} is allowed.");
                    } else {
                        println!("Access from {country} to {course} is blocked.");
                    }
                }
            }
        }
    }

    Ok(())
}
