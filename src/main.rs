use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use skill_gap::dataset::Dataset;
use skill_gap::{data, db, report, Archetype};

#[derive(Parser)]
#[command(name = "skill-gap")]
#[command(about = "Personalized skill gap recommendations from engagement data", long_about = None)]
struct Cli {
    /// Directory holding the exported CSV artifacts
    #[arg(long, global = true, env = "SKILL_GAP_DATA_DIR", default_value = "cleaned_data")]
    data_dir: PathBuf,
    /// Read artifacts from Postgres (DATABASE_URL) instead of the data directory
    #[arg(long, global = true)]
    from_db: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a small demo dataset into the database
    Seed,
    /// Mirror the CSV artifacts into the database
    Import,
    /// List students, optionally filtered by archetype
    Students {
        #[arg(long)]
        archetype: Option<String>,
        #[arg(long, default_value_t = 1000)]
        limit: usize,
    },
    /// Show prioritized recommendations for a student
    Recommend {
        #[arg(long)]
        student: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
        /// Print the full plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compare a student's engagement with successful peers
    Compare {
        #[arg(long)]
        student: String,
    },
    /// List activity correlations with course success
    Correlations,
    /// Generate a markdown report for a student
    Report {
        #[arg(long)]
        student: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import => {
            let dataset = data::load_dir(&cli.data_dir)
                .with_context(|| format!("failed to load {}", cli.data_dir.display()))?;
            let pool = connect().await?;
            let counts = db::import_dataset(&pool, &dataset).await?;
            println!(
                "Imported {} students, {} engagement values, {} template entries and {} correlations from {}.",
                counts.students,
                counts.engagement,
                counts.template_entries,
                counts.correlations,
                cli.data_dir.display()
            );
        }
        Commands::Students { archetype, limit } => {
            let dataset = load(&cli.data_dir, cli.from_db).await?;
            let filter = archetype.as_deref().map(Archetype::parse);

            let mut shown = 0;
            for student in dataset.students_in(filter.as_ref()).take(limit) {
                println!(
                    "{} {} ({})",
                    student.archetype.emoji(),
                    student.student_id,
                    student.archetype
                );
                shown += 1;
            }
            if shown == 0 {
                let known: Vec<String> =
                    dataset.archetypes().iter().map(|a| a.to_string()).collect();
                println!("No students found. Known archetypes: {}", known.join(", "));
            }
        }
        Commands::Recommend {
            student,
            limit,
            json,
        } => {
            let dataset = load(&cli.data_dir, cli.from_db).await?;
            let plan = report::build_plan(&dataset, &student)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print!("{}", report::render_recommendations(&plan, limit));
            }
        }
        Commands::Compare { student } => {
            let dataset = load(&cli.data_dir, cli.from_db).await?;
            let plan = report::build_plan(&dataset, &student)?;
            if plan.template_missing {
                println!(
                    "No success template available for archetype: {}",
                    plan.profile.archetype
                );
                return Ok(());
            }
            print!("{}", report::render_comparison(&plan.comparison));
        }
        Commands::Correlations => {
            let dataset = load(&cli.data_dir, cli.from_db).await?;
            print!(
                "{}",
                report::render_correlations(dataset.correlations.as_ref())
            );
        }
        Commands::Report { student, out } => {
            let dataset = load(&cli.data_dir, cli.from_db).await?;
            let plan = report::build_plan(&dataset, &student)?;
            let markdown = report::build_report(
                &plan,
                dataset.correlations.as_ref(),
                chrono::Utc::now(),
            );
            std::fs::write(&out, markdown)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn load(data_dir: &std::path::Path, from_db: bool) -> anyhow::Result<Dataset> {
    if from_db {
        let pool = connect().await?;
        return db::load_dataset(&pool).await;
    }
    data::load_dir(data_dir).with_context(|| format!("failed to load {}", data_dir.display()))
}
