//! studyloop CLI: drive the learning engine from a terminal.

use std::path::PathBuf;
use std::process;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use studyloop_core::model::{GradingMode, Tier};

mod commands;

#[derive(Parser)]
#[command(name = "studyloop", version, about = "Learning progress and assessment engine")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Learner state directory (overrides the config file)
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create starter config and example course
    Init,

    /// Validate a course TOML file
    Validate {
        /// Path to the course .toml file
        #[arg(long)]
        course: PathBuf,
    },

    /// Grade a quiz submission and record its effects
    Submit {
        #[arg(long)]
        course: PathBuf,

        #[arg(long)]
        user: String,

        /// Subscription tier: free, premium, pro
        #[arg(long, default_value = "free")]
        tier: Tier,

        /// Submission JSON file
        #[arg(long)]
        submission: PathBuf,

        /// Grading mode when the submission does not name one: auto, hybrid, llm
        #[arg(long)]
        mode: Option<GradingMode>,

        /// Activity date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mark a chapter complete
    Complete {
        #[arg(long)]
        course: PathBuf,

        #[arg(long)]
        user: String,

        /// Subscription tier: free, premium, pro
        #[arg(long, default_value = "free")]
        tier: Tier,

        #[arg(long)]
        chapter: String,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Record a day of activity
    CheckIn {
        #[arg(long)]
        course: PathBuf,

        #[arg(long)]
        user: String,

        /// Subscription tier: free, premium, pro
        #[arg(long, default_value = "free")]
        tier: Tier,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show a month of activity
    Calendar {
        #[arg(long)]
        user: String,

        #[arg(long)]
        year: i32,

        /// Month number, 1-12
        #[arg(long)]
        month: u32,
    },

    /// Show course progress and streak
    Progress {
        #[arg(long)]
        course: PathBuf,

        #[arg(long)]
        user: String,

        /// Subscription tier: free, premium, pro
        #[arg(long, default_value = "free")]
        tier: Tier,
    },

    /// Show the achievement catalog for a learner
    Achievements {
        #[arg(long)]
        course: PathBuf,

        #[arg(long)]
        user: String,

        /// Subscription tier: free, premium, pro
        #[arg(long, default_value = "free")]
        tier: Tier,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("studyloop=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = commands::Settings {
        config: cli.config,
        state_dir: cli.state_dir,
    };

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { course } => commands::validate::execute(course),
        Commands::Submit {
            course,
            user,
            tier,
            submission,
            mode,
            date,
            json,
        } => {
            commands::submit::execute(
                &settings, course, user, tier, submission, mode, date, json,
            )
            .await
        }
        Commands::Complete {
            course,
            user,
            tier,
            chapter,
            date,
        } => commands::complete::execute(&settings, course, user, tier, chapter, date),
        Commands::CheckIn {
            course,
            user,
            tier,
            date,
        } => commands::check_in::execute(&settings, course, user, tier, date),
        Commands::Calendar { user, year, month } => {
            commands::calendar::execute(&settings, user, year, month)
        }
        Commands::Progress { course, user, tier } => {
            commands::progress::execute(&settings, course, user, tier)
        }
        Commands::Achievements { course, user, tier } => {
            commands::achievements::execute(&settings, course, user, tier)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
