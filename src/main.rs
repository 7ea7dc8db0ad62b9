//! Coach - decision engine for robot-led coaching sessions
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use coach::cli::history::{HistoryCommand, HistoryOptions};
use coach::cli::simulate::{SimulateCommand, SimulateOptions};
use coach::cli::valid::{ValidCommand, ValidOptions};
use coach::config::{coach_home, Config};
use coach::error::exit_codes;
use coach::logging;
use coach::storage::FileHistoryStore;

// =============================================================================
// CLI Definition
// =============================================================================

/// Coach - decision engine for robot-led coaching sessions
#[derive(Parser)]
#[command(name = "coach")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full session against a simulated guide
    Simulate {
        /// Participant identifier
        participant: String,
        /// Impairment score; 4 or more counts as experienced
        #[arg(long, default_value_t = 0)]
        impairment: u32,
        /// Force a coaching style (0-11)
        #[arg(long)]
        style: Option<usize>,
        /// Number of exercises in the session
        #[arg(long)]
        exercises: Option<u32>,
        /// Seed for the policy and the simulated participant
        #[arg(long)]
        seed: Option<u64>,
        /// Policy tables (JSON)
        #[arg(long)]
        policy: Option<PathBuf>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// List or check the valid behaviours for a context
    Valid {
        /// Goal level (person, session, exercise, set, action)
        goal: String,
        /// Phase (start, end)
        phase: String,
        /// Performance of the last action or aggregate
        #[arg(long, short)]
        performance: Option<String>,
        /// Check a single behaviour
        #[arg(long, short)]
        behaviour: Option<String>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show a participant's history, or list participants
    History {
        /// Participant identifier; omit to list all
        participant: Option<String>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    setup_panic_handler();
    logging::init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("coach error: {}", e);
            ExitCode::from(exit_codes::FAILURE as u8)
        }
    }
}

/// On panic, log to `~/.coach/crash.log` and exit with the crash code.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("coach panic: {}", info);

        if let Some(home) = coach_home() {
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            participant,
            impairment,
            style,
            exercises,
            seed,
            policy,
            json,
            quiet,
        } => run_simulate(
            &participant,
            SimulateOptions {
                json,
                quiet,
                impairment,
                style,
                exercises,
                seed,
                policy,
            },
        ),
        Commands::Valid {
            goal,
            phase,
            performance,
            behaviour,
            json,
            quiet,
        } => run_valid(
            &goal,
            &phase,
            ValidOptions {
                json,
                quiet,
                performance,
                behaviour,
            },
        ),
        Commands::History {
            participant,
            json,
            quiet,
        } => run_history(participant.as_deref(), HistoryOptions { json, quiet }),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::FAILURE as u8)
    }
}

fn print_output(formatted: &str) {
    if !formatted.is_empty() {
        println!("{}", formatted);
    }
}

fn run_simulate(
    participant: &str,
    options: SimulateOptions,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::load();
    let store = FileHistoryStore::new(&config)?;

    let cmd = SimulateCommand::new(store, config);
    let output = cmd.run(participant, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_valid(
    goal: &str,
    phase: &str,
    options: ValidOptions,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = ValidCommand::new();
    let output = cmd.run(goal, phase, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_history(
    participant: Option<&str>,
    options: HistoryOptions,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::load();
    let store = FileHistoryStore::new(&config)?;

    let cmd = HistoryCommand::new(store);
    let output = cmd.run(participant, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}
