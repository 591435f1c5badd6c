//! brewlab-le - Learning engine command line
//!
//! Diagnoses brews from sensory ratings, learns grind and time offsets per
//! grinder + method, and manages the persisted state in the data folder.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use brewlab_common::config::{self, RootFolderResolver, TomlConfig};
use brewlab_common::FileStore;
use brewlab_le::catalog::{self, UserType};
use brewlab_le::pressure;
use brewlab_le::report::TextFormatter;
use brewlab_le::{
    BrewMeasurements, BrewSession, EngineParams, LearningKey, Selections, SensoryScores,
};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for brewlab-le
#[derive(Parser, Debug)]
#[command(name = "brewlab-le")]
#[command(about = "Extraction diagnosis and adaptive brew learning")]
#[command(version)]
struct Cli {
    /// Data folder holding persisted state
    #[arg(short, long, global = true)]
    root_folder: Option<PathBuf>,

    /// TOML config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overrides the config file (RUST_LOG wins over both)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SelectionArgs {
    /// Brew method, e.g. v60, espresso, french-press
    #[arg(short, long)]
    method: String,

    /// Grinder id, e.g. fellow-ode
    #[arg(short, long)]
    grinder: String,

    #[arg(long, value_enum, default_value_t = UserType::Home)]
    user_type: UserType,

    #[arg(long, default_value = "")]
    origin: String,

    #[arg(long, default_value = "")]
    altitude: String,

    #[arg(long, default_value = "")]
    processing: String,

    #[arg(long, default_value = "")]
    roast_level: String,
}

impl SelectionArgs {
    fn into_selections(self) -> Selections {
        Selections {
            user_type: self.user_type,
            brew_method: self.method,
            grinder: self.grinder,
            origin: self.origin,
            altitude: self.altitude,
            processing: self.processing,
            roast_level: self.roast_level,
        }
    }
}

#[derive(Args, Debug)]
struct MeasurementArgs {
    /// Roast date, YYYY-MM-DD
    #[arg(long)]
    roast_date: Option<String>,

    #[arg(long)]
    dose_used: Option<f64>,

    #[arg(long)]
    yield_used: Option<f64>,

    #[arg(long)]
    grind_setting: Option<f64>,

    #[arg(long)]
    water_temp: Option<f64>,
}

impl From<MeasurementArgs> for BrewMeasurements {
    fn from(args: MeasurementArgs) -> Self {
        Self {
            roast_date: args.roast_date,
            dose_used: args.dose_used,
            yield_used: args.yield_used,
            grind_setting: args.grind_setting,
            water_temp: args.water_temp,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a config file with the current settings
    InitConfig {
        /// Target path (defaults to the platform config location)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    #[command(flatten)]
    Engine(EngineCommand),
}

/// Commands operating on the persisted engine state
#[derive(Subcommand, Debug)]
enum EngineCommand {
    /// Show the starting recipe for a grinder + method
    Recipe {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Rate a brew, diagnose it and learn from it
    Feedback {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Rating as attribute=value (0-10), repeatable
        #[arg(short, long = "score", value_name = "ATTR=VALUE", required = true)]
        scores: Vec<String>,

        #[command(flatten)]
        measurements: MeasurementArgs,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Learning progress for a grinder + method
    Status {
        #[arg(short, long)]
        method: String,
        #[arg(short, long)]
        grinder: String,
    },

    /// Export brew history and learning model
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace brew history and learning model from an export file
    Import { file: PathBuf },

    /// Clear persisted state
    Reset {
        #[command(subcommand)]
        target: ResetTarget,
    },

    /// Record research data consent
    Privacy {
        /// Consent to the privacy terms (omit to revoke)
        #[arg(long)]
        consent: bool,

        /// Share anonymized brew data
        #[arg(long, requires = "consent")]
        share: bool,
    },

    /// Aggregate statistics
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Export research data, history and learning model
    AdminExport {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a pressure profile against an espresso machine
    ProfileCheck {
        #[arg(long)]
        machine: String,
        #[arg(long)]
        profile: String,
    },

    /// List methods, grinders, machines and profiles
    Catalog {
        #[arg(long, value_enum, default_value_t = UserType::Home)]
        user_type: UserType,
    },
}

#[derive(Subcommand, Debug)]
enum ResetTarget {
    /// Forget learning for one grinder + method
    Key {
        #[arg(short, long)]
        method: String,
        #[arg(short, long)]
        grinder: String,
    },
    /// Forget all learning
    Learning,
    /// Clear brew history
    History,
    /// Clear everything, including research data and privacy settings
    All,
}

fn init_tracing(level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level '{}'", level))?;

    match log_file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let toml_config = TomlConfig::load_or_default(cli.config.as_deref());
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| toml_config.logging.level.clone());
    init_tracing(&level, toml_config.logging.file.as_deref())?;

    // Log build identification immediately after tracing init
    info!(
        "Starting brewlab-le v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match cli.command {
        Command::InitConfig { path, force } => init_config(&toml_config, path, force),
        Command::Engine(command) => {
            let root_folder =
                RootFolderResolver::new(cli.root_folder.clone(), &toml_config).resolve();
            config::ensure_directory_exists(&root_folder)?;
            info!("Data folder: {}", root_folder.display());

            let params = EngineParams::from_overrides(&toml_config.learning)
                .context("Invalid [learning] configuration")?;
            let store = FileStore::open(&root_folder).context("Failed to open data folder")?;
            let session = BrewSession::open(store, params).context("Failed to load state")?;
            run(session, command)
        }
    }
}

fn init_config(toml_config: &TomlConfig, path: Option<PathBuf>, force: bool) -> Result<()> {
    let target = match path {
        Some(p) => p,
        None => config::default_config_path().context("No platform config directory available")?,
    };
    if target.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", target.display());
    }
    config::write_toml_config(toml_config, &target)?;
    println!("Wrote {}", target.display());
    Ok(())
}

fn run(mut session: BrewSession<FileStore>, command: EngineCommand) -> Result<()> {
    match command {
        EngineCommand::Recipe { selection } => {
            let selections = selection.into_selections();
            let recipe = session.initial_recipe(&selections)?;
            print!("{}", TextFormatter::format_recipe(&recipe));
            println!();
            print!(
                "{}",
                TextFormatter::format_status(&session.learning_status(&recipe.learning_key()?))
            );
            println!("\nBrew this recipe, then rate it with `brewlab-le feedback` to improve future recommendations.");
        }

        EngineCommand::Feedback {
            selection,
            scores,
            measurements,
            json,
        } => {
            let scores = SensoryScores::from_pairs(&scores)?;
            let outcome =
                session.submit_feedback(selection.into_selections(), scores, measurements.into())?;

            if json {
                let value = serde_json::json!({
                    "record": outcome.record,
                    "advice": outcome.advice,
                    "learning": outcome.adjustment(),
                    "status": outcome.status,
                    "researchRecorded": outcome.research_recorded,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
                return Ok(());
            }

            print!("{}", TextFormatter::format_explanation(&outcome.explanation));
            println!();
            print!("{}", TextFormatter::format_advice(&outcome.advice));
            if let (Some(adjustment), Some(grind), Some(time)) = (
                outcome.adjustment(),
                outcome.recipe.base_grind,
                outcome.recipe.base_time_secs,
            ) {
                println!();
                print!(
                    "{}",
                    TextFormatter::format_learning_result(adjustment, grind, time)
                );
            }
            println!();
            print!("{}", TextFormatter::format_status(&outcome.status));
        }

        EngineCommand::Status { method, grinder } => {
            let status = session.learning_status(&LearningKey::new(grinder, method)?);
            print!("{}", TextFormatter::format_status(&status));
        }

        EngineCommand::Export { output } => {
            write_output(output.as_deref(), &session.export_json()?)?;
        }

        EngineCommand::Import { file } => {
            let payload = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            session.import_snapshot(&payload)?;
            println!(
                "Imported {} brews and {} learning profiles",
                session.history().len(),
                session.model().len()
            );
        }

        EngineCommand::Reset { target } => match target {
            ResetTarget::Key { method, grinder } => {
                let key = LearningKey::new(grinder, method)?;
                if session.reset_learning_for(&key)? {
                    println!("Learning reset for {}", key);
                } else {
                    println!("No learning data for {}", key);
                }
            }
            ResetTarget::Learning => {
                session.reset_all_learning()?;
                println!("All learning data reset");
            }
            ResetTarget::History => {
                session.reset_history()?;
                println!("Brew history cleared");
            }
            ResetTarget::All => {
                session.reset_everything()?;
                println!("All data cleared");
            }
        },

        EngineCommand::Privacy { consent, share } => {
            session.set_privacy(consent, share)?;
            if consent && share {
                println!("Thank you! Anonymized brew data will be collected for research.");
            } else if consent {
                println!("Consent recorded. Brew data will not be shared.");
            } else {
                println!("Consent revoked. Brew data will not be shared.");
            }
        }

        EngineCommand::Stats { json } => {
            let stats = session.admin_stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print!("{}", TextFormatter::format_admin_stats(&stats));
            }
        }

        EngineCommand::AdminExport { output } => {
            let json = serde_json::to_string_pretty(&session.admin_export())?;
            write_output(output.as_deref(), &json)?;
        }

        EngineCommand::ProfileCheck { machine, profile } => {
            let result = pressure::evaluate(&machine, &profile);
            print!(
                "{}",
                TextFormatter::format_compatibility(&machine, &profile, &result)
            );
        }

        EngineCommand::Catalog { user_type } => {
            println!("Brew methods:");
            for method in catalog::methods() {
                if let Some(rec) = catalog::recommendation(method) {
                    println!(
                        "  {:<16} dose {:<8} yield {:<10} time {:<14} grind {}",
                        method, rec.dose, rec.yield_, rec.time, rec.grind
                    );
                }
            }
            println!("\nGrinders with baseline settings:");
            for grinder in catalog::calibrated_grinders() {
                println!("  {}", grinder);
            }
            println!("\nGrinders ({}):", user_type);
            for grinder in catalog::grinders_for(user_type) {
                println!("  {}", grinder);
            }
            let machines = catalog::espresso_machines_for(user_type);
            if !machines.is_empty() {
                println!("\nEspresso machines:");
                for machine in machines {
                    println!("  {}", machine);
                }
            }
            println!("\nPressure profiles:");
            for (id, label) in pressure::profiles() {
                println!("  {:<22} {}", id, label);
            }
            println!("\nProfile-capable machines:");
            for id in pressure::machine_ids() {
                println!("  {}", id);
            }
        }
    }

    Ok(())
}
