use clap::{Parser, Subcommand};
use serde_json::json;

use machina_rs::analysis::Analyzer;
use machina_rs::engine::{Engine, EngineConfig, PathStatus};
use machina_rs::expr::{self, VariableContext};
use machina_rs::machine::MachineLoader;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a machine definition and print the analysis report
    Validate {
        /// Path to the machine definition file
        #[arg(short, long)]
        file: String,
    },
    /// Execute a machine and print the final snapshot
    Run {
        /// Path to the machine definition file
        #[arg(short, long)]
        file: String,

        /// Entry node (defaults to the first init node)
        #[arg(short, long)]
        entry: Option<String>,

        /// Maximum number of engine ticks
        #[arg(long, default_value_t = 1000)]
        max_ticks: u32,

        /// Per-node invocation ceiling per path
        #[arg(long, default_value_t = 100)]
        max_visits: u32,
    },
    /// Evaluate a guard expression against a JSON context
    Eval {
        /// The expression to evaluate
        expr: String,

        /// Context as a JSON object
        #[arg(short, long, default_value = "{}")]
        context: String,
    },
    /// Resolve {{...}} template spans against a JSON context
    Template {
        /// The template text
        text: String,

        /// Context as a JSON object
        #[arg(short, long, default_value = "{}")]
        context: String,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Validate { file } => {
            let machine = MachineLoader::new().load(&file)?;
            let analyzer = Analyzer::new(&machine);
            let report = analyzer.validate();

            println!("{}: {}", machine.name(), report.summary());
            println!("  entry points: {:?}", analyzer.entry_points());
            println!("  exit points:  {:?}", analyzer.exit_points());
            if !report.unreachable.is_empty() {
                println!("  unreachable:  {:?}", report.unreachable);
            }
            if !report.orphaned.is_empty() {
                println!("  orphaned:     {:?}", report.orphaned);
            }
            for cycle in &report.cycles {
                println!("  cycle: {}", cycle.join(" -> "));
            }
            for warning in &report.warnings {
                println!("  warning: {}", warning);
            }
            if !report.valid {
                std::process::exit(1);
            }
        }
        Commands::Run {
            file,
            entry,
            max_ticks,
            max_visits,
        } => {
            let machine = MachineLoader::new().load(&file)?;
            let config = EngineConfig {
                invocation_ceiling: max_visits,
                ..Default::default()
            };
            let mut engine = Engine::with_config(machine, config);

            engine.start(entry.as_deref())?;
            let ticks = engine.run(max_ticks)?;
            log::info!("Engine settled after {} tick(s)", ticks);

            for path in engine.paths() {
                let status = match path.status {
                    PathStatus::Completed => "completed".to_string(),
                    PathStatus::Waiting => "waiting".to_string(),
                    PathStatus::Active => "active".to_string(),
                    PathStatus::Failed => match &path.failure {
                        Some(reason) => format!("failed: {}", reason),
                        None => "failed".to_string(),
                    },
                };
                println!(
                    "path {} at '{}' ({} transitions): {}",
                    path.id,
                    path.current_node,
                    path.history.len(),
                    status
                );
            }
            println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
        }
        Commands::Eval { expr, context } => {
            let ctx = VariableContext::from_value(serde_json::from_str(&context)?);
            let result = expr::evaluate_condition(&expr, &ctx)?;
            println!("{}", json!(result));
        }
        Commands::Template { text, context } => {
            let ctx = VariableContext::from_value(serde_json::from_str(&context)?);
            println!("{}", expr::resolve_template(&text, &ctx));
        }
    }

    Ok(())
}
