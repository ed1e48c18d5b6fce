use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use reqgraph_layout::io;
use reqgraph_layout::layout::{LayoutController, LifecycleState, SimulationConfig};

/// Headless runner for the knowledge-graph layout engine.
#[derive(Parser)]
#[command(name = "reqgraph-layout")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lay out a topology and write the final positions
    Layout {
        /// Topology file (.json, .yaml)
        #[arg(short, long)]
        topology: PathBuf,

        /// Simulation configuration file (.json, .yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file for positions (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Upper bound on simulation steps
        #[arg(long, default_value = "20000")]
        max_steps: usize,
    },
    /// Validate a configuration file
    CheckConfig {
        /// Simulation configuration file (.json, .yaml)
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn layout(
    topology: &Path,
    config: Option<&Path>,
    output: Option<&Path>,
    max_steps: usize,
) -> anyhow::Result<()> {
    let config = match config {
        Some(path) => io::load_config(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    let topology = io::load_topology(topology)
        .with_context(|| format!("loading topology {}", topology.display()))?;

    let mut controller = LayoutController::with_config(config)?;
    controller.apply_topology(&topology);
    let steps = controller.run_to_convergence(max_steps);

    if controller.state() != LifecycleState::Converged {
        tracing::warn!(
            steps,
            temperature = controller.temperature(),
            "step limit reached before convergence"
        );
    }
    info!(steps, state = %controller.state(), "layout finished");

    let positions = controller.positions();
    match output {
        Some(path) => {
            io::write_positions(&positions, path)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(nodes = positions.len(), output = %path.display(), "positions written");
        }
        None => println!("{}", io::positions_to_json(&positions)?),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Layout {
            topology,
            config,
            output,
            max_steps,
        } => {
            layout(&topology, config.as_deref(), output.as_deref(), max_steps)?;
        }
        Commands::CheckConfig { config } => {
            io::load_config(&config).with_context(|| format!("checking {}", config.display()))?;
            println!("{}: configuration OK", config.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_layout_with_defaults() {
        let cli =
            Cli::try_parse_from(["reqgraph-layout", "layout", "--topology", "g.json"]).unwrap();
        match cli.command {
            Commands::Layout {
                topology,
                config,
                output,
                max_steps,
            } => {
                assert_eq!(topology, PathBuf::from("g.json"));
                assert!(config.is_none());
                assert!(output.is_none());
                assert_eq!(max_steps, 20000);
            }
            _ => panic!("Expected Layout command"),
        }
    }

    #[test]
    fn cli_parses_check_config() {
        let cli =
            Cli::try_parse_from(["reqgraph-layout", "check-config", "-c", "layout.yaml"]).unwrap();
        match cli.command {
            Commands::CheckConfig { config } => {
                assert_eq!(config, PathBuf::from("layout.yaml"));
            }
            _ => panic!("Expected CheckConfig command"),
        }
    }

    #[test]
    fn cli_requires_a_subcommand() {
        assert!(Cli::try_parse_from(["reqgraph-layout"]).is_err());
    }
}
