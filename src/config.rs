use crate::common::{AgentKind, EndMode, TraverseMode};
use crate::pathfinder::{CostTuning, SearchLimits};

use anyhow::{anyhow, Context};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(
    name = "grid_pathing",
    about = "Run path requests over a grid map and report the results.",
    version = "1.0"
)]
pub struct Cli {
    #[arg(long, help = "Path to a YAML config file")]
    pub config: Option<String>,

    #[arg(long, help = "Path to the map file")]
    pub map_path: Option<String>,

    #[arg(long, help = "Path to the scenario file; random routes are used without one")]
    pub scen_path: Option<String>,

    #[arg(long, help = "Path to the JSON lines output file")]
    pub output_path: Option<String>,

    #[arg(long, help = "Number of routes to run")]
    pub num_routes: Option<usize>,

    #[arg(long, help = "Seed for the random number generator")]
    pub seed: Option<u64>,

    #[arg(long, value_enum, help = "Traverse mode for every request")]
    pub mode: Option<TraverseMode>,

    #[arg(long, value_enum, help = "End mode for every request")]
    pub end_mode: Option<EndMode>,

    #[arg(long, value_enum, help = "Kind of agent issuing the requests")]
    pub agent_kind: Option<AgentKind>,

    #[arg(long, help = "Hard limit on expanded nodes per search phase")]
    pub max_expansions: Option<usize>,

    #[arg(long, help = "Debug: let every request dig through walls", default_value_t = false)]
    pub path_through_walls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub map_path: String,
    pub scen_path: Option<String>,
    pub output_path: String,
    pub num_routes: usize,
    pub seed: u64,
    pub mode: TraverseMode,
    pub end_mode: EndMode,
    // Requests carry no agent when unset.
    pub agent_kind: Option<AgentKind>,
    pub path_through_walls: bool,
    pub limits: SearchLimits,
    pub tuning: CostTuning,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            map_path: "map_file/test/test.map".to_string(),
            scen_path: None,
            output_path: "result/result.jsonl".to_string(),
            num_routes: 10,
            seed: 0,
            mode: TraverseMode::PassDoors,
            end_mode: EndMode::OnCell,
            agent_kind: None,
            path_through_walls: false,
            limits: SearchLimits::default(),
            tuning: CostTuning::default(),
        }
    }
}

impl Config {
    pub fn new(cli: &Cli) -> anyhow::Result<Self> {
        Config::default().override_from_command_line(cli)
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(yaml).context("parsing config yaml")?;
        config.validate()?;
        Ok(config)
    }

    pub fn override_from_command_line(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(map_path) = &cli.map_path {
            self.map_path = map_path.clone();
        }
        if let Some(scen_path) = &cli.scen_path {
            self.scen_path = Some(scen_path.clone());
        }
        if let Some(output_path) = &cli.output_path {
            self.output_path = output_path.clone();
        }
        if let Some(num_routes) = cli.num_routes {
            self.num_routes = num_routes;
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if let Some(mode) = cli.mode {
            self.mode = mode;
        }
        if let Some(end_mode) = cli.end_mode {
            self.end_mode = end_mode;
        }
        if let Some(agent_kind) = cli.agent_kind {
            self.agent_kind = Some(agent_kind);
        }
        if let Some(max_expansions) = cli.max_expansions {
            self.limits.max_expansions = max_expansions;
        }
        self.path_through_walls |= cli.path_through_walls;

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.mode == TraverseMode::ByAgent && self.agent_kind.is_none() {
            return Err(anyhow!("traverse mode by_agent needs an agent_kind"));
        }
        if self.limits.default_ticks_cardinal <= 0 || self.limits.default_ticks_diagonal <= 0 {
            return Err(anyhow!(
                "move ticks must be positive, got {}/{}",
                self.limits.default_ticks_cardinal,
                self.limits.default_ticks_diagonal
            ));
        }
        if self.limits.reopen_tolerance_moves < 0 {
            return Err(anyhow!(
                "reopen tolerance must not be negative, got {}",
                self.limits.reopen_tolerance_moves
            ));
        }
        if self.limits.animal_heuristic_strength < 1.0 {
            return Err(anyhow!(
                "animal heuristic strength must be at least 1.0, got {}",
                self.limits.animal_heuristic_strength
            ));
        }
        if self.tuning.cost_blocked_wall_extra_per_hit_point < 0.0
            || self.tuning.cost_blocked_door_per_hit_point < 0.0
        {
            return Err(anyhow!("per hit point costs must not be negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_cli() -> Cli {
        Cli::parse_from(["grid_pathing"])
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let config = Config::from_yaml_str(
            "seed: 7\nmode: no_pass_closed_doors_or_water\nlimits:\n  max_expansions: 500\ntuning:\n  cost_blocked_door: 80\n",
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.mode, TraverseMode::NoPassClosedDoorsOrWater);
        assert_eq!(config.limits.max_expansions, 500);
        assert_eq!(config.limits.escalation_threshold, 2000);
        assert_eq!(config.tuning.cost_blocked_door, 80);
        assert_eq!(config.tuning.cost_blocked_wall_base, 70);
    }

    #[test]
    fn test_command_line_wins() {
        let cli = Cli::parse_from([
            "grid_pathing",
            "--max-expansions",
            "42",
            "--mode",
            "pass-all-destroyable-things",
            "--path-through-walls",
        ]);
        let config = Config::from_yaml_str("limits:\n  max_expansions: 500\n")
            .unwrap()
            .override_from_command_line(&cli)
            .unwrap();
        assert_eq!(config.limits.max_expansions, 42);
        assert_eq!(config.mode, TraverseMode::PassAllDestroyableThings);
        assert!(config.path_through_walls);
    }

    #[test]
    fn test_validate() {
        assert!(Config::new(&empty_cli()).is_ok());
        assert!(Config::from_yaml_str("mode: by_agent\n").is_err());
        assert!(Config::from_yaml_str("mode: by_agent\nagent_kind: animal\n").is_ok());
        assert!(Config::from_yaml_str("limits:\n  default_ticks_cardinal: 0\n").is_err());
        assert!(Config::from_yaml_str("not: [valid").is_err());
    }
}
