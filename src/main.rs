use grid_pathing::common::{Agent, AgentKind, Cell, Target, TraverseParms};
use grid_pathing::config::{Cli, Config};
use grid_pathing::map::Map;
use grid_pathing::pathfinder::{PathFailure, PathFinder, SearchStats};
use grid_pathing::scenario::{generate_routes_randomly, Route, Scenario};
use grid_pathing::stat::Stats;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path as FsPath;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize)]
struct RouteResult<'a> {
    route: Route,
    cost: Option<i32>,
    cells: Option<&'a [Cell]>,
    failure: Option<PathFailure>,
    stats: SearchStats,
}

fn agent_for(kind: AgentKind) -> Agent {
    match kind {
        AgentKind::Animal => Agent::animal(0),
        kind => Agent {
            kind,
            ..Agent::default()
        },
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let config = if let Some(config_file) = cli.config.as_ref() {
        let config_str = fs::read_to_string(config_file)
            .with_context(|| format!("reading config file: {config_file}"))?;
        Config::from_yaml_str(&config_str)
            .with_context(|| format!("error with config file: {config_file}"))?
    } else {
        info!("No config file specified, using default config");
        Config::default()
    }
    .override_from_command_line(&cli)?;

    let map = Map::from_file(0, &config.map_path)?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let routes = match &config.scen_path {
        Some(scen_path) => {
            let scenario = Scenario::load_from_scen(scen_path)?;
            if scenario.len() <= config.num_routes {
                scenario.routes(config.num_routes)
            } else {
                scenario.choose_routes(config.num_routes, &mut rng)?
            }
        }
        None => generate_routes_randomly(&map, config.num_routes, &mut rng)?,
    };

    let parms = match config.agent_kind {
        Some(kind) => TraverseParms::for_agent(agent_for(kind), config.mode),
        None => TraverseParms::for_mode(config.mode),
    };

    let mut finder = PathFinder::new(config.limits.clone());
    finder.set_path_through_walls(config.path_through_walls);

    if let Some(parent) = FsPath::new(&config.output_path).parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    let output = File::create(&config.output_path)
        .with_context(|| format!("creating output file {}", config.output_path))?;
    let mut writer = BufWriter::new(output);

    let mut stats = Stats::default();
    for route in routes {
        let timer = Instant::now();
        let outcome = finder.search(
            &map,
            route.start,
            Target::Cell(route.goal),
            &parms,
            config.end_mode,
            Some(&config.tuning),
        );
        let elapsed = timer.elapsed().as_micros();
        let search_stats = finder.last_stats();
        stats.record(outcome.as_ref().map(|path| path.cost).map_err(|e| *e), search_stats, elapsed);

        let result = RouteResult {
            route,
            cost: outcome.as_ref().ok().map(|path| path.cost),
            cells: outcome.as_ref().ok().map(|path| path.cells.as_slice()),
            failure: outcome.as_ref().err().copied(),
            stats: search_stats,
        };
        serde_json::to_writer(&mut writer, &result)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    stats.print();
    Ok(())
}
