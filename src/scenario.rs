use crate::common::Cell;
use crate::map::Map;

use anyhow::{anyhow, bail, Context, Result};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Route {
    pub start: Cell,
    pub goal: Cell,
}

#[derive(Debug, Default)]
pub struct Scenario {
    pub map: String,
    pub map_width: usize,
    pub map_height: usize,
    pub buckets: BTreeMap<usize, Vec<Route>>,
}

impl Scenario {
    /// Load a MovingAI `.scen` file. Columns are bucket, map, width, height,
    /// start x, start y, goal x, goal y and the optimal length.
    pub fn load_from_scen(path: &str) -> Result<Scenario> {
        let file = File::open(path).with_context(|| format!("opening scenario {path}"))?;
        let mut lines = BufReader::new(file).lines();

        // "version x"
        let _version = lines
            .next()
            .ok_or_else(|| anyhow!("scenario {path} is empty"))??;

        let mut scenario = Scenario::default();
        for (number, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 8 {
                bail!("{path}:{}: expected at least 8 columns, found {}", number + 2, parts.len());
            }
            let field = |i: usize| -> Result<i32> {
                parts[i]
                    .parse::<i32>()
                    .with_context(|| format!("{path}:{}: bad column {i}", number + 2))
            };

            let bucket = field(0)? as usize;
            let route = Route {
                start: Cell::new(field(4)?, field(5)?),
                goal: Cell::new(field(6)?, field(7)?),
            };

            if scenario.map.is_empty() {
                scenario.map = parts[1].to_string();
                scenario.map_width = field(2)? as usize;
                scenario.map_height = field(3)? as usize;
            }
            scenario.buckets.entry(bucket).or_default().push(route);
        }

        debug!("loaded {} routes from {path}", scenario.len());
        Ok(scenario)
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First `num_routes` routes in bucket order.
    pub fn routes(&self, num_routes: usize) -> Vec<Route> {
        self.buckets
            .values()
            .flatten()
            .copied()
            .take(num_routes)
            .collect()
    }

    /// `num_routes` distinct routes picked at random from all buckets.
    pub fn choose_routes<R: Rng + ?Sized>(&self, num_routes: usize, rng: &mut R) -> Result<Vec<Route>> {
        let mut available: Vec<Route> = self.buckets.values().flatten().copied().collect();
        if available.len() < num_routes {
            bail!(
                "scenario has {} routes, {num_routes} requested",
                available.len()
            );
        }
        available.shuffle(rng);
        available.truncate(num_routes);
        info!("chose {} routes", available.len());
        Ok(available)
    }
}

/// Random routes between passable cells of `map`.
pub fn generate_routes_randomly<R: Rng>(
    map: &Map,
    num_routes: usize,
    rng: &mut R,
) -> Result<Vec<Route>> {
    let passable: Vec<Cell> = (0..map.height as i32)
        .flat_map(|z| (0..map.width as i32).map(move |x| Cell::new(x, z)))
        .filter(|&cell| map.is_passable(cell))
        .collect();
    if passable.is_empty() {
        bail!("map {} has no passable cells", map.id);
    }

    let mut routes = Vec::with_capacity(num_routes);
    for _ in 0..num_routes {
        let start = passable[rng.gen_range(0..passable.len())];
        let goal = passable[rng.gen_range(0..passable.len())];
        routes.push(Route { start, goal });
    }
    info!("generated {} random routes", routes.len());
    Ok(routes)
}
