//! SIR-style virus spread over a random network.

use petgraph::graph::{NodeIndex, UnGraph};
use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::{IndexedRandom, SliceRandom};
use simcanvas_core::{
    DataCollector, Entity, EntityId, Model, ModelError, ParamValue, Params, ParamsExt,
};
use tracing::debug;

use crate::{positive, seeded_rng, unit_interval};

pub const SERIES: [&str; 3] = ["Susceptible", "Infected", "Resistant"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Susceptible,
    Infected,
    Resistant,
}

impl NodeState {
    /// Categorical color key.
    pub fn code(self) -> i64 {
        match self {
            NodeState::Susceptible => 0,
            NodeState::Infected => 1,
            NodeState::Resistant => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirusAgent {
    pub node: usize,
    pub state: NodeState,
}

impl Entity for VirusAgent {
    fn entity_id(&self) -> EntityId {
        EntityId(self.node as u64)
    }
}

pub struct VirusOnNetwork {
    graph: UnGraph<(), ()>,
    agents: Vec<VirusAgent>,
    avg_node_degree: f64,
    virus_spread_chance: f64,
    virus_check_frequency: f64,
    recovery_chance: f64,
    gain_resistance_chance: f64,
    seed: u64,
    rng: SmallRng,
    collector: DataCollector,
}

impl VirusOnNetwork {
    pub fn graph(&self) -> &UnGraph<(), ()> {
        &self.graph
    }

    pub fn agents(&self) -> &[VirusAgent] {
        &self.agents
    }

    pub fn count(&self, state: NodeState) -> usize {
        self.agents.iter().filter(|a| a.state == state).count()
    }

    /// Resistant per susceptible node; `None` when nobody is susceptible.
    pub fn resistant_susceptible_ratio(&self) -> Option<f64> {
        let susceptible = self.count(NodeState::Susceptible);
        (susceptible > 0)
            .then(|| self.count(NodeState::Resistant) as f64 / susceptible as f64)
    }

    fn collect(&mut self) {
        let counts = [
            NodeState::Susceptible,
            NodeState::Infected,
            NodeState::Resistant,
        ]
        .map(|s| self.count(s) as f64);
        for (name, value) in SERIES.iter().zip(counts) {
            self.collector.record(name, value);
        }
    }

    fn spread_from(&mut self, node: usize) {
        let neighbors: Vec<usize> = self
            .graph
            .neighbors(NodeIndex::new(node))
            .map(NodeIndex::index)
            .collect();
        for n in neighbors {
            if self.agents[n].state == NodeState::Susceptible
                && self.rng.random::<f64>() < self.virus_spread_chance
            {
                self.agents[n].state = NodeState::Infected;
            }
        }
    }

    fn check_situation(&mut self, node: usize) {
        if self.rng.random::<f64>() >= self.virus_check_frequency {
            return;
        }
        if self.agents[node].state != NodeState::Infected {
            return;
        }
        if self.rng.random::<f64>() < self.recovery_chance {
            self.agents[node].state = if self.rng.random::<f64>() < self.gain_resistance_chance {
                NodeState::Resistant
            } else {
                NodeState::Susceptible
            };
        }
    }
}

/// Erdős–Rényi graph with edge probability `p`.
fn random_graph(nodes: usize, p: f64, rng: &mut SmallRng) -> UnGraph<(), ()> {
    let mut graph = UnGraph::with_capacity(nodes, 0);
    let indices: Vec<NodeIndex> = (0..nodes).map(|_| graph.add_node(())).collect();
    for (i, &a) in indices.iter().enumerate() {
        for &b in &indices[i + 1..] {
            if rng.random::<f64>() < p {
                graph.add_edge(a, b, ());
            }
        }
    }
    graph
}

impl Model for VirusOnNetwork {
    fn from_params(params: &Params) -> Result<Self, ModelError> {
        let num_nodes = positive(params, "num_nodes", 10)?;
        let avg_node_degree = params.f64_or("avg_node_degree", 3.0)?;
        let outbreak = params.usize_or("initial_outbreak_size", 1)?.min(num_nodes);
        let (seed, mut rng) = seeded_rng(params)?;

        let probability = (avg_node_degree / num_nodes as f64).clamp(0.0, 1.0);
        let graph = random_graph(num_nodes, probability, &mut rng);
        let mut agents: Vec<VirusAgent> = (0..num_nodes)
            .map(|node| VirusAgent {
                node,
                state: NodeState::Susceptible,
            })
            .collect();
        let nodes: Vec<usize> = (0..num_nodes).collect();
        for &node in nodes.choose_multiple(&mut rng, outbreak) {
            agents[node].state = NodeState::Infected;
        }

        let mut model = Self {
            graph,
            agents,
            avg_node_degree,
            virus_spread_chance: unit_interval(params, "virus_spread_chance", 0.4)?,
            virus_check_frequency: unit_interval(params, "virus_check_frequency", 0.4)?,
            recovery_chance: unit_interval(params, "recovery_chance", 0.3)?,
            gain_resistance_chance: unit_interval(params, "gain_resistance_chance", 0.5)?,
            seed,
            rng,
            collector: DataCollector::with_series(SERIES),
        };
        model.collect();
        debug!(
            nodes = num_nodes,
            edges = model.graph.edge_count(),
            outbreak,
            "virus network built"
        );
        Ok(model)
    }

    fn step(&mut self) {
        let mut order: Vec<usize> = (0..self.agents.len()).collect();
        order.shuffle(&mut self.rng);
        for node in order {
            if self.agents[node].state == NodeState::Infected {
                self.spread_from(node);
            }
            self.check_situation(node);
        }
        self.collect();
    }

    fn attribute(&self, name: &str) -> Option<ParamValue> {
        let value = match name {
            "avg_node_degree" => ParamValue::Float(self.avg_node_degree),
            "virus_spread_chance" => ParamValue::Float(self.virus_spread_chance),
            "virus_check_frequency" => ParamValue::Float(self.virus_check_frequency),
            "recovery_chance" => ParamValue::Float(self.recovery_chance),
            "gain_resistance_chance" => ParamValue::Float(self.gain_resistance_chance),
            "Susceptible" => ParamValue::from(self.count(NodeState::Susceptible)),
            "Infected" => ParamValue::from(self.count(NodeState::Infected)),
            "Resistant" => ParamValue::from(self.count(NodeState::Resistant)),
            "resistant_susceptible_ratio" => match self.resistant_susceptible_ratio() {
                Some(ratio) => ParamValue::Float(ratio),
                None => ParamValue::Float(f64::INFINITY),
            },
            _ => return None,
        };
        Some(value)
    }

    fn set_attribute(&mut self, name: &str, value: &ParamValue) -> bool {
        let Some(v) = value.as_f64() else {
            return false;
        };
        if name == "avg_node_degree" {
            self.avg_node_degree = v;
            return true;
        }
        let v = v.clamp(0.0, 1.0);
        match name {
            "virus_spread_chance" => self.virus_spread_chance = v,
            "virus_check_frequency" => self.virus_check_frequency = v,
            "recovery_chance" => self.recovery_chance = v,
            "gain_resistance_chance" => self.gain_resistance_chance = v,
            _ => return false,
        }
        true
    }

    fn collector(&self) -> Option<&DataCollector> {
        Some(&self.collector)
    }

    fn seed(&self) -> Option<u64> {
        Some(self.seed)
    }
}
