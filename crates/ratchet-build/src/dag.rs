//! Build graph construction

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::{info, instrument};

use crate::kind::TaskKind;
use crate::options::BuildOptions;
use crate::reporter::BuildReporter;
use crate::subject::Subject;
use crate::task::BuildTask;

/// A subject declaration waiting to be wired into the graph
pub struct BuildNode {
    /// Subject to build
    pub subject: Subject,
    /// How to build it
    pub kind: Box<dyn TaskKind>,
    /// Names of the subjects it depends on, in order
    pub deps: Vec<String>,
}

impl BuildNode {
    /// Create a node
    pub fn new(subject: Subject, kind: Box<dyn TaskKind>, deps: Vec<String>) -> Self {
        Self {
            subject,
            kind,
            deps,
        }
    }
}

/// Directed acyclic graph of build tasks
#[derive(Debug)]
pub struct BuildGraph {
    /// Tasks in topological order
    sorted: Vec<Arc<BuildTask>>,
    /// Subject name to index in `sorted`
    index: HashMap<String, usize>,
    /// Indices grouped by execution wave (wave 0 runs first)
    waves: Vec<Vec<usize>>,
}

impl BuildGraph {
    /// Wire nodes into build tasks.
    ///
    /// Dependencies are always constructed before their dependents. Among
    /// independent subjects, declaration order is preserved.
    #[instrument(skip_all, fields(nodes = nodes.len()))]
    pub fn build(
        nodes: Vec<BuildNode>,
        options: Arc<BuildOptions>,
        reporter: Arc<dyn BuildReporter>,
    ) -> Result<Self, GraphError> {
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (i, node) in nodes.iter().enumerate() {
            if positions.insert(node.subject.name.clone(), i).is_some() {
                return Err(GraphError::DuplicateSubject(node.subject.name.clone()));
            }
        }

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        let mut in_degree: Vec<usize> = vec![0; nodes.len()];
        for (i, node) in nodes.iter().enumerate() {
            for dep in &node.deps {
                let d = *positions
                    .get(dep)
                    .ok_or_else(|| GraphError::UnknownDependency {
                        subject: node.subject.name.clone(),
                        dependency: dep.clone(),
                    })?;
                dependents[d].push(i);
                in_degree[i] += 1;
            }
        }

        let order = Self::topological_sort(&nodes, &dependents, in_degree)?;
        let waves_of = Self::compute_waves(&nodes, &positions, &order);

        let mut slots: Vec<Option<BuildNode>> = nodes.into_iter().map(Some).collect();
        let mut sorted: Vec<Arc<BuildTask>> = Vec::with_capacity(order.len());
        let mut index: HashMap<String, usize> = HashMap::new();

        for &i in &order {
            let Some(node) = slots[i].take() else {
                continue;
            };
            let deps = node
                .deps
                .iter()
                .filter_map(|name| index.get(name).map(|&j| sorted[j].clone()))
                .collect();
            let task = BuildTask::new(
                node.subject,
                node.kind,
                deps,
                options.clone(),
                reporter.clone(),
            );
            index.insert(task.name().to_string(), sorted.len());
            sorted.push(Arc::new(task));
        }

        let wave_count = waves_of.iter().copied().max().map(|w| w + 1).unwrap_or(0);
        let mut waves: Vec<Vec<usize>> = vec![Vec::new(); wave_count];
        for (pos, &i) in order.iter().enumerate() {
            waves[waves_of[i]].push(pos);
        }

        info!(
            task_count = sorted.len(),
            wave_count = waves.len(),
            "build graph built"
        );

        Ok(Self {
            sorted,
            index,
            waves,
        })
    }

    /// Kahn's algorithm, seeded and expanded in declaration order
    fn topological_sort(
        nodes: &[BuildNode],
        dependents: &[Vec<usize>],
        mut in_degree: Vec<usize>,
    ) -> Result<Vec<usize>, GraphError> {
        let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut sorted = Vec::with_capacity(nodes.len());

        while let Some(i) = queue.pop_front() {
            sorted.push(i);
            for &dependent in &dependents[i] {
                in_degree[dependent] = in_degree[dependent].saturating_sub(1);
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if sorted.len() != nodes.len() {
            let cyclic: Vec<&str> = (0..nodes.len())
                .filter(|&i| in_degree[i] > 0)
                .map(|i| nodes[i].subject.name.as_str())
                .collect();
            return Err(GraphError::CyclicDependency(cyclic.join(", ")));
        }

        Ok(sorted)
    }

    /// Wave of each node: one past the deepest dependency
    fn compute_waves(
        nodes: &[BuildNode],
        positions: &HashMap<String, usize>,
        order: &[usize],
    ) -> Vec<usize> {
        let mut wave = vec![0; nodes.len()];
        for &i in order {
            wave[i] = nodes[i]
                .deps
                .iter()
                .filter_map(|d| positions.get(d))
                .map(|&d| wave[d] + 1)
                .max()
                .unwrap_or(0);
        }
        wave
    }

    /// Get a task by subject name
    pub fn get(&self, name: &str) -> Option<&Arc<BuildTask>> {
        self.index.get(name).map(|&i| &self.sorted[i])
    }

    /// Tasks in topological order
    pub fn sorted(&self) -> &[Arc<BuildTask>] {
        &self.sorted
    }

    /// Tasks grouped by execution wave
    pub fn waves(&self) -> impl Iterator<Item = Vec<&Arc<BuildTask>>> + '_ {
        self.waves
            .iter()
            .map(move |wave| wave.iter().map(|&i| &self.sorted[i]).collect())
    }

    /// Number of execution waves
    pub fn wave_count(&self) -> usize {
        self.waves.len()
    }

    /// Get the total number of tasks
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Get a human-readable summary of the execution plan
    pub fn execution_plan(&self) -> String {
        let mut plan = String::new();
        for (i, wave) in self.waves().enumerate() {
            plan.push_str(&format!("Wave {} ({} tasks):\n", i, wave.len()));
            for task in wave {
                let deps: Vec<&str> = task.deps().iter().map(|d| d.name()).collect();
                if deps.is_empty() {
                    plan.push_str(&format!("  {}\n", task));
                } else {
                    plan.push_str(&format!("  {} (after: {})\n", task, deps.join(", ")));
                }
            }
        }
        plan
    }
}

/// Errors during graph construction
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Cyclic dependency detected
    #[error("Cyclic dependency detected among subjects: {0}")]
    CyclicDependency(String),

    /// A dependency names no declared subject
    #[error("Subject '{subject}' depends on unknown subject '{dependency}'")]
    UnknownDependency { subject: String, dependency: String },

    /// Two subjects share a name
    #[error("Subject '{0}' is declared more than once")]
    DuplicateSubject(String),
}
