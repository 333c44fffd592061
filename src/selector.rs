//! Weighted random task selection.
//!
//! Each call picks a task with probability `weight / total_weight`,
//! independently of previous picks. There is no round-robin fallback and no
//! starvation avoidance.

use crate::errors::ConfigError;
use crate::task::Task;
use rand::Rng;

/// Task selector backed by a cumulative weight table.
///
/// # Example
/// ```
/// use shop_loadtest::classifier::Classifier;
/// use shop_loadtest::selector::TaskSelector;
/// use shop_loadtest::task::Task;
///
/// let selector = TaskSelector::new(vec![
///     Task::new("browse", 3, "/products", Classifier::HealthCheck),
///     Task::new("health", 1, "/health", Classifier::HealthCheck),
/// ])
/// .unwrap();
///
/// let task = selector.select();
/// // 75% chance of "browse", 25% chance of "health"
/// # assert!(task.name == "browse" || task.name == "health");
/// ```
#[derive(Debug, Clone)]
pub struct TaskSelector {
    tasks: Vec<Task>,
    cumulative_weights: Vec<u64>,
    total_weight: u64,
}

impl TaskSelector {
    /// Build a selector from a task list.
    ///
    /// Tasks with weight 0 are kept (they show up in `probabilities()`) but can
    /// never be selected.
    ///
    /// # Errors
    /// [`ConfigError::NoTasks`] for an empty list and
    /// [`ConfigError::ZeroTotalWeight`] when every weight is 0.
    pub fn new(tasks: Vec<Task>) -> Result<Self, ConfigError> {
        if tasks.is_empty() {
            return Err(ConfigError::NoTasks);
        }

        let mut cumulative = Vec::with_capacity(tasks.len());
        let mut sum: u64 = 0;
        for task in &tasks {
            sum += u64::from(task.weight);
            cumulative.push(sum);
        }

        if sum == 0 {
            let names: Vec<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
            return Err(ConfigError::ZeroTotalWeight(names.join(", ")));
        }

        Ok(Self {
            tasks,
            cumulative_weights: cumulative,
            total_weight: sum,
        })
    }

    /// Select a task using the thread-local RNG.
    pub fn select(&self) -> &Task {
        self.select_with(&mut rand::thread_rng())
    }

    /// Select a task using the given RNG.
    pub fn select_with<R: Rng>(&self, rng: &mut R) -> &Task {
        let point = rng.gen_range(0..self.total_weight);
        &self.tasks[self.index_for(point)]
    }

    /// Maps a point in `[0, total_weight)` to the owning task index.
    ///
    /// The first cumulative weight strictly greater than `point` wins, so a
    /// zero-weight task (equal cumulative weight to its predecessor) is never hit.
    fn index_for(&self, point: u64) -> usize {
        self.cumulative_weights.partition_point(|&w| w <= point)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Selection probability of each task, in registration order.
    pub fn probabilities(&self) -> Vec<(String, f64)> {
        self.tasks
            .iter()
            .map(|t| {
                (
                    t.name.clone(),
                    f64::from(t.weight) / self.total_weight as f64,
                )
            })
            .collect()
    }
}
