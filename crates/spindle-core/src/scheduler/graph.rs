//! Dependency graph used to validate a request's tasks before they run.
//!
//! Edges point from a task to the tasks it depends on (waits for). Waking
//! dependents is the notifier's job, so no reverse edges are kept here.
//!
//! Ordered maps keep cycle reports deterministic across runs.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::domain::TaskName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Not visited yet.
    White,
    /// On the current DFS path.
    Gray,
    /// Fully explored.
    Black,
}

#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// task -> tasks it depends on (waits for)
    edges: BTreeMap<TaskName, BTreeSet<TaskName>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node without dependencies (no-op if it already exists).
    pub fn add_task(&mut self, task: TaskName) {
        self.edges.entry(task).or_default();
    }

    /// Add a dependency: `task` depends on `depends_on`.
    ///
    /// Example: add_dependency(b, a) means "B waits for A"
    pub fn add_dependency(&mut self, task: TaskName, depends_on: TaskName) {
        self.edges.entry(task).or_default().insert(depends_on);
    }

    /// Detect a cycle with a three-colour DFS.
    ///
    /// Returns the first cycle found as a path that starts and ends with the
    /// same task (`a -> b -> a`), or `None` if the graph is a DAG. Diamonds
    /// and converging paths are not cycles: a node reached twice is only a
    /// cycle when it is still on the current path (gray).
    pub fn detect_cycle(&self) -> Option<Vec<TaskName>> {
        let mut colors: HashMap<&TaskName, Color> = HashMap::new();
        let mut path: Vec<&TaskName> = Vec::new();

        for start in self.edges.keys() {
            if color_of(&colors, start) == Color::White
                && let Some(cycle) = self.visit(start, &mut colors, &mut path)
            {
                return Some(cycle);
            }
        }
        None
    }

    fn visit<'a>(
        &'a self,
        node: &'a TaskName,
        colors: &mut HashMap<&'a TaskName, Color>,
        path: &mut Vec<&'a TaskName>,
    ) -> Option<Vec<TaskName>> {
        colors.insert(node, Color::Gray);
        path.push(node);

        if let Some(deps) = self.edges.get(node) {
            for dep in deps {
                match color_of(colors, dep) {
                    Color::Gray => {
                        let from = path.iter().position(|n| *n == dep).unwrap_or(0);
                        let mut cycle: Vec<TaskName> =
                            path[from..].iter().map(|n| (*n).clone()).collect();
                        cycle.push(dep.clone());
                        return Some(cycle);
                    }
                    Color::White => {
                        if let Some(cycle) = self.visit(dep, colors, path) {
                            return Some(cycle);
                        }
                    }
                    Color::Black => {}
                }
            }
        }

        path.pop();
        colors.insert(node, Color::Black);
        None
    }
}

fn color_of(colors: &HashMap<&TaskName, Color>, node: &TaskName) -> Color {
    colors.get(node).copied().unwrap_or(Color::White)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(name: &str) -> TaskName {
        TaskName::from(name)
    }

    #[test]
    fn new_graph_is_empty() {
        let graph = DependencyGraph::new();
        assert!(graph.detect_cycle().is_none());
    }

    #[test]
    fn isolated_tasks_are_not_a_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_task(t("a"));
        graph.add_task(t("b"));
        // C depends on both A and B
        graph.add_dependency(t("c"), t("a"));
        graph.add_dependency(t("c"), t("b"));

        assert!(graph.detect_cycle().is_none());
    }

    #[test]
    fn detect_simple_cycle() {
        let mut graph = DependencyGraph::new();
        // A -> B -> A
        graph.add_dependency(t("a"), t("b"));
        graph.add_dependency(t("b"), t("a"));

        let cycle = graph.detect_cycle().expect("cycle");
        assert_eq!(cycle, vec![t("a"), t("b"), t("a")]);
    }

    #[test]
    fn detect_self_dependency() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(t("a"), t("a"));

        assert_eq!(graph.detect_cycle(), Some(vec![t("a"), t("a")]));
    }

    #[test]
    fn detect_longer_cycle() {
        let mut graph = DependencyGraph::new();
        // A -> B -> C -> D -> B (cycle: B -> C -> D -> B)
        graph.add_dependency(t("b"), t("a"));
        graph.add_dependency(t("c"), t("b"));
        graph.add_dependency(t("d"), t("c"));
        graph.add_dependency(t("b"), t("d"));

        let cycle = graph.detect_cycle().expect("cycle");
        assert_eq!(cycle.first(), cycle.last());
        assert!(!cycle.contains(&t("a")));
        assert_eq!(cycle.len(), 4);
    }

    #[test]
    fn chain_is_not_a_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(t("b"), t("a"));
        graph.add_dependency(t("c"), t("b"));

        assert!(graph.detect_cycle().is_none());
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let mut graph = DependencyGraph::new();
        // A -> B -> C, A -> C
        graph.add_dependency(t("b"), t("a"));
        graph.add_dependency(t("c"), t("b"));
        graph.add_dependency(t("c"), t("a"));

        assert!(graph.detect_cycle().is_none(), "diamond DAG should not have cycles");
    }

    #[test]
    fn complex_dag_with_cross_edges() {
        let mut graph = DependencyGraph::new();
        //     A
        //    / \
        //   B   C
        //   |\ /|
        //   | X |
        //   |/ \|
        //   D   E
        graph.add_dependency(t("b"), t("a"));
        graph.add_dependency(t("c"), t("a"));
        graph.add_dependency(t("d"), t("b"));
        graph.add_dependency(t("e"), t("b"));
        graph.add_dependency(t("d"), t("c"));
        graph.add_dependency(t("e"), t("c"));

        assert!(graph.detect_cycle().is_none());
    }
}
