use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;

/// Nodes that participate in at least one dependency cycle, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle<N>(pub Vec<N>);

impl<N: fmt::Display> fmt::Display for Cycle<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "cycle among [{}]", names.join(", "))
    }
}

/// Directed dependency graph.
///
/// An edge `from -> to` means `from` must complete before `to` starts.
/// Insertion order is remembered so every ordering this type produces is
/// stable for a given construction sequence.
#[derive(Debug, Clone)]
pub struct DependencyGraph<N> {
    /// node -> nodes it depends on
    edges: HashMap<N, Vec<N>>,

    /// node -> nodes that depend on it
    reverse_edges: HashMap<N, Vec<N>>,

    /// Original insertion order (for stable sorting)
    insertion_order: Vec<N>,
    position: HashMap<N, usize>,
}

impl<N> Default for DependencyGraph<N>
where
    N: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self {
            edges: HashMap::new(),
            reverse_edges: HashMap::new(),
            insertion_order: Vec::new(),
            position: HashMap::new(),
        }
    }
}

impl<N> DependencyGraph<N>
where
    N: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Returns false if it was already present.
    pub fn add_node(&mut self, node: N) -> bool {
        if self.position.contains_key(&node) {
            return false;
        }
        self.position.insert(node.clone(), self.insertion_order.len());
        self.edges.insert(node.clone(), Vec::new());
        self.reverse_edges.insert(node.clone(), Vec::new());
        self.insertion_order.push(node);
        true
    }

    /// Add `from -> to` (from must complete before to). Missing nodes are created.
    pub fn add_edge(&mut self, from: N, to: N) {
        self.add_node(from.clone());
        self.add_node(to.clone());

        let deps = self.edges.entry(to.clone()).or_default();
        if deps.contains(&from) {
            return;
        }
        deps.push(from.clone());
        self.reverse_edges.entry(from).or_default().push(to);
    }

    pub fn contains(&self, node: &N) -> bool {
        self.position.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.insertion_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insertion_order.is_empty()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.insertion_order.iter()
    }

    /// Direct dependencies of `node`.
    pub fn direct_dependencies(&self, node: &N) -> &[N] {
        self.edges.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Layered topological sort using Kahn's algorithm.
    ///
    /// Group 0 holds every node without dependencies; group k holds every node
    /// whose dependencies all sit in groups `0..k`. Inside a group nodes keep
    /// insertion order.
    ///
    /// # Time Complexity
    ///
    /// O(V + E) plus the per-group sort.
    pub fn parallel_groups(&self) -> Result<Vec<Vec<N>>, Cycle<N>> {
        let mut in_degree: HashMap<&N, usize> = self
            .insertion_order
            .iter()
            .map(|n| (n, self.direct_dependencies(n).len()))
            .collect();

        let mut current: Vec<&N> = self
            .insertion_order
            .iter()
            .filter(|n| in_degree.get(n).copied() == Some(0))
            .collect();

        let mut groups: Vec<Vec<N>> = Vec::new();
        let mut processed = 0;

        while !current.is_empty() {
            processed += current.len();

            let mut next: Vec<&N> = Vec::new();
            for node in &current {
                for dependent in self.reverse_edges.get(*node).into_iter().flatten() {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.push(dependent);
                        }
                    }
                }
            }

            // Preserve input order
            next.sort_by_key(|n| self.position.get(*n).copied().unwrap_or(usize::MAX));

            groups.push(current.into_iter().cloned().collect());
            current = next;
        }

        if processed != self.len() {
            return Err(Cycle(self.find_cycle().unwrap_or_default()));
        }

        Ok(groups)
    }

    /// Flattened topological order.
    pub fn topological_order(&self) -> Result<Vec<N>, Cycle<N>> {
        Ok(self.parallel_groups()?.into_iter().flatten().collect())
    }

    pub fn has_cycle(&self) -> bool {
        self.find_cycle().is_some()
    }

    /// Every node that sits on a cycle, found via strongly connected components.
    pub fn find_cycle(&self) -> Option<Vec<N>> {
        let mut members: Vec<N> = self
            .strongly_connected_components()
            .into_iter()
            .filter(|component| match component.as_slice() {
                [single] => self.direct_dependencies(single).contains(single),
                _ => true,
            })
            .flatten()
            .collect();

        if members.is_empty() {
            return None;
        }
        members.sort_by_key(|n| self.position.get(n).copied().unwrap_or(usize::MAX));
        Some(members)
    }

    /// All transitive dependencies of `node`, in insertion order.
    pub fn dependencies_of(&self, node: &N) -> Vec<N> {
        self.reachable(node, &self.edges)
    }

    /// All transitive dependents of `node`, in insertion order.
    pub fn dependents_of(&self, node: &N) -> Vec<N> {
        self.reachable(node, &self.reverse_edges)
    }

    fn reachable(&self, start: &N, adjacency: &HashMap<N, Vec<N>>) -> Vec<N> {
        let mut seen: HashSet<&N> = HashSet::new();
        let mut queue: VecDeque<&N> = VecDeque::new();
        queue.push_back(start);

        while let Some(node) = queue.pop_front() {
            for next in adjacency.get(node).into_iter().flatten() {
                if next != start && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        let mut out: Vec<N> = seen.into_iter().cloned().collect();
        out.sort_by_key(|n| self.position.get(n).copied().unwrap_or(usize::MAX));
        out
    }

    /// Tarjan's algorithm.
    fn strongly_connected_components(&self) -> Vec<Vec<N>> {
        let mut state = Tarjan {
            next_index: 0,
            index: HashMap::new(),
            lowlink: HashMap::new(),
            stack: Vec::new(),
            on_stack: HashSet::new(),
            components: Vec::new(),
        };

        for node in &self.insertion_order {
            if !state.index.contains_key(node) {
                self.tarjan_visit(node, &mut state);
            }
        }

        state.components
    }

    fn tarjan_visit<'a>(&'a self, node: &'a N, st: &mut Tarjan<'a, N>) {
        st.index.insert(node, st.next_index);
        st.lowlink.insert(node, st.next_index);
        st.next_index += 1;
        st.stack.push(node);
        st.on_stack.insert(node);

        for dep in self.direct_dependencies(node) {
            let candidate = if !st.index.contains_key(dep) {
                self.tarjan_visit(dep, st);
                st.lowlink.get(dep).copied()
            } else if st.on_stack.contains(dep) {
                st.index.get(dep).copied()
            } else {
                None
            };

            if let (Some(c), Some(low)) = (candidate, st.lowlink.get_mut(node)) {
                *low = (*low).min(c);
            }
        }

        if st.lowlink.get(node) == st.index.get(node) {
            let mut component = Vec::new();
            while let Some(top) = st.stack.pop() {
                st.on_stack.remove(top);
                component.push(top.clone());
                if top == node {
                    break;
                }
            }
            st.components.push(component);
        }
    }
}

struct Tarjan<'a, N> {
    next_index: usize,
    index: HashMap<&'a N, usize>,
    lowlink: HashMap<&'a N, usize>,
    stack: Vec<&'a N>,
    on_stack: HashSet<&'a N>,
    components: Vec<Vec<N>>,
}
