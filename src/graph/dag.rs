use super::{Error, Result};

use std::collections::VecDeque;
use std::collections::{hash_map::Entry, HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct DAG<V> {
    /// `g` defines a directed acyclic graph with only inbound edges (vertex to parents).
    g: HashMap<V, Vec<V>>,
    /// `inv` defines a directed acyclic graph with the inverted edges of `g`.
    inv: HashMap<V, Vec<V>>,
}

impl<V> std::ops::Deref for DAG<V>
where
    V: Eq + std::hash::Hash + Clone,
{
    type Target = HashMap<V, Vec<V>>;

    fn deref(&self) -> &'_ Self::Target {
        &self.g
    }
}

impl<V: Clone + Eq + std::hash::Hash + std::fmt::Debug> DAG<V> {
    pub fn new() -> Self {
        DAG { g: HashMap::default(), inv: HashMap::default() }
    }

    /// Inserts a new vertex into the DAG.
    ///   Note: every parent must already be present, so vertices are inserted in
    ///     topological order.
    pub fn insert_vx(&mut self, vx: V, edges: Vec<V>) -> Result<()> {
        if self.g.contains_key(&vx) {
            return Err(Error::VertexExists);
        }
        for parent in edges.iter() {
            if !self.g.contains_key(parent) {
                return Err(Error::VacantEntry);
            }
        }
        for parent in edges.iter() {
            if let Entry::Occupied(mut o) = self.inv.entry(parent.clone()) {
                o.get_mut().push(vx.clone());
            }
        }
        let _ = self.inv.insert(vx.clone(), vec![]);
        let _ = self.g.insert(vx, edges);
        Ok(())
    }

    /// The parents of a vertex (empty for unknown vertices).
    pub fn parents(&self, vx: &V) -> &[V] {
        self.g.get(vx).map(|p| p.as_slice()).unwrap_or(&[])
    }

    /// The children of a vertex (empty for unknown vertices).
    pub fn children(&self, vx: &V) -> &[V] {
        self.inv.get(vx).map(|c| c.as_slice()).unwrap_or(&[])
    }

    /// Performs a breadth-first-search over the descendants of `vx`, including `vx`.
    pub fn descendants(&self, vx: V) -> Vec<V> {
        let mut visited: HashSet<V> = HashSet::default();
        let mut queue = VecDeque::new();
        let _ = visited.insert(vx.clone());
        queue.push_back(vx);

        let mut result = vec![];
        while let Some(elt) = queue.pop_front() {
            for child in self.children(&elt).iter().cloned() {
                if visited.insert(child.clone()) {
                    queue.push_back(child);
                }
            }
            result.push(elt);
        }
        result
    }

    /// Creates an iterator for depth-first traversal of the ancestors of `vx`, starting
    /// with `vx` itself.
    pub fn dfs<'a>(&'a self, vx: &'a V) -> DFS<'a, V> {
        DFS::new(self, vx)
    }

    /// The leaves of the DAG are all the vertices without children.
    pub fn leaves(&self) -> Vec<V> {
        let mut leaves = vec![];
        for (vx, edges) in self.inv.iter() {
            if edges.is_empty() {
                leaves.push(vx.clone())
            }
        }
        leaves
    }
}

/// Iterator for depth-first traversal of the ancestors of a vertex
pub struct DFS<'a, V> {
    dag: &'a DAG<V>,
    stack: Vec<&'a V>,
    visited: HashSet<&'a V>,
}

impl<'a, V> DFS<'a, V>
where
    V: Clone + Eq + std::hash::Hash + std::fmt::Debug + 'a,
{
    fn new(dag: &'a DAG<V>, vx: &'a V) -> Self {
        DFS { dag, stack: vec![vx], visited: HashSet::default() }
    }
}

impl<'a, V> Iterator for DFS<'a, V>
where
    V: Clone + Eq + std::hash::Hash + std::fmt::Debug + 'a,
{
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = self.stack.pop()?;
            // A vertex may be stacked twice through two children before it is visited.
            if !self.visited.insert(next) {
                continue;
            }
            for edge in self.dag.parents(next).iter() {
                if !self.visited.contains(edge) {
                    self.stack.push(edge);
                }
            }
            return Some(next);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn make_dag(data: &[(u8, &[u8])]) -> DAG<u8> {
        let mut dag = DAG::<u8>::new();
        for (v, ps) in data {
            dag.insert_vx(*v, ps.to_vec()).unwrap();
        }
        dag
    }

    #[test]
    fn test_insert_requires_parents() {
        let mut dag: DAG<u8> = DAG::new();
        dag.insert_vx(0, vec![]).unwrap();
        assert_eq!(dag.insert_vx(2, vec![1]), Err(Error::VacantEntry));
        assert_eq!(dag.insert_vx(0, vec![]), Err(Error::VertexExists));
        dag.insert_vx(1, vec![0]).unwrap();
        assert_eq!(dag.children(&0), &[1]);
        assert_eq!(dag.parents(&1), &[0]);
    }

    #[test]
    fn test_descendants() {
        let dag = make_dag(&[(0, &[]), (1, &[0]), (2, &[0]), (3, &[1, 2]), (4, &[3, 1]), (5, &[3, 2])]);
        let r1 = dag.descendants(3);
        assert_eq!(r1[0], 3);
        let mut rest = r1[1..].to_vec();
        rest.sort();
        assert_eq!(rest, vec![4, 5]);
        assert_eq!(dag.descendants(0).len(), 6);

        let mut l = dag.leaves();
        l.sort();
        assert_eq!(l, vec![4, 5]);
    }

    #[test]
    #[rustfmt::skip]
    fn test_dfs() {
        let dag = make_dag(&[
             (0, &[]),
             (1, &[0]), (2, &[0]),
             (3, &[1]), (4, &[1]), (5, &[2]), (6, &[2]),
             (7, &[4,5]), (8, &[3,4]),
             (9, &[8,7,6]),
            ]);

        let r1: Vec<_> = dag.dfs(&8).cloned().collect();
        assert_eq!(r1, [8,4,1,0,3]);

        let r2: Vec<_> = dag.dfs(&7).cloned().collect();
        assert_eq!(r2, [7,5,2,0,4,1]);

        let r3: Vec<_> = dag.dfs(&9).cloned().collect();
        assert_eq!(r3, [
            9,6,2,0,
            7,5,
            4,1,
            8,3]);
    }

    #[test]
    fn test_dfs_diamond_visits_once() {
        let dag = make_dag(&[(0, &[]), (1, &[0]), (2, &[0]), (3, &[1, 2])]);
        let mut r: Vec<_> = dag.dfs(&3).cloned().collect();
        assert_eq!(r.len(), 4);
        r.sort();
        assert_eq!(r, vec![0, 1, 2, 3]);
    }
}
