use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{ElementId, SemanticElement};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Relation {
    /// container -> member
    Contains,
    /// subtype -> supertype
    Extends,
    /// overriding method -> overridden declaration
    Overrides,
}

/// Supertype as written in the declaration, with its resolved target if known.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeclaredSupertype {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ElementId>,
}

/// Declarations and their structural relations.
#[derive(Debug, Clone, Default)]
pub struct ElementGraph {
    pub graph: StableDiGraph<SemanticElement, Relation>,
    pub element_index: HashMap<ElementId, NodeIndex>,
    pub declared_supertypes: HashMap<ElementId, Vec<DeclaredSupertype>>,
}

impl ElementGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(&mut self, element: SemanticElement) -> NodeIndex {
        let id = element.id.clone();
        let node_index = self.graph.add_node(element);
        self.element_index.insert(id, node_index);
        node_index
    }

    /// Removes the element and everything it contains; returns the removed ids.
    pub fn remove_element(&mut self, id: &ElementId) -> Vec<ElementId> {
        let mut removed = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            let Some(node_index) = self.element_index.remove(&current) else {
                continue;
            };
            for member in self.related(&current, Relation::Contains, Direction::Outgoing) {
                stack.push(member.id.clone());
            }
            self.graph.remove_node(node_index);
            self.declared_supertypes.remove(&current);
            removed.push(current);
        }
        for records in self.declared_supertypes.values_mut() {
            for record in records.iter_mut() {
                if record.target.as_ref().is_some_and(|t| removed.contains(t)) {
                    record.target = None;
                }
            }
        }
        removed
    }

    pub fn add_relation(&mut self, from: &ElementId, to: &ElementId, relation: Relation) -> bool {
        match (self.element_index.get(from), self.element_index.get(to)) {
            (Some(&from_idx), Some(&to_idx)) => {
                self.graph.add_edge(from_idx, to_idx, relation);
                true
            }
            _ => false,
        }
    }

    pub fn find_element(&self, id: &ElementId) -> Option<&SemanticElement> {
        self.element_index
            .get(id)
            .and_then(|idx| self.graph.node_weight(*idx))
    }

    pub fn find_element_mut(&mut self, id: &ElementId) -> Option<&mut SemanticElement> {
        let idx = *self.element_index.get(id)?;
        self.graph.node_weight_mut(idx)
    }

    pub fn elements(&self) -> impl Iterator<Item = &SemanticElement> {
        self.graph.node_weights()
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut SemanticElement> {
        self.graph.node_weights_mut()
    }

    pub fn element_count(&self) -> usize {
        self.element_index.len()
    }

    /// Elements on the other end of `relation` edges, in insertion order.
    pub fn related(
        &self,
        id: &ElementId,
        relation: Relation,
        direction: Direction,
    ) -> Vec<&SemanticElement> {
        let Some(&node_idx) = self.element_index.get(id) else {
            return Vec::new();
        };
        let mut related: Vec<(usize, &SemanticElement)> = self
            .graph
            .edges_directed(node_idx, direction)
            .filter(|edge| *edge.weight() == relation)
            .filter_map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                self.graph
                    .node_weight(other)
                    .map(|element| (edge.id().index(), element))
            })
            .collect();
        related.sort_by_key(|(edge_idx, _)| *edge_idx);
        related.into_iter().map(|(_, element)| element).collect()
    }

    pub fn set_declared_supertypes(&mut self, id: &ElementId, supertypes: Vec<DeclaredSupertype>) {
        for record in &supertypes {
            if let Some(target) = &record.target {
                self.add_relation(id, target, Relation::Extends);
            }
        }
        self.declared_supertypes.insert(id.clone(), supertypes);
    }

    pub fn declared_supertypes(&self, id: &ElementId) -> &[DeclaredSupertype] {
        self.declared_supertypes
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
