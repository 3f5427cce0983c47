//! Editable effect chain: Entry -> effects... -> Exit.
//!
//! Every node has at most one input and one output pin, and every pin takes
//! part in at most one link, so the graph is always a simple chain (possibly
//! split into fragments while the user is editing). A pin's direction is the
//! slot it occupies on its owner, never a stored flag.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{IdAllocator, LINK_ID_BASE, LinkId, NODE_ID_BASE, NodeId, PIN_ID_BASE, PinId};
use crate::instance::EffectInstance;
use crate::registry::MAX_PARAMS;

pub mod document;

/// Corruption guard for every walk along the chain.
pub const MAX_TRAVERSAL_STEPS: usize = 4096;

/// Horizontal offset the editor gets for a freshly inserted node.
const NODE_SPACING: f32 = 220.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectNode {
    #[serde(rename = "type")]
    pub type_id: u32,
    #[serde(default)]
    pub params: Vec<f32>,
    #[serde(default)]
    pub label: String,
    #[serde(default, rename = "auxPath", skip_serializing_if = "Option::is_none")]
    pub aux_path: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Entry,
    Exit,
    Effect(EffectNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainNode {
    pub id: NodeId,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(rename = "inputPin")]
    pub input_pin: Option<PinId>,
    #[serde(rename = "outputPin")]
    pub output_pin: Option<PinId>,
    /// Editor layout only; never interpreted here.
    #[serde(default)]
    pub position: [f32; 2],
}

impl ChainNode {
    pub fn effect(&self) -> Option<&EffectNode> {
        match &self.kind {
            NodeKind::Effect(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_effect(&self) -> bool {
        matches!(self.kind, NodeKind::Effect(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub from: PinId,
    pub to: PinId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("{0} is not an output pin")]
    NotAnOutputPin(PinId),
    #[error("{0} is not an input pin")]
    NotAnInputPin(PinId),
    #[error("{0} has no owning node")]
    MissingOwner(PinId),
    #[error("cannot link {0} to itself")]
    SelfLink(NodeId),
    #[error("output {0} is already linked")]
    OutputAlreadyLinked(PinId),
    #[error("input {0} is already linked")]
    InputAlreadyLinked(PinId),
    #[error("linking {from} -> {to} would create a cycle")]
    WouldCycle { from: NodeId, to: NodeId },
    #[error("cycle check gave up after {0} steps")]
    TraversalGuardExceeded(usize),
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("{0} is the chain entry or exit and cannot be removed")]
    ProtectedNode(NodeId),
    #[error("{0} is not an effect node")]
    NotAnEffect(NodeId),
    #[error("parameter index {0} is out of range (max {MAX_PARAMS})")]
    ParamIndexOutOfRange(usize),
    #[error("{0} id space exhausted")]
    IdSpaceExhausted(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("chain is disconnected after {at}")]
    Disconnected { at: NodeId },
    #[error("chain revisits {0} (cycle)")]
    Revisited(NodeId),
    #[error("chain traversal exceeded {0} steps")]
    GuardExceeded(usize),
}

/// What `remove_node` did besides deleting the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub removed_links: Vec<LinkId>,
    /// Predecessor and successor were reconnected directly.
    pub respliced: bool,
}

#[derive(Debug, Clone)]
pub struct ChainGraph {
    nodes: Vec<ChainNode>,
    links: Vec<Link>,
    pin_owners: HashMap<PinId, NodeId>,
    entry: NodeId,
    exit: NodeId,
    node_ids: IdAllocator,
    pin_ids: IdAllocator,
    link_ids: IdAllocator,
}

impl Default for ChainGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainGraph {
    /// A graph holding only Entry -> Exit.
    pub fn new() -> Self {
        let entry = NodeId::nth(0);
        let exit = NodeId::nth(1);
        let entry_out = PinId::nth(0);
        let exit_in = PinId::nth(1);
        let link = LinkId::nth(0);

        let mut node_ids = IdAllocator::new(NODE_ID_BASE);
        node_ids.reserve_through(exit.raw());
        let mut pin_ids = IdAllocator::new(PIN_ID_BASE);
        pin_ids.reserve_through(exit_in.raw());
        let mut link_ids = IdAllocator::new(LINK_ID_BASE);
        link_ids.reserve_through(link.raw());

        Self {
            nodes: vec![
                ChainNode {
                    id: entry,
                    kind: NodeKind::Entry,
                    input_pin: None,
                    output_pin: Some(entry_out),
                    position: [0.0, 0.0],
                },
                ChainNode {
                    id: exit,
                    kind: NodeKind::Exit,
                    input_pin: Some(exit_in),
                    output_pin: None,
                    position: [NODE_SPACING, 0.0],
                },
            ],
            links: vec![Link {
                id: link,
                from: entry_out,
                to: exit_in,
            }],
            pin_owners: HashMap::from([(entry_out, entry), (exit_in, exit)]),
            entry,
            exit,
            node_ids,
            pin_ids,
            link_ids,
        }
    }

    pub fn entry(&self) -> NodeId {
        self.entry
    }

    pub fn exit(&self) -> NodeId {
        self.exit
    }

    pub fn nodes(&self) -> &[ChainNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node(&self, id: NodeId) -> Option<&ChainNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut ChainNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.iter().find(|l| l.id == id)
    }

    pub fn effect_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_effect()).count()
    }

    pub fn pin_owner(&self, pin: PinId) -> Option<NodeId> {
        self.pin_owners.get(&pin).copied()
    }

    pub fn pin_direction(&self, pin: PinId) -> Option<PinDirection> {
        let node = self.node(self.pin_owner(pin)?)?;
        if node.output_pin == Some(pin) {
            Some(PinDirection::Output)
        } else if node.input_pin == Some(pin) {
            Some(PinDirection::Input)
        } else {
            None
        }
    }

    /// The link leaving an output pin.
    pub fn link_from(&self, pin: PinId) -> Option<&Link> {
        self.links.iter().find(|l| l.from == pin)
    }

    /// The link arriving at an input pin.
    pub fn link_into(&self, pin: PinId) -> Option<&Link> {
        self.links.iter().find(|l| l.to == pin)
    }

    fn next_node(&self, id: NodeId) -> Option<NodeId> {
        let out = self.node(id)?.output_pin?;
        self.pin_owner(self.link_from(out)?.to)
    }

    fn prev_output_pin(&self, id: NodeId) -> Option<PinId> {
        let input = self.node(id)?.input_pin?;
        Some(self.link_into(input)?.from)
    }

    fn next_input_pin(&self, id: NodeId) -> Option<PinId> {
        let out = self.node(id)?.output_pin?;
        Some(self.link_from(out)?.to)
    }

    /// Walks forward from `start` and reports whether `target` is reached.
    /// `None` when the walk runs out of steps before either answer.
    fn reaches(&self, start: NodeId, target: NodeId) -> Option<bool> {
        let mut current = start;
        for _ in 0..MAX_TRAVERSAL_STEPS {
            if current == target {
                return Some(true);
            }
            let Some(next) = self.next_node(current) else {
                return Some(false);
            };
            current = next;
        }
        None
    }

    /// Last node reachable from Entry, i.e. the tail of the entry fragment.
    fn entry_fragment_tail(&self) -> NodeId {
        let mut current = self.entry;
        for _ in 0..MAX_TRAVERSAL_STEPS {
            match self.next_node(current) {
                Some(next) if next != self.exit => current = next,
                _ => break,
            }
        }
        current
    }

    fn alloc_node_id(&mut self) -> Result<NodeId, GraphError> {
        self.node_ids
            .allocate()
            .and_then(NodeId::from_raw)
            .ok_or(GraphError::IdSpaceExhausted("node"))
    }

    fn alloc_pin_id(&mut self) -> Result<PinId, GraphError> {
        self.pin_ids
            .allocate()
            .and_then(PinId::from_raw)
            .ok_or(GraphError::IdSpaceExhausted("pin"))
    }

    fn alloc_link_id(&mut self) -> Result<LinkId, GraphError> {
        self.link_ids
            .allocate()
            .and_then(LinkId::from_raw)
            .ok_or(GraphError::IdSpaceExhausted("link"))
    }

    /// Insert a new effect immediately before Exit.
    ///
    /// The node feeding Exit (Entry when the chain is empty) is relinked
    /// through the new node. If Exit has no incoming link, the tail of the
    /// fragment starting at Entry is used instead. Either both new links are
    /// made or the graph is left exactly as it was.
    pub fn add_effect(
        &mut self,
        type_id: u32,
        label: impl Into<String>,
        default_params: &[f32],
    ) -> Result<NodeId, GraphError> {
        let node_id = self.alloc_node_id()?;
        let input = self.alloc_pin_id()?;
        let output = self.alloc_pin_id()?;

        let exit_in = self.node(self.exit).and_then(|n| n.input_pin);
        let old_link = exit_in.and_then(|pin| self.link_into(pin)).copied();
        let pred_out = match old_link {
            Some(link) => Some(link.from),
            None => self
                .node(self.entry_fragment_tail())
                .and_then(|n| n.output_pin),
        };
        let position = pred_out
            .and_then(|pin| self.pin_owner(pin))
            .and_then(|id| self.node(id))
            .map(|n| [n.position[0] + NODE_SPACING, n.position[1]])
            .unwrap_or_default();

        let params = default_params.iter().copied().take(MAX_PARAMS).collect();
        self.nodes.push(ChainNode {
            id: node_id,
            kind: NodeKind::Effect(EffectNode {
                type_id,
                params,
                label: label.into(),
                aux_path: None,
                enabled: true,
            }),
            input_pin: Some(input),
            output_pin: Some(output),
            position,
        });
        self.pin_owners.insert(input, node_id);
        self.pin_owners.insert(output, node_id);

        if let Some(link) = old_link {
            self.remove_link(link.id);
        }

        let mut made: Vec<LinkId> = Vec::with_capacity(2);
        let mut result = Ok(());
        if let Some(pred_out) = pred_out {
            match self.try_add_link(pred_out, input) {
                Ok(id) => made.push(id),
                Err(e) => result = Err(e),
            }
        }
        match (result.is_ok(), exit_in) {
            (true, Some(exit_in)) => match self.try_add_link(output, exit_in) {
                Ok(id) => made.push(id),
                Err(e) => result = Err(e),
            },
            _ => {}
        }

        if let Err(e) = result {
            warn!("[graph] add_effect rolled back: {e}");
            for id in made {
                self.remove_link(id);
            }
            self.drop_node(node_id);
            if let Some(link) = old_link {
                self.links.push(link);
            }
            return Err(e);
        }

        debug!("[graph] added effect {node_id} (type {type_id})");
        Ok(node_id)
    }

    fn drop_node(&mut self, id: NodeId) {
        self.nodes.retain(|n| n.id != id);
        self.pin_owners.retain(|_, owner| *owner != id);
    }

    /// Remove an effect node and its links, then try to reconnect its former
    /// neighbours directly. A failed reconnect leaves the chain split.
    pub fn remove_node(&mut self, id: NodeId) -> Result<RemoveOutcome, GraphError> {
        if id == self.entry || id == self.exit {
            return Err(GraphError::ProtectedNode(id));
        }
        let node = self.node(id).ok_or(GraphError::UnknownNode(id))?;
        let pins = [node.input_pin, node.output_pin];

        let pred_out = self.prev_output_pin(id);
        let succ_in = self.next_input_pin(id);

        let mut removed_links = Vec::new();
        self.links.retain(|l| {
            let touches = pins.contains(&Some(l.from)) || pins.contains(&Some(l.to));
            if touches {
                removed_links.push(l.id);
            }
            !touches
        });
        self.drop_node(id);

        let mut respliced = false;
        if let (Some(from), Some(to)) = (pred_out, succ_in) {
            match self.try_add_link(from, to) {
                Ok(_) => respliced = true,
                Err(e) => warn!("[graph] could not reconnect around removed {id}: {e}"),
            }
        }

        debug!("[graph] removed {id} (respliced: {respliced})");
        Ok(RemoveOutcome {
            removed_links,
            respliced,
        })
    }

    /// Validate and record a link. Nothing changes on rejection.
    pub fn try_add_link(&mut self, from: PinId, to: PinId) -> Result<LinkId, GraphError> {
        self.check_link(from, to)?;
        let id = self.alloc_link_id()?;
        self.links.push(Link { id, from, to });
        Ok(id)
    }

    // Direction is read off the owner's slots, so ownership is checked first.
    fn check_link(&self, from: PinId, to: PinId) -> Result<(), GraphError> {
        let from_node = self.pin_owner(from).ok_or(GraphError::MissingOwner(from))?;
        let to_node = self.pin_owner(to).ok_or(GraphError::MissingOwner(to))?;
        if self.pin_direction(from) != Some(PinDirection::Output) {
            return Err(GraphError::NotAnOutputPin(from));
        }
        if self.pin_direction(to) != Some(PinDirection::Input) {
            return Err(GraphError::NotAnInputPin(to));
        }
        if from_node == to_node {
            return Err(GraphError::SelfLink(from_node));
        }
        if self.link_from(from).is_some() {
            return Err(GraphError::OutputAlreadyLinked(from));
        }
        if self.link_into(to).is_some() {
            return Err(GraphError::InputAlreadyLinked(to));
        }
        match self.reaches(to_node, from_node) {
            Some(false) => Ok(()),
            Some(true) => Err(GraphError::WouldCycle {
                from: from_node,
                to: to_node,
            }),
            None => Err(GraphError::TraversalGuardExceeded(MAX_TRAVERSAL_STEPS)),
        }
    }

    /// Unconditional removal; no re-splicing.
    pub fn remove_link(&mut self, id: LinkId) -> bool {
        let before = self.links.len();
        self.links.retain(|l| l.id != id);
        self.links.len() != before
    }

    /// Effect nodes from Entry to Exit, in chain order.
    pub fn build_chain_order(&self) -> Result<Vec<NodeId>, ChainError> {
        let mut order = Vec::new();
        let mut visited: HashSet<NodeId> = HashSet::from([self.entry]);
        let mut current = self.entry;

        for _ in 0..MAX_TRAVERSAL_STEPS {
            let Some(next) = self.next_node(current) else {
                return Err(ChainError::Disconnected { at: current });
            };
            if next == self.exit {
                return Ok(order);
            }
            if !visited.insert(next) {
                return Err(ChainError::Revisited(next));
            }
            if self.node(next).is_some_and(ChainNode::is_effect) {
                order.push(next);
            }
            current = next;
        }
        Err(ChainError::GuardExceeded(MAX_TRAVERSAL_STEPS))
    }

    /// Flat, ordered instance list for the stack compiler.
    pub fn to_instances(&self) -> Result<Vec<EffectInstance>, ChainError> {
        let order = self.build_chain_order()?;
        Ok(order
            .into_iter()
            .filter_map(|id| self.node(id)?.effect())
            .map(|e| {
                let mut inst =
                    EffectInstance::new(e.type_id, e.label.clone()).with_params(&e.params);
                inst.enabled = e.enabled;
                inst
            })
            .collect())
    }

    fn effect_mut(&mut self, id: NodeId) -> Result<&mut EffectNode, GraphError> {
        match self.node_mut(id) {
            Some(ChainNode {
                kind: NodeKind::Effect(e),
                ..
            }) => Ok(e),
            Some(_) => Err(GraphError::NotAnEffect(id)),
            None => Err(GraphError::UnknownNode(id)),
        }
    }

    pub fn set_param(&mut self, id: NodeId, index: usize, value: f32) -> Result<(), GraphError> {
        if index >= MAX_PARAMS {
            return Err(GraphError::ParamIndexOutOfRange(index));
        }
        let effect = self.effect_mut(id)?;
        if effect.params.len() <= index {
            effect.params.resize(index + 1, 0.0);
        }
        effect.params[index] = value;
        Ok(())
    }

    pub fn set_params(&mut self, id: NodeId, values: &[f32]) -> Result<(), GraphError> {
        let effect = self.effect_mut(id)?;
        effect.params = values.iter().copied().take(MAX_PARAMS).collect();
        Ok(())
    }

    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) -> Result<(), GraphError> {
        self.effect_mut(id)?.enabled = enabled;
        Ok(())
    }

    pub fn set_label(&mut self, id: NodeId, label: impl Into<String>) -> Result<(), GraphError> {
        self.effect_mut(id)?.label = label.into();
        Ok(())
    }

    pub fn set_aux_path(&mut self, id: NodeId, path: Option<String>) -> Result<(), GraphError> {
        self.effect_mut(id)?.aux_path = path;
        Ok(())
    }

    pub fn set_position(&mut self, id: NodeId, position: [f32; 2]) -> Result<(), GraphError> {
        self.node_mut(id).ok_or(GraphError::UnknownNode(id))?.position = position;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pins(graph: &ChainGraph, id: NodeId) -> (PinId, PinId) {
        let node = graph.node(id).unwrap();
        (node.input_pin.unwrap(), node.output_pin.unwrap())
    }

    #[test]
    fn new_graph_is_entry_to_exit() {
        let graph = ChainGraph::new();
        assert_eq!(graph.nodes().len(), 2);
        assert_eq!(graph.links().len(), 1);
        assert_eq!(graph.build_chain_order(), Ok(vec![]));
        assert_eq!(graph.effect_count(), 0);
    }

    #[test]
    fn entry_and_exit_pins_have_one_slot_each() {
        let graph = ChainGraph::new();
        let entry = graph.node(graph.entry()).unwrap();
        let exit = graph.node(graph.exit()).unwrap();
        assert!(entry.input_pin.is_none());
        assert!(exit.output_pin.is_none());
        assert_eq!(
            graph.pin_direction(entry.output_pin.unwrap()),
            Some(PinDirection::Output)
        );
        assert_eq!(
            graph.pin_direction(exit.input_pin.unwrap()),
            Some(PinDirection::Input)
        );
    }

    #[test]
    fn add_effect_inserts_before_exit() {
        let mut graph = ChainGraph::new();
        let a = graph.add_effect(1, "A", &[1.0]).unwrap();
        let b = graph.add_effect(2, "B", &[2.0]).unwrap();
        assert_eq!(graph.build_chain_order(), Ok(vec![a, b]));
        assert_eq!(graph.links().len(), 3);
    }

    #[test]
    fn entry_and_exit_cannot_be_removed() {
        let mut graph = ChainGraph::new();
        let entry = graph.entry();
        let exit = graph.exit();
        assert_eq!(graph.remove_node(entry), Err(GraphError::ProtectedNode(entry)));
        assert_eq!(graph.remove_node(exit), Err(GraphError::ProtectedNode(exit)));
        assert_eq!(graph.nodes().len(), 2);
    }

    #[test]
    fn remove_middle_node_resplices() {
        let mut graph = ChainGraph::new();
        let a = graph.add_effect(1, "A", &[]).unwrap();
        let b = graph.add_effect(1, "B", &[]).unwrap();
        let c = graph.add_effect(1, "C", &[]).unwrap();

        let outcome = graph.remove_node(b).unwrap();
        assert!(outcome.respliced);
        assert_eq!(outcome.removed_links.len(), 2);
        assert_eq!(graph.build_chain_order(), Ok(vec![a, c]));
        assert!(graph.node(b).is_none());
    }

    #[test]
    fn remove_disconnected_node_does_not_resplice() {
        let mut graph = ChainGraph::new();
        let a = graph.add_effect(1, "A", &[]).unwrap();
        let (a_in, _) = pins(&graph, a);
        let link = graph.link_into(a_in).unwrap().id;
        graph.remove_link(link);

        let outcome = graph.remove_node(a).unwrap();
        assert!(!outcome.respliced);
        assert!(matches!(
            graph.build_chain_order(),
            Err(ChainError::Disconnected { .. })
        ));
    }

    #[test]
    fn try_add_link_checks_owners_then_directions() {
        let mut graph = ChainGraph::new();
        let a = graph.add_effect(1, "A", &[]).unwrap();
        let (a_in, a_out) = pins(&graph, a);
        assert_eq!(
            graph.try_add_link(a_in, a_out),
            Err(GraphError::NotAnOutputPin(a_in))
        );
        assert_eq!(
            graph.try_add_link(a_out, a_out),
            Err(GraphError::NotAnInputPin(a_out))
        );
        let bogus = PinId::nth(999);
        assert_eq!(
            graph.try_add_link(bogus, a_in),
            Err(GraphError::MissingOwner(bogus))
        );
        assert_eq!(
            graph.try_add_link(a_out, bogus),
            Err(GraphError::MissingOwner(bogus))
        );
    }

    #[test]
    fn try_add_link_rejects_self_and_double_links() {
        let mut graph = ChainGraph::new();
        let a = graph.add_effect(1, "A", &[]).unwrap();
        let b = graph.add_effect(1, "B", &[]).unwrap();
        let (a_in, a_out) = pins(&graph, a);
        let (b_in, _) = pins(&graph, b);

        let before = graph.links().to_vec();
        assert_eq!(graph.try_add_link(a_out, a_in), Err(GraphError::SelfLink(a)));
        assert_eq!(
            graph.try_add_link(a_out, b_in),
            Err(GraphError::OutputAlreadyLinked(a_out))
        );

        let link = graph.link_from(a_out).unwrap().id;
        graph.remove_link(link);
        let exit_in = graph.node(graph.exit()).unwrap().input_pin.unwrap();
        assert_eq!(
            graph.try_add_link(a_out, exit_in),
            Err(GraphError::InputAlreadyLinked(exit_in))
        );
        assert_eq!(graph.links().len(), before.len() - 1);
    }

    #[test]
    fn try_add_link_rejects_cycles() {
        let mut graph = ChainGraph::new();
        let a = graph.add_effect(1, "A", &[]).unwrap();
        let b = graph.add_effect(1, "B", &[]).unwrap();
        let (a_in, _) = pins(&graph, a);
        let (_, b_out) = pins(&graph, b);

        // Free both ends so only the cycle rule can reject.
        let into_a = graph.link_into(a_in).unwrap().id;
        let out_of_b = graph.link_from(b_out).unwrap().id;
        graph.remove_link(into_a);
        graph.remove_link(out_of_b);

        assert_eq!(
            graph.try_add_link(b_out, a_in),
            Err(GraphError::WouldCycle { from: b, to: a })
        );
    }

    #[test]
    fn chain_order_reports_disconnection() {
        let mut graph = ChainGraph::new();
        let a = graph.add_effect(1, "A", &[]).unwrap();
        let (_, a_out) = pins(&graph, a);
        let link = graph.link_from(a_out).unwrap().id;
        graph.remove_link(link);
        assert_eq!(
            graph.build_chain_order(),
            Err(ChainError::Disconnected { at: a })
        );
    }

    #[test]
    fn add_effect_reattaches_to_entry_fragment_tail() {
        let mut graph = ChainGraph::new();
        let a = graph.add_effect(1, "A", &[]).unwrap();
        let (_, a_out) = pins(&graph, a);
        let link = graph.link_from(a_out).unwrap().id;
        graph.remove_link(link);

        let b = graph.add_effect(1, "B", &[]).unwrap();
        assert_eq!(graph.build_chain_order(), Ok(vec![a, b]));
    }

    #[test]
    fn to_instances_carries_params_and_enabled() {
        let mut graph = ChainGraph::new();
        let a = graph.add_effect(4, "A", &[0.25, 0.5]).unwrap();
        graph.set_enabled(a, false).unwrap();
        graph.set_param(a, 3, 9.0).unwrap();

        let instances = graph.to_instances().unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].type_id, 4);
        assert!(!instances[0].enabled);
        assert_eq!(&instances[0].params[..4], &[0.25, 0.5, 0.0, 9.0]);
    }

    #[test]
    fn editor_mutations_validate_targets() {
        let mut graph = ChainGraph::new();
        let entry = graph.entry();
        assert_eq!(graph.set_label(entry, "x"), Err(GraphError::NotAnEffect(entry)));
        let a = graph.add_effect(1, "A", &[]).unwrap();
        assert_eq!(
            graph.set_param(a, MAX_PARAMS, 1.0),
            Err(GraphError::ParamIndexOutOfRange(MAX_PARAMS))
        );
        graph.set_aux_path(a, Some("luts/warm.cube".into())).unwrap();
        assert_eq!(
            graph.node(a).unwrap().effect().unwrap().aux_path.as_deref(),
            Some("luts/warm.cube")
        );
        graph.set_position(entry, [10.0, 20.0]).unwrap();
        assert_eq!(graph.node(entry).unwrap().position, [10.0, 20.0]);
    }

    fn long_chain(len: usize) -> (ChainGraph, Vec<NodeId>) {
        let mut graph = ChainGraph::new();
        let ids = (0..len)
            .map(|_| graph.add_effect(1, "fx", &[]).unwrap())
            .collect();
        (graph, ids)
    }

    #[test]
    fn chain_order_reports_guard_exhaustion() {
        let (graph, _) = long_chain(MAX_TRAVERSAL_STEPS + 4);
        let err = graph.build_chain_order().unwrap_err();
        assert_eq!(err, ChainError::GuardExceeded(MAX_TRAVERSAL_STEPS));

        let disconnected = ChainError::Disconnected { at: graph.entry() };
        let revisited = ChainError::Revisited(graph.entry());
        assert_ne!(err.to_string(), disconnected.to_string());
        assert_ne!(err.to_string(), revisited.to_string());
        assert_ne!(disconnected.to_string(), revisited.to_string());
    }

    #[test]
    fn cycle_check_past_the_guard_is_not_reported_as_a_cycle() {
        let (mut graph, ids) = long_chain(MAX_TRAVERSAL_STEPS + 100);
        let (_, first_out) = pins(&graph, ids[0]);
        let (second_in, _) = pins(&graph, ids[1]);
        let link = graph.link_from(first_out).unwrap().id;
        graph.remove_link(link);
        let links_before = graph.links().len();

        assert_eq!(
            graph.try_add_link(first_out, second_in),
            Err(GraphError::TraversalGuardExceeded(MAX_TRAVERSAL_STEPS))
        );
        assert_eq!(graph.links().len(), links_before);
    }
}
