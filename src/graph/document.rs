//! JSON persistence for chain graphs.
//!
//! Effect nodes are written with both their numeric type id and the type's
//! name. On load the name wins, so documents survive changes to registry
//! order; the id is only used when the name is missing or unknown.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result, bail};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::{ChainGraph, ChainNode, Link, NodeKind};
use crate::ids::{IdAllocator, LINK_ID_BASE, LinkId, NODE_ID_BASE, NodeId, PIN_ID_BASE, PinId};
use crate::registry::{EffectRegistry, MAX_PARAMS};

pub const CHAIN_DOCUMENT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainDocument {
    pub version: String,
    pub nodes: Vec<DocumentNode>,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentNode {
    pub id: NodeId,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(rename = "typeName", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(rename = "inputPin", default)]
    pub input_pin: Option<PinId>,
    #[serde(rename = "outputPin", default)]
    pub output_pin: Option<PinId>,
    #[serde(default)]
    pub position: [f32; 2],
}

impl ChainGraph {
    pub fn to_document(&self, registry: &EffectRegistry) -> ChainDocument {
        let nodes = self
            .nodes
            .iter()
            .map(|n| DocumentNode {
                id: n.id,
                type_name: n
                    .effect()
                    .and_then(|e| registry.find(e.type_id))
                    .map(|t| t.name.clone()),
                kind: n.kind.clone(),
                input_pin: n.input_pin,
                output_pin: n.output_pin,
                position: n.position,
            })
            .collect();
        ChainDocument {
            version: CHAIN_DOCUMENT_VERSION.to_string(),
            nodes,
            links: self.links.clone(),
        }
    }

    /// Rebuild a graph from a document, re-checking every structural rule.
    pub fn from_document(doc: ChainDocument, registry: &EffectRegistry) -> Result<ChainGraph> {
        if doc.version != CHAIN_DOCUMENT_VERSION {
            bail!(
                "unsupported chain document version '{}' (expected {CHAIN_DOCUMENT_VERSION})",
                doc.version
            );
        }

        let mut entry: Option<NodeId> = None;
        let mut exit: Option<NodeId> = None;
        let mut seen_nodes: HashSet<NodeId> = HashSet::new();
        let mut pin_owners: HashMap<PinId, NodeId> = HashMap::new();
        let mut nodes: Vec<ChainNode> = Vec::with_capacity(doc.nodes.len());
        let mut node_ids = IdAllocator::new(NODE_ID_BASE);
        let mut pin_ids = IdAllocator::new(PIN_ID_BASE);
        let mut link_ids = IdAllocator::new(LINK_ID_BASE);

        for n in doc.nodes {
            if NodeId::from_raw(n.id.raw()).is_none() {
                bail!("node id {} is outside the node id range", n.id.raw());
            }
            if !seen_nodes.insert(n.id) {
                bail!("duplicate node id {}", n.id);
            }
            node_ids.reserve_through(n.id.raw());

            let (wants_input, wants_output) = match &n.kind {
                NodeKind::Entry => {
                    if entry.replace(n.id).is_some() {
                        bail!("chain document has more than one entry node");
                    }
                    (false, true)
                }
                NodeKind::Exit => {
                    if exit.replace(n.id).is_some() {
                        bail!("chain document has more than one exit node");
                    }
                    (true, false)
                }
                NodeKind::Effect(_) => (true, true),
            };
            if n.input_pin.is_some() != wants_input || n.output_pin.is_some() != wants_output {
                bail!("{} has the wrong pin slots for its kind", n.id);
            }
            for pin in [n.input_pin, n.output_pin].into_iter().flatten() {
                if PinId::from_raw(pin.raw()).is_none() {
                    bail!("pin id {} on {} is outside the pin id range", pin.raw(), n.id);
                }
                if pin_owners.insert(pin, n.id).is_some() {
                    bail!("{pin} is owned by more than one node");
                }
                pin_ids.reserve_through(pin.raw());
            }

            let mut kind = n.kind;
            if let NodeKind::Effect(effect) = &mut kind {
                resolve_type(n.id, effect, n.type_name.as_deref(), registry);
                if effect.params.len() > MAX_PARAMS {
                    warn!(
                        "[document] {} stores {} params; keeping the first {MAX_PARAMS}",
                        n.id,
                        effect.params.len()
                    );
                    effect.params.truncate(MAX_PARAMS);
                }
            }

            nodes.push(ChainNode {
                id: n.id,
                kind,
                input_pin: n.input_pin,
                output_pin: n.output_pin,
                position: n.position,
            });
        }

        let (Some(entry), Some(exit)) = (entry, exit) else {
            bail!("chain document needs exactly one entry and one exit node");
        };

        let mut graph = ChainGraph {
            nodes,
            links: Vec::with_capacity(doc.links.len()),
            pin_owners,
            entry,
            exit,
            node_ids,
            pin_ids,
            link_ids,
        };

        let mut seen_links: HashSet<LinkId> = HashSet::new();
        for link in doc.links {
            if LinkId::from_raw(link.id.raw()).is_none() {
                bail!("link id {} is outside the link id range", link.id.raw());
            }
            if !seen_links.insert(link.id) {
                bail!("duplicate link id {}", link.id);
            }
            graph
                .check_link(link.from, link.to)
                .with_context(|| format!("invalid {} ({} -> {})", link.id, link.from, link.to))?;
            graph.link_ids.reserve_through(link.id.raw());
            graph.links.push(link);
        }

        Ok(graph)
    }
}

fn resolve_type(
    node: NodeId,
    effect: &mut super::EffectNode,
    type_name: Option<&str>,
    registry: &EffectRegistry,
) {
    let Some(name) = type_name else {
        return;
    };
    match registry.find_by_name(name) {
        Some(ty) if ty.id != effect.type_id => {
            info!(
                "[document] {node}: type '{name}' moved from id {} to {}",
                effect.type_id, ty.id
            );
            effect.type_id = ty.id;
        }
        Some(_) => {}
        None => warn!(
            "[document] {node}: unknown effect type '{name}', keeping id {}",
            effect.type_id
        ),
    }
}

pub fn load_chain_from_path(
    path: impl AsRef<Path>,
    registry: &EffectRegistry,
) -> Result<ChainGraph> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read chain json at {}", path.display()))?;
    let doc: ChainDocument = serde_json::from_str(&text).context("failed to parse chain json")?;
    ChainGraph::from_document(doc, registry)
        .with_context(|| format!("invalid chain document {}", path.display()))
}

pub fn save_chain_to_path(
    graph: &ChainGraph,
    registry: &EffectRegistry,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(&graph.to_document(registry))
        .context("failed to serialize chain")?;
    std::fs::write(path, text)
        .with_context(|| format!("failed to write chain json at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn registry() -> EffectRegistry {
        EffectRegistry::with_builtins().unwrap()
    }

    #[test]
    fn document_roundtrip_preserves_chain() {
        let registry = registry();
        let vignette = registry.find_by_name("Vignette").unwrap();
        let mut graph = ChainGraph::new();
        let a = graph
            .add_effect(vignette.id, "V", &vignette.default_params()[..3])
            .unwrap();

        let doc = graph.to_document(&registry);
        assert_eq!(doc.nodes[2].type_name.as_deref(), Some("Vignette"));

        let text = serde_json::to_string(&doc).unwrap();
        let parsed: ChainDocument = serde_json::from_str(&text).unwrap();
        let restored = ChainGraph::from_document(parsed, &registry).unwrap();
        assert_eq!(restored.build_chain_order(), Ok(vec![a]));
        assert_eq!(restored.node(a), graph.node(a));

        // New ids keep clear of restored ones.
        let mut restored = restored;
        let b = restored.add_effect(vignette.id, "V2", &[]).unwrap();
        assert!(b > a);
    }

    #[test]
    fn type_name_overrides_stale_id() {
        let registry = registry();
        let contrast = registry.find_by_name("Contrast").unwrap().id;
        let doc: ChainDocument = serde_json::from_value(json!({
            "version": "1.0",
            "nodes": [
                { "id": NODE_ID_BASE, "kind": "entry", "inputPin": null, "outputPin": PIN_ID_BASE },
                {
                    "id": NODE_ID_BASE + 1, "kind": "exit",
                    "inputPin": PIN_ID_BASE + 1, "outputPin": null
                },
                {
                    "id": NODE_ID_BASE + 2, "kind": "effect", "type": 999, "typeName": "Contrast",
                    "params": [1.5, 0.2], "label": "C",
                    "inputPin": PIN_ID_BASE + 2, "outputPin": PIN_ID_BASE + 3
                }
            ],
            "links": [
                { "id": LINK_ID_BASE, "from": PIN_ID_BASE, "to": PIN_ID_BASE + 2 },
                { "id": LINK_ID_BASE + 1, "from": PIN_ID_BASE + 3, "to": PIN_ID_BASE + 1 }
            ]
        }))
        .unwrap();

        let graph = ChainGraph::from_document(doc, &registry).unwrap();
        let instances = graph.to_instances().unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].type_id, contrast);
        assert_eq!(&instances[0].params[..2], &[1.5, 0.2]);
    }

    #[test]
    fn from_document_rejects_branching_links() {
        let registry = registry();
        let mut graph = ChainGraph::new();
        graph.add_effect(1, "A", &[]).unwrap();
        let mut doc = graph.to_document(&registry);

        let entry_out = graph.node(graph.entry()).unwrap().output_pin.unwrap();
        let exit_in = graph.node(graph.exit()).unwrap().input_pin.unwrap();
        // A second link out of Entry would fan out.
        doc.links.push(Link {
            id: LinkId::nth(100),
            from: entry_out,
            to: exit_in,
        });

        let err = ChainGraph::from_document(doc, &registry).unwrap_err();
        assert!(format!("{err:#}").contains("already linked"), "{err:#}");
    }

    #[test]
    fn from_document_requires_entry_and_exit() {
        let registry = registry();
        let mut doc = ChainGraph::new().to_document(&registry);
        doc.nodes.retain(|n| !matches!(n.kind, NodeKind::Exit));
        doc.links.clear();
        assert!(ChainGraph::from_document(doc, &registry).is_err());
    }

    #[test]
    fn from_document_rejects_unknown_version() {
        let registry = registry();
        let mut doc = ChainGraph::new().to_document(&registry);
        doc.version = "0.1".to_string();
        assert!(ChainGraph::from_document(doc, &registry).is_err());
    }
}
