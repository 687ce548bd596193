//! Graph parser: canvas JSON → group regions and note references.
//!
//! A canvas file is an object with a `nodes` array. Only two node kinds
//! matter here:
//!
//! ```json
//! { "id": "a1", "type": "file",  "file": "Scenes/Heist.md", "x": 10, "y": 5, "width": 400, "height": 300 }
//! { "id": "g1", "type": "group", "label": "Act One",       "x": 0,  "y": 0, "width": 900, "height": 800 }
//! ```
//!
//! Text cards, web links and anything else are dropped. Parsing never fails:
//! empty or malformed input is an empty graph, and a single bad node is
//! skipped without affecting its neighbours.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// A node pointing at a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRef {
    pub id: Option<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Vault-relative path of the referenced note.
    pub file: Option<String>,
    /// Index among the canvas's note references; final tie-breaker.
    pub source_index: usize,
}

/// A rectangular group on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRegion {
    pub id: Option<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub label: Option<String>,
    /// Index among the canvas's groups; final tie-breaker.
    pub source_index: usize,
}

impl GroupRegion {
    /// Inclusive horizontal containment: `x <= note.x <= x + width`.
    pub fn contains(&self, note: &NoteRef) -> bool {
        note.x >= self.x && note.x <= self.x + self.width
    }
}

/// A parsed canvas node.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasNode {
    NoteRef(NoteRef),
    GroupRegion(GroupRegion),
}

/// The nodes of a canvas that take part in the timeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanvasGraph {
    pub groups: Vec<GroupRegion>,
    pub notes: Vec<NoteRef>,
}

impl CanvasGraph {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.notes.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct RawNode {
    id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    width: f64,
    #[serde(default)]
    height: f64,
    file: Option<String>,
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCanvas {
    #[serde(default)]
    nodes: Vec<Value>,
}

/// Parse canvas JSON into groups and notes, in source order.
pub fn parse_canvas(text: &str) -> CanvasGraph {
    if text.trim().is_empty() {
        debug!("Canvas is empty");
        return CanvasGraph::default();
    }

    let raw: RawCanvas = match serde_json::from_str(text) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Canvas is not valid JSON, treating as empty: {}", e);
            return CanvasGraph::default();
        }
    };

    let mut graph = CanvasGraph::default();
    for (index, value) in raw.nodes.into_iter().enumerate() {
        let node: RawNode = match serde_json::from_value(value) {
            Ok(node) => node,
            Err(e) => {
                debug!("Skipping canvas node {}: {}", index, e);
                continue;
            }
        };
        match classify(node, graph.notes.len(), graph.groups.len()) {
            Some(CanvasNode::NoteRef(note)) => graph.notes.push(note),
            Some(CanvasNode::GroupRegion(group)) => graph.groups.push(group),
            None => {}
        }
    }

    debug!(
        "Parsed canvas: {} groups, {} notes",
        graph.groups.len(),
        graph.notes.len()
    );
    graph
}

fn classify(node: RawNode, note_index: usize, group_index: usize) -> Option<CanvasNode> {
    let is_file = match node.kind.as_deref() {
        Some("file") => true,
        Some("group") => {
            return Some(CanvasNode::GroupRegion(GroupRegion {
                id: node.id,
                x: node.x,
                y: node.y,
                width: node.width,
                height: node.height,
                label: node.label,
                source_index: group_index,
            }))
        }
        _ => node.file.is_some(),
    };
    if !is_file {
        return None;
    }
    Some(CanvasNode::NoteRef(NoteRef {
        id: node.id,
        x: node.x,
        y: node.y,
        width: node.width,
        height: node.height,
        file: node.file.filter(|f| !f.trim().is_empty()),
        source_index: note_index,
    }))
}
