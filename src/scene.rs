// Scene module for the robot room
//
// Nodes live by value in a slot map and refer to each other by key. A node is
// either a pass-through group, a carrier of a local transform, or a leaf that
// hands its world transform to an external renderable.

use std::fmt::{self, Write};

use glam::Mat4;
use log::{debug, trace};
use slotmap::{new_key_type, SecondaryMap, SlotMap};

use crate::error::{Result, SceneError};

new_key_type! {
    pub struct NodeKey;
}

/// Anything that can draw itself at a world transform.
pub trait Renderable {
    fn render(&mut self, world: &Mat4);

    /// Free any resources held by the renderable. Must tolerate repeat calls.
    fn release(&mut self);
}

pub enum NodeKind {
    Group,
    Transform(Mat4),
    Leaf(Box<dyn Renderable>),
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Group => f.write_str("Group"),
            NodeKind::Transform(local) => f.debug_tuple("Transform").field(local).finish(),
            NodeKind::Leaf(_) => f.write_str("Leaf"),
        }
    }
}

/// A single element of the scene tree.
#[derive(Debug)]
pub struct Node {
    name: String,
    kind: NodeKind,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
    world: Mat4,
}

impl Node {
    fn new(name: String, kind: NodeKind) -> Self {
        Self {
            name,
            kind,
            parent: None,
            children: Vec::new(),
            world: Mat4::IDENTITY,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// World transform as of the last update pass.
    pub fn world(&self) -> Mat4 {
        self.world
    }

    /// Local transform, for transform nodes only.
    pub fn local(&self) -> Option<Mat4> {
        match self.kind {
            NodeKind::Transform(local) => Some(local),
            _ => None,
        }
    }
}

/// Owns every node of one scene.
///
/// The tree is built with [`SceneGraph::add_child`] and then frozen: the first
/// call to [`SceneGraph::update`] seals it. After that only local transforms
/// change, via [`SceneGraph::set_local`], and each frame runs one `update`
/// followed by one `draw`.
#[derive(Debug)]
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, Node>,
    root: NodeKey,
    sealed: bool,
    stale: bool,
    released: bool,
}

impl SceneGraph {
    /// Creates a graph holding a single root group.
    pub fn new(root_name: impl Into<String>) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(root_name.into(), NodeKind::Group));
        Self {
            nodes,
            root,
            sealed: false,
            stale: true,
            released: false,
        }
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Number of nodes, attached or not, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn add_group(&mut self, name: impl Into<String>) -> NodeKey {
        self.insert(name.into(), NodeKind::Group)
    }

    pub fn add_transform(&mut self, name: impl Into<String>, local: Mat4) -> NodeKey {
        self.insert(name.into(), NodeKind::Transform(local))
    }

    pub fn add_leaf(&mut self, name: impl Into<String>, renderable: Box<dyn Renderable>) -> NodeKey {
        self.insert(name.into(), NodeKind::Leaf(renderable))
    }

    fn insert(&mut self, name: String, kind: NodeKind) -> NodeKey {
        self.stale = true;
        self.nodes.insert(Node::new(name, kind))
    }

    /// Appends `child` to the end of `parent`'s children.
    pub fn add_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        if self.sealed {
            return Err(SceneError::Sealed(child));
        }
        if child == self.root {
            return Err(SceneError::RootAsChild);
        }
        self.get(parent)?;
        if self.get(child)?.parent.is_some() {
            return Err(SceneError::AlreadyParented(child));
        }

        // child is unparented, so it can only be reached from parent by walking up
        let mut cursor = Some(parent);
        while let Some(key) = cursor {
            if key == child {
                return Err(SceneError::WouldCycle(child));
            }
            cursor = self.nodes[key].parent;
        }

        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        self.stale = true;
        Ok(())
    }

    pub fn get(&self, key: NodeKey) -> Result<&Node> {
        self.nodes.get(key).ok_or(SceneError::NodeNotFound(key))
    }

    pub fn name(&self, key: NodeKey) -> Result<&str> {
        self.get(key).map(Node::name)
    }

    pub fn children(&self, key: NodeKey) -> Result<&[NodeKey]> {
        self.get(key).map(Node::children)
    }

    pub fn parent(&self, key: NodeKey) -> Result<Option<NodeKey>> {
        self.get(key).map(Node::parent)
    }

    pub fn world(&self, key: NodeKey) -> Result<Mat4> {
        self.get(key).map(Node::world)
    }

    pub fn local(&self, key: NodeKey) -> Result<Mat4> {
        self.get(key)?.local().ok_or(SceneError::NotATransform(key))
    }

    /// Replaces the local transform of a transform node.
    ///
    /// Nothing is propagated until the next [`SceneGraph::update`].
    pub fn set_local(&mut self, key: NodeKey, local: Mat4) -> Result<()> {
        let node = self.nodes.get_mut(key).ok_or(SceneError::NodeNotFound(key))?;
        match &mut node.kind {
            NodeKind::Transform(existing) => {
                *existing = local;
                self.stale = true;
                Ok(())
            }
            _ => Err(SceneError::NotATransform(key)),
        }
    }

    /// Finds the first node with the given name, in draw order.
    pub fn find(&self, name: &str) -> Option<NodeKey> {
        let mut stack = vec![self.root];
        while let Some(key) = stack.pop() {
            let node = &self.nodes[key];
            if node.name == name {
                return Some(key);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// Recomputes every world transform, top-down from the root.
    pub fn update(&mut self) {
        if !self.sealed {
            debug!("sealing scene graph with {} nodes", self.nodes.len());
            self.sealed = true;
        }
        self.update_node(self.root, Mat4::IDENTITY);
        self.stale = false;
    }

    fn update_node(&mut self, key: NodeKey, incoming: Mat4) {
        let node = &mut self.nodes[key];
        node.world = match &node.kind {
            NodeKind::Transform(local) => incoming * *local,
            NodeKind::Group | NodeKind::Leaf(_) => incoming,
        };
        let world = node.world;

        for i in 0..self.nodes[key].children.len() {
            let child = self.nodes[key].children[i];
            self.update_node(child, world);
        }
    }

    /// Renders every leaf at its world transform, parents before children.
    ///
    /// # Panics
    ///
    /// If a local transform or the tree shape changed since the last update.
    pub fn draw(&mut self) {
        assert!(
            !self.stale,
            "scene graph drawn with stale world transforms, call update() first"
        );
        trace!("drawing scene graph");
        self.draw_node(self.root);
    }

    fn draw_node(&mut self, key: NodeKey) {
        let Node { kind, world, .. } = &mut self.nodes[key];
        if let NodeKind::Leaf(renderable) = kind {
            renderable.render(world);
        }

        for i in 0..self.nodes[key].children.len() {
            let child = self.nodes[key].children[i];
            self.draw_node(child);
        }
    }

    /// Releases every renderable the graph owns. Later calls do nothing.
    ///
    /// Attached leaves go first, in draw order, followed by any leaf that was
    /// never attached.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        let mut done = SecondaryMap::new();
        let mut stack = vec![self.root];
        while let Some(key) = stack.pop() {
            let node = &mut self.nodes[key];
            if let NodeKind::Leaf(renderable) = &mut node.kind {
                trace!("releasing {}", node.name);
                renderable.release();
            }
            done.insert(key, ());
            stack.extend(node.children.iter().rev().copied());
        }

        for (key, node) in self.nodes.iter_mut() {
            if done.contains_key(key) {
                continue;
            }
            if let NodeKind::Leaf(renderable) = &mut node.kind {
                debug!("releasing detached leaf {}", node.name);
                renderable.release();
            }
        }
        self.released = true;
    }

    /// Indented dump of the attached tree, one node per line.
    pub fn describe(&self, in_full: bool) -> String {
        let mut out = String::new();
        self.describe_node(self.root, 0, in_full, &mut out);
        out
    }

    fn describe_node(&self, key: NodeKey, depth: usize, in_full: bool, out: &mut String) {
        let node = &self.nodes[key];
        // writing to a String cannot fail
        let _ = writeln!(out, "{depth} {}Name: {}", "  ".repeat(depth), node.name);
        if in_full {
            let _ = writeln!(out, "worldTransform\n{}", node.world);
            if let NodeKind::Transform(local) = &node.kind {
                let _ = writeln!(out, "transform node:\n{local}");
            }
        }
        for &child in &node.children {
            self.describe_node(child, depth + 1, in_full, out);
        }
    }
}
