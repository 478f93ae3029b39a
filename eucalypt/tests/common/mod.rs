#![allow(dead_code)]

use eucalypt::indextree::NodeId;
use eucalypt::{JavaTypes, NodeData, Tree, TreeBuilder};

/// A Java syntax tree sketch: `(kind, role, label, children)`.
pub struct Sketch {
    kind: &'static str,
    role: Option<&'static str>,
    label: Option<&'static str>,
    children: Vec<Sketch>,
}

/// An inner node.
pub fn node(kind: &'static str, role: &'static str, children: Vec<Sketch>) -> Sketch {
    Sketch {
        kind,
        role: Some(role),
        label: None,
        children,
    }
}

/// A labeled leaf.
pub fn leaf(kind: &'static str, role: &'static str, label: &'static str) -> Sketch {
    Sketch {
        kind,
        role: Some(role),
        label: Some(label),
        children: Vec::new(),
    }
}

/// The root of a sketch; it plays no role.
pub fn root(kind: &'static str, children: Vec<Sketch>) -> Sketch {
    Sketch {
        kind,
        role: None,
        label: None,
        children,
    }
}

impl Sketch {
    /// Give an inner node a label, such as an operator.
    pub fn labeled(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }
}

/// An `ExpressionStatement` wrapping a single name.
pub fn stmt(role: &'static str, name: &'static str) -> Sketch {
    node(
        "ExpressionStatement",
        role,
        vec![leaf("SimpleName", "expression", name)],
    )
}

fn data(sketch: &Sketch) -> NodeData<JavaTypes> {
    let mut data = NodeData::new(sketch.kind);
    if let Some(label) = sketch.label {
        data = data.with_label(label);
    }
    if let Some(role) = sketch.role {
        data = data.with_role(role);
    }
    data
}

fn add(builder: &mut TreeBuilder<JavaTypes>, parent: NodeId, sketch: &Sketch) {
    let id = builder.add_child(parent, data(sketch));
    for child in &sketch.children {
        add(builder, id, child);
    }
}

/// Build a tree from a sketch.
pub fn build(sketch: &Sketch) -> Tree<JavaTypes> {
    let mut builder = TreeBuilder::new(data(sketch));
    let root = builder.root();
    for child in &sketch.children {
        add(&mut builder, root, child);
    }
    builder.build().expect("sketches are well-formed")
}

/// The node reached by following child positions from the root.
pub fn at(tree: &Tree<JavaTypes>, path: &[usize]) -> NodeId {
    let mut node = tree.root();
    for &i in path {
        node = tree.children(node).nth(i).expect("path leads to a node");
    }
    node
}
