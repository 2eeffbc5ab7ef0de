//! The logical writer schema and its flattening into Parquet metadata
//! elements and leaf column descriptors.

mod flatten;

pub use flatten::flatten;

use crate::types::{
    Compression, Encoding, GroupConvertedType, LogicalType, PhysicalType, Repetition,
};

/// A leaf of the logical schema.
#[derive(Debug, Clone)]
pub struct PrimitiveNode {
    pub name: String,
    pub optional: bool,
    pub logical_type: Option<LogicalType>,
    pub physical_type: PhysicalType,
    pub encoding: Encoding,
    pub compression: Compression,
}

/// A nested record of named fields.
#[derive(Debug, Clone)]
pub struct StructNode {
    pub name: String,
    pub optional: bool,
    pub fields: Vec<Node>,
}

/// A repeated element, lowered to the three-level Parquet LIST shape.
#[derive(Debug, Clone)]
pub struct ListNode {
    pub name: String,
    pub optional: bool,
    pub element: Box<Node>,
}

/// A key/value mapping, lowered to the Parquet MAP shape. Keys must not be
/// optional.
#[derive(Debug, Clone)]
pub struct MapNode {
    pub name: String,
    pub optional: bool,
    pub key: Box<Node>,
    pub value: Box<Node>,
}

/// One node of the logical schema tree. Children are owned exclusively, so
/// the tree cannot alias or cycle.
#[derive(Debug, Clone)]
pub enum Node {
    Primitive(PrimitiveNode),
    Struct(StructNode),
    List(ListNode),
    Map(MapNode),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Primitive(node) => &node.name,
            Node::Struct(node) => &node.name,
            Node::List(node) => &node.name,
            Node::Map(node) => &node.name,
        }
    }

    fn optional(&self) -> bool {
        match self {
            Node::Primitive(node) => node.optional,
            Node::Struct(node) => node.optional,
            Node::List(node) => node.optional,
            Node::Map(node) => node.optional,
        }
    }
}

/// A logical writer schema: an ordered sequence of top-level nodes.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub fields: Vec<Node>,
}

/// One element of the flat schema handed to the Thrift metadata writer.
/// The root group element comes first, with `repetition` unset.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaElement {
    pub name: String,
    pub repetition: Option<Repetition>,
    /// `Some` for group elements, `None` for leaves.
    pub num_children: Option<usize>,
    pub physical_type: Option<PhysicalType>,
    pub converted_type: Option<GroupConvertedType>,
    pub logical_type: Option<LogicalType>,
}

/// Everything a per-leaf codec needs: the leaf's dotted path, its maximum
/// repetition and definition levels, and the physical column properties.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub path: Vec<String>,
    pub max_rep_level: u8,
    pub max_def_level: u8,
    pub physical_type: PhysicalType,
    pub encoding: Encoding,
    pub compression: Compression,
    pub logical_type: Option<LogicalType>,
}

/// The output of [`flatten`]: metadata elements in document order plus one
/// descriptor per leaf, also in document order.
#[derive(Debug, Clone)]
pub struct FlatSchema {
    pub elements: Vec<SchemaElement>,
    pub leaves: Vec<ColumnDescriptor>,
}
