use std::collections::HashSet;

use super::{
    ColumnDescriptor, FlatSchema, Node, PrimitiveNode, Schema, SchemaElement,
};
use crate::error::{Error, Result};
use crate::types::{Encoding, GroupConvertedType, PhysicalType, Repetition};

/// Lowers a logical schema to the flat element list and the leaf column
/// descriptors, walking depth-first left-to-right so leaves come out in
/// document order.
pub fn flatten(schema: &Schema) -> Result<FlatSchema> {
    if schema.fields.is_empty() {
        return Err(Error::InvalidSchema("schema with no fields".to_string()));
    }
    check_sibling_names(&schema.fields)?;

    let mut elements = vec![SchemaElement {
        name: "schema".to_string(),
        repetition: None,
        num_children: Some(schema.fields.len()),
        physical_type: None,
        converted_type: None,
        logical_type: None,
    }];
    let mut leaves = vec![];
    let mut path = vec![];
    for node in &schema.fields {
        flatten_node(node, None, &mut path, 0, 0, &mut elements, &mut leaves)?;
    }
    Ok(FlatSchema { elements, leaves })
}

fn check_sibling_names(fields: &[Node]) -> Result<()> {
    let mut seen = HashSet::new();
    for node in fields {
        if !seen.insert(node.name()) {
            return Err(Error::InvalidSchema(format!(
                "duplicate field name \"{}\"",
                node.name()
            )));
        }
    }
    Ok(())
}

fn repetition(optional: bool) -> Repetition {
    if optional {
        Repetition::Optional
    } else {
        Repetition::Required
    }
}

fn group_element(
    name: String,
    repetition: Repetition,
    num_children: usize,
    converted_type: Option<GroupConvertedType>,
) -> SchemaElement {
    SchemaElement {
        name,
        repetition: Some(repetition),
        num_children: Some(num_children),
        physical_type: None,
        converted_type,
        logical_type: None,
    }
}

fn flatten_node(
    node: &Node,
    rename: Option<&str>,
    path: &mut Vec<String>,
    rep_level: u32,
    def_level: u32,
    elements: &mut Vec<SchemaElement>,
    leaves: &mut Vec<ColumnDescriptor>,
) -> Result<()> {
    let name = rename.unwrap_or(node.name()).to_string();
    path.push(name.clone());

    match node {
        Node::Primitive(primitive) => {
            validate_leaf(primitive)?;
            elements.push(SchemaElement {
                name,
                repetition: Some(repetition(primitive.optional)),
                num_children: None,
                physical_type: Some(primitive.physical_type),
                converted_type: None,
                logical_type: primitive.logical_type,
            });
            let max_def_level = def_level + u32::from(primitive.optional);
            if rep_level > u32::from(u8::MAX) || max_def_level > u32::from(u8::MAX) {
                return Err(Error::InvalidSchema(
                    "schema nested deeper than 255 levels".to_string(),
                ));
            }
            leaves.push(ColumnDescriptor {
                path: path.clone(),
                max_rep_level: rep_level as u8,
                max_def_level: max_def_level as u8,
                physical_type: primitive.physical_type,
                encoding: primitive.encoding,
                compression: primitive.compression,
                logical_type: primitive.logical_type,
            });
        }
        Node::Struct(group) => {
            if group.fields.is_empty() {
                return Err(Error::InvalidSchema(format!(
                    "struct \"{}\" with no fields",
                    group.name
                )));
            }
            check_sibling_names(&group.fields)?;
            elements.push(group_element(
                name,
                repetition(group.optional),
                group.fields.len(),
                None,
            ));
            let def_level = def_level + u32::from(group.optional);
            for field in &group.fields {
                flatten_node(field, None, path, rep_level, def_level, elements, leaves)?;
            }
        }
        Node::List(list) => {
            elements.push(group_element(
                name,
                repetition(list.optional),
                1,
                Some(GroupConvertedType::List),
            ));
            elements.push(group_element(
                "list".to_string(),
                Repetition::Repeated,
                1,
                None,
            ));
            path.push("list".to_string());
            flatten_node(
                &list.element,
                Some("element"),
                path,
                rep_level + 1,
                def_level + 1 + u32::from(list.optional),
                elements,
                leaves,
            )?;
            path.pop();
        }
        Node::Map(map) => {
            if map.key.optional() {
                return Err(Error::InvalidSchema(format!(
                    "map \"{}\" with an optional key",
                    map.name
                )));
            }
            elements.push(group_element(
                name,
                repetition(map.optional),
                1,
                Some(GroupConvertedType::Map),
            ));
            elements.push(group_element(
                "key_value".to_string(),
                Repetition::Repeated,
                2,
                None,
            ));
            path.push("key_value".to_string());
            let child_def = def_level + 1 + u32::from(map.optional);
            flatten_node(&map.key, Some("key"), path, rep_level + 1, child_def, elements, leaves)?;
            flatten_node(
                &map.value,
                Some("value"),
                path,
                rep_level + 1,
                child_def,
                elements,
                leaves,
            )?;
            path.pop();
        }
    }
    path.pop();
    Ok(())
}

/// Rejects leaves outside the supported encoding/type matrix and
/// zero-length fixed-length types.
fn validate_leaf(primitive: &PrimitiveNode) -> Result<()> {
    if primitive.physical_type == PhysicalType::FixedLenByteArray(0) {
        return Err(Error::InvalidSchema(format!(
            "fixed-length column \"{}\" with a type length of zero",
            primitive.name
        )));
    }
    let supported = match primitive.encoding {
        Encoding::Plain => true,
        Encoding::PlainDictionary | Encoding::RleDictionary => {
            primitive.physical_type != PhysicalType::Boolean
        }
        Encoding::DeltaBinaryPacked => matches!(
            primitive.physical_type,
            PhysicalType::Int32 | PhysicalType::Int64
        ),
        // RLE is a level encoding, not a value encoding
        Encoding::Rle => false,
    };
    if !supported {
        return Err(Error::InvalidSchema(format!(
            "column \"{}\" cannot be {:?}-encoded as {:?}",
            primitive.name, primitive.physical_type, primitive.encoding
        )));
    }
    Ok(())
}
