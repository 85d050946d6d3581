//! Accumulated definition data for every named type of one subgraph.

mod upsert;

use std::fmt;

use indexmap::{IndexMap, IndexSet};

use crate::{ast::Directive, constants::INACCESSIBLE, type_node::TypeNode, value::Value};

pub(crate) use upsert::TypeSighting;

/// Directive applications accumulated across every sighting of a node, keyed by directive name.
pub type DirectivesByName = IndexMap<String, Vec<Directive>>;

/// How a type definition relates to other definitions of the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionType {
    /// A base definition.
    None,
    /// A V1 definition carrying `@extends`, which extends a definition in another subgraph.
    Extends,
    /// Declared with the `extend` keyword.
    Real,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DefinitionKind {
    Enum,
    InputObject,
    Interface,
    Object,
    Scalar,
    Union,
}

impl DefinitionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DefinitionKind::Enum => "enum",
            DefinitionKind::InputObject => "input object",
            DefinitionKind::Interface => "interface",
            DefinitionKind::Object => "object",
            DefinitionKind::Scalar => "scalar",
            DefinitionKind::Union => "union",
        }
    }

    pub fn is_input_type(self) -> bool {
        matches!(
            self,
            DefinitionKind::Enum | DefinitionKind::InputObject | DefinitionKind::Scalar
        )
    }
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named type across all of its definitions and extensions within a subgraph.
#[derive(Debug, Clone, PartialEq)]
pub enum ParentDefinitionData {
    Enum(EnumDefinitionData),
    InputObject(InputObjectDefinitionData),
    Interface(CompositeOutputData),
    Object(CompositeOutputData),
    Scalar(ScalarDefinitionData),
    Union(UnionDefinitionData),
}

impl ParentDefinitionData {
    pub fn kind(&self) -> DefinitionKind {
        match self {
            ParentDefinitionData::Enum(_) => DefinitionKind::Enum,
            ParentDefinitionData::InputObject(_) => DefinitionKind::InputObject,
            ParentDefinitionData::Interface(_) => DefinitionKind::Interface,
            ParentDefinitionData::Object(_) => DefinitionKind::Object,
            ParentDefinitionData::Scalar(_) => DefinitionKind::Scalar,
            ParentDefinitionData::Union(_) => DefinitionKind::Union,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ParentDefinitionData::Enum(data) => &data.name,
            ParentDefinitionData::InputObject(data) => &data.name,
            ParentDefinitionData::Interface(data) | ParentDefinitionData::Object(data) => &data.name,
            ParentDefinitionData::Scalar(data) => &data.name,
            ParentDefinitionData::Union(data) => &data.name,
        }
    }

    pub fn directives(&self) -> &DirectivesByName {
        match self {
            ParentDefinitionData::Enum(data) => &data.directives,
            ParentDefinitionData::InputObject(data) => &data.directives,
            ParentDefinitionData::Interface(data) | ParentDefinitionData::Object(data) => &data.directives,
            ParentDefinitionData::Scalar(data) => &data.directives,
            ParentDefinitionData::Union(data) => &data.directives,
        }
    }

    pub fn extension_type(&self) -> ExtensionType {
        match self {
            ParentDefinitionData::Enum(data) => data.extension_type,
            ParentDefinitionData::InputObject(data) => data.extension_type,
            ParentDefinitionData::Interface(data) | ParentDefinitionData::Object(data) => data.extension_type,
            ParentDefinitionData::Scalar(data) => data.extension_type,
            ParentDefinitionData::Union(data) => data.extension_type,
        }
    }

    pub fn has_base_definition(&self) -> bool {
        match self {
            ParentDefinitionData::Enum(data) => data.has_base_definition,
            ParentDefinitionData::InputObject(data) => data.has_base_definition,
            ParentDefinitionData::Interface(data) | ParentDefinitionData::Object(data) => data.has_base_definition,
            ParentDefinitionData::Scalar(data) => data.has_base_definition,
            ParentDefinitionData::Union(data) => data.has_base_definition,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeOutputData> {
        match self {
            ParentDefinitionData::Interface(data) | ParentDefinitionData::Object(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn as_composite_mut(&mut self) -> Option<&mut CompositeOutputData> {
        match self {
            ParentDefinitionData::Interface(data) | ParentDefinitionData::Object(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, ParentDefinitionData::Enum(_) | ParentDefinitionData::Scalar(_))
    }
}

/// Object and interface definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeOutputData {
    pub name: String,
    pub description: Option<String>,
    pub directives: DirectivesByName,
    pub extension_type: ExtensionType,
    /// Whether a sighting without the `extend` keyword was merged.
    pub has_base_definition: bool,
    pub fields: IndexMap<String, FieldData>,
    pub implemented_interface_type_names: IndexSet<String>,
    pub is_entity: bool,
    pub is_inaccessible: bool,
    /// Only ever true for objects.
    pub is_root_type: bool,
    /// The canonical root type name for renamed root types, otherwise the type name.
    pub renamed_type_name: String,
    pub subgraph_names: IndexSet<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDefinitionData {
    pub name: String,
    pub description: Option<String>,
    pub directives: DirectivesByName,
    pub extension_type: ExtensionType,
    /// Whether a sighting without the `extend` keyword was merged.
    pub has_base_definition: bool,
    pub values: IndexMap<String, EnumValueData>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueData {
    pub name: String,
    pub parent_type_name: String,
    pub description: Option<String>,
    pub directives: DirectivesByName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputObjectDefinitionData {
    pub name: String,
    pub description: Option<String>,
    pub directives: DirectivesByName,
    pub extension_type: ExtensionType,
    /// Whether a sighting without the `extend` keyword was merged.
    pub has_base_definition: bool,
    pub input_values: IndexMap<String, InputValueData>,
    pub is_inaccessible: bool,
    pub subgraph_names: IndexSet<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarDefinitionData {
    pub name: String,
    pub description: Option<String>,
    pub directives: DirectivesByName,
    pub extension_type: ExtensionType,
    /// Whether a sighting without the `extend` keyword was merged.
    pub has_base_definition: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionDefinitionData {
    pub name: String,
    pub description: Option<String>,
    pub directives: DirectivesByName,
    pub extension_type: ExtensionType,
    /// Whether a sighting without the `extend` keyword was merged.
    pub has_base_definition: bool,
    pub members: IndexSet<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldData {
    pub name: String,
    pub original_parent_type_name: String,
    pub renamed_parent_type_name: String,
    pub r#type: TypeNode,
    pub arguments: IndexMap<String, InputValueData>,
    pub directives: DirectivesByName,
    pub description: Option<String>,
    pub is_external_by_subgraph_name: IndexMap<String, bool>,
    pub is_inaccessible: bool,
    pub subgraph_names: IndexSet<String>,
}

impl FieldData {
    pub fn named_type_name(&self) -> &str {
        self.r#type.named_type_name()
    }

    pub fn is_external_in(&self, subgraph_name: &str) -> bool {
        self.is_external_by_subgraph_name
            .get(subgraph_name)
            .copied()
            .unwrap_or_default()
    }
}

/// An argument of a field, or a field of an input object.
#[derive(Debug, Clone, PartialEq)]
pub struct InputValueData {
    pub name: String,
    pub original_parent_type_name: String,
    pub r#type: TypeNode,
    pub default_value: Option<Value>,
    pub directives: DirectivesByName,
    pub description: Option<String>,
    pub is_inaccessible: bool,
}

impl InputValueData {
    pub(crate) fn new(
        name: &str,
        original_parent_type_name: &str,
        r#type: TypeNode,
        default_value: Option<Value>,
        directives: DirectivesByName,
        description: Option<String>,
    ) -> Self {
        InputValueData {
            name: name.to_owned(),
            original_parent_type_name: original_parent_type_name.to_owned(),
            is_inaccessible: directives.contains_key(INACCESSIBLE),
            r#type,
            default_value,
            directives,
            description,
        }
    }
}
