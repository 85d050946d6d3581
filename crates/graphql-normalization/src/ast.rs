//! The normalized subgraph document, as reconstructed from the type registry.
//!
//! It is printed through [std::fmt::Display], see [crate::render_sdl].

use crate::{directive_definitions::DirectiveDefinition, type_node::TypeNode, value::Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub definitions: Vec<Definition>,
}

impl Document {
    pub fn type_definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.definitions.iter().find_map(|definition| match definition {
            Definition::Type(ty) if ty.name == name => Some(ty),
            _ => None,
        })
    }

    pub fn directive_definition(&self, name: &str) -> Option<&DirectiveDefinition> {
        self.definitions.iter().find_map(|definition| match definition {
            Definition::Directive(directive) if directive.name == name => Some(directive),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Directive(DirectiveDefinition),
    Schema(SchemaDefinition),
    Type(TypeDefinition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

impl OperationType {
    pub const ALL: [OperationType; 3] = [OperationType::Query, OperationType::Mutation, OperationType::Subscription];

    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::Query => "query",
            OperationType::Mutation => "mutation",
            OperationType::Subscription => "subscription",
        }
    }

    pub fn default_type_name(self) -> &'static str {
        match self {
            OperationType::Query => crate::constants::QUERY,
            OperationType::Mutation => crate::constants::MUTATION,
            OperationType::Subscription => crate::constants::SUBSCRIPTION,
        }
    }

    pub(crate) fn from_default_type_name(type_name: &str) -> Option<Self> {
        OperationType::ALL
            .into_iter()
            .find(|operation| operation.default_type_name() == type_name)
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDefinition {
    pub directives: Vec<Directive>,
    pub operation_types: Vec<(OperationType, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    pub name: String,
    pub description: Option<String>,
    pub directives: Vec<Directive>,
    pub kind: TypeDefinitionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinitionKind {
    Scalar,
    Object {
        implements: Vec<String>,
        fields: Vec<FieldDefinition>,
    },
    Interface {
        implements: Vec<String>,
        fields: Vec<FieldDefinition>,
    },
    Union {
        members: Vec<String>,
    },
    Enum {
        values: Vec<EnumValueDefinition>,
    },
    InputObject {
        fields: Vec<InputValueDefinition>,
    },
}

impl TypeDefinition {
    pub fn fields(&self) -> &[FieldDefinition] {
        match &self.kind {
            TypeDefinitionKind::Object { fields, .. } | TypeDefinitionKind::Interface { fields, .. } => fields,
            _ => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields().iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub description: Option<String>,
    pub arguments: Vec<InputValueDefinition>,
    pub r#type: TypeNode,
    pub directives: Vec<Directive>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputValueDefinition {
    pub name: String,
    pub description: Option<String>,
    pub r#type: TypeNode,
    pub default_value: Option<Value>,
    pub directives: Vec<Directive>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueDefinition {
    pub name: String,
    pub description: Option<String>,
    pub directives: Vec<Directive>,
}

/// A directive application with constant arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub arguments: Vec<(String, Value)>,
}

impl Directive {
    pub(crate) fn from_ast(directive: cynic_parser::type_system::Directive<'_>) -> Self {
        Directive {
            name: directive.name().to_owned(),
            arguments: directive
                .arguments()
                .map(|argument| (argument.name().to_owned(), Value::from_ast(argument.value())))
                .collect(),
        }
    }

    pub(crate) fn new(name: &str) -> Self {
        Directive {
            name: name.to_owned(),
            arguments: Vec::new(),
        }
    }

    pub(crate) fn with_argument(mut self, name: &str, value: Value) -> Self {
        self.arguments.push((name.to_owned(), value));
        self
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments
            .iter()
            .find(|(argument_name, _)| argument_name == name)
            .map(|(_, value)| value)
    }
}
