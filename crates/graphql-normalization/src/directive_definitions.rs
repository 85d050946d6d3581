//! The catalogue of directive definitions a subgraph may apply.
//!
//! Built-in definitions are written as SDL and parsed once. Custom definitions found in a subgraph
//! document are added on top of them by the walker.

use std::{fmt, sync::LazyLock};

use cynic_parser::type_system as ast;
use indexmap::{IndexMap, IndexSet};

use crate::{constants::*, type_node::TypeNode, value::Value};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DirectiveLocations: u32 {
        const QUERY = 1 << 0;
        const MUTATION = 1 << 1;
        const SUBSCRIPTION = 1 << 2;
        const FIELD = 1 << 3;
        const FRAGMENT_DEFINITION = 1 << 4;
        const FRAGMENT_SPREAD = 1 << 5;
        const INLINE_FRAGMENT = 1 << 6;
        const VARIABLE_DEFINITION = 1 << 7;
        const SCHEMA = 1 << 8;
        const SCALAR = 1 << 9;
        const OBJECT = 1 << 10;
        const FIELD_DEFINITION = 1 << 11;
        const ARGUMENT_DEFINITION = 1 << 12;
        const INTERFACE = 1 << 13;
        const UNION = 1 << 14;
        const ENUM = 1 << 15;
        const ENUM_VALUE = 1 << 16;
        const INPUT_OBJECT = 1 << 17;
        const INPUT_FIELD_DEFINITION = 1 << 18;
    }
}

const LOCATION_NAMES: [(DirectiveLocations, &str); 19] = [
    (DirectiveLocations::QUERY, "QUERY"),
    (DirectiveLocations::MUTATION, "MUTATION"),
    (DirectiveLocations::SUBSCRIPTION, "SUBSCRIPTION"),
    (DirectiveLocations::FIELD, "FIELD"),
    (DirectiveLocations::FRAGMENT_DEFINITION, "FRAGMENT_DEFINITION"),
    (DirectiveLocations::FRAGMENT_SPREAD, "FRAGMENT_SPREAD"),
    (DirectiveLocations::INLINE_FRAGMENT, "INLINE_FRAGMENT"),
    (DirectiveLocations::VARIABLE_DEFINITION, "VARIABLE_DEFINITION"),
    (DirectiveLocations::SCHEMA, "SCHEMA"),
    (DirectiveLocations::SCALAR, "SCALAR"),
    (DirectiveLocations::OBJECT, "OBJECT"),
    (DirectiveLocations::FIELD_DEFINITION, "FIELD_DEFINITION"),
    (DirectiveLocations::ARGUMENT_DEFINITION, "ARGUMENT_DEFINITION"),
    (DirectiveLocations::INTERFACE, "INTERFACE"),
    (DirectiveLocations::UNION, "UNION"),
    (DirectiveLocations::ENUM, "ENUM"),
    (DirectiveLocations::ENUM_VALUE, "ENUM_VALUE"),
    (DirectiveLocations::INPUT_OBJECT, "INPUT_OBJECT"),
    (DirectiveLocations::INPUT_FIELD_DEFINITION, "INPUT_FIELD_DEFINITION"),
];

impl DirectiveLocations {
    /// Locations inside operations, as opposed to the type system.
    pub const EXECUTABLE: Self = Self::QUERY
        .union(Self::MUTATION)
        .union(Self::SUBSCRIPTION)
        .union(Self::FIELD)
        .union(Self::FRAGMENT_DEFINITION)
        .union(Self::FRAGMENT_SPREAD)
        .union(Self::INLINE_FRAGMENT)
        .union(Self::VARIABLE_DEFINITION);

    pub(crate) fn from_sdl_name(name: &str) -> Option<Self> {
        LOCATION_NAMES
            .iter()
            .find(|(_, location_name)| *location_name == name)
            .map(|(location, _)| *location)
    }

    pub(crate) fn sdl_name(self) -> &'static str {
        LOCATION_NAMES
            .iter()
            .find(|(location, _)| *location == self)
            .map(|(_, name)| *name)
            .unwrap_or("UNKNOWN")
    }
}

impl fmt::Display for DirectiveLocations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut locations = self.iter().map(|location| location.sdl_name());

        if let Some(first) = locations.next() {
            f.write_str(first)?;
        }

        for location in locations {
            f.write_str(" | ")?;
            f.write_str(location)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveDefinition {
    pub name: String,
    pub description: Option<String>,
    pub arguments: Vec<ArgumentDefinition>,
    pub is_repeatable: bool,
    pub locations: DirectiveLocations,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDefinition {
    pub name: String,
    pub r#type: TypeNode,
    pub default_value: Option<Value>,
}

impl ArgumentDefinition {
    /// Non-null arguments without a default value must always be provided.
    pub fn is_required(&self) -> bool {
        self.r#type.is_non_null() && self.default_value.is_none()
    }
}

impl DirectiveDefinition {
    pub(crate) fn from_ast(definition: ast::DirectiveDefinition<'_>) -> Self {
        let locations = definition
            .locations()
            .filter_map(|location| DirectiveLocations::from_sdl_name(location.as_str()))
            .fold(DirectiveLocations::empty(), |acc, location| acc | location);

        DirectiveDefinition {
            name: definition.name().to_owned(),
            description: definition.description().map(|description| description.to_cow().into_owned()),
            arguments: definition
                .arguments()
                .map(|argument| ArgumentDefinition {
                    name: argument.name().to_owned(),
                    r#type: TypeNode::from_ast(argument.ty()),
                    default_value: argument.default_value().map(Value::from_ast),
                })
                .collect(),
            is_repeatable: definition.is_repeatable(),
            locations,
        }
    }

    pub fn argument(&self, name: &str) -> Option<&ArgumentDefinition> {
        self.arguments.iter().find(|argument| argument.name == name)
    }

    pub(crate) fn required_argument_names(&self) -> impl Iterator<Item = &str> {
        self.arguments
            .iter()
            .filter(|argument| argument.is_required())
            .map(|argument| argument.name.as_str())
    }
}

/// A custom directive that clients may apply in operations. Only its executable locations are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedDirectiveDefinitionData {
    pub name: String,
    pub description: Option<String>,
    pub arguments: IndexMap<String, ArgumentDefinition>,
    pub executable_locations: DirectiveLocations,
    pub is_repeatable: bool,
    pub subgraph_names: IndexSet<String>,
}

impl PersistedDirectiveDefinitionData {
    /// `None` when the directive has no executable location. Duplicate argument names are returned
    /// as the error.
    pub(crate) fn from_definition(
        definition: &DirectiveDefinition,
        subgraph_name: &str,
    ) -> Option<Result<Self, Vec<String>>> {
        let executable_locations = definition.locations & DirectiveLocations::EXECUTABLE;

        if executable_locations.is_empty() {
            return None;
        }

        let mut arguments = IndexMap::new();
        let mut duplicate_argument_names = Vec::new();

        for argument in &definition.arguments {
            if arguments.insert(argument.name.clone(), argument.clone()).is_some()
                && !duplicate_argument_names.contains(&argument.name)
            {
                duplicate_argument_names.push(argument.name.clone());
            }
        }

        if !duplicate_argument_names.is_empty() {
            return Some(Err(duplicate_argument_names));
        }

        Some(Ok(PersistedDirectiveDefinitionData {
            name: definition.name.clone(),
            description: definition.description.clone(),
            arguments,
            executable_locations,
            is_repeatable: definition.is_repeatable,
            subgraph_names: IndexSet::from([subgraph_name.to_owned()]),
        }))
    }
}

const BASE_DIRECTIVE_DEFINITIONS: &str = r#"
directive @deprecated(reason: String = "No longer supported") on ARGUMENT_DEFINITION | ENUM_VALUE | FIELD_DEFINITION | INPUT_FIELD_DEFINITION
directive @extends on INTERFACE | OBJECT
directive @external on FIELD_DEFINITION | OBJECT
directive @key(fields: openfed__FieldSet!, resolvable: Boolean = true) repeatable on INTERFACE | OBJECT
directive @provides(fields: openfed__FieldSet!) on FIELD_DEFINITION
directive @requires(fields: openfed__FieldSet!) on FIELD_DEFINITION
directive @specifiedBy(url: String!) on SCALAR
directive @tag(name: String!) repeatable on ARGUMENT_DEFINITION | ENUM | ENUM_VALUE | FIELD_DEFINITION | INPUT_FIELD_DEFINITION | INPUT_OBJECT | INTERFACE | OBJECT | SCALAR | UNION
"#;

const VERSION_TWO_DIRECTIVE_DEFINITIONS: &str = r#"
directive @authenticated on ENUM | FIELD_DEFINITION | INTERFACE | OBJECT | SCALAR
directive @composeDirective(name: String!) repeatable on SCHEMA
directive @inaccessible on ARGUMENT_DEFINITION | ENUM | ENUM_VALUE | FIELD_DEFINITION | INPUT_FIELD_DEFINITION | INPUT_OBJECT | INTERFACE | OBJECT | SCALAR | UNION
directive @interfaceObject on OBJECT
directive @link(url: String!, as: String, for: String, import: [link__Import]) repeatable on SCHEMA
directive @override(from: String!) on FIELD_DEFINITION
directive @requiresScopes(scopes: [[openfed__Scope!]!]!) on ENUM | FIELD_DEFINITION | INTERFACE | OBJECT | SCALAR
directive @shareable repeatable on FIELD_DEFINITION | OBJECT
"#;

const EVENT_DIRECTIVE_DEFINITIONS: &str = r#"
directive @edfs__kafkaPublish(topic: String!, providerId: String! = "default") on FIELD_DEFINITION
directive @edfs__kafkaSubscribe(topics: [String!]!, providerId: String! = "default") on FIELD_DEFINITION
directive @edfs__natsPublish(subject: String!, providerId: String! = "default") on FIELD_DEFINITION
directive @edfs__natsRequest(subject: String!, providerId: String! = "default") on FIELD_DEFINITION
directive @edfs__natsSubscribe(subjects: [String!]!, providerId: String! = "default", streamConfiguration: edfs__NatsStreamConfiguration) on FIELD_DEFINITION
"#;

const SUBSCRIPTION_FILTER_DEFINITIONS: &str = r#"
directive @openfed__subscriptionFilter(condition: openfed__SubscriptionFilterCondition!) on FIELD_DEFINITION
"#;

pub(crate) struct BuiltInDirectiveDefinitions {
    pub(crate) base: Vec<DirectiveDefinition>,
    pub(crate) version_two: Vec<DirectiveDefinition>,
    pub(crate) events: Vec<DirectiveDefinition>,
    pub(crate) subscription_filter: Vec<DirectiveDefinition>,
}

impl BuiltInDirectiveDefinitions {
    pub(crate) fn iter(&self) -> impl Iterator<Item = &DirectiveDefinition> {
        self.base
            .iter()
            .chain(&self.version_two)
            .chain(&self.events)
            .chain(&self.subscription_filter)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&DirectiveDefinition> {
        self.iter().find(|definition| definition.name == name)
    }
}

pub(crate) static BUILT_IN_DIRECTIVE_DEFINITIONS: LazyLock<BuiltInDirectiveDefinitions> =
    LazyLock::new(|| BuiltInDirectiveDefinitions {
        base: parse_directive_definitions(BASE_DIRECTIVE_DEFINITIONS),
        version_two: parse_directive_definitions(VERSION_TWO_DIRECTIVE_DEFINITIONS),
        events: parse_directive_definitions(EVENT_DIRECTIVE_DEFINITIONS),
        subscription_filter: parse_directive_definitions(SUBSCRIPTION_FILTER_DEFINITIONS),
    });

fn parse_directive_definitions(sdl: &str) -> Vec<DirectiveDefinition> {
    let Ok(document) = cynic_parser::parse_type_system_document(sdl) else {
        return Vec::new();
    };

    document
        .definitions()
        .filter_map(|definition| match definition {
            ast::Definition::Directive(directive) => Some(DirectiveDefinition::from_ast(directive)),
            _ => None,
        })
        .collect()
}

pub(crate) fn is_built_in_directive(name: &str) -> bool {
    BUILT_IN_DIRECTIVE_DEFINITIONS.get(name).is_some()
}

pub(crate) fn is_event_directive(name: &str) -> bool {
    EVENT_DIRECTIVES.contains(&name)
}
