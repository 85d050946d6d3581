#![cfg_attr(test, allow(unused_crate_dependencies))]

//! Normalization and validation of GraphQL federation subgraphs.
//!
//! [normalize_subgraph()] turns one parsed subgraph into a canonical, directive-annotated document
//! together with the router configuration of its types. [batch_normalize()] does the same for every
//! subgraph of a federated graph and merges the results.

mod ast;
mod authorization;
mod batch;
mod configuration;
mod constants;
mod diagnostics;
mod directive_definitions;
mod directives;
mod event_driven;
mod field_sets;
mod implementations;
mod normalize;
mod options;
mod registry;
mod render_sdl;
mod resolvability_graph;
mod result;
mod type_node;
mod value;
mod walker;

pub use self::{
    ast::*,
    authorization::{AuthorizationData, AuthorizationRequirement, FieldAuthorizationData},
    batch::{batch_normalize, batch_normalize_with_options, BatchNormalizationOutcome, InternalSubgraph, Subgraph},
    configuration::{
        ConditionalFieldData, ConfigurationData, EntityData, EntityInterfaceSubgraphData, EventConfiguration,
        EventType, FieldSetCondition, ProviderType, RequiredFieldsConfiguration, SimpleFieldData, StreamConfiguration,
    },
    constants::MAX_OR_SCOPES,
    diagnostics::*,
    directive_definitions::{ArgumentDefinition, DirectiveDefinition, DirectiveLocations, PersistedDirectiveDefinitionData},
    normalize::{normalize_subgraph, normalize_subgraph_from_str, normalize_subgraph_with_options},
    options::{BatchNormalizationOptions, NormalizationOptions, OptionsError},
    registry::*,
    resolvability_graph::{Graph, GraphEdge, GraphNode, GraphNodeId, NodeOptions, RecordingGraph, ResolvabilityGraph},
    result::{NormalizationOutcome, NormalizationResult},
    type_node::TypeNode,
    value::Value,
};

pub use cynic_parser::TypeSystemDocument;
