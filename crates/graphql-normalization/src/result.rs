use indexmap::{IndexMap, IndexSet};

use crate::{
    ast::{Document, OperationType},
    authorization::AuthorizationData,
    configuration::{ConditionalFieldData, ConfigurationData, EntityData, EntityInterfaceSubgraphData},
    directive_definitions::PersistedDirectiveDefinitionData,
    registry::ParentDefinitionData,
    Diagnostics,
};

/// The result of a [`normalize_subgraph()`](crate::normalize_subgraph()) invocation.
pub struct NormalizationOutcome {
    pub(crate) result: Option<NormalizationResult>,
    pub(crate) diagnostics: Diagnostics,
}

impl NormalizationOutcome {
    /// Simplify the outcome to a yes-no answer: did normalization succeed?
    ///
    /// `Ok()` contains the [NormalizationResult].
    /// `Err()` contains all [Diagnostics].
    pub fn into_result(self) -> Result<NormalizationResult, Diagnostics> {
        match self.result {
            Some(result) => Ok(result),
            // a fatal error occured
            None => Err(self.diagnostics),
        }
    }

    pub fn result(&self) -> Option<&NormalizationResult> {
        self.result.as_ref()
    }

    /// Normalization warnings and errors.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

/// Everything the composer and the router need to know about one valid subgraph.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationResult {
    pub document: Document,
    /// The printed form of [NormalizationResult::document].
    pub sdl: String,
    pub authorization_data_by_parent_type_name: IndexMap<String, AuthorizationData>,
    pub concrete_type_names_by_abstract_type_name: IndexMap<String, IndexSet<String>>,
    /// `@external` fields made resolvable by `@provides` or needed by `@requires`, by `Type.field` coordinates.
    pub conditional_field_data_by_coordinates: IndexMap<String, ConditionalFieldData>,
    pub configuration_data_by_type_name: IndexMap<String, ConfigurationData>,
    pub entity_data_by_type_name: IndexMap<String, EntityData>,
    pub entity_interfaces: IndexMap<String, EntityInterfaceSubgraphData>,
    pub is_event_driven_graph: bool,
    pub is_version_two: bool,
    pub key_field_names_by_parent_type_name: IndexMap<String, IndexSet<String>>,
    pub operation_types: IndexMap<OperationType, String>,
    pub original_type_name_by_renamed_type_name: IndexMap<String, String>,
    /// Target subgraph name, then parent type name, then the overridden field names.
    pub overrides_by_target_subgraph_name: IndexMap<String, IndexMap<String, IndexSet<String>>>,
    pub parent_definition_data_by_type_name: IndexMap<String, ParentDefinitionData>,
    pub persisted_directive_definition_data_by_directive_name: IndexMap<String, PersistedDirectiveDefinitionData>,
    pub subgraph_name: String,
}

impl NormalizationResult {
    /// The router configuration of every object and interface, as JSON.
    pub fn configuration_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.configuration_data_by_type_name).unwrap_or_default()
    }
}
