//! Normalization of every subgraph of a federated graph, merged into one federation-wide view.
//!
//! Phase one normalizes each subgraph on its own, recording its resolvability graph mutations.
//! Phase two runs in input order: it replays the recordings into the shared [Graph] and merges
//! authorization, abstract type, entity and override data.

use cynic_parser::TypeSystemDocument;
use indexmap::{IndexMap, IndexSet};

use crate::{
    ast::{Document, OperationType},
    authorization::{upsert_authorization_data, AuthorizationData},
    configuration::{
        upsert_entity_data, ConditionalFieldData, ConfigurationData, EntityData, EntityInterfaceSubgraphData,
    },
    diagnostics::{DuplicateOverride, Warning},
    directive_definitions::PersistedDirectiveDefinitionData,
    normalize::normalize_subgraph_with_options,
    options::{BatchNormalizationOptions, NormalizationOptions},
    registry::ParentDefinitionData,
    resolvability_graph::{Graph, RecordingGraph},
    result::NormalizationOutcome,
    Diagnostics, NormalizationError,
};

/// One subgraph of a batch.
#[derive(Clone, Copy)]
pub struct Subgraph<'a> {
    pub name: Option<&'a str>,
    pub url: Option<&'a str>,
    pub document: &'a TypeSystemDocument,
}

/// A successfully normalized, named subgraph, as the composer consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct InternalSubgraph {
    pub name: String,
    pub url: Option<String>,
    pub conditional_field_data_by_coordinates: IndexMap<String, ConditionalFieldData>,
    pub configuration_data_by_type_name: IndexMap<String, ConfigurationData>,
    pub document: Document,
    pub sdl: String,
    pub entity_interfaces: IndexMap<String, EntityInterfaceSubgraphData>,
    pub is_version_two: bool,
    pub key_field_names_by_parent_type_name: IndexMap<String, IndexSet<String>>,
    pub operation_types: IndexMap<OperationType, String>,
    /// Fields of this subgraph that other subgraphs took over with `@override`.
    pub overridden_field_names_by_parent_type_name: IndexMap<String, IndexSet<String>>,
    pub parent_definition_data_by_type_name: IndexMap<String, ParentDefinitionData>,
    pub persisted_directive_definition_data_by_directive_name: IndexMap<String, PersistedDirectiveDefinitionData>,
}

/// The result of a [`batch_normalize()`] invocation.
pub struct BatchNormalizationOutcome {
    pub authorization_data_by_parent_type_name: IndexMap<String, AuthorizationData>,
    pub concrete_type_names_by_abstract_type_name: IndexMap<String, IndexSet<String>>,
    pub entity_data_by_type_name: IndexMap<String, EntityData>,
    pub internal_subgraph_by_subgraph_name: IndexMap<String, InternalSubgraph>,
    pub graph: Graph,
    pub(crate) diagnostics: Diagnostics,
}

impl BatchNormalizationOutcome {
    pub fn is_success(&self) -> bool {
        !self.diagnostics.any_fatal()
    }

    /// Batch errors first, then the errors of every failed subgraph. Warnings of all subgraphs.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

pub fn batch_normalize(subgraphs: &[Subgraph<'_>]) -> BatchNormalizationOutcome {
    batch_normalize_with_options(subgraphs, &BatchNormalizationOptions::default())
}

pub fn batch_normalize_with_options(
    subgraphs: &[Subgraph<'_>],
    options: &BatchNormalizationOptions,
) -> BatchNormalizationOutcome {
    let span = tracing::debug_span!("batch_normalize", subgraphs = subgraphs.len());
    let _guard = span.enter();

    let normalized = normalize_each(subgraphs, options);

    let mut merger = BatchMerger::new(subgraphs, options.max_or_scopes);

    for (index, (subgraph, (outcome, recording))) in subgraphs.iter().zip(normalized).enumerate() {
        recording.replay(&mut merger.graph);
        merger.merge(index, subgraph, outcome);
    }

    merger.finish()
}

fn normalize_each(
    subgraphs: &[Subgraph<'_>],
    options: &BatchNormalizationOptions,
) -> Vec<(NormalizationOutcome, RecordingGraph)> {
    let normalize_one = |subgraph: &Subgraph<'_>| {
        let subgraph_options = NormalizationOptions {
            subgraph_name: subgraph.name.map(str::to_owned),
            max_or_scopes: options.max_or_scopes,
            warnings_are_fatal: false,
        };
        let mut recording = RecordingGraph::new();
        let outcome = normalize_subgraph_with_options(subgraph.document, &subgraph_options, &mut recording);

        (outcome, recording)
    };

    #[cfg(feature = "parallel")]
    if options.parallel {
        use rayon::prelude::*;

        return subgraphs.par_iter().map(&normalize_one).collect();
    }

    subgraphs.iter().map(normalize_one).collect()
}

/// Owner of the federation-wide state during phase two.
struct BatchMerger {
    max_or_scopes: usize,
    subgraph_names: IndexSet<String>,
    non_unique_subgraph_names: IndexSet<String>,
    invalid_name_messages: Vec<String>,
    graph: Graph,
    authorization_data_by_parent_type_name: IndexMap<String, AuthorizationData>,
    invalid_or_scopes_host_paths: IndexSet<String>,
    concrete_type_names_by_abstract_type_name: IndexMap<String, IndexSet<String>>,
    entity_data_by_type_name: IndexMap<String, EntityData>,
    internal_subgraph_by_subgraph_name: IndexMap<String, InternalSubgraph>,
    overrides_by_target_subgraph_name: IndexMap<String, IndexMap<String, IndexSet<String>>>,
    override_source_subgraph_names_by_field_path: IndexMap<String, Vec<String>>,
    duplicate_overridden_field_paths: IndexSet<String>,
    validation_errors: Vec<NormalizationError>,
    warnings: Vec<Warning>,
}

impl BatchMerger {
    fn new(subgraphs: &[Subgraph<'_>], max_or_scopes: usize) -> Self {
        let mut subgraph_names = IndexSet::new();
        let mut non_unique_subgraph_names = IndexSet::new();

        // Names are recorded up front so that override targets can be validated.
        for name in subgraphs.iter().filter_map(|subgraph| subgraph.name) {
            if !subgraph_names.insert(name.to_owned()) {
                non_unique_subgraph_names.insert(name.to_owned());
            }
        }

        BatchMerger {
            max_or_scopes,
            subgraph_names,
            non_unique_subgraph_names,
            invalid_name_messages: Vec::new(),
            graph: Graph::new(),
            authorization_data_by_parent_type_name: IndexMap::new(),
            invalid_or_scopes_host_paths: IndexSet::new(),
            concrete_type_names_by_abstract_type_name: IndexMap::new(),
            entity_data_by_type_name: IndexMap::new(),
            internal_subgraph_by_subgraph_name: IndexMap::new(),
            overrides_by_target_subgraph_name: IndexMap::new(),
            override_source_subgraph_names_by_field_path: IndexMap::new(),
            duplicate_overridden_field_paths: IndexSet::new(),
            validation_errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn merge(&mut self, index: usize, subgraph: &Subgraph<'_>, outcome: NormalizationOutcome) {
        let subgraph_name = match subgraph.name {
            Some(name) => name.to_owned(),
            None => {
                let generated_name = format!("subgraph-{index}");
                self.invalid_name_messages.push(format!(
                    "The subgraph at index {index} is not named. It is reported as \"{generated_name}\"."
                ));
                generated_name
            }
        };

        let NormalizationOutcome { result, diagnostics } = outcome;
        let (errors, warnings) = diagnostics.into_parts();
        self.warnings.extend(warnings);

        let Some(result) = result else {
            tracing::warn!(subgraph_name, errors = errors.len(), "subgraph normalization failed");
            self.validation_errors
                .push(NormalizationError::SubgraphValidation { subgraph_name, errors });
            return;
        };

        for authorization_data in result.authorization_data_by_parent_type_name.values() {
            upsert_authorization_data(
                &mut self.authorization_data_by_parent_type_name,
                authorization_data,
                &mut self.invalid_or_scopes_host_paths,
                self.max_or_scopes,
            );
        }

        for (abstract_type_name, concrete_type_names) in &result.concrete_type_names_by_abstract_type_name {
            self.concrete_type_names_by_abstract_type_name
                .entry(abstract_type_name.clone())
                .or_default()
                .extend(concrete_type_names.iter().cloned());
        }

        for entity_data in result.entity_data_by_type_name.values() {
            upsert_entity_data(&mut self.entity_data_by_type_name, entity_data);
        }

        for (target_subgraph_name, overrides) in &result.overrides_by_target_subgraph_name {
            let is_target_valid = self.subgraph_names.contains(target_subgraph_name);

            for (parent_type_name, field_names) in overrides {
                // Renamed root types are reported under the name the subgraph used.
                let original_parent_type_name = result
                    .original_type_name_by_renamed_type_name
                    .get(parent_type_name)
                    .unwrap_or(parent_type_name);

                if is_target_valid {
                    self.overrides_by_target_subgraph_name
                        .entry(target_subgraph_name.clone())
                        .or_default()
                        .entry(parent_type_name.clone())
                        .or_default()
                        .extend(field_names.iter().cloned());
                } else {
                    self.warnings.push(Warning::InvalidOverrideTargetSubgraphName {
                        target_subgraph_name: target_subgraph_name.clone(),
                        parent_type_name: original_parent_type_name.clone(),
                        field_names: field_names.iter().cloned().collect(),
                        source_subgraph_name: subgraph_name.clone(),
                    });
                }

                for field_name in field_names {
                    let field_path = format!("{original_parent_type_name}.{field_name}");
                    let source_subgraph_names = self
                        .override_source_subgraph_names_by_field_path
                        .entry(field_path.clone())
                        .or_default();

                    source_subgraph_names.push(subgraph_name.clone());

                    if source_subgraph_names.len() > 1 {
                        self.duplicate_overridden_field_paths.insert(field_path);
                    }
                }
            }
        }

        if subgraph.name.is_some() {
            self.internal_subgraph_by_subgraph_name.insert(
                subgraph_name.clone(),
                InternalSubgraph {
                    name: subgraph_name,
                    url: subgraph.url.map(str::to_owned),
                    conditional_field_data_by_coordinates: result.conditional_field_data_by_coordinates,
                    configuration_data_by_type_name: result.configuration_data_by_type_name,
                    document: result.document,
                    sdl: result.sdl,
                    entity_interfaces: result.entity_interfaces,
                    is_version_two: result.is_version_two,
                    key_field_names_by_parent_type_name: result.key_field_names_by_parent_type_name,
                    operation_types: result.operation_types,
                    overridden_field_names_by_parent_type_name: IndexMap::new(),
                    parent_definition_data_by_type_name: result.parent_definition_data_by_type_name,
                    persisted_directive_definition_data_by_directive_name: result
                        .persisted_directive_definition_data_by_directive_name,
                },
            );
        }
    }

    fn finish(mut self) -> BatchNormalizationOutcome {
        let mut diagnostics = Diagnostics::default();

        if !self.invalid_or_scopes_host_paths.is_empty() {
            diagnostics.push_error(NormalizationError::OrScopesLimit {
                max_or_scopes: self.max_or_scopes,
                host_paths: self.invalid_or_scopes_host_paths.into_iter().collect(),
            });
        }

        if !self.invalid_name_messages.is_empty() || !self.non_unique_subgraph_names.is_empty() {
            diagnostics.push_error(NormalizationError::InvalidSubgraphNames {
                non_unique_subgraph_names: self.non_unique_subgraph_names.into_iter().collect(),
                invalid_name_messages: self.invalid_name_messages,
            });
        }

        if !self.duplicate_overridden_field_paths.is_empty() {
            let overrides = self
                .duplicate_overridden_field_paths
                .into_iter()
                .map(|field_path| DuplicateOverride {
                    source_subgraph_names: self
                        .override_source_subgraph_names_by_field_path
                        .swap_remove(&field_path)
                        .unwrap_or_default(),
                    field_path,
                })
                .collect();

            diagnostics.push_error(NormalizationError::DuplicateOverriddenFields { overrides });
        }

        for error in self.validation_errors {
            diagnostics.push_error(error);
        }
        diagnostics.extend_warnings(self.warnings);

        if !diagnostics.any_fatal() {
            apply_overrides(
                &mut self.internal_subgraph_by_subgraph_name,
                self.overrides_by_target_subgraph_name,
            );
        }

        tracing::debug!(
            subgraphs = self.internal_subgraph_by_subgraph_name.len(),
            errors = diagnostics.errors().len(),
            "batch normalization finished"
        );

        BatchNormalizationOutcome {
            authorization_data_by_parent_type_name: self.authorization_data_by_parent_type_name,
            concrete_type_names_by_abstract_type_name: self.concrete_type_names_by_abstract_type_name,
            entity_data_by_type_name: self.entity_data_by_type_name,
            internal_subgraph_by_subgraph_name: self.internal_subgraph_by_subgraph_name,
            graph: self.graph,
            diagnostics,
        }
    }
}

/// The target of an override no longer resolves the overridden fields. A type left without
/// resolvable fields loses its configuration.
fn apply_overrides(
    internal_subgraph_by_subgraph_name: &mut IndexMap<String, InternalSubgraph>,
    overrides_by_target_subgraph_name: IndexMap<String, IndexMap<String, IndexSet<String>>>,
) {
    for (target_subgraph_name, overrides) in overrides_by_target_subgraph_name {
        let Some(internal_subgraph) = internal_subgraph_by_subgraph_name.get_mut(&target_subgraph_name) else {
            continue;
        };

        for (parent_type_name, field_names) in &overrides {
            let Some(configuration) = internal_subgraph
                .configuration_data_by_type_name
                .get_mut(parent_type_name)
            else {
                continue;
            };

            configuration
                .field_names
                .retain(|field_name| !field_names.contains(field_name));

            if configuration.field_names.is_empty() {
                internal_subgraph
                    .configuration_data_by_type_name
                    .shift_remove(parent_type_name);
            }
        }

        internal_subgraph.overridden_field_names_by_parent_type_name = overrides;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sdl: &str) -> TypeSystemDocument {
        cynic_parser::parse_type_system_document(sdl).unwrap()
    }

    #[test]
    fn unnamed_and_repeated_subgraph_names_are_reported_together() {
        let document = parse("type Query { hello: String }");
        let subgraphs = [
            Subgraph {
                name: Some("a"),
                url: None,
                document: &document,
            },
            Subgraph {
                name: Some("a"),
                url: None,
                document: &document,
            },
            Subgraph {
                name: None,
                url: None,
                document: &document,
            },
        ];

        let outcome = batch_normalize_with_options(
            &subgraphs,
            &BatchNormalizationOptions {
                parallel: false,
                ..Default::default()
            },
        );

        assert!(!outcome.is_success());
        let [NormalizationError::InvalidSubgraphNames {
            non_unique_subgraph_names,
            invalid_name_messages,
        }] = outcome.diagnostics().errors()
        else {
            unreachable!("{:?}", outcome.diagnostics().errors());
        };

        assert_eq!(non_unique_subgraph_names, &["a"]);
        assert_eq!(invalid_name_messages.len(), 1);
        assert!(invalid_name_messages[0].contains("subgraph-2"));
    }

    #[test]
    fn overrides_remove_fields_from_the_target() {
        let mut internal_subgraph_by_subgraph_name = IndexMap::new();
        let mut configuration_data_by_type_name = IndexMap::new();
        configuration_data_by_type_name.insert(
            "Query".to_owned(),
            ConfigurationData::new("Query", true, ["a".to_owned(), "b".to_owned()].into_iter().collect()),
        );
        configuration_data_by_type_name.insert(
            "User".to_owned(),
            ConfigurationData::new("User", true, ["name".to_owned()].into_iter().collect()),
        );

        internal_subgraph_by_subgraph_name.insert(
            "accounts".to_owned(),
            InternalSubgraph {
                name: "accounts".to_owned(),
                url: None,
                conditional_field_data_by_coordinates: IndexMap::new(),
                configuration_data_by_type_name,
                document: Document::default(),
                sdl: String::new(),
                entity_interfaces: IndexMap::new(),
                is_version_two: true,
                key_field_names_by_parent_type_name: IndexMap::new(),
                operation_types: IndexMap::new(),
                overridden_field_names_by_parent_type_name: IndexMap::new(),
                parent_definition_data_by_type_name: IndexMap::new(),
                persisted_directive_definition_data_by_directive_name: IndexMap::new(),
            },
        );

        let overrides: IndexMap<String, IndexSet<String>> = [
            ("Query".to_owned(), ["a".to_owned()].into_iter().collect()),
            ("User".to_owned(), ["name".to_owned()].into_iter().collect()),
        ]
        .into_iter()
        .collect();

        apply_overrides(
            &mut internal_subgraph_by_subgraph_name,
            [("accounts".to_owned(), overrides)].into_iter().collect(),
        );

        let accounts = &internal_subgraph_by_subgraph_name["accounts"];
        assert_eq!(
            accounts.configuration_data_by_type_name["Query"]
                .field_names
                .iter()
                .collect::<Vec<_>>(),
            ["b"]
        );
        assert!(!accounts.configuration_data_by_type_name.contains_key("User"));
        assert_eq!(accounts.overridden_field_names_by_parent_type_name.len(), 2);
    }
}
