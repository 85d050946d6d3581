//! Normalization of one subgraph: collecting, consolidating, assembling.

use std::collections::{HashMap, HashSet};

use cynic_parser::TypeSystemDocument;
use indexmap::{IndexMap, IndexSet};

use crate::{
    ast::*,
    authorization::{AuthorizationData, HeirField},
    configuration::{
        ConditionalFieldData, ConfigurationData, EntityData, EntityInterfaceSubgraphData, EventConfiguration,
        FieldSetData, KeyFieldSetData, SimpleFieldData,
    },
    constants::*,
    diagnostics::{InvalidArgument, Warning},
    directive_definitions::{DirectiveDefinition, PersistedDirectiveDefinitionData, BUILT_IN_DIRECTIVE_DEFINITIONS},
    options::NormalizationOptions,
    registry::{
        CompositeOutputData, DefinitionKind, DirectivesByName, EnumDefinitionData, InputObjectDefinitionData,
        InputValueData, ParentDefinitionData, ScalarDefinitionData, UnionDefinitionData,
    },
    resolvability_graph::{Graph, ResolvabilityGraph},
    result::{NormalizationOutcome, NormalizationResult},
    type_node::TypeNode,
    Diagnostics, NormalizationError,
};

const FIELD_SET_SCALAR: &str = "openfed__FieldSet";
const SCOPE_SCALAR: &str = "openfed__Scope";
const SUBSCRIPTION_FIELD_CONDITION: &str = "openfed__SubscriptionFieldCondition";
const SUBSCRIPTION_FILTER_CONDITION: &str = "openfed__SubscriptionFilterCondition";
const SUBSCRIPTION_FILTER_VALUE: &str = "openfed__SubscriptionFilterValue";

/// The state of one subgraph normalization. The walker fills it, consolidation and assembly read it.
pub(crate) struct Normalizer<'g> {
    pub(crate) subgraph_name: String,
    pub(crate) max_or_scopes: usize,
    pub(crate) graph: &'g mut dyn ResolvabilityGraph,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) is_version_two: bool,

    // Directives
    pub(crate) custom_directive_definitions: IndexMap<String, DirectiveDefinition>,
    pub(crate) referenced_directive_names: IndexSet<String>,
    pub(crate) edfs_directive_references: IndexSet<String>,
    pub(crate) handled_repeated_directives_by_host_path: HashMap<String, HashSet<String>>,
    pub(crate) schema_directives: DirectivesByName,

    // Root types
    pub(crate) operation_types: IndexMap<OperationType, String>,
    pub(crate) operation_type_by_type_name: IndexMap<String, OperationType>,
    pub(crate) original_type_name_by_renamed_type_name: IndexMap<String, String>,

    pub(crate) parent_definition_data_by_type_name: IndexMap<String, ParentDefinitionData>,

    // Authorization
    pub(crate) authorization_data_by_parent_type_name: IndexMap<String, AuthorizationData>,
    pub(crate) leaf_type_names_with_authorization: IndexSet<String>,
    pub(crate) heir_fields: Vec<HeirField>,
    pub(crate) invalid_or_scopes_host_paths: IndexSet<String>,

    pub(crate) concrete_type_names_by_abstract_type_name: IndexMap<String, IndexSet<String>>,

    // Field sets
    pub(crate) key_field_set_data_by_type_name: IndexMap<String, KeyFieldSetData>,
    pub(crate) key_field_names_by_parent_type_name: IndexMap<String, IndexSet<String>>,
    /// Keyed by the type name as written in the document.
    pub(crate) field_set_data_by_type_name: IndexMap<String, FieldSetData>,
    pub(crate) conditional_field_data_by_coordinates: IndexMap<String, ConditionalFieldData>,

    pub(crate) overrides_by_target_subgraph_name: IndexMap<String, IndexMap<String, IndexSet<String>>>,
    pub(crate) referenced_type_names: IndexSet<String>,
    pub(crate) unvalidated_external_field_coords: IndexSet<String>,
    /// Field path to whether the field belongs to the Subscription root type.
    pub(crate) subscription_filter_field_paths: IndexMap<String, bool>,

    // Output
    pub(crate) events_by_type_name: IndexMap<String, Vec<EventConfiguration>>,
    pub(crate) configuration_data_by_type_name: IndexMap<String, ConfigurationData>,
    pub(crate) entity_data_by_type_name: IndexMap<String, EntityData>,
    pub(crate) entity_interfaces: IndexMap<String, EntityInterfaceSubgraphData>,
    pub(crate) persisted_directive_definition_data_by_directive_name:
        IndexMap<String, PersistedDirectiveDefinitionData>,
}

impl<'g> Normalizer<'g> {
    pub(crate) fn new(subgraph_name: &str, max_or_scopes: usize, graph: &'g mut dyn ResolvabilityGraph) -> Self {
        Normalizer {
            subgraph_name: subgraph_name.to_owned(),
            max_or_scopes,
            graph,
            diagnostics: Diagnostics::default(),
            is_version_two: false,
            custom_directive_definitions: IndexMap::new(),
            referenced_directive_names: IndexSet::new(),
            edfs_directive_references: IndexSet::new(),
            handled_repeated_directives_by_host_path: HashMap::new(),
            schema_directives: DirectivesByName::new(),
            operation_types: IndexMap::new(),
            operation_type_by_type_name: IndexMap::new(),
            original_type_name_by_renamed_type_name: IndexMap::new(),
            parent_definition_data_by_type_name: IndexMap::new(),
            authorization_data_by_parent_type_name: IndexMap::new(),
            leaf_type_names_with_authorization: IndexSet::new(),
            heir_fields: Vec::new(),
            invalid_or_scopes_host_paths: IndexSet::new(),
            concrete_type_names_by_abstract_type_name: IndexMap::new(),
            key_field_set_data_by_type_name: IndexMap::new(),
            key_field_names_by_parent_type_name: IndexMap::new(),
            field_set_data_by_type_name: IndexMap::new(),
            conditional_field_data_by_coordinates: IndexMap::new(),
            overrides_by_target_subgraph_name: IndexMap::new(),
            referenced_type_names: IndexSet::new(),
            unvalidated_external_field_coords: IndexSet::new(),
            subscription_filter_field_paths: IndexMap::new(),
            events_by_type_name: IndexMap::new(),
            configuration_data_by_type_name: IndexMap::new(),
            entity_data_by_type_name: IndexMap::new(),
            entity_interfaces: IndexMap::new(),
            persisted_directive_definition_data_by_directive_name: IndexMap::new(),
        }
    }

    fn is_event_driven_graph(&self) -> bool {
        !self.edfs_directive_references.is_empty()
    }

    /// Rebuild the document from the registry, validating every type on the way.
    fn assemble(&mut self) -> Document {
        self.record_entity_data();

        let mut definitions = self.directive_and_support_definitions();

        if !self.operation_types.is_empty() {
            definitions.push(Definition::Schema(SchemaDefinition {
                directives: flatten_directives(&self.schema_directives),
                operation_types: self
                    .operation_types
                    .iter()
                    .map(|(operation, type_name)| (*operation, type_name.clone()))
                    .collect(),
            }));
        }

        let registry = self.parent_definition_data_by_type_name.clone();

        for (type_name, data) in &registry {
            if type_name == FIELD_SET_SCALAR || (self.is_version_two && type_name == SCOPE_SCALAR) {
                continue;
            }

            let definition = match data {
                ParentDefinitionData::Enum(data) => self.assemble_enum(data),
                ParentDefinitionData::InputObject(data) => self.assemble_input_object(data),
                ParentDefinitionData::Interface(data) => Some(self.assemble_composite(data, DefinitionKind::Interface)),
                ParentDefinitionData::Object(data) => Some(self.assemble_composite(data, DefinitionKind::Object)),
                ParentDefinitionData::Scalar(data) => self.assemble_scalar(data),
                ParentDefinitionData::Union(data) => Some(self.assemble_union(data)),
            };

            if let Some(definition) = definition {
                definitions.push(Definition::Type(definition));
            }
        }

        let mut undefined_type_names = IndexSet::new();
        self.validate_root_types(&mut undefined_type_names);
        self.validate_referenced_types(&mut undefined_type_names);

        for type_name in undefined_type_names {
            self.diagnostics.push_error(NormalizationError::UndefinedType { type_name });
        }

        self.validate_keys();
        self.validate_provides_and_requires();
        self.record_persisted_directive_definitions();

        if self.is_event_driven_graph() {
            self.validate_event_driven_subgraph();
        }
        self.validate_subscription_filter_locations();

        for field_coords in std::mem::take(&mut self.unvalidated_external_field_coords) {
            if self.is_version_two {
                self.diagnostics
                    .push_error(NormalizationError::InvalidExternalDirective { field_coords });
            } else {
                self.diagnostics.push_warning(Warning::InvalidExternalField {
                    subgraph_name: self.subgraph_name.clone(),
                    field_coords,
                });
            }
        }

        Document { definitions }
    }

    /// Keep the custom directives with executable locations, so that operations may still apply them.
    fn record_persisted_directive_definitions(&mut self) {
        for definition in self.custom_directive_definitions.values() {
            match PersistedDirectiveDefinitionData::from_definition(definition, &self.subgraph_name) {
                Some(Ok(data)) => {
                    self.persisted_directive_definition_data_by_directive_name
                        .insert(data.name.clone(), data);
                }
                Some(Err(argument_names)) => {
                    self.diagnostics
                        .push_error(NormalizationError::DuplicateDirectiveArgumentDefinitions {
                            directive_name: definition.name.clone(),
                            argument_names,
                        });
                }
                None => (),
            }
        }
    }

    fn record_entity_data(&mut self) {
        for (type_name, data) in &self.parent_definition_data_by_type_name {
            let Some(data) = data.as_composite().filter(|data| data.is_entity) else {
                continue;
            };

            let key_field_sets = self
                .key_field_set_data_by_type_name
                .get(type_name)
                .map(|key_field_set_data| key_field_set_data.is_resolvable_by_raw_field_set.keys().cloned().collect())
                .unwrap_or_default();

            self.entity_data_by_type_name.insert(
                type_name.clone(),
                EntityData {
                    type_name: type_name.clone(),
                    key_field_sets,
                    subgraph_names: data.subgraph_names.clone(),
                },
            );
        }
    }

    fn directive_and_support_definitions(&self) -> Vec<Definition> {
        let built_ins = &*BUILT_IN_DIRECTIVE_DEFINITIONS;
        let mut definitions: Vec<_> = built_ins.base.iter().cloned().map(Definition::Directive).collect();

        if self.is_version_two {
            definitions.extend(built_ins.version_two.iter().cloned().map(Definition::Directive));
        }

        definitions.extend(
            built_ins
                .events
                .iter()
                .filter(|definition| self.edfs_directive_references.contains(&definition.name))
                .cloned()
                .map(Definition::Directive),
        );

        let uses_subscription_filter =
            self.is_event_driven_graph() && self.referenced_directive_names.contains(SUBSCRIPTION_FILTER);

        if uses_subscription_filter {
            definitions.extend(built_ins.subscription_filter.iter().cloned().map(Definition::Directive));
        }

        definitions.push(Definition::Type(scalar(FIELD_SET_SCALAR)));

        if self.is_version_two {
            definitions.push(Definition::Type(scalar(SCOPE_SCALAR)));
        }

        if uses_subscription_filter {
            definitions.extend(subscription_filter_type_definitions().into_iter().map(Definition::Type));
        }

        definitions.extend(
            self.custom_directive_definitions
                .values()
                .cloned()
                .map(Definition::Directive),
        );

        definitions
    }

    fn assemble_enum(&mut self, data: &EnumDefinitionData) -> Option<TypeDefinition> {
        if data.values.is_empty() {
            self.diagnostics.push_error(NormalizationError::NoDefinedEnumValues {
                type_name: data.name.clone(),
            });
            return None;
        }

        Some(TypeDefinition {
            name: data.name.clone(),
            description: data.description.clone(),
            directives: self.directives_with_leaf_authorization(&data.name, &data.directives),
            kind: TypeDefinitionKind::Enum {
                values: data
                    .values
                    .values()
                    .map(|value| EnumValueDefinition {
                        name: value.name.clone(),
                        description: value.description.clone(),
                        directives: flatten_directives(&value.directives),
                    })
                    .collect(),
            },
        })
    }

    fn assemble_input_object(&mut self, data: &InputObjectDefinitionData) -> Option<TypeDefinition> {
        if data.input_values.is_empty() {
            self.diagnostics
                .push_error(NormalizationError::NoInputValueDefinitions {
                    type_name: data.name.clone(),
                });
            return None;
        }

        Some(TypeDefinition {
            name: data.name.clone(),
            description: data.description.clone(),
            directives: flatten_directives(&data.directives),
            kind: TypeDefinitionKind::InputObject {
                fields: data.input_values.values().map(input_value_definition).collect(),
            },
        })
    }

    fn assemble_scalar(&mut self, data: &ScalarDefinitionData) -> Option<TypeDefinition> {
        if !data.has_base_definition {
            self.diagnostics.push_error(NormalizationError::NoBaseScalarDefinition {
                type_name: data.name.clone(),
            });
            return None;
        }

        Some(TypeDefinition {
            name: data.name.clone(),
            description: data.description.clone(),
            directives: self.directives_with_leaf_authorization(&data.name, &data.directives),
            kind: TypeDefinitionKind::Scalar,
        })
    }

    fn assemble_union(&mut self, data: &UnionDefinitionData) -> TypeDefinition {
        if data.members.is_empty() {
            self.diagnostics.push_error(NormalizationError::NoDefinedUnionMembers {
                union_name: data.name.clone(),
            });
        }

        let invalid_members: IndexMap<_, _> = data
            .members
            .iter()
            .filter_map(|member_name| {
                // Undefined members are reported as undefined types.
                let member = self.parent_definition_data_by_type_name.get(member_name)?;
                (member.kind() != DefinitionKind::Object).then(|| (member_name.clone(), member.kind()))
            })
            .collect();

        if !invalid_members.is_empty() {
            self.diagnostics.push_error(NormalizationError::InvalidUnionMemberType {
                union_name: data.name.clone(),
                invalid_members,
            });
        }

        TypeDefinition {
            name: data.name.clone(),
            description: data.description.clone(),
            directives: flatten_directives(&data.directives),
            kind: TypeDefinitionKind::Union {
                members: data.members.iter().cloned().collect(),
            },
        }
    }

    fn assemble_composite(&mut self, data: &CompositeOutputData, kind: DefinitionKind) -> TypeDefinition {
        let mut external_interface_field_names = Vec::new();

        for (field_name, field) in &data.fields {
            if kind == DefinitionKind::Interface && field.is_external_in(&self.subgraph_name) {
                external_interface_field_names.push(field_name.clone());
            }

            self.validate_arguments(&format!("{}.{field_name}", data.name), &field.arguments);
        }

        if !external_interface_field_names.is_empty() {
            if self.is_version_two {
                self.diagnostics
                    .push_error(NormalizationError::ExternalInterfaceFields {
                        type_name: data.name.clone(),
                        field_names: external_interface_field_names,
                    });
            } else {
                self.diagnostics.push_warning(Warning::ExternalInterfaceFields {
                    subgraph_name: self.subgraph_name.clone(),
                    type_name: data.name.clone(),
                    field_names: external_interface_field_names,
                });
            }
        }

        self.record_configuration(data, kind);
        self.validate_interface_implementations(data, kind);

        if data.fields.is_empty() && data.renamed_type_name != QUERY {
            self.diagnostics.push_error(NormalizationError::NoFieldDefinitions {
                kind,
                type_name: data.name.clone(),
            });
        }

        let field_authorization = self
            .authorization_data_by_parent_type_name
            .get(&data.renamed_type_name)
            .map(|authorization| &authorization.field_authorization_data_by_field_name);

        let fields = data
            .fields
            .values()
            .map(|field| {
                let mut directives = flatten_directives(&field.directives);

                if let Some(field_authorization) = field_authorization.and_then(|by_name| by_name.get(&field.name)) {
                    directives.extend(field_authorization.requirement.to_directives());
                }

                FieldDefinition {
                    name: field.name.clone(),
                    description: field.description.clone(),
                    arguments: field.arguments.values().map(input_value_definition).collect(),
                    r#type: field.r#type.clone(),
                    directives,
                }
            })
            .collect();

        let implements = data.implemented_interface_type_names.iter().cloned().collect();

        TypeDefinition {
            name: data.name.clone(),
            description: data.description.clone(),
            directives: flatten_directives(&data.directives),
            kind: match kind {
                DefinitionKind::Interface => TypeDefinitionKind::Interface { implements, fields },
                _ => TypeDefinitionKind::Object { implements, fields },
            },
        }
    }

    /// Field arguments must be input types. Undefined argument types are reported elsewhere.
    fn validate_arguments(&mut self, field_path: &str, arguments: &IndexMap<String, InputValueData>) {
        let invalid: Vec<_> = arguments
            .values()
            .filter_map(|argument| {
                let named_type = argument.r#type.named_type_name();
                let kind = self.parent_definition_data_by_type_name.get(named_type)?.kind();

                (!kind.is_input_type()).then(|| InvalidArgument {
                    argument_name: argument.name.clone(),
                    named_type: named_type.to_owned(),
                    printed_type: argument.r#type.to_string(),
                    kind,
                })
            })
            .collect();

        if !invalid.is_empty() {
            self.diagnostics.push_error(NormalizationError::InvalidArguments {
                field_path: field_path.to_owned(),
                arguments: invalid,
            });
        }
    }

    fn record_configuration(&mut self, data: &CompositeOutputData, kind: DefinitionKind) {
        let mut configuration = ConfigurationData::new(
            &data.renamed_type_name,
            self.entity_data_by_type_name.contains_key(&data.name),
            IndexSet::new(),
        );

        for (field_name, field) in &data.fields {
            if field.is_external_in(&self.subgraph_name) {
                configuration.external_field_names.insert(field_name.clone());
            } else {
                configuration.field_names.insert(field_name.clone());
            }
        }

        let is_interface_object = kind == DefinitionKind::Object && data.directives.contains_key(INTERFACE_OBJECT);
        let is_entity_interface = kind == DefinitionKind::Interface && data.is_entity;

        if is_interface_object || is_entity_interface {
            let concrete_type_names = self
                .concrete_type_names_by_abstract_type_name
                .get(&data.name)
                .cloned()
                .unwrap_or_default();
            let field_names: IndexSet<String> = data.fields.keys().cloned().collect();
            let resolvable = self
                .key_field_set_data_by_type_name
                .get(&data.name)
                .map_or(true, |keys| keys.is_resolvable_by_raw_field_set.values().any(|resolvable| *resolvable));

            self.entity_interfaces.insert(
                data.name.clone(),
                EntityInterfaceSubgraphData {
                    type_name: data.name.clone(),
                    subgraph_name: self.subgraph_name.clone(),
                    concrete_type_names: concrete_type_names.clone(),
                    field_datas: data
                        .fields
                        .values()
                        .map(|field| SimpleFieldData {
                            name: field.name.clone(),
                            named_type_name: field.named_type_name().to_owned(),
                        })
                        .collect(),
                    interface_field_names: if is_entity_interface { field_names.clone() } else { IndexSet::new() },
                    interface_object_field_names: if is_interface_object { field_names } else { IndexSet::new() },
                    is_interface_object,
                    resolvable,
                },
            );

            configuration.is_interface_object = is_interface_object;
            configuration.entity_interface_concrete_type_names = Some(concrete_type_names);
        }

        if let Some(events) = self.events_by_type_name.get(&data.renamed_type_name) {
            configuration.events = events.clone();
        }

        self.configuration_data_by_type_name
            .insert(data.renamed_type_name.clone(), configuration);
    }

    fn validate_root_types(&mut self, undefined_type_names: &mut IndexSet<String>) {
        for operation in OperationType::ALL {
            let default_type_name = operation.default_type_name();
            let declared_type_name = self.operation_types.get(&operation).cloned();
            let type_name = declared_type_name
                .clone()
                .unwrap_or_else(|| default_type_name.to_owned());

            if type_name != default_type_name && self.parent_definition_data_by_type_name.contains_key(default_type_name) {
                self.diagnostics
                    .push_error(NormalizationError::InvalidRootTypeDefinition {
                        operation,
                        type_name,
                        default_type_name: default_type_name.to_owned(),
                    });
                continue;
            }

            let Some(data) = self.parent_definition_data_by_type_name.get(&type_name) else {
                if declared_type_name.is_some() {
                    undefined_type_names.insert(type_name);
                }
                continue;
            };

            if let Some(configuration) = self.configuration_data_by_type_name.get_mut(default_type_name) {
                configuration.is_root_node = true;
            }

            let ParentDefinitionData::Object(object) = data else {
                self.diagnostics.push_error(NormalizationError::OperationDefinition {
                    type_name,
                    operation,
                    actual_kind: data.kind(),
                });
                continue;
            };

            for field in object.fields.values() {
                let named_type_name = field.named_type_name();

                if !is_implicitly_defined_type(named_type_name)
                    && !self.parent_definition_data_by_type_name.contains_key(named_type_name)
                {
                    undefined_type_names.insert(named_type_name.to_owned());
                }
            }
        }
    }

    fn validate_referenced_types(&mut self, undefined_type_names: &mut IndexSet<String>) {
        for type_name in &self.referenced_type_names {
            match self.parent_definition_data_by_type_name.get(type_name) {
                Some(ParentDefinitionData::Interface(_)) => {
                    let is_implemented = self
                        .concrete_type_names_by_abstract_type_name
                        .get(type_name)
                        .is_some_and(|concrete_type_names| !concrete_type_names.is_empty());

                    if !is_implemented {
                        self.diagnostics
                            .push_warning(Warning::UnimplementedInterfaceOutputType {
                                subgraph_name: self.subgraph_name.clone(),
                                interface_name: type_name.clone(),
                            });
                    }
                }
                Some(_) => (),
                None if is_implicitly_defined_type(type_name) => (),
                None => {
                    undefined_type_names.insert(type_name.clone());
                }
            }
        }
    }

    /// Enum and scalar directives, with the authorization requirement of the type printed back on.
    fn directives_with_leaf_authorization(&self, type_name: &str, directives: &DirectivesByName) -> Vec<Directive> {
        let mut directives = flatten_directives(directives);

        if let Some(authorization) = self
            .authorization_data_by_parent_type_name
            .get(type_name)
            .filter(|_| self.leaf_type_names_with_authorization.contains(type_name))
        {
            directives.extend(authorization.requirement.to_directives());
        }

        directives
    }

    fn into_result(self, document: Document) -> NormalizationResult {
        let sdl = document.to_string();
        let is_event_driven_graph = self.is_event_driven_graph();

        NormalizationResult {
            document,
            sdl,
            authorization_data_by_parent_type_name: self.authorization_data_by_parent_type_name,
            concrete_type_names_by_abstract_type_name: self.concrete_type_names_by_abstract_type_name,
            conditional_field_data_by_coordinates: self.conditional_field_data_by_coordinates,
            configuration_data_by_type_name: self.configuration_data_by_type_name,
            entity_data_by_type_name: self.entity_data_by_type_name,
            entity_interfaces: self.entity_interfaces,
            is_event_driven_graph,
            is_version_two: self.is_version_two,
            key_field_names_by_parent_type_name: self.key_field_names_by_parent_type_name,
            operation_types: self.operation_types,
            original_type_name_by_renamed_type_name: self.original_type_name_by_renamed_type_name,
            overrides_by_target_subgraph_name: self.overrides_by_target_subgraph_name,
            parent_definition_data_by_type_name: self.parent_definition_data_by_type_name,
            persisted_directive_definition_data_by_directive_name: self
                .persisted_directive_definition_data_by_directive_name,
            subgraph_name: self.subgraph_name,
        }
    }
}

fn flatten_directives(directives: &DirectivesByName) -> Vec<Directive> {
    directives.values().flatten().cloned().collect()
}

fn input_value_definition(input_value: &InputValueData) -> InputValueDefinition {
    InputValueDefinition {
        name: input_value.name.clone(),
        description: input_value.description.clone(),
        r#type: input_value.r#type.clone(),
        default_value: input_value.default_value.clone(),
        directives: flatten_directives(&input_value.directives),
    }
}

fn scalar(name: &str) -> TypeDefinition {
    TypeDefinition {
        name: name.to_owned(),
        description: None,
        directives: Vec::new(),
        kind: TypeDefinitionKind::Scalar,
    }
}

fn named(name: &str) -> TypeNode {
    TypeNode::Named(name.to_owned())
}

fn list(inner: TypeNode) -> TypeNode {
    TypeNode::List(Box::new(inner))
}

fn input_value(name: &str, r#type: TypeNode) -> InputValueDefinition {
    InputValueDefinition {
        name: name.to_owned(),
        description: None,
        r#type,
        default_value: None,
        directives: Vec::new(),
    }
}

/// The input types accepted by `@openfed__subscriptionFilter(condition:)`.
fn subscription_filter_type_definitions() -> Vec<TypeDefinition> {
    vec![
        TypeDefinition {
            name: SUBSCRIPTION_FIELD_CONDITION.to_owned(),
            description: None,
            directives: Vec::new(),
            kind: TypeDefinitionKind::InputObject {
                fields: vec![
                    input_value("fieldPath", named("String").non_null()),
                    input_value("values", list(named(SUBSCRIPTION_FILTER_VALUE)).non_null()),
                ],
            },
        },
        TypeDefinition {
            name: SUBSCRIPTION_FILTER_CONDITION.to_owned(),
            description: None,
            directives: Vec::new(),
            kind: TypeDefinitionKind::InputObject {
                fields: vec![
                    input_value("AND", list(named(SUBSCRIPTION_FILTER_CONDITION).non_null())),
                    input_value("IN", named(SUBSCRIPTION_FIELD_CONDITION)),
                    input_value("NOT", named(SUBSCRIPTION_FILTER_CONDITION)),
                    input_value("OR", list(named(SUBSCRIPTION_FILTER_CONDITION).non_null())),
                ],
            },
        },
        scalar(SUBSCRIPTION_FILTER_VALUE),
    ]
}

/// Normalize one parsed subgraph. `subgraph_name` defaults to `N/A`.
pub fn normalize_subgraph(
    document: &TypeSystemDocument,
    subgraph_name: Option<&str>,
    graph: &mut dyn ResolvabilityGraph,
) -> NormalizationOutcome {
    let options = NormalizationOptions {
        subgraph_name: subgraph_name.map(str::to_owned),
        ..Default::default()
    };

    normalize_subgraph_with_options(document, &options, graph)
}

pub fn normalize_subgraph_with_options(
    document: &TypeSystemDocument,
    options: &NormalizationOptions,
    graph: &mut dyn ResolvabilityGraph,
) -> NormalizationOutcome {
    let subgraph_name = options.subgraph_name.as_deref().unwrap_or(NOT_APPLICABLE);
    let span = tracing::debug_span!("normalize_subgraph", subgraph_name);
    let _guard = span.enter();

    graph.set_subgraph_name(subgraph_name);
    let mut normalizer = Normalizer::new(subgraph_name, options.max_or_scopes, graph);

    tracing::debug!("collecting");
    normalizer.walk_document(document);

    tracing::debug!("consolidating");
    normalizer.consolidate_authorization();

    tracing::debug!("assembling");
    let document = normalizer.assemble();

    if options.warnings_are_fatal {
        normalizer.diagnostics.promote_warnings();
    }

    if normalizer.diagnostics.any_fatal() {
        tracing::debug!(errors = normalizer.diagnostics.errors().len(), "normalization failed");

        return NormalizationOutcome {
            result: None,
            diagnostics: normalizer.diagnostics,
        };
    }

    tracing::debug!(types = normalizer.parent_definition_data_by_type_name.len(), "normalization succeeded");

    let diagnostics = std::mem::take(&mut normalizer.diagnostics);

    NormalizationOutcome {
        result: Some(normalizer.into_result(document)),
        diagnostics,
    }
}

/// Parse and normalize a subgraph without a name, against a throwaway resolvability graph.
pub fn normalize_subgraph_from_str(sdl: &str) -> NormalizationOutcome {
    let document = match cynic_parser::parse_type_system_document(sdl) {
        Ok(document) => document,
        Err(error) => {
            let mut diagnostics = Diagnostics::default();
            diagnostics.push_error(NormalizationError::InvalidSyntax(error.to_string()));

            return NormalizationOutcome {
                result: None,
                diagnostics,
            };
        }
    };

    normalize_subgraph(&document, None, &mut Graph::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_filter_types_print() {
        let document = Document {
            definitions: subscription_filter_type_definitions()
                .into_iter()
                .map(Definition::Type)
                .collect(),
        };

        let expected = r#"input openfed__SubscriptionFieldCondition {
  fieldPath: String!
  values: [openfed__SubscriptionFilterValue]!
}

input openfed__SubscriptionFilterCondition {
  AND: [openfed__SubscriptionFilterCondition!]
  IN: openfed__SubscriptionFieldCondition
  NOT: openfed__SubscriptionFilterCondition
  OR: [openfed__SubscriptionFilterCondition!]
}

scalar openfed__SubscriptionFilterValue"#;

        pretty_assertions::assert_eq!(document.to_string(), expected);
    }

    #[test]
    fn unnamed_subgraphs_are_not_applicable() {
        let outcome = normalize_subgraph_from_str("type Query { hello: String }");
        let result = outcome.into_result().unwrap();

        assert_eq!(result.subgraph_name, "N/A");
        assert!(!result.is_version_two);
        assert!(result.configuration_data_by_type_name["Query"].is_root_node);
    }
}
