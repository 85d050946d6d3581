//! Merging of type definitions and extensions into the registry, one sighting at a time.

use indexmap::{IndexMap, IndexSet};

use super::*;
use crate::{
    ast::OperationType,
    authorization::AuthorizationHost,
    configuration::KeyFieldSetData,
    constants::*,
    directive_definitions::DirectiveLocations,
    normalize::Normalizer,
    resolvability_graph::NodeOptions,
    NormalizationError,
};

/// One definition or extension node of a named type.
#[derive(Debug, Clone)]
pub(crate) struct TypeSighting<'a> {
    pub(crate) name: &'a str,
    pub(crate) description: Option<String>,
    pub(crate) directives: Vec<Directive>,
    /// Declared with the `extend` keyword. A V1 `@extends` does not count.
    pub(crate) is_real_extension: bool,
}

/// Merge the extension type of a new sighting. Returns false for a second base definition.
fn merge_extension_type(existing: &mut ExtensionType, has_base_definition: &mut bool, incoming: ExtensionType) -> bool {
    if incoming == ExtensionType::Real {
        *existing = ExtensionType::Real;
        return true;
    }

    if *has_base_definition {
        return false;
    }

    *has_base_definition = true;

    if *existing != ExtensionType::Real {
        *existing = incoming;
    }

    true
}

fn merge_description(existing: &mut Option<String>, incoming: Option<String>) {
    if existing.as_deref().map_or(true, str::is_empty) {
        *existing = incoming.filter(|description| !description.is_empty());
    }
}

impl Normalizer<'_> {
    pub(crate) fn is_root_type_name(&self, type_name: &str) -> bool {
        OperationType::from_default_type_name(type_name).is_some()
            || self.operation_type_by_type_name.contains_key(type_name)
    }

    /// The canonical root type name for a renamed root type, otherwise the name itself.
    pub(crate) fn renamed_type_name(&self, type_name: &str) -> String {
        self.operation_type_by_type_name
            .get(type_name)
            .map(|operation| operation.default_type_name().to_owned())
            .unwrap_or_else(|| type_name.to_owned())
    }

    fn node_extension_type(&self, is_real_extension: bool, has_extends: bool, is_root_type: bool) -> ExtensionType {
        if is_real_extension {
            ExtensionType::Real
        } else if is_root_type || self.is_version_two || !has_extends {
            ExtensionType::None
        } else {
            ExtensionType::Extends
        }
    }

    /// Pushes an error when `type_name` is already registered with another kind.
    fn is_kind_consistent(&mut self, type_name: &str, incoming_kind: DefinitionKind) -> bool {
        let Some(existing) = self.parent_definition_data_by_type_name.get(type_name) else {
            return true;
        };

        if existing.kind() == incoming_kind {
            return true;
        }

        self.diagnostics
            .push_error(NormalizationError::MultipleNamedTypeDefinition {
                type_name: type_name.to_owned(),
                existing_kind: existing.kind(),
                incoming_kind,
            });

        false
    }

    fn existing_directives(&self, type_name: &str) -> DirectivesByName {
        self.parent_definition_data_by_type_name
            .get(type_name)
            .map(|data| data.directives().clone())
            .unwrap_or_default()
    }

    fn push_duplicate_type_definition(&mut self, kind: DefinitionKind, type_name: &str) {
        self.diagnostics.push_error(NormalizationError::DuplicateTypeDefinition {
            kind,
            type_name: type_name.to_owned(),
        });
    }

    fn extract_implemented_interfaces(
        &mut self,
        kind: DefinitionKind,
        type_name: &str,
        implements: &[&str],
        implemented_interface_type_names: &mut IndexSet<String>,
    ) {
        for interface_name in implements {
            if !implemented_interface_type_names.insert((*interface_name).to_owned()) {
                self.diagnostics
                    .push_error(NormalizationError::DuplicateImplementedInterface {
                        kind,
                        type_name: type_name.to_owned(),
                        interface_name: (*interface_name).to_owned(),
                    });
            }
        }
    }

    fn add_concrete_type_names_for_implemented_interfaces(&mut self, concrete_type_name: &str) {
        let interface_names = match self.parent_definition_data_by_type_name.get(concrete_type_name) {
            Some(ParentDefinitionData::Object(data)) => data.implemented_interface_type_names.clone(),
            _ => return,
        };

        for interface_name in interface_names {
            self.concrete_type_names_by_abstract_type_name
                .entry(interface_name.clone())
                .or_default()
                .insert(concrete_type_name.to_owned());

            let source = self.graph.add_or_update_node(&interface_name, NodeOptions::ABSTRACT);
            let target = self.graph.add_or_update_node(concrete_type_name, NodeOptions::default());
            self.graph.add_edge(source, target, concrete_type_name, true);
        }
    }

    fn record_key_field_sets(&mut self, type_name: &str, directives: &DirectivesByName) {
        let Some(keys) = directives.get(KEY) else {
            return;
        };

        let key_field_set_data = self
            .key_field_set_data_by_type_name
            .entry(type_name.to_owned())
            .or_insert_with(KeyFieldSetData::default);

        for key in keys {
            let Some(fields) = key.argument(FIELDS).and_then(Value::as_str) else {
                continue;
            };
            let is_resolvable = key.argument(RESOLVABLE).and_then(Value::as_bool).unwrap_or(true);

            key_field_set_data
                .is_resolvable_by_raw_field_set
                .entry(fields.to_owned())
                .or_insert(is_resolvable);
        }
    }

    /// Shared by objects and interfaces. Returns false when the sighting was rejected.
    fn upsert_composite_output_data(&mut self, sighting: TypeSighting<'_>, implements: &[&str], kind: DefinitionKind) -> bool {
        let type_name = sighting.name;

        if !self.is_kind_consistent(type_name, kind) {
            return false;
        }

        let location = match kind {
            DefinitionKind::Interface => DirectiveLocations::INTERFACE,
            _ => DirectiveLocations::OBJECT,
        };

        let mut directives = self.existing_directives(type_name);
        let has_extends = self.extract_directives(&sighting.directives, location, type_name, &mut directives);
        let is_root_type = kind == DefinitionKind::Object && self.is_root_type_name(type_name);
        let extension_type = self.node_extension_type(sighting.is_real_extension, has_extends, is_root_type);

        self.record_key_field_sets(type_name, &directives);

        let mut implemented_interface_type_names = self
            .parent_definition_data_by_type_name
            .get(type_name)
            .and_then(ParentDefinitionData::as_composite)
            .map(|data| data.implemented_interface_type_names.clone())
            .unwrap_or_default();
        self.extract_implemented_interfaces(kind, type_name, implements, &mut implemented_interface_type_names);

        let subgraph_name = self.subgraph_name.clone();
        let renamed_type_name = self.renamed_type_name(type_name);

        match self
            .parent_definition_data_by_type_name
            .get_mut(type_name)
            .and_then(ParentDefinitionData::as_composite_mut)
        {
            Some(data) => {
                let is_unique = merge_extension_type(&mut data.extension_type, &mut data.has_base_definition, extension_type);

                data.is_entity |= directives.contains_key(KEY);
                data.is_inaccessible |= directives.contains_key(INACCESSIBLE);
                data.directives = directives;
                data.implemented_interface_type_names = implemented_interface_type_names;
                data.subgraph_names.insert(subgraph_name);
                merge_description(&mut data.description, sighting.description);

                if !is_unique {
                    self.push_duplicate_type_definition(kind, type_name);
                }
            }
            None => {
                let data = CompositeOutputData {
                    name: type_name.to_owned(),
                    description: sighting.description.filter(|description| !description.is_empty()),
                    is_entity: directives.contains_key(KEY),
                    is_inaccessible: directives.contains_key(INACCESSIBLE),
                    directives,
                    extension_type,
                    has_base_definition: extension_type != ExtensionType::Real,
                    fields: IndexMap::new(),
                    implemented_interface_type_names,
                    is_root_type,
                    renamed_type_name,
                    subgraph_names: IndexSet::from([subgraph_name]),
                };

                let data = match kind {
                    DefinitionKind::Interface => ParentDefinitionData::Interface(data),
                    _ => ParentDefinitionData::Object(data),
                };

                self.parent_definition_data_by_type_name.insert(type_name.to_owned(), data);
            }
        }

        if kind == DefinitionKind::Object {
            self.add_concrete_type_names_for_implemented_interfaces(type_name);
        }

        tracing::trace!(type_name, %kind, ?extension_type, "upserted type");

        true
    }

    pub(crate) fn upsert_object_data(&mut self, sighting: TypeSighting<'_>, implements: &[&str]) -> bool {
        self.upsert_composite_output_data(sighting, implements, DefinitionKind::Object)
    }

    pub(crate) fn upsert_interface_data(&mut self, sighting: TypeSighting<'_>, implements: &[&str]) -> bool {
        self.upsert_composite_output_data(sighting, implements, DefinitionKind::Interface)
    }

    pub(crate) fn upsert_enum_data(&mut self, sighting: TypeSighting<'_>) -> bool {
        let type_name = sighting.name;
        if !self.is_kind_consistent(type_name, DefinitionKind::Enum) {
            return false;
        }

        self.graph.add_or_update_node(type_name, NodeOptions::LEAF);

        let mut directives = self.existing_directives(type_name);
        self.extract_directives_and_authorization(
            &sighting.directives,
            DirectiveLocations::ENUM,
            &mut directives,
            AuthorizationHost::Leaf { type_name },
        );
        let extension_type = self.node_extension_type(sighting.is_real_extension, false, false);

        match self.parent_definition_data_by_type_name.get_mut(type_name) {
            Some(ParentDefinitionData::Enum(data)) => {
                let is_unique = merge_extension_type(&mut data.extension_type, &mut data.has_base_definition, extension_type);
                data.directives = directives;
                merge_description(&mut data.description, sighting.description);

                if !is_unique {
                    self.push_duplicate_type_definition(DefinitionKind::Enum, type_name);
                }
            }
            _ => {
                self.parent_definition_data_by_type_name.insert(
                    type_name.to_owned(),
                    ParentDefinitionData::Enum(EnumDefinitionData {
                        name: type_name.to_owned(),
                        description: sighting.description.filter(|description| !description.is_empty()),
                        directives,
                        extension_type,
                        has_base_definition: extension_type != ExtensionType::Real,
                        values: IndexMap::new(),
                    }),
                );
            }
        }

        tracing::trace!(type_name, kind = "enum", ?extension_type, "upserted type");

        true
    }

    pub(crate) fn upsert_input_object_data(&mut self, sighting: TypeSighting<'_>) -> bool {
        let type_name = sighting.name;

        if !self.is_kind_consistent(type_name, DefinitionKind::InputObject) {
            return false;
        }

        let mut directives = self.existing_directives(type_name);
        self.extract_directives(&sighting.directives, DirectiveLocations::INPUT_OBJECT, type_name, &mut directives);
        let extension_type = self.node_extension_type(sighting.is_real_extension, false, false);
        let subgraph_name = self.subgraph_name.clone();

        match self.parent_definition_data_by_type_name.get_mut(type_name) {
            Some(ParentDefinitionData::InputObject(data)) => {
                let is_unique = merge_extension_type(&mut data.extension_type, &mut data.has_base_definition, extension_type);
                data.is_inaccessible |= directives.contains_key(INACCESSIBLE);
                data.directives = directives;
                data.subgraph_names.insert(subgraph_name);
                merge_description(&mut data.description, sighting.description);

                if !is_unique {
                    self.push_duplicate_type_definition(DefinitionKind::InputObject, type_name);
                }
            }
            _ => {
                self.parent_definition_data_by_type_name.insert(
                    type_name.to_owned(),
                    ParentDefinitionData::InputObject(InputObjectDefinitionData {
                        name: type_name.to_owned(),
                        description: sighting.description.filter(|description| !description.is_empty()),
                        is_inaccessible: directives.contains_key(INACCESSIBLE),
                        directives,
                        extension_type,
                        has_base_definition: extension_type != ExtensionType::Real,
                        input_values: IndexMap::new(),
                        subgraph_names: IndexSet::from([subgraph_name]),
                    }),
                );
            }
        }

        tracing::trace!(type_name, kind = "input object", ?extension_type, "upserted type");

        true
    }

    pub(crate) fn upsert_scalar_data(&mut self, sighting: TypeSighting<'_>) -> bool {
        let type_name = sighting.name;
        if !self.is_kind_consistent(type_name, DefinitionKind::Scalar) {
            return false;
        }

        self.graph.add_or_update_node(type_name, NodeOptions::LEAF);

        let mut directives = self.existing_directives(type_name);
        self.extract_directives_and_authorization(
            &sighting.directives,
            DirectiveLocations::SCALAR,
            &mut directives,
            AuthorizationHost::Leaf { type_name },
        );
        let extension_type = self.node_extension_type(sighting.is_real_extension, false, false);

        match self.parent_definition_data_by_type_name.get_mut(type_name) {
            Some(ParentDefinitionData::Scalar(data)) => {
                let is_unique = merge_extension_type(&mut data.extension_type, &mut data.has_base_definition, extension_type);
                data.directives = directives;
                merge_description(&mut data.description, sighting.description);

                if !is_unique {
                    self.push_duplicate_type_definition(DefinitionKind::Scalar, type_name);
                }
            }
            _ => {
                self.parent_definition_data_by_type_name.insert(
                    type_name.to_owned(),
                    ParentDefinitionData::Scalar(ScalarDefinitionData {
                        name: type_name.to_owned(),
                        description: sighting.description.filter(|description| !description.is_empty()),
                        directives,
                        extension_type,
                        has_base_definition: extension_type != ExtensionType::Real,
                    }),
                );
            }
        }

        tracing::trace!(type_name, kind = "scalar", ?extension_type, "upserted type");

        true
    }

    pub(crate) fn upsert_union_data(&mut self, sighting: TypeSighting<'_>, members: &[&str]) -> bool {
        let type_name = sighting.name;

        if !self.is_kind_consistent(type_name, DefinitionKind::Union) {
            return false;
        }

        let mut directives = self.existing_directives(type_name);
        self.extract_directives(&sighting.directives, DirectiveLocations::UNION, type_name, &mut directives);
        let extension_type = self.node_extension_type(sighting.is_real_extension, false, false);

        let mut member_names = match self.parent_definition_data_by_type_name.get(type_name) {
            Some(ParentDefinitionData::Union(data)) => data.members.clone(),
            _ => IndexSet::new(),
        };

        for member_name in members {
            if !member_names.insert((*member_name).to_owned()) {
                self.diagnostics
                    .push_error(NormalizationError::DuplicateUnionMemberDefinition {
                        union_name: type_name.to_owned(),
                        member_name: (*member_name).to_owned(),
                    });
                continue;
            }

            self.concrete_type_names_by_abstract_type_name
                .entry(type_name.to_owned())
                .or_default()
                .insert((*member_name).to_owned());

            let source = self.graph.add_or_update_node(type_name, NodeOptions::ABSTRACT);
            let target = self.graph.add_or_update_node(member_name, NodeOptions::default());
            self.graph.add_edge(source, target, member_name, true);

            // Built-in scalars are never registered, so referencing them would double the invalid member error.
            if !BUILT_IN_SCALARS.contains(member_name) {
                self.referenced_type_names.insert((*member_name).to_owned());
            }
        }

        match self.parent_definition_data_by_type_name.get_mut(type_name) {
            Some(ParentDefinitionData::Union(data)) => {
                let is_unique = merge_extension_type(&mut data.extension_type, &mut data.has_base_definition, extension_type);
                data.directives = directives;
                data.members = member_names;
                merge_description(&mut data.description, sighting.description);

                if !is_unique {
                    self.push_duplicate_type_definition(DefinitionKind::Union, type_name);
                }
            }
            _ => {
                self.parent_definition_data_by_type_name.insert(
                    type_name.to_owned(),
                    ParentDefinitionData::Union(UnionDefinitionData {
                        name: type_name.to_owned(),
                        description: sighting.description.filter(|description| !description.is_empty()),
                        directives,
                        extension_type,
                        has_base_definition: extension_type != ExtensionType::Real,
                        members: member_names,
                    }),
                );
            }
        }

        tracing::trace!(type_name, kind = "union", ?extension_type, "upserted type");

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_type_is_real_in_either_order() {
        let mut base_first = ExtensionType::None;
        let mut has_base = true;
        assert!(merge_extension_type(&mut base_first, &mut has_base, ExtensionType::Real));
        assert_eq!(base_first, ExtensionType::Real);

        let mut extension_first = ExtensionType::Real;
        let mut has_base = false;
        assert!(merge_extension_type(&mut extension_first, &mut has_base, ExtensionType::None));
        assert_eq!(extension_first, ExtensionType::Real);
        assert!(has_base);
    }

    #[test]
    fn second_base_definition_is_a_duplicate() {
        let mut extension_type = ExtensionType::Extends;
        let mut has_base = true;

        assert!(!merge_extension_type(&mut extension_type, &mut has_base, ExtensionType::None));
        assert_eq!(extension_type, ExtensionType::Extends);
    }

    #[test]
    fn first_description_wins() {
        let mut description = None;
        merge_description(&mut description, Some(String::new()));
        merge_description(&mut description, Some("first".to_owned()));
        merge_description(&mut description, Some("second".to_owned()));

        assert_eq!(description.as_deref(), Some("first"));
    }
}
