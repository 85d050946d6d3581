//! The single pass over a parsed subgraph document that fills the registry.

use cynic_parser::type_system as ast;
use indexmap::IndexMap;

use crate::{
    ast::{Directive, OperationType},
    authorization::{AuthorizationHost, HeirField},
    constants::*,
    directive_definitions::{is_built_in_directive, DirectiveDefinition, DirectiveLocations},
    normalize::Normalizer,
    registry::{
        DefinitionKind, DirectivesByName, EnumValueData, FieldData, InputValueData, ParentDefinitionData, TypeSighting,
    },
    type_node::TypeNode,
    value::Value,
    NormalizationError,
};

fn description(description: Option<ast::Description<'_>>) -> Option<String> {
    description.map(|description| description.to_cow().into_owned())
}

fn directives<'a>(directives: impl Iterator<Item = ast::Directive<'a>>) -> Vec<Directive> {
    directives.map(Directive::from_ast).collect()
}

/// Every directive name applied anywhere in the document.
fn applied_directive_names<'a>(document: &'a ast::TypeSystemDocument) -> Vec<&'a str> {
    let mut names = Vec::new();

    for definition in document.definitions() {
        match definition {
            ast::Definition::Schema(schema) | ast::Definition::SchemaExtension(schema) => {
                names.extend(schema.directives().map(|directive| directive.name()));
            }
            ast::Definition::Type(ty) | ast::Definition::TypeExtension(ty) => {
                names.extend(ty.directives().map(|directive| directive.name()));

                match ty {
                    ast::TypeDefinition::Object(object) => {
                        for field in object.fields() {
                            names.extend(field.directives().map(|directive| directive.name()));
                            for argument in field.arguments() {
                                names.extend(argument.directives().map(|directive| directive.name()));
                            }
                        }
                    }
                    ast::TypeDefinition::Interface(interface) => {
                        for field in interface.fields() {
                            names.extend(field.directives().map(|directive| directive.name()));
                            for argument in field.arguments() {
                                names.extend(argument.directives().map(|directive| directive.name()));
                            }
                        }
                    }
                    ast::TypeDefinition::Enum(enum_type) => {
                        for value in enum_type.values() {
                            names.extend(value.directives().map(|directive| directive.name()));
                        }
                    }
                    ast::TypeDefinition::InputObject(input_object) => {
                        for field in input_object.fields() {
                            names.extend(field.directives().map(|directive| directive.name()));
                        }
                    }
                    ast::TypeDefinition::Scalar(_) | ast::TypeDefinition::Union(_) => (),
                }
            }
            ast::Definition::Directive(_) => (),
        }
    }

    names
}

impl Normalizer<'_> {
    pub(crate) fn walk_document(&mut self, document: &ast::TypeSystemDocument) {
        self.collect_document_metadata(document);

        for definition in document.definitions() {
            match definition {
                ast::Definition::Type(ty) => self.walk_type_definition(ty, false),
                ast::Definition::TypeExtension(ty) => self.walk_type_definition(ty, true),
                ast::Definition::Schema(schema) | ast::Definition::SchemaExtension(schema) => {
                    let mut accumulated = std::mem::take(&mut self.schema_directives);
                    self.extract_directives(
                        &directives(schema.directives()),
                        DirectiveLocations::SCHEMA,
                        "schema",
                        &mut accumulated,
                    );
                    self.schema_directives = accumulated;
                }
                ast::Definition::Directive(_) => (),
            }
        }
    }

    /// Root operation types, custom directive definitions, V2 and event-driven markers. Everything
    /// the main pass needs before it visits the first type.
    fn collect_document_metadata(&mut self, document: &ast::TypeSystemDocument) {
        for name in applied_directive_names(document) {
            if VERSION_TWO_DIRECTIVES.contains(&name) {
                self.is_version_two = true;
            }

            if EVENT_DIRECTIVES.contains(&name) {
                self.edfs_directive_references.insert(name.to_owned());
            }

            self.referenced_directive_names.insert(name.to_owned());
        }

        for definition in document.definitions() {
            match definition {
                ast::Definition::Schema(schema) | ast::Definition::SchemaExtension(schema) => {
                    for (operation, root) in [
                        (OperationType::Query, schema.query_type()),
                        (OperationType::Mutation, schema.mutation_type()),
                        (OperationType::Subscription, schema.subscription_type()),
                    ] {
                        if let Some(root) = root {
                            self.record_operation_type(operation, root.named_type());
                        }
                    }
                }
                ast::Definition::Directive(definition) => {
                    let definition = DirectiveDefinition::from_ast(definition);

                    if is_built_in_directive(&definition.name) {
                        continue;
                    }

                    if self.custom_directive_definitions.contains_key(&definition.name) {
                        self.diagnostics
                            .push_error(NormalizationError::DuplicateDirectiveDefinition {
                                directive_name: definition.name,
                            });
                        continue;
                    }

                    self.custom_directive_definitions
                        .insert(definition.name.clone(), definition);
                }
                ast::Definition::Type(_) | ast::Definition::TypeExtension(_) => (),
            }
        }
    }

    fn record_operation_type(&mut self, operation: OperationType, type_name: &str) {
        if let Some(existing_type_name) = self.operation_types.get(&operation) {
            if existing_type_name != type_name {
                self.diagnostics
                    .push_error(NormalizationError::DuplicateOperationTypeDefinition {
                        operation,
                        new_type_name: type_name.to_owned(),
                        existing_type_name: existing_type_name.clone(),
                    });
            }
            return;
        }

        self.operation_types.insert(operation, type_name.to_owned());
        self.operation_type_by_type_name
            .insert(type_name.to_owned(), operation);

        if type_name != operation.default_type_name() {
            self.original_type_name_by_renamed_type_name
                .insert(operation.default_type_name().to_owned(), type_name.to_owned());
        }
    }

    fn walk_type_definition(&mut self, ty: ast::TypeDefinition<'_>, is_real_extension: bool) {
        let type_name = ty.name();

        let sighting = TypeSighting {
            name: type_name,
            description: description(ty.description()),
            directives: directives(ty.directives()),
            is_real_extension,
        };

        match ty {
            ast::TypeDefinition::Object(_) if type_name == SERVICE_TYPE => (),
            ast::TypeDefinition::Union(_) if type_name == ENTITY_UNION => (),
            ast::TypeDefinition::Object(object) => {
                let implements: Vec<_> = object.implements_interfaces().collect();
                if self.upsert_object_data(sighting, &implements) {
                    self.walk_fields(type_name, object.fields(), is_real_extension);
                }
            }
            ast::TypeDefinition::Interface(interface) => {
                let implements: Vec<_> = interface.implements_interfaces().collect();
                if self.upsert_interface_data(sighting, &implements) {
                    self.walk_fields(type_name, interface.fields(), is_real_extension);
                }
            }
            ast::TypeDefinition::Enum(enum_type) => {
                if self.upsert_enum_data(sighting) {
                    self.walk_enum_values(type_name, enum_type.values(), is_real_extension);
                }
            }
            ast::TypeDefinition::InputObject(input_object) => {
                if self.upsert_input_object_data(sighting) {
                    self.walk_input_values(type_name, input_object.fields(), is_real_extension);
                }
            }
            ast::TypeDefinition::Scalar(_) => {
                self.upsert_scalar_data(sighting);
            }
            ast::TypeDefinition::Union(union) => {
                let members: Vec<_> = union.members().map(|member| member.name()).collect();
                self.upsert_union_data(sighting, &members);
            }
        }
    }

    fn push_duplicate_child(&mut self, parent_kind: DefinitionKind, parent_name: &str, child_kind: &'static str, child_name: &str) {
        self.diagnostics
            .push_error(NormalizationError::DuplicateChildDefinition {
                parent_kind,
                parent_name: parent_name.to_owned(),
                child_kind,
                child_name: child_name.to_owned(),
            });
    }

    fn walk_fields<'a>(
        &mut self,
        parent_type_name: &str,
        fields: impl Iterator<Item = ast::FieldDefinition<'a>>,
        is_real_extension: bool,
    ) {
        let Some(parent) = self
            .parent_definition_data_by_type_name
            .get(parent_type_name)
            .and_then(ParentDefinitionData::as_composite)
        else {
            return;
        };

        let parent_kind = self.parent_definition_data_by_type_name[parent_type_name].kind();
        let renamed_parent_type_name = parent.renamed_type_name.clone();
        let is_parent_external = parent.directives.contains_key(EXTERNAL);
        let is_root_type = parent.is_root_type;
        let operation = OperationType::from_default_type_name(&renamed_parent_type_name).filter(|_| is_root_type);

        for field in fields {
            let field_name = field.name();

            if is_root_type && [SERVICE_FIELD, ENTITIES_FIELD].contains(&field_name) {
                continue;
            }

            let field_path = format!("{parent_type_name}.{field_name}");

            let existing = self
                .parent_definition_data_by_type_name
                .get(parent_type_name)
                .and_then(ParentDefinitionData::as_composite)
                .and_then(|parent| parent.fields.get(field_name))
                .cloned();

            if existing.is_some() && !is_real_extension {
                self.push_duplicate_child(parent_kind, parent_type_name, "field", field_name);
                continue;
            }

            let mut accumulated = existing
                .as_ref()
                .map(|field| field.directives.clone())
                .unwrap_or_default();

            self.extract_directives_and_authorization(
                &directives(field.directives()),
                DirectiveLocations::FIELD_DEFINITION,
                &mut accumulated,
                AuthorizationHost::Field {
                    original_parent_type_name: parent_type_name,
                    parent_type_name: &renamed_parent_type_name,
                    field_name,
                },
            );

            let mut arguments = existing
                .as_ref()
                .map(|field| field.arguments.clone())
                .unwrap_or_default();
            self.walk_arguments(parent_kind, parent_type_name, field_name, field.arguments(), &mut arguments);

            let r#type = TypeNode::from_ast(field.ty());
            let named_type_name = r#type.named_type_name().to_owned();
            self.referenced_type_names.insert(named_type_name.clone());

            let is_external = is_parent_external || accumulated.contains_key(EXTERNAL);
            if is_external {
                self.unvalidated_external_field_coords.insert(field_path.clone());
            }

            if accumulated.contains_key(SUBSCRIPTION_FILTER) {
                self.subscription_filter_field_paths
                    .insert(field_path.clone(), operation == Some(OperationType::Subscription));
            }

            self.record_provides_and_requires(parent_type_name, field_name, &accumulated);

            if existing.is_none() && accumulated.keys().any(|name| EVENT_DIRECTIVES.contains(&name.as_str())) {
                self.extract_event_configuration(
                    &renamed_parent_type_name,
                    field_name,
                    operation,
                    &accumulated,
                    &arguments,
                );
            }

            // A redeclaration by an extension keeps the type of the first declaration.
            if existing.is_none() {
                self.heir_fields.push(HeirField {
                    parent_type_name: renamed_parent_type_name.clone(),
                    original_parent_type_name: parent_type_name.to_owned(),
                    field_name: field_name.to_owned(),
                    named_type_name,
                });
            }

            let subgraph_name = self.subgraph_name.clone();
            let field_data = match existing {
                Some(mut field_data) => {
                    field_data.directives = accumulated;
                    field_data.arguments = arguments;
                    field_data.is_inaccessible |= field_data.directives.contains_key(INACCESSIBLE);
                    *field_data
                        .is_external_by_subgraph_name
                        .entry(subgraph_name)
                        .or_default() |= is_external;
                    field_data
                }
                None => FieldData {
                    name: field_name.to_owned(),
                    original_parent_type_name: parent_type_name.to_owned(),
                    renamed_parent_type_name: renamed_parent_type_name.clone(),
                    r#type,
                    arguments,
                    is_inaccessible: accumulated.contains_key(INACCESSIBLE),
                    directives: accumulated,
                    description: description(field.description()),
                    is_external_by_subgraph_name: IndexMap::from([(subgraph_name.clone(), is_external)]),
                    subgraph_names: [subgraph_name].into_iter().collect(),
                },
            };

            if let Some(parent) = self
                .parent_definition_data_by_type_name
                .get_mut(parent_type_name)
                .and_then(ParentDefinitionData::as_composite_mut)
            {
                parent.fields.insert(field_name.to_owned(), field_data);
            }
        }
    }

    fn walk_arguments<'a>(
        &mut self,
        parent_kind: DefinitionKind,
        parent_type_name: &str,
        field_name: &str,
        arguments: impl Iterator<Item = ast::InputValueDefinition<'a>>,
        argument_data_by_name: &mut IndexMap<String, InputValueData>,
    ) {
        for argument in arguments {
            let argument_name = argument.name();

            if argument_data_by_name.contains_key(argument_name) {
                self.push_duplicate_child(parent_kind, parent_type_name, "argument", &format!("{field_name}({argument_name})"));
                continue;
            }

            let r#type = TypeNode::from_ast(argument.ty());
            let host_path = format!("{parent_type_name}.{field_name}({argument_name}: ...)");

            let mut accumulated = DirectivesByName::new();
            self.extract_directives(
                &directives(argument.directives()),
                DirectiveLocations::ARGUMENT_DEFINITION,
                &host_path,
                &mut accumulated,
            );

            self.referenced_type_names
                .insert(r#type.named_type_name().to_owned());

            argument_data_by_name.insert(
                argument_name.to_owned(),
                InputValueData::new(
                    argument_name,
                    parent_type_name,
                    r#type,
                    argument.default_value().map(Value::from_ast),
                    accumulated,
                    description(argument.description()),
                ),
            );
        }
    }

    fn walk_enum_values<'a>(
        &mut self,
        enum_name: &str,
        values: impl Iterator<Item = ast::EnumValueDefinition<'a>>,
        is_real_extension: bool,
    ) {
        for value in values {
            let value_name = value.value();
            let host_path = format!("{enum_name}.{value_name}");

            let existing = match self.parent_definition_data_by_type_name.get(enum_name) {
                Some(ParentDefinitionData::Enum(data)) => data.values.get(value_name).cloned(),
                _ => return,
            };

            if existing.is_some() && !is_real_extension {
                self.push_duplicate_child(DefinitionKind::Enum, enum_name, "enum value", value_name);
                continue;
            }

            let mut accumulated = existing.map(|value| value.directives).unwrap_or_default();
            self.extract_directives(
                &directives(value.directives()),
                DirectiveLocations::ENUM_VALUE,
                &host_path,
                &mut accumulated,
            );

            if let Some(ParentDefinitionData::Enum(data)) = self.parent_definition_data_by_type_name.get_mut(enum_name) {
                let value_data = data
                    .values
                    .entry(value_name.to_owned())
                    .or_insert_with(|| EnumValueData {
                        name: value_name.to_owned(),
                        parent_type_name: enum_name.to_owned(),
                        description: description(value.description()),
                        directives: DirectivesByName::new(),
                    });
                value_data.directives = accumulated;
            }
        }
    }

    fn walk_input_values<'a>(
        &mut self,
        input_object_name: &str,
        input_values: impl Iterator<Item = ast::InputValueDefinition<'a>>,
        is_real_extension: bool,
    ) {
        for input_value in input_values {
            let name = input_value.name();
            let host_path = format!("{input_object_name}.{name}");

            let existing = match self.parent_definition_data_by_type_name.get(input_object_name) {
                Some(ParentDefinitionData::InputObject(data)) => data.input_values.get(name).cloned(),
                _ => return,
            };

            if existing.is_some() && !is_real_extension {
                self.push_duplicate_child(DefinitionKind::InputObject, input_object_name, "input value", name);
                continue;
            }

            let mut accumulated = existing
                .as_ref()
                .map(|input_value| input_value.directives.clone())
                .unwrap_or_default();
            self.extract_directives(
                &directives(input_value.directives()),
                DirectiveLocations::INPUT_FIELD_DEFINITION,
                &host_path,
                &mut accumulated,
            );

            let r#type = TypeNode::from_ast(input_value.ty());
            self.referenced_type_names
                .insert(r#type.named_type_name().to_owned());

            let input_value_data = match existing {
                Some(mut existing) => {
                    existing.is_inaccessible |= accumulated.contains_key(INACCESSIBLE);
                    existing.directives = accumulated;
                    existing
                }
                None => InputValueData::new(
                    name,
                    input_object_name,
                    r#type,
                    input_value.default_value().map(Value::from_ast),
                    accumulated,
                    description(input_value.description()),
                ),
            };

            if let Some(ParentDefinitionData::InputObject(data)) =
                self.parent_definition_data_by_type_name.get_mut(input_object_name)
            {
                data.input_values.insert(name.to_owned(), input_value_data);
            }
        }
    }

    fn record_provides_and_requires(&mut self, parent_type_name: &str, field_name: &str, directives: &DirectivesByName) {
        for (directive_name, is_provides) in [(PROVIDES, true), (REQUIRES, false)] {
            let Some(fields) = directives
                .get(directive_name)
                .and_then(|directives| directives.first())
                .and_then(|directive| directive.argument(FIELDS))
                .and_then(Value::as_str)
            else {
                continue;
            };

            let field_set_data = self
                .field_set_data_by_type_name
                .entry(parent_type_name.to_owned())
                .or_default();

            let raw_field_sets = if is_provides {
                &mut field_set_data.provides
            } else {
                &mut field_set_data.requires
            };

            raw_field_sets.insert(field_name.to_owned(), fields.to_owned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applied_directive_names_cover_every_location() {
        let document = cynic_parser::parse_type_system_document(
            r#"
            schema @link(url: "https://specs.apollo.dev/federation/v2.5") { query: Query }
            type Query @shareable { field(arg: Int @deprecated): String @external }
            enum Color { RED @inaccessible }
            input Filter { value: String @tag(name: "x") }
            "#,
        )
        .unwrap();

        assert_eq!(
            applied_directive_names(&document),
            vec!["link", "shareable", "external", "deprecated", "inaccessible", "tag"]
        );
    }
}
