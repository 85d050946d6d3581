//! Validation of the field sets of `@key`, `@provides` and `@requires`.
//!
//! A field set is parsed by wrapping it in braces and reading it as an executable document.

use cynic_parser::executable as executable_ast;
use indexmap::IndexSet;

use crate::{
    configuration::{FieldSetCondition, RequiredFieldsConfiguration},
    constants::*,
    normalize::Normalizer,
    registry::ParentDefinitionData,
    NormalizationError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldSetKind {
    Key,
    Provides,
    Requires,
}

/// A field set that passed validation.
#[derive(Debug, Default)]
struct ValidatedFieldSet {
    top_level_field_names: IndexSet<String>,
    /// `Type.field` coordinates of every selected field.
    field_coords: Vec<String>,
    /// Canonical printing, single spaces between tokens.
    normalized: String,
    /// Coordinates and names of the fields leading to the current selection.
    path: Vec<(String, String)>,
    /// Selected `@external` fields, by coordinates, with the selection leading to them.
    conditions: Vec<(String, FieldSetCondition)>,
}

impl Normalizer<'_> {
    /// `host` is the `Type.field` coordinates and name of the field a `@provides` is declared on.
    fn validate_field_set(
        &self,
        parent_type_name: &str,
        field_set: &str,
        kind: FieldSetKind,
        host: Option<(String, String)>,
    ) -> Result<ValidatedFieldSet, Vec<String>> {
        let document = cynic_parser::parse_executable_document(&format!("{{ {field_set} }}"))
            .map_err(|error| vec![format!("The field set \"{field_set}\" could not be parsed: {error}")])?;

        let Some(operation) = document.operations().next() else {
            return Err(vec![format!("The field set \"{field_set}\" is not a selection set.")]);
        };

        let mut validated = ValidatedFieldSet {
            path: host.into_iter().collect(),
            ..Default::default()
        };
        let mut errors = Vec::new();
        let mut normalized = Vec::new();

        self.validate_selections(
            parent_type_name,
            operation.selection_set(),
            kind,
            true,
            &mut validated,
            &mut normalized,
            &mut errors,
        );

        if !errors.is_empty() {
            return Err(errors
                .into_iter()
                .map(|error| format!("The field set \"{field_set}\" is invalid: {error}"))
                .collect());
        }

        validated.normalized = normalized.join(" ");
        Ok(validated)
    }

    #[allow(clippy::too_many_arguments)]
    fn validate_selections<'a>(
        &self,
        parent_type_name: &str,
        selections: impl Iterator<Item = executable_ast::Selection<'a>>,
        kind: FieldSetKind,
        is_top_level: bool,
        validated: &mut ValidatedFieldSet,
        normalized: &mut Vec<String>,
        errors: &mut Vec<String>,
    ) {
        let Some(parent) = self
            .parent_definition_data_by_type_name
            .get(parent_type_name)
            .and_then(ParentDefinitionData::as_composite)
        else {
            errors.push(format!(
                "\"{parent_type_name}\" is not an object or interface, so it cannot define a selection set."
            ));
            return;
        };

        for selection in selections {
            let item = match selection {
                executable_ast::Selection::Field(item) => item,
                executable_ast::Selection::InlineFragment(_) | executable_ast::Selection::FragmentSpread(_) => {
                    errors.push(format!(
                        "fragments are not supported, but one is selected on \"{parent_type_name}\"."
                    ));
                    continue;
                }
            };

            let field_name = item.name();
            let field_coords = format!("{parent_type_name}.{field_name}");

            if item.arguments().next().is_some() {
                errors.push(format!("the field \"{field_coords}\" must not define arguments."));
                continue;
            }

            if item.directives().next().is_some() {
                errors.push(format!("the field \"{field_coords}\" must not define directives."));
                continue;
            }

            let Some(field) = parent.fields.get(field_name) else {
                errors.push(format!("the field \"{field_coords}\" is not defined."));
                continue;
            };

            if is_top_level {
                validated.top_level_field_names.insert(field_name.to_owned());
            }
            validated.field_coords.push(field_coords.clone());
            normalized.push(field_name.to_owned());

            validated.path.push((field_coords.clone(), field_name.to_owned()));

            if kind != FieldSetKind::Key && field.is_external_in(&self.subgraph_name) {
                validated.conditions.push((
                    field_coords.clone(),
                    FieldSetCondition {
                        field_coordinates_path: validated.path.iter().map(|(coords, _)| coords.clone()).collect(),
                        field_path: validated.path.iter().map(|(_, name)| name.clone()).collect(),
                    },
                ));
            }

            let named_type_name = field.named_type_name();
            let has_selection_set = item.selection_set().next().is_some();

            match self.parent_definition_data_by_type_name.get(named_type_name) {
                Some(ParentDefinitionData::Interface(_) | ParentDefinitionData::Union(_)) if kind == FieldSetKind::Key => {
                    errors.push(format!(
                        "the field \"{field_coords}\" returns the abstract type \"{named_type_name}\", which cannot be part of a key."
                    ));
                }
                Some(ParentDefinitionData::Object(_) | ParentDefinitionData::Interface(_) | ParentDefinitionData::Union(_)) => {
                    if has_selection_set {
                        normalized.push("{".to_owned());
                        self.validate_selections(
                            named_type_name,
                            item.selection_set(),
                            kind,
                            false,
                            validated,
                            normalized,
                            errors,
                        );
                        normalized.push("}".to_owned());
                    } else {
                        errors.push(format!(
                            "the field \"{field_coords}\" returns the composite type \"{named_type_name}\", so it must define a selection set."
                        ));
                    }
                }
                _ => {
                    if has_selection_set {
                        errors.push(format!(
                            "the field \"{field_coords}\" returns the leaf type \"{named_type_name}\", so it must not define a selection set."
                        ));
                    }
                }
            }

            validated.path.pop();
        }
    }

    /// Validate every raw `@key` field set and record the valid ones as keys of the entity.
    pub(crate) fn validate_keys(&mut self) {
        for (type_name, key_field_set_data) in self.key_field_set_data_by_type_name.clone() {
            let Some(parent) = self
                .parent_definition_data_by_type_name
                .get(&type_name)
                .and_then(ParentDefinitionData::as_composite)
            else {
                self.diagnostics
                    .push_error(NormalizationError::UndefinedObjectLikeParent { type_name });
                continue;
            };

            let renamed_type_name = parent.renamed_type_name.clone();
            let mut directive_messages = Vec::new();
            let mut field_set_messages = Vec::new();

            for (raw_field_set, is_resolvable) in &key_field_set_data.is_resolvable_by_raw_field_set {
                if raw_field_set.trim().is_empty() {
                    directive_messages.push("The \"fields\" argument must not be an empty field set.".to_owned());
                    continue;
                }

                match self.validate_field_set(&type_name, raw_field_set, FieldSetKind::Key, None) {
                    Ok(validated) => {
                        for field_coords in &validated.field_coords {
                            self.unvalidated_external_field_coords.shift_remove(field_coords);
                        }

                        self.key_field_names_by_parent_type_name
                            .entry(type_name.clone())
                            .or_default()
                            .extend(validated.top_level_field_names);

                        if let Some(configuration) = self.configuration_data_by_type_name.get_mut(&renamed_type_name) {
                            configuration.keys.push(RequiredFieldsConfiguration {
                                type_name: renamed_type_name.clone(),
                                field_name: String::new(),
                                selection_set: validated.normalized,
                                disable_entity_resolver: (!is_resolvable).then_some(true),
                            });
                        }
                    }
                    Err(messages) => field_set_messages.extend(messages),
                }
            }

            if !directive_messages.is_empty() {
                self.diagnostics.push_error(NormalizationError::InvalidKeyDirectives {
                    type_name: type_name.clone(),
                    messages: directive_messages,
                });
            }

            if !field_set_messages.is_empty() {
                self.diagnostics.push_error(NormalizationError::InvalidKeyFieldSets {
                    type_name,
                    messages: field_set_messages,
                });
            }
        }
    }

    /// Validate the `@provides` and `@requires` field sets of every field.
    pub(crate) fn validate_provides_and_requires(&mut self) {
        for (type_name, field_set_data) in self.field_set_data_by_type_name.clone() {
            let Some(parent) = self
                .parent_definition_data_by_type_name
                .get(&type_name)
                .and_then(ParentDefinitionData::as_composite)
            else {
                self.diagnostics
                    .push_error(NormalizationError::UndefinedObjectLikeParent { type_name });
                continue;
            };

            let renamed_type_name = parent.renamed_type_name.clone();

            for (directive_name, raw_field_sets) in [(PROVIDES, &field_set_data.provides), (REQUIRES, &field_set_data.requires)] {
                let mut messages = Vec::new();

                for (field_name, raw_field_set) in raw_field_sets {
                    let (target_type_name, kind, host) = if directive_name == PROVIDES {
                        let named_type_name = self
                            .parent_definition_data_by_type_name
                            .get(&type_name)
                            .and_then(ParentDefinitionData::as_composite)
                            .and_then(|parent| parent.fields.get(field_name))
                            .map(|field| field.named_type_name().to_owned())
                            .unwrap_or_default();
                        let host = (format!("{type_name}.{field_name}"), field_name.clone());
                        (named_type_name, FieldSetKind::Provides, Some(host))
                    } else {
                        (type_name.clone(), FieldSetKind::Requires, None)
                    };

                    match self.validate_field_set(&target_type_name, raw_field_set, kind, host) {
                        Ok(validated) => {
                            for field_coords in &validated.field_coords {
                                self.unvalidated_external_field_coords.shift_remove(field_coords);
                            }

                            for (field_coords, condition) in validated.conditions {
                                let conditional_field_data = self
                                    .conditional_field_data_by_coordinates
                                    .entry(field_coords)
                                    .or_default();

                                if kind == FieldSetKind::Provides {
                                    conditional_field_data.provided_by.push(condition);
                                } else {
                                    conditional_field_data.required_by.push(condition);
                                }
                            }

                            let Some(configuration) = self.configuration_data_by_type_name.get_mut(&renamed_type_name) else {
                                continue;
                            };

                            let required_fields = RequiredFieldsConfiguration {
                                type_name: renamed_type_name.clone(),
                                field_name: field_name.clone(),
                                selection_set: validated.normalized,
                                disable_entity_resolver: None,
                            };

                            if kind == FieldSetKind::Provides {
                                configuration.provides.push(required_fields);
                            } else {
                                configuration.requires.push(required_fields);
                            }
                        }
                        Err(errors) => messages.extend(
                            errors
                                .into_iter()
                                .map(|error| format!("On \"{type_name}.{field_name}\": {error}")),
                        ),
                    }
                }

                if !messages.is_empty() {
                    self.diagnostics
                        .push_error(NormalizationError::InvalidProvidesOrRequiresFieldSets {
                            directive_name,
                            type_name: type_name.clone(),
                            messages,
                        });
                }
            }
        }
    }
}
