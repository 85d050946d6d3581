use indexmap::IndexMap;

use crate::{
    constants::INACCESSIBLE,
    diagnostics::{ImplementationErrors, InvalidFieldImplementation, InvalidImplementedArgument},
    normalize::Normalizer,
    registry::{CompositeOutputData, DefinitionKind, ParentDefinitionData},
    type_node::is_valid_implementation_type,
    NormalizationError,
};

impl Normalizer<'_> {
    /// Check every interface `data` declares against its fields and arguments. All violations of one
    /// implementing type are reported as a single error.
    pub(crate) fn validate_interface_implementations(&mut self, data: &CompositeOutputData, kind: DefinitionKind) {
        if data.implemented_interface_type_names.is_empty() {
            return;
        }

        let is_parent_inaccessible = data.directives.contains_key(INACCESSIBLE);
        let mut errors_by_interface_name = IndexMap::new();
        let mut invalid_kinds_by_type_name = IndexMap::new();
        let mut implements_itself = false;

        for interface_name in &data.implemented_interface_type_names {
            let interface = match self.parent_definition_data_by_type_name.get(interface_name) {
                None => {
                    self.diagnostics.push_error(NormalizationError::UndefinedType {
                        type_name: interface_name.clone(),
                    });
                    continue;
                }
                Some(ParentDefinitionData::Interface(interface)) => interface,
                Some(other) => {
                    invalid_kinds_by_type_name.insert(other.name().to_owned(), other.kind());
                    continue;
                }
            };

            if interface.name == data.name {
                implements_itself = true;
                continue;
            }

            let mut implementation_errors = ImplementationErrors::default();

            for (field_name, interface_field) in &interface.fields {
                self.unvalidated_external_field_coords
                    .shift_remove(&format!("{}.{field_name}", data.name));

                let Some(field) = data.fields.get(field_name) else {
                    implementation_errors.unimplemented_fields.push(field_name.clone());
                    continue;
                };

                let mut invalid = InvalidFieldImplementation {
                    original_response_type: interface_field.r#type.to_string(),
                    ..Default::default()
                };

                if !is_valid_implementation_type(
                    &interface_field.r#type,
                    &field.r#type,
                    &self.concrete_type_names_by_abstract_type_name,
                ) {
                    invalid.implemented_response_type = Some(field.r#type.to_string());
                }

                for (argument_name, interface_argument) in &interface_field.arguments {
                    let Some(argument) = field.arguments.get(argument_name) else {
                        invalid.unimplemented_arguments.insert(argument_name.clone());
                        continue;
                    };

                    let expected_type = interface_argument.r#type.to_string();
                    let actual_type = argument.r#type.to_string();

                    if expected_type != actual_type {
                        invalid.invalid_implemented_arguments.push(InvalidImplementedArgument {
                            argument_name: argument_name.clone(),
                            expected_type,
                            actual_type,
                        });
                    }
                }

                // The interface cannot supply additional arguments, so they must be optional.
                for (argument_name, argument) in &field.arguments {
                    if interface_field.arguments.contains_key(argument_name) {
                        continue;
                    }

                    if argument.r#type.is_non_null() && argument.default_value.is_none() {
                        invalid.invalid_additional_arguments.insert(argument_name.clone());
                    }
                }

                if !is_parent_inaccessible && field.is_inaccessible && !interface_field.is_inaccessible {
                    invalid.is_inaccessible = true;
                }

                if invalid.has_errors() {
                    implementation_errors
                        .invalid_field_implementations
                        .insert(field_name.clone(), invalid);
                }
            }

            if !implementation_errors.unimplemented_fields.is_empty()
                || !implementation_errors.invalid_field_implementations.is_empty()
            {
                errors_by_interface_name.insert(interface_name.clone(), implementation_errors);
            }
        }

        if !invalid_kinds_by_type_name.is_empty() {
            self.diagnostics
                .push_error(NormalizationError::InvalidImplementedType {
                    type_name: data.name.clone(),
                    invalid_kinds_by_type_name,
                });
        }

        if implements_itself {
            self.diagnostics.push_error(NormalizationError::SelfImplementation {
                type_name: data.name.clone(),
            });
        }

        if !errors_by_interface_name.is_empty() {
            self.diagnostics
                .push_error(NormalizationError::InvalidInterfaceImplementation {
                    kind,
                    type_name: data.name.clone(),
                    errors_by_interface_name,
                });
        }
    }
}
