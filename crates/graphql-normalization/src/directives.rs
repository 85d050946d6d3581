//! Validation and extraction of directive applications.

use crate::{
    ast::Directive,
    authorization::AuthorizationHost,
    constants::*,
    directive_definitions::{DirectiveDefinition, DirectiveLocations, BUILT_IN_DIRECTIVE_DEFINITIONS},
    normalize::Normalizer,
    registry::DirectivesByName,
    type_node::TypeNode,
    value::Value,
    NormalizationError,
};

enum Validation {
    Valid,
    Invalid(Vec<String>),
    /// Already reported for this host path.
    Discard,
}

impl Normalizer<'_> {
    pub(crate) fn directive_definition(&self, name: &str) -> Option<&DirectiveDefinition> {
        BUILT_IN_DIRECTIVE_DEFINITIONS
            .get(name)
            .or_else(|| self.custom_directive_definitions.get(name))
    }

    /// Validate and accumulate the directives of a type, argument, input value or enum value into
    /// `accumulated`. Returns whether the node carries `@extends`.
    pub(crate) fn extract_directives(
        &mut self,
        directives: &[Directive],
        location: DirectiveLocations,
        host_path: &str,
        accumulated: &mut DirectivesByName,
    ) -> bool {
        let mut has_extends = false;

        for directive in directives {
            if !self.validate_directive(directive, location, host_path, accumulated) {
                continue;
            }

            if directive.name == EXTENDS {
                has_extends = true;
                continue;
            }

            if directive.name == KEY && is_duplicate_key(directive, accumulated) {
                continue;
            }

            accumulated
                .entry(directive.name.clone())
                .or_default()
                .push(directive.clone());
        }

        has_extends
    }

    /// Like [Self::extract_directives], for fields, enums and scalars. `@override` is diverted to the
    /// override bookkeeping, `@authenticated` and `@requiresScopes` to authorization.
    pub(crate) fn extract_directives_and_authorization(
        &mut self,
        directives: &[Directive],
        location: DirectiveLocations,
        accumulated: &mut DirectivesByName,
        authorization_host: AuthorizationHost<'_>,
    ) {
        let host_path = authorization_host.host_path();
        let mut authorization_directives = Vec::new();

        for directive in directives {
            if !self.validate_directive(directive, location, &host_path, accumulated) {
                continue;
            }

            match directive.name.as_str() {
                EXTENDS => continue,
                OVERRIDE => {
                    self.handle_override_declaration(directive, &host_path, authorization_host);
                    continue;
                }
                AUTHENTICATED | REQUIRES_SCOPES => {
                    authorization_directives.push(directive.clone());
                    continue;
                }
                _ => (),
            }

            accumulated
                .entry(directive.name.clone())
                .or_default()
                .push(directive.clone());
        }

        self.extract_authorization(&authorization_directives, authorization_host);
    }

    fn handle_override_declaration(&mut self, directive: &Directive, host_path: &str, host: AuthorizationHost<'_>) {
        let AuthorizationHost::Field {
            parent_type_name,
            field_name,
            ..
        } = host
        else {
            return;
        };

        let Some(target_subgraph_name) = directive.argument(FROM).and_then(Value::as_str) else {
            return;
        };

        if target_subgraph_name == self.subgraph_name {
            self.diagnostics.push_error(NormalizationError::InvalidDirective {
                directive_name: OVERRIDE.to_owned(),
                host_path: host_path.to_owned(),
                messages: vec![format!(
                    "Cannot override field \"{host_path}\" because the source and target subgraph names are both \"{target_subgraph_name}\"."
                )],
            });
            return;
        }

        self.overrides_by_target_subgraph_name
            .entry(target_subgraph_name.to_owned())
            .or_default()
            .entry(parent_type_name.to_owned())
            .or_default()
            .insert(field_name.to_owned());
    }

    /// Pushes an error and returns false for an invalid application.
    fn validate_directive(
        &mut self,
        directive: &Directive,
        location: DirectiveLocations,
        host_path: &str,
        accumulated: &DirectivesByName,
    ) -> bool {
        match self.directive_validation(directive, location, host_path, accumulated) {
            Validation::Valid => true,
            Validation::Discard => false,
            Validation::Invalid(messages) => {
                self.diagnostics.push_error(NormalizationError::InvalidDirective {
                    directive_name: directive.name.clone(),
                    host_path: host_path.to_owned(),
                    messages,
                });
                false
            }
        }
    }

    fn directive_validation(
        &mut self,
        directive: &Directive,
        location: DirectiveLocations,
        host_path: &str,
        accumulated: &DirectivesByName,
    ) -> Validation {
        let Some(definition) = self.directive_definition(&directive.name) else {
            return Validation::Invalid(vec![format!(
                "The directive \"@{}\" is not defined.",
                directive.name
            )]);
        };

        let mut messages = Vec::new();

        if !definition.locations.contains(location) {
            messages.push(format!(
                "\"{host_path}\" is type \"{}\", but the directive \"@{}\" is only valid on the following location(s): {}.",
                location.sdl_name(),
                directive.name,
                definition.locations
            ));
        }

        messages.extend(argument_errors(directive, definition));

        let is_repeated = !definition.is_repeatable
            && accumulated
                .get(&directive.name)
                .is_some_and(|existing| !existing.is_empty());

        if is_repeated {
            let newly_handled = self
                .handled_repeated_directives_by_host_path
                .entry(host_path.to_owned())
                .or_default()
                .insert(directive.name.clone());

            if !newly_handled && messages.is_empty() {
                return Validation::Discard;
            }

            if newly_handled {
                messages.push(format!(
                    "The directive \"@{}\" is not repeatable, but it is declared more than once.",
                    directive.name
                ));
            }
        }

        if messages.is_empty() {
            Validation::Valid
        } else {
            Validation::Invalid(messages)
        }
    }
}

fn argument_errors(directive: &Directive, definition: &DirectiveDefinition) -> Vec<String> {
    let mut messages = Vec::new();
    let mut seen = Vec::with_capacity(directive.arguments.len());

    for (argument_name, value) in &directive.arguments {
        if seen.contains(&argument_name.as_str()) {
            messages.push(format!("The argument \"{argument_name}\" is defined more than once."));
            continue;
        }
        seen.push(argument_name.as_str());

        let Some(argument_definition) = definition.argument(argument_name) else {
            messages.push(format!(
                "The argument \"{argument_name}\" is not defined on the directive \"@{}\".",
                definition.name
            ));
            continue;
        };

        if !value_matches_type(value, &argument_definition.r#type) {
            messages.push(format!(
                "The argument \"{argument_name}\" must be type \"{}\", but the provided value is type \"{}\".",
                argument_definition.r#type,
                value.kind_name()
            ));
        }
    }

    let missing: Vec<_> = definition
        .required_argument_names()
        .filter(|required| !seen.contains(required))
        .map(|required| format!("\"{required}\""))
        .collect();

    if !missing.is_empty() {
        messages.push(format!(
            "The following required argument(s) are not defined: {}.",
            missing.join(", ")
        ));
    }

    messages
}

/// Shape check of a constant value against a declared argument type. Custom input objects and enums
/// are accepted as is.
fn value_matches_type(value: &Value, ty: &TypeNode) -> bool {
    match ty {
        TypeNode::NonNull(inner) => !value.is_null() && value_matches_type(value, inner),
        _ if value.is_null() => true,
        TypeNode::List(inner) => match value {
            Value::List(items) => items.iter().all(|item| value_matches_type(item, inner)),
            // A single value coerces to a list of one.
            other => value_matches_type(other, inner),
        },
        TypeNode::Named(name) => match name.as_str() {
            "String" | "openfed__FieldSet" | "openfed__Scope" => matches!(value, Value::String(_)),
            "ID" => matches!(value, Value::String(_) | Value::Int(_)),
            "Boolean" => matches!(value, Value::Boolean(_)),
            "Int" => matches!(value, Value::Int(_)),
            "Float" => matches!(value, Value::Int(_) | Value::Float(_)),
            _ => true,
        },
    }
}

fn is_duplicate_key(directive: &Directive, accumulated: &DirectivesByName) -> bool {
    let Some(fields) = directive.argument(FIELDS).and_then(Value::as_str) else {
        return false;
    };

    accumulated.get(KEY).is_some_and(|keys| {
        keys.iter()
            .any(|key| key.argument(FIELDS).and_then(Value::as_str) == Some(fields))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> TypeNode {
        TypeNode::Named(name.to_owned())
    }

    #[test]
    fn scope_lists_must_be_nested_strings() {
        let ty = named("openfed__Scope").non_null();
        let ty = TypeNode::List(Box::new(ty)).non_null();
        let ty = TypeNode::List(Box::new(ty)).non_null();

        let valid = Value::List(vec![Value::List(vec![Value::from("read")])]);
        assert!(value_matches_type(&valid, &ty));

        let coerced = Value::List(vec![Value::from("read")]);
        assert!(value_matches_type(&coerced, &ty));

        assert!(!value_matches_type(&Value::List(vec![Value::Int(1)]), &ty));
        assert!(!value_matches_type(&Value::Null, &ty));
    }

    #[test]
    fn unknown_and_missing_arguments_are_reported() {
        let definition = BUILT_IN_DIRECTIVE_DEFINITIONS
            .get(KEY)
            .cloned()
            .unwrap_or_else(|| unreachable!("@key is built in"));

        let directive = Directive::new(KEY).with_argument("resolvable", Value::Int(1)).with_argument("field", Value::from("id"));

        assert_eq!(
            argument_errors(&directive, &definition),
            vec![
                "The argument \"resolvable\" must be type \"Boolean\", but the provided value is type \"Int\".".to_owned(),
                "The argument \"field\" is not defined on the directive \"@key\".".to_owned(),
                "The following required argument(s) are not defined: \"fields\".".to_owned(),
            ]
        );
    }

    #[test]
    fn keys_deduplicate_by_field_set() {
        let mut accumulated = DirectivesByName::new();
        accumulated.insert(KEY.to_owned(), vec![Directive::new(KEY).with_argument(FIELDS, Value::from("id"))]);

        assert!(is_duplicate_key(&Directive::new(KEY).with_argument(FIELDS, Value::from("id")), &accumulated));
        assert!(!is_duplicate_key(&Directive::new(KEY).with_argument(FIELDS, Value::from("upc")), &accumulated));
    }
}
