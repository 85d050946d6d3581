//! Errors and warnings produced by normalization.

use std::fmt::Write as _;

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;

use crate::{ast::OperationType, registry::DefinitionKind};

/// Errors and warnings produced by normalization.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Diagnostics {
    errors: Vec<NormalizationError>,
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Is any of the diagnostics fatal, i.e. a hard error?
    pub fn any_fatal(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Is there any diagnostic warning or error
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    pub fn errors(&self) -> &[NormalizationError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Iterate error messages.
    pub fn iter_errors(&self) -> impl Iterator<Item = String> + '_ {
        self.errors.iter().map(|error| error.to_string())
    }

    /// Iterate warning messages.
    pub fn iter_warnings(&self) -> impl Iterator<Item = String> + '_ {
        self.warnings.iter().map(|warning| warning.to_string())
    }

    pub(crate) fn push_error(&mut self, error: NormalizationError) {
        self.errors.push(error);
    }

    pub(crate) fn push_warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    pub(crate) fn into_parts(self) -> (Vec<NormalizationError>, Vec<Warning>) {
        (self.errors, self.warnings)
    }

    pub(crate) fn extend_warnings(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        self.warnings.extend(warnings);
    }

    /// Turn every warning into a [NormalizationError::PromotedWarning].
    pub(crate) fn promote_warnings(&mut self) {
        for warning in self.warnings.drain(..) {
            self.errors.push(NormalizationError::PromotedWarning(warning));
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizationError {
    #[error("The subgraph has syntax errors and could not be parsed:\n {0}")]
    InvalidSyntax(String),

    #[error("The {kind} \"{type_name}\" can only be defined once.")]
    DuplicateTypeDefinition { kind: DefinitionKind, type_name: String },

    #[error(
        "The named type \"{type_name}\" is defined as both types \"{existing_kind}\" and \"{incoming_kind}\".\nHowever, there must be only one type named \"{type_name}\"."
    )]
    MultipleNamedTypeDefinition {
        type_name: String,
        existing_kind: DefinitionKind,
        incoming_kind: DefinitionKind,
    },

    #[error("The {kind} \"{type_name}\" declares that it implements the interface \"{interface_name}\" more than once.")]
    DuplicateImplementedInterface {
        kind: DefinitionKind,
        type_name: String,
        interface_name: String,
    },

    #[error("The union \"{union_name}\" declares the member \"{member_name}\" more than once.")]
    DuplicateUnionMemberDefinition { union_name: String, member_name: String },

    #[error("The {parent_kind} \"{parent_name}\" defines the {child_kind} \"{child_name}\" more than once.")]
    DuplicateChildDefinition {
        parent_kind: DefinitionKind,
        parent_name: String,
        child_kind: &'static str,
        child_name: String,
    },

    #[error("The directive \"@{directive_name}\" declared on \"{host_path}\" is invalid for the following reason(s):{}", bullet_list(.messages))]
    InvalidDirective {
        directive_name: String,
        host_path: String,
        messages: Vec<String>,
    },

    #[error("The directive \"@{directive_name}\" is defined more than once.")]
    DuplicateDirectiveDefinition { directive_name: String },

    #[error("The directive \"@{directive_name}\" defines the following arguments more than once: {}", .argument_names.join(", "))]
    DuplicateDirectiveArgumentDefinitions {
        directive_name: String,
        argument_names: Vec<String>,
    },

    #[error("The entity \"{type_name}\" defines the following invalid \"@key\" directives:{}", bullet_list(.messages))]
    InvalidKeyDirectives { type_name: String, messages: Vec<String> },

    #[error("The entity \"{type_name}\" defines the following invalid key field sets:{}", bullet_list(.messages))]
    InvalidKeyFieldSets { type_name: String, messages: Vec<String> },

    #[error("The following \"@{directive_name}\" field sets declared on fields of \"{type_name}\" are invalid:{}", bullet_list(.messages))]
    InvalidProvidesOrRequiresFieldSets {
        directive_name: &'static str,
        type_name: String,
        messages: Vec<String>,
    },

    #[error(
        "The maximum number of OR scopes that can be defined by \"@requiresScopes\" on a single field or type is {max_or_scopes}; however, the following path(s) attempt to exceed that limit:{}",
        bullet_list(.host_paths)
    )]
    OrScopesLimit { max_or_scopes: usize, host_paths: Vec<String> },

    #[error("{}", format_interface_implementation(.kind, .type_name, .errors_by_interface_name))]
    InvalidInterfaceImplementation {
        kind: DefinitionKind,
        type_name: String,
        errors_by_interface_name: IndexMap<String, ImplementationErrors>,
    },

    #[error(
        "The type \"{type_name}\" implements the following type(s) that are not interfaces:{}",
        typed_name_list(.invalid_kinds_by_type_name)
    )]
    InvalidImplementedType {
        type_name: String,
        invalid_kinds_by_type_name: IndexMap<String, DefinitionKind>,
    },

    #[error("The interface \"{type_name}\" must not implement itself.")]
    SelfImplementation { type_name: String },

    #[error(
        "The field \"{field_path}\" defines the following arguments whose types are not valid input types:{}",
        display_list(.arguments)
    )]
    InvalidArguments {
        field_path: String,
        arguments: Vec<InvalidArgument>,
    },

    #[error("The type \"{type_name}\" was referenced in the schema, but it was never defined.")]
    UndefinedType { type_name: String },

    #[error("The {kind} \"{type_name}\" is invalid because it does not define any fields.")]
    NoFieldDefinitions { kind: DefinitionKind, type_name: String },

    #[error("The enum \"{type_name}\" must define at least one value.")]
    NoDefinedEnumValues { type_name: String },

    #[error("The input object \"{type_name}\" must define at least one input value.")]
    NoInputValueDefinitions { type_name: String },

    #[error("The union \"{union_name}\" must define at least one member.")]
    NoDefinedUnionMembers { union_name: String },

    #[error(
        "The union \"{union_name}\" defines the following members that are not object types:{}",
        typed_name_list(.invalid_members)
    )]
    InvalidUnionMemberType {
        union_name: String,
        invalid_members: IndexMap<String, DefinitionKind>,
    },

    #[error("The scalar extension \"{type_name}\" is invalid because no base scalar definition was found.")]
    NoBaseScalarDefinition { type_name: String },

    #[error(
        "The schema defines the {operation} root type as \"{type_name}\", so the type \"{default_type_name}\" must not also be defined."
    )]
    InvalidRootTypeDefinition {
        operation: OperationType,
        type_name: String,
        default_type_name: String,
    },

    #[error("The {operation} root type \"{type_name}\" must be an object type, but it is defined as \"{actual_kind}\".")]
    OperationDefinition {
        type_name: String,
        operation: OperationType,
        actual_kind: DefinitionKind,
    },

    #[error(
        "The {operation} root type was defined as \"{existing_type_name}\" and cannot also be defined as \"{new_type_name}\"."
    )]
    DuplicateOperationTypeDefinition {
        operation: OperationType,
        new_type_name: String,
        existing_type_name: String,
    },

    #[error(
        "The interface \"{type_name}\" is invalid because the following field(s) are declared \"@external\":{}",
        bullet_list(.field_names)
    )]
    ExternalInterfaceFields { type_name: String, field_names: Vec<String> },

    #[error(
        "The field \"{field_coords}\" is declared \"@external\", but it is not used in any key, provides, requires or interface implementation."
    )]
    InvalidExternalDirective { field_coords: String },

    #[error("The event directive \"@{directive_name}\" declared on \"{field_path}\" is invalid for the following reason(s):{}", bullet_list(.messages))]
    InvalidEventDirective {
        directive_name: String,
        field_path: String,
        messages: Vec<String>,
    },

    #[error("An event-driven graph is invalid for the following reason(s):{}", bullet_list(.messages))]
    InvalidEventDrivenGraph { messages: Vec<String> },

    #[error(
        "The \"@openfed__subscriptionFilter\" directive is declared on \"{field_path}\", but it is only valid on fields of the subscription root type of an event-driven graph."
    )]
    InvalidSubscriptionFilterLocation { field_path: String },

    #[error("Field sets were declared on \"{type_name}\", but it is not an object or interface type.")]
    UndefinedObjectLikeParent { type_name: String },

    #[error("The subgraph \"{subgraph_name}\" could not be normalized for the following reason(s):{}", display_list(.errors))]
    SubgraphValidation {
        subgraph_name: String,
        errors: Vec<NormalizationError>,
    },

    #[error("{}", format_invalid_subgraph_names(.non_unique_subgraph_names, .invalid_name_messages))]
    InvalidSubgraphNames {
        non_unique_subgraph_names: Vec<String>,
        invalid_name_messages: Vec<String>,
    },

    #[error(
        "The following field(s) are overridden by more than one subgraph:{}",
        display_list(.overrides)
    )]
    DuplicateOverriddenFields { overrides: Vec<DuplicateOverride> },

    #[error("{0}")]
    PromotedWarning(Warning),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Warning {
    #[error(
        "[{subgraph_name}] The interface \"{type_name}\" declares the following field(s) \"@external\", which is only tolerated in V1 subgraphs:{}",
        bullet_list(.field_names)
    )]
    ExternalInterfaceFields {
        subgraph_name: String,
        type_name: String,
        field_names: Vec<String>,
    },

    #[error(
        "[{subgraph_name}] The field \"{field_coords}\" is declared \"@external\", but it is not used in any key, provides, requires or interface implementation."
    )]
    InvalidExternalField { subgraph_name: String, field_coords: String },

    #[error(
        "[{subgraph_name}] The interface \"{interface_name}\" is used as an output type without any object implementations."
    )]
    UnimplementedInterfaceOutputType {
        subgraph_name: String,
        interface_name: String,
    },

    #[error(
        "[{source_subgraph_name}] The field(s) {} of \"{parent_type_name}\" declare \"@override(from: \"{target_subgraph_name}\")\", but no subgraph named \"{target_subgraph_name}\" exists.",
        quoted_list(.field_names)
    )]
    InvalidOverrideTargetSubgraphName {
        target_subgraph_name: String,
        parent_type_name: String,
        field_names: Vec<String>,
        source_subgraph_name: String,
    },
}

/// Every violation of the interfaces implemented by one type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImplementationErrors {
    pub unimplemented_fields: Vec<String>,
    pub invalid_field_implementations: IndexMap<String, InvalidFieldImplementation>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvalidFieldImplementation {
    pub original_response_type: String,
    pub implemented_response_type: Option<String>,
    pub unimplemented_arguments: IndexSet<String>,
    pub invalid_implemented_arguments: Vec<InvalidImplementedArgument>,
    pub invalid_additional_arguments: IndexSet<String>,
    pub is_inaccessible: bool,
}

impl InvalidFieldImplementation {
    pub(crate) fn has_errors(&self) -> bool {
        self.implemented_response_type.is_some()
            || !self.unimplemented_arguments.is_empty()
            || !self.invalid_implemented_arguments.is_empty()
            || !self.invalid_additional_arguments.is_empty()
            || self.is_inaccessible
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvalidImplementedArgument {
    pub argument_name: String,
    pub expected_type: String,
    pub actual_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvalidArgument {
    pub argument_name: String,
    pub named_type: String,
    pub printed_type: String,
    pub kind: DefinitionKind,
}

impl std::fmt::Display for InvalidArgument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "The argument \"{}\" is of type \"{}\", but \"{}\" is type \"{}\".",
            self.argument_name, self.printed_type, self.named_type, self.kind
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateOverride {
    pub field_path: String,
    pub source_subgraph_names: Vec<String>,
}

impl std::fmt::Display for DuplicateOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "\"{}\" is overridden by the subgraphs {}.",
            self.field_path,
            self.source_subgraph_names
                .iter()
                .map(|name| format!("\"{name}\""))
                .join(", ")
        )
    }
}

fn bullet_list<T: AsRef<str>>(items: &[T]) -> String {
    items.iter().fold(String::new(), |mut out, item| {
        out.push_str("\n - ");
        out.push_str(item.as_ref());
        out
    })
}

fn display_list<T: std::fmt::Display>(items: &[T]) -> String {
    items.iter().fold(String::new(), |mut out, item| {
        let _ = write!(out, "\n - {item}");
        out
    })
}

fn typed_name_list(kinds_by_type_name: &IndexMap<String, DefinitionKind>) -> String {
    kinds_by_type_name.iter().fold(String::new(), |mut out, (name, kind)| {
        let _ = write!(out, "\n - \"{name}\", which is type \"{kind}\"");
        out
    })
}

fn quoted_list(names: &[String]) -> String {
    names.iter().map(|name| format!("\"{name}\"")).join(", ")
}

fn format_interface_implementation(
    kind: &DefinitionKind,
    type_name: &str,
    errors_by_interface_name: &IndexMap<String, ImplementationErrors>,
) -> String {
    let mut out = format!("The {kind} \"{type_name}\" has the following interface implementation errors:");

    for (interface_name, errors) in errors_by_interface_name {
        let _ = write!(out, "\n  Interface \"{interface_name}\":");

        for field_name in &errors.unimplemented_fields {
            let _ = write!(out, "\n   - the field \"{field_name}\" is not implemented.");
        }

        for (field_name, invalid) in &errors.invalid_field_implementations {
            let _ = write!(out, "\n   - the field \"{field_name}\" is invalid:");

            if let Some(implemented) = &invalid.implemented_response_type {
                let _ = write!(
                    out,
                    "\n      the response type \"{implemented}\" is not a valid implementation of \"{}\".",
                    invalid.original_response_type
                );
            }

            for argument_name in &invalid.unimplemented_arguments {
                let _ = write!(out, "\n      the argument \"{argument_name}\" is not implemented.");
            }

            for argument in &invalid.invalid_implemented_arguments {
                let _ = write!(
                    out,
                    "\n      the argument \"{}\" must be type \"{}\", not \"{}\".",
                    argument.argument_name, argument.expected_type, argument.actual_type
                );
            }

            for argument_name in &invalid.invalid_additional_arguments {
                let _ = write!(
                    out,
                    "\n      the additional argument \"{argument_name}\" must be nullable."
                );
            }

            if invalid.is_inaccessible {
                let _ = write!(
                    out,
                    "\n      the field is declared \"@inaccessible\", but the interface field is not."
                );
            }
        }
    }

    out
}

fn format_invalid_subgraph_names(non_unique_subgraph_names: &[String], invalid_name_messages: &[String]) -> String {
    let mut out = String::from("Subgraphs to be federated must each have a unique, non-empty name.");

    if !non_unique_subgraph_names.is_empty() {
        out.push_str("\nThe following subgraph names are not unique:");
        out.push_str(&bullet_list(non_unique_subgraph_names));
    }

    for message in invalid_name_messages {
        out.push('\n');
        out.push_str(message);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promoted_warnings_become_errors() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.push_warning(Warning::InvalidExternalField {
            subgraph_name: "users".to_owned(),
            field_coords: "User.name".to_owned(),
        });
        assert!(!diagnostics.any_fatal());

        diagnostics.promote_warnings();

        assert!(diagnostics.any_fatal());
        assert!(diagnostics.warnings().is_empty());
        assert_eq!(
            diagnostics.iter_errors().collect::<Vec<_>>(),
            vec!["[users] The field \"User.name\" is declared \"@external\", but it is not used in any key, provides, requires or interface implementation.".to_owned()]
        );
    }

    #[test]
    fn or_scopes_limit_lists_every_path() {
        let error = NormalizationError::OrScopesLimit {
            max_or_scopes: 16,
            host_paths: vec!["Query.a".to_owned(), "Query.b".to_owned()],
        };

        assert_eq!(
            error.to_string(),
            "The maximum number of OR scopes that can be defined by \"@requiresScopes\" on a single field or type is 16; however, the following path(s) attempt to exceed that limit:\n - Query.a\n - Query.b"
        );
    }
}
