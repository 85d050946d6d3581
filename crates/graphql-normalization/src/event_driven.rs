//! Event-driven subgraphs: root fields bound to Kafka or NATS operations instead of resolvers.

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;

use crate::{
    ast::{Directive, OperationType},
    configuration::{EventConfiguration, EventType, ProviderType, StreamConfiguration},
    constants::*,
    normalize::Normalizer,
    registry::{CompositeOutputData, DirectivesByName, InputValueData, ParentDefinitionData},
    value::Value,
    NormalizationError,
};

const NON_NULL_PUBLISH_RESULT: &str = "edfs__PublishResult!";

fn valid_event_directive_names(operation: OperationType) -> &'static [&'static str] {
    match operation {
        OperationType::Query => &[NATS_REQUEST],
        OperationType::Mutation => &[KAFKA_PUBLISH, NATS_PUBLISH, NATS_REQUEST],
        OperationType::Subscription => &[KAFKA_SUBSCRIBE, NATS_SUBSCRIBE],
    }
}

/// Names referenced as `{{ args.name }}` in a subject or topic template.
fn template_argument_names(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            break;
        };

        if let Some(name) = after_open[..end].trim().strip_prefix("args.") {
            names.push(name);
        }

        rest = &after_open[end + 2..];
    }

    names
}

fn validate_template_references(template: &str, arguments: &IndexMap<String, InputValueData>, messages: &mut Vec<String>) {
    for name in template_argument_names(template) {
        if !arguments.contains_key(name) {
            messages.push(format!(
                "The template \"{template}\" references the argument \"{name}\", which is not defined on the field."
            ));
        }
    }
}

fn non_empty_string<'a>(value: &'a Value) -> Option<&'a str> {
    value.as_str().filter(|s| !s.is_empty())
}

/// The single subject of a publish or request directive.
fn single_subject(directive: &Directive, argument_name: &str, arguments: &IndexMap<String, InputValueData>, messages: &mut Vec<String>) -> Vec<String> {
    match directive.argument(argument_name).and_then(non_empty_string) {
        Some(subject) => {
            validate_template_references(subject, arguments, messages);
            vec![subject.to_owned()]
        }
        None => {
            messages.push(format!("The \"{argument_name}\" argument must be a non-empty string."));
            Vec::new()
        }
    }
}

/// The subjects of a subscribe directive.
fn subject_list(directive: &Directive, argument_name: &str, arguments: &IndexMap<String, InputValueData>, messages: &mut Vec<String>) -> Vec<String> {
    let Some(values) = directive.argument(argument_name).and_then(Value::as_list) else {
        messages.push(format!("The \"{argument_name}\" argument must be a list of strings."));
        return Vec::new();
    };

    let mut subjects = Vec::with_capacity(values.len());

    for value in values {
        let Some(subject) = non_empty_string(value) else {
            messages.push(format!("Each item of the \"{argument_name}\" argument must be a non-empty string."));
            break;
        };

        validate_template_references(subject, arguments, messages);
        subjects.push(subject.to_owned());
    }

    subjects
}

fn provider_id(directive: &Directive, messages: &mut Vec<String>) -> String {
    match directive.argument(PROVIDER_ID) {
        None => DEFAULT_EDFS_PROVIDER_ID.to_owned(),
        Some(value) => match non_empty_string(value) {
            Some(provider_id) => provider_id.to_owned(),
            None => {
                messages.push("The \"providerId\" argument must be a non-empty string.".to_owned());
                DEFAULT_EDFS_PROVIDER_ID.to_owned()
            }
        },
    }
}

fn stream_configuration(directive: &Directive, messages: &mut Vec<String>) -> Option<StreamConfiguration> {
    let value = directive.argument(STREAM_CONFIGURATION)?;

    let Some(fields) = value.as_object().filter(|fields| !fields.is_empty()) else {
        messages.push("The \"streamConfiguration\" argument must be a non-empty input object.".to_owned());
        return None;
    };

    let mut missing: IndexSet<&str> = [CONSUMER_NAME, STREAM_NAME].into_iter().collect();
    let mut duplicated = IndexSet::new();
    let mut invalid = IndexSet::new();
    let mut unknown = IndexSet::new();
    let mut consumer_name = None;
    let mut stream_name = None;

    for (name, value) in fields {
        let name = name.as_str();

        if name != CONSUMER_NAME && name != STREAM_NAME {
            unknown.insert(name);
            continue;
        }

        if !missing.shift_remove(name) {
            duplicated.insert(name);
            continue;
        }

        match non_empty_string(value) {
            Some(s) if name == CONSUMER_NAME => consumer_name = Some(s.to_owned()),
            Some(s) => stream_name = Some(s.to_owned()),
            None => {
                invalid.insert(name);
            }
        }
    }

    let mut problems = Vec::new();
    for (names, description) in [
        (&missing, "missing"),
        (&duplicated, "defined more than once"),
        (&invalid, "not non-empty strings"),
        (&unknown, "not valid fields"),
    ] {
        if !names.is_empty() {
            problems.push(format!(
                "{} ({description})",
                names.iter().map(|name| format!("\"{name}\"")).join(", ")
            ));
        }
    }

    if !problems.is_empty() {
        messages.push(format!(
            "The \"streamConfiguration\" argument is invalid: {}.",
            problems.join("; ")
        ));
        return None;
    }

    Some(StreamConfiguration {
        consumer_name: consumer_name?,
        stream_name: stream_name?,
    })
}

impl Normalizer<'_> {
    /// Turn the event directives of a field into event configurations of its parent.
    pub(crate) fn extract_event_configuration(
        &mut self,
        renamed_parent_type_name: &str,
        field_name: &str,
        operation: Option<OperationType>,
        directives: &DirectivesByName,
        arguments: &IndexMap<String, InputValueData>,
    ) {
        let field_path = format!("{renamed_parent_type_name}.{field_name}");

        for directive in directives
            .iter()
            .filter(|(name, _)| EVENT_DIRECTIVES.contains(&name.as_str()))
            .flat_map(|(_, directives)| directives)
        {
            let mut messages = Vec::new();
            let provider_id = provider_id(directive, &mut messages);

            let (provider_type, event_type, subjects, stream_configuration) = match directive.name.as_str() {
                KAFKA_PUBLISH => (
                    ProviderType::Kafka,
                    EventType::Publish,
                    single_subject(directive, TOPIC, arguments, &mut messages),
                    None,
                ),
                KAFKA_SUBSCRIBE => (
                    ProviderType::Kafka,
                    EventType::Subscribe,
                    subject_list(directive, TOPICS, arguments, &mut messages),
                    None,
                ),
                NATS_PUBLISH => (
                    ProviderType::Nats,
                    EventType::Publish,
                    single_subject(directive, SUBJECT, arguments, &mut messages),
                    None,
                ),
                NATS_REQUEST => (
                    ProviderType::Nats,
                    EventType::Request,
                    single_subject(directive, SUBJECT, arguments, &mut messages),
                    None,
                ),
                _ => (
                    ProviderType::Nats,
                    EventType::Subscribe,
                    subject_list(directive, SUBJECTS, arguments, &mut messages),
                    stream_configuration(directive, &mut messages),
                ),
            };

            if !messages.is_empty() {
                self.diagnostics.push_error(NormalizationError::InvalidEventDirective {
                    directive_name: directive.name.clone(),
                    field_path: field_path.clone(),
                    messages,
                });
                continue;
            }

            tracing::trace!(field_path, directive = directive.name, ?operation, "extracted event configuration");

            self.events_by_type_name
                .entry(renamed_parent_type_name.to_owned())
                .or_default()
                .push(EventConfiguration {
                    field_name: field_name.to_owned(),
                    provider_id,
                    provider_type,
                    event_type,
                    subjects,
                    stream_configuration,
                });
        }
    }

    fn validate_event_driven_root_type(
        &self,
        data: &CompositeOutputData,
        operation: OperationType,
        messages: &mut EventDrivenMessages,
    ) {
        let valid_directive_names = valid_event_directive_names(operation);

        for (field_name, field) in &data.fields {
            let field_path = format!("{}.{field_name}", field.original_parent_type_name);

            let defined: Vec<&str> = EVENT_DIRECTIVES
                .into_iter()
                .filter(|name| field.directives.contains_key(*name))
                .collect();
            let invalid: Vec<&str> = defined
                .iter()
                .copied()
                .filter(|name| !valid_directive_names.contains(name))
                .collect();

            if defined.is_empty() {
                messages.invalid_root_fields.push(format!(
                    "\"{field_path}\" does not define an event directive; root fields of {operation} must define one of: {}.",
                    valid_directive_names.iter().map(|name| format!("\"@{name}\"")).join(", ")
                ));
            } else if !invalid.is_empty() {
                messages.invalid_root_fields.push(format!(
                    "\"{field_path}\" defines the event directive(s) {}, which are not valid on root fields of {operation}.",
                    invalid.iter().map(|name| format!("\"@{name}\"")).join(", ")
                ));
            }

            let type_string = field.r#type.to_string();

            if operation == OperationType::Mutation {
                if type_string != NON_NULL_PUBLISH_RESULT {
                    messages.invalid_mutation_response_types.push(format!(
                        "\"{field_path}\" returns \"{type_string}\", but mutation fields must return \"{NON_NULL_PUBLISH_RESULT}\"."
                    ));
                }
                continue;
            }

            let named_type_name = field.named_type_name();
            let resolves_to_entity = self
                .concrete_type_names_by_abstract_type_name
                .get(named_type_name)
                .map(|concrete_type_names| concrete_type_names.iter().any(|name| self.is_entity(name)))
                .unwrap_or_else(|| self.is_entity(named_type_name));

            if !field.r#type.is_non_null() || !resolves_to_entity {
                messages.invalid_root_response_types.push(format!(
                    "\"{field_path}\" returns \"{type_string}\", but it must return a non-null entity (or a non-null list of entities)."
                ));
            }
        }
    }

    fn is_entity(&self, type_name: &str) -> bool {
        self.parent_definition_data_by_type_name
            .get(type_name)
            .and_then(ParentDefinitionData::as_composite)
            .is_some_and(|data| data.is_entity)
    }

    fn is_publish_result_valid(&self) -> bool {
        let Some(data) = self.parent_definition_data_by_type_name.get(EDFS_PUBLISH_RESULT) else {
            return true;
        };

        let ParentDefinitionData::Object(data) = data else {
            return false;
        };

        data.fields.len() == 1
            && data.fields.get(SUCCESS).is_some_and(|field| {
                field.arguments.is_empty() && field.r#type.to_string() == "Boolean!"
            })
    }

    fn is_stream_configuration_input_valid(data: &ParentDefinitionData) -> bool {
        let ParentDefinitionData::InputObject(data) = data else {
            return false;
        };

        data.input_values.len() == 2
            && [CONSUMER_NAME, STREAM_NAME].into_iter().all(|name| {
                data.input_values
                    .get(name)
                    .is_some_and(|input_value| input_value.r#type.to_string() == "String!")
            })
    }

    /// Validate the shape of an event-driven subgraph. Every violation lands in one error.
    pub(crate) fn validate_event_driven_subgraph(&mut self) {
        let mut messages = EventDrivenMessages::default();

        for (type_name, data) in &self.parent_definition_data_by_type_name {
            if type_name == EDFS_PUBLISH_RESULT || type_name == EDFS_NATS_STREAM_CONFIGURATION {
                continue;
            }

            let ParentDefinitionData::Object(data) = data else {
                continue;
            };

            if data.is_root_type {
                if let Some(operation) = OperationType::from_default_type_name(&data.renamed_type_name) {
                    self.validate_event_driven_root_type(data, operation, &mut messages);
                }
                continue;
            }

            let Some(key_field_names) = self.key_field_names_by_parent_type_name.get(type_name) else {
                messages.non_key_composing_type_names.push(type_name.clone());
                continue;
            };

            if let Some(key_field_set_data) = self.key_field_set_data_by_type_name.get(type_name) {
                for (field_set, is_resolvable) in &key_field_set_data.is_resolvable_by_raw_field_set {
                    if !is_resolvable {
                        messages
                            .unresolvable_keys
                            .push(format!("\"{field_set}\" on the entity \"{type_name}\""));
                    }
                }
            }

            for (field_name, field) in &data.fields {
                let field_path = format!("{}.{field_name}", field.original_parent_type_name);

                if !key_field_names.contains(field_name) {
                    messages.non_key_fields.push(field_path);
                } else if !field.is_external_in(&self.subgraph_name) {
                    messages.non_external_key_fields.push(field_path);
                }
            }
        }

        let mut errors = Vec::new();

        if !self.is_publish_result_valid() {
            errors.push(format!(
                "The object \"{EDFS_PUBLISH_RESULT}\" must define exactly one field, \"success: Boolean!\", without arguments."
            ));
        }

        if self.edfs_directive_references.contains(NATS_SUBSCRIBE) {
            match self.parent_definition_data_by_type_name.get(EDFS_NATS_STREAM_CONFIGURATION) {
                None => errors.push(format!(
                    "The input object \"{EDFS_NATS_STREAM_CONFIGURATION}\" must be defined when \"@{NATS_SUBSCRIBE}\" is used."
                )),
                Some(data) if !Self::is_stream_configuration_input_valid(data) => errors.push(format!(
                    "The input object \"{EDFS_NATS_STREAM_CONFIGURATION}\" must define exactly the input values \"consumerName: String!\" and \"streamName: String!\"."
                )),
                Some(_) => (),
            }
        }

        errors.extend(messages.into_errors());

        if !errors.is_empty() {
            self.diagnostics
                .push_error(NormalizationError::InvalidEventDrivenGraph { messages: errors });
        }
    }

    /// The subscription filter is only meaningful on Subscription root fields of event-driven subgraphs.
    pub(crate) fn validate_subscription_filter_locations(&mut self) {
        let is_event_driven = !self.edfs_directive_references.is_empty();

        for (field_path, is_on_subscription) in &self.subscription_filter_field_paths {
            if is_event_driven && *is_on_subscription {
                continue;
            }

            self.diagnostics
                .push_error(NormalizationError::InvalidSubscriptionFilterLocation {
                    field_path: field_path.clone(),
                });
        }
    }
}

#[derive(Default)]
struct EventDrivenMessages {
    invalid_root_fields: Vec<String>,
    invalid_mutation_response_types: Vec<String>,
    invalid_root_response_types: Vec<String>,
    unresolvable_keys: Vec<String>,
    non_external_key_fields: Vec<String>,
    non_key_fields: Vec<String>,
    non_key_composing_type_names: Vec<String>,
}

impl EventDrivenMessages {
    fn into_errors(self) -> Vec<String> {
        let mut errors = Vec::new();

        let sections = [
            ("The following root fields define invalid event directives:", self.invalid_root_fields),
            ("The following mutation fields return invalid types:", self.invalid_mutation_response_types),
            ("The following root fields return invalid types:", self.invalid_root_response_types),
            (
                "The following key field sets are declared unresolvable, but entities of an event-driven graph must be resolvable:",
                self.unresolvable_keys,
            ),
            (
                "The following key fields must be declared \"@external\":",
                self.non_external_key_fields,
            ),
            (
                "The following fields are not part of a key, but entities of an event-driven graph may only define key fields:",
                self.non_key_fields,
            ),
            (
                "The following objects do not define a key, but objects of an event-driven graph must be entities:",
                self.non_key_composing_type_names,
            ),
        ];

        for (header, items) in sections {
            if items.is_empty() {
                continue;
            }

            errors.push(format!("{header}{}", items.iter().map(|item| format!("\n   {item}")).join("")));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_references_are_read_between_braces() {
        assert_eq!(
            template_argument_names("orders.{{ args.id }}.{{args.region}}.{{ other }}"),
            vec!["id", "region"]
        );
        assert!(template_argument_names("orders.{{ args.id").is_empty());
    }

    #[test]
    fn stream_configuration_reports_every_problem_at_once() {
        let directive = Directive::new(NATS_SUBSCRIBE).with_argument(
            STREAM_CONFIGURATION,
            Value::Object(vec![
                ("consumerName".to_owned(), Value::from("")),
                ("durable".to_owned(), Value::Boolean(true)),
            ]),
        );
        let mut messages = Vec::new();

        assert_eq!(stream_configuration(&directive, &mut messages), None);
        assert_eq!(
            messages,
            vec![
                "The \"streamConfiguration\" argument is invalid: \"streamName\" (missing); \"consumerName\" (not non-empty strings); \"durable\" (not valid fields).".to_owned()
            ]
        );
    }

    #[test]
    fn provider_id_defaults_when_absent() {
        let mut messages = Vec::new();
        assert_eq!(provider_id(&Directive::new(KAFKA_PUBLISH), &mut messages), "default");

        let directive = Directive::new(KAFKA_PUBLISH).with_argument(PROVIDER_ID, Value::from(""));
        provider_id(&directive, &mut messages);
        assert_eq!(messages.len(), 1);
    }
}
