#![allow(unused_crate_dependencies)]

use graphql_normalization::{normalize_subgraph, EventType, Graph, NormalizationError, NormalizationOutcome, ProviderType};

fn normalize(sdl: &str) -> NormalizationOutcome {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let document = cynic_parser::parse_type_system_document(sdl).unwrap();
    normalize_subgraph(&document, Some("events"), &mut Graph::new())
}

fn event_driven_subgraph(key: &str) -> String {
    format!(
        r#"
        type Query {{
          findUser(id: ID!): User! @edfs__natsRequest(subject: "users.{{{{ args.id }}}}")
        }}

        type Subscription {{
          userUpdated: User! @edfs__kafkaSubscribe(topics: ["users"], providerId: "my-kafka")
        }}

        type User {key} {{
          id: ID! @external
        }}
        "#
    )
}

#[test]
fn resolvable_key_with_external_fields() {
    let outcome = normalize(&event_driven_subgraph(r#"@key(fields: "id")"#));
    assert!(outcome.diagnostics().errors().is_empty(), "{:#?}", outcome.diagnostics().errors());

    let result = outcome.into_result().unwrap();
    assert!(result.is_event_driven_graph);

    let query_events = &result.configuration_data_by_type_name["Query"].events;
    assert_eq!(query_events.len(), 1);
    assert_eq!(query_events[0].field_name, "findUser");
    assert_eq!(query_events[0].provider_id, "default");
    assert_eq!(query_events[0].provider_type, ProviderType::Nats);
    assert_eq!(query_events[0].event_type, EventType::Request);
    assert_eq!(query_events[0].subjects, ["users.{{ args.id }}"]);

    let subscription_events = &result.configuration_data_by_type_name["Subscription"].events;
    assert_eq!(subscription_events[0].provider_id, "my-kafka");
    assert_eq!(subscription_events[0].provider_type, ProviderType::Kafka);
    assert_eq!(subscription_events[0].subjects, ["users"]);

    let user = &result.configuration_data_by_type_name["User"];
    assert!(user.field_names.is_empty());
    assert!(user.external_field_names.contains("id"));

    assert!(result
        .sdl
        .contains("directive @edfs__natsRequest(subject: String!, providerId: String! = \"default\") on FIELD_DEFINITION"));
    assert!(!result.sdl.contains("directive @edfs__natsPublish"));
}

#[test]
fn unresolvable_key() {
    let outcome = normalize(&event_driven_subgraph(r#"@key(fields: "id", resolvable: false)"#));

    let [NormalizationError::InvalidEventDrivenGraph { messages }] = outcome.diagnostics().errors() else {
        unreachable!("{:#?}", outcome.diagnostics().errors());
    };

    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("\"id\" on the entity \"User\""));
}

#[test]
fn template_references_an_undefined_argument() {
    let outcome = normalize(
        r#"
        type Query {
          findUser(id: ID!): User! @edfs__natsRequest(subject: "users.{{ args.uuid }}")
        }

        type User @key(fields: "id") {
          id: ID! @external
        }
        "#,
    );

    let [NormalizationError::InvalidEventDirective {
        directive_name,
        field_path,
        messages,
    }] = outcome.diagnostics().errors()
    else {
        unreachable!("{:#?}", outcome.diagnostics().errors());
    };

    assert_eq!(directive_name, "edfs__natsRequest");
    assert_eq!(field_path, "Query.findUser");
    assert!(messages[0].contains("\"uuid\""));
}

#[test]
fn root_fields_must_use_a_matching_directive_and_return_entities() {
    let outcome = normalize(
        r#"
        type Query {
          findUser(id: ID!): User! @edfs__kafkaSubscribe(topics: ["users"])
          count: Int
        }

        type User @key(fields: "id") {
          id: ID! @external
          name: String
        }
        "#,
    );

    let [NormalizationError::InvalidEventDrivenGraph { messages }] = outcome.diagnostics().errors() else {
        unreachable!("{:#?}", outcome.diagnostics().errors());
    };

    let message = messages.join("\n");
    assert!(message.contains("\"Query.findUser\" defines the event directive(s) \"@edfs__kafkaSubscribe\""));
    assert!(message.contains("\"Query.count\" does not define an event directive"));
    assert!(message.contains("\"Query.count\" returns \"Int\""));
    assert!(message.contains("User.name"));
}

#[test]
fn subscription_filter_outside_of_subscriptions() {
    let outcome = normalize(
        r#"
        type Query {
          findUser(id: ID!): User!
            @edfs__natsRequest(subject: "users.{{ args.id }}")
            @openfed__subscriptionFilter(condition: { IN: { fieldPath: "id", values: [1] } })
        }

        type User @key(fields: "id") {
          id: ID! @external
        }
        "#,
    );

    assert!(outcome.diagnostics().errors().iter().any(|error| matches!(
        error,
        NormalizationError::InvalidSubscriptionFilterLocation { field_path } if field_path == "Query.findUser"
    )));
}
