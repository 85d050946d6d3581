#![allow(unused_crate_dependencies)]

use graphql_normalization::{
    batch_normalize, batch_normalize_with_options, BatchNormalizationOptions, NormalizationError, Subgraph,
    TypeSystemDocument, Warning,
};

fn parse(sdl: &str) -> TypeSystemDocument {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    cynic_parser::parse_type_system_document(sdl).unwrap()
}

fn subgraph<'a>(name: &'a str, document: &'a TypeSystemDocument) -> Subgraph<'a> {
    Subgraph {
        name: Some(name),
        url: Some("http://localhost:4000/graphql"),
        document,
    }
}

#[test]
fn duplicate_overrides() {
    let a = parse("type Query { a: String }");
    let b = parse(r#"type Query { a: String @override(from: "A") }"#);
    let c = parse(r#"type Query { a: String @override(from: "A") }"#);

    let outcome = batch_normalize(&[subgraph("A", &a), subgraph("B", &b), subgraph("C", &c)]);

    assert!(!outcome.is_success());

    let [NormalizationError::DuplicateOverriddenFields { overrides }] = outcome.diagnostics().errors() else {
        unreachable!("{:#?}", outcome.diagnostics().errors());
    };

    assert_eq!(overrides.len(), 1);
    assert_eq!(overrides[0].field_path, "Query.a");
    assert_eq!(overrides[0].source_subgraph_names, ["B", "C"]);
}

#[test]
fn accepted_override_moves_field_ownership() {
    let accounts = parse(
        r#"
        type Query {
          me: User
          users: [User!]!
        }

        type User @key(fields: "id") {
          id: ID!
          name: String
        }
        "#,
    );
    let profiles = parse(
        r#"
        type Query {
          me: User @override(from: "accounts")
        }

        type User @key(fields: "id") {
          id: ID!
          bio: String
        }
        "#,
    );

    let outcome = batch_normalize_with_options(
        &[subgraph("accounts", &accounts), subgraph("profiles", &profiles)],
        &BatchNormalizationOptions {
            parallel: false,
            ..Default::default()
        },
    );

    assert!(outcome.is_success(), "{:#?}", outcome.diagnostics().errors());

    let accounts = &outcome.internal_subgraph_by_subgraph_name["accounts"];
    assert_eq!(
        accounts.configuration_data_by_type_name["Query"]
            .field_names
            .iter()
            .collect::<Vec<_>>(),
        ["users"]
    );
    assert!(accounts.overridden_field_names_by_parent_type_name["Query"].contains("me"));
    assert_eq!(accounts.url.as_deref(), Some("http://localhost:4000/graphql"));

    let profiles = &outcome.internal_subgraph_by_subgraph_name["profiles"];
    assert!(profiles.configuration_data_by_type_name["Query"].field_names.contains("me"));
    assert!(profiles.is_version_two);

    let user = &outcome.entity_data_by_type_name["User"];
    assert_eq!(user.subgraph_names.iter().collect::<Vec<_>>(), ["accounts", "profiles"]);
    assert!(user.key_field_sets.contains("id"));
}

#[test]
fn override_of_an_unknown_subgraph_is_a_warning() {
    let products = parse(r#"type Query { a: String @override(from: "legacy") }"#);

    let outcome = batch_normalize(&[subgraph("products", &products)]);

    assert!(outcome.is_success());
    assert!(matches!(
        outcome.diagnostics().warnings(),
        [Warning::InvalidOverrideTargetSubgraphName {
            target_subgraph_name,
            source_subgraph_name,
            ..
        }] if target_subgraph_name == "legacy" && source_subgraph_name == "products"
    ));
}

#[test]
fn failed_subgraphs_are_wrapped() {
    let valid = parse("type Query { a: String }");
    let invalid = parse("type Query { a: Missing }");

    let outcome = batch_normalize(&[subgraph("valid", &valid), subgraph("invalid", &invalid)]);

    let [NormalizationError::SubgraphValidation { subgraph_name, errors }] = outcome.diagnostics().errors() else {
        unreachable!("{:#?}", outcome.diagnostics().errors());
    };

    assert_eq!(subgraph_name, "invalid");
    assert!(matches!(errors.as_slice(), [NormalizationError::UndefinedType { .. }]));
    assert!(outcome.internal_subgraph_by_subgraph_name.contains_key("valid"));
    assert!(!outcome.internal_subgraph_by_subgraph_name.contains_key("invalid"));
}

#[test]
fn abstract_types_and_authorization_are_merged() {
    let first = parse(
        r#"
        type Query {
          node: Node @authenticated
        }

        interface Node {
          id: ID!
        }

        type User implements Node {
          id: ID!
        }
        "#,
    );
    let second = parse(
        r#"
        type Query {
          node: Node @requiresScopes(scopes: [["read:nodes"]])
        }

        interface Node {
          id: ID!
        }

        type Post implements Node {
          id: ID!
        }
        "#,
    );

    let outcome = batch_normalize(&[subgraph("first", &first), subgraph("second", &second)]);

    assert!(outcome.is_success(), "{:#?}", outcome.diagnostics().errors());
    assert_eq!(
        outcome.concrete_type_names_by_abstract_type_name["Node"]
            .iter()
            .collect::<Vec<_>>(),
        ["User", "Post"]
    );

    assert!(outcome.graph.node("first", "User").is_some());
    assert!(outcome.graph.node("second", "Post").is_some());
    assert!(outcome.graph.node("first", "Post").is_none());

    let node = &outcome.authorization_data_by_parent_type_name["Query"].field_authorization_data_by_field_name["node"];
    assert!(node.requirement.requires_authentication);
    assert_eq!(node.requirement.required_scopes.len(), 1);
}

#[test]
fn internal_subgraphs_keep_conditional_fields_and_persisted_directives() {
    let inventory = parse(
        r#"
        directive @cached(ttl: Int) on FIELD

        type Query {
          topProducts: [Product!]! @provides(fields: "name")
        }

        type Product @key(fields: "id") {
          id: ID!
          name: String @external
        }
        "#,
    );

    let outcome = batch_normalize(&[subgraph("inventory", &inventory)]);

    assert!(outcome.is_success(), "{:#?}", outcome.diagnostics().errors());

    let inventory = &outcome.internal_subgraph_by_subgraph_name["inventory"];
    assert_eq!(
        inventory.conditional_field_data_by_coordinates["Product.name"].provided_by[0].field_path,
        ["topProducts", "name"]
    );
    assert!(inventory
        .persisted_directive_definition_data_by_directive_name
        .contains_key("cached"));
}
