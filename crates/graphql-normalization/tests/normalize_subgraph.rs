#![allow(unused_crate_dependencies)]

use graphql_normalization::{
    normalize_subgraph, normalize_subgraph_from_str, normalize_subgraph_with_options, DirectiveLocations,
    ExtensionType, FieldSetCondition, Graph, NormalizationError, NormalizationOptions, NormalizationOutcome,
    ParentDefinitionData, Warning,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn normalize(sdl: &str, subgraph_name: &str) -> NormalizationOutcome {
    init_tracing();
    let document = cynic_parser::parse_type_system_document(sdl).unwrap();
    normalize_subgraph(&document, Some(subgraph_name), &mut Graph::new())
}

#[test]
fn type_defined_with_two_kinds() {
    let outcome = normalize(
        r#"
        type Query {
          foo: Foo
        }

        type Foo {
          a: String
        }

        interface Foo {
          a: String
        }
        "#,
        "products",
    );

    assert!(outcome.result().is_none());

    let [NormalizationError::MultipleNamedTypeDefinition {
        type_name,
        existing_kind,
        incoming_kind,
    }] = outcome.diagnostics().errors()
    else {
        unreachable!("{:#?}", outcome.diagnostics().errors());
    };

    assert_eq!(type_name, "Foo");
    assert_eq!(existing_kind.as_str(), "object");
    assert_eq!(incoming_kind.as_str(), "interface");
}

#[test]
fn base_definition_and_extension_merge_in_any_order() {
    let base = r#"type Product @key(fields: "id") { id: ID! }"#;
    let extension = r#"extend type Product @tag(name: "catalog") { name: String }"#;
    let query = "type Query { product: Product }";

    let base_first = normalize(&format!("{query}\n{base}\n{extension}"), "products")
        .into_result()
        .unwrap();
    let extension_first = normalize(&format!("{query}\n{extension}\n{base}"), "products")
        .into_result()
        .unwrap();

    let ParentDefinitionData::Object(product) = &base_first.parent_definition_data_by_type_name["Product"] else {
        unreachable!();
    };

    assert_eq!(product.extension_type, ExtensionType::Real);
    assert!(product.has_base_definition);
    assert!(product.is_entity);
    assert_eq!(product.fields.keys().collect::<Vec<_>>(), ["id", "name"]);
    assert!(product.directives.contains_key("key"));
    assert!(product.directives.contains_key("tag"));

    pretty_assertions::assert_eq!(
        base_first.parent_definition_data_by_type_name["Product"],
        extension_first.parent_definition_data_by_type_name["Product"]
    );
}

#[test]
fn or_scopes_over_the_limit() {
    let scopes = (0..17).map(|idx| format!("[\"scope{idx}\"]")).collect::<Vec<_>>().join(", ");
    let outcome = normalize(
        &format!("type Query {{ secret: String @requiresScopes(scopes: [{scopes}]) }}"),
        "secrets",
    );

    assert!(outcome.result().is_none());

    let [NormalizationError::OrScopesLimit {
        max_or_scopes,
        host_paths,
    }] = outcome.diagnostics().errors()
    else {
        unreachable!("{:#?}", outcome.diagnostics().errors());
    };

    assert_eq!(*max_or_scopes, 16);
    assert_eq!(host_paths, &["Query.secret"]);
}

#[test]
fn or_scopes_limit_is_configurable() {
    init_tracing();
    let document = cynic_parser::parse_type_system_document(
        r#"type Query { secret: String @requiresScopes(scopes: [["a"], ["b"], ["c"]]) }"#,
    )
    .unwrap();

    let options = NormalizationOptions::default()
        .with_subgraph_name("secrets")
        .with_max_or_scopes(2);
    let outcome = normalize_subgraph_with_options(&document, &options, &mut Graph::new());

    assert!(matches!(
        outcome.diagnostics().errors(),
        [NormalizationError::OrScopesLimit { max_or_scopes: 2, .. }]
    ));
}

#[test]
fn type_level_authorization_is_printed_on_every_field() {
    let result = normalize(
        r#"
        type Query {
          product: Product
        }

        type Product @authenticated {
          id: ID!
          name: String @requiresScopes(scopes: [["read"]])
        }
        "#,
        "products",
    )
    .into_result()
    .unwrap();

    assert!(result.is_version_two);

    let product = &result.authorization_data_by_parent_type_name["Product"];
    assert!(product.has_parent_level_authorization);
    assert!(product.field_authorization_data_by_field_name["id"].requirement.requires_authentication);

    let name = &product.field_authorization_data_by_field_name["name"].requirement;
    assert!(name.requires_authentication);
    assert_eq!(name.required_scopes.len(), 1);
    assert!(name.required_scopes[0].contains("read"));

    assert!(result.sdl.contains("type Product @authenticated {"));
    assert!(result.sdl.contains("  id: ID! @authenticated\n"));
    assert!(result
        .sdl
        .contains("  name: String @authenticated @requiresScopes(scopes: [[\"read\"]])\n"));
}

#[test]
fn stricter_implementation_is_valid() {
    let outcome = normalize(
        r#"
        type Query {
          greeter: Greeter
        }

        interface Greeter {
          greeting: String
        }

        type Hello implements Greeter {
          greeting: String!
        }
        "#,
        "greetings",
    );

    assert!(outcome.diagnostics().errors().is_empty(), "{:#?}", outcome.diagnostics().errors());

    let result = outcome.into_result().unwrap();
    assert_eq!(
        result.concrete_type_names_by_abstract_type_name["Greeter"]
            .iter()
            .collect::<Vec<_>>(),
        ["Hello"]
    );
}

#[test]
fn looser_implementation_is_invalid() {
    let outcome = normalize(
        r#"
        type Query {
          greeter: Greeter
        }

        interface Greeter {
          greeting: String!
        }

        type Hello implements Greeter {
          greeting: String
        }
        "#,
        "greetings",
    );

    let [NormalizationError::InvalidInterfaceImplementation {
        type_name,
        errors_by_interface_name,
        ..
    }] = outcome.diagnostics().errors()
    else {
        unreachable!("{:#?}", outcome.diagnostics().errors());
    };

    assert_eq!(type_name, "Hello");

    let greeting = &errors_by_interface_name["Greeter"].invalid_field_implementations["greeting"];
    assert_eq!(greeting.original_response_type, "String!");
    assert_eq!(greeting.implemented_response_type.as_deref(), Some("String"));
}

#[test]
fn override_from_own_subgraph() {
    let outcome = normalize(r#"type Query { a: String @override(from: "self") }"#, "self");

    let [NormalizationError::InvalidDirective {
        directive_name,
        host_path,
        ..
    }] = outcome.diagnostics().errors()
    else {
        unreachable!("{:#?}", outcome.diagnostics().errors());
    };

    assert_eq!(directive_name, "override");
    assert_eq!(host_path, "Query.a");
}

#[test]
fn override_is_recorded_by_target() {
    let result = normalize(r#"type Query { a: String @override(from: "accounts") }"#, "products")
        .into_result()
        .unwrap();

    assert!(result.overrides_by_target_subgraph_name["accounts"]["Query"].contains("a"));
}

#[test]
fn normalization_is_idempotent() {
    let sdl = r#"
        schema {
          query: RootQuery
        }

        type RootQuery {
          users: [User!]! @shareable
        }

        "A user"
        type User @key(fields: "id") @key(fields: "organization { id }") {
          id: ID!
          organization: Organization!
          role: Role @deprecated(reason: "use roles")
        }

        type Organization {
          id: ID!
        }

        enum Role {
          ADMIN
          MEMBER
        }
    "#;

    let first = normalize(sdl, "users").into_result().unwrap();
    let second = normalize(sdl, "users").into_result().unwrap();

    assert_eq!(first.sdl, second.sdl);
    assert_eq!(first.configuration_data_by_type_name, second.configuration_data_by_type_name);
    assert_eq!(first.configuration_json(), second.configuration_json());

    assert_eq!(first.original_type_name_by_renamed_type_name["Query"], "RootQuery");
    assert!(first.configuration_data_by_type_name["Query"].is_root_node);
    assert_eq!(
        first.key_field_names_by_parent_type_name["User"]
            .iter()
            .collect::<Vec<_>>(),
        ["id", "organization"]
    );

    let keys: Vec<_> = first.configuration_data_by_type_name["User"]
        .keys
        .iter()
        .map(|key| key.selection_set.as_str())
        .collect();
    assert_eq!(keys, ["id", "organization { id }"]);
}

#[test]
fn router_configuration() {
    let result = normalize(
        r#"
        type Query {
          me: User
        }

        type User @key(fields: "id") {
          id: ID!
          name: String
        }
        "#,
        "accounts",
    )
    .into_result()
    .unwrap();

    insta::assert_json_snapshot!(result.configuration_json(), @r#"
    {
      "Query": {
        "fieldNames": [
          "me"
        ],
        "isRootNode": true,
        "typeName": "Query"
      },
      "User": {
        "fieldNames": [
          "id",
          "name"
        ],
        "isRootNode": true,
        "typeName": "User",
        "keys": [
          {
            "typeName": "User",
            "fieldName": "",
            "selectionSet": "id"
          }
        ]
      }
    }
    "#);

    let user = &result.entity_data_by_type_name["User"];
    assert!(user.key_field_sets.contains("id"));
    assert!(user.subgraph_names.contains("accounts"));
}

#[test]
fn invalid_key_field_set() {
    let outcome = normalize(
        r#"
        type Query {
          me: User
        }

        type User @key(fields: "uuid") @key(fields: "profile") {
          id: ID!
          profile: Profile
        }

        type Profile {
          bio: String
        }
        "#,
        "accounts",
    );

    let [NormalizationError::InvalidKeyFieldSets { type_name, messages }] = outcome.diagnostics().errors() else {
        unreachable!("{:#?}", outcome.diagnostics().errors());
    };

    assert_eq!(type_name, "User");
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("\"User.uuid\" is not defined"));
    assert!(messages[1].contains("must define a selection set"));
}

#[test]
fn unimplemented_interface_is_a_warning() {
    let sdl = r#"
        type Query {
          node: Node
        }

        interface Node {
          id: ID!
        }
    "#;

    let outcome = normalize(sdl, "nodes");
    assert!(outcome.result().is_some());
    assert!(matches!(
        outcome.diagnostics().warnings(),
        [Warning::UnimplementedInterfaceOutputType { interface_name, .. }] if interface_name == "Node"
    ));

    let document = cynic_parser::parse_type_system_document(sdl).unwrap();
    let options = NormalizationOptions {
        warnings_are_fatal: true,
        ..NormalizationOptions::default()
    };
    let outcome = normalize_subgraph_with_options(&document, &options, &mut Graph::new());

    assert!(outcome.result().is_none());
    assert!(matches!(
        outcome.diagnostics().errors(),
        [NormalizationError::PromotedWarning(Warning::UnimplementedInterfaceOutputType { .. })]
    ));
}

#[test]
fn external_interface_fields_depend_on_version() {
    let version_one = normalize(
        r#"
        type Query {
          node: Node
        }

        interface Node {
          id: ID! @external
        }

        type User implements Node {
          id: ID!
        }
        "#,
        "nodes",
    );

    assert!(version_one.result().is_some());
    assert!(version_one
        .diagnostics()
        .warnings()
        .iter()
        .any(|warning| matches!(warning, Warning::ExternalInterfaceFields { type_name, .. } if type_name == "Node")));

    let version_two = normalize(
        r#"
        type Query {
          node: Node @shareable
        }

        interface Node {
          id: ID! @external
        }

        type User implements Node {
          id: ID!
        }
        "#,
        "nodes",
    );

    assert!(version_two.result().is_none());
    assert!(version_two
        .diagnostics()
        .errors()
        .iter()
        .any(|error| matches!(error, NormalizationError::ExternalInterfaceFields { type_name, .. } if type_name == "Node")));
}

#[test]
fn undefined_types_are_reported_once() {
    let outcome = normalize(
        r#"
        type Query {
          a: Missing
          b: [Missing!]
        }
        "#,
        "missing",
    );

    let [NormalizationError::UndefinedType { type_name }] = outcome.diagnostics().errors() else {
        unreachable!("{:#?}", outcome.diagnostics().errors());
    };

    assert_eq!(type_name, "Missing");
}

#[test]
fn syntax_errors() {
    let outcome = normalize_subgraph_from_str("type Query {");

    assert!(matches!(
        outcome.diagnostics().errors(),
        [NormalizationError::InvalidSyntax(_)]
    ));
}

#[test]
fn empty_definitions() {
    let outcome = normalize(
        r#"
        type Query {
          a: String
        }

        enum Empty

        input NoFields

        union Nothing

        extend scalar Orphan
        "#,
        "empty",
    );

    let errors = outcome.diagnostics().errors();

    assert!(errors
        .iter()
        .any(|error| matches!(error, NormalizationError::NoDefinedEnumValues { type_name } if type_name == "Empty")));
    assert!(errors.iter().any(
        |error| matches!(error, NormalizationError::NoInputValueDefinitions { type_name } if type_name == "NoFields")
    ));
    assert!(errors.iter().any(
        |error| matches!(error, NormalizationError::NoDefinedUnionMembers { union_name } if union_name == "Nothing")
    ));
    assert!(errors.iter().any(
        |error| matches!(error, NormalizationError::NoBaseScalarDefinition { type_name } if type_name == "Orphan")
    ));
}

#[test]
fn interface_type_level_authorization_reaches_implementations() {
    let result = normalize(
        r#"
        type Query {
          node: Node
        }

        interface Node @authenticated {
          id: ID!
        }

        type User implements Node {
          id: ID!
          name: String
        }
        "#,
        "accounts",
    )
    .into_result()
    .unwrap();

    let user = &result.authorization_data_by_parent_type_name["User"];
    assert!(!user.has_parent_level_authorization);
    assert!(user.field_authorization_data_by_field_name["id"].requirement.requires_authentication);
    assert!(!user.field_authorization_data_by_field_name.contains_key("name"));

    assert!(result.sdl.contains("type User implements Node {\n  id: ID! @authenticated\n  name: String\n}"));
}

#[test]
fn interface_field_authorization_stays_on_the_interface() {
    let result = normalize(
        r#"
        type Query {
          node: Node
        }

        interface Node {
          id: ID! @authenticated
        }

        type User implements Node {
          id: ID!
        }
        "#,
        "accounts",
    )
    .into_result()
    .unwrap();

    let node = &result.authorization_data_by_parent_type_name["Node"];
    assert!(node.field_authorization_data_by_field_name["id"].requirement.requires_authentication);

    assert!(!result.authorization_data_by_parent_type_name.contains_key("User"));
    assert!(result.sdl.contains("type User implements Node {\n  id: ID!\n}"));
}

#[test]
fn fields_inherit_enum_authorization_declared_later() {
    let result = normalize(
        r#"
        type Query {
          status: Status
        }

        enum Status @requiresScopes(scopes: [["read:status"]]) {
          ACTIVE
          INACTIVE
        }
        "#,
        "accounts",
    )
    .into_result()
    .unwrap();

    let status = &result.authorization_data_by_parent_type_name["Query"].field_authorization_data_by_field_name["status"];
    assert!(!status.requirement.requires_authentication);
    assert_eq!(status.requirement.required_scopes.len(), 1);
    assert!(status.requirement.required_scopes[0].contains("read:status"));
}

#[test]
fn inherited_scopes_over_the_limit() {
    let outcome = normalize(
        r#"
        type Query {
          product: Product
        }

        type Product @requiresScopes(scopes: [["a"], ["b"], ["c"], ["d"]]) {
          price: Money
        }

        scalar Money @requiresScopes(scopes: [["e"], ["f"], ["g"], ["h"], ["i"]])
        "#,
        "products",
    );

    let [NormalizationError::OrScopesLimit {
        max_or_scopes,
        host_paths,
    }] = outcome.diagnostics().errors()
    else {
        unreachable!("{:#?}", outcome.diagnostics().errors());
    };

    assert_eq!(*max_or_scopes, 16);
    assert_eq!(host_paths, &["Product.price"]);
}

#[test]
fn redeclared_fields_inherit_leaf_authorization_once() {
    let result = normalize(
        r#"
        type Query {
          status: Status
        }

        extend type Query {
          status: Status
        }

        enum Status @requiresScopes(scopes: [["a"], ["b"], ["c"], ["d"], ["e"]]) {
          ACTIVE
        }
        "#,
        "accounts",
    )
    .into_result()
    .unwrap();

    let status = &result.authorization_data_by_parent_type_name["Query"].field_authorization_data_by_field_name["status"];
    assert_eq!(status.requirement.required_scopes.len(), 5);
}

#[test]
fn kind_clash_adds_no_leaf_node() {
    init_tracing();
    let document = cynic_parser::parse_type_system_document(
        r#"
        type Query {
          foo: Foo
        }

        type Foo {
          a: String
        }

        scalar Foo

        enum Status {
          ACTIVE
        }
        "#,
    )
    .unwrap();

    let mut graph = Graph::new();
    let outcome = normalize_subgraph(&document, Some("products"), &mut graph);

    assert!(matches!(
        outcome.diagnostics().errors(),
        [NormalizationError::MultipleNamedTypeDefinition { .. }]
    ));
    assert!(graph.node("products", "Foo").is_none());
    assert!(graph.node("products", "Status").is_some_and(|node| node.is_leaf));
}

#[test]
fn provided_and_required_external_fields_are_conditional() {
    let result = normalize(
        r#"
        type Query {
          topProducts: [Product!]! @provides(fields: "name")
        }

        type Product @key(fields: "id") {
          id: ID!
          name: String @external
          weight: Int @external
          shippingEstimate: Int @requires(fields: "weight")
        }
        "#,
        "inventory",
    )
    .into_result()
    .unwrap();

    let conditional = &result.conditional_field_data_by_coordinates;
    assert_eq!(conditional.keys().collect::<Vec<_>>(), ["Product.name", "Product.weight"]);

    pretty_assertions::assert_eq!(
        conditional["Product.name"].provided_by,
        [FieldSetCondition {
            field_coordinates_path: vec!["Query.topProducts".to_owned(), "Product.name".to_owned()],
            field_path: vec!["topProducts".to_owned(), "name".to_owned()],
        }]
    );
    assert!(conditional["Product.name"].required_by.is_empty());

    pretty_assertions::assert_eq!(
        conditional["Product.weight"].required_by,
        [FieldSetCondition {
            field_coordinates_path: vec!["Product.weight".to_owned()],
            field_path: vec!["weight".to_owned()],
        }]
    );
}

#[test]
fn executable_directive_definitions_are_persisted() {
    let result = normalize(
        r#"
        directive @cached(ttl: Int = 60) on FIELD | QUERY | FIELD_DEFINITION
        directive @audit on OBJECT

        type Query @audit {
          a: String @cached
        }
        "#,
        "products",
    )
    .into_result()
    .unwrap();

    let persisted = &result.persisted_directive_definition_data_by_directive_name;
    assert_eq!(persisted.keys().collect::<Vec<_>>(), ["cached"]);

    let cached = &persisted["cached"];
    assert_eq!(
        cached.executable_locations,
        DirectiveLocations::FIELD | DirectiveLocations::QUERY
    );
    assert!(!cached.is_repeatable);
    assert_eq!(cached.arguments.keys().collect::<Vec<_>>(), ["ttl"]);
    assert_eq!(cached.subgraph_names.iter().collect::<Vec<_>>(), ["products"]);
}

#[test]
fn persisted_directive_with_duplicate_arguments() {
    let outcome = normalize(
        r#"
        directive @cached(ttl: Int, ttl: Int) on FIELD

        type Query {
          a: String
        }
        "#,
        "products",
    );

    let [NormalizationError::DuplicateDirectiveArgumentDefinitions {
        directive_name,
        argument_names,
    }] = outcome.diagnostics().errors()
    else {
        unreachable!("{:#?}", outcome.diagnostics().errors());
    };

    assert_eq!(directive_name, "cached");
    assert_eq!(argument_names, &["ttl"]);
}
