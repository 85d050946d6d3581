//! Names of the directives, types and arguments that carry federation semantics.

/// Upper bound on the number of OR alternatives a `@requiresScopes` requirement may carry.
pub const MAX_OR_SCOPES: usize = 16;

pub(crate) const DEFAULT_EDFS_PROVIDER_ID: &str = "default";

/// Subgraph name used when normalizing a single unnamed subgraph.
pub(crate) const NOT_APPLICABLE: &str = "N/A";

pub(crate) const QUERY: &str = "Query";
pub(crate) const MUTATION: &str = "Mutation";
pub(crate) const SUBSCRIPTION: &str = "Subscription";

pub(crate) const SERVICE_FIELD: &str = "_service";
pub(crate) const ENTITIES_FIELD: &str = "_entities";
pub(crate) const SERVICE_TYPE: &str = "_Service";
pub(crate) const ENTITY_UNION: &str = "_Entity";
pub(crate) const ANY_SCALAR: &str = "_Any";

// Directives
pub(crate) const AUTHENTICATED: &str = "authenticated";
pub(crate) const COMPOSE_DIRECTIVE: &str = "composeDirective";
pub(crate) const DEPRECATED: &str = "deprecated";
pub(crate) const EXTENDS: &str = "extends";
pub(crate) const EXTERNAL: &str = "external";
pub(crate) const INACCESSIBLE: &str = "inaccessible";
pub(crate) const INTERFACE_OBJECT: &str = "interfaceObject";
pub(crate) const KEY: &str = "key";
pub(crate) const LINK: &str = "link";
pub(crate) const OVERRIDE: &str = "override";
pub(crate) const PROVIDES: &str = "provides";
pub(crate) const REQUIRES: &str = "requires";
pub(crate) const REQUIRES_SCOPES: &str = "requiresScopes";
pub(crate) const SHAREABLE: &str = "shareable";
pub(crate) const SPECIFIED_BY: &str = "specifiedBy";
pub(crate) const SUBSCRIPTION_FILTER: &str = "openfed__subscriptionFilter";
pub(crate) const TAG: &str = "tag";

pub(crate) const KAFKA_PUBLISH: &str = "edfs__kafkaPublish";
pub(crate) const KAFKA_SUBSCRIBE: &str = "edfs__kafkaSubscribe";
pub(crate) const NATS_PUBLISH: &str = "edfs__natsPublish";
pub(crate) const NATS_REQUEST: &str = "edfs__natsRequest";
pub(crate) const NATS_SUBSCRIBE: &str = "edfs__natsSubscribe";

// EDFS support types
pub(crate) const EDFS_PUBLISH_RESULT: &str = "edfs__PublishResult";
pub(crate) const EDFS_NATS_STREAM_CONFIGURATION: &str = "edfs__NatsStreamConfiguration";
pub(crate) const SUCCESS: &str = "success";

// Arguments
pub(crate) const CONSUMER_NAME: &str = "consumerName";
pub(crate) const FIELDS: &str = "fields";
pub(crate) const FROM: &str = "from";
pub(crate) const PROVIDER_ID: &str = "providerId";
pub(crate) const RESOLVABLE: &str = "resolvable";
pub(crate) const SCOPES: &str = "scopes";
pub(crate) const STREAM_CONFIGURATION: &str = "streamConfiguration";
pub(crate) const STREAM_NAME: &str = "streamName";
pub(crate) const SUBJECT: &str = "subject";
pub(crate) const SUBJECTS: &str = "subjects";
pub(crate) const TOPIC: &str = "topic";
pub(crate) const TOPICS: &str = "topics";

/// Directives whose presence marks a subgraph as a Federation V2 subgraph.
pub(crate) const VERSION_TWO_DIRECTIVES: [&str; 8] = [
    AUTHENTICATED,
    COMPOSE_DIRECTIVE,
    INACCESSIBLE,
    INTERFACE_OBJECT,
    OVERRIDE,
    REQUIRES_SCOPES,
    SHAREABLE,
    LINK,
];

pub(crate) const EVENT_DIRECTIVES: [&str; 5] = [
    KAFKA_PUBLISH,
    KAFKA_SUBSCRIBE,
    NATS_PUBLISH,
    NATS_REQUEST,
    NATS_SUBSCRIBE,
];

pub(crate) const BUILT_IN_SCALARS: [&str; 5] = ["Boolean", "Float", "ID", "Int", "String"];

/// Scalars that every subgraph may reference without defining them.
pub(crate) fn is_implicitly_defined_type(type_name: &str) -> bool {
    BUILT_IN_SCALARS.contains(&type_name)
        || matches!(
            type_name,
            ANY_SCALAR | "openfed__FieldSet" | "openfed__Scope" | "FieldSet" | "link__Import" | "link__Purpose"
        )
}
