//! Router-facing records describing what one subgraph can resolve.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// Summary of one object or interface for the router.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationData {
    /// Fields this subgraph resolves itself.
    pub field_names: IndexSet<String>,
    #[serde(skip_serializing_if = "IndexSet::is_empty")]
    pub external_field_names: IndexSet<String>,
    pub is_root_node: bool,
    pub type_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<RequiredFieldsConfiguration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<RequiredFieldsConfiguration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<RequiredFieldsConfiguration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_interface_concrete_type_names: Option<IndexSet<String>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_interface_object: bool,
}

impl ConfigurationData {
    pub(crate) fn new(type_name: &str, is_root_node: bool, field_names: IndexSet<String>) -> Self {
        ConfigurationData {
            field_names,
            external_field_names: IndexSet::new(),
            is_root_node,
            type_name: type_name.to_owned(),
            keys: Vec::new(),
            provides: Vec::new(),
            requires: Vec::new(),
            events: Vec::new(),
            entity_interface_concrete_type_names: None,
            is_interface_object: false,
        }
    }
}

/// A field set the router must fetch: an entity key, or the argument of `@provides` / `@requires`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredFieldsConfiguration {
    pub type_name: String,
    /// Empty for entity keys.
    pub field_name: String,
    pub selection_set: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_entity_resolver: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Kafka,
    Nats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Publish,
    Request,
    Subscribe,
}

/// One root field bound to a Kafka or NATS operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventConfiguration {
    pub field_name: String,
    pub provider_id: String,
    pub provider_type: ProviderType,
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Kafka topics or NATS subjects.
    pub subjects: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_configuration: Option<StreamConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamConfiguration {
    pub consumer_name: String,
    pub stream_name: String,
}

/// The key field sets of an entity, across every subgraph that defines it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityData {
    pub type_name: String,
    pub key_field_sets: IndexSet<String>,
    pub subgraph_names: IndexSet<String>,
}

/// Merge `incoming` into the entry for the same entity.
pub(crate) fn upsert_entity_data(entity_data_by_type_name: &mut IndexMap<String, EntityData>, incoming: &EntityData) {
    match entity_data_by_type_name.get_mut(&incoming.type_name) {
        Some(existing) => {
            existing.key_field_sets.extend(incoming.key_field_sets.iter().cloned());
            existing.subgraph_names.extend(incoming.subgraph_names.iter().cloned());
        }
        None => {
            entity_data_by_type_name.insert(incoming.type_name.clone(), incoming.clone());
        }
    }
}

/// A field of an entity interface, reduced to what the router needs to plan `@interfaceObject` fetches.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleFieldData {
    pub name: String,
    pub named_type_name: String,
}

/// An interface carrying `@key`, or an object standing in for one through `@interfaceObject`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityInterfaceSubgraphData {
    pub type_name: String,
    pub subgraph_name: String,
    pub concrete_type_names: IndexSet<String>,
    pub field_datas: Vec<SimpleFieldData>,
    pub interface_field_names: IndexSet<String>,
    pub interface_object_field_names: IndexSet<String>,
    pub is_interface_object: bool,
    pub resolvable: bool,
}

/// How an `@external` field becomes resolvable: through the `@provides` of another field, or because
/// a `@requires` field set needs it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalFieldData {
    pub provided_by: Vec<FieldSetCondition>,
    pub required_by: Vec<FieldSetCondition>,
}

/// The selection leading to a conditional field. Both paths end with the field itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSetCondition {
    /// `Type.field` coordinates of every step.
    pub field_coordinates_path: Vec<String>,
    /// Field names of every step.
    pub field_path: Vec<String>,
}

/// Raw `@key` field sets of one type, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct KeyFieldSetData {
    pub(crate) is_resolvable_by_raw_field_set: IndexMap<String, bool>,
}

/// Raw `@provides` and `@requires` field sets declared on the fields of one type.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FieldSetData {
    pub(crate) provides: IndexMap<String, String>,
    pub(crate) requires: IndexMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_data_merges_key_sets_and_subgraphs() {
        let mut entity_data_by_type_name = IndexMap::new();

        upsert_entity_data(
            &mut entity_data_by_type_name,
            &EntityData {
                type_name: "User".to_owned(),
                key_field_sets: ["id".to_owned()].into_iter().collect(),
                subgraph_names: ["accounts".to_owned()].into_iter().collect(),
            },
        );
        upsert_entity_data(
            &mut entity_data_by_type_name,
            &EntityData {
                type_name: "User".to_owned(),
                key_field_sets: ["id".to_owned(), "email".to_owned()].into_iter().collect(),
                subgraph_names: ["reviews".to_owned()].into_iter().collect(),
            },
        );

        let user = &entity_data_by_type_name["User"];
        assert_eq!(user.key_field_sets.iter().collect::<Vec<_>>(), ["id", "email"]);
        assert_eq!(user.subgraph_names.iter().collect::<Vec<_>>(), ["accounts", "reviews"]);
    }

    #[test]
    fn optional_configuration_is_omitted_from_json() {
        let configuration = ConfigurationData::new("Query", true, ["me".to_owned()].into_iter().collect());

        assert_eq!(
            serde_json::to_string(&configuration).ok().as_deref(),
            Some(r#"{"fieldNames":["me"],"isRootNode":true,"typeName":"Query"}"#)
        );
    }
}
