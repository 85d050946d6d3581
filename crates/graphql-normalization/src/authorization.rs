//! Static authorization requirements declared through `@authenticated` and `@requiresScopes`.
//!
//! A requirement is a flag plus a list of scope sets. Each set must be satisfied entirely (AND) and
//! any one set in the list suffices (OR). Combining two requirements with AND multiplies out the
//! sets, which is why the number of OR alternatives is capped.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::{
    ast::Directive,
    constants::*,
    normalize::Normalizer,
    registry::{DirectivesByName, ParentDefinitionData},
    value::Value,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRequirement {
    pub requires_authentication: bool,
    pub required_scopes: Vec<IndexSet<String>>,
}

impl AuthorizationRequirement {
    pub fn is_empty(&self) -> bool {
        !self.requires_authentication && self.required_scopes.is_empty()
    }

    /// AND `source` into `self`. Returns false when the combined requirement would exceed
    /// `max_or_scopes` alternatives, in which case the scopes of `self` are left untouched.
    pub(crate) fn merge_by_and(&mut self, source: &AuthorizationRequirement, max_or_scopes: usize) -> bool {
        self.requires_authentication |= source.requires_authentication;

        if source.required_scopes.is_empty() {
            return true;
        }

        if self.required_scopes.is_empty() {
            self.required_scopes = source.required_scopes.clone();
            return true;
        }

        if source.required_scopes.len() * self.required_scopes.len() > max_or_scopes {
            return false;
        }

        let mut merged = Vec::with_capacity(source.required_scopes.len() * self.required_scopes.len());
        for source_and_scopes in &source.required_scopes {
            for target_and_scopes in &self.required_scopes {
                let mut and_scopes = target_and_scopes.clone();
                and_scopes.extend(source_and_scopes.iter().cloned());
                merged.push(and_scopes);
            }
        }

        self.required_scopes = merged;
        true
    }

    /// The directives printed on the normalized document for this requirement.
    pub(crate) fn to_directives(&self) -> Vec<Directive> {
        let mut directives = Vec::new();

        if self.requires_authentication {
            directives.push(Directive::new(AUTHENTICATED));
        }

        if !self.required_scopes.is_empty() {
            let scopes = self
                .required_scopes
                .iter()
                .map(|and_scopes| Value::List(and_scopes.iter().map(|scope| Value::from(scope.as_str())).collect()))
                .collect();
            directives.push(Directive::new(REQUIRES_SCOPES).with_argument(SCOPES, Value::List(scopes)));
        }

        directives
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationData {
    pub type_name: String,
    pub has_parent_level_authorization: bool,
    #[serde(flatten)]
    pub requirement: AuthorizationRequirement,
    pub field_authorization_data_by_field_name: IndexMap<String, FieldAuthorizationData>,
}

impl AuthorizationData {
    pub(crate) fn new(type_name: &str) -> Self {
        AuthorizationData {
            type_name: type_name.to_owned(),
            has_parent_level_authorization: false,
            requirement: AuthorizationRequirement::default(),
            field_authorization_data_by_field_name: IndexMap::new(),
        }
    }

    fn field_mut(&mut self, field_name: &str) -> &mut FieldAuthorizationData {
        self.field_authorization_data_by_field_name
            .entry(field_name.to_owned())
            .or_insert_with(|| FieldAuthorizationData::new(field_name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAuthorizationData {
    pub field_name: String,
    #[serde(flatten)]
    pub requirement: AuthorizationRequirement,
}

impl FieldAuthorizationData {
    pub(crate) fn new(field_name: &str) -> Self {
        FieldAuthorizationData {
            field_name: field_name.to_owned(),
            requirement: AuthorizationRequirement::default(),
        }
    }
}

/// Insert `incoming` or AND it into the existing data for the same field.
pub(crate) fn upsert_field_authorization_data(
    field_authorization_data_by_field_name: &mut IndexMap<String, FieldAuthorizationData>,
    incoming: &FieldAuthorizationData,
    max_or_scopes: usize,
) -> bool {
    match field_authorization_data_by_field_name.get_mut(&incoming.field_name) {
        Some(existing) => existing.requirement.merge_by_and(&incoming.requirement, max_or_scopes),
        None => {
            field_authorization_data_by_field_name.insert(incoming.field_name.clone(), incoming.clone());
            true
        }
    }
}

/// Merge the authorization data of one subgraph into the federation-wide map. Paths whose merged
/// requirement would exceed the OR-scope limit are collected in `invalid_or_scopes_host_paths`.
pub(crate) fn upsert_authorization_data(
    authorization_data_by_parent_type_name: &mut IndexMap<String, AuthorizationData>,
    incoming: &AuthorizationData,
    invalid_or_scopes_host_paths: &mut IndexSet<String>,
    max_or_scopes: usize,
) {
    let Some(existing) = authorization_data_by_parent_type_name.get_mut(&incoming.type_name) else {
        authorization_data_by_parent_type_name.insert(incoming.type_name.clone(), incoming.clone());
        return;
    };

    existing.has_parent_level_authorization |= incoming.has_parent_level_authorization;

    if !existing.requirement.merge_by_and(&incoming.requirement, max_or_scopes) {
        invalid_or_scopes_host_paths.insert(incoming.type_name.clone());
    }

    for field_authorization_data in incoming.field_authorization_data_by_field_name.values() {
        if !upsert_field_authorization_data(
            &mut existing.field_authorization_data_by_field_name,
            field_authorization_data,
            max_or_scopes,
        ) {
            invalid_or_scopes_host_paths.insert(format!("{}.{}", incoming.type_name, field_authorization_data.field_name));
        }
    }
}

/// Reads `[[String!]!]!` scopes. Empty AND sets are dropped.
pub(crate) fn or_scopes_from_value(value: &Value) -> Option<Vec<IndexSet<String>>> {
    let mut or_scopes = Vec::new();

    for and_scopes in value.as_list()? {
        let and_scopes = and_scopes
            .as_list()?
            .iter()
            .map(|scope| scope.as_str().map(str::to_owned))
            .collect::<Option<IndexSet<_>>>()?;

        if !and_scopes.is_empty() {
            or_scopes.push(and_scopes);
        }
    }

    Some(or_scopes)
}

/// Where authorization directives were found.
#[derive(Debug, Clone, Copy)]
pub(crate) enum AuthorizationHost<'a> {
    Field {
        original_parent_type_name: &'a str,
        parent_type_name: &'a str,
        field_name: &'a str,
    },
    /// An enum or a scalar.
    Leaf { type_name: &'a str },
}

impl AuthorizationHost<'_> {
    pub(crate) fn host_path(&self) -> String {
        match self {
            AuthorizationHost::Field {
                original_parent_type_name,
                field_name,
                ..
            } => format!("{original_parent_type_name}.{field_name}"),
            AuthorizationHost::Leaf { type_name } => (*type_name).to_owned(),
        }
    }
}

/// A field whose named type may carry its own authorization, resolved during consolidation.
#[derive(Debug, Clone)]
pub(crate) struct HeirField {
    pub(crate) parent_type_name: String,
    pub(crate) original_parent_type_name: String,
    pub(crate) field_name: String,
    pub(crate) named_type_name: String,
}

enum TypeLevelAuthorization {
    None,
    Requirement(AuthorizationRequirement),
    ScopesLimitExceeded,
}

fn type_level_authorization(directives: &DirectivesByName, max_or_scopes: usize) -> TypeLevelAuthorization {
    let authenticated = directives.get(AUTHENTICATED).map(Vec::len).unwrap_or_default();
    let requires_scopes = directives.get(REQUIRES_SCOPES).map(Vec::as_slice).unwrap_or_default();

    // Repeated applications discard the type-level authorization altogether.
    if authenticated > 1 || requires_scopes.len() > 1 || (authenticated == 0 && requires_scopes.is_empty()) {
        return TypeLevelAuthorization::None;
    }

    let mut requirement = AuthorizationRequirement {
        requires_authentication: authenticated == 1,
        required_scopes: Vec::new(),
    };

    if let Some(scopes) = requires_scopes.first().and_then(|directive| directive.argument(SCOPES)) {
        if scopes.as_list().is_some_and(|or_scopes| or_scopes.len() > max_or_scopes) {
            return TypeLevelAuthorization::ScopesLimitExceeded;
        }

        let Some(or_scopes) = or_scopes_from_value(scopes) else {
            return TypeLevelAuthorization::None;
        };

        requirement.required_scopes = or_scopes;
    }

    TypeLevelAuthorization::Requirement(requirement)
}

impl Normalizer<'_> {
    /// Record the `@authenticated` and `@requiresScopes` applications of a single field, enum or scalar.
    pub(crate) fn extract_authorization(&mut self, authorization_directives: &[Directive], host: AuthorizationHost<'_>) {
        if authorization_directives.is_empty() {
            return;
        }

        let authenticated = authorization_directives
            .iter()
            .filter(|directive| directive.name == AUTHENTICATED)
            .count();
        let requires_scopes: Vec<_> = authorization_directives
            .iter()
            .filter(|directive| directive.name == REQUIRES_SCOPES)
            .collect();

        // Neither directive is repeatable, a repeated application discards the authorization.
        if authenticated > 1 || requires_scopes.len() > 1 {
            return;
        }

        let mut requirement = AuthorizationRequirement {
            requires_authentication: authenticated == 1,
            required_scopes: Vec::new(),
        };

        if let Some(scopes) = requires_scopes.first().and_then(|directive| directive.argument(SCOPES)) {
            if scopes
                .as_list()
                .is_some_and(|or_scopes| or_scopes.len() > self.max_or_scopes)
            {
                self.invalid_or_scopes_host_paths.insert(host.host_path());
                return;
            }

            let Some(or_scopes) = or_scopes_from_value(scopes) else {
                return;
            };

            requirement.required_scopes = or_scopes;
        }

        match host {
            AuthorizationHost::Field {
                parent_type_name,
                field_name,
                ..
            } => {
                let field_authorization_data = self
                    .authorization_data_by_parent_type_name
                    .entry(parent_type_name.to_owned())
                    .or_insert_with(|| AuthorizationData::new(parent_type_name))
                    .field_mut(field_name);

                field_authorization_data.requirement.requires_authentication |= requirement.requires_authentication;
                field_authorization_data
                    .requirement
                    .required_scopes
                    .extend(requirement.required_scopes);
            }
            AuthorizationHost::Leaf { type_name } => {
                self.leaf_type_names_with_authorization.insert(type_name.to_owned());

                let authorization_data = self
                    .authorization_data_by_parent_type_name
                    .entry(type_name.to_owned())
                    .or_insert_with(|| AuthorizationData::new(type_name));

                authorization_data.requirement.requires_authentication |= requirement.requires_authentication;
                authorization_data
                    .requirement
                    .required_scopes
                    .extend(requirement.required_scopes);
            }
        }
    }

    /// Propagate type-level, interface and leaf authorization onto the fields that inherit it.
    pub(crate) fn consolidate_authorization(&mut self) {
        let max_or_scopes = self.max_or_scopes;
        let mut interface_type_names_with_authorization = IndexSet::new();

        // Type-level authorization of objects and interfaces, ANDed into each of their fields.
        for data in self.parent_definition_data_by_type_name.values() {
            let Some(composite) = data.as_composite() else {
                continue;
            };

            let requirement = match type_level_authorization(&composite.directives, max_or_scopes) {
                TypeLevelAuthorization::None => continue,
                TypeLevelAuthorization::ScopesLimitExceeded => {
                    self.invalid_or_scopes_host_paths.insert(composite.name.clone());
                    continue;
                }
                TypeLevelAuthorization::Requirement(requirement) => requirement,
            };

            if matches!(data, ParentDefinitionData::Interface(_)) {
                interface_type_names_with_authorization.insert(composite.name.clone());
            }

            let authorization_data = self
                .authorization_data_by_parent_type_name
                .entry(composite.renamed_type_name.clone())
                .or_insert_with(|| AuthorizationData::new(&composite.renamed_type_name));

            authorization_data.has_parent_level_authorization = true;
            authorization_data.requirement = requirement.clone();

            for field_name in composite.fields.keys() {
                if !authorization_data
                    .field_mut(field_name)
                    .requirement
                    .merge_by_and(&requirement, max_or_scopes)
                {
                    self.invalid_or_scopes_host_paths
                        .insert(format!("{}.{field_name}", composite.name));
                }
            }
        }

        // Field requirements of an interface with type-level authorization apply to every implementation.
        for interface_type_name in &interface_type_names_with_authorization {
            let Some(field_authorization_datas) = self
                .authorization_data_by_parent_type_name
                .get(interface_type_name)
                .map(|data| {
                    data.field_authorization_data_by_field_name
                        .values()
                        .cloned()
                        .collect::<Vec<_>>()
                })
            else {
                continue;
            };

            let Some(concrete_type_names) = self.concrete_type_names_by_abstract_type_name.get(interface_type_name)
            else {
                continue;
            };

            for concrete_type_name in concrete_type_names {
                let concrete_authorization_data = self
                    .authorization_data_by_parent_type_name
                    .entry(concrete_type_name.clone())
                    .or_insert_with(|| AuthorizationData::new(concrete_type_name));

                for field_authorization_data in &field_authorization_datas {
                    if !upsert_field_authorization_data(
                        &mut concrete_authorization_data.field_authorization_data_by_field_name,
                        field_authorization_data,
                        max_or_scopes,
                    ) {
                        self.invalid_or_scopes_host_paths
                            .insert(format!("{concrete_type_name}.{}", field_authorization_data.field_name));
                    }
                }
            }
        }

        // Fields returning an enum or scalar that requires authorization inherit that requirement.
        for heir in std::mem::take(&mut self.heir_fields) {
            if !self.leaf_type_names_with_authorization.contains(&heir.named_type_name) {
                continue;
            }

            let Some(leaf_requirement) = self
                .authorization_data_by_parent_type_name
                .get(&heir.named_type_name)
                .map(|data| data.requirement.clone())
            else {
                continue;
            };

            let field_authorization_data = self
                .authorization_data_by_parent_type_name
                .entry(heir.parent_type_name.clone())
                .or_insert_with(|| AuthorizationData::new(&heir.parent_type_name))
                .field_mut(&heir.field_name);

            if !field_authorization_data
                .requirement
                .merge_by_and(&leaf_requirement, max_or_scopes)
            {
                self.invalid_or_scopes_host_paths
                    .insert(format!("{}.{}", heir.original_parent_type_name, heir.field_name));
            }
        }

        if !self.invalid_or_scopes_host_paths.is_empty() {
            self.diagnostics.push_error(crate::NormalizationError::OrScopesLimit {
                max_or_scopes,
                host_paths: self.invalid_or_scopes_host_paths.iter().cloned().collect(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scopes(sets: &[&[&str]]) -> Vec<IndexSet<String>> {
        sets.iter()
            .map(|set| set.iter().map(|scope| (*scope).to_owned()).collect())
            .collect()
    }

    #[test]
    fn and_merge_multiplies_out_alternatives() {
        let mut target = AuthorizationRequirement {
            requires_authentication: false,
            required_scopes: scopes(&[&["read:a"], &["read:b"]]),
        };
        let source = AuthorizationRequirement {
            requires_authentication: true,
            required_scopes: scopes(&[&["write:c"]]),
        };

        assert!(target.merge_by_and(&source, 16));

        assert!(target.requires_authentication);
        assert_eq!(
            target.required_scopes,
            scopes(&[&["read:a", "write:c"], &["read:b", "write:c"]])
        );
    }

    #[test]
    fn and_merge_into_empty_target_copies_the_source() {
        let mut target = AuthorizationRequirement::default();
        let source = AuthorizationRequirement {
            requires_authentication: false,
            required_scopes: scopes(&[&["a", "b"]]),
        };

        assert!(target.merge_by_and(&source, 16));
        assert_eq!(target, source);
    }

    #[test]
    fn and_merge_refuses_to_exceed_the_limit() {
        let mut target = AuthorizationRequirement {
            requires_authentication: false,
            required_scopes: scopes(&[&["a"], &["b"], &["c"]]),
        };
        let source = AuthorizationRequirement {
            requires_authentication: false,
            required_scopes: scopes(&[&["d"], &["e"]]),
        };

        assert!(!target.merge_by_and(&source, 5));
        assert_eq!(target.required_scopes, scopes(&[&["a"], &["b"], &["c"]]));
    }

    #[test]
    fn scopes_are_read_from_nested_lists() {
        let value = Value::List(vec![
            Value::List(vec![Value::from("a"), Value::from("b")]),
            Value::List(vec![]),
            Value::List(vec![Value::from("c")]),
        ]);

        assert_eq!(or_scopes_from_value(&value), Some(scopes(&[&["a", "b"], &["c"]])));
        assert_eq!(or_scopes_from_value(&Value::List(vec![Value::Int(1)])), None);
    }

    #[test]
    fn batch_upsert_flags_paths_over_the_limit() {
        let mut authorization_data_by_parent_type_name = IndexMap::new();
        let mut invalid = IndexSet::new();

        let mut incoming = AuthorizationData::new("Product");
        incoming.field_mut("price").requirement.required_scopes = scopes(&[&["a"], &["b"]]);

        upsert_authorization_data(&mut authorization_data_by_parent_type_name, &incoming, &mut invalid, 3);
        assert!(invalid.is_empty());

        upsert_authorization_data(&mut authorization_data_by_parent_type_name, &incoming, &mut invalid, 3);
        assert_eq!(invalid.into_iter().collect::<Vec<_>>(), vec!["Product.price".to_owned()]);
    }
}
