use std::fmt;

use cynic_parser::{common::WrappingType, type_system as ast};
use indexmap::{IndexMap, IndexSet};

/// A field, argument or input value type reference, e.g. `[String!]!`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeNode {
    Named(String),
    List(Box<TypeNode>),
    NonNull(Box<TypeNode>),
}

impl TypeNode {
    pub(crate) fn from_ast(ty: ast::Type<'_>) -> Self {
        // wrappers() yields the outermost wrapper first.
        let wrappers: Vec<_> = ty.wrappers().collect();

        wrappers
            .into_iter()
            .rev()
            .fold(TypeNode::Named(ty.name().to_owned()), |inner, wrapper| match wrapper {
                WrappingType::NonNull => TypeNode::NonNull(Box::new(inner)),
                WrappingType::List => TypeNode::List(Box::new(inner)),
            })
    }

    pub fn named_type_name(&self) -> &str {
        match self {
            TypeNode::Named(name) => name,
            TypeNode::List(inner) | TypeNode::NonNull(inner) => inner.named_type_name(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeNode::NonNull(_))
    }

    pub(crate) fn non_null(self) -> Self {
        match self {
            TypeNode::NonNull(_) => self,
            other => TypeNode::NonNull(Box::new(other)),
        }
    }
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeNode::Named(name) => f.write_str(name),
            TypeNode::List(inner) => write!(f, "[{inner}]"),
            TypeNode::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

/// Whether `implementation` is a valid covariant narrowing of the interface field type `original`.
///
/// Nullability may only be tightened, list depth must match, and a named type may be replaced by
/// one of its concrete types.
pub(crate) fn is_valid_implementation_type(
    original: &TypeNode,
    implementation: &TypeNode,
    concrete_type_names_by_abstract_type_name: &IndexMap<String, IndexSet<String>>,
) -> bool {
    match (original, implementation) {
        (TypeNode::NonNull(original), TypeNode::NonNull(implementation)) => {
            is_valid_implementation_type(original, implementation, concrete_type_names_by_abstract_type_name)
        }
        (TypeNode::NonNull(_), _) => false,
        (_, TypeNode::NonNull(implementation)) => {
            is_valid_implementation_type(original, implementation, concrete_type_names_by_abstract_type_name)
        }
        (TypeNode::Named(original), TypeNode::Named(implementation)) => {
            original == implementation
                || concrete_type_names_by_abstract_type_name
                    .get(original)
                    .is_some_and(|concrete_type_names| concrete_type_names.contains(implementation))
        }
        (TypeNode::List(original), TypeNode::List(implementation)) => {
            is_valid_implementation_type(original, implementation, concrete_type_names_by_abstract_type_name)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> TypeNode {
        TypeNode::Named(name.to_owned())
    }

    fn parse_field_type(sdl_type: &str) -> TypeNode {
        let sdl = format!("type T {{ f: {sdl_type} }}");
        let document = cynic_parser::parse_type_system_document(&sdl).unwrap();
        let cynic_parser::type_system::Definition::Type(ast::TypeDefinition::Object(object)) =
            document.definitions().next().unwrap()
        else {
            unreachable!()
        };
        let field = object.fields().next().unwrap();
        TypeNode::from_ast(field.ty())
    }

    #[test]
    fn wrappers_are_rebuilt_outermost_last() {
        let ty = parse_field_type("[String!]!");
        assert_eq!(
            ty,
            TypeNode::NonNull(Box::new(TypeNode::List(Box::new(TypeNode::NonNull(Box::new(named(
                "String"
            )))))))
        );
        assert_eq!(ty.to_string(), "[String!]!");
        assert_eq!(ty.named_type_name(), "String");
    }

    #[test]
    fn implementation_types_may_tighten_nullability() {
        let concrete = IndexMap::from([("Animal".to_owned(), IndexSet::from(["Dog".to_owned()]))]);

        assert!(is_valid_implementation_type(
            &named("String"),
            &named("String").non_null(),
            &concrete
        ));
        assert!(!is_valid_implementation_type(
            &named("String").non_null(),
            &named("String"),
            &concrete
        ));
        assert!(is_valid_implementation_type(&named("Animal"), &named("Dog"), &concrete));
        assert!(!is_valid_implementation_type(&named("Dog"), &named("Animal"), &concrete));
        assert!(!is_valid_implementation_type(
            &TypeNode::List(Box::new(named("String"))),
            &named("String"),
            &concrete
        ));
    }
}
