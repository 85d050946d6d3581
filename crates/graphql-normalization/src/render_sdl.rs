use std::fmt::{self, Display, Write as _};

use crate::{
    ast::*,
    directive_definitions::{ArgumentDefinition, DirectiveDefinition},
    value::write_quoted,
};

const INDENT: &str = "  ";

impl Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, definition) in self.definitions.iter().enumerate() {
            if idx > 0 {
                f.write_str("\n\n")?;
            }

            match definition {
                Definition::Directive(directive) => write_directive_definition(directive, f)?,
                Definition::Schema(schema) => write_schema_definition(schema, f)?,
                Definition::Type(ty) => write_type_definition(ty, f)?,
            }
        }

        Ok(())
    }
}

fn write_directive_definition(definition: &DirectiveDefinition, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write_description(definition.description.as_deref(), "", f)?;
    write!(f, "directive @{}", definition.name)?;

    if !definition.arguments.is_empty() {
        f.write_str("(")?;
        for (idx, argument) in definition.arguments.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write_argument_definition(argument, f)?;
        }
        f.write_str(")")?;
    }

    if definition.is_repeatable {
        f.write_str(" repeatable")?;
    }

    write!(f, " on {}", definition.locations)
}

fn write_argument_definition(argument: &ArgumentDefinition, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", argument.name, argument.r#type)?;
    if let Some(default_value) = &argument.default_value {
        write!(f, " = {default_value}")?;
    }
    Ok(())
}

fn write_schema_definition(schema: &SchemaDefinition, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("schema")?;
    write_directives(&schema.directives, f)?;
    f.write_str(" {\n")?;

    for (operation_type, type_name) in &schema.operation_types {
        writeln!(f, "{INDENT}{operation_type}: {type_name}")?;
    }

    f.write_str("}")
}

fn write_type_definition(ty: &TypeDefinition, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write_description(ty.description.as_deref(), "", f)?;

    let keyword = match &ty.kind {
        TypeDefinitionKind::Scalar => "scalar",
        TypeDefinitionKind::Object { .. } => "type",
        TypeDefinitionKind::Interface { .. } => "interface",
        TypeDefinitionKind::Union { .. } => "union",
        TypeDefinitionKind::Enum { .. } => "enum",
        TypeDefinitionKind::InputObject { .. } => "input",
    };

    write!(f, "{keyword} {}", ty.name)?;

    match &ty.kind {
        TypeDefinitionKind::Scalar => write_directives(&ty.directives, f),
        TypeDefinitionKind::Object { implements, fields } | TypeDefinitionKind::Interface { implements, fields } => {
            if !implements.is_empty() {
                write!(f, " implements {}", implements.join(" & "))?;
            }
            write_directives(&ty.directives, f)?;
            write_block(fields, f, write_field_definition)
        }
        TypeDefinitionKind::Union { members } => {
            write_directives(&ty.directives, f)?;
            if !members.is_empty() {
                write!(f, " = {}", members.join(" | "))?;
            }
            Ok(())
        }
        TypeDefinitionKind::Enum { values } => {
            write_directives(&ty.directives, f)?;
            write_block(values, f, |value, f| {
                write_description(value.description.as_deref(), INDENT, f)?;
                f.write_str(INDENT)?;
                f.write_str(&value.name)?;
                write_directives(&value.directives, f)
            })
        }
        TypeDefinitionKind::InputObject { fields } => {
            write_directives(&ty.directives, f)?;
            write_block(fields, f, |field, f| {
                write_description(field.description.as_deref(), INDENT, f)?;
                f.write_str(INDENT)?;
                write_input_value_definition(field, f)
            })
        }
    }
}

fn write_block<T>(
    items: &[T],
    f: &mut fmt::Formatter<'_>,
    write_item: impl Fn(&T, &mut fmt::Formatter<'_>) -> fmt::Result,
) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }

    f.write_str(" {\n")?;
    for item in items {
        write_item(item, f)?;
        f.write_char('\n')?;
    }
    f.write_str("}")
}

fn write_field_definition(field: &FieldDefinition, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write_description(field.description.as_deref(), INDENT, f)?;
    f.write_str(INDENT)?;
    f.write_str(&field.name)?;

    if !field.arguments.is_empty() {
        f.write_str("(")?;
        for (idx, argument) in field.arguments.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write_input_value_definition(argument, f)?;
        }
        f.write_str(")")?;
    }

    write!(f, ": {}", field.r#type)?;
    write_directives(&field.directives, f)
}

fn write_input_value_definition(input_value: &InputValueDefinition, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", input_value.name, input_value.r#type)?;
    if let Some(default_value) = &input_value.default_value {
        write!(f, " = {default_value}")?;
    }
    write_directives(&input_value.directives, f)
}

fn write_directives(directives: &[Directive], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for directive in directives {
        f.write_str(" ")?;
        Display::fmt(directive, f)?;
    }
    Ok(())
}

impl Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;

        if self.arguments.is_empty() {
            return Ok(());
        }

        f.write_str("(")?;
        for (idx, (name, value)) in self.arguments.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str(")")
    }
}

fn write_description(description: Option<&str>, indent: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let Some(description) = description else {
        return Ok(());
    };

    if !description.contains('\n') && !description.contains('"') {
        f.write_str(indent)?;
        write_quoted(description, f)?;
        return f.write_char('\n');
    }

    writeln!(f, "{indent}\"\"\"")?;
    for line in description.lines() {
        writeln!(f, "{indent}{}", line.replace("\"\"\"", "\\\"\"\""))?;
    }
    writeln!(f, "{indent}\"\"\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{type_node::TypeNode, value::Value};

    fn named(name: &str) -> TypeNode {
        TypeNode::Named(name.to_owned())
    }

    #[test]
    fn renders_every_type_kind() {
        let document = Document {
            definitions: vec![
                Definition::Schema(SchemaDefinition {
                    directives: Vec::new(),
                    operation_types: vec![(OperationType::Query, "RootQuery".to_owned())],
                }),
                Definition::Type(TypeDefinition {
                    name: "RootQuery".to_owned(),
                    description: Some("Entry point".to_owned()),
                    directives: Vec::new(),
                    kind: TypeDefinitionKind::Object {
                        implements: vec!["Node".to_owned()],
                        fields: vec![FieldDefinition {
                            name: "user".to_owned(),
                            description: None,
                            arguments: vec![InputValueDefinition {
                                name: "id".to_owned(),
                                description: None,
                                r#type: named("ID").non_null(),
                                default_value: None,
                                directives: Vec::new(),
                            }],
                            r#type: named("User"),
                            directives: vec![Directive::new("authenticated")],
                        }],
                    },
                }),
                Definition::Type(TypeDefinition {
                    name: "Result".to_owned(),
                    description: None,
                    directives: Vec::new(),
                    kind: TypeDefinitionKind::Union {
                        members: vec!["User".to_owned(), "Error".to_owned()],
                    },
                }),
                Definition::Type(TypeDefinition {
                    name: "Color".to_owned(),
                    description: None,
                    directives: Vec::new(),
                    kind: TypeDefinitionKind::Enum {
                        values: vec![EnumValueDefinition {
                            name: "RED".to_owned(),
                            description: None,
                            directives: vec![Directive::new("deprecated").with_argument("reason", Value::from("old"))],
                        }],
                    },
                }),
            ],
        };

        let expected = r#"schema {
  query: RootQuery
}

"Entry point"
type RootQuery implements Node {
  user(id: ID!): User @authenticated
}

union Result = User | Error

enum Color {
  RED @deprecated(reason: "old")
}"#;

        pretty_assertions::assert_eq!(document.to_string(), expected);
    }
}
