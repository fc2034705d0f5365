use std::fmt;

use apollo_compiler::ast;
use serde::Deserialize;
use serde::Serialize;

/// The kind of a GraphQL operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    #[default]
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    /// The keyword of this kind, as used to tag results.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ast::OperationType> for OperationKind {
    fn from(value: ast::OperationType) -> Self {
        match value {
            ast::OperationType::Query => OperationKind::Query,
            ast::OperationType::Mutation => OperationKind::Mutation,
            ast::OperationType::Subscription => OperationKind::Subscription,
        }
    }
}

/// The kind and name of one operation definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationInfo {
    pub kind: OperationKind,
    pub name: Option<String>,
}

/// Lists the top-level operation definitions of a document, in document order.
pub fn classify(document: &ast::Document) -> Vec<OperationInfo> {
    document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            ast::Definition::OperationDefinition(operation) => Some(OperationInfo {
                kind: operation.operation_type.into(),
                name: operation.name.as_ref().map(|name| name.to_string()),
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(source: &str) -> ast::Document {
        ast::Document::parse(source, "test.graphql").unwrap()
    }

    #[test]
    fn classifies_operations_in_document_order() {
        let document = parse(
            r#"
            fragment UserFields on User { id }
            subscription OnCreated { userWasCreated { ...UserFields } }
            query { me { ...UserFields } }
            mutation Rename($name: String!) { rename(name: $name) { id } }
            "#,
        );
        assert_eq!(
            classify(&document),
            vec![
                OperationInfo {
                    kind: OperationKind::Subscription,
                    name: Some("OnCreated".to_string()),
                },
                OperationInfo {
                    kind: OperationKind::Query,
                    name: None,
                },
                OperationInfo {
                    kind: OperationKind::Mutation,
                    name: Some("Rename".to_string()),
                },
            ]
        );
    }

    #[test]
    fn shorthand_query_is_a_query() {
        let document = parse("{ me { id } }");
        assert_eq!(
            classify(&document),
            vec![OperationInfo {
                kind: OperationKind::Query,
                name: None,
            }]
        );
    }

    #[test]
    fn fragments_only_document_has_no_operations() {
        let document = parse("fragment A on User { id }");
        assert!(classify(&document).is_empty());
    }

    #[test]
    fn kinds_display_as_keywords() {
        assert_eq!(OperationKind::Query.to_string(), "query");
        assert_eq!(OperationKind::Mutation.to_string(), "mutation");
        assert_eq!(OperationKind::Subscription.to_string(), "subscription");
    }
}
