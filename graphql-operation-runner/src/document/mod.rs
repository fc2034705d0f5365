//! Operation documents extracted from editor source text.

mod fragments;
mod operation;

use apollo_compiler::ast;
pub use fragments::DocumentFragments;
pub use fragments::FragmentInfo;
pub use fragments::FragmentResolver;
pub use fragments::ProjectFragments;
pub use fragments::TransitiveFragmentResolver;
pub use operation::OperationInfo;
pub use operation::OperationKind;
pub use operation::classify;

use crate::error::ExecutionError;

const OPERATION_SOURCE_PATH: &str = "operation.graphql";

/// The text of an operation as it appears in the editor, along with its
/// parsed form.
#[derive(Clone, Debug)]
pub struct ExtractedTemplateLiteral {
    content: String,
    ast: ast::Document,
}

impl ExtractedTemplateLiteral {
    /// Parses operation text.
    pub fn parse(content: impl Into<String>) -> Result<Self, ExecutionError> {
        let content = content.into();
        let ast = ast::Document::parse(content.clone(), OPERATION_SOURCE_PATH)
            .map_err(|with_errors| ExecutionError::Parse(with_errors.errors.to_string()))?;
        Ok(Self { content, ast })
    }

    /// The operation text.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The parsed operation text.
    pub fn ast(&self) -> &ast::Document {
        &self.ast
    }

    /// Returns a new literal with the source of each fragment prepended on its
    /// own line, in the order given, then parses the combined text.
    ///
    /// Fragments already present in the text are not detected: inlining an
    /// inlined literal prepends them again.
    pub fn with_fragments(&self, fragments: &[FragmentInfo]) -> Result<Self, ExecutionError> {
        let content = fragments
            .iter()
            .fold(self.content.clone(), |content, fragment| {
                format!("{}\n{content}", fragment.content)
            });
        Self::parse(content)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn fragment(content: &str) -> FragmentInfo {
        FragmentInfo::parse(content).unwrap()
    }

    #[test]
    fn parse_error_is_reported() {
        let error = ExtractedTemplateLiteral::parse("query { user(id: ").unwrap_err();
        assert!(matches!(error, ExecutionError::Parse(_)), "{error:?}");
    }

    #[test]
    fn fragments_are_prepended_one_per_line() {
        let literal = ExtractedTemplateLiteral::parse("query { me { ...A ...B } }").unwrap();
        let inlined = literal
            .with_fragments(&[
                fragment("fragment A on User { id }"),
                fragment("fragment B on User { name }"),
            ])
            .unwrap();
        assert_eq!(
            inlined.content(),
            "fragment B on User { name }\nfragment A on User { id }\nquery { me { ...A ...B } }"
        );
        assert_eq!(inlined.ast().definitions.len(), 3);
        // the input literal is left untouched
        assert_eq!(literal.content(), "query { me { ...A ...B } }");
    }

    #[test]
    fn inlining_twice_prepends_again() {
        let literal = ExtractedTemplateLiteral::parse("query { me { ...A } }").unwrap();
        let fragments = [fragment("fragment A on User { id }")];
        let once = literal.with_fragments(&fragments).unwrap();
        let twice = once.with_fragments(&fragments).unwrap();
        assert_eq!(
            twice.content(),
            "fragment A on User { id }\nfragment A on User { id }\nquery { me { ...A } }"
        );
        assert_eq!(twice.ast().definitions.len(), 3);
    }

    #[test]
    fn no_fragments_keeps_the_text() {
        let literal = ExtractedTemplateLiteral::parse("{ me { id } }").unwrap();
        let inlined = literal.with_fragments(&[]).unwrap();
        assert_eq!(inlined.content(), literal.content());
    }
}
