//! Fragment definitions known to a project, and the resolution of the ones an
//! operation depends on.

use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use apollo_compiler::Node;
use apollo_compiler::ast;
use indexmap::IndexMap;
use tower::BoxError;

/// A named fragment along with its exact source text.
#[derive(Clone, Debug)]
pub struct FragmentInfo {
    pub name: String,
    pub content: String,
    pub definition: Node<ast::FragmentDefinition>,
}

impl FragmentInfo {
    /// Parses the source text of a single fragment definition.
    pub fn parse(content: impl Into<String>) -> Result<Self, BoxError> {
        let content = content.into();
        let document = ast::Document::parse(content.clone(), "fragment.graphql")
            .map_err(|with_errors| with_errors.errors.to_string())?;
        let mut fragments = document
            .definitions
            .into_iter()
            .filter_map(|definition| match definition {
                ast::Definition::FragmentDefinition(definition) => Some(definition),
                _ => None,
            });
        match (fragments.next(), fragments.next()) {
            (Some(definition), None) => Ok(Self {
                name: definition.name.to_string(),
                content,
                definition,
            }),
            _ => Err("expected exactly one fragment definition".into()),
        }
    }
}

/// The project an operation belongs to, as far as fragments are concerned.
#[async_trait::async_trait]
pub trait ProjectFragments: Send + Sync {
    /// Every fragment definition known to the project, keyed by name.
    async fn fragment_definitions(&self) -> Result<IndexMap<String, FragmentInfo>, BoxError>;
}

/// Fragment definitions collected from a set of GraphQL documents.
#[derive(Clone, Debug, Default)]
pub struct DocumentFragments {
    fragments: IndexMap<String, FragmentInfo>,
}

impl DocumentFragments {
    /// Collects the fragment definitions of in-memory documents.
    ///
    /// When several documents define the same name, the last one wins.
    pub fn from_sources<'a>(
        sources: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, BoxError> {
        let mut fragments = IndexMap::new();
        for (path, source) in sources {
            let document = ast::Document::parse(source, path)
                .map_err(|with_errors| format!("{path}: {}", with_errors.errors))?;
            for definition in &document.definitions {
                if let ast::Definition::FragmentDefinition(definition) = definition {
                    let content = source_text(source, definition);
                    fragments.insert(
                        definition.name.to_string(),
                        FragmentInfo {
                            name: definition.name.to_string(),
                            content,
                            definition: definition.clone(),
                        },
                    );
                }
            }
        }
        Ok(Self { fragments })
    }

    /// Reads documents from disk and collects their fragment definitions.
    pub async fn load(paths: impl IntoIterator<Item = impl AsRef<Path>>) -> Result<Self, BoxError> {
        let mut sources: Vec<(PathBuf, String)> = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let source = tokio::fs::read_to_string(path)
                .await
                .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
            sources.push((path.to_path_buf(), source));
        }
        let named: Vec<(String, &str)> = sources
            .iter()
            .map(|(path, source)| (path.display().to_string(), source.as_str()))
            .collect();
        Self::from_sources(named.iter().map(|(path, source)| (path.as_str(), *source)))
    }

    /// The collected fragments, keyed by name.
    pub fn fragments(&self) -> &IndexMap<String, FragmentInfo> {
        &self.fragments
    }
}

#[async_trait::async_trait]
impl ProjectFragments for DocumentFragments {
    async fn fragment_definitions(&self) -> Result<IndexMap<String, FragmentInfo>, BoxError> {
        Ok(self.fragments.clone())
    }
}

// The source text of a definition, falling back to its serialized form.
fn source_text(source: &str, definition: &Node<ast::FragmentDefinition>) -> String {
    definition
        .location()
        .and_then(|span| source.get(span.offset()..span.end_offset()))
        .map(|text| text.trim().to_string())
        .unwrap_or_else(|| definition.to_string())
}

/// Finds the fragments an operation document depends on.
pub trait FragmentResolver: Send + Sync {
    fn fragment_dependencies(
        &self,
        document: &ast::Document,
        fragment_definitions: &IndexMap<String, FragmentInfo>,
    ) -> Result<Vec<FragmentInfo>, BoxError>;
}

/// Resolves every fragment spread in a document, following spreads inside
/// resolved fragments.
///
/// Fragments defined by the document itself are not returned. Spreads of
/// unknown fragments are ignored, the parser of the combined text reports
/// them.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransitiveFragmentResolver;

impl FragmentResolver for TransitiveFragmentResolver {
    fn fragment_dependencies(
        &self,
        document: &ast::Document,
        fragment_definitions: &IndexMap<String, FragmentInfo>,
    ) -> Result<Vec<FragmentInfo>, BoxError> {
        if fragment_definitions.is_empty() {
            return Ok(Vec::new());
        }

        let mut defined_locally = HashSet::new();
        let mut referenced = Vec::new();
        for definition in &document.definitions {
            match definition {
                ast::Definition::OperationDefinition(operation) => {
                    collect_spreads(&operation.selection_set, &mut referenced);
                }
                ast::Definition::FragmentDefinition(fragment) => {
                    defined_locally.insert(fragment.name.as_str());
                    collect_spreads(&fragment.selection_set, &mut referenced);
                }
                _ => {}
            }
        }

        let mut seen: HashSet<String> = referenced.iter().cloned().collect();
        let mut queue: Vec<&FragmentInfo> = Vec::new();
        for name in &referenced {
            if !defined_locally.contains(name.as_str())
                && let Some(fragment) = fragment_definitions.get(name)
            {
                queue.push(fragment);
            }
        }

        // The queue grows while it is walked.
        let mut dependencies = Vec::new();
        let mut index = 0;
        while let Some(fragment) = queue.get(index).copied() {
            index += 1;
            let mut spreads = Vec::new();
            collect_spreads(&fragment.definition.selection_set, &mut spreads);
            for name in spreads {
                if !seen.contains(&name)
                    && let Some(dependency) = fragment_definitions.get(&name)
                {
                    queue.push(dependency);
                    seen.insert(name);
                }
            }
            if !defined_locally.contains(fragment.name.as_str()) {
                dependencies.push(fragment.clone());
            }
        }
        Ok(dependencies)
    }
}

fn collect_spreads(selection_set: &[ast::Selection], names: &mut Vec<String>) {
    for selection in selection_set {
        match selection {
            ast::Selection::Field(field) => collect_spreads(&field.selection_set, names),
            ast::Selection::FragmentSpread(spread) => {
                let name = spread.fragment_name.to_string();
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            ast::Selection::InlineFragment(inline) => {
                collect_spreads(&inline.selection_set, names)
            }
        }
    }
}
