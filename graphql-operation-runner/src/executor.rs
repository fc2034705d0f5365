//! Runs every operation of a document against an endpoint.

use std::sync::Arc;

use futures::future;
use tracing::Instrument;

use crate::configuration::Configuration;
use crate::consumer::ResultConsumer;
use crate::consumer::UpdateCallback;
use crate::document::ExtractedTemplateLiteral;
use crate::document::FragmentResolver;
use crate::document::OperationInfo;
use crate::document::OperationKind;
use crate::document::ProjectFragments;
use crate::document::TransitiveFragmentResolver;
use crate::document::classify;
use crate::endpoint::Endpoint;
use crate::error::ClientError;
use crate::error::ExecutionError;
use crate::graphql;
use crate::graphql::Object;
use crate::graphql::ResultStream;
use crate::transport::ClientFactory;
use crate::transport::TransportClientFactory;

/// Observes operations that could not be started.
///
/// Such failures never reach the update callback.
pub trait DiagnosticSink: Send + Sync {
    /// Called once for each operation whose client could not be built or started.
    fn operation_failed(&self, operation: &OperationInfo, error: &ClientError);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&OperationInfo, &ClientError) + Send + Sync,
{
    fn operation_failed(&self, operation: &OperationInfo, error: &ClientError) {
        self(operation, error)
    }
}

/// Executes the operations of editor documents over the network.
///
/// Holds no state between calls: every operation gets a fresh client.
#[derive(Clone)]
pub struct NetworkExecutor {
    configuration: Arc<Configuration>,
    client_factory: Arc<dyn ClientFactory>,
    fragment_resolver: Arc<dyn FragmentResolver>,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
}

impl NetworkExecutor {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration: Arc::new(configuration),
            client_factory: Arc::new(TransportClientFactory),
            fragment_resolver: Arc::new(TransitiveFragmentResolver),
            diagnostics: None,
        }
    }

    /// Replaces how clients are built.
    pub fn with_client_factory(mut self, client_factory: Arc<dyn ClientFactory>) -> Self {
        self.client_factory = client_factory;
        self
    }

    /// Replaces how fragment dependencies are found.
    pub fn with_fragment_resolver(mut self, fragment_resolver: Arc<dyn FragmentResolver>) -> Self {
        self.fragment_resolver = fragment_resolver;
        self
    }

    /// Reports operations that could not be started to `diagnostics`.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Executes every operation of `literal` against `endpoint`.
    ///
    /// The fragments the document depends on are looked up in `project` and
    /// inlined first. Each operation is then started concurrently and its
    /// results are forwarded to `update` from a spawned task; this returns
    /// once all of them are started, without waiting for their results.
    ///
    /// An operation that cannot be started is logged and skipped. Only
    /// failures to prepare the document are returned.
    pub async fn execute_operation(
        &self,
        endpoint: &Endpoint,
        literal: &ExtractedTemplateLiteral,
        variables: &Object,
        update: Arc<dyn UpdateCallback>,
        project: &dyn ProjectFragments,
    ) -> Result<(), ExecutionError> {
        let operations = classify(literal.ast());

        let fragment_definitions = project
            .fragment_definitions()
            .await
            .map_err(ExecutionError::FragmentDefinitions)?;
        let dependencies = self
            .fragment_resolver
            .fragment_dependencies(literal.ast(), &fragment_definitions)
            .map_err(ExecutionError::FragmentResolution)?;
        let literal = literal.with_fragments(&dependencies)?;
        tracing::debug!(
            url = %endpoint.url,
            operations = operations.len(),
            fragments = dependencies.len(),
            "executing document"
        );

        future::join_all(operations.into_iter().map(|operation| {
            self.start_operation(endpoint, literal.content(), variables, update.clone(), operation)
        }))
        .await;
        Ok(())
    }

    async fn start_operation(
        &self,
        endpoint: &Endpoint,
        query: &str,
        variables: &Object,
        update: Arc<dyn UpdateCallback>,
        operation: OperationInfo,
    ) {
        let span = tracing::info_span!(
            "graphql_operation",
            kind = %operation.kind,
            operation_name = operation.name.as_deref().unwrap_or_default(),
        );
        let results = match self.open_stream(endpoint, query, variables, &operation) {
            Ok(results) => results,
            Err(err) => {
                span.in_scope(|| tracing::error!("cannot start operation: {err}"));
                if let Some(diagnostics) = &self.diagnostics {
                    diagnostics.operation_failed(&operation, &err);
                }
                return;
            }
        };

        let consumer = ResultConsumer::new(operation.kind, update);
        tokio::task::spawn(consumer.consume_stream(results).instrument(span));
    }

    fn open_stream(
        &self,
        endpoint: &Endpoint,
        query: &str,
        variables: &Object,
        operation: &OperationInfo,
    ) -> Result<ResultStream, ClientError> {
        let client = self
            .client_factory
            .create(endpoint, operation.kind, &self.configuration)?;
        let request = graphql::Request::builder()
            .query(query)
            .and_operation_name(operation.name.clone())
            .variables(variables.clone())
            .build();
        match operation.kind {
            OperationKind::Query => client.query(request),
            OperationKind::Mutation => client.mutate(request),
            OperationKind::Subscription => client.subscribe(request),
        }
    }
}

impl std::fmt::Debug for NetworkExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkExecutor")
            .field("configuration", &self.configuration)
            .finish_non_exhaustive()
    }
}
