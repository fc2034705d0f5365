//! Forwards result events to the editor as pretty-printed JSON.

use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use serde_json_bytes::Value;

use crate::document::OperationKind;
use crate::graphql;
use crate::graphql::ResultStream;
use crate::result::OperationResult;

/// Receives the serialized results of an operation, tagged with its kind.
///
/// Called concurrently from the tasks driving each operation.
pub trait UpdateCallback: Send + Sync {
    /// Receives one serialized result of an operation of the given kind.
    fn update(&self, payload: String, kind: OperationKind);
}

impl<F> UpdateCallback for F
where
    F: Fn(String, OperationKind) + Send + Sync,
{
    fn update(&self, payload: String, kind: OperationKind) {
        self(payload, kind)
    }
}

#[derive(Serialize)]
struct Payload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [graphql::Error]>,
}

/// Turns the events of one operation into update callback calls.
#[derive(Clone)]
pub struct ResultConsumer {
    kind: OperationKind,
    update: Arc<dyn UpdateCallback>,
}

impl ResultConsumer {
    pub fn new(kind: OperationKind, update: Arc<dyn UpdateCallback>) -> Self {
        Self { kind, update }
    }

    /// Forwards one event.
    ///
    /// Data and errors are forwarded as `{"data", "errors"}`. A failed
    /// operation forwards its GraphQL errors as `{"errors"}` and its network
    /// error as a plain `Error: <message>` string. An event carrying both
    /// shapes is forwarded twice.
    pub fn consume(&self, result: &OperationResult) {
        if result.data.is_some() || result.errors.is_some() {
            self.forward(&Payload {
                data: result.data.as_ref(),
                errors: result.errors.as_deref(),
            });
        }

        if let Some(error) = &result.error {
            if !error.graphql_errors.is_empty() {
                self.forward(&Payload {
                    data: None,
                    errors: Some(error.graphql_errors.as_slice()),
                });
            }
            if let Some(network_error) = &error.network_error {
                self.update.update(format!("Error: {network_error}"), self.kind);
            }
        }
    }

    /// Forwards every event of a stream, until it ends.
    pub async fn consume_stream(self, mut results: ResultStream) {
        while let Some(result) = results.next().await {
            self.consume(&result);
        }
        tracing::debug!(kind = %self.kind, "result stream ended");
    }

    fn forward(&self, payload: &Payload<'_>) {
        match serde_json::to_string_pretty(payload) {
            Ok(payload) => self.update.update(payload, self.kind),
            Err(err) => tracing::error!(kind = %self.kind, "cannot serialize result: {err}"),
        }
    }
}

impl std::fmt::Debug for ResultConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultConsumer")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::stream;
    use pretty_assertions::assert_eq;
    use serde_json_bytes::json;

    use super::*;
    use crate::error::NetworkError;

    type Calls = Arc<Mutex<Vec<(String, OperationKind)>>>;

    fn consumer(kind: OperationKind) -> (ResultConsumer, Calls) {
        let calls: Calls = Default::default();
        let recorded = calls.clone();
        let consumer = ResultConsumer::new(
            kind,
            Arc::new(move |payload: String, kind: OperationKind| {
                recorded.lock().unwrap().push((payload, kind));
            }),
        );
        (consumer, calls)
    }

    #[test]
    fn data_is_pretty_printed_without_missing_errors() {
        let (consumer, calls) = consumer(OperationKind::Query);
        consumer.consume(&OperationResult {
            data: Some(json!({"foo": 1})),
            ..Default::default()
        });
        assert_eq!(
            *calls.lock().unwrap(),
            vec![(
                "{\n  \"data\": {\n    \"foo\": 1\n  }\n}".to_string(),
                OperationKind::Query
            )]
        );
    }

    #[test]
    fn data_and_errors_are_forwarded_together() {
        let (consumer, calls) = consumer(OperationKind::Mutation);
        consumer.consume(&OperationResult {
            data: Some(json!({"rename": null})),
            errors: Some(vec![graphql::Error::builder().message("forbidden").build()]),
            error: None,
        });
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, OperationKind::Mutation);
        insta::assert_snapshot!(calls[0].0, @r###"
        {
          "data": {
            "rename": null
          },
          "errors": [
            {
              "message": "forbidden"
            }
          ]
        }
        "###);
    }

    #[test]
    fn graphql_errors_are_forwarded_as_errors() {
        let (consumer, calls) = consumer(OperationKind::Subscription);
        consumer.consume(&OperationResult::graphql_errors(vec![
            graphql::Error::builder()
                .message("not logged in")
                .extension_code("UNAUTHENTICATED")
                .build(),
        ]));
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, OperationKind::Subscription);
        insta::assert_snapshot!(calls[0].0, @r###"
        {
          "errors": [
            {
              "message": "not logged in",
              "extensions": {
                "code": "UNAUTHENTICATED"
              }
            }
          ]
        }
        "###);
    }

    #[test]
    fn network_error_is_forwarded_as_an_error_string() {
        let (consumer, calls) = consumer(OperationKind::Query);
        consumer.consume(&OperationResult::network_error(NetworkError::HttpStatus {
            status_code: 502,
        }));
        assert_eq!(
            *calls.lock().unwrap(),
            vec![(
                "Error: Response not successful: Received status code 502".to_string(),
                OperationKind::Query
            )]
        );
    }

    #[test]
    fn both_branches_fire_for_the_same_event() {
        let (consumer, calls) = consumer(OperationKind::Query);
        let mut result = OperationResult::network_error(NetworkError::HttpStatus {
            status_code: 500,
        });
        result.data = Some(json!({"foo": 1}));
        consumer.consume(&result);
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "{\n  \"data\": {\n    \"foo\": 1\n  }\n}");
        assert_eq!(
            calls[1].0,
            "Error: Response not successful: Received status code 500"
        );
    }

    #[test]
    fn empty_event_forwards_nothing() {
        let (consumer, calls) = consumer(OperationKind::Query);
        consumer.consume(&OperationResult::default());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn consumes_every_event_of_a_stream() {
        let (consumer, calls) = consumer(OperationKind::Subscription);
        let events = (1..=3).map(|count| OperationResult {
            data: Some(json!({ "count": count })),
            ..Default::default()
        });
        consumer
            .consume_stream(stream::iter(events.collect::<Vec<_>>()).boxed())
            .await;
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert!(calls[2].0.contains("\"count\": 3"));
    }
}
