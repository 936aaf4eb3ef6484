//! Deferred output values
//!
//! An [`Output`] is a value that becomes known once the resources it depends
//! on have been created. It resolves at most once and any number of readers
//! observe the same result. Combinators derive new outputs whose
//! dependency set is the union of their inputs'.

use crate::error::{OutputError, OutputResult};
use crate::input::PropertyMap;
use crate::resource::Urn;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

pub struct Output<T> {
    future: Shared<BoxFuture<'static, OutputResult<T>>>,
    dependencies: Arc<BTreeSet<Urn>>,
}

impl<T> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self {
            future: self.future.clone(),
            dependencies: Arc::clone(&self.dependencies),
        }
    }
}

impl<T> std::fmt::Debug for Output<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Output")
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl<T> Output<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// An output whose value is already known
    pub fn known(value: T) -> Self {
        Self::from_future(async move { Ok(value) }, BTreeSet::new())
    }

    pub fn failed(error: OutputError) -> Self {
        Self::from_future(async move { Err(error) }, BTreeSet::new())
    }

    pub(crate) fn from_future<F>(future: F, dependencies: BTreeSet<Urn>) -> Self
    where
        F: Future<Output = OutputResult<T>> + Send + 'static,
    {
        Self {
            future: future.boxed().shared(),
            dependencies: Arc::new(dependencies),
        }
    }

    /// Resources this value is derived from
    pub fn dependencies(&self) -> &BTreeSet<Urn> {
        &self.dependencies
    }

    /// Waits for the value
    pub async fn resolve(&self) -> OutputResult<T> {
        self.future.clone().await
    }

    /// Returns the result if it is available without waiting
    pub fn peek(&self) -> Option<OutputResult<T>> {
        self.future.clone().now_or_never()
    }

    /// Derives a new output with a pure function. `f` only runs if this
    /// output resolves successfully.
    pub fn apply<U, F>(&self, f: F) -> Output<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let source = self.future.clone();
        Output::from_future(
            async move { source.await.map(f) },
            (*self.dependencies).clone(),
        )
    }

    /// Like [`Output::apply`] for functions that can fail. The error is
    /// carried by the derived output.
    pub fn try_apply<U, F>(&self, f: F) -> Output<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> OutputResult<U> + Send + 'static,
    {
        let source = self.future.clone();
        Output::from_future(
            async move { source.await.and_then(f) },
            (*self.dependencies).clone(),
        )
    }

    /// Derives a new output with an async function, e.g. a provider call
    /// that needs the resolved value.
    pub fn then<U, F, Fut>(&self, f: F) -> Output<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = OutputResult<U>> + Send + 'static,
    {
        let source = self.future.clone();
        Output::from_future(
            async move {
                let value = source.await?;
                f(value).await
            },
            (*self.dependencies).clone(),
        )
    }

    pub fn zip<U>(&self, other: &Output<U>) -> Output<(T, U)>
    where
        U: Clone + Send + Sync + 'static,
    {
        let left = self.future.clone();
        let right = other.future.clone();
        let dependencies = self
            .dependencies
            .union(&other.dependencies)
            .cloned()
            .collect();
        Output::from_future(
            async move {
                let (l, r) = futures_util::join!(left, right);
                Ok::<_, OutputError>((l?, r?))
            },
            dependencies,
        )
    }

    /// Combines an ordered sequence of outputs into one. Fails with the
    /// first failed input, in order.
    pub fn all<I>(outputs: I) -> Output<Vec<T>>
    where
        I: IntoIterator<Item = Output<T>>,
    {
        let outputs: Vec<Output<T>> = outputs.into_iter().collect();
        let dependencies = outputs
            .iter()
            .flat_map(|o| o.dependencies.iter().cloned())
            .collect();
        let futures: Vec<_> = outputs.into_iter().map(|o| o.future).collect();
        Output::from_future(
            async move {
                futures_util::future::join_all(futures)
                    .await
                    .into_iter()
                    .collect::<OutputResult<Vec<T>>>()
            },
            dependencies,
        )
    }
}

impl Output<String> {
    /// `format!`-style helper for the common `"<prefix><value><suffix>"` case
    pub fn wrap(&self, prefix: &str, suffix: &str) -> Output<String> {
        let prefix = prefix.to_string();
        let suffix = suffix.to_string();
        self.apply(move |v| format!("{}{}{}", prefix, v, suffix))
    }
}

fn decode_value<T: DeserializeOwned>(value: Value) -> OutputResult<T> {
    serde_json::from_value(value).map_err(|e| OutputError::TypeMismatch {
        expected: std::any::type_name::<T>().to_string(),
        found: e.to_string(),
    })
}

impl Output<Value> {
    /// Deserializes the resolved JSON into `T`
    pub fn decode<T>(&self) -> Output<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.try_apply(decode_value::<T>)
    }
}

impl Output<PropertyMap> {
    pub fn decode<T>(&self) -> Output<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.try_apply(|map| decode_value(Value::Object(map)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn pending(urn: &str) -> (oneshot::Sender<OutputResult<String>>, Output<String>) {
        let (tx, rx) = oneshot::channel();
        let urn = Urn::new("test", "proj", "test:index:Thing", urn);
        let abandoned = urn.to_string();
        let output = Output::from_future(
            async move { rx.await.unwrap_or(Err(OutputError::Abandoned(abandoned))) },
            BTreeSet::from([urn]),
        );
        (tx, output)
    }

    #[tokio::test]
    async fn test_known_resolves() {
        let output = Output::known("a".to_string());
        assert_eq!(output.resolve().await.unwrap(), "a");
        assert_eq!(output.peek(), Some(Ok("a".to_string())));
        assert!(output.dependencies().is_empty());
    }

    #[tokio::test]
    async fn test_apply_waits_for_resolution() {
        let (tx, host) = pending("app");
        let url = host.wrap("https://", "/api");
        assert!(url.peek().is_none());

        tx.send(Ok("app.azurewebsites.net".to_string())).unwrap();
        assert_eq!(
            url.resolve().await.unwrap(),
            "https://app.azurewebsites.net/api"
        );
        assert_eq!(url.dependencies().len(), 1);
    }

    #[tokio::test]
    async fn test_resolves_once_for_every_reader() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let output = Output::known(2).apply(move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            v * 21
        });
        let first = output.clone();
        let second = output.clone();

        assert_eq!(first.resolve().await.unwrap(), 42);
        assert_eq!(second.resolve().await.unwrap(), 42);
        assert_eq!(output.resolve().await.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_combinator_skipped_on_failed_input() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        let (tx, input) = pending("account");
        let derived = input.apply(move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            v
        });

        tx.send(Err(OutputError::Upstream {
            urn: "account".to_string(),
            reason: "quota exceeded".to_string(),
        }))
        .unwrap();

        assert!(matches!(
            derived.resolve().await,
            Err(OutputError::Upstream { .. })
        ));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dropped_sender_abandons() {
        let (tx, output) = pending("never");
        drop(tx);
        assert!(matches!(
            output.resolve().await,
            Err(OutputError::Abandoned(_))
        ));
    }

    #[tokio::test]
    async fn test_all_preserves_order_and_dependencies() {
        let (tx_a, a) = pending("a");
        let (tx_b, b) = pending("b");
        let combined = Output::all(vec![a, b, Output::known("c".to_string())]);
        assert_eq!(combined.dependencies().len(), 2);

        // Resolution order differs from declaration order
        tx_b.send(Ok("B".to_string())).unwrap();
        tx_a.send(Ok("A".to_string())).unwrap();

        assert_eq!(combined.resolve().await.unwrap(), vec!["A", "B", "c"]);
    }

    #[tokio::test]
    async fn test_zip_and_then() {
        let (tx, name) = pending("blob");
        let zipped = name.zip(&Output::known(7u32));
        let derived = zipped.then(|(n, k)| async move {
            if k > 5 {
                Ok(format!("{}:{}", n, k))
            } else {
                Err(OutputError::derivation("too small"))
            }
        });
        tx.send(Ok("pkg.zip".to_string())).unwrap();
        assert_eq!(derived.resolve().await.unwrap(), "pkg.zip:7");
    }

    #[tokio::test]
    async fn test_decode() {
        #[derive(serde::Deserialize, Clone, Debug, PartialEq)]
        #[serde(rename_all = "camelCase")]
        struct Zone {
            zone_id: String,
        }

        let value = Output::known(serde_json::json!({ "zoneId": "Z123", "name": "example.com" }));
        assert_eq!(
            value.decode::<Zone>().resolve().await.unwrap(),
            Zone {
                zone_id: "Z123".to_string()
            }
        );
        assert!(matches!(
            Output::known(serde_json::json!(1)).decode::<Zone>().resolve().await,
            Err(OutputError::TypeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_try_apply_error() {
        let output = Output::known("not a url".to_string())
            .try_apply(|_| Err::<String, _>(OutputError::derivation("bad url")));
        assert_eq!(
            output.resolve().await,
            Err(OutputError::Derivation("bad url".to_string()))
        );
    }
}
