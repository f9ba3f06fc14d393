//! Access to the cluster API: change streams and full-replace writes.

use std::{collections::HashSet, fmt::Debug, future::Future, hash::Hash};

use futures::{stream, stream::BoxStream, StreamExt, TryStreamExt};
use kube_client::{
    api::{ListParams, PostParams},
    Api, Client,
};
use k8s_openapi::NamespaceResourceScope;
use kube_core::Resource;
use kube_runtime::{reflector, reflector::ObjectRef, watcher, WatchStreamExt};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error::Error,
    event::{Event, QualifiedName},
};

/// A classified change stream for objects of type `K`.
pub type EventStream<K> = BoxStream<'static, Result<Event<K>, Error>>;

/// The operations a subscription needs from the cluster API.
pub trait ObjectClient<K>: Send + Sync {
    /// Opens a change stream for all objects of type `K` matching `config`.
    ///
    /// Fails with [`Error::Connection`] if the API cannot be reached.
    fn watch(
        &self,
        config: watcher::Config,
    ) -> impl Future<Output = Result<EventStream<K>, Error>> + Send;

    /// Replaces the stored object with `object`.
    fn replace(&self, object: &K) -> impl Future<Output = Result<K, Error>> + Send;
}

/// [`ObjectClient`] backed by a kube [`Client`].
#[derive(Clone)]
pub struct KubeObjects {
    client: Client,
}

impl KubeObjects {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl<K> ObjectClient<K> for KubeObjects
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + DeserializeOwned
        + Serialize
        + Send
        + Sync
        + 'static,
{
    async fn watch(&self, config: watcher::Config) -> Result<EventStream<K>, Error> {
        let kind = K::kind(&()).into_owned();
        let api = Api::<K>::all(self.client.clone());

        // the watcher connects lazily, so list once to surface auth and reachability errors
        if let Err(source) = api.list_metadata(&ListParams::default().limit(1)).await {
            return Err(Error::Connection { kind, source });
        }

        let mut classifier = Classifier::default();
        let events = watcher(api, config)
            .default_backoff()
            .map_err(move |err| Error::from_watcher(&kind, err))
            .map_ok(move |event| {
                stream::iter(classifier.classify(event).into_iter().map(Ok::<_, Error>))
            })
            .try_flatten()
            .boxed();
        Ok(events)
    }

    async fn replace(&self, object: &K) -> Result<K, Error> {
        let name = QualifiedName::from_resource(object);
        let api = match &name.namespace {
            Some(namespace) => Api::<K>::namespaced(self.client.clone(), namespace),
            None => Api::<K>::default_namespaced(self.client.clone()),
        };
        let result = api
            .replace(&name.name, &PostParams::default(), object)
            .await;
        result.map_err(|source| Error::Write {
            object: name,
            source,
        })
    }
}

/// Turns watcher events into added/modified/deleted notifications.
///
/// The reflector store holds the last version of every object seen on the stream;
/// each event is classified against it before being applied.
pub(crate) struct Classifier<K>
where
    K: Resource + Clone + 'static,
    K::DynamicType: Eq + Hash + Clone,
{
    writer: reflector::store::Writer<K>,
    store: reflector::Store<K>,
}

impl<K> Default for Classifier<K>
where
    K: Resource + Clone + 'static,
    K::DynamicType: Eq + Hash + Clone + Default,
{
    fn default() -> Self {
        let writer = reflector::store::Writer::new(K::DynamicType::default());
        let store = writer.as_reader();
        Self { writer, store }
    }
}

impl<K> Classifier<K>
where
    K: Resource + Clone + 'static,
    K::DynamicType: Eq + Hash + Clone + Default,
{
    pub(crate) fn classify(&mut self, event: watcher::Event<K>) -> Vec<Event<K>> {
        let events = match &event {
            watcher::Event::Applied(object) => self.touched(object),
            watcher::Event::Deleted(object) => vec![Event::deleted(object.clone())],
            watcher::Event::Restarted(objects) => {
                let listed: HashSet<_> = objects.iter().map(ObjectRef::from_obj).collect();
                let mut events: Vec<_> =
                    objects.iter().flat_map(|object| self.touched(object)).collect();
                events.extend(
                    self.store
                        .state()
                        .into_iter()
                        .filter(|prev| !listed.contains(&ObjectRef::from_obj(&**prev)))
                        .map(|prev| Event::deleted(K::clone(&prev))),
                );
                events
            }
        };
        self.writer.apply_watcher_event(&event);
        events
    }

    fn touched(&self, object: &K) -> Vec<Event<K>> {
        let Some(prev) = self.store.get(&ObjectRef::from_obj(object)) else {
            return vec![Event::added(object.clone())];
        };
        let (prev_meta, meta) = (prev.meta(), object.meta());
        if prev_meta.uid != meta.uid {
            // deleted and recreated under the same name while the watch was down
            vec![Event::deleted(K::clone(&prev)), Event::added(object.clone())]
        } else if prev_meta.resource_version.is_some()
            && prev_meta.resource_version == meta.resource_version
        {
            Vec::new()
        } else {
            vec![Event::modified(object.clone())]
        }
    }
}
