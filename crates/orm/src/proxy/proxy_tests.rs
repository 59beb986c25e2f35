//! Proxy State Machine Tests
//!
//! Tests for the lazy initializer covering the initialize-time
//! preconditions, not-found policy, session ownership, and direct target
//! injection.

#[cfg(test)]
pub mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::backends::{EntityStore, MemoryStore};
    use crate::entity::{EntityId, EntityMetadata, EntityRecord};
    use crate::error::{OrmError, OrmResult};
    use crate::proxy::EntityRef;
    use crate::session::{
        EntityNotFoundDelegate, Session, SessionFactory, SessionImplementor,
    };

    /// Store wrapper that counts every fetch
    pub struct CountingStore {
        inner: MemoryStore,
        fetches: AtomicUsize,
    }

    impl CountingStore {
        pub fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                fetches: AtomicUsize::new(0),
            }
        }

        pub fn insert(&self, record: EntityRecord) {
            self.inner.insert(record);
        }

        pub fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EntityStore for CountingStore {
        async fn fetch(
            &self,
            entity_name: &str,
            id: &EntityId,
        ) -> OrmResult<Option<EntityRecord>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch(entity_name, id).await
        }
    }

    /// Strict delegate that counts how often it is consulted
    struct CountingDelegate {
        calls: AtomicUsize,
    }

    impl CountingDelegate {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl EntityNotFoundDelegate for CountingDelegate {
        fn handle(&self, entity_name: &str, id: &EntityId) -> OrmResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(OrmError::EntityNotFound {
                entity_name: entity_name.to_string(),
                id: id.clone(),
            })
        }
    }

    fn build_factory(
        store: Arc<CountingStore>,
        delegate: Arc<dyn EntityNotFoundDelegate>,
    ) -> Arc<SessionFactory> {
        SessionFactory::builder()
            .entity(EntityMetadata::new("Customer"))
            .unwrap()
            .entity(EntityMetadata::new("Order"))
            .unwrap()
            .store(store)
            .entity_not_found_delegate(delegate)
            .build()
            .unwrap()
    }

    fn customer(id: i64, name: &str) -> EntityRecord {
        EntityRecord::new("Customer", EntityId::from(id))
            .with_field("id", serde_json::json!(id))
            .with_field("name", serde_json::json!(name))
    }

    async fn load_proxy(session: &Arc<Session>, entity_name: &str, id: i64) -> crate::proxy::EntityProxy {
        match session.load(entity_name, &EntityId::from(id)).await.unwrap() {
            EntityRef::Proxy(proxy) => proxy,
            other => panic!("expected proxy, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_implementation_is_idempotent() {
        let store = Arc::new(CountingStore::new());
        store.insert(customer(1, "Ada"));
        let factory = build_factory(store.clone(), CountingDelegate::new());
        let session = Session::open(factory.clone());

        let proxy = load_proxy(&session, "Customer", 1).await;
        assert!(proxy.is_uninitialized());

        let first = proxy.record().await.unwrap().unwrap();
        assert!(!proxy.is_uninitialized());
        let second = proxy.record().await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_identifier_access_never_initializes() {
        let store = Arc::new(CountingStore::new());
        store.insert(customer(1, "Ada"));
        let factory = build_factory(store.clone(), CountingDelegate::new());
        let session = Session::open(factory.clone());

        let proxy = load_proxy(&session, "Customer", 1).await;
        assert_eq!(proxy.identifier(), EntityId::from(1));
        let id_field = proxy.field("id").await.unwrap();
        assert_eq!(id_field, Some(serde_json::json!(1)));

        assert!(proxy.is_uninitialized());
        assert_eq!(store.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_non_identifier_field_forces_load() {
        let store = Arc::new(CountingStore::new());
        store.insert(customer(1, "Ada"));
        let factory = build_factory(store.clone(), CountingDelegate::new());
        let session = Session::open(factory.clone());

        let proxy = load_proxy(&session, "Customer", 1).await;
        let name = proxy.field("name").await.unwrap();
        assert_eq!(name, Some(serde_json::json!("Ada")));
        assert!(!proxy.is_uninitialized());
        assert_eq!(store.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_rebind_to_second_open_session_fails() {
        let store = Arc::new(CountingStore::new());
        let factory = build_factory(store, CountingDelegate::new());
        let session_a = Session::open(factory.clone());
        let session_b = Session::open(factory.clone());

        // Registered in A's persistence context and A is open
        let proxy = load_proxy(&session_a, "Customer", 1).await;
        let b: Arc<dyn SessionImplementor> = session_b.clone();
        let err = proxy.lazy_initializer().set_session(&b).unwrap_err();
        assert!(matches!(err, OrmError::SessionOwnership(_)));
    }

    #[tokio::test]
    async fn test_rebind_after_close_succeeds() {
        let store = Arc::new(CountingStore::new());
        store.insert(customer(1, "Ada"));
        let factory = build_factory(store, CountingDelegate::new());
        let session_a = Session::open(factory.clone());
        let session_b = Session::open(factory.clone());

        let proxy = load_proxy(&session_a, "Customer", 1).await;
        session_a.close();

        let b: Arc<dyn SessionImplementor> = session_b.clone();
        proxy.lazy_initializer().set_session(&b).unwrap();

        // The reattached proxy loads through the new session
        let record = proxy.record().await.unwrap().unwrap();
        assert_eq!(record.get("name"), Some(&serde_json::json!("Ada")));
    }

    #[tokio::test]
    async fn test_rebind_of_unregistered_proxy_succeeds() {
        let store = Arc::new(CountingStore::new());
        let factory = build_factory(store, CountingDelegate::new());
        let session_a = Session::open(factory.clone());
        let session_b = Session::open(factory.clone());

        // Built straight from the factory: never registered in A's context
        let a: Arc<dyn SessionImplementor> = session_a.clone();
        let proxy = factory
            .proxy_factory("Customer")
            .unwrap()
            .get_proxy(EntityId::from(1), &a)
            .unwrap();

        let b: Arc<dyn SessionImplementor> = session_b.clone();
        proxy.lazy_initializer().set_session(&b).unwrap();
    }

    #[tokio::test]
    async fn test_rebind_to_same_session_is_noop() {
        let store = Arc::new(CountingStore::new());
        let factory = build_factory(store, CountingDelegate::new());
        let session = Session::open(factory.clone());

        let proxy = load_proxy(&session, "Customer", 1).await;
        let same: Arc<dyn SessionImplementor> = session.clone();
        proxy.lazy_initializer().set_session(&same).unwrap();
        assert!(proxy.lazy_initializer().is_connected_to_session());
    }

    #[tokio::test]
    async fn test_missing_row_invokes_not_found_delegate() {
        let store = Arc::new(CountingStore::new());
        let delegate = CountingDelegate::new();
        let factory = build_factory(store, delegate.clone());
        let session = Session::open(factory.clone());

        let proxy = load_proxy(&session, "Order", 7).await;
        let err = proxy.record().await.unwrap_err();
        assert_eq!(
            err,
            OrmError::EntityNotFound {
                entity_name: "Order".to_string(),
                id: EntityId::from(7),
            }
        );
        assert_eq!(delegate.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unwrap_tolerates_missing_row() {
        let store = Arc::new(CountingStore::new());
        let delegate = CountingDelegate::new();
        let factory = build_factory(store, delegate.clone());
        let session = Session::open(factory.clone());

        let proxy = load_proxy(&session, "Order", 7).await;
        proxy.lazy_initializer().set_unwrap(true);

        let record = proxy.record().await.unwrap();
        assert!(record.is_none());
        assert!(!proxy.is_uninitialized());
        assert_eq!(delegate.call_count(), 0);
    }

    #[tokio::test]
    async fn test_set_implementation_round_trip_without_store_access() {
        let store = Arc::new(CountingStore::new());
        let factory = build_factory(store.clone(), CountingDelegate::new());
        let session = Session::open(factory.clone());

        let proxy = load_proxy(&session, "Customer", 1).await;
        let injected = Arc::new(customer(1, "Ada"));
        proxy.lazy_initializer().set_implementation(Some(injected.clone()));

        assert!(!proxy.is_uninitialized());
        let resolved = proxy.record().await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&resolved, &injected));
        assert_eq!(store.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_set_implementation_none_reruns_not_found_check() {
        let store = Arc::new(CountingStore::new());
        let delegate = CountingDelegate::new();
        let factory = build_factory(store, delegate.clone());
        let session = Session::open(factory.clone());

        let proxy = load_proxy(&session, "Order", 7).await;
        proxy.lazy_initializer().set_implementation(None);

        let err = proxy.lazy_initializer().initialize().await.unwrap_err();
        assert!(matches!(err, OrmError::EntityNotFound { .. }));
        assert_eq!(delegate.call_count(), 1);
    }

    #[tokio::test]
    async fn test_closed_session_fails_initialization() {
        let store = Arc::new(CountingStore::new());
        store.insert(customer(42, "Ada"));
        let factory = build_factory(store, CountingDelegate::new());
        let session = Session::open(factory.clone());

        let proxy = load_proxy(&session, "Customer", 42).await;
        session.close();

        let err = proxy.field("name").await.unwrap_err();
        assert!(matches!(err, OrmError::SessionClosed(_)));
        assert!(proxy.is_uninitialized());
    }

    #[tokio::test]
    async fn test_disconnected_session_fails_initialization() {
        let store = Arc::new(CountingStore::new());
        store.insert(customer(1, "Ada"));
        let factory = build_factory(store, CountingDelegate::new());
        let session = Session::open(factory.clone());

        let proxy = load_proxy(&session, "Customer", 1).await;
        session.disconnect();

        let err = proxy.record().await.unwrap_err();
        assert!(matches!(err, OrmError::SessionDisconnected(_)));

        // Reconnecting makes the same proxy usable again
        session.reconnect().unwrap();
        assert!(proxy.record().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_detached_proxy_fails_without_session() {
        let store = Arc::new(CountingStore::new());
        let factory = build_factory(store, CountingDelegate::new());
        let session = Session::open(factory.clone());

        let proxy = load_proxy(&session, "Customer", 1).await;
        proxy.lazy_initializer().unset_session();

        let err = proxy.record().await.unwrap_err();
        assert!(matches!(err, OrmError::LazyInitialization(_)));
    }

    #[tokio::test]
    async fn test_implementation_in_reads_context_without_loading() {
        let store = Arc::new(CountingStore::new());
        store.insert(customer(1, "Ada"));
        let factory = build_factory(store.clone(), CountingDelegate::new());
        let session = Session::open(factory.clone());

        let proxy = load_proxy(&session, "Customer", 1).await;
        assert!(proxy.lazy_initializer().implementation_in(session.as_ref()).is_none());

        // Residence through an independent load is visible to the lookup
        session.get("Customer", &EntityId::from(1)).await.unwrap();
        let resident = proxy.lazy_initializer().implementation_in(session.as_ref());
        assert!(resident.is_some());
        assert!(proxy.is_uninitialized());
        assert_eq!(store.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_set_identifier_before_initialization() {
        let store = Arc::new(CountingStore::new());
        store.insert(customer(2, "Grace"));
        let factory = build_factory(store, CountingDelegate::new());
        let session = Session::open(factory.clone());

        let proxy = load_proxy(&session, "Customer", 1).await;
        proxy.lazy_initializer().set_identifier(EntityId::from(2));
        assert_eq!(proxy.identifier(), EntityId::from(2));

        let record = proxy.record().await.unwrap().unwrap();
        assert_eq!(record.get("name"), Some(&serde_json::json!("Grace")));
    }
}
