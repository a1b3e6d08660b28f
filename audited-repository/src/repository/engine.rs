//! Generic repository engine
//!
//! [`GenericRepository`] implements [`EntityRepository`] for any entity type
//! that declares its audit capabilities ([`Auditable`]) and queryable fields
//! ([`Queryable`]). It composes the type's [`AuditPolicy`] with dynamic
//! paging and the CRUD façade, delegating storage to a [`Store`] and actor
//! lookup to an [`ActorResolver`].
//!
//! The engine holds no state between calls beyond what it was bound with.
//!
//! # Example
//!
//! ```rust,ignore
//! use audited_repository::repository::{
//!     EntityRepository, GenericRepository, InMemoryStore, RepositoryOptions, StaticActor,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! let repo = GenericRepository::bind(
//!     InMemoryStore::<Customer>::new(),
//!     StaticActor::new("system".to_string()),
//!     RepositoryOptions::default(),
//! )?;
//!
//! let cancel = CancellationToken::new();
//! let customer = repo.add(customer, true, &cancel).await?;
//! assert!(repo.exists(customer.id(), &cancel).await?);
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::domain::{entity_name, AuditStamp, Auditable, Entity, Specification};

use super::actor::ActorResolver;
use super::clock::{Clock, SystemClock};
use super::error::{RepositoryError, RepositoryOperation};
use super::fields::{FieldRegistry, Queryable};
use super::pagination::{PagedRequest, PagedResult};
use super::policy::{AuditPolicy, DeleteAction};
use super::query::{Criterion, Order, Query};
use super::store::{Change, Store};
use super::traits::{EntityRepository, RepositoryResult};

/// Provider-defined engine behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryOptions {
    /// Compare `filters` substrings ordinally; fold case when false
    pub case_sensitive_filters: bool,
    /// Largest accepted page size, if any
    pub max_page_size: Option<u32>,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            case_sensitive_filters: true,
            max_page_size: None,
        }
    }
}

/// Repository engine serving both entity and aggregate flavors
pub struct GenericRepository<E, S, R>
where
    E: Auditable + Queryable,
{
    store: S,
    actors: R,
    clock: Arc<dyn Clock>,
    policy: AuditPolicy<E>,
    fields: FieldRegistry<E>,
    options: RepositoryOptions,
}

impl<E, S, R> GenericRepository<E, S, R>
where
    E: Auditable + Queryable,
    S: Store<E>,
    R: ActorResolver<ActorId = E::ActorId>,
{
    /// Bind with default options
    pub fn new(store: S, actors: R) -> RepositoryResult<Self> {
        Self::bind(store, actors, RepositoryOptions::default())
    }

    /// Bind to `E`: read its audit capabilities and validate its fields
    ///
    /// # Errors
    ///
    /// `InvalidField` when `E`'s field declaration is malformed.
    pub fn bind(store: S, actors: R, options: RepositoryOptions) -> RepositoryResult<Self> {
        let fields = E::fields().build()?;
        let policy = AuditPolicy::bind();

        tracing::debug!(
            entity = entity_name::<E>(),
            fields = fields.len(),
            text_fields = fields.text_fields().count(),
            case_sensitive_filters = options.case_sensitive_filters,
            "Repository bound"
        );

        Ok(Self {
            store,
            actors,
            clock: Arc::new(SystemClock),
            policy,
            fields,
            options,
        })
    }

    /// Take audit instants from `clock`
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Audit policy bound for `E`
    pub fn policy(&self) -> &AuditPolicy<E> {
        &self.policy
    }

    /// Field registry bound for `E`
    pub fn fields(&self) -> &FieldRegistry<E> {
        &self.fields
    }

    /// Options this repository was bound with
    pub fn options(&self) -> RepositoryOptions {
        self.options
    }

    /// Query over live rows only
    fn live_query(&self) -> Query<E> {
        match self.policy.read_filter() {
            Some(not_deleted) => Query::new().filter(not_deleted),
            None => Query::new(),
        }
    }

    /// Live rows matching a request's filters and search, in its order
    fn paged_query(&self, request: &PagedRequest) -> RepositoryResult<Query<E>> {
        let mut query = self.live_query();

        for (name, needle) in &request.filters {
            let field = self.fields.resolve(name)?;
            query = query.filter(Criterion::Contains {
                field: field.clone(),
                needle: needle.clone(),
                case_sensitive: self.options.case_sensitive_filters,
            });
        }

        if let Some(search) = request.search() {
            let text_fields: Vec<_> = self.fields.text_fields().cloned().collect();
            if !text_fields.is_empty() {
                query = query.filter(Criterion::AnyContains {
                    fields: text_fields,
                    needle: search.to_string(),
                });
            }
        }

        let order = match request.order_by.as_deref().filter(|name| !name.is_empty()) {
            Some(name) => Order::ByField {
                field: self.fields.resolve(name)?.clone(),
                direction: request.direction(),
            },
            None => Order::ById(request.direction()),
        };

        Ok(query.order_by(order))
    }

    async fn first_live(
        &self,
        query: Query<E>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Option<E>> {
        let rows = self.store.fetch(&query.first(), cancel).await?;
        Ok(rows.into_iter().next())
    }

    /// Resolve the actor once and capture one instant for a whole operation
    async fn stamp(&self, cancel: &CancellationToken) -> RepositoryResult<AuditStamp<E::ActorId>> {
        let actor = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                return Err(RepositoryError::cancelled(RepositoryOperation::ResolveActor));
            }
            actor = self.actors.current_actor() => actor?,
        };
        Ok(AuditStamp::new(actor, self.clock.now()))
    }

    fn removal(&self, mut entity: E, stamp: Option<&AuditStamp<E::ActorId>>) -> Change<E> {
        match (self.policy.delete_action(), stamp) {
            (DeleteAction::Soft, Some(stamp)) => {
                self.policy.stamp_deletion(&mut entity, stamp);
                Change::Update(entity)
            }
            _ => Change::Remove(entity.id().clone()),
        }
    }

    async fn stage_and_finish(
        &self,
        operation: RepositoryOperation,
        changes: Vec<Change<E>>,
        auto_save: bool,
        cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        let staged = changes.len();
        self.store.stage(changes, cancel).await?;
        tracing::debug!(
            entity = entity_name::<E>(),
            operation = %operation,
            staged,
            auto_save,
            "Changes staged"
        );
        if auto_save {
            self.store.commit(cancel).await?;
        }
        Ok(())
    }
}

impl<E, S, R> EntityRepository<E> for GenericRepository<E, S, R>
where
    E: Auditable + Queryable,
    S: Store<E>,
    R: ActorResolver<ActorId = E::ActorId>,
{
    async fn get_all(&self, cancel: &CancellationToken) -> RepositoryResult<Vec<E>> {
        self.store.fetch(&self.live_query(), cancel).await
    }

    async fn get_by_id(&self, id: &E::Id, cancel: &CancellationToken) -> RepositoryResult<E> {
        let query = self.live_query().filter(Criterion::IdEquals(id.clone()));
        self.first_live(query, cancel).await?.ok_or_else(|| {
            RepositoryError::not_found(
                RepositoryOperation::GetById,
                entity_name::<E>(),
                id.to_string(),
            )
        })
    }

    async fn get_paged(
        &self,
        request: &PagedRequest,
        cancel: &CancellationToken,
    ) -> RepositoryResult<PagedResult<E>> {
        request.validate(self.options.max_page_size)?;
        let query = self.paged_query(request)?;

        let row_count = self.store.count(&query, cancel).await?;
        let items = self
            .store
            .fetch(&query.paginate(request.pagination()), cancel)
            .await?;

        tracing::debug!(
            entity = entity_name::<E>(),
            page = request.page,
            page_size = request.page_size,
            row_count,
            returned = items.len(),
            "Page fetched"
        );

        Ok(PagedResult::new(
            items,
            row_count,
            request.page,
            request.page_size,
        ))
    }

    async fn exists(&self, id: &E::Id, cancel: &CancellationToken) -> RepositoryResult<bool> {
        let query = self.live_query().filter(Criterion::IdEquals(id.clone()));
        Ok(self.store.count(&query, cancel).await? > 0)
    }

    async fn first_or_default<P>(
        &self,
        predicate: P,
        cancel: &CancellationToken,
    ) -> RepositoryResult<E>
    where
        P: Specification<E> + 'static,
    {
        let query = self
            .live_query()
            .filter(Criterion::Matches(Arc::new(predicate)));
        self.first_live(query, cancel).await?.ok_or_else(|| {
            RepositoryError::no_match(RepositoryOperation::FirstOrDefault, entity_name::<E>())
        })
    }

    async fn find<P>(&self, predicate: P, cancel: &CancellationToken) -> RepositoryResult<Vec<E>>
    where
        P: Specification<E> + 'static,
    {
        let query = self
            .live_query()
            .filter(Criterion::Matches(Arc::new(predicate)));
        self.store.fetch(&query, cancel).await
    }

    async fn add(
        &self,
        mut entity: E,
        auto_save: bool,
        cancel: &CancellationToken,
    ) -> RepositoryResult<E> {
        let stamp = self.stamp(cancel).await?;
        let visited = self.policy.stamp_creation(&mut entity, &stamp);
        tracing::debug!(
            entity = entity_name::<E>(),
            id = %entity.id(),
            visited,
            "Creation audit stamped"
        );

        self.stage_and_finish(
            RepositoryOperation::Add,
            vec![Change::Insert(entity.clone())],
            auto_save,
            cancel,
        )
        .await?;
        Ok(entity)
    }

    async fn add_many(
        &self,
        mut entities: Vec<E>,
        auto_save: bool,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<E>> {
        if !entities.is_empty() {
            let stamp = self.stamp(cancel).await?;
            for entity in &mut entities {
                self.policy.stamp_creation(entity, &stamp);
            }
        }

        let changes = entities.iter().cloned().map(Change::Insert).collect();
        self.stage_and_finish(RepositoryOperation::AddMany, changes, auto_save, cancel)
            .await?;
        Ok(entities)
    }

    async fn update(
        &self,
        mut entity: E,
        auto_save: bool,
        cancel: &CancellationToken,
    ) -> RepositoryResult<E> {
        if self.policy.capabilities().modification {
            let stamp = self.stamp(cancel).await?;
            self.policy.stamp_modification(&mut entity, &stamp);
        }

        self.stage_and_finish(
            RepositoryOperation::Update,
            vec![Change::Update(entity.clone())],
            auto_save,
            cancel,
        )
        .await?;
        Ok(entity)
    }

    async fn update_many(
        &self,
        mut entities: Vec<E>,
        auto_save: bool,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<E>> {
        if self.policy.capabilities().modification && !entities.is_empty() {
            let stamp = self.stamp(cancel).await?;
            for entity in &mut entities {
                self.policy.stamp_modification(entity, &stamp);
            }
        }

        let changes = entities.iter().cloned().map(Change::Update).collect();
        self.stage_and_finish(RepositoryOperation::UpdateMany, changes, auto_save, cancel)
            .await?;
        Ok(entities)
    }

    async fn remove(
        &self,
        entity: E,
        auto_save: bool,
        cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        let stamp = match self.policy.delete_action() {
            DeleteAction::Soft => Some(self.stamp(cancel).await?),
            DeleteAction::Hard => None,
        };
        let change = self.removal(entity, stamp.as_ref());
        self.stage_and_finish(RepositoryOperation::Remove, vec![change], auto_save, cancel)
            .await
    }

    async fn remove_many(
        &self,
        entities: Vec<E>,
        auto_save: bool,
        cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        let stamp = match self.policy.delete_action() {
            DeleteAction::Soft if !entities.is_empty() => Some(self.stamp(cancel).await?),
            _ => None,
        };
        let changes = entities
            .into_iter()
            .map(|entity| self.removal(entity, stamp.as_ref()))
            .collect();
        self.stage_and_finish(RepositoryOperation::RemoveMany, changes, auto_save, cancel)
            .await
    }

    async fn remove_by_key(
        &self,
        id: &E::Id,
        auto_save: bool,
        cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        let query = self.live_query().filter(Criterion::IdEquals(id.clone()));
        let entity = self.first_live(query, cancel).await?.ok_or_else(|| {
            RepositoryError::not_found(
                RepositoryOperation::RemoveByKey,
                entity_name::<E>(),
                id.to_string(),
            )
        })?;
        self.remove(entity, auto_save, cancel).await
    }

    async fn save_changes(&self, cancel: &CancellationToken) -> RepositoryResult<usize> {
        let applied = self.store.commit(cancel).await?;
        tracing::debug!(entity = entity_name::<E>(), applied, "Changes saved");
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{Duration, TimeZone, Utc};

    use crate::domain::{
        is_chronological, AggregateRoot, AuditCapabilities, AuditNode, CreationAudit,
        DeletionAudit, DomainEvents, ModificationAudit,
    };
    use crate::repository::{
        AggregateRepository, FieldRegistryBuilder, InMemoryStore, ManualClock,
        RepositoryErrorKind, StaticActor,
    };

    #[derive(Debug, Clone)]
    struct Part {
        id: u32,
        created: CreationAudit<String>,
        events: DomainEvents,
    }

    impl Entity for Part {
        type Id = u32;
        fn id(&self) -> &u32 {
            &self.id
        }
        fn events(&self) -> &DomainEvents {
            &self.events
        }
        fn events_mut(&mut self) -> &mut DomainEvents {
            &mut self.events
        }
    }

    impl Auditable for Part {
        type ActorId = String;
        const CAPABILITIES: AuditCapabilities = AuditCapabilities::NONE.with_creation();

        fn creation_audit(&self) -> Option<&CreationAudit<String>> {
            Some(&self.created)
        }
        fn creation_audit_mut(&mut self) -> Option<&mut CreationAudit<String>> {
            Some(&mut self.created)
        }
    }

    #[derive(Debug, Clone)]
    struct Customer {
        id: u32,
        name: String,
        city: Option<String>,
        score: i64,
        created: CreationAudit<String>,
        modified: ModificationAudit<String>,
        deleted: DeletionAudit<String>,
        addresses: Vec<Part>,
        contacts: Vec<Part>,
        events: DomainEvents,
    }

    impl Entity for Customer {
        type Id = u32;
        fn id(&self) -> &u32 {
            &self.id
        }
        fn events(&self) -> &DomainEvents {
            &self.events
        }
        fn events_mut(&mut self) -> &mut DomainEvents {
            &mut self.events
        }
    }

    impl AggregateRoot for Customer {}

    impl Auditable for Customer {
        type ActorId = String;
        const CAPABILITIES: AuditCapabilities = AuditCapabilities::FULL;

        fn creation_audit(&self) -> Option<&CreationAudit<String>> {
            Some(&self.created)
        }
        fn creation_audit_mut(&mut self) -> Option<&mut CreationAudit<String>> {
            Some(&mut self.created)
        }
        fn modification_audit(&self) -> Option<&ModificationAudit<String>> {
            Some(&self.modified)
        }
        fn modification_audit_mut(&mut self) -> Option<&mut ModificationAudit<String>> {
            Some(&mut self.modified)
        }
        fn deletion_audit(&self) -> Option<&DeletionAudit<String>> {
            Some(&self.deleted)
        }
        fn deletion_audit_mut(&mut self) -> Option<&mut DeletionAudit<String>> {
            Some(&mut self.deleted)
        }
        fn owned_mut(&mut self) -> Vec<&mut dyn AuditNode<String>> {
            self.addresses
                .iter_mut()
                .chain(self.contacts.iter_mut())
                .map(|p| p as &mut dyn AuditNode<String>)
                .collect()
        }
    }

    impl Queryable for Customer {
        fn fields() -> FieldRegistryBuilder<Self> {
            FieldRegistryBuilder::new()
                .text("name", |c: &Customer| c.name.as_str())
                .optional_text("city", |c: &Customer| c.city.as_deref())
                .integer("score", |c: &Customer| c.score)
        }
    }

    /// No audit capability, no text field
    #[derive(Debug, Clone)]
    struct Memo {
        id: u32,
        priority: i64,
        events: DomainEvents,
    }

    impl Entity for Memo {
        type Id = u32;
        fn id(&self) -> &u32 {
            &self.id
        }
        fn events(&self) -> &DomainEvents {
            &self.events
        }
        fn events_mut(&mut self) -> &mut DomainEvents {
            &mut self.events
        }
    }

    impl Auditable for Memo {
        type ActorId = String;
    }

    impl Queryable for Memo {
        fn fields() -> FieldRegistryBuilder<Self> {
            FieldRegistryBuilder::new().integer("priority", |m: &Memo| m.priority)
        }
    }

    /// Counts how often the actor is resolved
    #[derive(Debug, Default)]
    struct CountingActor {
        calls: AtomicUsize,
    }

    impl ActorResolver for CountingActor {
        type ActorId = String;

        async fn current_actor(&self) -> RepositoryResult<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("actor-{}", n))
        }
    }

    /// Never answers
    struct StuckActor;

    impl ActorResolver for StuckActor {
        type ActorId = String;

        async fn current_actor(&self) -> RepositoryResult<String> {
            std::future::pending().await
        }
    }

    fn part(id: u32) -> Part {
        Part {
            id,
            created: CreationAudit::default(),
            events: DomainEvents::new(),
        }
    }

    fn customer(id: u32, name: &str) -> Customer {
        Customer {
            id,
            name: name.to_string(),
            city: None,
            score: 0,
            created: CreationAudit::default(),
            modified: ModificationAudit::default(),
            deleted: DeletionAudit::default(),
            addresses: Vec::new(),
            contacts: Vec::new(),
            events: DomainEvents::new(),
        }
    }

    fn memo(id: u32, priority: i64) -> Memo {
        Memo {
            id,
            priority,
            events: DomainEvents::new(),
        }
    }

    fn start() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    type CustomerRepo<R> = GenericRepository<Customer, InMemoryStore<Customer>, R>;

    fn customers(rows: Vec<Customer>) -> CustomerRepo<StaticActor<String>> {
        GenericRepository::new(
            InMemoryStore::with_rows(rows),
            StaticActor::new("alice".to_string()),
        )
        .unwrap()
        .with_clock(ManualClock::new(start()))
    }

    fn ids(rows: &[Customer]) -> Vec<u32> {
        rows.iter().map(|c| c.id).collect()
    }

    /// 25 rows; ids 1..=12 contain "foo" in some casing, sorted by name in
    /// reverse id order
    fn search_fixture() -> Vec<Customer> {
        let variants = ["foo", "FOO", "Foobar"];
        (1..=25)
            .map(|id| {
                if id <= 12 {
                    let variant = variants[(id as usize) % variants.len()];
                    customer(id, &format!("{:02}-{}", 13 - id, variant))
                } else {
                    customer(id, &format!("{:02}-bar", id))
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn test_paged_search_scenario() {
        let repo = customers(search_fixture());
        let cancel = CancellationToken::new();

        let request = PagedRequest::new()
            .with_page(2)
            .with_page_size(10)
            .with_order_by("name")
            .with_search("foo");
        let page = repo.get_paged(&request, &cancel).await.unwrap();

        assert_eq!(page.row_count, 12);
        assert_eq!(page.page_count(), 2);
        assert_eq!(page.current_page, 2);
        // Names "11-..." and "12-..." belong to ids 2 and 1
        assert_eq!(ids(&page.items), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_paging_properties_hold_across_pages() {
        let repo = customers(search_fixture());
        let cancel = CancellationToken::new();

        for page in 1..=5_u32 {
            let request = PagedRequest::new()
                .with_page(page)
                .with_page_size(5)
                .with_search("FOO");
            let result = repo.get_paged(&request, &cancel).await.unwrap();

            assert_eq!(result.row_count, 12);
            assert!(result.len() <= 5);
            let past_end = u64::from((page - 1) * 5) >= result.row_count;
            assert_eq!(result.is_empty(), past_end);
        }
    }

    #[tokio::test]
    async fn test_default_order_is_by_id_and_honors_descending() {
        let repo = customers(vec![customer(2, "b"), customer(3, "c"), customer(1, "a")]);
        let cancel = CancellationToken::new();

        let asc = repo.get_paged(&PagedRequest::new(), &cancel).await.unwrap();
        assert_eq!(ids(&asc.items), vec![1, 2, 3]);

        let desc = repo
            .get_paged(&PagedRequest::new().descending(), &cancel)
            .await
            .unwrap();
        assert_eq!(ids(&desc.items), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_filters_and_case_sensitivity_option() {
        let mut berlin = customer(1, "Ada");
        berlin.city = Some("Berlin".to_string());
        let mut bern = customer(2, "Bob");
        bern.city = Some("bern".to_string());
        let nowhere = customer(3, "Cy");
        let rows = vec![berlin, bern, nowhere];
        let cancel = CancellationToken::new();
        let request = PagedRequest::new().with_filter("CITY", "ber");

        let sensitive = customers(rows.clone());
        let result = sensitive.get_paged(&request, &cancel).await.unwrap();
        assert_eq!(ids(&result.items), vec![2]);

        let insensitive = GenericRepository::bind(
            InMemoryStore::with_rows(rows),
            StaticActor::new("alice".to_string()),
            RepositoryOptions {
                case_sensitive_filters: false,
                max_page_size: None,
            },
        )
        .unwrap();
        let result = insensitive.get_paged(&request, &cancel).await.unwrap();
        assert_eq!(ids(&result.items), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_unknown_filter_or_sort_field_is_invalid_field() {
        let repo = customers(search_fixture());
        let cancel = CancellationToken::new();

        let err = repo
            .get_paged(&PagedRequest::new().with_filter("colour", "red"), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidField);

        let err = repo
            .get_paged(&PagedRequest::new().with_order_by("colour"), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidField);
    }

    #[tokio::test]
    async fn test_malformed_paging_is_invalid_argument() {
        let cancel = CancellationToken::new();
        let repo = customers(search_fixture());

        for request in [
            PagedRequest::new().with_page(0),
            PagedRequest::new().with_page_size(0),
        ] {
            let err = repo.get_paged(&request, &cancel).await.unwrap_err();
            assert_eq!(err.kind, RepositoryErrorKind::InvalidArgument);
        }

        let capped = GenericRepository::bind(
            InMemoryStore::<Customer>::new(),
            StaticActor::new("alice".to_string()),
            RepositoryOptions {
                case_sensitive_filters: true,
                max_page_size: Some(50),
            },
        )
        .unwrap();
        let err = capped
            .get_paged(&PagedRequest::new().with_page_size(51), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_search_without_text_fields_is_noop() {
        let repo = GenericRepository::new(
            InMemoryStore::with_rows(vec![memo(1, 5), memo(2, 1)]),
            StaticActor::new("alice".to_string()),
        )
        .unwrap();
        let cancel = CancellationToken::new();

        let result = repo
            .get_paged(
                &PagedRequest::new().with_search("zzz").with_order_by("priority"),
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(result.row_count, 2);
        assert_eq!(result.items[0].id, 2);
    }

    #[tokio::test]
    async fn test_creation_cascades_one_stamp_over_both_collections() {
        let repo = customers(Vec::new());
        let cancel = CancellationToken::new();

        let mut root = customer(1, "Ada");
        root.addresses = vec![part(10), part(11)];
        root.contacts = vec![part(20), part(21), part(22)];

        let added = repo.add(root, true, &cancel).await.unwrap();
        assert_eq!(added.created.creation_time, start());
        assert_eq!(added.created.creator_id, "alice");

        let stored = repo.store().peek(&1).await.unwrap();
        let descendants: Vec<_> = stored.addresses.iter().chain(&stored.contacts).collect();
        assert_eq!(descendants.len(), 5);
        for descendant in descendants {
            assert_eq!(descendant.created, stored.created);
        }
    }

    #[tokio::test]
    async fn test_actor_resolved_once_per_top_level_call() {
        let repo =
            GenericRepository::new(InMemoryStore::<Customer>::new(), CountingActor::default()).unwrap();
        let cancel = CancellationToken::new();

        let batch: Vec<_> = (1..=3)
            .map(|id| {
                let mut c = customer(id, "x");
                c.addresses = vec![part(id * 100), part(id * 100 + 1)];
                c
            })
            .collect();
        let added = repo.add_many(batch, true, &cancel).await.unwrap();
        assert_eq!(repo.actors.calls.load(Ordering::SeqCst), 1);
        assert!(added.iter().all(|c| c.created.creator_id == "actor-1"));
        assert!(added
            .iter()
            .flat_map(|c| &c.addresses)
            .all(|p| p.created.creator_id == "actor-1"));

        repo.update_many(added.clone(), true, &cancel).await.unwrap();
        assert_eq!(repo.actors.calls.load(Ordering::SeqCst), 2);

        repo.remove_many(added, true, &cancel).await.unwrap();
        assert_eq!(repo.actors.calls.load(Ordering::SeqCst), 3);

        repo.add_many(Vec::new(), true, &cancel).await.unwrap();
        assert_eq!(repo.actors.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_row_but_keeps_it() {
        let repo = customers(Vec::new());
        let clock_start = start();
        let cancel = CancellationToken::new();

        let added = repo.add(customer(7, "Ada"), true, &cancel).await.unwrap();
        repo.remove(added, true, &cancel).await.unwrap();

        assert!(!repo.exists(&7, &cancel).await.unwrap());
        let err = repo.get_by_id(&7, &cancel).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
        assert_eq!(err.operation, RepositoryOperation::GetById);
        assert!(repo.get_all(&cancel).await.unwrap().is_empty());

        let row = repo.store().peek(&7).await.unwrap();
        assert!(row.deleted.is_deleted);
        assert_eq!(row.deleted.deleter_id.as_deref(), Some("alice"));
        assert_eq!(row.deleted.deletion_time, Some(clock_start));
        assert!(is_chronological(&row));
    }

    #[tokio::test]
    async fn test_soft_deleted_rows_excluded_from_paging() {
        let repo = customers(search_fixture());
        let cancel = CancellationToken::new();

        repo.remove_by_key(&1, true, &cancel).await.unwrap();
        let page = repo
            .get_paged(&PagedRequest::new().with_search("foo"), &cancel)
            .await
            .unwrap();
        assert_eq!(page.row_count, 11);
        assert_eq!(repo.store().len().await, 25);
    }

    #[tokio::test]
    async fn test_hard_delete_removes_row() {
        let repo =
            GenericRepository::new(InMemoryStore::<Memo>::new(), CountingActor::default()).unwrap();
        let cancel = CancellationToken::new();

        let added = repo.add(memo(1, 3), true, &cancel).await.unwrap();
        repo.remove(added, true, &cancel).await.unwrap();

        assert!(repo.store().peek(&1).await.is_none());
        assert!(repo.store().is_empty().await);
        // Only the add needed an actor
        assert_eq!(repo.actors.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_staged_writes_wait_for_save_changes() {
        let repo = customers(Vec::new());
        let cancel = CancellationToken::new();

        repo.add(customer(1, "Ada"), false, &cancel).await.unwrap();
        repo.add(customer(2, "Bob"), false, &cancel).await.unwrap();
        assert!(!repo.exists(&1, &cancel).await.unwrap());
        assert_eq!(repo.store().pending_len().await, 2);

        assert_eq!(repo.save_changes(&cancel).await.unwrap(), 2);
        assert!(repo.exists(&1, &cancel).await.unwrap());
        assert!(repo.exists(&2, &cancel).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_honors_auto_save_and_stamps_root_only() {
        let clock = ManualClock::new(start());
        let repo = GenericRepository::new(
            InMemoryStore::<Customer>::new(),
            StaticActor::new("alice".to_string()),
        )
        .unwrap()
        .with_clock(clock);
        let cancel = CancellationToken::new();

        let mut root = customer(1, "Ada");
        root.addresses = vec![part(10)];
        let mut added = repo.add(root, true, &cancel).await.unwrap();

        added.name = "Ada Lovelace".to_string();
        let updated = repo.update(added, true, &cancel).await.unwrap();

        let stored = repo.get_by_id(&1, &cancel).await.unwrap();
        assert_eq!(stored.name, "Ada Lovelace");
        assert_eq!(stored.modified.last_modifier_id.as_deref(), Some("alice"));
        assert_eq!(stored.modified.last_modification_time, Some(start()));
        assert_eq!(stored.addresses[0].created, updated.addresses[0].created);

        let mut deferred = stored.clone();
        deferred.score = 99;
        repo.update(deferred, false, &cancel).await.unwrap();
        assert_eq!(repo.get_by_id(&1, &cancel).await.unwrap().score, 0);
        repo.save_changes(&cancel).await.unwrap();
        assert_eq!(repo.get_by_id(&1, &cancel).await.unwrap().score, 99);
    }

    #[tokio::test]
    async fn test_update_many_defers_until_save_changes() {
        let repo = customers(vec![customer(1, "Ada"), customer(2, "Grace")]);
        let cancel = CancellationToken::new();

        let mut batch = repo.get_all(&cancel).await.unwrap();
        for row in &mut batch {
            row.score = i64::from(row.id) * 10;
        }
        let returned = repo.update_many(batch, false, &cancel).await.unwrap();
        assert!(returned
            .iter()
            .all(|c| c.modified.last_modification_time == Some(start())));

        assert_eq!(repo.store().pending_len().await, 2);
        for id in [1, 2] {
            let stored = repo.get_by_id(&id, &cancel).await.unwrap();
            assert_eq!(stored.score, 0);
            assert_eq!(stored.modified.last_modifier_id, None);
        }

        assert_eq!(repo.save_changes(&cancel).await.unwrap(), 2);
        assert_eq!(repo.store().pending_len().await, 0);
        for id in [1, 2] {
            let stored = repo.get_by_id(&id, &cancel).await.unwrap();
            assert_eq!(stored.score, i64::from(id) * 10);
            assert_eq!(stored.modified.last_modifier_id.as_deref(), Some("alice"));
            assert_eq!(stored.modified.last_modification_time, Some(start()));
        }
    }

    #[tokio::test]
    async fn test_modification_follows_clock() {
        let repo = customers(Vec::new());
        let cancel = CancellationToken::new();
        let added = repo.add(customer(1, "Ada"), true, &cancel).await.unwrap();

        let later = GenericRepository::new(
            InMemoryStore::with_rows(vec![added.clone()]),
            StaticActor::new("bob".to_string()),
        )
        .unwrap()
        .with_clock(ManualClock::new(start() + Duration::hours(2)));
        let updated = later.update(added, true, &cancel).await.unwrap();

        assert_eq!(
            updated.modified.last_modification_time,
            Some(start() + Duration::hours(2))
        );
        assert!(is_chronological(&updated));
    }

    #[tokio::test]
    async fn test_keyed_lookups_fail_with_not_found() {
        let repo = customers(vec![customer(1, "Ada")]);
        let cancel = CancellationToken::new();

        let err = repo.get_by_id(&9, &cancel).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.entity_id.as_deref(), Some("9"));

        let err = repo.remove_by_key(&9, true, &cancel).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.operation, RepositoryOperation::RemoveByKey);

        let err = repo
            .first_or_default(|c: &Customer| c.name == "Nobody", &cancel)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.operation, RepositoryOperation::FirstOrDefault);

        let found = repo
            .find(|c: &Customer| c.name == "Nobody", &cancel)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_find_and_first_or_default_with_specifications() {
        use crate::domain::SpecificationExt;

        let repo = customers(search_fixture());
        let cancel = CancellationToken::new();

        let low_id = |c: &Customer| c.id <= 3;
        let bar = |c: &Customer| c.name.ends_with("-bar");
        let found = repo.find(low_id.or(bar), &cancel).await.unwrap();
        assert_eq!(found.len(), 3 + 13);

        let first = repo
            .first_or_default(|c: &Customer| c.name.ends_with("-bar"), &cancel)
            .await
            .unwrap();
        assert_eq!(first.id, 13);
    }

    #[tokio::test]
    async fn test_duplicate_add_fails_at_commit() {
        let repo = customers(vec![customer(1, "Ada")]);
        let cancel = CancellationToken::new();

        let err = repo.add(customer(1, "Again"), true, &cancel).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::AlreadyExists);
        assert_eq!(repo.get_by_id(&1, &cancel).await.unwrap().name, "Ada");
    }

    #[tokio::test]
    async fn test_cancellation_stops_actor_resolution() {
        let repo = GenericRepository::new(InMemoryStore::<Customer>::new(), StuckActor).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = repo.add(customer(1, "Ada"), true, &cancel).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::Cancelled);
        assert_eq!(err.operation, RepositoryOperation::ResolveActor);
        assert_eq!(repo.store().pending_len().await, 0);
    }

    #[tokio::test]
    async fn test_cancellation_reaches_reads() {
        let repo = customers(vec![customer(1, "Ada")]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = repo.get_all(&cancel).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::Cancelled);
    }

    async fn live_count<R: AggregateRepository<Customer>>(repo: &R) -> usize {
        repo.get_all(&CancellationToken::new()).await.unwrap().len()
    }

    #[tokio::test]
    async fn test_engine_serves_aggregate_flavor() {
        let repo = customers(vec![customer(1, "Ada"), customer(2, "Bob")]);
        assert_eq!(live_count(&repo).await, 2);
    }

    #[test]
    fn test_bind_rejects_malformed_fields() {
        #[derive(Debug, Clone)]
        struct Broken {
            id: u32,
            events: DomainEvents,
        }

        impl Entity for Broken {
            type Id = u32;
            fn id(&self) -> &u32 {
                &self.id
            }
            fn events(&self) -> &DomainEvents {
                &self.events
            }
            fn events_mut(&mut self) -> &mut DomainEvents {
                &mut self.events
            }
        }

        impl Auditable for Broken {
            type ActorId = String;
        }

        impl Queryable for Broken {
            fn fields() -> FieldRegistryBuilder<Self> {
                FieldRegistryBuilder::new().integer("1st", |b: &Broken| i64::from(b.id))
            }
        }

        let result = GenericRepository::new(
            InMemoryStore::<Broken>::new(),
            StaticActor::new("alice".to_string()),
        );
        let err = result.err().unwrap();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidField);
    }
}
