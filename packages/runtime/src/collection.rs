//! Entity collections: an untyped core plus a typed view.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock, Weak};

use crate::context::ClientContext;
use crate::error::{Error, Result};
use crate::object::ClientObject;
use crate::path::{Parameters, ResourcePath};
use crate::query::{CreateEntityQuery, ReadQuery};
use crate::schema::{Entity, EntitySchema};
use crate::sync::{read, write};

#[derive(Default)]
struct CollectionState {
    path: Option<ResourcePath>,
    items: Vec<ClientObject>,
    loaded: bool,
    next_link: Option<String>,
}

struct CollectionInner {
    context: ClientContext,
    item_schema: &'static EntitySchema,
    state: RwLock<CollectionState>,
}

/// Ordered, homogeneous set of client objects sharing a path.
#[derive(Clone)]
pub struct EntityCollection {
    inner: Arc<CollectionInner>,
}

/// Back-reference from an item to the collection that owns it.
#[derive(Clone)]
pub(crate) struct WeakCollection(Weak<CollectionInner>);

impl WeakCollection {
    pub(crate) fn upgrade(&self) -> Option<EntityCollection> {
        self.0.upgrade().map(|inner| EntityCollection { inner })
    }
}

impl EntityCollection {
    pub fn new(
        context: &ClientContext,
        item_schema: &'static EntitySchema,
        path: Option<ResourcePath>,
    ) -> Self {
        Self {
            inner: Arc::new(CollectionInner {
                context: context.clone(),
                item_schema,
                state: RwLock::new(CollectionState {
                    path,
                    ..Default::default()
                }),
            }),
        }
    }

    pub fn context(&self) -> &ClientContext {
        &self.inner.context
    }

    pub fn item_schema(&self) -> &'static EntitySchema {
        self.inner.item_schema
    }

    pub fn resource_path(&self) -> Option<ResourcePath> {
        read(&self.inner.state).path.clone()
    }

    pub(crate) fn require_path(&self) -> Result<ResourcePath> {
        self.resource_path().ok_or_else(|| Error::NotAddressable {
            entity_type: self.inner.item_schema.entity_type_name.to_string(),
        })
    }

    pub(crate) fn set_resource_path(&self, path: ResourcePath) {
        let items = {
            let mut state = write(&self.inner.state);
            if state.path.as_ref() == Some(&path) {
                return;
            }
            state.path = Some(path);
            state.items.clone()
        };
        for item in items {
            item.resolve_identity();
        }
    }

    pub fn ptr_eq(&self, other: &EntityCollection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakCollection {
        WeakCollection(Arc::downgrade(&self.inner))
    }

    /// Append `item` and link it back to this collection.
    pub fn add_child(&self, item: &ClientObject) {
        write(&self.inner.state).items.push(item.clone());
        item.attach_to(self);
    }

    /// Returns true when `item` was present.
    pub fn remove_child(&self, item: &ClientObject) -> bool {
        let removed = {
            let mut state = write(&self.inner.state);
            let before = state.items.len();
            state.items.retain(|existing| !existing.ptr_eq(item));
            state.items.len() != before
        };
        if removed {
            item.detach();
        }
        removed
    }

    /// Proxy for the item with `key`. Membership is unchanged.
    pub fn get_by_key(&self, key: &str) -> ClientObject {
        let schema = self.inner.item_schema;
        let path = self
            .resource_path()
            .map(|collection| schema.key_path(&collection, key));
        let item = ClientObject::new(self.context(), schema, path);
        item.seed_key(key);
        item.attach_to(self);
        item
    }

    /// Proxy addressed by a service operation on this collection.
    pub fn get_by_operation(&self, name: &str, parameters: Parameters) -> ClientObject {
        let path = self
            .resource_path()
            .map(|collection| collection.operation(name, Some(parameters)));
        ClientObject::new(self.context(), self.inner.item_schema, path)
    }

    pub fn is_loaded(&self) -> bool {
        read(&self.inner.state).loaded
    }

    /// Link to the next server page, if the last page had one.
    pub fn next_link(&self) -> Option<String> {
        read(&self.inner.state).next_link.clone()
    }

    fn not_loaded(&self) -> Error {
        Error::CollectionNotLoaded {
            entity_type: self.inner.item_schema.entity_type_name.to_string(),
        }
    }

    /// Current members. Fails until a read has bound this collection.
    pub fn items(&self) -> Result<Vec<ClientObject>> {
        let state = read(&self.inner.state);
        if !state.loaded {
            return Err(self.not_loaded());
        }
        Ok(state.items.clone())
    }

    pub fn len(&self) -> Result<usize> {
        let state = read(&self.inner.state);
        if !state.loaded {
            return Err(self.not_loaded());
        }
        Ok(state.items.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|n| n == 0)
    }

    pub fn load(&self) -> &Self {
        self.context()
            .add_query(ReadQuery::collection(self.clone()).into());
        self
    }

    pub fn load_top(&self, top: usize) -> &Self {
        self.context()
            .add_query(ReadQuery::collection(self.clone()).top(top).into());
        self
    }

    /// Queue a read of the next page; its items are appended on bind.
    /// Returns false when there is no further page.
    pub fn load_next_page(&self) -> bool {
        match self.next_link() {
            Some(link) => {
                self.context()
                    .add_query(ReadQuery::next_page(self.clone(), link).into());
                true
            }
            None => false,
        }
    }

    /// Add `item` locally and queue its creation on the server.
    pub fn create(&self, item: &ClientObject) -> &Self {
        self.add_child(item);
        self.context()
            .add_query(CreateEntityQuery::new(self.clone(), item.clone()).into());
        self
    }

    pub fn execute_query(&self) -> Result<()> {
        self.context().execute_query()
    }

    /// Bind one page of response items. Replaces the members unless
    /// `append` is set.
    pub(crate) fn bind_items(
        &self,
        values: Vec<serde_json::Value>,
        next_link: Option<String>,
        append: bool,
    ) {
        let items = values
            .iter()
            .map(|value| {
                let item = ClientObject::new(self.context(), self.inner.item_schema, None);
                item.bind_json(value);
                item
            })
            .collect::<Vec<_>>();

        {
            let mut state = write(&self.inner.state);
            if !append {
                state.items.clear();
            }
            state.items.extend(items.iter().cloned());
            state.loaded = true;
            state.next_link = next_link;
        }

        for item in &items {
            item.attach_to(self);
        }
    }
}

impl fmt::Debug for EntityCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = read(&self.inner.state);
        f.debug_struct("EntityCollection")
            .field("item_type", &self.inner.item_schema.entity_type_name)
            .field("path", &state.path)
            .field("loaded", &state.loaded)
            .field("len", &state.items.len())
            .finish()
    }
}

/// Typed view over an [`EntityCollection`] of `T`.
pub struct ClientObjectCollection<T> {
    raw: EntityCollection,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ClientObjectCollection<T> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ClientObjectCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.raw.fmt(f)
    }
}

impl<T: Entity> ClientObjectCollection<T> {
    pub fn new(context: &ClientContext, path: Option<ResourcePath>) -> Self {
        Self {
            raw: EntityCollection::new(context, T::schema(), path),
            _marker: PhantomData,
        }
    }

    pub fn at(context: &ClientContext, path: ResourcePath) -> Self {
        Self::new(context, Some(path))
    }

    pub fn from_raw(raw: EntityCollection) -> Result<Self> {
        if !raw.item_schema().same_as(T::schema()) {
            return Err(Error::SchemaMismatch {
                expected: T::schema().entity_type_name,
                actual: raw.item_schema().entity_type_name,
            });
        }
        Ok(Self {
            raw,
            _marker: PhantomData,
        })
    }

    pub fn raw(&self) -> &EntityCollection {
        &self.raw
    }

    pub fn context(&self) -> &ClientContext {
        self.raw.context()
    }

    pub fn resource_path(&self) -> Option<ResourcePath> {
        self.raw.resource_path()
    }

    pub fn add_child(&self, item: &T) {
        self.raw.add_child(item.object());
    }

    pub fn remove_child(&self, item: &T) -> bool {
        self.raw.remove_child(item.object())
    }

    /// Item addressed by its key, e.g. `contacts/{id}`.
    pub fn get_by_id(&self, id: &str) -> T {
        T::from_object(self.raw.get_by_key(id))
    }

    /// Item addressed by `GetByUrl('{url}')`.
    pub fn get_by_url(&self, url: &str) -> T {
        self.get_by_operation("GetByUrl", Parameters::positional([url]))
    }

    pub fn get_by_operation(&self, name: &str, parameters: Parameters) -> T {
        T::from_object(self.raw.get_by_operation(name, parameters))
    }

    pub fn is_loaded(&self) -> bool {
        self.raw.is_loaded()
    }

    pub fn next_link(&self) -> Option<String> {
        self.raw.next_link()
    }

    pub fn items(&self) -> Result<Vec<T>> {
        Ok(self.raw.items()?.into_iter().map(T::from_object).collect())
    }

    pub fn iter(&self) -> Result<std::vec::IntoIter<T>> {
        Ok(self.items()?.into_iter())
    }

    pub fn len(&self) -> Result<usize> {
        self.raw.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.raw.is_empty()
    }

    pub fn load(&self) -> &Self {
        self.raw.load();
        self
    }

    pub fn load_top(&self, top: usize) -> &Self {
        self.raw.load_top(top);
        self
    }

    pub fn load_next_page(&self) -> bool {
        self.raw.load_next_page()
    }

    /// Queue creation of `item` in this collection.
    pub fn add(&self, item: &T) -> &Self {
        self.raw.create(item.object());
        self
    }

    pub fn execute_query(&self) -> Result<()> {
        self.raw.execute_query()
    }
}
