//! Schema-checked module data held in process memory.

use std::collections::HashMap;
use std::fmt;
use std::slice;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value};
use time::OffsetDateTime;
use tracing::debug;

use super::events::EventHub;
use super::path::{Locator, key_matches, locate, locate_mut, resolve, scalar_matches};
use super::schema::{ModuleSchema, SchemaNode, find};
use crate::errors::TreeError;
use crate::meta::{NodeKind, NodeMeta};
use crate::notification::{Notification, NotifyCallback, NotifyCloser};
use crate::scope::RequestScope;
use crate::selection::{Browser, Payload, Selection, TreeData, ValueNode};

const MEMORY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::memory");

/// Arguments passed to an action handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    /// Path of the invoked action relative to the module root, list keys
    /// included.
    pub target: String,
    /// Decoded input, if the request carried any.
    pub input: Option<Payload>,
}

/// Implementation of an rpc or action.
pub type ActionHandler =
    Arc<dyn Fn(ActionRequest) -> Result<Option<Value>, TreeError> + Send + Sync>;

/// One module's schema, data, action handlers and event listeners.
pub struct MemoryModule {
    schema: ModuleSchema,
    data: RwLock<Value>,
    actions: RwLock<HashMap<String, ActionHandler>>,
    events: Arc<EventHub>,
}

impl fmt::Debug for MemoryModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryModule")
            .field("schema", &self.schema.name)
            .finish_non_exhaustive()
    }
}

impl MemoryModule {
    /// Creates a module with no data.
    #[must_use]
    pub fn new(schema: ModuleSchema) -> Self {
        Self {
            schema,
            data: RwLock::new(Value::Object(Map::new())),
            actions: RwLock::new(HashMap::new()),
            events: Arc::new(EventHub::default()),
        }
    }

    /// Seeds the module with `data`, checked against the schema.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidInput`] when `data` is not an object or
    /// names nodes the schema does not define.
    pub fn with_data(self, data: Value) -> Result<Self, TreeError> {
        let Value::Object(map) = data else {
            return Err(TreeError::invalid_input(format!(
                "data for module '{}' must be an object",
                self.schema.name
            )));
        };
        validate(&self.schema.nodes, &map)?;
        *self.write() = Value::Object(map);
        Ok(self)
    }

    /// Module schema.
    #[must_use]
    pub const fn schema(&self) -> &ModuleSchema {
        &self.schema
    }

    /// Name of the module.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    /// Copy of the current data.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        self.read().clone()
    }

    /// Installs the handler for the action at `path`.
    ///
    /// `path` may name any entry of the enclosing lists; one handler serves
    /// every entry.
    ///
    /// # Errors
    ///
    /// Fails when `path` does not name an action.
    pub fn on_action<F>(&self, path: &str, handler: F) -> Result<(), TreeError>
    where
        F: Fn(ActionRequest) -> Result<Option<Value>, TreeError> + Send + Sync + 'static,
    {
        let resolved = resolve(&self.schema, path)?;
        if !resolved.meta.is_action() {
            return Err(TreeError::invalid_input(format!("'{path}' is not an action")));
        }
        self.actions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(resolved.schema_path, Arc::new(handler));
        Ok(())
    }

    /// Raises the notification at `path` with the current time.
    ///
    /// Returns how many subscribers received it.
    ///
    /// # Errors
    ///
    /// Fails when `path` does not name a notification.
    pub fn publish(&self, path: &str, event: Value) -> Result<usize, TreeError> {
        self.publish_at(path, OffsetDateTime::now_utc(), event)
    }

    /// Raises the notification at `path` with an explicit event time.
    ///
    /// # Errors
    ///
    /// Fails when `path` does not name a notification.
    pub fn publish_at(
        &self,
        path: &str,
        event_time: OffsetDateTime,
        event: Value,
    ) -> Result<usize, TreeError> {
        let resolved = resolve(&self.schema, path)?;
        if !resolved.meta.is_notification() {
            return Err(TreeError::invalid_input(format!(
                "'{path}' is not a notification"
            )));
        }
        let node = ValueNode::new(resolved.meta, event);
        let notification = Notification::at(event_time, Arc::new(node));
        let delivered = self.events.publish(&resolved.schema_path, &notification);
        debug!(
            target: MEMORY_TARGET,
            module = %self.schema.name,
            path,
            delivered,
            "published notification"
        );
        Ok(delivered)
    }

    /// Number of live subscriptions to the notification at `path`.
    #[must_use]
    pub fn subscriber_count(&self, path: &str) -> usize {
        resolve(&self.schema, path)
            .map(|resolved| self.events.listener_count(&resolved.schema_path))
            .unwrap_or(0)
    }

    /// Browser over this module.
    #[must_use]
    pub fn browser(self: &Arc<Self>) -> Arc<dyn Browser> {
        Arc::new(MemoryBrowser {
            module: Arc::clone(self),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Value> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Value> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn handler(&self, schema_path: &str) -> Option<ActionHandler> {
        self.actions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(schema_path)
            .cloned()
    }
}

struct MemoryBrowser {
    module: Arc<MemoryModule>,
}

impl Browser for MemoryBrowser {
    fn module(&self) -> &str {
        self.module.name()
    }

    fn select(
        &self,
        path: &str,
        scope: &RequestScope,
    ) -> Result<Option<Arc<dyn Selection>>, TreeError> {
        let resolved = resolve(&self.module.schema, path)?;
        let is_data = !(resolved.meta.is_action() || resolved.meta.is_notification());
        if is_data && locate(&self.module.read(), &resolved.locators).is_none() {
            debug!(
                target: MEMORY_TARGET,
                module = %self.module.schema.name,
                path,
                remote = ?scope.remote_host(),
                "no data at path"
            );
            return Ok(None);
        }

        Ok(Some(Arc::new(MemorySelection {
            module: Arc::clone(&self.module),
            meta: resolved.meta,
            locators: resolved.locators,
            schema_path: resolved.schema_path,
            node: resolved.node.cloned(),
            target: path.trim_matches('/').to_owned(),
        })))
    }
}

struct MemorySelection {
    module: Arc<MemoryModule>,
    meta: NodeMeta,
    locators: Vec<Locator>,
    schema_path: String,
    node: Option<SchemaNode>,
    target: String,
}

impl MemorySelection {
    fn refuse(&self, verb: &str) -> TreeError {
        TreeError::unsupported(format!(
            "cannot {verb} '{}:{}'",
            self.meta.module(),
            self.meta.ident()
        ))
    }

    fn gone(&self) -> TreeError {
        TreeError::not_found(format!("'{}' no longer exists", self.target))
    }

    /// Object the write applies to and the definitions valid inside it.
    ///
    /// Leaves and whole lists are written through their parent, with the
    /// payload naming the node itself.
    fn write_scope(&self) -> Result<(&[Locator], &[SchemaNode]), TreeError> {
        match (&self.node, self.meta.kind()) {
            (None, _) => Ok((self.locators.as_slice(), self.module.schema.nodes.as_slice())),
            (Some(node), NodeKind::Leaf | NodeKind::List) => {
                let parent = self
                    .locators
                    .split_last()
                    .map_or(&[][..], |(_, parent)| parent);
                Ok((parent, slice::from_ref(node)))
            }
            (Some(node), NodeKind::Container | NodeKind::ListEntry) => {
                Ok((self.locators.as_slice(), node.children()))
            }
            (Some(_), NodeKind::Action { .. } | NodeKind::Notification) => {
                Err(self.refuse("write"))
            }
        }
    }

    fn check_payload(&self, children: &[SchemaNode], payload: &Payload) -> Result<(), TreeError> {
        validate(children, payload)?;
        if matches!(self.meta.kind(), NodeKind::Leaf | NodeKind::List)
            && !payload.contains_key(self.meta.ident())
        {
            return Err(TreeError::invalid_input(format!(
                "payload must contain '{}'",
                self.meta.ident()
            )));
        }
        if self.meta.kind() == NodeKind::ListEntry
            && let Some(Locator::Entry { key, value }) = self.locators.last()
            && let Some(given) = payload.get(key)
            && !scalar_matches(given, value)
        {
            return Err(TreeError::invalid_input(format!(
                "key '{key}' cannot change from '{value}' to {given}"
            )));
        }
        Ok(())
    }

    fn modify<F>(&self, locators: &[Locator], apply: F) -> Result<(), TreeError>
    where
        F: FnOnce(&mut Map<String, Value>) -> Result<(), TreeError>,
    {
        let mut data = self.module.write();
        let slot = locate_mut(&mut data, locators).ok_or_else(|| self.gone())?;
        let object = slot.as_object_mut().ok_or_else(|| {
            TreeError::internal(format!("data at '{}' is not an object", self.target))
        })?;
        let mut staged = object.clone();
        apply(&mut staged)?;
        *object = staged;
        debug!(
            target: MEMORY_TARGET,
            module = %self.module.schema.name,
            path = %self.target,
            "applied write"
        );
        Ok(())
    }
}

impl TreeData for MemorySelection {
    fn meta(&self) -> &NodeMeta {
        &self.meta
    }

    fn content(&self) -> Result<Value, TreeError> {
        if self.meta.is_action() || self.meta.is_notification() {
            return Err(self.refuse("read"));
        }
        locate(&self.module.read(), &self.locators)
            .cloned()
            .ok_or_else(|| self.gone())
    }
}

impl Selection for MemorySelection {
    fn delete(&self) -> Result<(), TreeError> {
        if self.meta.is_action() || self.meta.is_notification() {
            return Err(self.refuse("delete"));
        }
        let mut data = self.module.write();
        let Some((last, parent)) = self.locators.split_last() else {
            *data = Value::Object(Map::new());
            return Ok(());
        };
        let parent = locate_mut(&mut data, parent).ok_or_else(|| self.gone())?;
        let removed = match last {
            Locator::Field(name) => parent
                .as_object_mut()
                .and_then(|object| object.remove(name))
                .is_some(),
            Locator::Entry { key, value } => parent.as_array_mut().is_some_and(|entries| {
                let before = entries.len();
                entries.retain(|entry| !key_matches(entry, key, value));
                entries.len() != before
            }),
        };
        if removed { Ok(()) } else { Err(self.gone()) }
    }

    fn insert_from(&self, payload: Payload) -> Result<(), TreeError> {
        let (locators, children) = self.write_scope()?;
        self.check_payload(children, &payload)?;
        self.modify(locators, |object| create(object, payload, children))
    }

    fn upsert_from(&self, payload: Payload) -> Result<(), TreeError> {
        let (locators, children) = self.write_scope()?;
        self.check_payload(children, &payload)?;
        self.modify(locators, |object| {
            merge(object, payload, children);
            Ok(())
        })
    }

    fn replace_from(&self, mut payload: Payload) -> Result<(), TreeError> {
        let (locators, children) = self.write_scope()?;
        self.check_payload(children, &payload)?;
        let ident = self.meta.ident().to_owned();
        match (self.meta.kind(), self.locators.last()) {
            (NodeKind::Leaf | NodeKind::List, _) => self.modify(locators, |object| {
                if let Some(value) = payload.remove(&ident) {
                    object.insert(ident, value);
                }
                Ok(())
            }),
            (NodeKind::ListEntry, Some(Locator::Entry { key, value })) => {
                self.modify(locators, |object| {
                    if !payload.contains_key(key) {
                        let key_value = object
                            .get(key)
                            .cloned()
                            .unwrap_or_else(|| Value::String(value.clone()));
                        payload.insert(key.clone(), key_value);
                    }
                    *object = payload;
                    Ok(())
                })
            }
            _ => self.modify(locators, |object| {
                *object = payload;
                Ok(())
            }),
        }
    }

    fn action(&self, input: Option<Payload>) -> Result<Option<Box<dyn TreeData>>, TreeError> {
        if !self.meta.is_action() {
            return Err(self.refuse("invoke"));
        }
        let handler = self.module.handler(&self.schema_path).ok_or_else(|| {
            TreeError::unsupported(format!(
                "no handler registered for '{}:{}'",
                self.meta.module(),
                self.schema_path
            ))
        })?;
        let output = handler(ActionRequest {
            target: self.target.clone(),
            input,
        })?;

        Ok(output.filter(|_| self.meta.has_output()).map(|value| {
            let mut meta = NodeMeta::new(
                self.meta.module(),
                "output",
                NodeKind::Container,
                self.meta.depth() + 1,
            );
            if let Some(namespace) = self.meta.namespace() {
                meta = meta.with_namespace(namespace);
            }
            Box::new(ValueNode::new(meta, value)) as Box<dyn TreeData>
        }))
    }

    fn subscribe(&self, callback: NotifyCallback) -> Result<NotifyCloser, TreeError> {
        if !self.meta.is_notification() {
            return Err(self.refuse("subscribe to"));
        }
        debug!(
            target: MEMORY_TARGET,
            module = %self.module.schema.name,
            path = %self.target,
            "registered subscriber"
        );
        Ok(self.module.events.register(&self.schema_path, callback))
    }
}

fn entries(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn into_entries(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

fn key_text(value: Option<&Value>) -> Option<String> {
    value.map(|value| match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    })
}

/// Checks that every member of `payload` names a data node in `children`
/// and has the right shape.
pub(crate) fn validate(children: &[SchemaNode], payload: &Map<String, Value>) -> Result<(), TreeError> {
    for (name, value) in payload {
        let node = find(children, name)
            .filter(|node| node.is_data())
            .ok_or_else(|| TreeError::invalid_input(format!("unexpected member '{name}'")))?;
        match node {
            SchemaNode::Container { children, .. } => {
                let object = value.as_object().ok_or_else(|| {
                    TreeError::invalid_input(format!("container '{name}' expects an object"))
                })?;
                validate(children, object)?;
            }
            SchemaNode::List { key, children, .. } => {
                for entry in entries(value) {
                    let object = entry.as_object().ok_or_else(|| {
                        TreeError::invalid_input(format!("entries of '{name}' must be objects"))
                    })?;
                    if !object.contains_key(key) {
                        return Err(TreeError::invalid_input(format!(
                            "entry of '{name}' is missing key '{key}'"
                        )));
                    }
                    validate(children, object)?;
                }
            }
            _ if value.is_object() || value.is_array() => {
                return Err(TreeError::invalid_input(format!(
                    "leaf '{name}' expects a scalar"
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

fn merge(target: &mut Map<String, Value>, incoming: Map<String, Value>, children: &[SchemaNode]) {
    for (name, value) in incoming {
        match find(children, &name) {
            Some(SchemaNode::Container { children, .. }) => {
                if let Value::Object(object) = value {
                    if let Some(Value::Object(existing)) = target.get_mut(&name) {
                        merge(existing, object, children);
                        continue;
                    }
                    target.insert(name, Value::Object(object));
                } else {
                    target.insert(name, value);
                }
            }
            Some(SchemaNode::List { key, children, .. }) => {
                let slot = target
                    .entry(name)
                    .or_insert_with(|| Value::Array(Vec::new()));
                if !slot.is_array() {
                    *slot = Value::Array(Vec::new());
                }
                if let Value::Array(existing) = slot {
                    for entry in into_entries(value) {
                        merge_entry(existing, entry, key, children);
                    }
                }
            }
            _ => {
                target.insert(name, value);
            }
        }
    }
}

fn merge_entry(existing: &mut Vec<Value>, entry: Value, key: &str, children: &[SchemaNode]) {
    let Value::Object(object) = entry else {
        existing.push(entry);
        return;
    };
    if let Some(wanted) = key_text(object.get(key))
        && let Some(Value::Object(current)) = existing
            .iter_mut()
            .find(|item| key_matches(item, key, &wanted))
    {
        merge(current, object, children);
        return;
    }
    existing.push(Value::Object(object));
}

fn create(
    target: &mut Map<String, Value>,
    incoming: Map<String, Value>,
    children: &[SchemaNode],
) -> Result<(), TreeError> {
    for (name, value) in incoming {
        if let Some(SchemaNode::List { key, .. }) = find(children, &name) {
            let slot = target
                .entry(name.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            let Value::Array(existing) = slot else {
                return Err(TreeError::internal(format!("'{name}' is not a list")));
            };
            for entry in into_entries(value) {
                let wanted = key_text(entry.get(key)).unwrap_or_default();
                if existing.iter().any(|item| key_matches(item, key, &wanted)) {
                    return Err(TreeError::conflict(format!("'{name}={wanted}' already exists")));
                }
                existing.push(entry);
            }
        } else {
            if target.contains_key(&name) {
                return Err(TreeError::conflict(format!("'{name}' already exists")));
            }
            target.insert(name, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;

    #[fixture]
    fn module() -> Arc<MemoryModule> {
        let schema = ModuleSchema::new("acme", "urn:acme")
            .with_node(SchemaNode::container(
                "system",
                vec![
                    SchemaNode::leaf("hostname"),
                    SchemaNode::leaf("contact"),
                    SchemaNode::list(
                        "interface",
                        "name",
                        vec![
                            SchemaNode::leaf("name"),
                            SchemaNode::leaf("mtu"),
                            SchemaNode::action("reset", None, Some(vec![])),
                        ],
                    ),
                ],
            ))
            .with_node(SchemaNode::action("reboot", Some(vec![]), None))
            .with_node(SchemaNode::notification(
                "alarm",
                vec![SchemaNode::leaf("severity")],
            ));
        let module = MemoryModule::new(schema)
            .with_data(json!({
                "system": {
                    "hostname": "edge-1",
                    "interface": [{"name": "eth0", "mtu": 1500}]
                }
            }))
            .expect("seed data matches schema");
        Arc::new(module)
    }

    fn select(module: &Arc<MemoryModule>, path: &str) -> Option<Arc<dyn Selection>> {
        module
            .browser()
            .select(path, &RequestScope::default())
            .expect("path is valid")
    }

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            other => panic!("payload must be an object, got {other}"),
        }
    }

    #[rstest]
    fn missing_data_selects_nothing(module: Arc<MemoryModule>) {
        assert!(select(&module, "system/contact").is_none());
        assert!(select(&module, "system/interface=eth9").is_none());
        assert!(select(&module, "system/hostname").is_some());
    }

    #[rstest]
    fn upsert_merges_list_entries_by_key(module: Arc<MemoryModule>) {
        let system = select(&module, "system").expect("system exists");
        system
            .upsert_from(payload(json!({
                "contact": "noc",
                "interface": [{"name": "eth0", "mtu": 9000}, {"name": "eth1"}]
            })))
            .expect("merge succeeds");

        assert_eq!(
            module.snapshot(),
            json!({"system": {
                "hostname": "edge-1",
                "interface": [{"name": "eth0", "mtu": 9000}, {"name": "eth1"}],
                "contact": "noc"
            }})
        );
    }

    #[rstest]
    fn insert_reports_conflicts_without_partial_writes(module: Arc<MemoryModule>) {
        let system = select(&module, "system").expect("system exists");
        let error = system
            .insert_from(payload(json!({"contact": "noc", "hostname": "edge-2"})))
            .expect_err("hostname already exists");
        assert!(matches!(error, TreeError::Conflict { .. }));
        assert!(module.snapshot()["system"].get("contact").is_none());
    }

    #[rstest]
    fn replace_on_leaf_writes_through_parent(module: Arc<MemoryModule>) {
        let leaf = select(&module, "system/hostname").expect("leaf exists");
        leaf.replace_from(payload(json!({"hostname": "edge-9"})))
            .expect("replace succeeds");
        assert_eq!(module.snapshot()["system"]["hostname"], json!("edge-9"));
    }

    #[rstest]
    fn replace_on_entry_keeps_key(module: Arc<MemoryModule>) {
        let entry = select(&module, "system/interface=eth0").expect("entry exists");
        entry
            .replace_from(payload(json!({"mtu": 1400})))
            .expect("replace succeeds");
        assert_eq!(
            module.snapshot()["system"]["interface"],
            json!([{"mtu": 1400, "name": "eth0"}])
        );
    }

    #[rstest]
    fn unknown_members_are_rejected(module: Arc<MemoryModule>) {
        let system = select(&module, "system").expect("system exists");
        let error = system
            .upsert_from(payload(json!({"colour": "blue"})))
            .expect_err("colour is not modelled");
        assert_eq!(error, TreeError::invalid_input("unexpected member 'colour'"));
    }

    #[rstest]
    fn delete_removes_list_entry(module: Arc<MemoryModule>) {
        let entry = select(&module, "system/interface=eth0").expect("entry exists");
        entry.delete().expect("delete succeeds");
        assert_eq!(module.snapshot()["system"]["interface"], json!([]));
        assert!(matches!(entry.delete(), Err(TreeError::NotFound { .. })));
    }

    #[rstest]
    fn action_output_is_wrapped_in_output_node(module: Arc<MemoryModule>) {
        module
            .on_action("system/interface=any/reset", |request| {
                Ok(Some(json!({"target": request.target})))
            })
            .expect("reset is an action");
        let action = select(&module, "system/interface=eth0/reset").expect("actions select");
        let output = action
            .action(None)
            .expect("handler runs")
            .expect("reset declares output");
        assert_eq!(output.meta().ident(), "output");
        assert_eq!(output.meta().depth(), 5);
        assert_eq!(
            output.content(),
            Ok(json!({"target": "system/interface=eth0/reset"}))
        );
    }

    #[rstest]
    fn output_is_dropped_when_not_declared(module: Arc<MemoryModule>) {
        module
            .on_action("reboot", |_| Ok(Some(json!({"ignored": true}))))
            .expect("reboot is an action");
        let action = select(&module, "reboot").expect("actions select");
        assert!(action.action(None).expect("handler runs").is_none());
    }

    #[rstest]
    fn missing_handler_is_unsupported(module: Arc<MemoryModule>) {
        let action = select(&module, "reboot").expect("actions select");
        assert!(matches!(
            action.action(None),
            Err(TreeError::Unsupported { .. })
        ));
    }

    #[rstest]
    fn subscribers_receive_events_until_closed(module: Arc<MemoryModule>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let alarm = select(&module, "alarm").expect("notifications select");
        let closer = alarm
            .subscribe(Arc::new(move |notification: Notification| {
                let content = notification.event.content().expect("event content");
                sink.lock().expect("lock").push(content);
            }))
            .expect("alarm is a notification");

        assert_eq!(module.subscriber_count("alarm"), 1);
        assert_eq!(module.publish("alarm", json!({"severity": "major"})), Ok(1));
        closer.close();
        assert_eq!(module.publish("alarm", json!({"severity": "minor"})), Ok(0));
        assert_eq!(module.subscriber_count("alarm"), 0);
        assert_eq!(
            *seen.lock().expect("lock"),
            vec![json!({"severity": "major"})]
        );
    }

    #[rstest]
    fn data_nodes_cannot_be_subscribed(module: Arc<MemoryModule>) {
        let system = select(&module, "system").expect("system exists");
        let result = system.subscribe(Arc::new(|_: Notification| {}));
        assert!(matches!(result, Err(TreeError::Unsupported { .. })));
    }
}
