//! The `acme` reference device used across the gateway suites.

use std::sync::Arc;

use restconf_tree::memory::{MemoryDevice, MemoryDeviceMap, MemoryModule, ModuleSchema, SchemaNode};
use serde_json::{Value, json};

use crate::gateway::Gateway;
use crate::notify::SubscriptionCounter;

/// Schema: a `system` container, an `interface` list keyed by `name` with a
/// `reset` action, a `reboot` rpc and an `alarm` notification.
pub fn acme_module(hostname: &str) -> Arc<MemoryModule> {
    let schema = ModuleSchema::new("acme", "urn:acme")
        .with_node(SchemaNode::container(
            "system",
            vec![
                SchemaNode::leaf("hostname"),
                SchemaNode::leaf("location"),
                SchemaNode::leaf("max-age"),
            ],
        ))
        .with_node(SchemaNode::list(
            "interface",
            "name",
            vec![
                SchemaNode::leaf("name"),
                SchemaNode::leaf("mtu"),
                SchemaNode::action("reset", None, None),
            ],
        ))
        .with_node(SchemaNode::action(
            "reboot",
            Some(vec![SchemaNode::leaf("delay")]),
            Some(vec![SchemaNode::leaf("scheduled")]),
        ))
        .with_node(SchemaNode::notification(
            "alarm",
            vec![SchemaNode::leaf("severity")],
        ));
    let module = MemoryModule::new(schema)
        .with_data(json!({
            "system": {"hostname": hostname},
            "interface": [{"name": "eth0", "mtu": 1500}]
        }))
        .expect("seed data fits the schema");
    module
        .on_action("reboot", |request| {
            let delay = request
                .input
                .and_then(|mut input| input.remove("delay"))
                .unwrap_or(Value::Null);
            Ok(Some(json!({"scheduled": delay})))
        })
        .expect("reboot is an action");
    module
        .on_action("interface=eth0/reset", |_| Ok(None))
        .expect("reset is an action");
    Arc::new(module)
}

/// Device exposing `module` plus a schema file and a UI page.
pub fn acme_device(module: &Arc<MemoryModule>) -> MemoryDevice {
    MemoryDevice::new()
        .with_module(Arc::clone(module))
        .with_schema_file("acme.yang", "module acme { namespace \"urn:acme\"; }")
        .with_ui_file("index.html", "<html></html>")
}

/// Options for [`acme_gateway`].
#[derive(Debug, Default, Clone)]
pub struct GatewayOptions {
    pub strict: bool,
    pub web_ui: Option<String>,
}

/// Gateway over the main acme device (hostname `edge-1`) with a second
/// device registered as `lab` (hostname `lab-1`).
pub fn acme_gateway(
    module: &Arc<MemoryModule>,
    counter: &Arc<SubscriptionCounter>,
    options: GatewayOptions,
) -> Gateway {
    let lab = acme_module("lab-1");
    let devices = MemoryDeviceMap::new().with_device("lab", Arc::new(acme_device(&lab)));
    let mut builder = Gateway::builder(Arc::new(acme_device(module)))
        .version("1.2.3")
        .strict_compliance(options.strict)
        .device_map(Arc::new(devices))
        .notify_capacity(8, 4)
        .subscription_counter(Arc::clone(counter));
    if let Some(endpoint) = options.web_ui {
        builder = builder.web_ui(endpoint);
    }
    builder.build()
}

/// Canned request bodies referenced by name from feature files.
pub fn sample_body(name: &str) -> Option<(&'static str, &'static str)> {
    let sample = match name {
        "location patch" => ("application/json", r#"{"location":"rack 4"}"#),
        "strict location patch" => (
            "application/yang-data+json",
            r#"{"acme:location":"rack 5"}"#,
        ),
        "xml max-age patch" => (
            "application/yang-data+xml",
            r#"<system xmlns="urn:acme"><hostname>h2</hostname><max-age>30</max-age></system>"#,
        ),
        "slashed interface" => (
            "application/json",
            r#"{"interface":[{"name":"eth/0","mtu":1400}]}"#,
        ),
        "duplicate interface" => ("application/json", r#"{"interface":[{"name":"eth0"}]}"#),
        "new interface" => (
            "application/json",
            r#"{"interface":[{"name":"eth1","mtu":9000}]}"#,
        ),
        "wrapped reboot input" => (
            "application/yang-data+json",
            r#"{"acme:input":{"delay":30}}"#,
        ),
        "unwrapped strict reboot input" => ("application/yang-data+json", r#"{"delay":30}"#),
        "bare reboot input" => ("application/json", r#"{"delay":5}"#),
        "xml reboot input" => (
            "application/yang-data+xml",
            r#"<input xmlns="urn:acme"><delay>7</delay></input>"#,
        ),
        "form reboot input" => ("application/x-www-form-urlencoded", "delay=9"),
        "malformed json" => ("application/json", "{oops"),
        _ => return None,
    };
    Some(sample)
}
