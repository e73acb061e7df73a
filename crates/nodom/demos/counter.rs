//! Nodom - Counter demo
//!
//! Mounts a small todo/counter module into the in-memory host, clicks a few
//! buttons and prints the resulting HTML after every flush.

use nodom::{App, FnModule, HostNodeId, MemoryHost};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

const TEMPLATE: &str = r#"
<div class="counter">
    <h1>{{title}}</h1>
    <p>Count: {{count}}</p>
    <button class="inc" e-click="inc">+</button>
    <button class="add" e-click="add">add item</button>
    <ul>
        <li x-repeat="{{items}}" index="idx">{{idx}}: {{name}}</li>
    </ul>
    <if cond="{{count > 2}}"><p class="note">more than two</p></if>
    <else><p class="note">two or less</p></else>
</div>
"#;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting counter demo...");

    let mut host = MemoryHost::new();
    let root = host.create_container("div", "app");
    let mut app = App::new(host);

    let class = FnModule::new(TEMPLATE)
        .with_data(json!({"title": "Counter", "count": 0, "items": []}))
        .with_method("inc", |ctx| {
            let count = ctx.module_model.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
            if let Err(e) = ctx.module_model.set("count", json!(count + 1)) {
                tracing::warn!("inc failed: {}", e);
            }
            Value::Null
        })
        .with_method("add", |ctx| {
            let len = ctx
                .module_model
                .get_model("items")
                .and_then(|items| items.array_len())
                .unwrap_or(0);
            let path = format!("items.{len}");
            if let Err(e) = ctx.module_model.set(&path, json!({"id": len + 1, "name": format!("item {}", len + 1)})) {
                tracing::warn!("add failed: {}", e);
            }
            Value::Null
        });
    app.register_class("counter", class);
    app.mount("counter", root)?;
    print_html(&app, root);

    for button in ["inc", "inc", "add", "inc", "add"] {
        let target = app
            .host_as::<MemoryHost>()
            .and_then(|h| h.find_by_attribute(root, "class", button))
            .ok_or_else(|| anyhow::anyhow!("button '{button}' not rendered"))?;
        app.dispatch(target, "click")?;
        app.render()?;
        print_html(&app, root);
    }

    let stats = app.host_as::<MemoryHost>().map(MemoryHost::stats);
    tracing::info!("Host mutations: {:?}", stats);
    Ok(())
}

fn print_html(app: &App, root: HostNodeId) {
    if let Some(host) = app.host_as::<MemoryHost>() {
        println!("{}", host.inner_html(root));
    }
}
