//! Integration tests for module composition
//!
//! Sub-module embedding, prop/data transfer, slots, shared models, router
//! views and the unactive/destroy lifecycle.

use std::cell::RefCell;
use std::rc::Rc;

use nodom::{App, BasicRouter, FnModule, HostNodeId, MemoryHost, Model, ModuleClass, ModuleState, TemplateSource};
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn host() -> (MemoryHost, HostNodeId) {
    let mut host = MemoryHost::new();
    let root = host.create_container("div", "app");
    (host, root)
}

fn html(app: &App, root: HostNodeId) -> String {
    app.host_as::<MemoryHost>().unwrap().inner_html(root)
}

// ============================================================================
// EMBEDDING
// ============================================================================

#[test]
fn test_child_receives_data_and_props() {
    let (host, root) = host();
    let mut app = App::new(host);
    app.register_class(
        "main",
        FnModule::new(r#"<div><child $label="{{name}}" title="t"></child></div>"#)
            .with_data(json!({"name": "hello"})),
    );
    app.register_class(
        "child",
        FnModule::dynamic(|props| {
            let title = props.get("title").and_then(Value::as_str).unwrap_or("?");
            TemplateSource::Text(format!("<span>{{{{label}}}} {title}</span>"))
        })
        .with_data(json!({"label": ""})),
    );
    let main = app.mount("main", root).unwrap();

    assert_eq!(
        html(&app, root),
        r#"<div><div title="t"><span>hello t</span></div></div>"#
    );
    let child = app.find_module("child").unwrap();
    let module = app.module(child).unwrap();
    assert_eq!(module.parent, Some(main));
    assert_eq!(module.props.get("title"), Some(&json!("t")));
    assert_eq!(app.module(main).unwrap().children, vec![child]);

    app.model(main).unwrap().set("name", json!("bye")).unwrap();
    app.render().unwrap();
    assert_eq!(
        html(&app, root),
        r#"<div><div title="t"><span>bye t</span></div></div>"#
    );
    assert!(app.queue().is_empty());
}

#[test]
fn test_child_renders_on_its_own() {
    let (host, root) = host();
    let mut app = App::new(host);
    app.register_class("main", FnModule::new("<div><p>{{n}}</p><child></child></div>").with_data(json!({"n": 0})));
    app.register_class("child", FnModule::new("<b>{{m}}</b>").with_data(json!({"m": 1})));
    let main = app.mount("main", root).unwrap();
    let child = app.find_module("child").unwrap();

    app.model(child).unwrap().set("m", json!(2)).unwrap();
    assert!(app.queue().contains(child));
    assert!(!app.queue().contains(main));
    app.render().unwrap();
    assert_eq!(html(&app, root), "<div><p>0</p><div><b>2</b></div></div>");
}

#[test]
fn test_unknown_module_tag_is_plain_element() {
    let (host, root) = host();
    let mut app = App::new(host);
    app.register_class("main", FnModule::new("<div><nobody>x</nobody></div>"));
    app.mount("main", root).unwrap();
    assert_eq!(html(&app, root), "<div><nobody>x</nobody></div>");
}

#[test]
fn test_module_element_by_name() {
    let (host, root) = host();
    let mut app = App::new(host);
    app.register_class("main", FnModule::new(r#"<div><module name="card"></module></div>"#));
    app.register_class("card", FnModule::new("<i>card</i>"));
    app.mount("main", root).unwrap();
    assert_eq!(html(&app, root), "<div><div><i>card</i></div></div>");
}

#[test]
fn test_share_model() {
    let (host, root) = host();
    let mut app = App::new(host);
    app.register_class(
        "main",
        FnModule::new("<div><child share-model></child></div>").with_data(json!({"name": "p"})),
    );
    app.register_class("child", FnModule::new("<span>{{name}}</span>"));
    let main = app.mount("main", root).unwrap();
    assert_eq!(html(&app, root), "<div><div><span>p</span></div></div>");

    let child = app.find_module("child").unwrap();
    assert!(app.model(child).unwrap().ptr_eq(&app.model(main).unwrap()));

    app.model(main).unwrap().set("name", json!("q")).unwrap();
    app.render().unwrap();
    assert_eq!(html(&app, root), "<div><div><span>q</span></div></div>");
}

// ============================================================================
// SLOTS
// ============================================================================

const CARD: &str = r#"<div class="card"><slot></slot><slot name="footer"><i>none</i></slot></div>"#;

#[test]
fn test_default_and_named_slots() {
    let (host, root) = host();
    let mut app = App::new(host);
    app.register_class(
        "main",
        FnModule::new(r#"<div><card><p>{{msg}}</p><slot name="footer"><b>f</b></slot></card></div>"#)
            .with_data(json!({"msg": "hi"})),
    );
    app.register_class("card", FnModule::new(CARD).with_data(json!({"msg": "inner"})));
    let main = app.mount("main", root).unwrap();

    assert_eq!(
        html(&app, root),
        r#"<div><div><div class="card"><div><p>hi</p></div><div><b>f</b></div></div></div></div>"#
    );

    app.model(main).unwrap().set("msg", json!("again")).unwrap();
    app.render().unwrap();
    assert!(html(&app, root).contains("<p>again</p>"));
}

#[test]
fn test_slot_fallback_content() {
    let (host, root) = host();
    let mut app = App::new(host);
    app.register_class("main", FnModule::new("<div><card><p>body</p></card></div>"));
    app.register_class("card", FnModule::new(CARD));
    app.mount("main", root).unwrap();
    assert!(html(&app, root).contains("<div><i>none</i></div>"));
}

#[test]
fn test_inner_render_slot_uses_child_model() {
    let (host, root) = host();
    let mut app = App::new(host);
    app.register_class(
        "main",
        FnModule::new("<div><card><p>{{msg}}</p></card></div>").with_data(json!({"msg": "outer"})),
    );
    app.register_class(
        "card",
        FnModule::new(r#"<section><slot inner-render></slot></section>"#).with_data(json!({"msg": "inner"})),
    );
    app.mount("main", root).unwrap();
    assert!(html(&app, root).contains("<p>inner</p>"));
}

// ============================================================================
// LIFECYCLE
// ============================================================================

#[test]
fn test_hidden_child_is_unactivated_not_destroyed() {
    let (host, root) = host();
    let mut app = App::new(host);
    app.register_class(
        "main",
        FnModule::new(r#"<div><child x-if="{{on}}"></child></div>"#).with_data(json!({"on": true})),
    );
    app.register_class("child", FnModule::new("<b>c</b>"));
    let main = app.mount("main", root).unwrap();
    let child = app.find_module("child").unwrap();
    assert_eq!(html(&app, root), "<div><div><b>c</b></div></div>");

    let model = app.model(main).unwrap();
    model.set("on", json!(false)).unwrap();
    app.render().unwrap();
    assert_eq!(html(&app, root), "<div></div>");
    assert_eq!(app.module(child).unwrap().state, ModuleState::Initialized);
    assert_eq!(app.module_count(), 2);

    model.set("on", json!(true)).unwrap();
    app.render().unwrap();
    assert_eq!(html(&app, root), "<div><div><b>c</b></div></div>");
    assert_eq!(app.find_module("child"), Some(child));
}

#[test]
fn test_destroy_removes_subtree() {
    let (host, root) = host();
    let mut app = App::new(host);
    app.register_class("main", FnModule::new("<div><child></child></div>"));
    app.register_class("child", FnModule::new("<b>c</b>"));
    let main = app.mount("main", root).unwrap();
    assert_eq!(app.module_count(), 2);

    app.destroy(main);
    assert_eq!(app.module_count(), 0);
    assert_eq!(app.main(), None);
    assert_eq!(html(&app, root), "");
}

struct Recorder {
    log: Rc<RefCell<Vec<String>>>,
}

impl ModuleClass for Recorder {
    fn template(&self, _props: &BTreeMap<String, Value>) -> TemplateSource {
        "<p>{{n}}</p>".into()
    }

    fn data(&self) -> Value {
        json!({"n": 0})
    }

    fn on_init(&self, _model: &Model) {
        self.log.borrow_mut().push("init".into());
    }

    fn on_before_render(&self, _model: &Model) {
        self.log.borrow_mut().push("before".into());
    }

    fn on_first_render(&self, _model: &Model) {
        self.log.borrow_mut().push("first".into());
    }

    fn on_render(&self, _model: &Model) {
        self.log.borrow_mut().push("render".into());
    }

    fn on_mount(&self, _model: &Model) {
        self.log.borrow_mut().push("mount".into());
    }

    fn on_unmount(&self, _model: &Model) {
        self.log.borrow_mut().push("unmount".into());
    }
}

#[test]
fn test_lifecycle_hooks_order() {
    let (host, root) = host();
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut app = App::new(host);
    app.register_class("main", Recorder { log: log.clone() });

    let id = app.mount("main", root).unwrap();
    app.model(id).unwrap().set("n", json!(1)).unwrap();
    app.render().unwrap();
    app.destroy(id);

    assert_eq!(
        *log.borrow(),
        ["init", "before", "first", "render", "mount", "before", "render", "unmount"]
    );
}

// ============================================================================
// ROUTER
// ============================================================================

#[test]
fn test_router_view_switches_modules() {
    let (host, root) = host();
    let router = BasicRouter::new().route("/a", "page-a").route("/b", "page-b");
    let mut app = App::new(host).with_router(router);
    app.register_class(
        "main",
        FnModule::new(r#"<div><a x-route="/a" active="aActive">A</a><router></router></div>"#)
            .with_data(json!({"aActive": false})),
    );
    app.register_class("page-a", FnModule::new("<p>page a</p>"));
    app.register_class("page-b", FnModule::new("<p>page b</p>"));
    let main = app.mount("main", root).unwrap();
    assert!(!html(&app, root).contains("page"));
    assert!(html(&app, root).contains(r#"<a path="/a">A</a>"#));

    assert!(app.navigate("/a").unwrap());
    assert!(html(&app, root).contains("<p>page a</p>"));
    assert_eq!(app.model(main).unwrap().get("aActive"), Some(json!(true)));

    assert!(app.navigate("/b").unwrap());
    let out = html(&app, root);
    assert!(out.contains("<p>page b</p>"));
    assert!(!out.contains("page a"));
    assert_eq!(app.find_module("page-a"), None);
    assert_eq!(app.model(main).unwrap().get("aActive"), Some(json!(false)));

    assert!(!app.navigate("/b").unwrap());
}

#[test]
fn test_destroyed_module_leaves_router() {
    let (host, root) = host();
    let router = BasicRouter::new().route("/a", "page-a");
    let mut app = App::new(host).with_router(router);
    app.register_class(
        "main",
        FnModule::new(r#"<a x-route="/a" active="aActive">A</a>"#).with_data(json!({"aActive": false})),
    );
    app.register_class("page-a", FnModule::new("<p>a</p>"));
    let main = app.mount("main", root).unwrap();
    let model = app.model(main).unwrap();

    app.destroy(main);
    assert!(app.navigate("/a").unwrap());
    assert_eq!(model.get("aActive"), Some(json!(false)));
}

#[test]
fn test_hidden_rows_free_host_nodes() {
    let (host, root) = host();
    let mut app = App::new(host);
    app.register_class(
        "main",
        FnModule::new(r#"<ul><li x-repeat="{{rows}}">{{name}}</li></ul>"#).with_data(json!({"rows": []})),
    );
    let main = app.mount("main", root).unwrap();
    let model = app.model(main).unwrap();
    let baseline = app.host_as::<MemoryHost>().unwrap().node_count();

    for round in 0..20 {
        model.set("rows", json!([{"id": round, "name": "r"}])).unwrap();
        app.render().unwrap();
        model.set("rows", json!([])).unwrap();
        app.render().unwrap();
    }
    assert_eq!(app.host_as::<MemoryHost>().unwrap().node_count(), baseline);
    assert_eq!(html(&app, root), "<ul></ul>");
}
