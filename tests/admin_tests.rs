mod common;

use axum::http::{Method, StatusCode};
use common::{MockBackend, connection_details};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use upstairs::UpstairsError;
use upstairs::admin::{ConnectionsPanel, PanelMode, SettingsPanel, TableEditor};
use upstairs::tree::{ExpansionTracker, LazyTreeDataSource, SchemaRef, TreeNode};

fn table_info() -> Value {
    json!({
        "table": {
            "tableName": "employees",
            "entityName": "Employee",
            "column": [
                { "columnName": "id", "javaType": "java.lang.Long" },
                { "columnName": "name", "javaType": null }
            ]
        }
    })
}

fn annotations(max_length: Option<i64>) -> Value {
    json!({
        "classAccessor": { "name": "annotations", "properties": [{ "name": "maxLength" }] },
        "annotations": { "maxLength": max_length }
    })
}

#[tokio::test]
async fn loading_connections_resets_tree_roots() {
    let backend = MockBackend::new()
        .on(
            Method::GET,
            "/database/connections",
            StatusCode::OK,
            json!([{ "name": "hr" }, { "name": "crm" }]),
        )
        .on(
            Method::GET,
            "/database/connections/hr",
            StatusCode::OK,
            connection_details("hr"),
        );
    let client = backend.spawn().await;
    let tree = LazyTreeDataSource::spawn(Arc::new(client.clone()), ExpansionTracker::new())
        .await
        .expect("spawn tree");

    let mut panel = ConnectionsPanel::new(client, tree.clone());
    assert_eq!(panel.load().await.expect("loaded").len(), 2);

    let snapshot = tree.snapshot().await.expect("snapshot");
    let names: Vec<_> = snapshot.iter().map(TreeNode::display_name).collect();
    assert_eq!(names, vec!["hr", "crm"]);

    // The REST client is the tree's metadata provider.
    tree.toggle_node(snapshot[0].key(), true).expect("expand");
    let hr = tree
        .wait_until_settled(&snapshot[0].key(), std::time::Duration::from_secs(5))
        .await
        .expect("settled");
    let schemas: Vec<_> = hr.children.iter().map(TreeNode::display_name).collect();
    assert_eq!(schemas, vec!["PUBLIC", "AUDIT"]);

    tree.stop();
}

#[tokio::test]
async fn connection_edit_save_and_delete_cycle() {
    let backend = MockBackend::new()
        .on(
            Method::GET,
            "/database/connections",
            StatusCode::OK,
            json!([{ "name": "hr" }, { "name": "crm" }]),
        )
        .on(
            Method::GET,
            "/database/connections/hr",
            StatusCode::OK,
            connection_details("hr"),
        )
        .on(
            Method::PUT,
            "/database/connections/hr",
            StatusCode::OK,
            json!(null),
        )
        .on(
            Method::DELETE,
            "/database/connections/hr",
            StatusCode::OK,
            json!(null),
        );
    let client = backend.spawn().await;
    let tree = LazyTreeDataSource::spawn(Arc::new(client.clone()), ExpansionTracker::new())
        .await
        .expect("spawn tree");
    let mut panel = ConnectionsPanel::new(client, tree.clone());
    panel.load().await.expect("loaded");

    panel.open("hr").await.expect("opened");
    assert_eq!(panel.mode(), PanelMode::View);
    assert!(matches!(
        panel.save().await,
        Err(UpstairsError::Validation(_))
    ));

    panel.edit().expect("edit");
    assert!(matches!(panel.delete().await, Err(UpstairsError::Validation(_))));
    panel
        .selected_mut()
        .expect("selected")
        .driver
        .value = Some("org.postgresql.Driver".to_string());
    panel.save().await.expect("saved");
    assert_eq!(panel.mode(), PanelMode::View);

    let put = backend.requests_to(&Method::PUT, "/database/connections/hr");
    assert_eq!(put.len(), 1);
    assert_eq!(put[0].body["driver"]["value"], "org.postgresql.Driver");

    panel.delete().await.expect("deleted");
    assert!(panel.selected().is_none());
    let names: Vec<_> = panel.connections().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["crm"]);

    tree.stop();
}

#[tokio::test]
async fn connection_test_requires_connected_first_status() {
    let backend = MockBackend::new()
        .on(
            Method::GET,
            "/database/connections/hr",
            StatusCode::OK,
            connection_details("hr"),
        )
        .on(
            Method::POST,
            "/database/connections/hr/:test",
            StatusCode::OK,
            json!(["error", "connected"]),
        );
    let client = backend.spawn().await;
    let tree = LazyTreeDataSource::spawn(Arc::new(client.clone()), ExpansionTracker::new())
        .await
        .expect("spawn tree");
    let mut panel = ConnectionsPanel::new(client, tree.clone());

    assert!(matches!(panel.test().await, Err(UpstairsError::Validation(_))));

    panel.open("hr").await.expect("opened");
    assert!(!panel.test().await.expect("tested"));

    panel.close();
    assert!(panel.selected().is_none());
    tree.stop();
}

#[tokio::test]
async fn platforms_load_sorted() {
    let backend = MockBackend::new().on(
        Method::GET,
        "/database/platforms",
        StatusCode::OK,
        json!({ "oracle": {}, "db2": {}, "mysql": {} }),
    );
    let client = backend.spawn().await;
    let tree = LazyTreeDataSource::spawn(Arc::new(client.clone()), ExpansionTracker::new())
        .await
        .expect("spawn tree");
    let mut panel = ConnectionsPanel::new(client, tree.clone());

    let names: Vec<_> = panel
        .load_platforms()
        .await
        .expect("platforms")
        .iter()
        .map(|(name, _)| name.clone())
        .collect();
    assert_eq!(names, vec!["db2", "mysql", "oracle"]);
    tree.stop();
}

#[tokio::test]
async fn table_editor_shows_default_type_and_sends_null() {
    let path = "/database/tables/hr/PUBLIC/employees";
    let backend = MockBackend::new()
        .on(Method::GET, path, StatusCode::OK, table_info())
        .on(Method::PUT, path, StatusCode::OK, json!(null));
    let client = backend.spawn().await;
    let mut editor = TableEditor::new(client);

    let node = TreeNode::table("hr", SchemaRef::new("PUBLIC"), "employees");
    let open = editor.open(&node).await.expect("opened");
    let types: Vec<_> = open
        .info
        .table
        .columns
        .iter()
        .map(|c| c.java_type.as_deref())
        .collect();
    assert_eq!(types, vec![Some("java.lang.Long"), Some("default")]);

    editor.save().await.expect("saved");
    let put = backend.requests_to(&Method::PUT, path);
    assert_eq!(put.len(), 1);
    assert_eq!(put[0].body["column"][1]["javaType"], Value::Null);
    assert_eq!(put[0].body["entityName"], "Employee");

    // The form keeps showing the normalised value.
    let shown = editor.table().expect("still open").info.table.columns[1]
        .java_type
        .clone();
    assert_eq!(shown.as_deref(), Some("default"));

    editor.cancel();
    assert!(editor.table().is_none());
}

#[tokio::test]
async fn column_editing_loads_annotations_and_saves_them() {
    let table = "/database/tables/hr/PUBLIC/employees";
    let backend = MockBackend::new()
        .on(Method::GET, table, StatusCode::OK, table_info())
        .on(
            Method::GET,
            &format!("{table}/name/:annotations/default"),
            StatusCode::OK,
            annotations(None),
        )
        .on(
            Method::GET,
            &format!("{table}/name/:annotations/java.lang.String"),
            StatusCode::OK,
            annotations(Some(255)),
        )
        .on(
            Method::PUT,
            &format!("{table}/name"),
            StatusCode::OK,
            json!(null),
        );
    let client = backend.spawn().await;
    let mut editor = TableEditor::new(client);

    let node = TreeNode::table("hr", SchemaRef::new("PUBLIC"), "employees");
    editor.open(&node).await.expect("opened");

    let selection = editor.edit_column(1).await.expect("column selected");
    assert_eq!(selection.index, 1);
    assert_eq!(selection.descriptor.annotations["maxLength"], Value::Null);

    let selection = editor
        .change_type("java.lang.String")
        .await
        .expect("type changed");
    assert_eq!(selection.descriptor.annotations["maxLength"], 255);
    assert_eq!(
        editor.selected_column().and_then(|c| c.java_type.as_deref()),
        Some("java.lang.String")
    );

    let mut values = Map::new();
    values.insert("maxLength".to_string(), json!(100));
    editor.save_column(values).await.expect("column saved");

    let put = backend.requests_to(&Method::PUT, &format!("{table}/name"));
    assert_eq!(put.len(), 1);
    assert_eq!(put[0].body["column"]["columnName"], "name");
    assert_eq!(put[0].body["column"]["javaType"], "java.lang.String");
    assert_eq!(put[0].body["annotations"]["maxLength"], 100);

    assert!(matches!(
        editor.edit_column(7).await,
        Err(UpstairsError::Validation(_))
    ));

    editor.cancel_column();
    assert!(editor.column().is_none());
}

#[tokio::test]
async fn table_editor_rejects_non_table_nodes() {
    let client = MockBackend::new().spawn().await;
    let mut editor = TableEditor::new(client);

    let schema = TreeNode::schema("hr", SchemaRef::new("PUBLIC"));
    assert!(matches!(
        editor.open(&schema).await,
        Err(UpstairsError::Validation(_))
    ));
    assert!(matches!(editor.save().await, Err(UpstairsError::Validation(_))));
}

#[tokio::test]
async fn settings_reset_and_required_fields() {
    let backend = MockBackend::new()
        .on(
            Method::GET,
            "/settings",
            StatusCode::OK,
            json!({
                "appName": { "value": "Demo" },
                "loginPath": { "value": "/login" }
            }),
        )
        .on(Method::PUT, "/settings", StatusCode::OK, json!(null));
    let client = backend.spawn().await;
    let mut panel = SettingsPanel::new(client);

    let form = panel.reset().await.expect("reset");
    assert_eq!(form.app_name, "Demo");
    assert_eq!(form.login_path, "/login");

    panel.form_mut().app_name = "  ".to_string();
    assert!(matches!(panel.save().await, Err(UpstairsError::Validation(_))));
    assert!(backend.requests_to(&Method::PUT, "/settings").is_empty());

    panel.form_mut().app_name = "Renamed".to_string();
    panel.save().await.expect("saved");
    let put = backend.requests_to(&Method::PUT, "/settings");
    assert_eq!(put.len(), 1);
    assert_eq!(
        put[0].body,
        json!({ "appName": "Renamed", "loginPath": "/login" })
    );

    // Reset discards local edits.
    panel.form_mut().login_path = "/other".to_string();
    assert_eq!(panel.reset().await.expect("reset").login_path, "/login");
}
