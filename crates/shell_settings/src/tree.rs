//! Navigation over the JSON document tree

use crate::SettingsKey;
use serde_json::{Map, Value};

/// Find the node addressed by `key`.
pub(crate) fn lookup<'a>(root: &'a Value, key: &SettingsKey) -> Option<&'a Value> {
    key.segments()
        .iter()
        .try_fold(root, |node, segment| node.as_object()?.get(segment))
}

/// Find the object node at `segments`; an empty slice addresses the root.
pub(crate) fn lookup_object<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Map<String, Value>> {
    segments
        .iter()
        .try_fold(root, |node, segment| node.as_object()?.get(segment))?
        .as_object()
}

/// Walk to the object that holds `key`'s leaf, creating missing nodes.
///
/// Intermediate nodes that hold a scalar or array are replaced by objects.
pub(crate) fn parent_mut<'a>(root: &'a mut Value, key: &SettingsKey) -> &'a mut Map<String, Value> {
    let (parents, _) = key.split_leaf();
    let mut map = ensure_object(root);
    for segment in parents {
        let child = map.entry(segment.clone()).or_insert_with(|| {
            tracing::debug!(key = %key, node = %segment, "creating settings node");
            Value::Object(Map::new())
        });
        if !child.is_object() {
            tracing::debug!(key = %key, node = %segment, "replacing non-object settings node");
        }
        map = ensure_object(child);
    }
    map
}

/// Detach the node addressed by `key`.
pub(crate) fn remove(root: &mut Value, key: &SettingsKey) -> Option<Value> {
    let (parents, leaf) = key.split_leaf();
    let mut node = root;
    for segment in parents {
        node = node.as_object_mut()?.get_mut(segment)?;
    }
    node.as_object_mut()?.remove(leaf)
}

/// Number of leaf values below `node`.
pub(crate) fn count_leaves(node: &Value) -> usize {
    match node {
        Value::Object(map) => map.values().map(count_leaves).sum(),
        _ => 1,
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced by an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(raw: &str) -> SettingsKey {
        SettingsKey::parse(raw).unwrap()
    }

    #[test]
    fn lookup_walks_nested_objects() {
        let doc = json!({ "camera": { "fly": { "speed": 3.5 } } });
        assert_eq!(lookup(&doc, &key("camera.fly.speed")), Some(&json!(3.5)));
        assert_eq!(lookup(&doc, &key("camera.fly.missing")), None);
        assert_eq!(lookup(&doc, &key("camera.fly.speed.deeper")), None);
    }

    #[test]
    fn parent_mut_creates_and_replaces_nodes() {
        let mut doc = json!({ "ui": 5 });
        parent_mut(&mut doc, &key("ui.panels.stats.visible")).insert("visible".into(), json!(true));
        assert_eq!(doc, json!({ "ui": { "panels": { "stats": { "visible": true } } } }));
    }

    #[test]
    fn remove_detaches_subtree() {
        let mut doc = json!({ "grid": { "enabled": true, "colors": { "minor": [0.1, 0.1, 0.1] } } });
        assert_eq!(remove(&mut doc, &key("grid.colors")), Some(json!({ "minor": [0.1, 0.1, 0.1] })));
        assert_eq!(remove(&mut doc, &key("grid.colors")), None);
        assert_eq!(remove(&mut doc, &key("grid.enabled.nested")), None);
        assert_eq!(doc, json!({ "grid": { "enabled": true } }));
    }

    #[test]
    fn counts_leaves() {
        let doc = json!({ "a": 1, "b": { "c": [1, 2], "d": { "e": null } } });
        assert_eq!(count_leaves(&doc), 3);
        assert_eq!(lookup_object(&doc, &["b".to_string()]).map(Map::len), Some(2));
        assert!(lookup_object(&doc, &["a".to_string()]).is_none());
    }
}
