//! 🌳 Plugin-entry merge — how one plugin's result lands on an existing sample document.
//!
//! The walk goes `plugins` → `<category>` → `<name>` and stops there. The two levels
//! on the way down merge key by key, so sibling categories and sibling plugins survive.
//! The entry at the bottom is replaced whole: a rescan that drops a key drops it for real.
//! Anything on the path that isn't an object (a legacy placeholder string, a stray null)
//! is swapped for an empty object first.
//!
//! ⚠️ This is the load-bearing wall of the whole crate: writing `plugins.av.clamav`
//! must never knock down `plugins.av.avast` or `plugins.intel.*`. A shallow overwrite
//! of `plugins` would. Don't. 🦆

use serde_json::{Map, Value};

use crate::common::PluginEntry;

/// 🔄 Write `entry` into `document` in place, refreshing `scan_date` on the way.
pub fn put_plugin_entry(document: &mut Value, entry: &PluginEntry) {
    promote(document);
    document["scan_date"] = Value::String(entry.scan_date.clone());

    let plugins = &mut document["plugins"];
    promote(plugins);
    let category = &mut plugins[entry.category.as_str()];
    promote(category);
    category[entry.name.as_str()] = entry.payload.clone();
}

// 🔧 non-objects on the path get promoted to an empty object, so indexing below never panics
fn promote(slot: &mut Value) {
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
}
