//! Flattens a normalized tree into the Homer `config.yml` document.
//!
//! Emission is sparse: empty strings, empty maps and empty lists are left
//! out. Top-level keys are written in a fixed order and entry parameters
//! put `name` first, so output is stable across runs.

use serde_yaml::{Mapping, Value};

use crate::config::schema::{
    ArrayObjects, Colors, Configuration, Defaults, Entry, Group, Link, Message, NestedObjects,
    ParamMap, Proxy,
};

use super::infer::{infer, infer_integer};

/// Lowercase parameter key to output key.
const KEY_RENAMES: &[(&str, &str)] = &[
    ("documenttitle", "documentTitle"),
    ("connectivitycheck", "connectivityCheck"),
    ("usecredentials", "useCredentials"),
    ("successcodes", "successCodes"),
    ("legacyapi", "legacyApi"),
    ("librarytype", "libraryType"),
    ("hiddenfields", "hiddenFields"),
    ("customheaders", "customHeaders"),
    ("refreshinterval", "refreshInterval"),
    ("updateinterval", "updateInterval"),
    ("apikey", "apikey"),
    ("warningvalue", "warning_value"),
    ("dangervalue", "danger_value"),
];

/// Maps a parameter key to its output spelling.
pub fn output_key(key: &str) -> String {
    let lower = key.to_ascii_lowercase();
    KEY_RENAMES
        .iter()
        .find(|(from, _)| *from == lower)
        .map(|(_, to)| to.to_string())
        .unwrap_or_else(|| key.to_string())
}

/// Builds the output document.
pub fn to_document(config: &Configuration) -> Value {
    let mut root = Mapping::new();

    put_str(&mut root, "title", &config.title);
    put_str(&mut root, "subtitle", &config.subtitle);
    put_str(&mut root, "documentTitle", &config.document_title);
    put_str(&mut root, "logo", &config.logo);
    put_str(&mut root, "icon", &config.icon);
    if let Some(header) = config.header {
        put(&mut root, "header", Value::Bool(header));
    }
    if config.footer_disabled() {
        put(&mut root, "footer", Value::Bool(false));
    } else {
        put_str(&mut root, "footer", &config.footer);
    }
    if !config.columns.is_empty() {
        put(&mut root, "columns", infer_integer(&config.columns).to_yaml());
    }
    if let Some(check) = config.connectivity_check {
        put(&mut root, "connectivityCheck", Value::Bool(check));
    }

    let mut hotkey = Mapping::new();
    put_str(&mut hotkey, "search", &config.hotkey.search);
    put_map(&mut root, "hotkey", hotkey);

    put_str(&mut root, "theme", &config.theme);
    if !config.stylesheet.is_empty() {
        let sheets = config
            .stylesheet
            .iter()
            .map(|s| Value::String(s.clone()))
            .collect();
        put(&mut root, "stylesheet", Value::Sequence(sheets));
    }

    put_map(&mut root, "colors", colors(&config.colors));
    put_map(&mut root, "defaults", defaults(&config.defaults));
    put_map(&mut root, "proxy", proxy(&config.proxy));
    put_map(&mut root, "message", message(&config.message));

    let links: Vec<Value> = config
        .links
        .iter()
        .map(link)
        .filter(|m| !m.is_empty())
        .map(Value::Mapping)
        .collect();
    if !links.is_empty() {
        put(&mut root, "links", Value::Sequence(links));
    }

    let services: Vec<Value> = config.services.iter().map(group).collect();
    if !services.is_empty() {
        put(&mut root, "services", Value::Sequence(services));
    }

    Value::Mapping(root)
}

/// Renders the output document as YAML text.
pub fn to_yaml_string(config: &Configuration) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&to_document(config))
}

fn group(group: &Group) -> Value {
    let mut map = Mapping::new();
    write_parameters(&mut map, &group.parameters);
    write_nested(&mut map, &group.nested_objects);

    let items: Vec<Value> = group.items.iter().map(entry).collect();
    if !items.is_empty() {
        put(&mut map, "items", Value::Sequence(items));
    }
    Value::Mapping(map)
}

fn entry(entry: &Entry) -> Value {
    let mut map = Mapping::new();
    write_parameters(&mut map, &entry.parameters);
    write_nested(&mut map, &entry.nested_objects);
    write_arrays(&mut map, &entry.array_objects);
    Value::Mapping(map)
}

/// `name` first (always a string), then the remaining keys in sorted order.
fn write_parameters(map: &mut Mapping, parameters: &ParamMap) {
    if let Some(name) = parameters.get("name") {
        put_str(map, "name", name);
    }
    for (key, value) in parameters {
        if key == "name" || value.is_empty() {
            continue;
        }
        put(map, &output_key(key), infer(key, value).to_yaml());
    }
}

fn write_nested(map: &mut Mapping, nested: &NestedObjects) {
    for (object, properties) in nested {
        let inner = typed_map(properties);
        put_map(map, &output_key(object), inner);
    }
}

/// Padding maps left by sparse indices are dropped.
fn write_arrays(map: &mut Mapping, arrays: &ArrayObjects) {
    for (name, items) in arrays {
        let list: Vec<Value> = items
            .iter()
            .map(typed_map)
            .filter(|m| !m.is_empty())
            .map(Value::Mapping)
            .collect();
        if !list.is_empty() {
            put(map, &output_key(name), Value::Sequence(list));
        }
    }
}

fn typed_map(properties: &ParamMap) -> Mapping {
    let mut map = Mapping::new();
    for (key, value) in properties {
        if !value.is_empty() {
            put(&mut map, &output_key(key), infer(key, value).to_yaml());
        }
    }
    map
}

fn string_map(values: &ParamMap) -> Mapping {
    let mut map = Mapping::new();
    for (key, value) in values {
        put_str(&mut map, key, value);
    }
    map
}

fn colors(colors: &Colors) -> Mapping {
    let mut map = Mapping::new();
    put_map(&mut map, "light", string_map(&colors.light));
    put_map(&mut map, "dark", string_map(&colors.dark));
    map
}

fn defaults(defaults: &Defaults) -> Mapping {
    let mut map = Mapping::new();
    put_str(&mut map, "layout", &defaults.layout);
    put_str(&mut map, "colorTheme", &defaults.color_theme);
    map
}

fn proxy(proxy: &Proxy) -> Mapping {
    let mut map = Mapping::new();
    if let Some(use_credentials) = proxy.use_credentials {
        put(&mut map, "useCredentials", Value::Bool(use_credentials));
    }
    put_map(&mut map, "headers", string_map(&proxy.headers));
    map
}

fn message(message: &Message) -> Mapping {
    let mut map = Mapping::new();
    put_str(&mut map, "url", &message.url);
    put_map(&mut map, "mapping", string_map(&message.mapping));
    if !message.refresh_interval.is_empty() {
        put(
            &mut map,
            "refreshInterval",
            infer_integer(&message.refresh_interval).to_yaml(),
        );
    }
    put_str(&mut map, "style", &message.style);
    put_str(&mut map, "title", &message.title);
    put_str(&mut map, "icon", &message.icon);
    put_str(&mut map, "content", &message.content);
    map
}

fn link(link: &Link) -> Mapping {
    let mut map = Mapping::new();
    put_str(&mut map, "name", &link.name);
    put_str(&mut map, "icon", &link.icon);
    put_str(&mut map, "url", &link.url);
    put_str(&mut map, "target", &link.target);
    map
}

fn put(map: &mut Mapping, key: &str, value: Value) {
    map.insert(Value::String(key.to_string()), value);
}

fn put_str(map: &mut Mapping, key: &str, value: &str) {
    if !value.is_empty() {
        put(map, key, Value::String(value.to_string()));
    }
}

fn put_map(map: &mut Mapping, key: &str, inner: Mapping) {
    if !inner.is_empty() {
        put(map, key, Value::Mapping(inner));
    }
}
