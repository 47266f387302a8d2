//! Request parameter store.
//!
//! Reads filter state out of the raw query string, namespaced per block
//! instance so several archive blocks on one page never observe each other's
//! parameters. Everything here treats the query string as hostile input:
//! values pass through a typed sanitizer before anyone looks at them.
//!
//! Keys use PHP/qs bracket syntax for structured values
//! (`archivio-1-taxonomy[category][]=7`), which the store parses into keyed
//! lists itself.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::{OrderBy, SortDirection};

/// Prefix shared by every request parameter the engine owns.
pub const PARAM_PREFIX: &str = "archivio";

/// Derive the namespaced query-string key for a parameter.
///
/// The same derivation is used when reading parameters and when building
/// outbound links; the two must never diverge or filters stop reading back
/// their own state. An empty instance id yields a valid key that collides
/// across instances.
pub fn build_param_name(name: &str, instance_id: &str) -> String {
    format!("{PARAM_PREFIX}-{instance_id}-{name}")
}

/// A sanitized request value.
///
/// The closed set of shapes request input can take after sanitization.
/// Scalars are typed from their text form: integers coerce to non-negative,
/// non-finite floats fall back to text, and anything else is escaped text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(u64),
    Float(f64),
    Bool(bool),
    Text(String),
    List(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Collect term ids from a scalar, list or keyed list. Zero ids are not
    /// valid terms and are dropped.
    pub fn id_list(&self) -> Vec<u64> {
        match self {
            ParamValue::Int(i) => vec![*i],
            ParamValue::List(items) => items.iter().filter_map(ParamValue::as_u64).collect(),
            ParamValue::Map(map) => map.values().filter_map(ParamValue::as_u64).collect(),
            _ => Vec::new(),
        }
        .into_iter()
        .filter(|&id| id != 0)
        .collect()
    }
}

/// Parsed-but-unsanitized value tree.
#[derive(Debug, Clone)]
enum RawValue {
    Text(String),
    List(Vec<RawValue>),
    Map(BTreeMap<String, RawValue>),
}

/// All parameters of the current request.
///
/// Parsed once per render; reads are pure functions of the parsed state.
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    values: BTreeMap<String, RawValue>,
    /// Decoded pairs in arrival order, kept for outbound link building.
    pairs: Vec<(String, String)>,
}

impl RequestParams {
    /// Parse a raw query string (leading '?' tolerated).
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut values: BTreeMap<String, RawValue> = BTreeMap::new();
        let mut pairs = Vec::new();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let key = key.into_owned();
            let value = value.into_owned();
            pairs.push((key.clone(), value.clone()));

            let (base, path) = split_key(&key);
            let slot = values
                .entry(base.to_string())
                .or_insert_with(|| RawValue::Text(String::new()));
            insert_path(slot, &path, value);
        }

        Self { values, pairs }
    }

    /// Sanitized value of a key, shape preserved (keys of keyed lists are
    /// kept as-is; they are only ever compared against configured names).
    pub fn get(&self, key: &str) -> Option<ParamValue> {
        self.values.get(key).map(sanitize_value)
    }

    /// Value of a key flattened to a single escaped free-text string.
    pub fn get_text(&self, key: &str) -> Option<String> {
        let raw = self.values.get(key)?;
        let mut parts = Vec::new();
        flatten(raw, &mut parts);
        Some(sanitize_text(&parts.join(" ")))
    }

    /// Decoded pairs in arrival order.
    pub fn raw_pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

/// Per-instance filter state derived from the request.
///
/// The ephemeral half of a block's input: read once per render from the
/// namespaced parameters, never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    /// Requested page, at least 1.
    pub page: u32,

    /// Requested sort direction. A present-but-unrecognized value
    /// normalizes to descending; only an absent parameter is `None`.
    pub order: Option<SortDirection>,

    /// Requested sort field, when present and recognized.
    pub order_by: Option<OrderBy>,

    /// Free-text search term, when present and non-empty.
    pub search: Option<String>,

    /// Taxonomy name -> selected term ids. Only non-empty selections appear.
    pub taxonomies: BTreeMap<String, BTreeSet<u64>>,
}

impl FilterState {
    pub fn from_request(params: &RequestParams, instance_id: &str) -> Self {
        let page = params
            .get(&build_param_name("paged", instance_id))
            .and_then(|v| v.as_u64())
            .map(|p| u32::try_from(p).unwrap_or(u32::MAX))
            .unwrap_or(1)
            .max(1);

        let order = params
            .get_text(&build_param_name("order", instance_id))
            .map(|v| SortDirection::parse(&v).unwrap_or_default());

        let order_by = params
            .get_text(&build_param_name("orderby", instance_id))
            .and_then(|v| OrderBy::parse(&v));

        let search = params
            .get_text(&build_param_name("search", instance_id))
            .filter(|s| !s.is_empty());

        let mut taxonomies = BTreeMap::new();
        if let Some(ParamValue::Map(map)) = params.get(&build_param_name("taxonomy", instance_id)) {
            for (taxonomy, value) in map {
                let ids: BTreeSet<u64> = value.id_list().into_iter().collect();
                if !ids.is_empty() {
                    taxonomies.insert(taxonomy, ids);
                }
            }
        }

        Self {
            page,
            order,
            order_by,
            search,
            taxonomies,
        }
    }

    /// Selected term ids for one taxonomy.
    pub fn active(&self, taxonomy: &str) -> Option<&BTreeSet<u64>> {
        self.taxonomies.get(taxonomy)
    }

    /// Whether any taxonomy has a live selection.
    pub fn has_active_filters(&self) -> bool {
        !self.taxonomies.is_empty()
    }
}

/// Split a bracketed key into its base and path segments.
///
/// `a[b][]` -> `("a", ["b", ""])`. Malformed bracket syntax degrades to a
/// flat key rather than erroring.
fn split_key(key: &str) -> (&str, Vec<&str>) {
    let Some(open) = key.find('[') else {
        return (key, Vec::new());
    };
    if !key.ends_with(']') {
        return (key, Vec::new());
    }

    let base = &key[..open];
    let mut path = Vec::new();
    let mut rest = &key[open..];
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return (key, Vec::new());
        }
        let Some(close) = rest.find(']') else {
            return (key, Vec::new());
        };
        path.push(&rest[1..close]);
        rest = &rest[close + 1..];
    }
    (base, path)
}

/// Write a value into the tree at the given path. An empty segment appends
/// to a list; a named segment descends into a keyed list. Repeated flat keys
/// keep the last value.
fn insert_path(slot: &mut RawValue, path: &[&str], value: String) {
    let Some((segment, rest)) = path.split_first() else {
        *slot = RawValue::Text(value);
        return;
    };

    if segment.is_empty() {
        if !matches!(slot, RawValue::List(_)) {
            *slot = RawValue::List(Vec::new());
        }
        if let RawValue::List(items) = slot {
            if rest.is_empty() {
                items.push(RawValue::Text(value));
            } else {
                let mut child = RawValue::Map(BTreeMap::new());
                insert_path(&mut child, rest, value);
                items.push(child);
            }
        }
    } else {
        if !matches!(slot, RawValue::Map(_)) {
            *slot = RawValue::Map(BTreeMap::new());
        }
        if let RawValue::Map(map) = slot {
            let entry = map
                .entry((*segment).to_string())
                .or_insert_with(|| RawValue::Text(String::new()));
            insert_path(entry, rest, value);
        }
    }
}

fn sanitize_value(raw: &RawValue) -> ParamValue {
    match raw {
        RawValue::Text(s) => sanitize_scalar(s),
        RawValue::List(items) => ParamValue::List(items.iter().map(sanitize_value).collect()),
        RawValue::Map(map) => ParamValue::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), sanitize_value(v)))
                .collect(),
        ),
    }
}

/// Type a scalar from its text form.
///
/// Integers coerce to their non-negative magnitude, so a hostile "-5" reads
/// as 5 rather than smuggling a sign into downstream arithmetic.
fn sanitize_scalar(raw: &str) -> ParamValue {
    let trimmed = raw.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return ParamValue::Int(int.unsigned_abs());
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        if float.is_finite() {
            return ParamValue::Float(float);
        }
    }
    match trimmed {
        "true" => ParamValue::Bool(true),
        "false" => ParamValue::Bool(false),
        _ => ParamValue::Text(sanitize_text(raw)),
    }
}

fn flatten(raw: &RawValue, out: &mut Vec<String>) {
    match raw {
        RawValue::Text(s) => out.push(s.clone()),
        RawValue::List(items) => {
            for item in items {
                flatten(item, out);
            }
        }
        RawValue::Map(map) => {
            for value in map.values() {
                flatten(value, out);
            }
        }
    }
}

/// Escape free text: strip tag spans, drop control characters, collapse
/// whitespace runs, trim.
fn sanitize_text(input: &str) -> String {
    let stripped = strip_tags(input);
    let mut out = String::with_capacity(stripped.len());
    let mut pending_space = false;
    for c in stripped.chars() {
        if c.is_control() || c.is_whitespace() {
            pending_space = !out.is_empty();
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }
    out
}

/// Remove `<...>` spans. Text after an unclosed `<` is dropped.
fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
