//! Tree-permission maps and the compact permission metadata they convert to
//!
//! - `TreePermissionMap`: edit-time `factory.department.service -> bool`
//! - `PermissionMetadata`: persisted `{factories, departments, services}`
//!
//! Conversion only runs one way. Metadata is a lossy projection; leaf-level
//! truth is read back from `services` via [`PermissionMetadata::leaves`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::CapabilityCatalog;
use crate::keys::{decode, encode, normalize, parse_scope, prefixed_department, scope_key, PermissionKey};

/// Flat edit-time permission map
///
/// Only `true` entries are grants. Deserializing drops entries whose value
/// is not a JSON boolean. Keys keep the position of their first insertion,
/// which is the order conversion emits them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "IndexMap<String, Value>")]
pub struct TreePermissionMap(IndexMap<String, bool>);

impl From<IndexMap<String, Value>> for TreePermissionMap {
    fn from(raw: IndexMap<String, Value>) -> Self {
        TreePermissionMap(
            raw.into_iter()
                .filter_map(|(k, v)| match v {
                    Value::Bool(b) => Some((k, b)),
                    _ => {
                        tracing::debug!(key = %k, "ignoring non-boolean permission entry");
                        None
                    }
                })
                .collect(),
        )
    }
}

impl FromIterator<(String, bool)> for TreePermissionMap {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        TreePermissionMap(iter.into_iter().collect())
    }
}

impl TreePermissionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// True only for an explicit `true` entry
    #[inline]
    pub fn is_granted(&self, key: &str) -> bool {
        self.0.get(key).copied().unwrap_or(false)
    }

    /// Set a raw key (used for legacy keys such as the wildcard)
    #[inline]
    pub fn set(&mut self, key: impl Into<String>, value: bool) {
        self.0.insert(key.into(), value);
    }

    /// Set a leaf by its parts; the key is built by the codec
    pub fn set_leaf(&mut self, factory: &str, department: &str, service: &str, value: bool) {
        self.0.insert(encode(factory, department, service), value);
    }

    pub fn is_leaf_granted(&self, factory: &str, department: &str, service: &str) -> bool {
        self.is_granted(&encode(factory, department, service))
    }

    /// Set many keys in one batch
    pub fn set_all<I: IntoIterator<Item = String>>(&mut self, keys: I, value: bool) {
        self.0.extend(keys.into_iter().map(|k| (k, value)));
    }

    /// Keys whose value is `true`, in first-insertion order
    pub fn granted_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().filter(|(_, v)| **v).map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Compact persisted form of a user's grants
///
/// Deserialized entries are normalized the same way query arguments are, so
/// a collaborator writing `"Kerur"` still matches `kerur`. Object key order
/// is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawMetadata")]
pub struct PermissionMetadata {
    /// Factories with at least one granted leaf
    pub factories: Vec<String>,
    /// factory -> prefixed department ids (`kr_store`)
    pub departments: IndexMap<String, Vec<String>>,
    /// `factory.department` -> granted service ids
    pub services: IndexMap<String, Vec<String>>,
}

/// Wire form before normalization
#[derive(Deserialize)]
struct RawMetadata {
    #[serde(default)]
    factories: Vec<String>,
    #[serde(default)]
    departments: IndexMap<String, Vec<String>>,
    #[serde(default)]
    services: IndexMap<String, Vec<String>>,
}

impl From<RawMetadata> for PermissionMetadata {
    fn from(raw: RawMetadata) -> Self {
        let mut meta = PermissionMetadata::new();
        for f in &raw.factories {
            push_unique(&mut meta.factories, &normalize(f));
        }
        for (f, ds) in &raw.departments {
            let entry = meta.departments.entry(normalize(f)).or_default();
            for d in ds {
                push_unique(entry, &normalize(d));
            }
        }
        for (scope, ss) in &raw.services {
            // malformed scopes are kept verbatim; `leaves` skips them
            let key = match parse_scope(scope) {
                Some((f, d)) => scope_key(&f, &d),
                None => scope.clone(),
            };
            let entry = meta.services.entry(key).or_default();
            for s in ss {
                push_unique(entry, &normalize(s));
            }
        }
        meta
    }
}

impl PermissionMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one granted leaf, keeping the parent entries consistent
    pub fn insert_leaf(&mut self, catalog: &CapabilityCatalog, key: &PermissionKey) {
        push_unique(&mut self.factories, &key.factory);
        let prefixed = prefixed_department(&catalog.short_code(&key.factory), &key.department);
        push_unique(self.departments.entry(key.factory.clone()).or_default(), &prefixed);
        push_unique(self.services.entry(key.scope()).or_default(), &key.service);
    }

    #[inline]
    pub fn has_factory(&self, factory: &str) -> bool {
        self.factories.iter().any(|f| f == factory)
    }

    pub fn has_department(&self, factory: &str, prefixed: &str) -> bool {
        self.departments.get(factory).is_some_and(|ds| ds.iter().any(|d| d == prefixed))
    }

    pub fn has_service(&self, factory: &str, department: &str, service: &str) -> bool {
        self.services
            .get(&scope_key(factory, department))
            .is_some_and(|ss| ss.iter().any(|s| s == service))
    }

    /// Leaves recoverable from `services`. Malformed scope keys are skipped.
    pub fn leaves(&self) -> impl Iterator<Item = PermissionKey> + '_ {
        self.services.iter().flat_map(|(scope, services)| {
            let parsed = parse_scope(scope);
            services.iter().filter_map(move |s| {
                let (f, d) = parsed.as_ref()?;
                decode(&encode(f, d, s))
            })
        })
    }

    /// Services whose parent department or factory entry is missing
    pub fn orphaned_leaves<'a>(&'a self, catalog: &'a CapabilityCatalog) -> impl Iterator<Item = PermissionKey> + 'a {
        self.leaves().filter(move |k| {
            let prefixed = prefixed_department(&catalog.short_code(&k.factory), &k.department);
            !self.has_factory(&k.factory) || !self.has_department(&k.factory, &prefixed)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty() && self.departments.is_empty() && self.services.is_empty()
    }
}

/// Convert an edit-time map into persisted metadata
///
/// Only `true` entries with well-formed keys contribute. Grants for leaves the
/// catalog does not know are still recorded; the catalog is consulted only
/// for factory short codes.
pub fn to_metadata(tree: &TreePermissionMap, catalog: &CapabilityCatalog) -> PermissionMetadata {
    let mut meta = PermissionMetadata::new();
    let mut skipped = 0usize;
    for key in tree.granted_keys() {
        match decode(key) {
            Some(leaf) => meta.insert_leaf(catalog, &leaf),
            None => {
                skipped += 1;
                tracing::debug!(key, "skipping malformed permission key");
            }
        }
    }
    tracing::trace!(factories = meta.factories.len(), skipped, "converted tree permissions");
    meta
}

#[inline]
fn push_unique(set: &mut Vec<String>, value: &str) {
    if !set.iter().any(|v| v == value) {
        set.push(value.to_string());
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Department, Factory};
    use std::collections::BTreeSet;

    fn catalog() -> CapabilityCatalog {
        CapabilityCatalog::new(vec![
            Factory::new("kerur", "Kerur").document_name("KR").department(
                Department::new("store", "Store")
                    .service("kr_place_order", "Place Order")
                    .service("kr_material_inward", "Material Inward"),
            ),
            Factory::new("humnabad", "Humnabad")
                .department(Department::new("store", "Store").service("hb_place_order", "Place Order")),
        ])
        .unwrap()
    }

    #[test]
    fn test_single_grant() {
        let mut tree = TreePermissionMap::new();
        tree.set("kerur.store.kr_place_order", true);
        let meta = to_metadata(&tree, &catalog());

        assert_eq!(meta.factories, vec!["kerur"]);
        assert_eq!(meta.departments["kerur"], vec!["kr_store"]);
        assert_eq!(meta.services["kerur.store"], vec!["kr_place_order"]);
    }

    #[test]
    fn test_output_follows_grant_order() {
        let mut tree = TreePermissionMap::new();
        tree.set("kerur.store.kr_place_order", true);
        tree.set("humnabad.store.hb_place_order", true);
        tree.set("kerur.store.kr_material_inward", true);
        // re-setting keeps the original position
        tree.set("kerur.store.kr_place_order", true);
        let meta = to_metadata(&tree, &catalog());

        assert_eq!(meta.factories, vec!["kerur", "humnabad"]);
        assert_eq!(meta.services["kerur.store"], vec!["kr_place_order", "kr_material_inward"]);
        let scopes: Vec<_> = meta.services.keys().collect();
        assert_eq!(scopes, vec!["kerur.store", "humnabad.store"]);
    }

    #[test]
    fn test_json_document_order_kept() {
        let tree: TreePermissionMap = serde_json::from_str(
            r#"{"kerur.store.kr_place_order": true, "kerur.store.kr_material_inward": true}"#,
        )
        .unwrap();
        let meta = to_metadata(&tree, &catalog());
        assert_eq!(meta.services["kerur.store"], vec!["kr_place_order", "kr_material_inward"]);
    }

    #[test]
    fn test_false_entries_ignored() {
        let mut tree = TreePermissionMap::new();
        tree.set("kerur.store.kr_place_order", false);
        assert!(to_metadata(&tree, &catalog()).is_empty());
    }

    #[test]
    fn test_duplicates_suppressed() {
        let mut tree = TreePermissionMap::new();
        tree.set("kerur.store.kr_place_order", true);
        tree.set("kerur.store.kr_material_inward", true);
        let meta = to_metadata(&tree, &catalog());

        assert_eq!(meta.factories, vec!["kerur"]);
        assert_eq!(meta.departments["kerur"], vec!["kr_store"]);
        assert_eq!(meta.services["kerur.store"].len(), 2);
    }

    #[test]
    fn test_short_code_fallback() {
        let mut tree = TreePermissionMap::new();
        tree.set("humnabad.store.hb_place_order", true);
        tree.set("mysore.store.x", true);
        let meta = to_metadata(&tree, &catalog());

        assert_eq!(meta.departments["humnabad"], vec!["humnabad_store"]);
        assert_eq!(meta.departments["mysore"], vec!["mysore_store"]);
        assert_eq!(meta.services["mysore.store"], vec!["x"]);
    }

    #[test]
    fn test_malformed_keys_skipped() {
        let mut tree = TreePermissionMap::new();
        tree.set("*", true);
        tree.set("kerur.store", true);
        tree.set("kerur..x", true);
        tree.set("kerur.store.kr_place_order", true);
        let meta = to_metadata(&tree, &catalog());

        assert_eq!(meta.factories, vec!["kerur"]);
        assert_eq!(meta.leaves().count(), 1);
    }

    #[test]
    fn test_leaves_match_granted_keys() {
        let mut tree = TreePermissionMap::new();
        tree.set_leaf("kerur", "store", "kr_place_order", true);
        tree.set_leaf("humnabad", "store", "hb_place_order", true);
        tree.set_leaf("kerur", "store", "kr_material_inward", false);
        let meta = to_metadata(&tree, &catalog());

        let leaves: BTreeSet<_> = meta.leaves().collect();
        let expected: BTreeSet<_> = tree.granted_keys().filter_map(decode).collect();
        assert_eq!(leaves, expected);
        assert_eq!(meta.orphaned_leaves(&catalog()).count(), 0);
    }

    #[test]
    fn test_non_boolean_values_dropped() {
        let tree: TreePermissionMap = serde_json::from_str(
            r#"{"kerur.store.kr_place_order": "true", "kerur.store.kr_material_inward": true, "x": 1}"#,
        )
        .unwrap();
        assert_eq!(tree.len(), 1);
        assert!(tree.is_granted("kerur.store.kr_material_inward"));
        assert!(!tree.is_granted("kerur.store.kr_place_order"));
    }

    #[test]
    fn test_metadata_wire_shape() {
        let mut tree = TreePermissionMap::new();
        tree.set("kerur.store.kr_place_order", true);
        let json = serde_json::to_value(to_metadata(&tree, &catalog())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "factories": ["kerur"],
                "departments": { "kerur": ["kr_store"] },
                "services": { "kerur.store": ["kr_place_order"] }
            })
        );
    }

    #[test]
    fn test_metadata_missing_fields_default() {
        let meta: PermissionMetadata = serde_json::from_str(r#"{"factories": ["kerur"]}"#).unwrap();
        assert!(meta.departments.is_empty());
        assert!(meta.services.is_empty());
    }

    #[test]
    fn test_metadata_key_order_survives_reserialize() {
        let json = r#"{"factories":["kerur","humnabad"],"departments":{"kerur":["kr_store"],"humnabad":["humnabad_store"]},"services":{"kerur.store":["kr_place_order"],"humnabad.store":["hb_place_order"]}}"#;
        let meta: PermissionMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(serde_json::to_string(&meta).unwrap(), json);
    }

    #[test]
    fn test_metadata_entries_normalized() {
        let meta: PermissionMetadata = serde_json::from_str(
            r#"{
                "factories": ["Kerur", "kerur"],
                "departments": {"Kerur ": ["KR_Store", "kr_store"]},
                "services": {"Kerur.Store": ["KR-Place-Order"], "kerur.store": ["kr_place_order"]}
            }"#,
        )
        .unwrap();
        assert_eq!(meta.factories, vec!["kerur"]);
        assert_eq!(meta.departments["kerur"], vec!["kr_store"]);
        assert_eq!(meta.services["kerur.store"], vec!["kr_place_order"]);
        assert!(meta.has_service("kerur", "store", "kr_place_order"));
    }

    #[test]
    fn test_orphaned_leaves() {
        let meta: PermissionMetadata = serde_json::from_str(
            r#"{"factories": [], "departments": {}, "services": {"kerur.store": ["kr_place_order"]}}"#,
        )
        .unwrap();
        let orphans: Vec<_> = meta.orphaned_leaves(&catalog()).collect();
        assert_eq!(orphans, vec![PermissionKey::new("kerur", "store", "kr_place_order")]);
    }
}
