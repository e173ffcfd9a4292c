//! Malformed input handling
//!
//! Bad keys, non-boolean values and inconsistent metadata must degrade to
//! "no access" without panicking.

use factory_access::{
    decode, encode, to_metadata, AccessQuery, CapabilityCatalog, PermissionKey, PermissionMetadata, Role,
    TreePermissionMap, UserAccessSubject, UserRecord,
};
use serde_json::json;

fn catalog() -> CapabilityCatalog {
    CapabilityCatalog::from_json_str(include_str!("fixtures/catalog.json")).unwrap()
}

// ============================================================================
// Keys
// ============================================================================

#[test]
fn malformed_keys_decode_to_none() {
    for key in ["", ".", "..", "...", "kerur", "kerur.store", "kerur.store.a.b", "kerur. .a", " .store.a"] {
        assert_eq!(decode(key), None, "{key:?}");
    }
}

#[test]
fn strict_parse_rejects_what_decode_skips() {
    assert!("kerur.store".parse::<PermissionKey>().is_err());
    assert_eq!(
        "KERUR.store.kr-place-order".parse::<PermissionKey>().unwrap(),
        PermissionKey::new("kerur", "store", "kr_place_order")
    );
}

#[test]
fn encode_coerces_any_input() {
    assert_eq!(encode("", "", ""), "..");
    assert_eq!(decode(&encode("", "", "")), None);
    assert_eq!(encode(" A-B ", "C", "d-e-f"), "a_b.c.d_e_f");
}

// ============================================================================
// Conversion
// ============================================================================

#[test]
fn conversion_skips_malformed_and_non_boolean() {
    let tree: TreePermissionMap = serde_json::from_value(json!({
        "*": true,
        "kerur.store": true,
        "kerur.store.kr_place_order.extra": true,
        "kerur.store.kr_material_inward": "yes",
        "kerur.store.kr_place_order": true,
        "humnabad.store.hb_place_order": null
    }))
    .unwrap();

    let meta = to_metadata(&tree, &catalog());
    let leaves: Vec<_> = meta.leaves().collect();
    assert_eq!(leaves, vec![PermissionKey::new("kerur", "store", "kr_place_order")]);
}

#[test]
fn conversion_records_unknown_catalog_leaves() {
    let mut tree = TreePermissionMap::new();
    tree.set("mysore.store.x", true);
    let meta = to_metadata(&tree, &catalog());

    assert_eq!(meta.factories, vec!["mysore"]);
    assert_eq!(meta.departments["mysore"], vec!["mysore_store"]);

    // Stored, but never granted by a query
    let user = UserAccessSubject::with_metadata(Role::User, meta);
    let c = catalog();
    let q = AccessQuery::new(&c, Some(&user));
    assert!(!q.can_access_factory("mysore"));
    assert!(!q.can_access_service("x", "mysore", "store"));
}

#[test]
fn conversion_normalizes_keys() {
    let mut tree = TreePermissionMap::new();
    tree.set(" Kerur.STORE.kr-place-order ", true);
    let meta = to_metadata(&tree, &catalog());
    assert_eq!(meta.services["kerur.store"], vec!["kr_place_order"]);
}

// ============================================================================
// Externally supplied metadata
// ============================================================================

#[test]
fn orphaned_entries_deny() {
    let c = catalog();
    let meta: PermissionMetadata = serde_json::from_value(json!({
        "factories": [],
        "departments": { "kerur": ["kr_store"] },
        "services": { "kerur.store": ["kr_place_order"] }
    }))
    .unwrap();
    assert_eq!(meta.orphaned_leaves(&c).count(), 1);

    let user = UserAccessSubject::with_metadata(Role::User, meta);
    let q = AccessQuery::new(&c, Some(&user));
    assert!(!q.can_access_factory("kerur"));
    assert!(!q.can_access_factory_department("kerur", "store"));
    assert!(!q.can_access_service("kr_place_order", "kerur", "store"));
    assert!(q.get_user_departments("kerur").is_empty());
    assert!(q.get_user_services("kerur", "store").is_empty());
}

#[test]
fn malformed_scope_keys_ignored() {
    let meta: PermissionMetadata = serde_json::from_value(json!({
        "factories": ["kerur"],
        "departments": { "kerur": ["kr_store"] },
        "services": { "kerur": ["kr_place_order"], "kerur.store.extra": ["x"], "kerur.store": ["kr_place_order"] }
    }))
    .unwrap();
    assert_eq!(meta.leaves().count(), 1);
}

#[test]
fn partial_record_fields_default() {
    let record: UserRecord = serde_json::from_value(json!({})).unwrap();
    assert_eq!(record.role, "");
    assert!(record.permissions.is_none());
    assert!(record.permission_metadata.is_none());

    let c = catalog();
    let user = UserAccessSubject::from_record(&record);
    assert!(!AccessQuery::new(&c, Some(&user)).can_access_factory("kerur"));
}

#[test]
fn wrong_typed_metadata_is_a_parse_error() {
    let result: Result<UserRecord, _> = serde_json::from_value(json!({
        "role": "user",
        "permission_metadata": { "factories": "kerur" }
    }));
    assert!(result.is_err());
}
