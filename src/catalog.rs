//! Capability catalog: the static factory → department → service tree
//!
//! The catalog is loaded once from configuration and never mutated. It is
//! passed explicitly to every operation that needs it.
//!
//! JSON shape (document order is preserved):
//! ```json
//! {
//!   "kerur": {
//!     "name": "Kerur",
//!     "document_name": "KR",
//!     "departments": {
//!       "store": {
//!         "name": "Store",
//!         "services": { "kr_place_order": { "name": "Place Order" } }
//!       }
//!     }
//!   }
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::constants::{KIND_DEPARTMENT, KIND_FACTORY, KIND_SERVICE};
use crate::error::{AccessError, Result};
use crate::keys::{encode, is_identifier, normalize, PermissionKey};

/// A single grantable service (leaf of the tree)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub id: String,
    pub name: String,
}

/// A department and its services, in catalog order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub services: Vec<Service>,
}

impl Department {
    pub fn new(id: &str, name: &str) -> Self {
        Department { id: id.to_string(), name: name.to_string(), services: Vec::new() }
    }

    /// Append a service
    pub fn service(mut self, id: &str, name: &str) -> Self {
        self.services.push(Service { id: id.to_string(), name: name.to_string() });
        self
    }

    pub fn find_service(&self, service: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == service)
    }
}

/// A factory, its short-code source and its departments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Factory {
    pub id: String,
    pub name: String,
    /// Source of the short code prefixing department ids (`KR` -> `kr_store`)
    pub document_name: Option<String>,
    pub departments: Vec<Department>,
}

impl Factory {
    pub fn new(id: &str, name: &str) -> Self {
        Factory { id: id.to_string(), name: name.to_string(), document_name: None, departments: Vec::new() }
    }

    pub fn document_name(mut self, document_name: &str) -> Self {
        self.document_name = Some(document_name.to_string());
        self
    }

    /// Append a department
    pub fn department(mut self, department: Department) -> Self {
        self.departments.push(department);
        self
    }

    pub fn find_department(&self, department: &str) -> Option<&Department> {
        self.departments.iter().find(|d| d.id == department)
    }

    /// Short code: lowercased document name, or the factory id when absent
    pub fn short_code(&self) -> String {
        match self.document_name.as_deref().map(normalize) {
            Some(code) if !code.is_empty() => code,
            _ => self.id.clone(),
        }
    }

    /// Total number of leaves under this factory
    pub fn leaf_count(&self) -> usize {
        self.departments.iter().map(|d| d.services.len()).sum()
    }
}

/// The immutable catalog of valid identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityCatalog {
    factories: Vec<Factory>,
}

impl CapabilityCatalog {
    /// Build a catalog, validating identifiers at every level
    pub fn new(factories: Vec<Factory>) -> Result<Self> {
        let mut seen = HashSet::new();
        for f in &factories {
            check_id(KIND_FACTORY, &f.id, &mut seen)?;
            let mut seen_d = HashSet::new();
            for d in &f.departments {
                check_id(KIND_DEPARTMENT, &d.id, &mut seen_d)?;
                let mut seen_s = HashSet::new();
                for s in &d.services {
                    check_id(KIND_SERVICE, &s.id, &mut seen_s)?;
                }
            }
        }
        Ok(CapabilityCatalog { factories })
    }

    /// Parse a catalog from its JSON configuration form
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut de = serde_json::Deserializer::from_str(json);
        let raw: Vec<(String, RawFactory)> = ordered_entries(&mut de)?;
        de.end()?;
        let catalog = Self::new(raw.into_iter().map(|(id, f)| f.into_factory(id)).collect())?;
        tracing::info!(
            factories = catalog.factories.len(),
            leaves = catalog.leaf_count(),
            "capability catalog loaded"
        );
        Ok(catalog)
    }

    /// Read and parse a catalog file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|source| AccessError::Io { path: path.to_path_buf(), source })?;
        tracing::debug!(path = %path.display(), "reading capability catalog");
        Self::from_json_str(&json)
    }

    #[inline]
    pub fn factories(&self) -> &[Factory] {
        &self.factories
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Look up a factory; the argument is normalized first
    pub fn factory(&self, factory: &str) -> Option<&Factory> {
        let f = normalize(factory);
        self.factories.iter().find(|x| x.id == f)
    }

    pub fn department(&self, factory: &str, department: &str) -> Option<&Department> {
        self.factory(factory)?.find_department(&normalize(department))
    }

    pub fn contains_leaf(&self, factory: &str, department: &str, service: &str) -> bool {
        self.department(factory, department)
            .is_some_and(|d| d.find_service(&normalize(service)).is_some())
    }

    /// Short code for a factory; unknown factories fall back to their own id
    pub fn short_code(&self, factory: &str) -> String {
        match self.factory(factory) {
            Some(f) => f.short_code(),
            None => normalize(factory),
        }
    }

    pub fn factory_ids(&self) -> Vec<String> {
        self.factories.iter().map(|f| f.id.clone()).collect()
    }

    pub fn department_ids(&self, factory: &str) -> Vec<String> {
        self.factory(factory)
            .map(|f| f.departments.iter().map(|d| d.id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn service_ids(&self, factory: &str, department: &str) -> Vec<String> {
        self.department(factory, department)
            .map(|d| d.services.iter().map(|s| s.id.clone()).collect())
            .unwrap_or_default()
    }

    /// Every leaf in catalog order
    pub fn leaves(&self) -> impl Iterator<Item = PermissionKey> + '_ {
        self.factories.iter().flat_map(|f| {
            f.departments.iter().flat_map(move |d| {
                d.services.iter().map(move |s| PermissionKey {
                    factory: f.id.clone(),
                    department: d.id.clone(),
                    service: s.id.clone(),
                })
            })
        })
    }

    /// Encoded keys of every leaf
    pub fn leaf_keys(&self) -> Vec<String> {
        self.leaves().map(|k| encode(&k.factory, &k.department, &k.service)).collect()
    }

    pub fn leaf_count(&self) -> usize {
        self.factories.iter().map(Factory::leaf_count).sum()
    }
}

fn check_id(kind: &'static str, id: &str, seen: &mut HashSet<String>) -> Result<()> {
    if !is_identifier(id) {
        return Err(AccessError::InvalidIdentifier { kind, id: id.to_string() });
    }
    if !seen.insert(id.to_string()) {
        return Err(AccessError::DuplicateIdentifier { kind, id: id.to_string() });
    }
    Ok(())
}

// ============================================================================
// JSON configuration form
// ============================================================================

#[derive(Deserialize)]
struct RawFactory {
    #[serde(default)]
    name: String,
    #[serde(default)]
    document_name: Option<String>,
    #[serde(default, deserialize_with = "ordered_entries")]
    departments: Vec<(String, RawDepartment)>,
}

#[derive(Deserialize)]
struct RawDepartment {
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "ordered_entries")]
    services: Vec<(String, RawService)>,
}

#[derive(Deserialize)]
struct RawService {
    #[serde(default)]
    name: String,
}

impl RawFactory {
    fn into_factory(self, id: String) -> Factory {
        Factory {
            id,
            name: self.name,
            document_name: self.document_name,
            departments: self
                .departments
                .into_iter()
                .map(|(id, d)| Department {
                    id,
                    name: d.name,
                    services: d.services.into_iter().map(|(id, s)| Service { id, name: s.name }).collect(),
                })
                .collect(),
        }
    }
}

/// Deserialize a JSON object into `(key, value)` pairs in document order.
/// Repeated keys are kept so validation can reject them.
fn ordered_entries<'de, D, T>(deserializer: D) -> std::result::Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct OrderedVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
        type Value = Vec<(String, T)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of identifiers")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
            let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((k, v)) = map.next_entry::<String, T>()? {
                out.push((k, v));
            }
            Ok(out)
        }
    }

    deserializer.deserialize_map(OrderedVisitor(PhantomData))
}

// ============================================================================
// Tests
// ============================================================================
