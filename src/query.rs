//! Access predicates consulted to gate navigation and rendering
//!
//! Evaluation order for every query:
//! 1. No subject -> deny / empty
//! 2. Admin role or legacy wildcard -> allow / full catalog slice
//! 3. Structured metadata lookup on normalized arguments
//!
//! Step 3 denies anything unknown to the catalog and any orphaned entry
//! (a service whose department or factory entry is missing). Legacy maps
//! without the wildcard grant nothing here.

use crate::catalog::CapabilityCatalog;
use crate::keys::{normalize, prefixed_department, scope_key};
use crate::metadata::PermissionMetadata;
use crate::subject::{Grants, UserAccessSubject};

/// Read-only query view over one subject and the catalog
#[derive(Debug, Clone, Copy)]
pub struct AccessQuery<'a> {
    catalog: &'a CapabilityCatalog,
    subject: Option<&'a UserAccessSubject>,
}

/// Outcome of the shared override step
enum Scope<'a> {
    Deny,
    All,
    Metadata(&'a PermissionMetadata),
}

impl<'a> AccessQuery<'a> {
    pub fn new(catalog: &'a CapabilityCatalog, subject: Option<&'a UserAccessSubject>) -> Self {
        AccessQuery { catalog, subject }
    }

    fn scope(&self) -> Scope<'a> {
        let Some(subject) = self.subject else {
            return Scope::Deny;
        };
        if subject.has_override() {
            tracing::trace!(role = subject.role().as_str(), "admin override");
            return Scope::All;
        }
        match subject.grants() {
            Grants::Structured(meta) => Scope::Metadata(meta),
            Grants::Legacy(_) | Grants::None => Scope::Deny,
        }
    }

    // ========================================================================
    // Predicates
    // ========================================================================

    pub fn can_access_factory(&self, factory: &str) -> bool {
        match self.scope() {
            Scope::All => true,
            Scope::Deny => false,
            Scope::Metadata(meta) => {
                let f = normalize(factory);
                let ok = self.catalog.factory(&f).is_some() && meta.has_factory(&f);
                if !ok {
                    tracing::trace!(factory = %f, "factory access denied");
                }
                ok
            }
        }
    }

    /// Requires the exact prefixed department id (`kr_store`); the bare id is never tried
    pub fn can_access_factory_department(&self, factory: &str, department: &str) -> bool {
        match self.scope() {
            Scope::All => true,
            Scope::Deny => false,
            Scope::Metadata(meta) => {
                let (f, d) = (normalize(factory), normalize(department));
                let ok = self.catalog.department(&f, &d).is_some() && self.department_granted(meta, &f, &d);
                if !ok {
                    tracing::trace!(factory = %f, department = %d, "department access denied");
                }
                ok
            }
        }
    }

    pub fn can_access_service(&self, service: &str, factory: &str, department: &str) -> bool {
        match self.scope() {
            Scope::All => true,
            Scope::Deny => false,
            Scope::Metadata(meta) => {
                let (f, d, s) = (normalize(factory), normalize(department), normalize(service));
                let ok = self.catalog.contains_leaf(&f, &d, &s)
                    && self.department_granted(meta, &f, &d)
                    && meta.has_service(&f, &d, &s);
                if !ok {
                    tracing::trace!(factory = %f, department = %d, service = %s, "service access denied");
                }
                ok
            }
        }
    }

    // ========================================================================
    // Lists
    // ========================================================================

    /// Factories the subject may enter
    pub fn get_user_factories(&self) -> Vec<String> {
        match self.scope() {
            Scope::All => self.catalog.factory_ids(),
            Scope::Deny => Vec::new(),
            Scope::Metadata(meta) => meta
                .factories
                .iter()
                .filter(|f| self.catalog.factory(f).is_some())
                .cloned()
                .collect(),
        }
    }

    /// Departments of a factory. Under the override these are catalog ids;
    /// otherwise the stored prefixed ids.
    pub fn get_user_departments(&self, factory: &str) -> Vec<String> {
        let f = normalize(factory);
        match self.scope() {
            Scope::All => self.catalog.department_ids(&f),
            Scope::Deny => Vec::new(),
            Scope::Metadata(meta) => {
                let Some(cat) = self.catalog.factory(&f) else {
                    return Vec::new();
                };
                if !meta.has_factory(&f) {
                    return Vec::new();
                }
                let short = cat.short_code();
                let known: Vec<String> =
                    cat.departments.iter().map(|d| prefixed_department(&short, &d.id)).collect();
                meta.departments
                    .get(&f)
                    .map(|ds| ds.iter().filter(|d| known.contains(d)).cloned().collect())
                    .unwrap_or_default()
            }
        }
    }

    /// Services of one department
    pub fn get_user_services(&self, factory: &str, department: &str) -> Vec<String> {
        let (f, d) = (normalize(factory), normalize(department));
        match self.scope() {
            Scope::All => self.catalog.service_ids(&f, &d),
            Scope::Deny => Vec::new(),
            Scope::Metadata(meta) => {
                let Some(cat) = self.catalog.department(&f, &d) else {
                    return Vec::new();
                };
                if !self.department_granted(meta, &f, &d) {
                    return Vec::new();
                }
                meta.services
                    .get(&scope_key(&f, &d))
                    .map(|ss| ss.iter().filter(|s| cat.find_service(s).is_some()).cloned().collect())
                    .unwrap_or_default()
            }
        }
    }

    /// Factory entry present and prefixed department listed under it
    fn department_granted(&self, meta: &PermissionMetadata, factory: &str, department: &str) -> bool {
        let prefixed = prefixed_department(&self.catalog.short_code(factory), department);
        meta.has_factory(factory) && meta.has_department(factory, &prefixed)
    }
}

// ============================================================================
// Tests
// ============================================================================
