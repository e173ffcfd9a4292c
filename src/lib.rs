//! factory-access - hierarchical factory/department/service authorization
//!
//! Grants live on a three-level tree and come in two shapes:
//! - `TreePermissionMap`: flat `factory.department.service -> bool`, used while editing
//! - `PermissionMetadata`: compact `{factories, departments, services}`, used for storage
//!
//! Everything here is pure and synchronous. Absent or malformed data resolves
//! to "no access", never to an error.
//!
//! ```
//! use factory_access::*;
//!
//! let catalog = CapabilityCatalog::new(vec![
//!     Factory::new("kerur", "Kerur").document_name("KR").department(
//!         Department::new("store", "Store").service("kr_place_order", "Place Order"),
//!     ),
//! ]).unwrap();
//!
//! let mut tree = TreePermissionMap::new();
//! SelectionAggregator::new(&catalog).set_node_granted(&SelectionNode::factory("kerur"), true, &mut tree);
//!
//! let user = UserAccessSubject::with_metadata(Role::User, to_metadata(&tree, &catalog));
//! let query = AccessQuery::new(&catalog, Some(&user));
//! assert!(query.can_access_service("kr_place_order", "kerur", "store"));
//! ```

pub mod catalog;
pub mod constants;
pub mod error;
pub mod keys;
pub mod metadata;
pub mod query;
pub mod selection;
pub mod subject;

pub use catalog::{CapabilityCatalog, Department, Factory, Service};
pub use constants::*;
pub use error::{AccessError, Result};
pub use keys::{decode, encode, normalize, prefixed_department, scope_key, PermissionKey};
pub use metadata::{to_metadata, PermissionMetadata, TreePermissionMap};
pub use query::AccessQuery;
pub use selection::{SelectionAggregator, SelectionNode};
pub use subject::{Grants, Role, UserAccessSubject, UserRecord};
