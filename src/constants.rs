//! Wire constants shared by the codec, the converter and the query layer

/// Separator between the parts of a permission key (`factory.department.service`)
pub const KEY_SEPARATOR: char = '.';

/// Separator between a factory short code and a department id (`kr_store`)
pub const PREFIX_SEPARATOR: char = '_';

/// Legacy permission key granting admin-equivalent access
pub const WILDCARD_PERMISSION: &str = "*";

/// Role names as they appear in user records
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

// Catalog levels, used in error messages and logs
pub const KIND_FACTORY: &str = "factory";
pub const KIND_DEPARTMENT: &str = "department";
pub const KIND_SERVICE: &str = "service";
