//! Domain models with validation at construction
//!
//! All user input is validated when creating these types.
//! Invalid input returns ValidationError, not panic.

pub mod access;
pub mod audio;
pub mod lineage;
pub mod pagination;
pub mod tag;
pub mod title;
pub mod user;
pub mod validation;

pub use access::{require_owner, AccessDenied, ProjectAccess};
pub use audio::{Bpm, Duration};
pub use lineage::{build_family_tree, FamilyNode, FamilyTree, LineageEntry};
pub use pagination::{Paginated, Pagination, PaginationParams};
pub use tag::TagName;
pub use title::{Description, Title};
pub use user::{DisplayName, Email};
pub use validation::ValidationError;
