//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod job_repo;
pub mod log_repo;
pub mod profile_repo;
pub mod template_repo;

pub use job_repo::JobRepo;
pub use log_repo::LogRepo;
pub use profile_repo::ProfileRepo;
pub use template_repo::TemplateRepo;
