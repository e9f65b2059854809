//! Data models for the exam portal.
//!
//! Field names follow the snake_case JSON contract of the admin and company dashboards.

mod auth;
mod company;
mod drive;
mod question;
mod registry;
mod student;
mod target;

pub use auth::*;
pub use company::*;
pub use drive::*;
pub use question::*;
pub use registry::*;
pub use student::*;
pub use target::*;
