//! Application services layer.

pub mod content;
pub mod dispatch;
pub mod error;
pub mod pagination;
pub mod render;
pub mod submissions;
