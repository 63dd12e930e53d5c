//! Vertex attribute streams and their GPU buffers.

mod attribute;
mod buffers;

pub use attribute::{AttributeSpec, BoundAttribute, triangle_attributes, validate};
pub use buffers::{BoundGeometry, upload_and_bind};
