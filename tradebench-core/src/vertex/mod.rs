//! Vertex generators: thin [`crate::batch::BatchJob`] specializations that
//! materialize each batch window as `id|payload` lines.

mod named;
mod numbered;

pub use named::NamedVertexGenerator;
pub use numbered::NumberedVertexGenerator;
