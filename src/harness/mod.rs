// -- mod.rs --

mod pipeline;
mod table;
pub use pipeline::{Pipeline, PipelineReport};
pub use table::{Report, Table};
