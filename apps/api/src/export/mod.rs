// CV export pipeline: capture the rendered template, split it across A4 pages,
// assemble a PDF. CPU-bound steps run inside tokio::task::spawn_blocking.

pub mod assembler;
pub mod filename;
pub mod handlers;
pub mod orchestrator;
pub mod pagination;

pub use orchestrator::{ExportOrchestrator, ExportSettings};
pub use pagination::SliceStrategy;
