pub mod agents;
pub mod compiler;
pub mod config;
pub mod fallback;
pub mod logging;
pub mod normalize;
pub mod orchestrator;
pub mod project;
pub mod schema;
pub mod store;

pub use compiler::{Bundle, compile, slugify};
pub use config::GenerationConfig;
pub use normalize::{NormalizeContext, normalize};
pub use orchestrator::{GenerationOutcome, GenerationSource, Orchestrator};
pub use project::ProjectContext;
pub use schema::{Component, ComponentKind, Screen, Specification};
pub use store::{BundleStore, FsBundleStore, PublishedBundle, StoredBundle};
