//! Front-end side of the advisor: prompt composition and paginated result state.

pub mod compositor;
pub mod session;

pub use compositor::PromptFilters;
pub use session::{HttpBackend, PAGE_SIZE, RecommendBackend, RecommendationSession};
