mod arguments;
mod classpath;
mod task;

pub use arguments::{expand, substitute, Placeholders};
pub use classpath::{build_classpath, extract_natives, join_classpath};
pub use task::{launch, LaunchInput, LaunchOutcome, LaunchPlan};
