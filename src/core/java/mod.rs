mod runtime;

pub use runtime::{
    adoptium_binary_url, ensure_runtime, find_java_executable, normalize_layout, RuntimeRequest,
};
