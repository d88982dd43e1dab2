pub mod compile;
pub mod diagnostics;
pub mod filter;
pub mod js_emit;
pub mod loader;
pub mod record;
pub mod registry;
pub mod resolve;
pub mod schema;
