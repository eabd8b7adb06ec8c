pub mod dfs;
pub mod digraph;
pub mod error;
pub mod report;
pub mod tarjan;
pub mod text;

pub use dfs::{DepthFirstSearch, EdgeKind};
pub use digraph::{arb_digraph, Digraph};
pub use error::ParseError;
pub use tarjan::TarjanComponents;
