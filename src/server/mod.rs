pub mod chain_manager;
pub mod node;
pub mod settings;

pub use chain_manager::ChainManager;
pub use node::Node;
pub use settings::*;
