pub mod graph;
pub mod ids;
pub mod instance;
pub mod registry;
pub mod snapshot;
pub mod stack;

pub use graph::document::{ChainDocument, load_chain_from_path, save_chain_to_path};
pub use graph::{ChainError, ChainGraph, GraphError, NodeKind};
pub use ids::{LinkId, NodeId, PinId};
pub use instance::EffectInstance;
pub use registry::{EffectRegistry, EffectType, EffectTypeDef, MAX_PARAMS, ParameterSpec};
pub use stack::{CompiledStack, CompiledStackCache, HostParamBuffer, ParamBufferSink, compile_stack};
