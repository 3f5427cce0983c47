//! Compiled effect stack: the fixed-layout parameter buffer read by the
//! post-processing shader, and the cache that decides when to upload it.
//!
//! Wire format (native byte order, little-endian on every supported GPU host):
//! - header: `count: u32` + three reserved `u32` (16 bytes)
//! - `count` records: `type: u32`, `enabled: u32`, `paramCount: u32`,
//!   reserved `u32`, `params: [f32; 16]` (80 bytes each)

pub mod cache;
pub mod compiler;

pub use cache::{CompiledStackCache, HostParamBuffer, ParamBufferSink};
pub use compiler::{
    CompiledStack, EffectRecord, HEADER_SIZE, RECORD_SIZE, StackHeader, compile_record,
    compile_stack, fnv1a64,
};
