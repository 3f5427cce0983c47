use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, trace};

use super::compiler::compile_stack;
use crate::instance::EffectInstance;
use crate::registry::EffectRegistry;

/// The GPU-resident parameter buffer owned by the rendering backend.
pub trait ParamBufferSink: Send {
    /// Replace the whole buffer contents.
    fn publish(&mut self, bytes: &[u8]) -> Result<()>;

    /// Give the underlying resource back. Called once from `shutdown`.
    fn release(&mut self) {}
}

#[derive(Debug, Default)]
struct HostBufferState {
    bytes: Vec<u8>,
    publish_count: u64,
    released: bool,
}

/// CPU-side stand-in for the GPU buffer; clones share one buffer.
#[derive(Debug, Clone, Default)]
pub struct HostParamBuffer {
    state: Arc<Mutex<HostBufferState>>,
}

impl HostParamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.state
            .lock()
            .map(|s| s.bytes.clone())
            .unwrap_or_default()
    }

    pub fn publish_count(&self) -> u64 {
        self.state.lock().map(|s| s.publish_count).unwrap_or(0)
    }

    pub fn is_released(&self) -> bool {
        self.state.lock().map(|s| s.released).unwrap_or(false)
    }
}

impl ParamBufferSink for HostParamBuffer {
    fn publish(&mut self, bytes: &[u8]) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("host param buffer lock poisoned"))?;
        state.bytes.clear();
        state.bytes.extend_from_slice(bytes);
        state.publish_count += 1;
        state.released = false;
        Ok(())
    }

    fn release(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.bytes = Vec::new();
            state.released = true;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Published {
    hash: u64,
    count: u32,
}

/// Recompiles every update and publishes only when the content hash or the
/// instance count differs from the last publish.
#[derive(Default)]
pub struct CompiledStackCache {
    registry: Option<Arc<EffectRegistry>>,
    sink: Option<Box<dyn ParamBufferSink>>,
    published: Option<Published>,
}

impl CompiledStackCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the cache to a registry and buffer. The next update always publishes.
    pub fn init(&mut self, registry: Arc<EffectRegistry>, sink: Box<dyn ParamBufferSink>) {
        if self.is_initialized() {
            self.shutdown();
        }
        self.registry = Some(registry);
        self.sink = Some(sink);
        self.published = None;
    }

    pub fn shutdown(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            sink.release();
            debug!("[cache] released parameter buffer");
        }
        self.registry = None;
        self.published = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.sink.is_some()
    }

    /// Returns whether the buffer was republished. A failed publish leaves
    /// the cache dirty so the next call tries again.
    pub fn update_if_dirty(&mut self, chain: &[EffectInstance]) -> Result<bool> {
        let (Some(registry), Some(sink)) = (self.registry.as_deref(), self.sink.as_mut()) else {
            bail!("compiled stack cache used before init");
        };

        let compiled = compile_stack(chain, registry);
        let current = Published {
            hash: compiled.hash(),
            count: compiled.count(),
        };
        if self.published == Some(current) {
            trace!("[cache] stack unchanged ({:016x})", current.hash);
            return Ok(false);
        }

        sink.publish(compiled.bytes())
            .context("failed to publish compiled effect stack")?;
        self.published = Some(current);
        debug!(
            "[cache] published {} effect(s), {} bytes, hash {:016x}",
            current.count,
            compiled.bytes().len(),
            current.hash
        );
        Ok(true)
    }

    /// Instance count of the last published stack.
    pub fn instance_count(&self) -> u32 {
        self.published.map_or(0, |p| p.count)
    }

    pub fn last_hash(&self) -> Option<u64> {
        self.published.map(|p| p.hash)
    }
}

impl Drop for CompiledStackCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}
