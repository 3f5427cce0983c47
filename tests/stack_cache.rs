use std::sync::Arc;

use anyhow::{Result, bail};
use postfx_graph::stack::{HEADER_SIZE, RECORD_SIZE, fnv1a64};
use postfx_graph::{
    CompiledStackCache, EffectInstance, EffectRegistry, HostParamBuffer, ParamBufferSink,
    compile_stack,
};

fn registry() -> Arc<EffectRegistry> {
    Arc::new(EffectRegistry::with_builtins().unwrap())
}

fn sample_chain(registry: &EffectRegistry) -> Vec<EffectInstance> {
    ["Exposure", "Bloom", "Vignette"]
        .iter()
        .map(|name| registry.make_node(registry.find_by_name(name).unwrap().id).unwrap())
        .collect()
}

#[test]
fn cached_bytes_match_a_direct_compile() {
    let registry = registry();
    let chain = sample_chain(&registry);
    let buffer = HostParamBuffer::new();
    let mut cache = CompiledStackCache::new();
    cache.init(Arc::clone(&registry), Box::new(buffer.clone()));

    assert!(cache.update_if_dirty(&chain).unwrap());
    let direct = compile_stack(&chain, &registry);
    assert_eq!(buffer.contents(), direct.bytes());
    assert_eq!(buffer.contents().len(), HEADER_SIZE + 3 * RECORD_SIZE);
    assert_eq!(cache.last_hash(), Some(fnv1a64(direct.bytes())));
    assert_eq!(cache.instance_count(), 3);
}

#[test]
fn every_param_slot_is_change_detected() {
    let registry = registry();
    let mut chain = sample_chain(&registry);
    let mut cache = CompiledStackCache::new();
    cache.init(Arc::clone(&registry), Box::new(HostParamBuffer::new()));
    assert!(cache.update_if_dirty(&chain).unwrap());

    for i in 0..chain.len() {
        let gpu = registry.find(chain[i].type_id).unwrap().gpu_param_count();
        for slot in 0..gpu {
            chain[i].params[slot] += 0.125;
            assert!(cache.update_if_dirty(&chain).unwrap(), "instance {i} slot {slot}");
            assert!(!cache.update_if_dirty(&chain).unwrap());
        }
    }
}

#[test]
fn bloom_only_forwards_its_gpu_params() {
    let registry = registry();
    let bloom = registry.find_by_name("Bloom").unwrap();
    assert!(bloom.param_count() > bloom.gpu_param_count());

    let mut cache = CompiledStackCache::new();
    cache.init(Arc::clone(&registry), Box::new(HostParamBuffer::new()));
    let mut chain = vec![registry.make_node(bloom.id).unwrap()];
    assert!(cache.update_if_dirty(&chain).unwrap());

    // A CPU-only parameter does not dirty the GPU stack.
    chain[0].params[bloom.param_count() - 1] += 1.0;
    assert!(!cache.update_if_dirty(&chain).unwrap());
}

#[test]
fn reordering_or_resizing_the_chain_republishes() {
    let registry = registry();
    let mut chain = sample_chain(&registry);
    let mut cache = CompiledStackCache::new();
    cache.init(Arc::clone(&registry), Box::new(HostParamBuffer::new()));
    assert!(cache.update_if_dirty(&chain).unwrap());

    chain.swap(0, 2);
    assert!(cache.update_if_dirty(&chain).unwrap());

    chain.pop();
    assert!(cache.update_if_dirty(&chain).unwrap());
    assert_eq!(cache.instance_count(), 2);

    chain.clear();
    assert!(cache.update_if_dirty(&chain).unwrap());
    assert_eq!(cache.instance_count(), 0);
}

struct FlakySink {
    fail_next: bool,
    inner: HostParamBuffer,
}

impl ParamBufferSink for FlakySink {
    fn publish(&mut self, bytes: &[u8]) -> Result<()> {
        if std::mem::take(&mut self.fail_next) {
            bail!("queue submission failed");
        }
        self.inner.publish(bytes)
    }

    fn release(&mut self) {
        self.inner.release();
    }
}

#[test]
fn failed_publish_is_retried_on_next_update() {
    let registry = registry();
    let chain = sample_chain(&registry);
    let buffer = HostParamBuffer::new();
    let mut cache = CompiledStackCache::new();
    cache.init(
        Arc::clone(&registry),
        Box::new(FlakySink {
            fail_next: true,
            inner: buffer.clone(),
        }),
    );

    assert!(cache.update_if_dirty(&chain).is_err());
    assert_eq!(buffer.publish_count(), 0);
    assert!(cache.update_if_dirty(&chain).unwrap());
    assert_eq!(buffer.publish_count(), 1);
}
