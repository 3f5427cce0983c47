use bytemuck::{Pod, Zeroable};
use log::debug;

use crate::instance::EffectInstance;
use crate::registry::{EffectRegistry, MAX_PARAMS};

/// Buffer header. Matches the shader-side struct; keep the padding.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct StackHeader {
    pub count: u32,
    pub _pad0: u32,
    pub _pad1: u32,
    pub _pad2: u32,
}

/// One effect in the compiled stack.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct EffectRecord {
    pub type_id: u32,
    pub enabled: u32,
    pub param_count: u32,
    pub _pad0: u32,
    pub params: [f32; MAX_PARAMS],
}

pub const HEADER_SIZE: usize = std::mem::size_of::<StackHeader>();
pub const RECORD_SIZE: usize = std::mem::size_of::<EffectRecord>();

const _: () = assert!(HEADER_SIZE == 16);
const _: () = assert!(RECORD_SIZE == 16 + MAX_PARAMS * 4);

impl EffectRecord {
    /// Inert record for a type the registry does not know.
    pub fn disabled(type_id: u32) -> Self {
        Self {
            type_id,
            ..Self::zeroed()
        }
    }
}

/// Byte-exact parameter buffer for the post-processing shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStack {
    bytes: Vec<u8>,
    count: u32,
}

impl CompiledStack {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn hash(&self) -> u64 {
        fnv1a64(&self.bytes)
    }

    pub fn header(&self) -> StackHeader {
        bytemuck::pod_read_unaligned(&self.bytes[..HEADER_SIZE])
    }

    pub fn record(&self, index: usize) -> Option<EffectRecord> {
        let start = HEADER_SIZE + index * RECORD_SIZE;
        let slice = self.bytes.get(start..start + RECORD_SIZE)?;
        Some(bytemuck::pod_read_unaligned(slice))
    }

    pub fn records(&self) -> impl Iterator<Item = EffectRecord> + '_ {
        (0..self.count as usize).filter_map(|i| self.record(i))
    }
}

/// Compile an ordered effect list. Unknown types become disabled no-op
/// records; they never fail the whole stack.
pub fn compile_stack(instances: &[EffectInstance], registry: &EffectRegistry) -> CompiledStack {
    let count = instances.len() as u32;
    let mut bytes = Vec::with_capacity(HEADER_SIZE + instances.len() * RECORD_SIZE);

    let header = StackHeader {
        count,
        ..StackHeader::zeroed()
    };
    bytes.extend_from_slice(bytemuck::bytes_of(&header));
    for instance in instances {
        let record = compile_record(instance, registry);
        bytes.extend_from_slice(bytemuck::bytes_of(&record));
    }

    CompiledStack { bytes, count }
}

pub fn compile_record(instance: &EffectInstance, registry: &EffectRegistry) -> EffectRecord {
    let Some(ty) = registry.find(instance.type_id) else {
        debug!(
            "[stack] unknown effect type {} ('{}'), emitting disabled record",
            instance.type_id, instance.label
        );
        return EffectRecord::disabled(instance.type_id);
    };

    let n = ty.gpu_param_count();
    let mut params = [0.0_f32; MAX_PARAMS];
    params[..n].copy_from_slice(&instance.params[..n]);

    EffectRecord {
        type_id: ty.id,
        enabled: u32::from(instance.enabled),
        param_count: n as u32,
        _pad0: 0,
        params,
    }
}

/// 64-bit FNV-1a.
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
