mod common;

use std::sync::{Arc, Barrier};
use std::time::Duration;

use common::{init_tracing, shaders, shaders_from, MockBackend};
use dxbridge_pipeline::{
    AccessFlags, ComputePipelineStateInfo, ComputeShader, DescriptorType, DeviceFeatures,
    DeviceProperties, MemoryStateCache, PipelineManager, PipelineOptions, ResourceSlot,
    StateCache, StateCacheKey,
};
use pretty_assertions::assert_eq;

fn manager(backend: MockBackend) -> PipelineManager<MockBackend> {
    PipelineManager::new(backend, PipelineOptions::default(), None)
}

#[test]
fn compatible_states_share_a_pipeline() {
    init_tracing();
    let manager = manager(MockBackend::new());
    let pipeline = manager.create_compute_pipeline(shaders("cs", "fn main() {}"));

    let mut state = ComputePipelineStateInfo::default();
    let first = pipeline.get_pipeline_handle(&state).unwrap();

    // Push constants never select a variant.
    state.push_constants[0] = 42;
    let second = pipeline.get_pipeline_handle(&state).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    state.sc.spec_constants[0] = 1;
    let third = pipeline.get_pipeline_handle(&state).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));

    assert_eq!(pipeline.instance_count(), 2);
    assert_eq!(manager.backend().compiles(), 2);

    let stats = manager.stats().snapshot();
    assert_eq!(stats.compute_pipelines, 2);
    assert_eq!(stats.instance_hits, 1);
    assert_eq!(stats.instance_misses, 2);
}

#[test]
fn concurrent_requests_compile_once() {
    const THREADS: usize = 8;

    let manager = manager(MockBackend::with_delay(Duration::from_millis(20)));
    let pipeline = manager.create_compute_pipeline(shaders("cs", "fn main() {}"));
    let state = ComputePipelineStateInfo::default();
    let barrier = Barrier::new(THREADS);

    let handles: Vec<_> = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    pipeline.get_pipeline_handle(&state)
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|w| w.join().unwrap().unwrap())
            .collect()
    });

    assert_eq!(manager.backend().compiles(), 1);
    assert_eq!(pipeline.instance_count(), 1);
    assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
    assert_eq!(manager.stats().compute_pipelines(), 1);
}

#[test]
fn failed_compiles_are_retried() {
    let manager = manager(MockBackend::new());
    let pipeline = manager.create_compute_pipeline(shaders("cs", "fn main() {}"));
    let state = ComputePipelineStateInfo::default();

    manager.backend().set_fail(true);
    assert!(pipeline.get_pipeline_handle(&state).is_none());
    assert_eq!(pipeline.instance_count(), 0);

    manager.backend().set_fail(false);
    let handle = pipeline.get_pipeline_handle(&state).unwrap();
    assert_eq!(handle.serial, 1);
    assert_eq!(pipeline.instance_count(), 1);

    let stats = manager.stats().snapshot();
    assert_eq!(stats.compile_failures, 1);
    assert_eq!(stats.compute_pipelines, 1);
    assert_eq!(manager.backend().compiles(), 2);
}

#[test]
fn identical_shaders_share_a_pipeline_object() {
    let manager = manager(MockBackend::new());
    let a = manager.create_compute_pipeline(shaders("first", "fn main() {}"));
    let b = manager.create_compute_pipeline(shaders("second", "fn main() {}"));
    let c = manager.create_compute_pipeline(shaders("other", "fn main() { }"));

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(manager.compute_pipeline_count(), 2);
}

#[test]
fn same_code_with_different_interfaces_gets_separate_objects() {
    let manager = manager(MockBackend::new());
    let a = manager.create_compute_pipeline(shaders("a", "fn main() {}"));
    let b = manager.create_compute_pipeline(shaders_from(
        ComputeShader::new("b", "fn main() {}", "main")
            .with_workgroup_size([64, 1, 1])
            .with_resource_slots([ResourceSlot::new(
                0,
                DescriptorType::StorageBuffer,
                AccessFlags::WRITE,
            )]),
    ));

    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(manager.compute_pipeline_count(), 2);
    assert_eq!(a.layout().binding_count(), 0);
    assert_eq!(b.layout().binding_count(), 1);
    assert_eq!(b.shaders().cs.workgroup_size(), [64, 1, 1]);
    assert_eq!(b.shaders().cs.debug_name(), "b");
}

#[test]
fn precompiled_state_is_a_cache_hit() {
    let manager = manager(MockBackend::new());
    let pipeline = manager.create_compute_pipeline(shaders("cs", "fn main() {}"));
    let mut state = ComputePipelineStateInfo::default();
    state.binding_mask.set(2, true);

    pipeline.compile_pipeline(&state);
    pipeline.compile_pipeline(&state);
    assert_eq!(pipeline.instance_count(), 1);

    pipeline.get_pipeline_handle(&state).unwrap();
    assert_eq!(manager.backend().compiles(), 1);
    assert_eq!(manager.stats().snapshot().instance_hits, 1);
}

#[test]
fn binding_flags_and_user_constants_reach_the_backend() {
    let manager = manager(MockBackend::new());
    let cs = ComputeShader::new("cs", "fn main() {}", "main").with_resource_slots([
        ResourceSlot::new(10, DescriptorType::UniformBuffer, AccessFlags::READ),
        ResourceSlot::new(20, DescriptorType::StorageBuffer, AccessFlags::WRITE),
    ]);
    let pipeline = manager.create_compute_pipeline(shaders_from(cs));

    let mut state = ComputePipelineStateInfo::default();
    let storage_binding = pipeline.slot_mapping().get_binding_id(20).unwrap();
    state.binding_mask.set(storage_binding, true);
    state.sc.spec_constants[3] = 99;

    let handle = pipeline.get_pipeline_handle(&state).unwrap();
    let constants = &handle.spec_constants;
    assert_eq!(constants.get(0), Some(0));
    assert_eq!(constants.get(1), Some(1));
    assert_eq!(constants.get(dxbridge_pipeline::get_spec_id(3)), Some(99));
    assert_eq!(constants.len(), 2 + dxbridge_pipeline::MAX_NUM_SPEC_CONSTANTS);
}

#[test]
fn buffers_within_limits_become_dynamic() {
    let options = PipelineOptions {
        max_dynamic_uniform_buffers: 1,
        max_dynamic_storage_buffers: 1,
        ..PipelineOptions::default()
    };
    let manager = PipelineManager::new(MockBackend::new(), options, None);
    let cs = ComputeShader::new("cs", "fn main() {}", "main").with_resource_slots([
        ResourceSlot::new(0, DescriptorType::UniformBuffer, AccessFlags::READ),
        ResourceSlot::new(1, DescriptorType::StorageBuffer, AccessFlags::READ),
        ResourceSlot::new(2, DescriptorType::StorageBuffer, AccessFlags::WRITE),
    ]);
    let pipeline = manager.create_compute_pipeline(shaders_from(cs));

    let types: Vec<_> = pipeline
        .layout()
        .bindings()
        .iter()
        .map(|b| b.descriptor_type)
        .collect();
    assert_eq!(
        types,
        vec![
            DescriptorType::UniformBufferDynamic,
            DescriptorType::StorageBuffer,
            DescriptorType::StorageBuffer,
        ]
    );
    assert_eq!(pipeline.layout().dynamic_binding_count(), 1);
}

#[test]
fn subgroup_controls_follow_device_support() {
    let backend = MockBackend::with_device(
        DeviceFeatures {
            subgroup_size_control: true,
            compute_full_subgroups: true,
        },
        DeviceProperties {
            min_subgroup_size: 16,
            max_subgroup_size: 64,
            max_compute_workgroup_subgroups: 8,
        },
    );
    let manager = manager(backend);
    let cs = ComputeShader::new("cs", "fn main() {}", "main")
        .with_workgroup_size([64, 1, 1])
        .with_min_subgroup_size(32);
    let pipeline = manager.create_compute_pipeline(shaders_from(cs));

    let handle = pipeline
        .get_pipeline_handle(&ComputePipelineStateInfo::default())
        .unwrap();
    assert_eq!(handle.required_subgroup_size, Some(32));
    assert!(handle.require_full_subgroups);
}

#[test]
fn new_states_are_written_to_the_state_cache_once() {
    let cache = Arc::new(MemoryStateCache::new());
    let manager = PipelineManager::new(
        MockBackend::new(),
        PipelineOptions::default(),
        Some(cache.clone() as Arc<dyn StateCache>),
    );
    let shaders = shaders("cs", "fn main() {}");
    let pipeline = manager.create_compute_pipeline(shaders.clone());

    let mut state = ComputePipelineStateInfo::default();
    pipeline.get_pipeline_handle(&state).unwrap();
    pipeline.get_pipeline_handle(&state).unwrap();
    state.binding_mask.set(3, true);
    pipeline.get_pipeline_handle(&state).unwrap();

    let entries = cache.entries();
    assert_eq!(entries.len(), 2);
    assert!(entries
        .iter()
        .all(|e| e.key == StateCacheKey::for_compute(&shaders)));
    assert_eq!(entries[1].state, state);
    assert_eq!(manager.stats().snapshot().state_cache_writes, 2);
}

#[test]
fn state_cache_writes_can_be_disabled() {
    let cache = Arc::new(MemoryStateCache::new());
    let options = PipelineOptions {
        enable_state_cache: false,
        ..PipelineOptions::default()
    };
    let manager = PipelineManager::new(MockBackend::new(), options, Some(cache.clone()));
    let pipeline = manager.create_compute_pipeline(shaders("cs", "fn main() {}"));

    pipeline
        .get_pipeline_handle(&ComputePipelineStateInfo::default())
        .unwrap();
    assert!(cache.is_empty());
}
