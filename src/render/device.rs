use crate::math::vector::Vec2i;
use crate::render::tile::{spawn_workers, TileContext};
use crate::render::{Schedule, WorkerError};

use log::info;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// Where a device's current operation stands. Transitions serialize
/// through one lock; workers observe them cooperatively between pixel
/// samples.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperationState {
    Unassigned,
    Running,
    /// Workers parked on their dispatch events between tiles.
    Awaiting,
    /// Pause requested; workers drain to their next safe point.
    Pausing,
    Paused,
    Aborting,
}

/// Shared pause/abort switchboard between a device and its workers.
pub struct OperationControl {
    state: Mutex<OperationState>,
    signal: Condvar,
}

impl OperationControl {
    fn new() -> Self {
        OperationControl {
            state: Mutex::new(OperationState::Unassigned),
            signal: Condvar::new(),
        }
    }

    pub fn state(&self) -> OperationState {
        *self.state.lock().unwrap()
    }

    fn transition(&self, to: OperationState) {
        *self.state.lock().unwrap() = to;
        self.signal.notify_all();
    }

    /// Pause takes effect at the next cooperative check.
    pub fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == OperationState::Running || *state == OperationState::Awaiting {
            *state = OperationState::Pausing;
            self.signal.notify_all();
        }
    }

    pub fn resume(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == OperationState::Pausing || *state == OperationState::Paused {
            *state = OperationState::Running;
            self.signal.notify_all();
        }
    }

    pub fn abort(&self) {
        self.transition(OperationState::Aborting);
    }
}

impl Schedule for OperationControl {
    // The only suspension point inside a tile: blocks while paused,
    // surfaces the abort as an error that unwinds the worker's loop.
    fn check(&self) -> Result<(), WorkerError> {
        let mut state = self.state.lock().unwrap();
        loop {
            match *state {
                OperationState::Aborting => return Err(WorkerError::Aborted),
                OperationState::Pausing => {
                    *state = OperationState::Paused;
                    self.signal.notify_all();
                }
                OperationState::Paused => {
                    state = self.signal.wait(state).unwrap();
                }
                _ => return Ok(()),
            }
        }
    }
}

/// Owns the worker fleet and walks it across the frame tile by tile.
/// `render` blocks until the frame is done or aborted; `control` hands out
/// a remote for pausing and aborting from other threads.
pub struct Device {
    worker_count: usize,
    control: Arc<OperationControl>,
}

impl Device {
    pub fn new() -> Self {
        Self::with_workers(num_cpus::get())
    }

    pub fn with_workers(worker_count: usize) -> Self {
        assert!(worker_count > 0);
        Device {
            worker_count,
            control: Arc::new(OperationControl::new()),
        }
    }

    pub fn control(&self) -> Arc<OperationControl> {
        self.control.clone()
    }

    /// Renders the whole buffer of `context`. Tiles are handed out in
    /// row-major order but may complete in any order; the buffer supports
    /// that because tiles never overlap.
    pub fn render(&self, context: Arc<TileContext>) -> Result<(), WorkerError> {
        context.profile.validate().map_err(|error| {
            WorkerError::InvalidConfiguration(error.to_string())
        })?;
        {
            let mut state = self.control.state.lock().unwrap();
            if *state != OperationState::Unassigned {
                return Err(WorkerError::InvalidState("device already rendering"));
            }
            *state = OperationState::Running;
        }

        let tiles = tile_origins(context.buffer.size(), context.profile.tile_size);
        info!(
            "rendering {:?} over {} tiles with {} workers",
            context.buffer.size(),
            tiles.len(),
            self.worker_count,
        );

        let next_tile = AtomicUsize::new(0);
        let mut workers = spawn_workers(context, self.worker_count.min(tiles.len()).max(1));

        let outcome = 'render: loop {
            if self.control.state() == OperationState::Aborting {
                break Err(WorkerError::Aborted);
            }

            // Hand every idle worker its next tile; park the rest.
            let mut all_done = true;
            for worker in workers.iter_mut() {
                if worker.working() {
                    all_done = false;
                    continue;
                }
                let index = next_tile.fetch_add(1, Ordering::Relaxed);
                if index < tiles.len() {
                    all_done = false;
                    if let Err(error) = worker.reset(tiles[index]).and_then(|_| worker.dispatch())
                    {
                        break 'render Err(error);
                    }
                }
            }
            if all_done {
                break Ok(());
            }

            // Wait for someone to finish before scheduling again; the
            // timeout keeps the loop responsive to an abort that lands
            // while everything is busy.
            self.shift(OperationState::Running, OperationState::Awaiting);
            for worker in workers.iter() {
                if worker.working() {
                    worker.wait_idle_for(std::time::Duration::from_millis(50));
                    break;
                }
            }
            self.shift(OperationState::Awaiting, OperationState::Running);
        };

        for worker in workers.iter_mut() {
            worker.abort();
        }

        // Whatever happened, the device returns to rest.
        self.control.transition(OperationState::Unassigned);
        outcome
    }
}

impl Device {
    // Compare-and-swap style transition; anything else (a pause or abort
    // that raced in) is left for the main loop to observe.
    fn shift(&self, from: OperationState, to: OperationState) {
        let mut state = self.control.state.lock().unwrap();
        if *state == from {
            *state = to;
            self.control.signal.notify_all();
        }
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new()
    }
}

fn tile_origins(buffer: Vec2i, tile_size: u32) -> Vec<Vec2i> {
    let size = tile_size as i32;
    let mut origins = Vec::new();
    let mut y = 0;
    while y < buffer.y {
        let mut x = 0;
        while x < buffer.x {
            origins.push(Vec2i::new(x, y));
            x += size;
        }
        y += size;
    }
    origins
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accelerator::AcceleratorProfile;
    use crate::color::RGB128;
    use crate::distribution::continuous::stratified::StratifiedDistribution;
    use crate::evaluate::{Ambient, PathTracedEvaluator};
    use crate::material::Matte;
    use crate::math::vector::Vec3;
    use crate::prepare::prepare;
    use crate::render::buffer::{Layer, RenderBuffer};
    use crate::render::camera::PerspectiveCamera;
    use crate::render::profile::EvaluatorProfile;
    use crate::scene::Scene;

    fn test_context(
        profile: EvaluatorProfile,
        size: Vec2i,
        control: Arc<OperationControl>,
    ) -> Arc<TileContext> {
        let mut authored = Scene::new();
        let matte = authored.add_material(Arc::new(Matte::new(RGB128::splat(0.7))));
        authored.add_sphere(Vec3::zero(), 1., matte);
        let scene = Arc::new(prepare(&Arc::new(authored), &AcceleratorProfile::default()).unwrap());

        let (gx, gy) = profile.sample_grid();
        Arc::new(TileContext {
            scene,
            evaluator: Arc::new(PathTracedEvaluator::new(
                profile.bounce_limit,
                Ambient::Constant(RGB128::white()),
            )),
            camera: PerspectiveCamera::new(
                Vec3::new(0., 0., -4.),
                Vec3::zero(),
                Vec3::new(0., 1., 0.),
                70.,
            ),
            buffer: Arc::new(RenderBuffer::new(size)),
            profile,
            distribution: Box::new(StratifiedDistribution::new(
                Vec2i::new(gx.max(1), gy.max(1)),
                4,
                profile.jitter,
            )),
            schedule: control,
        })
    }

    #[test]
    fn renders_every_pixel_of_the_frame() {
        let device = Device::with_workers(3);
        let profile = EvaluatorProfile {
            tile_size: 8,
            pixel_sample: 2,
            adaptive_sample: 0,
            bounce_limit: 3,
            jitter: true,
            accelerator: AcceleratorProfile::default(),
        };
        let context = test_context(profile, Vec2i::new(20, 12), device.control());
        let buffer = context.buffer.clone();

        device.render(context).unwrap();

        // A sphere in front of a white sky: every pixel is either lit by
        // the sky directly or shades the sphere, so nothing stays black.
        for y in 0..12 {
            for x in 0..20 {
                let value = buffer.get(Layer::Color, Vec2i::new(x, y));
                assert!(value.luminance() > 0., "pixel ({}, {}) stayed black", x, y);
            }
        }
        assert_eq!(device.control().state(), OperationState::Unassigned);
    }

    #[test]
    fn invalid_profiles_fail_before_dispatch() {
        let device = Device::with_workers(1);
        let mut profile = EvaluatorProfile::default();
        profile.pixel_sample = 0;
        let context = test_context(profile, Vec2i::new(8, 8), device.control());

        assert!(matches!(
            device.render(context),
            Err(WorkerError::InvalidConfiguration(_))
        ));
        assert_eq!(device.control().state(), OperationState::Unassigned);
    }

    #[test]
    fn abort_unwinds_to_unassigned() {
        let device = Device::with_workers(2);
        let profile = EvaluatorProfile {
            tile_size: 16,
            pixel_sample: 128,
            adaptive_sample: 0,
            bounce_limit: 32,
            jitter: true,
            accelerator: AcceleratorProfile::default(),
        };
        let context = test_context(profile, Vec2i::new(128, 128), device.control());

        let control = device.control();
        let aborter = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            control.abort();
        });

        let result = device.render(context);
        aborter.join().unwrap();

        assert!(matches!(result, Err(WorkerError::Aborted)));
        assert_eq!(device.control().state(), OperationState::Unassigned);
    }

    #[test]
    fn pause_then_resume_completes() {
        let device = Device::with_workers(2);
        let profile = EvaluatorProfile {
            tile_size: 8,
            pixel_sample: 8,
            adaptive_sample: 0,
            bounce_limit: 4,
            jitter: true,
            accelerator: AcceleratorProfile::default(),
        };
        let context = test_context(profile, Vec2i::new(32, 32), device.control());

        let control = device.control();
        let pauser = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(5));
            control.pause();
            std::thread::sleep(std::time::Duration::from_millis(20));
            control.resume();
        });

        device.render(context).unwrap();
        pauser.join().unwrap();
        assert_eq!(device.control().state(), OperationState::Unassigned);
    }
}
