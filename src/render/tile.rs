use crate::distribution::ContinuousDistribution;
use crate::evaluate::Evaluator;
use crate::math::random::RandGen;
use crate::math::sampling::golden_spiral;
use crate::math::vector::{Vec2d, Vec2f, Vec2i};
use crate::prepare::PreparedScene;
use crate::render::buffer::{Layer, RenderBuffer};
use crate::render::camera::PerspectiveCamera;
use crate::render::pixel::Pixel;
use crate::render::profile::EvaluatorProfile;
use crate::render::{Schedule, WorkerError};
use crate::scene::query::TraceQuery;

use bumpalo::Bump;
use log::debug;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{SystemTime, UNIX_EPOCH};

/// Everything a tile worker shares with its siblings: all immutable, all
/// read concurrently.
pub struct TileContext {
    pub scene: Arc<PreparedScene>,
    pub evaluator: Arc<dyn Evaluator>,
    pub camera: PerspectiveCamera,
    pub buffer: Arc<RenderBuffer>,
    pub profile: EvaluatorProfile,
    /// Prototype sample stream; each worker replicates its own.
    pub distribution: Box<dyn ContinuousDistribution>,
    /// Cooperative pause/abort hook, polled between pixel samples.
    pub schedule: Arc<dyn Schedule>,
}

// The dispatch handshake. One mutex guards the phase so a dispatch and a
// finishing tile can never interleave into a stale-idle state.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Phase {
    Idle,
    Dispatched,
    Rendering,
}

struct Handshake {
    phase: Mutex<Phase>,
    signal: Condvar,
}

impl Handshake {
    fn new() -> Self {
        Handshake {
            phase: Mutex::new(Phase::Idle),
            signal: Condvar::new(),
        }
    }

    // Idle -> Dispatched, or an error naming why not.
    fn dispatch(&self) -> Result<(), WorkerError> {
        let mut phase = self.phase.lock().unwrap();
        if *phase != Phase::Idle {
            return Err(WorkerError::InvalidState("dispatched while working"));
        }
        *phase = Phase::Dispatched;
        self.signal.notify_all();
        Ok(())
    }

    // Worker side: parks until dispatched (or the flag trips), then owns
    // the tile.
    fn await_dispatch(&self, aborted: &AtomicBool) -> bool {
        let mut phase = self.phase.lock().unwrap();
        loop {
            if aborted.load(Ordering::Relaxed) {
                return false;
            }
            if *phase == Phase::Dispatched {
                *phase = Phase::Rendering;
                return true;
            }
            phase = self.signal.wait(phase).unwrap();
        }
    }

    fn finish(&self) {
        *self.phase.lock().unwrap() = Phase::Idle;
        self.signal.notify_all();
    }

    fn wait_idle(&self) {
        let mut phase = self.phase.lock().unwrap();
        while *phase != Phase::Idle {
            phase = self.signal.wait(phase).unwrap();
        }
    }

    fn wait_idle_for(&self, timeout: std::time::Duration) -> bool {
        let phase = self.phase.lock().unwrap();
        let (phase, _) = self
            .signal
            .wait_timeout_while(phase, timeout, |phase| *phase != Phase::Idle)
            .unwrap();
        *phase == Phase::Idle
    }

    fn busy(&self) -> bool {
        *self.phase.lock().unwrap() != Phase::Idle
    }

    fn wake(&self) {
        self.signal.notify_all();
    }
}

struct TileInner {
    context: Arc<TileContext>,
    worker_id: u64,

    offset: Mutex<Vec2i>,
    tile_id: AtomicU64,

    total_pixel: AtomicU64,
    completed_pixel: AtomicU64,
    completed_sample: AtomicU64,
    rejected_sample: AtomicU64,

    aborted: AtomicBool,
    handshake: Handshake,

    on_completed: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
}

impl TileInner {
    fn check_abort(&self) -> Result<(), WorkerError> {
        if self.aborted.load(Ordering::Relaxed) {
            return Err(WorkerError::Aborted);
        }
        Ok(())
    }
}

/// One dedicated thread bound to one square tile at a time. The owner
/// cycles it through `reset` (bind a tile) and `dispatch` (render it);
/// the thread signals back through the completion callback and the idle
/// event. `abort` tears the thread down mid-tile.
pub struct TileWorker {
    inner: Arc<TileInner>,
    thread: Option<JoinHandle<()>>,
}

impl TileWorker {
    pub fn new(context: Arc<TileContext>, worker_id: u64) -> Self {
        TileWorker {
            inner: Arc::new(TileInner {
                context,
                worker_id,
                offset: Mutex::new(Vec2i::new(0, 0)),
                tile_id: AtomicU64::new(0),
                total_pixel: AtomicU64::new(0),
                completed_pixel: AtomicU64::new(0),
                completed_sample: AtomicU64::new(0),
                rejected_sample: AtomicU64::new(0),
                aborted: AtomicBool::new(false),
                handshake: Handshake::new(),
                on_completed: Mutex::new(None),
            }),
            thread: None,
        }
    }

    /// Runs after every completed tile; meant for schedulers handing out
    /// the next one.
    pub fn set_on_completed(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.inner.on_completed.lock().unwrap() = Some(Box::new(callback));
    }

    /// Binds the worker to the tile whose origin is `offset` and clears
    /// the counters. Rejected while the worker is rendering.
    pub fn reset(&self, offset: Vec2i) -> Result<(), WorkerError> {
        let inner = &self.inner;
        if inner.handshake.busy() {
            return Err(WorkerError::InvalidState("reset while working"));
        }
        inner.check_abort().map_err(|_| WorkerError::InvalidState("reset after abort"))?;

        *inner.offset.lock().unwrap() = offset;
        inner.tile_id.fetch_add(1, Ordering::Relaxed);

        // Pixels of [offset, offset + size) that actually land in the
        // buffer; tiles on the border hang over the edge.
        let size = inner.context.profile.tile_size as i64;
        let buffer = inner.context.buffer.size();
        let clip = |origin: i64, limit: i64| -> i64 {
            (origin + size).clamp(0, limit) - origin.clamp(0, limit)
        };
        let total = clip(offset.x as i64, buffer.x as i64) * clip(offset.y as i64, buffer.y as i64);
        inner.total_pixel.store(total.max(0) as u64, Ordering::Relaxed);

        inner.completed_pixel.store(0, Ordering::Relaxed);
        inner.completed_sample.store(0, Ordering::Relaxed);
        inner.rejected_sample.store(0, Ordering::Relaxed);
        Ok(())
    }

    /// Starts rendering the bound tile. The backing thread spawns on the
    /// first dispatch and then sleeps between tiles.
    pub fn dispatch(&mut self) -> Result<(), WorkerError> {
        self.inner
            .check_abort()
            .map_err(|_| WorkerError::InvalidState("dispatch after abort"))?;
        self.inner.handshake.dispatch()?;

        if self.thread.is_none() {
            let inner = self.inner.clone();
            self.thread = Some(
                std::thread::Builder::new()
                    .name(format!("tile-worker-{}", inner.worker_id))
                    .spawn(move || work_loop(inner))
                    .expect("spawning tile worker"),
            );
        }
        Ok(())
    }

    /// Blocks until the current tile (if any) is done.
    pub fn wait_idle(&self) {
        self.inner.handshake.wait_idle();
    }

    /// Bounded wait; true when the worker went idle within `timeout`.
    pub fn wait_idle_for(&self, timeout: std::time::Duration) -> bool {
        self.inner.handshake.wait_idle_for(timeout)
    }

    /// Cooperatively stops the worker and joins its thread. The worker
    /// cannot be dispatched again afterwards.
    pub fn abort(&mut self) {
        self.inner.aborted.store(true, Ordering::Relaxed);
        self.inner.handshake.wake();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    pub fn working(&self) -> bool {
        self.inner.handshake.busy()
    }

    pub fn total_pixel(&self) -> u64 {
        self.inner.total_pixel.load(Ordering::Relaxed)
    }

    pub fn completed_pixel(&self) -> u64 {
        self.inner.completed_pixel.load(Ordering::Relaxed)
    }

    pub fn completed_sample(&self) -> u64 {
        self.inner.completed_sample.load(Ordering::Relaxed)
    }

    pub fn rejected_sample(&self) -> u64 {
        self.inner.rejected_sample.load(Ordering::Relaxed)
    }
}

impl Drop for TileWorker {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.abort();
        }
    }
}

fn work_loop(inner: Arc<TileInner>) {
    let context = inner.context.clone();
    let profile = context.profile;

    // Per-thread mutable state: sample stream, arena, adaptive-pass RNG,
    // and the precomputed sub-pixel spiral.
    let mut distribution = context.distribution.replicate(inner.worker_id);
    let mut arena = Bump::new();
    let spiral: Vec<Vec2d> = (0..profile.pixel_sample.max(1) as usize)
        .map(|i| golden_spiral(i, profile.pixel_sample.max(1) as usize))
        .collect();

    loop {
        if !inner.handshake.await_dispatch(&inner.aborted) {
            break;
        }

        let offset = *inner.offset.lock().unwrap();
        let tick = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        let mut rng = RandGen::from_worker(
            inner.worker_id,
            tick,
            inner.tile_id.load(Ordering::Relaxed),
        );

        let mut outcome = Ok(());
        let size = profile.tile_size as i32;
        'tile: for y in 0..size {
            for x in 0..size {
                let position = offset + Vec2i::new(x, y);
                outcome = work_pixel(
                    &inner,
                    position,
                    distribution.as_mut(),
                    &mut arena,
                    &mut rng,
                    &spiral,
                );
                if outcome.is_err() {
                    break 'tile;
                }
            }
        }

        debug!(
            "tile at {:?} finished: {} pixels, {} samples ({} rejected)",
            offset,
            inner.completed_pixel.load(Ordering::Relaxed),
            inner.completed_sample.load(Ordering::Relaxed),
            inner.rejected_sample.load(Ordering::Relaxed),
        );

        inner.handshake.finish();
        if let Some(callback) = &*inner.on_completed.lock().unwrap() {
            callback();
        }

        if outcome.is_err() {
            break;
        }
    }

    // However the loop ended, leave the worker observably idle.
    inner.handshake.finish();
}

fn work_pixel(
    inner: &TileInner,
    position: Vec2i,
    distribution: &mut dyn ContinuousDistribution,
    arena: &mut Bump,
    rng: &mut RandGen,
    spiral: &[Vec2d],
) -> Result<(), WorkerError> {
    let context = &*inner.context;
    if !context.buffer.contains(position) {
        return Ok(());
    }

    let profile = &context.profile;
    let mut pixel = Pixel::new();
    distribution.begin_pixel(position);

    let sample_count = distribution.sample_count();
    for i in 0..profile.pixel_sample {
        inner.check_abort()?;
        context.schedule.check()?;

        distribution.begin_sample(i % sample_count);
        arena.reset();

        let offset = spiral[i as usize % spiral.len()];
        let value = evaluate_offset(inner, position, offset, distribution, arena);
        if !pixel.accumulate(value) {
            inner.rejected_sample.fetch_add(1, Ordering::Relaxed);
        }
        inner.completed_sample.fetch_add(1, Ordering::Relaxed);
    }

    accumulate_aux(inner, position, &mut pixel);

    // Adaptive pass: noisy pixels earn extra samples in proportion to
    // their normalized deviation.
    let extra = (pixel.deviation() * profile.adaptive_sample as f64).round() as u32;
    for i in 0..extra {
        inner.check_abort()?;
        context.schedule.check()?;

        distribution.begin_sample(i % sample_count);
        arena.reset();

        let value = evaluate_offset(inner, position, rng.uniform_vec2(), distribution, arena);
        if !pixel.accumulate(value) {
            inner.rejected_sample.fetch_add(1, Ordering::Relaxed);
        }
        inner.completed_sample.fetch_add(1, Ordering::Relaxed);
    }

    let buffer = &context.buffer;
    buffer.set(Layer::Color, position, pixel.mean());
    buffer.set(Layer::Albedo, position, pixel.albedo());
    let normal = pixel.normal();
    buffer.set(
        Layer::Normal,
        position,
        crate::color::RGB128::new(normal.x, normal.y, normal.z),
    );
    inner.completed_pixel.fetch_add(1, Ordering::Relaxed);

    Ok(())
}

fn evaluate_offset(
    inner: &TileInner,
    position: Vec2i,
    offset: Vec2d,
    distribution: &mut dyn ContinuousDistribution,
    arena: &Bump,
) -> crate::color::RGB128 {
    let context = &*inner.context;
    let ray = context.camera.spawn_ray(film_uv(
        position,
        offset,
        context.buffer.size(),
        context.buffer.aspect(),
    ));
    context
        .evaluator
        .evaluate(&context.scene, ray, distribution, arena)
}

// Centered film coordinates with square pixels: the x span is the full
// [-0.5, 0.5] and y shrinks by the aspect ratio.
fn film_uv(position: Vec2i, offset: Vec2d, size: Vec2i, aspect: f32) -> Vec2f {
    Vec2f {
        x: (position.x as f32 + offset.x as f32) / size.x as f32 - 0.5,
        y: ((position.y as f32 + offset.y as f32) / size.y as f32 - 0.5) / aspect,
    }
}

// The auxiliary layers read the first surface under the pixel center.
fn accumulate_aux(inner: &TileInner, position: Vec2i, pixel: &mut Pixel) {
    let context = &*inner.context;
    let ray = context.camera.spawn_ray(film_uv(
        position,
        Vec2d::new(0.5, 0.5),
        context.buffer.size(),
        context.buffer.aspect(),
    ));

    let mut query = TraceQuery::new(ray);
    if context.scene.trace(&mut query) {
        let touch = context.scene.interact(&query);
        pixel.accumulate_aux(touch.material.albedo(), touch.shading_normal);
    }
}

/// Spawns a worker per hardware thread over a shared context.
pub fn spawn_workers(context: Arc<TileContext>, count: usize) -> Vec<TileWorker> {
    (0..count)
        .map(|id| TileWorker::new(context.clone(), id as u64))
        .collect()
}
