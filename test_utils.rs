/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Fakes for the host collaborators, shared by unit tests and the scenario
//! suite. Everything is single-threaded and deterministic: mounts run only
//! when a test drives [`ManualSpawner::run_until_stalled`].

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::rc::Rc;
use std::task::Context;

use arshell_core::{ArCapabilities, Asset, AssetKind, CapabilityFlags, Experience, PlatformInfo};
use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use tokio::sync::oneshot;

use crate::platform::{
    CameraAccess, CameraStream, ContentSurface, NativeArOutcome, NativeArRequest,
    NativeArSurface, PlatformError, PlatformServices, Presentation, SurfaceSlot, TaskSpawner,
};
use crate::registries::atomic::AssetRendererRegistry;
use crate::shell::lifecycle::experience_player::{ExperiencePlayer, PlayerServices};
use crate::shell::runtime::capability_probe::{
    CapabilityCheck, CapabilityEnvironment, ProbeError, XrFeature,
};
use crate::shell::runtime::instrumentation::{
    EventPayload, InstrumentationSink, RecordedEvent, SinkError,
};

pub const ANDROID_CHROME_UA: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36";
pub const IPHONE_SAFARI_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1";
pub const DESKTOP_FIREFOX_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:126.0) Gecko/20100101 Firefox/126.0";

/// Secure desktop browser: no camera overlay, no AR.
pub fn desktop_caps() -> ArCapabilities {
    ArCapabilities::new(
        CapabilityFlags {
            secure_context: true,
            ..CapabilityFlags::default()
        },
        PlatformInfo::from_user_agent(DESKTOP_FIREFOX_UA, 0),
    )
}

/// Phone with a usable camera but no WebXR.
pub fn camera_phone_caps() -> ArCapabilities {
    ArCapabilities::new(
        CapabilityFlags {
            camera: true,
            secure_context: true,
            device_motion: true,
            ..CapabilityFlags::default()
        },
        PlatformInfo::from_user_agent(IPHONE_SAFARI_UA, 5),
    )
}

/// WebXR-capable Android phone.
pub fn ar_phone_caps() -> ArCapabilities {
    ArCapabilities::new(
        CapabilityFlags {
            webxr_immersive_ar: true,
            hit_test: true,
            light_estimation: true,
            plane_detection: true,
            camera: true,
            secure_context: true,
            device_motion: true,
            geolocation: true,
        },
        PlatformInfo::from_user_agent(ANDROID_CHROME_UA, 5),
    )
}

/// One asset of every known kind, in upstream order.
pub fn sample_experience() -> Experience {
    let assets = vec![
        Asset::media("chair", AssetKind::Model3d, "https://cdn.test/chair.glb"),
        Asset::media("poster", AssetKind::Image, "https://cdn.test/poster.png"),
        Asset::message("welcome", "Welcome to the gallery"),
        Asset::media("site", AssetKind::WebContent, "https://museum.test/"),
    ]
    .into_iter()
    .collect::<Result<Vec<_>, _>>()
    .expect("sample assets are valid");
    Experience::new("exp-sample", "Sample gallery", assets).with_slug("sample-gallery")
}

/// Capability environment answering from fixed flags.
pub struct StaticEnvironment {
    flags: CapabilityFlags,
    user_agent: String,
    max_touch_points: u32,
    failing: HashSet<CapabilityCheck>,
    immersive_queries: Cell<usize>,
}

impl StaticEnvironment {
    pub fn new(flags: CapabilityFlags, user_agent: &str) -> Self {
        Self {
            flags,
            user_agent: user_agent.to_string(),
            max_touch_points: if user_agent.contains("Mobile") { 5 } else { 0 },
            failing: HashSet::new(),
            immersive_queries: Cell::new(0),
        }
    }

    /// Makes `check` fail as if the host API threw.
    pub fn failing(mut self, check: CapabilityCheck) -> Self {
        self.failing.insert(check);
        self
    }

    pub fn immersive_queries(&self) -> usize {
        self.immersive_queries.get()
    }

    fn answer<T>(&self, check: CapabilityCheck, value: T) -> Result<T, ProbeError> {
        if self.failing.contains(&check) {
            Err(ProbeError::Threw(format!("{} threw", check.as_str())))
        } else {
            Ok(value)
        }
    }
}

impl CapabilityEnvironment for StaticEnvironment {
    fn secure_context(&self) -> Result<bool, ProbeError> {
        self.answer(CapabilityCheck::SecureContext, self.flags.secure_context)
    }

    fn immersive_ar_supported(&self) -> LocalBoxFuture<'_, Result<bool, ProbeError>> {
        self.immersive_queries.set(self.immersive_queries.get() + 1);
        let answer = self.answer(CapabilityCheck::ImmersiveAr, self.flags.webxr_immersive_ar);
        futures_util::future::ready(answer).boxed_local()
    }

    fn xr_feature_hint(&self, feature: XrFeature) -> Result<bool, ProbeError> {
        let value = match feature {
            XrFeature::HitTest => self.flags.hit_test,
            XrFeature::LightEstimation => self.flags.light_estimation,
            XrFeature::PlaneDetection => self.flags.plane_detection,
        };
        self.answer(CapabilityCheck::Xr(feature), value)
    }

    fn camera_api_present(&self) -> Result<bool, ProbeError> {
        self.answer(CapabilityCheck::Camera, self.flags.camera)
    }

    fn device_motion_present(&self) -> Result<bool, ProbeError> {
        self.answer(CapabilityCheck::DeviceMotion, self.flags.device_motion)
    }

    fn geolocation_present(&self) -> Result<bool, ProbeError> {
        self.answer(CapabilityCheck::Geolocation, self.flags.geolocation)
    }

    fn user_agent(&self) -> Result<String, ProbeError> {
        self.answer(CapabilityCheck::UserAgent, self.user_agent.clone())
    }

    fn max_touch_points(&self) -> Result<u32, ProbeError> {
        self.answer(CapabilityCheck::TouchPoints, self.max_touch_points)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    /// Grants immediately.
    Grant,
    /// Refuses with `NotAllowedError`.
    Deny,
    /// Waits until [`FakeCamera::grant_pending`].
    Deferred,
}

struct StreamCounters {
    live: Cell<usize>,
    max_live: Cell<usize>,
}

struct FakeStream {
    counters: Rc<StreamCounters>,
    stopped: bool,
}

impl FakeStream {
    fn open(counters: Rc<StreamCounters>) -> Self {
        let live = counters.live.get() + 1;
        counters.live.set(live);
        counters.max_live.set(counters.max_live.get().max(live));
        Self {
            counters,
            stopped: false,
        }
    }
}

impl CameraStream for FakeStream {
    fn track_count(&self) -> usize {
        if self.stopped { 0 } else { 1 }
    }

    fn stop_all_tracks(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.counters.live.set(self.counters.live.get() - 1);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Camera that counts live streams so tests can assert exclusive ownership.
/// A stream dropped without `stop_all_tracks` stays live, like a real one.
pub struct FakeCamera {
    mode: Cell<CameraMode>,
    counters: Rc<StreamCounters>,
    requests: Cell<usize>,
    pending: RefCell<VecDeque<oneshot::Sender<()>>>,
}

impl FakeCamera {
    pub fn new() -> Self {
        Self {
            mode: Cell::new(CameraMode::Grant),
            counters: Rc::new(StreamCounters {
                live: Cell::new(0),
                max_live: Cell::new(0),
            }),
            requests: Cell::new(0),
            pending: RefCell::new(VecDeque::new()),
        }
    }

    pub fn set_mode(&self, mode: CameraMode) {
        self.mode.set(mode);
    }

    pub fn live_streams(&self) -> usize {
        self.counters.live.get()
    }

    pub fn max_live_streams(&self) -> usize {
        self.counters.max_live.get()
    }

    pub fn requests(&self) -> usize {
        self.requests.get()
    }

    /// Answers the oldest pending permission prompt. Returns false if none.
    pub fn grant_pending(&self) -> bool {
        let next = self.pending.borrow_mut().pop_front();
        next.is_some_and(|tx| tx.send(()).is_ok())
    }
}

impl Default for FakeCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraAccess for FakeCamera {
    fn request_stream(
        &self,
    ) -> LocalBoxFuture<'static, Result<Box<dyn CameraStream>, PlatformError>> {
        self.requests.set(self.requests.get() + 1);
        let counters = self.counters.clone();
        match self.mode.get() {
            CameraMode::Grant => {
                let stream: Box<dyn CameraStream> = Box::new(FakeStream::open(counters));
                futures_util::future::ready(Ok(stream)).boxed_local()
            }
            CameraMode::Deny => futures_util::future::ready(Err(PlatformError::PermissionDenied(
                "NotAllowedError".into(),
            )))
            .boxed_local(),
            CameraMode::Deferred => {
                let (tx, rx) = oneshot::channel();
                self.pending.borrow_mut().push_back(tx);
                async move {
                    rx.await
                        .map_err(|_| PlatformError::Failure("permission prompt dismissed".into()))?;
                    let stream: Box<dyn CameraStream> = Box::new(FakeStream::open(counters));
                    Ok(stream)
                }
                .boxed_local()
            }
        }
    }
}

/// Native AR viewer. With [`FakeNativeAr::set_deferred`] activations wait
/// until [`FakeNativeAr::complete_pending`].
pub struct FakeNativeAr {
    available: Cell<bool>,
    outcome: RefCell<Result<NativeArOutcome, PlatformError>>,
    active: Rc<Cell<bool>>,
    requests: RefCell<Vec<NativeArRequest>>,
    deferred: Cell<bool>,
    pending: RefCell<VecDeque<oneshot::Sender<()>>>,
}

impl FakeNativeAr {
    pub fn new() -> Self {
        Self {
            available: Cell::new(true),
            outcome: RefCell::new(Ok(NativeArOutcome::Activated)),
            active: Rc::new(Cell::new(false)),
            requests: RefCell::new(Vec::new()),
            deferred: Cell::new(false),
            pending: RefCell::new(VecDeque::new()),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }

    pub fn set_outcome(&self, outcome: Result<NativeArOutcome, PlatformError>) {
        *self.outcome.borrow_mut() = outcome;
    }

    pub fn set_deferred(&self, deferred: bool) {
        self.deferred.set(deferred);
    }

    /// Resolves the oldest pending activation. Returns false if none.
    pub fn complete_pending(&self) -> bool {
        let next = self.pending.borrow_mut().pop_front();
        next.is_some_and(|tx| tx.send(()).is_ok())
    }

    pub fn pending_activations(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn requests(&self) -> Vec<NativeArRequest> {
        self.requests.borrow().clone()
    }
}

impl Default for FakeNativeAr {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeArSurface for FakeNativeAr {
    fn is_available(&self) -> bool {
        self.available.get()
    }

    fn activate(
        &self,
        request: NativeArRequest,
    ) -> LocalBoxFuture<'static, Result<NativeArOutcome, PlatformError>> {
        self.requests.borrow_mut().push(request);
        let outcome = self.outcome.borrow().clone();
        let active = self.active.clone();
        if !self.deferred.get() {
            if outcome == Ok(NativeArOutcome::Activated) {
                active.set(true);
            }
            return futures_util::future::ready(outcome).boxed_local();
        }
        let (tx, rx) = oneshot::channel();
        self.pending.borrow_mut().push_back(tx);
        async move {
            rx.await
                .map_err(|_| PlatformError::Failure("AR activation abandoned".into()))?;
            if outcome == Ok(NativeArOutcome::Activated) {
                active.set(true);
            }
            outcome
        }
        .boxed_local()
    }

    fn deactivate(&self) -> Result<(), PlatformError> {
        self.active.set(false);
        Ok(())
    }
}

/// Content surface that remembers what is on screen.
#[derive(Default)]
pub struct FakeSurface {
    next_slot: Cell<u64>,
    visible: RefCell<BTreeMap<SurfaceSlot, Presentation>>,
    presented: RefCell<Vec<Presentation>>,
    camera_presentations: Cell<usize>,
    dismissed: Cell<usize>,
    fail_dismiss: Cell<bool>,
}

impl FakeSurface {
    /// Everything ever presented, oldest first.
    pub fn presented(&self) -> Vec<Presentation> {
        self.presented.borrow().clone()
    }

    pub fn visible(&self) -> Vec<Presentation> {
        self.visible.borrow().values().cloned().collect()
    }

    pub fn visible_count(&self) -> usize {
        self.visible.borrow().len()
    }

    pub fn dismissed_count(&self) -> usize {
        self.dismissed.get()
    }

    pub fn camera_presentations(&self) -> usize {
        self.camera_presentations.get()
    }

    pub fn fail_dismiss(&self, fail: bool) {
        self.fail_dismiss.set(fail);
    }
}

impl ContentSurface for FakeSurface {
    fn present(&self, presentation: Presentation) -> Result<SurfaceSlot, PlatformError> {
        let slot = SurfaceSlot(self.next_slot.get() + 1);
        self.next_slot.set(slot.0);
        self.presented.borrow_mut().push(presentation.clone());
        self.visible.borrow_mut().insert(slot, presentation);
        Ok(slot)
    }

    fn present_over_camera(
        &self,
        stream: &dyn CameraStream,
        presentation: Presentation,
    ) -> Result<SurfaceSlot, PlatformError> {
        if stream.track_count() == 0 {
            return Err(PlatformError::Failure("camera stream has no live tracks".into()));
        }
        self.camera_presentations
            .set(self.camera_presentations.get() + 1);
        self.present(presentation)
    }

    fn dismiss(&self, slot: SurfaceSlot) -> Result<(), PlatformError> {
        if self.fail_dismiss.get() {
            return Err(PlatformError::Failure("surface detached".into()));
        }
        self.visible.borrow_mut().remove(&slot);
        self.dismissed.set(self.dismissed.get() + 1);
        Ok(())
    }
}

/// The three platform fakes, wired into [`PlatformServices`].
pub struct FakePlatform {
    pub camera: Rc<FakeCamera>,
    pub native_ar: Rc<FakeNativeAr>,
    pub surface: Rc<FakeSurface>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            camera: Rc::new(FakeCamera::new()),
            native_ar: Rc::new(FakeNativeAr::new()),
            surface: Rc::new(FakeSurface::default()),
        }
    }

    pub fn services(&self) -> PlatformServices {
        PlatformServices::new(
            self.camera.clone(),
            self.native_ar.clone(),
            self.surface.clone(),
        )
    }
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawner that only runs tasks when asked to.
#[derive(Default)]
pub struct ManualSpawner {
    tasks: RefCell<Vec<LocalBoxFuture<'static, ()>>>,
}

impl ManualSpawner {
    pub fn pending_tasks(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Polls every task until a full pass makes no progress. Returns how many
    /// tasks finished.
    pub fn run_until_stalled(&self) -> usize {
        let waker = futures_util::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut finished = 0;
        loop {
            let mut tasks = std::mem::take(&mut *self.tasks.borrow_mut());
            let before = tasks.len();
            tasks.retain_mut(|task| task.as_mut().poll(&mut cx).is_pending());
            let progressed = before - tasks.len();
            finished += progressed;

            let mut queue = self.tasks.borrow_mut();
            let spawned = !queue.is_empty();
            tasks.append(&mut queue);
            *queue = tasks;
            if progressed == 0 && !spawned {
                return finished;
            }
        }
    }
}

impl TaskSpawner for ManualSpawner {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        self.tasks.borrow_mut().push(task);
    }
}

/// Sink that keeps every event in order.
#[derive(Default)]
pub struct RecordingSink {
    events: RefCell<Vec<RecordedEvent>>,
    failing: Cell<bool>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.borrow().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events.borrow().iter().map(|e| e.name.clone()).collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }
}

impl InstrumentationSink for RecordingSink {
    fn record(&self, event_name: &str, payload: &EventPayload) -> Result<(), SinkError> {
        if self.failing.get() {
            return Err(SinkError("recording sink offline".into()));
        }
        self.events.borrow_mut().push(RecordedEvent {
            name: event_name.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }
}

/// Everything a player test needs, with handles kept for assertions.
pub struct PlayerFixture {
    pub platform: FakePlatform,
    pub sink: Rc<RecordingSink>,
    pub spawner: Rc<ManualSpawner>,
    pub registry: AssetRendererRegistry,
}

impl PlayerFixture {
    pub fn new() -> Self {
        Self {
            platform: FakePlatform::new(),
            sink: Rc::new(RecordingSink::default()),
            spawner: Rc::new(ManualSpawner::default()),
            registry: AssetRendererRegistry::default(),
        }
    }

    pub fn services(&self) -> PlayerServices {
        PlayerServices {
            registry: self.registry,
            platform: self.platform.services(),
            sink: self.sink.clone(),
            spawner: self.spawner.clone(),
        }
    }

    pub fn player(&self, experience: Experience, caps: ArCapabilities) -> ExperiencePlayer {
        ExperiencePlayer::new(experience, caps, self.services()).expect("playable experience")
    }

    /// Runs spawned mounts until they stall.
    pub fn run(&self) -> usize {
        self.spawner.run_until_stalled()
    }
}

impl Default for PlayerFixture {
    fn default() -> Self {
        Self::new()
    }
}
