//! Mode state machine tying detection, tracking and rendering together.
//!
//! One loop iteration drives the controller as:
//!
//! 1. [`ModeController::wants_frame`] / [`ModeController::ingest_frame`]
//! 2. [`ModeController::step`], which returns the canvas to display
//! 3. [`ModeController::handle_input`] for the polled key or pointer event
//!
//! Keys switch modes at any time. Pause freezes frame acquisition and tracker
//! updates but not rendering. Detection and tracking only run on a tick whose frame
//! was freshly ingested; otherwise the previous state is kept.

use crate::{
    canvas::Canvas,
    color_model::ColorHistogram,
    constants::{DEFAULT_BASE_DEPTH, DEFAULT_HISTOGRAM_BINS, DEFAULT_SCREEN_WIDTH},
    detector::{select_target, HeadDetector},
    frame_processor::{ColorThresholds, Frame, FrameProcessor, ProcessedFrame},
    geometry::{Color, Region, TrackedRegion},
    projection::{EyeModel, SceneRenderer},
    tracker::{RegionTracker, TermCriteria},
    utils::safe_cast::usize_to_i32,
    world::Scene,
    Result,
};
use log::{debug, info, warn};
use nalgebra::Point3;
use ndarray::Array2;

/// Ellipse stroke in the back-projection view
const ELLIPSE_THICKNESS: u32 = 3;

/// Active controller state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Run the detector every tick until it finds a head
    #[default]
    AutoDetect,
    /// Follow the target and render the scene
    Track,
    /// Show the camera frame while the user drags out a target
    ManualDetect,
    /// Show the probability map with the tracked ellipse
    BackProjection,
}

/// Discrete key signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCommand {
    /// Freeze or resume acquisition and tracking
    TogglePause,
    /// Switch to [`Mode::AutoDetect`] and resume
    AutoDetect,
    /// Switch to [`Mode::Track`]
    Track,
    /// Switch to [`Mode::BackProjection`] and resume
    BackProjection,
    /// Switch to [`Mode::ManualDetect`]
    ManualDetect,
    /// Leave the main loop
    Exit,
}

impl KeyCommand {
    /// Command bound to a key code as returned by the GUI's key poll
    #[must_use]
    pub fn from_key(key: i32) -> Option<Self> {
        if key == crate::constants::KEY_ESCAPE {
            return Some(Self::Exit);
        }
        let key = u8::try_from(key & 0xFF).ok()?;
        match key {
            b'p' => Some(Self::TogglePause),
            b'a' => Some(Self::AutoDetect),
            b't' => Some(Self::Track),
            b'b' => Some(Self::BackProjection),
            b'm' => Some(Self::ManualDetect),
            _ => None,
        }
    }
}

/// Pointer gesture stages, in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    /// Button pressed: start a new selection
    Press { x: i32, y: i32 },
    /// Pointer moved
    Drag { x: i32, y: i32 },
    /// Button released: finish the selection
    Release { x: i32, y: i32 },
}

/// Any external input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyCommand),
    Pointer(PointerEvent),
}

/// Whether the loop should keep running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Exit,
}

/// Rectangle being dragged out by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Selection {
    origin: (i32, i32),
    region: Region,
    active: bool,
}

/// Construction parameters for [`ModeController`]
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Initial live color thresholds
    pub thresholds: ColorThresholds,
    /// Mean-shift termination
    pub criteria: TermCriteria,
    /// Hue histogram bins
    pub histogram_bins: usize,
    /// Rendered screen width
    pub screen_width: usize,
    /// Rendered screen height
    pub screen_height: usize,
    /// Eye depth when the head is horizontally centered
    pub base_depth: f32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            thresholds: ColorThresholds::default(),
            criteria: TermCriteria::default(),
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            screen_width: DEFAULT_SCREEN_WIDTH as usize,
            screen_height: DEFAULT_SCREEN_WIDTH as usize * 3 / 4,
            base_depth: DEFAULT_BASE_DEPTH,
        }
    }
}

/// Application state owned by the main loop
#[derive(Debug)]
pub struct ModeController {
    mode: Mode,
    paused: bool,
    processor: FrameProcessor,
    tracker: RegionTracker,
    frame: Option<Frame>,
    processed: Option<ProcessedFrame>,
    fresh_frame: bool,
    tracked: TrackedRegion,
    back_projection: Option<Array2<u8>>,
    selection: Option<Selection>,
    scene: Scene,
    renderer: SceneRenderer,
    eye_model: EyeModel,
    new_target: bool,
}

impl ModeController {
    /// Controller in [`Mode::AutoDetect`] with no frame yet
    #[must_use]
    pub fn new(settings: &ControllerSettings, scene: Scene) -> Self {
        Self {
            mode: Mode::AutoDetect,
            paused: false,
            processor: FrameProcessor::new(settings.thresholds),
            tracker: RegionTracker::new(settings.criteria, settings.histogram_bins),
            frame: None,
            processed: None,
            fresh_frame: false,
            tracked: TrackedRegion::default(),
            back_projection: None,
            selection: None,
            scene,
            renderer: SceneRenderer::new(settings.screen_width, settings.screen_height),
            eye_model: EyeModel {
                screen_width: settings.screen_width as f32,
                base_depth: settings.base_depth,
            },
            new_target: false,
        }
    }

    /// Current mode
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// True while paused
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Tracker state
    #[must_use]
    pub const fn tracker(&self) -> &RegionTracker {
        &self.tracker
    }

    /// Target color model, once locked
    #[must_use]
    pub const fn histogram(&self) -> Option<&ColorHistogram> {
        self.tracker.histogram()
    }

    /// Latest oriented target estimate
    #[must_use]
    pub const fn tracked_region(&self) -> &TrackedRegion {
        &self.tracked
    }

    /// Rectangle currently selected with the pointer
    #[must_use]
    pub fn selection(&self) -> Option<Region> {
        self.selection.map(|s| s.region)
    }

    /// Latest good frame
    #[must_use]
    pub const fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    /// Scene being rendered
    #[must_use]
    pub const fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Viewpoint derived from the latest tracked region
    #[must_use]
    pub fn eye(&self) -> Point3<f32> {
        self.eye_model.eye(&self.tracked)
    }

    /// Live color thresholds
    #[must_use]
    pub const fn thresholds(&self) -> ColorThresholds {
        self.processor.thresholds()
    }

    /// Replace the live color thresholds; used from the next ingested frame on
    pub fn set_thresholds(&mut self, thresholds: ColorThresholds) {
        if thresholds != self.processor.thresholds() {
            debug!("Color thresholds now {thresholds:?}");
            self.processor.set_thresholds(thresholds);
        }
    }

    /// True once, after a target has been locked
    pub fn take_new_target(&mut self) -> bool {
        std::mem::take(&mut self.new_target)
    }

    /// Whether the loop should capture a frame this tick
    #[must_use]
    pub const fn wants_frame(&self) -> bool {
        !self.paused || self.frame.is_none()
    }

    /// Convert and keep a captured frame for the next [`step`](Self::step).
    ///
    /// An empty frame is skipped and the previous one kept; returns false in that case
    /// and the next step leaves detection and tracking untouched.
    pub fn ingest_frame(&mut self, frame: Frame) -> bool {
        match self.processor.process(&frame) {
            Some(processed) => {
                self.frame = Some(frame);
                self.processed = Some(processed);
                self.fresh_frame = true;
            }
            None => {
                debug!("Empty frame, keeping previous state");
                self.fresh_frame = false;
            }
        }
        self.fresh_frame
    }

    /// Run the current mode for one tick and return the canvas to display, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the detector fails to run
    pub fn step<D: HeadDetector + ?Sized>(&mut self, detector: &mut D) -> Result<Option<Canvas>> {
        let view = self.run_mode(detector);
        self.fresh_frame = false;
        view
    }

    fn run_mode<D: HeadDetector + ?Sized>(&mut self, detector: &mut D) -> Result<Option<Canvas>> {
        match self.mode {
            Mode::AutoDetect => self.auto_detect(detector),
            Mode::Track => {
                self.update_tracking()?;
                let eye = self.eye();
                Ok(Some(self.renderer.render(&self.scene, &eye)))
            }
            Mode::ManualDetect => Ok(self.frame.as_ref().map(|frame| {
                let mut canvas = Canvas::from_frame(frame);
                if let Some(selection) = self.selection {
                    canvas.invert_region(selection.region);
                }
                canvas
            })),
            Mode::BackProjection => {
                self.update_tracking()?;
                let view = match (&self.back_projection, &self.frame) {
                    (Some(prob), _) if self.tracker.is_locked() => {
                        let mut canvas = Canvas::from_gray(prob);
                        canvas.draw_ellipse(&self.tracked, Color::GREEN, ELLIPSE_THICKNESS);
                        Some(canvas)
                    }
                    (_, Some(frame)) => Some(Canvas::from_frame(frame)),
                    _ => None,
                };
                Ok(view)
            }
        }
    }

    fn auto_detect<D: HeadDetector + ?Sized>(&mut self, detector: &mut D) -> Result<Option<Canvas>> {
        self.tracker.reset();
        let (Some(frame), Some(processed)) = (&self.frame, &self.processed) else {
            return Ok(None);
        };
        if !self.fresh_frame {
            return Ok(Some(Canvas::from_frame(frame)));
        }

        let candidates = detector.detect(frame)?;
        let width = usize_to_i32(frame.width())?;
        let height = usize_to_i32(frame.height())?;
        let Some(target) = select_target(&candidates, width, height) else {
            debug!("No head detected");
            return Ok(Some(Canvas::from_frame(frame)));
        };

        self.tracker.lock(processed, target)?;
        info!("Head detected at {target:?}, tracking");
        self.new_target = true;
        self.mode = Mode::Track;
        Ok(Some(Canvas::from_frame(frame)))
    }

    fn update_tracking(&mut self) -> Result<()> {
        if self.paused || !self.fresh_frame || !self.tracker.is_locked() {
            return Ok(());
        }
        let Some(processed) = &self.processed else {
            return Ok(());
        };
        let outcome = self.tracker.track(processed)?;
        self.tracked = outcome.tracked;
        self.back_projection = Some(outcome.back_projection);
        Ok(())
    }

    /// Apply one external input
    pub fn handle_input(&mut self, event: InputEvent) -> Control {
        match event {
            InputEvent::Key(key) => self.handle_key(key),
            InputEvent::Pointer(pointer) => {
                self.handle_pointer(pointer);
                Control::Continue
            }
        }
    }

    /// Apply a key command; mode keys act regardless of the current mode
    pub fn handle_key(&mut self, key: KeyCommand) -> Control {
        match key {
            KeyCommand::Exit => return Control::Exit,
            KeyCommand::TogglePause => {
                self.paused = !self.paused;
                info!("{}", if self.paused { "Paused" } else { "Resumed" });
            }
            KeyCommand::AutoDetect => {
                self.paused = false;
                self.set_mode(Mode::AutoDetect);
            }
            KeyCommand::BackProjection => {
                self.paused = false;
                self.set_mode(Mode::BackProjection);
            }
            KeyCommand::Track => self.set_mode(Mode::Track),
            KeyCommand::ManualDetect => self.set_mode(Mode::ManualDetect),
        }
        Control::Continue
    }

    /// Apply a pointer gesture stage
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Press { x, y } => {
                self.set_mode(Mode::ManualDetect);
                self.selection = Some(Selection {
                    origin: (x, y),
                    region: Region::new(x, y, 0, 0),
                    active: true,
                });
            }
            PointerEvent::Drag { x, y } => self.extend_selection(x, y),
            PointerEvent::Release { x, y } => {
                self.extend_selection(x, y);
                if let Some(selection) = self.selection.as_mut() {
                    if selection.active {
                        selection.active = false;
                        let region = selection.region;
                        self.finish_selection(region);
                    }
                }
            }
        }
    }

    fn extend_selection(&mut self, x: i32, y: i32) {
        let bounds = self
            .frame
            .as_ref()
            .and_then(|f| Some((usize_to_i32(f.width()).ok()?, usize_to_i32(f.height()).ok()?)));
        if let Some(selection) = self.selection.as_mut().filter(|s| s.active) {
            let region = Region::from_corners(selection.origin, (x, y));
            selection.region = match bounds {
                Some((width, height)) => region.clip_to(width, height),
                None => region,
            };
        }
    }

    fn finish_selection(&mut self, region: Region) {
        if region.is_empty() {
            debug!("Ignoring empty selection {region:?}");
            self.selection = None;
            return;
        }
        let Some(processed) = &self.processed else {
            debug!("No frame to build a color model from");
            return;
        };
        match self.tracker.lock(processed, region) {
            Ok(()) => {
                info!("Tracking manual selection {region:?}");
                self.new_target = true;
                self.set_mode(Mode::Track);
            }
            Err(e) => warn!("Could not use selection {region:?}: {e}"),
        }
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            info!("Mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }
}
