//! Camera capture, GUI windows and the main loop.

use crate::{
    config::Config,
    controller::{Control, InputEvent, KeyCommand, ModeController, PointerEvent},
    detector::CascadeDetector,
    error::{Error, Result},
    frame_processor::ColorThresholds,
    utils::image_conversion::{canvas_to_mat, mat_to_frame},
    world::Scene,
};
use log::{debug, info, warn};
use opencv::{
    core::Mat,
    highgui::{self, EVENT_LBUTTONDOWN, EVENT_LBUTTONUP, EVENT_MOUSEMOVE, WINDOW_NORMAL},
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};
use std::{
    collections::VecDeque,
    path::PathBuf,
    sync::{Arc, Mutex},
};

const HISTOGRAM_WINDOW: &str = "Histogram";
const VMIN_TRACKBAR: &str = "Value Min";
const VMAX_TRACKBAR: &str = "Value Max";
const SMIN_TRACKBAR: &str = "Saturation";

/// Video source type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Webcam index
    Camera(i32),
    /// Video file path
    File(PathBuf),
}

/// Pointer events queued by the GUI callback until the loop polls them
type PointerQueue = Arc<Mutex<VecDeque<PointerEvent>>>;

/// Main application struct
pub struct App {
    config: Config,
    source: VideoSource,
    capture: VideoCapture,
    detector: CascadeDetector,
    controller: ModeController,
    pointer_events: PointerQueue,
}

impl App {
    /// Open the video source, load the detector and create the windows
    ///
    /// # Errors
    ///
    /// Returns an error if the video source cannot be opened, the cascade cannot be
    /// loaded or a window cannot be created
    pub fn new(config: Config, source: VideoSource) -> Result<Self> {
        info!("Initializing head tracker");

        let mut capture = match &source {
            VideoSource::Camera(index) => {
                info!("Opening camera {index}");
                VideoCapture::new(*index, videoio::CAP_ANY)?
            }
            VideoSource::File(path) => {
                info!("Opening video file: {}", path.display());
                VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)?
            }
        };
        if !capture.is_opened()? {
            return Err(Error::Camera(format!("Could not open {source:?}")));
        }

        let camera_width = capture.get(CAP_PROP_FRAME_WIDTH)?;
        let camera_height = capture.get(CAP_PROP_FRAME_HEIGHT)?;
        let screen_height = config.screen_height(camera_width, camera_height);
        info!(
            "Camera {camera_width}x{camera_height}, screen {}x{screen_height}",
            config.display.screen_width
        );
        if matches!(source, VideoSource::Camera(_)) {
            capture.set(CAP_PROP_FRAME_WIDTH, f64::from(config.display.screen_width))?;
            capture.set(CAP_PROP_FRAME_HEIGHT, screen_height as f64)?;
        }

        let detector = CascadeDetector::new(&config.detector)?;
        let scene = Scene::generate(&mut rand::thread_rng(), &config.scene_layout(screen_height));
        let controller = ModeController::new(&config.controller_settings(screen_height), scene);

        let pointer_events = PointerQueue::default();
        Self::create_windows(&config, Arc::clone(&pointer_events))?;

        Ok(Self {
            config,
            source,
            capture,
            detector,
            controller,
            pointer_events,
        })
    }

    fn create_windows(config: &Config, pointer_events: PointerQueue) -> Result<()> {
        let window = config.display.window_name.as_str();
        highgui::named_window(window, WINDOW_NORMAL)?;

        let thresholds = config.thresholds();
        for (name, initial) in [
            (VMIN_TRACKBAR, thresholds.vmin),
            (VMAX_TRACKBAR, thresholds.vmax),
            (SMIN_TRACKBAR, thresholds.smin),
        ] {
            highgui::create_trackbar(name, window, None, crate::constants::THRESHOLD_SLIDER_MAX, None)?;
            highgui::set_trackbar_pos(name, window, initial)?;
        }

        highgui::set_mouse_callback(
            window,
            Some(Box::new(move |event, x, y, _flags| {
                let pointer = match event {
                    EVENT_LBUTTONDOWN => PointerEvent::Press { x, y },
                    EVENT_MOUSEMOVE => PointerEvent::Drag { x, y },
                    EVENT_LBUTTONUP => PointerEvent::Release { x, y },
                    _ => return,
                };
                if let Ok(mut queue) = pointer_events.lock() {
                    queue.push_back(pointer);
                }
            })),
        )?;

        if config.display.show_histogram {
            highgui::named_window(HISTOGRAM_WINDOW, WINDOW_NORMAL)?;
        }
        Ok(())
    }

    /// Run the main application loop until Esc or the end of a video file
    ///
    /// # Errors
    ///
    /// Returns an error if capture, detection or display fails
    pub fn run(&mut self) -> Result<()> {
        info!("Entering main loop");
        let mut mat = Mat::default();

        loop {
            if self.controller.wants_frame() {
                let read = self.capture.read(&mut mat)?;
                if (!read || mat.empty()) && matches!(self.source, VideoSource::File(_)) {
                    info!("End of video file reached");
                    break;
                }
                if !self.controller.ingest_frame(mat_to_frame(&mat)?) {
                    debug!("Skipping tick without a frame");
                }
            }

            self.controller.set_thresholds(self.read_thresholds()?);

            if let Some(view) = self.controller.step(&mut self.detector)? {
                highgui::imshow(&self.config.display.window_name, &canvas_to_mat(&view)?)?;
            }
            if self.controller.take_new_target() {
                self.show_histogram()?;
            }

            if self.dispatch_input()? == Control::Exit {
                info!("Exit requested by user");
                break;
            }
        }

        info!("Application shutting down");
        Ok(())
    }

    fn read_thresholds(&self) -> Result<ColorThresholds> {
        let window = self.config.display.window_name.as_str();
        Ok(ColorThresholds {
            vmin: highgui::get_trackbar_pos(VMIN_TRACKBAR, window)?,
            vmax: highgui::get_trackbar_pos(VMAX_TRACKBAR, window)?,
            smin: highgui::get_trackbar_pos(SMIN_TRACKBAR, window)?,
        })
    }

    fn show_histogram(&self) -> Result<()> {
        let display = &self.config.display;
        if !display.show_histogram {
            return Ok(());
        }
        if let Some(histogram) = self.controller.histogram() {
            let plot = histogram.render(display.histogram_width, display.histogram_height);
            highgui::imshow(HISTOGRAM_WINDOW, &canvas_to_mat(&plot)?)?;
        }
        Ok(())
    }

    /// Apply queued pointer events, then poll one key
    fn dispatch_input(&mut self) -> Result<Control> {
        let pending: Vec<PointerEvent> = match self.pointer_events.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(_) => {
                warn!("Pointer queue poisoned, dropping events");
                Vec::new()
            }
        };
        for pointer in pending {
            self.controller.handle_input(InputEvent::Pointer(pointer));
        }

        let key = highgui::wait_key(1)?;
        Ok(KeyCommand::from_key(key)
            .map_or(Control::Continue, |command| self.controller.handle_input(InputEvent::Key(command))))
    }
}
