use tracing::debug;

use crate::error::CollaboratorError;

pub const DEFAULT_MIN_SELECTION: f32 = 50.0;
pub const DEFAULT_TARGET_LANGUAGE: &str = "en";
const UNDETERMINED_LANGUAGE: &str = "und";

const PROMPT: &str = "Drag to select the area containing text.";

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in view coordinates. `left <= right`, `top <= bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Spans two drag points in any direction.
    pub fn from_points(a: Point, b: Point) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            right: a.x.max(b.x),
            bottom: a.y.max(b.y),
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Pixel crop inside `image`, never empty and never out of bounds.
    pub fn clamp_to(&self, image: ImageSize) -> PixelRect {
        let max_x = image.width.saturating_sub(1);
        let max_y = image.height.saturating_sub(1);
        let x = to_pixel(self.left).min(max_x);
        let y = to_pixel(self.top).min(max_y);
        let width = to_pixel(self.width()).min(image.width - x).max(1);
        let height = to_pixel(self.height()).min(image.height - y).max(1);
        PixelRect {
            x,
            y,
            width,
            height,
        }
    }
}

fn to_pixel(v: f32) -> u32 {
    if v.is_nan() || v <= 0.0 {
        0
    } else {
        v.min(u32::MAX as f32) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionRequest {
    pub id: RequestId,
    pub region: PixelRect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRequest {
    pub id: RequestId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub id: RequestId,
    pub text: String,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPhase {
    Idle,
    Ready,
    Selecting,
    Recognizing,
    Translating,
    DisplayingResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Accepted(RecognitionRequest),
    TooSmall,
    Ignored,
}

/// What the overlay currently shows: a short note and the text body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OverlayStatus {
    pub message: String,
    pub text: String,
}

pub trait OverlayListener {
    fn on_selection_finished(&mut self, _region: PixelRect) {}

    /// The overlay went back to ready; the owner restores normal input.
    fn on_selection_cancelled(&mut self);

    fn on_status_changed(&mut self, _status: &OverlayStatus) {}
}

/// Drag-to-select surface over a static image.
///
/// Collaborator results come back through `on_recognized`,
/// `on_language_identified` and `on_translated` together with the id of the
/// request they answer; results for anything but the active request are
/// dropped.
pub struct RegionOverlay {
    phase: OverlayPhase,
    image: Option<ImageSize>,
    anchor: Option<Point>,
    selection: Option<Rect>,
    status: OverlayStatus,
    pending_text: String,
    active: Option<RequestId>,
    next_id: u64,
    min_selection: f32,
    target_language: String,
    listener: Option<Box<dyn OverlayListener>>,
}

impl Default for RegionOverlay {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SELECTION, DEFAULT_TARGET_LANGUAGE)
    }
}

impl RegionOverlay {
    pub fn new(min_selection: f32, target_language: &str) -> Self {
        Self {
            phase: OverlayPhase::Idle,
            image: None,
            anchor: None,
            selection: None,
            status: OverlayStatus::default(),
            pending_text: String::new(),
            active: None,
            next_id: 0,
            min_selection,
            target_language: normalize_language(target_language),
            listener: None,
        }
    }

    pub fn set_listener(&mut self, listener: Box<dyn OverlayListener>) {
        self.listener = Some(listener);
    }

    /// Empty or `auto` selects the default target.
    pub fn set_target_language(&mut self, tag: &str) {
        self.target_language = normalize_language(tag);
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    pub fn phase(&self) -> OverlayPhase {
        self.phase
    }

    pub fn selection(&self) -> Option<Rect> {
        self.selection
    }

    pub fn status(&self) -> &OverlayStatus {
        &self.status
    }

    pub fn load_image(&mut self, size: ImageSize) {
        self.image = Some(size);
        self.reset_to_ready();
        self.set_status("", PROMPT);
    }

    pub fn unload(&mut self) {
        self.image = None;
        self.anchor = None;
        self.selection = None;
        self.active = None;
        self.phase = OverlayPhase::Idle;
        self.set_status("", "");
    }

    /// Starts a drag. Any request still in flight becomes stale.
    pub fn press(&mut self, at: Point) -> bool {
        if self.phase == OverlayPhase::Idle {
            return false;
        }
        self.active = None;
        self.anchor = Some(at);
        self.selection = Some(Rect::from_points(at, at));
        self.phase = OverlayPhase::Selecting;
        self.set_status("Selecting area...", "");
        true
    }

    pub fn drag(&mut self, to: Point) {
        if self.phase != OverlayPhase::Selecting {
            return;
        }
        if let Some(anchor) = self.anchor {
            self.selection = Some(Rect::from_points(anchor, to));
        }
    }

    /// Ends the drag. Both sides must strictly exceed the minimum size.
    pub fn release(&mut self, at: Point) -> ReleaseOutcome {
        let (OverlayPhase::Selecting, Some(anchor), Some(image)) = (self.phase, self.anchor, self.image)
        else {
            return ReleaseOutcome::Ignored;
        };
        let rect = Rect::from_points(anchor, at);
        self.anchor = None;

        if rect.width() <= self.min_selection || rect.height() <= self.min_selection {
            debug!(width = rect.width(), height = rect.height(), "selection too small");
            self.cancel();
            return ReleaseOutcome::TooSmall;
        }

        let region = rect.clamp_to(image);
        let id = self.issue();
        self.selection = Some(rect);
        self.phase = OverlayPhase::Recognizing;
        if let Some(listener) = self.listener.as_mut() {
            listener.on_selection_finished(region);
        }
        self.set_status("Recognizing text...", "");
        ReleaseOutcome::Accepted(RecognitionRequest { id, region })
    }

    /// Back to ready from any state, dropping the rectangle and status.
    pub fn cancel(&mut self) {
        if self.image.is_some() {
            self.reset_to_ready();
        } else {
            self.unload();
        }
        self.set_status("", "");
        if let Some(listener) = self.listener.as_mut() {
            listener.on_selection_cancelled();
        }
    }

    pub fn on_recognized(
        &mut self,
        id: RequestId,
        result: Result<String, CollaboratorError>,
    ) -> Option<LanguageRequest> {
        if !self.accepts(id, OverlayPhase::Recognizing) {
            return None;
        }
        let text = match result {
            Ok(text) => text.trim().to_string(),
            Err(err) => {
                self.show_result(format!("Text recognition failed: {err}"), String::new());
                return None;
            }
        };
        if text.is_empty() {
            self.show_result("No text recognized.".to_string(), String::new());
            return None;
        }

        let id = self.issue();
        self.pending_text = text.clone();
        self.phase = OverlayPhase::Translating;
        self.set_status("Detecting language...", "");
        Some(LanguageRequest { id, text })
    }

    /// `None` or `und` from the identifier means the language is unknown.
    pub fn on_language_identified(
        &mut self,
        id: RequestId,
        result: Result<Option<String>, CollaboratorError>,
    ) -> Option<TranslationRequest> {
        if !self.accepts(id, OverlayPhase::Translating) {
            return None;
        }
        let text = std::mem::take(&mut self.pending_text);
        let language = match result {
            Ok(lang) => lang
                .map(|l| l.trim().to_lowercase())
                .filter(|l| !l.is_empty() && l != UNDETERMINED_LANGUAGE),
            Err(err) => {
                self.show_result(format!("Language detection failed: {err}"), text);
                return None;
            }
        };
        let Some(source) = language else {
            self.show_result("No language detected. Showing original text.".to_string(), text);
            return None;
        };
        if source == self.target_language {
            self.show_result(format!("Detected {source}; no translation needed."), text);
            return None;
        }

        let id = self.issue();
        self.set_status("Translating...", "");
        Some(TranslationRequest {
            id,
            text,
            source,
            target: self.target_language.clone(),
        })
    }

    pub fn on_translated(&mut self, id: RequestId, result: Result<String, CollaboratorError>) {
        if !self.accepts(id, OverlayPhase::Translating) {
            return;
        }
        match result {
            Ok(translated) => self.show_result("Translated:".to_string(), translated),
            Err(err) => self.show_result(format!("Translation failed: {err}"), String::new()),
        }
    }

    /// Dimmed bands around the selection: top, bottom, left, right. The
    /// whole view is dimmed while nothing is selected.
    pub fn mask_regions(&self, view: Rect) -> Vec<Rect> {
        let Some(sel) = self.selection else {
            return vec![view];
        };
        let left = sel.left.clamp(view.left, view.right);
        let right = sel.right.clamp(view.left, view.right);
        let top = sel.top.clamp(view.top, view.bottom);
        let bottom = sel.bottom.clamp(view.top, view.bottom);
        vec![
            Rect::new(view.left, view.top, view.right, top),
            Rect::new(view.left, bottom, view.right, view.bottom),
            Rect::new(view.left, top, left, bottom),
            Rect::new(right, top, view.right, bottom),
        ]
    }

    fn accepts(&self, id: RequestId, phase: OverlayPhase) -> bool {
        if self.active == Some(id) && self.phase == phase {
            return true;
        }
        debug!(request = id.0, phase = ?self.phase, "dropping stale collaborator result");
        false
    }

    fn issue(&mut self) -> RequestId {
        self.next_id += 1;
        let id = RequestId(self.next_id);
        self.active = Some(id);
        id
    }

    fn reset_to_ready(&mut self) {
        self.anchor = None;
        self.selection = None;
        self.active = None;
        self.pending_text.clear();
        self.phase = OverlayPhase::Ready;
    }

    fn show_result(&mut self, message: String, text: String) {
        self.active = None;
        self.phase = OverlayPhase::DisplayingResult;
        self.set_status(message, text);
    }

    fn set_status(&mut self, message: impl Into<String>, text: impl Into<String>) {
        self.status = OverlayStatus {
            message: message.into(),
            text: text.into(),
        };
        if let Some(listener) = self.listener.as_mut() {
            listener.on_status_changed(&self.status);
        }
    }
}

fn normalize_language(tag: &str) -> String {
    let tag = tag.trim().to_lowercase();
    if tag.is_empty() || tag == "auto" {
        DEFAULT_TARGET_LANGUAGE.to_string()
    } else {
        tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Events {
        finished: Vec<PixelRect>,
        cancelled: usize,
        statuses: Vec<String>,
    }

    struct Owner(Rc<RefCell<Events>>);

    impl OverlayListener for Owner {
        fn on_selection_finished(&mut self, region: PixelRect) {
            self.0.borrow_mut().finished.push(region);
        }

        fn on_selection_cancelled(&mut self) {
            self.0.borrow_mut().cancelled += 1;
        }

        fn on_status_changed(&mut self, status: &OverlayStatus) {
            self.0.borrow_mut().statuses.push(status.message.clone());
        }
    }

    fn overlay(width: u32, height: u32) -> (RegionOverlay, Rc<RefCell<Events>>) {
        let events = Rc::new(RefCell::new(Events::default()));
        let mut overlay = RegionOverlay::default();
        overlay.set_listener(Box::new(Owner(events.clone())));
        overlay.load_image(ImageSize::new(width, height));
        (overlay, events)
    }

    fn select(overlay: &mut RegionOverlay, from: (f32, f32), to: (f32, f32)) -> ReleaseOutcome {
        overlay.press(Point::new(from.0, from.1));
        overlay.drag(Point::new(to.0, to.1));
        overlay.release(Point::new(to.0, to.1))
    }

    fn accepted(outcome: ReleaseOutcome) -> RecognitionRequest {
        match outcome {
            ReleaseOutcome::Accepted(req) => req,
            other => panic!("expected acceptance, got {other:?}"),
        }
    }

    #[test]
    fn small_drag_is_rejected() {
        let (mut overlay, events) = overlay(400, 400);
        let outcome = select(&mut overlay, (10.0, 10.0), (40.0, 30.0));
        assert_eq!(outcome, ReleaseOutcome::TooSmall);
        assert_eq!(overlay.phase(), OverlayPhase::Ready);
        assert!(overlay.selection().is_none());
        assert_eq!(events.borrow().cancelled, 1);
        assert!(events.borrow().finished.is_empty());
    }

    #[test]
    fn threshold_is_exclusive() {
        let (mut overlay, _) = overlay(400, 400);
        let outcome = select(&mut overlay, (0.0, 0.0), (50.0, 200.0));
        assert_eq!(outcome, ReleaseOutcome::TooSmall);
        let outcome = select(&mut overlay, (0.0, 0.0), (51.0, 51.0));
        assert!(matches!(outcome, ReleaseOutcome::Accepted(_)));
    }

    #[test]
    fn large_drag_is_clamped_to_image() {
        let (mut overlay, events) = overlay(80, 120);
        let req = accepted(select(&mut overlay, (10.0, 10.0), (100.0, 150.0)));
        let expected = PixelRect {
            x: 10,
            y: 10,
            width: 70,
            height: 110,
        };
        assert_eq!(req.region, expected);
        assert_eq!(overlay.phase(), OverlayPhase::Recognizing);
        assert_eq!(events.borrow().finished, vec![expected]);
    }

    #[test]
    fn reverse_drag_spans_same_rectangle() {
        let (mut overlay, _) = overlay(500, 500);
        let req = accepted(select(&mut overlay, (100.0, 150.0), (10.0, 10.0)));
        assert_eq!(
            req.region,
            PixelRect {
                x: 10,
                y: 10,
                width: 90,
                height: 140,
            }
        );
    }

    #[test]
    fn clamp_keeps_crop_inside_and_non_empty() {
        let image = ImageSize::new(100, 100);
        let crop = Rect::new(-20.0, 150.0, 300.0, 400.0).clamp_to(image);
        assert_eq!(
            crop,
            PixelRect {
                x: 0,
                y: 99,
                width: 100,
                height: 1,
            }
        );
    }

    #[test]
    fn full_translation_flow() {
        let (mut overlay, _) = overlay(800, 600);
        let req = accepted(select(&mut overlay, (0.0, 0.0), (300.0, 200.0)));

        let lang = overlay
            .on_recognized(req.id, Ok("  Bonjour le monde \n".to_string()))
            .expect("language request");
        assert_eq!(lang.text, "Bonjour le monde");
        assert_eq!(overlay.phase(), OverlayPhase::Translating);

        let tr = overlay
            .on_language_identified(lang.id, Ok(Some("fr".to_string())))
            .expect("translation request");
        assert_eq!(tr.source, "fr");
        assert_eq!(tr.target, "en");

        overlay.on_translated(tr.id, Ok("Hello world".to_string()));
        assert_eq!(overlay.phase(), OverlayPhase::DisplayingResult);
        assert_eq!(overlay.status().message, "Translated:");
        assert_eq!(overlay.status().text, "Hello world");
    }

    #[test]
    fn undetermined_and_same_language_show_original() {
        let (mut overlay, _) = overlay(800, 600);
        let req = accepted(select(&mut overlay, (0.0, 0.0), (300.0, 200.0)));
        let lang = overlay.on_recognized(req.id, Ok("1234".to_string())).unwrap();
        assert!(overlay.on_language_identified(lang.id, Ok(Some("und".to_string()))).is_none());
        assert_eq!(overlay.status().message, "No language detected. Showing original text.");
        assert_eq!(overlay.status().text, "1234");

        let req = accepted(select(&mut overlay, (0.0, 0.0), (300.0, 200.0)));
        let lang = overlay.on_recognized(req.id, Ok("hello".to_string())).unwrap();
        assert!(overlay.on_language_identified(lang.id, Ok(Some("EN".to_string()))).is_none());
        assert_eq!(overlay.status().message, "Detected en; no translation needed.");
        assert_eq!(overlay.status().text, "hello");
    }

    #[test]
    fn failures_are_shown_inline_and_session_continues() {
        let (mut overlay, _) = overlay(800, 600);
        let req = accepted(select(&mut overlay, (0.0, 0.0), (300.0, 200.0)));
        assert!(overlay
            .on_recognized(req.id, Err(CollaboratorError::new("model missing")))
            .is_none());
        assert_eq!(overlay.phase(), OverlayPhase::DisplayingResult);
        assert_eq!(overlay.status().message, "Text recognition failed: model missing");

        let req = accepted(select(&mut overlay, (0.0, 0.0), (300.0, 200.0)));
        assert!(overlay.on_recognized(req.id, Ok("   ".to_string())).is_none());
        assert_eq!(overlay.status().message, "No text recognized.");

        let req = accepted(select(&mut overlay, (0.0, 0.0), (300.0, 200.0)));
        let lang = overlay.on_recognized(req.id, Ok("hola".to_string())).unwrap();
        let tr = overlay
            .on_language_identified(lang.id, Ok(Some("es".to_string())))
            .unwrap();
        overlay.on_translated(tr.id, Err(CollaboratorError::new("offline")));
        assert_eq!(overlay.status().message, "Translation failed: offline");
        assert_eq!(overlay.phase(), OverlayPhase::DisplayingResult);
    }

    #[test]
    fn stale_results_are_dropped() {
        let (mut overlay, _) = overlay(800, 600);
        let first = accepted(select(&mut overlay, (0.0, 0.0), (300.0, 200.0)));
        overlay.cancel();
        assert!(overlay.on_recognized(first.id, Ok("late".to_string())).is_none());
        assert_eq!(overlay.phase(), OverlayPhase::Ready);

        let old = accepted(select(&mut overlay, (0.0, 0.0), (300.0, 200.0)));
        let current = accepted(select(&mut overlay, (0.0, 0.0), (300.0, 200.0)));
        assert!(overlay.on_recognized(old.id, Ok("late".to_string())).is_none());
        assert_eq!(overlay.phase(), OverlayPhase::Recognizing);
        assert!(overlay.on_recognized(current.id, Ok("now".to_string())).is_some());
    }

    #[test]
    fn cancel_clears_state_and_notifies() {
        let (mut overlay, events) = overlay(800, 600);
        overlay.press(Point::new(5.0, 5.0));
        overlay.drag(Point::new(200.0, 200.0));
        overlay.cancel();
        assert_eq!(overlay.phase(), OverlayPhase::Ready);
        assert!(overlay.selection().is_none());
        assert_eq!(overlay.status(), &OverlayStatus::default());
        assert_eq!(events.borrow().cancelled, 1);
    }

    #[test]
    fn new_drag_restarts_from_result() {
        let (mut overlay, _) = overlay(800, 600);
        let req = accepted(select(&mut overlay, (0.0, 0.0), (300.0, 200.0)));
        overlay.on_recognized(req.id, Ok(String::new()));
        assert_eq!(overlay.phase(), OverlayPhase::DisplayingResult);
        assert!(overlay.press(Point::new(1.0, 1.0)));
        assert_eq!(overlay.phase(), OverlayPhase::Selecting);
    }

    #[test]
    fn idle_overlay_ignores_gestures() {
        let mut overlay = RegionOverlay::default();
        assert!(!overlay.press(Point::new(1.0, 1.0)));
        assert_eq!(overlay.release(Point::new(90.0, 90.0)), ReleaseOutcome::Ignored);
        assert_eq!(overlay.phase(), OverlayPhase::Idle);
    }

    #[test]
    fn target_language_defaults() {
        let mut overlay = RegionOverlay::new(50.0, "auto");
        assert_eq!(overlay.target_language(), "en");
        overlay.set_target_language(" DE ");
        assert_eq!(overlay.target_language(), "de");
        overlay.set_target_language("");
        assert_eq!(overlay.target_language(), "en");
    }

    #[test]
    fn mask_surrounds_selection() {
        let (mut overlay, _) = overlay(800, 600);
        let view = Rect::new(0.0, 0.0, 800.0, 600.0);
        assert_eq!(overlay.mask_regions(view), vec![view]);

        overlay.press(Point::new(100.0, 100.0));
        overlay.drag(Point::new(300.0, 200.0));
        let bands = overlay.mask_regions(view);
        assert_eq!(bands[0], Rect::new(0.0, 0.0, 800.0, 100.0));
        assert_eq!(bands[1], Rect::new(0.0, 200.0, 800.0, 600.0));
        assert_eq!(bands[2], Rect::new(0.0, 100.0, 100.0, 200.0));
        assert_eq!(bands[3], Rect::new(300.0, 100.0, 800.0, 200.0));
    }
}
