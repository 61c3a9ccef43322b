use std::sync::{Arc, Mutex, MutexGuard};

use crate::detection::domain::detected_face::DetectedFace;
use crate::overlay::coordinate_transform::CoordinateTransform;
use crate::overlay::domain::drawing_surface::DrawingSurface;
use crate::overlay::overlay_state::{CameraFacing, OverlayPhase, OverlayState, PreviewGeometry};
use crate::shared::config::{CompletionOrdering, OverlayConfig};
use crate::shared::error::StaleCallbackError;
use crate::shared::geometry::Point;

/// Asks the host to schedule a draw tick. Must not draw synchronously.
pub type RedrawRequester = Box<dyn Fn() + Send + Sync>;

/// Faces produced by one detection, tagged with where they came from.
#[derive(Clone, Debug)]
pub struct FaceUpdate {
    pub faces: Vec<DetectedFace>,
    pub sequence: u64,
    pub session: u64,
}

/// Shared overlay state written by detection completions and read by the
/// host's draw cycle.
///
/// All state, including the teardown flag, lives in one mutex held only
/// for O(1) swaps; painting happens on a snapshot outside the lock.
pub struct FaceOverlay {
    state: Mutex<OverlayState>,
    config: OverlayConfig,
    redraw: Option<RedrawRequester>,
}

impl FaceOverlay {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            state: Mutex::new(OverlayState::new(config.facing)),
            config,
            redraw: None,
        }
    }

    pub fn with_redraw_requester(mut self, redraw: RedrawRequester) -> Self {
        self.redraw = Some(redraw);
        self
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn set_facing(&self, facing: CameraFacing) {
        let changed = {
            let mut state = self.lock_state();
            std::mem::replace(&mut state.facing, facing) != facing
        };
        if changed {
            self.request_redraw();
        }
    }

    /// Records the analyzed frame size. Cheap to call every frame; a redraw
    /// is requested only when the geometry changes.
    pub fn set_preview_geometry(&self, width: u32, height: u32) {
        let geometry = Some(PreviewGeometry { width, height });
        let changed = {
            let mut state = self.lock_state();
            if state.torn_down {
                return;
            }
            std::mem::replace(&mut state.preview, geometry) != geometry
        };
        if changed {
            log::debug!("Preview geometry is now {width}x{height}");
            self.request_redraw();
        }
    }

    /// Replaces the face list unconditionally.
    pub fn set_faces(&self, faces: Vec<DetectedFace>) -> Result<(), StaleCallbackError> {
        {
            let mut state = self.lock_state();
            if state.torn_down {
                return Err(StaleCallbackError::TornDown);
            }
            state.faces = Arc::new(faces);
            state.faces_generation += 1;
        }
        self.request_redraw();
        Ok(())
    }

    /// Replaces the face list with a detection result, unless it belongs to
    /// a stopped session or `ordering` rejects it as stale.
    pub fn apply_detection(
        &self,
        update: FaceUpdate,
        ordering: CompletionOrdering,
    ) -> Result<(), StaleCallbackError> {
        {
            let mut state = self.lock_state();
            if state.torn_down {
                return Err(StaleCallbackError::TornDown);
            }
            if update.session != state.session {
                return Err(StaleCallbackError::SupersededSession {
                    completion: update.session,
                    current: state.session,
                });
            }
            if ordering == CompletionOrdering::DiscardStale {
                if let Some(last_applied) = state.last_sequence {
                    if update.sequence < last_applied {
                        return Err(StaleCallbackError::OutOfOrder {
                            sequence: update.sequence,
                            last_applied,
                        });
                    }
                }
            }
            state.faces = Arc::new(update.faces);
            state.faces_generation += 1;
            state.last_sequence = Some(update.sequence);
        }
        self.request_redraw();
        Ok(())
    }

    /// Records the surface size ahead of the next draw (e.g. on layout).
    pub fn set_surface_size(&self, width: u32, height: u32) {
        self.lock_state().surface_size = Some((width, height));
    }

    pub fn snapshot(&self) -> OverlayState {
        self.lock_state().clone()
    }

    pub fn session(&self) -> u64 {
        self.lock_state().session
    }

    pub fn phase(&self) -> OverlayPhase {
        self.lock_state().phase()
    }

    /// Paints the latest faces onto `surface`. Always clears first.
    pub fn draw(&self, surface: &mut dyn DrawingSurface) {
        let size = surface.size();
        let (preview, faces, facing) = {
            let mut state = self.lock_state();
            state.surface_size = Some(size);
            (state.preview, Arc::clone(&state.faces), state.facing)
        };

        surface.clear();

        let Some(preview) = preview else {
            return;
        };
        if faces.is_empty() {
            return;
        }
        let Some(transform) = CoordinateTransform::new(preview, size, facing) else {
            return;
        };

        for face in faces.iter() {
            self.paint_face(surface, &transform, face);
        }
    }

    /// Ends the camera session: clears geometry and faces and invalidates
    /// completions still in flight.
    pub fn stop_session(&self) {
        let session = {
            let mut state = self.lock_state();
            state.reset();
            state.session
        };
        log::info!("Overlay session stopped, next session {session}");
        self.request_redraw();
    }

    /// After teardown every write is a no-op.
    pub fn teardown(&self) {
        {
            let mut state = self.lock_state();
            if state.torn_down {
                return;
            }
            state.torn_down = true;
            state.reset();
        }
        log::info!("Overlay torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.lock_state().torn_down
    }

    fn paint_face(
        &self,
        surface: &mut dyn DrawingSurface,
        transform: &CoordinateTransform,
        face: &DetectedFace,
    ) {
        let bounds = transform.map_rect(face.bounding_box);
        surface.draw_rect(bounds, &self.config.box_stroke);

        for landmark in &face.landmarks {
            surface.draw_point(
                transform.map_point(landmark.position),
                &self.config.landmark_stroke,
            );
        }

        for contour in &face.contours {
            surface.draw_polyline(
                &transform.map_points(&contour.points),
                &self.config.contour_stroke,
            );
        }

        if self.config.draw_labels {
            if let Some(label) = face_label(face) {
                surface.draw_text(
                    Point::new(bounds.left, bounds.top),
                    &label,
                    &self.config.label_stroke,
                );
            }
        }
    }

    fn request_redraw(&self) {
        if let Some(ref redraw) = self.redraw {
            redraw();
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, OverlayState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Short classification summary, e.g. `#3 smile 87% L 95% R 90%`.
fn face_label(face: &DetectedFace) -> Option<String> {
    let c = &face.classification;
    let mut parts = Vec::new();
    if let Some(id) = face.tracking_id {
        parts.push(format!("#{id}"));
    }
    for (name, value) in [
        ("smile", c.smiling),
        ("L", c.left_eye_open),
        ("R", c.right_eye_open),
    ] {
        if let Some(p) = value {
            parts.push(format!("{name} {:.0}%", p * 100.0));
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detected_face::{Classification, ContourKind, LandmarkKind};
    use crate::overlay::infrastructure::recording_surface::RecordingSurface;
    use crate::shared::geometry::Rect;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn overlay() -> FaceOverlay {
        FaceOverlay::new(OverlayConfig::default())
    }

    fn front_overlay() -> FaceOverlay {
        FaceOverlay::new(OverlayConfig {
            facing: CameraFacing::Front,
            ..OverlayConfig::default()
        })
    }

    fn face(left: f32, top: f32, right: f32, bottom: f32) -> DetectedFace {
        DetectedFace::new(Rect::new(left, top, right, bottom))
    }

    fn update(faces: Vec<DetectedFace>, sequence: u64, session: u64) -> FaceUpdate {
        FaceUpdate {
            faces,
            sequence,
            session,
        }
    }

    fn counting_overlay() -> (FaceOverlay, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let overlay = overlay().with_redraw_requester(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        (overlay, count)
    }

    // ── draw ─────────────────────────────────────────────────────────

    #[test]
    fn test_draw_without_geometry_only_clears() {
        let overlay = overlay();
        overlay.set_faces(vec![face(0.0, 0.0, 10.0, 10.0)]).unwrap();
        let mut surface = RecordingSurface::new(1080, 1920);

        overlay.draw(&mut surface);

        assert_eq!(surface.clears(), 1);
        assert!(surface.ops().is_empty());
    }

    #[test]
    fn test_draw_scenario_back_camera() {
        let overlay = overlay();
        overlay.set_preview_geometry(640, 480);
        overlay.set_faces(vec![face(100.0, 100.0, 200.0, 200.0)]).unwrap();
        let mut surface = RecordingSurface::new(1080, 1920);

        overlay.draw(&mut surface);

        let rects = surface.rects();
        assert_eq!(rects.len(), 1);
        assert_relative_eq!(rects[0].left, 168.75);
        assert_relative_eq!(rects[0].top, 400.0);
        assert_relative_eq!(rects[0].right, 337.5);
        assert_relative_eq!(rects[0].bottom, 800.0);
    }

    #[test]
    fn test_draw_front_camera_mirrors_x() {
        let overlay = front_overlay();
        overlay.set_preview_geometry(640, 480);
        let full_frame = face(0.0, 0.0, 640.0, 480.0)
            .with_landmark(LandmarkKind::NoseBase, Point::new(0.0, 240.0));
        overlay.set_faces(vec![full_frame]).unwrap();
        let mut surface = RecordingSurface::new(1080, 1920);

        overlay.draw(&mut surface);

        assert_eq!(surface.rects(), vec![Rect::new(0.0, 0.0, 1080.0, 1920.0)]);
        assert_eq!(surface.points(), vec![Point::new(1080.0, 960.0)]);
    }

    #[test]
    fn test_draw_paints_landmarks_and_contours_in_order() {
        let overlay = overlay();
        overlay.set_preview_geometry(100, 100);
        let lip = vec![
            Point::new(20.0, 40.0),
            Point::new(30.0, 38.0),
            Point::new(40.0, 40.0),
        ];
        let detailed = face(10.0, 10.0, 50.0, 50.0)
            .with_landmark(LandmarkKind::LeftEye, Point::new(20.0, 20.0))
            .with_landmark(LandmarkKind::RightEye, Point::new(40.0, 20.0))
            .with_contour(ContourKind::UpperLipTop, lip);
        overlay.set_faces(vec![detailed]).unwrap();
        let mut surface = RecordingSurface::new(200, 300);

        overlay.draw(&mut surface);

        assert_eq!(surface.ops().len(), 4);
        let eyes = vec![Point::new(40.0, 60.0), Point::new(80.0, 60.0)];
        assert_eq!(surface.points(), eyes);
        assert_eq!(
            surface.polylines(),
            vec![vec![
                Point::new(40.0, 120.0),
                Point::new(60.0, 114.0),
                Point::new(80.0, 120.0),
            ]]
        );
    }

    #[test]
    fn test_zero_faces_clears_then_one_face_resumes() {
        let overlay = overlay();
        overlay.set_preview_geometry(640, 480);
        let mut surface = RecordingSurface::new(1080, 1920);

        overlay.set_faces(vec![]).unwrap();
        overlay.draw(&mut surface);
        assert!(surface.ops().is_empty());
        assert_eq!(surface.clears(), 1);

        overlay.set_faces(vec![face(100.0, 100.0, 200.0, 200.0)]).unwrap();
        overlay.draw(&mut surface);
        assert_eq!(surface.rects().len(), 1);
    }

    #[test]
    fn test_repeated_draw_is_idempotent() {
        let overlay = front_overlay();
        overlay.set_preview_geometry(640, 480);
        overlay
            .set_faces(vec![
                face(100.0, 100.0, 200.0, 200.0)
                    .with_landmark(LandmarkKind::MouthBottom, Point::new(150.0, 190.0)),
                face(300.0, 50.0, 420.0, 170.0),
            ])
            .unwrap();
        let mut surface = RecordingSurface::new(1080, 1920);

        overlay.draw(&mut surface);
        let first = surface.ops().to_vec();
        overlay.draw(&mut surface);

        assert_eq!(surface.ops(), &first[..]);
    }

    #[test]
    fn test_draw_records_surface_size() {
        let overlay = overlay();
        let mut surface = RecordingSurface::new(720, 1280);
        overlay.draw(&mut surface);
        assert_eq!(overlay.snapshot().surface_size, Some((720, 1280)));
    }

    #[test]
    fn test_labels_drawn_only_when_enabled() {
        let classified = face(0.0, 0.0, 10.0, 10.0).with_classification(Classification {
            smiling: Some(0.87),
            left_eye_open: Some(0.95),
            right_eye_open: None,
        });
        let mut surface = RecordingSurface::new(10, 10);

        let plain = overlay();
        plain.set_preview_geometry(10, 10);
        plain.set_faces(vec![classified.clone()]).unwrap();
        plain.draw(&mut surface);
        assert!(surface.texts().is_empty());

        let labelled = FaceOverlay::new(OverlayConfig {
            draw_labels: true,
            ..OverlayConfig::default()
        });
        labelled.set_preview_geometry(10, 10);
        labelled.set_faces(vec![classified]).unwrap();
        labelled.draw(&mut surface);
        assert_eq!(surface.texts(), vec!["smile 87% L 95%".to_string()]);
    }

    #[test]
    fn test_face_label_includes_tracking_id() {
        let mut f = face(0.0, 0.0, 1.0, 1.0);
        f.tracking_id = Some(3);
        assert_eq!(face_label(&f), Some("#3".to_string()));
        assert_eq!(face_label(&face(0.0, 0.0, 1.0, 1.0)), None);
    }

    // ── writes ───────────────────────────────────────────────────────

    #[test]
    fn test_set_faces_replaces_not_merges() {
        let overlay = overlay();
        overlay
            .set_faces(vec![face(0.0, 0.0, 1.0, 1.0), face(2.0, 2.0, 3.0, 3.0)])
            .unwrap();
        overlay.set_faces(vec![face(5.0, 5.0, 6.0, 6.0)]).unwrap();

        let state = overlay.snapshot();
        assert_eq!(*state.faces, vec![face(5.0, 5.0, 6.0, 6.0)]);
        assert_eq!(state.faces_generation, 2);
    }

    #[test]
    fn test_redraw_requested_on_writes_and_geometry_changes_only() {
        let (overlay, redraws) = counting_overlay();

        overlay.set_preview_geometry(640, 480);
        overlay.set_preview_geometry(640, 480);
        assert_eq!(redraws.load(Ordering::SeqCst), 1);

        overlay.set_faces(vec![]).unwrap();
        assert_eq!(redraws.load(Ordering::SeqCst), 2);

        overlay.set_preview_geometry(480, 640);
        assert_eq!(redraws.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_last_writer_wins_accepts_older_sequence() {
        let overlay = overlay();
        let newer = update(vec![face(2.0, 2.0, 3.0, 3.0)], 2, 0);
        let older = update(vec![face(1.0, 1.0, 2.0, 2.0)], 1, 0);
        overlay
            .apply_detection(newer, CompletionOrdering::LastWriterWins)
            .unwrap();
        overlay
            .apply_detection(older, CompletionOrdering::LastWriterWins)
            .unwrap();

        let state = overlay.snapshot();
        assert_eq!(*state.faces, vec![face(1.0, 1.0, 2.0, 2.0)]);
        assert_eq!(state.last_sequence, Some(1));
    }

    #[test]
    fn test_discard_stale_rejects_older_sequence() {
        let overlay = overlay();
        let newer = update(vec![face(2.0, 2.0, 3.0, 3.0)], 2, 0);
        let older = update(vec![face(1.0, 1.0, 2.0, 2.0)], 1, 0);
        overlay
            .apply_detection(newer, CompletionOrdering::DiscardStale)
            .unwrap();
        let result = overlay.apply_detection(older, CompletionOrdering::DiscardStale);

        assert_eq!(
            result,
            Err(StaleCallbackError::OutOfOrder {
                sequence: 1,
                last_applied: 2
            })
        );
        assert_eq!(*overlay.snapshot().faces, vec![face(2.0, 2.0, 3.0, 3.0)]);
    }

    #[test]
    fn test_completion_from_stopped_session_is_discarded() {
        let overlay = overlay();
        let session = overlay.session();
        overlay.stop_session();

        let result = overlay.apply_detection(
            update(vec![face(0.0, 0.0, 1.0, 1.0)], 0, session),
            CompletionOrdering::LastWriterWins,
        );

        assert_eq!(
            result,
            Err(StaleCallbackError::SupersededSession {
                completion: 0,
                current: 1
            })
        );
        assert!(overlay.snapshot().faces.is_empty());
    }

    #[test]
    fn test_writes_after_teardown_are_noops() {
        let overlay = overlay();
        overlay.set_preview_geometry(640, 480);
        overlay.teardown();

        let late = update(vec![face(0.0, 0.0, 1.0, 1.0)], 0, overlay.session());
        assert_eq!(
            overlay.set_faces(vec![face(0.0, 0.0, 1.0, 1.0)]),
            Err(StaleCallbackError::TornDown)
        );
        assert_eq!(
            overlay.apply_detection(late, CompletionOrdering::LastWriterWins),
            Err(StaleCallbackError::TornDown)
        );
        overlay.set_preview_geometry(320, 240);

        let state = overlay.snapshot();
        assert!(state.torn_down);
        assert!(state.preview.is_none());
        assert!(state.faces.is_empty());
    }

    #[test]
    fn test_teardown_during_concurrent_writes_leaves_no_faces() {
        let overlay = Arc::new(overlay());
        overlay.set_preview_geometry(100, 100);

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let overlay = overlay.clone();
                std::thread::spawn(move || {
                    let session = overlay.session();
                    for sequence in 0..500 {
                        let faces = vec![face(w as f32, 0.0, w as f32 + 1.0, 1.0)];
                        let applied = overlay.apply_detection(
                            update(faces, sequence, session),
                            CompletionOrdering::LastWriterWins,
                        );
                        if applied == Err(StaleCallbackError::TornDown) {
                            return;
                        }
                    }
                })
            })
            .collect();

        std::thread::sleep(std::time::Duration::from_millis(1));
        overlay.teardown();
        for writer in writers {
            writer.join().unwrap();
        }

        let state = overlay.snapshot();
        assert!(state.torn_down);
        assert!(state.faces.is_empty());
        assert!(state.preview.is_none());
    }

    // ── session lifecycle ────────────────────────────────────────────

    #[test]
    fn test_session_phases() {
        let overlay = overlay();
        assert_eq!(overlay.phase(), OverlayPhase::Idle);

        overlay.set_preview_geometry(640, 480);
        assert_eq!(
            overlay.phase(),
            OverlayPhase::Streaming { faces_known: false }
        );

        let first = update(vec![], 0, overlay.session());
        overlay
            .apply_detection(first, CompletionOrdering::LastWriterWins)
            .unwrap();
        assert_eq!(
            overlay.phase(),
            OverlayPhase::Streaming { faces_known: true }
        );

        overlay.stop_session();
        assert_eq!(overlay.phase(), OverlayPhase::Idle);
    }

    #[test]
    fn test_stop_session_clears_drawing() {
        let overlay = overlay();
        overlay.set_preview_geometry(640, 480);
        overlay.set_faces(vec![face(100.0, 100.0, 200.0, 200.0)]).unwrap();
        let mut surface = RecordingSurface::new(1080, 1920);

        overlay.stop_session();
        overlay.draw(&mut surface);

        assert!(surface.ops().is_empty());
    }

    #[test]
    fn test_set_facing_switches_mirroring() {
        let overlay = overlay();
        overlay.set_preview_geometry(100, 100);
        overlay.set_faces(vec![face(0.0, 0.0, 10.0, 10.0)]).unwrap();
        let mut surface = RecordingSurface::new(100, 100);

        overlay.set_facing(CameraFacing::Front);
        overlay.draw(&mut surface);

        assert_eq!(surface.rects(), vec![Rect::new(90.0, 0.0, 100.0, 10.0)]);
    }

    // ── concurrency ──────────────────────────────────────────────────

    #[test]
    fn test_draw_never_sees_mixed_generations() {
        // Generation g writes g+1 faces, all tagged with left == g.
        let overlay = Arc::new(overlay());
        overlay.set_preview_geometry(100, 100);

        let writer = {
            let overlay = overlay.clone();
            std::thread::spawn(move || {
                for g in 0..300u32 {
                    let x = g as f32;
                    let faces = (0..=g % 8).map(|_| face(x, 0.0, x + 1.0, 1.0)).collect();
                    overlay.set_faces(faces).unwrap();
                }
            })
        };

        let mut surface = RecordingSurface::new(100, 100);
        while !writer.is_finished() {
            overlay.draw(&mut surface);
            let rects = surface.rects();
            if let Some(first) = rects.first() {
                let g = first.left as u32;
                assert_eq!(rects.len() as u32, g % 8 + 1);
                assert!(rects.iter().all(|r| r.left == first.left));
            }
        }
        writer.join().unwrap();
    }
}
