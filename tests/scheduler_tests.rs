// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the frame scheduler and event delivery

use barcode_scanner::app::frame_processor::{
    BarcodeEvent, DetectionEngine, EventDispatcher, FrameDescriptor, FrameScheduler, ScanState,
    SharedSink, TrackEvent, TrackEventSender, TrackerFactory, sink_fn,
};
use barcode_scanner::backends::camera::types::{FrameRotation, PixelFormat, SourceImage};
use barcode_scanner::errors::EngineError;
use barcode_scanner::{Config, ScanSession};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(5);

fn submit_sized(scheduler: &FrameScheduler, width: u32, height: u32, orientation: i32) -> bool {
    let y = vec![0u8; (width * height) as usize];
    let c = vec![128u8; (width.div_ceil(2) * height.div_ceil(2)) as usize];
    let planes: [&[u8]; 3] = [&y, &c, &c];
    scheduler.submit_image(&SourceImage::i420(width, height, &planes), orientation)
}

fn submit(scheduler: &FrameScheduler) -> bool {
    submit_sized(scheduler, 8, 8, 0)
}

fn wait_for_state(scheduler: &FrameScheduler, state: ScanState) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if scheduler.state() == state {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

fn collecting_sink() -> (SharedSink, mpsc::Receiver<BarcodeEvent>) {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let sink = sink_fn(move |event| {
        let _ = tx.lock().unwrap().send(event);
    });
    (sink, rx)
}

fn scheduler_with<E: DetectionEngine>(engine: E) -> FrameScheduler {
    let (dispatcher, _events) = EventDispatcher::spawn(TrackerFactory::new()).unwrap();
    FrameScheduler::new(engine, dispatcher)
}

/// Engine that reports each frame and then blocks until the test lets it go
struct GatedEngine {
    seen: mpsc::Sender<u32>,
    gate: mpsc::Receiver<()>,
}

impl DetectionEngine for GatedEngine {
    fn receive_frame(&mut self, frame: &FrameDescriptor<'_>) -> Result<(), EngineError> {
        let _ = self.seen.send(frame.frame_id);
        // Sender dropped means the test is done gating
        let _ = self.gate.recv();
        Ok(())
    }

    fn release(&mut self) {}
}

#[test]
fn test_busy_worker_sees_only_newest_frame() {
    let (seen_tx, seen) = mpsc::channel();
    let (gate_tx, gate) = mpsc::channel();
    let scheduler = scheduler_with(GatedEngine {
        seen: seen_tx,
        gate,
    });
    scheduler.start();

    assert!(submit(&scheduler));
    assert_eq!(seen.recv_timeout(TIMEOUT), Ok(0));

    // Worker is stuck in the engine; these all land in the pending slot
    for _ in 1..=5 {
        assert!(submit(&scheduler));
    }
    gate_tx.send(()).unwrap();

    assert_eq!(seen.recv_timeout(TIMEOUT), Ok(5));
    gate_tx.send(()).unwrap();
    assert!(seen.recv_timeout(Duration::from_millis(100)).is_err());

    drop(gate_tx);
    scheduler.stop();
    assert_eq!(scheduler.state(), ScanState::Stopped);
}

/// Engine recording what each frame looked like
struct RecordingEngine {
    frames: mpsc::Sender<(u32, u32, u32, PixelFormat, FrameRotation, usize)>,
}

impl DetectionEngine for RecordingEngine {
    fn receive_frame(&mut self, frame: &FrameDescriptor<'_>) -> Result<(), EngineError> {
        let _ = self.frames.send((
            frame.frame_id,
            frame.width,
            frame.height,
            frame.format,
            frame.rotation,
            frame.data.len(),
        ));
        Ok(())
    }

    fn release(&mut self) {}
}

#[test]
fn test_frame_ids_increase_by_one() {
    let (tx, rx) = mpsc::channel();
    let scheduler = scheduler_with(RecordingEngine { frames: tx });
    scheduler.start();

    for expected in 0..10 {
        assert!(submit(&scheduler));
        let (frame_id, ..) = rx.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(frame_id, expected);
    }
}

#[test]
fn test_engine_sees_downscaled_nv21_frame() {
    let (tx, rx) = mpsc::channel();
    let scheduler = scheduler_with(RecordingEngine { frames: tx });
    scheduler.start();

    assert!(submit_sized(&scheduler, 8, 6, 270));
    let (_, width, height, format, rotation, len) = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!((width, height), (4, 3));
    assert_eq!(format, PixelFormat::NV21);
    assert_eq!(rotation, FrameRotation::Deg270);
    assert_eq!(len, 4 * 3 * 3 / 2);

    // Full turns and unknown angles are treated as upright
    assert!(submit_sized(&scheduler, 8, 6, 360));
    let (_, _, _, _, rotation, _) = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(rotation, FrameRotation::Deg0);

    assert!(submit_sized(&scheduler, 8, 6, 45));
    let (_, _, _, _, rotation, _) = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(rotation, FrameRotation::Deg0);
}

/// Engine that fails on its first frame, either by error or by panicking
struct FailingEngine {
    panic: bool,
    seen: mpsc::Sender<u32>,
    released: mpsc::Sender<()>,
}

impl DetectionEngine for FailingEngine {
    fn receive_frame(&mut self, frame: &FrameDescriptor<'_>) -> Result<(), EngineError> {
        if frame.frame_id == 0 {
            if self.panic {
                panic!("decoder crashed");
            }
            return Err(EngineError::Failed("corrupt decoder state".to_string()));
        }
        let _ = self.seen.send(frame.frame_id);
        Ok(())
    }

    fn release(&mut self) {
        let _ = self.released.send(());
    }
}

fn check_failure_stops_and_restarts(panic: bool) {
    let (seen_tx, seen) = mpsc::channel();
    let (released_tx, released) = mpsc::channel();
    let scheduler = scheduler_with(FailingEngine {
        panic,
        seen: seen_tx,
        released: released_tx,
    });
    scheduler.start();

    assert!(submit(&scheduler));
    assert!(wait_for_state(&scheduler, ScanState::Stopped));

    // Control calls on the halted scheduler return promptly
    scheduler.pause();
    assert_eq!(scheduler.state(), ScanState::Stopped);
    scheduler.stop();
    assert!(released.recv_timeout(TIMEOUT).is_ok());

    scheduler.start();
    assert_eq!(scheduler.state(), ScanState::Running);
    assert!(submit(&scheduler));
    assert_eq!(seen.recv_timeout(TIMEOUT), Ok(1));
}

#[test]
fn test_engine_error_stops_scheduler() {
    check_failure_stops_and_restarts(false);
}

#[test]
fn test_engine_panic_stops_scheduler() {
    check_failure_stops_and_restarts(true);
}

#[test]
fn test_producer_and_control_threads_do_not_deadlock() {
    let (tx, rx) = mpsc::channel();
    let scheduler = Arc::new(scheduler_with(RecordingEngine { frames: tx }));
    scheduler.start();

    let producing = Arc::new(AtomicBool::new(true));
    let producer = {
        let scheduler = Arc::clone(&scheduler);
        let producing = Arc::clone(&producing);
        thread::spawn(move || {
            let mut submitted = 0u32;
            loop {
                if submit(&scheduler) {
                    submitted += 1;
                }
                if !producing.load(Ordering::SeqCst) {
                    break submitted;
                }
            }
        })
    };

    for _ in 0..20 {
        scheduler.pause();
        assert_eq!(scheduler.state(), ScanState::Paused);
        scheduler.resume();
        assert_eq!(scheduler.state(), ScanState::Running);
    }
    scheduler.stop();
    assert_eq!(scheduler.state(), ScanState::Stopped);

    producing.store(false, Ordering::SeqCst);
    let submitted = producer.join().unwrap();
    assert!(submitted > 0);

    // Frames were processed in increasing id order
    let ids: Vec<u32> = rx.try_iter().map(|(id, ..)| id).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

/// Engine announcing one new identity per frame and ending them all on release
struct ScriptedEngine {
    events: TrackEventSender,
    next_id: i32,
    live: Vec<i32>,
}

impl ScriptedEngine {
    fn new(events: TrackEventSender) -> Self {
        Self {
            events,
            next_id: 0,
            live: Vec::new(),
        }
    }
}

impl DetectionEngine for ScriptedEngine {
    fn receive_frame(&mut self, _frame: &FrameDescriptor<'_>) -> Result<(), EngineError> {
        let id = self.next_id;
        self.next_id += 1;
        self.live.push(id);
        self.events
            .send(TrackEvent::NewItem {
                id,
                value: format!("code-{}", id),
            })
            .map_err(|_| EngineError::Released)
    }

    fn release(&mut self) {
        for id in self.live.drain(..) {
            let _ = self.events.send(TrackEvent::Done { id });
        }
    }
}

#[test]
fn test_trackers_keep_sink_from_creation() {
    let (first, first_rx) = collecting_sink();
    let (second, second_rx) = collecting_sink();

    let (dispatcher, events) = EventDispatcher::spawn(TrackerFactory::new()).unwrap();
    let scheduler = FrameScheduler::new(ScriptedEngine::new(events), dispatcher);

    scheduler.set_sink(first);
    scheduler.start();
    assert!(submit(&scheduler));
    assert_eq!(
        first_rx.recv_timeout(TIMEOUT),
        Ok(BarcodeEvent::detected(0, "code-0"))
    );

    scheduler.set_sink(second);
    assert!(submit(&scheduler));
    assert_eq!(
        second_rx.recv_timeout(TIMEOUT),
        Ok(BarcodeEvent::detected(1, "code-1"))
    );

    scheduler.stop();
    // Dropping joins the dispatch thread, so everything has been delivered
    drop(scheduler);

    let first_rest: Vec<_> = first_rx.try_iter().collect();
    let second_rest: Vec<_> = second_rx.try_iter().collect();
    assert_eq!(first_rest, vec![BarcodeEvent::lost(0)]);
    assert_eq!(second_rest, vec![BarcodeEvent::lost(1)]);
}

#[test]
fn test_session_restart_ends_previous_scan() {
    let session =
        ScanSession::with_engine(Config::default(), |events| Ok(ScriptedEngine::new(events)))
            .unwrap();
    let (first, first_rx) = collecting_sink();
    let (second, second_rx) = collecting_sink();

    session.start_scanning(first);
    assert_eq!(session.state(), ScanState::Running);
    let y = [0u8; 64];
    let c = [128u8; 16];
    let planes: [&[u8]; 3] = [&y, &c, &c];
    assert!(session.submit_image(&SourceImage::i420(8, 8, &planes), 90));
    assert_eq!(
        first_rx.recv_timeout(TIMEOUT),
        Ok(BarcodeEvent::detected(0, "code-0"))
    );

    session.start_scanning(second);
    assert_eq!(first_rx.recv_timeout(TIMEOUT), Ok(BarcodeEvent::lost(0)));

    session.pause_scanning();
    assert_eq!(session.state(), ScanState::Paused);
    session.resume_scanning();
    assert!(session.submit_image(&SourceImage::i420(8, 8, &planes), 90));
    assert_eq!(
        second_rx.recv_timeout(TIMEOUT),
        Ok(BarcodeEvent::detected(1, "code-1"))
    );

    session.close();
    let second_rest: Vec<_> = second_rx.try_iter().collect();
    assert_eq!(second_rest, vec![BarcodeEvent::lost(1)]);
    assert!(first_rx.try_iter().next().is_none());
}
