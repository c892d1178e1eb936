//! Encoded-audio playback through rodio.
//!
//! Each playback runs on its own short-lived thread that owns the output
//! stream and sink, so the handle handed back to async code is just a pair
//! of flags. The device is released when the thread exits.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use rodio::{Decoder, OutputStreamBuilder, Sink};
use tracing::{debug, warn};

use super::speech::Playback;
use crate::error::GatewayError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Somewhere encoded audio (mp3, wav, ...) can be played.
pub trait AudioOutput: Send + Sync {
    fn play(&self, audio: Vec<u8>) -> Result<Box<dyn Playback>, GatewayError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RodioOutput;

impl AudioOutput for RodioOutput {
    /// Blocks until the device is open and decoding has started.
    fn play(&self, audio: Vec<u8>) -> Result<Box<dyn Playback>, GatewayError> {
        let stop = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();

        let thread = std::thread::Builder::new()
            .name("daily-snap-audio".into())
            .spawn({
                let stop = stop.clone();
                let finished = finished.clone();
                move || {
                    play_blocking(audio, &stop, ready_tx);
                    finished.store(true, Ordering::Relaxed);
                }
            })
            .map_err(|e| GatewayError::Playback(format!("failed to spawn audio thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(RodioPlayback {
                stop,
                finished,
                thread: Some(thread),
            })),
            Ok(Err(message)) => Err(GatewayError::Playback(message)),
            Err(_) => Err(GatewayError::Playback("audio thread exited early".into())),
        }
    }
}

fn play_blocking(audio: Vec<u8>, stop: &AtomicBool, ready: mpsc::Sender<Result<(), String>>) {
    let mut stream = match OutputStreamBuilder::open_default_stream() {
        Ok(s) => s,
        Err(e) => {
            let _ = ready.send(Err(format!("failed to open audio output: {e}")));
            return;
        }
    };
    stream.log_on_drop(false);

    let source = match Decoder::new(Cursor::new(audio)) {
        Ok(s) => s,
        Err(e) => {
            let _ = ready.send(Err(format!("failed to decode audio: {e}")));
            return;
        }
    };

    let sink = Sink::connect_new(stream.mixer());
    sink.append(source);
    let _ = ready.send(Ok(()));

    while !sink.empty() {
        if stop.load(Ordering::Relaxed) {
            debug!("Audio playback stopped");
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    sink.stop();
}

struct RodioPlayback {
    stop: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Playback for RodioPlayback {
    fn is_finished(&mut self) -> bool {
        let done = self.finished.load(Ordering::Relaxed);
        if done {
            if let Some(thread) = self.thread.take() {
                if thread.join().is_err() {
                    warn!("Audio thread panicked");
                }
            }
        }
        done
    }

    /// Returns once the audio thread has dropped the device.
    fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Audio thread panicked");
            }
        }
    }
}

impl Drop for RodioPlayback {
    fn drop(&mut self) {
        // The thread notices within one poll interval and drops the device.
        self.stop.store(true, Ordering::Relaxed);
    }
}
