// Real-time capture stage
//
// Runs inside the host's audio render callback. Each quantum it copies the
// first channel of the first input into an AudioFrame and posts it to a sink.
// Nothing here blocks, logs or returns an error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc as std_mpsc;
use tokio::sync::mpsc;

/// Samples per render quantum delivered by typical hosts
pub const DEFAULT_QUANTUM_SIZE: usize = 128;

/// One quantum of raw samples from a single input channel
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Raw f32 samples as delivered by the host, one per frame
    pub samples: Vec<f32>,
}

impl AudioFrame {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Fire-and-forget destination for captured frames.
///
/// `post` must not block. Delivery failures (e.g. a dropped receiver) are
/// the sink's concern and are never reported back to the capture stage.
pub trait FrameSink: Send {
    fn post(&self, frame: AudioFrame);
}

impl FrameSink for mpsc::UnboundedSender<AudioFrame> {
    fn post(&self, frame: AudioFrame) {
        // Receiver gone means nobody is recording; drop the frame.
        let _ = self.send(frame);
    }
}

impl FrameSink for std_mpsc::Sender<AudioFrame> {
    fn post(&self, frame: AudioFrame) {
        let _ = self.send(frame);
    }
}

/// Forwards channel 0 of input 0 of every non-empty quantum to a [`FrameSink`].
pub struct CaptureStage<S: FrameSink> {
    sink: S,
    frames_posted: AtomicU64,
    quanta_skipped: AtomicU64,
}

impl<S: FrameSink> CaptureStage<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            frames_posted: AtomicU64::new(0),
            quanta_skipped: AtomicU64::new(0),
        }
    }

    /// Handle one render quantum.
    ///
    /// `inputs[i][c]` is the sample block of channel `c` on input `i`. Only
    /// `inputs[0][0]` is read. Quanta with no samples there are skipped and
    /// nothing is posted.
    ///
    /// Always returns `true` so the host keeps scheduling quanta.
    pub fn process<I, C>(&self, inputs: &[I]) -> bool
    where
        I: AsRef<[C]>,
        C: AsRef<[f32]>,
    {
        let first_channel = inputs
            .first()
            .and_then(|input| input.as_ref().first())
            .map(|channel| channel.as_ref())
            .filter(|samples| !samples.is_empty());

        match first_channel {
            Some(samples) => {
                self.sink.post(AudioFrame {
                    samples: samples.to_vec(),
                });
                self.frames_posted.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                self.quanta_skipped.fetch_add(1, Ordering::Relaxed);
            }
        }

        true
    }

    /// Frames handed to the sink so far
    pub fn frames_posted(&self) -> u64 {
        self.frames_posted.load(Ordering::Relaxed)
    }

    /// Quanta that carried no samples
    pub fn quanta_skipped(&self) -> u64 {
        self.quanta_skipped.load(Ordering::Relaxed)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
