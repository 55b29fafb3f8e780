use chip8_vm::Beeper;

#[cfg(feature = "audio")]
pub use speaker::Speaker;

#[cfg(feature = "audio")]
mod speaker {
    use std::{fmt::Debug, time::Duration};

    use rodio::{OutputStream, OutputStreamBuilder, Sink, Source, source::SineWave};

    /// Length of a single beep
    const BEEP_DURATION: Duration = Duration::from_millis(120);
    /// Pitch of the beep (an A)
    const BEEP_FREQ: f32 = 440.0;

    /// Cross-platform audio wrapper for CHIP-8 beeps
    pub struct Speaker {
        /// This must be held as long as [`Self::sink`] lives
        _stream: OutputStream,
        /// The audio stream used for playing beeps
        sink: Sink,
    }

    impl Debug for Speaker {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Speaker")
                .field("queued", &self.sink.len())
                .finish()
        }
    }

    impl Speaker {
        /// Attempts to open the default output device
        pub fn new() -> Option<Self> {
            match OutputStreamBuilder::open_default_stream() {
                Ok(mut stream_handle) => {
                    // dont log warnings on exit if in release mode
                    if !cfg!(debug_assertions) {
                        stream_handle.log_on_drop(false);
                    }

                    let sink = Sink::connect_new(stream_handle.mixer());

                    Some(Self {
                        _stream: stream_handle,
                        sink,
                    })
                }
                Err(e) => {
                    log::error!("audio error when opening stream: {:?}", e);
                    None
                }
            }
        }

        /// Queues one short tone
        pub(super) fn play_tone(&mut self) {
            let source = SineWave::new(BEEP_FREQ)
                .take_duration(BEEP_DURATION)
                .amplify(0.20);
            self.sink.append(source);
            self.sink.play();
        }
    }
}

/// Stand-in when built without the `audio` feature; never constructed
#[cfg(not(feature = "audio"))]
#[derive(Debug)]
pub struct Speaker;

#[cfg(not(feature = "audio"))]
impl Speaker {
    pub fn new() -> Option<Self> {
        log::info!("Built without audio support, beeps will only be logged");
        None
    }

    fn play_tone(&mut self) {}
}

impl Beeper for Speaker {
    fn beep(&mut self) {
        log::debug!("Beep");
        self.play_tone();
    }
}
