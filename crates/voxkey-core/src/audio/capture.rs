use crate::{
    AudioError, CoreResult,
    audio::{LevelReading, RawAudioChunk, StreamingAccumulator, compute_levels},
};

use std::{
    panic::Location,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use cpal::{
    Device, Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use ringbuf::{
    HeapRb,
    traits::{Consumer, Producer, Split},
};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// How often the pump thread pulls frames off the ring.
const PUMP_INTERVAL: Duration = Duration::from_millis(10);

/// Scratch size for one pump read.
const PUMP_SCRATCH_SAMPLES: usize = 4096;

/// Audio capture lifecycle, as seen by the session controller.
///
/// The controller is the only caller; implementations deliver frames into
/// the accumulator handed to [`CapturePipeline::start`] and publish input
/// levels on a watch channel, independent of the accumulation path.
pub trait CapturePipeline: Send {
    /// Opens the input stream and begins delivering frames into `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is unavailable or the stream cannot
    /// be built; in that case no frames were delivered.
    fn start(&mut self, sink: Arc<StreamingAccumulator>) -> CoreResult<()>;

    /// Stops the stream and waits for in-flight frames to reach the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if tearing the stream down fails. Calling `stop`
    /// while not capturing is a no-op.
    fn stop(&mut self) -> CoreResult<()>;

    /// Live input level feed for presentation layers.
    fn level_receiver(&self) -> watch::Receiver<LevelReading>;
}

/// CPAL-backed capture at the hardware's native sample rate.
///
/// No rate conversion happens on the audio thread; frames are pushed into a
/// lock-free SPSC ring by the device callback and a pump thread moves them
/// into the accumulator. The callback never locks, allocates or logs; ring
/// overflow is counted on an atomic and reported by the pump.
pub struct CpalCapture {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    pump: Option<std::thread::JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    overflow: Arc<AtomicUsize>,
    level_tx: watch::Sender<LevelReading>,
    level_rx: watch::Receiver<LevelReading>,
}

impl CpalCapture {
    /// Opens the named input device, or the default one when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::NoMicrophoneFound`] when no matching device
    /// exists and [`AudioError::DeviceError`] when its config is unreadable.
    #[track_caller]
    #[instrument(skip(selected_device))]
    pub fn new(selected_device: Option<&str>) -> CoreResult<Self> {
        let host = cpal::default_host();

        let device = match selected_device {
            Some(name) => Self::find_device(&host, name)?,
            None => host
                .default_input_device()
                .ok_or(AudioError::NoMicrophoneFound {
                    location: ErrorLocation::from(Location::caller()),
                })?,
        };

        let config = device
            .default_input_config()
            .map_err(|e| AudioError::DeviceError {
                reason: format!("Failed to get config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let config: StreamConfig = config.into();

        info!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            "CpalCapture initialized"
        );

        let (level_tx, level_rx) = watch::channel(LevelReading::default());

        Ok(Self {
            device,
            config,
            stream: None,
            pump: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            overflow: Arc::new(AtomicUsize::new(0)),
            level_tx,
            level_rx,
        })
    }

    #[track_caller]
    fn find_device(host: &cpal::Host, name: &str) -> CoreResult<Device> {
        let devices = host.input_devices().map_err(|e| AudioError::DeviceError {
            reason: format!("Failed to enumerate input devices: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        for device in devices {
            if device.name().is_ok_and(|n| n == name) {
                return Ok(device);
            }
        }

        warn!(device = name, "Configured input device not found");
        Err(AudioError::NoMicrophoneFound {
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Sample rate the hardware delivers frames at.
    pub fn native_sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn shut_down_pump(&mut self) {
        // Drop the stream first so the device callback quiesces, then raise
        // the flag; the pump drains whatever is left on the ring and exits.
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
        self.shutdown.store(true, Ordering::Release);
        if let Some(pump) = self.pump.take() {
            if pump.join().is_err() {
                error!("Capture pump thread panicked");
            }
        }
    }
}

impl CapturePipeline for CpalCapture {
    #[instrument(skip(self, sink))]
    fn start(&mut self, sink: Arc<StreamingAccumulator>) -> CoreResult<()> {
        if self.stream.is_some() {
            return Err(AudioError::DeviceError {
                reason: "capture already running".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.shutdown.store(false, Ordering::Release);
        self.overflow.store(0, Ordering::Relaxed);

        let native_sample_rate = self.config.sample_rate;
        let channels = self.config.channels;

        // One second of audio between the device callback and the pump.
        let ring_capacity = native_sample_rate as usize * channels as usize;
        let (mut producer, mut consumer) = HeapRb::<f32>::new(ring_capacity).split();

        let overflow = Arc::clone(&self.overflow);
        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Lock-free push; count (never log) what did not fit.
                    let pushed = producer.push_slice(data);
                    if pushed < data.len() {
                        overflow.fetch_add(data.len() - pushed, Ordering::Relaxed);
                    }
                },
                |err| {
                    error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::DeviceError {
                reason: format!("Failed to build stream: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        stream.play().map_err(|e| AudioError::DeviceError {
            reason: format!("Failed to start stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let shutdown = Arc::clone(&self.shutdown);
        let overflow = Arc::clone(&self.overflow);
        let level_tx = self.level_tx.clone();
        let pump = std::thread::spawn(move || {
            let mut scratch = vec![0.0f32; PUMP_SCRATCH_SAMPLES];
            loop {
                let n = consumer.pop_slice(&mut scratch);
                if n > 0 {
                    let samples = scratch[..n].to_vec();
                    // Metering reads the raw frames before they are appended.
                    level_tx.send_replace(compute_levels(&samples));
                    sink.append(RawAudioChunk {
                        samples,
                        native_sample_rate,
                        channels,
                        captured_at: Instant::now(),
                    });

                    let dropped = overflow.swap(0, Ordering::Relaxed);
                    if dropped > 0 {
                        warn!(dropped, "Audio ring overflow, samples lost before handoff");
                    }
                    continue;
                }

                // Exit only once the ring is fully drained after shutdown.
                if shutdown.load(Ordering::Acquire) {
                    break;
                }
                std::thread::sleep(PUMP_INTERVAL);
            }
            level_tx.send_replace(LevelReading::default());
            debug!("Capture pump stopped");
        });

        self.stream = Some(stream);
        self.pump = Some(pump);
        info!("Audio capture started");

        Ok(())
    }

    #[instrument(skip(self))]
    fn stop(&mut self) -> CoreResult<()> {
        if self.stream.is_none() && self.pump.is_none() {
            return Ok(());
        }

        self.shut_down_pump();
        info!("Audio capture stopped");

        Ok(())
    }

    fn level_receiver(&self) -> watch::Receiver<LevelReading> {
        self.level_rx.clone()
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.shut_down_pump();
    }
}
