use crate::audio;
use crate::baud::{BaudConfig, DEFAULT_BAUD};
use crate::error::{ModemError, Result};
use crate::modulation::{LineCoding, Modulator};
use crate::signal::StatusLatch;
use crate::sync::FrameSynchronizer;
use crate::DEFAULT_AMPLITUDE;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct ModemConfig {
    pub baud: u32,
    pub coding: LineCoding,
    pub amplitude: f32,
    /// Substitute the software loopback for the real audio device.
    pub loopback: bool,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            baud: DEFAULT_BAUD,
            coding: LineCoding::Standard,
            amplitude: DEFAULT_AMPLITUDE,
            loopback: false,
        }
    }
}

/// Receivers handed to the pipeline tasks exactly once, at connect.
struct PipelineReceivers {
    data_in: mpsc::UnboundedReceiver<Vec<u8>>,
    unsynchronized: mpsc::UnboundedReceiver<Vec<f32>>,
    synchronized: mpsc::UnboundedReceiver<Vec<f32>>,
}

/// Full-duplex AFSK session: writer -> modulator -> audio boundary ->
/// synchronizer -> demodulator -> reader, all owned by one transport.
///
/// Protocol logic runs as cooperative tasks on the current tokio runtime;
/// only the audio boundary's real-time callbacks execute outside it, and
/// they touch nothing but the two thread-safe sample queues.
pub struct Transport {
    baud: BaudConfig,
    loopback: bool,
    modulator: Arc<Modulator>,
    data_in_tx: mpsc::UnboundedSender<Vec<u8>>,
    data_out_tx: mpsc::UnboundedSender<u8>,
    data_out_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<u8>>,
    unsynchronized_tx: mpsc::UnboundedSender<Vec<f32>>,
    synchronized_tx: mpsc::UnboundedSender<Vec<f32>>,
    audio_out_tx: crossbeam_channel::Sender<Vec<f32>>,
    audio_out_rx: crossbeam_channel::Receiver<Vec<f32>>,
    receivers: Mutex<Option<PipelineReceivers>>,
    stopped: StatusLatch,
    connected: StatusLatch,
    boundary_stop: StatusLatch,
    receiving: StatusLatch,
}

impl Transport {
    pub fn new(config: ModemConfig) -> Result<Self> {
        if !(config.amplitude > 0.0 && config.amplitude <= 1.0) {
            return Err(ModemError::InvalidAmplitude(config.amplitude));
        }
        let baud = BaudConfig::new(config.baud)?;
        let modulator = Arc::new(Modulator::new(baud, config.coding, config.amplitude));

        let (data_in_tx, data_in_rx) = mpsc::unbounded_channel();
        let (data_out_tx, data_out_rx) = mpsc::unbounded_channel();
        let (unsynchronized_tx, unsynchronized_rx) = mpsc::unbounded_channel();
        let (synchronized_tx, synchronized_rx) = mpsc::unbounded_channel();
        let (audio_out_tx, audio_out_rx) = crossbeam_channel::unbounded();

        // Prime the output side so the first boundary tick has a frame.
        audio_out_tx
            .send(vec![0.0; baud.frame_size])
            .expect("receiver held by self");

        Ok(Self {
            baud,
            loopback: config.loopback,
            modulator,
            data_in_tx,
            data_out_tx,
            data_out_rx: tokio::sync::Mutex::new(data_out_rx),
            unsynchronized_tx,
            synchronized_tx,
            audio_out_tx,
            audio_out_rx,
            receivers: Mutex::new(Some(PipelineReceivers {
                data_in: data_in_rx,
                unsynchronized: unsynchronized_rx,
                synchronized: synchronized_rx,
            })),
            stopped: StatusLatch::new(true),
            connected: StatusLatch::new(false),
            boundary_stop: StatusLatch::new(false),
            receiving: StatusLatch::new(false),
        })
    }

    pub fn baud(&self) -> BaudConfig {
        self.baud
    }

    pub fn is_connected(&self) -> bool {
        self.connected.is_set()
    }

    /// Set while the synchronizer is emitting aligned frames.
    pub fn receiving(&self) -> &StatusLatch {
        &self.receiving
    }

    /// Non-blocking enqueue of one outbound message. Messages carry no
    /// framing; consecutive writes are indistinguishable on the wire.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        self.data_in_tx
            .send(data.to_vec())
            .map_err(|_| ModemError::Disconnected)
    }

    /// Accumulates exactly `n` decoded bytes. The timeout is wall-clock
    /// from call start and covers the whole accumulation; on expiry any
    /// bytes already pulled off the queue are discarded.
    pub async fn read(&self, n: usize, timeout: Option<Duration>) -> Result<Vec<u8>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut data_out = self.data_out_rx.lock().await;
        let mut message = Vec::with_capacity(n);

        while message.len() < n {
            let byte = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, data_out.recv())
                    .await
                    .map_err(|_| ModemError::Timeout)?,
                None => data_out.recv().await,
            };
            message.push(byte.ok_or(ModemError::Disconnected)?);
        }
        Ok(message)
    }

    /// Starts the four pipeline tasks under a supervisor and returns once
    /// the pipeline is live. A transport connects at most once; a second
    /// call fails because the pipeline receivers are already consumed.
    pub async fn connect(&self) -> Result<()> {
        let receivers = self
            .receivers
            .lock()
            .expect("receiver lock poisoned")
            .take()
            .ok_or(ModemError::AlreadyConnected)?;

        self.stopped.clear();
        tokio::spawn(Supervisor::from(self).run(receivers));
        self.connected.wait_set().await;
        Ok(())
    }

    /// Connect, then block until an external [`stop`](Self::stop) fires.
    pub async fn connect_and_run_forever(&self) -> Result<()> {
        self.connect().await?;
        self.stopped.wait_set().await;
        self.stop();
        Ok(())
    }

    /// Idempotent shutdown trigger.
    pub fn stop(&self) {
        self.stopped.set();
    }
}

/// Owned handles for the background pipeline, detached from the transport's
/// lifetime so the supervisor task is 'static.
struct Supervisor {
    baud: BaudConfig,
    loopback: bool,
    modulator: Arc<Modulator>,
    data_out_tx: mpsc::UnboundedSender<u8>,
    unsynchronized_tx: mpsc::UnboundedSender<Vec<f32>>,
    synchronized_tx: mpsc::UnboundedSender<Vec<f32>>,
    audio_out_tx: crossbeam_channel::Sender<Vec<f32>>,
    audio_out_rx: crossbeam_channel::Receiver<Vec<f32>>,
    stopped: StatusLatch,
    connected: StatusLatch,
    boundary_stop: StatusLatch,
    receiving: StatusLatch,
}

impl From<&Transport> for Supervisor {
    fn from(transport: &Transport) -> Self {
        Self {
            baud: transport.baud,
            loopback: transport.loopback,
            modulator: transport.modulator.clone(),
            data_out_tx: transport.data_out_tx.clone(),
            unsynchronized_tx: transport.unsynchronized_tx.clone(),
            synchronized_tx: transport.synchronized_tx.clone(),
            audio_out_tx: transport.audio_out_tx.clone(),
            audio_out_rx: transport.audio_out_rx.clone(),
            stopped: transport.stopped.clone(),
            connected: transport.connected.clone(),
            boundary_stop: transport.boundary_stop.clone(),
            receiving: transport.receiving.clone(),
        }
    }
}

impl Supervisor {
    async fn run(self, receivers: PipelineReceivers) {
        let stopped = self.stopped.clone();

        let boundary = {
            let baud = self.baud;
            let loopback = self.loopback;
            let audio_in = self.unsynchronized_tx.clone();
            let audio_out = self.audio_out_rx.clone();
            let boundary_stop = self.boundary_stop.clone();
            let stopped = stopped.clone();
            tokio::spawn(async move {
                let result = if loopback {
                    audio::run_loopback(baud, audio_in, audio_out).await
                } else {
                    audio::run_device(baud, audio_in, audio_out, boundary_stop).await
                };
                if let Err(e) = result {
                    log::error!("audio boundary failed: {e}");
                    stopped.set();
                }
            })
        };

        let synchronizer = FrameSynchronizer::new(self.baud.frame_size, self.receiving.clone());
        let sync_task = tokio::spawn(
            synchronizer.synchronize(receivers.unsynchronized, self.synchronized_tx.clone()),
        );
        let modulate_task = tokio::spawn({
            let modulator = self.modulator.clone();
            let audio_out = self.audio_out_tx.clone();
            async move { modulator.modulate(receivers.data_in, audio_out).await }
        });
        let demodulate_task = tokio::spawn({
            let modulator = self.modulator.clone();
            let data_out = self.data_out_tx.clone();
            async move { modulator.demodulate(receivers.synchronized, data_out).await }
        });

        self.connected.set();
        log::info!(
            "pipeline connected: {} baud, {} boundary",
            self.baud.baud,
            if self.loopback { "loopback" } else { "device" }
        );

        stopped.wait_set().await;

        // Shutdown ordering matters: drop the connected signal first, then
        // flag the boundary so the scoped audio acquisition unwinds through
        // its own exit path, yield once so waiters observe it, and only
        // then cancel whatever is still running.
        self.connected.clear();
        self.boundary_stop.set();
        tokio::task::yield_now().await;
        for task in [boundary, sync_task, modulate_task, demodulate_task] {
            if !task.is_finished() {
                task.abort();
            }
        }
        log::info!("pipeline stopped");
    }
}
