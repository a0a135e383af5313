use crate::baud::BaudConfig;
use crate::error::{ModemError, Result};
use crate::signal::StatusLatch;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};
use std::collections::VecDeque;
use tokio::sync::{mpsc, oneshot};

/// Full-duplex mono stream pair held open for one transport session.
///
/// cpal streams are not Send, so the pair lives on a dedicated thread and
/// is released by dropping it there; see [`run_device`].
struct DuplexStream {
    _input: cpal::Stream,
    _output: cpal::Stream,
}

fn stream_config(baud: BaudConfig) -> StreamConfig {
    StreamConfig {
        channels: 1,
        sample_rate: SampleRate(baud.sample_rate),
        buffer_size: BufferSize::Fixed(baud.frame_size as u32),
    }
}

fn open_duplex(
    baud: BaudConfig,
    audio_in: mpsc::UnboundedSender<Vec<f32>>,
    audio_out: crossbeam_channel::Receiver<Vec<f32>>,
) -> Result<DuplexStream> {
    let host = cpal::default_host();
    let input_device = host
        .default_input_device()
        .ok_or_else(|| ModemError::AudioDevice("no input device found".into()))?;
    let output_device = host
        .default_output_device()
        .ok_or_else(|| ModemError::AudioDevice("no output device found".into()))?;
    let config = stream_config(baud);

    let input = input_device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // The pipeline may already be stopped; dropping the block
                // here is the one benign race this adapter suppresses.
                let _ = audio_in.send(data.to_vec());
            },
            |err| log::error!("audio input error: {err}"),
            None,
        )
        .map_err(|e| ModemError::AudioDevice(e.to_string()))?;

    let mut pending: VecDeque<f32> = VecDeque::new();
    let output = output_device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for slot in data.iter_mut() {
                    if pending.is_empty() {
                        match audio_out.try_recv() {
                            Ok(frame) => pending.extend(frame),
                            // Underrun policy: silence, never block.
                            Err(_) => {
                                *slot = 0.0;
                                continue;
                            }
                        }
                    }
                    *slot = pending.pop_front().unwrap_or(0.0);
                }
            },
            |err| log::error!("audio output error: {err}"),
            None,
        )
        .map_err(|e| ModemError::AudioDevice(e.to_string()))?;

    input
        .play()
        .map_err(|e| ModemError::AudioDevice(e.to_string()))?;
    output
        .play()
        .map_err(|e| ModemError::AudioDevice(e.to_string()))?;

    Ok(DuplexStream {
        _input: input,
        _output: output,
    })
}

/// Device boundary adapter: acquires the full-duplex stream pair for the
/// session and releases it when `stop` fires, before the owning task is
/// cancelled.
pub async fn run_device(
    baud: BaudConfig,
    audio_in: mpsc::UnboundedSender<Vec<f32>>,
    audio_out: crossbeam_channel::Receiver<Vec<f32>>,
    stop: StatusLatch,
) -> Result<()> {
    let (ready_tx, ready_rx) = oneshot::channel();
    let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(1);

    let worker = std::thread::Builder::new()
        .name("audio-boundary".into())
        .spawn(move || match open_duplex(baud, audio_in, audio_out) {
            Ok(duplex) => {
                let _ = ready_tx.send(Ok(()));
                // Hold the streams open until the stop flag unblocks us.
                let _ = release_rx.recv();
                drop(duplex);
                log::info!("audio streams released");
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
            }
        })?;

    ready_rx
        .await
        .map_err(|_| ModemError::AudioDevice("audio thread exited during setup".into()))??;
    log::info!(
        "audio streams open: {} Hz, {}-sample blocks",
        baud.sample_rate,
        baud.frame_size
    );

    stop.wait_set().await;
    let _ = release_tx.send(());
    tokio::task::spawn_blocking(move || worker.join())
        .await
        .map_err(|e| ModemError::AudioDevice(e.to_string()))?
        .map_err(|_| ModemError::AudioDevice("audio thread panicked".into()))?;
    Ok(())
}

/// Loopback boundary adapter: reproduces the device cadence in software by
/// copying the most recent outbound frame back in as the next inbound frame,
/// or silence when none is ready. Runs until cancelled.
pub async fn run_loopback(
    baud: BaudConfig,
    audio_in: mpsc::UnboundedSender<Vec<f32>>,
    audio_out: crossbeam_channel::Receiver<Vec<f32>>,
) -> Result<()> {
    let mut ticker = tokio::time::interval(baud.frame_period());

    loop {
        ticker.tick().await;
        let frame = audio_out
            .try_recv()
            .unwrap_or_else(|_| vec![0.0; baud.frame_size]);
        if audio_in.send(frame).is_err() {
            log::debug!("inbound sample queue closed, loopback exiting");
            return Ok(());
        }
    }
}

pub fn list_devices() -> Vec<String> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let Ok(name) = device.name() {
                devices.push(format!("Output: {}", name));
            }
        }
    }

    if let Ok(input_devices) = host.input_devices() {
        for device in input_devices {
            if let Ok(name) = device.name() {
                devices.push(format!("Input: {}", name));
            }
        }
    }

    devices
}
