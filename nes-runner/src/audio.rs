//! Audio output for the console's PCM stream.
//!
//! The APU resamples to 44.1 kHz and buffers into its own drop-oldest
//! queue; this module moves those samples onto a cpal stream through a
//! lock-free ring. The ring is deliberately smaller than the APU's queue
//! bound, so a fast emulation loop blocks here — pacing itself to the
//! audio clock — before the APU ever starts dropping samples.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use nes_core::{CPU_FREQ, SAMPLE_RATE};
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapRb,
};

/// NTSC CPU cycles per frame. The APU emits one sample per
/// `CPU_FREQ / SAMPLE_RATE` cycles, so one frame is ~733 samples.
const CYCLES_PER_FRAME: u64 = 29781;
const SAMPLES_PER_FRAME: usize =
    (CYCLES_PER_FRAME * SAMPLE_RATE as u64 / CPU_FREQ as u64) as usize;

/// Six frames of slack. Must stay below the APU's sample-rate/4 queue
/// bound so back-pressure, not drop-oldest eviction, is what paces the
/// emulation in the steady state.
const RING_CAPACITY: usize = SAMPLES_PER_FRAME * 6;
/// Silence pre-fill so the stream does not underrun before the first
/// frame of emulated audio lands.
const PREFILL: usize = SAMPLES_PER_FRAME * 3;

/// Owns the cpal stream and the producer half of the sample ring.
pub struct AudioOutput {
    _stream: Stream,
    producer: ringbuf::HeapProd<f32>,
}

impl AudioOutput {
    /// Open the default output device at the console's sample rate.
    /// Returns `None` when no device is available; the runner then paces
    /// from the wall clock instead.
    pub fn open() -> Option<Self> {
        let device = cpal::default_host().default_output_device()?;
        let config = StreamConfig {
            channels: 1,
            sample_rate: SampleRate(SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        let (mut producer, mut consumer) = HeapRb::<f32>::new(RING_CAPACITY).split();
        let _ = producer.push_slice(&[0.0; PREFILL]);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let got = consumer.pop_slice(data);
                    // Underrun: pad with silence rather than stale data.
                    data[got..].fill(0.0);
                },
                |err| eprintln!("audio stream error: {err}"),
                None,
            )
            .ok()?;
        stream.play().ok()?;

        Some(Self {
            _stream: stream,
            producer,
        })
    }

    /// Move a batch of drained APU samples onto the ring, blocking while
    /// it is full. The block is the pacing mechanism: the emulation loop
    /// stalls here until the audio thread has consumed a frame's worth.
    pub fn push(&mut self, mut samples: &[f32]) {
        while !samples.is_empty() {
            let written = self.producer.push_slice(samples);
            samples = &samples[written..];
            if !samples.is_empty() {
                std::thread::yield_now();
            }
        }
    }
}
