//! Reference feed-forward compressor kernel.
//!
//! Linked peak detection across the group's channels feeds a soft-knee
//! static curve; the resulting gain reduction is smoothed in the dB domain
//! with separate attack and release times and applied to the input delayed
//! by the lookahead, so the gain moves before the transient arrives.
//!
//! The lookahead is read once at creation and fixes the kernel's latency.
//! Every other parameter follows the settings block by block.

use crate::block_buffers::DelayLine;
use crate::error::{ProcessorError, ProcessorResult};
use crate::kernel::{Kernel, KernelFault, KernelSetup, Measurement};
use crate::settings::{EffectSettings, ParameterSpec};
use crate::types::{ParameterId, SampleCount};

pub const THRESHOLD: ParameterId = 0;
pub const MAKEUP_GAIN: ParameterId = 1;
pub const KNEE_WIDTH: ParameterId = 2;
pub const RATIO: ParameterId = 3;
pub const LOOKAHEAD: ParameterId = 4;
pub const ATTACK: ParameterId = 5;
pub const RELEASE: ParameterId = 6;

/// Floor for level conversions, in dB.
const SILENCE_DB: f32 = -150.0;

static PARAMETERS: &[ParameterSpec] = &[
    ParameterSpec::new(THRESHOLD, "Threshold", -10.0, -60.0, 0.0),
    ParameterSpec::new(MAKEUP_GAIN, "Make-up Gain", 0.0, 0.0, 30.0),
    ParameterSpec::new(KNEE_WIDTH, "Knee Width", 5.0, 0.0, 30.0),
    ParameterSpec::new(RATIO, "Ratio", 10.0, 1.0, 100.0),
    ParameterSpec::new(LOOKAHEAD, "Lookahead", 1.0, 0.0, 1000.0),
    ParameterSpec::new(ATTACK, "Attack", 30.0, 0.0, 1000.0),
    ParameterSpec::new(RELEASE, "Release", 150.0, 0.0, 1000.0),
];

#[inline]
fn lin_to_db(value: f32) -> f32 {
    if value <= 0.0 {
        SILENCE_DB
    } else {
        (20.0 * value.log10()).max(SILENCE_DB)
    }
}

#[inline]
fn db_to_lin(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// One-pole smoothing coefficient for a time constant.
#[inline]
fn smoothing_coefficient(time_ms: f64, sample_rate: f64) -> f32 {
    if time_ms <= 0.0 {
        0.0
    } else {
        (-1.0 / (time_ms * 0.001 * sample_rate)).exp() as f32
    }
}

/// Static curve parameters for one block.
#[derive(Debug, Clone, Copy)]
struct Curve {
    threshold_db: f32,
    knee_db: f32,
    slope: f32,
}

impl Curve {
    fn from_settings(settings: &EffectSettings) -> Self {
        let ratio = settings.get_or(RATIO, 10.0).max(1.0) as f32;
        Self {
            threshold_db: settings.get_or(THRESHOLD, -10.0) as f32,
            knee_db: settings.get_or(KNEE_WIDTH, 5.0).max(0.0) as f32,
            slope: 1.0 / ratio - 1.0,
        }
    }

    /// Gain reduction for an input level, in dB (zero or negative).
    #[inline]
    fn gain_db(&self, input_db: f32) -> f32 {
        let over = input_db - self.threshold_db;
        if 2.0 * over <= -self.knee_db {
            0.0
        } else if 2.0 * over.abs() < self.knee_db {
            let x = over + self.knee_db / 2.0;
            self.slope * x * x / (2.0 * self.knee_db)
        } else {
            self.slope * over
        }
    }
}

/// Latency in frames for a lookahead time.
fn lookahead_frames(settings: &EffectSettings, sample_rate: f64) -> SampleCount {
    let ms = settings.get_or(LOOKAHEAD, 0.0).max(0.0);
    (ms * sample_rate / 1000.0).round() as SampleCount
}

/// Feed-forward compressor with lookahead.
pub struct Compressor {
    sample_rate: f64,
    lookahead: Vec<DelayLine>,
    /// Per-frame linear gain of the current block, sized by the setup.
    gains: Vec<f32>,
    reduction_db: f32,
    last: Measurement,
}

impl Compressor {
    /// Gain reduction currently applied, in dB.
    pub fn reduction_db(&self) -> f32 {
        self.reduction_db
    }
}

impl Kernel for Compressor {
    fn parameters() -> &'static [ParameterSpec] {
        PARAMETERS
    }

    fn create(setup: &KernelSetup, settings: &EffectSettings) -> ProcessorResult<Self> {
        if setup.channels == 0 {
            return Err(ProcessorError::EmptyChannelMap);
        }
        let delay = lookahead_frames(settings, setup.sample_rate) as usize;
        log::debug!(
            "Compressor created ({:?}): {} channels, {} frames lookahead",
            setup.mode,
            setup.channels,
            delay
        );
        Ok(Self {
            sample_rate: setup.sample_rate,
            lookahead: (0..setup.channels).map(|_| DelayLine::new(delay)).collect(),
            gains: vec![0.0; setup.max_block_size.max(1)],
            reduction_db: 0.0,
            last: Measurement {
                input_db: SILENCE_DB,
                output_db: SILENCE_DB,
                ..Default::default()
            },
        })
    }

    fn latency(settings: &EffectSettings, sample_rate: f64) -> SampleCount {
        lookahead_frames(settings, sample_rate)
    }

    fn process(
        &mut self,
        settings: &EffectSettings,
        input: &[&[f32]],
        output: &mut [&mut [f32]],
        frames: usize,
    ) -> Result<usize, KernelFault> {
        let channels = self.lookahead.len();
        if input.len() != channels || output.len() != channels {
            return Err(KernelFault::ChannelMismatch {
                expected: channels,
                actual: input.len().min(output.len()),
            });
        }

        let curve = Curve::from_settings(settings);
        let makeup = settings.get_or(MAKEUP_GAIN, 0.0) as f32;
        let attack = smoothing_coefficient(settings.get_or(ATTACK, 30.0), self.sample_rate);
        let release = smoothing_coefficient(settings.get_or(RELEASE, 150.0), self.sample_rate);

        let mut peak_in = 0.0f32;
        let mut peak_out = 0.0f32;
        let mut target_db = 0.0f32;

        // Blocks longer than the sizing hint run in chunks of the gain buffer.
        let mut start = 0;
        while start < frames {
            let end = (start + self.gains.len()).min(frames);

            for (n, gain) in (start..end).zip(self.gains.iter_mut()) {
                let level = input.iter().fold(0.0f32, |acc, ch| acc.max(ch[n].abs()));
                peak_in = peak_in.max(level);

                target_db = curve.gain_db(lin_to_db(level));
                let coefficient = if target_db < self.reduction_db {
                    attack
                } else {
                    release
                };
                self.reduction_db = target_db + coefficient * (self.reduction_db - target_db);
                *gain = db_to_lin(self.reduction_db + makeup);
            }

            let gains = &self.gains[..end - start];
            for ((line, i), o) in self.lookahead.iter_mut().zip(input).zip(output.iter_mut()) {
                let o = &mut o[start..end];
                line.process(&i[start..end], o);
                for (sample, gain) in o.iter_mut().zip(gains) {
                    *sample *= gain;
                    peak_out = peak_out.max(sample.abs());
                }
            }
            start = end;
        }

        if !self.reduction_db.is_finite() {
            self.reset();
            return Err(KernelFault::InvalidState);
        }

        self.last = Measurement {
            target_compression_db: target_db,
            actual_compression_db: self.reduction_db,
            input_db: lin_to_db(peak_in),
            output_db: lin_to_db(peak_out),
        };
        Ok(frames)
    }

    fn pass_through(&mut self, _settings: &EffectSettings, input: &[&[f32]], frames: usize) {
        for (line, i) in self.lookahead.iter_mut().zip(input) {
            line.write(&i[..frames]);
        }
        self.reduction_db = 0.0;
    }

    fn reset(&mut self) {
        self.lookahead.iter_mut().for_each(DelayLine::clear);
        self.reduction_db = 0.0;
    }

    fn measurement(&self) -> Option<Measurement> {
        Some(self.last)
    }
}
