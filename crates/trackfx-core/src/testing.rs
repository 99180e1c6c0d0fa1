//! Small kernels shared by unit tests.

use crate::block_buffers::DelayLine;
use crate::error::{ProcessorError, ProcessorResult};
use crate::kernel::{Kernel, KernelFault, KernelSetup, Measurement};
use crate::settings::{EffectSettings, ParameterSpec};
use crate::types::SampleCount;

pub const GAIN: u32 = 0;

/// Linear gain with a peak meter.
pub struct Gain {
    channels: usize,
    last: Option<Measurement>,
}

static GAIN_PARAMETERS: &[ParameterSpec] = &[ParameterSpec::new(GAIN, "Gain", 1.0, 0.0, 4.0)];

impl Kernel for Gain {
    fn parameters() -> &'static [ParameterSpec] {
        GAIN_PARAMETERS
    }

    fn create(setup: &KernelSetup, _settings: &EffectSettings) -> ProcessorResult<Self> {
        Ok(Self {
            channels: setup.channels,
            last: None,
        })
    }

    fn process(
        &mut self,
        settings: &EffectSettings,
        input: &[&[f32]],
        output: &mut [&mut [f32]],
        frames: usize,
    ) -> Result<usize, KernelFault> {
        if input.len() != self.channels {
            return Err(KernelFault::ChannelMismatch {
                expected: self.channels,
                actual: input.len(),
            });
        }
        let gain = settings.get_or(GAIN, 1.0) as f32;
        let mut peak_in = 0.0f32;
        let mut peak_out = 0.0f32;
        for (i, o) in input.iter().zip(output.iter_mut()) {
            for n in 0..frames {
                o[n] = i[n] * gain;
                peak_in = peak_in.max(i[n].abs());
                peak_out = peak_out.max(o[n].abs());
            }
        }
        self.last = Some(Measurement {
            target_compression_db: 0.0,
            actual_compression_db: 0.0,
            input_db: peak_in,
            output_db: peak_out,
        });
        Ok(frames)
    }

    fn measurement(&self) -> Option<Measurement> {
        self.last
    }
}

pub const DELAY: u32 = 0;

/// Pure delay whose latency equals its `Delay` parameter in frames.
pub struct Delay {
    lines: Vec<DelayLine>,
}

static DELAY_PARAMETERS: &[ParameterSpec] = &[ParameterSpec::new(DELAY, "Delay", 3.0, 0.0, 64.0)];

impl Kernel for Delay {
    fn parameters() -> &'static [ParameterSpec] {
        DELAY_PARAMETERS
    }

    fn create(setup: &KernelSetup, settings: &EffectSettings) -> ProcessorResult<Self> {
        let delay = Self::latency(settings, setup.sample_rate) as usize;
        Ok(Self {
            lines: (0..setup.channels).map(|_| DelayLine::new(delay)).collect(),
        })
    }

    fn latency(settings: &EffectSettings, _sample_rate: f64) -> SampleCount {
        settings.get_or(DELAY, 0.0).round() as SampleCount
    }

    fn process(
        &mut self,
        _settings: &EffectSettings,
        input: &[&[f32]],
        output: &mut [&mut [f32]],
        frames: usize,
    ) -> Result<usize, KernelFault> {
        for ((line, i), o) in self.lines.iter_mut().zip(input).zip(output.iter_mut()) {
            line.process(&i[..frames], &mut o[..frames]);
        }
        Ok(frames)
    }

    fn reset(&mut self) {
        self.lines.iter_mut().for_each(DelayLine::clear);
    }
}

pub const FAIL: u32 = 1;

/// Delay that faults while its `Fail` parameter is set.
pub struct Glitch {
    delay: Delay,
}

static GLITCH_PARAMETERS: &[ParameterSpec] = &[
    ParameterSpec::new(DELAY, "Delay", 2.0, 0.0, 64.0),
    ParameterSpec::new(FAIL, "Fail", 0.0, 0.0, 1.0),
];

impl Kernel for Glitch {
    fn parameters() -> &'static [ParameterSpec] {
        GLITCH_PARAMETERS
    }

    fn create(setup: &KernelSetup, settings: &EffectSettings) -> ProcessorResult<Self> {
        Ok(Self {
            delay: Delay::create(setup, settings)?,
        })
    }

    fn latency(settings: &EffectSettings, sample_rate: f64) -> SampleCount {
        Delay::latency(settings, sample_rate)
    }

    fn process(
        &mut self,
        settings: &EffectSettings,
        input: &[&[f32]],
        output: &mut [&mut [f32]],
        frames: usize,
    ) -> Result<usize, KernelFault> {
        if settings.get_or(FAIL, 0.0) > 0.5 {
            return Err(KernelFault::InvalidState);
        }
        self.delay.process(settings, input, output, frames)
    }

    fn reset(&mut self) {
        self.delay.reset();
    }
}

/// Kernel that faults on every block.
pub struct Faulty;

impl Kernel for Faulty {
    fn parameters() -> &'static [ParameterSpec] {
        &[]
    }

    fn create(_setup: &KernelSetup, _settings: &EffectSettings) -> ProcessorResult<Self> {
        Ok(Self)
    }

    fn process(
        &mut self,
        _settings: &EffectSettings,
        _input: &[&[f32]],
        _output: &mut [&mut [f32]],
        _frames: usize,
    ) -> Result<usize, KernelFault> {
        Err(KernelFault::InvalidState)
    }
}

/// Kernel that cannot be created.
pub struct Missing;

impl Kernel for Missing {
    fn parameters() -> &'static [ParameterSpec] {
        &[]
    }

    fn create(_setup: &KernelSetup, _settings: &EffectSettings) -> ProcessorResult<Self> {
        Err(ProcessorError::KernelUnavailable("plugin not installed".into()))
    }

    fn process(
        &mut self,
        _settings: &EffectSettings,
        _input: &[&[f32]],
        _output: &mut [&mut [f32]],
        _frames: usize,
    ) -> Result<usize, KernelFault> {
        Ok(0)
    }
}
