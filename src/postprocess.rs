//! Post-processing applied to synthesized audio before it is written.
//!
//! A [`Narrator`](crate::Narrator) owns exactly one processor. The default,
//! [`Passthrough`], leaves the engine output untouched, which is how this crate
//! keeps audio free of any provenance watermark without patching the engine.

use crate::{Result, Speech};

/// A step that transforms synthesized audio.
pub trait PostProcessor {
    fn process(&self, speech: Speech) -> Result<Speech>;
}

/// Returns audio unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl PostProcessor for Passthrough {
    fn process(&self, speech: Speech) -> Result<Speech> {
        Ok(speech)
    }
}

/// Scales audio so its absolute peak equals `target`.
#[derive(Debug, Clone, Copy)]
pub struct PeakNormalize {
    pub target: f32,
}

impl PeakNormalize {
    pub fn new(target: f32) -> Self {
        Self { target }
    }
}

impl PostProcessor for PeakNormalize {
    fn process(&self, mut speech: Speech) -> Result<Speech> {
        let peak = speech.peak();
        // Silence stays silence.
        if peak <= f32::EPSILON {
            return Ok(speech);
        }
        let gain = self.target / peak;
        log::debug!("Normalizing peak {peak:.3} -> {:.3} (gain {gain:.3})", self.target);
        for sample in &mut speech.samples {
            *sample *= gain;
        }
        Ok(speech)
    }
}

/// Runs `first`, then `second`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Chain<A, B> {
    pub first: A,
    pub second: B,
}

impl<A: PostProcessor, B: PostProcessor> PostProcessor for Chain<A, B> {
    fn process(&self, speech: Speech) -> Result<Speech> {
        self.second.process(self.first.process(speech)?)
    }
}

/// A processor backed by a closure. Created with [`from_fn`].
#[derive(Clone, Copy)]
pub struct FromFn<F>(F);

/// Wrap a closure as a [`PostProcessor`].
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: Fn(Speech) -> Result<Speech>,
{
    FromFn(f)
}

impl<F> PostProcessor for FromFn<F>
where
    F: Fn(Speech) -> Result<Speech>,
{
    fn process(&self, speech: Speech) -> Result<Speech> {
        (self.0)(speech)
    }
}

/// `None` behaves like [`Passthrough`].
impl<P: PostProcessor> PostProcessor for Option<P> {
    fn process(&self, speech: Speech) -> Result<Speech> {
        match self {
            Some(inner) => inner.process(speech),
            None => Ok(speech),
        }
    }
}

impl<P: PostProcessor + ?Sized> PostProcessor for Box<P> {
    fn process(&self, speech: Speech) -> Result<Speech> {
        (**self).process(speech)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SAMPLE_RATE;

    fn speech(samples: &[f32]) -> Speech {
        Speech::new(samples.to_vec(), SAMPLE_RATE)
    }

    #[test]
    fn passthrough_is_identity() {
        let input = speech(&[0.1, -0.2, 0.3]);
        assert_eq!(Passthrough.process(input.clone()).unwrap(), input);
    }

    #[test]
    fn normalize_scales_to_target_peak() {
        let out = PeakNormalize::new(0.9)
            .process(speech(&[0.25, -0.5, 0.1]))
            .unwrap();
        assert!((out.peak() - 0.9).abs() < 1e-6);
        assert!((out.samples[0] - 0.45).abs() < 1e-6);
    }

    #[test]
    fn normalize_leaves_silence_alone() {
        let silent = speech(&[0.0, 0.0]);
        assert_eq!(PeakNormalize::new(1.0).process(silent.clone()).unwrap(), silent);
        let empty = speech(&[]);
        assert_eq!(PeakNormalize::new(1.0).process(empty.clone()).unwrap(), empty);
    }

    #[test]
    fn chain_runs_in_order() {
        let double = from_fn(|mut s: Speech| -> Result<Speech> {
            s.samples.iter_mut().for_each(|x| *x *= 2.0);
            Ok(s)
        });
        let chain = Chain {
            first: PeakNormalize::new(0.5),
            second: double,
        };
        let out = chain.process(speech(&[0.1, -0.2])).unwrap();
        assert!((out.peak() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn closure_errors_propagate() {
        let fail = from_fn(|_: Speech| -> Result<Speech> { Err(crate::Error::Engine("boom".into())) });
        assert!(fail.process(speech(&[0.1])).is_err());
    }

    #[test]
    fn none_is_passthrough() {
        let input = speech(&[0.3, -0.1]);
        let off: Option<PeakNormalize> = None;
        assert_eq!(off.process(input.clone()).unwrap(), input);
        let on = Some(PeakNormalize::new(0.6));
        assert!((on.process(input).unwrap().peak() - 0.6).abs() < 1e-6);
    }
}
