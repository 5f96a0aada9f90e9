use std::path::Path;

use crate::postprocess::{Passthrough, PostProcessor};
use crate::{Result, SampleEncoding, Speech, SpeechEngine};

/// Couples a loaded engine with the post-processing applied to its output.
///
/// Every piece of audio the tools write goes through [`Narrator::speak`]:
/// synthesis first, then the post-processor. Nothing is mutated globally,
/// so two narrators with different processors can coexist in one process.
pub struct Narrator<E: SpeechEngine, P = Passthrough> {
    engine: E,
    params: Option<E::SynthesisParams>,
    post: P,
}

impl<E: SpeechEngine> Narrator<E, Passthrough> {
    /// Create a narrator that writes the engine output unchanged.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            params: None,
            post: Passthrough,
        }
    }
}

impl<E: SpeechEngine, P: PostProcessor> Narrator<E, P> {
    /// Replace the post-processor.
    pub fn with_post_processor<Q: PostProcessor>(self, post: Q) -> Narrator<E, Q> {
        Narrator {
            engine: self.engine,
            params: self.params,
            post,
        }
    }

    /// Use `params` for every synthesis call instead of the engine defaults.
    pub fn with_params(mut self, params: E::SynthesisParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Synthesize `text` and run the result through the post-processor.
    pub fn speak(&mut self, text: &str) -> Result<Speech> {
        let speech = self.engine.synthesize(text, self.params.clone())?;
        self.post.process(speech)
    }

    /// Like [`speak`](Self::speak), then write the audio to `path`.
    ///
    /// Returns the speech that was written so callers can report on it.
    pub fn speak_to_file(
        &mut self,
        text: &str,
        path: &Path,
        encoding: SampleEncoding,
    ) -> Result<Speech> {
        let speech = self.speak(text)?;
        speech.write_wav(path, encoding)?;
        Ok(speech)
    }
}
