//! The encode pipeline shared by indexing and querying.

use std::sync::Arc;

use crate::analysis::encoder::Encoder;
use crate::analysis::rules::{MatcherRules, Stemmer, StopwordFilter};
use crate::error::Result;

/// Matchers, encoder, stopword filter and stemmer, applied in that order.
///
/// Every stage is skipped once the text has become empty.
#[derive(Debug, Clone, Default)]
pub struct EncodePipeline {
    matcher: MatcherRules,
    encoder: Option<Arc<dyn Encoder>>,
    filter: Option<StopwordFilter>,
    stemmer: Option<Stemmer>,
}

impl EncodePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> EncodePipelineBuilder {
        EncodePipelineBuilder::default()
    }

    /// The encoder stage, if any.
    pub fn encoder(&self) -> Option<&Arc<dyn Encoder>> {
        self.encoder.as_ref()
    }

    /// Number of matcher rules in this pipeline.
    pub fn matcher_count(&self) -> usize {
        self.matcher.len()
    }
}

impl Encoder for EncodePipeline {
    fn encode(&self, text: &str) -> Result<String> {
        let mut value = text.to_string();

        if !value.is_empty() && !self.matcher.is_empty() {
            value = self.matcher.apply(&value);
        }
        if !value.is_empty() {
            if let Some(encoder) = &self.encoder {
                value = encoder.encode(&value)?;
            }
        }
        if !value.is_empty() {
            if let Some(filter) = &self.filter {
                value = filter.apply(&value);
            }
        }
        if !value.is_empty() {
            if let Some(stemmer) = &self.stemmer {
                value = stemmer.apply(&value);
            }
        }

        Ok(value)
    }

    fn name(&self) -> &str {
        "pipeline"
    }
}

#[derive(Default)]
pub struct EncodePipelineBuilder {
    matcher: MatcherRules,
    encoder: Option<Arc<dyn Encoder>>,
    filter: Option<StopwordFilter>,
    stemmer: Option<Stemmer>,
}

impl EncodePipelineBuilder {
    pub fn matcher(mut self, rules: MatcherRules) -> Self {
        self.matcher.extend(rules);
        self
    }

    pub fn encoder(mut self, encoder: Arc<dyn Encoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn filter(mut self, filter: StopwordFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn stemmer(mut self, stemmer: Stemmer) -> Self {
        self.stemmer = Some(stemmer);
        self
    }

    pub fn build(self) -> EncodePipeline {
        EncodePipeline {
            matcher: self.matcher,
            encoder: self.encoder,
            filter: self.filter,
            stemmer: self.stemmer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::encoder::BuiltinEncoder;

    #[test]
    fn test_empty_pipeline_is_identity() {
        let pipeline = EncodePipeline::new();
        assert_eq!(pipeline.encode("Hello").unwrap(), "Hello");
    }

    #[test]
    fn test_stage_order() {
        let matcher =
            MatcherRules::compile(&[("Colour".to_string(), "Color".to_string())]).unwrap();
        let words = vec!["a".to_string()];
        let filter = StopwordFilter::new(&words, None).unwrap();
        let stemmer = Stemmer::new(&[("s".to_string(), "".to_string())], None).unwrap();

        let pipeline = EncodePipeline::builder()
            .matcher(matcher)
            .encoder(Arc::new(BuiltinEncoder::Icase))
            .filter(filter)
            .stemmer(stemmer)
            .build();

        // matcher runs before lowercasing, stemming after filtering
        assert_eq!(pipeline.encode("A Colour of Walls").unwrap(), "color of wall");
        assert_eq!(pipeline.matcher_count(), 1);
    }
}
