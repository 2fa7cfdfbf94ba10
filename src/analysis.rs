//! Text analysis: encoding pipeline, tokenization modes and the registry of
//! named analysis components.
//!
//! # Module Structure
//!
//! - `encoder`: `Encoder` capability and the built-in encoders
//! - `tokenizer`: `Tokenizer` capability and `TokenizeMode`
//! - `rules`: matchers, stopword filters and stemmers
//! - `pipeline`: the composed `EncodePipeline`
//! - `registry`: named encoders, matchers and language packs

pub mod encoder;
pub mod pipeline;
pub mod registry;
pub mod rules;
pub mod tokenizer;

pub use encoder::{BuiltinEncoder, Encoder, EncoderKind};
pub use pipeline::EncodePipeline;
pub use registry::{LanguagePack, Registry};
pub use tokenizer::{Fragment, TokenizeMode, Tokenizer};
