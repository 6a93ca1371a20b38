//! Production media backend
//!
//! Encodes through the external `oggenc` / `opusenc` programs and reads
//! and writes Vorbis comments with `lofty`.

pub mod backend;
pub mod encoder;
pub mod tags;

pub use backend::AudioBackend;
pub use encoder::ExternalEncoder;
