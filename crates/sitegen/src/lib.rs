//! `sitegen` — generation backend abstraction for Bond Media Studio.
//!
//! A [`Generator`] turns a [`GenerationRequest`] into a finite, ordered,
//! lazy sequence of [`GenerationEvent`]s. The sequence is terminated by
//! exactly one `complete` or one `error` event; if it ends without either
//! (cancellation, dropped connection) the consumer must treat that as an
//! abnormal termination.
//!
//! # Architecture
//!
//! ```text
//! GenerationRequest ── classify.rs builds it from a raw chat prompt
//!     │
//!     ▼
//! Generator         ← agent-mediated (JSONL over HTTP) or model-direct
//!     │                (one completion call parsed into file blocks)
//!     ▼
//! EventStream       ← implements futures::Stream<Item = Result<GenerationEvent>>
//!     │                background task + mpsc channel
//!     ▼
//! GenerationEvent   ← plan / file_create / file_edit / explanation /
//!                      error / complete, plus a catch-all for unknown tags
//! ```
//!
//! The two backends are interchangeable behind the [`Generator`] trait;
//! consumers never know which one produced the events.

pub mod backend;
pub mod cancel;
pub mod classify;
pub mod error;
pub mod event;
pub mod options;
pub mod request;
pub mod stream;

pub use backend::{agent::AgentGenerator, direct::DirectGenerator, Generator};
pub use cancel::CancelToken;
pub use classify::{PatternClassifier, PromptClassifier};
pub use error::GeneratorError;
pub use event::{FinishReason, GenerationEvent};
pub use options::GenerateOptions;
pub use request::{
    BrandGuidelines, ChatRole, GenerationRequest, HistoryMessage, RequestContext, RequestKind,
    Requirements, SiteStyle, TechnicalPrefs,
};
pub use stream::EventStream;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, GeneratorError>;
