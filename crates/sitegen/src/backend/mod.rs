pub mod agent;
pub mod direct;

use crate::options::GenerateOptions;
use crate::request::GenerationRequest;
use crate::stream::EventStream;

/// A generation backend: anything that can turn a request into an ordered
/// sequence of generation events.
///
/// Implementations differ in *how* the events are produced — an
/// interactive multi-turn agent ([`agent::AgentGenerator`]) or a single
/// model call parsed into file blocks ([`direct::DirectGenerator`]) — but
/// consumers depend only on this trait and must work with either.
pub trait Generator: Send + Sync {
    /// Start one generation turn. The returned stream yields events
    /// lazily; a well-formed sequence ends with exactly one `complete` or
    /// one `error` event. A sequence that ends without a terminal event
    /// (e.g. after cancellation) is abnormal and the caller decides how
    /// to surface it.
    fn generate(&self, request: &GenerationRequest, opts: GenerateOptions) -> EventStream;
}
