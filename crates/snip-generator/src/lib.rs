//! Short code generators.

pub mod error;
pub mod random;

pub use error::GeneratorError;
pub use random::RandomGenerator;

use snip_core::ShortCode;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage, so
/// a generated code is only a candidate: uniqueness is enforced by the store
/// on insert and collisions are retried by the caller.
pub trait Generator: Send + Sync + 'static {
    fn generate(&self) -> ShortCode;
}

impl<G: Generator + ?Sized> Generator for Box<G> {
    fn generate(&self) -> ShortCode {
        (**self).generate()
    }
}
