pub mod emitter;

pub use emitter::ServiceEventEmitter;
