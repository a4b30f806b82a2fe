//! Backend module - invoker contract and the Gemini HTTP invoker

pub mod gemini;
pub mod traits;

pub use traits::{
    BackendDescriptor, BackendError, BackendInvoker, BackendKind, FailureKind, GeneratedContent,
    GenerationRequest,
};
