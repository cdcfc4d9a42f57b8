//! Model loading and inference components

pub mod artifact;
pub mod classifier;
pub mod inference;
pub mod linear;
pub mod loader;
pub mod onnx;
pub mod tree;

pub use classifier::Classifier;
pub use inference::InferenceEngine;
pub use loader::{LoadedModel, ModelLoader};
