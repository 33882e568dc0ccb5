pub mod registry;

pub use registry::RegistryNamespace;
