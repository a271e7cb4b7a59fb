mod artifact;
mod environment;

pub use artifact::ArtifactRepository;
pub use environment::EnvironmentRepository;
