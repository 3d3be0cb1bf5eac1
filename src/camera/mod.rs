pub mod scene;
pub mod synthetic;

pub use scene::{SceneDecoder, SimulatedScene};
pub use synthetic::SyntheticCamera;
