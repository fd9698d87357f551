pub mod backend;
pub mod capture;
pub mod file;
pub mod pcm;
pub mod resample;
pub mod vad;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use capture::{list_input_devices, MicrophoneBackend};
pub use file::{AudioFile, FileBackend};
pub use pcm::encode_pcm16_le;
pub use resample::resample_linear;
pub use vad::{GateConfig, VoiceGate};
