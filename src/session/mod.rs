pub mod manager;
pub mod snapshot;
pub mod supervisor;

pub use manager::{CaptureSession, CaptureSessionHandle};
pub use snapshot::SessionSnapshot;
pub use supervisor::{PreviewReceiver, SessionCommand};
