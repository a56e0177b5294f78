pub mod reconciler;
pub mod result;
pub mod state;

pub use reconciler::{transition, InvalidTransition, Phase, Reconciler, Render};
pub use result::{RecognitionPayload, RecognitionResult};
pub use state::{Event, RequestState};
