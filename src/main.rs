use facecap::app::CaptureApp;
use facecap::{AppError, Settings};
use tracing::{error, Level};

fn init_logging(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let (settings, load_error) = match Settings::load() {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    };
    init_logging(settings.logging.max_level());
    if let Some(e) = load_error {
        error!("Failed to load settings, using defaults: {}", e);
    }

    CaptureApp::start_gui(&settings)
}
