//! Server state and configuration.

use crate::facade::PrinterFacade;
use crate::layout::Composer;
use crate::printer::PaperProfile;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
    /// Paper used for the test page
    pub paper: PaperProfile,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            paper: PaperProfile::default(),
        }
    }
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub facade: PrinterFacade,
    pub composer: Composer,
}

impl AppState {
    pub fn new(config: ServerConfig, facade: PrinterFacade) -> Self {
        let composer = Composer::new(config.paper);
        Self {
            config,
            facade,
            composer,
        }
    }
}
