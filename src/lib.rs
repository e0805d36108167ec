pub mod logger;
pub mod error;
pub mod settings;
pub mod extensions;
pub mod seasonality;
pub mod campaign;
pub mod seed;
pub mod matching;
pub mod quality;
pub mod competition;
pub mod auction;
pub mod controller_core;
pub mod bidders;
pub mod pacing;
pub mod results;
pub mod simulation;
pub mod charts;

pub use campaign::CampaignConfig;
pub use error::ConfigError;
pub use results::SimulationResult;
pub use simulation::{simulate, simulate_with, Simulation};
