//! Field price capture: sentence parsing, draft accumulation and the
//! submission log.

pub mod app_config;
pub mod catalog;
pub mod config;
pub mod desk;
pub mod draft;
pub mod error;
pub mod item;
pub mod parser;
pub mod recognition;
pub mod submissions;

pub use app_config::{AppConfig, Environment};
pub use catalog::{load_catalog, parse_catalog, CaptureCatalog};
pub use config::{load_app_config, load_app_config_from_env};
pub use desk::{CaptureDesk, CapturePhase};
pub use draft::{AddOutcome, DraftAccumulator, DraftEntry, DraftId};
pub use error::{CaptureError, ConfigError, EditError, LogError, ValidationError};
pub use item::{parse_price, CaptureItem, ItemIdentity, ItemPatch, Location};
pub use parser::{ParseOutcome, SentenceParser, Vocabulary};
pub use recognition::RecognitionOutcome;
pub use submissions::{CaptureSession, SessionId, SubmissionLog};
