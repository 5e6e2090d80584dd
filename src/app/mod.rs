// Application layer - Use case interactors

pub mod crop_interactor;
pub mod inspect_interactor;
pub mod session;

// Re-export interactors
pub use crop_interactor::{CropInteractor, CropOutcome};
pub use inspect_interactor::{InspectInteractor, InspectResponse};
pub use session::{suggest_dir, EditingSession, SessionConfig};
