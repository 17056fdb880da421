pub mod cache;
pub mod clients;
pub mod config;
pub mod identity;
pub mod logging;
pub mod services;
pub mod session;
pub mod types;
pub mod vocabulary;

pub use cache::{MediaCache, MediaContent, MediaKey};
pub use clients::{Collaborators, ServiceError, ServiceKind};
pub use config::SessionConfig;
pub use identity::CardId;
pub use services::grading::{GradeError, GradeStatus, SyncState};
pub use session::{ItemMedia, Session, SessionStart, StudySessionManager};
pub use types::{
    CapabilityFlags, CharacterSet, Direction, GradeOutcome, SessionPreferences, SessionStatistics, StudyItem,
};
pub use vocabulary::{VocabularyEntry, VocabularyIndex};
