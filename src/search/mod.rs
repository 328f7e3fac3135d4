mod backend;
mod ytmusic;

pub use backend::{Candidate, CandidateKind, NoopSearchBackend, SearchBackend};
pub use ytmusic::YtMusicSearchBackend;
