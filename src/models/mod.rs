pub mod candidate;
pub mod record;
pub mod session;

pub use candidate::{
  ClaimedBest, ParsedGroup, ParsedPayload, ParsedSession, ParsedSessionMeta, ParsedSet,
  ReportedInjury,
};
pub use record::{BestsSnapshot, InjuryRecord, RaceRecord, StrengthRecord, TrainingRecord};
pub use session::{Session, SessionType, SessionWithSets, SetCategory, WorkoutGroup, WorkoutSet};
