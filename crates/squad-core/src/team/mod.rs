//! Teams: registry records, durable storage and the lead-side manager

pub mod manager;
pub mod registry;
pub mod types;

pub use manager::{TeamManager, TeamStatusReport};
pub use registry::{TeamLocks, TeamRegistry};
pub use types::{MemberStatus, TeamConfig, TeamMember, TeamStatus, agent_id, validate_name};
