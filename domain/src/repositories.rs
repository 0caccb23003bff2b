mod leaderboard_snapshot_repository;
mod player_profile_repository;
mod publish;
mod roster_repository;

pub use leaderboard_snapshot_repository::{LeaderboardSnapshotRepository, SnapshotWriteError};
pub use player_profile_repository::PlayerProfileRepository;
pub use publish::{DeployError, Deployer, PublishGate, WorkingTreeStatus};
pub use roster_repository::{RosterError, RosterRepository};
