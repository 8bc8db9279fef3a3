//! NPC clients and the machinery that coordinates their turns.

mod guard;
mod npc;
mod stream;

pub use guard::{ActiveFlag, ActiveState, Readiness};
pub use npc::NpcClient;
pub use stream::{TalkEvent, TalkStream};
