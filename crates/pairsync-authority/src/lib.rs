//! Render-authority arbitration for PairSync.
//!
//! Several sessions can see the same physical entity (same
//! [`NameHash`](pairsync_protocol::NameHash)) and each may want to push a
//! state update for it. The [`Arbitrator`] keeps one [`AuthorityLock`]
//! per contended name hash and settles every request by server priority,
//! so at most one session writes a given entity at a time.
//!
//! ```text
//! Session A ─┐                       ┌─ granted → RenderPipeline
//!            ├─→ Arbitrator (1 lock) ─┤
//! Session B ─┘                       └─ denied  → status event
//! ```

mod arbitrator;

pub use arbitrator::{Arbitrator, AuthorityLock, Grant};
