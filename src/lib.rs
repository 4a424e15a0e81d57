//! A virtual composite tree index.
//!
//! Several independently owned sources (flat lists, hierarchical stores) are
//! presented as one ordered forest without copying their rows. The composite
//! translates addresses between its own virtual space and each source's local
//! space, hands out epoch-stamped handles, and re-emits source change events
//! in virtual addressing.

pub mod io;
pub mod logging;
pub mod model;
pub mod sidebar;
pub mod store;
pub mod tree;
pub mod util;
