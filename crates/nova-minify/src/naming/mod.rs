//! Scoped naming machinery shared by the class, method and field renamers.

mod generator;
mod reservation;
mod state;

pub(crate) use generator::{CounterKind, NameCounter, NameGenerator};
pub(crate) use reservation::{ReservationArena, ReservationId};
pub(crate) use state::{NamingArena, NamingId};

use crate::program::{Items, Program, Symbol, TypeId};

/// The member on whose behalf a name was reserved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Owner {
    pub holder: TypeId,
    pub original: Symbol,
    pub private: bool,
}

impl Owner {
    pub fn display(&self, items: &Items) -> String {
        format!("{}->{}", items.descriptor(self.holder), items.str(self.original))
    }

    /// Whether both members are visible together from some type: the holders are the same, or
    /// some type inherits from both of them.
    pub fn coexists_with(&self, other: &Owner, program: &Program) -> bool {
        self.holder == other.holder
            || (!self.private
                && !other.private
                && program.have_common_subtype(self.holder, other.holder))
    }
}
