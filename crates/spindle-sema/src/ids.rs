// ids.rs
//
// Arena handles. Each is a u32 index into the owning per-file arena.

macro_rules! define_id {
    ($(#[$meta:meta])* $vis:vis struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis struct $name(u32);

        impl $name {
            pub fn new(index: u32) -> Self {
                Self(index)
            }

            pub fn index(self) -> u32 {
                self.0
            }

            pub(crate) fn slot(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_id! {
    /// A scope in a [`ScopeTree`](crate::scope::ScopeTree)
    pub struct ScopeId;
}

define_id! {
    /// A struct or interface template, or one of its manifestations
    pub struct StructId;
}

define_id! {
    /// A declared function or method (generic or not)
    pub struct FunctionId;
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}
