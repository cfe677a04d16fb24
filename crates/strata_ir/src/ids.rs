//! Index newtypes for the entities a circuit body stores in arenas.

/// Declares `u32` index newtypes that key an [`Arena`](crate::arena::Arena).
///
/// ```ignore
/// define_id! {
///     /// A module.
///     pub struct ModuleId;
/// }
/// ```
///
/// The IDs serialize as plain numbers, so the calling crate needs `serde`.
#[macro_export]
macro_rules! define_id {
    ($($(#[$meta:meta])* pub struct $name:ident;)+) => {$(
        $(#[$meta])*
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            /// The ID with raw value `raw`.
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            /// The raw value, as written in circuit documents.
            pub const fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl $crate::arena::ArenaId for $name {
            fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }
    )+};
}

define_id! {
    /// A module in a [`Circuit`](crate::module::Circuit).
    pub struct ModuleId;

    /// An operation of a module body.
    pub struct OpId;

    /// An SSA value of a module body.
    pub struct ValueId;

    /// The entry block of a body or a region of a `when`.
    pub struct BlockId;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaId;

    #[test]
    fn raw_and_index_agree() {
        let id = OpId::from_raw(42);
        assert_eq!(id.as_raw(), 42);
        assert_eq!(id.index(), 42);
        assert_eq!(OpId::from_index(42), id);
    }

    #[test]
    fn ids_are_plain_numbers_in_json() {
        assert_eq!(serde_json::to_string(&BlockId::from_raw(7)).unwrap(), "7");
        let back: ValueId = serde_json::from_str("3").unwrap();
        assert_eq!(back, ValueId::from_raw(3));
    }
}
