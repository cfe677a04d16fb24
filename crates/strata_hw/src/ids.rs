//! ID newtypes for structural IR entities.

strata_ir::define_id! {
    /// A module in an [`HwCircuit`](crate::module::HwCircuit).
    pub struct HwModuleId;

    /// An operation within a structural body.
    pub struct HwOpId;

    /// A value within a structural body.
    pub struct HwValueId;

    /// A block of a structural body.
    pub struct HwBlockId;
}
