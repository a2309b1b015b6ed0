/// Module containing the item record and submission validation
pub mod item;
/// Module containing the in-memory item store
pub mod store;
