/// One unit of backlog work handed to an execution unit.
///
/// Applying the same item twice must leave the same end state as applying it
/// once; the dispatcher may deliver an item more than once across runs.
pub trait WorkItem: Send + Sync + 'static {
    /// Returns a key that stays stable across runs.
    fn item_key(&self) -> String;
}
