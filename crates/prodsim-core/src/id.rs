use slotmap::new_key_type;

new_key_type! {
    /// Identifies a block (production unit) in a network arena.
    pub struct BlockId;

    /// Identifies a buffer (bounded queue between blocks) in a network arena.
    pub struct BufferId;
}
