// Cache storage — quota-bound partitions, LRU eviction, and the versioned
// partition registry.

pub mod eviction;
pub mod partition;
pub mod registry;
