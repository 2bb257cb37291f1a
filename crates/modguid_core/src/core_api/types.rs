use serde::{Deserialize, Serialize};

use crate::allocator::AllocationEntry;
use crate::config::CounterScope;
use crate::type_tag::TypeTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryCounts {
    pub tag: TypeTag,
    pub base: usize,
    pub custom: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OwnerSummary {
    pub owner: String,
    pub system_keys: usize,
    pub run_keys: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub base_offset: i32,
    pub counter_scope: CounterScope,
    /// Mark of the shared counter, or of the `Ability` counter when counters
    /// are per type.
    pub high_water_mark: i32,
    pub dirty: bool,
    pub system_key_count: usize,
    pub run_key_count: usize,
    pub owners: Vec<OwnerSummary>,
    pub registries: Vec<RegistryCounts>,
    pub allocations: Vec<AllocationEntry>,
}
