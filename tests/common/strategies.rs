use proptest::prelude::*;

/// Strategy for run identifiers as issued by the orchestrator
pub fn run_id_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9]{8}-[a-z0-9]{4}"
}

/// Strategy for step keys, including mapped keys like `load[3]`
pub fn step_key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z_][a-z0-9_]{0,20}",
        ("[a-z_][a-z0-9_]{0,20}", 0u32..100).prop_map(|(name, index)| format!("{name}[{index}]")),
        ("[a-z_]{1,10}", "[a-z]{1,5}").prop_map(|(name, key)| format!("{name}[{key}]")),
    ]
}

/// Strategy for artifact file names
pub fn file_name_strategy() -> impl Strategy<Value = String> {
    "[a-z_]{1,12}\\.(json|zip|bin|jsonl)"
}

/// Strategy for a log length and a starting offset within it
pub fn log_and_offset_strategy() -> impl Strategy<Value = (usize, usize)> {
    (0usize..25).prop_flat_map(|len| (Just(len), 0..=len))
}

/// Strategy for the points at which a growing log is observed
pub fn growth_points_strategy() -> impl Strategy<Value = (usize, Vec<usize>)> {
    (1usize..20).prop_flat_map(|len| (Just(len), prop::collection::vec(0..=len, 1..6)))
}
