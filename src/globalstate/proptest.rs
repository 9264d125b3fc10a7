//! Property-Based Tests for the State Escape Codec
//!
//! Systematically verifies that escape/unescape form a true inverse pair and
//! that full state records survive a write/read cycle regardless of content.

#![cfg(test)]

use proptest::prelude::*;

use super::escape::{unicode_escape, unicode_unescape};
use super::manager::GlobalStateManager;
use super::state::ScopedState;

/// Strategy biased toward the characters the format must defend against:
/// separators, escapes, control characters and non-ASCII text.
fn hostile_string(min_len: usize) -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            Just('='),
            Just('\\'),
            Just('\n'),
            Just('\r'),
            Just('\t'),
            Just('#'),
            Just(' '),
            proptest::char::any(),
        ],
        min_len..64,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_escape_unescape_roundtrip(input in hostile_string(0)) {
        let escaped = unicode_escape(&input);
        // Escaped form is single-line ASCII with no boundary whitespace
        prop_assert!(!escaped.contains('\n'));
        prop_assert!(escaped.is_ascii());
        prop_assert_eq!(escaped.trim(), escaped.as_str());
        let restored = unicode_unescape(&escaped).unwrap();
        prop_assert_eq!(restored, input);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_state_file_roundtrip(
        records in proptest::collection::btree_map(hostile_string(1), hostile_string(0), 0..16)
    ) {
        let dir = std::env::temp_dir().join(format!("meshcache-prop-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let manager = GlobalStateManager::new(&dir);
        let mut state = ScopedState::new("prop");
        for (key, value) in &records {
            state.set_property(key.clone(), value.clone());
        }
        manager.write_scoped_state(&state).unwrap();
        let read = manager.read_scoped_state("prop").unwrap().unwrap();
        prop_assert_eq!(read, state);

        std::fs::remove_dir_all(dir).unwrap();
    }
}
