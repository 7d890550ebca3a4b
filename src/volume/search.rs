//! Depth-first search of series metadata for chapter/volume pairs.
//!
//! Metadata is an arbitrarily nested JSON tree. The traversal uses an
//! explicit stack instead of recursion and stops descending at
//! [`MAX_SEARCH_DEPTH`], so hostile or pathological payloads cannot exhaust
//! the call stack.

use serde_json::{Map, Value};

use crate::catalog::{as_f64, as_volume, chapter_numbers_equal};

/// Deepest nesting level inspected.
pub const MAX_SEARCH_DEPTH: usize = 64;

const NUMBER_KEYS: [&str; 3] = ["number", "chapter_number", "chapter"];
const VOLUME_KEYS: [&str; 2] = ["volume", "volume_number"];

/// Volumes claimed for `number` anywhere in `root`, in document order, deduplicated.
#[must_use]
pub fn volume_candidates(root: &Value, number: f64) -> Vec<u32> {
    let mut found = Vec::new();
    let mut stack: Vec<(&Value, usize)> = vec![(root, 0)];

    while let Some((node, depth)) = stack.pop() {
        let children: Box<dyn DoubleEndedIterator<Item = &Value>> = match node {
            Value::Object(map) => {
                if let Some(volume) = matching_volume(map, number)
                    && !found.contains(&volume)
                {
                    found.push(volume);
                }
                Box::new(map.values())
            }
            Value::Array(items) => Box::new(items.iter()),
            _ => continue,
        };

        if depth >= MAX_SEARCH_DEPTH {
            continue;
        }
        // Reverse so the first child is popped first.
        for child in children.rev() {
            if child.is_object() || child.is_array() {
                stack.push((child, depth + 1));
            }
        }
    }

    found
}

fn matching_volume(map: &Map<String, Value>, number: f64) -> Option<u32> {
    let chapter = NUMBER_KEYS
        .into_iter()
        .find_map(|key| map.get(key).and_then(as_f64))?;
    if !chapter_numbers_equal(chapter, number) {
        return None;
    }
    VOLUME_KEYS
        .into_iter()
        .find_map(|key| map.get(key).and_then(as_volume))
}
