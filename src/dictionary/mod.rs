//! Interning dictionary for profile symbols.
//!
//! Strings, functions, locations, attributes and stacks are stored once and
//! referenced by a stable integer index. Every table reserves slot 0 for the
//! zero value so that index 0 reads as "absent". The dictionary lives for one
//! trace conversion and is rendered into a [`ProfilesDictionary`] at the end.

pub mod stack_table;

pub use stack_table::{hash_locations, StackHasher, StackTable};

use crate::parser::Frame;
use crate::pdata::{
    Function, KeyValueAndUnit, Line, Link, Location, Mapping, ProfilesDictionary, Stack,
};
use indexmap::IndexSet;
use log::error;
use rustc_hash::FxHasher;
use std::hash::{BuildHasherDefault, Hash};

type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;

/// Largest number of entries a table may hold; every index fits an `i32`
pub const TABLE_CAPACITY: usize = i32::MAX as usize;

fn to_index(i: usize) -> i32 {
    // tables never grow past TABLE_CAPACITY
    i32::try_from(i).unwrap_or(0)
}

fn with_sentinel<T: Hash + Eq + Default>() -> FxIndexSet<T> {
    let mut set = FxIndexSet::default();
    set.insert(T::default());
    set
}

/// Tracks whether a table ran out of room, so the error is logged once
#[derive(Debug, Clone, Copy)]
struct Limit {
    capacity: usize,
    reached: bool,
}

impl Limit {
    /// Whether a table of `len` entries may take one more; logs the first refusal
    fn admit(&mut self, table: &str, len: usize) -> bool {
        if len < self.capacity {
            return true;
        }
        if !self.reached {
            error!(
                "{} table is full ({} entries), new entries resolve to index 0",
                table, self.capacity
            );
            self.reached = true;
        }
        false
    }
}

fn intern<T: Hash + Eq>(
    set: &mut FxIndexSet<T>,
    limit: &mut Limit,
    table: &str,
    value: T,
) -> i32 {
    if let Some(index) = set.get_index_of(&value) {
        return to_index(index);
    }
    if !limit.admit(table, set.len()) {
        return 0;
    }
    let (index, _) = set.insert_full(value);
    to_index(index)
}

#[derive(Debug, Clone)]
pub struct Dictionary {
    strings: FxIndexSet<String>,
    functions: FxIndexSet<Function>,
    locations: FxIndexSet<Location>,
    attributes: FxIndexSet<KeyValueAndUnit>,
    stacks: StackTable,
    limit: Limit,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl Dictionary {
    pub fn new() -> Self {
        Self::with_stack_table(StackTable::new())
    }

    /// Dictionary using a custom stack table, e.g. one with a different hasher
    pub fn with_stack_table(stacks: StackTable) -> Self {
        Self {
            strings: with_sentinel(),
            functions: with_sentinel(),
            locations: with_sentinel(),
            attributes: with_sentinel(),
            stacks,
            limit: Limit {
                capacity: TABLE_CAPACITY,
                reached: false,
            },
        }
    }

    /// Cap every table at `capacity` entries (sentinel included, at most
    /// [`TABLE_CAPACITY`]). Values that no longer fit resolve to index 0.
    pub fn with_table_capacity(mut self, capacity: usize) -> Self {
        self.limit.capacity = capacity.clamp(1, TABLE_CAPACITY);
        self
    }

    /// Whether any table refused an entry for lack of room
    pub fn is_full(&self) -> bool {
        self.limit.reached
    }

    pub fn intern_string(&mut self, s: &str) -> i32 {
        if let Some(index) = self.strings.get_index_of(s) {
            return to_index(index);
        }
        intern(&mut self.strings, &mut self.limit, "string", s.to_string())
    }

    pub fn intern_function(
        &mut self,
        name: &str,
        system_name: &str,
        file: &str,
        start_line: i64,
    ) -> i32 {
        let function = Function {
            name_strindex: self.intern_string(name),
            system_name_strindex: self.intern_string(system_name),
            filename_strindex: self.intern_string(file),
            start_line,
        };
        intern(&mut self.functions, &mut self.limit, "function", function)
    }

    pub fn intern_location(&mut self, address: u64, lines: Vec<Line>) -> i32 {
        let location = Location {
            mapping_index: 0,
            address,
            lines,
        };
        intern(&mut self.locations, &mut self.limit, "location", location)
    }

    pub fn intern_attribute(&mut self, key: &str, value: &str, unit: &str) -> i32 {
        let attribute = KeyValueAndUnit {
            key_strindex: self.intern_string(key),
            value: value.to_string(),
            unit_strindex: self.intern_string(unit),
        };
        intern(&mut self.attributes, &mut self.limit, "attribute", attribute)
    }

    pub fn intern_stack(&mut self, locations: &[i32]) -> i32 {
        if let Some(index) = self.stacks.lookup(locations) {
            return to_index(index);
        }
        if !self.limit.admit("stack", self.stacks.len()) {
            return 0;
        }
        to_index(self.stacks.intern(locations))
    }

    /// Resolve a trace frame to a location index, interning its function
    pub fn intern_frame(&mut self, frame: &Frame) -> i32 {
        let function = self.intern_function(&frame.func, &frame.func, &frame.file, 0);
        let line = Line {
            function_index: function,
            line: i64::try_from(frame.line).unwrap_or(i64::MAX),
            column: 0,
        };
        self.intern_location(frame.pc, vec![line])
    }

    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Stack slots, including the empty stack at 0
    pub fn stack_count(&self) -> usize {
        self.stacks.len()
    }

    pub fn stack_collisions(&self) -> usize {
        self.stacks.collisions()
    }

    /// Render every table in index order. Mapping and link tables are not
    /// populated by traces and only carry their zero element.
    pub fn materialize(&self) -> ProfilesDictionary {
        ProfilesDictionary {
            mapping_table: vec![Mapping::default()],
            location_table: self.locations.iter().cloned().collect(),
            function_table: self.functions.iter().copied().collect(),
            link_table: vec![Link::default()],
            string_table: self.strings.iter().cloned().collect(),
            attribute_table: self.attributes.iter().cloned().collect(),
            stack_table: self
                .stacks
                .iter()
                .map(|locations| Stack {
                    location_indices: locations.to_vec(),
                })
                .collect(),
        }
    }
}
