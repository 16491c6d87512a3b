//! Profiles document: resource -> scope -> profile -> sample, plus the
//! dictionary all profiles of the document index into.

use serde::{Deserialize, Serialize};

/// Top-level profiles document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profiles {
    pub resource_profiles: Vec<ResourceProfiles>,
    pub dictionary: ProfilesDictionary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceProfiles {
    pub schema_url: String,
    pub scope_profiles: Vec<ScopeProfiles>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeProfiles {
    pub schema_url: String,
    pub profiles: Vec<Profile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub sample_type: ValueType,
    pub samples: Vec<Sample>,

    /// Start of the profiled range, zero until finalized
    pub time_unix_nano: u64,

    /// Length of the profiled range, zero until finalized
    pub duration_nano: u64,
}

impl Profile {
    pub fn is_finalized(&self) -> bool {
        self.time_unix_nano != 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueType {
    pub type_strindex: i32,
    pub unit_strindex: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub stack_index: i32,
    pub attribute_indices: Vec<i32>,
    pub timestamps_unix_nano: Vec<u64>,
}

/// Tables shared by every profile of a document. Slot 0 of each table is a
/// zero element so that index 0 always means "absent".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilesDictionary {
    pub mapping_table: Vec<Mapping>,
    pub location_table: Vec<Location>,
    pub function_table: Vec<Function>,
    pub link_table: Vec<Link>,
    pub string_table: Vec<String>,
    pub attribute_table: Vec<KeyValueAndUnit>,
    pub stack_table: Vec<Stack>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub memory_start: u64,
    pub memory_limit: u64,
    pub file_offset: u64,
    pub filename_strindex: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub mapping_index: i32,
    pub address: u64,
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Line {
    pub function_index: i32,
    pub line: i64,
    pub column: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Function {
    pub name_strindex: i32,
    pub system_name_strindex: i32,
    pub filename_strindex: i32,
    pub start_line: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub trace_id: String,
    pub span_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyValueAndUnit {
    pub key_strindex: i32,
    pub value: String,
    pub unit_strindex: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stack {
    pub location_indices: Vec<i32>,
}

/// Per-table shift applied to indices of a document appended by a merge
#[derive(Debug, Clone, Copy)]
struct Offsets {
    mapping: i32,
    location: i32,
    function: i32,
    string: i32,
    attribute: i32,
    stack: i32,
}

fn shift(index: i32, offset: i32) -> i32 {
    if index == 0 {
        0
    } else {
        index + offset
    }
}

fn offset_of<T>(table: &[T]) -> i32 {
    i32::try_from(table.len().saturating_sub(1)).unwrap_or(i32::MAX)
}

fn append_tail<T>(dst: &mut Vec<T>, src: Vec<T>, mut remap: impl FnMut(&mut T)) {
    dst.extend(src.into_iter().skip(1).map(|mut item| {
        remap(&mut item);
        item
    }));
}

impl ProfilesDictionary {
    /// Make sure every table starts with its zero element
    pub fn ensure_sentinels(&mut self) {
        fn ensure<T: Default>(table: &mut Vec<T>) {
            if table.is_empty() {
                table.push(T::default());
            }
        }
        ensure(&mut self.mapping_table);
        ensure(&mut self.location_table);
        ensure(&mut self.function_table);
        ensure(&mut self.link_table);
        ensure(&mut self.string_table);
        ensure(&mut self.attribute_table);
        ensure(&mut self.stack_table);
    }

    /// Look up a string, empty for out-of-range indices
    pub fn string(&self, index: i32) -> &str {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.string_table.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    fn offsets(&self) -> Offsets {
        Offsets {
            mapping: offset_of(&self.mapping_table),
            location: offset_of(&self.location_table),
            function: offset_of(&self.function_table),
            string: offset_of(&self.string_table),
            attribute: offset_of(&self.attribute_table),
            stack: offset_of(&self.stack_table),
        }
    }

    fn append(&mut self, mut src: ProfilesDictionary, off: Offsets) {
        src.ensure_sentinels();
        append_tail(&mut self.mapping_table, src.mapping_table, |m| {
            m.filename_strindex = shift(m.filename_strindex, off.string);
        });
        append_tail(&mut self.location_table, src.location_table, |l| {
            l.mapping_index = shift(l.mapping_index, off.mapping);
            for line in &mut l.lines {
                line.function_index = shift(line.function_index, off.function);
            }
        });
        append_tail(&mut self.function_table, src.function_table, |f| {
            f.name_strindex = shift(f.name_strindex, off.string);
            f.system_name_strindex = shift(f.system_name_strindex, off.string);
            f.filename_strindex = shift(f.filename_strindex, off.string);
        });
        append_tail(&mut self.link_table, src.link_table, |_| {});
        append_tail(&mut self.string_table, src.string_table, |_| {});
        append_tail(&mut self.attribute_table, src.attribute_table, |a| {
            a.key_strindex = shift(a.key_strindex, off.string);
            a.unit_strindex = shift(a.unit_strindex, off.string);
        });
        append_tail(&mut self.stack_table, src.stack_table, |s| {
            for idx in &mut s.location_indices {
                *idx = shift(*idx, off.location);
            }
        });
    }
}

impl Profiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// No resource entries at all
    pub fn is_empty(&self) -> bool {
        self.resource_profiles.is_empty()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.resource_profiles
            .iter()
            .flat_map(|rp| rp.scope_profiles.iter())
            .flat_map(|sp| sp.profiles.iter())
    }

    pub fn profile_count(&self) -> usize {
        self.profiles().count()
    }

    pub fn sample_count(&self) -> usize {
        self.profiles().map(|p| p.samples.len()).sum()
    }

    /// Append `other` to this document.
    ///
    /// Tables are concatenated without deduplication; every non-zero index in
    /// the appended resources and tables is shifted past the entries already
    /// present, so both halves keep resolving to the same values.
    pub fn merge_from(&mut self, other: Profiles) {
        self.dictionary.ensure_sentinels();
        let off = self.dictionary.offsets();

        let Profiles {
            mut resource_profiles,
            dictionary,
        } = other;

        for profile in resource_profiles
            .iter_mut()
            .flat_map(|rp| rp.scope_profiles.iter_mut())
            .flat_map(|sp| sp.profiles.iter_mut())
        {
            profile.sample_type.type_strindex = shift(profile.sample_type.type_strindex, off.string);
            profile.sample_type.unit_strindex = shift(profile.sample_type.unit_strindex, off.string);
            for sample in &mut profile.samples {
                sample.stack_index = shift(sample.stack_index, off.stack);
                for idx in &mut sample.attribute_indices {
                    *idx = shift(*idx, off.attribute);
                }
            }
        }

        self.dictionary.append(dictionary, off);
        self.resource_profiles.append(&mut resource_profiles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn single_sample_doc(func: &str) -> Profiles {
        Profiles {
            resource_profiles: vec![ResourceProfiles {
                schema_url: String::new(),
                scope_profiles: vec![ScopeProfiles {
                    schema_url: String::new(),
                    profiles: vec![Profile {
                        sample_type: ValueType {
                            type_strindex: 1,
                            unit_strindex: 2,
                        },
                        samples: vec![Sample {
                            stack_index: 1,
                            attribute_indices: vec![1],
                            timestamps_unix_nano: vec![10],
                        }],
                        time_unix_nano: 5,
                        duration_nano: 10,
                    }],
                }],
            }],
            dictionary: ProfilesDictionary {
                mapping_table: vec![Mapping::default()],
                location_table: vec![
                    Location::default(),
                    Location {
                        mapping_index: 0,
                        address: 0x10,
                        lines: vec![Line {
                            function_index: 1,
                            line: 3,
                            column: 0,
                        }],
                    },
                ],
                function_table: vec![
                    Function::default(),
                    Function {
                        name_strindex: 3,
                        system_name_strindex: 3,
                        filename_strindex: 4,
                        start_line: 0,
                    },
                ],
                link_table: vec![Link::default()],
                string_table: vec![
                    String::new(),
                    "wall".to_string(),
                    "nanoseconds".to_string(),
                    func.to_string(),
                    "main.go".to_string(),
                ],
                attribute_table: vec![
                    KeyValueAndUnit::default(),
                    KeyValueAndUnit {
                        key_strindex: 1,
                        value: "1".to_string(),
                        unit_strindex: 0,
                    },
                ],
                stack_table: vec![
                    Stack::default(),
                    Stack {
                        location_indices: vec![1],
                    },
                ],
            },
        }
    }

    fn function_name_of_first_sample(doc: &Profiles, profile: &Profile) -> String {
        let dict = &doc.dictionary;
        let stack = &dict.stack_table[profile.samples[0].stack_index as usize];
        let location = &dict.location_table[stack.location_indices[0] as usize];
        let function = &dict.function_table[location.lines[0].function_index as usize];
        dict.string(function.name_strindex).to_string()
    }

    #[test]
    fn test_merge_into_empty_adopts_document() {
        let src = single_sample_doc("main.a");
        let mut dst = Profiles::new();
        dst.merge_from(src.clone());

        assert_eq!(dst, src);
    }

    #[test]
    fn test_merge_shifts_indices() {
        let mut dst = single_sample_doc("main.a");
        dst.merge_from(single_sample_doc("main.b"));

        assert_eq!(dst.profile_count(), 2);
        assert_eq!(dst.dictionary.string_table.len(), 9);
        assert_eq!(dst.dictionary.stack_table.len(), 3);

        let profiles: Vec<&Profile> = dst.profiles().collect();
        assert_eq!(function_name_of_first_sample(&dst, profiles[0]), "main.a");
        assert_eq!(function_name_of_first_sample(&dst, profiles[1]), "main.b");
        assert_eq!(dst.dictionary.string(profiles[1].sample_type.type_strindex), "wall");
        assert_eq!(profiles[1].samples[0].attribute_indices, vec![2]);
    }

    #[test]
    fn test_merge_keeps_zero_indices() {
        let mut dst = single_sample_doc("main.a");
        dst.merge_from(single_sample_doc("main.b"));

        let last = dst.dictionary.location_table.last().unwrap();
        assert_eq!(last.mapping_index, 0);
        let attr = dst.dictionary.attribute_table.last().unwrap();
        assert_eq!(attr.unit_strindex, 0);
    }

    #[test]
    fn test_ensure_sentinels() {
        let mut dict = ProfilesDictionary::default();
        dict.ensure_sentinels();
        assert_eq!(dict.mapping_table.len(), 1);
        assert_eq!(dict.link_table.len(), 1);
        assert_eq!(dict.string_table, vec![String::new()]);
    }
}
