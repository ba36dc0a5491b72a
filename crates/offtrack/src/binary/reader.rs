//! DWARF walker resolving structure members to byte offsets

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::io::Read;

use gimli::{AttributeValue, EndianSlice, RunTimeEndian};
use object::{Object, ObjectSection};
use tracing::debug;

use super::{FieldQuery, ResolvedOffset};
use crate::error::{Error, Result};
use crate::version::Version;

type Slice<'a> = EndianSlice<'a, RunTimeEndian>;
type Dwarf<'a> = gimli::Dwarf<Slice<'a>>;
type Unit<'a> = gimli::Unit<Slice<'a>>;

/// Scope name used for anonymous namespaces and types
const ANONYMOUS: &str = "(anonymous)";

/// Result of resolving one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    Resolved(ResolvedOffset),
    NotFound(FieldQuery),
}

/// Outcome of analyzing one executable
#[derive(Debug, Clone)]
pub struct Analysis {
    pub version: Version,
    /// One entry per query admitted by its version bounds, in query order
    pub outcomes: Vec<FieldOutcome>,
}

impl Analysis {
    pub fn resolved(&self) -> impl Iterator<Item = &ResolvedOffset> {
        self.outcomes.iter().filter_map(|o| match o {
            FieldOutcome::Resolved(r) => Some(r),
            FieldOutcome::NotFound(_) => None,
        })
    }

    pub fn missing(&self) -> impl Iterator<Item = &FieldQuery> {
        self.outcomes.iter().filter_map(|o| match o {
            FieldOutcome::Resolved(_) => None,
            FieldOutcome::NotFound(q) => Some(q),
        })
    }

    pub fn is_complete(&self) -> bool {
        self.missing().next().is_none()
    }

    /// The first unresolved query as a [`Error::FieldNotFound`]
    pub fn missing_error(&self) -> Option<Error> {
        self.missing().next().map(|q| Error::FieldNotFound {
            structure: q.structure.clone(),
            field: q.field.clone(),
        })
    }

    pub fn into_resolved(self) -> Vec<ResolvedOffset> {
        self.outcomes
            .into_iter()
            .filter_map(|o| match o {
                FieldOutcome::Resolved(r) => Some(r),
                FieldOutcome::NotFound(_) => None,
            })
            .collect()
    }
}

/// Resolve `queries` against an executable read from `executable`.
///
/// Queries whose version bounds exclude `version` are skipped. Container and
/// debug-info failures abort the whole analysis; a structure or member that
/// cannot be located only yields a [`FieldOutcome::NotFound`].
pub fn find_offsets<R: Read>(
    mut executable: R,
    version: &Version,
    queries: &[FieldQuery],
) -> Result<Analysis> {
    let mut data = Vec::new();
    executable.read_to_end(&mut data)?;
    find_offsets_in_bytes(&data, version, queries)
}

/// Same as [`find_offsets`] over an in-memory image
pub fn find_offsets_in_bytes(
    data: &[u8],
    version: &Version,
    queries: &[FieldQuery],
) -> Result<Analysis> {
    let object =
        object::File::parse(data).map_err(|e| Error::UnparseableContainer(e.to_string()))?;

    let sections = load_sections(&object)?;
    let endian = if object.is_little_endian() {
        RunTimeEndian::Little
    } else {
        RunTimeEndian::Big
    };
    let dwarf = sections.borrow(|section| EndianSlice::new(section, endian));

    let applicable: Vec<&FieldQuery> = queries
        .iter()
        .filter(|q| {
            let applies = q.applies_to(version);
            if !applies {
                debug!("Skipping {} for version {}", q, version);
            }
            applies
        })
        .collect();

    let mut search = Search::new(&applicable);
    let mut units = dwarf.units();
    while !search.is_done() {
        let Some(header) = units.next()? else {
            break;
        };
        let unit = dwarf.unit(header)?;
        let mut tree = unit.entries_tree(None)?;
        let root = tree.root()?;
        let mut scope = Vec::new();
        walk(&dwarf, &unit, root, &mut scope, &mut search)?;
    }

    let outcomes = applicable
        .into_iter()
        .map(|q| match search.found.get(&(q.structure.as_str(), q.field.as_str())) {
            Some(&offset) => FieldOutcome::Resolved(ResolvedOffset {
                query: q.clone(),
                offset,
            }),
            None => FieldOutcome::NotFound(q.clone()),
        })
        .collect();

    Ok(Analysis {
        version: version.clone(),
        outcomes,
    })
}

fn load_sections<'a>(object: &object::File<'a>) -> Result<gimli::Dwarf<Cow<'a, [u8]>>> {
    match object.section_by_name(".debug_info") {
        Some(section) if section.size() > 0 => {}
        _ => return Err(Error::MissingDebugInfo),
    }

    let load_section = |id: gimli::SectionId| -> Result<Cow<'a, [u8]>> {
        match object.section_by_name(id.name()) {
            Some(section) => section
                .uncompressed_data()
                .map_err(|e| Error::UnparseableContainer(format!("{}: {}", id.name(), e))),
            None => Ok(Cow::Borrowed(&[][..])),
        }
    };

    gimli::Dwarf::load(load_section)
}

/// Pending (structure, field) pairs and what has been found so far
struct Search<'q> {
    wanted: HashMap<&'q str, HashSet<&'q str>>,
    found: HashMap<(&'q str, &'q str), u64>,
    remaining: usize,
}

impl<'q> Search<'q> {
    fn new(queries: &[&'q FieldQuery]) -> Self {
        let mut wanted: HashMap<&'q str, HashSet<&'q str>> = HashMap::new();
        for q in queries {
            wanted
                .entry(q.structure.as_str())
                .or_default()
                .insert(q.field.as_str());
        }
        let remaining = wanted.values().map(HashSet::len).sum();
        Self {
            wanted,
            found: HashMap::new(),
            remaining,
        }
    }

    fn is_done(&self) -> bool {
        self.remaining == 0
    }

    /// Match a type name, either as written or qualified by its enclosing scopes
    fn match_structure(&self, scope: &[String], name: &str) -> Option<&'q str> {
        if let Some((key, _)) = self.wanted.get_key_value(name) {
            return Some(*key);
        }
        if scope.is_empty() {
            return None;
        }
        let qualified = format!("{}::{}", scope.join("::"), name);
        self.wanted.get_key_value(qualified.as_str()).map(|(key, _)| *key)
    }

    fn record(&mut self, structure: &'q str, field: &str, offset: u64) {
        let Some(field) = self
            .wanted
            .get(structure)
            .and_then(|fields| fields.get(field))
            .copied()
        else {
            return;
        };
        // First occurrence wins; other compile units are assumed to agree
        if !self.found.contains_key(&(structure, field)) {
            self.found.insert((structure, field), offset);
            self.remaining -= 1;
        }
    }
}

fn walk<'q>(
    dwarf: &Dwarf<'_>,
    unit: &Unit<'_>,
    node: gimli::EntriesTreeNode<'_, '_, '_, Slice<'_>>,
    scope: &mut Vec<String>,
    search: &mut Search<'q>,
) -> Result<()> {
    let entry = node.entry();
    let tag = entry.tag();
    let opens_scope = matches!(
        tag,
        gimli::DW_TAG_namespace
            | gimli::DW_TAG_structure_type
            | gimli::DW_TAG_class_type
            | gimli::DW_TAG_union_type
    );

    let mut target = None;
    let mut scope_name = None;
    if opens_scope {
        let name = entry_name(dwarf, unit, entry)?;
        let is_declaration = matches!(
            entry.attr_value(gimli::DW_AT_declaration)?,
            Some(AttributeValue::Flag(true))
        );
        if tag != gimli::DW_TAG_namespace && !is_declaration {
            target = name.as_deref().and_then(|n| search.match_structure(scope, n));
        }
        scope_name = Some(name.unwrap_or_else(|| ANONYMOUS.to_string()));
    }

    if let Some(name) = scope_name {
        scope.push(name);
    }

    let mut children = node.children();
    while let Some(child) = children.next()? {
        let child_entry = child.entry();
        if child_entry.tag() == gimli::DW_TAG_member {
            if let Some(structure) = target {
                record_member(dwarf, unit, child_entry, structure, search)?;
            }
            continue;
        }
        walk(dwarf, unit, child, scope, search)?;
    }

    if opens_scope {
        scope.pop();
    }
    Ok(())
}

fn record_member<'q>(
    dwarf: &Dwarf<'_>,
    unit: &Unit<'_>,
    entry: &gimli::DebuggingInformationEntry<'_, '_, Slice<'_>>,
    structure: &'q str,
    search: &mut Search<'q>,
) -> Result<()> {
    let Some(name) = entry_name(dwarf, unit, entry)? else {
        return Ok(());
    };
    match member_offset(unit, entry)? {
        Some(offset) => search.record(structure, &name, offset),
        None => debug!("{}.{} has a non-constant location, ignoring", structure, name),
    }
    Ok(())
}

fn entry_name(
    dwarf: &Dwarf<'_>,
    unit: &Unit<'_>,
    entry: &gimli::DebuggingInformationEntry<'_, '_, Slice<'_>>,
) -> Result<Option<String>> {
    match entry.attr_value(gimli::DW_AT_name)? {
        Some(value) => {
            let name = dwarf.attr_string(unit, value)?;
            Ok(Some(name.to_string_lossy().into_owned()))
        }
        None => Ok(None),
    }
}

/// Byte offset of a member from `DW_AT_data_member_location`.
///
/// Members without a location (union members) sit at offset 0.
fn member_offset(
    unit: &Unit<'_>,
    entry: &gimli::DebuggingInformationEntry<'_, '_, Slice<'_>>,
) -> Result<Option<u64>> {
    match entry.attr_value(gimli::DW_AT_data_member_location)? {
        None => Ok(Some(0)),
        Some(AttributeValue::Exprloc(expr)) => {
            let mut ops = expr.operations(unit.encoding());
            match ops.next()? {
                Some(gimli::Operation::PlusConstant { value }) => Ok(Some(value)),
                _ => Ok(None),
            }
        }
        Some(value) => Ok(value.udata_value()),
    }
}
