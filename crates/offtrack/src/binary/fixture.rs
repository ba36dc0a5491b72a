//! Test fixtures: tiny ELF images carrying a synthetic DWARF tree

use gimli::write::{AttributeValue, Dwarf, EndianVec, Expression, LineProgram, Sections, Unit};
use object::write::Object;
use object::{Architecture, BinaryFormat, Endianness, SectionKind};

#[derive(Debug, Clone, Default)]
struct FixtureStruct {
    namespace: Option<String>,
    name: String,
    members: Vec<(String, u64)>,
    declaration: bool,
}

/// Builder for an ELF file with one or more compile units of structure types
#[derive(Debug, Clone)]
pub struct FixtureBuilder {
    units: Vec<Vec<FixtureStruct>>,
    expression_locations: bool,
}

impl Default for FixtureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self {
            units: vec![Vec::new()],
            expression_locations: false,
        }
    }

    /// Add a structure to the current compile unit
    pub fn structure(self, name: &str, members: &[(&str, u64)]) -> Self {
        self.push(FixtureStruct {
            name: name.to_string(),
            members: owned(members),
            ..Default::default()
        })
    }

    /// Add a structure nested in a namespace
    pub fn namespaced(self, namespace: &str, name: &str, members: &[(&str, u64)]) -> Self {
        self.push(FixtureStruct {
            namespace: Some(namespace.to_string()),
            name: name.to_string(),
            members: owned(members),
            ..Default::default()
        })
    }

    /// Add a member-less forward declaration
    pub fn declaration(self, name: &str) -> Self {
        self.push(FixtureStruct {
            name: name.to_string(),
            declaration: true,
            ..Default::default()
        })
    }

    /// Start a new compile unit
    pub fn next_unit(mut self) -> Self {
        self.units.push(Vec::new());
        self
    }

    /// Encode member locations as `DW_OP_plus_uconst` expressions (DWARF 2 style)
    pub fn expression_locations(mut self) -> Self {
        self.expression_locations = true;
        self
    }

    fn push(mut self, s: FixtureStruct) -> Self {
        if let Some(unit) = self.units.last_mut() {
            unit.push(s);
        }
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let encoding = gimli::Encoding {
            format: gimli::Format::Dwarf32,
            version: 4,
            address_size: 8,
        };

        let mut dwarf = Dwarf::new();
        for (idx, structs) in self.units.iter().enumerate() {
            let unit_id = dwarf.units.add(Unit::new(encoding, LineProgram::none()));
            let unit = dwarf.units.get_mut(unit_id);
            let root = unit.root();
            unit.get_mut(root).set(
                gimli::DW_AT_name,
                AttributeValue::String(format!("unit{idx}.go").into_bytes()),
            );

            for s in structs {
                let parent = match &s.namespace {
                    Some(ns) => {
                        let id = unit.add(root, gimli::DW_TAG_namespace);
                        unit.get_mut(id)
                            .set(gimli::DW_AT_name, AttributeValue::String(ns.clone().into_bytes()));
                        id
                    }
                    None => root,
                };

                let struct_id = unit.add(parent, gimli::DW_TAG_structure_type);
                let die = unit.get_mut(struct_id);
                die.set(gimli::DW_AT_name, AttributeValue::String(s.name.clone().into_bytes()));
                if s.declaration {
                    die.set(gimli::DW_AT_declaration, AttributeValue::Flag(true));
                }

                for (member, offset) in &s.members {
                    let member_id = unit.add(struct_id, gimli::DW_TAG_member);
                    let die = unit.get_mut(member_id);
                    die.set(gimli::DW_AT_name, AttributeValue::String(member.clone().into_bytes()));
                    let location = if self.expression_locations {
                        let mut expr = Expression::new();
                        expr.op_plus_uconst(*offset);
                        AttributeValue::Exprloc(expr)
                    } else {
                        AttributeValue::Udata(*offset)
                    };
                    die.set(gimli::DW_AT_data_member_location, location);
                }
            }
        }

        let mut sections = Sections::new(EndianVec::new(gimli::LittleEndian));
        dwarf.write(&mut sections).expect("write DWARF");

        let mut obj = new_elf();
        sections
            .for_each(|id, data| -> Result<(), std::convert::Infallible> {
                if !data.slice().is_empty() {
                    let section =
                        obj.add_section(Vec::new(), id.name().as_bytes().to_vec(), SectionKind::Debug);
                    obj.append_section_data(section, data.slice(), 1);
                }
                Ok(())
            })
            .expect("collect sections");
        obj.write().expect("write ELF")
    }
}

/// An ELF with code but no debug sections
pub fn elf_without_debug_info() -> Vec<u8> {
    let mut obj = new_elf();
    let text = obj.add_section(Vec::new(), b".text".to_vec(), SectionKind::Text);
    obj.append_section_data(text, &[0xc3], 1);
    obj.write().expect("write ELF")
}

fn new_elf() -> Object<'static> {
    Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little)
}

fn owned(members: &[(&str, u64)]) -> Vec<(String, u64)> {
    members.iter().map(|(n, o)| (n.to_string(), *o)).collect()
}
