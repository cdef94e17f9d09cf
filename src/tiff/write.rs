use std::collections::{HashMap, VecDeque};

use log::{debug, trace};

use crate::cursor::{ByteWriter, Endianness};
use crate::error::{FormatError, MetadataResult};
use crate::tiff::tags::{is_known_branch, points_to_sub_ifd, DataName, Tag, Type, Value};
use crate::tiff::{Directory, DirectoryId, Tiff};

const HEADER_SIZE: usize = 8;

/// What a written entry refers to, beyond its own value.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Role {
    Plain,
    /// One placeholder offset per trunk of the branch with the entry's id.
    Branch,
    /// One placeholder offset per chunk of the named payload.
    DataPosition(DataName),
}

/// A tag exactly as it is going to be written.
#[derive(Debug, Clone)]
struct Entry {
    id: u16,
    value: Value,
    role: Role,
}

impl Entry {
    fn size(&self) -> usize {
        self.value.byte_size()
    }

    fn out_of_line(&self) -> bool {
        self.size() > 4
    }
}

/// A trunk to write; `None` stands for a directory without entries.
type PlannedTrunk = Vec<Option<DirectoryId>>;

/// The reachable part of the tree, with every directory's final entries.
///
/// Both the size pass and the write pass read from the same plan, so they cannot disagree about
/// which tags survive.
#[derive(Debug, Default)]
struct Plan {
    trunks: Vec<PlannedTrunk>,
    entries: HashMap<DirectoryId, Vec<Entry>>,
}

impl Plan {
    fn entries_of(&self, dir: Option<DirectoryId>) -> &[Entry] {
        dir.and_then(|id| self.entries.get(&id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// A 4-byte slot to overwrite once its value is known.
#[derive(Debug, Clone, Copy)]
struct Patch {
    site: usize,
    value: u32,
}

fn padded(size: usize) -> usize {
    size + size % 2
}

fn pointer_type(id: u16, existing: Option<&Tag>) -> MetadataResult<Type> {
    match existing.map(Tag::field_type) {
        Some(field_type @ (Type::LONG | Type::IFD)) => Ok(field_type),
        Some(other) => Err(FormatError::InvalidSubIfdType(id, other).into()),
        None if is_known_branch(id) => Ok(Type::LONG),
        None => Ok(Type::IFD),
    }
}

/// Compute the entries of one directory.
///
/// Structural tags are rebuilt from the directory's branches and named data: pointer tags get
/// one element per sub-trunk, data pairs become `LONG` lists with one element per chunk. Pointer
/// and pair tags with nothing to point to are dropped.
fn prepare(dir: &Directory) -> MetadataResult<Vec<Entry>> {
    let mut entries = Vec::with_capacity(dir.tags.len());
    for tag in &dir.tags {
        if dir.tags.iter().filter(|other| other.id == tag.id).count() > 1 {
            return Err(FormatError::DuplicateTag(tag.id).into());
        }
        if dir.branches.contains_key(&tag.id) || points_to_sub_ifd(tag.id, tag.field_type())? {
            continue;
        }
        if DataName::from_tag_id(tag.id).is_some() {
            continue;
        }
        if let Value::Ascii(s) = &tag.value {
            Value::ascii_bytes(s)?;
        }
        entries.push(Entry {
            id: tag.id,
            value: tag.value.clone(),
            role: Role::Plain,
        });
    }

    for (id, trunks) in dir.branches.iter().filter(|(_, trunks)| !trunks.is_empty()) {
        let existing = dir.tags.iter().find(|tag| tag.id == *id);
        entries.push(Entry {
            id: *id,
            value: Value::zeroed(pointer_type(*id, existing)?, trunks.len()),
            role: Role::Branch,
        });
    }

    for (name, chunks) in dir.data.iter().filter(|(_, chunks)| !chunks.is_empty()) {
        let lengths = chunks
            .iter()
            .map(|chunk| u32::try_from(chunk.len()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.push(Entry {
            id: name.position_id(),
            value: Value::longs(vec![0; chunks.len()]),
            role: Role::DataPosition(*name),
        });
        entries.push(Entry {
            id: name.length_id(),
            value: Value::longs(lengths),
            role: Role::Plain,
        });
    }

    entries.sort_by_key(|entry| entry.id);
    if let Some(pair) = entries.windows(2).find(|pair| pair[0].id == pair[1].id) {
        return Err(FormatError::DuplicateTag(pair[0].id).into());
    }
    Ok(entries)
}

fn encode_value(writer: &mut ByteWriter, value: &Value) -> MetadataResult<()> {
    match value {
        Value::Byte(x) | Value::Undefined(x) => writer.write_u8(*x)?,
        Value::ByteList(v) | Value::UndefinedList(v) => writer.write(v)?,
        Value::Ascii(s) => {
            writer.write(&Value::ascii_bytes(s)?)?;
            writer.write_u8(0)?;
        }
        Value::SignedByte(x) => writer.write_i8(*x)?,
        Value::SignedByteList(v) => v.iter().try_for_each(|x| writer.write_i8(*x))?,
        Value::Short(x) => writer.write_u16(*x)?,
        Value::ShortList(v) => v.iter().try_for_each(|x| writer.write_u16(*x))?,
        Value::SignedShort(x) => writer.write_i16(*x)?,
        Value::SignedShortList(v) => v.iter().try_for_each(|x| writer.write_i16(*x))?,
        Value::Long(x) | Value::Ifd(x) => writer.write_u32(*x)?,
        Value::LongList(v) | Value::IfdList(v) => v.iter().try_for_each(|x| writer.write_u32(*x))?,
        Value::SignedLong(x) => writer.write_i32(*x)?,
        Value::SignedLongList(v) => v.iter().try_for_each(|x| writer.write_i32(*x))?,
        Value::Float(x) => writer.write_f32(*x)?,
        Value::FloatList(v) => v.iter().try_for_each(|x| writer.write_f32(*x))?,
        Value::Double(x) => writer.write_f64(*x)?,
        Value::DoubleList(v) => v.iter().try_for_each(|x| writer.write_f64(*x))?,
        Value::Rational(v) => v.iter().try_for_each(|[n, d]| {
            writer.write_u32(*n)?;
            writer.write_u32(*d)
        })?,
        Value::SignedRational(v) => v.iter().try_for_each(|[n, d]| {
            writer.write_i32(*n)?;
            writer.write_i32(*d)
        })?,
    }
    Ok(())
}

/// A writer with two independent positions over one buffer: directory entries grow from the
/// front, out-of-line values and payload chunks from the end of the layout region.
struct TreeWriter {
    out: ByteWriter,
    layout: usize,
    payload: usize,
    patches: Vec<Patch>,
}

impl TreeWriter {
    fn layout_u16(&mut self, value: u16) -> MetadataResult<()> {
        self.out.seek(self.layout);
        self.out.write_u16(value)?;
        self.layout = self.out.position();
        Ok(())
    }

    fn layout_u32(&mut self, value: u32) -> MetadataResult<()> {
        self.out.seek(self.layout);
        self.out.write_u32(value)?;
        self.layout = self.out.position();
        Ok(())
    }

    /// Append bytes to the payload region, padded to an even length. Returns their offset.
    fn payload_bytes(&mut self, bytes: &[u8]) -> MetadataResult<usize> {
        let start = self.payload;
        self.out.seek(start);
        self.out.write(bytes)?;
        self.payload = start + padded(bytes.len());
        Ok(start)
    }

    /// Write one entry, returning the positions of its 4-byte elements when it has a role.
    fn entry(&mut self, entry: &Entry) -> MetadataResult<Vec<usize>> {
        let field_type = entry.value.field_type();
        self.layout_u16(entry.id)?;
        self.layout_u16(field_type.into())?;
        self.layout_u32(u32::try_from(entry.value.count())?)?;

        let target = if entry.out_of_line() {
            let target = self.payload;
            self.layout_u32(u32::try_from(target)?)?;
            self.payload = target + padded(entry.size());
            target
        } else {
            let slot = self.layout;
            self.layout += 4;
            slot
        };
        self.out.seek(target);
        encode_value(&mut self.out, &entry.value)?;
        trace!("entry {} {:?} at {}", entry.id, field_type, target);

        Ok(match entry.role {
            Role::Plain => vec![],
            Role::Branch | Role::DataPosition(_) => {
                (0..entry.value.count()).map(|k| target + 4 * k).collect()
            }
        })
    }
}

impl Tiff {
    fn plan(&self) -> MetadataResult<Plan> {
        let mut plan = Plan::default();
        let mut queue = VecDeque::from([&self.root]);
        while let Some(trunk) = queue.pop_front() {
            if trunk.0.is_empty() {
                plan.trunks.push(vec![None]);
                continue;
            }
            for id in &trunk.0 {
                let dir = &self.directories[*id];
                let entries = prepare(dir)?;
                for entry in entries.iter().filter(|entry| entry.role == Role::Branch) {
                    queue.extend(dir.branches.get(&entry.id).into_iter().flatten());
                }
                plan.entries.insert(*id, entries);
            }
            plan.trunks.push(trunk.0.iter().copied().map(Some).collect());
        }
        Ok(plan)
    }

    /// Serialize the tree using the byte order it was parsed with.
    pub fn to_bytes(&self) -> MetadataResult<Vec<u8>> {
        self.to_bytes_with(self.endianness)
    }

    /// Serialize the tree using the given byte order.
    ///
    /// All offsets, counts and lengths are recomputed; directories are laid out trunk by trunk
    /// at the front of the output, followed by every out-of-line value and payload chunk.
    pub fn to_bytes_with(&self, endianness: Endianness) -> MetadataResult<Vec<u8>> {
        let plan = self.plan()?;

        // size pass
        let mut layout_size = HEADER_SIZE;
        let mut payload_size = 0;
        for dir in plan.trunks.iter().flatten().copied() {
            let entries = plan.entries_of(dir);
            layout_size += 2 + 12 * entries.len() + 4;
            for entry in entries.iter().filter(|entry| entry.out_of_line()) {
                payload_size += padded(entry.size());
            }
            for entry in entries {
                if let (Role::DataPosition(name), Some(id)) = (entry.role, dir) {
                    let chunks = self.directories[id].data.get(&name).into_iter().flatten();
                    payload_size += chunks.map(|chunk| padded(chunk.len())).sum::<usize>();
                }
            }
        }
        assert!(layout_size % 2 == 0 && payload_size % 2 == 0);

        // write pass
        let mut writer = TreeWriter {
            out: ByteWriter::new(layout_size + payload_size, endianness),
            layout: 0,
            payload: layout_size,
            patches: vec![],
        };
        writer.out.write(match endianness {
            Endianness::LittleEndian => b"II",
            Endianness::BigEndian => b"MM",
        })?;
        writer.layout = 2;
        writer.layout_u16(42)?;
        writer.layout_u32(HEADER_SIZE as u32)?;

        let mut branch_sites = VecDeque::new();
        for (t, trunk) in plan.trunks.iter().enumerate() {
            if t > 0 {
                if let Some(site) = branch_sites.pop_front() {
                    writer.patches.push(Patch {
                        site,
                        value: u32::try_from(writer.layout)?,
                    });
                }
            }
            for (i, dir) in trunk.iter().copied().enumerate() {
                let entries = plan.entries_of(dir);
                writer.layout_u16(u16::try_from(entries.len())?)?;
                let mut data_sites = vec![];
                for entry in entries {
                    let sites = writer.entry(entry)?;
                    match entry.role {
                        Role::Plain => {}
                        Role::Branch => branch_sites.extend(sites),
                        Role::DataPosition(name) => data_sites.push((name, sites)),
                    }
                }
                let next = if i + 1 < trunk.len() {
                    u32::try_from(writer.layout + 4)?
                } else {
                    0
                };
                writer.layout_u32(next)?;

                if let Some(id) = dir {
                    for (name, sites) in data_sites {
                        let chunks = self.directories[id].data.get(&name).into_iter().flatten();
                        for (site, chunk) in sites.into_iter().zip(chunks) {
                            let offset = writer.payload_bytes(chunk)?;
                            writer.patches.push(Patch {
                                site,
                                value: u32::try_from(offset)?,
                            });
                        }
                    }
                }
            }
        }
        assert_eq!(writer.layout, layout_size);
        assert_eq!(writer.payload, layout_size + payload_size);

        for patch in &writer.patches {
            writer.out.seek(patch.site);
            writer.out.write_u32(patch.value)?;
        }
        debug!(
            "wrote {} directories in {} bytes",
            plan.trunks.iter().map(Vec::len).sum::<usize>(),
            layout_size + payload_size
        );
        Ok(writer.out.into_inner())
    }
}
