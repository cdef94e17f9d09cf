//! The TIFF tag tree, as embedded in EXIF segments.
//!
//! A [`Tiff`] holds every directory it reaches from the header in an arena. Directories are
//! chained into trunks, and pointer tags such as the EXIF or GPS pointers open branches holding
//! further trunks. All reads and edits address directories through a [`TiffPath`].
//!
//! ```
//! use bytes::Bytes;
//! use jpeg_tiff_meta::tiff::{DataName, Tag, Tiff, Value};
//!
//! let mut tiff = Tiff::new();
//! tiff.set_tag("/ifd[0]", Tag::new(0x010E, Value::Ascii("test".into())))
//!     .unwrap();
//! tiff.set_data("/ifd[1]", DataName::JpegInterchangeFormat, vec![Bytes::from_static(&[0xff, 0xd8])])
//!     .unwrap();
//!
//! let parsed = Tiff::from_bytes(&tiff.to_bytes().unwrap()).unwrap();
//! let tag = parsed.tag("/ifd[0]", 0x010E).unwrap().unwrap();
//! assert_eq!(tag.value.as_str(), Some("test"));
//! ```

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::cursor::Endianness;
use crate::error::MetadataResult;

mod parse;
mod path;
pub mod tags;
mod write;

pub use path::{Hop, TiffPath};
pub use tags::{DataName, Tag, Type, Value};

pub(crate) type DirectoryId = usize;

/// An ordered chain of directories.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Trunk(pub(crate) Vec<DirectoryId>);

/// One image file directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Directory {
    pub(crate) tags: Vec<Tag>,
    pub(crate) branches: BTreeMap<u16, Vec<Trunk>>,
    pub(crate) data: BTreeMap<DataName, Vec<Bytes>>,
}

/// A parsed, editable TIFF tag tree.
#[derive(Debug, Clone, Default)]
pub struct Tiff {
    endianness: Endianness,
    directories: Vec<Directory>,
    root: Trunk,
}

impl Tiff {
    /// An empty tree with little endian byte order.
    pub fn new() -> Self {
        Self::default()
    }

    /// The byte order read from the header, used by default when serializing.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    fn allocate(&mut self) -> DirectoryId {
        self.directories.push(Directory::default());
        self.directories.len() - 1
    }

    /// Append empty directories to the trunk at `location` until `index` exists, then return it.
    fn grow(&mut self, location: Option<(DirectoryId, u16, usize)>, index: usize) -> DirectoryId {
        let len = match location {
            None => self.root.0.len(),
            Some((owner, branch, trunk)) => self.directories[owner].branches[&branch][trunk].0.len(),
        };
        let added = (len..=index).map(|_| self.allocate()).collect::<Vec<_>>();
        let trunk = match location {
            None => &mut self.root,
            Some((owner, branch, trunk)) => {
                let trunks = self.directories[owner].branches.entry(branch).or_default();
                &mut trunks[trunk]
            }
        };
        trunk.0.extend(added);
        trunk.0[index]
    }

    pub(crate) fn resolve(&self, path: &TiffPath) -> Option<DirectoryId> {
        let mut id = *self.root.0.get(path.root)?;
        for hop in &path.hops {
            let trunk = self.directories[id].branches.get(&hop.branch)?.get(hop.trunk)?;
            id = *trunk.0.get(hop.directory)?;
        }
        Some(id)
    }

    /// Resolve a path, creating every missing directory, branch and trunk along the way.
    ///
    /// Existing directories are never touched, so tags already in the tree stay where they are.
    pub(crate) fn resolve_or_create(&mut self, path: &TiffPath) -> DirectoryId {
        let mut id = self.grow(None, path.root);
        for hop in &path.hops {
            let trunks = self.directories[id].branches.entry(hop.branch).or_default();
            if trunks.len() <= hop.trunk {
                trunks.resize_with(hop.trunk + 1, Trunk::default);
            }
            id = self.grow(Some((id, hop.branch, hop.trunk)), hop.directory);
        }
        id
    }

    fn directory(&self, path: &str) -> MetadataResult<Option<&Directory>> {
        let path = path.parse::<TiffPath>()?;
        Ok(self.resolve(&path).map(|id| &self.directories[id]))
    }

    fn directory_mut(&mut self, path: &str) -> MetadataResult<Option<&mut Directory>> {
        let path = path.parse::<TiffPath>()?;
        Ok(self.resolve(&path).map(|id| &mut self.directories[id]))
    }

    fn directory_or_create(&mut self, path: &str) -> MetadataResult<&mut Directory> {
        let path = path.parse::<TiffPath>()?;
        let id = self.resolve_or_create(&path);
        Ok(&mut self.directories[id])
    }

    /// All tags of the directory at `path`, or `None` if the path does not resolve.
    pub fn tags(&self, path: &str) -> MetadataResult<Option<&[Tag]>> {
        Ok(self.directory(path)?.map(|dir| dir.tags.as_slice()))
    }

    /// The tag with the given id in the directory at `path`.
    pub fn tag(&self, path: &str, id: u16) -> MetadataResult<Option<&Tag>> {
        Ok(self
            .directory(path)?
            .and_then(|dir| dir.tags.iter().find(|tag| tag.id == id)))
    }

    /// Remove every tag with the given id from the directory at `path`, returning the first.
    ///
    /// Removing a pointer tag also removes the branch it points to, and removing either tag of
    /// a data pair removes the named data.
    pub fn remove_tag(&mut self, path: &str, id: u16) -> MetadataResult<Option<Tag>> {
        let Some(dir) = self.directory_mut(path)? else {
            return Ok(None);
        };
        let removed = dir.tags.iter().position(|tag| tag.id == id).map(|i| dir.tags[i].clone());
        dir.tags.retain(|tag| tag.id != id);
        dir.branches.remove(&id);
        if let Some(name) = DataName::from_tag_id(id) {
            if dir.data.remove(&name).is_some() {
                dir.tags
                    .retain(|tag| tag.id != name.position_id() && tag.id != name.length_id());
            }
        }
        Ok(removed)
    }

    /// Store a tag in the directory at `path`, creating the path if needed.
    ///
    /// Any tag with the same id is replaced.
    pub fn set_tag(&mut self, path: &str, tag: Tag) -> MetadataResult<()> {
        let dir = self.directory_or_create(path)?;
        dir.tags.retain(|existing| existing.id != tag.id);
        dir.tags.push(tag);
        Ok(())
    }

    /// Remove a whole branch from the directory at `path`, returning whether it existed.
    ///
    /// The pointer tag stays in the directory and is dropped when the tree is serialized.
    pub fn remove_branch(&mut self, path: &str, branch: u16) -> MetadataResult<bool> {
        Ok(self
            .directory_mut(path)?
            .is_some_and(|dir| dir.branches.remove(&branch).is_some()))
    }

    /// The number of trunks in a branch of the directory at `path`.
    pub fn branch_len(&self, path: &str, branch: u16) -> MetadataResult<Option<usize>> {
        Ok(self
            .directory(path)?
            .and_then(|dir| dir.branches.get(&branch))
            .map(Vec::len))
    }

    /// The chunks of a named payload in the directory at `path`.
    pub fn data(&self, path: &str, name: DataName) -> MetadataResult<Option<&[Bytes]>> {
        Ok(self
            .directory(path)?
            .and_then(|dir| dir.data.get(&name))
            .map(Vec::as_slice))
    }

    /// Store a named payload in the directory at `path`, creating the path if needed.
    ///
    /// The position and length tags of the pair are replaced by `LONG` placeholders with one
    /// element per chunk; their values are computed when the tree is serialized.
    pub fn set_data(&mut self, path: &str, name: DataName, chunks: Vec<Bytes>) -> MetadataResult<()> {
        let lengths = chunks
            .iter()
            .map(|chunk| u32::try_from(chunk.len()))
            .collect::<Result<Vec<_>, _>>()?;
        let dir = self.directory_or_create(path)?;
        dir.tags
            .retain(|tag| tag.id != name.position_id() && tag.id != name.length_id());
        dir.tags.push(Tag::new(name.position_id(), Value::longs(vec![0; chunks.len()])));
        dir.tags.push(Tag::new(name.length_id(), Value::longs(lengths)));
        dir.data.insert(name, chunks);
        Ok(())
    }

    /// Remove a named payload and its pair of tags from the directory at `path`.
    pub fn remove_data(&mut self, path: &str, name: DataName) -> MetadataResult<Option<Vec<Bytes>>> {
        let Some(dir) = self.directory_mut(path)? else {
            return Ok(None);
        };
        let removed = dir.data.remove(&name);
        if removed.is_some() {
            dir.tags
                .retain(|tag| tag.id != name.position_id() && tag.id != name.length_id());
        }
        Ok(removed)
    }

    /// Every directory reachable from the root, depth first, with its path.
    fn walk(&self) -> Vec<(TiffPath, DirectoryId)> {
        let mut out = vec![];
        let mut stack = self
            .root
            .0
            .iter()
            .enumerate()
            .rev()
            .map(|(i, id)| (TiffPath::root(i), *id))
            .collect::<Vec<_>>();
        while let Some((path, id)) = stack.pop() {
            let mut children = vec![];
            for (branch, trunks) in &self.directories[id].branches {
                for (k, trunk) in trunks.iter().enumerate() {
                    for (i, child) in trunk.0.iter().enumerate() {
                        children.push((path.join(*branch, k, i), *child));
                    }
                }
            }
            stack.extend(children.into_iter().rev());
            out.push((path, id));
        }
        out
    }

    /// Every tag in the tree, with the path of its directory.
    pub fn enumerate_tags(&self) -> Vec<(TiffPath, &Tag)> {
        self.walk()
            .into_iter()
            .flat_map(|(path, id)| {
                self.directories[id]
                    .tags
                    .iter()
                    .map(move |tag| (path.clone(), tag))
            })
            .collect()
    }

    /// Every named payload in the tree, with the path of its directory.
    pub fn enumerate_data(&self) -> Vec<(TiffPath, DataName, &[Bytes])> {
        self.walk()
            .into_iter()
            .flat_map(|(path, id)| {
                self.directories[id]
                    .data
                    .iter()
                    .map(move |(name, chunks)| (path.clone(), *name, chunks.as_slice()))
            })
            .collect()
    }
}
