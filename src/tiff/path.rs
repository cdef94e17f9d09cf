//! Slash-separated addresses into the directory tree.

use std::fmt;
use std::str::FromStr;

use crate::error::PathError;
use crate::tiff::tags::{branch_id, branch_name};

/// One step from a directory into a nested trunk, then to a directory of that trunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hop {
    /// Id of the pointer tag owning the branch.
    pub branch: u16,
    /// Index of the trunk within the branch.
    pub trunk: usize,
    /// Index of the directory within that trunk.
    pub directory: usize,
}

/// A parsed path such as `/ifd[0]/exif[0]/ifd[0]`.
///
/// Components alternate between directory selectors (`ifd[n]`) and branch selectors
/// (`<name>[n]`, where the name is one of the known branch names or a decimal tag id). A path
/// always ends on a directory. Components are trimmed and matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TiffPath {
    pub(crate) root: usize,
    pub(crate) hops: Vec<Hop>,
}

impl TiffPath {
    /// The path of a directory in the root trunk.
    pub fn root(directory: usize) -> Self {
        Self {
            root: directory,
            hops: vec![],
        }
    }

    /// Extend the path through a branch of the directory it currently addresses.
    pub fn join(&self, branch: u16, trunk: usize, directory: usize) -> Self {
        let mut hops = self.hops.clone();
        hops.push(Hop {
            branch,
            trunk,
            directory,
        });
        Self {
            root: self.root,
            hops,
        }
    }

    /// Index of the first directory, within the root trunk.
    pub fn root_index(&self) -> usize {
        self.root
    }

    /// The branch steps following the root directory.
    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }
}

/// Split `name[index]` into its parts.
fn split_component(component: &str) -> Result<(&str, usize), PathError> {
    let invalid = || PathError::InvalidComponent(component.to_string());
    let (name, rest) = component.split_once('[').ok_or_else(invalid)?;
    let index = rest.strip_suffix(']').ok_or_else(invalid)?;
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid());
    }
    if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let index = index.parse().map_err(|_| invalid())?;
    Ok((name, index))
}

fn parse_directory(component: &str) -> Result<usize, PathError> {
    match split_component(component)? {
        ("ifd", index) => Ok(index),
        _ => Err(PathError::DirectoryExpected(component.to_string())),
    }
}

fn parse_branch(component: &str) -> Result<(u16, usize), PathError> {
    let (name, index) = split_component(component)?;
    let id = branch_id(name)
        .or_else(|| name.parse().ok())
        .ok_or_else(|| PathError::UnknownBranch(name.to_string()))?;
    Ok((id, index))
}

impl FromStr for TiffPath {
    type Err = PathError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| PathError::MissingRoot(path.to_string()))?;
        let components = rest
            .split('/')
            .map(|c| c.trim().to_ascii_lowercase())
            .collect::<Vec<_>>();

        let root = parse_directory(&components[0])?;
        let mut hops = vec![];
        for pair in components[1..].chunks(2) {
            let (branch, trunk) = parse_branch(&pair[0])?;
            let directory = match pair.get(1) {
                Some(component) => parse_directory(component)?,
                None => return Err(PathError::EndsOnBranch(path.to_string())),
            };
            hops.push(Hop {
                branch,
                trunk,
                directory,
            });
        }
        Ok(Self { root, hops })
    }
}

impl fmt::Display for TiffPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/ifd[{}]", self.root)?;
        for hop in &self.hops {
            write!(
                f,
                "/{}[{}]/ifd[{}]",
                branch_name(hop.branch),
                hop.trunk,
                hop.directory
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_paths() {
        let path: TiffPath = "/ifd[0]".parse().unwrap();
        assert_eq!(path, TiffPath::root(0));

        let path: TiffPath = "/IFD[1]/ Exif[0] /ifd[2]".parse().unwrap();
        assert_eq!(path, TiffPath::root(1).join(0x8769, 0, 2));

        let path: TiffPath = "/ifd[0]/700[1]/ifd[0]/gps[0]/ifd[0]".parse().unwrap();
        assert_eq!(path.hops().len(), 2);
        assert_eq!(path.hops()[0].branch, 700);
        assert_eq!(path.hops()[1].branch, 0x8825);
    }

    #[test]
    fn test_invalid_paths() {
        let cases = [
            ("ifd[0]", PathError::MissingRoot("ifd[0]".into())),
            ("/", PathError::InvalidComponent("".into())),
            ("/ifd", PathError::InvalidComponent("ifd".into())),
            ("/ifd[x]", PathError::InvalidComponent("ifd[x]".into())),
            ("/exif[0]", PathError::DirectoryExpected("exif[0]".into())),
            ("/ifd[0]/makernote[0]/ifd[0]", PathError::UnknownBranch("makernote".into())),
            ("/ifd[0]/exif[0]", PathError::EndsOnBranch("/ifd[0]/exif[0]".into())),
            ("/ifd[0]/", PathError::InvalidComponent("".into())),
        ];
        for (path, expected) in cases {
            assert_eq!(path.parse::<TiffPath>().unwrap_err(), expected, "{path}");
        }
    }

    #[test]
    fn test_display_uses_names() {
        let path = TiffPath::root(0).join(0x8769, 0, 0).join(0xA005, 1, 3);
        assert_eq!(
            path.to_string(),
            "/ifd[0]/exif[0]/ifd[0]/interoperability[1]/ifd[3]"
        );
        let path = TiffPath::root(2).join(330, 0, 1);
        assert_eq!(path.to_string(), "/ifd[2]/subifds[0]/ifd[1]");
        assert_eq!(TiffPath::root(0).join(700, 0, 0).to_string(), "/ifd[0]/700[0]/ifd[0]");
    }
}
