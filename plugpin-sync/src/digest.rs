//! Release archive content addressing.
//!
//! [`DigestMode::Unpacked`] reproduces `nix-prefetch-url --unpack`: the
//! gzipped tarball is unpacked in memory. A single top-level directory is
//! stripped, the tree is serialized as a NAR (Nix ARchive), and the SHA-256
//! of that serialization is printed in Nix base-32.
//!
//! [`DigestMode::Flat`] is the hex SHA-256 of the tarball bytes as downloaded.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use tar::EntryType;

use plugpin_core::{ArchiveDigest, DigestMode};

/// Alphabet of Nix's base-32 encoding (no `e`, `o`, `t`, `u`).
const NIX32_ALPHABET: &[u8; 32] = b"0123456789abcdfghijklmnpqrsvwxyz";

/// A file tree node as NAR sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    File { executable: bool, contents: Vec<u8> },
    Symlink { target: String },
    Directory(BTreeMap<String, Node>),
}

/// Why an archive could not be digested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveError(pub String);

impl From<std::io::Error> for ArchiveError {
    fn from(e: std::io::Error) -> Self {
        ArchiveError(e.to_string())
    }
}

/// Digest a downloaded `.tar.gz` according to `mode`.
pub fn digest_archive(bytes: &[u8], mode: DigestMode) -> Result<ArchiveDigest, ArchiveError> {
    match mode {
        DigestMode::Flat => Ok(ArchiveDigest(hex::encode(Sha256::digest(bytes)))),
        DigestMode::Unpacked => {
            let tree = unpack_tar_gz(bytes)?;
            let root = strip_single_top_level(tree);
            let mut hasher = Sha256::new();
            write_nar(&mut hasher, &root)?;
            Ok(ArchiveDigest(nix32(&hasher.finalize())))
        }
    }
}

// ---------------------------------------------------------------------------
// Unpacking
// ---------------------------------------------------------------------------

/// Unpack a gzipped tarball into an in-memory tree rooted at a directory.
pub fn unpack_tar_gz(bytes: &[u8]) -> Result<Node, ArchiveError> {
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    let mut root = BTreeMap::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let kind = entry.header().entry_type();
        let path = entry.path()?.into_owned();
        let parts = normalize(&path)?;
        if parts.is_empty() {
            continue;
        }

        let node = match kind {
            EntryType::Regular | EntryType::Continuous => {
                let mut contents = Vec::new();
                entry.read_to_end(&mut contents)?;
                let executable = entry.header().mode()? & 0o100 != 0;
                Node::File {
                    executable,
                    contents,
                }
            }
            EntryType::Directory => Node::Directory(BTreeMap::new()),
            EntryType::Symlink => {
                let target = entry
                    .link_name()?
                    .ok_or_else(|| ArchiveError(format!("symlink {} has no target", path.display())))?;
                Node::Symlink {
                    target: target.to_string_lossy().into_owned(),
                }
            }
            EntryType::Link => {
                let target = entry
                    .link_name()?
                    .ok_or_else(|| ArchiveError(format!("hard link {} has no target", path.display())))?;
                let target_parts = normalize(&target)?;
                lookup(&root, &target_parts).cloned().ok_or_else(|| {
                    ArchiveError(format!(
                        "hard link {} points at missing {}",
                        path.display(),
                        target.display()
                    ))
                })?
            }
            // pax_global_header and friends carry metadata only.
            _ => continue,
        };

        insert(&mut root, &parts, node)?;
    }

    Ok(Node::Directory(root))
}

/// If the root holds exactly one directory, return that directory.
pub fn strip_single_top_level(root: Node) -> Node {
    match root {
        Node::Directory(mut children) if children.len() == 1 => {
            let only_is_dir = matches!(children.values().next(), Some(Node::Directory(_)));
            if only_is_dir {
                if let Some((_, child)) = children.pop_first() {
                    return child;
                }
            }
            Node::Directory(children)
        }
        other => other,
    }
}

fn normalize(path: &Path) -> Result<Vec<String>, ArchiveError> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => parts.push(name.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => {
                return Err(ArchiveError(format!(
                    "refusing archive path {}",
                    path.display()
                )))
            }
        }
    }
    Ok(parts)
}

fn lookup<'a>(dir: &'a BTreeMap<String, Node>, parts: &[String]) -> Option<&'a Node> {
    let (first, rest) = parts.split_first()?;
    let node = dir.get(first)?;
    if rest.is_empty() {
        return Some(node);
    }
    match node {
        Node::Directory(children) => lookup(children, rest),
        _ => None,
    }
}

fn insert(dir: &mut BTreeMap<String, Node>, parts: &[String], node: Node) -> Result<(), ArchiveError> {
    let Some((first, rest)) = parts.split_first() else {
        return Ok(());
    };

    if rest.is_empty() {
        match (dir.get(first), &node) {
            // Re-declaring an existing directory keeps its children.
            (Some(Node::Directory(_)), Node::Directory(_)) => {}
            _ => {
                dir.insert(first.clone(), node);
            }
        }
        return Ok(());
    }

    let child = dir
        .entry(first.clone())
        .or_insert_with(|| Node::Directory(BTreeMap::new()));
    match child {
        Node::Directory(children) => insert(children, rest, node),
        _ => Err(ArchiveError(format!("{first} is both a file and a directory"))),
    }
}

// ---------------------------------------------------------------------------
// NAR serialization
// ---------------------------------------------------------------------------

/// Serialize `root` as a NAR into `out`.
pub fn write_nar<W: Write>(out: &mut W, root: &Node) -> std::io::Result<()> {
    write_str(out, b"nix-archive-1")?;
    write_node(out, root)
}

fn write_node<W: Write>(out: &mut W, node: &Node) -> std::io::Result<()> {
    write_str(out, b"(")?;
    write_str(out, b"type")?;
    match node {
        Node::File {
            executable,
            contents,
        } => {
            write_str(out, b"regular")?;
            if *executable {
                write_str(out, b"executable")?;
                write_str(out, b"")?;
            }
            write_str(out, b"contents")?;
            write_str(out, contents)?;
        }
        Node::Symlink { target } => {
            write_str(out, b"symlink")?;
            write_str(out, b"target")?;
            write_str(out, target.as_bytes())?;
        }
        Node::Directory(children) => {
            write_str(out, b"directory")?;
            for (name, child) in children {
                write_str(out, b"entry")?;
                write_str(out, b"(")?;
                write_str(out, b"name")?;
                write_str(out, name.as_bytes())?;
                write_str(out, b"node")?;
                write_node(out, child)?;
                write_str(out, b")")?;
            }
        }
    }
    write_str(out, b")")
}

/// Length-prefixed (u64 LE), zero-padded to a multiple of 8.
fn write_str<W: Write>(out: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    out.write_all(&(bytes.len() as u64).to_le_bytes())?;
    out.write_all(bytes)?;
    let pad = (8 - bytes.len() % 8) % 8;
    out.write_all(&[0u8; 8][..pad])
}

// ---------------------------------------------------------------------------
// Nix base-32
// ---------------------------------------------------------------------------

/// Encode `hash` the way `nix-hash --to-base32` does.
pub fn nix32(hash: &[u8]) -> String {
    if hash.is_empty() {
        return String::new();
    }
    let len = (hash.len() * 8 - 1) / 5 + 1;
    let mut out = String::with_capacity(len);
    for n in (0..len).rev() {
        let bit = n * 5;
        let i = bit / 8;
        let j = bit % 8;
        let low = u32::from(hash[i]) >> j;
        let high = hash.get(i + 1).map_or(0, |b| u32::from(*b) << (8 - j));
        out.push(NIX32_ALPHABET[((low | high) & 0x1f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nar_str(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        write_str(&mut out, bytes).unwrap();
        out
    }

    #[test]
    fn nix32_matches_reference_vector() {
        let empty = Sha256::digest(b"");
        assert_eq!(
            nix32(&empty),
            "0mdqa9w1p6cmli6976v4wi0sw9r4p5prkj7lzfd1877wk11c9c73"
        );
        assert_eq!(nix32(&empty).len(), 52);
    }

    #[test]
    fn strings_are_padded_to_eight_bytes() {
        assert_eq!(nar_str(b"").len(), 8);
        assert_eq!(nar_str(b"type").len(), 16);
        assert_eq!(nar_str(b"12345678").len(), 16);
        assert_eq!(&nar_str(b"ab")[..8], &2u64.to_le_bytes());
    }

    #[test]
    fn single_file_nar_layout() {
        let node = Node::File {
            executable: true,
            contents: b"hi".to_vec(),
        };
        let mut got = Vec::new();
        write_nar(&mut got, &node).unwrap();

        let mut expected = Vec::new();
        for s in [
            &b"nix-archive-1"[..],
            b"(",
            b"type",
            b"regular",
            b"executable",
            b"",
            b"contents",
            b"hi",
            b")",
        ] {
            expected.extend(nar_str(s));
        }
        assert_eq!(got, expected);
    }

    #[test]
    fn directory_entries_are_sorted() {
        let mut children = BTreeMap::new();
        children.insert("b".to_string(), Node::Symlink { target: "a".into() });
        children.insert(
            "a".to_string(),
            Node::File {
                executable: false,
                contents: vec![],
            },
        );
        let mut got = Vec::new();
        write_nar(&mut got, &Node::Directory(children)).unwrap();

        let pos_a = got.windows(8).position(|w| w == b"a\0\0\0\0\0\0\0").unwrap();
        let pos_b = got.windows(8).position(|w| w == b"b\0\0\0\0\0\0\0").unwrap();
        assert!(pos_a < pos_b);
    }

    #[test]
    fn parent_dir_paths_are_rejected() {
        assert!(normalize(Path::new("../escape")).is_err());
        assert_eq!(
            normalize(Path::new("./a/b")).unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn single_top_level_file_is_not_stripped() {
        let mut children = BTreeMap::new();
        children.insert(
            "README".to_string(),
            Node::File {
                executable: false,
                contents: vec![],
            },
        );
        let root = Node::Directory(children.clone());
        assert_eq!(strip_single_top_level(root), Node::Directory(children));
    }

    fn tar_gz(files: &[(&str, u32)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(flate2::write::GzEncoder::new(
            Vec::new(),
            flate2::Compression::default(),
        ));
        for (path, mode) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(2);
            header.set_mode(*mode);
            header.set_cksum();
            builder.append_data(&mut header, path, &b"x\n"[..]).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn executable_bit(root: &Node, name: &str) -> bool {
        let Node::Directory(children) = root else {
            panic!("root is not a directory");
        };
        match children.get(name) {
            Some(Node::File { executable, .. }) => *executable,
            other => panic!("{name}: {other:?}"),
        }
    }

    #[test]
    fn only_owner_execute_bit_marks_file_executable() {
        let bytes = tar_gz(&[("group-x", 0o655), ("owner-x", 0o744), ("plain", 0o644)]);
        let root = unpack_tar_gz(&bytes).unwrap();

        assert!(!executable_bit(&root, "group-x"));
        assert!(executable_bit(&root, "owner-x"));
        assert!(!executable_bit(&root, "plain"));
    }

    #[test]
    fn garbage_is_an_archive_error() {
        assert!(digest_archive(b"not a tarball", DigestMode::Unpacked).is_err());
    }

    #[test]
    fn flat_digest_is_hex_sha256() {
        let got = digest_archive(b"", DigestMode::Flat).unwrap();
        assert_eq!(
            got.0,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
