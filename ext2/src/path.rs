//! 目录遍历与路径解析

use alloc::vec::Vec;

use vfs::DirEntryType;

use crate::cache::BlockMapCache;
use crate::config::PATH_MAX;
use crate::layout::{DirEntryHead, Inode};
use crate::{Error, Ext2FileSystem, Ext2Node};

/// 目录中的一条原始记录
#[derive(Debug)]
pub(crate) struct RawDirEntry {
    pub ino: u32,
    pub head: DirEntryHead,
    pub name: Vec<u8>,
}

impl RawDirEntry {
    /// 填充记录与已删除的记录不指向任何文件
    pub fn is_live(&self) -> bool {
        self.ino != 0 && !self.name.is_empty()
    }
}

impl Ext2FileSystem {
    /// 读取目录中`pos`处的记录，下一条位于`pos + rec_len`
    pub(crate) fn read_dir_entry(
        &self,
        dir: &Inode,
        pos: u64,
        cache: &mut BlockMapCache,
    ) -> Result<RawDirEntry, Error> {
        let mut raw = [0u8; DirEntryHead::SIZE];
        if self.read_file(dir, pos, &mut raw, cache)? != raw.len() {
            log::warn!("ext2: directory entry header at {pos} truncated");
            return Err(Error::Corrupted);
        }
        let head = DirEntryHead::parse(&raw).ok_or(Error::Corrupted)?;
        if !head.is_well_formed() {
            log::warn!(
                "ext2: bad directory entry at {pos}: rec_len {}, name_len {}",
                head.rec_len(),
                head.name_len()
            );
            return Err(Error::Corrupted);
        }

        let mut name = Vec::new();
        name.try_reserve_exact(head.name_len() as usize)?;
        name.resize(head.name_len() as usize, 0);
        if self.read_file(dir, pos + DirEntryHead::SIZE as u64, &mut name, cache)? != name.len() {
            return Err(Error::Corrupted);
        }

        Ok(RawDirEntry {
            ino: head.inode(),
            head,
            name,
        })
    }

    /// 目录项记录的类型，没有记录时读inode判断
    pub(crate) fn entry_kind(&self, entry: &RawDirEntry, node: &mut Ext2Node) -> Result<DirEntryType, Error> {
        match entry.head.file_type().kind() {
            Some(kind) => Ok(kind),
            None => Ok(node.load(self)?.kind()),
        }
    }

    /// 在目录`dir`中查找名为`name`的项
    pub fn iterate_dir(&self, dir: &mut Ext2Node, name: &[u8]) -> Result<(Ext2Node, DirEntryType), Error> {
        let inode = dir.load(self)?;
        if !inode.is_dir() {
            return Err(Error::NotADirectory);
        }

        let mut cache = self.block_map_cache();
        let mut pos = 0;
        while pos < inode.size as u64 {
            let entry = self.read_dir_entry(inode, pos, &mut cache)?;
            if entry.is_live() && entry.name == name {
                let mut node = Ext2Node::new(entry.ino);
                let kind = self.entry_kind(&entry, &mut node)?;
                log::trace!("ext2: found {} -> inode {}", entry.name.escape_ascii(), entry.ino);
                return Ok((node, kind));
            }
            pos += entry.head.rec_len() as u64;
        }
        Err(Error::NotFound)
    }

    /// 从`start`出发解析路径，以`/`开头与否均相对`start`
    ///
    /// 连续的`/`视为一个；途经的符号链接都会被跟随，
    /// 绝对目标从根目录、相对目标从链接所在目录继续解析。
    pub fn resolve_path(&self, path: &str, start: &Ext2Node) -> Result<(Ext2Node, DirEntryType), Error> {
        let mut nest = 0;
        self.find_file(path.as_bytes(), start, &mut nest)
    }

    fn find_file(
        &self,
        path: &[u8],
        start: &Ext2Node,
        nest: &mut usize,
    ) -> Result<(Ext2Node, DirEntryType), Error> {
        let mut rest = trim_slashes(path);
        let mut current = start.clone();
        let mut kind = DirEntryType::Directory;

        while !rest.is_empty() {
            let (component, tail) = match rest.iter().position(|&b| b == b'/') {
                Some(end) => (&rest[..end], trim_slashes(&rest[end..])),
                None => (rest, &[][..]),
            };
            if kind != DirEntryType::Directory {
                return Err(Error::NotADirectory);
            }

            let mut parent = current;
            let (mut found, found_kind) = self.iterate_dir(&mut parent, component)?;
            (current, kind) = if found_kind == DirEntryType::SymLink {
                *nest += 1;
                if *nest >= self.config().max_symlink_nest {
                    log::warn!("ext2: too many nested symbolic links");
                    return Err(Error::SymlinkLoop);
                }
                let target = self.read_symlink(&mut found)?;
                let base = if target.first() == Some(&b'/') {
                    self.root().clone()
                } else {
                    parent
                };
                self.find_file(&target, &base, nest)?
            } else {
                (found, found_kind)
            };
            rest = tail;
        }

        Ok((current, kind))
    }

    /// 符号链接的目标
    pub fn read_symlink(&self, link: &mut Ext2Node) -> Result<Vec<u8>, Error> {
        let ino = link.ino();
        let inode = link.load(self)?;
        if !inode.is_symlink() {
            return Err(Error::NotAFile);
        }
        if inode.size as usize > PATH_MAX {
            log::warn!("ext2: symbolic link {ino} is {} bytes long", inode.size);
            return Err(Error::Corrupted);
        }
        self.read_to_vec(inode, &mut self.block_map_cache())
    }
}

fn trim_slashes(path: &[u8]) -> &[u8] {
    let start = path.iter().position(|&b| b != b'/').unwrap_or(path.len());
    &path[start..]
}
