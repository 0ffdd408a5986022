use alloc::string::String;

use vfs::DirEntry;

use crate::cache::BlockMapCache;
use crate::{Error, Ext2FileSystem, Ext2Node, Inode};

/// 打开的目录，逐项读取
///
/// 填充与已删除的记录会被跳过；每一项都带有所指文件的大小，因而需要读取其inode。
#[derive(Debug)]
pub struct DirHandle<'fs> {
    fs: &'fs Ext2FileSystem,
    node: Ext2Node,
    inode: Inode,
    pos: u64,
    cache: BlockMapCache,
    failed: bool,
}

impl Ext2FileSystem {
    pub fn opendir(&self, path: &str) -> Result<DirHandle<'_>, Error> {
        let (mut node, _) = self.resolve_path(path, self.root())?;
        let inode = node.load(self)?.clone();
        if !inode.is_dir() {
            return Err(Error::NotADirectory);
        }
        log::debug!("ext2: opendir {path:?} (inode {})", node.ino());

        Ok(DirHandle {
            fs: self,
            node,
            inode,
            pos: 0,
            cache: self.block_map_cache(),
            failed: false,
        })
    }
}

impl DirHandle<'_> {
    pub fn ino(&self) -> u32 {
        self.node.ino()
    }

    /// 下一项；读完时返回`None`
    ///
    /// 出错时位置不前进。
    pub fn readdir(&mut self) -> Result<Option<DirEntry>, Error> {
        while self.pos < self.inode.size as u64 {
            let entry = self.fs.read_dir_entry(&self.inode, self.pos, &mut self.cache)?;
            let next = self.pos + entry.head.rec_len() as u64;
            if !entry.is_live() {
                self.pos = next;
                continue;
            }

            let mut node = Ext2Node::new(entry.ino);
            let ty = self.fs.entry_kind(&entry, &mut node)?;
            let size = node.load(self.fs)?.size as u64;
            self.pos = next;

            return Ok(Some(DirEntry {
                inode: entry.ino as u64,
                ty,
                name: String::from_utf8_lossy(&entry.name).into_owned(),
                size,
            }));
        }
        Ok(None)
    }

    /// 回到第一项
    pub fn rewind(&mut self) {
        self.pos = 0;
        self.failed = false;
    }

    pub fn close(self) {}
}

impl Drop for DirHandle<'_> {
    fn drop(&mut self) {
        log::trace!("ext2: closedir inode {}", self.node.ino());
    }
}

impl Iterator for DirHandle<'_> {
    type Item = Result<DirEntry, Error>;

    /// 出错后迭代结束
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.readdir().transpose();
        self.failed = matches!(item, Some(Err(_)));
        item
    }
}
