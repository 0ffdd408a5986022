use crate::{Error, Ext2FileSystem, Inode};

/// 以inode编号标识的文件，inode内容在首次需要时读入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ext2Node {
    ino: u32,
    inode: Option<Inode>,
}

impl Ext2Node {
    pub fn new(ino: u32) -> Self {
        Self { ino, inode: None }
    }

    pub fn with_inode(ino: u32, inode: Inode) -> Self {
        Self {
            ino,
            inode: Some(inode),
        }
    }

    pub fn ino(&self) -> u32 {
        self.ino
    }

    /// 已读入的inode
    pub fn inode(&self) -> Option<&Inode> {
        self.inode.as_ref()
    }

    /// 读入（如尚未读入）并返回inode
    pub fn load(&mut self, fs: &Ext2FileSystem) -> Result<&Inode, Error> {
        let inode = match self.inode.take() {
            Some(inode) => inode,
            None => fs.read_inode(self.ino)?,
        };
        Ok(self.inode.insert(inode))
    }
}
