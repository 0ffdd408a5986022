use crate::cache::BlockMapCache;
use crate::{Error, Ext2FileSystem, Ext2Node, Inode};

/// 定位的基准
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    Start(u64),
    End(i64),
    Current(i64),
}

/// 打开的普通文件
///
/// 每个句柄有自己的读取位置与缓存，可以同时打开同一文件多次。
#[derive(Debug)]
pub struct FileHandle<'fs> {
    fs: &'fs Ext2FileSystem,
    node: Ext2Node,
    inode: Inode,
    pos: u64,
    cache: BlockMapCache,
}

impl Ext2FileSystem {
    pub fn open(&self, path: &str) -> Result<FileHandle<'_>, Error> {
        let (mut node, _) = self.resolve_path(path, self.root())?;
        let inode = node.load(self)?.clone();
        if !inode.is_file() {
            return Err(Error::NotAFile);
        }
        log::debug!("ext2: open {path:?} (inode {}, {} bytes)", node.ino(), inode.size);

        Ok(FileHandle {
            fs: self,
            node,
            inode,
            pos: 0,
            cache: self.block_map_cache(),
        })
    }
}

impl FileHandle<'_> {
    pub fn ino(&self) -> u32 {
        self.node.ino()
    }

    pub fn inode(&self) -> &Inode {
        &self.inode
    }

    pub fn len(&self) -> u64 {
        self.inode.size as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 读到`buf`中，返回读到的字节数，0表示已到末尾
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let n = self.fs.read_file(&self.inode, self.pos, buf, &mut self.cache)?;
        self.pos += n as u64;
        Ok(n)
    }

    /// 读一个字节，末尾处返回`None`
    pub fn getc(&mut self) -> Result<Option<u8>, Error> {
        let mut byte = [0u8];
        Ok((self.read(&mut byte)? == 1).then_some(byte[0]))
    }

    /// 可以越过末尾，之后的读取返回0
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, Error> {
        let (base, offset) = match pos {
            SeekFrom::Start(pos) => {
                self.pos = pos;
                return Ok(pos);
            }
            SeekFrom::End(offset) => (self.len(), offset),
            SeekFrom::Current(offset) => (self.pos, offset),
        };
        self.pos = base.checked_add_signed(offset).ok_or(Error::InvalidSeek)?;
        Ok(self.pos)
    }

    pub fn tell(&self) -> u64 {
        self.pos
    }

    pub fn close(self) {}
}

impl Drop for FileHandle<'_> {
    fn drop(&mut self) {
        log::trace!("ext2: close inode {}", self.node.ino());
    }
}
