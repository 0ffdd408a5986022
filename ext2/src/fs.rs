use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::{BlockDevice, SECTOR_SIZE};
use vfs::Stat;

use crate::cache::{BlockMapCache, Level};
use crate::config::{Config, DIRECT_BLOCKS, ROOT_INO, SUPERBLOCK_OFFSET};
use crate::layout::{BlockGroupDescriptor, BlockPointers, DiskInode, IncompatFeature, Inode, SuperBlock};
use crate::{BlockId, Error, Ext2Node, SectorId, devread};

/// 一次挂载会话
///
/// 会话只读地持有块设备；文件与目录句柄借用会话，卸载前须全部关闭。
pub struct Ext2FileSystem {
    dev: Arc<dyn BlockDevice>,
    sb: SuperBlock,
    root: Ext2Node,
    config: Config,
}

impl core::fmt::Debug for Ext2FileSystem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Ext2FileSystem")
            .field("block_size", &self.block_size())
            .field("inodes", &self.sb.inodes_count())
            .field("blocks", &self.sb.blocks_count())
            .finish()
    }
}

impl Ext2FileSystem {
    pub fn mount(dev: Arc<dyn BlockDevice>) -> Result<Self, Error> {
        Self::mount_with(dev, Config::default())
    }

    pub fn mount_with(dev: Arc<dyn BlockDevice>, config: Config) -> Result<Self, Error> {
        let geometry = dev.geometry();
        if geometry.block_size as usize != SECTOR_SIZE {
            log::warn!("ext2: {}-byte sectors are not supported", geometry.block_size);
            return Err(Error::Unsupported);
        }

        let mut raw = [0u8; core::mem::size_of::<SuperBlock>()];
        devread(dev.as_ref(), SectorId::new(0), SUPERBLOCK_OFFSET, &mut raw)?;
        let sb = SuperBlock::parse(&raw).ok_or(Error::NotExt2)?;
        if !sb.is_ext2() {
            log::debug!("ext2: bad magic {:#06x}", sb.magic());
            return Err(Error::NotExt2);
        }
        if !sb.is_sane() {
            log::warn!(
                "ext2: unusable geometry: log block size {}, {} inodes/group, inode size {}",
                sb.log2_block_size(),
                sb.inodes_per_group(),
                sb.inode_size()
            );
            return Err(Error::Corrupted);
        }
        let mut unknown = sb.feature_incompat();
        unknown.remove(IncompatFeature::FileType);
        if !unknown.is_empty() || sb.unknown_incompat() != 0 {
            log::warn!(
                "ext2: mounting despite incompatible features {unknown:?} ({:#x} unknown)",
                sb.unknown_incompat()
            );
        }

        let mut fs = Self {
            dev,
            sb,
            root: Ext2Node::new(ROOT_INO),
            config,
        };
        let root = fs.read_inode(ROOT_INO).map_err(|err| {
            log::warn!("ext2: root inode unreadable: {err}");
            Error::NotExt2
        })?;
        fs.root = Ext2Node::with_inode(ROOT_INO, root);

        log::info!(
            "ext2: mounted, {} blocks of {} bytes, {} inodes in {} group(s)",
            fs.sb.blocks_count(),
            fs.block_size(),
            fs.sb.inodes_count(),
            fs.sb.group_count()
        );
        Ok(fs)
    }

    /// 结束会话；借用它的句柄此前都已关闭
    pub fn unmount(self) {
        log::info!("ext2: unmounted");
    }

    pub fn super_block(&self) -> &SuperBlock {
        &self.sb
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn device(&self) -> &Arc<dyn BlockDevice> {
        &self.dev
    }

    pub fn root(&self) -> &Ext2Node {
        &self.root
    }

    pub fn block_size(&self) -> usize {
        self.sb.block_size() as usize
    }

    fn log2_sectors(&self) -> u32 {
        self.sb.log2_sectors_per_block()
    }

    /// 新建一份按挂载配置设定容量的映射缓存
    pub fn block_map_cache(&self) -> BlockMapCache {
        BlockMapCache::new(self.config.devread_cache_capacity)
    }

    /// 读取第`group`个块组描述符
    pub fn read_block_group(&self, group: u32) -> Result<BlockGroupDescriptor, Error> {
        let table = SectorId::new(((self.sb.first_data_block() as u64) + 1) << self.log2_sectors());
        let mut raw = [0u8; BlockGroupDescriptor::SIZE];
        devread(
            self.dev.as_ref(),
            table,
            group as usize * BlockGroupDescriptor::SIZE,
            &mut raw,
        )?;
        BlockGroupDescriptor::parse(&raw).ok_or(Error::Corrupted)
    }

    /// 按编号读取inode，编号从1开始
    pub fn read_inode(&self, ino: u32) -> Result<Inode, Error> {
        if ino == 0 || ino > self.sb.inodes_count() {
            log::warn!("ext2: inode {ino} out of range");
            return Err(Error::Corrupted);
        }

        let index = ino - 1;
        let per_group = self.sb.inodes_per_group();
        let inode_size = self.sb.inode_size() as usize;
        let per_block = (self.block_size() / inode_size) as u32;

        let group = index / per_group;
        let slot = index % per_group;
        let desc = self.read_block_group(group)?;
        let block = desc
            .inode_table()
            .checked_add(slot / per_block)
            .map(BlockId::new)
            .ok_or(Error::Corrupted)?;

        let mut raw = [0u8; core::mem::size_of::<DiskInode>()];
        devread(
            self.dev.as_ref(),
            block.sector(self.log2_sectors()),
            (slot % per_block) as usize * inode_size,
            &mut raw,
        )?;
        let inode = DiskInode::parse(&raw).ok_or(Error::Corrupted)?;
        log::trace!("ext2: read inode {ino} from group {group}, block {block:?}");
        Ok(Inode::from(&inode))
    }

    /// 文件的第`index`个逻辑块 → 物理块，空洞为[`BlockId::HOLE`]
    pub fn resolve_file_block(
        &self,
        inode: &Inode,
        index: u32,
        cache: &mut BlockMapCache,
    ) -> Result<BlockId, Error> {
        let BlockPointers::Blocks {
            direct,
            indirect,
            double_indirect,
            ..
        } = &inode.pointers
        else {
            return Err(Error::NotAFile);
        };

        let per_block = (self.block_size() / 4) as u64;
        let mut index = index as u64;
        if index < DIRECT_BLOCKS as u64 {
            return Ok(direct[index as usize]);
        }

        index -= DIRECT_BLOCKS as u64;
        if index < per_block {
            return self.indirect_entry(Level::Single, *indirect, index, cache);
        }

        index -= per_block;
        if index < per_block * per_block {
            let middle = self.indirect_entry(Level::Double, *double_indirect, index / per_block, cache)?;
            return self.indirect_entry(Level::Single, middle, index % per_block, cache);
        }

        log::warn!("ext2: triple indirect blocks are not supported");
        Err(Error::Unsupported)
    }

    fn indirect_entry(
        &self,
        level: Level,
        block: BlockId,
        index: u64,
        cache: &mut BlockMapCache,
    ) -> Result<BlockId, Error> {
        if block.is_hole() {
            return Ok(BlockId::HOLE);
        }
        let entries = cache.indirect(
            level,
            self.dev.as_ref(),
            block,
            self.block_size(),
            self.log2_sectors(),
        )?;
        entries.get(index as usize).copied().ok_or(Error::Corrupted)
    }

    /// 从`pos`起读取文件内容，返回读到的字节数；空洞读作0
    pub fn read_file(
        &self,
        inode: &Inode,
        pos: u64,
        buf: &mut [u8],
        cache: &mut BlockMapCache,
    ) -> Result<usize, Error> {
        let size = inode.size as u64;
        if pos >= size || buf.is_empty() {
            return Ok(0);
        }
        let len = (buf.len() as u64).min(size - pos) as usize;

        if let Some(target) = inode.inline_target() {
            let pos = pos as usize;
            buf[..len].copy_from_slice(&target[pos..pos + len]);
            return Ok(len);
        }

        let block_size = self.block_size() as u64;
        let mut done = 0;
        while done < len {
            let offset = pos + done as u64;
            let index = u32::try_from(offset / block_size).map_err(|_| Error::Corrupted)?;
            let in_block = (offset % block_size) as usize;
            let chunk = (block_size as usize - in_block).min(len - done);
            let out = &mut buf[done..done + chunk];

            let block = self.resolve_file_block(inode, index, cache)?;
            if block.is_hole() {
                out.fill(0);
            } else {
                devread(
                    self.dev.as_ref(),
                    block.sector(self.log2_sectors()),
                    in_block,
                    out,
                )?;
            }
            done += chunk;
        }
        Ok(done)
    }

    /// 读出整个文件，容量不足时报[`Error::OutOfMemory`]
    pub(crate) fn read_to_vec(&self, inode: &Inode, cache: &mut BlockMapCache) -> Result<Vec<u8>, Error> {
        let size = inode.size as usize;
        let mut data = Vec::new();
        data.try_reserve_exact(size)?;
        data.resize(size, 0);
        if self.read_file(inode, 0, &mut data, cache)? != size {
            return Err(Error::Corrupted);
        }
        Ok(data)
    }

    /// 任意类型文件的属性；路径上的符号链接（包括末端）都会被跟随
    pub fn stat(&self, path: &str) -> Result<Stat, Error> {
        let (mut node, _) = self.resolve_path(path, &self.root)?;
        let ino = node.ino();
        let inode = node.load(self)?;
        Ok(Stat {
            ino: ino as u64,
            mode: inode.kind(),
            block_size: self.block_size() as u64,
            blocks: inode.blocks as u64,
            size: inode.size as u64,
            nlink: inode.links_count as u32,
        })
    }

    /// 路径所指的完整inode
    pub fn metadata(&self, path: &str) -> Result<Inode, Error> {
        let (mut node, _) = self.resolve_path(path, &self.root)?;
        node.load(self).cloned()
    }
}
