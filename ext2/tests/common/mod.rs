//! 在内存中构造ext2镜像

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use block_dev::{BlockDevice, MemDisk};
use ext2::Ext2FileSystem;

pub const ROOT: u32 = 2;

pub const S_IFIFO: u16 = 0o010000;
pub const S_IFCHR: u16 = 0o020000;
pub const S_IFDIR: u16 = 0o040000;
pub const S_IFREG: u16 = 0o100000;
pub const S_IFLNK: u16 = 0o120000;

pub const TAG_REGULAR: u8 = 1;
pub const TAG_DIRECTORY: u8 = 2;
pub const TAG_CHAR: u8 = 3;
pub const TAG_FIFO: u8 = 5;
pub const TAG_SYMLINK: u8 = 7;

const FIRST_INO: u32 = 11;

#[derive(Debug, Clone)]
pub struct Options {
    pub block_size: usize,
    pub total_blocks: u32,
    pub inode_size: usize,
    pub inodes_per_group: u32,
    /// 默认按每组`8 * block_size`块推算
    pub groups: Option<u32>,
    /// 目录项是否记录文件类型
    pub file_types: bool,
    pub revision: u32,
    /// 额外置位的不兼容特性
    pub incompat: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            block_size: 1024,
            total_blocks: 4096,
            inode_size: 128,
            inodes_per_group: 64,
            groups: None,
            file_types: true,
            revision: 1,
            incompat: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct Child {
    /// 0表示已删除
    ino: u32,
    /// 空名字表示填充记录
    name: Vec<u8>,
    tag: u8,
}

#[derive(Debug, Clone)]
struct Record {
    mode: u16,
    size: u32,
    links: u16,
    block: [u32; 15],
    sectors: u32,
    parent: u32,
    children: Option<Vec<Child>>,
}

impl Record {
    fn new(mode: u16, parent: u32) -> Self {
        Self {
            mode,
            size: 0,
            links: 1,
            block: [0; 15],
            sectors: 0,
            parent,
            children: (mode & 0o170000 == S_IFDIR).then(Vec::new),
        }
    }
}

pub struct ImageBuilder {
    opts: Options,
    groups: u32,
    first_data_block: u32,
    inode_tables: Vec<u32>,
    image: Vec<u8>,
    next_block: u32,
    next_ino: u32,
    records: BTreeMap<u32, Record>,
}

impl ImageBuilder {
    pub fn new(opts: Options) -> Self {
        let bs = opts.block_size;
        let groups = opts
            .groups
            .unwrap_or_else(|| opts.total_blocks.div_ceil(8 * bs as u32));
        let first_data_block = if bs == 1024 { 1 } else { 0 };
        let gdt_blocks = (groups as usize * 32).div_ceil(bs) as u32;
        let table_blocks = (opts.inodes_per_group as usize * opts.inode_size).div_ceil(bs) as u32;

        let tables_start = first_data_block + 1 + gdt_blocks;
        let inode_tables = (0..groups).map(|g| tables_start + g * table_blocks).collect();
        let next_block = tables_start + groups * table_blocks;
        assert!(next_block < opts.total_blocks, "image too small for metadata");

        let mut records = BTreeMap::new();
        let mut root = Record::new(S_IFDIR | 0o755, ROOT);
        root.links = 2;
        records.insert(ROOT, root);

        Self {
            image: vec![0; opts.total_blocks as usize * bs],
            opts,
            groups,
            first_data_block,
            inode_tables,
            next_block,
            next_ino: FIRST_INO,
            records,
        }
    }

    pub fn block_size(&self) -> usize {
        self.opts.block_size
    }

    pub fn inode_table(&self, group: u32) -> u32 {
        self.inode_tables[group as usize]
    }

    pub fn inodes_count(&self) -> u32 {
        self.groups * self.opts.inodes_per_group
    }

    fn alloc_block(&mut self) -> u32 {
        let block = self.next_block;
        assert!(block < self.opts.total_blocks, "image out of blocks");
        self.next_block += 1;
        block
    }

    fn alloc_ino(&mut self) -> u32 {
        let ino = self.next_ino;
        assert!(ino <= self.inodes_count(), "image out of inodes");
        self.next_ino += 1;
        ino
    }

    fn write(&mut self, block: u32, offset: usize, data: &[u8]) {
        let start = block as usize * self.opts.block_size + offset;
        self.image[start..start + data.len()].copy_from_slice(data);
    }

    fn read_u32(&self, block: u32, offset: usize) -> u32 {
        let start = block as usize * self.opts.block_size + offset;
        u32::from_le_bytes(self.image[start..start + 4].try_into().unwrap())
    }

    fn tag(&self, tag: u8) -> u8 {
        if self.opts.file_types { tag } else { 0 }
    }

    fn add_child(&mut self, parent: u32, ino: u32, name: &[u8], tag: u8) {
        let tag = self.tag(tag);
        self.records
            .get_mut(&parent)
            .and_then(|r| r.children.as_mut())
            .expect("parent must be a directory")
            .push(Child {
                ino,
                name: name.to_vec(),
                tag,
            });
    }

    /// 为记录分配新块并挂到第`index`个逻辑块上
    fn map_block(&mut self, ino: u32, index: u32) -> u32 {
        let per = (self.opts.block_size / 4) as u32;
        let sectors = (self.opts.block_size / 512) as u32;
        let phys = self.alloc_block();
        let mut rec = self.records.remove(&ino).unwrap();
        rec.sectors += sectors;

        if index < 12 {
            rec.block[index as usize] = phys;
        } else if index - 12 < per {
            let slot = index - 12;
            if rec.block[12] == 0 {
                rec.block[12] = self.alloc_block();
                rec.sectors += sectors;
            }
            self.write(rec.block[12], slot as usize * 4, &phys.to_le_bytes());
        } else if index - 12 - per < per * per {
            let slot = index - 12 - per;
            if rec.block[13] == 0 {
                rec.block[13] = self.alloc_block();
                rec.sectors += sectors;
            }
            let top = (slot / per) as usize * 4;
            let mut middle = self.read_u32(rec.block[13], top);
            if middle == 0 {
                middle = self.alloc_block();
                rec.sectors += sectors;
                self.write(rec.block[13], top, &middle.to_le_bytes());
            }
            self.write(middle, (slot % per) as usize * 4, &phys.to_le_bytes());
        } else {
            panic!("triple indirect mapping is not built");
        }

        self.records.insert(ino, rec);
        phys
    }

    fn new_inode(&mut self, parent: u32, name: &[u8], mode: u16, tag: u8) -> u32 {
        let ino = self.alloc_ino();
        self.records.insert(ino, Record::new(mode, parent));
        self.add_child(parent, ino, name, tag);
        ino
    }

    pub fn mkdir(&mut self, parent: u32, name: &str) -> u32 {
        let ino = self.new_inode(parent, name.as_bytes(), S_IFDIR | 0o755, TAG_DIRECTORY);
        self.records.get_mut(&ino).unwrap().links = 2;
        self.records.get_mut(&parent).unwrap().links += 1;
        ino
    }

    pub fn file(&mut self, parent: u32, name: &str, data: &[u8]) -> u32 {
        let bs = self.opts.block_size;
        let chunks: Vec<(u32, &[u8])> = data
            .chunks(bs)
            .enumerate()
            .map(|(i, chunk)| (i as u32, chunk))
            .collect();
        self.sparse_file(parent, name, data.len() as u32, &chunks)
    }

    /// 只有列出的逻辑块有数据，其余都是空洞
    pub fn sparse_file(&mut self, parent: u32, name: &str, size: u32, blocks: &[(u32, &[u8])]) -> u32 {
        let ino = self.new_inode(parent, name.as_bytes(), S_IFREG | 0o644, TAG_REGULAR);
        self.fill(ino, size, blocks);
        ino
    }

    fn fill(&mut self, ino: u32, size: u32, blocks: &[(u32, &[u8])]) {
        for &(index, content) in blocks {
            assert!(content.len() <= self.opts.block_size);
            let phys = self.map_block(ino, index);
            self.write(phys, 0, content);
        }
        self.records.get_mut(&ino).unwrap().size = size;
    }

    pub fn symlink(&mut self, parent: u32, name: &str, target: &str) -> u32 {
        let ino = self.new_inode(parent, name.as_bytes(), S_IFLNK | 0o777, TAG_SYMLINK);
        let target = target.as_bytes();
        if target.len() <= 60 {
            let mut inline = [0u8; 60];
            inline[..target.len()].copy_from_slice(target);
            let rec = self.records.get_mut(&ino).unwrap();
            for (word, bytes) in rec.block.iter_mut().zip(inline.chunks_exact(4)) {
                *word = u32::from_le_bytes(bytes.try_into().unwrap());
            }
            rec.size = target.len() as u32;
        } else {
            let bs = self.opts.block_size;
            let chunks: Vec<(u32, &[u8])> = target
                .chunks(bs)
                .enumerate()
                .map(|(i, chunk)| (i as u32, chunk))
                .collect();
            self.fill(ino, target.len() as u32, &chunks);
        }
        ino
    }

    /// 无数据的特殊文件，如FIFO、字符设备
    pub fn special(&mut self, parent: u32, name: &str, file_type: u16, tag: u8) -> u32 {
        self.new_inode(parent, name.as_bytes(), file_type | 0o600, tag)
    }

    /// 再建一条指向`ino`的目录项
    pub fn link(&mut self, parent: u32, name: &str, ino: u32, tag: u8) {
        self.add_child(parent, ino, name.as_bytes(), tag);
        self.records.get_mut(&ino).unwrap().links += 1;
    }

    pub fn padding(&mut self, parent: u32) {
        self.add_child(parent, 0, b"", 0);
    }

    pub fn deleted(&mut self, parent: u32, name: &str) {
        self.add_child(parent, 0, name.as_bytes(), TAG_REGULAR);
    }

    fn write_dirs(&mut self) {
        let bs = self.opts.block_size;
        let dirs: Vec<u32> = self
            .records
            .iter()
            .filter(|(_, r)| r.children.is_some())
            .map(|(&ino, _)| ino)
            .collect();

        for ino in dirs {
            let rec = &self.records[&ino];
            let mut entries = vec![
                Child {
                    ino,
                    name: b".".to_vec(),
                    tag: self.tag(TAG_DIRECTORY),
                },
                Child {
                    ino: rec.parent,
                    name: b"..".to_vec(),
                    tag: self.tag(TAG_DIRECTORY),
                },
            ];
            entries.extend(rec.children.clone().unwrap());

            // 按块分组，每块最后一项延伸到块尾
            let mut blocks: Vec<Vec<u8>> = vec![Vec::new()];
            let mut last_start = 0;
            for entry in &entries {
                let rec_len = (8 + entry.name.len()).next_multiple_of(4).max(12);
                if blocks.last().unwrap().len() + rec_len > bs {
                    let block = blocks.last_mut().unwrap();
                    stretch(block, last_start, bs);
                    blocks.push(Vec::new());
                }
                let block = blocks.last_mut().unwrap();
                last_start = block.len();
                block.extend_from_slice(&entry.ino.to_le_bytes());
                block.extend_from_slice(&(rec_len as u16).to_le_bytes());
                block.push(entry.name.len() as u8);
                block.push(entry.tag);
                block.extend_from_slice(&entry.name);
                block.resize(last_start + rec_len, 0);
            }
            stretch(blocks.last_mut().unwrap(), last_start, bs);

            for (index, content) in blocks.iter().enumerate() {
                let phys = self.map_block(ino, index as u32);
                self.write(phys, 0, content);
            }
            self.records.get_mut(&ino).unwrap().size = (blocks.len() * bs) as u32;
        }
    }

    fn write_super_block(&mut self) {
        let opts = &self.opts;
        let mut sb = [0u8; 1024];
        let mut put32 = |offset: usize, value: u32| sb[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        put32(0, self.groups * opts.inodes_per_group);
        put32(4, opts.total_blocks);
        put32(12, opts.total_blocks - self.next_block);
        put32(16, self.groups * opts.inodes_per_group - (self.next_ino - 1));
        put32(20, self.first_data_block);
        put32(24, (opts.block_size / 1024).trailing_zeros());
        put32(28, (opts.block_size / 1024).trailing_zeros());
        put32(32, 8 * opts.block_size as u32);
        put32(36, 8 * opts.block_size as u32);
        put32(40, opts.inodes_per_group);
        put32(76, opts.revision);
        let incompat = if opts.file_types { 0x2 } else { 0 } | opts.incompat;
        if opts.revision > 0 {
            put32(84, FIRST_INO);
            put32(96, incompat);
        }
        sb[56..58].copy_from_slice(&0xEF53u16.to_le_bytes());
        sb[58..60].copy_from_slice(&1u16.to_le_bytes());
        if opts.revision > 0 {
            sb[88..90].copy_from_slice(&(opts.inode_size as u16).to_le_bytes());
        }
        sb[120..128].copy_from_slice(b"testvol\0");

        self.image[1024..2048].copy_from_slice(&sb);
    }

    fn write_group_descriptors(&mut self) {
        let gdt = self.first_data_block + 1;
        for group in 0..self.groups {
            let mut desc = [0u8; 32];
            desc[8..12].copy_from_slice(&self.inode_tables[group as usize].to_le_bytes());
            self.write(gdt, group as usize * 32, &desc);
        }
    }

    fn write_inodes(&mut self) {
        let ipg = self.opts.inodes_per_group;
        let inode_size = self.opts.inode_size;
        let bs = self.opts.block_size;
        let records: Vec<(u32, Record)> = self.records.iter().map(|(&i, r)| (i, r.clone())).collect();

        for (ino, rec) in records {
            let group = (ino - 1) / ipg;
            let slot = ((ino - 1) % ipg) as usize;
            let offset = self.inode_tables[group as usize] as usize * bs + slot * inode_size;

            let mut raw = [0u8; 128];
            raw[0..2].copy_from_slice(&rec.mode.to_le_bytes());
            raw[4..8].copy_from_slice(&rec.size.to_le_bytes());
            raw[26..28].copy_from_slice(&rec.links.to_le_bytes());
            raw[28..32].copy_from_slice(&rec.sectors.to_le_bytes());
            for (i, block) in rec.block.iter().enumerate() {
                raw[40 + i * 4..44 + i * 4].copy_from_slice(&block.to_le_bytes());
            }
            self.image[offset..offset + 128].copy_from_slice(&raw);
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.write_dirs();
        self.write_inodes();
        self.write_group_descriptors();
        self.write_super_block();
        self.image
    }
}

fn stretch(block: &mut Vec<u8>, last_start: usize, bs: usize) {
    let rec_len = (bs - last_start) as u16;
    block[last_start + 4..last_start + 6].copy_from_slice(&rec_len.to_le_bytes());
    block.resize(bs, 0);
}

pub fn disk(image: Vec<u8>) -> Arc<MemDisk> {
    Arc::new(MemDisk::from_image(image))
}

pub fn mount(disk: &Arc<MemDisk>) -> Ext2FileSystem {
    let dev: Arc<dyn BlockDevice> = disk.clone();
    Ext2FileSystem::mount(dev).unwrap()
}

/// 根目录下`/dir/file.txt`与`/dir/link -> file.txt`
pub fn hello_image(opts: Options) -> Vec<u8> {
    let mut b = ImageBuilder::new(opts);
    let dir = b.mkdir(ROOT, "dir");
    b.file(dir, "file.txt", b"hello world\n");
    b.symlink(dir, "link", "file.txt");
    b.finish()
}

/// 可预测的内容，便于校验任意偏移
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i % 253) as u8 ^ seed).collect()
}
