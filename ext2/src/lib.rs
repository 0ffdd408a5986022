//! # 只读ext2文件系统
//!
//! 自上而下：
//!
//! 1. 会话层：[`Ext2FileSystem`]（挂载）、[`FileHandle`]、[`DirHandle`]
//! 2. 路径层：目录遍历、路径解析、符号链接跟随
//! 3. 索引节点层：块组、inode、逻辑块到物理块的映射
//! 4. 磁盘数据结构层：超级块、块组描述符、inode、目录项
//! 5. 设备读取层：按扇区+偏移读取字节，以及间接块缓存
//!
//! 引擎从不写盘，也不支持三级间接块、extent与日志。

#![no_std]

extern crate alloc;

mod block;
mod cache;
pub mod config;
mod dev;
mod dir;
mod error;
mod file;
mod fs;
pub mod layout;
mod node;
mod path;

pub use self::{
    block::{BlockId, SectorId},
    cache::{BlockMapCache, DevReadCache},
    config::Config,
    dev::devread,
    dir::DirHandle,
    error::Error,
    file::{FileHandle, SeekFrom},
    fs::Ext2FileSystem,
    layout::{BlockPointers, Inode, Permission},
    node::Ext2Node,
};
