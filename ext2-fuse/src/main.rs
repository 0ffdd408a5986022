mod block_file;
mod cli;

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::Arc;

use block_dev::{BlockDevice, SECTOR_SIZE};
use clap::Parser;
use ext2::Ext2FileSystem;
use typed_bytesize::ByteSizeIec;
use vfs::DirEntryType;
use volume::table::{self, PartitionParams, SizeUnit};
use volume::{Volume, VolumeKind};

pub use self::{
    block_file::BlockFile,
    cli::{Cli, Command, Unit},
};

/// 镜像上卷的基础名
const BASENAME: &str = "disk";

fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    if let Command::Mkpart {
        create_mib: Some(mib),
        ..
    } = cli.command
    {
        let fd = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&cli.image)?;
        fd.set_len(ByteSizeIec::mib(mib).0)?;
    }

    let fd = OpenOptions::new()
        .read(true)
        .write(matches!(cli.command, Command::Mkpart { .. }))
        .open(&cli.image)?;
    let dev: Arc<dyn BlockDevice> = Arc::new(BlockFile::new(fd)?);

    match cli.command {
        Command::Parts => {
            let volumes = volume::enumerate(&dev, BASENAME).map_err(io::Error::other)?;
            for volume in volumes {
                let (start, sectors) = match volume.kind() {
                    VolumeKind::Whole => (0, volume.geometry().total_blocks),
                    VolumeKind::Partition {
                        base_lba,
                        sector_count,
                    } => (base_lba, sector_count),
                };
                let fs = match Ext2FileSystem::mount(volume.clone()) {
                    Ok(fs) => {
                        fs.unmount();
                        "ext2"
                    }
                    Err(_) => "-",
                };
                println!(
                    "{:<8} start={start:<10} sectors={sectors:<10} {:>12} {fs}",
                    volume.name(),
                    ByteSizeIec(sectors as u64 * SECTOR_SIZE as u64).to_string(),
                );
            }
        }

        Command::Mkpart {
            sizes, unit, hidden, ..
        } => {
            let params = PartitionParams {
                sizes,
                unit: match unit {
                    Unit::Sectors => SizeUnit::Sectors,
                    Unit::Percent => SizeUnit::Percent,
                    Unit::Quota => SizeUnit::Quota,
                },
                hidden_sectors: hidden,
            };
            let entries = table::write_table(dev.as_ref(), &params).map_err(io::Error::other)?;
            for (i, entry) in entries.iter().enumerate() {
                println!(
                    "{BASENAME}{i}: start={} sectors={}",
                    entry.start_lba, entry.sector_count
                );
            }
        }

        Command::Info => {
            let fs = mount(&dev, cli.volume.as_deref())?;
            let sb = fs.super_block();
            println!("volume name:   {}", sb.volume_name().escape_ascii());
            println!("revision:      {}", sb.revision());
            println!("block size:    {}", sb.block_size());
            println!("blocks:        {} ({} free)", sb.blocks_count(), sb.free_blocks_count());
            println!("inodes:        {} ({} free)", sb.inodes_count(), sb.free_inodes_count());
            println!("inode size:    {}", sb.inode_size());
            println!("block groups:  {}", sb.group_count());
            println!("incompat:      {:?}", sb.feature_incompat());
            fs.unmount();
        }

        Command::Ls { path } => {
            let fs = mount(&dev, cli.volume.as_deref())?;
            let dir = fs.opendir(&path).map_err(|err| fail(&path, err))?;
            for entry in dir {
                let entry = entry.map_err(|err| fail(&path, err))?;
                println!(
                    "{} {:>8} {:>10} {}",
                    type_char(entry.ty),
                    entry.inode,
                    entry.size,
                    entry.name
                );
            }
        }

        Command::Cat { path } => {
            let fs = mount(&dev, cli.volume.as_deref())?;
            let mut file = fs.open(&path).map_err(|err| fail(&path, err))?;
            let mut stdout = io::stdout().lock();
            let mut buf = vec![0u8; 4096];
            loop {
                let n = file.read(&mut buf).map_err(|err| fail(&path, err))?;
                if n == 0 {
                    break;
                }
                stdout.write_all(&buf[..n])?;
            }
        }

        Command::Stat { path } => {
            let fs = mount(&dev, cli.volume.as_deref())?;
            let stat = fs.stat(&path).map_err(|err| fail(&path, err))?;
            let inode = fs.metadata(&path).map_err(|err| fail(&path, err))?;
            println!("  type: {:?}", stat.mode);
            println!("  mode: {:04o} {:?}", inode.mode & 0o7777, inode.permissions());
            println!("  size: {}", stat.size);
            println!("blocks: {} x 512", stat.blocks);
            println!(" inode: {}", stat.ino);
            println!(" links: {}", stat.nlink);
            println!("   uid: {} gid: {}", inode.uid, inode.gid);
            println!(" mtime: {}", inode.mtime);
        }
    }

    Ok(())
}

/// 在选定的卷上挂载ext2
fn mount(dev: &Arc<dyn BlockDevice>, name: Option<&str>) -> io::Result<Ext2FileSystem> {
    let volumes = volume::enumerate(dev, BASENAME).map_err(io::Error::other)?;
    let volume: Arc<Volume> = match name {
        Some(name) => volumes
            .into_iter()
            .find(|v| v.name() == name)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no volume named {name}")))?,
        None => volumes
            .into_iter()
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no volumes"))?,
    };
    log::info!("mounting {}", volume.name());
    Ext2FileSystem::mount(volume).map_err(io::Error::other)
}

fn fail(path: &str, err: ext2::Error) -> io::Error {
    io::Error::other(format!("{path}: {}", vfs::Error::from(err)))
}

fn type_char(ty: DirEntryType) -> char {
    match ty {
        DirEntryType::Directory => 'd',
        DirEntryType::SymLink => 'l',
        DirEntryType::Char => 'c',
        DirEntryType::Block => 'b',
        DirEntryType::Fifo => 'p',
        DirEntryType::Socket => 's',
        DirEntryType::Regular => '-',
        DirEntryType::Unknown => '?',
    }
}
