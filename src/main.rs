use std::env;

use anyhow::Result;
use log::info;

use bufpool::buffer::manager::BufferPoolManager;
use bufpool::config::Config;
use bufpool::rdbms::{disk::DiskManager, pool::PoolManager};

fn main() -> Result<()> {
    env_logger::init();

    // config
    let config = match env::args().nth(1) {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let disk = DiskManager::open(&config.heap_file)?;
    let bufmgr = PoolManager::from_config(disk, &config)?;

    // フレーム数より多くのページを書いて追い出しを起こす
    let count = config.pool_size + 1;
    let mut page_ids = Vec::with_capacity(count);
    for i in 0..count {
        let (page_id, buffer) = bufmgr.create_page()?;
        let message = format!("page #{}", i);
        buffer.write()[..message.len()].copy_from_slice(message.as_bytes());
        drop(buffer);
        bufmgr.unpin_page(page_id, true)?;
        page_ids.push(page_id);
    }

    for page_id in &page_ids {
        let buffer = bufmgr.fetch_page(*page_id)?;
        {
            let page = buffer.read();
            let end = page.iter().position(|&b| b == 0).unwrap_or(page.len());
            println!("{}: {}", page_id, String::from_utf8_lossy(&page[..end]));
        }
        bufmgr.unpin_page(*page_id, false)?;
    }

    bufmgr.flush_all_pages()?;
    info!("{:?}", bufmgr.stats());
    Ok(())
}
