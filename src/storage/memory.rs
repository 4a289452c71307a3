use std::collections::HashMap;
use std::io::{Error, ErrorKind, Result};

use super::entity::{Page, PageId, PAGE_SIZE};
use super::manager::StorageManager;

pub struct MemoryManager {
    // 採番するページを決めるカウンタ
    next_page_id: u64,
    // 書かれたページだけを持つ疎なヒープ
    heap: HashMap<PageId, Box<Page>>,
    // 解放済みで再利用を待つページID
    free_page_ids: Vec<PageId>,
}

impl MemoryManager {
    pub fn new() -> Self {
        Self {
            next_page_id: 0,
            heap: HashMap::new(),
            free_page_ids: vec![],
        }
    }

    fn ensure_page(&mut self, page_id: PageId) -> &mut Page {
        self.heap
            .entry(page_id)
            .or_insert_with(|| Box::new([0; PAGE_SIZE]))
    }
}

impl Default for MemoryManager {
    fn default() -> Self {
        Self::new()
    }
}

fn check_page(page_id: PageId, len: usize) -> Result<()> {
    if !page_id.is_valid() {
        return Err(Error::new(ErrorKind::InvalidInput, "invalid page id"));
    }
    if len != PAGE_SIZE {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("buffer must be {} bytes, got {}", PAGE_SIZE, len),
        ));
    }
    Ok(())
}

impl StorageManager for MemoryManager {
    fn allocate_page(&mut self) -> PageId {
        if let Some(page_id) = self.free_page_ids.pop() {
            return page_id;
        }
        // 直接書き込まれたIDは飛ばす
        while self.heap.contains_key(&PageId(self.next_page_id)) {
            self.next_page_id += 1;
        }
        let page_id = PageId(self.next_page_id);
        self.next_page_id += 1;
        self.ensure_page(page_id);
        page_id
    }
    fn deallocate_page(&mut self, page_id: PageId) -> Result<()> {
        if self.free_page_ids.contains(&page_id) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("page {} is already deallocated", page_id),
            ));
        }
        let page = self.heap.get_mut(&page_id).ok_or_else(|| {
            Error::new(
                ErrorKind::NotFound,
                format!("page {} was never allocated", page_id),
            )
        })?;
        page.fill(0);
        self.free_page_ids.push(page_id);
        Ok(())
    }
    fn read_page_data(&mut self, page_id: PageId, data: &mut [u8]) -> Result<()> {
        check_page(page_id, data.len())?;
        match self.heap.get(&page_id) {
            Some(page) => data.copy_from_slice(&page[..]),
            // 一度も書かれていないページはゼロ埋め
            None => data.fill(0),
        }
        Ok(())
    }
    fn write_page_data(&mut self, page_id: PageId, data: &[u8]) -> Result<()> {
        check_page(page_id, data.len())?;
        self.ensure_page(page_id).copy_from_slice(data);
        Ok(())
    }
    fn sync(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test() {
        let mut memory = MemoryManager::new();
        let mut hello = Vec::with_capacity(PAGE_SIZE);
        hello.extend_from_slice(b"hello");
        hello.resize(PAGE_SIZE, 0);
        let hello_page_id = memory.allocate_page();
        memory.write_page_data(hello_page_id, &hello).unwrap();
        let mut world = Vec::with_capacity(PAGE_SIZE);
        world.extend_from_slice(b"world");
        world.resize(PAGE_SIZE, 0);
        let world_page_id = memory.allocate_page();
        memory.write_page_data(world_page_id, &world).unwrap();

        let mut buf = vec![0; PAGE_SIZE];
        memory.read_page_data(hello_page_id, &mut buf).unwrap();
        assert_eq!(hello, buf);
        memory.read_page_data(world_page_id, &mut buf).unwrap();
        assert_eq!(world, buf);
    }

    #[test]
    fn unwritten_page_reads_zeros() {
        let mut memory = MemoryManager::new();
        let mut buf = vec![0xffu8; PAGE_SIZE];
        memory.read_page_data(PageId(7), &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn deallocated_page_is_reused() {
        let mut memory = MemoryManager::new();
        let p0 = memory.allocate_page();
        let p1 = memory.allocate_page();
        assert_eq!((PageId(0), PageId(1)), (p0, p1));

        memory.write_page_data(p0, &[9u8; PAGE_SIZE]).unwrap();
        memory.deallocate_page(p0).unwrap();
        assert!(memory.deallocate_page(p0).is_err());
        assert!(memory.deallocate_page(PageId(10)).is_err());

        assert_eq!(p0, memory.allocate_page());
        let mut buf = vec![0xffu8; PAGE_SIZE];
        memory.read_page_data(p0, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
        assert_eq!(PageId(2), memory.allocate_page());
    }

    #[test]
    fn rejects_short_buffer() {
        let mut memory = MemoryManager::new();
        let page_id = memory.allocate_page();
        let mut buf = vec![0u8; 16];
        assert!(memory.read_page_data(page_id, &mut buf).is_err());
        assert!(memory.write_page_data(page_id, &buf).is_err());
    }

    #[test]
    fn far_page_id_is_stored_sparsely() {
        let mut memory = MemoryManager::new();
        let far = PageId(u64::MAX - 1);
        let mut data = vec![0u8; PAGE_SIZE];
        data[..3].copy_from_slice(b"far");
        memory.write_page_data(far, &data).unwrap();
        assert_eq!(1, memory.heap.len());

        let mut buf = vec![0u8; PAGE_SIZE];
        memory.read_page_data(far, &mut buf).unwrap();
        assert_eq!(data, buf);

        // 採番は直接書かれたIDに引きずられない
        assert_eq!(PageId(0), memory.allocate_page());
        memory.deallocate_page(far).unwrap();
        assert!(memory.deallocate_page(far).is_err());
        assert!(memory.write_page_data(PageId::INVALID_PAGE_ID, &data).is_err());
    }

    #[test]
    fn allocation_skips_written_ids() {
        let mut memory = MemoryManager::new();
        memory.write_page_data(PageId(1), &[7u8; PAGE_SIZE]).unwrap();
        assert_eq!(PageId(0), memory.allocate_page());
        assert_eq!(PageId(2), memory.allocate_page());
        let mut buf = vec![0u8; PAGE_SIZE];
        memory.read_page_data(PageId(1), &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 7));
    }
}
