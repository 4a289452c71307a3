use hashlink::LinkedHashMap;
use log::trace;

use crate::buffer::{entity::FrameId, replacer::Replacer};

// unpin された順に並べ、先頭 (最も古い) から追い出す
pub struct LruReplacer {
    capacity: usize,
    order: LinkedHashMap<FrameId, ()>,
}

impl LruReplacer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: LinkedHashMap::with_capacity(capacity),
        }
    }
}

impl Replacer for LruReplacer {
    fn victim(&mut self) -> Option<FrameId> {
        let (frame_id, ()) = self.order.pop_front()?;
        trace!("lru victim frame {}", frame_id);
        Some(frame_id)
    }

    fn pin(&mut self, frame_id: FrameId) {
        self.order.remove(&frame_id);
    }

    fn unpin(&mut self, frame_id: FrameId) {
        debug_assert!(frame_id.index() < self.capacity);
        if self.order.contains_key(&frame_id) {
            return;
        }
        self.order.insert(frame_id, ());
    }

    fn size(&self) -> usize {
        self.order.len()
    }

    fn restore(&mut self, frame_id: FrameId) {
        self.unpin(frame_id);
        self.order.to_front(&frame_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn victim_order() {
        let mut replacer = LruReplacer::new(7);
        for i in [1, 2, 3, 4, 5, 6, 1].iter() {
            replacer.unpin(FrameId(*i));
        }
        // unpinning frame 1 again must not count it twice
        assert_eq!(6, replacer.size());

        assert_eq!(Some(FrameId(1)), replacer.victim());
        assert_eq!(Some(FrameId(2)), replacer.victim());
        assert_eq!(Some(FrameId(3)), replacer.victim());

        replacer.pin(FrameId(3));
        replacer.pin(FrameId(4));
        assert_eq!(2, replacer.size());

        replacer.unpin(FrameId(4));
        assert_eq!(Some(FrameId(5)), replacer.victim());
        assert_eq!(Some(FrameId(6)), replacer.victim());
        assert_eq!(Some(FrameId(4)), replacer.victim());
        assert_eq!(None, replacer.victim());
        assert_eq!(0, replacer.size());
    }

    #[test]
    fn pin_untracked_is_noop() {
        let mut replacer = LruReplacer::new(3);
        replacer.pin(FrameId(0));
        assert_eq!(0, replacer.size());
        replacer.unpin(FrameId(2));
        replacer.pin(FrameId(0));
        assert_eq!(1, replacer.size());
        assert_eq!(Some(FrameId(2)), replacer.victim());
    }

    #[test]
    fn repeated_unpin_keeps_original_position() {
        let mut replacer = LruReplacer::new(3);
        replacer.unpin(FrameId(0));
        replacer.unpin(FrameId(1));
        replacer.unpin(FrameId(0));
        assert_eq!(Some(FrameId(0)), replacer.victim());
        assert_eq!(Some(FrameId(1)), replacer.victim());
    }

    #[test]
    fn restored_victim_stays_stalest() {
        let mut replacer = LruReplacer::new(3);
        for i in [0, 1, 2].iter() {
            replacer.unpin(FrameId(*i));
        }
        let victim = replacer.victim().unwrap();
        assert_eq!(FrameId(0), victim);
        replacer.restore(victim);
        assert_eq!(3, replacer.size());
        assert_eq!(Some(FrameId(0)), replacer.victim());
        assert_eq!(Some(FrameId(1)), replacer.victim());
    }
}
