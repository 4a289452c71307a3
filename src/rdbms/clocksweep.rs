use log::trace;

use crate::buffer::{entity::FrameId, replacer::Replacer};

#[derive(Debug, Default, Clone, Copy)]
struct Slot {
    evictable: bool,
    usage_count: u64,
}

// unpin 後、時計の針が一周するまでは追い出さない
pub struct ClockReplacer {
    slots: Vec<Slot>,
    next_victim_id: FrameId,
    size: usize,
}

impl ClockReplacer {
    pub fn new(pool_size: usize) -> Self {
        let mut slots = vec![];
        slots.resize_with(pool_size, Default::default);
        Self {
            slots,
            next_victim_id: FrameId::default(),
            size: 0,
        }
    }

    fn slot_mut(&mut self, frame_id: FrameId) -> &mut Slot {
        &mut self.slots[frame_id.0]
    }

    fn increment_id(&self, frame_id: FrameId) -> FrameId {
        FrameId((frame_id.0 + 1) % self.slots.len())
    }
}

impl Replacer for ClockReplacer {
    // Clock-sweep
    fn victim(&mut self) -> Option<FrameId> {
        if self.size == 0 {
            return None;
        }
        let victim_id = loop {
            let next_victim_id = self.next_victim_id;
            let slot = self.slot_mut(next_victim_id);
            if slot.evictable {
                if slot.usage_count == 0 {
                    break next_victim_id;
                }
                slot.usage_count -= 1;
            }
            self.next_victim_id = self.increment_id(next_victim_id);
        };
        self.slot_mut(victim_id).evictable = false;
        self.size -= 1;
        self.next_victim_id = self.increment_id(victim_id);
        trace!("clock victim frame {}", victim_id);
        Some(victim_id)
    }

    fn pin(&mut self, frame_id: FrameId) {
        let slot = self.slot_mut(frame_id);
        if slot.evictable {
            slot.evictable = false;
            self.size -= 1;
        }
    }

    fn unpin(&mut self, frame_id: FrameId) {
        let slot = self.slot_mut(frame_id);
        if !slot.evictable {
            slot.evictable = true;
            slot.usage_count = 1;
            self.size += 1;
        }
    }

    fn size(&self) -> usize {
        self.size
    }

    // 針を戻し、次の sweep で真っ先に選ばれるようにする
    fn restore(&mut self, frame_id: FrameId) {
        self.unpin(frame_id);
        self.slot_mut(frame_id).usage_count = 0;
        self.next_victim_id = frame_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_skips_untracked_frames() {
        let mut replacer = ClockReplacer::new(4);
        assert_eq!(None, replacer.victim());

        replacer.unpin(FrameId(2));
        replacer.unpin(FrameId(1));
        replacer.unpin(FrameId(1));
        assert_eq!(2, replacer.size());

        // both frames get their second chance, then the hand comes back to 1
        assert_eq!(Some(FrameId(1)), replacer.victim());
        assert_eq!(Some(FrameId(2)), replacer.victim());
        assert_eq!(None, replacer.victim());
    }

    #[test]
    fn pinned_frame_is_never_victim() {
        let mut replacer = ClockReplacer::new(3);
        replacer.unpin(FrameId(0));
        replacer.unpin(FrameId(1));
        replacer.pin(FrameId(0));
        replacer.pin(FrameId(0));
        assert_eq!(1, replacer.size());
        assert_eq!(Some(FrameId(1)), replacer.victim());
        assert_eq!(None, replacer.victim());
    }

    #[test]
    fn restored_victim_is_chosen_first() {
        let mut replacer = ClockReplacer::new(3);
        replacer.unpin(FrameId(0));
        replacer.unpin(FrameId(1));
        let victim = replacer.victim().unwrap();
        assert_eq!(FrameId(0), victim);
        replacer.restore(victim);
        assert_eq!(2, replacer.size());
        assert_eq!(Some(FrameId(0)), replacer.victim());
        assert_eq!(Some(FrameId(1)), replacer.victim());
    }
}
