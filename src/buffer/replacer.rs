use super::entity::FrameId;

// unpin 済みフレームの追い出し方針。ページの中身や常駐は関知しない
pub trait Replacer {
    // 追い出し対象のフレームを選び、追跡から外して返す
    fn victim(&mut self) -> Option<FrameId>;
    // フレームを追い出し候補から外す (未追跡なら何もしない)
    fn pin(&mut self, frame_id: FrameId);
    // フレームを追い出し候補に加える (追跡済みなら何もしない)
    fn unpin(&mut self, frame_id: FrameId);
    // 追い出し候補の数
    fn size(&self) -> usize;
    // victim で返したが追い出せなかったフレームを最も古い候補として戻す
    fn restore(&mut self, frame_id: FrameId) {
        self.unpin(frame_id);
    }
}
