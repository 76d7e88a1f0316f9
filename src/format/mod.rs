use crate::Result;

/// MPEG-2 transport stream demuxing
pub mod ts;

pub use self::ts::DemuxOutput;

/// Common trait for segment demuxers fed from an async source
#[async_trait::async_trait]
pub trait SegmentDemuxer: Send {
    /// Demux one whole segment, reading the source to its end
    async fn demux_segment(
        &mut self,
        time_offset: f64,
        contiguous: bool,
        accurate_time_offset: bool,
    ) -> Result<DemuxOutput>;
}

pub use self::ts::{TSDemuxer, TSSegmentReader};
