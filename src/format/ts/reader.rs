use super::demuxer::{DemuxOutput, TSDemuxer};
use super::types::TS_PACKET_SIZE;
use crate::format::SegmentDemuxer;
use crate::Result;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Feeds a [`TSDemuxer`] from an async byte source, one chunk per `append`.
pub struct TSSegmentReader<R: AsyncRead + Unpin + Send> {
    reader: R,
    demuxer: TSDemuxer,
    chunk_size: usize,
}

impl<R: AsyncRead + Unpin + Send> TSSegmentReader<R> {
    pub fn new(reader: R, demuxer: TSDemuxer) -> Self {
        let chunk_size = demuxer.config().read_chunk_size.max(TS_PACKET_SIZE);
        Self {
            reader,
            demuxer,
            chunk_size,
        }
    }

    pub fn demuxer_mut(&mut self) -> &mut TSDemuxer {
        &mut self.demuxer
    }

    pub fn into_inner(self) -> (R, TSDemuxer) {
        (self.reader, self.demuxer)
    }

    async fn read_chunk(&mut self) -> Result<Option<BytesMut>> {
        let mut chunk = BytesMut::with_capacity(self.chunk_size);
        let n = self.reader.read_buf(&mut chunk).await?;
        Ok((n > 0).then_some(chunk))
    }
}

#[async_trait::async_trait]
impl<R: AsyncRead + Unpin + Send> SegmentDemuxer for TSSegmentReader<R> {
    async fn demux_segment(
        &mut self,
        time_offset: f64,
        contiguous: bool,
        accurate_time_offset: bool,
    ) -> Result<DemuxOutput> {
        let mut merged: Option<DemuxOutput> = None;
        let mut contiguous = contiguous;

        while let Some(chunk) = self.read_chunk().await? {
            let output =
                self.demuxer
                    .append(chunk.freeze(), time_offset, contiguous, accurate_time_offset)?;
            // later chunks continue the same segment
            contiguous = true;
            match merged.as_mut() {
                Some(merged) => merged.merge(output),
                None => merged = Some(output),
            }
        }

        let last = self.demuxer.flush()?;
        Ok(match merged {
            Some(mut merged) => {
                merged.merge(last);
                merged
            }
            None => last,
        })
    }
}
