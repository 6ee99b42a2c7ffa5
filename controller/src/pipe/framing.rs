//! Bounded line framing shared by both ends of a pipe

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Longest frame accepted, newline excluded
pub const MAX_FRAME_LEN: usize = 64 * 1024;

#[derive(Debug, PartialEq, Eq)]
pub enum FrameRead {
    /// The peer closed the stream
    Eof,
    /// `frame` holds one frame, with its newline if one was read
    Frame,
    /// A frame over [`MAX_FRAME_LEN`] was skipped up to its newline
    Oversized(usize),
}

/// Read the next `\n`-terminated frame into `frame`
pub async fn read_frame<R>(reader: &mut R, frame: &mut Vec<u8>) -> std::io::Result<FrameRead>
where
    R: AsyncBufRead + Unpin,
{
    frame.clear();
    let read = (&mut *reader)
        .take(MAX_FRAME_LEN as u64 + 1)
        .read_until(b'\n', frame)
        .await?;

    if read == 0 {
        return Ok(FrameRead::Eof);
    }
    if frame.ends_with(b"\n") || frame.len() <= MAX_FRAME_LEN {
        return Ok(FrameRead::Frame);
    }

    let mut skipped = frame.len();
    frame.clear();
    loop {
        let buffered = reader.fill_buf().await?;
        if buffered.is_empty() {
            break;
        }
        match buffered.iter().position(|b| *b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                skipped += end + 1;
                break;
            }
            None => {
                let len = buffered.len();
                reader.consume(len);
                skipped += len;
            }
        }
    }
    Ok(FrameRead::Oversized(skipped))
}
