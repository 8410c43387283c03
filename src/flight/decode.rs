//! Decoding of streamed data chunks.
//!
//! Every chunk of a `DoGet` response carries one self-contained Arrow IPC
//! stream in its `data_body`: a schema message followed by zero or more record
//! batches. Chunks never depend on each other, so each one is decoded on its
//! own and only its row count is kept.

use std::io::Cursor;

use arrow_flight::FlightData;
use arrow_ipc::reader::StreamReader;

use crate::flight::error::FlightError;

/// Row and byte totals contributed by a single chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkStats {
    /// Rows decoded from the chunk's IPC payload.
    pub rows: u64,
    /// Raw length of the chunk's `data_body` in bytes.
    pub bytes: u64,
}

/// Decode one chunk and count its rows.
///
/// A chunk with an empty body contributes nothing. Any IPC decode failure is
/// reported as [`FlightError::Stream`].
pub fn decode_chunk(chunk: &FlightData) -> Result<ChunkStats, FlightError> {
    let body = &chunk.data_body;
    if body.is_empty() {
        return Ok(ChunkStats::default());
    }

    let reader = StreamReader::try_new(Cursor::new(body.as_ref()), None).map_err(|e| {
        FlightError::Stream {
            message: format!("failed to decode chunk schema: {e}"),
        }
    })?;

    let mut rows = 0u64;
    for batch in reader {
        let batch = batch.map_err(|e| FlightError::Stream {
            message: format!("failed to decode record batch: {e}"),
        })?;
        rows += batch.num_rows() as u64;
    }

    Ok(ChunkStats {
        rows,
        bytes: body.len() as u64,
    })
}

/// Serialize record batches into a single IPC stream payload.
///
/// This is the encoding [`decode_chunk`] expects inside `data_body`; it is
/// used by tests and by in-process transports.
pub fn encode_ipc_stream(
    batches: &[arrow_array::RecordBatch],
) -> Result<Vec<u8>, arrow_schema::ArrowError> {
    let Some(first) = batches.first() else {
        return Ok(Vec::new());
    };
    let mut writer = arrow_ipc::writer::StreamWriter::try_new(Vec::new(), &first.schema())?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.finish()?;
    writer.into_inner()
}
