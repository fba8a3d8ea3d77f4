use std::io::{Read, Write};

use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};

use crate::varwidth::{max_value, read_uint, read_uint_or_eof, write_uint};

use super::{
    BatchContext, BatchElement, BatchType, CachedTx, DecodeError, EncodeError, group_elements,
};

/// Width of the `should_start_at_element` header field.
pub const SHOULD_START_AT_ELEMENT_SIZE: usize = 5;
/// Width of the `total_elements_to_append` header field.
pub const TOTAL_ELEMENTS_TO_APPEND_SIZE: usize = 3;
/// Width of the context count header field.
pub const NUM_CONTEXTS_SIZE: usize = 3;
/// Width of each transaction length prefix.
pub const TX_LEN_SIZE: usize = 3;
/// Size of the fixed batch header.
pub const BATCH_HEADER_SIZE: usize =
    SHOULD_START_AT_ELEMENT_SIZE + TOTAL_ELEMENTS_TO_APPEND_SIZE + NUM_CONTEXTS_SIZE;

/// The payload of an `appendSequencerBatch` call.
///
/// ```text
/// should_start_at_element  : 5
/// total_elements_to_append : 3
/// num_contexts             : 3
/// contexts                 : 16 * num_contexts
/// (tx_len : 3, tx : tx_len)* until end of stream
/// ```
///
/// Non-legacy batches prepend a marker context, which is counted in `num_contexts`, and
/// write the transaction section in the encoding the marker designates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendSequencerBatchParams {
    /// The CTC index of the first element, minus the block offset.
    pub should_start_at_element: u64,
    /// Number of sequencer and queued elements in the batch.
    pub total_elements_to_append: u64,
    /// The batch contexts, without any marker.
    pub contexts: Vec<BatchContext>,
    /// The sequencer transactions, aligned with the contexts.
    pub txs: Vec<CachedTx>,
}

impl AppendSequencerBatchParams {
    /// Groups `elements` into a batch starting at `should_start_at_element`.
    pub fn from_elements(
        should_start_at_element: u64,
        elements: &[BatchElement],
    ) -> Result<Self, EncodeError> {
        let (contexts, txs) = group_elements(elements)?;
        Ok(Self {
            should_start_at_element,
            total_elements_to_append: elements.len() as u64,
            contexts,
            txs,
        })
    }

    /// Writes the batch to `w` using the given encoding.
    pub fn write<W: Write + ?Sized>(
        &self,
        w: &mut W,
        batch_type: BatchType,
    ) -> Result<(), EncodeError> {
        if self.contexts.is_empty() && !self.txs.is_empty() {
            return Err(EncodeError::TxsWithoutContexts(self.txs.len()));
        }

        let expected: u64 = self.contexts.iter().map(|ctx| ctx.num_sequenced_txs).sum();
        if expected != self.txs.len() as u64 {
            return Err(EncodeError::TxCountMismatch { expected, actual: self.txs.len() });
        }

        let contexts: Vec<_> = batch_type.marker_context().into_iter().chain(self.contexts.iter().copied()).collect();

        write_checked(w, "should_start_at_element", self.should_start_at_element, SHOULD_START_AT_ELEMENT_SIZE)?;
        write_checked(w, "total_elements_to_append", self.total_elements_to_append, TOTAL_ELEMENTS_TO_APPEND_SIZE)?;
        write_checked(w, "num_contexts", contexts.len() as u64, NUM_CONTEXTS_SIZE)?;

        for ctx in &contexts {
            check_context(ctx)?;
            ctx.write(w)?;
        }

        match batch_type {
            BatchType::Legacy => write_txs(w, &self.txs)?,
            BatchType::Zlib => {
                let mut zw = ZlibEncoder::new(&mut *w, Compression::default());
                write_txs(&mut zw, &self.txs)?;
                zw.finish()?;
            }
        }

        Ok(())
    }

    /// Encodes the batch into a new buffer.
    pub fn encode(&self, batch_type: BatchType) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::with_capacity(self.plaintext_size_hint());
        self.write(&mut buf, batch_type)?;
        Ok(buf)
    }

    /// Reads a batch from `r`, returning it along with the encoding it was written in.
    ///
    /// The transaction section is consumed until the stream ends cleanly at a length
    /// prefix boundary.
    pub fn read<R: Read + ?Sized>(r: &mut R) -> Result<(Self, BatchType), DecodeError> {
        let should_start_at_element = read_uint(r, SHOULD_START_AT_ELEMENT_SIZE)?;
        let total_elements_to_append = read_uint(r, TOTAL_ELEMENTS_TO_APPEND_SIZE)?;
        let num_contexts = read_uint(r, NUM_CONTEXTS_SIZE)?;

        let mut contexts = Vec::new();
        for _ in 0..num_contexts {
            contexts.push(BatchContext::read(r)?);
        }

        let mut batch_type = BatchType::Legacy;
        if contexts.first().is_some_and(BatchContext::is_marker) {
            batch_type = BatchType::from_marker(&contexts.remove(0));
        }

        let txs = match batch_type {
            BatchType::Legacy => read_txs(r)?,
            BatchType::Zlib => read_txs(&mut ZlibDecoder::new(r))?,
        };

        if contexts.is_empty() && !txs.is_empty() {
            return Err(DecodeError::Malformed("transactions without contexts"));
        }
        let expected: u64 = contexts.iter().map(|ctx| ctx.num_sequenced_txs).sum();
        if expected != txs.len() as u64 {
            return Err(DecodeError::Malformed("transaction count does not match contexts"));
        }

        let params =
            Self { should_start_at_element, total_elements_to_append, contexts, txs };
        Ok((params, batch_type))
    }

    /// Decodes a batch from a byte slice.
    pub fn decode(mut bytes: &[u8]) -> Result<(Self, BatchType), DecodeError> {
        Self::read(&mut bytes)
    }

    /// Size of the batch when encoded as [`BatchType::Legacy`].
    pub fn plaintext_size_hint(&self) -> usize {
        BATCH_HEADER_SIZE +
            self.contexts.len() * super::BATCH_CONTEXT_SIZE +
            self.txs.iter().map(|tx| TX_LEN_SIZE + tx.size()).sum::<usize>()
    }
}

fn write_checked<W: Write + ?Sized>(
    w: &mut W,
    field: &'static str,
    value: u64,
    width: usize,
) -> Result<(), EncodeError> {
    if value > max_value(width) {
        return Err(EncodeError::FieldOverflow { field, value, width });
    }
    Ok(write_uint(w, value, width)?)
}

fn check_context(ctx: &BatchContext) -> Result<(), EncodeError> {
    use super::context::{
        BLOCK_NUMBER_SIZE, NUM_SEQUENCED_TXS_SIZE, NUM_SUBSEQUENT_QUEUE_TXS_SIZE, TIMESTAMP_SIZE,
    };

    for (field, value, width) in [
        ("num_sequenced_txs", ctx.num_sequenced_txs, NUM_SEQUENCED_TXS_SIZE),
        ("num_subsequent_queue_txs", ctx.num_subsequent_queue_txs, NUM_SUBSEQUENT_QUEUE_TXS_SIZE),
        ("timestamp", ctx.timestamp, TIMESTAMP_SIZE),
        ("block_number", ctx.block_number, BLOCK_NUMBER_SIZE),
    ] {
        if value > max_value(width) {
            return Err(EncodeError::FieldOverflow { field, value, width });
        }
    }
    Ok(())
}

fn write_txs<W: Write + ?Sized>(w: &mut W, txs: &[CachedTx]) -> Result<(), EncodeError> {
    for tx in txs {
        write_checked(w, "tx_len", tx.size() as u64, TX_LEN_SIZE)?;
        w.write_all(tx.raw_bytes())?;
    }
    Ok(())
}

fn read_txs<R: Read + ?Sized>(r: &mut R) -> Result<Vec<CachedTx>, DecodeError> {
    let mut txs = Vec::new();
    while let Some(len) = read_uint_or_eof(r, TX_LEN_SIZE)? {
        let mut raw = vec![0u8; len as usize];
        r.read_exact(&mut raw)?;
        txs.push(CachedTx::decode(&raw)?);
    }
    Ok(txs)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::ZlibDecoder;

    use super::*;
    use crate::ctc::{
        BATCH_CONTEXT_SIZE,
        test_utils::{queued_element, random_tx, sequencer_element},
    };

    fn mixed_batch() -> AppendSequencerBatchParams {
        let elements = vec![
            queued_element(100, 10),
            sequencer_element(101, 11, 32),
            sequencer_element(101, 11, 64),
            queued_element(101, 11),
            sequencer_element(102, 12, 0),
            queued_element(103, 13),
        ];
        AppendSequencerBatchParams::from_elements(42, &elements).unwrap()
    }

    #[test]
    fn empty_batch_encoding() {
        let params = AppendSequencerBatchParams::default();
        let encoded = params.encode(BatchType::Legacy).unwrap();
        assert_eq!(encoded, vec![0u8; BATCH_HEADER_SIZE]);

        let (decoded, batch_type) = AppendSequencerBatchParams::decode(&encoded).unwrap();
        assert_eq!(decoded, params);
        assert_eq!(batch_type, BatchType::Legacy);
    }

    #[test]
    fn empty_zlib_batch() {
        let params = AppendSequencerBatchParams::default();
        let encoded = params.encode(BatchType::Zlib).unwrap();

        // header with a single marker context
        assert_eq!(&encoded[..BATCH_HEADER_SIZE], &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        let (decoded, batch_type) = AppendSequencerBatchParams::decode(&encoded).unwrap();
        assert_eq!(decoded, params);
        assert_eq!(batch_type, BatchType::Zlib);
    }

    #[test]
    fn legacy_round_trip() {
        let params = mixed_batch();
        let encoded = params.encode(BatchType::Legacy).unwrap();
        assert_eq!(encoded.len(), params.plaintext_size_hint());

        let (decoded, batch_type) = AppendSequencerBatchParams::decode(&encoded).unwrap();
        assert_eq!(batch_type, BatchType::Legacy);
        assert_eq!(decoded, params);
    }

    #[test]
    fn zlib_round_trip() {
        let params = mixed_batch();
        let encoded = params.encode(BatchType::Zlib).unwrap();

        let (decoded, batch_type) = AppendSequencerBatchParams::decode(&encoded).unwrap();
        assert_eq!(batch_type, BatchType::Zlib);
        assert_eq!(decoded, params);
    }

    #[test]
    fn tx_count_matches_contexts() {
        let params = mixed_batch();
        let sequenced: u64 = params.contexts.iter().map(|ctx| ctx.num_sequenced_txs).sum();
        assert_eq!(sequenced, params.txs.len() as u64);
        assert_eq!(params.total_elements_to_append, 6);
    }

    #[test]
    fn zlib_single_tx_layout() {
        let el = sequencer_element(1_000, 20, 10);
        let tx = el.tx.clone().unwrap();
        let params = AppendSequencerBatchParams::from_elements(0, &[el]).unwrap();

        let encoded = params.encode(BatchType::Zlib).unwrap();

        // should_start_at_element | total_elements_to_append | num_contexts
        assert_eq!(&encoded[..BATCH_HEADER_SIZE], &[0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 2]);

        let marker_end = BATCH_HEADER_SIZE + BATCH_CONTEXT_SIZE;
        assert_eq!(&encoded[BATCH_HEADER_SIZE..marker_end], &[0u8; BATCH_CONTEXT_SIZE]);

        let ctx_end = marker_end + BATCH_CONTEXT_SIZE;
        let ctx = BatchContext::read(&mut &encoded[marker_end..ctx_end]).unwrap();
        assert_eq!(
            ctx,
            BatchContext {
                num_sequenced_txs: 1,
                num_subsequent_queue_txs: 0,
                timestamp: 1_000,
                block_number: 20
            }
        );

        let mut body = Vec::new();
        ZlibDecoder::new(&encoded[ctx_end..]).read_to_end(&mut body).unwrap();

        let mut expected = Vec::new();
        write_uint(&mut expected, tx.size() as u64, TX_LEN_SIZE).unwrap();
        expected.extend_from_slice(tx.raw_bytes());
        assert_eq!(body, expected);
    }

    #[test]
    fn queue_only_batch_is_valid() {
        let elements = [queued_element(5, 5), queued_element(5, 5)];
        let params = AppendSequencerBatchParams::from_elements(3, &elements).unwrap();
        assert!(params.txs.is_empty());

        for batch_type in [BatchType::Legacy, BatchType::Zlib] {
            let encoded = params.encode(batch_type).unwrap();
            let (decoded, _) = AppendSequencerBatchParams::decode(&encoded).unwrap();
            assert_eq!(decoded, params);
        }
    }

    #[test]
    fn txs_without_contexts_fail_to_encode() {
        let params = AppendSequencerBatchParams { txs: vec![random_tx(4)], ..Default::default() };
        assert!(matches!(
            params.encode(BatchType::Legacy),
            Err(EncodeError::TxsWithoutContexts(1))
        ));
    }

    #[test]
    fn txs_without_contexts_fail_to_decode() {
        let tx = random_tx(4);
        let mut encoded = vec![0u8; BATCH_HEADER_SIZE];
        write_uint(&mut encoded, tx.size() as u64, TX_LEN_SIZE).unwrap();
        encoded.extend_from_slice(tx.raw_bytes());

        assert!(matches!(
            AppendSequencerBatchParams::decode(&encoded),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn legacy_marker_is_stripped() {
        let marker = BatchContext { block_number: 1, ..Default::default() };
        let ctx = BatchContext { num_subsequent_queue_txs: 1, timestamp: 9, block_number: 9, ..Default::default() };

        let mut encoded = Vec::new();
        write_uint(&mut encoded, 0, SHOULD_START_AT_ELEMENT_SIZE).unwrap();
        write_uint(&mut encoded, 1, TOTAL_ELEMENTS_TO_APPEND_SIZE).unwrap();
        write_uint(&mut encoded, 2, NUM_CONTEXTS_SIZE).unwrap();
        marker.write(&mut encoded).unwrap();
        ctx.write(&mut encoded).unwrap();

        let (decoded, batch_type) = AppendSequencerBatchParams::decode(&encoded).unwrap();
        assert_eq!(batch_type, BatchType::Legacy);
        assert_eq!(decoded.contexts, vec![ctx]);
    }

    #[test]
    fn truncated_tx_is_malformed() {
        let params = mixed_batch();
        let mut encoded = params.encode(BatchType::Legacy).unwrap();
        encoded.truncate(encoded.len() - 1);

        assert!(AppendSequencerBatchParams::decode(&encoded).is_err());
    }

    #[test]
    fn truncated_length_prefix_is_malformed() {
        let params = mixed_batch();
        let mut encoded = params.encode(BatchType::Legacy).unwrap();
        encoded.extend_from_slice(&[0x00, 0x01]);

        assert!(matches!(
            AppendSequencerBatchParams::decode(&encoded),
            Err(DecodeError::Io(_))
        ));
    }

    /// Re-encodes the zlib body of `params` after applying `edit` to the plaintext.
    fn zlib_with_body(
        params: &AppendSequencerBatchParams,
        edit: impl FnOnce(&mut Vec<u8>),
    ) -> Vec<u8> {
        let encoded = params.encode(BatchType::Zlib).unwrap();
        let body_start = BATCH_HEADER_SIZE + (params.contexts.len() + 1) * BATCH_CONTEXT_SIZE;

        let mut body = Vec::new();
        ZlibDecoder::new(&encoded[body_start..]).read_to_end(&mut body).unwrap();
        edit(&mut body);

        let mut enc = ZlibEncoder::new(encoded[..body_start].to_vec(), Compression::default());
        enc.write_all(&body).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn truncated_zlib_tx_is_malformed() {
        let params = mixed_batch();
        let encoded = zlib_with_body(&params, |body| body.truncate(body.len() - 1));

        assert!(matches!(
            AppendSequencerBatchParams::decode(&encoded),
            Err(DecodeError::Io(_))
        ));
    }

    #[test]
    fn truncated_zlib_length_prefix_is_malformed() {
        let params = mixed_batch();
        let encoded = zlib_with_body(&params, |body| body.extend_from_slice(&[0x00, 0x01]));

        assert!(matches!(
            AppendSequencerBatchParams::decode(&encoded),
            Err(DecodeError::Io(_))
        ));
    }

    #[test]
    fn extra_zlib_tx_is_malformed() {
        let params = mixed_batch();
        let extra = random_tx(8);
        let encoded = zlib_with_body(&params, |body| {
            write_uint(body, extra.size() as u64, TX_LEN_SIZE).unwrap();
            body.extend_from_slice(extra.raw_bytes());
        });

        assert!(matches!(
            AppendSequencerBatchParams::decode(&encoded),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn oversized_start_index_is_rejected() {
        let params = AppendSequencerBatchParams {
            should_start_at_element: 1 << 40,
            ..Default::default()
        };
        assert!(matches!(
            params.encode(BatchType::Legacy),
            Err(EncodeError::FieldOverflow { field: "should_start_at_element", .. })
        ));
    }
}
